//! Admin credential bootstrap, password hashing and cookie-backed sessions.
//!
//! Both cookies carry an opaque token; everything else about the session
//! lives in the `sessions` collection.

use crate::config::{AppConfig, AuthConfig};
use crate::error::{ApiError, Context};
use crate::models::{
    AdminCredential, CredentialAction, CredentialAudit, Session, SessionKind, User,
    ADMIN_CREDENTIAL_ID,
};
use crate::store::Store;
use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use actix_web::HttpRequest;
use lazy_static::lazy_static;
use mongodb::bson::DateTime;
use regex::Regex;
use uuid::Uuid;

pub const ADMIN_COOKIE: &str = "admin-auth";
pub const USER_COOKIE: &str = "user-auth";
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";
pub const MIN_PASSWORD_LEN: usize = 6;

lazy_static! {
    static ref EMAIL_RE: Regex =
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles");
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub fn hash_password(password: &str, cost: u32) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password, cost)
}

// A malformed stored hash counts as a mismatch.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match bcrypt::verify(password, hash) {
        Ok(matched) => matched,
        Err(e) => {
            log::warn!("password hash could not be checked: {}", e);
            false
        }
    }
}

/// Called on startup. Seeds the admin credential from the configured
/// initial password when the store has none yet.
pub async fn ensure_admin_credential(
    store: &dyn Store,
    config: &AppConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    if store.admin_credential().await?.is_some() {
        log::info!("admin credential already present");
        return Ok(());
    }

    let password = &config.admin.initial_password;
    if password == DEFAULT_ADMIN_PASSWORD {
        log::warn!("seeding admin credential with the default password; set ADMIN_PASSWORD");
    }

    let credential = AdminCredential {
        id: ADMIN_CREDENTIAL_ID.to_string(),
        password_hash: hash_password(password, config.auth.bcrypt_cost)?,
        rotations: 0,
        updated_at: DateTime::now(),
    };
    store.save_admin_credential(credential).await?;
    store
        .append_credential_audit(CredentialAudit {
            id: None,
            action: CredentialAction::Seeded,
            at: DateTime::now(),
            remote_addr: None,
        })
        .await?;
    log::info!("admin credential seeded");
    Ok(())
}

pub async fn verify_admin_password(store: &dyn Store, password: &str) -> Result<bool, ApiError> {
    let credential = store
        .admin_credential()
        .await
        .context("Authentication failed")?
        .ok_or_else(|| ApiError::internal("Authentication failed", "admin credential missing"))?;
    Ok(verify_password(password, &credential.password_hash))
}

/// Replaces the stored hash and records the rotation. The old password stays
/// valid if the write fails.
pub async fn rotate_admin_password(
    store: &dyn Store,
    auth: &AuthConfig,
    new_password: &str,
    remote_addr: Option<String>,
) -> Result<(), ApiError> {
    let rotations = store
        .admin_credential()
        .await
        .context("Failed to change password")?
        .map_or(0, |c| c.rotations);
    let password_hash =
        hash_password(new_password, auth.bcrypt_cost).context("Failed to change password")?;

    store
        .save_admin_credential(AdminCredential {
            id: ADMIN_CREDENTIAL_ID.to_string(),
            password_hash,
            rotations: rotations + 1,
            updated_at: DateTime::now(),
        })
        .await
        .context("Failed to change password")?;

    // The new password is already active; a lost audit entry is only logged.
    if let Err(e) = store
        .append_credential_audit(CredentialAudit {
            id: None,
            action: CredentialAction::Rotated,
            at: DateTime::now(),
            remote_addr,
        })
        .await
    {
        log::error!("failed to record credential rotation: {}", e);
    }
    log::info!("admin password rotated");
    Ok(())
}

fn lifetime(kind: SessionKind, auth: &AuthConfig) -> CookieDuration {
    match kind {
        SessionKind::Admin => CookieDuration::hours(auth.admin_session_hours),
        SessionKind::User => CookieDuration::days(auth.user_session_days),
    }
}

fn cookie_name(kind: SessionKind) -> &'static str {
    match kind {
        SessionKind::Admin => ADMIN_COOKIE,
        SessionKind::User => USER_COOKIE,
    }
}

/// Stores a fresh session and returns the cookie that references it.
pub async fn start_session(
    store: &dyn Store,
    auth: &AuthConfig,
    kind: SessionKind,
    user: Option<&User>,
) -> Result<Cookie<'static>, ApiError> {
    let max_age = lifetime(kind, auth);
    let now = DateTime::now();
    let session = Session {
        token: Uuid::new_v4().simple().to_string(),
        kind,
        user_id: user.and_then(|u| u.id),
        name: user.map(|u| u.name.clone()),
        email: user.map(|u| u.email.clone()),
        created_at: now,
        expires_at: DateTime::from_millis(
            now.timestamp_millis() + max_age.whole_milliseconds() as i64,
        ),
    };
    let token = session.token.clone();
    store
        .insert_session(session)
        .await
        .context("Failed to create session")?;

    Ok(Cookie::build(cookie_name(kind), token)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(auth.secure_cookies)
        .max_age(max_age)
        .finish())
}

/// Deletes the session named by the request cookie, if any, and returns the
/// removal cookie.
pub async fn end_session(req: &HttpRequest, store: &dyn Store, kind: SessionKind) -> Cookie<'static> {
    let name = cookie_name(kind);
    if let Some(cookie) = req.cookie(name) {
        if let Err(e) = store.delete_session(cookie.value()).await {
            log::error!("failed to delete {} session: {}", name, e);
        }
    }
    let mut removal = Cookie::build(name, "").path("/").finish();
    removal.make_removal();
    removal
}

async fn session_for(
    req: &HttpRequest,
    store: &dyn Store,
    kind: SessionKind,
) -> Result<Option<Session>, ApiError> {
    let cookie = match req.cookie(cookie_name(kind)) {
        Some(cookie) => cookie,
        None => return Ok(None),
    };
    let session = store
        .find_session(cookie.value())
        .await
        .context("Failed to load session")?;
    Ok(session.filter(|s| s.kind == kind))
}

/// Gate for every admin endpoint. Must run before the body is read.
pub async fn check_admin(req: &HttpRequest, store: &dyn Store) -> Result<Session, ApiError> {
    session_for(req, store, SessionKind::Admin)
        .await?
        .ok_or(ApiError::Unauthorized)
}

pub async fn current_user(req: &HttpRequest, store: &dyn Store) -> Result<Option<Session>, ApiError> {
    session_for(req, store, SessionKind::User).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::test_support::test_config;
    use actix_web::test::TestRequest;

    #[test]
    fn email_pattern() {
        assert!(is_valid_email("ann@example.com"));
        assert!(!is_valid_email("ann@example"));
        assert!(!is_valid_email("ann example@x.io"));
        assert!(!is_valid_email("@example.com"));
    }

    #[tokio::test]
    async fn seeds_credential_once() {
        let store = MemoryStore::new();
        let config = test_config();
        ensure_admin_credential(&store, &config).await.unwrap();
        ensure_admin_credential(&store, &config).await.unwrap();

        assert!(verify_admin_password(&store, "admin123").await.unwrap());
        assert!(!verify_admin_password(&store, "nope").await.unwrap());
        assert_eq!(store.credential_audit(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn rotation_replaces_hash_and_audits() {
        let store = MemoryStore::new();
        let config = test_config();
        ensure_admin_credential(&store, &config).await.unwrap();

        rotate_admin_password(&store, &config.auth, "s3cret!", Some("10.0.0.1".into()))
            .await
            .unwrap();

        assert!(verify_admin_password(&store, "s3cret!").await.unwrap());
        assert!(!verify_admin_password(&store, "admin123").await.unwrap());
        let credential = store.admin_credential().await.unwrap().unwrap();
        assert_eq!(credential.rotations, 1);

        let audit = store.credential_audit(10).await.unwrap();
        assert_eq!(audit[0].action, CredentialAction::Rotated);
        assert_eq!(audit[0].remote_addr.as_deref(), Some("10.0.0.1"));
    }

    #[tokio::test]
    async fn session_cookie_round_trip() {
        let store = MemoryStore::new();
        let config = test_config();
        let cookie = start_session(&store, &config.auth, SessionKind::Admin, None)
            .await
            .unwrap();
        assert_eq!(cookie.name(), ADMIN_COOKIE);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Strict));
        assert_eq!(cookie.max_age(), Some(CookieDuration::hours(24)));

        let req = TestRequest::default().cookie(cookie.clone()).to_http_request();
        assert!(check_admin(&req, &store).await.is_ok());
        // an admin token is not a user session
        assert!(current_user(&req, &store).await.unwrap().is_none());

        let removal = end_session(&req, &store, SessionKind::Admin).await;
        assert_eq!(removal.value(), "");
        assert!(matches!(
            check_admin(&req, &store).await,
            Err(ApiError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn forged_cookie_is_rejected() {
        let store = MemoryStore::new();
        let req = TestRequest::default()
            .cookie(Cookie::new(ADMIN_COOKIE, "authenticated"))
            .to_http_request();
        assert!(matches!(
            check_admin(&req, &store).await,
            Err(ApiError::Unauthorized)
        ));
    }
}
