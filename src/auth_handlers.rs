use crate::auth::{self, MIN_PASSWORD_LEN};
use crate::config::AppConfig;
use crate::dto::{AdminLoginRequest, AuthResponse, SignupRequest, SuccessResponse, UserLoginRequest, UserSummary};
use crate::error::{ApiError, Context, StoreError};
use crate::models::{SessionKind, User};
use crate::store::Store;
use actix_web::{web, HttpRequest, HttpResponse};
use mongodb::bson::DateTime;

// --- Admin ---

// POST /api/admin/auth
pub async fn admin_login(
    store: web::Data<dyn Store>,
    config: web::Data<AppConfig>,
    body: web::Json<AdminLoginRequest>,
) -> Result<HttpResponse, ApiError> {
    if !auth::verify_admin_password(store.get_ref(), &body.password).await? {
        log::warn!("failed admin login attempt");
        return Err(ApiError::InvalidCredentials("Invalid password".to_string()));
    }

    let cookie = auth::start_session(store.get_ref(), &config.auth, SessionKind::Admin, None).await?;
    log::info!("admin signed in");
    Ok(HttpResponse::Ok().cookie(cookie).json(SuccessResponse::ok()))
}

// DELETE /api/admin/auth
pub async fn admin_logout(req: HttpRequest, store: web::Data<dyn Store>) -> HttpResponse {
    let removal = auth::end_session(&req, store.get_ref(), SessionKind::Admin).await;
    HttpResponse::Ok().cookie(removal).json(SuccessResponse::ok())
}

// --- End users ---

async fn user_auth_enabled(store: &dyn Store) -> Result<bool, ApiError> {
    let settings = store.load_settings().await.context("Failed to fetch settings")?;
    Ok(settings.enable_user_auth)
}

// POST /api/auth/signup
pub async fn signup(
    store: web::Data<dyn Store>,
    config: web::Data<AppConfig>,
    body: web::Json<SignupRequest>,
) -> Result<HttpResponse, ApiError> {
    if !user_auth_enabled(store.get_ref()).await? {
        return Err(ApiError::Forbidden(
            "User registration is currently disabled".to_string(),
        ));
    }

    let request = body.into_inner();
    let name = request.name.trim().to_string();
    let email = request.email.trim().to_lowercase();
    if name.is_empty() || email.is_empty() || request.password.is_empty() || request.confirm_password.is_empty() {
        return Err(ApiError::validation("All fields are required"));
    }
    if request.password != request.confirm_password {
        return Err(ApiError::validation("Passwords do not match"));
    }
    if request.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::validation(
            "Password must be at least 6 characters long",
        ));
    }
    if !auth::is_valid_email(&email) {
        return Err(ApiError::validation("Please enter a valid email address"));
    }

    const CREATE_FAILED: &str = "Failed to create account. Please try again.";
    if store
        .find_user_by_email(&email)
        .await
        .context(CREATE_FAILED)?
        .is_some()
    {
        return Err(ApiError::validation("User with this email already exists"));
    }

    let now = DateTime::now();
    let user = User {
        id: None,
        name,
        email,
        password: auth::hash_password(&request.password, config.auth.bcrypt_cost)
            .context(CREATE_FAILED)?,
        created_at: now,
        updated_at: now,
    };
    // The unique index catches a concurrent signup with the same email.
    let user = match store.insert_user(user).await {
        Ok(user) => user,
        Err(StoreError::Duplicate(_)) => {
            return Err(ApiError::validation("User with this email already exists"))
        }
        Err(e) => return Err(ApiError::internal(CREATE_FAILED, e)),
    };
    log::info!("user registered: {}", user.email);

    Ok(HttpResponse::Ok().json(AuthResponse {
        success: true,
        message: "Account created successfully!".to_string(),
        user: Some(UserSummary::from(&user)),
    }))
}

// POST /api/auth/login
pub async fn login(
    store: web::Data<dyn Store>,
    config: web::Data<AppConfig>,
    body: web::Json<UserLoginRequest>,
) -> Result<HttpResponse, ApiError> {
    if !user_auth_enabled(store.get_ref()).await? {
        return Err(ApiError::Forbidden(
            "User login is currently disabled".to_string(),
        ));
    }
    if body.email.trim().is_empty() || body.password.is_empty() {
        return Err(ApiError::validation("Email and password are required"));
    }

    let invalid = || ApiError::InvalidCredentials("Invalid email or password".to_string());
    let user = store
        .find_user_by_email(&body.email.trim().to_lowercase())
        .await
        .context("Login failed. Please try again.")?
        .ok_or_else(invalid)?;
    if !auth::verify_password(&body.password, &user.password) {
        return Err(invalid());
    }

    let cookie = auth::start_session(store.get_ref(), &config.auth, SessionKind::User, Some(&user)).await?;
    Ok(HttpResponse::Ok().cookie(cookie).json(AuthResponse {
        success: true,
        message: "Login successful!".to_string(),
        user: Some(UserSummary::from(&user)),
    }))
}

// POST /api/auth/logout
pub async fn logout(req: HttpRequest, store: web::Data<dyn Store>) -> HttpResponse {
    let removal = auth::end_session(&req, store.get_ref(), SessionKind::User).await;
    HttpResponse::Ok()
        .cookie(removal)
        .json(SuccessResponse::with_message("Logged out successfully"))
}

// GET /api/auth/me
pub async fn me(req: HttpRequest, store: web::Data<dyn Store>) -> Result<HttpResponse, ApiError> {
    let session = auth::current_user(&req, store.get_ref())
        .await?
        .ok_or(ApiError::Unauthorized)?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "user": UserSummary {
            id: session.user_id.map(|id| id.to_hex()).unwrap_or_default(),
            name: session.name.unwrap_or_default(),
            email: session.email.unwrap_or_default(),
        }
    })))
}

#[cfg(test)]
mod tests {
    use crate::settings::SettingsPatch;
    use crate::store::Store;
    use crate::test_support::{test_app, TestContext};
    use actix_web::http::StatusCode;
    use actix_web::test;
    use serde_json::{json, Value};

    async fn enable_user_auth(ctx: &TestContext) {
        ctx.store.load_settings().await.unwrap();
        ctx.store
            .update_settings(&SettingsPatch {
                enable_user_auth: Some(true),
                ..Default::default()
            })
            .await
            .unwrap();
    }

    fn signup_body(email: &str) -> Value {
        json!({
            "name": " Ann ",
            "email": email,
            "password": "secret1",
            "confirmPassword": "secret1"
        })
    }

    #[actix_web::test]
    async fn admin_login_sets_cookie_and_logout_clears_it() {
        let ctx = TestContext::new().await;
        let app = test_app!(ctx);

        let req = test::TestRequest::post()
            .uri("/api/admin/auth")
            .set_json(json!({ "password": "wrong" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Invalid password");

        let req = test::TestRequest::post()
            .uri("/api/admin/auth")
            .set_json(json!({ "password": "admin123" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let cookie = resp
            .response()
            .cookies()
            .find(|c| c.name() == "admin-auth")
            .expect("admin cookie")
            .into_owned();
        assert_ne!(cookie.value(), "authenticated");
        assert_eq!(cookie.http_only(), Some(true));

        let req = test::TestRequest::get()
            .uri("/api/admin/videos")
            .cookie(cookie.clone())
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::delete()
            .uri("/api/admin/auth")
            .cookie(cookie.clone())
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["success"], true);

        // the token is dead server-side even if the browser keeps it
        let req = test::TestRequest::get()
            .uri("/api/admin/videos")
            .cookie(cookie)
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[actix_web::test]
    async fn user_flows_are_gated_by_settings() {
        let ctx = TestContext::new().await;
        let app = test_app!(ctx);

        let req = test::TestRequest::post()
            .uri("/api/auth/signup")
            .set_json(signup_body("ann@example.com"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "User registration is currently disabled");

        let req = test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({ "email": "ann@example.com", "password": "secret1" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "User login is currently disabled");
    }

    #[actix_web::test]
    async fn signup_login_me_logout() {
        let ctx = TestContext::new().await;
        enable_user_auth(&ctx).await;
        let app = test_app!(ctx);

        let req = test::TestRequest::post()
            .uri("/api/auth/signup")
            .set_json(signup_body(" Ann@Example.com "))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Account created successfully!");
        assert_eq!(body["user"]["name"], "Ann");
        assert_eq!(body["user"]["email"], "ann@example.com");

        let stored = ctx.store.find_user_by_email("ann@example.com").await.unwrap().unwrap();
        assert_ne!(stored.password, "secret1");

        let req = test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({ "email": "ann@example.com", "password": "nope00" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({ "email": "ANN@example.com", "password": "secret1" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let cookie = resp
            .response()
            .cookies()
            .find(|c| c.name() == "user-auth")
            .expect("user cookie")
            .into_owned();

        let req = test::TestRequest::get()
            .uri("/api/auth/me")
            .cookie(cookie.clone())
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["user"]["email"], "ann@example.com");

        // a user session does not open admin routes
        let req = test::TestRequest::get()
            .uri("/api/admin/videos")
            .cookie(actix_web::cookie::Cookie::new("admin-auth", cookie.value().to_string()))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::UNAUTHORIZED
        );

        let req = test::TestRequest::post()
            .uri("/api/auth/logout")
            .cookie(cookie.clone())
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["message"], "Logged out successfully");

        let req = test::TestRequest::get()
            .uri("/api/auth/me")
            .cookie(cookie)
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[actix_web::test]
    async fn signup_validation_messages() {
        let ctx = TestContext::new().await;
        enable_user_auth(&ctx).await;
        let app = test_app!(ctx);

        let mut mismatch = signup_body("bob@example.com");
        mismatch["confirmPassword"] = json!("other1");
        let mut short = signup_body("bob@example.com");
        short["password"] = json!("abc");
        short["confirmPassword"] = json!("abc");
        let cases = [
            (json!({ "name": "Bob" }), "All fields are required"),
            (mismatch, "Passwords do not match"),
            (short, "Password must be at least 6 characters long"),
            (signup_body("bob@example"), "Please enter a valid email address"),
        ];
        for (body, message) in cases {
            let req = test::TestRequest::post()
                .uri("/api/auth/signup")
                .set_json(body)
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
            let body: Value = test::read_body_json(resp).await;
            assert_eq!(body["error"], message);
        }

        for expected in [StatusCode::OK, StatusCode::BAD_REQUEST] {
            let req = test::TestRequest::post()
                .uri("/api/auth/signup")
                .set_json(signup_body("bob@example.com"))
                .to_request();
            assert_eq!(test::call_service(&app, req).await.status(), expected);
        }
    }
}
