mod admin_handlers;
mod api_handlers;
mod auth;
mod auth_handlers;
mod catalog;
mod config;
mod db;
mod dto;
mod error;
mod index_manager;
mod init_data;
mod models;
mod settings;
mod store;
mod template;
mod upload;
mod web_handlers;

#[cfg(test)]
mod test_support;

use admin_handlers::{
    change_password, create_category, create_video, delete_video, get_categories,
    get_credential_audit, get_video_admin, get_videos_admin, reset_db, reset_settings, seed_data,
    seed_generated, update_settings, update_video, upload_signature,
};
use auth_handlers::{admin_login, admin_logout, login, logout, me, signup};
use config::{AppConfig, DatabaseBackend};
use error::ApiError;
use store::{MemoryStore, MongoStore, Store};

use actix_files::Files;
use actix_web::dev::{forward_ready, Service, Transform};
use actix_web::error::{JsonPayloadError, QueryPayloadError};
use actix_web::http::header::{HeaderValue, CACHE_CONTROL};
use actix_web::{
    dev::{ServiceRequest, ServiceResponse},
    middleware, web, App, Error, HttpRequest, HttpServer,
};
use std::future::{ready, Ready};
use std::rc::Rc;
use std::sync::Arc;

// Static file cache middleware
pub struct StaticCacheMiddleware {
    max_age: u32,
}

impl StaticCacheMiddleware {
    pub fn new(max_age: u32) -> Self {
        StaticCacheMiddleware { max_age }
    }
}

impl<S, B> Transform<S, ServiceRequest> for StaticCacheMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = StaticCacheMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        let header = HeaderValue::from_str(&format!("public, max-age={}", self.max_age));
        ready(header.map_err(|_| ()).map(|header| StaticCacheMiddlewareService {
            service: Rc::new(service),
            header,
        }))
    }
}

pub struct StaticCacheMiddlewareService<S> {
    service: Rc<S>,
    header: HeaderValue,
}

impl<S, B> Service<ServiceRequest> for StaticCacheMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future =
        std::pin::Pin<Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let header = self.header.clone();

        Box::pin(async move {
            let is_static = req.path().starts_with("/static/");
            let mut res = service.call(req).await?;

            if is_static && res.status().is_success() {
                res.headers_mut().insert(CACHE_CONTROL, header);
            }

            Ok(res)
        })
    }
}

fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> Error {
    log::debug!("rejected json body: {}", err);
    ApiError::validation("Invalid request body").into()
}

fn query_error_handler(err: QueryPayloadError, _req: &HttpRequest) -> Error {
    log::debug!("rejected query string: {}", err);
    ApiError::validation("Invalid query parameters").into()
}

/// Shared state and every route except static files.
pub fn configure_app(cfg: &mut web::ServiceConfig, store: Arc<dyn Store>, config: AppConfig) {
    cfg.app_data(web::Data::from(store))
        .app_data(web::Data::new(config))
        .app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .app_data(web::QueryConfig::default().error_handler(query_error_handler))
        // Web routes
        .service(web::resource("/").route(web::get().to(web_handlers::home_page)))
        .service(web::resource("/browse").route(web::get().to(web_handlers::browse_page)))
        .service(web::resource("/search").route(web::get().to(web_handlers::search_page)))
        .service(web::resource("/watch/{id}").route(web::get().to(web_handlers::watch_page)))
        .service(web::resource("/login").route(web::get().to(web_handlers::login_page)))
        .service(web::resource("/signup").route(web::get().to(web_handlers::signup_page)))
        .service(web::resource("/admin").route(web::get().to(web_handlers::admin_login_page)))
        .service(
            web::resource("/admin/dashboard").route(web::get().to(web_handlers::admin_dashboard)),
        )
        // Public API routes
        .service(web::resource("/api/videos").route(web::get().to(api_handlers::get_videos)))
        .service(web::resource("/api/videos/{id}").route(web::get().to(api_handlers::get_video)))
        .service(web::resource("/api/search").route(web::get().to(api_handlers::search)))
        .service(web::resource("/api/stream/{id}").route(web::get().to(api_handlers::stream_info)))
        .service(
            web::resource("/api/settings")
                .route(web::get().to(api_handlers::get_settings))
                .route(web::put().to(update_settings)),
        )
        // User authentication
        .service(web::resource("/api/auth/signup").route(web::post().to(signup)))
        .service(web::resource("/api/auth/login").route(web::post().to(login)))
        .service(web::resource("/api/auth/logout").route(web::post().to(logout)))
        .service(web::resource("/api/auth/me").route(web::get().to(me)))
        // Admin API routes
        .service(
            web::scope("/api/admin")
                .service(
                    web::resource("/auth")
                        .route(web::post().to(admin_login))
                        .route(web::delete().to(admin_logout)),
                )
                // Video Management
                .service(
                    web::resource("/videos")
                        .route(web::get().to(get_videos_admin))
                        .route(web::post().to(create_video)),
                )
                .service(
                    web::resource("/videos/{id}")
                        .route(web::get().to(get_video_admin))
                        .route(web::put().to(update_video))
                        .route(web::delete().to(delete_video)),
                )
                // Site settings
                .service(web::resource("/reset-settings").route(web::delete().to(reset_settings)))
                .service(web::resource("/upload").route(web::post().to(upload_signature)))
                .service(web::resource("/change-password").route(web::post().to(change_password)))
                .service(
                    web::resource("/credential-audit").route(web::get().to(get_credential_audit)),
                )
                // Categories
                .service(
                    web::resource("/categories")
                        .route(web::get().to(get_categories))
                        .route(web::post().to(create_category)),
                )
                // Data maintenance
                .service(web::resource("/seed-data").route(web::post().to(seed_data)))
                .service(web::resource("/seed-100").route(web::post().to(seed_generated)))
                .service(web::resource("/reset-db").route(web::post().to(reset_db))),
        );
}

async fn build_store(config: &AppConfig) -> std::io::Result<Arc<dyn Store>> {
    match config.database.backend {
        DatabaseBackend::Mongo => {
            let db = db::connect(&config.database).await.map_err(|e| {
                log::error!("failed to connect to the database: {}", e);
                std::io::Error::new(std::io::ErrorKind::Other, "DB connection failed")
            })?;
            log::info!("connected to database {}", config.database.name);

            let index_manager = index_manager::IndexManager::new(db.clone());
            let failed = index_manager.create_all_indexes().await;
            if failed > 0 {
                // Queries still work without them, only slower.
                log::warn!("{} index(es) could not be created", failed);
            }
            if let Ok(names) = index_manager.video_indexes().await {
                log::debug!("video indexes: {:?}", names);
            }
            Ok(Arc::new(MongoStore::new(db)))
        }
        DatabaseBackend::Memory => {
            log::warn!("using the in-memory store; data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = AppConfig::new().map_err(|e| {
        log::error!("invalid configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;

    let store = build_store(&config).await?;

    auth::ensure_admin_credential(store.as_ref(), &config)
        .await
        .map_err(|e| {
            log::error!("failed to initialise admin credential: {}", e);
            std::io::Error::new(std::io::ErrorKind::Other, "admin credential setup failed")
        })?;

    if let Err(e) = store.load_settings().await {
        log::warn!("site settings could not be initialised: {}", e);
    }

    if config.seed_sample_data {
        if let Err(e) = init_data::init_all_data(store.as_ref()).await {
            log::warn!("sample data initialisation failed: {}", e);
        }
    }

    let bind = (config.server.host.clone(), config.server.port);
    log::info!("starting server at http://{}:{}", bind.0, bind.1);

    HttpServer::new(move || {
        let store = store.clone();
        let config = config.clone();
        let static_dir = config.server.static_dir.clone();
        let max_age = config.server.static_max_age;
        App::new()
            .wrap(middleware::Compress::default())
            .wrap(StaticCacheMiddleware::new(max_age))
            .wrap(middleware::Logger::default())
            .service(
                Files::new("/static", static_dir)
                    .use_etag(true)
                    .use_last_modified(true)
                    .prefer_utf8(true),
            )
            .configure(move |cfg| configure_app(cfg, store, config))
    })
    .bind(bind)?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{test_app, TestContext};
    use actix_web::http::StatusCode;
    use actix_web::test;
    use serde_json::Value;

    #[actix_web::test]
    async fn malformed_json_is_a_bad_request() {
        let ctx = TestContext::new().await;
        let app = test_app!(ctx);

        let req = test::TestRequest::post()
            .uri("/api/admin/auth")
            .insert_header(("Content-Type", "application/json"))
            .set_payload("{not json")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Invalid request body");
    }

    #[actix_web::test]
    async fn static_files_get_cache_header() {
        let app = test::init_service(
            App::new()
                .wrap(StaticCacheMiddleware::new(600))
                .service(Files::new("/static", "./static")),
        )
        .await;

        let req = test::TestRequest::get().uri("/static/css/style.css").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get(CACHE_CONTROL).unwrap(),
            "public, max-age=600"
        );
    }
}
