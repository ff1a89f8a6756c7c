//! Request pipeline shared by the binary and the integration tests.
//!
//! Order, outermost first: CORS (wrapped on the `App` by the caller), auth
//! delegation, then a catch-all scope carrying JSON body handling, the
//! security middleware and the API routers.

use actix_cors::Cors;
use actix_web::web;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::auth;
use crate::config::AppConfig;
use crate::openapi::ApiDoc;
use crate::routes::{self, AppState};
use crate::security::Security;

/// CORS policy allowing only `FRONTEND_URL`. With no origin configured every
/// cross-origin request is refused.
pub fn cors(config: &AppConfig) -> Cors {
    let mut cors = Cors::default()
        .allowed_methods(["GET", "POST", "PUT", "DELETE"])
        .allow_any_header()
        .supports_credentials()
        .max_age(3600);
    if let Some(origin) = &config.frontend_url {
        cors = cors.allowed_origin(origin);
    }
    cors
}

pub fn configure(cfg: &mut web::ServiceConfig, state: AppState, security: Security) {
    cfg.app_data(web::Data::new(state))
        // must precede the catch-all scope below, which claims every other path
        .service(web::resource("/api/auth/{tail:.*}").to(auth::delegate))
        .service(
            web::scope("")
                .wrap(security)
                .app_data(routes::json_config())
                .app_data(routes::query_config())
                .app_data(routes::path_config())
                .route("/", web::get().to(routes::index))
                .configure(routes::config)
                .service(SwaggerUi::new("/docs/{_:.*}").url("/docs/openapi.json", ApiDoc::openapi())),
        );
}
