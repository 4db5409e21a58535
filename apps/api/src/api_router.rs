use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, HeaderValue, Method};
use axum::middleware::from_fn_with_state;
use axum::routing::{delete, get, post};
use axum::{Extension, Router};
use rantboard_core::AppError;
use rantboard_domain::EndpointClass;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::request_context::BYPASS_HEADER;
use crate::state::AppState;
use crate::{handlers, middleware};


pub fn build_router(app_state: AppState, frontend_url: &str) -> Result<Router, AppError> {
    let post_routes = throttled(
        Router::new().route("/api/posts", post(handlers::content::create_post_handler)),
        &app_state,
        EndpointClass::Post,
    );

    let password_reset_routes = throttled(
        Router::new().route(
            "/api/users/forgot-password",
            post(handlers::users::forgot_password_handler),
        ),
        &app_state,
        EndpointClass::PasswordReset,
    );

    let admin_routes = Router::new()
        .route("/api/admin/verify", post(handlers::admin::admin_verify_handler))
        .route(
            "/api/admin/rate-limits",
            get(handlers::admin::abuse_diagnostics_handler)
                .delete(handlers::admin::clear_rate_limits_handler),
        )
        .route(
            "/api/admin/rate-limits/{identifier}",
            delete(handlers::admin::reset_rate_limit_handler),
        )
        .route(
            "/api/admin/lockouts",
            delete(handlers::admin::clear_lockouts_handler),
        )
        .route(
            "/api/admin/lockouts/{source}",
            delete(handlers::admin::clear_lockout_handler),
        )
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::require_admin,
        ));

    Ok(Router::new()
        .route("/health", get(handlers::health::health_handler))
        .merge(post_routes)
        .route(
            "/api/comments",
            post(handlers::content::create_comment_handler),
        )
        .merge(password_reset_routes)
        .route(
            "/api/users/register",
            post(handlers::users::register_handler),
        )
        .route("/api/users/login", post(handlers::users::user_login_handler))
        .route("/api/users/verify", post(handlers::users::verify_user_handler))
        .route("/api/admin/login", post(handlers::admin::admin_login_handler))
        .merge(admin_routes)
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(frontend_url)?)
        .with_state(app_state))
}

fn throttled(
    routes: Router<AppState>,
    app_state: &AppState,
    endpoint: EndpointClass,
) -> Router<AppState> {
    routes
        .route_layer(from_fn_with_state(app_state.clone(), middleware::throttle))
        .layer(Extension(endpoint))
}

fn build_cors_layer(frontend_url: &str) -> Result<CorsLayer, AppError> {
    Ok(CorsLayer::new()
        .allow_origin(
            HeaderValue::from_str(frontend_url)
                .map_err(|error| AppError::Validation(format!("invalid FRONTEND_URL: {error}")))?,
        )
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            CONTENT_TYPE,
            AUTHORIZATION,
            HeaderName::from_static(BYPASS_HEADER),
        ]))
}
