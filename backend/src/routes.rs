use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{admin, auth, contact, handlers, live, request_context, state::AppState};

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let admin_routes = Router::new()
        .route("/logout", post(admin::logout))
        .route("/dashboard", get(admin::dashboard))
        .route("/dashboard/live", get(live::dashboard_stream))
        .route("/changes", get(live::change_stream))
        .route("/posts", get(admin::list_posts).post(admin::create_post))
        .route(
            "/posts/:id",
            get(admin::get_post)
                .put(admin::update_post)
                .delete(admin::delete_post),
        )
        .route("/posts/:id/status", put(admin::set_post_status))
        .route("/posts/:id/tags", put(admin::replace_post_tags))
        .route("/subscribers", get(admin::list_subscribers))
        .route(
            "/subscribers/:id",
            axum::routing::delete(admin::delete_subscriber),
        )
        .route("/subscribers/:id/status", put(admin::set_subscriber_status))
        .route("/suggestions", get(admin::list_suggestions))
        .route(
            "/suggestions/:id",
            axum::routing::delete(admin::delete_suggestion),
        )
        .route("/suggestions/:id/status", put(admin::set_suggestion_status))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_auth))
        .route("/login", post(admin::login));

    Router::new()
        .route("/api/home", get(handlers::home_posts))
        .route("/api/posts", get(handlers::list_posts))
        .route("/api/posts/:slug", get(handlers::get_post))
        .route("/api/tags", get(handlers::list_tags))
        .route("/api/newsletter", post(handlers::subscribe))
        .route("/api/suggestions", post(handlers::suggest))
        .route("/api/contact", post(contact::submit_contact))
        .nest("/api/admin", admin_routes)
        .with_state(state)
        .layer(middleware::from_fn(request_context::request_context_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
