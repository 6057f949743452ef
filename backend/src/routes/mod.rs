//! Route definitions for the Farm Advisor API

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route(
            "/profile",
            get(handlers::get_profile).put(handlers::update_profile),
        )
        .nest("/farms", farm_routes())
        .nest("/crops", crop_routes())
        .nest("/questions", question_routes())
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Auth routes (public)
        .nest("/auth", auth_routes())
        .merge(protected)
}

/// Authentication routes (public)
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/refresh", post(handlers::refresh))
        .route("/logout", post(handlers::logout))
}

/// Farm routes and everything hanging off a farm
fn farm_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_farms).post(handlers::create_farm))
        .route(
            "/:farm_id",
            get(handlers::get_farm)
                .put(handlers::update_farm)
                .delete(handlers::delete_farm),
        )
        .route(
            "/:farm_id/weather",
            get(handlers::list_weather).post(handlers::add_weather),
        )
        .route("/:farm_id/forecast", get(handlers::get_forecast))
        .route(
            "/:farm_id/forecast/recommendations",
            get(handlers::forecast_recommendations),
        )
        .route(
            "/:farm_id/recommendations",
            get(handlers::list_recommendations).post(handlers::create_recommendation),
        )
        .route("/:farm_id/alerts", get(handlers::list_alerts))
        .route("/:farm_id/alerts/check", post(handlers::check_alerts))
        .route(
            "/:farm_id/predictions/rotation",
            get(handlers::list_rotation_predictions).post(handlers::predict_rotation),
        )
        .route(
            "/:farm_id/predictions/yield",
            get(handlers::list_yield_predictions).post(handlers::predict_crop_yield),
        )
}

/// Crop reference data routes
fn crop_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_crops))
        .route("/:crop_id", get(handlers::get_crop))
}

/// Question and answer routes
fn question_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_questions).post(handlers::ask_question))
        .route("/:question_id", get(handlers::get_question))
        .route("/:question_id/answer", post(handlers::answer_question))
}
