use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::handlers::{self, auth, chat, content, generators, library, mood, titles};
use super::AppState;
use crate::middleware::{make_span_with_request_id, request_id_middleware};

/// Creates the main API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        // Catalog
        .route("/search", get(titles::search))
        .route("/movie/:id", get(titles::movie_details))
        .route("/tv/:id", get(titles::tv_details))
        .route("/api/content", get(content::content))
        .route("/api/movies", get(content::content))
        // Mood detection and chat
        .route("/api/detect-mood", post(mood::detect_mood))
        .route("/api/chat", post(chat::chat))
        // Generators
        .route("/api/ai-match", post(generators::ai_match))
        .route("/api/generate-synopsis", post(generators::generate_synopsis))
        .route("/api/movie-mashup", post(generators::movie_mashup))
        .route("/api/predict-success", post(generators::predict_success))
        .route("/api/trivia", post(generators::trivia))
        .route("/api/alternate-ending", post(generators::alternate_ending))
        .route("/api/sequel-idea", post(generators::sequel_idea))
        .route("/api/plot-mood", post(generators::plot_mood))
        // Accounts
        .route("/api/signup", post(auth::sign_up))
        .route("/api/signin", post(auth::sign_in))
        .route("/api/signout", post(auth::sign_out))
        .route("/api/user", get(auth::current_user))
        // Library
        .route(
            "/api/preferences",
            get(library::get_preferences).post(library::update_preferences),
        )
        .route(
            "/api/watchlist",
            get(library::get_watchlist)
                .post(library::add_to_watchlist)
                .delete(library::remove_from_watchlist),
        )
        .route("/api/ratings", get(library::get_ratings).post(library::rate))
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
