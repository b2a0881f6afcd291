//! API endpoints.

mod admin;
mod forms;
mod invite;
mod resolver;
mod results;
mod vote;

use axum::{routing::get, Router};

use crate::middleware::AppState;
use crate::streaming;

pub use forms::{FormResponse, OptionResponse, QuestionResponse};

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest(
            "/forms",
            forms::router()
                .merge(invite::router())
                .merge(vote::router())
                .merge(results::router()),
        )
        .route("/forms/{form_id}/presence", get(streaming::presence_handler))
        .nest("/admin", admin::router())
        .merge(resolver::router())
}
