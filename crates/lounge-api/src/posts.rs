use axum::{Json, extract::State};

use lounge_db::ledger::DEFAULT_FEED_LIMIT;
use lounge_types::api::{PostEntry, PostsResponse};

use crate::auth::{AppState, run_blocking};
use crate::error::ApiError;

/// Public feed, newest first.
pub async fn list_posts(State(state): State<AppState>) -> Result<Json<PostsResponse>, ApiError> {
    let ledger = state.posts.clone();
    let posts = run_blocking(move || Ok(ledger.recent(DEFAULT_FEED_LIMIT)?)).await?;

    Ok(Json(PostsResponse {
        posts: posts.into_iter().map(PostEntry::from).collect(),
    }))
}
