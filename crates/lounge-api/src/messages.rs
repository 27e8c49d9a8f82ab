use axum::{Extension, Json, extract::State};

use lounge_db::ledger::DEFAULT_HISTORY_LIMIT;
use lounge_types::api::{MessageEntry, MessagesResponse};

use crate::auth::{AppState, run_blocking};
use crate::error::ApiError;
use crate::middleware::CurrentSession;

/// Chat history for logged-in users, oldest first.
pub async fn get_messages(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
) -> Result<Json<MessagesResponse>, ApiError> {
    current.user()?;

    let ledger = state.messages.clone();
    let history = run_blocking(move || Ok(ledger.recent(DEFAULT_HISTORY_LIMIT)?)).await?;

    Ok(Json(MessagesResponse {
        messages: history.into_iter().map(MessageEntry::from).collect(),
    }))
}
