use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use crate::error::CHAT_FAILURE_MESSAGE;
use crate::web::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatReply {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
}

/// Settings the browser needs to call the weather provider directly.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    pub open_weather_api_key: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    pub version: String,
    /// Cities loaded so far; 0 while the catalog is still loading
    pub cities: usize,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/config", get(get_config))
        .route("/api/health", get(get_health))
        .route("/chat", post(post_chat))
}

async fn get_config(State(state): State<AppState>) -> Json<ClientConfig> {
    Json(ClientConfig {
        open_weather_api_key: state.weather_api_key.to_string(),
    })
}

async fn get_health(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
        cities: state.catalog.get().len(),
    })
}

async fn post_chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatReply>, (StatusCode, Json<ApiError>)> {
    match state
        .chat
        .respond(&request.message, state.catalog.get())
        .await
    {
        Ok(message) => Ok(Json(ChatReply { message })),
        Err(e) => {
            // Detail stays in the log; the browser always gets the same body
            tracing::error!("Error during chat interaction: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError {
                    error: CHAT_FAILURE_MESSAGE.to_string(),
                }),
            ))
        }
    }
}
