use crate::AppState;
use crate::pipeline::parse_target;
use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use encore_common::{EncoreError, Event};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, warn};

#[derive(Debug, Deserialize)]
pub struct UrlParams {
    pub url: Option<String>,
}

#[derive(Debug, Serialize)]
struct SaveResponse {
    message: &'static str,
    data: Event,
}

/// Maps pipeline failures onto HTTP status codes and `{"error": ...}` bodies.
pub struct ApiError(EncoreError);

impl From<EncoreError> for ApiError {
    fn from(err: EncoreError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            EncoreError::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!(target: "api", error = %self.0, transient = self.0.is_transient(), "api.failed");
        } else {
            warn!(target: "api", error = %self.0, "api.rejected");
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

pub async fn save_entity(
    State(state): State<AppState>,
    Query(params): Query<UrlParams>,
) -> Result<Response, ApiError> {
    let url = parse_target(params.url.as_deref())?;
    let record = state.pipeline.save(&url).await?;
    let body = SaveResponse {
        message: "Entities saved successfully",
        data: record.event,
    };
    Ok(Json(body).into_response())
}

pub async fn get_entity(
    State(state): State<AppState>,
    Query(params): Query<UrlParams>,
) -> Result<Response, ApiError> {
    let url = parse_target(params.url.as_deref())?;
    match state.pipeline.get(&url).await? {
        Some(record) => Ok(Json(record).into_response()),
        None => Ok((
            StatusCode::NOT_FOUND,
            Json(json!({ "message": "No data found for the given URL" })),
        )
            .into_response()),
    }
}
