use axum::extract::{Multipart, Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use zap_core::{CreateZapInput, CreatedZap, FileUpload, ResolveRequest, Resolution};
use zap_types::ContentKind;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Served content may be rendered but never run scripts or load anything.
pub(crate) const CONTENT_SECURITY_POLICY: &str = "default-src 'none'; sandbox";

/// Success body: `{statusCode, data, message, success: true}`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub status_code: u16,
    pub data: T,
    pub message: String,
    pub success: bool,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(status: StatusCode, data: T, message: impl Into<String>) -> Self {
        Self {
            status_code: status.as_u16(),
            data,
            message: message.into(),
            success: status.is_success(),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::OK);
        (status, Json(self)).into_response()
    }
}

/// Payload returned on creation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedBody {
    pub zap_id: String,
    pub short_url: String,
    pub qr_code: String,
    #[serde(rename = "type")]
    pub kind: ContentKind,
    pub name: Option<String>,
}

impl From<CreatedZap> for CreatedBody {
    fn from(created: CreatedZap) -> Self {
        Self {
            zap_id: created.content_id.to_string(),
            short_url: created.short_url,
            qr_code: created.qr.to_data_uri(),
            kind: created.kind,
            name: created.name,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Health check handler.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Info handler.
pub async fn info_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": "zap-server",
        "version": env!("CARGO_PKG_VERSION"),
        "repository": state.config.repository.backend_name(),
        "content": state.config.content.backend_name(),
        "maxUploadBytes": state.config.max_upload_bytes,
    }))
}

/// `POST /api/zaps/upload`
pub async fn upload_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<ApiResponse<CreatedBody>> {
    let mut input = CreateZapInput::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await?;
                input.file = Some(FileUpload {
                    bytes,
                    file_name,
                    content_type,
                });
            }
            "type" => input.kind = Some(field.text().await?),
            "name" => input.name = Some(field.text().await?),
            "originalUrl" => input.original_url = Some(field.text().await?),
            "password" => input.password = Some(field.text().await?),
            "viewLimit" => input.view_limit = Some(field.text().await?),
            "expiresAt" => input.expires_at = Some(field.text().await?),
            "selfDestruct" => input.self_destruct = Some(field.text().await?),
            other => tracing::debug!(field = other, "ignoring unknown upload field"),
        }
    }

    let created = state.controller.create(input.validate()?).await?;
    Ok(ApiResponse::new(
        StatusCode::CREATED,
        CreatedBody::from(created),
        "Zap created successfully.",
    ))
}

#[derive(Debug, Default, Deserialize)]
pub struct ResolveQuery {
    pub password: Option<String>,
}

/// `GET /api/zaps/:short_id`
pub async fn resolve_handler(
    State(state): State<AppState>,
    Path(short_id): Path<String>,
    Query(query): Query<ResolveQuery>,
    headers: HeaderMap,
) -> Response {
    let request = ResolveRequest {
        short_code: short_id,
        password: query.password,
        prefers_interactive: prefers_html(&headers),
    };

    match state.controller.resolve(&request).await {
        Ok(Resolution::Inline {
            content_type,
            bytes,
        }) => {
            let headers = [
                (header::CONTENT_TYPE, content_type.as_str()),
                (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
                (header::CONTENT_SECURITY_POLICY, CONTENT_SECURITY_POLICY),
            ];
            (headers, bytes).into_response()
        }
        Ok(Resolution::Redirect { location }) => found(&location),
        Ok(Resolution::ErrorPage { location, reason }) => {
            tracing::debug!(short_code = %request.short_code, reason, "redirecting to error page");
            found(&location)
        }
        Err(err) => ApiError::from(err).into_response(),
    }
}

/// Browsers navigating to a short link send `Accept: text/html`.
fn prefers_html(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("text/html"))
}

fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}
