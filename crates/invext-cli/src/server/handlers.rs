//! HTTP request handlers for API endpoints

use axum::Json;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::{error, info, warn};

use invext_core::{CanonicalInvoice, ExtractionResult, InvextError, VendorInvoices};

use super::ApiState;

/// Multipart part carrying the document.
const FILE_PART: &str = "file";

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Error body `{"detail": ...}` with a status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "detail": self.detail })),
        )
            .into_response()
    }
}

impl From<InvextError> for ApiError {
    fn from(err: InvextError) -> Self {
        match err {
            InvextError::Rejected(reason) => {
                Self::new(StatusCode::BAD_REQUEST, format!("Invalid document: {}", reason))
            }
            InvextError::Analysis(e) => {
                error!("Analysis service failed: {}", e);
                Self::new(StatusCode::BAD_GATEWAY, format!("Document analysis failed: {}", e))
            }
            other => {
                error!("Request failed: {}", other);
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, other.to_string())
            }
        }
    }
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Extract an invoice from the uploaded `file` part.
pub async fn extract_invoice(
    State(state): State<ApiState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ExtractionResult>, ApiError> {
    let mut multipart = multipart.map_err(|e| {
        warn!("Upload is not a multipart form: {}", e.body_text());
        ApiError::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("Missing multipart field '{}'", FILE_PART),
        )
    })?;

    let mut document = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::new(e.status(), e.body_text()))?
    {
        if field.name() == Some(FILE_PART) {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::new(e.status(), e.body_text()))?;
            document = Some(bytes);
            break;
        }
    }

    let Some(document) = document else {
        warn!("Upload without a '{}' part", FILE_PART);
        return Err(ApiError::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("Missing multipart field '{}'", FILE_PART),
        ));
    };

    info!("Extraction request: {} bytes", document.len());
    let pipeline = state.pipeline.clone();
    let result = tokio::task::spawn_blocking(move || pipeline.submit(&document))
        .await
        .map_err(|e| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))??;

    Ok(Json(result))
}

/// Stored invoice by identifier.
pub async fn get_invoice(
    State(state): State<ApiState>,
    Path(invoice_id): Path<String>,
) -> Result<Json<CanonicalInvoice>, ApiError> {
    let pipeline = state.pipeline.clone();
    let found = tokio::task::spawn_blocking(move || pipeline.invoice_by_id(&invoice_id))
        .await
        .map_err(|e| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))??;

    found
        .map(Json)
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, "Invoice not found"))
}

/// Stored invoices of a vendor, oldest first.
pub async fn get_vendor_invoices(
    State(state): State<ApiState>,
    Path(vendor_name): Path<String>,
) -> Result<Json<VendorInvoices>, ApiError> {
    let pipeline = state.pipeline.clone();
    let listing = tokio::task::spawn_blocking(move || pipeline.invoices_by_vendor(&vendor_name))
        .await
        .map_err(|e| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))??;

    Ok(Json(listing))
}
