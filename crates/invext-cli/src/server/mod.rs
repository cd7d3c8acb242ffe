//! HTTP service exposing extraction and invoice lookups.

mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use invext_core::ExtractionPipeline;

/// State shared across handlers.
#[derive(Clone)]
pub struct ApiState {
    pub pipeline: Arc<ExtractionPipeline>,
    pub max_upload_bytes: usize,
}

impl ApiState {
    pub fn new(pipeline: Arc<ExtractionPipeline>, max_upload_bytes: usize) -> Self {
        Self {
            pipeline,
            max_upload_bytes,
        }
    }
}

/// Build the API router with all endpoints.
pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/extract", post(handlers::extract_invoice))
        .route("/invoice/{invoice_id}", get(handlers::get_invoice))
        .route("/invoices/vendor/{vendor_name}", get(handlers::get_vendor_invoices))
        .layer(DefaultBodyLimit::max(state.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve until the process stops.
pub async fn start_server(addr: &str, state: ApiState) -> Result<(), std::io::Error> {
    tracing::info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, build_router(state)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use invext_core::normalize::DEFAULT_MIN_CONFIDENCE;
    use invext_core::{
        FieldSchema, FixtureAnalyzer, GroupEncoding, InvoiceStore, RawFieldTree, TreeBuilder,
    };
    use invext_core::models::invoice::UNKNOWN_VENDOR;
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};

    fn tree(vendor: &str, invoice_id: &str, date: &str, confidence: f64) -> RawFieldTree {
        TreeBuilder::new()
            .page(|p| {
                p.field("VendorName", vendor, 0.95)
                    .field("InvoiceId", invoice_id, 0.99)
                    .field("InvoiceDate", date, 0.9)
                    .items(GroupEncoding::Direct, |g| {
                        g.row(|r| r.field("Description", "Pen").field("Quantity", 3))
                    })
            })
            .classification("INVOICE", confidence)
            .build()
    }

    struct TestServer {
        base: String,
        handle: tokio::task::JoinHandle<()>,
    }

    impl Drop for TestServer {
        fn drop(&mut self) {
            self.handle.abort();
        }
    }

    async fn spawn(tree: RawFieldTree, store: Arc<InvoiceStore>) -> TestServer {
        let pipeline =
            ExtractionPipeline::new(Box::new(FixtureAnalyzer::new(tree))).with_store(store);
        let state = ApiState::new(Arc::new(pipeline), 1024 * 1024);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, build_router(state)).await.unwrap();
        });

        TestServer {
            base: format!("http://{}", addr),
            handle,
        }
    }

    fn memory_store() -> Arc<InvoiceStore> {
        Arc::new(InvoiceStore::open_in_memory(FieldSchema::default()).unwrap())
    }

    async fn upload(base: &str, part_name: &str) -> reqwest::Response {
        let part = reqwest::multipart::Part::bytes(b"%PDF-1.4 invoice".to_vec())
            .file_name("invoice.pdf");
        let form = reqwest::multipart::Form::new().part(part_name.to_string(), part);
        reqwest::Client::new()
            .post(format!("{}/extract", base))
            .multipart(form)
            .send()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let server = spawn(tree("A", "1", "2024-01-01", 0.99), memory_store()).await;

        let response = reqwest::get(format!("{}/health", server.base)).await.unwrap();

        assert_eq!(response.status(), 200);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["status"], "ok");
        assert!(body["version"].is_string());
    }

    #[tokio::test]
    async fn test_extract_then_lookup() {
        let store = memory_store();
        let server = spawn(tree("SuperStore", "36259", "2012-03-06", 0.97), Arc::clone(&store)).await;

        let response = upload(&server.base, "file").await;
        assert_eq!(response.status(), 200);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["confidence"], json!(0.97));
        assert_eq!(body["data"]["VendorName"], "SuperStore");
        assert_eq!(body["data"]["InvoiceTotal"], Value::Null);
        assert_eq!(body["data"]["Items"][0]["Quantity"], 3);
        assert_eq!(body["dataConfidence"]["InvoiceId"], json!(0.99));
        assert!(body["predictionTime"].is_number());

        let response = reqwest::get(format!("{}/invoice/36259", server.base)).await.unwrap();
        assert_eq!(response.status(), 200);
        let invoice: Value = response.json().await.unwrap();
        assert_eq!(invoice, body["data"]);

        let response = reqwest::get(format!("{}/invoices/vendor/SuperStore", server.base))
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        let listing: Value = response.json().await.unwrap();
        assert_eq!(listing["VendorName"], "SuperStore");
        assert_eq!(listing["TotalInvoices"], 1);
        assert_eq!(listing["invoices"][0], body["data"]);
    }

    #[tokio::test]
    async fn test_low_confidence_is_bad_request() {
        let store = memory_store();
        let server = spawn(
            tree("Nobody", "1", "2024-01-01", DEFAULT_MIN_CONFIDENCE - 0.01),
            Arc::clone(&store),
        )
        .await;

        let response = upload(&server.base, "file").await;

        assert_eq!(response.status(), 400);
        let body: Value = response.json().await.unwrap();
        assert!(body["detail"].as_str().unwrap().starts_with("Invalid document"));
        assert_eq!(store.invoice_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_missing_file_part() {
        let server = spawn(tree("A", "1", "2024-01-01", 0.99), memory_store()).await;

        let response = upload(&server.base, "document").await;

        assert_eq!(response.status(), 422);
    }

    #[tokio::test]
    async fn test_extract_without_body() {
        let store = memory_store();
        let server = spawn(tree("A", "1", "2024-01-01", 0.99), Arc::clone(&store)).await;

        let response = reqwest::Client::new()
            .post(format!("{}/extract", server.base))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 422);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body, json!({"detail": "Missing multipart field 'file'"}));
        assert_eq!(store.invoice_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unknown_invoice_and_vendor() {
        let server = spawn(tree("A", "1", "2024-01-01", 0.99), memory_store()).await;

        let response = reqwest::get(format!("{}/invoice/404", server.base)).await.unwrap();
        assert_eq!(response.status(), 404);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body, json!({"detail": "Invoice not found"}));

        let response = reqwest::get(format!("{}/invoices/vendor/Nobody%20Inc", server.base))
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        let body: Value = response.json().await.unwrap();
        assert_eq!(
            body,
            json!({"VendorName": UNKNOWN_VENDOR, "TotalInvoices": 0, "invoices": []})
        );
    }
}
