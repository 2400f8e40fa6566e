use axum::response::{IntoResponse, Json};
use serde_json::json;

pub async fn root() -> impl IntoResponse {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "message": "Biometric access gateway security core operational",
        "docs": "/docs",
    }))
}
