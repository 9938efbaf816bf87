use axum::response::Json;
use serde_json::{json, Value};

/// Liveness probe: reports the running version and current server time.
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().timestamp(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_check() {
        let response = health_check().await;
        let value = response.0;

        assert_eq!(value["status"], "ok");
        assert!(value["version"].is_string());
        assert!(value["timestamp"].is_number());
    }
}
