use axum::{extract::State, http::StatusCode};

use crate::AppState;

/// GET /health — liveness probe backed by a trivial database query.
pub async fn health(State(state): State<AppState>) -> (StatusCode, &'static str) {
    match state.db.ping() {
        Ok(()) => (StatusCode::OK, "OK"),
        Err(e) => {
            tracing::error!("health check failed: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, "ERROR")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::testing;

    #[tokio::test]
    async fn health_reports_ok() {
        let (status, body) = health(State(testing::state())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "OK");
    }
}
