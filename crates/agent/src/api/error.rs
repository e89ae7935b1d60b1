use crate::DispatchError;
use axum::http::StatusCode;

impl DispatchError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            DispatchError::Unauthenticated => StatusCode::UNAUTHORIZED,
            DispatchError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            DispatchError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl axum::response::IntoResponse for DispatchError {
    fn into_response(self) -> axum::response::Response {
        if let DispatchError::Internal(error) = &self {
            tracing::error!(?error, "callable handler failed");
        }
        let body = serde_json::json!({
            "error": {
                "status": self.code(),
                "message": format!("{self:#}"),
            }
        });
        (self.status_code(), axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use axum::response::IntoResponse;

    async fn render(err: DispatchError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_error_rendering() {
        let (status, body) = render(DispatchError::Unauthenticated).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        insta::assert_json_snapshot!(body, @r###"
        {
          "error": {
            "message": "caller must be authenticated",
            "status": "UNAUTHENTICATED"
          }
        }
        "###);

        let (status, body) = render(DispatchError::InvalidArgument(
            "No phone numbers provided".to_string(),
        ))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["status"], "INVALID_ARGUMENT");

        let internal = anyhow::anyhow!("connection refused").context("querying responder directory");
        let (status, body) = render(internal.into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        insta::assert_json_snapshot!(body, @r###"
        {
          "error": {
            "message": "querying responder directory: connection refused",
            "status": "INTERNAL"
          }
        }
        "###);
    }
}
