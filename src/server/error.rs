use crate::error::GatewayError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Error returned by handlers, rendered as a plain-text body.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    BadGateway(String),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::BadGateway(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Connection(_) => Self::BadGateway(err.to_string()),
            GatewayError::Transfer(_) | GatewayError::Navigation(_) | GatewayError::Worker(_) => {
                Self::Internal(err.to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(%status, error = %self, "request failed");
        } else {
            tracing::debug!(%status, error = %self, "request rejected");
        }
        (status, self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConnectionError, NavigationError, RemoteError};

    #[test]
    fn test_gateway_error_mapping() {
        let err: AppError = GatewayError::from(ConnectionError::Login {
            user: "ftp".to_string(),
            source: RemoteError::new(530, "Login incorrect."),
        })
        .into();
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);

        let err: AppError = GatewayError::from(NavigationError::ChangeDirectory {
            name: "missing".to_string(),
            source: RemoteError::new(550, "Failed to change directory."),
        })
        .into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.to_string().contains("550"));
    }

    #[test]
    fn test_into_response_status() {
        let response = AppError::BadRequest("missing field".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
