use http::StatusCode;
use std::string::FromUtf8Error;
use std::time::Duration;
use tracelink_http::{ClientError, HttpError};

/// Why a handler could not produce its normal answer.
#[derive(thiserror::Error, Debug)]
pub enum HandlerError {
    /// The downstream service could not be reached or broke the connection.
    #[error("downstream call failed: {0}")]
    Downstream(#[source] HttpError),

    /// The downstream service did not answer within the configured timeout.
    #[error("downstream call timed out after {0:?}")]
    DownstreamTimeout(Duration),

    /// The downstream service answered with a non-success status.
    #[error("downstream answered with status {0}")]
    DownstreamStatus(StatusCode),

    /// The downstream body was not UTF-8.
    #[error("downstream answered with an invalid body: {0}")]
    InvalidResponse(#[from] FromUtf8Error),

    /// The outbound request could not be built.
    #[error("could not build the downstream request: {0}")]
    Request(#[from] http::Error),
}

impl HandlerError {
    /// Status returned to the caller.
    pub fn status(&self) -> StatusCode {
        match self {
            HandlerError::Request(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<HttpError> for HandlerError {
    fn from(err: HttpError) -> Self {
        match err.downcast_ref::<ClientError>() {
            Some(ClientError::Timeout(timeout)) => HandlerError::DownstreamTimeout(*timeout),
            Some(ClientError::Status(status)) => HandlerError::DownstreamStatus(*status),
            _ => HandlerError::Downstream(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_are_classified() {
        let timeout: HttpError = ClientError::Timeout(Duration::from_millis(10)).into();
        assert!(matches!(
            HandlerError::from(timeout),
            HandlerError::DownstreamTimeout(t) if t == Duration::from_millis(10)
        ));

        let status: HttpError = ClientError::Status(StatusCode::NOT_FOUND).into();
        let err = HandlerError::from(status);
        assert!(matches!(err, HandlerError::DownstreamStatus(StatusCode::NOT_FOUND)));
        assert_eq!(err.to_string(), "downstream answered with status 404 Not Found");

        let other: HttpError = "connection refused".into();
        let err = HandlerError::from(other);
        assert!(matches!(err, HandlerError::Downstream(_)));
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn every_downstream_failure_is_a_bad_gateway() {
        let errors = [
            HandlerError::DownstreamTimeout(Duration::from_secs(1)),
            HandlerError::DownstreamStatus(StatusCode::INTERNAL_SERVER_ERROR),
            HandlerError::from(String::from_utf8(vec![0xff]).unwrap_err()),
        ];
        for err in errors {
            assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        }
    }
}
