use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CspError {
    #[error("Crypto error: {0}")]
    CryptoError(String),

    #[error("Invalid request host: {0}")]
    InvalidHost(String),

    #[error("Header processing error: {0}")]
    HeaderError(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ResponseError for CspError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidHost(_) => StatusCode::BAD_REQUEST,

            Self::CryptoError(_)
            | Self::HeaderError(_)
            | Self::ConfigError(_)
            | Self::IoError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            // Internal details stay in the log, never in the page.
            HttpResponse::build(status)
                .content_type("text/plain; charset=utf-8")
                .body("Internal Server Error")
        } else {
            HttpResponse::build(status)
                .content_type("text/plain; charset=utf-8")
                .body(self.to_string())
        }
    }
}
