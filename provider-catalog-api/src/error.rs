//! Error types for the catalog API provider

use bridge_traits::error::BridgeError;
use core_catalog::CatalogError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    /// The backend answered with a non-success status. `message` is its
    /// `detail` text when it sent one.
    #[error("Catalog API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse API response: {0}")]
    Parse(String),

    /// Rejected locally, nothing was sent.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

pub type Result<T> = std::result::Result<T, ProviderError>;

impl From<ProviderError> for CatalogError {
    fn from(error: ProviderError) -> Self {
        match error {
            ProviderError::Api { status, message } => CatalogError::Protocol { status, message },
            ProviderError::Parse(msg) => CatalogError::Decode(msg),
            ProviderError::InvalidRequest(msg) => CatalogError::Validation(msg),
            ProviderError::Bridge(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = ProviderError::Api {
            status: 404,
            message: "数据库中不存在视频 BV1xx".to_string(),
        };

        assert_eq!(
            error.to_string(),
            "Catalog API error (status 404): 数据库中不存在视频 BV1xx"
        );
    }

    #[test]
    fn test_api_error_keeps_server_message_for_display() {
        let error: CatalogError = ProviderError::Api {
            status: 400,
            message: "爬虫正在运行中".to_string(),
        }
        .into();

        assert_eq!(error.status(), Some(400));
        assert_eq!(error.to_string(), "爬虫正在运行中");
    }

    #[test]
    fn test_bridge_error_becomes_network_failure() {
        let error: CatalogError = ProviderError::Bridge(BridgeError::Network(
            "connection refused".to_string(),
        ))
        .into();

        assert!(error.is_network());
    }
}
