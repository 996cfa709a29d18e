use bridge_traits::error::BridgeError;
use thiserror::Error;

/// Failures surfaced by the catalog gateway and the components built on it.
///
/// Data absence is *not* an error here except where a caller explicitly
/// requires data (`NoData`, used by batch synchronization).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// Transport-level failure, no response was received.
    #[error("Network error: {0}")]
    Network(String),

    /// Non-success status. `message` is the server's own text when it sent one.
    #[error("{message}")]
    Protocol { status: u16, message: String },

    /// Caller-supplied arguments are insufficient; nothing was sent.
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{date} 没有找到任何视频数据")]
    NoData { date: String },

    /// The response arrived but its payload did not have the expected shape.
    #[error("Malformed response: {0}")]
    Decode(String),

    #[error("Invalid zone definition: {0}")]
    InvalidDefinition(String),
}

impl CatalogError {
    pub fn is_network(&self) -> bool {
        matches!(self, CatalogError::Network(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, CatalogError::Validation(_))
    }

    /// HTTP status for protocol failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            CatalogError::Protocol { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<BridgeError> for CatalogError {
    fn from(error: BridgeError) -> Self {
        CatalogError::Network(error.to_string())
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(error: serde_json::Error) -> Self {
        CatalogError::Decode(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_displays_server_message_verbatim() {
        let err = CatalogError::Protocol {
            status: 400,
            message: "爬取任务已在运行中".to_string(),
        };
        assert_eq!(err.to_string(), "爬取任务已在运行中");
        assert_eq!(err.status(), Some(400));
    }

    #[test]
    fn test_bridge_errors_are_network_failures() {
        let err: CatalogError = BridgeError::Timeout(10_000).into();
        assert!(err.is_network());
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_no_data_message_names_date() {
        let err = CatalogError::NoData {
            date: "2025-08-13".to_string(),
        };
        assert_eq!(err.to_string(), "2025-08-13 没有找到任何视频数据");
    }
}
