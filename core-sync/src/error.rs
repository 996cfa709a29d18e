use core_catalog::CatalogError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// The day's catalog could not be fetched, or it was empty
    /// (`CatalogError::NoData`).
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("Invalid sync date: {0:?}")]
    InvalidDate(String),
}

impl SyncError {
    pub fn is_no_data(&self) -> bool {
        matches!(self, SyncError::Catalog(CatalogError::NoData { .. }))
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_message_passes_through() {
        let err: SyncError = CatalogError::NoData {
            date: "2025-08-13".to_string(),
        }
        .into();

        assert!(err.is_no_data());
        assert_eq!(err.to_string(), "2025-08-13 没有找到任何视频数据");
    }
}
