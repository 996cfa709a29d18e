use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Core initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Runtime error: {0}")]
    Runtime(#[from] core_runtime::Error),

    /// Gateway and catalog failures; the message is shown as-is.
    #[error(transparent)]
    Catalog(#[from] core_catalog::CatalogError),

    #[error(transparent)]
    Sync(#[from] core_sync::SyncError),
}

pub type Result<T> = std::result::Result<T, CoreError>;
