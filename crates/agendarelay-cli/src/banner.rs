//! Startup banner.

use std::path::Path;

use crate::error::{AppError, AppResult};

/// Reads the banner file.
pub async fn read(path: &Path) -> AppResult<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| AppError::Banner {
            path: path.to_path_buf(),
            source,
        })
}
