pub mod emergency;
pub mod store;

pub use emergency::{EmergencyLog, RecoverySummary};
pub use store::TenantStore;

use std::path::PathBuf;

use crate::error::{Result, StorageError};

/// Returns `~/.config/streamtimer[-dev]/` based on STREAMTIMER_ENV.
///
/// Set STREAMTIMER_ENV=dev to use the development data directory, or
/// STREAMTIMER_DATA_DIR to point somewhere else entirely (tests use this).
///
/// # Errors
/// Returns an error if the directory cannot be created.
pub fn data_dir() -> Result<PathBuf> {
    let dir = match std::env::var("STREAMTIMER_DATA_DIR") {
        Ok(custom) => PathBuf::from(custom),
        Err(_) => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("STREAMTIMER_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("streamtimer-dev")
            } else {
                base_dir.join("streamtimer")
            }
        }
    };

    std::fs::create_dir_all(&dir).map_err(|source| StorageError::DataDir {
        path: dir.clone(),
        source,
    })?;
    Ok(dir)
}
