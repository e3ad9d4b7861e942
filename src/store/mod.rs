mod http;
mod local;
pub mod memory;

pub use http::HttpStore;
pub use local::LocalStore;
pub use memory::MemoryStore;

use serde_json::Value;
use std::path::Path;

use crate::bill::{Bill, CreatedBill, ReceiptFile, UploadedFile};
use crate::config::{resolve_data_dir, Config};
use crate::error::{BilledError, Result, StoreError};

/// Remote data access for bill records and receipt files.
///
/// `list` hands back raw records: the services validate and coerce them.
pub trait BillsStore {
    fn list(&self, user_email: &str) -> std::result::Result<Vec<Value>, StoreError>;

    fn upload(&self, file: &ReceiptFile) -> std::result::Result<UploadedFile, StoreError>;

    fn create(&self, bill: &Bill) -> std::result::Result<CreatedBill, StoreError>;

    /// Replace an existing bill, matched on `bill.id`
    fn update(&self, bill: &Bill) -> std::result::Result<CreatedBill, StoreError>;
}

/// Open the store backend selected in config.toml
pub fn open(config: &Config, cfg_dir: &Path) -> Result<Box<dyn BillsStore>> {
    match config.store.backend.as_str() {
        "local" => {
            let data_dir = resolve_data_dir(&config.store.data_dir, cfg_dir);
            Ok(Box::new(LocalStore::open(data_dir)?))
        }
        "http" => {
            let base_url = config
                .store
                .base_url
                .clone()
                .ok_or(BilledError::MissingBaseUrl)?;
            Ok(Box::new(HttpStore::new(
                base_url,
                config.store.token.clone(),
                config.store.timeout_secs,
            )))
        }
        other => Err(BilledError::UnknownBackend(other.to_string())),
    }
}

pub(crate) fn missing_id() -> StoreError {
    StoreError::with_status(404, "Erreur 404: bill has no id")
}
