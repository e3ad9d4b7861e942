use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{missing_id, BillsStore};
use crate::bill::{Bill, CreatedBill, ReceiptFile, UploadedFile};
use crate::error::StoreError;

const DATA_FILE: &str = "bills.json";
const RECEIPTS_DIR: &str = "receipts";

#[derive(Debug, Default, Serialize, Deserialize)]
struct Data {
    #[serde(default)]
    counter: u32,
    #[serde(default)]
    bills: Vec<Value>,
}

/// Store kept in a JSON file, with receipts copied next to it
#[derive(Debug)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn open(root: PathBuf) -> crate::error::Result<Self> {
        fs::create_dir_all(root.join(RECEIPTS_DIR))?;
        Ok(Self { root })
    }

    pub fn data_file(&self) -> PathBuf {
        self.root.join(DATA_FILE)
    }

    fn load(&self) -> Result<Data, StoreError> {
        let path = self.data_file();
        if !path.exists() {
            return Ok(Data::default());
        }
        let content = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn save(&self, data: &Data) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(data)?;
        fs::write(self.data_file(), content)?;
        Ok(())
    }
}

fn next_seq(data: &mut Data) -> u32 {
    data.counter += 1;
    data.counter
}

fn absolute(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

impl BillsStore for LocalStore {
    fn list(&self, user_email: &str) -> Result<Vec<Value>, StoreError> {
        let data = self.load()?;
        debug!(path = %self.data_file().display(), total = data.bills.len(), "local store list");
        Ok(data
            .bills
            .into_iter()
            .filter(|r| match r.get("email").and_then(Value::as_str) {
                Some(email) => email == user_email,
                None => true,
            })
            .collect())
    }

    fn upload(&self, file: &ReceiptFile) -> Result<UploadedFile, StoreError> {
        let mut data = self.load()?;
        let seq = next_seq(&mut data);
        let stored_name = format!("{seq:06}-{}", file.name);
        let path = self.root.join(RECEIPTS_DIR).join(&stored_name);
        fs::write(&path, &file.bytes)?;
        self.save(&data)?;

        debug!(path = %path.display(), bytes = file.bytes.len(), "local store upload");
        Ok(UploadedFile {
            file_url: format!("file://{}", absolute(&path).display()),
            file_name: file.name.clone(),
        })
    }

    fn create(&self, bill: &Bill) -> Result<CreatedBill, StoreError> {
        let mut data = self.load()?;
        let id = format!("bill-{:06}", next_seq(&mut data));
        let mut record = serde_json::to_value(bill)?;
        record["id"] = Value::String(id.clone());
        data.bills.push(record);
        self.save(&data)?;
        Ok(CreatedBill { id })
    }

    fn update(&self, bill: &Bill) -> Result<CreatedBill, StoreError> {
        let id = bill.id.clone().ok_or_else(missing_id)?;
        let mut data = self.load()?;
        let slot = data
            .bills
            .iter_mut()
            .find(|r| r.get("id").and_then(Value::as_str) == Some(id.as_str()))
            .ok_or_else(|| StoreError::with_status(404, format!("Erreur 404: bill {id} not found")))?;
        *slot = serde_json::to_value(bill)?;
        self.save(&data)?;
        Ok(CreatedBill { id })
    }
}
