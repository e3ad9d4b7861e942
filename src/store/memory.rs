//! In-memory store, used as the test double for the services.

use serde_json::{json, Value};
use std::cell::{Cell, RefCell};

use super::{missing_id, BillsStore};
use crate::bill::{Bill, CreatedBill, ReceiptFile, UploadedFile};
use crate::error::StoreError;

#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RefCell<Vec<Value>>,
    next_id: Cell<u32>,
    list_calls: Cell<usize>,
    upload_calls: Cell<usize>,
    reject_list: RefCell<Option<StoreError>>,
    reject_upload: RefCell<Option<StoreError>>,
    reject_create: RefCell<Option<StoreError>>,
    reject_update: RefCell<Option<StoreError>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store holding the four reference bills of user `a@a`
    pub fn seeded() -> Self {
        Self::with_records(fixture_bills())
    }

    pub fn with_records(records: Vec<Value>) -> Self {
        Self {
            records: RefCell::new(records),
            ..Self::default()
        }
    }

    pub fn records(&self) -> Vec<Value> {
        self.records.borrow().clone()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.get()
    }

    pub fn upload_calls(&self) -> usize {
        self.upload_calls.get()
    }

    /// Fail the next `list` call only
    pub fn reject_next_list(&self, err: StoreError) {
        *self.reject_list.borrow_mut() = Some(err);
    }

    pub fn reject_next_upload(&self, err: StoreError) {
        *self.reject_upload.borrow_mut() = Some(err);
    }

    pub fn reject_next_create(&self, err: StoreError) {
        *self.reject_create.borrow_mut() = Some(err);
    }

    pub fn reject_next_update(&self, err: StoreError) {
        *self.reject_update.borrow_mut() = Some(err);
    }

    fn next_id(&self) -> String {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        format!("mem-{id:04}")
    }
}

fn take(slot: &RefCell<Option<StoreError>>) -> Result<(), StoreError> {
    match slot.borrow_mut().take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

impl BillsStore for MemoryStore {
    fn list(&self, user_email: &str) -> Result<Vec<Value>, StoreError> {
        self.list_calls.set(self.list_calls.get() + 1);
        take(&self.reject_list)?;
        // like the remote store, records without an email still come back
        Ok(self
            .records
            .borrow()
            .iter()
            .filter(|r| match r.get("email").and_then(Value::as_str) {
                Some(email) => email == user_email,
                None => true,
            })
            .cloned()
            .collect())
    }

    fn upload(&self, file: &ReceiptFile) -> Result<UploadedFile, StoreError> {
        self.upload_calls.set(self.upload_calls.get() + 1);
        take(&self.reject_upload)?;
        Ok(UploadedFile {
            file_url: format!("https://localhost:3456/images/{}", file.name),
            file_name: file.name.clone(),
        })
    }

    fn create(&self, bill: &Bill) -> Result<CreatedBill, StoreError> {
        take(&self.reject_create)?;
        let id = self.next_id();
        let mut record = serde_json::to_value(bill)?;
        record["id"] = Value::String(id.clone());
        self.records.borrow_mut().push(record);
        Ok(CreatedBill { id })
    }

    fn update(&self, bill: &Bill) -> Result<CreatedBill, StoreError> {
        take(&self.reject_update)?;
        let id = bill.id.clone().ok_or_else(missing_id)?;
        let mut records = self.records.borrow_mut();
        let slot = records
            .iter_mut()
            .find(|r| r.get("id").and_then(Value::as_str) == Some(id.as_str()))
            .ok_or_else(|| StoreError::with_status(404, "Erreur 404"))?;
        *slot = serde_json::to_value(bill)?;
        Ok(CreatedBill { id })
    }
}

/// The four reference bills: one pending, one accepted, two refused
pub fn fixture_bills() -> Vec<Value> {
    vec![
        json!({
            "id": "47qAXb6fIm2zOKkLzMro",
            "vat": "80",
            "fileUrl": "https://test.storage.tld/v0/b/billable-677b6.appspot.com/o/justificatifs%2Fpreview-facture-free-201801-pdf-1.jpg?alt=media&token=c1640e12-a24b-4b11-ae52-529112e9602a",
            "status": "pending",
            "type": "Hôtel et logement",
            "commentary": "séminaire billed",
            "name": "encore",
            "fileName": "preview-facture-free-201801-pdf-1.jpg",
            "date": "2004-04-04",
            "amount": 400,
            "commentAdmin": "ok",
            "email": "a@a",
            "pct": 20
        }),
        json!({
            "id": "BeKy5Mo4jkmdfPGYpTxZ",
            "vat": "",
            "amount": 100,
            "name": "test1",
            "fileName": "1592770761.jpeg",
            "commentary": "plop",
            "pct": 20,
            "type": "Transports",
            "email": "a@a",
            "fileUrl": "https://test.storage.tld/v0/b/billable-677b6.appspot.com/o/justificatifs%2F1592770761.jpeg?alt=media&token=7685cd61-c112-42bc-9929-8a799bb82d8b",
            "date": "2001-01-01",
            "status": "refused",
            "commentAdmin": "en fait non"
        }),
        json!({
            "id": "UIUZtnPQvnbFnB0ozvJh",
            "name": "test3",
            "email": "a@a",
            "type": "Services en ligne",
            "vat": "60",
            "pct": 20,
            "commentAdmin": "bon bah d'accord",
            "amount": 300,
            "status": "accepted",
            "date": "2003-03-03",
            "commentary": "",
            "fileName": "facture-client-php-exportee-dans-document-pdf-enregistre-sur-disque-dur.png",
            "fileUrl": "https://test.storage.tld/v0/b/billable-677b6.appspot.com/o/justificatifs%2Ffacture-client-php-exportee-dans-document-pdf-enregistre-sur-disque-dur.png?alt=media&token=571d34cb-9c8f-430a-af52-66221cae1da3"
        }),
        json!({
            "id": "qcCK3SzECmaZAGRrHjaC",
            "status": "refused",
            "pct": 20,
            "amount": 200,
            "email": "a@a",
            "name": "test2",
            "vat": "40",
            "fileName": "preview-facture-free-201801-pdf-1.jpg",
            "date": "2002-02-02",
            "commentAdmin": "pas la bonne facture",
            "commentary": "test2",
            "type": "Restaurants et bars",
            "fileUrl": "https://test.storage.tld/v0/b/billable-677b6.appspot.com/o/justificatifs%2Fpreview-facture-free-201801-pdf-1.jpg?alt=media&token=4df6ed2c-12c8-42a2-b013-346c1346f732"
        }),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bill::list::parse_record;
    use crate::bill::BillStatus;

    #[test]
    fn test_update_replaces_record() {
        let store = MemoryStore::seeded();
        let mut bill = parse_record(&fixture_bills()[0]).unwrap();
        bill.status = BillStatus::Accepted;

        let updated = store.update(&bill).unwrap();
        assert_eq!(updated.id, "47qAXb6fIm2zOKkLzMro");
        let records = store.records();
        assert_eq!(records[0]["status"], "accepted");
    }

    #[test]
    fn test_update_unknown_id_is_not_found() {
        let store = MemoryStore::seeded();
        let mut bill = parse_record(&fixture_bills()[0]).unwrap();
        bill.id = Some("nope".to_string());
        let err = store.update(&bill).unwrap_err();
        assert_eq!(err.status, Some(404));
    }

    #[test]
    fn test_rejected_update_leaves_record_alone() {
        let store = MemoryStore::seeded();
        store.reject_next_update(StoreError::with_status(500, "Erreur 500"));
        let mut bill = parse_record(&fixture_bills()[0]).unwrap();
        bill.status = BillStatus::Refused;

        let err = store.update(&bill).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ServerError);
        assert_eq!(store.records()[0]["status"], "pending");

        // one-shot
        store.update(&bill).unwrap();
        assert_eq!(store.records()[0]["status"], "refused");
    }

    #[test]
    fn test_list_is_scoped_to_user() {
        let store = MemoryStore::seeded();
        assert_eq!(store.list("a@a").unwrap().len(), 4);
        assert!(store.list("b@b").unwrap().is_empty());
    }
}
