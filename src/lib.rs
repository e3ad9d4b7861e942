pub mod bill;
pub mod config;
pub mod error;
pub mod store;

pub use bill::{
    build_bill, list_bills, stage_upload, submit, validate_file_extension, Bill, BillForm,
    BillStatus, DisplayBill, ExpenseType, NewBillSession,
};
pub use config::{Config, Session, UserType};
pub use error::{BilledError, ErrorKind, FetchError, Result, StoreError, SubmitError, UploadError};
pub use store::{BillsStore, HttpStore, LocalStore, MemoryStore};
