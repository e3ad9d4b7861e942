pub mod format;
pub mod list;
mod model;
pub mod new_bill;
pub mod receipt;

pub use format::{format_date, format_status};
pub use list::list_bills;
pub use model::{
    media_type_for, Bill, BillStatus, CreatedBill, DisplayBill, ExpenseType, Receipt, ReceiptFile,
    Route, UploadedFile, DEFAULT_PCT,
};
pub use new_bill::{
    build_bill, check_submittable, stage_upload, submit, validate_file_extension, BillForm,
    NewBillSession, SessionState, StagedUpload, Submission,
};
pub use receipt::{preview, ReceiptPreview};
