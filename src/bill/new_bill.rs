use tracing::{debug, info, warn};

use super::format::parse_date;
use super::list::non_negative_integer;
use super::model::{
    Bill, BillStatus, CreatedBill, ExpenseType, Receipt, ReceiptFile, Route, DEFAULT_PCT,
};
use crate::error::{BilledError, Result, SubmitError, UploadError};
use crate::store::BillsStore;

const ALLOWED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Accept only jpg, jpeg and png file names, case-insensitively.
pub fn validate_file_extension(file_name: &str) -> bool {
    match file_name.rsplit_once('.') {
        Some((_, ext)) => ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()),
        None => false,
    }
}

/// A receipt that the store has accepted, ready to be attached to a bill
#[derive(Debug, Clone, PartialEq)]
pub struct StagedUpload {
    pub file: ReceiptFile,
    pub file_url: String,
    pub file_name: String,
}

/// Raw values typed into the new bill form
#[derive(Debug, Clone, PartialEq)]
pub struct BillForm {
    pub name: String,
    pub date: String,
    pub expense_type: ExpenseType,
    pub amount: String,
    pub vat: String,
    pub pct: String,
    pub commentary: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub created: CreatedBill,
    pub next: Route,
}

/// Upload the receipt; nothing is staged unless the store accepted it.
pub fn stage_upload<S>(store: &S, file: ReceiptFile) -> std::result::Result<StagedUpload, UploadError>
where
    S: BillsStore + ?Sized,
{
    match store.upload(&file) {
        Ok(uploaded) => {
            info!(file = file.name.as_str(), url = uploaded.file_url.as_str(), "receipt uploaded");
            Ok(StagedUpload {
                file,
                file_url: uploaded.file_url,
                file_name: uploaded.file_name,
            })
        }
        Err(e) => {
            warn!(file = file.name.as_str(), error = %e, "receipt upload rejected");
            Err(e.into())
        }
    }
}

pub fn build_bill(form: &BillForm, staged: &StagedUpload, session_email: &str) -> Bill {
    Bill {
        id: None,
        email: session_email.to_string(),
        expense_type: form.expense_type,
        name: form.name.clone(),
        amount: coerce_amount(&form.amount),
        date: form.date.clone(),
        vat: coerce_amount(&form.vat),
        pct: coerce_pct(&form.pct),
        commentary: form.commentary.clone(),
        receipt: Some(Receipt {
            file_url: staged.file_url.clone(),
            file_name: staged.file_name.clone(),
        }),
        status: BillStatus::Pending,
        comment_admin: None,
    }
}

/// Persist a new bill. Nothing reaches the store unless the bill is pending
/// and carries its required fields.
pub fn submit<S>(store: &S, bill: &Bill) -> Result<Submission>
where
    S: BillsStore + ?Sized,
{
    check_submittable(bill)?;

    match store.create(bill) {
        Ok(created) => {
            info!(id = created.id.as_str(), name = bill.name.as_str(), "bill created");
            Ok(Submission {
                created,
                next: Route::Bills,
            })
        }
        Err(e) => {
            warn!(name = bill.name.as_str(), error = %e, "bill creation rejected");
            Err(SubmitError::from(e).into())
        }
    }
}

/// Check what a bill must hold before it is first persisted
pub fn check_submittable(bill: &Bill) -> Result<()> {
    if bill.status != BillStatus::Pending {
        return Err(BilledError::NotPending(bill.status.to_string()));
    }
    check_required(bill)
}

/// Check the fields a persisted bill can never lack
pub fn check_required(bill: &Bill) -> Result<()> {
    if bill.email.trim().is_empty() {
        return Err(BilledError::MissingField("email"));
    }
    if bill.name.trim().is_empty() {
        return Err(BilledError::MissingField("name"));
    }
    if bill.date.trim().is_empty() {
        return Err(BilledError::MissingField("date"));
    }
    if parse_date(&bill.date).is_none() {
        return Err(BilledError::InvalidDate(bill.date.clone()));
    }
    Ok(())
}

fn coerce_amount(raw: &str) -> f64 {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite() && *n >= 0.0)
        .unwrap_or(0.0)
}

fn coerce_pct(raw: &str) -> u32 {
    raw.trim()
        .parse::<f64>()
        .ok()
        .and_then(non_negative_integer)
        .unwrap_or(DEFAULT_PCT)
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Idle,
    FileSelected {
        file: ReceiptFile,
        valid_extension: bool,
    },
    Uploading,
    Staged(StagedUpload),
    Submitting,
    Submitted(CreatedBill),
}

/// One pass through the new bill form.
///
/// `Idle -> FileSelected -> Uploading -> Staged -> Submitting -> Submitted`.
/// A rejected upload or submission falls back to `FileSelected` so the user
/// can retry or pick another file. Dropping the session discards any staged
/// receipt.
#[derive(Debug)]
pub struct NewBillSession {
    state: SessionState,
}

impl Default for NewBillSession {
    fn default() -> Self {
        Self::new()
    }
}

impl NewBillSession {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn staged(&self) -> Option<&StagedUpload> {
        match &self.state {
            SessionState::Staged(staged) => Some(staged),
            _ => None,
        }
    }

    /// An invalid extension is recorded and reported but keeps the session open.
    pub fn select_file(&mut self, file: ReceiptFile) -> Result<()> {
        if let SessionState::Submitted(_) = self.state {
            return Err(BilledError::AlreadySubmitted);
        }

        let valid_extension = validate_file_extension(&file.name);
        debug!(file = file.name.as_str(), valid_extension, "receipt selected");
        let name = file.name.clone();
        self.state = SessionState::FileSelected {
            file,
            valid_extension,
        };

        if valid_extension {
            Ok(())
        } else {
            Err(BilledError::InvalidFileExtension(name))
        }
    }

    pub fn upload<S>(&mut self, store: &S) -> Result<&StagedUpload>
    where
        S: BillsStore + ?Sized,
    {
        let file = match std::mem::replace(&mut self.state, SessionState::Uploading) {
            SessionState::FileSelected {
                file,
                valid_extension: true,
            } => file,
            previous => {
                let err = match &previous {
                    SessionState::FileSelected { file, .. } => {
                        BilledError::InvalidFileExtension(file.name.clone())
                    }
                    SessionState::Submitted(_) => BilledError::AlreadySubmitted,
                    _ => BilledError::NoFileSelected,
                };
                self.state = previous;
                return Err(err);
            }
        };

        match stage_upload(store, file.clone()) {
            Ok(staged) => {
                self.state = SessionState::Staged(staged);
                self.staged().ok_or(BilledError::NotStaged)
            }
            Err(e) => {
                self.state = SessionState::FileSelected {
                    file,
                    valid_extension: true,
                };
                Err(e.into())
            }
        }
    }

    pub fn submit<S>(&mut self, store: &S, form: &BillForm, session_email: &str) -> Result<Submission>
    where
        S: BillsStore + ?Sized,
    {
        let staged = match std::mem::replace(&mut self.state, SessionState::Submitting) {
            SessionState::Staged(staged) => staged,
            previous => {
                let err = match &previous {
                    SessionState::Submitted(_) => BilledError::AlreadySubmitted,
                    _ => BilledError::NotStaged,
                };
                self.state = previous;
                return Err(err);
            }
        };

        let bill = build_bill(form, &staged, session_email);
        if let Err(e) = check_submittable(&bill) {
            self.state = SessionState::Staged(staged);
            return Err(e);
        }

        match submit(store, &bill) {
            Ok(submission) => {
                self.state = SessionState::Submitted(submission.created.clone());
                Ok(submission)
            }
            Err(e) => {
                self.state = SessionState::FileSelected {
                    file: staged.file,
                    valid_extension: true,
                };
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, StoreError};
    use crate::store::memory::MemoryStore;

    fn jpg() -> ReceiptFile {
        ReceiptFile::new("test.jpg", "image/jpeg", b"test.jpg".to_vec())
    }

    fn form() -> BillForm {
        BillForm {
            name: "billTesting".to_string(),
            date: "2022-01-24".to_string(),
            expense_type: ExpenseType::Restaurant,
            amount: "100".to_string(),
            vat: "10".to_string(),
            pct: "10".to_string(),
            commentary: String::new(),
        }
    }

    #[test]
    fn test_accepted_extensions() {
        assert!(validate_file_extension("receipt.jpg"));
        assert!(validate_file_extension("receipt.jpeg"));
        assert!(validate_file_extension("receipt.PNG"));
        assert!(validate_file_extension("scan.2022.Jpeg"));
    }

    #[test]
    fn test_rejected_extensions() {
        assert!(!validate_file_extension("receipt.pdf"));
        assert!(!validate_file_extension("receipt"));
        assert!(!validate_file_extension("receipt.docx"));
        assert!(!validate_file_extension("receipt.jpg.exe"));
        assert!(!validate_file_extension(""));
    }

    #[test]
    fn test_validation_is_idempotent() {
        for name in ["receipt.jpg", "receipt.pdf"] {
            assert_eq!(validate_file_extension(name), validate_file_extension(name));
        }
    }

    #[test]
    fn test_build_bill_copies_form_fields() {
        let staged = StagedUpload {
            file: jpg(),
            file_url: "test.jpg".to_string(),
            file_name: "test".to_string(),
        };
        let bill = build_bill(&form(), &staged, "a@a");

        assert_eq!(bill.status, BillStatus::Pending);
        assert_eq!(bill.email, "a@a");
        assert_eq!(bill.name, "billTesting");
        assert_eq!(bill.date, "2022-01-24");
        assert_eq!(bill.expense_type, ExpenseType::Restaurant);
        assert_eq!(bill.amount, 100.0);
        assert_eq!(bill.pct, 10);
        assert_eq!(bill.vat, 10.0);
        assert_eq!(bill.commentary, "");
        assert_eq!(bill.file_url(), Some("test.jpg"));
        assert_eq!(bill.file_name(), Some("test"));
        assert!(bill.id.is_none());
    }

    #[test]
    fn test_non_numeric_fields_fall_back_to_defaults() {
        let staged = StagedUpload {
            file: jpg(),
            file_url: "u".to_string(),
            file_name: "n".to_string(),
        };
        let mut f = form();
        f.amount = "lots".to_string();
        f.vat = String::new();
        f.pct = "ten".to_string();
        let bill = build_bill(&f, &staged, "a@a");
        assert_eq!(bill.amount, 0.0);
        assert_eq!(bill.vat, 0.0);
        assert_eq!(bill.pct, 20);

        f.pct = "-3".to_string();
        assert_eq!(build_bill(&f, &staged, "a@a").pct, 20);
        f.pct = "12.5".to_string();
        assert_eq!(build_bill(&f, &staged, "a@a").pct, 20);
    }

    #[test]
    fn test_end_to_end_submission() {
        let store = MemoryStore::new();
        let staged = StagedUpload {
            file: jpg(),
            file_url: "test.jpg".to_string(),
            file_name: "test".to_string(),
        };
        let bill = build_bill(&form(), &staged, "a@a");
        let submission = submit(&store, &bill).unwrap();

        assert!(!submission.created.id.is_empty());
        assert_eq!(submission.next, Route::Bills);
        assert_eq!(store.records().len(), 1);
    }

    #[test]
    fn test_submit_refuses_non_pending_status() {
        let store = MemoryStore::new();
        let staged = stage_upload(&store, jpg()).unwrap();

        for status in [BillStatus::Accepted, BillStatus::Refused] {
            let mut bill = build_bill(&form(), &staged, "a@a");
            bill.status = status;
            assert!(matches!(
                submit(&store, &bill),
                Err(BilledError::NotPending(_))
            ));
        }
        assert!(store.records().is_empty());
    }

    #[test]
    fn test_submit_refuses_missing_required_fields() {
        let store = MemoryStore::new();
        let staged = stage_upload(&store, jpg()).unwrap();

        let bill = build_bill(&form(), &staged, "");
        assert!(matches!(
            submit(&store, &bill),
            Err(BilledError::MissingField("email"))
        ));

        let mut f = form();
        f.date = String::new();
        let bill = build_bill(&f, &staged, "a@a");
        assert!(matches!(
            submit(&store, &bill),
            Err(BilledError::MissingField("date"))
        ));
        assert!(store.records().is_empty());
    }

    #[test]
    fn test_failed_upload_stages_nothing() {
        let store = MemoryStore::new();
        store.reject_next_upload(StoreError::other("Erreur 500"));

        let err = stage_upload(&store, jpg()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ServerError);

        let mut session = NewBillSession::new();
        session.select_file(jpg()).unwrap();
        store.reject_next_upload(StoreError::other("Erreur 404"));
        assert!(session.upload(&store).is_err());
        assert!(session.staged().is_none());
        assert!(matches!(
            session.state(),
            SessionState::FileSelected {
                valid_extension: true,
                ..
            }
        ));
    }

    #[test]
    fn test_submit_rejection_is_classified() {
        let store = MemoryStore::new();
        store.reject_next_create(StoreError::other("Erreur 404"));
        let staged = stage_upload(&store, jpg()).unwrap();
        let bill = build_bill(&form(), &staged, "a@a");

        match submit(&store, &bill).unwrap_err() {
            BilledError::Submit(e) => assert_eq!(e.kind, ErrorKind::NotFound),
            other => panic!("unexpected error: {other}"),
        }
        assert!(store.records().is_empty());
    }

    #[test]
    fn test_session_happy_path() {
        let store = MemoryStore::new();
        let mut session = NewBillSession::new();
        assert_eq!(session.state(), &SessionState::Idle);

        session.select_file(jpg()).unwrap();
        let staged = session.upload(&store).unwrap();
        assert!(!staged.file_url.is_empty());
        assert_eq!(staged.file_name, "test.jpg");

        let submission = session.submit(&store, &form(), "a@a").unwrap();
        assert_eq!(submission.next, Route::Bills);
        assert!(matches!(session.state(), SessionState::Submitted(_)));

        assert!(matches!(
            session.submit(&store, &form(), "a@a"),
            Err(BilledError::AlreadySubmitted)
        ));
    }

    #[test]
    fn test_invalid_extension_blocks_upload_but_keeps_session() {
        let store = MemoryStore::new();
        let mut session = NewBillSession::new();

        let pdf = ReceiptFile::new("test.pdf", "application/pdf", b"%PDF".to_vec());
        assert!(matches!(
            session.select_file(pdf),
            Err(BilledError::InvalidFileExtension(_))
        ));
        assert!(matches!(
            session.upload(&store),
            Err(BilledError::InvalidFileExtension(_))
        ));
        assert_eq!(store.upload_calls(), 0);

        session.select_file(jpg()).unwrap();
        assert!(session.upload(&store).is_ok());
    }

    #[test]
    fn test_submit_requires_staged_upload() {
        let store = MemoryStore::new();
        let mut session = NewBillSession::new();
        assert!(matches!(
            session.submit(&store, &form(), "a@a"),
            Err(BilledError::NotStaged)
        ));

        session.select_file(jpg()).unwrap();
        assert!(matches!(
            session.submit(&store, &form(), "a@a"),
            Err(BilledError::NotStaged)
        ));
        assert!(store.records().is_empty());
    }

    #[test]
    fn test_missing_fields_keep_upload_staged() {
        let store = MemoryStore::new();
        let mut session = NewBillSession::new();
        session.select_file(jpg()).unwrap();
        session.upload(&store).unwrap();

        let mut f = form();
        f.name = "  ".to_string();
        assert!(matches!(
            session.submit(&store, &f, "a@a"),
            Err(BilledError::MissingField("name"))
        ));

        let mut f = form();
        f.date = "24/01/2022".to_string();
        assert!(matches!(
            session.submit(&store, &f, "a@a"),
            Err(BilledError::InvalidDate(_))
        ));

        assert!(matches!(
            session.submit(&store, &form(), ""),
            Err(BilledError::MissingField("email"))
        ));
        assert!(session.staged().is_some());
        assert!(store.records().is_empty());
    }

    #[test]
    fn test_rejected_submit_returns_to_file_selected() {
        let store = MemoryStore::new();
        let mut session = NewBillSession::new();
        session.select_file(jpg()).unwrap();
        session.upload(&store).unwrap();

        store.reject_next_create(StoreError::other("Erreur 500"));
        let err = session.submit(&store, &form(), "a@a").unwrap_err();
        match err {
            BilledError::Submit(e) => assert_eq!(e.kind, ErrorKind::ServerError),
            other => panic!("unexpected error: {other}"),
        }
        assert!(matches!(session.state(), SessionState::FileSelected { .. }));

        session.upload(&store).unwrap();
        assert!(session.submit(&store, &form(), "a@a").is_ok());
    }
}
