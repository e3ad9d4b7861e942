use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::BilledError;

/// VAT rate applied when a bill does not carry one
pub const DEFAULT_PCT: u32 = 20;

/// Expense categories accepted on a bill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ExpenseType {
    Transport,
    Restaurant,
    Hotel,
    OnlineServices,
    It,
    Equipment,
    OfficeSupplies,
}

impl ExpenseType {
    pub const ALL: [ExpenseType; 7] = [
        ExpenseType::Transport,
        ExpenseType::Restaurant,
        ExpenseType::Hotel,
        ExpenseType::OnlineServices,
        ExpenseType::It,
        ExpenseType::Equipment,
        ExpenseType::OfficeSupplies,
    ];

    pub fn slug(&self) -> &'static str {
        match self {
            ExpenseType::Transport => "transport",
            ExpenseType::Restaurant => "restaurant",
            ExpenseType::Hotel => "hotel",
            ExpenseType::OnlineServices => "online-services",
            ExpenseType::It => "it",
            ExpenseType::Equipment => "equipment",
            ExpenseType::OfficeSupplies => "office-supplies",
        }
    }

    /// Label stored on the wire and shown to users
    pub fn label(&self) -> &'static str {
        match self {
            ExpenseType::Transport => "Transports",
            ExpenseType::Restaurant => "Restaurants et bars",
            ExpenseType::Hotel => "Hôtel et logement",
            ExpenseType::OnlineServices => "Services en ligne",
            ExpenseType::It => "IT et électronique",
            ExpenseType::Equipment => "Equipement et matériel",
            ExpenseType::OfficeSupplies => "Fournitures de bureau",
        }
    }
}

impl fmt::Display for ExpenseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ExpenseType {
    type Err = BilledError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        ExpenseType::ALL
            .into_iter()
            .find(|t| t.slug() == wanted || t.label().to_lowercase() == wanted)
            .ok_or_else(|| BilledError::InvalidExpenseType(s.to_string()))
    }
}

impl TryFrom<String> for ExpenseType {
    type Error = BilledError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ExpenseType> for String {
    fn from(value: ExpenseType) -> Self {
        value.label().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillStatus {
    #[default]
    Pending,
    Accepted,
    Refused,
}

impl BillStatus {
    pub fn label(&self) -> &'static str {
        match self {
            BillStatus::Pending => "En attente",
            BillStatus::Accepted => "Accepté",
            BillStatus::Refused => "Refusé",
        }
    }

    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(BillStatus::Pending),
            "accepted" => Some(BillStatus::Accepted),
            "refused" => Some(BillStatus::Refused),
            _ => None,
        }
    }

    pub fn as_wire(&self) -> &'static str {
        match self {
            BillStatus::Pending => "pending",
            BillStatus::Accepted => "accepted",
            BillStatus::Refused => "refused",
        }
    }
}

impl fmt::Display for BillStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

/// Uploaded receipt referenced by a bill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub file_url: String,
    pub file_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bill {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub email: String,
    #[serde(rename = "type")]
    pub expense_type: ExpenseType,
    pub name: String,
    pub amount: f64,
    /// ISO `YYYY-MM-DD`; records read back from a store may hold anything
    pub date: String,
    #[serde(default)]
    pub vat: f64,
    pub pct: u32,
    #[serde(default)]
    pub commentary: String,
    #[serde(flatten)]
    pub receipt: Option<Receipt>,
    #[serde(default)]
    pub status: BillStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment_admin: Option<String>,
}

impl Bill {
    pub fn file_url(&self) -> Option<&str> {
        self.receipt.as_ref().map(|r| r.file_url.as_str())
    }

    pub fn file_name(&self) -> Option<&str> {
        self.receipt.as_ref().map(|r| r.file_name.as_str())
    }
}

/// A bill with presentation-ready fields
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayBill {
    #[serde(flatten)]
    pub bill: Bill,
    pub formatted_date: String,
    pub formatted_status: String,
}

/// A receipt file picked by the user, not yet uploaded
#[derive(Debug, Clone, PartialEq)]
pub struct ReceiptFile {
    pub name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl ReceiptFile {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes,
        }
    }

    /// Read a file from disk, inferring the media type from its extension
    pub fn from_path(path: &Path) -> crate::error::Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let media_type = media_type_for(&name).to_string();
        Ok(Self {
            name,
            media_type,
            bytes,
        })
    }
}

pub fn media_type_for(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

/// Store response to a receipt upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub file_url: String,
    pub file_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedBill {
    pub id: String,
}

/// View to show once a service call succeeds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Bills,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Bills => "#employee/bills",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_expense_type_parses_slug_and_label() {
        assert_eq!("restaurant".parse::<ExpenseType>().unwrap(), ExpenseType::Restaurant);
        assert_eq!(
            "Restaurants et bars".parse::<ExpenseType>().unwrap(),
            ExpenseType::Restaurant
        );
        assert_eq!("HÔTEL ET LOGEMENT".parse::<ExpenseType>().unwrap(), ExpenseType::Hotel);
        assert!("groceries".parse::<ExpenseType>().is_err());
    }

    #[test]
    fn test_bill_serializes_wire_shape() {
        let bill = Bill {
            id: None,
            email: "a@a".to_string(),
            expense_type: ExpenseType::Transport,
            name: "train".to_string(),
            amount: 42.0,
            date: "2022-01-24".to_string(),
            vat: 7.0,
            pct: 20,
            commentary: String::new(),
            receipt: Some(Receipt {
                file_url: "https://example.test/r.jpg".to_string(),
                file_name: "r.jpg".to_string(),
            }),
            status: BillStatus::Pending,
            comment_admin: None,
        };

        let value = serde_json::to_value(&bill).unwrap();
        assert_eq!(value["type"], json!("Transports"));
        assert_eq!(value["status"], json!("pending"));
        assert_eq!(value["fileUrl"], json!("https://example.test/r.jpg"));
        assert_eq!(value["fileName"], json!("r.jpg"));
        assert!(value.get("id").is_none());
    }

    #[test]
    fn test_bill_without_receipt_omits_file_fields() {
        let value = json!({
            "email": "a@a",
            "type": "Transports",
            "name": "bus",
            "amount": 2.0,
            "date": "2022-01-01",
            "pct": 20
        });
        let bill: Bill = serde_json::from_value(value).unwrap();
        assert!(bill.receipt.is_none());
        assert_eq!(bill.status, BillStatus::Pending);

        let back = serde_json::to_value(&bill).unwrap();
        assert!(back.get("fileUrl").is_none());
        assert!(back.get("fileName").is_none());
    }

    #[test]
    fn test_status_wire_names_round_trip() {
        for status in [BillStatus::Pending, BillStatus::Accepted, BillStatus::Refused] {
            assert_eq!(BillStatus::from_wire(&status.to_string()), Some(status));
        }
        assert_eq!(BillStatus::from_wire("approved"), None);
    }

    #[test]
    fn test_media_type_for() {
        assert_eq!(media_type_for("a.JPG"), "image/jpeg");
        assert_eq!(media_type_for("a.png"), "image/png");
        assert_eq!(media_type_for("a"), "application/octet-stream");
    }
}
