use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::format::{format_date, format_status};
use super::model::{Bill, BillStatus, DisplayBill, ExpenseType, Receipt, DEFAULT_PCT};
use crate::error::FetchError;
use crate::store::BillsStore;

/// Fetch the user's bills, drop malformed records and return them newest first.
pub fn list_bills<S>(store: &S, user_email: &str) -> Result<Vec<DisplayBill>, FetchError>
where
    S: BillsStore + ?Sized,
{
    let records = store.list(user_email).map_err(|e| {
        warn!(email = user_email, error = %e, "bill fetch rejected");
        FetchError::from(e)
    })?;
    debug!(count = records.len(), "fetched raw bill records");

    let mut bills: Vec<Bill> = records
        .into_iter()
        .filter_map(|record| match parse_record(&record) {
            Ok(bill) => Some(bill),
            Err(reason) => {
                warn!(id = record_id(&record), reason, "skipping malformed bill record");
                None
            }
        })
        .filter(|bill| {
            let mine = bill.email == user_email;
            if !mine {
                debug!(id = bill.id.as_deref().unwrap_or("-"), "skipping bill of another user");
            }
            mine
        })
        .collect();

    sort_newest_first(&mut bills);

    Ok(bills.into_iter().map(to_display).collect())
}

/// Stable sort on the raw ISO date string, most recent first
pub fn sort_newest_first(bills: &mut [Bill]) {
    bills.sort_by(|a, b| b.date.cmp(&a.date));
}

pub fn to_display(bill: Bill) -> DisplayBill {
    let formatted_date = match format_date(&bill.date) {
        Some(d) => d,
        None => {
            warn!(
                id = bill.id.as_deref().unwrap_or("-"),
                date = bill.date.as_str(),
                "unparsable bill date, keeping raw value"
            );
            bill.date.clone()
        }
    };
    let formatted_status = format_status(bill.status).to_string();
    DisplayBill {
        bill,
        formatted_date,
        formatted_status,
    }
}

fn record_id(record: &Value) -> &str {
    record.get("id").and_then(Value::as_str).unwrap_or("-")
}

/// Coerce one dynamic store record into a typed bill
pub fn parse_record(record: &Value) -> Result<Bill, &'static str> {
    let obj = record.as_object().ok_or("record is not an object")?;

    let email = required_str(obj, "email").ok_or("missing email")?;
    let name = required_str(obj, "name").ok_or("missing name")?;
    let date = required_str(obj, "date").ok_or("missing date")?;
    let expense_type = required_str(obj, "type")
        .ok_or("missing type")?
        .parse::<ExpenseType>()
        .map_err(|_| "unknown expense type")?;

    let amount = obj
        .get("amount")
        .and_then(as_number)
        .filter(|a| *a >= 0.0)
        .ok_or("missing or invalid amount")?;

    // optional field: an unreadable vat reads as 0
    let vat = match obj.get("vat") {
        None | Some(Value::Null) => 0.0,
        Some(Value::String(s)) if s.trim().is_empty() => 0.0,
        Some(v) => as_number(v).unwrap_or_else(|| {
            warn!(id = record_id(record), vat = %v, "invalid vat, using 0");
            0.0
        }),
    };

    let pct = match obj.get("pct") {
        None | Some(Value::Null) => DEFAULT_PCT,
        Some(Value::String(s)) if s.trim().is_empty() => DEFAULT_PCT,
        Some(v) => as_number(v)
            .and_then(non_negative_integer)
            .ok_or("invalid pct")?,
    };

    let status = match obj.get("status") {
        None | Some(Value::Null) => BillStatus::Pending,
        Some(Value::String(s)) => BillStatus::from_wire(s).ok_or("unknown status")?,
        Some(_) => return Err("unknown status"),
    };

    let receipt = match (
        optional_str(obj, "fileUrl"),
        optional_str(obj, "fileName"),
    ) {
        (Some(file_url), Some(file_name)) => Some(Receipt {
            file_url,
            file_name,
        }),
        (None, None) => None,
        _ => return Err("fileUrl and fileName must be set together"),
    };

    Ok(Bill {
        id: optional_str(obj, "id"),
        email,
        expense_type,
        name,
        amount,
        date,
        vat,
        pct,
        commentary: optional_str(obj, "commentary").unwrap_or_default(),
        receipt,
        status,
        comment_admin: optional_str(obj, "commentAdmin"),
    })
}

fn required_str(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

fn optional_str(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
}

pub(crate) fn non_negative_integer(n: f64) -> Option<u32> {
    if n >= 0.0 && n.fract() == 0.0 && n <= f64::from(u32::MAX) {
        Some(n as u32)
    } else {
        None
    }
}
