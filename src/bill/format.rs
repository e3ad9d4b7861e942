use chrono::{Datelike, NaiveDate};

use super::model::BillStatus;

const MONTHS: [&str; 12] = [
    "Jan", "Fév", "Mar", "Avr", "Mai", "Jui", "Jui", "Aoû", "Sep", "Oct", "Nov", "Déc",
];

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

/// Format an ISO date as a short French date, e.g. "2004-04-04" -> "4 Avr. 04".
/// Returns None when the input is not a calendar date.
pub fn format_date(raw: &str) -> Option<String> {
    let date = parse_date(raw)?;
    let month = MONTHS[date.month0() as usize];
    Some(format!(
        "{} {}. {:02}",
        date.day(),
        month,
        date.year().rem_euclid(100)
    ))
}

pub fn format_status(status: BillStatus) -> &'static str {
    status.label()
}
