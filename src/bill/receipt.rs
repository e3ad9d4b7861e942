use super::model::Bill;
use super::new_bill::validate_file_extension;
use crate::error::{BilledError, Result};

/// What the receipt viewer needs to show an attached image
#[derive(Debug, Clone, PartialEq)]
pub struct ReceiptPreview {
    pub url: String,
    pub file_name: String,
}

pub fn preview(bill: &Bill) -> Result<ReceiptPreview> {
    let id = bill.id.clone().unwrap_or_default();
    let receipt = bill.receipt.as_ref().ok_or(BilledError::NoReceipt(id))?;

    // signed storage URLs carry the token in the query string
    let path = receipt
        .file_url
        .split(['?', '#'])
        .next()
        .unwrap_or_default();
    if !validate_file_extension(path) {
        return Err(BilledError::UnsupportedReceipt(receipt.file_url.clone()));
    }

    Ok(ReceiptPreview {
        url: receipt.file_url.clone(),
        file_name: receipt.file_name.clone(),
    })
}
