use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use ureq::{Agent, RequestBuilder};

use super::{missing_id, BillsStore};
use crate::bill::{Bill, CreatedBill, ReceiptFile, UploadedFile};
use crate::error::StoreError;

/// Store behind the bills REST API
pub struct HttpStore {
    agent: Agent,
    base_url: String,
    token: Option<String>,
}

impl HttpStore {
    pub fn new(base_url: impl Into<String>, token: Option<String>, timeout_secs: u64) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(timeout_secs)))
            .build()
            .into();
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            agent,
            base_url,
            token,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize<B>(&self, req: RequestBuilder<B>) -> RequestBuilder<B> {
        match &self.token {
            Some(token) => req.header("Authorization", format!("Bearer {token}")),
            None => req,
        }
    }
}

impl From<ureq::Error> for StoreError {
    fn from(e: ureq::Error) -> Self {
        match e {
            ureq::Error::StatusCode(code) => StoreError::with_status(code, format!("Erreur {code}")),
            other => StoreError::other(other.to_string()),
        }
    }
}

fn read_json<T: DeserializeOwned>(
    mut response: ureq::http::Response<ureq::Body>,
) -> Result<T, StoreError> {
    let body = response.body_mut().read_to_string()?;
    Ok(serde_json::from_str(&body)?)
}

impl BillsStore for HttpStore {
    fn list(&self, user_email: &str) -> Result<Vec<Value>, StoreError> {
        let url = self.url("/bills");
        debug!(url = url.as_str(), "GET bills");
        let response = self
            .authorize(self.agent.get(&url))
            .query("email", user_email)
            .call()?;
        read_json(response)
    }

    fn upload(&self, file: &ReceiptFile) -> Result<UploadedFile, StoreError> {
        let url = self.url("/bills/receipts");
        debug!(url = url.as_str(), file = file.name.as_str(), "POST receipt");
        let response = self
            .authorize(self.agent.post(&url))
            .query("fileName", &file.name)
            .header("Content-Type", &file.media_type)
            .send(&file.bytes[..])?;
        read_json(response)
    }

    fn create(&self, bill: &Bill) -> Result<CreatedBill, StoreError> {
        let url = self.url("/bills");
        debug!(url = url.as_str(), "POST bill");
        let body = serde_json::to_string(bill)?;
        let response = self
            .authorize(self.agent.post(&url))
            .header("Content-Type", "application/json")
            .send(body)?;
        read_json(response)
    }

    fn update(&self, bill: &Bill) -> Result<CreatedBill, StoreError> {
        let id = bill.id.as_deref().ok_or_else(missing_id)?;
        let url = self.url(&format!("/bills/{id}"));
        debug!(url = url.as_str(), "PATCH bill");
        let body = serde_json::to_string(bill)?;
        let response = self
            .authorize(self.agent.patch(&url))
            .header("Content-Type", "application/json")
            .send(body)?;
        read_json(response)
    }
}
