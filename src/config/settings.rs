use serde::{Deserialize, Serialize};

use super::session::UserType;

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    pub session: SessionSettings,
    #[serde(default)]
    pub store: StoreSettings,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SessionSettings {
    pub email: String,
    #[serde(rename = "type", default)]
    pub user_type: UserType,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StoreSettings {
    #[serde(default = "default_backend")]
    pub backend: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            data_dir: default_data_dir(),
            base_url: None,
            token: None,
            timeout_secs: default_timeout(),
        }
    }
}

fn default_backend() -> String {
    "local".to_string()
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_timeout() -> u64 {
    10
}
