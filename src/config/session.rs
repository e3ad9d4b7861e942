use serde::{Deserialize, Serialize};
use std::fmt;

use super::settings::Config;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum UserType {
    #[default]
    Employee,
    Admin,
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserType::Employee => write!(f, "Employee"),
            UserType::Admin => write!(f, "Admin"),
        }
    }
}

/// The connected user, passed explicitly to every service call
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub email: String,
    pub user_type: UserType,
}

impl Session {
    /// Session from config.toml, with an optional email override
    pub fn from_config(config: &Config, email_override: Option<&str>) -> Self {
        Self {
            email: email_override
                .map(str::to_string)
                .unwrap_or_else(|| config.session.email.clone()),
            user_type: config.session.user_type,
        }
    }
}
