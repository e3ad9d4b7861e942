mod session;
mod settings;

pub use session::{Session, UserType};
pub use settings::{Config, SessionSettings, StoreSettings};

use crate::error::{BilledError, Result};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

/// Get the config directory path (XDG config dir, else ~/.billed/)
pub fn config_dir() -> Result<PathBuf> {
    if let Some(proj_dirs) = ProjectDirs::from("", "", "billed") {
        return Ok(proj_dirs.config_dir().to_path_buf());
    }

    let home = dirs_home().ok_or_else(|| {
        BilledError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Could not determine home directory",
        ))
    })?;

    Ok(home.join(".billed"))
}

fn dirs_home() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

/// Expand ~ in paths
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs_home() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Resolve the local store directory; relative paths hang off the config dir
pub fn resolve_data_dir(data_dir: &str, cfg_dir: &Path) -> PathBuf {
    let expanded = expand_path(data_dir);
    if expanded.is_absolute() {
        expanded
    } else {
        cfg_dir.join(expanded)
    }
}

/// Load the main config.toml
pub fn load_config(config_dir: &Path) -> Result<Config> {
    if !config_dir.exists() {
        return Err(BilledError::ConfigNotFound(config_dir.to_path_buf()));
    }
    let path = config_dir.join("config.toml");
    if !path.exists() {
        return Err(BilledError::ConfigFileNotFound(path));
    }
    let content = fs::read_to_string(&path)?;
    toml::from_str(&content).map_err(|e| BilledError::ConfigParse { path, source: e })
}

/// Template content for config.toml
pub const CONFIG_TEMPLATE: &str = r#"[session]
email = "employee@test.tld"
type = "Employee"              # Employee or Admin

[store]
backend = "local"              # "local" (JSON file) or "http" (bills API)
data_dir = "data"              # local backend, relative to this directory
# base_url = "http://localhost:5678"   # http backend
# token = "..."                        # optional bearer token
timeout_secs = 10
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_template_parses() {
        let config: Config = toml::from_str(CONFIG_TEMPLATE).unwrap();
        assert_eq!(config.session.email, "employee@test.tld");
        assert_eq!(config.session.user_type, UserType::Employee);
        assert_eq!(config.store.backend, "local");
        assert_eq!(config.store.timeout_secs, 10);
        assert!(config.store.base_url.is_none());
    }

    #[test]
    fn test_store_section_is_optional() {
        let config: Config = toml::from_str("[session]\nemail = \"a@a\"\n").unwrap();
        assert_eq!(config.store.backend, "local");
        assert_eq!(config.store.data_dir, "data");
    }

    #[test]
    fn test_load_config_errors() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(load_config(&missing), Err(BilledError::ConfigNotFound(_))));
        assert!(matches!(
            load_config(dir.path()),
            Err(BilledError::ConfigFileNotFound(_))
        ));

        fs::write(dir.path().join("config.toml"), "[session\n").unwrap();
        assert!(matches!(
            load_config(dir.path()),
            Err(BilledError::ConfigParse { .. })
        ));
    }

    #[test]
    fn test_resolve_data_dir() {
        let cfg = Path::new("/etc/billed");
        assert_eq!(resolve_data_dir("data", cfg), PathBuf::from("/etc/billed/data"));
        assert_eq!(resolve_data_dir("/srv/bills", cfg), PathBuf::from("/srv/bills"));
    }

    #[test]
    fn test_session_email_override() {
        let config: Config = toml::from_str(CONFIG_TEMPLATE).unwrap();
        assert_eq!(Session::from_config(&config, None).email, "employee@test.tld");
        assert_eq!(Session::from_config(&config, Some("a@a")).email, "a@a");
    }
}
