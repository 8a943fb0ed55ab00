// Persisted server settings.
//
// The NodeODM URL and token live in `<config_dir>/odm-frontend/settings.json`
// so they survive between runs. `ODM_BASE_URL` / `ODM_TOKEN` override the
// stored values for a single run.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";
const APP_DIR: &str = "odm-frontend";
const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSettings {
    pub base_url: String,
    #[serde(default)]
    pub token: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: String::new(),
        }
    }
}

impl ServerSettings {
    /// Build settings from user input, normalizing the URL.
    pub fn new(base_url: &str, token: &str) -> Result<Self> {
        Ok(Self {
            base_url: normalize_url(base_url)?,
            token: token.trim().to_string(),
        })
    }

    /// Stored settings with environment overrides applied.
    pub fn load() -> Self {
        let mut settings = default_path()
            .filter(|path| path.exists())
            .map(|path| load_from_path(&path))
            .unwrap_or_default();
        settings.apply_overrides(
            std::env::var("ODM_BASE_URL").ok().as_deref(),
            std::env::var("ODM_TOKEN").ok().as_deref(),
        );
        settings
    }

    /// Apply `ODM_BASE_URL` / `ODM_TOKEN` style overrides. A URL that does
    /// not normalize is ignored with a warning.
    pub fn apply_overrides(&mut self, base_url: Option<&str>, token: Option<&str>) {
        if let Some(url) = base_url {
            match normalize_url(url) {
                Ok(url) => self.base_url = url,
                Err(err) => warn!("ignoring ODM_BASE_URL: {err}"),
            }
        }
        if let Some(token) = token {
            self.token = token.to_string();
        }
    }

    pub fn save(&self) -> Result<()> {
        match default_path() {
            Some(path) => save_to_path(self, &path),
            None => bail!("no configuration directory available"),
        }
    }

    pub fn token(&self) -> Option<&str> {
        Some(self.token.as_str()).filter(|t| !t.is_empty())
    }
}

fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(SETTINGS_FILE))
}

/// Read settings from `path`. Unreadable or invalid files yield defaults.
pub fn load_from_path(path: &Path) -> ServerSettings {
    let parsed = fs::read_to_string(path)
        .map_err(anyhow::Error::from)
        .and_then(|raw| serde_json::from_str::<ServerSettings>(&raw).map_err(Into::into));
    match parsed {
        Ok(settings) => settings,
        Err(err) => {
            warn!("using default settings, could not read {}: {err}", path.display());
            ServerSettings::default()
        }
    }
}

pub fn save_to_path(settings: &ServerSettings, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(settings).context("encoding settings")?;
    fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

/// Trim the URL, drop trailing slashes and default to `http://`.
pub fn normalize_url(url: &str) -> Result<String> {
    let url = url.trim().trim_end_matches('/');
    if url.is_empty() {
        bail!("server URL is empty");
    }
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(url.to_string())
    } else {
        Ok(format!("http://{url}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn normalize_adds_scheme_and_strips_slash() {
        assert_eq!(normalize_url("localhost:3000/").unwrap(), "http://localhost:3000");
        assert_eq!(
            normalize_url(" https://odm.example.org// ").unwrap(),
            "https://odm.example.org"
        );
        assert!(normalize_url("  ").is_err());
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempdir().expect("create temp dir");
        let path = dir.path().join("nested").join(SETTINGS_FILE);
        let settings = ServerSettings::new("10.0.0.5:3000", " secret ").unwrap();
        save_to_path(&settings, &path).expect("save settings");
        let loaded = load_from_path(&path);
        assert_eq!(loaded, settings);
        assert_eq!(loaded.token(), Some("secret"));
    }

    #[test]
    fn invalid_file_falls_back_to_defaults() {
        let dir = tempdir().expect("create temp dir");
        let path = dir.path().join(SETTINGS_FILE);
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(load_from_path(&path), ServerSettings::default());
        assert_eq!(ServerSettings::default().token(), None);
    }

    #[test]
    fn missing_token_field_defaults_to_empty() {
        let dir = tempdir().expect("create temp dir");
        let path = dir.path().join(SETTINGS_FILE);
        fs::write(&path, r#"{"base_url": "http://odm:3000"}"#).unwrap();
        let loaded = load_from_path(&path);
        assert_eq!(loaded.base_url, "http://odm:3000");
        assert!(loaded.token.is_empty());
    }

    #[test]
    fn overrides_replace_stored_values() {
        let mut settings = ServerSettings::new("odm:3000", "stored").unwrap();
        settings.apply_overrides(Some("https://nodeodm.example.org/"), Some("env-token"));
        assert_eq!(settings.base_url, "https://nodeodm.example.org");
        assert_eq!(settings.token(), Some("env-token"));
    }

    #[test]
    fn absent_or_invalid_overrides_keep_stored_values() {
        let stored = ServerSettings::new("odm:3000", "stored").unwrap();
        let mut settings = stored.clone();
        settings.apply_overrides(None, None);
        assert_eq!(settings, stored);

        settings.apply_overrides(Some("   "), None);
        assert_eq!(settings.base_url, "http://odm:3000");

        settings.apply_overrides(None, Some(""));
        assert_eq!(settings.token(), None);
    }
}
