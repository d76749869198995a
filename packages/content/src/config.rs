use crate::error::ConfigError;
use crate::ordering::SectionId;
use crate::slug::PageSlug;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_NAME: &str = "alliance.config.json";

/// Overrides `apiBaseUrl` when set
pub const API_URL_ENV: &str = "ALLIANCE_API_URL";

/// Site configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteConfig {
    /// Base URL of the content API (`/content-overrides`, `/section-order`, `/sections`)
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Selector of the element whose tagged children are the page sections
    #[serde(default = "default_container_selector")]
    pub container_selector: String,

    #[serde(default = "default_section_attribute")]
    pub section_attribute: String,

    /// Written on every element an override touched
    #[serde(default = "default_managed_attribute")]
    pub managed_attribute: String,

    /// Upper bound on waiting for dynamic sections before ordering
    #[serde(default = "default_sections_timeout_ms")]
    pub sections_timeout_ms: u64,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Let overrides reach content inserted by the section loader
    #[serde(default = "default_true")]
    pub overrides_wait_for_sections: bool,

    /// Sections never moved by ordering, keyed by page slug
    #[serde(default)]
    pub pinned_sections: HashMap<String, Vec<SectionId>>,
}

fn default_api_base_url() -> String {
    "http://127.0.0.1:3000/api".to_string()
}

fn default_container_selector() -> String {
    "main".to_string()
}

fn default_section_attribute() -> String {
    "data-section-id".to_string()
}

fn default_managed_attribute() -> String {
    "data-content-managed".to_string()
}

fn default_sections_timeout_ms() -> u64 {
    3000
}

fn default_request_timeout_ms() -> u64 {
    5000
}

fn default_true() -> bool {
    true
}

impl SiteConfig {
    /// Load config from a directory, falling back to defaults if absent
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config_path = dir.as_ref().join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Ok(serde_json::from_str(&content)?)
        } else {
            Ok(SiteConfig::default())
        }
    }

    /// Apply `ALLIANCE_API_URL` if present
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                self.api_base_url = url.trim().to_string();
            }
        }
        self
    }

    pub fn pinned_for(&self, page: &PageSlug) -> HashSet<SectionId> {
        self.pinned_sections
            .get(page.as_str())
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn sections_timeout(&self) -> Duration {
        Duration::from_millis(self.sections_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            container_selector: default_container_selector(),
            section_attribute: default_section_attribute(),
            managed_attribute: default_managed_attribute(),
            sections_timeout_ms: default_sections_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            overrides_wait_for_sections: default_true(),
            pinned_sections: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "apiBaseUrl": "https://example.org/api",
            "sectionsTimeoutMs": 1500,
            "pinnedSections": { "index": ["hero"] }
        }"#;

        let config: SiteConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.api_base_url, "https://example.org/api");
        assert_eq!(config.sections_timeout(), Duration::from_millis(1500));
        assert_eq!(config.container_selector, "main");
        assert!(config.pinned_for(&PageSlug::new("index")).contains("hero"));
        assert!(config.pinned_for(&PageSlug::new("tutors")).is_empty());
    }

    #[test]
    fn test_default_config() {
        let config = SiteConfig::default();
        assert_eq!(config.section_attribute, "data-section-id");
        assert_eq!(config.managed_attribute, "data-content-managed");
        assert_eq!(config.sections_timeout_ms, 3000);
        assert!(config.overrides_wait_for_sections);
    }

    #[test]
    fn test_load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(SiteConfig::load(dir.path()).unwrap(), SiteConfig::default());

        std::fs::write(
            dir.path().join(DEFAULT_CONFIG_NAME),
            r##"{ "containerSelector": "#content" }"##,
        )
        .unwrap();
        assert_eq!(SiteConfig::load(dir.path()).unwrap().container_selector, "#content");

        std::fs::write(dir.path().join(DEFAULT_CONFIG_NAME), "{ not json").unwrap();
        assert!(matches!(
            SiteConfig::load(dir.path()),
            Err(ConfigError::Parse(_))
        ));
    }
}
