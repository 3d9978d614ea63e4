use crate::{DispatchStrategy, ProxyMode, Result, runtime_dir};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Overrides `backend.base_url` after all settings files are merged.
pub const BACKEND_URL_ENV: &str = "ANYWHERE_BACKEND_URL";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub backend: BackendConfig,
    pub suggestions: SuggestionsConfig,
    pub dispatch: DispatchConfig,
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BackendConfig {
    /// Root of the backend API, including its `/api` prefix.
    pub base_url: String,
    pub timeout_seconds: u64,
    pub user_agent: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8001/api".to_string(),
            timeout_seconds: 30,
            user_agent: format!("anywhere/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl BackendConfig {
    pub fn endpoint_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SuggestionsConfig {
    pub enabled: bool,
    pub debounce_ms: u64,
    /// Delay before the list hides after the input loses focus.
    pub blur_hide_ms: u64,
    pub max_visible: usize,
}

impl Default for SuggestionsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            debounce_ms: 200,
            blur_hide_ms: 150,
            max_visible: 6,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct DispatchConfig {
    pub strategy: DispatchStrategy,
    pub enhanced: bool,
}

impl DispatchConfig {
    pub fn mode(&self) -> ProxyMode {
        ProxyMode::from_enhanced(self.enhanced)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UiConfig {
    pub tick_ms: u64,
    pub reduced_motion: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            tick_ms: 50,
            reduced_motion: false,
        }
    }
}

impl AppConfig {
    pub fn user_settings_path() -> Option<PathBuf> {
        let home = std::env::var("HOME")
            .ok()
            .or_else(|| std::env::var("USERPROFILE").ok())?;
        Some(Path::new(&home).join(".anywhere/settings.json"))
    }

    pub fn project_settings_path(workspace: &Path) -> PathBuf {
        runtime_dir(workspace).join("settings.json")
    }

    pub fn project_local_settings_path(workspace: &Path) -> PathBuf {
        runtime_dir(workspace).join("settings.local.json")
    }

    pub fn legacy_toml_path(workspace: &Path) -> PathBuf {
        runtime_dir(workspace).join("config.toml")
    }

    /// Merge every settings layer over the defaults, then apply the environment.
    pub fn load(workspace: &Path) -> Result<Self> {
        let mut cfg = Self::load_files(workspace)?;
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    fn load_files(workspace: &Path) -> Result<Self> {
        let mut merged = serde_json::to_value(Self::default())?;

        let legacy = Self::legacy_toml_path(workspace);
        if legacy.exists() {
            let raw = fs::read_to_string(legacy)?;
            let legacy_value: toml::Value = toml::from_str(&raw)?;
            merge_json_value(&mut merged, &serde_json::to_value(legacy_value)?);
        }

        let mut paths = Vec::new();
        if let Some(user) = Self::user_settings_path() {
            paths.push(user);
        }
        paths.push(Self::project_settings_path(workspace));
        paths.push(Self::project_local_settings_path(workspace));

        for path in paths {
            if !path.exists() {
                continue;
            }
            let raw = fs::read_to_string(&path)?;
            let value: serde_json::Value = serde_json::from_str(&raw)
                .map_err(|e| anyhow::anyhow!("invalid settings in {}: {e}", path.display()))?;
            merge_json_value(&mut merged, &value);
        }

        Ok(serde_json::from_value(merged)?)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(BACKEND_URL_ENV) {
            let url = url.trim();
            if !url.is_empty() {
                self.backend.base_url = url.to_string();
            }
        }
    }
}

fn merge_json_value(base: &mut serde_json::Value, overlay: &serde_json::Value) {
    match (base, overlay) {
        (serde_json::Value::Object(base_obj), serde_json::Value::Object(overlay_obj)) => {
            for (key, overlay_value) in overlay_obj {
                if let Some(base_value) = base_obj.get_mut(key) {
                    merge_json_value(base_value, overlay_value);
                } else {
                    base_obj.insert(key.clone(), overlay_value.clone());
                }
            }
        }
        (base_slot, overlay_value) => {
            *base_slot = overlay_value.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn defaults_point_at_local_backend() {
        let cfg = AppConfig::default();
        assert_eq!(
            cfg.backend.endpoint_url("/proxy"),
            "http://127.0.0.1:8001/api/proxy"
        );
        assert_eq!(cfg.dispatch.strategy, DispatchStrategy::Direct);
        assert_eq!(cfg.dispatch.mode(), ProxyMode::Standard);
        assert!(cfg.suggestions.enabled);
    }

    #[test]
    fn endpoint_url_normalizes_slashes() {
        let backend = BackendConfig {
            base_url: "https://host.example/api/".to_string(),
            ..BackendConfig::default()
        };
        assert_eq!(
            backend.endpoint_url("search-suggestions"),
            "https://host.example/api/search-suggestions"
        );
    }

    #[test]
    fn later_layers_override_earlier_ones() {
        let workspace = TempDir::new().expect("workspace");
        let dir = runtime_dir(workspace.path());
        fs::create_dir_all(&dir).expect("runtime dir");
        fs::write(
            dir.join("config.toml"),
            "[backend]\nbase_url = \"http://legacy/api\"\ntimeout_seconds = 5\n",
        )
        .expect("legacy toml");
        fs::write(
            dir.join("settings.json"),
            serde_json::to_vec(&json!({"backend": {"base_url": "http://project/api"}}))
                .expect("json"),
        )
        .expect("project settings");
        fs::write(
            dir.join("settings.local.json"),
            serde_json::to_vec(&json!({"dispatch": {"strategy": "smart", "enhanced": true}}))
                .expect("json"),
        )
        .expect("local settings");

        let cfg = AppConfig::load_files(workspace.path()).expect("load");
        assert_eq!(cfg.backend.base_url, "http://project/api");
        assert_eq!(cfg.backend.timeout_seconds, 5);
        assert_eq!(cfg.dispatch.strategy, DispatchStrategy::Smart);
        assert_eq!(cfg.dispatch.mode(), ProxyMode::Enhanced);
        assert_eq!(cfg.suggestions.debounce_ms, 200);
    }

    #[test]
    fn invalid_settings_name_the_file() {
        let workspace = TempDir::new().expect("workspace");
        let dir = runtime_dir(workspace.path());
        fs::create_dir_all(&dir).expect("runtime dir");
        fs::write(dir.join("settings.json"), "{not json").expect("write");

        let err = AppConfig::load_files(workspace.path()).expect_err("invalid json");
        assert!(err.to_string().contains("settings.json"));
    }

    #[test]
    fn env_override_replaces_base_url() {
        let mut cfg = AppConfig::default();
        // SAFETY: test-only process-level env mutation.
        unsafe {
            std::env::set_var(BACKEND_URL_ENV, "https://proxy.example/api");
        }
        cfg.apply_env_overrides();
        // SAFETY: test-only process-level env mutation.
        unsafe {
            std::env::remove_var(BACKEND_URL_ENV);
        }
        assert_eq!(cfg.backend.base_url, "https://proxy.example/api");
    }
}
