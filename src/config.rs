use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::normalize::parse_workspace_roots;

pub const CONFIG_FILE_NAME: &str = ".varline.json";

/// Where the value-extraction service lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub base_url: String,
    /// Used instead of `base_url` when `use_dev_host` is set.
    pub dev_base_url: String,
    pub path: String,
    pub use_dev_host: bool,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            base_url: "https://bugsorcontainerapp.livelybush-67f33f33.canadacentral.azurecontainerapps.io".to_string(),
            dev_base_url: "http://localhost:7000".to_string(),
            path: "/variable-extractor".to_string(),
            use_dev_host: false,
        }
    }
}

impl EndpointConfig {
    pub fn url(&self) -> String {
        let base = if self.use_dev_host { &self.dev_base_url } else { &self.base_url };
        format!("{}/{}", base.trim_end_matches('/'), self.path.trim_start_matches('/'))
    }
}

/// Append-only record of outbound requests, for debugging the remote side.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestLogConfig {
    pub enabled: bool,
    /// Relative paths resolve against the first workspace root (or the cwd).
    pub dir: PathBuf,
}

impl Default for RequestLogConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: PathBuf::from("logs").join("localmcp"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Files larger than this are reported as load errors instead of parsed.
    pub max_file_bytes: u64,
    pub endpoint: EndpointConfig,
    pub request_log: RequestLogConfig,
    /// Workspace roots stripped from outbound file names.
    pub workspace_roots: Vec<String>,
    /// Never read from disk; only from the environment.
    #[serde(skip)]
    pub api_key: Option<String>,
    /// Verbose diagnostics on stderr.
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_file_bytes: 1024 * 1024,
            endpoint: EndpointConfig::default(),
            request_log: RequestLogConfig::default(),
            workspace_roots: vec![],
            api_key: None,
            verbose: false,
        }
    }
}

impl Config {
    /// Fold environment overrides into the file-based settings.
    pub fn apply_env<F>(&mut self, get: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let flag = |key: &str| get(key).map(|v| !v.trim().is_empty()).unwrap_or(false);

        if let Some(key) = get("VARLINE_API_KEY").filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(key);
        }
        if flag("VARLINE_USE_DEVHOST") {
            self.endpoint.use_dev_host = true;
        }
        if flag("VARLINE_LOGGING") {
            self.verbose = true;
            self.request_log.enabled = true;
        }
        if let Some(raw) = get("WORKSPACE_FOLDER_PATHS") {
            let roots = parse_workspace_roots(&raw);
            if !roots.is_empty() {
                self.workspace_roots = roots;
            }
        }
    }

    /// Directory the request log is written to.
    pub fn request_log_dir(&self, cwd: &Path) -> PathBuf {
        if self.request_log.dir.is_absolute() {
            return self.request_log.dir.clone();
        }
        let base = self
            .workspace_roots
            .first()
            .map(PathBuf::from)
            .unwrap_or_else(|| cwd.to_path_buf());
        base.join(&self.request_log.dir)
    }
}

/// `.varline.json` under `root`, or defaults when absent or malformed.
pub fn load_config(root: &Path) -> Config {
    let primary = root.join(CONFIG_FILE_NAME);

    let text = std::fs::read_to_string(&primary);
    let Ok(text) = text else { return Config::default() };

    serde_json::from_str::<Config>(&text).unwrap_or_else(|e| {
        tracing::warn!(path = %primary.display(), error = %e, "ignoring malformed config");
        Config::default()
    })
}

/// File config plus process environment.
pub fn load_effective_config(root: &Path) -> Config {
    let mut cfg = load_config(root);
    cfg.apply_env(|k| std::env::var(k).ok());
    cfg
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn missing_or_malformed_file_gives_defaults() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(load_config(tmp.path()).max_file_bytes, 1024 * 1024);

        std::fs::write(tmp.path().join(CONFIG_FILE_NAME), "{ not json").unwrap();
        assert!(!load_config(tmp.path()).endpoint.use_dev_host);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join(CONFIG_FILE_NAME),
            r#"{ "max_file_bytes": 2048, "endpoint": { "use_dev_host": true } }"#,
        )
        .unwrap();

        let cfg = load_config(tmp.path());
        assert_eq!(cfg.max_file_bytes, 2048);
        assert_eq!(cfg.endpoint.url(), "http://localhost:7000/variable-extractor");
        assert_eq!(cfg.endpoint.path, "/variable-extractor");
    }

    #[test]
    fn environment_overrides_file_settings() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("VARLINE_API_KEY", "demo"),
            ("VARLINE_LOGGING", "1"),
            ("WORKSPACE_FOLDER_PATHS", "c:\\Git\\ComplexAPI, /srv/app/"),
        ]);
        let mut cfg = Config::default();
        cfg.apply_env(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(cfg.api_key.as_deref(), Some("demo"));
        assert!(cfg.verbose && cfg.request_log.enabled);
        assert!(!cfg.endpoint.use_dev_host);
        assert_eq!(cfg.workspace_roots, vec!["c:/Git/ComplexAPI", "/srv/app"]);
        assert_eq!(
            cfg.request_log_dir(Path::new("/cwd")),
            PathBuf::from("c:/Git/ComplexAPI").join("logs").join("localmcp")
        );
    }

    #[test]
    fn blank_api_key_counts_as_unset() {
        let mut cfg = Config::default();
        cfg.apply_env(|k| (k == "VARLINE_API_KEY").then(|| "  ".to_string()));
        assert!(cfg.api_key.is_none());
    }
}
