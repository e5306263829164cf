use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

pub const LOG_FILE_NAME: &str = "variable-extractor-requests.log";
const ENTRY_SEPARATOR: &str = "---";

fn now_unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Append one pretty-printed entry for an outbound request to `dir`.
///
/// The API key is never written. Returns the log file path.
pub fn append_request(dir: &Path, endpoint: &str, request: &Value, workspace_roots: &[String]) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    let path = dir.join(LOG_FILE_NAME);

    let entry = json!({
        "timestampUnixMs": now_unix_ms(),
        "endpoint": endpoint,
        "request": request,
        "workspaceRoots": workspace_roots,
        "processCwd": std::env::current_dir().map(|p| p.to_string_lossy().to_string()).unwrap_or_default(),
    });

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    writeln!(file, "{}\n{ENTRY_SEPARATOR}", serde_json::to_string_pretty(&entry)?)?;

    tracing::debug!(path = %path.display(), "request logged");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn entries_are_appended_under_nested_dir() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("logs").join("localmcp");
        let body = json!({ "files": [{ "fileName": "app/x.ts", "variables": [] }] });

        let p1 = append_request(&dir, "http://localhost:7000/variable-extractor", &body, &[]).unwrap();
        let p2 = append_request(&dir, "http://localhost:7000/variable-extractor", &body, &[]).unwrap();
        assert_eq!(p1, p2);

        let text = std::fs::read_to_string(&p1).unwrap();
        assert_eq!(text.matches("\n---\n").count(), 2);
        assert!(text.contains("\"fileName\": \"app/x.ts\""));
        assert!(!text.contains("api-key"));
    }
}
