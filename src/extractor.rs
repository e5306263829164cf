//! The `variable_extractor` tool: correct the caller's lines locally, then hand
//! the corrected request to the remote value-extraction service.

use serde_json::{json, Value};
use std::path::Path;

use crate::client::ValueExtractor;
use crate::config::Config;
use crate::loader::FsLoader;
use crate::model::ExtractionRequest;
use crate::normalize::strip_workspace_prefix;
use crate::request_log::append_request;
use crate::resolver::process_request;

pub const TOOL_NAME: &str = "variable_extractor";

/// Text payload of a tool call plus whether it should be flagged as an error.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutcome {
    pub text: String,
    pub is_error: bool,
}

impl ToolOutcome {
    fn ok(text: String) -> Self {
        Self { text, is_error: false }
    }

    fn err(text: String) -> Self {
        Self { text, is_error: true }
    }
}

pub fn tool_definition() -> Value {
    json!({
        "name": TOOL_NAME,
        "description": "Extract the runtime value, type, and timestamp of variables from production code. Reads live variable values from running applications, which helps when debugging remotely hosted deployments. Line numbers are corrected locally against the source before the request is sent.",
        "inputSchema": {
            "type": "object",
            "properties": {
                "files": {
                    "type": "array",
                    "description": "Files containing variables to extract",
                    "items": {
                        "type": "object",
                        "properties": {
                            "fileName": { "type": "string", "description": "The full absolute path to the file" },
                            "variables": {
                                "type": "array",
                                "description": "Variables to extract from this file",
                                "items": {
                                    "type": "object",
                                    "properties": {
                                        "name": { "type": "string", "description": "The name of the variable to extract" },
                                        "lineNumber": { "type": "integer", "minimum": 1, "description": "The line number where the variable is defined" }
                                    },
                                    "required": ["name", "lineNumber"]
                                }
                            }
                        },
                        "required": ["fileName", "variables"]
                    }
                }
            },
            "required": ["files"]
        }
    })
}

/// Run one tool call end to end. Never panics or returns `Err`: every failure
/// becomes an error outcome the caller can show.
pub fn handle_variable_extractor(
    args: &Value,
    cfg: &Config,
    cwd: &Path,
    remote: Option<&dyn ValueExtractor>,
) -> ToolOutcome {
    let request: ExtractionRequest = match serde_json::from_value(args.clone()) {
        Ok(r) => r,
        Err(e) => return ToolOutcome::err(format!("Validation error: {e}")),
    };
    let problems = request.validate();
    if !problems.is_empty() {
        return ToolOutcome::err(format!("Validation error: {}", problems.join("; ")));
    }

    let Some(remote) = remote else {
        return ToolOutcome::err("VARLINE_API_KEY environment variable is not set".to_string());
    };

    let loader = FsLoader::new(cwd, cfg.max_file_bytes);
    let corrected = process_request(&loader, &request);

    if !corrected.errors().is_empty() {
        let msgs: Vec<String> = corrected
            .errors()
            .iter()
            .map(|e| format!("File {}: {}", e.file_name, e.error))
            .collect();
        return ToolOutcome::err(format!("File reading errors: {}", msgs.join("; ")));
    }

    let files: Vec<Value> = corrected
        .files
        .iter()
        .map(|f| {
            let normalized = strip_workspace_prefix(&f.file_name, &cfg.workspace_roots);
            tracing::debug!(original = %f.file_name, normalized = %normalized, "normalized file name");
            json!({ "fileName": normalized, "variables": f.variables })
        })
        .collect();
    let body = json!({ "files": files });

    let endpoint = cfg.endpoint.url();
    if cfg.request_log.enabled {
        if let Err(e) = append_request(&cfg.request_log_dir(cwd), &endpoint, &body, &cfg.workspace_roots) {
            tracing::warn!(error = %e, "failed to log request");
        }
    }

    match remote.extract(&body) {
        Ok(resp) if resp.is_success() => {
            ToolOutcome::ok(serde_json::to_string_pretty(&resp.body).unwrap_or_else(|_| resp.body.to_string()))
        }
        Ok(resp) => ToolOutcome::err(format!("Error: {}", resp.message().unwrap_or("Request failed"))),
        Err(e) => ToolOutcome::err(format!("Error: {e:#}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ExtractorResponse;
    use std::cell::RefCell;
    use tempfile::TempDir;

    struct FakeExtractor {
        status: u16,
        reply: Value,
        seen: RefCell<Vec<Value>>,
    }

    impl FakeExtractor {
        fn replying(status: u16, reply: Value) -> Self {
            Self {
                status,
                reply,
                seen: RefCell::new(vec![]),
            }
        }
    }

    impl ValueExtractor for FakeExtractor {
        fn extract(&self, body: &Value) -> anyhow::Result<ExtractorResponse> {
            self.seen.borrow_mut().push(body.clone());
            Ok(ExtractorResponse {
                status: self.status,
                body: self.reply.clone(),
            })
        }
    }

    fn workspace() -> (TempDir, Config) {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("app").join("api");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("route.ts"),
            "export const GET = async () => {\n  const total =\n    1 + 2;\n  return total;\n};\n",
        )
        .unwrap();
        let cfg = Config {
            workspace_roots: vec![tmp.path().to_string_lossy().replace('\\', "/")],
            ..Config::default()
        };
        (tmp, cfg)
    }

    #[test]
    fn corrected_and_normalized_request_is_sent() {
        let (tmp, cfg) = workspace();
        let abs = tmp.path().join("app").join("api").join("route.ts");
        let remote = FakeExtractor::replying(200, json!({ "status": "success", "data": { "variables": [] } }));
        let args = json!({ "files": [{ "fileName": abs, "variables": [{ "name": "total", "lineNumber": 2 }] }] });

        let out = handle_variable_extractor(&args, &cfg, tmp.path(), Some(&remote));

        assert!(!out.is_error, "{}", out.text);
        assert!(out.text.contains("\"status\": \"success\""));
        let sent = remote.seen.borrow();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0]["files"][0]["fileName"], "app/api/route.ts");
        assert_eq!(sent[0]["files"][0]["variables"][0]["lineNumber"], 4);
        assert_eq!(sent[0]["files"][0]["variables"][0]["originalLineNumber"], 2);
    }

    #[test]
    fn unreadable_file_stops_before_the_remote_call() {
        let (tmp, cfg) = workspace();
        let remote = FakeExtractor::replying(200, json!({}));
        let args = json!({ "files": [{ "fileName": "app/api/missing.ts", "variables": [{ "name": "x", "lineNumber": 3 }] }] });

        let out = handle_variable_extractor(&args, &cfg, tmp.path(), Some(&remote));

        assert!(out.is_error);
        assert!(out.text.starts_with("File reading errors: File app/api/missing.ts:"), "{}", out.text);
        assert!(remote.seen.borrow().is_empty());
    }

    #[test]
    fn invalid_arguments_are_rejected() {
        let (tmp, cfg) = workspace();
        let remote = FakeExtractor::replying(200, json!({}));

        let out = handle_variable_extractor(&json!({ "files": "nope" }), &cfg, tmp.path(), Some(&remote));
        assert!(out.is_error && out.text.starts_with("Validation error:"));

        let args = json!({ "files": [{ "fileName": "a.ts", "variables": [{ "name": "", "lineNumber": 0 }] }] });
        let out = handle_variable_extractor(&args, &cfg, tmp.path(), Some(&remote));
        assert!(out.text.contains("variables[0].name"), "{}", out.text);
        assert!(out.text.contains("variables[0].lineNumber"), "{}", out.text);
    }

    #[test]
    fn missing_api_key_is_an_error() {
        let (tmp, cfg) = workspace();
        let args = json!({ "files": [] });
        let out = handle_variable_extractor(&args, &cfg, tmp.path(), None);
        assert!(out.is_error);
        assert!(out.text.contains("VARLINE_API_KEY"));
    }

    #[test]
    fn remote_failure_message_is_relayed() {
        let (tmp, cfg) = workspace();
        let args = json!({ "files": [{ "fileName": "app/api/route.ts", "variables": [{ "name": "total", "lineNumber": 2 }] }] });

        let remote = FakeExtractor::replying(401, json!({ "message": "bad api key" }));
        let out = handle_variable_extractor(&args, &cfg, tmp.path(), Some(&remote));
        assert_eq!(out, ToolOutcome::err("Error: bad api key".to_string()));

        let remote = FakeExtractor::replying(500, json!({}));
        let out = handle_variable_extractor(&args, &cfg, tmp.path(), Some(&remote));
        assert_eq!(out.text, "Error: Request failed");
    }

    #[test]
    fn request_log_is_written_when_enabled() {
        let (tmp, mut cfg) = workspace();
        cfg.request_log.enabled = true;
        cfg.request_log.dir = tmp.path().join("logs");
        let remote = FakeExtractor::replying(200, json!({}));
        let args = json!({ "files": [{ "fileName": "app/api/route.ts", "variables": [{ "name": "total", "lineNumber": 2 }] }] });

        let out = handle_variable_extractor(&args, &cfg, tmp.path(), Some(&remote));

        assert!(!out.is_error, "{}", out.text);
        let log = std::fs::read_to_string(tmp.path().join("logs").join(crate::request_log::LOG_FILE_NAME)).unwrap();
        assert!(log.contains("app/api/route.ts"));
    }

    #[test]
    fn tool_definition_requires_files() {
        let def = tool_definition();
        assert_eq!(def["name"], TOOL_NAME);
        assert_eq!(def["inputSchema"]["required"][0], "files");
    }
}
