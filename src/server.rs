use anyhow::Result;
use serde_json::json;
use std::io::{BufRead, Write};
use std::path::PathBuf;

use crate::client::{HttpExtractor, ValueExtractor};
use crate::config::{load_effective_config, Config};
use crate::extractor::{handle_variable_extractor, tool_definition, TOOL_NAME};

pub struct ServerState {
    cwd: PathBuf,
    cfg: Config,
}

impl ServerState {
    pub fn new(cwd: PathBuf, cfg: Config) -> Self {
        Self { cwd, cfg }
    }

    fn tool_list(&self, id: serde_json::Value) -> serde_json::Value {
        json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": { "tools": [tool_definition()] }
        })
    }

    fn tool_call(&self, id: serde_json::Value, params: &serde_json::Value) -> serde_json::Value {
        let name = params.get("name").and_then(|n| n.as_str()).unwrap_or("");
        let args = params.get("arguments").cloned().unwrap_or(json!({}));

        let reply = |text: String, is_error: bool| {
            json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": { "content": [{"type":"text","text": text }], "isError": is_error }
            })
        };

        match name {
            TOOL_NAME => {
                let http = self
                    .cfg
                    .api_key
                    .as_deref()
                    .map(|key| HttpExtractor::new(self.cfg.endpoint.url(), key));
                let remote = http.as_ref().map(|h| h as &dyn ValueExtractor);
                let out = handle_variable_extractor(&args, &self.cfg, &self.cwd, remote);
                reply(out.text, out.is_error)
            }
            _ => reply(format!("Tool not found: {name}"), true),
        }
    }

    /// Reply for one incoming message, or `None` for notifications.
    pub fn handle_message(&self, msg: &serde_json::Value) -> Option<serde_json::Value> {
        // JSON-RPC notifications have no "id" field; no reply.
        let id = msg.get("id").cloned()?;
        let method = msg.get("method").and_then(|m| m.as_str()).unwrap_or("");

        let reply = match method {
            "initialize" => json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": {
                    "protocolVersion": msg.get("params").and_then(|p| p.get("protocolVersion")).cloned().unwrap_or(json!("2024-11-05")),
                    "capabilities": { "tools": {} },
                    "serverInfo": { "name": "varline", "version": env!("CARGO_PKG_VERSION") }
                }
            }),
            "ping" => json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": {}
            }),
            "tools/list" => self.tool_list(id),
            "tools/call" => {
                let params = msg.get("params").cloned().unwrap_or(json!({}));
                self.tool_call(id, &params)
            }
            // No resources or prompts are served.
            "resources/list" => json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": { "resources": [] }
            }),
            "prompts/list" => json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": { "prompts": [] }
            }),
            _ => json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": { "code": -32601, "message": format!("Method not found: {method}") }
            }),
        };
        Some(reply)
    }
}

pub fn run_stdio_server() -> Result<()> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let cfg = load_effective_config(&cwd);
    tracing::info!(cwd = %cwd.display(), endpoint = %cfg.endpoint.url(), "MCP server started on stdio");

    let state = ServerState::new(cwd, cfg);
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();

    for line in stdin.lock().lines() {
        let Ok(line) = line else { continue };
        if line.trim().is_empty() {
            continue;
        }

        let msg: serde_json::Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "skipping malformed message");
                continue;
            }
        };

        let Some(reply) = state.handle_message(&msg) else { continue };
        writeln!(stdout, "{}", reply)?;
        stdout.flush()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> ServerState {
        ServerState::new(PathBuf::from("."), Config::default())
    }

    #[test]
    fn notifications_get_no_reply() {
        let msg = json!({ "jsonrpc": "2.0", "method": "notifications/initialized" });
        assert!(state().handle_message(&msg).is_none());
    }

    #[test]
    fn unknown_method_is_rejected() {
        let reply = state()
            .handle_message(&json!({ "jsonrpc": "2.0", "id": 9, "method": "nope" }))
            .unwrap();
        assert_eq!(reply["error"]["code"], -32601);
        assert_eq!(reply["id"], 9);
    }

    #[test]
    fn unknown_tool_is_an_error_result() {
        let reply = state()
            .handle_message(&json!({
                "jsonrpc": "2.0", "id": 2, "method": "tools/call",
                "params": { "name": "amirsworld", "arguments": {} }
            }))
            .unwrap();
        assert_eq!(reply["result"]["isError"], true);
    }

    #[test]
    fn tool_call_without_api_key_reports_it() {
        let reply = state()
            .handle_message(&json!({
                "jsonrpc": "2.0", "id": 3, "method": "tools/call",
                "params": { "name": TOOL_NAME, "arguments": { "files": [] } }
            }))
            .unwrap();
        assert_eq!(reply["result"]["isError"], true);
        let text = reply["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("VARLINE_API_KEY"), "{text}");
    }
}
