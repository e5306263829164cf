//! File-name normalization for requests leaving the machine: the remote side
//! knows files by workspace-relative, forward-slash paths.

use regex::Regex;
use std::sync::OnceLock;

fn repeated_slashes() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"/{2,}").unwrap())
}

fn collapse_slashes(s: &str) -> String {
    repeated_slashes().replace_all(s, "/").into_owned()
}

/// Split a comma-separated workspace list into normalized roots
/// (forward slashes, no trailing slash, blanks dropped).
pub fn parse_workspace_roots(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|p| p.trim().replace('\\', "/").trim_end_matches('/').to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &s[prefix.len()..])
}

/// Make `file_name` relative to the first matching workspace root.
///
/// With no roots configured only backslashes are rewritten. Otherwise slashes
/// are normalized and collapsed, and the first root that prefixes the path
/// (ASCII case-insensitive) is removed along with any leading slashes.
pub fn strip_workspace_prefix(file_name: &str, workspace_roots: &[String]) -> String {
    if workspace_roots.is_empty() {
        return file_name.replace('\\', "/");
    }

    let normalized = collapse_slashes(&file_name.replace('\\', "/"));
    for root in workspace_roots {
        let root = collapse_slashes(root);
        if let Some(rest) = strip_prefix_ignore_case(&normalized, &root) {
            return collapse_slashes(rest.trim_start_matches('/'));
        }
    }
    normalized
}
