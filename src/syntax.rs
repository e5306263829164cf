use std::path::Path;
use tree_sitter::{Language, Node, Parser, Tree};

use crate::error::FileError;

/// Which tree-sitter grammar a file is parsed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grammar {
    TypeScript,
    Tsx,
}

impl Grammar {
    /// JSX-bearing extensions need the TSX grammar; everything else (JS included)
    /// goes through the TypeScript one.
    pub fn for_path(file_name: &str) -> Self {
        let ext = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        match ext.as_str() {
            "tsx" | "jsx" => Grammar::Tsx,
            _ => Grammar::TypeScript,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Grammar::TypeScript => "typescript",
            Grammar::Tsx => "tsx",
        }
    }

    fn language(self) -> Language {
        match self {
            Grammar::TypeScript => tree_sitter_typescript::language_typescript(),
            Grammar::Tsx => tree_sitter_typescript::language_tsx(),
        }
    }
}

/// Byte offset → 1-based (line, column) mapping.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0usize];
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        Self { line_starts }
    }

    /// 1-based line containing `offset`. Offsets past the end map to the last line.
    pub fn line_of(&self, offset: usize) -> u32 {
        let idx = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        (idx + 1) as u32
    }

    /// 1-based (line, column); the column counts bytes.
    pub fn position_of(&self, offset: usize) -> (u32, u32) {
        let line = self.line_of(offset);
        let start = self.line_starts[(line - 1) as usize];
        (line, (offset - start + 1) as u32)
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

/// A parsed file: the tree, the text it borrows from, and its line index.
pub struct ParsedSource<'a> {
    file_name: &'a str,
    text: &'a str,
    tree: Tree,
    lines: LineIndex,
}

impl<'a> ParsedSource<'a> {
    pub fn file_name(&self) -> &'a str {
        self.file_name
    }

    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    pub fn lines(&self) -> &LineIndex {
        &self.lines
    }

    pub fn text_of(&self, node: Node) -> &'a str {
        self.text.get(node.start_byte()..node.end_byte()).unwrap_or("")
    }

    pub fn start_line(&self, node: Node) -> u32 {
        self.lines.line_of(node.start_byte())
    }

    pub fn end_line(&self, node: Node) -> u32 {
        self.lines.line_of(node.end_byte())
    }

    /// Whether tree-sitter had to recover from syntax errors anywhere in the file.
    pub fn has_syntax_errors(&self) -> bool {
        self.tree.root_node().has_error()
    }
}

/// Parse `text` with the grammar implied by `file_name`.
///
/// Syntax errors do not fail the parse (the recovered tree is still usable);
/// only binary input, a grammar that cannot be loaded, or the parser giving up
/// entirely are reported.
pub fn parse_source<'a>(file_name: &'a str, text: &'a str) -> Result<ParsedSource<'a>, FileError> {
    if text.as_bytes().contains(&0u8) {
        return Err(FileError::Binary);
    }

    let grammar = Grammar::for_path(file_name);
    let mut parser = Parser::new();
    parser
        .set_language(&grammar.language())
        .map_err(|e| FileError::Grammar {
            grammar: grammar.name(),
            reason: e.to_string(),
        })?;

    let tree = parser.parse(text, None).ok_or_else(|| FileError::Parse {
        reason: "parser returned no tree".to_string(),
    })?;

    let parsed = ParsedSource {
        file_name,
        text,
        tree,
        lines: LineIndex::new(text),
    };
    if parsed.has_syntax_errors() {
        tracing::debug!(file = file_name, "syntax errors recovered");
    }
    Ok(parsed)
}
