//! Tree walks that turn a caller-asserted line into the line where a value is
//! actually observable.
//!
//! Both analyses are [`NodeVisitor`]s driven by the same pre-order [`walk`].
//! Neither stops early: every node is visited and the last hit wins, so a
//! later (deeper or further down the file) match overrides an earlier one.

use tree_sitter::Node;

use crate::syntax::ParsedSource;

pub trait NodeVisitor {
    fn visit(&mut self, node: Node<'_>, src: &ParsedSource<'_>);
}

/// Depth-first, pre-order over every node (named and anonymous) in source order.
pub fn walk<V: NodeVisitor + ?Sized>(src: &ParsedSource<'_>, visitor: &mut V) {
    let root = src.root();
    let mut cursor = root.walk();
    loop {
        visitor.visit(cursor.node(), src);

        if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return;
            }
        }
    }
}

const FUNCTION_KINDS: &[&str] = &[
    "function_declaration",
    "function_expression",
    "function",
    "generator_function_declaration",
    "generator_function",
    "arrow_function",
];

const PARAMETER_KINDS: &[&str] = &["required_parameter", "optional_parameter"];

fn identifier_named<'t>(node: Option<Node<'t>>, src: &ParsedSource<'_>, name: &str) -> Option<Node<'t>> {
    let node = node?;
    (node.kind() == "identifier" && src.text_of(node) == name).then_some(node)
}

/// Unwrap `...rest` down to the bound identifier.
fn parameter_identifier<'t>(pattern: Node<'t>) -> Option<Node<'t>> {
    match pattern.kind() {
        "identifier" => Some(pattern),
        "rest_pattern" => {
            let mut cursor = pattern.walk();
            let found = pattern.named_children(&mut cursor).find(|c| c.kind() == "identifier");
            found
        }
        _ => None,
    }
}

/// Finds the binding site of one variable and the line where its value exists.
#[derive(Debug)]
pub struct DeclarationLocator<'n> {
    name: &'n str,
    original_line: u32,
    line: u32,
}

impl<'n> DeclarationLocator<'n> {
    pub fn new(name: &'n str, original_line: u32) -> Self {
        Self {
            name,
            original_line,
            line: original_line,
        }
    }

    /// Corrected line, or the original line when nothing matched.
    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn run(src: &ParsedSource<'_>, name: &'n str, original_line: u32) -> u32 {
        let mut v = Self::new(name, original_line);
        walk(src, &mut v);
        v.line
    }

    fn on_declarator(&mut self, node: Node<'_>, src: &ParsedSource<'_>) {
        if identifier_named(node.child_by_field_name("name"), src, self.name).is_none() {
            return;
        }
        // Template strings land here too: the value exists only once the
        // whole initializer (closing backtick included) has been evaluated.
        self.line = match node.child_by_field_name("value") {
            Some(init) => src.end_line(init) + 1,
            None => src.start_line(node) + 1,
        };
    }

    /// `catch (e)` and `for (const x of xs)` bind without an initializer.
    fn on_initializerless_binding(&mut self, binding: Option<Node<'_>>, src: &ParsedSource<'_>) {
        if let Some(ident) = identifier_named(binding, src, self.name) {
            self.line = src.start_line(ident) + 1;
        }
    }

    fn on_parameter(&mut self, param: Node<'_>, ident: Option<Node<'_>>, src: &ParsedSource<'_>) {
        if identifier_named(ident, src, self.name).is_none() {
            return;
        }
        // Bound as soon as the function starts; no initializer step to skip.
        if src.start_line(param) >= self.original_line {
            self.line = self.original_line;
        }
    }
}

impl NodeVisitor for DeclarationLocator<'_> {
    fn visit(&mut self, node: Node<'_>, src: &ParsedSource<'_>) {
        match node.kind() {
            "variable_declarator" => self.on_declarator(node, src),
            "catch_clause" => self.on_initializerless_binding(node.child_by_field_name("parameter"), src),
            "for_in_statement" if node.child_by_field_name("kind").is_some() => {
                self.on_initializerless_binding(node.child_by_field_name("left"), src)
            }
            kind if PARAMETER_KINDS.contains(&kind) => {
                let ident = node.child_by_field_name("pattern").and_then(parameter_identifier);
                self.on_parameter(node, ident, src);
            }
            "arrow_function" => {
                if let Some(param) = node.child_by_field_name("parameter") {
                    self.on_parameter(param, Some(param), src);
                }
            }
            _ => {}
        }
    }
}

/// Finds the first executable line of the tightest scope that opens after the
/// original line while still enclosing it.
#[derive(Debug)]
pub struct ScopeStartLocator {
    original_line: u32,
    line: u32,
}

impl ScopeStartLocator {
    pub fn new(original_line: u32) -> Self {
        Self {
            original_line,
            line: original_line,
        }
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn run(src: &ParsedSource<'_>, original_line: u32) -> u32 {
        let mut v = Self::new(original_line);
        walk(src, &mut v);
        v.line
    }

    fn on_opening_brace(&mut self, brace_line: u32) {
        if brace_line > self.original_line {
            self.line = brace_line + 1;
        }
    }
}

impl NodeVisitor for ScopeStartLocator {
    fn visit(&mut self, node: Node<'_>, src: &ParsedSource<'_>) {
        let start = src.start_line(node);
        let end = src.end_line(node);
        if self.original_line < start || self.original_line > end {
            return;
        }

        let kind = node.kind();
        if FUNCTION_KINDS.contains(&kind) {
            if let Some(body) = node.child_by_field_name("body").filter(|b| b.kind() == "statement_block") {
                self.on_opening_brace(src.start_line(body));
            }
        } else if kind == "statement_block" {
            self.on_opening_brace(start);
        }
    }
}
