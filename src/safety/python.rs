// src/safety/python.rs
// Python parsing with tree-sitter: syntax diagnostics and import extraction

use std::fmt;

use tree_sitter::{Node, Parser, Tree};

/// Location and description of the first syntax error in a source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxDiagnostic {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl fmt::Display for SyntaxDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}: {}", self.line, self.column, self.message)
    }
}

/// A module referenced by an `import` or `from ... import` statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRef {
    /// Dotted path as written, e.g. `os.path` or `.sibling`
    pub module: String,
    pub line: usize,
}

impl ImportRef {
    /// Top-level package; empty for relative imports
    pub fn top_level(&self) -> &str {
        if self.module.starts_with('.') {
            return "";
        }
        self.module.split('.').next().unwrap_or("").trim()
    }
}

/// Parse `source` as Python. Any error or missing node is a syntax failure.
pub fn parse(source: &str) -> Result<Tree, SyntaxDiagnostic> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .map_err(|e| SyntaxDiagnostic {
            line: 0,
            column: 0,
            message: format!("Python grammar unavailable: {}", e),
        })?;

    let tree = parser.parse(source, None).ok_or_else(|| SyntaxDiagnostic {
        line: 0,
        column: 0,
        message: "parser produced no tree".to_string(),
    })?;

    let root = tree.root_node();
    if root.has_error() {
        let diagnostic = first_error(root)
            .map(|node| describe_error(node, source.as_bytes()))
            .unwrap_or_else(|| SyntaxDiagnostic {
                line: root.start_position().row + 1,
                column: root.start_position().column + 1,
                message: "invalid syntax".to_string(),
            });
        return Err(diagnostic);
    }

    if let Some(diagnostic) = first_python2_construct(root, source.as_bytes()) {
        return Err(diagnostic);
    }

    Ok(tree)
}

/// The grammar also accepts Python 2 forms (and a few targets) that CPython 3
/// rejects at compile time; they surface here without an ERROR node.
fn first_python2_construct(node: Node, source: &[u8]) -> Option<SyntaxDiagnostic> {
    let message = match node.kind() {
        "print_statement" => Some("print statement; use print(...)".to_string()),
        "exec_statement" => Some("exec statement; use exec(...)".to_string()),
        "integer" => legacy_integer(&node_text(node, source)),
        "identifier" => {
            let name = node_text(node, source);
            matches!(name.as_str(), "async" | "await")
                .then(|| format!("`{}` is a reserved keyword", name))
        }
        "augmented_assignment" => node
            .child_by_field_name("left")
            .filter(|left| !is_single_target(*left))
            .map(|_| "illegal expression for augmented assignment".to_string()),
        "comparison_operator" if has_token(node, "<>") => {
            Some("`<>` is not an operator; use `!=`".to_string())
        }
        "except_clause" if has_token(node, ",") => {
            Some("`except E, name`; use `except E as name`".to_string())
        }
        "raise_statement"
            if node
                .named_children(&mut node.walk())
                .any(|child| child.kind() == "expression_list") =>
        {
            Some("`raise E, value`; use `raise E(value)`".to_string())
        }
        _ => None,
    };

    if let Some(message) = message {
        let position = node.start_position();
        return Some(SyntaxDiagnostic {
            line: position.row + 1,
            column: position.column + 1,
            message,
        });
    }

    node.children(&mut node.walk())
        .find_map(|child| first_python2_construct(child, source))
}

/// Leading-zero octals (`0777`) and long suffixes (`10L`)
fn legacy_integer(text: &str) -> Option<String> {
    if text.ends_with(['j', 'J']) {
        return None;
    }
    if text.ends_with(['l', 'L']) {
        return Some(format!("long suffix in `{}`", text));
    }
    let mut chars = text.chars();
    let leading_zero_octal = chars.next() == Some('0')
        && chars.next().is_some_and(|c| c.is_ascii_digit() || c == '_')
        && text.chars().any(|c| c.is_ascii_digit() && c != '0');
    leading_zero_octal.then(|| format!("leading zeros in `{}`; use an 0o prefix", text))
}

/// Augmented assignment takes exactly one name, attribute or subscript
fn is_single_target(node: Node) -> bool {
    match node.kind() {
        "identifier" | "attribute" | "subscript" => true,
        "tuple_pattern" | "parenthesized_expression" => {
            !has_token(node, ",")
                && node.named_child_count() == 1
                && node.named_child(0).is_some_and(is_single_target)
        }
        _ => false,
    }
}

fn has_token(node: Node, kind: &str) -> bool {
    node.children(&mut node.walk()).any(|child| child.kind() == kind)
}

fn first_error(node: Node) -> Option<Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    for child in node.children(&mut node.walk()) {
        if child.is_error() || child.is_missing() || child.has_error() {
            if let Some(found) = first_error(child) {
                return Some(found);
            }
        }
    }
    None
}

fn describe_error(node: Node, source: &[u8]) -> SyntaxDiagnostic {
    let position = node.start_position();
    let message = if node.is_missing() {
        format!("missing `{}`", node.kind())
    } else {
        let text = node_text(node, source);
        let snippet: String = text.lines().next().unwrap_or("").trim().chars().take(40).collect();
        if snippet.is_empty() {
            "unexpected end of input".to_string()
        } else {
            format!("unexpected `{}`", snippet)
        }
    };

    SyntaxDiagnostic {
        line: position.row + 1,
        column: position.column + 1,
        message,
    }
}

/// Every module reference in import statements, at any nesting depth, in source order
pub fn collect_imports(tree: &Tree, source: &str) -> Vec<ImportRef> {
    let mut imports = Vec::new();
    walk(tree.root_node(), source.as_bytes(), &mut imports);
    imports
}

fn walk(node: Node, source: &[u8], imports: &mut Vec<ImportRef>) {
    match node.kind() {
        "import_statement" => {
            let line = node.start_position().row + 1;
            for name in node.children_by_field_name("name", &mut node.walk()) {
                // `import a.b as c` wraps the dotted name in an aliased_import
                let dotted = match name.kind() {
                    "aliased_import" => name.child_by_field_name("name"),
                    _ => Some(name),
                };
                if let Some(dotted) = dotted {
                    imports.push(ImportRef {
                        module: node_text(dotted, source),
                        line,
                    });
                }
            }
            return;
        }
        "import_from_statement" => {
            if let Some(module) = node.child_by_field_name("module_name") {
                imports.push(ImportRef {
                    module: node_text(module, source),
                    line: node.start_position().row + 1,
                });
            }
            return;
        }
        _ => {}
    }

    for child in node.children(&mut node.walk()) {
        walk(child, source, imports);
    }
}

fn node_text(node: Node, source: &[u8]) -> String {
    node.utf8_text(source).unwrap_or("").to_string()
}
