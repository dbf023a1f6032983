use crate::model::SymbolKind;
use tree_sitter::{Language, Node, Parser};

/// A tree-sitter grammar plus the node kinds that denote indexable definitions.
#[derive(Clone)]
pub struct Grammar {
    pub name: &'static str,
    pub language: Language,
    pub extensions: &'static [&'static str],
    pub function_kinds: &'static [&'static str],
    pub class_kinds: &'static [&'static str],
    pub name_field: &'static str,
}

impl std::fmt::Debug for Grammar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Grammar")
            .field("name", &self.name)
            .field("extensions", &self.extensions)
            .finish()
    }
}

impl Grammar {
    pub fn parser(&self) -> Result<Parser, tree_sitter::LanguageError> {
        let mut parser = Parser::new();
        parser.set_language(&self.language)?;
        Ok(parser)
    }

    fn symbol_kind(&self, node_kind: &str) -> Option<SymbolKind> {
        if self.function_kinds.contains(&node_kind) {
            Some(SymbolKind::Function)
        } else if self.class_kinds.contains(&node_kind) {
            Some(SymbolKind::Class)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedSymbol {
    pub name: String,
    pub kind: SymbolKind,
    pub line: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("parser produced no tree")]
    NoTree,
    #[error("syntax error near line {line}")]
    Syntax { line: usize },
}

/// Parse `source` and return its definitions in pre-order.
pub fn extract_symbols(
    parser: &mut Parser,
    grammar: &Grammar,
    source: &[u8],
) -> Result<Vec<ExtractedSymbol>, ExtractError> {
    let tree = parser.parse(source, None).ok_or(ExtractError::NoTree)?;
    let root = tree.root_node();
    if root.has_error() {
        return Err(ExtractError::Syntax {
            line: first_error_line(root),
        });
    }
    Ok(walk_preorder(root, grammar, source))
}

// Explicit stack instead of recursion; children are pushed in reverse so they
// pop in source order, which keeps the output identical to a recursive pre-order walk.
fn walk_preorder(root: Node<'_>, grammar: &Grammar, source: &[u8]) -> Vec<ExtractedSymbol> {
    let mut symbols = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if let Some(kind) = grammar.symbol_kind(node.kind()) {
            if let Some(name) = declared_name(node, grammar, source) {
                symbols.push(ExtractedSymbol {
                    name,
                    kind,
                    line: node.start_position().row + 1,
                });
            }
        }
        let mut cursor = node.walk();
        let children: Vec<Node<'_>> = node.named_children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
    symbols
}

fn declared_name(node: Node<'_>, grammar: &Grammar, source: &[u8]) -> Option<String> {
    let name_node = node.child_by_field_name(grammar.name_field)?;
    let name = name_node.utf8_text(source).ok()?.trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

fn first_error_line(root: Node<'_>) -> usize {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            return node.start_position().row + 1;
        }
        if !node.has_error() {
            continue;
        }
        let mut cursor = node.walk();
        let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
    root.start_position().row + 1
}
