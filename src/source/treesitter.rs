//! Tree-sitter-driven Symbol Source (§4.3.2): generalizes the teacher's
//! Dart-specific stack-based DFS walker (`ast/dart/extract.rs`) into a
//! single walker parameterized by a per-language entity-node table, driven
//! across all five supported grammars instead of one.
//!
//! Used when an LSP is unavailable or too slow. This source never resolves
//! `definition()` lookups itself (no LSP attached); the Collector falls
//! back to a name scan over its own `syms` table instead
//! (`resolve_by_name_fallback` in `collector/dependency.rs`).

use super::{FileSymbols, SymbolNode, SymbolSource};
use crate::config::Language;
use crate::errors::{Error, Result};
use crate::location::{LineIndex, Location, Range};
use crate::model::Import;
use crate::spec::LanguageSpec;
use crate::types::{SymbolKind, Token, TokenKind, TokenModifiers};
use lsp_types::Url;
use std::path::Path;

/// One entity-producing node kind recognized in a grammar, and the
/// `SymbolKind` it maps to.
struct EntityRule {
    node_kind: &'static str,
    symbol_kind: SymbolKind,
    /// The child node kind carrying the entity's name (`name`, `declarator`, …).
    name_field: &'static str,
}

fn entity_rules(language: Language) -> &'static [EntityRule] {
    match language {
        Language::Rust => &[
            EntityRule { node_kind: "function_item", symbol_kind: SymbolKind::Function, name_field: "name" },
            EntityRule { node_kind: "struct_item", symbol_kind: SymbolKind::Struct, name_field: "name" },
            EntityRule { node_kind: "enum_item", symbol_kind: SymbolKind::Enum, name_field: "name" },
            EntityRule { node_kind: "trait_item", symbol_kind: SymbolKind::Interface, name_field: "name" },
            EntityRule { node_kind: "impl_item", symbol_kind: SymbolKind::Object, name_field: "type" },
            EntityRule { node_kind: "const_item", symbol_kind: SymbolKind::Constant, name_field: "name" },
            EntityRule { node_kind: "static_item", symbol_kind: SymbolKind::Variable, name_field: "name" },
        ],
        Language::Python => &[
            EntityRule { node_kind: "function_definition", symbol_kind: SymbolKind::Function, name_field: "name" },
            EntityRule { node_kind: "class_definition", symbol_kind: SymbolKind::Class, name_field: "name" },
        ],
        Language::TypeScript => &[
            EntityRule { node_kind: "function_declaration", symbol_kind: SymbolKind::Function, name_field: "name" },
            EntityRule { node_kind: "class_declaration", symbol_kind: SymbolKind::Class, name_field: "name" },
            EntityRule { node_kind: "interface_declaration", symbol_kind: SymbolKind::Interface, name_field: "name" },
            EntityRule { node_kind: "method_definition", symbol_kind: SymbolKind::Method, name_field: "name" },
            EntityRule { node_kind: "type_alias_declaration", symbol_kind: SymbolKind::Struct, name_field: "name" },
            EntityRule { node_kind: "enum_declaration", symbol_kind: SymbolKind::Enum, name_field: "name" },
        ],
        Language::Java => &[
            EntityRule { node_kind: "class_declaration", symbol_kind: SymbolKind::Class, name_field: "name" },
            EntityRule { node_kind: "interface_declaration", symbol_kind: SymbolKind::Interface, name_field: "name" },
            EntityRule { node_kind: "method_declaration", symbol_kind: SymbolKind::Method, name_field: "name" },
            EntityRule { node_kind: "enum_declaration", symbol_kind: SymbolKind::Enum, name_field: "name" },
            EntityRule { node_kind: "field_declaration", symbol_kind: SymbolKind::Variable, name_field: "declarator" },
        ],
        Language::C | Language::Cpp => &[
            EntityRule { node_kind: "function_definition", symbol_kind: SymbolKind::Function, name_field: "declarator" },
            EntityRule { node_kind: "struct_specifier", symbol_kind: SymbolKind::Struct, name_field: "name" },
            EntityRule { node_kind: "class_specifier", symbol_kind: SymbolKind::Class, name_field: "name" },
            EntityRule { node_kind: "enum_specifier", symbol_kind: SymbolKind::Enum, name_field: "name" },
            EntityRule { node_kind: "declaration", symbol_kind: SymbolKind::Function, name_field: "declarator" },
        ],
    }
}

fn grammar(language: Language) -> tree_sitter::Language {
    match language {
        Language::Rust => tree_sitter_rust::LANGUAGE.into(),
        Language::Python => tree_sitter_python::LANGUAGE.into(),
        Language::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        Language::Java => tree_sitter_java::LANGUAGE.into(),
        Language::Cpp => tree_sitter_cpp::LANGUAGE.into(),
        Language::C => tree_sitter_c::LANGUAGE.into(),
    }
}

/// Tree-sitter-driven source. Name-based reference resolution (no LSP
/// attached) happens one layer up, in the Collector's own `syms` scan.
pub struct TreeSitterSource {
    language: Language,
}

impl TreeSitterSource {
    pub fn new(language: Language) -> Self {
        Self { language }
    }
}

impl SymbolSource for TreeSitterSource {
    fn load_file(&mut self, abs_path: &Path, spec: &dyn LanguageSpec) -> Result<FileSymbols> {
        let bytes = std::fs::read(abs_path)?;
        let text = String::from_utf8(bytes.clone())?;
        let mut parser = tree_sitter::Parser::new();
        parser.set_language(&grammar(self.language)).map_err(|_| Error::TreeSitterLanguage)?;
        let tree = parser.parse(&bytes, None).ok_or(Error::TreeSitterParse)?;

        let uri = Url::from_file_path(abs_path).map_err(|_| Error::InvalidState("non-absolute file path"))?;
        let line_index = LineIndex::new(&text);
        let imports = spec.file_imports(&text);

        let rules = entity_rules(self.language);
        let mut roots = Vec::new();
        let mut cursor = tree.root_node().walk();
        for child in tree.root_node().children(&mut cursor) {
            if let Some(node) = walk_node(child, &bytes, &text, &line_index, &uri, rules) {
                roots.push(node);
            }
        }
        Ok(FileSymbols { imports, roots })
    }

    fn definition(&mut self, location: &Location) -> Result<Vec<Location>> {
        // This source has no LSP attached: definition resolution for its
        // tokens happens one layer up, via the Collector's own name scan
        // over `syms` (`resolve_by_name_fallback` in `collector/dependency.rs`).
        let _ = location;
        Ok(Vec::new())
    }
}

fn walk_node(
    node: tree_sitter::Node,
    bytes: &[u8],
    text: &str,
    line_index: &LineIndex,
    uri: &Url,
    rules: &[EntityRule],
) -> Option<SymbolNode> {
    let rule = rules.iter().find(|r| r.node_kind == node.kind())?;
    let name = node
        .child_by_field_name(rule.name_field)
        .and_then(|n| n.utf8_text(bytes).ok())
        .unwrap_or("")
        .to_string();

    let start = line_index.position_at_byte(text, node.start_byte());
    let end = line_index.position_at_byte(text, node.end_byte());
    let location = Location::new(uri.clone(), Range::new(start, end));
    let node_text = node.utf8_text(bytes).unwrap_or_default().to_string();
    let tokens = collect_tokens(node, bytes, text, line_index, uri);

    // Recurse for nested entities (methods inside impl/class bodies) by
    // walking the node's full subtree rather than only direct children,
    // since methods sit a couple of levels below the `impl_item`/`class_*`
    // node (inside a `declaration_list`/`class_body`).
    let mut children = Vec::new();
    let mut stack: Vec<tree_sitter::Node> = node.named_children(&mut node.walk()).collect();
    while let Some(n) = stack.pop() {
        if n.id() == node.id() {
            continue;
        }
        if let Some(child_sym) = walk_node(n, bytes, text, line_index, uri, rules) {
            children.push(child_sym);
        } else {
            stack.extend(n.named_children(&mut n.walk()));
        }
    }
    children.reverse();

    let mut sym = SymbolNode::definition(name, rule.symbol_kind, location, node_text);
    sym.tokens = tokens;
    sym.children = children;
    Some(sym)
}

/// Flattens a node's subtree into an ordered semantic-token stream. Drops
/// only comments; brackets and operators (`(`, `)`, `->`, `<`, `>`, `:`,
/// `for`'s surrounding punctuation, …) are kept even though
/// `is_entity_token` never treats them as entities, because every
/// `LanguageSpec::function_symbol`/`impl_symbol` locates parameter lists,
/// return-type arrows, and receiver/interface boundaries by searching this
/// same stream for that exact punctuation text.
fn collect_tokens(node: tree_sitter::Node, bytes: &[u8], text: &str, line_index: &LineIndex, uri: &Url) -> Vec<Token> {
    let mut out = Vec::new();
    let mut stack = vec![node];
    let mut seen = Vec::new();
    while let Some(n) = stack.pop() {
        if n.child_count() == 0 {
            seen.push(n);
        } else {
            let mut cursor = n.walk();
            // push in reverse so traversal order is left-to-right
            let children: Vec<_> = n.children(&mut cursor).collect();
            for c in children.into_iter().rev() {
                stack.push(c);
            }
        }
    }
    seen.reverse();

    for leaf in seen {
        let kind = classify_leaf(leaf.kind());
        let raw_text = leaf.utf8_text(bytes).unwrap_or_default();
        if raw_text.trim().is_empty() {
            continue;
        }
        if kind == TokenKind::Comment {
            continue;
        }
        let start = line_index.position_at_byte(text, leaf.start_byte());
        let end = line_index.position_at_byte(text, leaf.end_byte());
        out.push(Token {
            text: raw_text.to_string(),
            kind,
            modifiers: TokenModifiers { declaration: leaf.kind() == "identifier" && out.is_empty(), ..Default::default() },
            location: Location::new(uri.clone(), Range::new(start, end)),
        });
    }
    out
}

fn classify_leaf(kind: &str) -> TokenKind {
    match kind {
        "identifier" | "field_identifier" | "property_identifier" => TokenKind::Identifier,
        "type_identifier" | "primitive_type" => TokenKind::TypeIdentifier,
        "line_comment" | "block_comment" | "comment" => TokenKind::Comment,
        "string_literal" | "number_literal" | "integer" | "float" | "string" => TokenKind::Literal,
        k if k.chars().all(|c| !c.is_alphanumeric() && c != '_') && !k.is_empty() => TokenKind::Bracket,
        k if k.chars().all(|c| c.is_alphabetic()) => TokenKind::Keyword,
        _ => TokenKind::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::RustSpec;
    use std::io::Write;

    #[test]
    fn parses_rust_function_and_struct() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lib.rs");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "struct Dog {{ name: String }}\n\nfn speak(d: &Dog) {{ println!(\"{{}}\", d.name); }}").unwrap();

        let mut source = TreeSitterSource::new(Language::Rust);
        let spec = RustSpec::default();
        let out = source.load_file(&path, &spec).unwrap();
        let names: Vec<_> = out.roots.iter().map(|r| r.name.as_str()).collect();
        assert!(names.contains(&"Dog"));
        assert!(names.contains(&"speak"));
    }
}
