//! Internal data model (§3): `DocumentSymbol`, `FunctionInfo`, `VarInfo`,
//! `Dependency`, and the token stream attached to every symbol.
//!
//! Symbols are addressed by **arena index** rather than pointer, per the
//! design notes: `SymbolId` is a `u32` index into the collector's arena, and
//! every other table is keyed by `SymbolId` rather than by identity of a
//! heap allocation. This makes cycle memoization (the exporter's `visited`
//! map) a plain `IndexMap<SymbolId, Identity>` instead of something that
//! needs raw-pointer hashing.

use crate::location::Location;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Index into the collector's symbol arena. Stable for the lifetime of one
/// collection; never reused across collections.
pub type SymbolId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymbolKind {
    Function,
    Method,
    Struct,
    Class,
    Interface,
    Enum,
    TypeParameter,
    Variable,
    Constant,
    EnumMember,
    Object,
    Unknown,
}

impl SymbolKind {
    pub fn is_entity(self) -> bool {
        !matches!(self, SymbolKind::Unknown)
    }

    pub fn is_type_like(self) -> bool {
        matches!(
            self,
            SymbolKind::Struct
                | SymbolKind::Class
                | SymbolKind::Interface
                | SymbolKind::Enum
                | SymbolKind::TypeParameter
        )
    }

    pub fn is_callable(self) -> bool {
        matches!(self, SymbolKind::Function | SymbolKind::Method)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SymbolRole {
    Definition,
    Reference,
}

/// Where a `DocumentSymbol` came from. Only `Local` entries belong in the
/// collector's canonical `syms` table; the other two are arena-resident but
/// intentionally excluded from `syms` so I1/I3 hold without special-casing
/// every lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SymbolOrigin {
    /// Discovered directly in a scanned file.
    Local,
    /// Loaded on demand from outside the repo (`LoadExternalSymbol`).
    ExternalLoaded,
    /// A synthesized `Unknown` placeholder standing in for a location that
    /// resolved but matched no known entity symbol (Phase D fallback).
    SynthesizedUnknown,
    /// A zero-width IPC callee stub (§4.3.3): never inserted into `syms`.
    ExternalStub,
}

/// Semantic token classification, independent of `SymbolKind`: tokens are
/// raw lexical units from the symbol source; `LanguageSpec::token_kind`
/// turns an `Identifier` token into a `SymbolKind` when the source itself
/// didn't resolve one (e.g. a reference token with no attached symbol).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenKind {
    Identifier,
    Keyword,
    TypeIdentifier,
    Comment,
    Operator,
    Bracket,
    Literal,
    Other,
}

/// Bitset of LSP semantic-token modifiers relevant to collection.
/// `declaration` marks the defining-name token (`declareTokenOfSymbol`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenModifiers {
    pub declaration: bool,
    pub readonly: bool,
    pub static_: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
    pub kind: TokenKind,
    pub modifiers: TokenModifiers,
    pub location: Location,
}

/// Internal symbol record. `tokens` is the ordered semantic-token stream
/// covering `text`, used by Phase D to walk outgoing references in
/// declaration order (I4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSymbol {
    pub name: String,
    pub kind: SymbolKind,
    pub location: Location,
    pub text: String,
    pub tokens: Vec<Token>,
    pub children: Vec<SymbolId>,
    pub role: SymbolRole,
    pub origin: SymbolOrigin,
}

impl DocumentSymbol {
    pub fn is_entity(&self) -> bool {
        self.kind.is_entity() && self.origin != SymbolOrigin::SynthesizedUnknown
    }
}

/// `(token-index -> Dependency)` plus the declaration-order list of those
/// token indices, per §3's "map token-index -> dependency plus a companion
/// ordered list". `IndexMap` already preserves insertion order, so `order`
/// is populated in lockstep with insertion and is mostly a convenience
/// accessor rather than a second source of truth.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderedDeps {
    pub by_token: IndexMap<usize, Dependency>,
    pub order: Vec<usize>,
}

impl OrderedDeps {
    pub fn insert(&mut self, token_index: usize, dep: Dependency) {
        if self.by_token.insert(token_index, dep).is_none() {
            self.order.push(token_index);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Dependency> {
        self.order.iter().filter_map(move |i| self.by_token.get(i))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Attached to a function/method symbol by `processSymbol` (§4.3.4).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FunctionInfo {
    pub receiver: Option<SymbolId>,
    pub interface: Option<SymbolId>,
    pub impl_head: Option<String>,
    /// True when the function's own signature carries no `self`/`this`/`cls`
    /// token even though it sits inside a container (an associated
    /// function rather than an instance method).
    pub is_static: bool,
    pub type_params: OrderedDeps,
    pub inputs: OrderedDeps,
    pub outputs: OrderedDeps,
    pub signature: String,
}

/// Attached to a var/const symbol: the resolved type dependency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarInfo {
    pub type_dep: Option<Dependency>,
}

/// `(Location-of-reference, SymbolId-of-definition)`. The definition may be
/// a canonical `syms` entry, a synthesized `Unknown`, or an IPC stub — see
/// `SymbolOrigin`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dependency {
    pub location: Location,
    pub target: SymbolId,
}

/// Classification of a resolved dependency, used by Phase D and the
/// exporter to file an edge into the right bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DepClass {
    FunctionCalls,
    MethodCalls,
    Types,
    GlobalVars,
}

impl DepClass {
    pub fn classify(kind: SymbolKind) -> Option<DepClass> {
        match kind {
            SymbolKind::Function => Some(DepClass::FunctionCalls),
            SymbolKind::Method => Some(DepClass::MethodCalls),
            SymbolKind::Variable | SymbolKind::Constant => Some(DepClass::GlobalVars),
            SymbolKind::Struct
            | SymbolKind::Class
            | SymbolKind::Interface
            | SymbolKind::Enum
            | SymbolKind::TypeParameter => Some(DepClass::Types),
            SymbolKind::EnumMember | SymbolKind::Object | SymbolKind::Unknown => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordered_deps_preserves_insertion_order_and_dedups_token_index() {
        use crate::location::Range;
        use lsp_types::{Position, Url};
        let mut deps = OrderedDeps::default();
        let uri = Url::parse("file:///a.rs").unwrap();
        let loc = |l: u32| Location::new(uri.clone(), Range::new(
            Position { line: l, character: 0 },
            Position { line: l, character: 1 },
        ));
        deps.insert(2, Dependency { location: loc(2), target: 9 });
        deps.insert(0, Dependency { location: loc(0), target: 1 });
        deps.insert(2, Dependency { location: loc(2), target: 42 }); // overwrite, no reorder
        let collected: Vec<_> = deps.iter().map(|d| d.target).collect();
        assert_eq!(collected, vec![42, 1]);
    }

    #[test]
    fn dep_class_classification_matches_kind_table() {
        assert_eq!(DepClass::classify(SymbolKind::Function), Some(DepClass::FunctionCalls));
        assert_eq!(DepClass::classify(SymbolKind::Method), Some(DepClass::MethodCalls));
        assert_eq!(DepClass::classify(SymbolKind::Variable), Some(DepClass::GlobalVars));
        assert_eq!(DepClass::classify(SymbolKind::Interface), Some(DepClass::Types));
        assert_eq!(DepClass::classify(SymbolKind::Unknown), None);
    }
}
