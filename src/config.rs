//! `CollectOption` (§6): the Collector's configuration surface.
//!
//! A plain `serde`-friendly value struct, not a dynamic "any" map — every
//! option is a concrete, named field, following the design notes' guidance
//! on replacing dynamic configuration with enumerated, per-field settings.
//! Mirrors the shape of `codegraph-prep`'s `GraphConfig` (grouped,
//! `Default`-derived, serializable) without its environment-variable
//! loader, which has no counterpart in the collector's external interface.

use serde::{Deserialize, Serialize};

/// Hint for interface-definition-language-generated packages (e.g. gRPC/Thrift
/// stubs), used by a `LanguageSpec::namespace` implementation that wants to
/// treat generated IDL output differently from hand-written source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdlPkgType {
    Protobuf,
    Thrift,
    Avro,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Language {
    Rust,
    C,
    Cpp,
    Python,
    Java,
    TypeScript,
}

impl Language {
    pub fn as_str(self) -> &'static str {
        match self {
            Language::Rust => "rust",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::Python => "python",
            Language::Java => "java",
            Language::TypeScript => "typescript",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectOption {
    /// Selects the `LanguageSpec` instance.
    pub language: Language,
    /// If true, resolve and export definitions outside the repo.
    pub load_external_symbol: bool,
    /// If true, include standard-library symbols.
    pub need_std_symbol: bool,
    /// Strip doc-tokens from exported content.
    pub no_need_comment: bool,
    /// Skip files identified as tests.
    pub not_need_test: bool,
    /// Absolute or repo-relative path prefixes to skip.
    pub excludes: Vec<String>,
    /// Switch file-walk granularity to per-package (used with Java/Maven).
    pub load_by_packages: bool,
    /// Optional hint for interface-definition-language-generated packages.
    pub idl_pkg_type: Option<IdlPkgType>,
}

impl CollectOption {
    pub fn new(language: Language) -> Self {
        Self { language, ..Self::default_for(language) }
    }

    fn default_for(language: Language) -> Self {
        Self {
            language,
            load_external_symbol: false,
            need_std_symbol: false,
            no_need_comment: false,
            not_need_test: false,
            excludes: Vec::new(),
            load_by_packages: matches!(language, Language::Java),
            idl_pkg_type: None,
        }
    }

    pub fn is_excluded(&self, repo_relative: &str) -> bool {
        self.excludes.iter().any(|prefix| repo_relative.starts_with(prefix.as_str()))
    }
}

impl Default for CollectOption {
    fn default() -> Self {
        Self::default_for(Language::Rust)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn java_defaults_to_load_by_packages() {
        let opt = CollectOption::new(Language::Java);
        assert!(opt.load_by_packages);
        let opt = CollectOption::new(Language::Rust);
        assert!(!opt.load_by_packages);
    }

    #[test]
    fn excludes_match_by_prefix() {
        let mut opt = CollectOption::default();
        opt.excludes.push("vendor/".into());
        assert!(opt.is_excluded("vendor/lib.rs"));
        assert!(!opt.is_excluded("src/lib.rs"));
    }
}
