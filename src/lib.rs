//! Language-neutral code graph extraction (Unified AST) over Rust, C/C++,
//! Python, Java, and TypeScript repositories.
//!
//! The pipeline has five components (§2): [`location`] (C1) and [`types`]
//! underpin everything; [`spec`] (C2) supplies per-language strategy;
//! [`source`] (C3) drives an LSP server, a tree-sitter parse, or an IPC
//! cache to produce raw symbols; [`collector`] (C4) resolves those symbols
//! into the internal tables; [`exporter`] (C5) walks the tables and emits
//! the public [`model::Repository`] tree.

pub mod collector;
pub mod config;
pub mod errors;
pub mod exporter;
pub mod location;
pub mod model;
pub mod spec;
pub mod source;
pub mod types;
mod util;

pub use collector::Collector;
pub use config::{CollectOption, IdlPkgType, Language};
pub use errors::{Error, ExportResult, ExportSentinel, Result};
pub use exporter::Exporter;
pub use model::Repository;
pub use source::{IpcParser, IpcSymbolSource, LspSymbolSource, SymbolSource, TreeSitterSource};
pub use util::jsonl::JsonlWriter;

use std::path::Path;

/// Runs the whole pipeline over `root` with a tree-sitter-driven source:
/// scan, collect, export. This is the entrypoint most callers want; use
/// [`Collector`]/[`Exporter`] directly for an LSP-driven source, or
/// [`index_repository_via_ipc`] for an IPC-driven one, or to inspect the
/// internal tables between phases.
pub fn index_repository(root: impl AsRef<Path>, opt: CollectOption) -> Result<Repository> {
    let mut source = TreeSitterSource::new(opt.language);
    let mut collector = Collector::new(root.as_ref(), opt);
    collector.collect(&mut source)?;
    Ok(Exporter::new(collector)?.export())
}

/// Runs the whole pipeline over `root` against a previously computed IPC
/// parser cache (§4.3.3), instead of parsing source directly.
pub fn index_repository_via_ipc<P: source::ipc::IpcParser>(
    root: impl AsRef<Path>,
    opt: CollectOption,
    parser: P,
) -> Result<Repository> {
    let mut source = IpcSymbolSource::new(parser);
    let mut collector = Collector::new(root.as_ref(), opt);
    collector.collect_via_ipc(&mut source)?;
    Ok(Exporter::new(collector)?.export())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn index_repository_covers_a_small_rust_crate() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), "[package]\nname = \"demo\"\nversion = \"0.1.0\"\n").unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        let mut f = std::fs::File::create(dir.path().join("src/lib.rs")).unwrap();
        writeln!(f, "pub fn greet(name: &str) -> String {{ format!(\"hi {{name}}\") }}").unwrap();

        let repo = index_repository(dir.path(), CollectOption::new(Language::Rust)).unwrap();
        let module = repo.modules.get("demo").expect("demo module discovered");
        let pkg = module.packages.get("").expect("default package");
        assert!(pkg.functions.contains_key("greet"));
    }
}
