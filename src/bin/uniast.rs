//! Thin CLI driver (the "external collaborator" that owns flag parsing,
//! per spec §1's explicit OUT OF SCOPE list). Maps flags 1:1 onto
//! `CollectOption` fields, runs the library, and writes the resulting
//! `Repository` to disk.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use uniast::{CollectOption, Language, Repository};

#[derive(Parser, Debug)]
#[command(name = "uniast", about = "Extract a unified code graph from a repository")]
struct Args {
    /// Repository root to scan.
    root: PathBuf,

    /// Source language to collect (rust, c, cpp, python, java, typescript).
    #[arg(long, value_enum, default_value = "rust")]
    language: LanguageArg,

    /// Resolve and export definitions that live outside the repo.
    #[arg(long)]
    load_external_symbol: bool,

    /// Include standard-library symbols in the export.
    #[arg(long)]
    need_std_symbol: bool,

    /// Strip comments from exported `Content` fields.
    #[arg(long)]
    no_need_comment: bool,

    /// Skip files identified as tests.
    #[arg(long)]
    not_need_test: bool,

    /// Repo-relative path prefix to exclude; may be repeated.
    #[arg(long = "exclude")]
    excludes: Vec<String>,

    /// Destination path for the exported `Repository` JSON.
    #[arg(long, default_value = "repository.json")]
    out: PathBuf,

    /// Emit one JSON line per module instead of a single JSON document.
    #[arg(long)]
    jsonl: bool,
}

#[derive(Copy, Clone, Debug, clap::ValueEnum)]
enum LanguageArg {
    Rust,
    C,
    Cpp,
    Python,
    Java,
    Typescript,
}

impl From<LanguageArg> for Language {
    fn from(a: LanguageArg) -> Language {
        match a {
            LanguageArg::Rust => Language::Rust,
            LanguageArg::C => Language::C,
            LanguageArg::Cpp => Language::Cpp,
            LanguageArg::Python => Language::Python,
            LanguageArg::Java => Language::Java,
            LanguageArg::Typescript => Language::TypeScript,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let args = Args::parse();
    let mut opt = CollectOption::new(args.language.into());
    opt.load_external_symbol = args.load_external_symbol;
    opt.need_std_symbol = args.need_std_symbol;
    opt.no_need_comment = args.no_need_comment;
    opt.not_need_test = args.not_need_test;
    opt.excludes = args.excludes;

    let repo = uniast::index_repository(&args.root, opt).with_context(|| format!("collecting {}", args.root.display()))?;

    if args.jsonl {
        write_jsonl(&repo, &args.out)?;
    } else {
        let json = serde_json::to_vec_pretty(&repo).context("serializing repository")?;
        std::fs::write(&args.out, json).with_context(|| format!("writing {}", args.out.display()))?;
    }

    tracing::info!(modules = repo.modules.len(), out = %args.out.display(), "export complete");
    Ok(())
}

/// One JSON object per module, newline-delimited — convenient for
/// streaming into a downstream graph-build pass without holding the whole
/// `Repository` in memory at once.
fn write_jsonl(repo: &Repository, out: &PathBuf) -> Result<()> {
    let mut w = uniast::JsonlWriter::open(out).context("opening jsonl output")?;
    for module in repo.modules.values() {
        w.write_obj(module).context("writing module")?;
    }
    w.finish().context("flushing jsonl output")
}
