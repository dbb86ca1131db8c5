//! Runs every fixture schema through every target and compares the result
//! with the stored snapshot under `snapshots/<target>/`. A missing snapshot
//! is recorded on first run; `--bless` rewrites all of them. `--json` prints
//! the per-case results as a JSON report on stdout.
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use colored::Colorize;
use serde_json::json;

use ssc_gen::analyzer;
use ssc_gen::ast_build::{self, BuildOptions};
use ssc_gen::logging;
use ssc_gen::schema::loader;
use ssc_gen::targets::{self, EmitOptions, Target};

fn root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

fn snapshot_path(target: Target, fixture: &Path) -> PathBuf {
    let stem = fixture.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();
    let dir = target.name().replace("::", "_");
    root().join("snapshots").join(dir).join(format!("{stem}.{}", target.extension()))
}

fn render(target: Target, fixture: &Path) -> Result<String> {
    let registry = loader::load_file(fixture)?;
    let diagnostics = analyzer::analyze(&registry);
    if !diagnostics.is_empty() {
        let source = registry.source.as_ref().map(|s| s.text.as_str());
        bail!("\n{}", analyzer::formatter::format_all(&diagnostics, source, false));
    }
    let module = ast_build::build(&registry, BuildOptions { gen_docstring: true, ..BuildOptions::default() })?;
    Ok(targets::emit(target, &module, &EmitOptions::default())?)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Match,
    Differs,
    Recorded,
}

impl Status {
    fn as_str(self) -> &'static str {
        match self {
            Self::Match => "ok",
            Self::Differs => "differs",
            Self::Recorded => "recorded",
        }
    }
}

fn write_snapshot(path: &Path, code: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, code).with_context(|| format!("writing {}", path.display()))
}

fn run_one(target: Target, fixture: &Path, bless: bool) -> Result<Status> {
    let code = render(target, fixture)?;
    let snapshot = snapshot_path(target, fixture);
    if bless || !snapshot.exists() {
        write_snapshot(&snapshot, &code)?;
        return Ok(Status::Recorded);
    }
    let expected =
        std::fs::read_to_string(&snapshot).with_context(|| format!("reading {}", snapshot.display()))?;
    Ok(if expected == code { Status::Match } else { Status::Differs })
}

fn main() -> ExitCode {
    logging::init(log::LevelFilter::Warn);
    let bless = std::env::args().any(|a| a == "--bless");
    let json_report = std::env::args().any(|a| a == "--json");
    let pattern = root().join("fixtures").join("*.json");
    let fixtures: Vec<PathBuf> = match glob::glob(&pattern.to_string_lossy()) {
        Ok(paths) => paths.filter_map(Result::ok).collect(),
        Err(error) => {
            eprintln!("bad fixture pattern: {error}");
            return ExitCode::FAILURE;
        }
    };

    let mut failures = 0;
    let mut report = Vec::new();
    for fixture in &fixtures {
        for target in Target::ALL {
            let label = format!("{target} {}", fixture.display());
            let result = run_one(target, fixture, bless);
            match &result {
                Ok(Status::Match) => eprintln!("{} {label}", "ok".green()),
                Ok(Status::Recorded) => eprintln!("{} {label}", "new".yellow()),
                Ok(Status::Differs) => {
                    failures += 1;
                    eprintln!("{} {label}: output differs from snapshot", "FAIL".red().bold());
                }
                Err(error) => {
                    failures += 1;
                    eprintln!("{} {label}: {error:#}", "ERROR".red().bold());
                }
            }
            report.push(json!({
                "target": target.name(),
                "fixture": fixture.file_name().map(|f| f.to_string_lossy().to_string()),
                "status": match &result {
                    Ok(status) => status.as_str().to_string(),
                    Err(error) => format!("error: {error:#}"),
                },
            }));
        }
    }
    eprintln!("{} fixture(s), {} target(s), {failures} failure(s)", fixtures.len(), Target::ALL.len());
    if json_report {
        let summary = json!({ "failures": failures, "cases": report });
        match serde_json::to_string_pretty(&summary) {
            Ok(text) => println!("{text}"),
            Err(error) => eprintln!("cannot serialize report: {error}"),
        }
    }
    if failures == 0 { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_layout() {
        let path = snapshot_path(Target::PyBs4, Path::new("fixtures/books.json"));
        assert!(path.ends_with("snapshots/python_bs4/books.py"));
    }

    #[test]
    fn fixtures_render_for_every_target() {
        for name in ["books.json", "quotes.json"] {
            let fixture = root().join("fixtures").join(name);
            for target in Target::ALL {
                let code = render(target, &fixture).unwrap();
                assert!(code.contains("Code generated by ssc-gen"), "{target} {name}");
            }
        }
    }
}
