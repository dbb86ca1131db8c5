//! Command line: generate parsers from schema files, check them, or bootstrap
//! JSON struct declarations from sample documents.
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use rayon::prelude::*;

use crate::analyzer::{self, formatter};
use crate::ast_build::{self, BuildOptions};
use crate::inference;
use crate::jq_exec;
use crate::logging;
use crate::schema::{SchemaRegistry, loader};
use crate::targets::{self, EmitOptions, Target};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// generate web-scraper parsers for python, js, go, lua and dart from declarative schema files
#[derive(Parser, Debug)]
#[command(name = "ssc-gen", version)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,

    /// more log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// only log errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// generate python modules
    Py(PyOut),
    /// generate javascript modules
    Js(JsOut),
    /// generate go packages
    Go(GoOut),
    /// generate lua modules
    Lua(LuaOut),
    /// generate dart libraries
    Dart(DartOut),
    /// analyze schema files without generating code
    Check(CheckOut),
    /// infer json struct declarations from sample JSON documents
    JsonGen(JsonGenOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// One or more inputs. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(Args, Debug, Clone)]
struct CodegenSettings {
    #[command(flatten)]
    input_settings: InputSettings,

    /// output directory
    #[arg(short, long)]
    out: PathBuf,

    /// rewrite css selectors to xpath
    #[arg(long, conflicts_with = "to_css")]
    to_xpath: bool,

    /// rewrite xpath selectors to css where possible
    #[arg(long)]
    to_css: bool,

    /// prefix every generated step with a comment describing it
    #[arg(long)]
    debug: bool,

    /// skip the external code formatter
    #[arg(long)]
    no_format: bool,

    /// generate module and struct docstrings
    #[arg(long)]
    docstring: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum PyFlavor {
    Lxml,
    Parsel,
    Bs4,
    Selectolax,
}

#[derive(clap::Parser, Debug)]
struct PyOut {
    #[command(flatten)]
    settings: CodegenSettings,

    /// html backend of the generated code
    #[arg(long, value_enum, default_value_t = PyFlavor::Lxml)]
    flavor: PyFlavor,
}

#[derive(clap::Parser, Debug)]
struct JsOut {
    #[command(flatten)]
    settings: CodegenSettings,
}

#[derive(clap::Parser, Debug)]
struct GoOut {
    #[command(flatten)]
    settings: CodegenSettings,

    /// package clause of the generated files
    #[arg(long, default_value = "main")]
    package: String,
}

#[derive(clap::Parser, Debug)]
struct LuaOut {
    #[command(flatten)]
    settings: CodegenSettings,
}

#[derive(clap::Parser, Debug)]
struct DartOut {
    #[command(flatten)]
    settings: CodegenSettings,
}

#[derive(clap::Parser, Debug)]
struct CheckOut {
    #[command(flatten)]
    input_settings: InputSettings,
}

#[derive(clap::Parser, Debug)]
struct JsonGenOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// jq filter applied to each document; every output becomes a sample
    #[arg(long)]
    jq: Option<String>,

    /// name of the top-level struct
    #[arg(long, short, default_value = "Root")]
    name: String,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    fn paths(&self) -> Result<Vec<PathBuf>> {
        resolve_file_path_patterns(&self.input)
    }
}

impl CodegenSettings {
    fn build_options(&self) -> BuildOptions {
        BuildOptions { gen_docstring: self.docstring, css_to_xpath: self.to_xpath, xpath_to_css: self.to_css }
    }

    fn generate(&self, target: Target, emit_opts: &EmitOptions) -> Result<()> {
        let paths = self.input_settings.paths()?;
        log::info!("{target}: generating {} file(s) into {}", paths.len(), self.out.display());
        let results: Vec<Result<PathBuf>> =
            paths.par_iter().map(|path| self.generate_file(target, path, emit_opts)).collect();
        let mut failed = Vec::new();
        for (path, result) in paths.iter().zip(results) {
            match result {
                Ok(out_path) => log::info!("{} -> {}", path.display(), out_path.display()),
                Err(error) => {
                    report(path, &error);
                    failed.push(path.display().to_string());
                }
            }
        }
        if !failed.is_empty() {
            bail!("{} of {} file(s) failed: {}", failed.len(), paths.len(), failed.join(", "));
        }
        Ok(())
    }

    fn generate_file(&self, target: Target, path: &Path, emit_opts: &EmitOptions) -> Result<PathBuf> {
        let registry = load_checked(path)?;
        let module = ast_build::build(&registry, self.build_options())?;
        let code = targets::emit(target, &module, emit_opts)?;

        let stem = path.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_else(|| "schema".into());
        let out_path = self.out.join(format!("{stem}.{}", target.extension()));
        std::fs::create_dir_all(&self.out).with_context(|| format!("creating {}", self.out.display()))?;
        std::fs::write(&out_path, code).with_context(|| format!("writing {}", out_path.display()))?;
        if !self.no_format {
            run_formatter(target, &out_path);
        }
        Ok(out_path)
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> Result<()> {
        logging::init(logging::level_for(self.verbose, self.quiet));
        match &self.cmd {
            Command::Py(target) => {
                let target_kind = match target.flavor {
                    PyFlavor::Lxml => Target::PyLxml,
                    PyFlavor::Parsel => Target::PyParsel,
                    PyFlavor::Bs4 => Target::PyBs4,
                    PyFlavor::Selectolax => Target::PySelectolax,
                };
                target.settings.generate(target_kind, &emit_options(&target.settings, None))
            }
            Command::Js(target) => target.settings.generate(Target::JsPure, &emit_options(&target.settings, None)),
            Command::Go(target) => {
                let opts = emit_options(&target.settings, Some(target.package.as_str()));
                target.settings.generate(Target::GoGoquery, &opts)
            }
            Command::Lua(target) => target.settings.generate(Target::Lua, &emit_options(&target.settings, None)),
            Command::Dart(target) => target.settings.generate(Target::Dart, &emit_options(&target.settings, None)),
            Command::Check(target) => check(&target.input_settings),
            Command::JsonGen(target) => json_gen(target),
        }
    }
}

fn emit_options(settings: &CodegenSettings, package: Option<&str>) -> EmitOptions {
    let mut opts = EmitOptions { debug: settings.debug, ..EmitOptions::default() };
    if let Some(package) = package {
        opts.package = package.to_string();
    }
    opts
}

/// Analyzer findings for one file, rendered for the terminal.
#[derive(Debug, thiserror::Error)]
#[error("{count} issue(s) found")]
struct Rejected {
    count: usize,
    rendered: String,
}

/// Load a schema file and refuse it when the analyzer reports anything.
fn load_checked(path: &Path) -> Result<SchemaRegistry> {
    let registry = loader::load_file(path)?;
    let diagnostics = analyzer::analyze(&registry);
    if !diagnostics.is_empty() {
        let source = registry.source.as_ref().map(|s| s.text.as_str());
        let rendered = formatter::format_all(&diagnostics, source, std::io::stderr().is_terminal());
        return Err(Rejected { count: diagnostics.len(), rendered }.into());
    }
    Ok(registry)
}

fn report(path: &Path, error: &anyhow::Error) {
    if let Some(rejected) = error.downcast_ref::<Rejected>() {
        eprintln!("{}\n", rejected.rendered);
    }
    log::error!("{}: {error:#}", path.display());
}

fn check(input: &InputSettings) -> Result<()> {
    let paths = input.paths()?;
    let results: Vec<Result<SchemaRegistry>> = paths.par_iter().map(|path| load_checked(path)).collect();
    let mut failed = 0;
    for (path, result) in paths.iter().zip(results) {
        match result {
            Ok(registry) => log::info!("{}: {} schema(s) ok", path.display(), registry.len()),
            Err(error) => {
                report(path, &error);
                failed += 1;
            }
        }
    }
    if failed > 0 {
        bail!("{failed} of {} file(s) have issues", paths.len());
    }
    Ok(())
}

fn json_gen(target: &JsonGenOut) -> Result<()> {
    let mut samples = Vec::new();
    for path in target.input_settings.paths()? {
        let source = std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
        let value: serde_json::Value =
            serde_json::from_str(&source).with_context(|| format!("parsing JSON in {}", path.display()))?;
        samples.push(value);
    }
    let samples = jq_exec::preprocess(target.jq.as_deref(), samples)?;
    let structs = inference::infer_json_structs(&target.name, &samples)?;
    let rendered = serde_json::to_string_pretty(&inference::to_schema_file(&structs))?;
    match target.out.as_ref() {
        Some(out) => {
            if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(out, format!("{rendered}\n")).with_context(|| format!("writing {}", out.display()))?;
            log::info!("{} struct(s) -> {}", structs.len(), out.display());
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn run_formatter(target: Target, path: &Path) {
    let (program, args) = target.formatter();
    log::debug!("{program} {} {}", args.join(" "), path.display());
    match std::process::Command::new(program).args(args).arg(path).output() {
        Ok(output) if output.status.success() => {}
        Ok(output) => log::warn!(
            "{program} failed on {}: {}",
            path.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        ),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            log::warn!("{program} not found, {} left unformatted", path.display())
        }
        Err(error) => log::warn!("could not run {program}: {error}"),
    }
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern).with_context(|| format!("bad glob pattern: {pattern}"))? {
                matched_any = true;
                out.push(entry?);
            }
            if !matched_any {
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_codegen_flags() {
        let cli = CommandLineInterface::try_parse_from([
            "ssc-gen", "go", "-i", "a.json", "b.json", "-o", "out", "--package", "scrapers", "--to-xpath", "-vv",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        let Command::Go(go) = cli.cmd else { panic!("expected go") };
        assert_eq!(go.package, "scrapers");
        assert_eq!(go.settings.input_settings.input, ["a.json", "b.json"]);
        assert!(go.settings.build_options().css_to_xpath);
        assert_eq!(emit_options(&go.settings, Some(go.package.as_str())).package, "scrapers");
    }

    #[test]
    fn lua_dart_and_python_flavors() {
        let cli = CommandLineInterface::try_parse_from(["ssc-gen", "py", "-i", "a.json", "-o", "o", "--flavor", "selectolax"])
            .unwrap();
        let Command::Py(py) = cli.cmd else { panic!("expected py") };
        assert!(matches!(py.flavor, PyFlavor::Selectolax));

        let cli = CommandLineInterface::try_parse_from(["ssc-gen", "lua", "-i", "a.json", "-o", "o", "--to-css"]).unwrap();
        let Command::Lua(lua) = cli.cmd else { panic!("expected lua") };
        assert!(lua.settings.build_options().xpath_to_css);

        let cli = CommandLineInterface::try_parse_from(["ssc-gen", "dart", "-i", "a.json", "-o", "o"]).unwrap();
        assert!(matches!(cli.cmd, Command::Dart(_)));
    }

    #[test]
    fn selector_rewrites_conflict() {
        let res = CommandLineInterface::try_parse_from(["ssc-gen", "js", "-i", "a.json", "-o", "o", "--to-xpath", "--to-css"]);
        assert!(res.is_err());
    }

    #[test]
    fn json_gen_defaults() {
        let cli = CommandLineInterface::try_parse_from(["ssc-gen", "json-gen", "-i", "sample.json", "--jq", ".data"]).unwrap();
        let Command::JsonGen(gen_out) = cli.cmd else { panic!("expected json-gen") };
        assert_eq!(gen_out.name, "Root");
        assert_eq!(gen_out.jq.as_deref(), Some(".data"));
        assert!(gen_out.out.is_none());
    }

    #[test]
    fn literal_paths_pass_through() {
        let paths = resolve_file_path_patterns(["schemas/books.json"]).unwrap();
        assert_eq!(paths, [PathBuf::from("schemas/books.json")]);
        assert!(resolve_file_path_patterns(["/definitely/not/here/*.json"]).is_err());
    }
}
