// relations-cli: shared utilities for CLI tools.

use std::path::PathBuf;
use std::process;

use relations_fst::{BuildConfig, CompileError, SubsequentialTransducer};

/// Environment variable naming a file that holds the expression.
pub const EXPR_PATH_VAR: &str = "RELATIONS_EXPR_PATH";

/// Environment variable holding the default state limit.
pub const STATE_LIMIT_VAR: &str = "RELATIONS_STATE_LIMIT";

/// Where the expression comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Inline(String),
    File(PathBuf),
}

/// Options shared by every tool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
    pub source: Option<Source>,
    pub state_limit: Option<usize>,
    /// Arguments not consumed by the shared options.
    pub rest: Vec<String>,
}

/// Parse `-e EXPR`, `-f FILE` and `--state-limit N` (also in `--flag=VALUE`
/// form) out of the command line.
pub fn parse_options(args: &[String]) -> Result<Options, String> {
    let mut options = Options::default();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) if flag.starts_with("--") => (flag, Some(value.to_string())),
            _ => (arg.as_str(), None),
        };
        let mut value = |name: &str| -> Result<String, String> {
            match inline.clone() {
                Some(v) => Ok(v),
                None => iter
                    .next()
                    .cloned()
                    .ok_or_else(|| format!("{name} requires a value")),
            }
        };
        match flag {
            "-e" | "--expr" => options.source = Some(Source::Inline(value(flag)?)),
            "-f" | "--file" => options.source = Some(Source::File(PathBuf::from(value(flag)?))),
            "--state-limit" => options.state_limit = Some(parse_limit(&value(flag)?)?),
            _ => options.rest.push(arg.clone()),
        }
    }

    Ok(options)
}

fn parse_limit(text: &str) -> Result<usize, String> {
    text.trim()
        .parse()
        .map_err(|e| format!("invalid state limit {text:?}: {e}"))
}

impl Options {
    /// Resolve the expression source.
    ///
    /// Search order:
    /// 1. `-e` / `-f` argument
    /// 2. `RELATIONS_EXPR_PATH` environment variable
    pub fn resolve_source(&self) -> Result<Source, String> {
        if let Some(source) = &self.source {
            return Ok(source.clone());
        }
        match std::env::var(EXPR_PATH_VAR) {
            Ok(path) if !path.is_empty() => Ok(Source::File(PathBuf::from(path))),
            _ => Err(format!(
                "no expression given: use -e EXPR, -f FILE or set {EXPR_PATH_VAR}"
            )),
        }
    }

    /// Build the construction config, falling back to `RELATIONS_STATE_LIMIT`.
    pub fn build_config(&self) -> Result<BuildConfig, String> {
        let limit = match self.state_limit {
            Some(limit) => Some(limit),
            None => match std::env::var(STATE_LIMIT_VAR) {
                Ok(text) if !text.is_empty() => Some(parse_limit(&text)?),
                _ => None,
            },
        };
        Ok(match limit {
            Some(limit) => BuildConfig::new().with_max_states(limit),
            None => BuildConfig::new(),
        })
    }
}

/// Read the expression text named by `source`.
pub fn load_expression(source: &Source) -> Result<String, String> {
    match source {
        Source::Inline(text) => Ok(text.clone()),
        Source::File(path) => std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {}", path.display(), e)),
    }
}

/// Resolve, read and compile the expression selected by `options`.
pub fn load_transducer(options: &Options) -> Result<SubsequentialTransducer, String> {
    let source = options.resolve_source()?;
    let config = options.build_config()?;
    let text = load_expression(&source)?;
    log::debug!("compiling {} characters with {:?}", text.chars().count(), config);
    relations_fst::compile_with(&text, &config).map_err(|e: CompileError| e.to_string())
}

/// Print an error message and exit with code 1.
pub fn fatal(msg: &str) -> ! {
    eprintln!("error: {msg}");
    process::exit(1);
}

/// Check if `--help` or `-h` is in the args.
pub fn wants_help(args: &[String]) -> bool {
    args.iter().any(|a| a == "--help" || a == "-h")
}
