use bundler::{
    BundleConfig, BundlerError, DEFAULT_LEFT_DELIM, DEFAULT_RIGHT_DELIM, Delimiters,
    IgnoreRules, ProcessedFile, Result, bundle_directory, bundle_file, bundle_stream,
};
use clap::{Parser, ValueEnum};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

const LONG_HELP: &str = r#"
Directives:
  //include(path/to/file.js)   - Replaced by the bundled contents of the file,
                                 resolved relative to the including file

Naming:
  bundler app.js               -> app-<fingerprint>.js
  bundler app.js -o out.js     -> out.js
  bundler assets/ -o prod      -> every file becomes <stem>-prod.<ext>
  bundler assets/              -> every file becomes <stem>-<fingerprint>.<ext>

Examples:
  # Bundle a single file
  bundler assets/js/app.js
  # Bundle a directory, skipping vendored code
  bundler assets --ignore '/vendor/'
  # Glob excludes relative to the input directory
  bundler assets -x '**/*.min.js' -x 'drafts'
  # gitignore-style exclude file
  bundler assets --ignore-file assets/.bundleignore
  # Custom delimiters
  bundler index.html -l '<!--#include "' -r '"-->'
  # Stream mode: stdin to stdout, includes resolved from a base directory
  cat app.js | bundler - -b assets/js
  # Report produced files as JSON
  bundler assets -f json

Directory mode writes nothing unless every file bundles successfully.
"#;

/// Static text-inclusion bundler.
#[derive(Parser, Debug)]
#[command(
    name = "bundler",
    version,
    about = "Bundle text files by recursively inlining include directives.",
    after_long_help = LONG_HELP
)]
struct Cli {
    /// File or directory to bundle. Use '-' to bundle stdin to stdout.
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output file name (file mode), suffix (directory mode) or output path (stream mode)
    #[arg(short, long, value_name = "NAME")]
    output: Option<String>,

    /// Left delimiter of include directives
    #[arg(short = 'l', long, value_name = "DELIM", default_value = DEFAULT_LEFT_DELIM)]
    left_delim: String,

    /// Right delimiter of include directives
    #[arg(short = 'r', long, value_name = "DELIM", default_value = DEFAULT_RIGHT_DELIM)]
    right_delim: String,

    /// Keep the delimiters around included content
    #[arg(long)]
    keep_delims: bool,

    /// Regular expression for files/dirs to skip (directory mode)
    #[arg(short, long, value_name = "REGEX")]
    ignore: Option<String>,

    /// Exclude glob patterns relative to INPUT (repeatable, directory mode)
    #[arg(short = 'x', long = "exclude", value_name = "GLOB", action = clap::ArgAction::Append)]
    exclude: Vec<String>,

    /// gitignore-style file of patterns to skip (directory mode)
    #[arg(long, value_name = "FILE")]
    ignore_file: Option<PathBuf>,

    /// Base directory for resolving includes in stream mode
    #[arg(short, long, value_name = "DIR", env = "BUNDLER_BASE_DIR")]
    base_dir: Option<PathBuf>,

    /// Maximum include nesting depth (0 disables the limit)
    #[arg(long, value_name = "DEPTH", default_value_t = bundler::config::DEFAULT_MAX_DEPTH)]
    max_depth: usize,

    /// Bundle the files of a directory in parallel
    #[arg(short = 'j', long)]
    parallel: bool,

    /// Format of the produced-files report
    #[arg(short = 'f', long, value_enum, default_value = "plain")]
    format: ReportFormat,

    /// Increase verbosity (can be used multiple times)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ReportFormat {
    /// One `original -> output` line per file
    Plain,
    /// JSON array of processed files
    Json,
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli);

    let config = BundleConfig {
        delimiters: Delimiters::new(cli.left_delim.as_str(), cli.right_delim.as_str()),
        keep_delims: cli.keep_delims,
        max_depth: (cli.max_depth > 0).then_some(cli.max_depth),
        parallel: cli.parallel,
    };

    if cli.input.as_path() == Path::new("-") {
        if let Err(e) = run_stream(&cli, &config) {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
        return;
    }

    let result = if cli.input.is_dir() {
        let rules = match build_ignore_rules(&cli) {
            Ok(rules) => rules,
            Err(e) => {
                eprintln!("Error: invalid ignore pattern: {e}");
                std::process::exit(2);
            }
        };
        bundle_directory(&cli.input, cli.output.as_deref(), &config, &rules)
    } else {
        if cli.ignore.is_some() || !cli.exclude.is_empty() || cli.ignore_file.is_some() {
            warn!("ignore options only apply when INPUT is a directory");
        }
        bundle_file(&cli.input, cli.output.as_deref(), &config).map(|file| vec![file])
    };

    match result.and_then(|files| report(&files, cli.format, cli.quiet)) {
        Ok(()) => {}
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

fn init_logging(cli: &Cli) {
    let level = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn build_ignore_rules(cli: &Cli) -> Result<IgnoreRules> {
    let mut rules = IgnoreRules::new(&cli.input).with_globs(&cli.exclude)?;
    if let Some(pattern) = &cli.ignore {
        rules = rules.with_pattern(pattern)?;
    }
    if let Some(path) = &cli.ignore_file {
        rules = rules.with_ignore_file(path)?;
    }
    Ok(rules)
}

fn run_stream(cli: &Cli, config: &BundleConfig) -> Result<()> {
    let base_dir = match &cli.base_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir()?,
    };
    debug!(base_dir = %base_dir.display(), "bundling stdin");

    let output = cli.output.as_deref().map(Path::new);
    bundle_stdin(io::stdin().lock(), &base_dir, config, output, &mut io::stdout().lock())
}

/// Bundles `input` into `output` when given, `stdout` otherwise. Nothing is
/// written anywhere unless the whole bundle succeeds.
fn bundle_stdin<R, W>(
    input: R,
    base_dir: &Path,
    config: &BundleConfig,
    output: Option<&Path>,
    stdout: &mut W,
) -> Result<()>
where
    R: io::Read,
    W: Write,
{
    let mut bundled = Vec::new();
    bundle_stream(input, &mut bundled, base_dir, config)?;

    match output {
        Some(path) => write_output(path, &bundled),
        None => {
            stdout.write_all(&bundled)?;
            stdout.flush()?;
            Ok(())
        }
    }
}

/// Replaces `path` with `contents` in a single rename
fn write_output(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let path_io = |path: &Path, source: io::Error| BundlerError::PathIo {
        path: path.to_path_buf(),
        source,
    };

    let mut temp = NamedTempFile::new_in(dir).map_err(|e| path_io(dir, e))?;
    temp.write_all(contents)
        .and_then(|()| temp.flush())
        .map_err(|e| path_io(temp.path(), e))?;
    temp.persist(path).map_err(|e| path_io(path, e.error))?;
    debug!(output = %path.display(), "wrote stream bundle");
    Ok(())
}

fn report(files: &[ProcessedFile], format: ReportFormat, quiet: bool) -> Result<()> {
    if quiet {
        return Ok(());
    }
    let mut stdout = io::stdout().lock();
    match format {
        ReportFormat::Plain => {
            for file in files {
                writeln!(
                    stdout,
                    "{} -> {}",
                    file.original_path.display(),
                    file.new_path.display()
                )?;
            }
        }
        ReportFormat::Json => {
            let json = serde_json::to_string_pretty(files)?;
            writeln!(stdout, "{json}")?;
        }
    }
    stdout.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_env() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.txt"), "X").unwrap();
        temp_dir
    }

    #[test]
    fn test_stream_to_stdout() {
        let temp_dir = create_test_env();
        let mut stdout = Vec::new();
        bundle_stdin(
            &b"hello\n//include(a.txt)\n"[..],
            temp_dir.path(),
            &BundleConfig::default(),
            None,
            &mut stdout,
        )
        .unwrap();
        assert_eq!(stdout, b"hello\nX\n");
    }

    #[test]
    fn test_failed_stream_writes_nothing_to_stdout() {
        let temp_dir = create_test_env();
        let mut stdout = Vec::new();
        let err = bundle_stdin(
            &b"hello\n//include(a.txt)\n//include(missing.txt)\n"[..],
            temp_dir.path(),
            &BundleConfig::default(),
            None,
            &mut stdout,
        )
        .unwrap_err();
        assert!(matches!(err, BundlerError::MissingIncludedFile { .. }));
        assert!(stdout.is_empty());
    }

    #[test]
    fn test_failed_stream_keeps_existing_output_file() {
        let temp_dir = create_test_env();
        let out = temp_dir.path().join("out.txt");
        fs::write(&out, "previous").unwrap();

        let mut stdout = Vec::new();
        let err = bundle_stdin(
            &b"//include(a.txt)//include(missing.txt)"[..],
            temp_dir.path(),
            &BundleConfig::default(),
            Some(&out),
            &mut stdout,
        )
        .unwrap_err();
        assert!(matches!(err, BundlerError::MissingIncludedFile { .. }));
        assert_eq!(fs::read_to_string(&out).unwrap(), "previous");
        assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 2);

        bundle_stdin(
            &b"[//include(a.txt)]"[..],
            temp_dir.path(),
            &BundleConfig::default(),
            Some(&out),
            &mut stdout,
        )
        .unwrap();
        assert_eq!(fs::read_to_string(&out).unwrap(), "[X]");
        assert!(stdout.is_empty());
    }
}
