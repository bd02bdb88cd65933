use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser};

use crate::format::{Encoding, LineEnding};

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "

License: MIT
Rust Edition: 2024"
);

#[derive(Parser, Debug)]
#[command(name = "textfmt")]
#[command(about = "Detect and convert text file encodings and line endings in place")]
#[command(long_about = "textfmt inspects text files and rewrites them in place to a target
encoding and line-ending style.

Each file is scanned once to detect its line endings. When it differs from
the requested target, the content is streamed through the needed
conversion steps into a sibling staging file (FILE.new) which then
atomically replaces the original. Files already in the target format are
reported and left untouched.

Without --enc or --eol every file is only reported.

ENCODINGS:
  UTF8, UTF-8, U                   UTF-8
  EUC, EUCJP, EUC-JP, E            EUC-JP
  JIS, ISO2022JP, J                ISO-2022-JP
  CP932, SJIS, SHIFT_JIS, S        Shift_JIS

LINE ENDINGS:
  LF, UNIX, OSX                    \\n
  CRLF, WIN, DOS                   \\r\\n
  CR, MAC                          \\r

Encoding detection is not implemented yet: detected files are reported as
binary and never transcoded unless --from names their encoding.

EXAMPLES:
  textfmt notes.txt                     Show the detected format
  textfmt --eol LF src/                 Convert a tree to LF line endings
  textfmt -n --eol CRLF docs/           Show what would change
  textfmt --from SJIS --enc UTF8 a.txt  Transcode a Shift_JIS file")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_version = LONG_VERSION)]
struct Cli {
    /// Files or directories to process
    #[arg(value_name = "PATH", required_unless_present_any = ["show_config", "init_config"])]
    paths: Vec<PathBuf>,

    /// Target encoding (UTF8, EUC, JIS, CP932)
    #[arg(short = 'e', long = "enc", value_name = "ENC")]
    encoding: Option<Encoding>,

    /// Target line ending (LF, CRLF, CR)
    #[arg(short = 'l', long = "eol", value_name = "EOL")]
    eol: Option<LineEnding>,

    /// Treat every file as being in this encoding
    #[arg(long = "from", value_name = "ENC")]
    source_encoding: Option<Encoding>,

    /// Exclude pattern (regex) applied to paths found while walking directories
    #[arg(short = 'x', long, value_name = "REGEX")]
    exclude: Option<String>,

    /// Don't exclude anything while walking directories
    #[arg(long = "no-exclude", conflicts_with = "exclude")]
    no_exclude: bool,

    /// Report planned conversions without modifying files
    #[arg(short = 'n', long = "dry-run")]
    dry_run: bool,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Configuration file (default: ~/.textfmt/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print the effective configuration and exit
    #[arg(long = "show-config")]
    show_config: bool,

    /// Write a commented default configuration file and exit
    #[arg(long = "init-config", conflicts_with = "show_config")]
    init_config: bool,
}

/// How the exclude pattern was given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExcludeArg {
    /// Use the configured (or built-in) pattern.
    Default,
    Pattern(String),
    Disabled,
}

#[derive(Debug)]
pub enum Args {
    Run {
        paths: Vec<PathBuf>,
        encoding: Option<Encoding>,
        eol: Option<LineEnding>,
        source_encoding: Option<Encoding>,
        exclude: ExcludeArg,
        dry_run: bool,
        verbose: u8,
        config: Option<PathBuf>,
    },
    ShowConfig {
        config: Option<PathBuf>,
    },
    InitConfig {
        config: Option<PathBuf>,
    },
}

pub fn parse_args() -> Result<Args> {
    Ok(Cli::parse().into())
}

impl From<Cli> for Args {
    fn from(cli: Cli) -> Self {
        if cli.show_config {
            return Args::ShowConfig { config: cli.config };
        }
        if cli.init_config {
            return Args::InitConfig { config: cli.config };
        }

        let exclude = if cli.no_exclude {
            ExcludeArg::Disabled
        } else if let Some(pattern) = cli.exclude {
            ExcludeArg::Pattern(pattern)
        } else {
            ExcludeArg::Default
        };

        Args::Run {
            paths: cli.paths,
            encoding: cli.encoding,
            eol: cli.eol,
            source_encoding: cli.source_encoding,
            exclude,
            dry_run: cli.dry_run,
            verbose: cli.verbose,
            config: cli.config,
        }
    }
}
