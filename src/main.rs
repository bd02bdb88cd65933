use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use colored::Colorize;
use regex::Regex;
use tracing::info;

use textfmt::cli::{Args, ExcludeArg, parse_args};
use textfmt::config::{self, Config};
use textfmt::logger;
use textfmt::{FileProcessor, Options, Outcome};

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::from(2)
        }
    }
}

fn run() -> Result<ExitCode> {
    let args = parse_args()?;

    match args {
        Args::ShowConfig { config } => {
            let config = load_checked_config(config.as_deref())?;
            print!("{}", config.to_toml()?);
            Ok(ExitCode::SUCCESS)
        }
        Args::InitConfig { config } => {
            let path = config::save_default_config(config.as_deref())?;
            println!("Wrote default configuration to {}", path.display());
            Ok(ExitCode::SUCCESS)
        }
        Args::Run {
            paths,
            encoding,
            eol,
            source_encoding,
            exclude,
            dry_run,
            verbose,
            config,
        } => {
            let config = load_checked_config(config.as_deref())?;
            if let Some(log_path) =
                logger::init_logging(verbose, config.logging.debug, config.logging.file.as_deref())?
            {
                info!(path = %log_path.display(), "logging to file");
            }

            let mut target = config.target_format()?;
            if let Some(encoding) = encoding {
                target.encoding = encoding;
            }
            if let Some(eol) = eol {
                target.line_ending = eol;
            }

            let exclude = match exclude {
                ExcludeArg::Default => config.exclude_regex()?,
                ExcludeArg::Pattern(pattern) => Some(
                    Regex::new(&pattern)
                        .with_context(|| format!("Invalid exclude pattern: {pattern}"))?,
                ),
                ExcludeArg::Disabled => None,
            };

            let options = Options {
                target,
                source_encoding,
                exclude,
                dry_run,
                buffer_size: config.scan.buffer_size,
            };
            process_paths(&paths, options)
        }
    }
}

fn load_checked_config(path: Option<&Path>) -> Result<Config> {
    let config = config::load_config(path)?;
    config::validate_config(&config)?;
    Ok(config)
}

fn process_paths(paths: &[PathBuf], options: Options) -> Result<ExitCode> {
    let mut processor = FileProcessor::new(options);
    for path in paths {
        processor.process_path(path, |path, result| match result {
            Ok(outcome) => print_outcome(path, outcome),
            Err(e) => eprintln!("{}: {}", path.display(), e.to_string().red()),
        });
    }

    let report = processor.report();
    info!(
        converted = report.converted,
        planned = report.planned,
        conforming = report.conforming,
        failed = report.failed,
        "done"
    );

    if report.has_failures() {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn print_outcome(path: &Path, outcome: &Outcome) {
    let text = outcome.to_string();
    let text = match outcome {
        Outcome::Conforming(_) => text.normal(),
        Outcome::Planned { .. } => text.yellow(),
        Outcome::Converted { .. } => text.green(),
    };
    println!("{} {}", path.display(), text);
}
