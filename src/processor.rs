//! Per-path driver: detect, plan, convert.
//!
//! Files named on the command line are always processed. Directories are
//! walked recursively; entries whose path matches the exclude pattern are
//! skipped (excluded directories are not descended into). A failure on one
//! file is reported and the walk continues.

use std::fmt;
use std::fs::{self, File};
use std::path::Path;

use regex::Regex;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::convert::convert;
use crate::detect::{BinaryEncodingDetector, detect_with};
use crate::error::{Error, Result};
use crate::format::{Encoding, FormatInfo, Step};
use crate::transform::DEFAULT_BUFFER_SIZE;

/// Default exclude pattern for directory walks.
pub const DEFAULT_EXCLUDE: &str = r"\.git$|\.svn$|\.hg$|\.o$|\.obj$|\.exe$";

/// What to convert files to and how to find them.
#[derive(Debug, Clone)]
pub struct Options {
    pub target: FormatInfo,
    /// Overrides the detected source encoding.
    pub source_encoding: Option<Encoding>,
    pub exclude: Option<Regex>,
    pub dry_run: bool,
    pub buffer_size: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            target: FormatInfo::default(),
            source_encoding: None,
            exclude: None,
            dry_run: false,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

/// What happened to one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Already in the target format; left untouched.
    Conforming(FormatInfo),
    /// Would be converted (dry run).
    Planned { from: FormatInfo, steps: Vec<Step> },
    /// Converted in place.
    Converted { from: FormatInfo, steps: Vec<Step> },
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Conforming(info) => write!(f, "({info})"),
            Outcome::Planned { from, steps } => {
                write!(f, "({from}) would {}", join_steps(steps))
            }
            Outcome::Converted { from, steps } => {
                write!(f, "({from}) converted: {}", join_steps(steps))
            }
        }
    }
}

fn join_steps(steps: &[Step]) -> String {
    steps
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Totals over every processed file.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Report {
    pub conforming: usize,
    pub planned: usize,
    pub converted: usize,
    pub failed: usize,
}

impl Report {
    fn record(&mut self, result: &Result<Outcome>) {
        match result {
            Ok(Outcome::Conforming(_)) => self.conforming += 1,
            Ok(Outcome::Planned { .. }) => self.planned += 1,
            Ok(Outcome::Converted { .. }) => self.converted += 1,
            Err(_) => self.failed += 1,
        }
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

pub struct FileProcessor {
    options: Options,
    report: Report,
}

impl FileProcessor {
    pub fn new(options: Options) -> Self {
        Self {
            options,
            report: Report::default(),
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn report(&self) -> &Report {
        &self.report
    }

    /// Process a file, or every file below a directory.
    ///
    /// `on_file` is called once per file (or walk error) with its result.
    pub fn process_path<F>(&mut self, path: &Path, mut on_file: F)
    where
        F: FnMut(&Path, &Result<Outcome>),
    {
        if path.is_dir() {
            self.walk(path, &mut on_file);
        } else {
            let result = self.process_file(path);
            self.report.record(&result);
            on_file(path, &result);
        }
    }

    fn walk<F>(&mut self, root: &Path, on_file: &mut F)
    where
        F: FnMut(&Path, &Result<Outcome>),
    {
        let exclude = self.options.exclude.clone();
        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !is_excluded(entry.path(), exclude.as_ref()));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map_or_else(|| root.to_path_buf(), Path::to_path_buf);
                    let result = Err(Error::Io(e.into()));
                    self.report.record(&result);
                    on_file(&path, &result);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let result = self.process_file(entry.path());
            self.report.record(&result);
            on_file(entry.path(), &result);
        }
    }

    /// Detect the format of one file and convert it when it differs from the
    /// target.
    ///
    /// A symlink is resolved and the file it points to is converted, so the
    /// link itself survives.
    pub fn process_file(&self, path: &Path) -> Result<Outcome> {
        let resolved;
        let path = if fs::symlink_metadata(path)?.file_type().is_symlink() {
            resolved = fs::canonicalize(path)?;
            resolved.as_path()
        } else {
            path
        };

        let mut source = {
            let mut file = File::open(path)?;
            detect_with(&mut file, &mut BinaryEncodingDetector, self.options.buffer_size)?
        };
        if let Some(encoding) = self.options.source_encoding {
            source.encoding = encoding;
        }
        debug!(path = %path.display(), format = %source, "source format");

        let target = &self.options.target;
        let Some(mut chain) = source.transformer_with_buffer_size(target, self.options.buffer_size)
        else {
            return Ok(Outcome::Conforming(source));
        };
        let steps = source.plan(target);

        if self.options.dry_run {
            return Ok(Outcome::Planned {
                from: source,
                steps,
            });
        }

        match convert(path, &mut chain) {
            Ok(()) => {}
            Err(Error::Cleanup { backup, source: e }) => {
                warn!(backup = %backup.display(), error = %e, "converted, backup left behind");
            }
            Err(e) => return Err(e),
        }
        info!(path = %path.display(), from = %source, "converted");
        Ok(Outcome::Converted {
            from: source,
            steps,
        })
    }
}

fn is_excluded(path: &Path, exclude: Option<&Regex>) -> bool {
    exclude.is_some_and(|re| re.is_match(&path.to_string_lossy()))
}
