use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::cli::OutputFormat;
use crate::extractors::VideoId;
use crate::utils::output_file_prefix;
use crate::Result;

pub mod formatters;

pub use formatters::*;

/// Kind of content written to an output file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Transcript,
    Summary,
    Outline,
}

impl OutputKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputKind::Transcript => "transcript",
            OutputKind::Summary => "summary",
            OutputKind::Outline => "outline",
        }
    }

    fn file_suffix(&self) -> String {
        format!("_{}.txt", self.as_str())
    }
}

/// Paths of the files written by one command
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultPaths {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub outline: Option<PathBuf>,
}

impl ResultPaths {
    pub fn set(&mut self, kind: OutputKind, path: PathBuf) {
        let slot = match kind {
            OutputKind::Transcript => &mut self.transcript,
            OutputKind::Summary => &mut self.summary,
            OutputKind::Outline => &mut self.outline,
        };
        *slot = Some(path);
    }

    pub fn get(&self, kind: OutputKind) -> Option<&Path> {
        match kind {
            OutputKind::Transcript => self.transcript.as_deref(),
            OutputKind::Summary => self.summary.as_deref(),
            OutputKind::Outline => self.outline.as_deref(),
        }
    }

    /// Written files as `(logical name, path)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Path)> + '_ {
        [OutputKind::Transcript, OutputKind::Summary, OutputKind::Outline]
            .into_iter()
            .filter_map(move |kind| self.get(kind).map(|path| (kind.as_str(), path)))
    }
}

/// Result record of one command
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub video_id: VideoId,

    /// Language code of the transcript track
    pub language: String,

    /// Estimated transcript size, when a tokenizer was involved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript_tokens: Option<usize>,

    /// Transcript text (only echoed for `script`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,

    /// Summary or outline text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated: Option<String>,

    /// Set when part of the transcript was dropped to fit the model's context window
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub truncated: bool,

    pub paths: ResultPaths,

    pub generated_at: DateTime<Utc>,
}

/// Writes command results into uniquely named files that outlive the process
#[derive(Debug, Clone)]
pub struct OutputWriter {
    dir: PathBuf,
}

impl OutputWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Write `content` verbatim to `<video_id>_<timestamp>_<random>_<kind>.txt`
    pub fn write(&self, video_id: &VideoId, kind: OutputKind, content: &str) -> Result<PathBuf> {
        self.keep(kind, self.stage(video_id, kind, content)?)
    }

    /// Write several results at once; if any write fails, none of the files are kept
    pub fn write_all(
        &self,
        video_id: &VideoId,
        entries: &[(OutputKind, &str)],
    ) -> Result<ResultPaths> {
        let staged = entries
            .iter()
            .map(|&(kind, content)| -> Result<_> {
                Ok((kind, self.stage(video_id, kind, content)?))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut paths = ResultPaths::default();
        for (kind, file) in staged {
            paths.set(kind, self.keep(kind, file)?);
        }

        Ok(paths)
    }

    /// Written but not yet kept: the file is removed again when dropped
    fn stage(&self, video_id: &VideoId, kind: OutputKind, content: &str) -> Result<NamedTempFile> {
        let mut file = tempfile::Builder::new()
            .prefix(&output_file_prefix(video_id.as_str()))
            .suffix(&kind.file_suffix())
            .tempfile_in(&self.dir)?;

        file.write_all(content.as_bytes())?;
        file.flush()?;

        Ok(file)
    }

    fn keep(&self, kind: OutputKind, file: NamedTempFile) -> Result<PathBuf> {
        let (_, path) = file.keep().map_err(|e| e.error)?;
        tracing::info!("{} saved to: {}", kind.as_str(), path.display());

        Ok(path)
    }
}

/// Print a report to stdout in the requested format
pub fn print_report(report: &Report, format: &OutputFormat, quiet: bool) -> anyhow::Result<()> {
    let content = match format {
        OutputFormat::Text if quiet => format_paths(report),
        OutputFormat::Text => format_as_text(report),
        OutputFormat::Json => format_as_json(report)?,
    };

    println!("{}", content);
    Ok(())
}
