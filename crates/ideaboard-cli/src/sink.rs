//! CSV and JSON output for a finished run.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

use ideaboard_core::{DetailTable, Dimension, EvaluationMatrix, SummaryTable};

pub const DETAIL_FILE: &str = "detailed_ratings.csv";
pub const SUMMARY_FILE: &str = "summary_ratings.csv";

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("I/O error writing {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> SinkError + '_ {
    move |source| SinkError::IoError {
        path: path.to_path_buf(),
        source,
    }
}

/// Writes the two rating tables into one directory.
pub struct CsvSink {
    out_dir: PathBuf,
}

impl CsvSink {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }

    pub fn detail_path(&self) -> PathBuf {
        self.out_dir.join(DETAIL_FILE)
    }

    pub fn summary_path(&self) -> PathBuf {
        self.out_dir.join(SUMMARY_FILE)
    }

    /// Write both tables, creating the directory if needed.
    pub fn write(&self, detail: &DetailTable, summary: &SummaryTable) -> Result<(), SinkError> {
        fs::create_dir_all(&self.out_dir).map_err(io_error(&self.out_dir))?;
        self.write_detail(detail)?;
        self.write_summary(summary)?;
        Ok(())
    }

    fn write_detail(&self, detail: &DetailTable) -> Result<(), SinkError> {
        let path = self.detail_path();
        let mut writer = csv::Writer::from_path(&path)?;
        writer.write_record(["Idea ID", "Idea Title", "LLM", "Dimension", "Score", "Remark"])?;

        for row in detail {
            let score = row.score.to_string();
            writer.write_record([
                row.idea_id.as_str(),
                row.idea_title.as_str(),
                row.provider.as_str(),
                row.dimension_label(),
                score.as_str(),
                row.remark.as_str(),
            ])?;
        }

        writer.flush().map_err(io_error(&path))?;
        tracing::info!(path = %path.display(), rows = detail.len(), "Detailed ratings written");
        Ok(())
    }

    fn write_summary(&self, summary: &SummaryTable) -> Result<(), SinkError> {
        let path = self.summary_path();
        let mut writer = csv::Writer::from_path(&path)?;

        let mut header = vec!["Idea ID", "Idea Title"];
        header.extend(Dimension::ALL.iter().map(|d| d.label()));
        header.push("Average Rating");
        writer.write_record(&header)?;

        for row in summary {
            let mut record = vec![row.idea_id.clone(), row.idea_title.clone()];
            record.extend(
                Dimension::ALL
                    .iter()
                    .map(|d| format!("{:.1}", row.average(*d))),
            );
            record.push(format!("{:.1}", row.overall_average));
            writer.write_record(&record)?;
        }

        writer.flush().map_err(io_error(&path))?;
        tracing::info!(path = %path.display(), rows = summary.len(), "Summary ratings written");
        Ok(())
    }
}

/// Dump the full matrix, error records included, as pretty JSON.
pub fn write_matrix_json(matrix: &EvaluationMatrix, path: &Path) -> Result<(), SinkError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error(parent))?;
    }
    let file = File::create(path).map_err(io_error(path))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, matrix)?;
    writer.flush().map_err(io_error(path))?;
    tracing::info!(path = %path.display(), ideas = matrix.len(), "Evaluation matrix written");
    Ok(())
}
