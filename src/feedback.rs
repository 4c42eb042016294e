//! Human review of a ranking and the feedback log.
//!
//! A reviewer's ranks are stored next to the engine's (`human_rank` vs
//! `rank`); neither overwrites the other. Feedback records are appended to a
//! sink after ranking has completed, and a failing sink never touches the
//! `RankedOutput` it was built from.

use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::ranking::{RankedOutput, ScoredResult, StrategyKind};

/// One row of the feedback log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub document_name: String,
    pub similarity: f32,
    pub engine_rank: usize,
    #[serde(default)]
    pub human_rank: Option<usize>,
    pub query: String,
    /// SHA-256 of the query text, hex encoded
    pub query_digest: String,
    pub strategy: StrategyKind,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum FeedbackError {
    #[error("rank {rank} is out of range 1..={len}")]
    RankOutOfRange { rank: usize, len: usize },

    #[error("rank {0} is assigned to more than one document")]
    DuplicateRank(usize),

    #[error("document at position {0} is ranked more than once")]
    DuplicatePosition(usize),

    #[error("no document at position {0}")]
    UnknownDocument(usize),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Destination for feedback records.
pub trait FeedbackSink: Send + Sync {
    fn append(&self, records: &[FeedbackRecord]) -> Result<(), FeedbackError>;
}

/// Set reviewer ranks from `(position, rank)` pairs.
///
/// Ranks stay unique across the whole output: a rank already held by a
/// document that is not reassigned here cannot be given to another one.
/// All pairs are validated before anything is written, so on error the
/// output is unchanged. Documents without a pair keep their previous
/// `human_rank`.
pub fn assign_human_ranks(
    output: &mut RankedOutput,
    ranks: &[(usize, usize)],
) -> Result<(), FeedbackError> {
    let len = output.len();
    let mut positions = HashSet::with_capacity(ranks.len());
    let mut new_ranks = HashSet::with_capacity(ranks.len());

    for &(position, rank) in ranks {
        if output.by_position(position).is_none() {
            return Err(FeedbackError::UnknownDocument(position));
        }
        if !positions.insert(position) {
            return Err(FeedbackError::DuplicatePosition(position));
        }
        if rank == 0 || rank > len {
            return Err(FeedbackError::RankOutOfRange { rank, len });
        }
        if !new_ranks.insert(rank) {
            return Err(FeedbackError::DuplicateRank(rank));
        }
    }

    let held = output
        .results
        .iter()
        .filter(|r| !positions.contains(&r.position))
        .filter_map(|r| r.human_rank)
        .find(|rank| new_ranks.contains(rank));
    if let Some(rank) = held {
        return Err(FeedbackError::DuplicateRank(rank));
    }

    for &(position, rank) in ranks {
        if let Some(result) = output.by_position_mut(position) {
            result.human_rank = Some(rank);
        }
    }

    Ok(())
}

/// Results in reviewer order: human-ranked first by `human_rank`, the rest
/// in engine order.
pub fn reviewed_order(output: &RankedOutput) -> Vec<&ScoredResult> {
    let mut ordered: Vec<&ScoredResult> = output.results.iter().collect();
    ordered.sort_by_key(|r| (r.human_rank.is_none(), r.human_rank, r.rank));
    ordered
}

pub fn query_digest(query: &str) -> String {
    format!("{:x}", Sha256::digest(query.as_bytes()))
}

/// Feedback rows for `output`, in engine order.
pub fn records_for(
    output: &RankedOutput,
    query: &str,
    recorded_at: DateTime<Utc>,
) -> Vec<FeedbackRecord> {
    let digest = query_digest(query);
    output
        .results
        .iter()
        .map(|result| FeedbackRecord {
            document_name: result.name.clone(),
            similarity: result.similarity,
            engine_rank: result.rank,
            human_rank: result.human_rank,
            query: query.to_string(),
            query_digest: digest.clone(),
            strategy: output.strategy,
            recorded_at,
        })
        .collect()
}

/// Append feedback for `output` to `sink`.
///
/// Returns the number of records written. A sink failure is logged and
/// returned to the caller.
pub fn submit(
    sink: &dyn FeedbackSink,
    output: &RankedOutput,
    query: &str,
) -> Result<usize, FeedbackError> {
    let records = records_for(output, query, Utc::now());

    match sink.append(&records) {
        Ok(()) => {
            log::debug!("recorded {} feedback rows", records.len());
            Ok(records.len())
        }
        Err(e) => {
            log::warn!("feedback not recorded: {}", e);
            Err(e)
        }
    }
}

/// Appends records as JSON lines to a file.
pub struct JsonlSink {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every record in the log. A missing file reads as empty.
    pub fn read_all(&self) -> Result<Vec<FeedbackRecord>, FeedbackError> {
        let file = match std::fs::File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(e.into()),
        };

        let mut records = vec![];
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            records.push(serde_json::from_str(&line)?);
        }
        Ok(records)
    }
}

impl FeedbackSink for JsonlSink {
    fn append(&self, records: &[FeedbackRecord]) -> Result<(), FeedbackError> {
        if records.is_empty() {
            return Ok(());
        }

        let mut buf = String::new();
        for record in records {
            buf.push_str(&serde_json::to_string(record)?);
            buf.push('\n');
        }

        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| std::io::Error::other(format!("feedback lock poisoned: {}", e)))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(buf.as_bytes())?;
        file.flush()?;

        Ok(())
    }
}
