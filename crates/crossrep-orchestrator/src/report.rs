//! Run report: what each lifecycle phase did

use chrono::{DateTime, Utc};
use crossrep_cloud::{ResourceId, ResourceKey};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Outcome of one lifecycle step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Created,
    /// Present before the run; left untouched
    Unchanged,
    Authorized,
    AlreadyAuthorized,
    Mirrored,
    Broken,
    ReplicationDeleted,
    /// No replication existed on a destination during cleanup
    NoReplication,
    Deleted,
    AlreadyAbsent,
}

impl std::fmt::Display for StepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepKind::Created => write!(f, "created"),
            StepKind::Unchanged => write!(f, "unchanged"),
            StepKind::Authorized => write!(f, "authorized"),
            StepKind::AlreadyAuthorized => write!(f, "already authorized"),
            StepKind::Mirrored => write!(f, "mirrored"),
            StepKind::Broken => write!(f, "broken"),
            StepKind::ReplicationDeleted => write!(f, "replication deleted"),
            StepKind::NoReplication => write!(f, "no replication"),
            StepKind::Deleted => write!(f, "deleted"),
            StepKind::AlreadyAbsent => write!(f, "already absent"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub kind: StepKind,
    pub resource: ResourceKey,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<ResourceId>,
}

/// A soft timeout that did not stop the run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warning {
    pub resource: ResourceKey,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub steps: Vec<Step>,
    pub warnings: Vec<Warning>,
    /// Total execution time in milliseconds
    pub duration_ms: u64,
}

impl RunReport {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            steps: Vec::new(),
            warnings: Vec::new(),
            duration_ms: 0,
        }
    }

    pub fn record(&mut self, kind: StepKind, resource: ResourceKey, resource_id: Option<ResourceId>) {
        self.steps.push(Step {
            kind,
            resource,
            resource_id,
        });
    }

    pub fn warn(&mut self, resource: ResourceKey, message: impl Into<String>) {
        self.warnings.push(Warning {
            resource,
            message: message.into(),
        });
    }

    /// Append the steps and warnings of a later phase
    pub fn absorb(&mut self, other: RunReport) {
        self.steps.extend(other.steps);
        self.warnings.extend(other.warnings);
        self.duration_ms += other.duration_ms;
    }

    pub fn finish(&mut self, started: Instant) {
        self.duration_ms = started.elapsed().as_millis() as u64;
    }

    pub fn steps_of(&self, kind: StepKind) -> impl Iterator<Item = &Step> {
        self.steps.iter().filter(move |s| s.kind == kind)
    }

    /// Resources touched by steps of `kind`, in order
    pub fn resources(&self, kind: StepKind) -> Vec<&ResourceKey> {
        self.steps_of(kind).map(|s| &s.resource).collect()
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn summary(&self) -> RunSummary {
        let count = |kind| self.steps_of(kind).count();
        RunSummary {
            created: count(StepKind::Created),
            unchanged: count(StepKind::Unchanged),
            replicated: count(StepKind::Mirrored),
            deleted: count(StepKind::Deleted) + count(StepKind::ReplicationDeleted),
            warnings: self.warnings.len(),
        }
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub created: usize,
    pub unchanged: usize,
    pub replicated: usize,
    pub deleted: usize,
    pub warnings: usize,
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} created, {} unchanged, {} mirrored, {} deleted, {} warning(s)",
            self.created, self.unchanged, self.replicated, self.deleted, self.warnings
        )
    }
}
