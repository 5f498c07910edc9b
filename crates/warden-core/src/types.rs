use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Governance result granting access.
pub const PERMITTED: &str = "permitted";

/// The claim carried by an authentication credential.
///
/// Extracted once per credential and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuthClaim {
    /// DID of the credential subject, which is also the requesting service.
    pub subject_id: String,
    /// Service the credential is addressed to (`toService`).
    pub target_service: String,
    /// Execution order the subject acts for (`forOrder`).
    pub for_order: String,
}

/// Lifecycle status of an execution, derived from a status IRI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExecutionStatus {
    InExecution,
    Cancelled,
    Delivered,
    Failed,
    /// A status outside the known vocabulary.
    Unknown,
}

impl ExecutionStatus {
    /// Classify a status IRI by its final path segment.
    pub fn from_uri(uri: &str) -> Self {
        if uri.ends_with("Cancelled") {
            Self::Cancelled
        } else if uri.ends_with("Delivered") {
            Self::Delivered
        } else if uri.ends_with("Failed") {
            Self::Failed
        } else if uri.ends_with("InExecution") {
            Self::InExecution
        } else {
            Self::Unknown
        }
    }

    /// Whether the status ends an execution.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled | Self::Delivered | Self::Failed)
    }

    /// Whether a set of status IRIs describes an execution still in progress.
    ///
    /// Any terminal status wins over `InExecution`, whatever the order of the
    /// statuses. An empty set is not in progress.
    pub fn in_progress<'a, I>(statuses: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut in_execution = false;
        for status in statuses.into_iter().map(Self::from_uri) {
            if status.is_terminal() {
                return false;
            }
            in_execution |= status == Self::InExecution;
        }
        in_execution
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InExecution => write!(f, "InExecution"),
            Self::Cancelled => write!(f, "Cancelled"),
            Self::Delivered => write!(f, "Delivered"),
            Self::Failed => write!(f, "Failed"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Ledger state of an execution order, as seen by one service.
///
/// Re-queried on every authentication, never cached.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionOrderContext {
    /// Zone the order is scoped to.
    pub zone: String,
    /// Execution ID → status IRIs.
    pub executions: BTreeMap<String, BTreeSet<String>>,
}

impl ExecutionOrderContext {
    /// Create an empty context for a zone.
    pub fn new(zone: impl Into<String>) -> Self {
        Self {
            zone: zone.into(),
            executions: BTreeMap::new(),
        }
    }

    /// Record a status for an execution.
    pub fn add_status(&mut self, execution: impl Into<String>, status: impl Into<String>) {
        self.executions
            .entry(execution.into())
            .or_default()
            .insert(status.into());
    }

    /// IDs of the executions currently in progress, in sorted order.
    pub fn executions_in_progress(&self) -> Vec<&str> {
        self.executions
            .iter()
            .filter(|(_, statuses)| ExecutionStatus::in_progress(statuses.iter().map(String::as_str)))
            .map(|(id, _)| id.as_str())
            .collect()
    }
}

/// Action label submitted to a governance program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GovernanceAction {
    /// Use of a service.
    ServiceUse,
    /// Read access to a dataset.
    DatasetRead,
}

impl GovernanceAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ServiceUse => "service:use",
            Self::DatasetRead => "dataset:read",
        }
    }
}

impl fmt::Display for GovernanceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Answer of one governance evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceExecAnswer {
    /// Decision, usually `permitted` or `prohibited`.
    pub result: String,
    /// Paragraph/modality pairs that led to the decision, kept for audit.
    pub evidence: String,
}

impl GovernanceExecAnswer {
    /// Only the exact `permitted` result grants access.
    pub fn is_permitted(&self) -> bool {
        self.result == PERMITTED
    }
}
