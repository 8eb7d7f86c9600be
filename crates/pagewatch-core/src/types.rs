//! The watch-task data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A monitored target: one URL, its cadence, and its notification policy.
///
/// Mutable only through the change recorder — everything downstream of it
/// (policy, fan-out) reads the task and never writes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchTask {
    /// Store rowid; 0 until inserted.
    #[serde(default)]
    pub id: i64,
    /// Human-readable label, used in rendered messages.
    #[serde(default)]
    pub name: String,
    /// The fetch target.
    pub url: String,
    #[serde(default)]
    pub options: WatchOptions,
    /// Per-task channel configs; empty means "use the owner's".
    #[serde(default)]
    pub notifications: Vec<ChannelConfig>,
    /// Word filter gating notifications; an empty word list counts as
    /// unset and falls back to the owner's filter.
    #[serde(default)]
    pub filter: Option<WordFilter>,
    /// Lookup key into the owner store, not ownership.
    #[serde(default)]
    pub owner_id: Option<i64>,
    /// Snapshot of the most recent execution.
    #[serde(default)]
    pub last_execution: Option<LastExecution>,
}

impl WatchTask {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: String::new(),
            url: url.into(),
            options: WatchOptions::default(),
            notifications: Vec::new(),
            filter: None,
            owner_id: None,
            last_execution: None,
        }
    }

    /// Hash fingerprint of the last execution, if it recorded one.
    pub fn last_hash(&self) -> Option<&str> {
        self.last_execution
            .as_ref()
            .and_then(|last| last.hash_target.as_deref())
    }
}

/// Policy switches for one watch task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchOptions {
    /// Re-execution cadence in minutes (≥ 1).
    #[serde(default = "default_cadence")]
    pub cadence_minutes: u32,
    /// Notify only when the content fingerprint changed.
    #[serde(default)]
    pub only_changed: bool,
    /// Notify only when the fingerprint was never seen before for this URL.
    #[serde(default)]
    pub only_unique: bool,
    /// Dependency tasks are not scheduled on their own.
    #[serde(default)]
    pub is_dependency: bool,
}

fn default_cadence() -> u32 {
    1
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            cadence_minutes: default_cadence(),
            only_changed: false,
            only_unique: false,
            is_dependency: false,
        }
    }
}

/// Outcome of one fetch/extract attempt. Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExecutionResult {
    Success {
        /// Content fingerprint (hex SHA-256 of the extracted target).
        hash_target: String,
        /// Normalized text the similarity filter runs against.
        extracted_target: String,
        /// Full extracted payload.
        extracted_content: String,
        created_at: DateTime<Utc>,
    },
    Failure {
        error_message: String,
        created_at: DateTime<Utc>,
    },
}

impl ExecutionResult {
    pub fn success(
        hash_target: impl Into<String>,
        extracted_target: impl Into<String>,
        extracted_content: impl Into<String>,
    ) -> Self {
        Self::Success {
            hash_target: hash_target.into(),
            extracted_target: extracted_target.into(),
            extracted_content: extracted_content.into(),
            created_at: Utc::now(),
        }
    }

    pub fn failure(error_message: impl Into<String>) -> Self {
        Self::Failure {
            error_message: error_message.into(),
            created_at: Utc::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn hash_target(&self) -> Option<&str> {
        match self {
            Self::Success { hash_target, .. } => Some(hash_target),
            Self::Failure { .. } => None,
        }
    }

    pub fn extracted_target(&self) -> Option<&str> {
        match self {
            Self::Success {
                extracted_target, ..
            } => Some(extracted_target),
            Self::Failure { .. } => None,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            Self::Success { created_at, .. } | Self::Failure { created_at, .. } => *created_at,
        }
    }
}

/// The only execution state retained on the task itself. Full history
/// lives in the execution-history store; the pipeline reads it back only
/// to count prior occurrences of a fingerprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LastExecution {
    pub is_success: bool,
    #[serde(default)]
    pub hash_target: Option<String>,
    #[serde(default)]
    pub extracted_target: Option<String>,
    #[serde(default)]
    pub extracted_content: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    /// Whether the fingerprint differs from the previous snapshot's.
    pub hash_changed: bool,
    pub created_at: DateTime<Utc>,
}

impl LastExecution {
    /// Build a snapshot from a result, attaching the already-computed
    /// change flag. Success and failure keep disjoint field sets.
    pub fn from_result(result: &ExecutionResult, hash_changed: bool) -> Self {
        match result {
            ExecutionResult::Success {
                hash_target,
                extracted_target,
                extracted_content,
                created_at,
            } => Self {
                is_success: true,
                hash_target: Some(hash_target.clone()),
                extracted_target: Some(extracted_target.clone()),
                extracted_content: Some(extracted_content.clone()),
                error_message: None,
                hash_changed,
                created_at: *created_at,
            },
            ExecutionResult::Failure {
                error_message,
                created_at,
            } => Self {
                is_success: false,
                hash_target: None,
                extracted_target: None,
                extracted_content: None,
                error_message: Some(error_message.clone()),
                hash_changed,
                created_at: *created_at,
            },
        }
    }
}

/// Channel kinds a notification can be routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Telegram,
    Email,
    Webhook,
    Websocket,
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Telegram => "telegram",
            Self::Email => "email",
            Self::Webhook => "webhook",
            Self::Websocket => "websocket",
        };
        f.write_str(name)
    }
}

/// One notification target. Exactly one payload kind per config; routing
/// matches on the tag, never on field presence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChannelConfig {
    Telegram {
        chat_id: i64,
        #[serde(default)]
        template: Option<String>,
    },
    Email {
        to: String,
        #[serde(default)]
        template: Option<String>,
    },
    Webhook {
        url: String,
        #[serde(default)]
        template: Option<String>,
    },
    Websocket {
        #[serde(default)]
        template: Option<String>,
    },
}

impl ChannelConfig {
    pub fn kind(&self) -> ChannelKind {
        match self {
            Self::Telegram { .. } => ChannelKind::Telegram,
            Self::Email { .. } => ChannelKind::Email,
            Self::Webhook { .. } => ChannelKind::Webhook,
            Self::Websocket { .. } => ChannelKind::Websocket,
        }
    }

    pub fn template(&self) -> Option<&str> {
        match self {
            Self::Telegram { template, .. }
            | Self::Email { template, .. }
            | Self::Webhook { template, .. }
            | Self::Websocket { template } => template.as_deref(),
        }
    }
}

/// Similarity gate: trigger words plus a normalized match threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordFilter {
    #[serde(default)]
    pub words: Vec<String>,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

fn default_threshold() -> f64 {
    0.8
}

/// Owner of one or more watch tasks; supplies fallback notifications and
/// filter for tasks that configure neither.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Owner {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub notifications: Vec<ChannelConfig>,
    #[serde(default)]
    pub filter: Option<WordFilter>,
}
