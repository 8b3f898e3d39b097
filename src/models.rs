//! Domain types shared by the cleanup engine and the storage backends.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One kind of deletable record in the run history.
///
/// `ALL` is the canonical processing order; selections are always resolved
/// and reported in this order regardless of how they were requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Job,
    AdHocCommand,
    ProjectUpdate,
    InventoryUpdate,
    ManagementJob,
    WorkflowJob,
    Notification,
}

impl Category {
    /// All categories, in canonical processing order.
    pub const ALL: [Category; 7] = [
        Category::Job,
        Category::AdHocCommand,
        Category::ProjectUpdate,
        Category::InventoryUpdate,
        Category::ManagementJob,
        Category::WorkflowJob,
        Category::Notification,
    ];

    /// Machine name used in config files and the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Job => "job",
            Category::AdHocCommand => "ad_hoc_command",
            Category::ProjectUpdate => "project_update",
            Category::InventoryUpdate => "inventory_update",
            Category::ManagementJob => "management_job",
            Category::WorkflowJob => "workflow_job",
            Category::Notification => "notification",
        }
    }

    /// Human label used in per-category summary lines.
    pub fn label(&self) -> &'static str {
        match self {
            Category::Job => "jobs",
            Category::AdHocCommand => "ad hoc commands",
            Category::ProjectUpdate => "project updates",
            Category::InventoryUpdate => "inventory updates",
            Category::ManagementJob => "management jobs",
            Category::WorkflowJob => "workflow jobs",
            Category::Notification => "notifications",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "job" => Ok(Category::Job),
            "ad_hoc_command" => Ok(Category::AdHocCommand),
            "project_update" => Ok(Category::ProjectUpdate),
            "inventory_update" => Ok(Category::InventoryUpdate),
            "management_job" => Ok(Category::ManagementJob),
            "workflow_job" => Ok(Category::WorkflowJob),
            "notification" => Ok(Category::Notification),
            _ => Err(format!("Invalid category: {}", s)),
        }
    }
}

/// Execution status of a record.
///
/// `Pending`, `Waiting` and `Running` are non-terminal; a record in one of
/// those states is still owned by the execution subsystem that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Pending,
    Waiting,
    Running,
    Successful,
    Failed,
    Error,
    Canceled,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Waiting => "waiting",
            Status::Running => "running",
            Status::Successful => "successful",
            Status::Failed => "failed",
            Status::Error => "error",
            Status::Canceled => "canceled",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Status::Pending),
            "waiting" => Ok(Status::Waiting),
            "running" => Ok(Status::Running),
            "successful" => Ok(Status::Successful),
            "failed" => Ok(Status::Failed),
            "error" => Ok(Status::Error),
            "canceled" => Ok(Status::Canceled),
            _ => Err(format!("Invalid status: {}", s)),
        }
    }
}

/// Back-references from a parent entity (project, inventory source) to its
/// current and last update record, plus whether the parent still has a
/// source configured. A record matching either pointer while
/// `source_configured` is true must survive cleanup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentPointers {
    pub current_update: Option<i64>,
    pub last_update: Option<i64>,
    /// An empty or unset source configuration counts as "not configured".
    pub source_configured: bool,
}

impl ParentPointers {
    /// Whether the given record id matches the current- or last-update pointer.
    pub fn points_to(&self, record_id: i64) -> bool {
        self.current_update == Some(record_id) || self.last_update == Some(record_id)
    }
}

/// Category-specific descriptive fields, used only for log lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecordDetail {
    Job { host_summaries: u64, events: u64 },
    AdHocCommand { events: u64 },
    ProjectUpdate { launch_type: String },
    InventoryUpdate { source: String },
    ManagementJob { job_type: String },
    WorkflowJob { nodes: u64 },
    Notification {
        #[serde(rename = "notification_kind")]
        kind: String,
        sent: u64,
    },
}

impl fmt::Display for RecordDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordDetail::Job {
                host_summaries,
                events,
            } => write!(f, "({} host summaries, {} events)", host_summaries, events),
            RecordDetail::AdHocCommand { events } => write!(f, "({} events)", events),
            RecordDetail::ProjectUpdate { launch_type } => write!(f, "(type {})", launch_type),
            RecordDetail::InventoryUpdate { source } => write!(f, "(source {})", source),
            RecordDetail::ManagementJob { job_type } => write!(f, "(type {})", job_type),
            RecordDetail::WorkflowJob { nodes } => write!(f, "({} nodes)", nodes),
            RecordDetail::Notification { kind, sent } => {
                write!(f, "({} type, {} sent)", kind, sent)
            }
        }
    }
}

/// A point-in-time view of one record, as returned by record enumeration.
///
/// `parent` is `None` as enumerated; the engine hydrates it through the
/// parent-entity lookup for categories whose policy checks protected
/// pointers, so the evaluator can stay a pure function of the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSnapshot {
    pub id: i64,
    pub name: String,
    pub status: Status,
    pub created: DateTime<Utc>,
    pub detail: RecordDetail,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ParentPointers>,
}

impl fmt::Display for RecordSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\" {}", self.name, self.detail)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_category_round_trip() {
        for category in Category::ALL {
            assert_eq!(Category::from_str(category.as_str()), Ok(category));
        }
        assert!(Category::from_str("system_job").is_err());
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            Status::Pending,
            Status::Waiting,
            Status::Running,
            Status::Successful,
            Status::Failed,
            Status::Error,
            Status::Canceled,
        ] {
            assert_eq!(Status::from_str(status.as_str()), Ok(status));
        }
        assert!(Status::from_str("new").is_err());
    }

    #[test]
    fn test_pointer_match() {
        let pointers = ParentPointers {
            current_update: Some(7),
            last_update: Some(12),
            source_configured: true,
        };
        assert!(pointers.points_to(7));
        assert!(pointers.points_to(12));
        assert!(!pointers.points_to(8));

        assert!(!ParentPointers::default().points_to(0));
    }

    #[test]
    fn test_record_display_matches_log_format() {
        let record = RecordSnapshot {
            id: 1,
            name: "nightly deploy".into(),
            status: Status::Successful,
            created: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            detail: RecordDetail::Job {
                host_summaries: 3,
                events: 120,
            },
            parent: None,
        };
        assert_eq!(
            record.to_string(),
            "\"nightly deploy\" (3 host summaries, 120 events)"
        );

        let notification = RecordDetail::Notification {
            kind: "slack".into(),
            sent: 4,
        };
        assert_eq!(notification.to_string(), "(slack type, 4 sent)");
    }
}
