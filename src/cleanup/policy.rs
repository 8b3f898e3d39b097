//! Static per-category eligibility policies.
//!
//! The original tool repeated a near-identical loop per category with
//! the differences buried in chained conditionals; here the differences
//! are data. A policy names the statuses that mark a record as still
//! active and whether the category's records can be protected by a
//! parent's current/last-update pointer.

use crate::models::{Category, Status};

/// Eligibility rule for one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy {
    /// Non-terminal statuses that force a skip regardless of age.
    pub active_statuses: &'static [Status],
    /// Whether to check the parent entity's update pointers before the
    /// age check.
    pub parent_pointer_check: bool,
}

const EXECUTION_ACTIVE: &[Status] = &[Status::Pending, Status::Waiting, Status::Running];

// Notifications have no waiting/running phase; only pending ones are
// still in flight.
const NOTIFICATION_ACTIVE: &[Status] = &[Status::Pending];

const EXECUTION_POLICY: Policy = Policy {
    active_statuses: EXECUTION_ACTIVE,
    parent_pointer_check: false,
};

const UPDATE_POLICY: Policy = Policy {
    active_statuses: EXECUTION_ACTIVE,
    parent_pointer_check: true,
};

const NOTIFICATION_POLICY: Policy = Policy {
    active_statuses: NOTIFICATION_ACTIVE,
    parent_pointer_check: false,
};

impl Category {
    /// The eligibility policy for this category.
    pub fn policy(&self) -> &'static Policy {
        match self {
            Category::Job
            | Category::AdHocCommand
            | Category::ManagementJob
            | Category::WorkflowJob => &EXECUTION_POLICY,
            Category::ProjectUpdate | Category::InventoryUpdate => &UPDATE_POLICY,
            Category::Notification => &NOTIFICATION_POLICY,
        }
    }
}
