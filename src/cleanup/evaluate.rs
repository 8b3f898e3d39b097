//! Pure eligibility classification.

use chrono::{DateTime, Utc};

use super::Policy;
use crate::models::RecordSnapshot;

/// Outcome of classifying one record against its category policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The record is in a non-terminal status and still owned by its
    /// execution subsystem.
    SkipActive,
    /// The record is its parent's current or last update and the parent
    /// still has a source configured.
    SkipProtected,
    /// The record was created at or after the cutoff.
    SkipRecent,
    /// The record passed every skip check and may be deleted.
    Eligible,
}

/// Classify a record. No I/O, no side effects.
///
/// The check order is part of the contract: status, then protected
/// pointer, then age. A protected record that is also old must come back
/// as `SkipProtected`, not `SkipRecent`, so callers can report why a
/// record survived.
pub fn evaluate(record: &RecordSnapshot, policy: &Policy, cutoff: DateTime<Utc>) -> Decision {
    if policy.active_statuses.contains(&record.status) {
        return Decision::SkipActive;
    }
    if policy.parent_pointer_check
        && let Some(parent) = &record.parent
        && parent.source_configured
        && parent.points_to(record.id)
    {
        return Decision::SkipProtected;
    }
    if record.created >= cutoff {
        return Decision::SkipRecent;
    }
    Decision::Eligible
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use rstest::rstest;

    use super::*;
    use crate::models::{Category, ParentPointers, RecordDetail, Status};

    fn cutoff() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    fn record(status: Status, age_days: i64) -> RecordSnapshot {
        RecordSnapshot {
            id: 10,
            name: "r".into(),
            status,
            created: cutoff() - Duration::days(age_days),
            detail: RecordDetail::ProjectUpdate {
                launch_type: "manual".into(),
            },
            parent: None,
        }
    }

    fn protecting_parent() -> ParentPointers {
        ParentPointers {
            current_update: Some(10),
            last_update: None,
            source_configured: true,
        }
    }

    #[rstest]
    #[case(Status::Pending)]
    #[case(Status::Waiting)]
    #[case(Status::Running)]
    fn test_active_status_skips_regardless_of_age(#[case] status: Status) {
        let old = record(status, 500);
        let policy = Category::Job.policy();
        assert_eq!(evaluate(&old, policy, cutoff()), Decision::SkipActive);
    }

    #[rstest]
    #[case(Status::Successful)]
    #[case(Status::Failed)]
    #[case(Status::Error)]
    #[case(Status::Canceled)]
    fn test_old_terminal_record_is_eligible(#[case] status: Status) {
        let old = record(status, 91);
        let policy = Category::Job.policy();
        assert_eq!(evaluate(&old, policy, cutoff()), Decision::Eligible);
    }

    #[test]
    fn test_status_precedes_protection() {
        let mut r = record(Status::Running, 500);
        r.parent = Some(protecting_parent());
        let policy = Category::ProjectUpdate.policy();
        assert_eq!(evaluate(&r, policy, cutoff()), Decision::SkipActive);
    }

    #[test]
    fn test_protection_precedes_age() {
        let mut r = record(Status::Successful, 500);
        r.parent = Some(protecting_parent());
        let policy = Category::ProjectUpdate.policy();
        assert_eq!(evaluate(&r, policy, cutoff()), Decision::SkipProtected);
    }

    #[test]
    fn test_pointer_without_source_does_not_protect() {
        let mut r = record(Status::Successful, 500);
        r.parent = Some(ParentPointers {
            source_configured: false,
            ..protecting_parent()
        });
        let policy = Category::ProjectUpdate.policy();
        assert_eq!(evaluate(&r, policy, cutoff()), Decision::Eligible);
    }

    #[test]
    fn test_source_without_pointer_match_does_not_protect() {
        let mut r = record(Status::Successful, 500);
        r.parent = Some(ParentPointers {
            current_update: Some(99),
            last_update: Some(98),
            source_configured: true,
        });
        let policy = Category::ProjectUpdate.policy();
        assert_eq!(evaluate(&r, policy, cutoff()), Decision::Eligible);
    }

    #[test]
    fn test_last_update_pointer_protects_too() {
        let mut r = record(Status::Successful, 500);
        r.parent = Some(ParentPointers {
            current_update: None,
            last_update: Some(10),
            source_configured: true,
        });
        let policy = Category::InventoryUpdate.policy();
        assert_eq!(evaluate(&r, policy, cutoff()), Decision::SkipProtected);
    }

    #[test]
    fn test_pointer_check_is_policy_gated() {
        // A job carrying pointers is still eligible; only update
        // categories consult them.
        let mut r = record(Status::Successful, 500);
        r.parent = Some(protecting_parent());
        let policy = Category::Job.policy();
        assert_eq!(evaluate(&r, policy, cutoff()), Decision::Eligible);
    }

    #[test]
    fn test_created_at_cutoff_is_skipped() {
        let boundary = record(Status::Successful, 0);
        assert_eq!(boundary.created, cutoff());
        let policy = Category::Job.policy();
        assert_eq!(evaluate(&boundary, policy, cutoff()), Decision::SkipRecent);
    }

    #[test]
    fn test_created_just_before_cutoff_is_eligible() {
        let mut r = record(Status::Successful, 0);
        r.created = cutoff() - Duration::seconds(1);
        let policy = Category::Job.policy();
        assert_eq!(evaluate(&r, policy, cutoff()), Decision::Eligible);
    }

    #[test]
    fn test_pending_notification_is_active() {
        let mut r = record(Status::Pending, 500);
        r.detail = RecordDetail::Notification {
            kind: "email".into(),
            sent: 0,
        };
        let policy = Category::Notification.policy();
        assert_eq!(evaluate(&r, policy, cutoff()), Decision::SkipActive);
    }

    #[test]
    fn test_running_notification_is_not_active() {
        // Notifications treat only `pending` as active, so an old one in
        // any other status falls through to the age check.
        let mut r = record(Status::Running, 500);
        r.detail = RecordDetail::Notification {
            kind: "email".into(),
            sent: 0,
        };
        let policy = Category::Notification.policy();
        assert_eq!(evaluate(&r, policy, cutoff()), Decision::Eligible);
    }
}
