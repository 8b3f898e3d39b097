//! Run orchestration: transaction scope, listener suppression, and the
//! per-category bulk delete loop.

use chrono::{DateTime, Utc};

use super::{CleanupError, Decision, evaluate, retention_cutoff};
use crate::models::Category;
use crate::store::{MutationListeners, RecordStore, SuppressListeners};

/// Configuration for one cleanup run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Retention horizon in days. Must be positive; values beyond
    /// [`super::MAX_RETENTION_DAYS`] are rejected before storage access.
    pub days: u32,
    /// Classify and count without deleting anything.
    pub dry_run: bool,
    /// Categories to process. Empty means all of them.
    pub categories: Vec<Category>,
}

impl RunConfig {
    /// Resolve the selection into canonical processing order. An empty
    /// selection means every category; duplicates collapse.
    pub fn selection(&self) -> Vec<Category> {
        if self.categories.is_empty() {
            return Category::ALL.to_vec();
        }
        Category::ALL
            .into_iter()
            .filter(|category| self.categories.contains(category))
            .collect()
    }
}

/// Skip/delete totals for one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryReport {
    pub category: Category,
    pub deleted: u64,
    pub skipped: u64,
}

impl CategoryReport {
    /// The one-line summary the CLI prints per category.
    pub fn summary(&self, dry_run: bool) -> String {
        if dry_run {
            format!(
                "{}: {} would be deleted, {} would be skipped.",
                self.category.label(),
                self.deleted,
                self.skipped
            )
        } else {
            format!(
                "{}: {} deleted, {} skipped.",
                self.category.label(),
                self.deleted,
                self.skipped
            )
        }
    }
}

/// Results from a whole cleanup run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub cutoff: DateTime<Utc>,
    pub dry_run: bool,
    pub categories: Vec<CategoryReport>,
}

impl RunReport {
    pub fn total_deleted(&self) -> u64 {
        self.categories.iter().map(|report| report.deleted).sum()
    }

    pub fn total_skipped(&self) -> u64 {
        self.categories.iter().map(|report| report.skipped).sum()
    }

    pub fn summaries(&self) -> impl Iterator<Item = String> + '_ {
        self.categories
            .iter()
            .map(|report| report.summary(self.dry_run))
    }
}

/// Run the cleanup engine against the current time.
pub async fn run(
    store: &dyn RecordStore,
    listeners: &dyn MutationListeners,
    config: &RunConfig,
) -> Result<RunReport, CleanupError> {
    run_at(store, listeners, config, Utc::now()).await
}

/// Run the cleanup engine with an explicit notion of "now".
///
/// The cutoff is computed before any storage access, the whole run is
/// one transaction, and mutation listeners are suppressed for its
/// duration. A storage error rolls everything back; no partial
/// deletions survive.
pub async fn run_at(
    store: &dyn RecordStore,
    listeners: &dyn MutationListeners,
    config: &RunConfig,
    now: DateTime<Utc>,
) -> Result<RunReport, CleanupError> {
    let cutoff = retention_cutoff(now, config.days)?;
    let selection = config.selection();

    tracing::info!(
        cutoff = %cutoff,
        days = config.days,
        dry_run = config.dry_run,
        categories = selection.len(),
        "Starting cleanup run"
    );

    store.begin().await?;
    let outcome = {
        let _suppressed = SuppressListeners::new(listeners);
        process_selection(store, &selection, cutoff, config.dry_run).await
    };

    match outcome {
        Ok(categories) => {
            store.commit().await?;
            let report = RunReport {
                cutoff,
                dry_run: config.dry_run,
                categories,
            };
            tracing::info!(
                deleted = report.total_deleted(),
                skipped = report.total_skipped(),
                dry_run = report.dry_run,
                "Cleanup run complete"
            );
            Ok(report)
        }
        Err(err) => {
            if let Err(rollback_err) = store.rollback().await {
                tracing::error!(error = %rollback_err, "Rollback after failed cleanup run also failed");
            }
            Err(err)
        }
    }
}

async fn process_selection(
    store: &dyn RecordStore,
    selection: &[Category],
    cutoff: DateTime<Utc>,
    dry_run: bool,
) -> Result<Vec<CategoryReport>, CleanupError> {
    let mut reports = Vec::with_capacity(selection.len());
    for &category in selection {
        let report = process_category(store, category, cutoff, dry_run).await?;
        tracing::info!(
            category = %category,
            deleted = report.deleted,
            skipped = report.skipped,
            "{}",
            report.summary(dry_run)
        );
        reports.push(report);
    }
    Ok(reports)
}

/// Classify and delete within one category. Every record is counted
/// exactly once, as skipped or deleted.
async fn process_category(
    store: &dyn RecordStore,
    category: Category,
    cutoff: DateTime<Utc>,
    dry_run: bool,
) -> Result<CategoryReport, CleanupError> {
    let policy = category.policy();
    let records = store
        .list_records(category)
        .await
        .map_err(|e| CleanupError::storage(category, e))?;

    let mut deleted = 0u64;
    let mut skipped = 0u64;
    for mut record in records {
        if policy.parent_pointer_check {
            record.parent = store
                .parent_pointers(category, record.id)
                .await
                .map_err(|e| CleanupError::storage(category, e))?;
        }

        match evaluate(&record, policy, cutoff) {
            Decision::SkipActive => {
                tracing::debug!(
                    category = %category,
                    status = %record.status,
                    dry_run,
                    "skipping active record {}", record
                );
                skipped += 1;
            }
            Decision::SkipProtected => {
                tracing::debug!(
                    category = %category,
                    dry_run,
                    "skipping protected record {}", record
                );
                skipped += 1;
            }
            Decision::SkipRecent => {
                tracing::debug!(
                    category = %category,
                    dry_run,
                    "skipping recent record {}", record
                );
                skipped += 1;
            }
            Decision::Eligible => {
                if dry_run {
                    tracing::info!(category = %category, "would delete record {}", record);
                } else {
                    tracing::info!(category = %category, "deleting record {}", record);
                    store
                        .delete_record(category, record.id)
                        .await
                        .map_err(|e| CleanupError::storage(category, e))?;
                }
                deleted += 1;
            }
        }
    }

    Ok(CategoryReport {
        category,
        deleted,
        skipped,
    })
}
