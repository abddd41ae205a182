//! The Run Summarizer.

use crate::core_types::{Action, OutcomeRecord};

/// One failed repository, as shown in the final report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureDetail {
    pub slug: String,
    pub project_key: Option<String>,
    pub detail: String,
}

/// Tally of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Failed slugs in the order their outcomes were recorded.
    pub failed_slugs: Vec<String>,
    pub failures: Vec<FailureDetail>,
    /// Non-fatal details from successful outcomes, as `slug: detail`.
    pub warnings: Vec<String>,
}

impl RunSummary {
    /// Repositories that were created or updated.
    pub fn successful(&self) -> usize {
        self.created + self.updated
    }

    pub fn total(&self) -> usize {
        self.successful() + self.skipped + self.failed
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

/// Aggregates outcome records. Pure; the counts do not depend on input order.
///
/// # Examples
///
/// ```
/// use bitbucket_sync::summary::summarize;
///
/// let summary = summarize(&[]);
/// assert_eq!(summary.total(), 0);
/// assert!(!summary.has_failures());
/// ```
pub fn summarize(records: &[OutcomeRecord]) -> RunSummary {
    let mut summary = RunSummary::default();
    for record in records {
        match record.action {
            Action::Created => summary.created += 1,
            Action::Updated => summary.updated += 1,
            Action::Skipped => summary.skipped += 1,
            Action::Failed => {
                summary.failed += 1;
                summary.failed_slugs.push(record.slug.clone());
                summary.failures.push(FailureDetail {
                    slug: record.slug.clone(),
                    project_key: record.project_key.clone(),
                    detail: record
                        .error_detail()
                        .unwrap_or_else(|| "unknown error".to_string()),
                });
            }
        }
        if let Some(warning) = &record.warning {
            summary.warnings.push(format!("{}: {}", record.slug, warning));
        }
    }
    summary
}
