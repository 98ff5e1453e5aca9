pub mod buckets;
pub mod model;
pub mod poller;
pub mod reducer;
pub mod snippet;

pub use buckets::{decision_bars, format_cost_usd, severity_bars, BucketBar};
pub use model::{
    BaselineDiff, CreateJobRequest, CreateJobResponse, Decision, DiffSummary, ExportFormat,
    ExportPayload, Finding, Job, JobResults, JobStatus, JobSummary, ModelCall, RuleCount,
    Health, Severity, Stats, SuppressRequest, Suppression, SuppressionAck, Webhook,
    WebhookDeleted, WebhookRequest,
};
pub use poller::{CommitOutcome, PollTicket, Poller, PollerPhase, Snapshot};
pub use reducer::{reduce_results, JobView};
pub use snippet::{SnippetBrowser, SnippetDetail, SnippetEntry, SnippetKey, SnippetMeta};

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("no job selected")]
    MissingJobId,
    #[error("snippet path '{0}' has no name segment")]
    InvalidSnippetPath(String),
}
