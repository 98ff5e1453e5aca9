use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_TARGET_PATH: &str = "/workspace";
pub const DEFAULT_RULESET: &str = "rulesets/owasp-llm-top10.yml";
pub const DEFAULT_POLICY_PATH: &str = "policies/default.yml";

/// Lifecycle of a scan job as reported by the service.
///
/// Labels the client does not know are kept verbatim in `Other` and are
/// treated as still in progress.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum JobStatus {
    #[default]
    Queued,
    Running,
    Scanning,
    Judging,
    Done,
    Failed,
    Other(String),
}

impl JobStatus {
    pub fn from_label(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.to_ascii_lowercase().replace('-', "_").as_str() {
            "queued" | "pending" => JobStatus::Queued,
            "running" => JobStatus::Running,
            "scanning" => JobStatus::Scanning,
            "judging" | "judged" => JobStatus::Judging,
            "done" | "decided" | "completed" | "complete" => JobStatus::Done,
            "failed" | "error" | "errored" => JobStatus::Failed,
            _ => JobStatus::Other(trimmed.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Scanning => "scanning",
            JobStatus::Judging => "judging",
            JobStatus::Done => "done",
            JobStatus::Failed => "failed",
            JobStatus::Other(label) => label.as_str(),
        }
    }

    /// A terminal job can no longer change on the server.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for JobStatus {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for JobStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw
            .map(|value| JobStatus::from_label(&value))
            .unwrap_or_default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    /// Display order for every severity chart and tally.
    pub const ALL: [Severity; 4] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }

    pub fn from_label(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "critical" => Some(Severity::Critical),
            "high" => Some(Severity::High),
            "medium" => Some(Severity::Medium),
            "low" => Some(Severity::Low),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Decision {
    Block,
    ManualReview,
    Allow,
}

impl Decision {
    pub const ALL: [Decision; 3] = [Decision::Block, Decision::ManualReview, Decision::Allow];

    pub fn as_str(self) -> &'static str {
        match self {
            Decision::Block => "block",
            Decision::ManualReview => "manual_review",
            Decision::Allow => "allow",
        }
    }

    pub fn display_label(self) -> &'static str {
        match self {
            Decision::Block => "block",
            Decision::ManualReview => "manual review",
            Decision::Allow => "allow",
        }
    }

    pub fn from_label(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "block" => Some(Decision::Block),
            "manual_review" => Some(Decision::ManualReview),
            "allow" => Some(Decision::Allow),
            _ => None,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const PENDING_DECISION: &str = "pending";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Job {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default)]
    pub decision: Option<String>,
    #[serde(default)]
    pub decision_reason: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub ruleset: Option<String>,
}

impl Job {
    pub fn decision_kind(&self) -> Option<Decision> {
        self.decision.as_deref().and_then(Decision::from_label)
    }

    pub fn decision_label(&self) -> &str {
        non_empty(&self.decision).unwrap_or(PENDING_DECISION)
    }
}

/// One row of `GET /jobs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSummary {
    pub id: String,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default)]
    pub decision: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub ruleset: Option<String>,
    #[serde(default)]
    pub ai_review: Option<bool>,
}

impl JobSummary {
    pub fn decision_label(&self) -> &str {
        non_empty(&self.decision).unwrap_or(PENDING_DECISION)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    #[serde(default)]
    pub rule_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub line: u64,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub remediation: Option<String>,
    #[serde(default, rename = "match")]
    pub match_excerpt: Option<String>,
    #[serde(default)]
    pub fingerprint: Option<String>,
}

impl Finding {
    pub fn severity_kind(&self) -> Option<Severity> {
        Severity::from_label(&self.severity)
    }

    pub fn message(&self) -> Option<&str> {
        non_empty(&self.message)
    }

    pub fn remediation(&self) -> Option<&str> {
        non_empty(&self.remediation)
    }

    pub fn match_excerpt(&self) -> Option<&str> {
        non_empty(&self.match_excerpt)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelCall {
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub parsed: Option<BTreeMap<String, Value>>,
    #[serde(default)]
    pub response_excerpt: Option<String>,
    #[serde(default)]
    pub prompt_tokens: Option<u64>,
    #[serde(default)]
    pub completion_tokens: Option<u64>,
    #[serde(default)]
    pub estimated_cost_usd: Option<f64>,
}

impl ModelCall {
    /// Structured judge output, or `None` when the judge produced nothing parseable.
    pub fn parsed_fields(&self) -> Option<&BTreeMap<String, Value>> {
        self.parsed.as_ref().filter(|fields| !fields.is_empty())
    }

    pub fn response_excerpt(&self) -> Option<&str> {
        non_empty(&self.response_excerpt)
    }
}

/// Raw `GET /jobs/{id}/results` payload. Every field may be missing while a
/// job is still queued.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobResults {
    #[serde(default)]
    pub job: Option<Job>,
    #[serde(default)]
    pub findings: Option<Vec<Finding>>,
    #[serde(default)]
    pub model_calls: Option<Vec<ModelCall>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateJobRequest {
    pub target_path: String,
    pub ruleset: String,
    pub ai_review: bool,
    pub policy_path: String,
}

impl Default for CreateJobRequest {
    fn default() -> Self {
        Self {
            target_path: DEFAULT_TARGET_PATH.to_string(),
            ruleset: DEFAULT_RULESET.to_string(),
            ai_review: true,
            policy_path: DEFAULT_POLICY_PATH.to_string(),
        }
    }
}

impl CreateJobRequest {
    pub fn for_target(target_path: impl Into<String>) -> Self {
        Self {
            target_path: target_path.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateJobResponse {
    pub job_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleCount {
    pub rule_id: String,
    #[serde(default)]
    pub count: i64,
}

/// Point-in-time aggregate snapshot from `GET /stats`.
///
/// Bucket maps are sparse: an absent label means zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    #[serde(default)]
    pub total_jobs: u64,
    #[serde(default)]
    pub total_findings: u64,
    #[serde(default)]
    pub total_model_calls: u64,
    #[serde(default)]
    pub total_estimated_cost_usd: f64,
    #[serde(default)]
    pub by_severity: BTreeMap<String, i64>,
    #[serde(default)]
    pub by_decision: BTreeMap<String, i64>,
    #[serde(default)]
    pub top_rules: Vec<RuleCount>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    Csv,
    Json,
    Md,
}

impl ExportFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
            ExportFormat::Md => "md",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            "md" | "markdown" => Ok(ExportFormat::Md),
            other => Err(format!("Unknown export format: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportPayload {
    #[serde(default)]
    pub content_type: String,
    #[serde(default)]
    pub data: Value,
}

impl ExportPayload {
    /// Text form of the export: string payloads verbatim, structured payloads pretty-printed.
    pub fn render(&self) -> String {
        match &self.data {
            Value::String(text) => text.clone(),
            Value::Null => String::new(),
            other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    #[serde(default)]
    pub new_count: u64,
    #[serde(default)]
    pub fixed_count: u64,
    #[serde(default)]
    pub unchanged_count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BaselineDiff {
    #[serde(default)]
    pub summary: DiffSummary,
    #[serde(default)]
    pub new: Vec<Finding>,
    #[serde(default)]
    pub fixed: Vec<Finding>,
    #[serde(default)]
    pub unchanged: Vec<Finding>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suppression {
    pub fingerprint: String,
    #[serde(default)]
    pub rule_id: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub suppressed_by: String,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuppressRequest {
    pub reason: String,
    pub suppressed_by: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuppressionAck {
    pub fingerprint: String,
    #[serde(default)]
    pub status: String,
}

/// Event names the service accepts on a webhook subscription.
pub const WEBHOOK_EVENTS: [&str; 3] = ["scan.completed", "policy.block", "policy.allow"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookRequest {
    pub url: String,
    pub events: Vec<String>,
    #[serde(default)]
    pub secret: String,
}

impl WebhookRequest {
    /// Subscribes `url` to `events`, or to `scan.completed` when none are given.
    pub fn new(url: impl Into<String>, events: Vec<String>, secret: impl Into<String>) -> Self {
        let events = if events.is_empty() {
            vec![WEBHOOK_EVENTS[0].to_string()]
        } else {
            events
        };
        Self {
            url: url.into(),
            events,
            secret: secret.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Webhook {
    pub id: u64,
    pub url: String,
    #[serde(default)]
    pub events: Vec<String>,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Webhook {
    pub fn state_label(&self) -> &'static str {
        match self.active {
            Some(false) => "inactive",
            _ => "active",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookDeleted {
    #[serde(default)]
    pub status: String,
}

/// Liveness report. Only `status` is interpreted; anything else is kept for display.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Health {
    #[serde(default)]
    pub status: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Parses the timestamp shapes the service emits (RFC 3339 or Python's `str(datetime)`).
pub fn parse_server_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if let Ok(value) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(value.with_timezone(&Utc));
    }
    if let Ok(value) = DateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(value.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Compact relative age such as `42s`, `5m`, `3h`, `2d`.
pub fn age_label(raw: &str, now: DateTime<Utc>) -> Option<String> {
    let at = parse_server_timestamp(raw)?;
    let secs = now.signed_duration_since(at).num_seconds().max(0);
    Some(match secs {
        0..=59 => format!("{secs}s"),
        60..=3_599 => format!("{}m", secs / 60),
        3_600..=86_399 => format!("{}h", secs / 3_600),
        _ => format!("{}d", secs / 86_400),
    })
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|text| !text.is_empty())
}
