use crate::model::{Finding, Job, JobResults, JobStatus, ModelCall, Severity};

/// Per-job read model. The three slices are projected independently and
/// carry the server's ordering verbatim.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobView {
    pub header: Option<Job>,
    pub findings: Vec<Finding>,
    pub model_calls: Vec<ModelCall>,
}

pub fn reduce_results(payload: JobResults) -> JobView {
    JobView {
        header: payload.job,
        findings: payload.findings.unwrap_or_default(),
        model_calls: payload.model_calls.unwrap_or_default(),
    }
}

impl JobView {
    pub fn status(&self) -> Option<&JobStatus> {
        self.header.as_ref().map(|job| &job.status)
    }

    pub fn is_terminal(&self) -> bool {
        self.status().map(JobStatus::is_terminal).unwrap_or(false)
    }

    /// Finding counts per fixed severity, in display order. Unknown labels are not counted.
    pub fn severity_tally(&self) -> [(Severity, usize); 4] {
        Severity::ALL.map(|severity| {
            let count = self
                .findings
                .iter()
                .filter(|finding| finding.severity_kind() == Some(severity))
                .count();
            (severity, count)
        })
    }

    pub fn estimated_cost_usd(&self) -> f64 {
        self.model_calls
            .iter()
            .filter_map(|call| call.estimated_cost_usd)
            .filter(|cost| cost.is_finite())
            .sum()
    }
}

impl From<JobResults> for JobView {
    fn from(payload: JobResults) -> Self {
        reduce_results(payload)
    }
}
