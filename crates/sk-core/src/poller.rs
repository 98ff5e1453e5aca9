//! Polling lifecycle for a single remote resource.
//!
//! The poller never performs IO. It hands out [`PollTicket`]s that the caller
//! turns into requests and feeds the outcome back through [`Poller::commit`],
//! which decides whether the response may replace the held snapshot.

use crate::model::JobSummary;
use crate::reducer::JobView;
use crate::CoreError;
use std::time::Duration;

pub const JOB_POLL_INTERVAL: Duration = Duration::from_millis(4_000);
pub const FLEET_POLL_INTERVAL: Duration = Duration::from_millis(5_000);
pub const FLEET_TARGET: &str = "jobs";

/// A value a poller can hold as its latest snapshot.
pub trait Snapshot {
    /// Once true the resource can no longer change and scheduled ticks stop.
    fn is_terminal(&self) -> bool {
        false
    }
}

impl Snapshot for JobView {
    fn is_terminal(&self) -> bool {
        JobView::is_terminal(self)
    }
}

impl Snapshot for Vec<JobSummary> {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerPhase {
    Idle,
    Polling,
    Settled,
    Stopped,
}

impl PollerPhase {
    pub fn label(self) -> &'static str {
        match self {
            PollerPhase::Idle => "idle",
            PollerPhase::Polling => "polling",
            PollerPhase::Settled => "settled",
            PollerPhase::Stopped => "stopped",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PollTicket {
    pub target: String,
    pub seq: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Applied,
    Settled,
    Failed,
    Stale,
}

#[derive(Debug, Clone)]
pub struct Poller<T> {
    phase: PollerPhase,
    target: Option<String>,
    next_seq: u64,
    committed_seq: u64,
    snapshot: Option<T>,
    error: Option<String>,
}

impl<T> Default for Poller<T> {
    fn default() -> Self {
        Self {
            phase: PollerPhase::Idle,
            target: None,
            next_seq: 0,
            committed_seq: 0,
            snapshot: None,
            error: None,
        }
    }
}

impl<T: Snapshot> Poller<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> PollerPhase {
        self.phase
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub fn snapshot(&self) -> Option<&T> {
        self.snapshot.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Points the poller at `target` and returns the ticket for the immediate first fetch.
    ///
    /// Any ticket issued before this call is stale from now on, even for the same target.
    pub fn start(&mut self, target: &str) -> Result<PollTicket, CoreError> {
        let target = target.trim();
        if target.is_empty() {
            return Err(CoreError::MissingJobId);
        }
        self.target = Some(target.to_string());
        self.snapshot = None;
        self.error = None;
        self.committed_seq = self.next_seq;
        self.phase = PollerPhase::Polling;
        Ok(self.issue())
    }

    /// Teardown. In-flight requests keep running; their responses commit as stale.
    pub fn stop(&mut self) {
        self.phase = PollerPhase::Stopped;
        self.target = None;
        self.snapshot = None;
        self.error = None;
        self.committed_seq = self.next_seq;
    }

    /// Scheduled tick. Yields nothing unless actively polling.
    pub fn tick(&mut self) -> Option<PollTicket> {
        if self.phase != PollerPhase::Polling {
            return None;
        }
        Some(self.issue())
    }

    /// Out-of-band fetch. Resumes scheduled polling when the poller had settled.
    pub fn refresh(&mut self) -> Option<PollTicket> {
        match self.phase {
            PollerPhase::Polling => Some(self.issue()),
            PollerPhase::Settled => {
                self.phase = PollerPhase::Polling;
                Some(self.issue())
            }
            PollerPhase::Idle | PollerPhase::Stopped => None,
        }
    }

    pub fn commit(&mut self, ticket: &PollTicket, result: Result<T, String>) -> CommitOutcome {
        if self.target.as_deref() != Some(ticket.target.as_str()) {
            return CommitOutcome::Stale;
        }
        if ticket.seq <= self.committed_seq {
            return CommitOutcome::Stale;
        }
        self.committed_seq = ticket.seq;
        match result {
            Ok(snapshot) => {
                let terminal = snapshot.is_terminal();
                self.snapshot = Some(snapshot);
                self.error = None;
                if terminal {
                    self.phase = PollerPhase::Settled;
                    CommitOutcome::Settled
                } else {
                    self.phase = PollerPhase::Polling;
                    CommitOutcome::Applied
                }
            }
            Err(message) => {
                self.error = Some(message);
                CommitOutcome::Failed
            }
        }
    }

    fn issue(&mut self) -> PollTicket {
        self.next_seq += 1;
        PollTicket {
            target: self.target.clone().unwrap_or_default(),
            seq: self.next_seq,
        }
    }
}
