use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use sk_client::{ClientConfig, HttpError};
use sk_core::poller::FLEET_TARGET;
use sk_core::{
    reduce_results, CommitOutcome, CreateJobRequest, CreateJobResponse, JobResults, JobSummary,
    JobView, PollTicket, Poller, SnippetBrowser, SnippetDetail, SnippetEntry, SnippetKey, Stats,
};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Submit,
    Jobs,
    Stats,
    Snippets,
}

impl Mode {
    pub const ALL: [Mode; 4] = [Mode::Submit, Mode::Jobs, Mode::Stats, Mode::Snippets];

    pub fn title(self) -> &'static str {
        match self {
            Mode::Submit => "Submit",
            Mode::Jobs => "Jobs",
            Mode::Stats => "Stats",
            Mode::Snippets => "Snippets",
        }
    }

    fn next(self) -> Self {
        match self {
            Mode::Submit => Mode::Jobs,
            Mode::Jobs => Mode::Stats,
            Mode::Stats => Mode::Snippets,
            Mode::Snippets => Mode::Submit,
        }
    }
}

/// Work for the fetch layer. Each variant maps to exactly one HTTP call.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Fleet(PollTicket),
    JobResults(PollTicket),
    Stats(u64),
    Snippets,
    Snippet(SnippetKey),
    CreateJob(CreateJobRequest),
}

#[derive(Debug)]
pub enum AppEvent {
    Fleet {
        ticket: PollTicket,
        result: Result<Vec<JobSummary>, HttpError>,
    },
    JobResults {
        ticket: PollTicket,
        result: Result<JobResults, HttpError>,
    },
    Stats {
        seq: u64,
        result: Result<Stats, HttpError>,
    },
    Snippets(Result<Vec<SnippetEntry>, HttpError>),
    Snippet {
        key: SnippetKey,
        result: Result<SnippetDetail, HttpError>,
    },
    JobCreated(Result<CreateJobResponse, HttpError>),
}

/// One-shot aggregate snapshot; reloads only on request.
#[derive(Debug, Default)]
pub struct StatsPanel {
    stats: Option<Stats>,
    requested_seq: u64,
    loading: bool,
    error: Option<String>,
}

impl StatsPanel {
    pub fn stats(&self) -> Option<&Stats> {
        self.stats.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn request(&mut self) -> Request {
        self.requested_seq += 1;
        self.loading = true;
        Request::Stats(self.requested_seq)
    }

    fn apply(&mut self, seq: u64, result: Result<Stats, String>) -> bool {
        if seq != self.requested_seq {
            return false;
        }
        self.loading = false;
        match result {
            Ok(stats) => {
                self.stats = Some(stats);
                self.error = None;
            }
            Err(message) => self.error = Some(message),
        }
        true
    }
}

#[derive(Debug)]
pub struct SubmitForm {
    pub target_path: String,
    pub editing: bool,
    pub submitting: bool,
    pub error: Option<String>,
    pub last_job_id: Option<String>,
}

impl Default for SubmitForm {
    fn default() -> Self {
        Self {
            target_path: CreateJobRequest::default().target_path,
            editing: false,
            submitting: false,
            error: None,
            last_job_id: None,
        }
    }
}

pub struct App {
    pub mode: Mode,
    pub config: ClientConfig,
    pub fleet: Poller<Vec<JobSummary>>,
    pub job: Poller<JobView>,
    pub fleet_selected: usize,
    selected_job: Option<String>,
    pub detail_scroll: u16,
    pub stats: StatsPanel,
    pub snippets: SnippetBrowser,
    pub submit: SubmitForm,
    pub help_open: bool,
    pub status_note: Option<String>,
    fleet_epoch: u64,
    job_epoch: u64,
    should_quit: bool,
}

impl App {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            mode: Mode::Jobs,
            config,
            fleet: Poller::new(),
            job: Poller::new(),
            fleet_selected: 0,
            selected_job: None,
            detail_scroll: 0,
            stats: StatsPanel::default(),
            snippets: SnippetBrowser::new(),
            submit: SubmitForm::default(),
            help_open: false,
            status_note: None,
            fleet_epoch: 0,
            job_epoch: 0,
            should_quit: false,
        }
    }

    /// Requests for the first frame: the Jobs screen starts its fleet poller.
    pub fn start(&mut self) -> Vec<Request> {
        let mut requests = Vec::new();
        self.enter_jobs(&mut requests);
        requests
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Bumps whenever the fleet poller restarts, so its interval can be re-phased.
    pub fn fleet_epoch(&self) -> u64 {
        self.fleet_epoch
    }

    /// Bumps whenever the job poller starts on a new target.
    pub fn job_epoch(&self) -> u64 {
        self.job_epoch
    }

    pub fn detail_open(&self) -> bool {
        self.job.target().is_some()
    }

    pub fn fleet_rows(&self) -> &[JobSummary] {
        self.fleet.snapshot().map(Vec::as_slice).unwrap_or_default()
    }

    pub fn on_fleet_tick(&mut self) -> Option<Request> {
        self.fleet.tick().map(Request::Fleet)
    }

    pub fn on_job_tick(&mut self) -> Option<Request> {
        self.job.tick().map(Request::JobResults)
    }

    pub fn set_mode(&mut self, mode: Mode) -> Vec<Request> {
        let mut requests = Vec::new();
        if mode == self.mode {
            return requests;
        }
        if self.mode == Mode::Jobs {
            self.fleet.stop();
            self.job.stop();
            debug!(event = "pollers_stopped", reason = "leave_jobs");
        }
        self.mode = mode;
        self.submit.editing = false;
        self.status_note = None;
        match mode {
            Mode::Jobs => self.enter_jobs(&mut requests),
            Mode::Stats => {
                if self.stats.stats().is_none() && !self.stats.is_loading() {
                    requests.push(self.stats.request());
                }
            }
            Mode::Snippets => {
                if !self.snippets.is_loaded() {
                    requests.push(Request::Snippets);
                }
            }
            Mode::Submit => {}
        }
        requests
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Vec<Request> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return Vec::new();
        }
        if self.mode == Mode::Submit && self.submit.editing {
            return self.handle_edit_key(key);
        }
        if matches!(key.code, KeyCode::Char('?') | KeyCode::F(1)) {
            self.help_open = !self.help_open;
            return Vec::new();
        }
        if self.help_open {
            if key.code == KeyCode::Esc {
                self.help_open = false;
            }
            return Vec::new();
        }

        match key.code {
            KeyCode::Char('q') => {
                self.should_quit = true;
                Vec::new()
            }
            KeyCode::Char(digit @ '1'..='4') => {
                let index = digit as usize - '1' as usize;
                self.set_mode(Mode::ALL[index])
            }
            KeyCode::Tab => self.set_mode(self.mode.next()),
            KeyCode::Char('r') => self.refresh(),
            KeyCode::Down | KeyCode::Char('j') => {
                self.move_selection(1);
                Vec::new()
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.move_selection(-1);
                Vec::new()
            }
            KeyCode::PageDown | KeyCode::Char('J') => {
                self.detail_scroll = self.detail_scroll.saturating_add(5);
                Vec::new()
            }
            KeyCode::PageUp | KeyCode::Char('K') => {
                self.detail_scroll = self.detail_scroll.saturating_sub(5);
                Vec::new()
            }
            KeyCode::Enter => self.activate(),
            KeyCode::Char('e') | KeyCode::Char('i') if self.mode == Mode::Submit => {
                self.submit.editing = true;
                Vec::new()
            }
            KeyCode::Esc => {
                if self.mode == Mode::Jobs && self.detail_open() {
                    self.job.stop();
                    self.detail_scroll = 0;
                    debug!(event = "job_poller_stopped", reason = "close_detail");
                }
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    pub fn apply(&mut self, event: AppEvent) -> Vec<Request> {
        match event {
            AppEvent::Fleet { ticket, result } => {
                let outcome = self.fleet.commit(&ticket, result.map_err(|err| err.to_string()));
                log_commit("fleet", &ticket, outcome);
                self.follow_selected_job();
                Vec::new()
            }
            AppEvent::JobResults { ticket, result } => {
                let result = result.map(reduce_results).map_err(|err| err.to_string());
                let outcome = self.job.commit(&ticket, result);
                log_commit("job", &ticket, outcome);
                Vec::new()
            }
            AppEvent::Stats { seq, result } => {
                if !self.stats.apply(seq, result.map_err(|err| err.to_string())) {
                    debug!(event = "stale_response", source = "stats", seq);
                }
                Vec::new()
            }
            AppEvent::Snippets(result) => {
                self.snippets
                    .apply_entries(result.map_err(|err| err.to_string()));
                Vec::new()
            }
            AppEvent::Snippet { key, result } => {
                let applied = self
                    .snippets
                    .apply_detail(&key, result.map_err(|err| err.to_string()));
                if applied {
                    self.detail_scroll = 0;
                } else {
                    debug!(
                        event = "stale_response",
                        source = "snippet",
                        language = %key.language,
                        name = %key.name
                    );
                }
                Vec::new()
            }
            AppEvent::JobCreated(result) => self.apply_created(result),
        }
    }

    fn enter_jobs(&mut self, requests: &mut Vec<Request>) {
        match self.fleet.start(FLEET_TARGET) {
            Ok(ticket) => {
                self.fleet_epoch += 1;
                requests.push(Request::Fleet(ticket));
            }
            Err(err) => self.status_note = Some(err.to_string()),
        }
    }

    fn open_job(&mut self, job_id: &str) -> Option<Request> {
        if self.job.target() == Some(job_id.trim()) {
            return None;
        }
        match self.job.start(job_id) {
            Ok(ticket) => {
                self.job_epoch += 1;
                self.detail_scroll = 0;
                self.status_note = None;
                info!(event = "job_poller_started", job_id = %ticket.target);
                Some(Request::JobResults(ticket))
            }
            Err(err) => {
                self.status_note = Some(err.to_string());
                None
            }
        }
    }

    fn activate(&mut self) -> Vec<Request> {
        match self.mode {
            Mode::Jobs => {
                let job_id = self
                    .fleet_rows()
                    .get(self.fleet_selected)
                    .map(|row| row.id.clone())
                    .unwrap_or_default();
                self.open_job(&job_id).into_iter().collect()
            }
            Mode::Snippets => match self.snippets.open_selected() {
                Some(Ok(key)) => vec![Request::Snippet(key)],
                Some(Err(err)) => {
                    warn!(event = "snippet_key_invalid", error = %err);
                    Vec::new()
                }
                None => Vec::new(),
            },
            Mode::Submit => self.submit_job(),
            Mode::Stats => Vec::new(),
        }
    }

    fn refresh(&mut self) -> Vec<Request> {
        match self.mode {
            Mode::Jobs => {
                let mut requests: Vec<Request> =
                    self.fleet.refresh().map(Request::Fleet).into_iter().collect();
                requests.extend(self.job.refresh().map(Request::JobResults));
                requests
            }
            Mode::Stats => vec![self.stats.request()],
            Mode::Snippets => vec![Request::Snippets],
            Mode::Submit => Vec::new(),
        }
    }

    fn move_selection(&mut self, delta: isize) {
        match self.mode {
            Mode::Jobs => {
                let len = self.fleet_rows().len();
                if len == 0 {
                    self.fleet_selected = 0;
                    return;
                }
                let next = (self.fleet_selected as isize + delta).clamp(0, len as isize - 1);
                self.fleet_selected = next as usize;
                self.selected_job = self
                    .fleet_rows()
                    .get(self.fleet_selected)
                    .map(|row| row.id.clone());
            }
            Mode::Snippets => self.snippets.move_selection(delta),
            Mode::Stats => {
                self.detail_scroll = if delta > 0 {
                    self.detail_scroll.saturating_add(1)
                } else {
                    self.detail_scroll.saturating_sub(1)
                };
            }
            Mode::Submit => {}
        }
    }

    /// Keeps the highlight on the same job when new rows shift the list.
    fn follow_selected_job(&mut self) {
        let rows = self.fleet_rows();
        let found = self
            .selected_job
            .as_deref()
            .and_then(|id| rows.iter().position(|row| row.id == id));
        let index = match found {
            Some(index) => index,
            None => self.fleet_selected.min(rows.len().saturating_sub(1)),
        };
        let id = rows.get(index).map(|row| row.id.clone());
        self.fleet_selected = index;
        self.selected_job = id;
    }

    fn handle_edit_key(&mut self, key: KeyEvent) -> Vec<Request> {
        match key.code {
            KeyCode::Esc => {
                self.submit.editing = false;
                Vec::new()
            }
            KeyCode::Enter => {
                self.submit.editing = false;
                self.submit_job()
            }
            KeyCode::Backspace => {
                self.submit.target_path.pop();
                Vec::new()
            }
            KeyCode::Char(ch) => {
                self.submit.target_path.push(ch);
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    fn submit_job(&mut self) -> Vec<Request> {
        if self.submit.submitting {
            return Vec::new();
        }
        let target = self.submit.target_path.trim();
        if target.is_empty() {
            self.submit.error = Some("target path is required".to_string());
            return Vec::new();
        }
        self.submit.submitting = true;
        self.submit.error = None;
        vec![Request::CreateJob(CreateJobRequest::for_target(target))]
    }

    fn apply_created(&mut self, result: Result<CreateJobResponse, HttpError>) -> Vec<Request> {
        self.submit.submitting = false;
        match result {
            Ok(created) => {
                info!(event = "job_created", job_id = %created.job_id);
                self.submit.last_job_id = Some(created.job_id.clone());
                let mut requests = self.set_mode(Mode::Jobs);
                requests.extend(self.open_job(&created.job_id));
                requests
            }
            Err(err) => {
                warn!(event = "job_create_failed", error = %err);
                self.submit.error = Some(err.to_string());
                Vec::new()
            }
        }
    }
}

fn log_commit(source: &'static str, ticket: &PollTicket, outcome: CommitOutcome) {
    match outcome {
        CommitOutcome::Stale => {
            debug!(event = "stale_response", source, target = %ticket.target, seq = ticket.seq);
        }
        CommitOutcome::Settled => {
            info!(event = "poller_settled", source, target = %ticket.target, seq = ticket.seq);
        }
        CommitOutcome::Failed => {
            debug!(event = "poll_failed", source, target = %ticket.target, seq = ticket.seq);
        }
        CommitOutcome::Applied => {}
    }
}
