use crate::state::{AppEvent, Request};
use sk_client::ApiClient;
use tokio::sync::mpsc;
use tracing::debug;

/// Runs each [`Request`] on its own task and reports back over the event channel.
///
/// Requests are never cancelled; the state layer decides whether a late
/// result still applies.
#[derive(Clone)]
pub struct Fetcher {
    client: ApiClient,
    tx: mpsc::Sender<AppEvent>,
    job_limit: Option<u32>,
}

impl Fetcher {
    pub fn new(client: ApiClient, tx: mpsc::Sender<AppEvent>, job_limit: Option<u32>) -> Self {
        Self {
            client,
            tx,
            job_limit,
        }
    }

    pub fn dispatch_all(&self, requests: impl IntoIterator<Item = Request>) {
        for request in requests {
            self.dispatch(request);
        }
    }

    pub fn dispatch(&self, request: Request) {
        let client = self.client.clone();
        let tx = self.tx.clone();
        let job_limit = self.job_limit;
        tokio::spawn(async move {
            let event = run(&client, request, job_limit).await;
            if tx.send(event).await.is_err() {
                debug!(event = "fetch_result_dropped", reason = "channel_closed");
            }
        });
    }
}

async fn run(client: &ApiClient, request: Request, job_limit: Option<u32>) -> AppEvent {
    match request {
        Request::Fleet(ticket) => AppEvent::Fleet {
            result: client.list_jobs(job_limit).await,
            ticket,
        },
        Request::JobResults(ticket) => AppEvent::JobResults {
            result: client.job_results(&ticket.target).await,
            ticket,
        },
        Request::Stats(seq) => AppEvent::Stats {
            seq,
            result: client.stats().await,
        },
        Request::Snippets => AppEvent::Snippets(client.list_snippets().await),
        Request::Snippet(key) => AppEvent::Snippet {
            result: client.snippet(&key).await,
            key,
        },
        Request::CreateJob(body) => AppEvent::JobCreated(client.create_job(&body).await),
    }
}
