use crate::ui;
use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use sk_client::{ApiClient, ClientConfig, DEFAULT_API_BASE, DEFAULT_API_KEY};
use sk_core::model::{DEFAULT_POLICY_PATH, DEFAULT_RULESET, DEFAULT_TARGET_PATH, WEBHOOK_EVENTS};
use sk_core::poller::{FLEET_POLL_INTERVAL, JOB_POLL_INTERVAL};
use sk_core::{
    reduce_results, CommitOutcome, CreateJobRequest, ExportFormat, Finding, JobView, Poller,
    SnippetKey, SuppressRequest, WebhookRequest,
};
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "sk-console")]
#[command(about = "Terminal console for the code-scanning service", long_about = None)]
pub struct Args {
    /// Base URL of the scanning service
    #[arg(long, env = "SK_API_BASE", default_value = DEFAULT_API_BASE)]
    pub api_base: String,
    /// Credential sent as X-API-Key on write requests
    #[arg(long, env = "SK_API_KEY", default_value = DEFAULT_API_KEY, hide_env_values = true)]
    pub api_key: String,
    /// Also send the credential on read requests
    #[arg(long, env = "SK_AUTH_READS")]
    pub auth_reads: bool,
    #[arg(
        long,
        env = "SK_JOB_INTERVAL_MS",
        default_value_t = JOB_POLL_INTERVAL.as_millis() as u64,
        value_parser = clap::value_parser!(u64).range(250..)
    )]
    pub job_interval_ms: u64,
    #[arg(
        long,
        env = "SK_FLEET_INTERVAL_MS",
        default_value_t = FLEET_POLL_INTERVAL.as_millis() as u64,
        value_parser = clap::value_parser!(u64).range(250..)
    )]
    pub fleet_interval_ms: u64,
    /// Page size for the job list (server default when unset)
    #[arg(long, env = "SK_JOB_LIMIT")]
    pub job_limit: Option<u32>,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Submit a scan job
    Submit {
        #[arg(long, default_value = DEFAULT_TARGET_PATH)]
        target: String,
        #[arg(long, default_value = DEFAULT_RULESET)]
        ruleset: String,
        #[arg(long, default_value = DEFAULT_POLICY_PATH)]
        policy: String,
        /// Skip the model judge pass
        #[arg(long)]
        no_ai_review: bool,
    },
    /// List recent jobs
    Jobs,
    /// Print one job's header, findings and model calls
    Results { job_id: String },
    /// Poll a job until it reaches a terminal status
    Watch { job_id: String },
    /// Print the SARIF download link for a job
    SarifUrl { job_id: String },
    /// Print aggregate statistics
    Stats,
    /// List the snippet catalog
    Snippets,
    /// Print one snippet
    Snippet { language: String, name: String },
    /// Export a job's findings
    Export {
        job_id: String,
        #[arg(long, default_value = "json")]
        format: ExportFormat,
    },
    /// Compare a job against a baseline job
    Diff {
        job_id: String,
        #[arg(long)]
        baseline: String,
    },
    /// List suppressed findings
    Suppressions,
    /// Suppress a finding by fingerprint
    Suppress {
        fingerprint: String,
        #[arg(long)]
        reason: String,
        #[arg(long, default_value = "sk-console")]
        by: String,
    },
    /// Remove a suppression
    Unsuppress { fingerprint: String },
    /// Check that the service is up
    Health,
    /// List webhook subscriptions
    Webhooks,
    /// Subscribe an HTTPS endpoint to scan events
    AddWebhook {
        url: String,
        /// Repeat for several events
        #[arg(long = "event", value_parser = WEBHOOK_EVENTS, default_value = "scan.completed")]
        events: Vec<String>,
        /// Shared secret used to sign deliveries
        #[arg(long, default_value = "", hide_default_value = true)]
        secret: String,
    },
    /// Delete a webhook subscription
    RemoveWebhook { id: u64 },
}

/// Everything resolved from flags and environment at start-up.
#[derive(Debug, Clone)]
pub struct Settings {
    pub client: ClientConfig,
    pub job_interval: Duration,
    pub fleet_interval: Duration,
    pub job_limit: Option<u32>,
}

impl Settings {
    pub fn from_args(args: &Args) -> Result<Self> {
        let client = ClientConfig::new(&args.api_base, args.api_key.clone())
            .context("invalid --api-base")?
            .with_auth_reads(args.auth_reads);
        Ok(Self {
            client,
            job_interval: Duration::from_millis(args.job_interval_ms),
            fleet_interval: Duration::from_millis(args.fleet_interval_ms),
            job_limit: args.job_limit,
        })
    }
}

pub async fn run(command: Command, settings: &Settings) -> Result<()> {
    let api = ApiClient::new(settings.client.clone())?;
    match command {
        Command::Submit {
            target,
            ruleset,
            policy,
            no_ai_review,
        } => {
            let request = CreateJobRequest {
                target_path: target,
                ruleset,
                ai_review: !no_ai_review,
                policy_path: policy,
            };
            let created = api.create_job(&request).await?;
            info!(event = "job_created", job_id = %created.job_id);
            println!("{}", created.job_id);
        }
        Command::Jobs => {
            let rows = api.list_jobs(settings.job_limit).await?;
            println!("{}", ui::plain_text(&ui::fleet_lines(&rows, None, Utc::now())));
        }
        Command::Results { job_id } => {
            let view = reduce_results(api.job_results(&job_id).await?);
            let sarif = api.sarif_url(&job_id)?.to_string();
            println!("Job {job_id}");
            println!("{}", ui::plain_text(&ui::job_view_lines(&view, Some(&sarif))));
        }
        Command::Watch { job_id } => watch(&api, &job_id, settings.job_interval).await?,
        Command::SarifUrl { job_id } => println!("{}", api.sarif_url(&job_id)?),
        Command::Stats => {
            let stats = api.stats().await?;
            println!("{}", ui::plain_text(&ui::stats_lines(&stats)));
        }
        Command::Snippets => {
            let entries = api.list_snippets().await?;
            println!("{}", ui::plain_text(&ui::snippet_entry_lines(&entries, None)));
        }
        Command::Snippet { language, name } => {
            let detail = api.snippet(&SnippetKey { language, name }).await?;
            println!("{}", ui::plain_text(&ui::snippet_detail_lines(&detail)));
        }
        Command::Export { job_id, format } => {
            let export = api.export(&job_id, format).await?;
            println!("{}", export.render());
        }
        Command::Diff { job_id, baseline } => {
            let diff = api.diff(&job_id, &baseline).await?;
            println!(
                "new {} | fixed {} | unchanged {}",
                diff.summary.new_count, diff.summary.fixed_count, diff.summary.unchanged_count
            );
            print_bucket("new", &diff.new);
            print_bucket("fixed", &diff.fixed);
            print_bucket("unchanged", &diff.unchanged);
        }
        Command::Suppressions => {
            let rows = api.suppressions().await?;
            if rows.is_empty() {
                println!("No suppressions.");
            }
            for row in rows {
                println!(
                    "{}  {}  {}  ({} {})",
                    row.fingerprint, row.rule_id, row.reason, row.suppressed_by, row.created_at
                );
            }
        }
        Command::Suppress {
            fingerprint,
            reason,
            by,
        } => {
            let ack = api
                .suppress(
                    &fingerprint,
                    &SuppressRequest {
                        reason,
                        suppressed_by: by,
                    },
                )
                .await?;
            println!("{} {}", ack.fingerprint, ack.status);
        }
        Command::Unsuppress { fingerprint } => {
            let ack = api.unsuppress(&fingerprint).await?;
            println!("{} {}", ack.fingerprint, ack.status);
        }
        Command::Health => {
            let health = api.health().await?;
            println!("{}", health.status);
            for (key, value) in &health.extra {
                println!("  {key}: {value}");
            }
        }
        Command::Webhooks => {
            let hooks = api.webhooks().await?;
            if hooks.is_empty() {
                println!("No webhooks.");
            }
            for hook in hooks {
                println!(
                    "{}  {}  [{}]  {}",
                    hook.id,
                    hook.url,
                    hook.events.join(","),
                    hook.state_label()
                );
            }
        }
        Command::AddWebhook {
            url,
            events,
            secret,
        } => {
            let hook = api
                .create_webhook(&WebhookRequest::new(url, events, secret))
                .await?;
            info!(event = "webhook_created", webhook_id = hook.id);
            println!("{}  {}  [{}]", hook.id, hook.url, hook.events.join(","));
        }
        Command::RemoveWebhook { id } => {
            let deleted = api.delete_webhook(id).await?;
            println!("{id} {}", deleted.status);
        }
    }
    Ok(())
}

fn print_bucket(label: &str, findings: &[Finding]) {
    if findings.is_empty() {
        return;
    }
    println!("{label}:");
    for finding in findings {
        println!(
            "  {} {}:{} {}",
            finding.rule_id, finding.file, finding.line, finding.title
        );
    }
}

/// Drives the same poller the dashboard uses, one request at a time.
async fn watch(api: &ApiClient, job_id: &str, interval: Duration) -> Result<()> {
    let mut poller = Poller::<JobView>::new();
    let mut ticket = Some(poller.start(job_id)?);
    let mut last_status = None;
    while let Some(current) = ticket.take() {
        let result = api
            .job_results(&current.target)
            .await
            .map(reduce_results)
            .map_err(|err| err.to_string());
        let outcome = poller.commit(&current, result);
        if let Some(error) = poller.error().filter(|_| outcome == CommitOutcome::Failed) {
            eprintln!("! {error}");
        }
        if let Some(status) = poller.snapshot().and_then(JobView::status).cloned() {
            if last_status.as_ref() != Some(&status) {
                println!("{job_id}: {status}");
                last_status = Some(status);
            }
        }
        if outcome == CommitOutcome::Settled {
            break;
        }
        tokio::time::sleep(interval).await;
        ticket = poller.tick();
    }
    if let Some(view) = poller.snapshot() {
        println!("{}", ui::plain_text(&ui::job_view_lines(view, None)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_local_service() {
        let args = Args::try_parse_from(["sk-console"]).expect("parse");
        let settings = Settings::from_args(&args).expect("settings");
        assert_eq!(settings.client.base_url().as_str(), "http://localhost:8000/");
        assert_eq!(settings.client.api_key(), "dev-local-key");
        assert!(!settings.client.auth_reads());
        assert_eq!(settings.job_interval, JOB_POLL_INTERVAL);
        assert_eq!(settings.fleet_interval, FLEET_POLL_INTERVAL);
        assert_eq!(settings.job_interval, Duration::from_millis(4_000));
        assert!(args.command.is_none());
    }

    #[test]
    fn flags_override_and_parse_subcommands() {
        let args = Args::try_parse_from([
            "sk-console",
            "--api-base",
            "http://scanner:9000",
            "--auth-reads",
            "--job-interval-ms",
            "1000",
            "export",
            "abc123",
            "--format",
            "md",
        ])
        .expect("parse");
        let settings = Settings::from_args(&args).expect("settings");
        assert!(settings.client.auth_reads());
        assert_eq!(settings.job_interval, Duration::from_millis(1_000));
        assert!(matches!(
            args.command,
            Some(Command::Export { ref job_id, format: ExportFormat::Md }) if job_id == "abc123"
        ));
    }

    #[test]
    fn add_webhook_collects_known_events_only() {
        let args = Args::try_parse_from([
            "sk-console",
            "add-webhook",
            "https://hooks.example.com/sk",
            "--event",
            "policy.block",
            "--event",
            "policy.allow",
        ])
        .expect("parse");
        assert!(matches!(
            args.command,
            Some(Command::AddWebhook { ref events, .. })
                if events == &["policy.block".to_string(), "policy.allow".to_string()]
        ));

        let defaulted =
            Args::try_parse_from(["sk-console", "add-webhook", "https://hooks.example.com/sk"])
                .expect("parse");
        assert!(matches!(
            defaulted.command,
            Some(Command::AddWebhook { ref events, ref secret, .. })
                if events == &["scan.completed".to_string()] && secret.is_empty()
        ));

        assert!(Args::try_parse_from([
            "sk-console",
            "add-webhook",
            "https://hooks.example.com/sk",
            "--event",
            "job.deleted",
        ])
        .is_err());
    }

    #[test]
    fn rejects_intervals_below_floor() {
        assert!(Args::try_parse_from(["sk-console", "--job-interval-ms", "10"]).is_err());
    }
}
