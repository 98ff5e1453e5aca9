use crate::state::{App, Mode, StatsPanel, SubmitForm};
use crate::theme::{
    decision_color, error_style, muted_style, section_style, severity_color, status_color,
    SELECTED_STYLE, THEME,
};
use chrono::{DateTime, Utc};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};
use serde_json::Value;
use sk_core::buckets::bar_cells;
use sk_core::model::{age_label, DEFAULT_POLICY_PATH, DEFAULT_RULESET};
use sk_core::{
    decision_bars, format_cost_usd, severity_bars, BucketBar, Decision, Finding, JobSummary,
    JobView, ModelCall, Poller, SnippetBrowser, SnippetDetail, SnippetEntry, Stats,
};

pub const NO_FINDINGS: &str = "No findings yet (job may still be running).";
pub const NO_MODEL_CALLS: &str = "No model calls yet.";
pub const NO_JOBS: &str = "No jobs yet.";
pub const NO_SNIPPETS: &str = "No snippets found.";
pub const PICK_SNIPPET: &str = "Pick a snippet on the left.";
pub const NO_TOP_RULES: &str = "No findings yet.";
pub const PICK_JOB: &str = "Select a job and press Enter.";
const LOADING: &str = "Loading...";
const BAR_WIDTH: usize = 24;
const LABEL_WIDTH: usize = 14;

pub fn render(frame: &mut Frame, app: &App) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(frame.size());

    frame.render_widget(render_header(app), layout[0]);
    match app.mode {
        Mode::Submit => frame.render_widget(
            panel(Text::from(submit_lines(&app.submit)), "Submit"),
            layout[1],
        ),
        Mode::Jobs => render_jobs(frame, app, layout[1]),
        Mode::Stats => frame.render_widget(
            panel(Text::from(stats_panel_lines(&app.stats)), "Stats")
                .scroll((app.detail_scroll, 0)),
            layout[1],
        ),
        Mode::Snippets => render_snippets(frame, app, layout[1]),
    }
    frame.render_widget(render_footer(app), layout[2]);

    if app.help_open {
        render_help_overlay(frame, app);
    }
}

fn panel<'a>(text: Text<'a>, title: &'a str) -> Paragraph<'a> {
    Paragraph::new(text)
        .style(Style::default().fg(THEME.text))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(THEME.border))
                .title(Span::styled(
                    title,
                    Style::default()
                        .fg(THEME.title)
                        .add_modifier(Modifier::BOLD),
                )),
        )
        .wrap(Wrap { trim: false })
}

fn render_header(app: &App) -> Paragraph<'static> {
    let mut tabs = Vec::new();
    for (index, mode) in Mode::ALL.iter().enumerate() {
        let label = format!(" {} {} ", index + 1, mode.title());
        if *mode == app.mode {
            tabs.push(Span::styled(label, SELECTED_STYLE));
        } else {
            tabs.push(Span::styled(label, muted_style()));
        }
        tabs.push(Span::raw(" "));
    }
    tabs.push(Span::styled(
        format!(" api: {}", app.config.base_url()),
        muted_style(),
    ));
    Paragraph::new(Line::from(tabs)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(THEME.border))
            .title(Span::styled(
                "Scan Console",
                Style::default()
                    .fg(THEME.title)
                    .add_modifier(Modifier::BOLD),
            )),
    )
}

fn render_footer(app: &App) -> Paragraph<'static> {
    match &app.status_note {
        Some(note) => Paragraph::new(Line::from(Span::styled(
            note.clone(),
            Style::default().fg(THEME.warn),
        ))),
        None => Paragraph::new(Line::from(Span::styled(
            "1-4/Tab switch  j/k move  Enter open  Esc close  r refresh  ? help  q quit",
            muted_style(),
        ))),
    }
}

fn render_jobs(frame: &mut Frame, app: &App, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(area);

    let list = fleet_panel_lines(&app.fleet, app.fleet_selected, Utc::now());
    let visible = columns[0].height.saturating_sub(2) as usize;
    let offset = (app.fleet_selected + 1).saturating_sub(visible.max(1));
    let title = format!("Jobs [{}]", app.fleet.phase().label());
    frame.render_widget(
        panel(Text::from(list), &title).scroll((offset as u16, 0)),
        columns[0],
    );

    let detail = if app.detail_open() {
        let sarif = app
            .job
            .target()
            .and_then(|id| app.config.sarif_url(id).ok())
            .map(|url| url.to_string());
        job_panel_lines(&app.job, sarif.as_deref())
    } else {
        vec![Line::from(Span::styled(PICK_JOB, muted_style()))]
    };
    frame.render_widget(
        panel(Text::from(detail), "Job detail").scroll((app.detail_scroll, 0)),
        columns[1],
    );
}

fn render_snippets(frame: &mut Frame, app: &App, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(area);

    let mut list = Vec::new();
    if let Some(error) = app.snippets.error() {
        list.push(error_line(error));
    }
    if app.snippets.is_loaded() {
        list.extend(snippet_entry_lines(
            app.snippets.entries(),
            Some(app.snippets.selected()),
        ));
    } else if app.snippets.error().is_none() {
        list.push(Line::from(Span::styled(LOADING, muted_style())));
    }
    let visible = columns[0].height.saturating_sub(2) as usize;
    let offset = (app.snippets.selected() * 2 + 2).saturating_sub(visible.max(1));
    frame.render_widget(
        panel(Text::from(list), "Snippets").scroll((offset as u16, 0)),
        columns[0],
    );

    frame.render_widget(
        panel(Text::from(snippet_pane_lines(&app.snippets)), "Snippet")
            .scroll((app.detail_scroll, 0)),
        columns[1],
    );
}

fn render_help_overlay(frame: &mut Frame, app: &App) {
    let area = centered_rect(70, 70, frame.size());
    frame.render_widget(Clear, area);
    frame.render_widget(
        panel(Text::from(help_lines(app.mode)), "Help")
            .style(Style::default().fg(THEME.text).bg(THEME.surface)),
        area,
    );
}

fn help_lines(mode: Mode) -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::from(Span::styled("Navigation", section_style())),
        Line::from("  1/2/3/4  switch screen (Submit/Jobs/Stats/Snippets)"),
        Line::from("  Tab      cycle screen"),
        Line::from("  r        refresh current screen"),
        Line::from(""),
    ];
    lines.push(Line::from(Span::styled(
        format!("{} Screen", mode.title()),
        section_style(),
    )));
    match mode {
        Mode::Submit => lines.extend([
            Line::from("  e        edit target path (Esc stops editing)"),
            Line::from("  Enter    submit scan job"),
        ]),
        Mode::Jobs => lines.extend([
            Line::from("  j/k      select job"),
            Line::from("  Enter    open job detail (starts polling)"),
            Line::from("  J/K      scroll detail"),
            Line::from("  Esc      close detail (stops polling)"),
        ]),
        Mode::Stats => lines.extend([
            Line::from("  j/k      scroll"),
            Line::from("  r        reload aggregates"),
        ]),
        Mode::Snippets => lines.extend([
            Line::from("  j/k      select snippet"),
            Line::from("  Enter    load snippet"),
            Line::from("  J/K      scroll snippet"),
        ]),
    }
    lines.extend([
        Line::from(""),
        Line::from(Span::styled("Exit", section_style())),
        Line::from("  ? or F1  toggle this help"),
        Line::from("  q        quit"),
    ]);
    lines
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100u16.saturating_sub(percent_y)) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100u16.saturating_sub(percent_y)) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100u16.saturating_sub(percent_x)) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100u16.saturating_sub(percent_x)) / 2),
        ])
        .split(vertical[1])[1]
}

fn error_line(message: &str) -> Line<'static> {
    Line::from(Span::styled(format!("! {message}"), error_style()))
}

fn loading_or_error<T>(poller: &Poller<T>) -> Vec<Line<'static>>
where
    T: sk_core::Snapshot,
{
    let mut lines = Vec::new();
    if let Some(error) = poller.error() {
        lines.push(error_line(error));
    } else if poller.snapshot().is_none() {
        lines.push(Line::from(Span::styled(LOADING, muted_style())));
    }
    lines
}

fn fleet_panel_lines(
    fleet: &Poller<Vec<JobSummary>>,
    selected: usize,
    now: DateTime<Utc>,
) -> Vec<Line<'static>> {
    let mut lines = loading_or_error(fleet);
    if let Some(rows) = fleet.snapshot() {
        lines.extend(fleet_lines(rows, Some(selected), now));
    }
    lines
}

/// One row per job in server order, or the empty state.
pub fn fleet_lines(
    rows: &[JobSummary],
    selected: Option<usize>,
    now: DateTime<Utc>,
) -> Vec<Line<'static>> {
    if rows.is_empty() {
        return vec![Line::from(Span::styled(NO_JOBS, muted_style()))];
    }
    rows.iter()
        .enumerate()
        .map(|(index, row)| {
            let age = row
                .created_at
                .as_deref()
                .map(|raw| age_label(raw, now).unwrap_or_else(|| raw.to_string()))
                .unwrap_or_default();
            let decision = row.decision_label();
            let spans = vec![
                Span::raw(format!("{:<14} ", ellipsize(&row.id, 14))),
                Span::styled(
                    format!("{:<10} ", row.status.as_str()),
                    Style::default().fg(status_color(&row.status)),
                ),
                Span::styled(
                    format!("{:<14} ", decision_display(decision)),
                    Style::default().fg(decision_color(Decision::from_label(decision))),
                ),
                Span::styled(age, muted_style()),
            ];
            if selected == Some(index) {
                Line::from(spans).style(SELECTED_STYLE)
            } else {
                Line::from(spans)
            }
        })
        .collect()
}

fn job_panel_lines(job: &Poller<JobView>, sarif: Option<&str>) -> Vec<Line<'static>> {
    let job_id = job.target().unwrap_or_default();
    let mut lines = vec![Line::from(vec![
        Span::styled(
            format!("Job {job_id}"),
            Style::default()
                .fg(THEME.title)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!("  [{}]", job.phase().label()), muted_style()),
    ])];
    lines.extend(loading_or_error(job));
    if let Some(view) = job.snapshot() {
        lines.extend(job_view_lines(view, sarif));
    }
    lines
}

/// Header, findings and model-call sections for one reduced results payload.
pub fn job_view_lines(view: &JobView, sarif: Option<&str>) -> Vec<Line<'static>> {
    let mut lines = job_header_lines(view, sarif);
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        format!("Findings ({})", view.findings.len()),
        section_style(),
    )));
    lines.extend(finding_lines(&view.findings));
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        format!("Model calls ({})", view.model_calls.len()),
        section_style(),
    )));
    lines.extend(model_call_lines(&view.model_calls));
    lines
}

fn job_header_lines(view: &JobView, sarif: Option<&str>) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    match &view.header {
        Some(job) => {
            let decision = job.decision_label();
            lines.push(Line::from(vec![
                Span::raw("status: "),
                Span::styled(
                    job.status.to_string(),
                    Style::default().fg(status_color(&job.status)),
                ),
                Span::raw("  decision: "),
                Span::styled(
                    decision_display(decision),
                    Style::default()
                        .fg(decision_color(job.decision_kind()))
                        .add_modifier(Modifier::BOLD),
                ),
            ]));
            if let Some(reason) = job.decision_reason.as_deref().filter(|r| !r.trim().is_empty()) {
                lines.push(Line::from(format!("reason: {reason}")));
            }
            let mut meta = Vec::new();
            if let Some(created) = job.created_at.as_deref() {
                meta.push(format!("created {created}"));
            }
            if let Some(ruleset) = job.ruleset.as_deref() {
                meta.push(format!("ruleset {ruleset}"));
            }
            if !meta.is_empty() {
                lines.push(Line::from(Span::styled(meta.join("  "), muted_style())));
            }
        }
        None => lines.push(Line::from(Span::styled("status: unknown", muted_style()))),
    }

    let mut tally = Vec::new();
    for (index, (severity, count)) in view.severity_tally().iter().enumerate() {
        if index > 0 {
            tally.push(Span::styled(" | ", muted_style()));
        }
        tally.push(Span::styled(
            format!("{severity} {count}"),
            Style::default().fg(severity_color(Some(*severity))),
        ));
    }
    lines.push(Line::from(tally));

    if view
        .model_calls
        .iter()
        .any(|call| call.estimated_cost_usd.is_some())
    {
        lines.push(Line::from(format!(
            "est. cost {}",
            format_cost_usd(view.estimated_cost_usd())
        )));
    }
    if let Some(url) = sarif {
        lines.push(Line::from(Span::styled(format!("SARIF: {url}"), muted_style())));
    }
    lines
}

pub fn finding_lines(findings: &[Finding]) -> Vec<Line<'static>> {
    if findings.is_empty() {
        return vec![Line::from(Span::styled(NO_FINDINGS, muted_style()))];
    }
    let mut lines = Vec::new();
    for finding in findings {
        let color = severity_color(finding.severity_kind());
        lines.push(Line::from(vec![
            Span::styled(
                format!("[{}] ", finding.severity.to_ascii_uppercase()),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("{} ", finding.rule_id),
                Style::default().fg(THEME.accent),
            ),
            Span::raw(finding.title.clone()),
        ]));
        let mut location = format!("    {}:{}", finding.file, finding.line);
        if let Some(category) = finding.category.as_deref().filter(|c| !c.is_empty()) {
            location.push_str(&format!("  ({category})"));
        }
        lines.push(Line::from(Span::styled(location, muted_style())));
        if let Some(message) = finding.message() {
            lines.push(Line::from(format!("    {message}")));
        }
        if let Some(remediation) = finding.remediation() {
            lines.push(Line::from(Span::styled(
                format!("    fix: {remediation}"),
                Style::default().fg(THEME.ok),
            )));
        }
        if let Some(excerpt) = finding.match_excerpt() {
            for (index, text) in excerpt.lines().enumerate() {
                let prefix = if index == 0 { "    match: " } else { "           " };
                lines.push(Line::from(Span::styled(
                    format!("{prefix}{text}"),
                    muted_style(),
                )));
            }
        }
    }
    lines
}

pub fn model_call_lines(calls: &[ModelCall]) -> Vec<Line<'static>> {
    if calls.is_empty() {
        return vec![Line::from(Span::styled(NO_MODEL_CALLS, muted_style()))];
    }
    let mut lines = Vec::new();
    for call in calls {
        let mut header = vec![
            Span::styled(
                format!("{}/{}", call.provider, call.model),
                Style::default()
                    .fg(THEME.accent)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!("  role: {}", call.role)),
        ];
        if let (Some(prompt), Some(completion)) = (call.prompt_tokens, call.completion_tokens) {
            header.push(Span::styled(
                format!("  tokens {prompt}/{completion}"),
                muted_style(),
            ));
        }
        if let Some(cost) = call.estimated_cost_usd {
            header.push(Span::styled(
                format!("  {}", format_cost_usd(cost)),
                muted_style(),
            ));
        }
        lines.push(Line::from(header));

        if let Some(fields) = call.parsed_fields() {
            for (key, value) in fields {
                let rendered = match value {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                };
                lines.push(Line::from(vec![
                    Span::styled(format!("    {key}: "), muted_style()),
                    Span::raw(rendered),
                ]));
            }
        } else if let Some(excerpt) = call.response_excerpt() {
            for text in excerpt.lines() {
                lines.push(Line::from(format!("    {text}")));
            }
        } else {
            lines.push(Line::from(Span::styled("    (no output)", muted_style())));
        }
    }
    lines
}

fn stats_panel_lines(panel: &StatsPanel) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    if let Some(error) = panel.error() {
        lines.push(error_line(error));
    }
    match panel.stats() {
        Some(stats) => lines.extend(stats_lines(stats)),
        None if panel.error().is_none() => {
            lines.push(Line::from(Span::styled(LOADING, muted_style())))
        }
        None => {}
    }
    lines
}

/// Summary cards, both bucket charts and the top-rules table.
pub fn stats_lines(stats: &Stats) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(vec![
        Span::raw(format!("Jobs {}", stats.total_jobs)),
        Span::styled(" | ", muted_style()),
        Span::raw(format!("Findings {}", stats.total_findings)),
        Span::styled(" | ", muted_style()),
        Span::raw(format!("Model calls {}", stats.total_model_calls)),
        Span::styled(" | ", muted_style()),
        Span::raw(format!(
            "Est. cost {}",
            format_cost_usd(stats.total_estimated_cost_usd)
        )),
    ])];

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Findings by severity",
        section_style(),
    )));
    for bar in severity_bars(stats) {
        let color = severity_color(sk_core::Severity::from_label(bar.key));
        lines.push(bar_line(&bar, Style::default().fg(color)));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled("Decisions", section_style())));
    for bar in decision_bars(stats) {
        let color = decision_color(Decision::from_label(bar.key));
        lines.push(bar_line(&bar, Style::default().fg(color)));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled("Top rules", section_style())));
    if stats.top_rules.is_empty() {
        lines.push(Line::from(Span::styled(
            format!("  {NO_TOP_RULES}"),
            muted_style(),
        )));
    }
    for rule in &stats.top_rules {
        lines.push(Line::from(vec![
            Span::styled(
                format!("  {:<32}", rule.rule_id),
                Style::default().fg(THEME.accent),
            ),
            Span::raw(format!("{:>6}", rule.count)),
        ]));
    }
    lines
}

fn bar_line(bar: &BucketBar, style: Style) -> Line<'static> {
    let filled = bar_cells(bar.percent, BAR_WIDTH);
    Line::from(vec![
        Span::raw(format!("  {:<LABEL_WIDTH$}{:>6}  ", bar.label, bar.count)),
        Span::styled("█".repeat(filled), style),
        Span::styled("·".repeat(BAR_WIDTH - filled), muted_style()),
        Span::raw(format!(" {:>3}%", bar.percent)),
    ])
}

pub fn snippet_entry_lines(entries: &[SnippetEntry], selected: Option<usize>) -> Vec<Line<'static>> {
    if entries.is_empty() {
        return vec![Line::from(Span::styled(NO_SNIPPETS, muted_style()))];
    }
    let mut lines = Vec::new();
    for (index, entry) in entries.iter().enumerate() {
        let title = Line::from(Span::styled(
            entry.title.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        ));
        lines.push(if selected == Some(index) {
            title.style(SELECTED_STYLE)
        } else {
            title
        });
        lines.push(Line::from(Span::styled(
            format!("  {}", entry.tag_line()),
            muted_style(),
        )));
    }
    lines
}

fn snippet_pane_lines(browser: &SnippetBrowser) -> Vec<Line<'static>> {
    if let Some(key) = browser.pending() {
        return vec![Line::from(Span::styled(
            format!("Loading {}/{}...", key.language, key.name),
            muted_style(),
        ))];
    }
    match browser.detail() {
        Some(detail) => snippet_detail_lines(detail),
        None => vec![Line::from(Span::styled(PICK_SNIPPET, muted_style()))],
    }
}

pub fn snippet_detail_lines(detail: &SnippetDetail) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(Span::styled(
        detail.meta.title.clone(),
        Style::default()
            .fg(THEME.title)
            .add_modifier(Modifier::BOLD),
    ))];
    if !detail.meta.description.trim().is_empty() {
        lines.push(Line::from(Span::styled(
            detail.meta.description.clone(),
            muted_style(),
        )));
    }
    lines.push(Line::from(""));
    lines.extend(detail.content.lines().map(|text| Line::from(text.to_string())));
    lines
}

fn submit_lines(form: &SubmitForm) -> Vec<Line<'static>> {
    let cursor = if form.editing { "_" } else { "" };
    let field_style = if form.editing {
        Style::default()
            .fg(THEME.accent)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(THEME.text)
    };
    let mut lines = vec![
        Line::from(Span::styled("Submit a scan job", section_style())),
        Line::from(""),
        Line::from(vec![
            Span::raw("Target path  "),
            Span::styled(format!("{}{cursor}", form.target_path), field_style),
        ]),
        Line::from(vec![
            Span::raw("Ruleset      "),
            Span::styled(DEFAULT_RULESET, muted_style()),
        ]),
        Line::from(vec![
            Span::raw("Policy       "),
            Span::styled(DEFAULT_POLICY_PATH, muted_style()),
        ]),
        Line::from(vec![
            Span::raw("AI review    "),
            Span::styled("on", muted_style()),
        ]),
        Line::from(""),
    ];
    if form.editing {
        lines.push(Line::from(Span::styled(
            "Editing: Enter submits, Esc stops editing.",
            muted_style(),
        )));
    } else {
        lines.push(Line::from(Span::styled(
            "Press e to edit the target path, Enter to submit.",
            muted_style(),
        )));
    }
    if form.submitting {
        lines.push(Line::from(Span::styled(
            "Submitting...",
            Style::default().fg(THEME.warn),
        )));
    }
    if let Some(error) = form.error.as_deref() {
        lines.push(error_line(error));
    }
    if let Some(job_id) = form.last_job_id.as_deref() {
        lines.push(Line::from(Span::styled(
            format!("Last submitted job: {job_id}"),
            Style::default().fg(THEME.ok),
        )));
    }
    lines
}

fn decision_display(label: &str) -> String {
    label.replace('_', " ")
}

fn ellipsize(input: &str, max: usize) -> String {
    if input.chars().count() <= max {
        return input.to_string();
    }
    if max <= 3 {
        return "...".chars().take(max).collect();
    }
    let prefix: String = input.chars().take(max - 3).collect();
    format!("{prefix}...")
}

/// Flattens styled lines into terminal-free text for one-shot output.
pub fn plain_text(lines: &[Line<'_>]) -> String {
    lines
        .iter()
        .map(|line| {
            line.spans
                .iter()
                .map(|span| span.content.as_ref())
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppEvent;
    use chrono::TimeZone;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use ratatui::{backend::TestBackend, Terminal};
    use sk_client::ClientConfig;
    use sk_core::{Job, JobResults, JobStatus, RuleCount};
    use std::collections::BTreeMap;

    fn draw(app: &App, width: u16, height: u16) -> String {
        let backend = TestBackend::new(width, height);
        let mut terminal = Terminal::new(backend).expect("terminal");
        terminal.draw(|frame| render(frame, app)).expect("draw");
        let buffer = terminal.backend().buffer().clone();
        let mut out = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                out.push_str(buffer.get(x, y).symbol());
            }
            out.push('\n');
        }
        out
    }

    fn scenario_two_stats() -> Stats {
        Stats {
            total_jobs: 12,
            total_findings: 7,
            total_model_calls: 3,
            total_estimated_cost_usd: 1.23449,
            by_severity: BTreeMap::from([("critical".to_string(), 2), ("high".to_string(), 5)]),
            by_decision: BTreeMap::from([("block".to_string(), 3), ("allow".to_string(), 7)]),
            top_rules: vec![RuleCount {
                rule_id: "sk-001".to_string(),
                count: 4,
            }],
        }
    }

    fn line_with<'a>(text: &'a str, label: &str) -> &'a str {
        text.lines()
            .find(|line| line.trim_start().starts_with(label))
            .unwrap_or_else(|| panic!("no line for {label} in:\n{text}"))
    }

    #[test]
    fn queued_job_detail_shows_both_empty_states() {
        let mut app = App::new(ClientConfig::new("http://localhost:8000", "key").expect("config"));
        let requests = app.start();
        let Some(crate::state::Request::Fleet(ticket)) = requests.first().cloned() else {
            panic!("fleet request");
        };
        app.apply(AppEvent::Fleet {
            ticket,
            result: Ok(vec![JobSummary {
                id: "abc123".to_string(),
                status: JobStatus::Queued,
                decision: None,
                created_at: None,
                ruleset: None,
                ai_review: Some(true),
            }]),
        });
        let opened = app.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE));
        let Some(crate::state::Request::JobResults(ticket)) = opened.first().cloned() else {
            panic!("job request");
        };
        app.apply(AppEvent::JobResults {
            ticket,
            result: Ok(JobResults {
                job: Some(Job {
                    id: Some("abc123".to_string()),
                    status: JobStatus::Queued,
                    ..Job::default()
                }),
                findings: Some(Vec::new()),
                model_calls: Some(Vec::new()),
            }),
        });

        let screen = draw(&app, 140, 40);
        assert!(screen.contains(NO_FINDINGS), "{screen}");
        assert!(screen.contains(NO_MODEL_CALLS), "{screen}");
        assert!(screen.contains("Job abc123"));
        assert!(screen.contains("decision: pending"));
        assert!(screen.contains("/jobs/abc123/sarif"));
    }

    #[test]
    fn closed_detail_prompts_for_selection() {
        let mut app = App::new(ClientConfig::new("http://localhost:8000", "key").expect("config"));
        app.start();
        let screen = draw(&app, 120, 30);
        assert!(screen.contains(PICK_JOB));
        assert!(screen.contains(LOADING));
    }

    #[test]
    fn stats_bars_scale_to_largest_bucket() {
        let text = plain_text(&stats_lines(&scenario_two_stats()));
        assert!(line_with(&text, "critical").ends_with(" 40%"));
        assert!(line_with(&text, "high").ends_with("100%"));
        assert!(line_with(&text, "medium").ends_with(" 0%"));
        assert!(line_with(&text, "low").ends_with(" 0%"));
        assert!(line_with(&text, "block").ends_with(" 43%"));
        assert!(line_with(&text, "manual review").ends_with(" 0%"));
        assert!(line_with(&text, "allow").ends_with("100%"));
        assert!(text.contains("Est. cost $1.2345"));
        assert!(line_with(&text, "sk-001").ends_with("4"));
    }

    #[test]
    fn stats_without_rules_shows_empty_table() {
        let text = plain_text(&stats_lines(&Stats::default()));
        assert!(text.contains(NO_TOP_RULES));
        assert!(line_with(&text, "critical").ends_with(" 0%"));
        assert!(text.contains("Est. cost $0.0000"));
    }

    #[test]
    fn findings_and_calls_render_in_server_order() {
        let findings = vec![
            Finding {
                rule_id: "sk-002".to_string(),
                title: "Prompt built from user input".to_string(),
                severity: "high".to_string(),
                file: "app/chat.py".to_string(),
                line: 9,
                remediation: Some("Escape the input".to_string()),
                ..Finding::default()
            },
            Finding {
                rule_id: "sk-001".to_string(),
                title: "Model output passed to exec".to_string(),
                severity: "urgent".to_string(),
                file: "app/agent.py".to_string(),
                line: 42,
                match_excerpt: Some("exec(response)".to_string()),
                ..Finding::default()
            },
        ];
        let text = plain_text(&finding_lines(&findings));
        let first = text.find("sk-002").expect("first");
        let second = text.find("sk-001").expect("second");
        assert!(first < second);
        assert!(text.contains("[URGENT] sk-001"));
        assert!(text.contains("app/agent.py:42"));
        assert!(text.contains("fix: Escape the input"));
        assert!(text.contains("match: exec(response)"));

        let calls = vec![ModelCall {
            provider: "ollama".to_string(),
            model: "llama3.1".to_string(),
            role: "judge".to_string(),
            parsed: Some(BTreeMap::from([(
                "verdict".to_string(),
                Value::String("block".to_string()),
            )])),
            prompt_tokens: Some(120),
            completion_tokens: Some(30),
            estimated_cost_usd: Some(0.00042),
            ..ModelCall::default()
        }];
        let text = plain_text(&model_call_lines(&calls));
        assert!(text.contains("ollama/llama3.1  role: judge  tokens 120/30  $0.0004"));
        assert!(text.contains("verdict: block"));
    }

    #[test]
    fn fleet_rows_show_pending_decision_and_age() {
        let now = Utc
            .with_ymd_and_hms(2026, 3, 1, 12, 0, 0)
            .single()
            .expect("now");
        let rows = vec![JobSummary {
            id: "abc123".to_string(),
            status: JobStatus::Done,
            decision: Some("manual_review".to_string()),
            created_at: Some("2026-03-01 11:55:00+00:00".to_string()),
            ruleset: None,
            ai_review: None,
        }];
        let text = plain_text(&fleet_lines(&rows, None, now));
        assert!(text.starts_with("abc123"));
        assert!(text.contains("done"));
        assert!(text.contains("manual review"));
        assert!(text.ends_with("5m"));
        assert_eq!(plain_text(&fleet_lines(&[], None, now)), NO_JOBS);
    }

    #[test]
    fn snippet_pane_states() {
        assert_eq!(plain_text(&snippet_entry_lines(&[], None)), NO_SNIPPETS);
        let browser = SnippetBrowser::new();
        assert_eq!(plain_text(&snippet_pane_lines(&browser)), PICK_SNIPPET);
    }
}
