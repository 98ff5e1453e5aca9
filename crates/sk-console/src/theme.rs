use ratatui::style::{Color, Modifier, Style};
use sk_core::{Decision, JobStatus, Severity};

#[derive(Clone, Copy)]
pub struct Theme {
    pub surface: Color,
    pub border: Color,
    pub title: Color,
    pub text: Color,
    pub muted: Color,
    pub accent: Color,
    pub ok: Color,
    pub warn: Color,
    pub critical: Color,
    pub info: Color,
}

pub const THEME: Theme = Theme {
    surface: Color::Rgb(17, 26, 46),
    border: Color::Rgb(71, 85, 105),
    title: Color::Rgb(191, 219, 254),
    text: Color::Rgb(226, 232, 240),
    muted: Color::Rgb(148, 163, 184),
    accent: Color::Rgb(56, 189, 248),
    ok: Color::Rgb(34, 197, 94),
    warn: Color::Rgb(245, 158, 11),
    critical: Color::Rgb(239, 68, 68),
    info: Color::Rgb(59, 130, 246),
};

pub const SELECTED_STYLE: Style = Style::new()
    .bg(Color::Rgb(131, 165, 152))
    .fg(Color::Black)
    .add_modifier(Modifier::BOLD);

pub fn section_style() -> Style {
    Style::new().fg(THEME.accent).add_modifier(Modifier::BOLD)
}

pub fn muted_style() -> Style {
    Style::new().fg(THEME.muted)
}

pub fn error_style() -> Style {
    Style::new().fg(THEME.critical).add_modifier(Modifier::BOLD)
}

pub fn severity_color(severity: Option<Severity>) -> Color {
    match severity {
        Some(Severity::Critical) => THEME.critical,
        Some(Severity::High) => Color::Rgb(254, 128, 25),
        Some(Severity::Medium) => THEME.warn,
        Some(Severity::Low) => THEME.info,
        None => THEME.muted,
    }
}

pub fn decision_color(decision: Option<Decision>) -> Color {
    match decision {
        Some(Decision::Block) => THEME.critical,
        Some(Decision::ManualReview) => THEME.warn,
        Some(Decision::Allow) => THEME.ok,
        None => THEME.muted,
    }
}

pub fn status_color(status: &JobStatus) -> Color {
    match status {
        JobStatus::Done => THEME.ok,
        JobStatus::Failed => THEME.critical,
        JobStatus::Running | JobStatus::Scanning | JobStatus::Judging => THEME.accent,
        JobStatus::Queued | JobStatus::Other(_) => THEME.muted,
    }
}
