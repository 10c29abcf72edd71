use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use crate::app::{App, FocusPane, InputMode};
use crate::status::StatusLevel;

const BG: Color = Color::Rgb(9, 15, 25);
const PANEL: Color = Color::Rgb(16, 27, 44);
const ACCENT: Color = Color::Rgb(52, 211, 153);
const WARN: Color = Color::Rgb(251, 191, 36);
const ERROR: Color = Color::Rgb(248, 113, 113);
const PL_A: Color = Color::Rgb(17, 94, 89);
const PL_B: Color = Color::Rgb(30, 64, 175);
const PL_C: Color = Color::Rgb(55, 48, 163);
const MENU_WIDTH: u16 = 26;

pub fn render(frame: &mut Frame, app: &mut App) {
    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(6),
            Constraint::Length(1),
        ])
        .split(frame.area());

    render_header(frame, root[0], app);
    render_body(frame, root[1], app);
    render_footer(frame, root[2], app);

    if app.picker_mut().is_some() {
        let area = centered_rect(40, 60, frame.area());
        frame.render_widget(Clear, area);
        if let Some(picker) = app.picker_mut() {
            picker.draw(frame, area, true);
        }
    }

    if app.show_help() {
        render_help_modal(frame);
    }
}

fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let mut spans = Vec::new();
    push_powerline_segment(&mut spans, " kubedeck ", Color::Black, ACCENT, PL_A);
    push_powerline_segment(
        &mut spans,
        format!(" ctx {} ", compact_text(app.context(), 32)),
        Color::White,
        PL_A,
        PL_B,
    );
    push_powerline_segment(
        &mut spans,
        format!(" ns {} ", app.scope()),
        Color::White,
        PL_B,
        PL_C,
    );
    push_powerline_segment(
        &mut spans,
        format!(" {} ", app.resource().title()),
        Color::White,
        PL_C,
        BG,
    );
    spans.push(Span::styled(
        format!(" {}", display_cluster_endpoint(app.cluster())),
        Style::default().fg(Color::Gray).bg(BG),
    ));
    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().bg(BG).fg(Color::White)),
        area,
    );
}

fn render_body(frame: &mut Frame, area: Rect, app: &mut App) {
    let menu_width = MENU_WIDTH.min(area.width / 3);
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(menu_width), Constraint::Min(1)])
        .split(area);

    let focus = app.focus();
    app.menu_mut()
        .draw(frame, chunks[0], focus == FocusPane::Menu);
    app.table_mut()
        .draw(frame, chunks[1], focus == FocusPane::Table);
}

fn render_footer(frame: &mut Frame, area: Rect, app: &App) {
    let mut spans = Vec::new();
    if app.mode() == InputMode::Confirm {
        let prompt = app.confirm_prompt().unwrap_or_default();
        push_powerline_segment(
            &mut spans,
            format!(" ? {} ", compact_text(prompt, area.width.saturating_sub(6) as usize)),
            Color::Black,
            WARN,
            BG,
        );
        frame.render_widget(
            Paragraph::new(Line::from(spans)).style(Style::default().bg(BG)),
            area,
        );
        return;
    }

    let (label, fg, bg) = match app.status().map(|status| status.level) {
        Some(StatusLevel::Error) => (" err ", Color::Black, ERROR),
        Some(StatusLevel::Prompt) => (" ask ", Color::Black, WARN),
        _ => (" nrm ", Color::White, PL_A),
    };
    push_powerline_segment(&mut spans, label, fg, bg, PL_B);

    let message = app
        .status()
        .map(|status| {
            let first_line = status.message.lines().next().unwrap_or_default();
            format!("{} {first_line}", status.at.format("%H:%M:%S"))
        })
        .unwrap_or_else(|| "ready".to_string());
    let updated = app
        .table()
        .store()
        .last_update()
        .map(|at| format!(" updated {}", at.format("%H:%M:%S")))
        .unwrap_or_default();
    let hint = format!("{updated}  ? help  m actions  ^R refresh  ^N namespace  q quit");
    let budget = (area.width as usize).saturating_sub(hint.chars().count() + 10);
    push_powerline_segment(
        &mut spans,
        format!(" {} ", compact_text(&message, budget.max(12))),
        Color::White,
        PL_B,
        BG,
    );
    spans.push(Span::styled(hint, Style::default().fg(Color::Gray).bg(BG)));

    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().bg(BG)),
        area,
    );
}

fn render_help_modal(frame: &mut Frame) {
    let area = centered_rect(70, 70, frame.area());
    frame.render_widget(Clear, area);

    let lines = HELP_LINES
        .iter()
        .map(|(keys, text)| {
            Line::from(vec![
                Span::styled(
                    format!("{keys:<18}"),
                    Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
                ),
                Span::raw(*text),
            ])
        })
        .collect::<Vec<_>>();

    let modal = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .title("Help")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(ACCENT))
                .style(Style::default().bg(PANEL)),
        )
        .style(Style::default().fg(Color::White));

    frame.render_widget(modal, area);
}

const HELP_LINES: &[(&str, &str)] = &[
    ("j k / arrows", "move the cursor"),
    ("PgUp PgDn ^U ^D", "move by a page"),
    ("g G / Home End", "first / last row"),
    ("Enter", "open the resource under the menu cursor"),
    ("Tab", "switch between menu and table"),
    ("d", "describe the selected row in the pager"),
    ("e", "edit the selected row"),
    ("c", "copy the selected name"),
    ("Delete", "delete the selected row (asks first)"),
    ("l / L", "pod logs / previous logs in the pager"),
    ("x", "shell inside the selected pod"),
    ("m / F9", "open the row action menu"),
    ("^N / F2", "pick a namespace"),
    ("^R / F5", "reload the current table"),
    ("Esc", "close popups"),
    ("q / ^C", "quit"),
];

fn push_powerline_segment(
    spans: &mut Vec<Span<'static>>,
    content: impl Into<String>,
    fg: Color,
    bg: Color,
    next_bg: Color,
) {
    spans.push(Span::styled(
        content.into(),
        Style::default().fg(fg).bg(bg).add_modifier(Modifier::BOLD),
    ));
    spans.push(Span::styled("", Style::default().fg(bg).bg(next_bg)));
}

fn compact_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }

    if max_chars <= 1 {
        return "…".to_string();
    }

    let mut out = value
        .chars()
        .take(max_chars.saturating_sub(1))
        .collect::<String>();
    out.push('…');
    out
}

fn display_cluster_endpoint(cluster: &str) -> String {
    let trimmed = cluster.trim().trim_end_matches('/');
    trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed)
        .to_string()
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
