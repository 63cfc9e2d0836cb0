// Handles the rendering of widgets to the terminal frame.

use super::Mode;
use super::model::Mountpoint;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
};

/// Main render function called every frame.
pub fn render(
    f: &mut Frame,
    mounts: &[Mountpoint],
    list_state: &mut ListState,
    mode: &Mode,
    message: Option<&str>,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(3),
            Constraint::Length(3),
        ])
        .split(f.area());

    render_mount_list(f, chunks[0], mounts, list_state);
    render_message(f, chunks[1], message);
    render_footer(f, chunks[2], mode);

    if let Mode::ChoosePath { input } = mode {
        render_path_prompt(f, input);
    }
}

fn render_mount_list(f: &mut Frame, area: Rect, mounts: &[Mountpoint], state: &mut ListState) {
    let items: Vec<ListItem> = mounts
        .iter()
        .map(|mount| {
            let (status_symbol, color, run_state, enablement) = match mount.status {
                Some(status) => (
                    if status.active { "●" } else { "○" },
                    if status.active {
                        Color::Green
                    } else {
                        Color::DarkGray
                    },
                    status.run_state(),
                    status.enablement(),
                ),
                None => ("?", Color::Yellow, "?", "?"),
            };

            let content = Line::from(vec![
                Span::styled(status_symbol, Style::default().fg(color)),
                Span::raw(format!(" {:<40}", mount.path)),
                Span::styled(
                    format!("[{}/{}]", run_state, enablement),
                    Style::default().fg(Color::Gray),
                ),
            ]);

            ListItem::new(content)
        })
        .collect();

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(" Mountpoints "))
        .highlight_style(
            Style::default()
                .add_modifier(Modifier::BOLD)
                .bg(Color::DarkGray),
        )
        .highlight_symbol(">> ");

    f.render_stateful_widget(list, area, state);
}

fn render_message(f: &mut Frame, area: Rect, message: Option<&str>) {
    let paragraph = Paragraph::new(message.unwrap_or(""))
        .block(Block::default().borders(Borders::ALL).title(" Status "));

    f.render_widget(paragraph, area);
}

fn render_footer(f: &mut Frame, area: Rect, mode: &Mode) {
    let help_text = match mode {
        Mode::ChoosePath { .. } => Line::from(vec![
            Span::raw("Confirm: "),
            Span::styled("Enter ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw("| Cancel: "),
            Span::styled("Esc", Style::default().fg(Color::Red)),
        ]),
        Mode::Normal => Line::from(vec![
            Span::raw("Nav: "),
            Span::styled("j/k ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw("| New mountpoint: "),
            Span::styled("n ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw("| Action: "),
            Span::styled(
                "s(start) x(stop) e(enable) d(disable) ",
                Style::default().fg(Color::Cyan),
            ),
            Span::raw("| Refresh: "),
            Span::styled("r ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw("| Quit: "),
            Span::styled("q", Style::default().fg(Color::Red)),
        ]),
    };

    let paragraph =
        Paragraph::new(help_text).block(Block::default().borders(Borders::ALL).title(" Controls "));

    f.render_widget(paragraph, area);
}

fn render_path_prompt(f: &mut Frame, input: &str) {
    let area = centered_rect(70, f.area());

    f.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Select a mountpoint (directory path) ");

    let paragraph = Paragraph::new(format!("{input}_")).block(block);

    f.render_widget(paragraph, area);
}

fn centered_rect(percent_x: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(3),
            Constraint::Min(0),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
