use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs},
    Frame,
};

use super::widgets::{dashboard, subject_detail, subjects, test_list};
use super::{App, View};

pub fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Tab bar
            Constraint::Min(0),    // Content
            Constraint::Length(1), // Help bar
        ])
        .split(f.area());

    draw_tabs(f, app, chunks[0]);
    draw_content(f, app, chunks[1]);
    draw_help_bar(f, app, chunks[2]);
}

fn draw_tabs(f: &mut Frame, app: &App, area: Rect) {
    let tab_titles = vec!["Dashboard", "Subjects", "Tests"];
    let selected = match app.view {
        View::Dashboard => 0,
        View::Subjects | View::SubjectDetail => 1,
        View::Tests => 2,
    };

    let tabs = Tabs::new(tab_titles)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {} ", app.tracker.name)),
        )
        .select(selected)
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

    f.render_widget(tabs, area);
}

fn draw_content(f: &mut Frame, app: &App, area: Rect) {
    match app.view {
        View::Dashboard => dashboard::draw(f, app, area),
        View::Subjects => subjects::draw(f, app, area),
        View::SubjectDetail => subject_detail::draw(f, app, area),
        View::Tests => test_list::draw(f, app, area),
    }
}

fn key(k: &str) -> Span<'_> {
    Span::styled(k, Style::default().fg(Color::Cyan))
}

fn draw_help_bar(f: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![key("h/l"), Span::raw(" Views  ")];

    match app.view {
        View::Dashboard => {}
        View::Subjects => {
            spans.extend(vec![
                key("j/k"),
                Span::raw(" Nav  "),
                key("g/G"),
                Span::raw(" Top/Bot  "),
                key("l/<CR>"),
                Span::raw(" Open  "),
            ]);
        }
        View::SubjectDetail => {
            spans.extend(vec![
                key("j/k"),
                Span::raw(" Nav  "),
                key("<Space>"),
                Span::raw(" Toggle  "),
                key("h/<Esc>"),
                Span::raw(" Back  "),
            ]);
        }
        View::Tests => {
            spans.extend(vec![
                key("j/k"),
                Span::raw(" Nav  "),
                key("g/G"),
                Span::raw(" Top/Bot  "),
            ]);
        }
    }

    spans.extend(vec![
        key("^r"),
        Span::raw(" Reload  "),
        key("q"),
        Span::raw(" Quit"),
    ]);

    if let Some(status) = &app.status {
        spans.push(Span::styled(
            format!("  [{}]", status),
            Style::default().fg(Color::Green),
        ));
    }

    let help = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::DarkGray));

    f.render_widget(help, area);
}
