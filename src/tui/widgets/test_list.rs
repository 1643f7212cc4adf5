use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use studytrack::models::Urgency;
use studytrack::priority::{days_remaining, format_countdown};

use super::{format_when, truncate, urgency_color};
use crate::tui::App;

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    draw_list(f, app, chunks[0]);
    draw_details(f, app, chunks[1]);
}

fn draw_list(f: &mut Frame, app: &App, area: Rect) {
    let now = app.now();
    let items: Vec<ListItem> = app
        .tests
        .items
        .iter()
        .map(|scheduled| {
            let test = &scheduled.test;
            let passed = test.scheduled_at <= now;
            let countdown_style = if passed {
                Style::default().fg(Color::DarkGray)
            } else {
                let days = days_remaining(test.scheduled_at, now);
                Style::default().fg(urgency_color(Urgency::from_days_remaining(days)))
            };
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:<24}", truncate(&test.name, 22)),
                    Style::default().fg(Color::White),
                ),
                Span::styled(
                    format!("{:<15}", test.test_type.label()),
                    Style::default().fg(Color::Cyan),
                ),
                Span::styled(
                    format!("{:<18}", format_when(test.scheduled_at)),
                    Style::default().fg(Color::Gray),
                ),
                Span::styled(format_countdown(test.scheduled_at, now), countdown_style),
            ]))
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" Tests ({}) ", app.tests.items.len()))
        .title_style(Style::default().fg(Color::Cyan));

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let mut state = ListState::default();
    state.select(app.tests.selected);

    f.render_stateful_widget(list, area, &mut state);
}

fn draw_details(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Details ")
        .title_style(Style::default().fg(Color::Yellow));

    let Some(details) = app.selected_test_details() else {
        let paragraph = Paragraph::new("No tests scheduled.")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        f.render_widget(paragraph, area);
        return;
    };

    let label = Style::default().fg(Color::Gray);
    let mut lines = vec![
        Line::from(Span::styled(
            details.test.name.clone(),
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("Type: ", label),
            Span::raw(details.test.test_type.label()),
        ]),
        Line::from(vec![
            Span::styled("When: ", label),
            Span::raw(format_when(details.test.scheduled_at)),
        ]),
        Line::from(vec![
            Span::styled("Countdown: ", label),
            Span::styled(
                details.time_remaining.clone(),
                Style::default().fg(Color::Yellow),
            ),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            format!("Covers ({})", details.covered_topics.len()),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )),
    ];

    if details.covered_topics.is_empty() {
        lines.push(Line::from(Span::styled(
            "  nothing linked",
            Style::default().fg(Color::DarkGray),
        )));
    }
    for topic in details.covered_topics {
        lines.push(Line::from(format!("  - {}", topic)));
    }

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false });
    f.render_widget(paragraph, area);
}
