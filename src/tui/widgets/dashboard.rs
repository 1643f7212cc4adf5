use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, List, ListItem, Paragraph},
    Frame,
};

use super::{format_when, progress_bar, progress_color, truncate, urgency_color};
use crate::tui::App;

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Overall gauge
            Constraint::Length(9), // Summary + subjects row
            Constraint::Min(0),    // Priority feed
        ])
        .split(area);

    let middle = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(chunks[1]);

    draw_gauge(f, app, chunks[0]);
    draw_summary(f, app, middle[0]);
    draw_subjects(f, app, middle[1]);
    draw_priority(f, app, chunks[2]);
}

fn draw_gauge(f: &mut Frame, app: &App, area: Rect) {
    let progress = &app.current.progress;
    let gauge = Gauge::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Overall Progress ")
                .title_style(Style::default().fg(Color::Cyan)),
        )
        .gauge_style(Style::default().fg(progress_color(progress.percentage)))
        .ratio((progress.percentage / 100.0).clamp(0.0, 1.0))
        .label(format!(
            "{}/{} topics ({:.1}%)",
            progress.completed_topics, progress.total_topics, progress.percentage
        ));

    f.render_widget(gauge, area);
}

fn stat_line<'a>(label: &'a str, value: String, color: Color) -> Line<'a> {
    Line::from(vec![
        Span::styled(label, Style::default().fg(Color::Gray)),
        Span::styled(value, Style::default().fg(color)),
    ])
}

fn draw_summary(f: &mut Frame, app: &App, area: Rect) {
    let tracker = &app.tracker;
    let critical = app
        .current
        .priority_tests
        .iter()
        .filter(|p| p.days_remaining <= 1)
        .count();

    let text = vec![
        stat_line("Subjects: ", tracker.total_subjects.to_string(), Color::White),
        stat_line("Units: ", tracker.total_units.to_string(), Color::White),
        stat_line("Topics: ", tracker.total_topics.to_string(), Color::White),
        stat_line(
            "Tests scheduled: ",
            app.snapshot.tests.len().to_string(),
            Color::White,
        ),
        stat_line(
            "Due soon: ",
            app.current.priority_tests.len().to_string(),
            if critical > 0 { Color::Red } else { Color::Yellow },
        ),
        stat_line(
            "Updated: ",
            format_when(app.current.computed_at),
            Color::DarkGray,
        ),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Tracker ")
        .title_style(Style::default().fg(Color::Cyan));

    f.render_widget(Paragraph::new(text).block(block), area);
}

fn draw_subjects(f: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .current
        .progress
        .subjects
        .iter()
        .map(|s| {
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:<20}", truncate(&s.subject_name, 18)),
                    Style::default().fg(Color::White),
                ),
                Span::styled(
                    progress_bar(s.percentage, 10),
                    Style::default().fg(progress_color(s.percentage)),
                ),
                Span::styled(
                    format!(" {:>5.1}%", s.percentage),
                    Style::default().fg(Color::Gray),
                ),
            ]))
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Subjects ")
        .title_style(Style::default().fg(Color::Green));

    f.render_widget(List::new(items).block(block), area);
}

fn draw_priority(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" Upcoming (next {} days) ", app.window_days))
        .title_style(Style::default().fg(Color::Yellow));

    if app.current.priority_tests.is_empty() {
        let paragraph = Paragraph::new("Nothing due. Enjoy the calm.")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        f.render_widget(paragraph, area);
        return;
    }

    let items: Vec<ListItem> = app
        .current
        .priority_tests
        .iter()
        .map(|p| {
            let color = urgency_color(p.urgency);
            let mut lines = vec![Line::from(vec![
                Span::styled(
                    format!("{:<14}", p.time_remaining),
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!("{:<26}", truncate(&p.test.name, 24)),
                    Style::default().fg(Color::White),
                ),
                Span::styled(
                    format!("{:<15}", p.test.test_type.label()),
                    Style::default().fg(Color::Cyan),
                ),
                Span::styled(format_when(p.test.scheduled_at), Style::default().fg(Color::Gray)),
            ])];

            if !p.covered_topics.is_empty() {
                lines.push(Line::from(Span::styled(
                    format!("  covers: {}", p.covered_topics.join(", ")),
                    Style::default().fg(Color::DarkGray),
                )));
            }
            ListItem::new(lines)
        })
        .collect();

    f.render_widget(List::new(items).block(block), area);
}
