use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use super::{progress_bar, progress_color, truncate};
use crate::tui::App;

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .subjects
        .items
        .iter()
        .map(|s| {
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:<30}", truncate(&s.subject_name, 28)),
                    Style::default().fg(Color::White),
                ),
                Span::styled(
                    progress_bar(s.percentage, 20),
                    Style::default().fg(progress_color(s.percentage)),
                ),
                Span::styled(
                    format!(" {:>5.1}% ", s.percentage),
                    Style::default().fg(Color::Yellow),
                ),
                Span::styled(
                    format!("{:>3}/{:<3}", s.completed_topics, s.total_topics),
                    Style::default().fg(Color::Gray),
                ),
                Span::styled(
                    format!("  {} units", s.units.len()),
                    Style::default().fg(Color::DarkGray),
                ),
            ]))
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Subjects ")
        .title_style(Style::default().fg(Color::Cyan));

    let header_style = Style::default()
        .fg(Color::DarkGray)
        .add_modifier(Modifier::BOLD);
    let header = Line::from(vec![
        Span::styled(format!("  {:<30}", "Name"), header_style),
        Span::styled(format!("{:<28}", "Progress"), header_style),
        Span::styled("Topics", header_style),
    ]);

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let mut state = ListState::default();
    state.select(app.subjects.selected);

    let header_area = Rect {
        x: area.x + 1,
        y: area.y + 1,
        width: area.width.saturating_sub(2),
        height: 1,
    };
    f.render_widget(Paragraph::new(header), header_area);

    let list_area = Rect {
        x: area.x,
        y: area.y + 1,
        width: area.width,
        height: area.height.saturating_sub(1),
    };

    f.render_stateful_widget(list, list_area, &mut state);
}
