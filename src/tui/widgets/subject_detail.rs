use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use super::{progress_bar, progress_color};
use crate::tui::{App, ChecklistRow};

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let title = match app.open_subject_name() {
        Some(name) => format!(" {} ", name),
        None => " Subject ".to_string(),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .title_style(Style::default().fg(Color::Cyan));

    if app.checklist.items.is_empty() {
        let paragraph = Paragraph::new("No units in this subject yet.")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        f.render_widget(paragraph, area);
        return;
    }

    let items: Vec<ListItem> = app.checklist.items.iter().map(row_item).collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let mut state = ListState::default();
    state.select(app.checklist.selected);

    f.render_stateful_widget(list, area, &mut state);
}

fn row_item(row: &ChecklistRow) -> ListItem<'_> {
    match row {
        ChecklistRow::Unit {
            name,
            completed,
            total,
            percentage,
        } => ListItem::new(Line::from(vec![
            Span::styled(
                format!("{:<32}", name),
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                progress_bar(*percentage, 12),
                Style::default().fg(progress_color(*percentage)),
            ),
            Span::styled(
                format!(" {}/{}", completed, total),
                Style::default().fg(Color::Gray),
            ),
        ])),
        ChecklistRow::Topic {
            name, completed, ..
        } => {
            let (mark, style) = if *completed {
                ("[x] ", Style::default().fg(Color::Green))
            } else {
                ("[ ] ", Style::default().fg(Color::White))
            };
            ListItem::new(Line::from(vec![
                Span::raw("    "),
                Span::styled(mark, style),
                Span::styled(name.as_str(), style),
            ]))
        }
    }
}
