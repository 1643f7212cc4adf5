mod ui;
mod widgets;

use std::io;
use std::time::{Duration, Instant};

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::debug;

use studytrack::config::Config;
use studytrack::db::Database;
use studytrack::models::{ScheduledTest, SubjectProgress, TestDetails, Tracker};
use studytrack::priority::test_details;
use studytrack::snapshot::{TrackerSnapshot, TrackerView};
use studytrack::time::Clock;

type AppResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Dashboard,
    Subjects,
    SubjectDetail,
    Tests,
}

impl View {
    fn next(&self) -> Self {
        match self {
            View::Dashboard => View::Subjects,
            View::Subjects => View::Tests,
            View::SubjectDetail => View::Subjects,
            View::Tests => View::Dashboard,
        }
    }

    fn prev(&self) -> Self {
        match self {
            View::Dashboard => View::Tests,
            View::Subjects => View::Dashboard,
            View::SubjectDetail => View::Subjects,
            View::Tests => View::Subjects,
        }
    }
}

pub struct StatefulList<T> {
    pub items: Vec<T>,
    pub selected: Option<usize>,
}

impl<T> StatefulList<T> {
    fn with_items(items: Vec<T>) -> Self {
        let selected = if items.is_empty() { None } else { Some(0) };
        Self { items, selected }
    }

    /// Swaps in fresh items, keeping the cursor where it was when possible.
    fn replace_items(&mut self, items: Vec<T>) {
        self.selected = match (self.selected, items.len()) {
            (_, 0) => None,
            (Some(i), len) => Some(i.min(len - 1)),
            (None, _) => Some(0),
        };
        self.items = items;
    }

    fn next(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let i = match self.selected {
            Some(i) if i + 1 < self.items.len() => i + 1,
            _ => 0,
        };
        self.selected = Some(i);
    }

    fn previous(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let i = match self.selected {
            Some(0) | None => self.items.len() - 1,
            Some(i) => i - 1,
        };
        self.selected = Some(i);
    }

    fn first(&mut self) {
        if !self.items.is_empty() {
            self.selected = Some(0);
        }
    }

    fn last(&mut self) {
        if !self.items.is_empty() {
            self.selected = Some(self.items.len() - 1);
        }
    }

    fn selected_item(&self) -> Option<&T> {
        self.selected.and_then(|i| self.items.get(i))
    }
}

/// One line of the subject checklist.
#[derive(Debug, Clone, PartialEq)]
pub enum ChecklistRow {
    Unit {
        name: String,
        completed: u32,
        total: u32,
        percentage: f64,
    },
    Topic {
        id: i64,
        name: String,
        completed: bool,
    },
}

pub struct App {
    db: Database,
    clock: Clock,
    pub tracker: Tracker,
    pub window_days: i64,
    refresh_every: Duration,
    last_recompute: Instant,
    pub snapshot: TrackerSnapshot,
    pub current: TrackerView,
    pub view: View,
    pub subjects: StatefulList<SubjectProgress>,
    pub open_subject: Option<i64>,
    pub checklist: StatefulList<ChecklistRow>,
    pub tests: StatefulList<ScheduledTest>,
    pub status: Option<String>,
    pub should_quit: bool,
}

impl App {
    pub fn new(db: Database, tracker: Tracker, config: &Config, clock: Clock) -> AppResult<Self> {
        let snapshot = db.fetch_snapshot(tracker.id)?;
        let current = snapshot.recompute(clock.now(), config.window_days);

        let mut app = Self {
            db,
            clock,
            tracker,
            window_days: config.window_days,
            refresh_every: config.refresh_interval(),
            last_recompute: Instant::now(),
            snapshot,
            current,
            view: View::Dashboard,
            subjects: StatefulList::with_items(Vec::new()),
            open_subject: None,
            checklist: StatefulList::with_items(Vec::new()),
            tests: StatefulList::with_items(Vec::new()),
            status: None,
            should_quit: false,
        };
        app.rebuild_lists();
        Ok(app)
    }

    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }

    /// Recomputes progress and countdowns from the in-memory snapshot.
    fn recompute(&mut self) {
        self.current = self.snapshot.recompute(self.clock.now(), self.window_days);
        self.last_recompute = Instant::now();
        self.rebuild_lists();
    }

    /// Called on every loop iteration; recomputes once the refresh interval
    /// has elapsed.
    fn tick(&mut self) {
        if self.last_recompute.elapsed() >= self.refresh_every {
            debug!("refreshing countdowns");
            self.recompute();
        }
    }

    /// Reloads everything from the database.
    pub fn reload(&mut self) -> AppResult<()> {
        if let Some(tracker) = self.db.get_tracker(self.tracker.id)? {
            self.tracker = tracker;
        }
        self.snapshot = self.db.fetch_snapshot(self.tracker.id)?;
        self.recompute();
        self.status = Some("Reloaded".to_string());
        Ok(())
    }

    fn rebuild_lists(&mut self) {
        self.subjects
            .replace_items(self.current.progress.subjects.clone());
        self.tests.replace_items(self.snapshot.tests.clone());

        if let Some(subject_id) = self.open_subject {
            let rows = self.checklist_rows(subject_id);
            self.checklist.replace_items(rows);
        }
    }

    fn checklist_rows(&self, subject_id: i64) -> Vec<ChecklistRow> {
        let Some(tree) = self
            .snapshot
            .tree
            .subjects
            .iter()
            .find(|s| s.subject.id == subject_id)
        else {
            return Vec::new();
        };
        let progress = self
            .current
            .progress
            .subjects
            .iter()
            .find(|s| s.subject_id == subject_id);

        let mut rows = Vec::new();
        for unit in &tree.units {
            let up = progress.and_then(|p| p.units.iter().find(|u| u.unit_id == unit.unit.id));
            rows.push(ChecklistRow::Unit {
                name: unit.unit.name.clone(),
                completed: up.map(|u| u.completed_topics).unwrap_or(0),
                total: up.map(|u| u.total_topics).unwrap_or(0),
                percentage: up.map(|u| u.percentage).unwrap_or(0.0),
            });
            for topic in &unit.topics {
                rows.push(ChecklistRow::Topic {
                    id: topic.id,
                    name: topic.name.clone(),
                    completed: topic.completed,
                });
            }
        }
        rows
    }

    pub fn open_subject_name(&self) -> Option<&str> {
        let id = self.open_subject?;
        self.current
            .progress
            .subjects
            .iter()
            .find(|s| s.subject_id == id)
            .map(|s| s.subject_name.as_str())
    }

    pub fn selected_test_details(&self) -> Option<TestDetails> {
        self.tests
            .selected_item()
            .map(|t| test_details(t, &self.snapshot.tree, self.clock.now()))
    }

    fn open_selected_subject(&mut self) {
        if let Some(subject) = self.subjects.selected_item() {
            let id = subject.subject_id;
            self.open_subject = Some(id);
            self.checklist = StatefulList::with_items(self.checklist_rows(id));
            // Land on the first topic rather than the unit header.
            if let Some(i) = self
                .checklist
                .items
                .iter()
                .position(|r| matches!(r, ChecklistRow::Topic { .. }))
            {
                self.checklist.selected = Some(i);
            }
            self.view = View::SubjectDetail;
        }
    }

    fn close_subject(&mut self) {
        self.open_subject = None;
        self.view = View::Subjects;
    }

    fn toggle_selected_topic(&mut self) -> AppResult<()> {
        let Some(ChecklistRow::Topic { id, .. }) = self.checklist.selected_item() else {
            return Ok(());
        };
        let id = *id;

        match self.db.toggle_topic(id)? {
            Some(completed) => {
                self.snapshot.set_topic_completed(id, completed);
                self.recompute();
            }
            None => {
                // Deleted from elsewhere; pick up the current state.
                self.reload()?;
            }
        }
        Ok(())
    }

    fn handle_key(&mut self, key: KeyCode, modifiers: KeyModifiers) -> AppResult<()> {
        self.status = None;

        match key {
            KeyCode::Char('q') => self.should_quit = true,

            KeyCode::Char('r') if modifiers.contains(KeyModifiers::CONTROL) => {
                self.reload()?;
            }

            KeyCode::Esc | KeyCode::Char('h') | KeyCode::Left
                if self.view == View::SubjectDetail =>
            {
                self.close_subject();
            }
            KeyCode::Char('h') | KeyCode::Left => self.view = self.view.prev(),

            KeyCode::Char('l') | KeyCode::Right | KeyCode::Enter
                if self.view == View::Subjects =>
            {
                self.open_selected_subject();
            }
            KeyCode::Char('l') | KeyCode::Right => self.view = self.view.next(),

            KeyCode::Tab => {
                if modifiers.contains(KeyModifiers::SHIFT) {
                    self.view = self.view.prev();
                } else {
                    self.view = self.view.next();
                }
            }
            KeyCode::BackTab => self.view = self.view.prev(),

            KeyCode::Char(' ') | KeyCode::Char('x') if self.view == View::SubjectDetail => {
                self.toggle_selected_topic()?;
            }

            KeyCode::Char('j') | KeyCode::Down => match self.view {
                View::Subjects => self.subjects.next(),
                View::SubjectDetail => self.checklist.next(),
                View::Tests => self.tests.next(),
                View::Dashboard => {}
            },
            KeyCode::Char('k') | KeyCode::Up => match self.view {
                View::Subjects => self.subjects.previous(),
                View::SubjectDetail => self.checklist.previous(),
                View::Tests => self.tests.previous(),
                View::Dashboard => {}
            },

            KeyCode::Char('g') => match self.view {
                View::Subjects => self.subjects.first(),
                View::SubjectDetail => self.checklist.first(),
                View::Tests => self.tests.first(),
                View::Dashboard => {}
            },
            KeyCode::Char('G') => match self.view {
                View::Subjects => self.subjects.last(),
                View::SubjectDetail => self.checklist.last(),
                View::Tests => self.tests.last(),
                View::Dashboard => {}
            },

            _ => {}
        }
        Ok(())
    }
}

pub fn run(db: Database, tracker: Tracker, config: &Config, clock: Clock) -> AppResult<()> {
    let mut app = App::new(db, tracker, config, clock)?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> AppResult<()> {
    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                app.handle_key(key.code, key.modifiers)?;
            }
        }

        if app.should_quit {
            return Ok(());
        }

        app.tick();
    }
}
