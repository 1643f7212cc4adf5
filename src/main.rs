mod tui;

use chrono::{DateTime, Local, NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::io::{self, Read};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use studytrack::config::{load_config_from, Config};
use studytrack::db::Database;
use studytrack::models::{
    CoverageTarget, JsonOutput, PriorityTest, Test, TestType, Tracker, TrackerProgress,
    TrackerTree, Urgency,
};
use studytrack::priority::{exam_instant, format_countdown, test_details};
use studytrack::syllabus::{ParsedSyllabus, SyllabusExport};
use studytrack::time::Clock;
use studytrack::Error;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "studytrack")]
#[command(about = "Track syllabus completion and count down to upcoming tests")]
#[command(version)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Config file (default: ./studytrack.toml, then the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Manage semesters
    #[command(subcommand)]
    Semester(SemesterCommands),

    /// Manage trackers
    #[command(subcommand)]
    Tracker(TrackerCommands),

    /// Manage subjects
    #[command(subcommand)]
    Subject(SubjectCommands),

    /// Manage units
    #[command(subcommand)]
    Unit(UnitCommands),

    /// Manage topics
    #[command(subcommand)]
    Topic(TopicCommands),

    /// Manage scheduled tests
    #[command(subcommand)]
    Test(TestCommands),

    /// Show upcoming tests inside the priority window
    Priority {
        /// Tracker ID (default: most recent tracker)
        tracker: Option<i64>,

        /// Window in days (default from config)
        #[arg(long, short)]
        window: Option<i64>,
    },

    /// Launch interactive terminal UI
    Tui {
        /// Tracker ID (default: most recent tracker)
        #[arg(long, short)]
        tracker: Option<i64>,
    },
}

#[derive(Subcommand)]
enum SemesterCommands {
    /// Add a semester
    Add {
        /// Semester name
        name: String,
    },

    /// List semesters, newest first
    List,

    /// Delete a semester and everything in it
    Delete {
        /// Semester ID
        id: i64,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
enum ExportFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum TrackerCommands {
    /// Create a tracker from syllabus text (file or stdin)
    Create {
        /// Semester ID
        #[arg(long, short)]
        semester: i64,

        /// Tracker name
        #[arg(long, short)]
        name: String,

        /// Tracker description
        #[arg(long, short)]
        description: Option<String>,

        /// Display color
        #[arg(long)]
        color: Option<String>,

        /// Syllabus file, one `Subject >>> Unit >>> topics` per line
        #[arg(long, short)]
        file: Option<PathBuf>,

        /// Create without a syllabus
        #[arg(long, conflicts_with = "file")]
        empty: bool,
    },

    /// List trackers
    List {
        /// Only trackers of this semester
        #[arg(long, short)]
        semester: Option<i64>,
    },

    /// Show a tracker's progress tree
    Show {
        /// Tracker ID (default: most recent tracker)
        id: Option<i64>,
    },

    /// Delete a tracker
    Delete {
        /// Tracker ID
        id: i64,
    },

    /// Export a tracker's syllabus
    Export {
        /// Tracker ID
        id: i64,

        /// Output format
        #[arg(long, short, value_enum, default_value_t = ExportFormat::Text)]
        format: ExportFormat,

        /// Write to a file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Import a tracker from a JSON export
    Import {
        /// Semester ID
        #[arg(long, short)]
        semester: i64,

        /// JSON export file
        file: PathBuf,
    },
}

#[derive(Subcommand)]
enum SubjectCommands {
    /// Add a subject
    Add {
        /// Tracker ID
        #[arg(long, short)]
        tracker: i64,

        /// Subject name
        name: String,
    },

    /// Rename a subject
    Rename {
        /// Subject ID
        id: i64,

        /// New name
        name: String,
    },

    /// Delete a subject with its units and topics
    Delete {
        /// Subject ID
        id: i64,
    },
}

#[derive(Subcommand)]
enum UnitCommands {
    /// Add a unit at the end of a subject
    Add {
        /// Subject ID
        #[arg(long, short)]
        subject: i64,

        /// Unit name
        name: String,
    },

    /// Rename a unit
    Rename {
        /// Unit ID
        id: i64,

        /// New name
        name: String,
    },

    /// Delete a unit with its topics
    Delete {
        /// Unit ID
        id: i64,
    },
}

#[derive(Subcommand)]
enum TopicCommands {
    /// Add a topic at the end of a unit
    Add {
        /// Unit ID
        #[arg(long, short)]
        unit: i64,

        /// Topic name
        name: String,
    },

    /// Rename a topic
    Rename {
        /// Topic ID
        id: i64,

        /// New name
        name: String,
    },

    /// Delete a topic
    Delete {
        /// Topic ID
        id: i64,
    },

    /// Flip a topic between done and not done
    Toggle {
        /// Topic ID
        id: i64,
    },

    /// Mark a topic done
    Done {
        /// Topic ID
        id: i64,

        /// Mark as not done instead
        #[arg(long)]
        undo: bool,
    },
}

#[derive(Subcommand)]
enum TestCommands {
    /// Schedule a test
    Schedule {
        /// Tracker ID
        #[arg(long)]
        tracker: i64,

        /// Test name
        #[arg(long, short)]
        name: String,

        /// Test type: lab_practical/class_test/isa/esa
        #[arg(long = "type", short)]
        test_type: String,

        /// Date (YYYY-MM-DD); the time is the configured exam hour
        #[arg(long, short)]
        date: String,

        /// Unit covered by the test (repeatable)
        #[arg(long = "unit")]
        units: Vec<i64>,

        /// Topic covered by the test (repeatable)
        #[arg(long = "topic")]
        topics: Vec<i64>,
    },

    /// List all tests of a tracker, soonest first
    List {
        /// Tracker ID (default: most recent tracker)
        #[arg(long)]
        tracker: Option<i64>,
    },

    /// Show a test with its coverage
    Show {
        /// Test ID
        id: i64,
    },

    /// Delete a test
    Delete {
        /// Test ID
        id: i64,
    },
}

fn init_logging(verbose: bool, config: &Config) {
    let default = if verbose {
        "studytrack=debug"
    } else {
        config.log_filter.as_deref().unwrap_or("studytrack=warn")
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    let json = cli.json;

    if let Err(e) = run(cli) {
        if json {
            println!(
                "{}",
                serde_json::to_string(&JsonOutput::<()>::err(e.to_string())).unwrap_or_default()
            );
        } else {
            eprintln!("Error: {}", e);
        }
        std::process::exit(1);
    }
}

fn print_json<T: Serialize>(data: T) -> CliResult<()> {
    println!("{}", serde_json::to_string(&JsonOutput::ok(data))?);
    Ok(())
}

fn run(cli: Cli) -> CliResult<()> {
    let config = load_config_from(cli.config.as_deref())?;
    init_logging(cli.verbose, &config);

    let db_path = config.database_path();
    let db = Database::open(&db_path)?;
    let clock = Clock::System;

    if !matches!(cli.command, Commands::Init) {
        db.init()?;
    }

    match cli.command {
        Commands::Init => {
            db.init()?;
            if cli.json {
                print_json(serde_json::json!({ "path": db_path }))?;
            } else {
                println!("Database initialized at: {}", db_path.display());
            }
        }

        Commands::Semester(cmd) => match cmd {
            SemesterCommands::Add { name } => {
                let id = db.create_semester(&name)?;
                if cli.json {
                    print_json(serde_json::json!({ "id": id, "name": name.trim() }))?;
                } else {
                    println!("Added semester '{}' with ID: {}", name.trim(), id);
                }
            }

            SemesterCommands::List => {
                let semesters = db.list_semesters()?;
                if cli.json {
                    print_json(&semesters)?;
                } else if semesters.is_empty() {
                    println!("No semesters yet. Add one with: studytrack semester add <name>");
                } else {
                    println!("{:<5} {:<30} CREATED", "ID", "NAME");
                    println!("{}", "-".repeat(60));
                    for s in semesters {
                        println!("{:<5} {:<30} {}", s.id, truncate(&s.name, 28), s.created_at);
                    }
                }
            }

            SemesterCommands::Delete { id } => {
                if !db.delete_semester(id)? {
                    return Err(Error::not_found("semester", id).into());
                }
                if cli.json {
                    print_json(())?;
                } else {
                    println!("Semester {} deleted.", id);
                }
            }
        },

        Commands::Tracker(cmd) => match cmd {
            TrackerCommands::Create {
                semester,
                name,
                description,
                color,
                file,
                empty,
            } => {
                let (id, parsed) = if empty {
                    let id = db.create_tracker(
                        semester,
                        &name,
                        description.as_deref(),
                        color.as_deref(),
                    )?;
                    (id, ParsedSyllabus::default())
                } else {
                    let text = match file {
                        Some(path) => std::fs::read_to_string(path)?,
                        None => {
                            let mut buf = String::new();
                            io::stdin().read_to_string(&mut buf)?;
                            buf
                        }
                    };
                    db.create_tracker_from_text(
                        semester,
                        &name,
                        description.as_deref(),
                        color.as_deref(),
                        &text,
                    )?
                };

                let tracker = db
                    .get_tracker(id)?
                    .ok_or_else(|| Error::not_found("tracker", id))?;

                if cli.json {
                    print_json(
                        serde_json::json!({ "tracker": tracker, "skipped": parsed.issues }),
                    )?;
                } else {
                    println!(
                        "Created tracker '{}' with ID: {} ({} subjects, {} units, {} topics)",
                        tracker.name,
                        tracker.id,
                        parsed.subjects.len(),
                        parsed.unit_count(),
                        parsed.topic_count()
                    );
                    for issue in &parsed.issues {
                        println!("  skipped {}", issue);
                    }
                }
            }

            TrackerCommands::List { semester } => {
                let trackers = match semester {
                    Some(id) => db.list_trackers(id)?,
                    None => {
                        let mut all = Vec::new();
                        for s in db.list_semesters()? {
                            all.extend(db.list_trackers(s.id)?);
                        }
                        all
                    }
                };

                if cli.json {
                    print_json(&trackers)?;
                } else if trackers.is_empty() {
                    println!("No trackers found.");
                } else {
                    println!(
                        "{:<5} {:<5} {:<30} {:>8} {:>6} {:>7}",
                        "ID", "SEM", "NAME", "SUBJECTS", "UNITS", "TOPICS"
                    );
                    println!("{}", "-".repeat(68));
                    for t in trackers {
                        println!(
                            "{:<5} {:<5} {:<30} {:>8} {:>6} {:>7}",
                            t.id,
                            t.semester_id,
                            truncate(&t.name, 28),
                            t.total_subjects,
                            t.total_units,
                            t.total_topics
                        );
                    }
                }
            }

            TrackerCommands::Show { id } => {
                let tracker = resolve_tracker(&db, id)?;
                let snapshot = db.fetch_snapshot(tracker.id)?;
                let view = snapshot.recompute(clock.now(), config.window_days);

                if cli.json {
                    print_json(serde_json::json!({
                        "tracker": tracker,
                        "tree": snapshot.tree,
                        "progress": view.progress,
                    }))?;
                } else {
                    print_progress_tree(&tracker, &snapshot.tree, &view.progress);
                }
            }

            TrackerCommands::Delete { id } => {
                if !db.delete_tracker(id)? {
                    return Err(Error::not_found("tracker", id).into());
                }
                if cli.json {
                    print_json(())?;
                } else {
                    println!("Tracker {} deleted.", id);
                }
            }

            TrackerCommands::Export { id, format, output } => {
                let body = match format {
                    ExportFormat::Text => db.export_tracker_text(id)?,
                    ExportFormat::Json => serde_json::to_string_pretty(&db.export_tracker(id)?)?,
                };

                match output {
                    Some(path) => {
                        std::fs::write(&path, &body)?;
                        if cli.json {
                            print_json(serde_json::json!({ "path": path }))?;
                        } else {
                            println!("Exported tracker {} to {}", id, path.display());
                        }
                    }
                    None if cli.json => {
                        print_json(serde_json::json!({ "format": format, "content": body }))?;
                    }
                    None => println!("{}", body),
                }
            }

            TrackerCommands::Import { semester, file } => {
                let content = std::fs::read_to_string(&file)?;
                let export: SyllabusExport = serde_json::from_str(&content)?;
                let id = db.import_tracker(semester, &export)?;
                if cli.json {
                    print_json(serde_json::json!({ "id": id, "name": export.name }))?;
                } else {
                    println!("Imported tracker '{}' with ID: {}", export.name, id);
                }
            }
        },

        Commands::Subject(cmd) => match cmd {
            SubjectCommands::Add { tracker, name } => {
                let id = db.add_subject(tracker, &name)?;
                report_created(cli.json, "subject", id, &name)?;
            }
            SubjectCommands::Rename { id, name } => {
                if !db.rename_subject(id, &name)? {
                    return Err(Error::not_found("subject", id).into());
                }
                report_done(cli.json, format!("Subject {} renamed.", id))?;
            }
            SubjectCommands::Delete { id } => {
                if !db.delete_subject(id)? {
                    return Err(Error::not_found("subject", id).into());
                }
                report_done(cli.json, format!("Subject {} deleted.", id))?;
            }
        },

        Commands::Unit(cmd) => match cmd {
            UnitCommands::Add { subject, name } => {
                let id = db.add_unit(subject, &name)?;
                report_created(cli.json, "unit", id, &name)?;
            }
            UnitCommands::Rename { id, name } => {
                if !db.rename_unit(id, &name)? {
                    return Err(Error::not_found("unit", id).into());
                }
                report_done(cli.json, format!("Unit {} renamed.", id))?;
            }
            UnitCommands::Delete { id } => {
                if !db.delete_unit(id)? {
                    return Err(Error::not_found("unit", id).into());
                }
                report_done(cli.json, format!("Unit {} deleted.", id))?;
            }
        },

        Commands::Topic(cmd) => match cmd {
            TopicCommands::Add { unit, name } => {
                let id = db.add_topic(unit, &name)?;
                report_created(cli.json, "topic", id, &name)?;
            }

            TopicCommands::Rename { id, name } => {
                if !db.rename_topic(id, &name)? {
                    return Err(Error::not_found("topic", id).into());
                }
                report_done(cli.json, format!("Topic {} renamed.", id))?;
            }

            TopicCommands::Delete { id } => {
                if !db.delete_topic(id)? {
                    return Err(Error::not_found("topic", id).into());
                }
                report_done(cli.json, format!("Topic {} deleted.", id))?;
            }

            TopicCommands::Toggle { id } => {
                let completed = db
                    .toggle_topic(id)?
                    .ok_or_else(|| Error::not_found("topic", id))?;
                if cli.json {
                    print_json(serde_json::json!({ "id": id, "completed": completed }))?;
                } else {
                    println!(
                        "Topic {} marked {}.",
                        id,
                        if completed { "done" } else { "not done" }
                    );
                }
            }

            TopicCommands::Done { id, undo } => {
                if !db.set_topic_completed(id, !undo)? {
                    return Err(Error::not_found("topic", id).into());
                }
                if cli.json {
                    print_json(serde_json::json!({ "id": id, "completed": !undo }))?;
                } else {
                    println!(
                        "Topic {} marked {}.",
                        id,
                        if undo { "not done" } else { "done" }
                    );
                }
            }
        },

        Commands::Test(cmd) => match cmd {
            TestCommands::Schedule {
                tracker,
                name,
                test_type,
                date,
                units,
                topics,
            } => {
                let kind = TestType::from_str(&test_type)
                    .ok_or_else(|| Error::InvalidTestType(test_type.clone()))?;
                let scheduled_at = scheduled_instant(&date, config.exam_hour)?;

                let targets: Vec<CoverageTarget> = units
                    .into_iter()
                    .map(CoverageTarget::Unit)
                    .chain(topics.into_iter().map(CoverageTarget::Topic))
                    .collect();

                let id = db.schedule_test(tracker, &name, kind, scheduled_at, &targets)?;

                if cli.json {
                    print_json(serde_json::json!({
                        "id": id,
                        "name": name,
                        "scheduled_at": scheduled_at,
                    }))?;
                } else {
                    println!(
                        "Scheduled {} '{}' with ID: {} for {} ({})",
                        kind.label(),
                        name,
                        id,
                        format_local(scheduled_at),
                        format_countdown(scheduled_at, clock.now())
                    );
                }
            }

            TestCommands::List { tracker } => {
                let tracker = resolve_tracker(&db, tracker)?;
                let tests = db.fetch_tests(tracker.id)?;
                let now = clock.now();

                if cli.json {
                    print_json(&tests)?;
                } else if tests.is_empty() {
                    println!("No tests scheduled for '{}'.", tracker.name);
                } else {
                    print_test_header();
                    for test in &tests {
                        print_test_row(test, now);
                    }
                }
            }

            TestCommands::Show { id } => {
                let scheduled = db
                    .get_scheduled_test(id)?
                    .ok_or_else(|| Error::not_found("test", id))?;
                let tree = db.fetch_tracker_tree(scheduled.test.tracker_id)?;
                let details = test_details(&scheduled, &tree, clock.now());

                if cli.json {
                    print_json(&details)?;
                } else {
                    let test = &details.test;
                    println!("Test: {}", test.name);
                    println!("ID: {}", test.id);
                    println!("Type: {}", test.test_type.label());
                    println!("When: {}", format_local(test.scheduled_at));
                    println!("Countdown: {}", details.time_remaining);
                    println!();
                    println!("--- Covers ---");
                    if details.covered_topics.is_empty() {
                        println!("(no topics)");
                    }
                    for topic in &details.covered_topics {
                        println!("  - {}", topic);
                    }
                }
            }

            TestCommands::Delete { id } => {
                if !db.delete_test(id)? {
                    return Err(Error::not_found("test", id).into());
                }
                report_done(cli.json, format!("Test {} deleted.", id))?;
            }
        },

        Commands::Priority { tracker, window } => {
            let tracker = resolve_tracker(&db, tracker)?;
            let window = window.unwrap_or(config.window_days);
            if window < 0 {
                return Err(format!("window must not be negative, got {}", window).into());
            }

            let view = db.fetch_snapshot(tracker.id)?.recompute(clock.now(), window);

            if cli.json {
                print_json(&view.priority_tests)?;
            } else if view.priority_tests.is_empty() {
                println!("No tests in the next {} days.", window);
            } else {
                println!("=== Upcoming tests: {} (next {} days) ===", tracker.name, window);
                println!();
                for p in &view.priority_tests {
                    print_priority_test(p);
                }
            }
        }

        Commands::Tui { tracker } => {
            let tracker = resolve_tracker(&db, tracker)?;
            tui::run(db, tracker, &config, clock)?;
        }
    }

    Ok(())
}

fn resolve_tracker(db: &Database, id: Option<i64>) -> CliResult<Tracker> {
    let tracker = match id {
        Some(id) => db
            .get_tracker(id)?
            .ok_or_else(|| Error::not_found("tracker", id))?,
        None => db
            .latest_tracker()?
            .ok_or("No trackers yet. Create one with: studytrack tracker create")?,
    };
    Ok(tracker)
}

/// Parses `YYYY-MM-DD` into the exam instant on that local date.
fn scheduled_instant(date: &str, hour: u32) -> studytrack::Result<DateTime<Utc>> {
    let day = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .map_err(|_| Error::InvalidDate(date.to_string()))?;
    exam_instant(day, hour, &Local).ok_or_else(|| Error::InvalidDate(date.to_string()))
}

fn report_created(json: bool, kind: &str, id: i64, name: &str) -> CliResult<()> {
    if json {
        print_json(serde_json::json!({ "id": id, "name": name.trim() }))
    } else {
        println!("Added {} '{}' with ID: {}", kind, name.trim(), id);
        Ok(())
    }
}

fn report_done(json: bool, message: String) -> CliResult<()> {
    if json {
        print_json(())
    } else {
        println!("{}", message);
        Ok(())
    }
}

fn format_local(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%a %d %b %Y %H:%M").to_string()
}

fn print_progress_tree(tracker: &Tracker, tree: &TrackerTree, progress: &TrackerProgress) {
    println!("Tracker: {} (ID: {})", tracker.name, tracker.id);
    if let Some(desc) = &tracker.description {
        println!("Description: {}", desc);
    }
    println!(
        "Overall: {}/{} topics ({:.1}%)",
        progress.completed_topics, progress.total_topics, progress.percentage
    );

    for (subject, sp) in tree.subjects.iter().zip(&progress.subjects) {
        println!();
        println!(
            "[{}] {:<36} {:>4}/{:<4} {:>5.1}%",
            subject.subject.id,
            truncate(&subject.subject.name, 36),
            sp.completed_topics,
            sp.total_topics,
            sp.percentage
        );
        for (unit, up) in subject.units.iter().zip(&sp.units) {
            println!(
                "  [{}] {:<32} {:>4}/{:<4} {:>5.1}%",
                unit.unit.id,
                truncate(&unit.unit.name, 32),
                up.completed_topics,
                up.total_topics,
                up.percentage
            );
            for topic in &unit.topics {
                println!(
                    "      {} {:<5} {}",
                    if topic.completed { "[x]" } else { "[ ]" },
                    topic.id,
                    topic.name
                );
            }
        }
    }
}

fn print_test_header() {
    println!(
        "{:<5} {:<24} {:<14} {:<22} COUNTDOWN",
        "ID", "NAME", "TYPE", "WHEN"
    );
    println!("{}", "-".repeat(85));
}

fn print_test_row(test: &Test, now: DateTime<Utc>) {
    println!(
        "{:<5} {:<24} {:<14} {:<22} {}",
        test.id,
        truncate(&test.name, 22),
        test.test_type.label(),
        format_local(test.scheduled_at),
        format_countdown(test.scheduled_at, now)
    );
}

fn print_priority_test(p: &PriorityTest) {
    let marker = match p.urgency {
        Urgency::Critical => "!!!",
        Urgency::High => "!! ",
        Urgency::Elevated => "!  ",
        Urgency::Normal => "   ",
    };
    println!(
        "{} {} [{}] {}, in {} ({})",
        marker,
        p.test.name,
        p.test.test_type.label(),
        format_local(p.test.scheduled_at),
        p.time_remaining,
        p.urgency.label()
    );
    if !p.covered_topics.is_empty() {
        println!("    covers: {}", p.covered_topics.join(", "));
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
