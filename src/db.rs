use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::models::{
    CoverageTarget, ScheduledTest, Semester, Subject, SubjectTree, Test, TestCoverage, TestType,
    Topic, Tracker, TrackerTree, Unit, UnitTree,
};
use crate::snapshot::TrackerSnapshot;
use crate::syllabus::{
    encode_syllabus, parse_syllabus, syllabus_from_tree, ParsedSyllabus, SyllabusExport,
    SyllabusSubject, DELIMITER, EXPORT_VERSION, TOPIC_SEPARATOR,
};

pub struct Database {
    conn: Connection,
}

const TRACKER_COLUMNS: &str = "id, semester_id, name, description, color, total_subjects, \
     total_units, total_topics, created_at, updated_at";

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self { conn })
    }

    pub fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS semesters (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS trackers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                semester_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                description TEXT,
                color TEXT,
                total_subjects INTEGER NOT NULL DEFAULT 0,
                total_units INTEGER NOT NULL DEFAULT 0,
                total_topics INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now')),
                FOREIGN KEY (semester_id) REFERENCES semesters(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS subjects (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                tracker_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                FOREIGN KEY (tracker_id) REFERENCES trackers(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS units (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                subject_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                "order" INTEGER NOT NULL,
                FOREIGN KEY (subject_id) REFERENCES subjects(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS topics (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                unit_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                completed INTEGER NOT NULL DEFAULT 0,
                "order" INTEGER NOT NULL,
                FOREIGN KEY (unit_id) REFERENCES units(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS tests (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                tracker_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                test_type TEXT NOT NULL CHECK(test_type IN ('lab_practical', 'class_test', 'isa', 'esa')),
                scheduled_at INTEGER NOT NULL,
                FOREIGN KEY (tracker_id) REFERENCES trackers(id) ON DELETE CASCADE
            );

            -- unit_id / topic_id are deliberately not foreign keys: coverage
            -- outlives the units and topics it points at.
            CREATE TABLE IF NOT EXISTS test_coverage (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                test_id INTEGER NOT NULL,
                unit_id INTEGER,
                topic_id INTEGER,
                CHECK ((unit_id IS NULL) <> (topic_id IS NULL)),
                FOREIGN KEY (test_id) REFERENCES tests(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_trackers_semester ON trackers(semester_id);
            CREATE INDEX IF NOT EXISTS idx_subjects_tracker ON subjects(tracker_id);
            CREATE INDEX IF NOT EXISTS idx_units_subject ON units(subject_id);
            CREATE INDEX IF NOT EXISTS idx_topics_unit ON topics(unit_id);
            CREATE INDEX IF NOT EXISTS idx_tests_tracker ON tests(tracker_id);
            CREATE INDEX IF NOT EXISTS idx_tests_scheduled ON tests(scheduled_at);
            CREATE INDEX IF NOT EXISTS idx_coverage_test ON test_coverage(test_id);
            "#,
        )?;

        Ok(())
    }

    // Semester operations
    pub fn create_semester(&self, name: &str) -> Result<i64> {
        let name = required_name(name, "semester")?;
        self.conn
            .execute("INSERT INTO semesters (name) VALUES (?1)", params![name])?;
        let id = self.conn.last_insert_rowid();
        debug!(semester_id = id, "created semester");
        Ok(id)
    }

    pub fn list_semesters(&self) -> Result<Vec<Semester>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, created_at FROM semesters ORDER BY created_at DESC, id DESC",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(Semester {
                id: row.get(0)?,
                name: row.get(1)?,
                created_at: row.get(2)?,
            })
        })?;

        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn delete_semester(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM semesters WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Tracker operations
    pub fn create_tracker(
        &self,
        semester_id: i64,
        name: &str,
        description: Option<&str>,
        color: Option<&str>,
    ) -> Result<i64> {
        let id = insert_tracker(&self.conn, semester_id, name, description, color)?;
        debug!(tracker_id = id, semester_id, "created tracker");
        Ok(id)
    }

    /// Creates a tracker and its whole subject/unit/topic tree in one
    /// transaction. Entries with a blank or unusable name are skipped along
    /// with everything under them. Refuses a syllabus with no usable subject.
    pub fn create_tracker_from_syllabus(
        &self,
        semester_id: i64,
        name: &str,
        description: Option<&str>,
        color: Option<&str>,
        subjects: &[SyllabusSubject],
    ) -> Result<i64> {
        let tx = self.conn.unchecked_transaction()?;
        let tracker_id = insert_tracker(&tx, semester_id, name, description, color)?;

        let mut created = 0;
        for subject in subjects {
            let Some(subject_id) = skip_bad_name(insert_subject(&tx, tracker_id, &subject.name))?
            else {
                continue;
            };
            created += 1;
            for unit in &subject.units {
                let Some(unit_id) = skip_bad_name(insert_unit(&tx, subject_id, &unit.name))? else {
                    continue;
                };
                for topic in &unit.topics {
                    skip_bad_name(insert_topic(&tx, unit_id, topic))?;
                }
            }
        }

        if created == 0 {
            return Err(Error::EmptySyllabus);
        }

        refresh_stats(&tx, tracker_id)?;
        tx.commit()?;

        debug!(tracker_id, subjects = created, "created tracker from syllabus");
        Ok(tracker_id)
    }

    /// Decodes syllabus text and creates a tracker from it. The decoded
    /// syllabus is handed back so the caller can report counts and skipped
    /// lines.
    pub fn create_tracker_from_text(
        &self,
        semester_id: i64,
        name: &str,
        description: Option<&str>,
        color: Option<&str>,
        text: &str,
    ) -> Result<(i64, ParsedSyllabus)> {
        let parsed = parse_syllabus(text);
        let id = self.create_tracker_from_syllabus(
            semester_id,
            name,
            description,
            color,
            &parsed.subjects,
        )?;
        Ok((id, parsed))
    }

    pub fn import_tracker(&self, semester_id: i64, export: &SyllabusExport) -> Result<i64> {
        if export.version != EXPORT_VERSION {
            warn!(
                version = %export.version,
                expected = EXPORT_VERSION,
                "importing syllabus export with unknown version"
            );
        }
        self.create_tracker_from_syllabus(
            semester_id,
            &export.name,
            export.description.as_deref(),
            export.color.as_deref(),
            &export.subjects,
        )
    }

    pub fn export_tracker(&self, tracker_id: i64) -> Result<SyllabusExport> {
        let tracker = self
            .get_tracker(tracker_id)?
            .ok_or_else(|| Error::not_found("tracker", tracker_id))?;
        let tree = self.fetch_tracker_tree(tracker_id)?;

        Ok(SyllabusExport {
            name: tracker.name,
            description: tracker.description,
            color: tracker.color,
            version: EXPORT_VERSION.to_string(),
            subjects: syllabus_from_tree(&tree),
        })
    }

    pub fn export_tracker_text(&self, tracker_id: i64) -> Result<String> {
        let tree = self.fetch_tracker_tree(tracker_id)?;
        Ok(encode_syllabus(&syllabus_from_tree(&tree)))
    }

    pub fn list_trackers(&self, semester_id: i64) -> Result<Vec<Tracker>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM trackers WHERE semester_id = ?1 ORDER BY created_at DESC, id DESC",
            TRACKER_COLUMNS
        ))?;
        let rows = stmt.query_map(params![semester_id], tracker_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn get_tracker(&self, id: i64) -> Result<Option<Tracker>> {
        let tracker = self.conn.query_row(
            &format!("SELECT {} FROM trackers WHERE id = ?1", TRACKER_COLUMNS),
            params![id],
            tracker_from_row,
        );

        match tracker {
            Ok(t) => Ok(Some(t)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// The most recently created tracker across all semesters.
    pub fn latest_tracker(&self) -> Result<Option<Tracker>> {
        let tracker = self.conn.query_row(
            &format!(
                "SELECT {} FROM trackers ORDER BY created_at DESC, id DESC LIMIT 1",
                TRACKER_COLUMNS
            ),
            [],
            tracker_from_row,
        );

        match tracker {
            Ok(t) => Ok(Some(t)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn delete_tracker(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM trackers WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Subject operations
    pub fn add_subject(&self, tracker_id: i64, name: &str) -> Result<i64> {
        let id = insert_subject(&self.conn, tracker_id, name)?;
        refresh_stats(&self.conn, tracker_id)?;
        Ok(id)
    }

    pub fn rename_subject(&self, id: i64, name: &str) -> Result<bool> {
        let name = syllabus_name(name, "subject", NAME_RESERVED)?;
        let rows = self.conn.execute(
            "UPDATE subjects SET name = ?1 WHERE id = ?2",
            params![name, id],
        )?;
        Ok(rows > 0)
    }

    pub fn delete_subject(&self, id: i64) -> Result<bool> {
        let Some(tracker_id) = self.tracker_of_subject(id)? else {
            return Ok(false);
        };
        self.conn
            .execute("DELETE FROM subjects WHERE id = ?1", params![id])?;
        refresh_stats(&self.conn, tracker_id)?;
        Ok(true)
    }

    // Unit operations
    pub fn add_unit(&self, subject_id: i64, name: &str) -> Result<i64> {
        let tracker_id = self
            .tracker_of_subject(subject_id)?
            .ok_or_else(|| Error::not_found("subject", subject_id))?;
        let id = insert_unit(&self.conn, subject_id, name)?;
        refresh_stats(&self.conn, tracker_id)?;
        Ok(id)
    }

    pub fn rename_unit(&self, id: i64, name: &str) -> Result<bool> {
        let name = syllabus_name(name, "unit", NAME_RESERVED)?;
        let rows = self
            .conn
            .execute("UPDATE units SET name = ?1 WHERE id = ?2", params![name, id])?;
        Ok(rows > 0)
    }

    /// Deletes a unit and its topics. Test coverage pointing at it is kept.
    pub fn delete_unit(&self, id: i64) -> Result<bool> {
        let Some(tracker_id) = self.tracker_of_unit(id)? else {
            return Ok(false);
        };
        self.conn
            .execute("DELETE FROM units WHERE id = ?1", params![id])?;
        refresh_stats(&self.conn, tracker_id)?;
        Ok(true)
    }

    // Topic operations
    pub fn add_topic(&self, unit_id: i64, name: &str) -> Result<i64> {
        let tracker_id = self
            .tracker_of_unit(unit_id)?
            .ok_or_else(|| Error::not_found("unit", unit_id))?;
        let id = insert_topic(&self.conn, unit_id, name)?;
        refresh_stats(&self.conn, tracker_id)?;
        Ok(id)
    }

    pub fn rename_topic(&self, id: i64, name: &str) -> Result<bool> {
        let name = syllabus_name(name, "topic", TOPIC_RESERVED)?;
        let rows = self.conn.execute(
            "UPDATE topics SET name = ?1 WHERE id = ?2",
            params![name, id],
        )?;
        Ok(rows > 0)
    }

    pub fn delete_topic(&self, id: i64) -> Result<bool> {
        let Some(tracker_id) = self.tracker_of_topic(id)? else {
            return Ok(false);
        };
        self.conn
            .execute("DELETE FROM topics WHERE id = ?1", params![id])?;
        refresh_stats(&self.conn, tracker_id)?;
        Ok(true)
    }

    pub fn get_topic(&self, id: i64) -> Result<Option<Topic>> {
        let topic = self.conn.query_row(
            r#"SELECT id, unit_id, name, completed, "order" FROM topics WHERE id = ?1"#,
            params![id],
            topic_from_row,
        );

        match topic {
            Ok(t) => Ok(Some(t)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Flips a topic's completion. Returns the new state, or `None` if the
    /// topic does not exist.
    pub fn toggle_topic(&self, id: i64) -> Result<Option<bool>> {
        let rows = self.conn.execute(
            "UPDATE topics SET completed = NOT completed WHERE id = ?1",
            params![id],
        )?;
        if rows == 0 {
            return Ok(None);
        }
        Ok(self.get_topic(id)?.map(|t| t.completed))
    }

    pub fn set_topic_completed(&self, id: i64, completed: bool) -> Result<bool> {
        let rows = self.conn.execute(
            "UPDATE topics SET completed = ?1 WHERE id = ?2",
            params![completed, id],
        )?;
        Ok(rows > 0)
    }

    // Test operations
    pub fn schedule_test(
        &self,
        tracker_id: i64,
        name: &str,
        test_type: TestType,
        scheduled_at: DateTime<Utc>,
        targets: &[CoverageTarget],
    ) -> Result<i64> {
        let name = required_name(name, "test")?;
        if self.get_tracker(tracker_id)?.is_none() {
            return Err(Error::not_found("tracker", tracker_id));
        }

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO tests (tracker_id, name, test_type, scheduled_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                tracker_id,
                name,
                test_type.as_str(),
                scheduled_at.timestamp_millis()
            ],
        )?;
        let test_id = tx.last_insert_rowid();

        for target in targets {
            let (kind, id, found) = match target {
                CoverageTarget::Unit(id) => ("unit", *id, unit_in_tracker(&tx, *id, tracker_id)?),
                CoverageTarget::Topic(id) => {
                    ("topic", *id, topic_in_tracker(&tx, *id, tracker_id)?)
                }
            };
            if !found {
                return Err(Error::not_found(kind, id));
            }

            tx.execute(
                "INSERT INTO test_coverage (test_id, unit_id, topic_id) VALUES (?1, ?2, ?3)",
                params![test_id, target.unit_id(), target.topic_id()],
            )?;
        }

        tx.commit()?;
        debug!(test_id, tracker_id, targets = targets.len(), "scheduled test");
        Ok(test_id)
    }

    pub fn get_test(&self, id: i64) -> Result<Option<Test>> {
        let test = self.conn.query_row(
            "SELECT id, tracker_id, name, test_type, scheduled_at FROM tests WHERE id = ?1",
            params![id],
            test_from_row,
        );

        match test {
            Ok(t) => Ok(Some(t)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn get_scheduled_test(&self, id: i64) -> Result<Option<ScheduledTest>> {
        match self.get_test(id)? {
            Some(test) => {
                let coverage = self.fetch_coverage(test.id)?;
                Ok(Some(ScheduledTest { test, coverage }))
            }
            None => Ok(None),
        }
    }

    pub fn delete_test(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM tests WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Fetches consumed by the engine

    /// Every subject, unit and topic of a tracker. Units and topics come
    /// back in their stored order.
    pub fn fetch_tracker_tree(&self, tracker_id: i64) -> Result<TrackerTree> {
        if self.get_tracker(tracker_id)?.is_none() {
            return Err(Error::not_found("tracker", tracker_id));
        }

        let mut subject_stmt = self
            .conn
            .prepare("SELECT id, tracker_id, name FROM subjects WHERE tracker_id = ?1 ORDER BY id")?;
        let mut unit_stmt = self.conn.prepare(
            r#"SELECT id, subject_id, name, "order" FROM units WHERE subject_id = ?1 ORDER BY "order", id"#,
        )?;
        let mut topic_stmt = self.conn.prepare(
            r#"SELECT id, unit_id, name, completed, "order" FROM topics WHERE unit_id = ?1 ORDER BY "order", id"#,
        )?;

        let subjects = subject_stmt
            .query_map(params![tracker_id], |row| {
                Ok(Subject {
                    id: row.get(0)?,
                    tracker_id: row.get(1)?,
                    name: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut tree = TrackerTree {
            tracker_id,
            subjects: Vec::with_capacity(subjects.len()),
        };

        for subject in subjects {
            let units = unit_stmt
                .query_map(params![subject.id], |row| {
                    Ok(Unit {
                        id: row.get(0)?,
                        subject_id: row.get(1)?,
                        name: row.get(2)?,
                        order: row.get(3)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            let mut unit_trees = Vec::with_capacity(units.len());
            for unit in units {
                let topics = topic_stmt
                    .query_map(params![unit.id], topic_from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                unit_trees.push(UnitTree { unit, topics });
            }

            tree.subjects.push(SubjectTree {
                subject,
                units: unit_trees,
            });
        }

        Ok(tree)
    }

    /// Tests of a tracker, soonest first.
    pub fn fetch_tests(&self, tracker_id: i64) -> Result<Vec<Test>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, tracker_id, name, test_type, scheduled_at
            FROM tests
            WHERE tracker_id = ?1
            ORDER BY scheduled_at, id
            "#,
        )?;
        let rows = stmt.query_map(params![tracker_id], test_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn fetch_coverage(&self, test_id: i64) -> Result<Vec<TestCoverage>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, test_id, unit_id, topic_id FROM test_coverage WHERE test_id = ?1 ORDER BY id",
        )?;

        let rows = stmt.query_map(params![test_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, Option<i64>>(2)?,
                row.get::<_, Option<i64>>(3)?,
            ))
        })?;

        let mut coverage = Vec::new();
        for row in rows {
            let (id, test_id, unit_id, topic_id) = row?;
            let target =
                CoverageTarget::from_columns(unit_id, topic_id).ok_or(Error::CorruptCoverage(id))?;
            coverage.push(TestCoverage {
                id,
                test_id,
                target,
            });
        }

        Ok(coverage)
    }

    pub fn fetch_snapshot(&self, tracker_id: i64) -> Result<TrackerSnapshot> {
        let tree = self.fetch_tracker_tree(tracker_id)?;
        let tests = self
            .fetch_tests(tracker_id)?
            .into_iter()
            .map(|test| -> Result<ScheduledTest> {
                let coverage = self.fetch_coverage(test.id)?;
                Ok(ScheduledTest { test, coverage })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(
            tracker_id,
            topics = tree.topics().count(),
            tests = tests.len(),
            "loaded snapshot"
        );
        Ok(TrackerSnapshot::new(tree, tests))
    }

    // Parent lookups
    fn tracker_of_subject(&self, subject_id: i64) -> Result<Option<i64>> {
        self.lookup_id(
            "SELECT tracker_id FROM subjects WHERE id = ?1",
            subject_id,
        )
    }

    fn tracker_of_unit(&self, unit_id: i64) -> Result<Option<i64>> {
        self.lookup_id(
            "SELECT s.tracker_id FROM units u JOIN subjects s ON u.subject_id = s.id WHERE u.id = ?1",
            unit_id,
        )
    }

    fn tracker_of_topic(&self, topic_id: i64) -> Result<Option<i64>> {
        self.lookup_id(
            r#"
            SELECT s.tracker_id
            FROM topics t
            JOIN units u ON t.unit_id = u.id
            JOIN subjects s ON u.subject_id = s.id
            WHERE t.id = ?1
            "#,
            topic_id,
        )
    }

    fn lookup_id(&self, sql: &str, id: i64) -> Result<Option<i64>> {
        match self.conn.query_row(sql, params![id], |row| row.get(0)) {
            Ok(found) => Ok(Some(found)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

fn required_name<'a>(name: &'a str, kind: &'static str) -> Result<&'a str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::BlankName(kind));
    }
    Ok(trimmed)
}

const NAME_RESERVED: &[&str] = &[DELIMITER, "\n", "\r"];
const TOPIC_RESERVED: &[&str] = &[DELIMITER, TOPIC_SEPARATOR, "\n", "\r"];

/// A required name that must survive the syllabus text format.
fn syllabus_name<'a>(name: &'a str, kind: &'static str, reserved: &[&str]) -> Result<&'a str> {
    let name = required_name(name, kind)?;
    if reserved.iter().any(|r| name.contains(r)) {
        return Err(Error::ReservedName {
            kind,
            name: name.to_string(),
        });
    }
    Ok(name)
}

/// Turns a name rejection during a bulk insert into a logged skip.
fn skip_bad_name(inserted: Result<i64>) -> Result<Option<i64>> {
    match inserted {
        Ok(id) => Ok(Some(id)),
        Err(e @ (Error::BlankName(_) | Error::ReservedName { .. })) => {
            warn!("skipping syllabus entry: {}", e);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

fn insert_tracker(
    conn: &Connection,
    semester_id: i64,
    name: &str,
    description: Option<&str>,
    color: Option<&str>,
) -> Result<i64> {
    let name = required_name(name, "tracker")?;
    conn.execute(
        "INSERT INTO trackers (semester_id, name, description, color) VALUES (?1, ?2, ?3, ?4)",
        params![semester_id, name, description, color],
    )?;
    Ok(conn.last_insert_rowid())
}

fn insert_subject(conn: &Connection, tracker_id: i64, name: &str) -> Result<i64> {
    let name = syllabus_name(name, "subject", NAME_RESERVED)?;
    conn.execute(
        "INSERT INTO subjects (tracker_id, name) VALUES (?1, ?2)",
        params![tracker_id, name],
    )?;
    Ok(conn.last_insert_rowid())
}

fn insert_unit(conn: &Connection, subject_id: i64, name: &str) -> Result<i64> {
    let name = syllabus_name(name, "unit", NAME_RESERVED)?;
    conn.execute(
        r#"
        INSERT INTO units (subject_id, name, "order")
        VALUES (?1, ?2, (SELECT COALESCE(MAX("order"), -1) + 1 FROM units WHERE subject_id = ?1))
        "#,
        params![subject_id, name],
    )?;
    Ok(conn.last_insert_rowid())
}

fn insert_topic(conn: &Connection, unit_id: i64, name: &str) -> Result<i64> {
    let name = syllabus_name(name, "topic", TOPIC_RESERVED)?;
    conn.execute(
        r#"
        INSERT INTO topics (unit_id, name, "order")
        VALUES (?1, ?2, (SELECT COALESCE(MAX("order"), -1) + 1 FROM topics WHERE unit_id = ?1))
        "#,
        params![unit_id, name],
    )?;
    Ok(conn.last_insert_rowid())
}

fn refresh_stats(conn: &Connection, tracker_id: i64) -> Result<()> {
    conn.execute(
        r#"
        UPDATE trackers SET
            total_subjects = (SELECT COUNT(*) FROM subjects WHERE tracker_id = ?1),
            total_units = (
                SELECT COUNT(*) FROM units u
                JOIN subjects s ON u.subject_id = s.id
                WHERE s.tracker_id = ?1
            ),
            total_topics = (
                SELECT COUNT(*) FROM topics t
                JOIN units u ON t.unit_id = u.id
                JOIN subjects s ON u.subject_id = s.id
                WHERE s.tracker_id = ?1
            ),
            updated_at = datetime('now')
        WHERE id = ?1
        "#,
        params![tracker_id],
    )?;
    Ok(())
}

fn unit_in_tracker(conn: &Connection, unit_id: i64, tracker_id: i64) -> Result<bool> {
    let count: i64 = conn.query_row(
        r#"
        SELECT COUNT(*) FROM units u
        JOIN subjects s ON u.subject_id = s.id
        WHERE u.id = ?1 AND s.tracker_id = ?2
        "#,
        params![unit_id, tracker_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn topic_in_tracker(conn: &Connection, topic_id: i64, tracker_id: i64) -> Result<bool> {
    let count: i64 = conn.query_row(
        r#"
        SELECT COUNT(*) FROM topics t
        JOIN units u ON t.unit_id = u.id
        JOIN subjects s ON u.subject_id = s.id
        WHERE t.id = ?1 AND s.tracker_id = ?2
        "#,
        params![topic_id, tracker_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn tracker_from_row(row: &Row<'_>) -> rusqlite::Result<Tracker> {
    Ok(Tracker {
        id: row.get(0)?,
        semester_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        color: row.get(4)?,
        total_subjects: row.get(5)?,
        total_units: row.get(6)?,
        total_topics: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn topic_from_row(row: &Row<'_>) -> rusqlite::Result<Topic> {
    Ok(Topic {
        id: row.get(0)?,
        unit_id: row.get(1)?,
        name: row.get(2)?,
        completed: row.get(3)?,
        order: row.get(4)?,
    })
}

fn test_from_row(row: &Row<'_>) -> rusqlite::Result<Test> {
    let type_str: String = row.get(3)?;
    let test_type = TestType::from_str(&type_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            Type::Text,
            Box::new(Error::InvalidTestType(type_str.clone())),
        )
    })?;

    let millis: i64 = row.get(4)?;
    let scheduled_at = DateTime::<Utc>::from_timestamp_millis(millis)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(4, millis))?;

    Ok(Test {
        id: row.get(0)?,
        tracker_id: row.get(1)?,
        name: row.get(2)?,
        test_type,
        scheduled_at,
    })
}
