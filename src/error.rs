use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error in {}: {message}", path.display())]
    Config { path: PathBuf, message: String },

    #[error("invalid test type '{0}'. Use: lab_practical, class_test, isa, or esa")]
    InvalidTestType(String),

    #[error("invalid date '{0}'")]
    InvalidDate(String),

    #[error("no valid entries parsed from syllabus")]
    EmptySyllabus,

    #[error("{0} name must not be blank")]
    BlankName(&'static str),

    #[error("{kind} name '{name}' contains a syllabus separator")]
    ReservedName { kind: &'static str, name: String },

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: i64 },

    // The CHECK constraint on test_coverage should make this unreachable.
    #[error("coverage row {0} targets neither a unit nor a topic")]
    CorruptCoverage(i64),
}

impl Error {
    pub fn not_found(kind: &'static str, id: i64) -> Self {
        Error::NotFound { kind, id }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_kind_and_id() {
        let err = Error::not_found("tracker", 42);
        assert_eq!(err.to_string(), "tracker 42 not found");
    }

    #[test]
    fn blank_name_message() {
        assert_eq!(
            Error::BlankName("subject").to_string(),
            "subject name must not be blank"
        );
    }

    #[test]
    fn reserved_name_message_quotes_name() {
        let err = Error::ReservedName {
            kind: "topic",
            name: "Sets, Maps".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "topic name 'Sets, Maps' contains a syllabus separator"
        );
    }

    #[test]
    fn config_message_includes_path() {
        let err = Error::Config {
            path: PathBuf::from("/tmp/studytrack.toml"),
            message: "window_days must not be negative".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("/tmp/studytrack.toml"));
        assert!(msg.contains("window_days"));
    }

    #[test]
    fn rusqlite_errors_convert() {
        let err: Error = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, Error::Database(_)));
    }
}
