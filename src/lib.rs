//! Syllabus completion and test countdown tracking.
//!
//! The engine modules ([`progress`], [`coverage`], [`priority`],
//! [`syllabus`] and [`snapshot`]) are pure functions over in-memory values.
//! [`db`] is the SQLite store that feeds them.

pub mod config;
pub mod coverage;
pub mod db;
pub mod error;
pub mod models;
pub mod priority;
pub mod progress;
pub mod snapshot;
pub mod syllabus;
pub mod time;

pub use coverage::resolve_coverage;
pub use error::{Error, Result};
pub use priority::{format_countdown, rank_priority_tests};
pub use progress::compute_progress;
pub use snapshot::{TrackerSnapshot, TrackerView};
pub use syllabus::{decode_syllabus, encode_syllabus};
