//! Completion roll-up: topic → unit → subject → tracker.

use crate::models::{
    SubjectProgress, SubjectTree, TrackerProgress, TrackerTree, UnitProgress, UnitTree,
};

/// Share of completed topics in `[0, 100]`; `0` when there is nothing to complete.
pub fn percentage(completed: u32, total: u32) -> f64 {
    if total == 0 {
        0.0
    } else {
        (completed as f64 / total as f64) * 100.0
    }
}

pub fn unit_progress(unit: &UnitTree) -> UnitProgress {
    let total = unit.topics.len() as u32;
    let completed = unit.topics.iter().filter(|t| t.completed).count() as u32;

    UnitProgress {
        unit_id: unit.unit.id,
        unit_name: unit.unit.name.clone(),
        total_topics: total,
        completed_topics: completed,
        percentage: percentage(completed, total),
    }
}

pub fn subject_progress(subject: &SubjectTree) -> SubjectProgress {
    let units: Vec<UnitProgress> = subject.units.iter().map(unit_progress).collect();
    let total = units.iter().map(|u| u.total_topics).sum();
    let completed = units.iter().map(|u| u.completed_topics).sum();

    SubjectProgress {
        subject_id: subject.subject.id,
        subject_name: subject.subject.name.clone(),
        total_topics: total,
        completed_topics: completed,
        percentage: percentage(completed, total),
        units,
    }
}

pub fn compute_progress(tree: &TrackerTree) -> TrackerProgress {
    let subjects: Vec<SubjectProgress> = tree.subjects.iter().map(subject_progress).collect();
    let total = subjects.iter().map(|s| s.total_topics).sum();
    let completed = subjects.iter().map(|s| s.completed_topics).sum();

    TrackerProgress {
        tracker_id: tree.tracker_id,
        total_topics: total,
        completed_topics: completed,
        percentage: percentage(completed, total),
        subjects,
    }
}
