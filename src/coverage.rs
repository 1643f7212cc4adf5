//! Expands a test's coverage rows into the topic names it examines.

use std::collections::HashSet;

use tracing::debug;

use crate::models::{CoverageTarget, TestCoverage, Topic, TrackerTree};

/// Resolves coverage rows against the current tree.
///
/// Names are deduplicated and kept at their first position. Rows whose unit
/// or topic has since been deleted contribute nothing.
pub fn resolve_coverage(coverage: &[TestCoverage], tree: &TrackerTree) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut names = Vec::new();

    for row in coverage {
        let topics: Vec<&Topic> = match row.target {
            CoverageTarget::Unit(unit_id) => match tree.find_unit(unit_id) {
                Some(unit) => {
                    let mut topics: Vec<&Topic> = unit.topics.iter().collect();
                    topics.sort_by_key(|t| t.order);
                    topics
                }
                None => {
                    debug!(coverage_id = row.id, unit_id, "skipping coverage of missing unit");
                    continue;
                }
            },
            CoverageTarget::Topic(topic_id) => match tree.find_topic(topic_id) {
                Some(topic) => vec![topic],
                None => {
                    debug!(coverage_id = row.id, topic_id, "skipping coverage of missing topic");
                    continue;
                }
            },
        };

        for topic in topics {
            if seen.insert(topic.name.as_str()) {
                names.push(topic.name.clone());
            }
        }
    }

    names
}
