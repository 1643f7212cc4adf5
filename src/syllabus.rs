//! Line-oriented syllabus text format.
//!
//! Each line names one unit:
//!
//! ```text
//! Subject >>> Unit >>> topic1, topic2, topic3
//! Subject >>> Another unit
//! ```
//!
//! Lines sharing a subject name are grouped under that subject in order of
//! first appearance. Units are never merged, even when a name repeats.
//! Topic names cannot contain `,` and no name can contain `>>>`.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::models::TrackerTree;

pub const DELIMITER: &str = ">>>";

/// Separates topics in the third segment of a line. Subject and unit names
/// may contain it; topic names may not.
pub const TOPIC_SEPARATOR: &str = ",";

pub const EXPORT_VERSION: &str = "1.0";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyllabusSubject {
    pub name: String,
    pub units: Vec<SyllabusUnit>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyllabusUnit {
    pub name: String,
    #[serde(default)]
    pub topics: Vec<String>,
}

/// JSON export of a tracker's syllabus, importable into another semester.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyllabusExport {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    pub version: String,
    pub subjects: Vec<SyllabusSubject>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    MissingUnit,
    BlankSubject,
    BlankUnit,
}

/// A line the decoder skipped. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyllabusIssue {
    /// 1-based line number in the input.
    pub line: usize,
    pub kind: IssueKind,
    pub text: String,
}

impl fmt::Display for SyllabusIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self.kind {
            IssueKind::MissingUnit => "expected 'Subject >>> Unit [>>> topics]'",
            IssueKind::BlankSubject => "subject name is blank",
            IssueKind::BlankUnit => "unit name is blank",
        };
        write!(f, "line {}: {} ({:?})", self.line, reason, self.text)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedSyllabus {
    pub subjects: Vec<SyllabusSubject>,
    pub issues: Vec<SyllabusIssue>,
}

impl ParsedSyllabus {
    pub fn unit_count(&self) -> usize {
        self.subjects.iter().map(|s| s.units.len()).sum()
    }

    pub fn topic_count(&self) -> usize {
        self.subjects
            .iter()
            .flat_map(|s| s.units.iter())
            .map(|u| u.topics.len())
            .sum()
    }
}

pub fn encode_syllabus(subjects: &[SyllabusSubject]) -> String {
    let mut lines = Vec::new();

    for subject in subjects {
        let subject_name = subject.name.trim();
        if subject_name.is_empty() {
            continue;
        }

        for unit in &subject.units {
            let unit_name = unit.name.trim();
            if unit_name.is_empty() {
                continue;
            }

            let topics: Vec<&str> = unit
                .topics
                .iter()
                .map(|t| t.trim())
                .filter(|t| !t.is_empty())
                .collect();

            if topics.is_empty() {
                lines.push(format!("{} {} {}", subject_name, DELIMITER, unit_name));
            } else {
                lines.push(format!(
                    "{} {} {} {} {}",
                    subject_name,
                    DELIMITER,
                    unit_name,
                    DELIMITER,
                    topics.join(", ")
                ));
            }
        }
    }

    lines.join("\n")
}

/// Decodes syllabus text, reporting every line that had to be skipped.
pub fn parse_syllabus(text: &str) -> ParsedSyllabus {
    let mut parsed = ParsedSyllabus::default();
    let mut subject_index: HashMap<String, usize> = HashMap::new();

    for (i, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        let issue = |kind| SyllabusIssue {
            line: i + 1,
            kind,
            text: line.to_string(),
        };

        let parts: Vec<&str> = line.split(DELIMITER).map(|p| p.trim()).collect();
        if parts.len() < 2 {
            parsed.issues.push(issue(IssueKind::MissingUnit));
            continue;
        }

        let (subject_name, unit_name) = (parts[0], parts[1]);
        if subject_name.is_empty() {
            parsed.issues.push(issue(IssueKind::BlankSubject));
            continue;
        }
        if unit_name.is_empty() {
            parsed.issues.push(issue(IssueKind::BlankUnit));
            continue;
        }

        let topics: Vec<String> = parts
            .get(2)
            .map(|list| {
                list.split(TOPIC_SEPARATOR)
                    .map(|t| t.trim())
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let idx = *subject_index
            .entry(subject_name.to_string())
            .or_insert_with(|| {
                parsed.subjects.push(SyllabusSubject {
                    name: subject_name.to_string(),
                    units: Vec::new(),
                });
                parsed.subjects.len() - 1
            });

        parsed.subjects[idx].units.push(SyllabusUnit {
            name: unit_name.to_string(),
            topics,
        });
    }

    for issue in &parsed.issues {
        warn!("skipping syllabus {}", issue);
    }

    parsed
}

pub fn decode_syllabus(text: &str) -> Vec<SyllabusSubject> {
    parse_syllabus(text).subjects
}

/// Drops ids and completion state, keeping names and order.
pub fn syllabus_from_tree(tree: &TrackerTree) -> Vec<SyllabusSubject> {
    tree.subjects
        .iter()
        .map(|s| SyllabusSubject {
            name: s.subject.name.clone(),
            units: s
                .units
                .iter()
                .map(|u| {
                    let mut topics: Vec<_> = u.topics.iter().collect();
                    topics.sort_by_key(|t| t.order);
                    SyllabusUnit {
                        name: u.unit.name.clone(),
                        topics: topics.into_iter().map(|t| t.name.clone()).collect(),
                    }
                })
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(name: &str, topics: &[&str]) -> SyllabusUnit {
        SyllabusUnit {
            name: name.to_string(),
            topics: topics.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn subject(name: &str, units: Vec<SyllabusUnit>) -> SyllabusSubject {
        SyllabusSubject {
            name: name.to_string(),
            units,
        }
    }

    mod encode_tests {
        use super::*;

        #[test]
        fn unit_with_topics() {
            let text = encode_syllabus(&[subject(
                "Math",
                vec![unit("Algebra", &["Linear", "Quadratic"])],
            )]);
            assert_eq!(text, "Math >>> Algebra >>> Linear, Quadratic");
        }

        #[test]
        fn unit_without_topics() {
            let text = encode_syllabus(&[subject("Math", vec![unit("Geometry", &[])])]);
            assert_eq!(text, "Math >>> Geometry");
        }

        #[test]
        fn omits_blank_entries() {
            let text = encode_syllabus(&[
                subject("  ", vec![unit("Orphan", &["x"])]),
                subject(
                    "Physics",
                    vec![
                        unit("", &["ignored"]),
                        unit("Optics", &["", "  ", "Lenses"]),
                        unit("Waves", &[" "]),
                    ],
                ),
            ]);
            assert_eq!(text, "Physics >>> Optics >>> Lenses\nPhysics >>> Waves");
        }

        #[test]
        fn subject_then_unit_order() {
            let text = encode_syllabus(&[
                subject("B", vec![unit("b1", &[]), unit("b2", &[])]),
                subject("A", vec![unit("a1", &[])]),
            ]);
            assert_eq!(text, "B >>> b1\nB >>> b2\nA >>> a1");
        }

        #[test]
        fn empty_input_is_empty_string() {
            assert_eq!(encode_syllabus(&[]), "");
        }
    }

    mod decode_tests {
        use super::*;

        #[test]
        fn merges_subjects_not_units() {
            let subjects = decode_syllabus("A >>> B >>> x, y\nA >>> C");
            assert_eq!(
                subjects,
                vec![subject("A", vec![unit("B", &["x", "y"]), unit("C", &[])])]
            );
        }

        #[test]
        fn repeated_unit_names_stay_separate() {
            let subjects = decode_syllabus("A >>> U >>> x\nA >>> U >>> y");
            assert_eq!(subjects[0].units.len(), 2);
            assert_eq!(subjects[0].units[0].topics, vec!["x"]);
            assert_eq!(subjects[0].units[1].topics, vec!["y"]);
        }

        #[test]
        fn keeps_first_appearance_order() {
            let subjects = decode_syllabus("Zoo >>> a\nAnt >>> b\nZoo >>> c\nMid >>> d");
            let names: Vec<&str> = subjects.iter().map(|s| s.name.as_str()).collect();
            assert_eq!(names, vec!["Zoo", "Ant", "Mid"]);
            assert_eq!(subjects[0].units.len(), 2);
        }

        #[test]
        fn trims_and_drops_empty_topics() {
            let subjects = decode_syllabus("  Math>>>Algebra >>>  linear ,, quadratic ,  ");
            assert_eq!(
                subjects,
                vec![subject("Math", vec![unit("Algebra", &["linear", "quadratic"])])]
            );
        }

        #[test]
        fn skips_blank_and_malformed_lines() {
            let parsed = parse_syllabus("\n   \nnot a syllabus line\nMath >>> Algebra\n\n");
            assert_eq!(parsed.subjects, vec![subject("Math", vec![unit("Algebra", &[])])]);
            assert_eq!(parsed.issues.len(), 1);
            assert_eq!(parsed.issues[0].line, 3);
            assert_eq!(parsed.issues[0].kind, IssueKind::MissingUnit);
        }

        #[test]
        fn skips_blank_names() {
            let parsed = parse_syllabus(" >>> Unit\nMath >>>   >>> x\nMath >>> Ok");
            let kinds: Vec<IssueKind> = parsed.issues.iter().map(|i| i.kind).collect();
            assert_eq!(kinds, vec![IssueKind::BlankSubject, IssueKind::BlankUnit]);
            assert_eq!(parsed.subjects, vec![subject("Math", vec![unit("Ok", &[])])]);
        }

        #[test]
        fn handles_crlf() {
            let subjects = decode_syllabus("A >>> B >>> x\r\nA >>> C\r\n");
            assert_eq!(
                subjects,
                vec![subject("A", vec![unit("B", &["x"]), unit("C", &[])])]
            );
        }

        #[test]
        fn only_malformed_lines_yield_nothing() {
            let parsed = parse_syllabus("just text\nmore text");
            assert!(parsed.subjects.is_empty());
            assert_eq!(parsed.issues.len(), 2);
        }

        #[test]
        fn counts() {
            let parsed = parse_syllabus(
                "Mathematics >>> Algebra >>> linear equations, quadratic equations, polynomials\n\
                 Mathematics >>> Geometry >>> triangles, circles, polygons\n\
                 Physics >>> Mechanics >>> newton laws, forces, momentum",
            );
            assert_eq!(parsed.subjects.len(), 2);
            assert_eq!(parsed.unit_count(), 3);
            assert_eq!(parsed.topic_count(), 9);
        }

        #[test]
        fn issue_display_names_line() {
            let parsed = parse_syllabus("oops");
            let msg = parsed.issues[0].to_string();
            assert!(msg.starts_with("line 1:"));
            assert!(msg.contains("oops"));
        }
    }

    mod round_trip_tests {
        use super::*;

        #[test]
        fn well_formed_text_is_reproduced() {
            let text = "Math >>> Algebra >>> Linear, Quadratic\nMath >>> Geometry >>> Circles";
            assert_eq!(encode_syllabus(&decode_syllabus(text)), text);
        }

        #[test]
        fn mixed_lines_are_reproduced() {
            let text = "Math >>> Algebra\nPhysics >>> Optics >>> Lenses\nMath >>> Algebra >>> x";
            // Subjects regroup, so only grouped input round-trips byte for byte.
            let grouped = "Math >>> Algebra\nMath >>> Algebra >>> x\nPhysics >>> Optics >>> Lenses";
            assert_eq!(encode_syllabus(&decode_syllabus(text)), grouped);
            assert_eq!(encode_syllabus(&decode_syllabus(grouped)), grouped);
        }

        #[test]
        fn tree_is_reconstructed() {
            let tree = vec![
                subject("Chem", vec![unit("Organic", &["Alkanes", "Alkenes"]), unit("Lab", &[])]),
                subject("Bio", vec![unit("Cells", &["Mitosis"])]),
            ];
            assert_eq!(decode_syllabus(&encode_syllabus(&tree)), tree);
        }
    }

    mod tree_tests {
        use super::*;
        use crate::models::{Subject, SubjectTree, Topic, Unit, UnitTree};

        #[test]
        fn syllabus_from_tree_keeps_names_in_order() {
            let tree = TrackerTree {
                tracker_id: 1,
                subjects: vec![SubjectTree {
                    subject: Subject {
                        id: 1,
                        tracker_id: 1,
                        name: "Math".to_string(),
                    },
                    units: vec![UnitTree {
                        unit: Unit {
                            id: 2,
                            subject_id: 1,
                            name: "Algebra".to_string(),
                            order: 0,
                        },
                        topics: vec![
                            Topic {
                                id: 4,
                                unit_id: 2,
                                name: "Quadratic".to_string(),
                                completed: true,
                                order: 1,
                            },
                            Topic {
                                id: 3,
                                unit_id: 2,
                                name: "Linear".to_string(),
                                completed: false,
                                order: 0,
                            },
                        ],
                    }],
                }],
            };
            assert_eq!(
                syllabus_from_tree(&tree),
                vec![subject("Math", vec![unit("Algebra", &["Linear", "Quadratic"])])]
            );
        }
    }

    mod export_tests {
        use super::*;

        #[test]
        fn json_round_trip() {
            let export = SyllabusExport {
                name: "Sem 1".to_string(),
                description: Some("First term".to_string()),
                color: None,
                version: EXPORT_VERSION.to_string(),
                subjects: vec![subject("Math", vec![unit("Algebra", &["Linear"])])],
            };
            let json = serde_json::to_string(&export).unwrap();
            let back: SyllabusExport = serde_json::from_str(&json).unwrap();
            assert_eq!(back, export);
        }

        #[test]
        fn missing_optional_fields_default() {
            let json = r#"{"name":"T","version":"1.0","subjects":[{"name":"S","units":[{"name":"U"}]}]}"#;
            let export: SyllabusExport = serde_json::from_str(json).unwrap();
            assert!(export.description.is_none());
            assert!(export.subjects[0].units[0].topics.is_empty());
        }
    }
}
