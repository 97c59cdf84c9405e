//! Write constraints checked before mutations reach a table.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::mutation::Mutation;

/// A check every mutation must pass before it is applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Constraint {
    /// Rejects mutations whose [`Mutation::size_bytes`] exceeds `max_bytes`.
    MaxMutationSize { max_bytes: usize },
}

impl Constraint {
    pub fn max_mutation_size(max_bytes: usize) -> Self {
        Constraint::MaxMutationSize { max_bytes }
    }

    /// Stable name used to list and remove the constraint.
    pub fn name(&self) -> &'static str {
        match self {
            Constraint::MaxMutationSize { .. } => "max_mutation_size",
        }
    }

    /// Violation code and description when `mutation` fails this check.
    fn check(&self, mutation: &Mutation) -> Option<(u16, String)> {
        match self {
            Constraint::MaxMutationSize { max_bytes } => (mutation.size_bytes() > *max_bytes)
                .then(|| (0, format!("mutation exceeded maximum size of {} bytes", max_bytes))),
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::MaxMutationSize { max_bytes } => write!(f, "{} max_bytes={}", self.name(), max_bytes),
        }
    }
}

/// Mutations rejected by one constraint for one reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintViolation {
    pub constraint: String,
    pub code: u16,
    pub description: String,
    /// Number of mutations rejected this way.
    pub count: usize,
}

impl fmt::Display for ConstraintViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (code {}): {} x{}",
            self.constraint, self.code, self.description, self.count
        )
    }
}

/// Check `mutations` against `constraints`, one summary per constraint and code.
pub(crate) fn check_all(constraints: &[Constraint], mutations: &[Mutation]) -> Vec<ConstraintViolation> {
    let mut summaries: BTreeMap<(&'static str, u16), ConstraintViolation> = BTreeMap::new();
    for mutation in mutations {
        for constraint in constraints {
            if let Some((code, description)) = constraint.check(mutation) {
                summaries
                    .entry((constraint.name(), code))
                    .or_insert_with(|| ConstraintViolation {
                        constraint: constraint.name().to_string(),
                        code,
                        description,
                        count: 0,
                    })
                    .count += 1;
            }
        }
    }
    summaries.into_values().collect()
}

pub(crate) fn summarize(violations: &[ConstraintViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wide(row: &str, columns: usize) -> Mutation {
        (0..columns).fold(Mutation::new(row), |m, i| m.put("f", format!("q{i}"), "value"))
    }

    #[test]
    fn test_small_mutation_passes() {
        let constraints = vec![Constraint::max_mutation_size(1_000)];
        assert!(check_all(&constraints, &[wide("r", 3)]).is_empty());
    }

    #[test]
    fn test_violations_are_summarized() {
        let constraints = vec![Constraint::max_mutation_size(100)];
        let mutations = vec![wide("a", 1_000), wide("b", 1), wide("c", 500)];
        let violations = check_all(&constraints, &mutations);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].constraint, "max_mutation_size");
        assert_eq!(violations[0].count, 2);
        assert!(summarize(&violations).contains("100 bytes"));
    }

    #[test]
    fn test_constraint_json() {
        let json = serde_json::to_string(&Constraint::max_mutation_size(64)).unwrap();
        assert_eq!(json, r#"{"kind":"max_mutation_size","max_bytes":64}"#);
        let back: Constraint = serde_json::from_str(&json).unwrap();
        assert_eq!(back.to_string(), "max_mutation_size max_bytes=64");
    }
}
