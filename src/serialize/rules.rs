//! Serialize rules: `-reviews.customer` excludes, `reviews.customer_id` includes.

use std::fmt;

use crate::error::{Result, ReviewgraphError};
use crate::model::EntityKind;

/// A validated rule, relative to the entity type it was declared on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub exclude: bool,
    pub path: Vec<&'static str>,
}

impl Rule {
    /// Parse `raw` against the schema of `kind`.
    ///
    /// Every segment but the last must be navigable from the type reached so
    /// far; the last may be any declared field of that type.
    pub fn parse(kind: EntityKind, raw: &str) -> Result<Self> {
        let invalid = |reason: String| ReviewgraphError::Rule {
            entity: kind.name(),
            rule: raw.to_string(),
            reason,
        };

        let (exclude, body) = match raw.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };
        if body.is_empty() {
            return Err(invalid("empty path".to_string()));
        }

        let segments: Vec<&str> = body.split('.').collect();
        let mut path = Vec::with_capacity(segments.len());
        let mut current = kind;

        for (i, segment) in segments.iter().enumerate() {
            if segment.is_empty() || segment.trim() != *segment {
                return Err(invalid(format!("malformed segment '{}'", segment)));
            }
            let field = current
                .field(segment)
                .ok_or_else(|| invalid(format!("{} has no field '{}'", current, segment)))?;
            path.push(field.name);

            if i + 1 < segments.len() {
                current = field.kind.target().ok_or_else(|| {
                    invalid(format!("{}.{} is not a relationship", current, segment))
                })?;
            }
        }

        Ok(Rule { exclude, path })
    }

    /// Dotted path of this rule placed under `prefix`.
    pub fn scoped(&self, prefix: &[&str]) -> String {
        prefix
            .iter()
            .chain(self.path.iter())
            .copied()
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.exclude {
            f.write_str("-")?;
        }
        f.write_str(&self.path.join("."))
    }
}

/// Parse a rule list, failing on the first invalid entry.
pub fn parse_rules<S: AsRef<str>>(kind: EntityKind, raw: &[S]) -> Result<Vec<Rule>> {
    raw.iter().map(|r| Rule::parse(kind, r.as_ref())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rules_are_valid() {
        for kind in EntityKind::ALL {
            let rules = parse_rules(kind, kind.serialize_rules()).unwrap();
            assert!(rules.iter().all(|r| r.exclude));
        }
    }

    #[test]
    fn test_parse_exclude() {
        let rule = Rule::parse(EntityKind::Customer, "-reviews.customer").unwrap();
        assert!(rule.exclude);
        assert_eq!(rule.path, vec!["reviews", "customer"]);
        assert_eq!(rule.to_string(), "-reviews.customer");
    }

    #[test]
    fn test_parse_include_through_derived_view() {
        let rule = Rule::parse(EntityKind::Customer, "items.name").unwrap();
        assert!(!rule.exclude);
        assert_eq!(rule.path, vec!["items", "name"]);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = Rule::parse(EntityKind::Customer, "-reviews.author").unwrap_err();
        match err {
            ReviewgraphError::Rule { entity, rule, reason } => {
                assert_eq!(entity, "Customer");
                assert_eq!(rule, "-reviews.author");
                assert!(reason.contains("Review has no field 'author'"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_scalar_in_middle_rejected() {
        let err = Rule::parse(EntityKind::Item, "-price.value").unwrap_err();
        assert!(err.to_string().contains("not a relationship"));
    }

    #[test]
    fn test_malformed_rules_rejected() {
        for raw in ["", "-", "-reviews.", "reviews..item", " reviews"] {
            assert!(Rule::parse(EntityKind::Item, raw).is_err(), "accepted '{raw}'");
        }
    }

    #[test]
    fn test_scoped_path() {
        let rule = Rule::parse(EntityKind::Review, "-customer.reviews").unwrap();
        assert_eq!(rule.scoped(&["reviews"]), "reviews.customer.reviews");
        assert_eq!(rule.scoped(&[]), "customer.reviews");
    }
}
