//! Cycle-safe serialization of entity records into JSON values.
//!
//! Each entity type carries serialize rules (see
//! [`EntityKind::serialize_rules`]). When the walk enters a record at path
//! `P`, that type's rules become active scoped under `P`; a field is omitted
//! when its full dotted path equals an active exclude rule. Exclusion is by
//! path: `-reviews.customer` on Customer stops `customer` inside a
//! customer's reviews and nowhere else.

mod rules;

pub use rules::{parse_rules, Rule};

use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};

use crate::config::SerializerConfig;
use crate::error::{Result, ReviewgraphError};
use crate::graph::{EntityGraph, Record, Related};
use crate::model::{EntityKind, FieldKind};

/// Serializer with validated per-type rules and a depth guard.
#[derive(Debug, Clone)]
pub struct Serializer {
    max_depth: usize,
    model_rules: HashMap<EntityKind, Vec<Rule>>,
}

/// Rules active during one walk, as full dotted paths.
#[derive(Default)]
struct Active {
    excludes: HashSet<String>,
    includes: HashSet<String>,
}

impl Active {
    /// Activate `rules` under `prefix`, returning the paths newly added.
    fn push(&mut self, rules: &[Rule], prefix: &[&str]) -> Vec<(bool, String)> {
        let mut added = Vec::new();
        for rule in rules {
            let path = rule.scoped(prefix);
            let set = if rule.exclude { &mut self.excludes } else { &mut self.includes };
            if set.insert(path.clone()) {
                added.push((rule.exclude, path));
            }
        }
        added
    }

    fn pop(&mut self, added: Vec<(bool, String)>) {
        for (exclude, path) in added {
            if exclude {
                self.excludes.remove(&path);
            } else {
                self.includes.remove(&path);
            }
        }
    }

    /// Excludes win over includes.
    fn emits(&self, path: &str, kind: FieldKind) -> bool {
        if self.excludes.contains(path) {
            return false;
        }
        kind.serialized_by_default() || self.includes.contains(path)
    }
}

impl Serializer {
    /// Serializer using every entity type's declared rules.
    ///
    /// Rules are validated here, so a misconfigured model fails at startup.
    pub fn new(max_depth: usize) -> Result<Self> {
        if max_depth == 0 {
            return Err(ReviewgraphError::Config(
                "serializer max_depth must be greater than 0".to_string(),
            ));
        }
        let mut model_rules = HashMap::new();
        for kind in EntityKind::ALL {
            model_rules.insert(kind, parse_rules(kind, kind.serialize_rules())?);
        }
        Ok(Self { max_depth, model_rules })
    }

    pub fn from_config(config: &SerializerConfig) -> Result<Self> {
        Self::new(config.max_depth)
    }

    /// Replace the rules applied to records of `kind`.
    pub fn with_model_rules<S: AsRef<str>>(mut self, kind: EntityKind, rules: &[S]) -> Result<Self> {
        self.model_rules.insert(kind, parse_rules(kind, rules)?);
        Ok(self)
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Serialize the record `kind`/`id` from `graph`.
    pub fn serialize(&self, graph: &EntityGraph, kind: EntityKind, id: i64) -> Result<Value> {
        self.serialize_record(graph, graph.record(kind, id)?)
    }

    pub fn serialize_record(&self, graph: &EntityGraph, record: Record<'_>) -> Result<Value> {
        self.serialize_with_rules::<&str>(graph, record, &[])
    }

    /// Serialize with extra caller rules, merged with the root type's own.
    ///
    /// The extra rules are validated before anything is produced.
    pub fn serialize_with_rules<S: AsRef<str>>(
        &self,
        graph: &EntityGraph,
        record: Record<'_>,
        extra: &[S],
    ) -> Result<Value> {
        let extra = parse_rules(record.kind(), extra)?;
        let mut active = Active::default();
        active.push(&extra, &[]);
        let mut path = Vec::new();
        self.visit(graph, record, &mut active, &mut path)
    }

    /// Serialize several records into an ordered sequence.
    pub fn serialize_many<'a, I>(&self, graph: &'a EntityGraph, records: I) -> Result<Value>
    where
        I: IntoIterator<Item = Record<'a>>,
    {
        records
            .into_iter()
            .map(|r| self.serialize_record(graph, r))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array)
    }

    fn visit(
        &self,
        graph: &EntityGraph,
        record: Record<'_>,
        active: &mut Active,
        path: &mut Vec<&'static str>,
    ) -> Result<Value> {
        if path.len() > self.max_depth {
            return Err(ReviewgraphError::RecursionLimit {
                path: path.join("."),
                max_depth: self.max_depth,
            });
        }

        let kind = record.kind();
        let own_rules = self.model_rules.get(&kind).map(Vec::as_slice).unwrap_or(&[]);
        let added = active.push(own_rules, path);

        let result = self.visit_fields(graph, record, active, path);
        active.pop(added);
        result
    }

    fn visit_fields(
        &self,
        graph: &EntityGraph,
        record: Record<'_>,
        active: &mut Active,
        path: &mut Vec<&'static str>,
    ) -> Result<Value> {
        let mut out = Map::new();

        for field in record.kind().fields() {
            path.push(field.name);
            let field_path = path.join(".");

            let value = if !active.emits(&field_path, field.kind) {
                log::trace!("Skipping {} on {} {}", field_path, record.kind(), record.id());
                None
            } else {
                match field.kind {
                    FieldKind::Scalar | FieldKind::ForeignKey(_) => {
                        Some(record.column(field.name).unwrap_or(Value::Null))
                    }
                    FieldKind::ToOne(_) | FieldKind::ToMany(_) | FieldKind::Derived(_) => {
                        Some(self.visit_related(graph, record, field.name, active, path)?)
                    }
                }
            };
            path.pop();

            if let Some(value) = value {
                out.insert(field.name.to_string(), value);
            }
        }

        Ok(Value::Object(out))
    }

    fn visit_related(
        &self,
        graph: &EntityGraph,
        record: Record<'_>,
        field: &str,
        active: &mut Active,
        path: &mut Vec<&'static str>,
    ) -> Result<Value> {
        match graph.related(record, field)? {
            Related::One(None) => Ok(Value::Null),
            Related::One(Some(target)) => self.visit(graph, target, active, path),
            Related::Many(targets) => targets
                .into_iter()
                .map(|target| self.visit(graph, target, active, path))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Customer, Item, Review};
    use serde_json::json;

    fn scenario() -> EntityGraph {
        let mut g = EntityGraph::new();
        g.insert_customer(Customer { id: 1, name: "Ana".into() }).unwrap();
        g.insert_item(Item { id: 1, name: "Mug".into(), price: 9.99 }).unwrap();
        g.insert_review(Review {
            id: 1,
            comment: Some("Nice".into()),
            customer_id: Some(1),
            item_id: Some(1),
        })
        .unwrap();
        g
    }

    fn serializer() -> Serializer {
        Serializer::new(32).unwrap()
    }

    #[test]
    fn test_review_scenario_exact_output() {
        let g = scenario();
        let value = serializer().serialize(&g, EntityKind::Review, 1).unwrap();
        assert_eq!(
            serde_json::to_string(&value).unwrap(),
            r#"{"id":1,"comment":"Nice","customer":{"id":1,"name":"Ana"},"item":{"id":1,"name":"Mug","price":9.99}}"#
        );
    }

    #[test]
    fn test_customer_reviews_omit_customer() {
        let mut g = scenario();
        g.new_review(Some("Again".into()), Some(1), Some(1)).unwrap();

        let value = serializer().serialize(&g, EntityKind::Customer, 1).unwrap();
        let reviews = value["reviews"].as_array().unwrap();
        assert_eq!(reviews.len(), 2);
        for review in reviews {
            assert!(review.get("customer").is_none());
            // the review's own rule stops item.reviews
            assert_eq!(review["item"], json!({"id": 1, "name": "Mug", "price": 9.99}));
        }
        assert_eq!(reviews[0]["comment"], "Nice");
        assert_eq!(reviews[1]["comment"], "Again");
    }

    #[test]
    fn test_review_relations_omit_back_references() {
        let g = scenario();
        let value = serializer().serialize(&g, EntityKind::Review, 1).unwrap();
        assert!(value["customer"].get("reviews").is_none());
        assert!(value["item"].get("reviews").is_none());
    }

    #[test]
    fn test_item_without_reviews_has_empty_sequence() {
        let mut g = scenario();
        g.new_item("Pen", 1.5).unwrap();
        let value = serializer().serialize(&g, EntityKind::Item, 2).unwrap();
        assert_eq!(value, json!({"id": 2, "name": "Pen", "price": 1.5, "reviews": []}));
    }

    #[test]
    fn test_item_root_terminates_through_customer() {
        let g = scenario();
        let value = serializer().serialize(&g, EntityKind::Item, 1).unwrap();
        assert_eq!(
            value,
            json!({
                "id": 1,
                "name": "Mug",
                "price": 9.99,
                "reviews": [
                    {"id": 1, "comment": "Nice", "customer": {"id": 1, "name": "Ana"}}
                ]
            })
        );
    }

    #[test]
    fn test_null_to_one_serializes_as_null() {
        let mut g = scenario();
        g.new_review(None, None, Some(1)).unwrap();
        let value = serializer().serialize(&g, EntityKind::Review, 2).unwrap();
        assert_eq!(value["customer"], Value::Null);
        assert_eq!(value["comment"], Value::Null);
        assert!(value.as_object().unwrap().contains_key("customer"));
    }

    #[test]
    fn test_exclusion_is_by_path_not_type() {
        // Customer is omitted under reviews.customer but kept at the root and under review.customer
        let g = scenario();
        let s = serializer();
        let customer = s.serialize(&g, EntityKind::Customer, 1).unwrap();
        assert_eq!(customer["name"], "Ana");
        let review = s.serialize(&g, EntityKind::Review, 1).unwrap();
        assert_eq!(review["customer"]["name"], "Ana");
    }

    #[test]
    fn test_include_rules_add_foreign_keys_and_derived_view() {
        let g = scenario();
        let s = serializer();
        let rec = g.record(EntityKind::Customer, 1).unwrap();
        let value = s
            .serialize_with_rules(&g, rec, &["items", "reviews.item_id"])
            .unwrap();

        assert_eq!(value["items"], json!([{"id": 1, "name": "Mug", "price": 9.99, "reviews": [{"id": 1, "comment": "Nice", "customer": {"id": 1, "name": "Ana"}}]}]));
        assert_eq!(value["reviews"][0]["item_id"], 1);
        assert!(value["reviews"][0].get("customer_id").is_none());
    }

    #[test]
    fn test_extra_exclude_rule() {
        let g = scenario();
        let rec = g.record(EntityKind::Review, 1).unwrap();
        let value = serializer().serialize_with_rules(&g, rec, &["-item"]).unwrap();
        assert!(value.get("item").is_none());
        assert!(value.get("customer").is_some());
    }

    #[test]
    fn test_unknown_extra_rule_is_rejected() {
        let g = scenario();
        let rec = g.record(EntityKind::Review, 1).unwrap();
        let err = serializer()
            .serialize_with_rules(&g, rec, &["-customer.orders"])
            .unwrap_err();
        assert!(matches!(err, ReviewgraphError::Rule { .. }));
    }

    #[test]
    fn test_unknown_model_rule_fails_at_construction() {
        let err = serializer()
            .with_model_rules(EntityKind::Item, &["-reviews.buyer"])
            .unwrap_err();
        assert!(matches!(err, ReviewgraphError::Rule { entity: "Item", .. }));
    }

    #[test]
    fn test_dangling_foreign_key_fails() {
        let g = EntityGraph::from_rows(
            vec![Customer { id: 1, name: "Ana".into() }],
            vec![],
            vec![Review { id: 1, comment: None, customer_id: Some(1), item_id: Some(5) }],
        )
        .unwrap();
        let err = serializer().serialize(&g, EntityKind::Review, 1).unwrap_err();
        assert!(matches!(err, ReviewgraphError::Integrity(_)));
    }

    #[test]
    fn test_missing_rules_hit_recursion_limit() {
        let g = scenario();
        let s = Serializer::new(4)
            .unwrap()
            .with_model_rules::<&str>(EntityKind::Customer, &[])
            .unwrap()
            .with_model_rules::<&str>(EntityKind::Review, &[])
            .unwrap();

        let err = s.serialize(&g, EntityKind::Customer, 1).unwrap_err();
        match err {
            ReviewgraphError::RecursionLimit { path, max_depth } => {
                assert_eq!(max_depth, 4);
                assert!(path.starts_with("reviews.customer.reviews"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_serialize_many_keeps_order() {
        let mut g = scenario();
        g.new_customer("Bo").unwrap();
        let value = serializer()
            .serialize_many(&g, g.records(EntityKind::Customer))
            .unwrap();
        let names: Vec<&str> = value
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Ana", "Bo"]);
        assert_eq!(value[1]["reviews"], json!([]));
    }

    #[test]
    fn test_zero_depth_rejected() {
        assert!(matches!(Serializer::new(0), Err(ReviewgraphError::Config(_))));
    }
}
