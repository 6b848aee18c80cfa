use std::collections::{BTreeMap, BTreeSet};

use crate::scope::{Dialect, Scope};

/// How two models are associated. Only the first three are reachable from an
///  expression; the remaining kinds exist so that a registry can describe
///  them and the compiler can name them when rejecting an access.
#[derive(strum_macros::Display, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RelationshipKind {
    BelongsTo,
    HasOne,
    HasMany,
    HasAndBelongsToMany,
    Through,
}

fn default_primary_key() -> String {
    "id".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Relationship {
    pub name: String,
    pub kind: RelationshipKind,
    pub target_table: String,
    /// For BelongsTo this column lives on the owning table, for the has-*
    ///  kinds it lives on the target table.
    pub foreign_key: String,
    #[cfg_attr(feature = "serde", serde(default = "default_primary_key"))]
    pub target_primary_key: String,
}

impl Relationship {
    pub fn new(
        name: impl Into<String>,
        kind: RelationshipKind,
        target_table: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            target_table: target_table.into(),
            foreign_key: foreign_key.into(),
            target_primary_key: default_primary_key(),
        }
    }

    pub fn belongs_to(
        name: impl Into<String>,
        target_table: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self::new(name, RelationshipKind::BelongsTo, target_table, foreign_key)
    }

    pub fn has_one(
        name: impl Into<String>,
        target_table: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self::new(name, RelationshipKind::HasOne, target_table, foreign_key)
    }

    pub fn has_many(
        name: impl Into<String>,
        target_table: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self::new(name, RelationshipKind::HasMany, target_table, foreign_key)
    }

    pub fn with_target_primary_key(mut self, primary_key: impl Into<String>) -> Self {
        self.target_primary_key = primary_key.into();
        self
    }
}

/// The model metadata an expression is checked against. Implement this to
///  plug in an existing ORM's reflection data; [Schema] is an in-memory
///  implementation.
pub trait ModelRegistry {
    /// Whether `name` is a column of `model`.
    fn attribute_exists(&self, model: &str, name: &str) -> bool;

    /// The relationship called `name` declared on `model`, if any.
    fn lookup_relationship(&self, model: &str, name: &str) -> Option<&Relationship>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Model {
    pub table_name: String,
    #[cfg_attr(feature = "serde", serde(default = "default_primary_key"))]
    pub primary_key: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub attributes: BTreeSet<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub relationships: Vec<Relationship>,
}

impl Model {
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            primary_key: default_primary_key(),
            attributes: BTreeSet::new(),
            relationships: Vec::new(),
        }
    }

    pub fn primary_key(mut self, primary_key: impl Into<String>) -> Self {
        self.primary_key = primary_key.into();
        self
    }

    pub fn attributes<I, A>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        self.attributes.extend(attributes.into_iter().map(Into::into));
        self
    }

    pub fn relationship(mut self, relationship: Relationship) -> Self {
        self.relationships.push(relationship);
        self
    }

    pub fn find_relationship(&self, name: &str) -> Option<&Relationship> {
        self.relationships.iter().find(|r| r.name == name)
    }
}

/// In-memory [ModelRegistry] keyed by model name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Schema {
    models: BTreeMap<String, Model>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn model(mut self, name: impl Into<String>, model: Model) -> Self {
        self.insert(name, model);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, model: Model) -> Option<Model> {
        self.models.insert(name.into(), model)
    }

    pub fn get(&self, name: &str) -> Option<&Model> {
        self.models.get(name)
    }

    /// An initial scope rooted at `model`, or None if the model is unknown.
    pub fn scope(&self, model: &str, dialect: Dialect) -> Option<Scope<'_>> {
        let m = self.get(model)?;
        Some(Scope::new(self, model, &m.table_name, &m.primary_key).with_dialect(dialect))
    }
}

impl ModelRegistry for Schema {
    fn attribute_exists(&self, model: &str, name: &str) -> bool {
        self.get(model)
            .is_some_and(|m| m.attributes.contains(name))
    }

    fn lookup_relationship(&self, model: &str, name: &str) -> Option<&Relationship> {
        self.get(model)?.find_relationship(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Schema {
        Schema::new().model(
            "User",
            Model::new("users")
                .attributes(["name", "email"])
                .relationship(Relationship::has_many("orders", "orders", "user_id")),
        )
    }

    #[test]
    fn registry_lookups() {
        let schema = schema();
        assert!(schema.attribute_exists("User", "name"));
        assert!(!schema.attribute_exists("User", "orders"));
        assert!(!schema.attribute_exists("Order", "name"));

        let orders = schema
            .lookup_relationship("User", "orders")
            .expect("orders relationship");
        assert_eq!(orders.kind, RelationshipKind::HasMany);
        assert_eq!(orders.target_primary_key, "id");
        assert!(schema.lookup_relationship("User", "name").is_none());
    }

    #[test]
    fn kind_names() {
        assert_eq!(RelationshipKind::BelongsTo.to_string(), "BelongsTo");
        assert_eq!(
            RelationshipKind::HasAndBelongsToMany.to_string(),
            "HasAndBelongsToMany"
        );
    }

    #[test]
    fn scope_for_unknown_model() {
        let schema = schema();
        assert!(schema.scope("Nope", Dialect::Postgres).is_none());
        let scope = schema.scope("User", Dialect::Sqlite).expect("a scope");
        assert_eq!(scope.model(), "User");
        assert_eq!(scope.dialect(), Dialect::Sqlite);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn deserialize_schema() {
        let json = r#"{
            "Order": {
                "table_name": "orders",
                "attributes": ["total"],
                "relationships": [
                    {"name": "customer", "kind": "BelongsTo", "target_table": "users", "foreign_key": "user_id"}
                ]
            }
        }"#;
        let schema: Schema = serde_json::from_str(json).expect("valid schema json");
        let model = schema.get("Order").expect("Order model");
        assert_eq!(model.primary_key, "id");
        assert_eq!(
            model.find_relationship("customer"),
            Some(&Relationship::belongs_to("customer", "users", "user_id"))
        );
    }
}
