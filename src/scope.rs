use std::fmt::{Debug, Formatter};

use tracing::trace;

use crate::schema::{ModelRegistry, Relationship, RelationshipKind};

/// SQL flavor used for quoting string literals.
#[derive(strum_macros::Display, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Dialect {
    #[default]
    Postgres,
    Sqlite,
    Mysql,
}

impl Dialect {
    /// Wraps `value` in single quotes so it can be embedded in SQL text.
    pub fn quote_string_literal(&self, value: &str) -> String {
        let mut res = String::with_capacity(value.len() + 2);
        res.push('\'');
        for c in value.chars() {
            match (self, c) {
                (_, '\'') => res.push_str("''"),
                (Dialect::Mysql, '\\') => res.push_str("\\\\"),
                _ => res.push(c),
            }
        }
        res.push('\'');
        res
    }
}

/// The query being built while an expression is compiled. Every method that
///  adds a join consumes the scope and hands back the extended one, so a
///  scope value is never changed behind a caller's back.
pub trait QueryScope: Sized {
    /// Table that unqualified attributes resolve against.
    fn table_name(&self) -> &str;

    fn primary_key(&self) -> &str;

    fn attribute_exists(&self, name: &str) -> bool;

    fn relationship(&self, name: &str) -> Option<Relationship>;

    /// Join along the relationship's own join condition.
    fn with_association_join(self, relationship: &Relationship) -> Self;

    /// Join using a complete SQL join clause.
    fn with_raw_join(self, clause: String) -> Self;

    fn quote_string_literal(&self, value: &str) -> String;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Join {
    Association { relationship: String, sql: String },
    Raw(String),
}

impl Join {
    pub fn sql(&self) -> &str {
        match self {
            Join::Association { sql, .. } | Join::Raw(sql) => sql,
        }
    }
}

/// Default [QueryScope]: a model rooted in a [ModelRegistry] plus the joins
///  accumulated so far, rendered as SQL text. Joins are kept in the order
///  they were added and are never merged.
#[derive(Clone)]
pub struct Scope<'a> {
    registry: &'a dyn ModelRegistry,
    model: String,
    table_name: String,
    primary_key: String,
    dialect: Dialect,
    joins: Vec<Join>,
}

impl<'a> Scope<'a> {
    pub fn new(
        registry: &'a dyn ModelRegistry,
        model: impl Into<String>,
        table_name: impl Into<String>,
        primary_key: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            model: model.into(),
            table_name: table_name.into(),
            primary_key: primary_key.into(),
            dialect: Dialect::default(),
            joins: Vec::new(),
        }
    }

    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    /// All joins, one clause per line.
    pub fn join_sql(&self) -> String {
        self.joins
            .iter()
            .map(Join::sql)
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn push(mut self, join: Join) -> Self {
        trace!(model = %self.model, join = join.sql(), "adding join");
        self.joins.push(join);
        self
    }
}

impl Debug for Scope<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("model", &self.model)
            .field("table_name", &self.table_name)
            .field("primary_key", &self.primary_key)
            .field("dialect", &self.dialect)
            .field("joins", &self.joins)
            .finish_non_exhaustive()
    }
}

impl QueryScope for Scope<'_> {
    fn table_name(&self) -> &str {
        &self.table_name
    }

    fn primary_key(&self) -> &str {
        &self.primary_key
    }

    fn attribute_exists(&self, name: &str) -> bool {
        self.registry.attribute_exists(&self.model, name)
    }

    fn relationship(&self, name: &str) -> Option<Relationship> {
        self.registry
            .lookup_relationship(&self.model, name)
            .cloned()
    }

    fn with_association_join(self, relationship: &Relationship) -> Self {
        let target = &relationship.target_table;
        let sql = match relationship.kind {
            RelationshipKind::BelongsTo => format!(
                "INNER JOIN {target} ON {target}.{} = {}.{}",
                relationship.target_primary_key, self.table_name, relationship.foreign_key
            ),
            _ => format!(
                "INNER JOIN {target} ON {target}.{} = {}.{}",
                relationship.foreign_key, self.table_name, self.primary_key
            ),
        };
        self.push(Join::Association {
            relationship: relationship.name.clone(),
            sql,
        })
    }

    fn with_raw_join(self, clause: String) -> Self {
        self.push(Join::Raw(clause))
    }

    fn quote_string_literal(&self, value: &str) -> String {
        self.dialect.quote_string_literal(value)
    }
}
