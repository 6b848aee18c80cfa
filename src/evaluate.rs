use tracing::trace;

use crate::{
    ast::{Expression, unescape},
    error::{Error, Result},
    functions::Function,
    schema::{Relationship, RelationshipKind},
    scope::QueryScope,
};

/// Appended to a relationship name to name its count column.
pub const COUNT_SUFFIX: &str = "__count";
/// Appended to the count column name to alias the derived count table.
pub const INNER_SUFFIX: &str = "___inner";

/// Compiles an expression tree into a SQL fragment. The scope is threaded
///  through the tree left to right: whatever joins a node adds are visible to
///  every node evaluated after it, and the final scope is returned alongside
///  the SQL.
pub fn evaluate<S: QueryScope>(expr: &Expression<'_>, scope: S) -> Result<(S, String)> {
    match expr {
        Expression::Parenthesized(inner) => {
            let (scope, sql) = evaluate(inner, scope)?;
            Ok((scope, format!("({sql})")))
        }
        Expression::BinaryOperator(l, op, r) => {
            let (scope, lhs) = evaluate(l, scope)?;
            let (scope, rhs) = evaluate(r, scope)?;
            Ok((scope, format!("{lhs} {} {rhs}", op.sql())))
        }
        Expression::Null => Ok((scope, "null".to_string())),
        Expression::NumberLiteral(text) => Ok((scope, text.to_string())),
        Expression::StringLiteral(raw) => {
            let sql = scope.quote_string_literal(&unescape(raw));
            Ok((scope, sql))
        }
        Expression::FunctionCall { name, args } => {
            let function =
                Function::try_from(*name).map_err(|()| Error::InvalidFunction(name.to_string()))?;
            function.call(args, scope)
        }
        Expression::Attribute(name) => {
            if scope.attribute_exists(name) {
                let sql = format!("{}.{name}", scope.table_name());
                Ok((scope, sql))
            } else {
                Err(Error::InvalidAttribute(name.to_string()))
            }
        }
        Expression::RelatedAttribute {
            relationship,
            column,
        } => related_attribute(relationship, column, scope),
        Expression::RelatedCount(relationship) => related_count(relationship, scope),
    }
}

fn resolve<S: QueryScope>(scope: &S, name: &str) -> Result<Relationship> {
    scope
        .relationship(name)
        .ok_or_else(|| Error::InvalidRelationship(name.to_string()))
}

fn mismatch(relationship: &Relationship) -> Error {
    Error::RelationshipTypeMismatch {
        relationship: relationship.name.clone(),
        kind: relationship.kind,
    }
}

// `owner.name`: only to-one relationships can be dereferenced. The column is
//  not checked against the target model.
fn related_attribute<S: QueryScope>(name: &str, column: &str, scope: S) -> Result<(S, String)> {
    let relationship = resolve(&scope, name)?;
    match relationship.kind {
        RelationshipKind::BelongsTo | RelationshipKind::HasOne => {
            let sql = format!("{}.{column}", relationship.target_table);
            Ok((scope.with_association_join(&relationship), sql))
        }
        _ => Err(mismatch(&relationship)),
    }
}

// `items.count`: left join a per-foreign-key count of the target table so
//  rows without children still match (with a NULL count).
fn related_count<S: QueryScope>(name: &str, scope: S) -> Result<(S, String)> {
    let relationship = resolve(&scope, name)?;
    if relationship.kind != RelationshipKind::HasMany {
        return Err(mismatch(&relationship));
    }

    let alias = format!("{name}{COUNT_SUFFIX}{INNER_SUFFIX}");
    let clause = count_join(&relationship, &alias, scope.table_name(), scope.primary_key());
    trace!(relationship = name, alias = %alias, "synthesized count join");
    let sql = format!("{alias}.count");
    Ok((scope.with_raw_join(clause), sql))
}

fn count_join(relationship: &Relationship, alias: &str, table: &str, primary_key: &str) -> String {
    let fk = &relationship.foreign_key;
    format!(
        "LEFT JOIN (SELECT {fk}, COUNT(*) AS count FROM {} GROUP BY {fk}) AS {alias} ON {alias}.{fk} = {table}.{primary_key}",
        relationship.target_table
    )
}
