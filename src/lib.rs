//! Compiles ESQL, a small expression language over a model's attributes and
//!  relationships, into SQL fragments plus the joins those fragments need.
//!
//! ```
//! use esql::{Dialect, Model, Relationship, Schema};
//!
//! let schema = Schema::new().model(
//!     "User",
//!     Model::new("users")
//!         .attributes(["name"])
//!         .relationship(Relationship::has_many("orders", "orders", "user_id")),
//! );
//! let scope = schema.scope("User", Dialect::Postgres).unwrap();
//! let (scope, sql) = esql::compile("orders.count > 3", scope).unwrap();
//! assert_eq!(sql, "orders__count___inner.count > 3");
//! assert_eq!(scope.joins().len(), 1);
//! ```

use tracing::debug;

pub mod ast;
pub mod config;
pub mod error;
pub mod evaluate;
pub mod functions;
#[doc(hidden)]
pub mod fuzz_helper;
pub mod lex;
pub mod parser;
pub mod schema;
pub mod scope;


pub use config::Options;
pub use error::{Error, Result};
pub use schema::{Model, ModelRegistry, Relationship, RelationshipKind, Schema};
pub use scope::{Dialect, Join, QueryScope, Scope};

/// Parses `expression` and compiles it against `scope`, returning the scope
///  extended with any joins the expression needs and the SQL fragment.
pub fn compile<S: QueryScope>(expression: &str, scope: S) -> Result<(S, String)> {
    compile_with(expression, scope, &Options::default())
}

pub fn compile_with<S: QueryScope>(
    expression: &str,
    scope: S,
    options: &Options,
) -> Result<(S, String)> {
    debug!(expression, table = scope.table_name(), "compiling expression");

    if let Some(max_length) = options.max_length
        && expression.len() > max_length
    {
        debug!(length = expression.len(), max_length, "expression too long");
        return Err(Error::ExpressionTooLong {
            length: expression.len(),
            max_length,
        });
    }

    let tree = parser::parse_with_depth(expression, options.max_depth)
        .inspect_err(|e| debug!(error = %e, position = ?e.position(), "parse failed"))?;

    let (scope, sql) = evaluate::evaluate(&tree, scope)
        .inspect_err(|e| debug!(error = %e, "compilation failed"))?;
    debug!(sql = %sql, "compiled expression");
    Ok((scope, sql))
}
