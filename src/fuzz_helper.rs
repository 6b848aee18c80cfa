use crate::{Dialect, Model, Relationship, RelationshipKind, Schema, compile, evaluate, parser};

/// Small schema exercising every relationship kind; shared by the fuzz
///  targets and the benches.
pub fn fixture_schema() -> Schema {
    Schema::new()
        .model(
            "Order",
            Model::new("orders")
                .attributes(["id", "total", "status", "note", "created_at"])
                .relationship(Relationship::belongs_to("customer", "customers", "customer_id"))
                .relationship(Relationship::has_one("invoice", "invoices", "order_id"))
                .relationship(Relationship::has_many("items", "line_items", "order_id"))
                .relationship(Relationship::new(
                    "labels",
                    RelationshipKind::Through,
                    "labels",
                    "order_id",
                )),
        )
        .model(
            "Customer",
            Model::new("customers")
                .attributes(["id", "name", "email"])
                .relationship(Relationship::has_many("orders", "orders", "customer_id")),
        )
}

/// Compiles arbitrary input against [fixture_schema], ignoring errors. Panics
///  only if the compiler does.
pub fn compile_expr(expr: &str) {
    let schema = fixture_schema();
    for dialect in [Dialect::Postgres, Dialect::Mysql] {
        if let Some(scope) = schema.scope("Order", dialect) {
            _ = compile(expr, scope);
        }
    }
}

/// Parses, prints and reparses `expr`; a successfully parsed tree must
///  print to text that parses back to an identical tree, parentheses
///  included. Panics if it doesn't.
pub fn reparse_expr(expr: &str) {
    let Ok(tree) = parser::parse(expr) else {
        return;
    };
    let printed = tree.to_string();
    match parser::parse(&printed) {
        Ok(reparsed) => assert_eq!(tree, reparsed, "{expr:?} printed as {printed:?}"),
        Err(e) => panic!("printed tree {printed:?} failed to parse: {e}"),
    }
    if let Some(scope) = fixture_schema().scope("Customer", Dialect::Sqlite) {
        _ = evaluate::evaluate(&tree, scope);
    }
}
