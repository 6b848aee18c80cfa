use esql::{Dialect, fuzz_helper::fixture_schema, parser::parse};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let schema = fixture_schema();

    for line in std::io::stdin().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                eprintln!("Error reading input: {e}");
                break;
            }
        };
        let now = std::time::Instant::now();
        let res = parse(&line);
        print!("[in {}μs] ", now.elapsed().as_micros());
        let tree = match res {
            Err(e) => {
                println!("Error parsing input: {e}");
                continue;
            }
            Ok(tree) => tree,
        };
        println!("{tree:#}");

        let Some(scope) = schema.scope("Order", Dialect::Postgres) else {
            continue;
        };
        match esql::evaluate::evaluate(&tree, scope) {
            Ok((scope, sql)) => {
                println!("  sql: {sql}");
                for join in scope.joins() {
                    println!("  join: {}", join.sql());
                }
            }
            Err(e) => println!("  error: {e}"),
        }
    }
}
