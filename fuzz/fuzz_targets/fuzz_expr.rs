#![no_main]
use libfuzzer_sys::fuzz_target;

use arbitrary::{Arbitrary, Unstructured};

// Pieces of the expression grammar, weighted toward names the fixture schema
//  knows so that inputs get past the parser into relationship resolution.
const PIECES: &[&str] = &[
    "total", "status", "note", "customer", "invoice", "items", "labels", "name", "count", "COUNT",
    "null", "concat", "0", "42", "-7", "1.5e3", "\"x\"", "\"a\\\"b\\\\\"", ".", ",", "(", ")",
    "+", "-", "*", "/", "<", "<=", ">", ">=", "==", "!=", " ",
];

const MAX_PIECES: usize = 512;

#[derive(Debug)]
struct ExprInput {
    expr: String,
}

impl<'a> Arbitrary<'a> for ExprInput {
    fn arbitrary(u: &mut Unstructured<'a>) -> arbitrary::Result<Self> {
        let mut expr = String::new();
        for _ in 0..MAX_PIECES {
            if u.is_empty() {
                break;
            }
            // Mostly grammar pieces, occasionally raw text
            if u.ratio(1, 16)? {
                let raw: &str = u.arbitrary()?;
                expr.push_str(raw);
            } else {
                expr.push_str(u.choose(PIECES)?);
            }
        }
        Ok(ExprInput { expr })
    }
}

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = Unstructured::new(data).arbitrary::<ExprInput>() {
        esql::fuzz_helper::compile_expr(&input.expr);
        esql::fuzz_helper::reparse_expr(&input.expr);
    }
});
