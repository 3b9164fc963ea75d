#![allow(clippy::redundant_closure_call)]

peg::parser! {
    pub(crate) grammar subscription() for str {
        use crate::query::{CompareOp, Conjunction, Expr, Function, Literal};
        use actionkit_core::FieldPath;

        rule _()
            = quiet!{[' ' | '\t' | '\n' | '\r']*}

        rule ident_start()
            = ['a'..='z' | 'A'..='Z' | '_' | '$']

        rule ident_char()
            = ['a'..='z' | 'A'..='Z' | '0'..='9' | '_' | '$']

        rule kw_and() = "and" !ident_char()
        rule kw_or()  = "or" !ident_char()
        rule kw_true() = "true" !ident_char()
        rule kw_false() = "false" !ident_char()
        rule kw_null() = "null" !ident_char()

        // e.g. 'properties.items.0.sku'
        rule path() -> FieldPath
            = quiet!{
                first:$(ident_start() ident_char()*) rest:("." s:$(ident_char()+) { s })* {
                    FieldPath::from_segments(std::iter::once(first).chain(rest))
                }
            }
            / expected!("a field path")

        rule escape() -> char
            = "\\" c:['"' | '\\'] { c }
            / "\\n" { '\n' }
            / "\\t" { '\t' }

        // e.g. "Order Completed"
        rule string() -> String
            = quiet!{ "\"" chars:(escape() / [^ '"' | '\\'])* "\"" { chars.into_iter().collect() } }
            / expected!("a quoted string")

        // e.g. '42', '-0.5'
        rule number() -> f64
            = n:$("-"? ['0'..='9']+ ("." ['0'..='9']+)?) {? n.parse().or(Err("a number")) }

        rule literal() -> Literal
            = s:string() { Literal::String(s) }
            / n:number() { Literal::Number(n) }
            / kw_true() { Literal::Bool(true) }
            / kw_false() { Literal::Bool(false) }

        rule operator() -> CompareOp
            = "!=" { CompareOp::Ne }
            / "<=" { CompareOp::Le }
            / ">=" { CompareOp::Ge }
            / "=" { CompareOp::Eq }
            / "<" { CompareOp::Lt }
            / ">" { CompareOp::Gt }

        rule comparison() -> Expr
            = p:path() _ "=" _ kw_null() { Expr::Missing(p) }
            / p:path() _ "!=" _ kw_null() { Expr::Exists(p) }
            / p:path() _ op:operator() _ value:literal() { Expr::Compare { path: p, op, value } }

        rule function() -> Function
            = "contains" { Function::Contains }
            / "match" { Function::Match }

        rule call() -> Expr
            = function:function() _ "(" _ p:path() _ "," _ pattern:string() _ ")" {
                Expr::Call { function, path: p, pattern }
            }

        rule group() -> Expr
            = "(" _ e:expression() _ ")" { e }

        rule primary() -> Expr
            = "!" _ e:(call() / group()) { Expr::Not(Box::new(e)) }
            / call()
            / group()
            / comparison()

        rule conjunction() -> Conjunction
            = kw_and() { Conjunction::And }
            / kw_or() { Conjunction::Or }

        rule expression() -> Expr
            = first:primary() rest:(_ c:conjunction() _ e:primary() { (c, e) })* {
                rest.into_iter().fold(first, |left, (c, right)| c.join(left, right))
            }

        pub rule query() -> Expr
            = _ e:expression() _ { e }
    }
}
