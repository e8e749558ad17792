use crate::expr::{Expr, LiteralValue};

/// Converts an expression to a fully parenthesised prefix form, e.g.
/// `(* (- 123) (group 45.67))`.  Diagnostics only: nothing downstream
/// consumes this string.
pub struct AstPrinter;

impl AstPrinter {
    pub fn print(expr: &Expr) -> String {
        match expr {
            // ── literals ────────────────────────────────────────────────
            Expr::Literal(lit) => match lit {
                LiteralValue::True => "true".into(),

                LiteralValue::False => "false".into(),

                LiteralValue::Nil => "nil".into(),

                LiteralValue::Str(s) => s.clone(),

                LiteralValue::Number(n) => {
                    if n.fract() == 0.0 {
                        // 3 → 3.0
                        format!("{:.1}", n)
                    } else {
                        n.to_string()
                    }
                }
            },

            Expr::Grouping(inner) => Self::parenthesize("group", &[inner.as_ref()]),

            Expr::Unary { operator, right } => Self::parenthesize(&operator.lexeme, &[right.as_ref()]),

            Expr::Binary {
                left,
                operator,
                right,
            }
            | Expr::Logical {
                left,
                operator,
                right,
            } => Self::parenthesize(&operator.lexeme, &[left.as_ref(), right.as_ref()]),

            Expr::Variable { name, .. } => name.lexeme.clone(),

            Expr::Assign { name, value, .. } => {
                format!("(= {} {})", name.lexeme, Self::print(value))
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                let mut parts: Vec<&Expr> = Vec::with_capacity(arguments.len() + 1);
                parts.push(callee.as_ref());
                parts.extend(arguments.iter());
                Self::parenthesize("call", &parts)
            }

            Expr::Get { object, name } => {
                format!("(. {} {})", Self::print(object), name.lexeme)
            }

            Expr::Set {
                object,
                name,
                value,
            } => format!(
                "(= (. {} {}) {})",
                Self::print(object),
                name.lexeme,
                Self::print(value)
            ),

            Expr::This { .. } => "this".into(),

            Expr::Super { method, .. } => format!("(super {})", method.lexeme),
        }
    }

    fn parenthesize(name: &str, exprs: &[&Expr]) -> String {
        let mut s = format!("({}", name);
        for expr in exprs {
            s.push(' ');
            s.push_str(&Self::print(expr));
        }
        s.push(')');
        s
    }
}
