use crate::{
    Function,
    Value,
};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Mul,
    Div,
    Rem,
    Add,
    Sub,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

/// Short-circuiting operators, they evaluate to one of their operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Coalesce,
}

/// Parsed `${...}` expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    /// Dotted path into the current record, e.g. `position.lat`.
    Field(Vec<String>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Logical(LogicalOp, Box<Expr>, Box<Expr>),
    Conditional(Box<Expr>, Box<Expr>, Box<Expr>),
    Call(Function, Vec<Expr>),
}

impl Expr {
    /// Evaluate against a record. Absent records and fields are `undefined`.
    pub fn eval(&self, scope: Option<&serde_json::Value>) -> Value {
        match self {
            Expr::Literal(value) => value.clone(),
            Expr::Field(path) => lookup(scope, path),
            Expr::Unary(op, operand) => {
                let value = operand.eval(scope);
                match op {
                    UnaryOp::Neg => Value::Number(-value.to_number()),
                    UnaryOp::Plus => Value::Number(value.to_number()),
                    UnaryOp::Not => Value::Bool(!value.truthy()),
                }
            }
            Expr::Binary(op, lhs, rhs) => eval_binary(*op, lhs.eval(scope), rhs.eval(scope)),
            Expr::Logical(op, lhs, rhs) => {
                let left = lhs.eval(scope);
                let take_left = match op {
                    LogicalOp::And => !left.truthy(),
                    LogicalOp::Or => left.truthy(),
                    LogicalOp::Coalesce => !left.is_nullish(),
                };
                if take_left {
                    left
                } else {
                    rhs.eval(scope)
                }
            }
            Expr::Conditional(cond, then, otherwise) => {
                if cond.eval(scope).truthy() {
                    then.eval(scope)
                } else {
                    otherwise.eval(scope)
                }
            }
            Expr::Call(function, args) => {
                let args = args.iter().map(|arg| arg.eval(scope)).collect::<Vec<_>>();
                function.call(&args)
            }
        }
    }
}

fn lookup(scope: Option<&serde_json::Value>, path: &[String]) -> Value {
    let mut current = scope;
    for segment in path {
        current = current.and_then(|value| value.get(segment.as_str()));
    }
    current.map(Value::from).unwrap_or(Value::Undefined)
}

fn eval_binary(op: BinaryOp, left: Value, right: Value) -> Value {
    match op {
        BinaryOp::Add if left.is_string_like() || right.is_string_like() => Value::String(format!("{left}{right}")),
        BinaryOp::Add => Value::Number(left.to_number() + right.to_number()),
        BinaryOp::Sub => Value::Number(left.to_number() - right.to_number()),
        BinaryOp::Mul => Value::Number(left.to_number() * right.to_number()),
        BinaryOp::Div => Value::Number(left.to_number() / right.to_number()),
        BinaryOp::Rem => Value::Number(left.to_number() % right.to_number()),
        BinaryOp::Eq => Value::Bool(left.loose_eq(&right)),
        BinaryOp::Ne => Value::Bool(!left.loose_eq(&right)),
        BinaryOp::Lt => Value::Bool(compare(&left, &right).is_some_and(Ordering::is_lt)),
        BinaryOp::Le => Value::Bool(compare(&left, &right).is_some_and(Ordering::is_le)),
        BinaryOp::Gt => Value::Bool(compare(&left, &right).is_some_and(Ordering::is_gt)),
        BinaryOp::Ge => Value::Bool(compare(&left, &right).is_some_and(Ordering::is_ge)),
    }
}

/// Strings compare lexically, everything else numerically. `NaN` is unordered.
fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (a, b) => a.to_number().partial_cmp(&b.to_number()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn field(path: &str) -> Box<Expr> {
        Box::new(Expr::Field(path.split('.').map(str::to_string).collect()))
    }

    fn num(n: f64) -> Box<Expr> {
        Box::new(Expr::Literal(Value::Number(n)))
    }

    #[test]
    fn resolves_nested_fields() {
        let record = json!({"position": {"lat": 1.5, "lon": 2}});
        assert_eq!(field("position.lat").eval(Some(&record)), Value::Number(1.5));
        assert_eq!(field("position.alt").eval(Some(&record)), Value::Undefined);
        assert_eq!(field("missing.deeper").eval(Some(&record)), Value::Undefined);
        assert_eq!(field("position.lat").eval(None), Value::Undefined);
    }

    #[test]
    fn arithmetic_on_missing_values_is_nan() {
        let expr = Expr::Binary(BinaryOp::Mul, field("altitude"), num(2.0));
        match expr.eval(Some(&json!({}))) {
            Value::Number(n) => assert!(n.is_nan()),
            other => panic!("expected NaN, got {other:?}"),
        }
    }

    #[test]
    fn addition_concatenates_with_strings() {
        let expr = Expr::Binary(
            BinaryOp::Add,
            Box::new(Expr::Literal(Value::String("speed: ".into()))),
            field("speed"),
        );
        assert_eq!(expr.eval(None), Value::String("speed: undefined".into()));
        assert_eq!(
            expr.eval(Some(&json!({"speed": 3}))),
            Value::String("speed: 3".into())
        );
    }

    #[test]
    fn coalesce_only_replaces_nullish() {
        let expr = Expr::Logical(LogicalOp::Coalesce, field("speed"), num(-1.0));
        assert_eq!(expr.eval(Some(&json!({"speed": 0}))), Value::Number(0.0));
        assert_eq!(expr.eval(Some(&json!({"speed": null}))), Value::Number(-1.0));
        assert_eq!(expr.eval(None), Value::Number(-1.0));
    }

    #[test]
    fn logical_operators_return_operands() {
        let or = Expr::Logical(LogicalOp::Or, field("speed"), num(5.0));
        assert_eq!(or.eval(Some(&json!({"speed": 0}))), Value::Number(5.0));
        assert_eq!(or.eval(Some(&json!({"speed": 2}))), Value::Number(2.0));

        let and = Expr::Logical(LogicalOp::And, field("speed"), num(5.0));
        assert_eq!(and.eval(None), Value::Undefined);
        assert_eq!(and.eval(Some(&json!({"speed": 2}))), Value::Number(5.0));
    }

    #[test]
    fn comparisons_with_nan_are_false() {
        let expr = Expr::Binary(BinaryOp::Lt, field("missing"), num(1.0));
        assert_eq!(expr.eval(None), Value::Bool(false));
        let expr = Expr::Binary(BinaryOp::Ge, field("missing"), num(1.0));
        assert_eq!(expr.eval(None), Value::Bool(false));
    }
}
