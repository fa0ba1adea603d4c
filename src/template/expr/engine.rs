//! Tree-walking evaluator for compiled expressions.
//!
//! Evaluation borrows from the scope whenever it can; only computed values
//! (operators, literals of containers, filter results) are allocated.

use std::borrow::Cow;

use super::ExprErrorKind;
use super::parser::{BinaryOp, Expr, UnaryOp};
use super::scope::Scope;
use crate::template::filters;
use crate::template::value::{Value, format_number, text_cow};

type EvalResult<'a> = Result<Cow<'a, Value>, ExprErrorKind>;

pub(crate) fn evaluate<'a>(expr: &'a Expr, scope: &Scope<'a>) -> EvalResult<'a> {
    match expr {
        Expr::Literal(value) => Ok(Cow::Borrowed(value)),
        Expr::This => Ok(Cow::Borrowed(scope.current())),
        Expr::Identifier(name) => Ok(scope
            .lookup(name)
            .map(Cow::Borrowed)
            .unwrap_or(Cow::Owned(Value::Undefined))),
        Expr::Member { object, property } => {
            let object = evaluate(object, scope)?;
            Ok(member(object, property))
        },
        Expr::Index { object, index } => {
            let object = evaluate(object, scope)?;
            let index = evaluate(index, scope)?;
            let key = match index.as_ref() {
                Value::Number(n) => format_number(*n),
                other => other.to_text().unwrap_or_default(),
            };
            Ok(member(object, &key))
        },
        Expr::Call { callee, args } => {
            let Expr::Member { object, property } = callee.as_ref() else {
                // Plain functions do not exist in the data model.
                return Ok(Cow::Owned(Value::Undefined));
            };
            let receiver = evaluate(object, scope)?;
            let args = args
                .iter()
                .map(|arg| evaluate(arg, scope).map(Cow::into_owned))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Cow::Owned(call_method(&receiver, property, &args)))
        },
        Expr::Unary { op, operand } => {
            let value = evaluate(operand, scope)?;
            let result = match op {
                UnaryOp::Not => Value::Bool(!value.is_truthy()),
                UnaryOp::Neg => Value::Number(-numeric_or_zero(&value)),
                UnaryOp::Plus => Value::Number(numeric_or_zero(&value)),
            };
            Ok(Cow::Owned(result))
        },
        Expr::Binary { op, left, right } => evaluate_binary(*op, left, right, scope),
        Expr::Conditional {
            test,
            consequent,
            alternate,
        } => {
            if evaluate(test, scope)?.is_truthy() {
                evaluate(consequent, scope)
            } else {
                evaluate(alternate, scope)
            }
        },
        Expr::Array(items) => {
            let values = items
                .iter()
                .map(|item| evaluate(item, scope).map(Cow::into_owned))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Cow::Owned(Value::Array(values)))
        },
        Expr::Object(props) => {
            let mut map = indexmap::IndexMap::with_capacity(props.len());
            for (key, value) in props {
                map.insert(key.clone(), evaluate(value, scope)?.into_owned());
            }
            Ok(Cow::Owned(Value::Object(map)))
        },
        Expr::Filter { name, input, args } => {
            let filter = filters::lookup(name)
                .ok_or_else(|| ExprErrorKind::UnknownFilter(name.clone()))?;
            let mut argv = Vec::with_capacity(args.len() + 1);
            argv.push(evaluate(input, scope)?.into_owned());
            for arg in args {
                argv.push(evaluate(arg, scope)?.into_owned());
            }
            filter(&argv).map(Cow::Owned).map_err(ExprErrorKind::Validation)
        },
    }
}

fn member<'a>(object: Cow<'a, Value>, key: &str) -> Cow<'a, Value> {
    match object {
        Cow::Borrowed(value) => match value.property_ref(key) {
            Some(found) => Cow::Borrowed(found),
            None => Cow::Owned(value.property(key)),
        },
        Cow::Owned(value) => Cow::Owned(value.into_property(key)),
    }
}

fn numeric_or_zero(value: &Value) -> f64 {
    if value.is_nullish() {
        0.0
    } else {
        value.to_number()
    }
}

fn evaluate_binary<'a>(
    op: BinaryOp,
    left: &'a Expr,
    right: &'a Expr,
    scope: &Scope<'a>,
) -> EvalResult<'a> {
    // Logical operators short-circuit and yield one of their operands.
    match op {
        BinaryOp::And => {
            let lhs = evaluate(left, scope)?;
            return if lhs.is_truthy() {
                evaluate(right, scope)
            } else {
                Ok(lhs)
            };
        },
        BinaryOp::Or => {
            let lhs = evaluate(left, scope)?;
            return if lhs.is_truthy() {
                Ok(lhs)
            } else {
                evaluate(right, scope)
            };
        },
        _ => {},
    }

    let lhs = evaluate(left, scope)?;
    let rhs = evaluate(right, scope)?;

    let result = match op {
        BinaryOp::Add => return Ok(add(lhs, rhs)),
        BinaryOp::Sub => Value::Number(numeric_or_zero(&lhs) - numeric_or_zero(&rhs)),
        BinaryOp::Mul => Value::Number(lhs.to_number() * rhs.to_number()),
        BinaryOp::Div => Value::Number(lhs.to_number() / rhs.to_number()),
        BinaryOp::Rem => Value::Number(lhs.to_number() % rhs.to_number()),
        BinaryOp::Eq => Value::Bool(lhs.loose_eq(&rhs)),
        BinaryOp::Ne => Value::Bool(!lhs.loose_eq(&rhs)),
        BinaryOp::StrictEq => Value::Bool(lhs.strict_eq(&rhs)),
        BinaryOp::StrictNe => Value::Bool(!lhs.strict_eq(&rhs)),
        BinaryOp::Lt => Value::Bool(compare(&lhs, &rhs, |o| o.is_lt())),
        BinaryOp::Le => Value::Bool(compare(&lhs, &rhs, |o| o.is_le())),
        BinaryOp::Gt => Value::Bool(compare(&lhs, &rhs, |o| o.is_gt())),
        BinaryOp::Ge => Value::Bool(compare(&lhs, &rhs, |o| o.is_ge())),
        BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
    };
    Ok(Cow::Owned(result))
}

/// `+`: an undefined operand yields the other one; any textual operand turns
/// the operation into concatenation.
fn add<'a>(lhs: Cow<'a, Value>, rhs: Cow<'a, Value>) -> Cow<'a, Value> {
    if matches!(lhs.as_ref(), Value::Undefined) {
        return rhs;
    }
    if matches!(rhs.as_ref(), Value::Undefined) {
        return lhs;
    }

    let textual = |v: &Value| {
        matches!(
            v,
            Value::String(_) | Value::Date(_) | Value::Array(_) | Value::Object(_)
        )
    };
    if textual(lhs.as_ref()) || textual(rhs.as_ref()) {
        let mut text = concat_text(&lhs).into_owned();
        text.push_str(&concat_text(&rhs));
        return Cow::Owned(Value::String(text));
    }

    Cow::Owned(Value::Number(lhs.to_number() + rhs.to_number()))
}

fn concat_text(value: &Value) -> Cow<'_, str> {
    text_cow(value).unwrap_or(Cow::Borrowed("[object Object]"))
}

fn compare(lhs: &Value, rhs: &Value, test: fn(std::cmp::Ordering) -> bool) -> bool {
    if let (Value::String(a), Value::String(b)) = (lhs, rhs) {
        return test(a.cmp(b));
    }
    lhs.to_number()
        .partial_cmp(&rhs.to_number())
        .is_some_and(test)
}

/// Built-in methods available on strings, arrays and dates. Unknown methods
/// evaluate to `undefined`.
fn call_method(receiver: &Value, method: &str, args: &[Value]) -> Value {
    let arg_text = |i: usize| {
        args.get(i)
            .and_then(|a| a.to_text())
            .unwrap_or_else(|| "undefined".to_string())
    };

    match (receiver, method) {
        (Value::String(s), "toUpperCase") => Value::String(s.to_uppercase()),
        (Value::String(s), "toLowerCase") => Value::String(s.to_lowercase()),
        (Value::String(s), "trim") => Value::String(s.trim().to_string()),
        (Value::String(s), "includes") => Value::Bool(s.contains(arg_text(0).as_str())),
        (Value::String(s), "startsWith") => Value::Bool(s.starts_with(arg_text(0).as_str())),
        (Value::String(s), "endsWith") => Value::Bool(s.ends_with(arg_text(0).as_str())),
        (Value::Array(items), "includes") => {
            let needle = args.first().cloned().unwrap_or_default();
            Value::Bool(items.iter().any(|item| item.strict_eq(&needle)))
        },
        (Value::Array(items), "join") => {
            let separator = match args.first() {
                None | Some(Value::Undefined) => ",".to_string(),
                Some(_) => arg_text(0),
            };
            let parts: Vec<String> = items
                .iter()
                .map(|item| {
                    if item.is_nullish() {
                        String::new()
                    } else {
                        concat_text(item).into_owned()
                    }
                })
                .collect();
            Value::String(parts.join(&separator))
        },
        (Value::Date(date), "format") => {
            let pattern = args.first().and_then(Value::as_str);
            Value::String(filters::format_date(date, pattern))
        },
        (Value::Date(date), "toISOString") => Value::String(
            date.with_timezone(&chrono::Utc)
                .to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        ),
        (value, "toString") => Value::String(value.render_text()),
        _ => Value::Undefined,
    }
}

#[cfg(test)]
mod tests {
    use super::super::compile;
    use super::*;
    use serde_json::json;

    fn eval(text: &str, data: serde_json::Value) -> Value {
        let data = Value::from(data);
        let scope = Scope::root(&data);
        compile(text).unwrap().evaluate(&scope).unwrap()
    }

    #[test]
    fn resolves_paths_and_missing_values() {
        let data = json!({"org": {"name": "Acme", "teams": ["a", "b"]}});
        assert_eq!(eval("org.name", data.clone()), Value::from("Acme"));
        assert_eq!(eval("org.teams[1]", data.clone()), Value::from("b"));
        assert_eq!(eval("org.teams.length", data.clone()), Value::Number(2.0));
        assert_eq!(eval("org.missing.deeper", data), Value::Undefined);
    }

    #[test]
    fn addition_follows_template_rules() {
        assert_eq!(eval("a + b", json!({"a": 1, "b": 2})), Value::Number(3.0));
        assert_eq!(eval("a + '!'", json!({"a": 1})), Value::from("1!"));
        assert_eq!(eval("missing + 'x'", json!({})), Value::from("x"));
        assert_eq!(eval("missing - 2", json!({})), Value::Number(-2.0));
    }

    #[test]
    fn logical_operators_return_operands() {
        assert_eq!(eval("a || 'fallback'", json!({"a": ""})), Value::from("fallback"));
        assert_eq!(eval("a && a.b", json!({"a": {"b": 5}})), Value::Number(5.0));
        assert_eq!(eval("!a", json!({"a": 0})), Value::Bool(true));
    }

    #[test]
    fn comparisons_and_ternary() {
        let data = json!({"n": 3, "s": "b"});
        assert_eq!(eval("n > 2 ? 'big' : 'small'", data.clone()), Value::from("big"));
        assert_eq!(eval("s < 'c'", data.clone()), Value::Bool(true));
        assert_eq!(eval("n == '3'", data.clone()), Value::Bool(true));
        assert_eq!(eval("n === '3'", data), Value::Bool(false));
    }

    #[test]
    fn string_and_array_methods() {
        let data = json!({"name": " Ada ", "tags": ["x", "y"]});
        assert_eq!(eval("name.trim().toUpperCase()", data.clone()), Value::from("ADA"));
        assert_eq!(eval("tags.join(' / ')", data.clone()), Value::from("x / y"));
        assert_eq!(eval("tags.includes('y')", data.clone()), Value::Bool(true));
        assert_eq!(eval("name.nope()", data), Value::Undefined);
    }

    #[test]
    fn this_refers_to_current_frame() {
        assert_eq!(eval("this", json!("plain")), Value::from("plain"));
        assert_eq!(eval(".", json!("plain")), Value::from("plain"));
    }

    #[test]
    fn filters_receive_input_and_arguments() {
        let data = json!({"items": [1, 2, 3, 4]});
        assert_eq!(
            eval("items | limit:2:1", data),
            Value::from(json!([2, 3]))
        );
    }
}
