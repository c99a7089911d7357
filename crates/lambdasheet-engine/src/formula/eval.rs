//! Direct evaluation of a parsed formula against an [`Environment`].

use std::cmp::Ordering;

use super::ast::{BinaryOp, CompareOp, Expr, Formula, Index, Literal, UnaryOp};
use super::error::FormulaError;
use super::value::{Num, Value};
use crate::engine::{Builtin, Environment};

/// Run a validated formula and convert its result to a number.
pub fn execute(formula: &Formula, env: &Environment) -> Result<f64, FormulaError> {
    let value = Evaluator { env }.eval(&formula.body)?;
    value
        .to_f64()
        .ok_or_else(|| FormulaError::NonNumericResult(value.type_name().to_string()))
}

/// Evaluate a formula body to a raw value.
pub fn evaluate(formula: &Formula, env: &Environment) -> Result<Value, FormulaError> {
    Evaluator { env }.eval(&formula.body)
}

struct Evaluator<'a> {
    env: &'a Environment,
}

impl Evaluator<'_> {
    fn eval(&self, expr: &Expr) -> Result<Value, FormulaError> {
        match expr {
            Expr::Literal(lit) => Ok(match *lit {
                Literal::Int(i) => Value::Int(i),
                Literal::Float(f) => Value::Float(f),
                Literal::Bool(b) => Value::Bool(b),
                Literal::None => Value::None,
            }),
            Expr::Symbol(name) => self
                .env
                .lookup(name)
                .map(|b| b.to_value())
                .ok_or_else(|| FormulaError::UnknownSymbol(name.clone())),
            Expr::Unary { op, operand } => unary(*op, self.eval(operand)?),
            Expr::Binary { op, lhs, rhs } => {
                let lhs = self.eval(lhs)?;
                let rhs = self.eval(rhs)?;
                binary(*op, &lhs, &rhs)
            }
            Expr::Compare { first, rest } => {
                let mut left = self.eval(first)?;
                for (op, next) in rest {
                    let right = self.eval(next)?;
                    if !compare(*op, &left, &right)? {
                        return Ok(Value::Bool(false));
                    }
                    left = right;
                }
                Ok(Value::Bool(true))
            }
            Expr::Conditional {
                test,
                then,
                otherwise,
            } => {
                if self.eval(test)?.truthy() {
                    self.eval(then)
                } else {
                    self.eval(otherwise)
                }
            }
            Expr::Call { callee, args } => {
                let callee = self.eval(callee)?;
                let args = args
                    .iter()
                    .map(|a| self.eval(a))
                    .collect::<Result<Vec<_>, _>>()?;
                match callee {
                    Value::Builtin(builtin) => call_builtin(builtin, args),
                    other => Err(type_error(format!(
                        "'{}' object is not callable",
                        other.type_name()
                    ))),
                }
            }
            Expr::Subscript { target, index } => {
                let target = self.eval(target)?;
                self.subscript(target, index)
            }
        }
    }

    fn eval_opt(&self, expr: &Option<Expr>) -> Result<Value, FormulaError> {
        match expr {
            Some(e) => self.eval(e),
            None => Ok(Value::None),
        }
    }

    fn subscript(&self, target: Value, index: &Index) -> Result<Value, FormulaError> {
        match (target, index) {
            (Value::Slicer, Index::Slice { start, stop, step }) => {
                let start = self.eval_opt(start)?;
                let stop = self.eval_opt(stop)?;
                let step = self.eval_opt(step)?;
                Ok(Value::List(self.env.slice(&start, &stop, &step)?))
            }
            (Value::Slicer, Index::Item(item)) => {
                let item = self.eval(item)?;
                Err(FormulaError::range(format!(
                    "slicer indices must be a range, not {}",
                    item.type_name()
                )))
            }
            (Value::List(items), Index::Item(item)) => {
                let item = self.eval(item)?;
                list_item(items, &item)
            }
            (Value::List(items), Index::Slice { start, stop, step }) => {
                let start = self.eval_opt(start)?;
                let stop = self.eval_opt(stop)?;
                let step = self.eval_opt(step)?;
                list_slice(items, &start, &stop, &step)
            }
            (other, _) => Err(type_error(format!(
                "'{}' object is not subscriptable",
                other.type_name()
            ))),
        }
    }
}

fn type_error(message: String) -> FormulaError {
    FormulaError::RuntimeFailure(message)
}

fn unsupported(op: &str, lhs: &Value, rhs: &Value) -> FormulaError {
    type_error(format!(
        "unsupported operand type(s) for {}: '{}' and '{}'",
        op,
        lhs.type_name(),
        rhs.type_name()
    ))
}

fn unary(op: UnaryOp, operand: Value) -> Result<Value, FormulaError> {
    let bad = || {
        type_error(format!(
            "bad operand type for unary {}: '{}'",
            op.symbol(),
            operand.type_name()
        ))
    };
    match op {
        UnaryOp::Not => Ok(Value::Bool(!operand.truthy())),
        UnaryOp::Plus => operand.as_num().map(Num::into_value).ok_or_else(bad),
        UnaryOp::Neg => match operand.as_num().ok_or_else(bad)? {
            Num::Int(i) => Ok(i
                .checked_neg()
                .map(Value::Int)
                .unwrap_or(Value::Float(-(i as f64)))),
            Num::Float(f) => Ok(Value::Float(-f)),
        },
        UnaryOp::Invert => match operand.as_num() {
            Some(Num::Int(i)) => Ok(Value::Int(!i)),
            _ => Err(bad()),
        },
    }
}

fn binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, FormulaError> {
    if let (BinaryOp::Add, Value::List(a), Value::List(b)) = (op, lhs, rhs) {
        let mut out = a.clone();
        out.extend(b.iter().cloned());
        return Ok(Value::List(out));
    }
    let (Some(a), Some(b)) = (lhs.as_num(), rhs.as_num()) else {
        return Err(unsupported(op.symbol(), lhs, rhs));
    };
    arith(op, a, b).map(Num::into_value)
}

/// Integer arithmetic falls back to floats on overflow.
fn arith(op: BinaryOp, a: Num, b: Num) -> Result<Num, FormulaError> {
    if let (Num::Int(x), Num::Int(y)) = (a, b) {
        if let Some(result) = int_arith(op, x, y)? {
            return Ok(result);
        }
    }
    float_arith(op, a.as_f64(), b.as_f64()).map(Num::Float)
}

fn int_arith(op: BinaryOp, x: i64, y: i64) -> Result<Option<Num>, FormulaError> {
    let result = match op {
        BinaryOp::Add => x.checked_add(y),
        BinaryOp::Sub => x.checked_sub(y),
        BinaryOp::Mul => x.checked_mul(y),
        // True division always produces a float.
        BinaryOp::Div => None,
        BinaryOp::FloorDiv => {
            if y == 0 {
                return Err(FormulaError::runtime("integer division or modulo by zero"));
            }
            x.checked_div(y).map(|q| {
                if x % y != 0 && ((x < 0) != (y < 0)) {
                    q - 1
                } else {
                    q
                }
            })
        }
        BinaryOp::Mod => {
            if y == 0 {
                return Err(FormulaError::runtime("integer division or modulo by zero"));
            }
            Some(match x.checked_rem(y) {
                Some(r) if r != 0 && ((r < 0) != (y < 0)) => r + y,
                Some(r) => r,
                None => 0,
            })
        }
        BinaryOp::Pow => {
            if y < 0 {
                None
            } else {
                u32::try_from(y).ok().and_then(|e| x.checked_pow(e))
            }
        }
    };
    Ok(result.map(Num::Int))
}

fn float_arith(op: BinaryOp, x: f64, y: f64) -> Result<f64, FormulaError> {
    Ok(match op {
        BinaryOp::Add => x + y,
        BinaryOp::Sub => x - y,
        BinaryOp::Mul => x * y,
        BinaryOp::Div => {
            if y == 0.0 {
                return Err(FormulaError::runtime("division by zero"));
            }
            x / y
        }
        BinaryOp::FloorDiv => {
            if y == 0.0 {
                return Err(FormulaError::runtime("float floor division by zero"));
            }
            (x / y).floor()
        }
        BinaryOp::Mod => {
            if y == 0.0 {
                return Err(FormulaError::runtime("float modulo by zero"));
            }
            let r = x % y;
            if r != 0.0 && ((r < 0.0) != (y < 0.0)) {
                r + y
            } else {
                r
            }
        }
        BinaryOp::Pow => {
            if x == 0.0 && y < 0.0 {
                return Err(FormulaError::runtime(
                    "0.0 cannot be raised to a negative power",
                ));
            }
            if x < 0.0 && y.fract() != 0.0 && y.is_finite() {
                return Err(FormulaError::runtime(
                    "negative number cannot be raised to a fractional power",
                ));
            }
            x.powf(y)
        }
    })
}

fn num_cmp(a: Num, b: Num) -> Option<Ordering> {
    match (a, b) {
        (Num::Int(x), Num::Int(y)) => Some(x.cmp(&y)),
        _ => a.as_f64().partial_cmp(&b.as_f64()),
    }
}

/// Value equality; numbers compare by value whatever their representation.
fn equals(a: &Value, b: &Value) -> bool {
    if let (Some(x), Some(y)) = (a.as_num(), b.as_num()) {
        return num_cmp(x, y) == Some(Ordering::Equal);
    }
    match (a, b) {
        (Value::None, Value::None) | (Value::Slicer, Value::Slicer) => true,
        (Value::Builtin(x), Value::Builtin(y)) => x == y,
        (Value::List(x), Value::List(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(p, q)| equals(p, q))
        }
        _ => false,
    }
}

/// Identity: singletons, the same binding, or the same cell.
fn identical(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::None, Value::None) | (Value::Slicer, Value::Slicer) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Builtin(x), Value::Builtin(y)) => x == y,
        (Value::Cell(x), Value::Cell(y)) => x.at == y.at,
        _ => false,
    }
}

fn order(op: CompareOp, a: &Value, b: &Value) -> Result<Ordering, FormulaError> {
    let not_supported = || {
        type_error(format!(
            "'{}' not supported between instances of '{}' and '{}'",
            op.symbol(),
            a.type_name(),
            b.type_name()
        ))
    };
    match (a, b) {
        (Value::List(x), Value::List(y)) => {
            for (p, q) in x.iter().zip(y) {
                if !equals(p, q) {
                    return order(op, p, q);
                }
            }
            Ok(x.len().cmp(&y.len()))
        }
        _ => {
            let (Some(x), Some(y)) = (a.as_num(), b.as_num()) else {
                return Err(not_supported());
            };
            // NaN compares false against everything.
            Ok(num_cmp(x, y).unwrap_or(Ordering::Equal))
        }
    }
}

fn has_nan(a: &Value, b: &Value) -> bool {
    [a, b].iter().any(|v| v.to_f64().is_some_and(f64::is_nan))
}

fn compare(op: CompareOp, a: &Value, b: &Value) -> Result<bool, FormulaError> {
    Ok(match op {
        CompareOp::Eq => equals(a, b),
        CompareOp::NotEq => !equals(a, b),
        CompareOp::Is => identical(a, b),
        CompareOp::IsNot => !identical(a, b),
        CompareOp::In | CompareOp::NotIn => {
            let Value::List(items) = b else {
                return Err(type_error(format!(
                    "argument of type '{}' is not iterable",
                    b.type_name()
                )));
            };
            let found = items.iter().any(|item| equals(a, item));
            found == (op == CompareOp::In)
        }
        CompareOp::Lt | CompareOp::Le | CompareOp::Gt | CompareOp::Ge => {
            let ordering = order(op, a, b)?;
            if has_nan(a, b) {
                return Ok(false);
            }
            match op {
                CompareOp::Lt => ordering == Ordering::Less,
                CompareOp::Le => ordering != Ordering::Greater,
                CompareOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            }
        }
    })
}

fn iterable(value: Value) -> Result<Vec<Value>, FormulaError> {
    match value {
        Value::List(items) => Ok(items),
        other => Err(type_error(format!(
            "'{}' object is not iterable",
            other.type_name()
        ))),
    }
}

fn call_builtin(builtin: Builtin, args: Vec<Value>) -> Result<Value, FormulaError> {
    match builtin {
        Builtin::Sum => {
            if args.is_empty() || args.len() > 2 {
                return Err(type_error(format!(
                    "sum() takes 1 or 2 arguments ({} given)",
                    args.len()
                )));
            }
            let mut args = args.into_iter();
            let items = iterable(args.next().unwrap_or(Value::None))?;
            let mut total = args.next().unwrap_or(Value::Int(0));
            for item in &items {
                total = binary(BinaryOp::Add, &total, item)?;
            }
            Ok(total)
        }
        Builtin::Min | Builtin::Max => {
            let name = builtin.name();
            let items = match args.len() {
                0 => {
                    return Err(type_error(format!(
                        "{}() expected at least 1 argument, got 0",
                        name
                    )));
                }
                1 => iterable(args.into_iter().next().unwrap_or(Value::None))?,
                _ => args,
            };
            let wanted = if builtin == Builtin::Min {
                CompareOp::Lt
            } else {
                CompareOp::Gt
            };
            let mut items = items.into_iter();
            let Some(mut best) = items.next() else {
                return Err(FormulaError::runtime(format!(
                    "{}() arg is an empty sequence",
                    name
                )));
            };
            for item in items {
                if compare(wanted, &item, &best)? {
                    best = item;
                }
            }
            Ok(best)
        }
    }
}

fn int_index(value: &Value, what: &str) -> Result<Option<i64>, FormulaError> {
    match value {
        Value::None => Ok(None),
        Value::Int(i) => Ok(Some(*i)),
        Value::Bool(b) => Ok(Some(*b as i64)),
        other => Err(type_error(format!(
            "{} must be integers or None, not {}",
            what,
            other.type_name()
        ))),
    }
}

fn list_item(items: Vec<Value>, index: &Value) -> Result<Value, FormulaError> {
    let i = match index {
        Value::Int(i) => *i,
        Value::Bool(b) => *b as i64,
        other => {
            return Err(type_error(format!(
                "list indices must be integers or slices, not {}",
                other.type_name()
            )));
        }
    };
    let len = items.len() as i64;
    let i = if i < 0 { i + len } else { i };
    if !(0..len).contains(&i) {
        return Err(FormulaError::runtime("list index out of range"));
    }
    Ok(items.into_iter().nth(i as usize).unwrap_or(Value::None))
}

fn list_slice(
    items: Vec<Value>,
    start: &Value,
    stop: &Value,
    step: &Value,
) -> Result<Value, FormulaError> {
    let what = "slice indices";
    let step = int_index(step, what)?.unwrap_or(1);
    if step == 0 {
        return Err(FormulaError::runtime("slice step cannot be zero"));
    }
    let len = items.len() as i64;
    // Clamp like sequence slicing does: [lo, hi] depends on direction.
    let (lo, hi) = if step > 0 { (0, len) } else { (-1, len - 1) };
    let clamp = |bound: Option<i64>, default: i64| match bound {
        None => default,
        Some(i) if i < 0 => (i + len).max(lo),
        Some(i) => i.min(hi),
    };
    let start = clamp(int_index(start, what)?, if step > 0 { lo } else { hi });
    let stop = clamp(int_index(stop, what)?, if step > 0 { hi } else { lo });

    let mut out = Vec::new();
    let mut i = start;
    while (step > 0 && i < stop) || (step < 0 && i > stop) {
        out.push(items[i as usize].clone());
        match i.checked_add(step) {
            Some(next) => i = next,
            None => break,
        }
    }
    Ok(Value::List(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::CellRef;
    use crate::formula::parse_formula;

    fn env() -> Environment {
        let mut env = Environment::new();
        env.bind_cell(CellRef::new(1, 1), 2.0);
        env.bind_cell(CellRef::new(1, 2), 3.0);
        env.bind_cell(CellRef::new(1, 3), 4.0);
        env.bind_cell(CellRef::new(2, 1), -1.5);
        env
    }

    fn run(source: &str) -> Result<f64, FormulaError> {
        execute(&parse_formula(source).unwrap(), &env())
    }

    fn value(source: &str) -> Value {
        evaluate(&parse_formula(source).unwrap(), &env()).unwrap()
    }

    fn runtime(source: &str) -> String {
        match run(source) {
            Err(FormulaError::RuntimeFailure(m)) => m,
            other => panic!("{source:?}: expected runtime failure, got {other:?}"),
        }
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(run("lambda: 2 + 2"), Ok(4.0));
        assert_eq!(run("lambda: 2 ** 2"), Ok(4.0));
        assert_eq!(run("lambda: (2 + 4) * 3"), Ok(18.0));
        assert_eq!(run("lambda: 7 / 2"), Ok(3.5));
        assert_eq!(run("lambda: 2 ** -1"), Ok(0.5));
        assert_eq!(run("lambda: a1 * 2"), Ok(4.0));
        assert_eq!(run("lambda: -a1 + b1"), Ok(-3.5));
        assert_eq!(run("lambda: True + 1"), Ok(2.0));
    }

    #[test]
    fn test_floor_division_and_modulo_follow_divisor_sign() {
        assert_eq!(run("lambda: 7 // 2"), Ok(3.0));
        assert_eq!(run("lambda: -7 // 2"), Ok(-4.0));
        assert_eq!(run("lambda: 7 // -2"), Ok(-4.0));
        assert_eq!(run("lambda: -7 % 3"), Ok(2.0));
        assert_eq!(run("lambda: 7 % -3"), Ok(-2.0));
        assert_eq!(run("lambda: 7.5 // 2"), Ok(3.0));
        assert_eq!(run("lambda: -7.5 % 2"), Ok(0.5));
    }

    #[test]
    fn test_integer_overflow_promotes_to_float() {
        assert_eq!(run("lambda: 2 ** 100"), Ok(2f64.powi(100)));
        assert_eq!(value("lambda: 2 ** 10"), Value::Int(1024));
    }

    #[test]
    fn test_zero_division() {
        assert_eq!(runtime("lambda: 1 / 0"), "division by zero");
        assert_eq!(runtime("lambda: 1 // 0"), "integer division or modulo by zero");
        assert_eq!(runtime("lambda: a1 % 0"), "float modulo by zero");
        assert_eq!(runtime("lambda: 0.0 ** -1"), "0.0 cannot be raised to a negative power");
    }

    #[test]
    fn test_unary() {
        assert_eq!(run("lambda: ~5"), Ok(-6.0));
        assert_eq!(run("lambda: not 0"), Ok(1.0));
        assert_eq!(run("lambda: +a1"), Ok(2.0));
        assert_eq!(runtime("lambda: ~a1"), "bad operand type for unary ~: 'float'");
        assert_eq!(runtime("lambda: -None"), "bad operand type for unary -: 'NoneType'");
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(value("lambda: 1 < 2 < 3"), Value::Bool(true));
        assert_eq!(value("lambda: 1 < 3 < 2"), Value::Bool(false));
        assert_eq!(value("lambda: a1 == 2"), Value::Bool(true));
        assert_eq!(value("lambda: a1 != a2"), Value::Bool(true));
        assert_eq!(value("lambda: 3 in s[a1:a3]"), Value::Bool(true));
        assert_eq!(value("lambda: 5 not in s[a1:a3]"), Value::Bool(true));
        assert_eq!(value("lambda: None is None"), Value::Bool(true));
        assert_eq!(value("lambda: a1 is a1"), Value::Bool(true));
        assert_eq!(value("lambda: a1 is not a2"), Value::Bool(true));
        assert_eq!(value("lambda: s[a1:a2] < s[a1:a3]"), Value::Bool(true));
        assert_eq!(
            runtime("lambda: None < 1"),
            "'<' not supported between instances of 'NoneType' and 'int'"
        );
        assert_eq!(runtime("lambda: 1 in a1"), "argument of type 'float' is not iterable");
    }

    #[test]
    fn test_comparison_short_circuits() {
        // The right-hand side would fail if it were evaluated.
        assert_eq!(value("lambda: 2 < 1 < None"), Value::Bool(false));
    }

    #[test]
    fn test_conditional_is_lazy() {
        assert_eq!(run("lambda: 1 if a1 > 0 else 1 / 0"), Ok(1.0));
        assert_eq!(run("lambda: 1 / 0 if a1 < 0 else 5"), Ok(5.0));
    }

    #[test]
    fn test_reducers() {
        assert_eq!(run("lambda: sum(s[a1:a3])"), Ok(9.0));
        assert_eq!(run("lambda: sum(s[a1:a3], 10)"), Ok(19.0));
        assert_eq!(run("lambda: min(s[a1:a3])"), Ok(2.0));
        assert_eq!(run("lambda: max(s[a1:a3])"), Ok(4.0));
        assert_eq!(run("lambda: max(a1, b1, 7)"), Ok(7.0));
        assert_eq!(run("lambda: min(a1, b1)"), Ok(-1.5));
        assert_eq!(
            run("lambda: sum(s[a1:b2])"),
            Err(FormulaError::MissingBinding(CellRef::new(2, 2)))
        );
    }

    #[test]
    fn test_reducer_failures() {
        assert_eq!(runtime("lambda: sum(a1)"), "'float' object is not iterable");
        assert_eq!(runtime("lambda: sum()"), "sum() takes 1 or 2 arguments (0 given)");
        assert_eq!(runtime("lambda: min()"), "min() expected at least 1 argument, got 0");
        assert_eq!(runtime("lambda: max(s[a1:a3][3:])"), "max() arg is an empty sequence");
        assert_eq!(runtime("lambda: a1(1)"), "'float' object is not callable");
    }

    #[test]
    fn test_list_indexing() {
        assert_eq!(run("lambda: s[a1:a3][0] + 0"), Ok(2.0));
        assert_eq!(run("lambda: s[a1:a3][-1] + 0"), Ok(4.0));
        assert_eq!(run("lambda: sum(s[a1:a3][1:])"), Ok(7.0));
        assert_eq!(run("lambda: sum(s[a1:a3][::-1][:1])"), Ok(4.0));
        assert_eq!(run("lambda: sum(s[a1:a3][::2])"), Ok(6.0));
        assert_eq!(runtime("lambda: s[a1:a3][5] + 0"), "list index out of range");
        assert_eq!(
            runtime("lambda: s[a1:a3][a1] + 0"),
            "list indices must be integers or slices, not float"
        );
        assert_eq!(runtime("lambda: a1[0] + 0"), "'float' object is not subscriptable");
    }

    #[test]
    fn test_list_slice_with_extreme_steps() {
        assert_eq!(run("lambda: sum(s[a1:a3][1::9223372036854775807])"), Ok(3.0));
        assert_eq!(run("lambda: sum(s[a1:a3][::-9223372036854775807])"), Ok(4.0));
        assert_eq!(run("lambda: sum(s[a1:a3][::-9223372036854775807 - 1])"), Ok(4.0));
    }

    #[test]
    fn test_sliced_elements_are_range_endpoints() {
        assert_eq!(run("lambda: sum(s[s[a1:a3][0]:a2])"), Ok(5.0));
    }

    #[test]
    fn test_slicer_misuse() {
        assert!(matches!(run("lambda: sum(s[1:3])"), Err(FormulaError::InvalidRange(_))));
        assert!(matches!(run("lambda: sum(s[a1])"), Err(FormulaError::InvalidRange(_))));
        assert!(matches!(
            run("lambda: sum(s[a1:a3:2])"),
            Err(FormulaError::InvalidRange(_))
        ));
        assert!(matches!(
            run("lambda: sum(s[a1 + 1:a3])"),
            Err(FormulaError::InvalidRange(_))
        ));
    }

    #[test]
    fn test_non_numeric_results() {
        assert_eq!(
            run("lambda: None if a1 else 1"),
            Err(FormulaError::NonNumericResult("NoneType".into()))
        );
        assert_eq!(
            run("lambda: s[a1:a2] + s[a3:a3]"),
            Err(FormulaError::NonNumericResult("list".into()))
        );
        assert_eq!(run("lambda: 1 < 2"), Ok(1.0));
    }

    #[test]
    fn test_nan_comparisons_are_false() {
        let mut env = Environment::new();
        env.bind_cell(CellRef::new(1, 1), f64::NAN);
        let lt = parse_formula("lambda: a1 < 1").unwrap();
        let ge = parse_formula("lambda: a1 >= 1").unwrap();
        assert_eq!(execute(&lt, &env), Ok(0.0));
        assert_eq!(execute(&ge, &env), Ok(0.0));
    }
}
