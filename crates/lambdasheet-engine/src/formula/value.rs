use crate::engine::{BoundCell, Builtin};

/// A runtime value inside a formula.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// A number read from a cell binding; remembers where it came from so it
    /// can serve as a range endpoint.
    Cell(BoundCell),
    List(Vec<Value>),
    Builtin(Builtin),
    Slicer,
}

/// A value viewed as a number.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    pub(crate) fn as_f64(self) -> f64 {
        match self {
            Num::Int(i) => i as f64,
            Num::Float(f) => f,
        }
    }

    pub(crate) fn into_value(self) -> Value {
        match self {
            Num::Int(i) => Value::Int(i),
            Num::Float(f) => Value::Float(f),
        }
    }
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) | Value::Cell(_) => "float",
            Value::List(_) => "list",
            Value::Builtin(_) => "builtin_function",
            Value::Slicer => "slicer",
        }
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Cell(c) => c.value != 0.0,
            Value::List(items) => !items.is_empty(),
            Value::Builtin(_) | Value::Slicer => true,
        }
    }

    pub(crate) fn as_num(&self) -> Option<Num> {
        match self {
            Value::Bool(b) => Some(Num::Int(*b as i64)),
            Value::Int(i) => Some(Num::Int(*i)),
            Value::Float(f) => Some(Num::Float(*f)),
            Value::Cell(c) => Some(Num::Float(c.value)),
            _ => None,
        }
    }

    /// Convert a formula result to a float; `None` for non-numeric values.
    pub fn to_f64(&self) -> Option<f64> {
        self.as_num().map(Num::as_f64)
    }
}
