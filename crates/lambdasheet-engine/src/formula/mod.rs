//! The sandboxed formula language.
//!
//! A formula is a cell input of the form `lambda: <expression>`. Source text
//! goes through three stages:
//!
//! - [`parse_formula`] - tokenize and parse, rejecting anything outside the
//!   permitted expression subset
//! - [`validate`] - additionally require every referenced symbol to be bound
//! - [`calculate`] - validate, execute and convert the result to a number
//!
//! Nothing here touches the host: there is no attribute access, no imports,
//! no literals beyond numbers, booleans and `None`, and the only callables are
//! the reducers bound in the [`Environment`].

pub mod ast;
pub mod error;
mod eval;
pub mod lexer;
pub mod parser;
pub mod value;

pub use ast::{Expr, Formula};
pub use error::FormulaError;
pub use eval::{evaluate, execute};
pub use parser::parse_formula;
pub use value::Value;

use tracing::{debug, trace};

use crate::engine::Environment;

/// Parse a formula and check that every symbol it names is bound in `env`.
pub fn validate(source: &str, env: &Environment) -> Result<Formula, FormulaError> {
    let formula = parse_formula(source)?;
    if let Some(name) = formula.symbols().into_iter().find(|n| !env.contains(n)) {
        return Err(FormulaError::UnknownSymbol(name.to_string()));
    }
    Ok(formula)
}

/// Validate and execute a formula, yielding its numeric result.
pub fn calculate(source: &str, env: &Environment) -> Result<f64, FormulaError> {
    trace!(source, "calculating formula");
    let result = validate(source, env).and_then(|formula| execute(&formula, env));
    if let Err(e) = &result {
        debug!(source, error = %e, "formula failed");
    }
    result
}
