//! Expression tree of the formula language.
//!
//! Only permitted constructs have a variant here; anything else is rejected
//! while parsing.

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Bool(bool),
    None,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::FloorDiv => "//",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "**",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Neg,
    Not,
    Invert,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Plus => "+",
            UnaryOp::Neg => "-",
            UnaryOp::Not => "not",
            UnaryOp::Invert => "~",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    Is,
    IsNot,
    In,
    NotIn,
}

impl CompareOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::NotEq => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Is => "is",
            CompareOp::IsNot => "is not",
            CompareOp::In => "in",
            CompareOp::NotIn => "not in",
        }
    }
}

/// The bracketed part of a subscript.
#[derive(Clone, Debug, PartialEq)]
pub enum Index {
    Item(Expr),
    Slice {
        start: Option<Expr>,
        stop: Option<Expr>,
        step: Option<Expr>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Symbol(String),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// `first op1 e1 op2 e2 ...`, evaluated pairwise with short-circuit.
    Compare {
        first: Box<Expr>,
        rest: Vec<(CompareOp, Expr)>,
    },
    /// `then if test else otherwise`
    Conditional {
        test: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Subscript {
        target: Box<Expr>,
        index: Box<Index>,
    },
}

impl Expr {
    /// Human-readable name of the node kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Expr::Literal(_) => "literal",
            Expr::Symbol(_) => "symbol reference",
            Expr::Unary { .. } => "unary operation",
            Expr::Binary { .. } => "binary operation",
            Expr::Compare { .. } => "comparison",
            Expr::Conditional { .. } => "conditional expression",
            Expr::Call { .. } => "function call",
            Expr::Subscript { .. } => "subscript",
        }
    }

    /// Whether this node may be the root of a formula body.
    pub fn is_valid_root(&self) -> bool {
        !matches!(self, Expr::Symbol(_) | Expr::Subscript { .. })
    }

    /// Visit every symbol referenced in this expression, in source order.
    pub fn visit_symbols<'a>(&'a self, f: &mut impl FnMut(&'a str)) {
        match self {
            Expr::Literal(_) => {}
            Expr::Symbol(name) => f(name),
            Expr::Unary { operand, .. } => operand.visit_symbols(f),
            Expr::Binary { lhs, rhs, .. } => {
                lhs.visit_symbols(f);
                rhs.visit_symbols(f);
            }
            Expr::Compare { first, rest } => {
                first.visit_symbols(f);
                for (_, e) in rest {
                    e.visit_symbols(f);
                }
            }
            Expr::Conditional {
                test,
                then,
                otherwise,
            } => {
                then.visit_symbols(f);
                test.visit_symbols(f);
                otherwise.visit_symbols(f);
            }
            Expr::Call { callee, args } => {
                callee.visit_symbols(f);
                for arg in args {
                    arg.visit_symbols(f);
                }
            }
            Expr::Subscript { target, index } => {
                target.visit_symbols(f);
                match index.as_ref() {
                    Index::Item(e) => e.visit_symbols(f),
                    Index::Slice { start, stop, step } => {
                        for e in [start, stop, step].into_iter().flatten() {
                            e.visit_symbols(f);
                        }
                    }
                }
            }
        }
    }
}

/// A parsed zero-parameter lambda.
#[derive(Clone, Debug, PartialEq)]
pub struct Formula {
    pub body: Expr,
}

impl Formula {
    /// Distinct symbols referenced by the body, in first-use order.
    pub fn symbols(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        self.body.visit_symbols(&mut |name| {
            if !out.contains(&name) {
                out.push(name);
            }
        });
        out
    }
}
