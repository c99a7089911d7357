//! Recursive-descent parser for formula source.
//!
//! The source must be exactly one expression statement whose value is a
//! zero-parameter `lambda`. Its body is parsed straight into [`Expr`]; any
//! construct without a variant there is rejected on the spot.
//!
//! Precedence, loosest first:
//!
//! ```text
//! x if c else y
//! or, and                      (forbidden)
//! not x
//! == != < <= > >= is in ...    (chained)
//! | ^ & << >> @                (forbidden)
//! + -
//! * / // %
//! +x -x ~x
//! **
//! call, subscript
//! ```

use super::ast::{BinaryOp, CompareOp, Expr, Formula, Index, Literal, UnaryOp};
use super::error::FormulaError;
use super::lexer::{Tok, Token, tokenize};

/// Nesting limit for the expression tree. Every node that wraps another
/// counts, including left-associative operator and postfix chains.
const MAX_DEPTH: usize = 64;

/// Keywords that can only start a statement.
const STATEMENT_KEYWORDS: &[&str] = &[
    "assert", "async", "break", "class", "continue", "def", "del", "for", "from", "global", "if",
    "import", "nonlocal", "pass", "raise", "return", "try", "while", "with",
];

/// Parse formula source into a [`Formula`].
///
/// Fails with `SyntaxViolation` if the source is not a single zero-parameter
/// lambda expression, and with `ForbiddenConstruct` if the body uses a
/// construct outside the formula language.
pub fn parse_formula(source: &str) -> Result<Formula, FormulaError> {
    let tokens = tokenize(source)?;
    let statements = split_statements(&tokens);

    match statements.len() {
        1 => {}
        0 => return Err(FormulaError::syntax("source must contain exactly 1 expression")),
        n => {
            return Err(FormulaError::syntax(format!(
                "source must contain exactly 1 expression, found {}",
                n
            )));
        }
    }

    let mut stmt = statements[0].to_vec();
    let end = stmt.last().map(|t| t.pos).unwrap_or(0);
    stmt.push(Token { tok: Tok::Eof, pos: end });

    let mut parser = Parser {
        tokens: stmt,
        pos: 0,
        depth: 0,
    };
    parser.formula()
}

/// Split tokens into non-empty statements on top-level newlines and `;`.
fn split_statements(tokens: &[Token]) -> Vec<&[Token]> {
    tokens
        .split(|t| matches!(t.tok, Tok::Newline | Tok::Semicolon | Tok::Eof))
        .filter(|s| !s.is_empty())
        .collect()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> &Tok {
        &self.tokens[self.pos.min(self.tokens.len() - 1)].tok
    }

    fn peek_next(&self) -> &Tok {
        &self.tokens[(self.pos + 1).min(self.tokens.len() - 1)].tok
    }

    fn position(&self) -> usize {
        self.tokens[self.pos.min(self.tokens.len() - 1)].pos
    }

    fn bump(&mut self) -> Tok {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, tok: &Tok) -> bool {
        if self.peek() == tok {
            self.bump();
            true
        } else {
            false
        }
    }

    fn at_keyword(&self, kw: &str) -> bool {
        matches!(self.peek(), Tok::Keyword(k) if *k == kw)
    }

    fn expect(&mut self, tok: Tok, what: &str) -> Result<(), FormulaError> {
        if self.eat(&tok) {
            Ok(())
        } else {
            Err(self.unexpected(what))
        }
    }

    fn unexpected(&self, expected: &str) -> FormulaError {
        FormulaError::syntax(format!(
            "expected {} but found {} at position {}",
            expected,
            describe(self.peek()),
            self.position()
        ))
    }

    fn formula(&mut self) -> Result<Formula, FormulaError> {
        if let Tok::Keyword(kw) = self.peek()
            && STATEMENT_KEYWORDS.contains(kw)
        {
            return Err(FormulaError::syntax(format!(
                "source must contain an expression, found '{}' statement",
                kw
            )));
        }
        if !self.at_keyword("lambda") {
            return Err(FormulaError::syntax("source must contain a lambda expression"));
        }
        self.bump();
        if !self.eat(&Tok::Colon) {
            return Err(FormulaError::syntax("lambda must not take arguments"));
        }

        let body = self.expr()?;
        self.finish()?;

        if !body.is_valid_root() {
            return Err(FormulaError::forbidden(format!(
                "lambda body must be a literal, operation, conditional, call or comparison, found {}",
                body.kind()
            )));
        }
        Ok(Formula { body })
    }

    /// Everything after the body must be the end of the statement.
    fn finish(&mut self) -> Result<(), FormulaError> {
        match self.peek() {
            Tok::Eof => Ok(()),
            Tok::Assign => Err(FormulaError::forbidden("assignment")),
            Tok::Walrus => Err(FormulaError::forbidden("assignment expression")),
            Tok::Comma => Err(FormulaError::syntax(
                "source must contain a lambda expression, found a tuple",
            )),
            _ => Err(self.unexpected("end of formula")),
        }
    }

    fn enter(&mut self) -> Result<(), FormulaError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(FormulaError::syntax("expression nested too deeply"));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    /// Run a loop that nests its result one level per iteration, then
    /// release every level it entered.
    fn chain(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<Expr, FormulaError>,
    ) -> Result<Expr, FormulaError> {
        let depth = self.depth;
        let result = f(self);
        self.depth = depth;
        result
    }

    fn expr(&mut self) -> Result<Expr, FormulaError> {
        self.enter()?;
        let result = self.conditional();
        self.leave();
        result
    }

    fn conditional(&mut self) -> Result<Expr, FormulaError> {
        if self.at_keyword("lambda") {
            return Err(FormulaError::forbidden("nested lambda"));
        }
        if self.at_keyword("yield") || self.at_keyword("await") {
            return Err(FormulaError::forbidden(format!(
                "'{}' expression",
                describe(self.peek())
            )));
        }

        let then = self.or_test()?;
        if !self.at_keyword("if") {
            return Ok(then);
        }
        self.bump();
        let test = self.or_test()?;
        if !self.at_keyword("else") {
            return Err(self.unexpected("'else'"));
        }
        self.bump();
        let otherwise = self.expr()?;
        Ok(Expr::Conditional {
            test: Box::new(test),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        })
    }

    fn or_test(&mut self) -> Result<Expr, FormulaError> {
        let lhs = self.and_test()?;
        if self.at_keyword("or") {
            return Err(FormulaError::forbidden("boolean operator 'or'"));
        }
        Ok(lhs)
    }

    fn and_test(&mut self) -> Result<Expr, FormulaError> {
        let lhs = self.not_test()?;
        if self.at_keyword("and") {
            return Err(FormulaError::forbidden("boolean operator 'and'"));
        }
        Ok(lhs)
    }

    fn not_test(&mut self) -> Result<Expr, FormulaError> {
        if self.at_keyword("not") {
            self.bump();
            self.enter()?;
            let operand = self.not_test();
            self.leave();
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand?),
            });
        }
        self.comparison()
    }

    fn compare_op(&mut self) -> Option<CompareOp> {
        let op = match self.peek() {
            Tok::EqEq => CompareOp::Eq,
            Tok::NotEq => CompareOp::NotEq,
            Tok::Lt => CompareOp::Lt,
            Tok::Le => CompareOp::Le,
            Tok::Gt => CompareOp::Gt,
            Tok::Ge => CompareOp::Ge,
            Tok::Keyword("in") => CompareOp::In,
            Tok::Keyword("is") => {
                if matches!(self.peek_next(), Tok::Keyword("not")) {
                    self.bump();
                    CompareOp::IsNot
                } else {
                    CompareOp::Is
                }
            }
            Tok::Keyword("not") if matches!(self.peek_next(), Tok::Keyword("in")) => {
                self.bump();
                CompareOp::NotIn
            }
            _ => return None,
        };
        self.bump();
        Some(op)
    }

    fn comparison(&mut self) -> Result<Expr, FormulaError> {
        let first = self.bitwise()?;
        let mut rest = Vec::new();
        while let Some(op) = self.compare_op() {
            rest.push((op, self.bitwise()?));
        }
        if rest.is_empty() {
            Ok(first)
        } else {
            Ok(Expr::Compare {
                first: Box::new(first),
                rest,
            })
        }
    }

    fn bitwise(&mut self) -> Result<Expr, FormulaError> {
        let lhs = self.arith()?;
        if let Tok::BitOp(op) = self.peek() {
            return Err(FormulaError::forbidden(format!("bitwise operator '{}'", op)));
        }
        Ok(lhs)
    }

    fn arith(&mut self) -> Result<Expr, FormulaError> {
        self.chain(Self::arith_chain)
    }

    fn arith_chain(&mut self) -> Result<Expr, FormulaError> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek() {
                Tok::Plus => BinaryOp::Add,
                Tok::Minus => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.bump();
            self.enter()?;
            let rhs = self.term()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn term(&mut self) -> Result<Expr, FormulaError> {
        self.chain(Self::term_chain)
    }

    fn term_chain(&mut self) -> Result<Expr, FormulaError> {
        let mut lhs = self.factor()?;
        loop {
            let op = match self.peek() {
                Tok::Star => BinaryOp::Mul,
                Tok::Slash => BinaryOp::Div,
                Tok::DoubleSlash => BinaryOp::FloorDiv,
                Tok::Percent => BinaryOp::Mod,
                Tok::BitOp("@") => return Err(FormulaError::forbidden("bitwise operator '@'")),
                _ => return Ok(lhs),
            };
            self.bump();
            self.enter()?;
            let rhs = self.factor()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn factor(&mut self) -> Result<Expr, FormulaError> {
        let op = match self.peek() {
            Tok::Plus => UnaryOp::Plus,
            Tok::Minus => UnaryOp::Neg,
            Tok::Tilde => UnaryOp::Invert,
            _ => return self.power(),
        };
        self.bump();
        self.enter()?;
        let operand = self.factor();
        self.leave();
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand?),
        })
    }

    fn power(&mut self) -> Result<Expr, FormulaError> {
        let base = self.postfix()?;
        if !self.eat(&Tok::DoubleStar) {
            return Ok(base);
        }
        self.enter()?;
        let exponent = self.factor();
        self.leave();
        Ok(binary(BinaryOp::Pow, base, exponent?))
    }

    fn postfix(&mut self) -> Result<Expr, FormulaError> {
        self.chain(Self::postfix_chain)
    }

    fn postfix_chain(&mut self) -> Result<Expr, FormulaError> {
        let mut expr = self.atom()?;
        loop {
            match self.peek() {
                Tok::LParen => {
                    self.bump();
                    self.enter()?;
                    let args = self.call_args()?;
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                    };
                }
                Tok::LBracket => {
                    self.bump();
                    self.enter()?;
                    let index = self.subscript()?;
                    expr = Expr::Subscript {
                        target: Box::new(expr),
                        index: Box::new(index),
                    };
                }
                Tok::Dot => return Err(FormulaError::forbidden("attribute access")),
                _ => return Ok(expr),
            }
        }
    }

    fn call_args(&mut self) -> Result<Vec<Expr>, FormulaError> {
        let mut args = Vec::new();
        loop {
            if self.eat(&Tok::RParen) {
                return Ok(args);
            }
            match (self.peek(), self.peek_next()) {
                (Tok::Star, _) | (Tok::DoubleStar, _) => {
                    return Err(FormulaError::forbidden("starred argument"));
                }
                (Tok::Ident(_), Tok::Assign) => {
                    return Err(FormulaError::forbidden("keyword argument"));
                }
                _ => {}
            }
            args.push(self.expr()?);
            if self.at_keyword("for") || self.at_keyword("async") {
                return Err(FormulaError::forbidden("comprehension"));
            }
            if self.eat(&Tok::Comma) {
                continue;
            }
            self.expect(Tok::RParen, "',' or ')'")?;
            return Ok(args);
        }
    }

    fn subscript(&mut self) -> Result<Index, FormulaError> {
        let start = if matches!(self.peek(), Tok::Colon) {
            None
        } else {
            Some(self.expr()?)
        };

        if !self.eat(&Tok::Colon) {
            if matches!(self.peek(), Tok::Comma) {
                return Err(FormulaError::forbidden("tuple"));
            }
            self.expect(Tok::RBracket, "']'")?;
            return match start {
                Some(item) => Ok(Index::Item(item)),
                None => Err(self.unexpected("subscript")),
            };
        }

        let stop = self.slice_part()?;
        let step = if self.eat(&Tok::Colon) {
            self.slice_part()?
        } else {
            None
        };
        if matches!(self.peek(), Tok::Comma) {
            return Err(FormulaError::forbidden("tuple"));
        }
        self.expect(Tok::RBracket, "']'")?;
        Ok(Index::Slice { start, stop, step })
    }

    fn slice_part(&mut self) -> Result<Option<Expr>, FormulaError> {
        if matches!(self.peek(), Tok::Colon | Tok::RBracket | Tok::Comma) {
            Ok(None)
        } else {
            Ok(Some(self.expr()?))
        }
    }

    fn atom(&mut self) -> Result<Expr, FormulaError> {
        let tok = self.peek().clone();
        match tok {
            Tok::Int(i) => {
                self.bump();
                Ok(Expr::Literal(Literal::Int(i)))
            }
            Tok::Float(f) => {
                self.bump();
                Ok(Expr::Literal(Literal::Float(f)))
            }
            Tok::Keyword("True") => {
                self.bump();
                Ok(Expr::Literal(Literal::Bool(true)))
            }
            Tok::Keyword("False") => {
                self.bump();
                Ok(Expr::Literal(Literal::Bool(false)))
            }
            Tok::Keyword("None") => {
                self.bump();
                Ok(Expr::Literal(Literal::None))
            }
            Tok::Ident(name) => {
                self.bump();
                Ok(Expr::Symbol(name))
            }
            Tok::LParen => {
                self.bump();
                self.parenthesized()
            }
            Tok::Str => Err(FormulaError::forbidden("string literal")),
            Tok::Imaginary => Err(FormulaError::forbidden("complex literal")),
            Tok::Ellipsis => Err(FormulaError::forbidden("ellipsis literal")),
            Tok::LBracket => Err(FormulaError::forbidden("list display")),
            Tok::LBrace => Err(FormulaError::forbidden("dict or set display")),
            Tok::Keyword("lambda") => Err(FormulaError::forbidden("nested lambda")),
            Tok::Keyword(kw @ ("await" | "yield")) => {
                Err(FormulaError::forbidden(format!("'{}' expression", kw)))
            }
            Tok::Star => Err(FormulaError::forbidden("starred expression")),
            _ => Err(self.unexpected("an expression")),
        }
    }

    fn parenthesized(&mut self) -> Result<Expr, FormulaError> {
        if matches!(self.peek(), Tok::RParen) {
            return Err(FormulaError::forbidden("tuple"));
        }
        let inner = self.expr()?;
        match self.peek() {
            Tok::RParen => {
                self.bump();
                Ok(inner)
            }
            Tok::Comma => Err(FormulaError::forbidden("tuple")),
            Tok::Keyword("for") | Tok::Keyword("async") => {
                Err(FormulaError::forbidden("comprehension"))
            }
            Tok::Walrus => Err(FormulaError::forbidden("assignment expression")),
            _ => Err(self.unexpected("')'")),
        }
    }
}

fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

fn describe(tok: &Tok) -> String {
    match tok {
        Tok::Int(i) => i.to_string(),
        Tok::Float(f) => f.to_string(),
        Tok::Imaginary => "complex literal".into(),
        Tok::Str => "string literal".into(),
        Tok::Ident(name) => format!("'{}'", name),
        Tok::Keyword(kw) => kw.to_string(),
        Tok::BitOp(op) => format!("'{}'", op),
        Tok::Newline => "newline".into(),
        Tok::Eof => "end of formula".into(),
        other => format!("{:?}", other),
    }
}
