//! Tokenizer for formula source.
//!
//! Lexes more than the formula language accepts, so that constructs outside
//! it (strings, displays, attribute access, bitwise operators) are
//! recognised and reported as forbidden rather than as garbage.

use super::error::FormulaError;

const KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
    "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return",
    "try", "while", "with", "yield",
];

#[derive(Clone, Debug, PartialEq)]
pub enum Tok {
    Int(i64),
    Float(f64),
    /// Complex literal such as `2j`.
    Imaginary,
    /// String or bytes literal; contents are irrelevant.
    Str,
    Ident(String),
    Keyword(&'static str),

    Plus,
    Minus,
    Star,
    DoubleStar,
    Slash,
    DoubleSlash,
    Percent,
    Tilde,

    Lt,
    Le,
    Gt,
    Ge,
    EqEq,
    NotEq,

    /// `&`, `|`, `^`, `<<`, `>>`, `@`
    BitOp(&'static str),
    /// `=` and augmented assignments such as `+=`.
    Assign,
    /// `:=`
    Walrus,
    /// `->`
    Arrow,

    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Colon,
    Comma,
    Dot,
    Ellipsis,
    Semicolon,
    Newline,
    Eof,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub tok: Tok,
    /// Character offset into the source.
    pub pos: usize,
}

pub fn tokenize(source: &str) -> Result<Vec<Token>, FormulaError> {
    Lexer::new(source).run()
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    depth: usize,
    out: Vec<Token>,
}

impl Lexer {
    fn new(source: &str) -> Self {
        Lexer {
            chars: source.chars().collect(),
            pos: 0,
            depth: 0,
            out: Vec::new(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn push(&mut self, tok: Tok, pos: usize) {
        self.out.push(Token { tok, pos });
    }

    fn run(mut self) -> Result<Vec<Token>, FormulaError> {
        while let Some(c) = self.peek() {
            let start = self.pos;
            match c {
                ' ' | '\t' | '\r' | '\x0c' => self.pos += 1,
                '\n' => {
                    self.pos += 1;
                    if self.depth == 0 {
                        self.push(Tok::Newline, start);
                    }
                }
                '\\' if self.peek_at(1) == Some('\n') => self.pos += 2,
                '#' => {
                    while self.peek().is_some_and(|c| c != '\n') {
                        self.pos += 1;
                    }
                }
                '0'..='9' => self.number()?,
                '.' if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) => self.number()?,
                '"' | '\'' => self.string(start)?,
                c if c.is_alphabetic() || c == '_' => self.word(start)?,
                _ => self.punct(start)?,
            }
        }
        let end = self.pos;
        self.push(Tok::Eof, end);
        Ok(self.out)
    }

    fn word(&mut self, start: usize) -> Result<(), FormulaError> {
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || c == '_')
        {
            self.pos += 1;
        }
        let word: String = self.chars[start..self.pos].iter().collect();

        // String prefixes: r"..", b"..", f"..", rb"..", ...
        if matches!(self.peek(), Some('"') | Some('\''))
            && word.len() <= 2
            && word.chars().all(|c| "rRbBuUfF".contains(c))
        {
            return self.string(start);
        }

        let tok = match KEYWORDS.iter().find(|k| **k == word) {
            Some(k) => Tok::Keyword(*k),
            None => Tok::Ident(word),
        };
        self.push(tok, start);
        Ok(())
    }

    fn string(&mut self, start: usize) -> Result<(), FormulaError> {
        // Skip any prefix letters.
        while self.peek().is_some_and(|c| c != '"' && c != '\'') {
            self.pos += 1;
        }
        let Some(quote) = self.peek() else {
            return Err(unterminated(start));
        };
        let triple = self.peek_at(1) == Some(quote) && self.peek_at(2) == Some(quote);
        self.pos += if triple { 3 } else { 1 };

        loop {
            match self.peek() {
                None => return Err(unterminated(start)),
                Some('\\') => self.pos += 2,
                Some('\n') if !triple => return Err(unterminated(start)),
                Some(c) if c == quote => {
                    if !triple {
                        self.pos += 1;
                        break;
                    }
                    if self.peek_at(1) == Some(quote) && self.peek_at(2) == Some(quote) {
                        self.pos += 3;
                        break;
                    }
                    self.pos += 1;
                }
                Some(_) => self.pos += 1,
            }
        }
        self.push(Tok::Str, start);
        Ok(())
    }

    fn digits(&mut self, radix: u32) -> String {
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if c.is_digit(radix) {
                text.push(c);
            } else if c != '_' || !self.peek_at(1).is_some_and(|n| n.is_digit(radix)) {
                break;
            }
            self.pos += 1;
        }
        text
    }

    fn number(&mut self) -> Result<(), FormulaError> {
        let start = self.pos;

        if self.peek() == Some('0') {
            let radix = match self.peek_at(1) {
                Some('x') | Some('X') => Some(16),
                Some('o') | Some('O') => Some(8),
                Some('b') | Some('B') => Some(2),
                _ => None,
            };
            if let Some(radix) = radix {
                self.pos += 2;
                let text = self.digits(radix);
                if text.is_empty() {
                    return Err(invalid_number(start));
                }
                let tok = match i64::from_str_radix(&text, radix) {
                    Ok(i) => Tok::Int(i),
                    Err(_) => Tok::Float(big_radix_to_f64(&text, radix)),
                };
                return self.finish_number(tok, start);
            }
        }

        let int_part = self.digits(10);
        let mut is_float = false;
        let mut text = int_part.clone();

        if self.peek() == Some('.') {
            is_float = true;
            self.pos += 1;
            text.push('.');
            text.push_str(&self.digits(10));
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            let sign = self.peek_at(1);
            let has_sign = matches!(sign, Some('+') | Some('-'));
            let digit_at = if has_sign { 2 } else { 1 };
            if self.peek_at(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                text.push('e');
                self.pos += 1;
                if has_sign {
                    text.push(sign.unwrap_or('+'));
                    self.pos += 1;
                }
                text.push_str(&self.digits(10));
            }
        }

        let tok = if is_float {
            Tok::Float(text.parse().map_err(|_| invalid_number(start))?)
        } else {
            // Decimal integers other than zero may not have leading zeros.
            if int_part.len() > 1 && int_part.starts_with('0') && int_part.bytes().any(|b| b != b'0')
            {
                return Err(invalid_number(start));
            }
            match int_part.parse::<i64>() {
                Ok(i) => Tok::Int(i),
                Err(_) => Tok::Float(int_part.parse().map_err(|_| invalid_number(start))?),
            }
        };
        self.finish_number(tok, start)
    }

    fn finish_number(&mut self, tok: Tok, start: usize) -> Result<(), FormulaError> {
        if matches!(self.peek(), Some('j') | Some('J')) {
            self.pos += 1;
            self.push(Tok::Imaginary, start);
            return Ok(());
        }
        if self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_') {
            return Err(invalid_number(start));
        }
        self.push(tok, start);
        Ok(())
    }

    fn punct(&mut self, start: usize) -> Result<(), FormulaError> {
        let c = self.chars[self.pos];
        let next = self.peek_at(1);
        let next2 = self.peek_at(2);

        // Longest match first.
        let (tok, len) = match (c, next, next2) {
            ('*', Some('*'), Some('=')) | ('/', Some('/'), Some('=')) => (Tok::Assign, 3),
            ('<', Some('<'), Some('=')) | ('>', Some('>'), Some('=')) => (Tok::Assign, 3),
            ('.', Some('.'), Some('.')) => (Tok::Ellipsis, 3),
            ('*', Some('*'), _) => (Tok::DoubleStar, 2),
            ('/', Some('/'), _) => (Tok::DoubleSlash, 2),
            ('<', Some('<'), _) => (Tok::BitOp("<<"), 2),
            ('>', Some('>'), _) => (Tok::BitOp(">>"), 2),
            ('<', Some('='), _) => (Tok::Le, 2),
            ('>', Some('='), _) => (Tok::Ge, 2),
            ('=', Some('='), _) => (Tok::EqEq, 2),
            ('!', Some('='), _) => (Tok::NotEq, 2),
            (':', Some('='), _) => (Tok::Walrus, 2),
            ('-', Some('>'), _) => (Tok::Arrow, 2),
            ('+' | '-' | '*' | '/' | '%' | '&' | '|' | '^' | '@', Some('='), _) => (Tok::Assign, 2),
            ('+', _, _) => (Tok::Plus, 1),
            ('-', _, _) => (Tok::Minus, 1),
            ('*', _, _) => (Tok::Star, 1),
            ('/', _, _) => (Tok::Slash, 1),
            ('%', _, _) => (Tok::Percent, 1),
            ('~', _, _) => (Tok::Tilde, 1),
            ('<', _, _) => (Tok::Lt, 1),
            ('>', _, _) => (Tok::Gt, 1),
            ('=', _, _) => (Tok::Assign, 1),
            ('&', _, _) => (Tok::BitOp("&"), 1),
            ('|', _, _) => (Tok::BitOp("|"), 1),
            ('^', _, _) => (Tok::BitOp("^"), 1),
            ('@', _, _) => (Tok::BitOp("@"), 1),
            ('(', _, _) => (Tok::LParen, 1),
            (')', _, _) => (Tok::RParen, 1),
            ('[', _, _) => (Tok::LBracket, 1),
            (']', _, _) => (Tok::RBracket, 1),
            ('{', _, _) => (Tok::LBrace, 1),
            ('}', _, _) => (Tok::RBrace, 1),
            (':', _, _) => (Tok::Colon, 1),
            (',', _, _) => (Tok::Comma, 1),
            ('.', _, _) => (Tok::Dot, 1),
            (';', _, _) => (Tok::Semicolon, 1),
            _ => {
                return Err(FormulaError::syntax(format!(
                    "unexpected character '{}' at position {}",
                    c, start
                )));
            }
        };

        match tok {
            Tok::LParen | Tok::LBracket | Tok::LBrace => self.depth += 1,
            Tok::RParen | Tok::RBracket | Tok::RBrace => self.depth = self.depth.saturating_sub(1),
            _ => {}
        }
        self.pos += len;
        self.push(tok, start);
        Ok(())
    }
}

fn unterminated(pos: usize) -> FormulaError {
    FormulaError::syntax(format!("unterminated string literal at position {}", pos))
}

fn invalid_number(pos: usize) -> FormulaError {
    FormulaError::syntax(format!("invalid number literal at position {}", pos))
}

fn big_radix_to_f64(digits: &str, radix: u32) -> f64 {
    digits
        .chars()
        .filter_map(|c| c.to_digit(radix))
        .fold(0.0, |acc, d| acc * radix as f64 + d as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(source: &str) -> Vec<Tok> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.tok)
            .collect()
    }

    #[test]
    fn test_lambda_header() {
        assert_eq!(
            toks("lambda: a1 * 2"),
            vec![
                Tok::Keyword("lambda"),
                Tok::Colon,
                Tok::Ident("a1".into()),
                Tok::Star,
                Tok::Int(2),
                Tok::Eof,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(toks("1_000")[0], Tok::Int(1000));
        assert_eq!(toks("0x1F")[0], Tok::Int(31));
        assert_eq!(toks(".5")[0], Tok::Float(0.5));
        assert_eq!(toks("5.")[0], Tok::Float(5.0));
        assert_eq!(toks("1e3")[0], Tok::Float(1000.0));
        assert_eq!(toks("2.5E-1")[0], Tok::Float(0.25));
        assert_eq!(toks("3j")[0], Tok::Imaginary);
        assert_eq!(toks("99999999999999999999")[0], Tok::Float(1e20));
        assert!(tokenize("007").is_err());
        assert!(tokenize("1abc").is_err());
    }

    #[test]
    fn test_operators_longest_match() {
        assert_eq!(
            toks("** // <= >= == != := -> << >> += ..."),
            vec![
                Tok::DoubleStar,
                Tok::DoubleSlash,
                Tok::Le,
                Tok::Ge,
                Tok::EqEq,
                Tok::NotEq,
                Tok::Walrus,
                Tok::Arrow,
                Tok::BitOp("<<"),
                Tok::BitOp(">>"),
                Tok::Assign,
                Tok::Ellipsis,
                Tok::Eof,
            ]
        );
    }

    #[test]
    fn test_strings_are_opaque() {
        assert_eq!(toks("'os'"), vec![Tok::Str, Tok::Eof]);
        assert_eq!(toks("f\"{x}\""), vec![Tok::Str, Tok::Eof]);
        assert_eq!(toks("'''a\nb'''"), vec![Tok::Str, Tok::Eof]);
        assert_eq!(toks(r#""a\"b""#), vec![Tok::Str, Tok::Eof]);
        assert!(tokenize("'open").is_err());
    }

    #[test]
    fn test_newlines_only_outside_brackets() {
        assert_eq!(
            toks("(1\n)\n2"),
            vec![
                Tok::LParen,
                Tok::Int(1),
                Tok::RParen,
                Tok::Newline,
                Tok::Int(2),
                Tok::Eof,
            ]
        );
    }

    #[test]
    fn test_comments_and_continuations() {
        assert_eq!(toks("1 # note"), vec![Tok::Int(1), Tok::Eof]);
        assert_eq!(toks("1 +\\\n2"), vec![Tok::Int(1), Tok::Plus, Tok::Int(2), Tok::Eof]);
    }

    #[test]
    fn test_unknown_character() {
        assert!(matches!(
            tokenize("lambda: $"),
            Err(FormulaError::SyntaxViolation(_))
        ));
    }
}
