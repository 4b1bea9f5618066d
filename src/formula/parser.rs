//! Formula parsing.
//!
//! Supported grammar (R/Wilkinson notation restricted to numeric predictors):
//!
//! ```text
//! formula := name '~' sum
//! sum     := cross (('+' | '-') cross)*
//! cross   := inter ('*' inter)*
//! inter   := atom (':' atom)*
//! atom    := name | '0' | '1' | '(' sum ')'
//! ```
//!
//! `a * b` expands to `a + b + a:b`, `- 1` and `+ 0` drop the intercept.

use std::fmt;
use thiserror::Error;

/// Errors that can occur when parsing a formula.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FormulaError {
    #[error("formula syntax error at position {position}: {message}")]
    Syntax { position: usize, message: String },

    #[error("formula has no response: expected 'y ~ ...'")]
    MissingResponse,

    #[error("formula has no terms and no intercept")]
    EmptyModel,

    #[error("column '{0}' referenced in formula is not in the data")]
    UnknownColumn(String),
}

/// A model term: the product of one or more variables.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Term {
    variables: Vec<String>,
}

impl Term {
    pub(crate) fn new(variables: Vec<String>) -> Self {
        Self { variables }
    }

    /// Variables multiplied together in this term.
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// Interaction order (1 for a main effect).
    pub fn order(&self) -> usize {
        self.variables.len()
    }

    /// Coefficient label, e.g. `hp:wt`.
    pub fn label(&self) -> String {
        self.variables.join(":")
    }

    pub fn contains(&self, variable: &str) -> bool {
        self.variables.iter().any(|v| v == variable)
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// A parsed model formula.
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    source: String,
    response: String,
    terms: Vec<Term>,
    intercept: bool,
}

impl Formula {
    /// Parse a formula such as `"mpg ~ hp * wt * am"`.
    ///
    /// A leading `-` is allowed, so `y ~ -1 + x` drops the intercept.
    pub fn parse(source: &str) -> Result<Self, FormulaError> {
        let tokens = tokenize(source)?;
        let mut parser = Parser {
            tokens,
            pos: 0,
            order: Vec::new(),
        };
        let (response, set) = parser.formula()?;

        let mut terms: Vec<Term> = set
            .terms
            .into_iter()
            .filter(|t| !t.is_empty())
            .map(|vars| {
                let mut vars = vars;
                vars.sort_by_key(|v| parser.order.iter().position(|o| o == v));
                Term::new(vars)
            })
            .collect();

        // Stable sort by order keeps first-appearance within each order.
        terms.sort_by_key(Term::order);

        if terms.is_empty() && !set.intercept {
            return Err(FormulaError::EmptyModel);
        }

        Ok(Self {
            source: source.trim().to_string(),
            response,
            terms,
            intercept: set.intercept,
        })
    }

    pub fn response(&self) -> &str {
        &self.response
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    pub fn has_intercept(&self) -> bool {
        self.intercept
    }

    /// Distinct predictor variables in order of first appearance.
    pub fn variables(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for term in &self.terms {
            for v in term.variables() {
                if !out.contains(v) {
                    out.push(v.clone());
                }
            }
        }
        out
    }

    /// Coefficient labels, starting with `(Intercept)` when present.
    pub fn coefficient_names(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(self.terms.len() + 1);
        if self.intercept {
            names.push("(Intercept)".to_string());
        }
        names.extend(self.terms.iter().map(Term::label));
        names
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

// ========== Tokenizer ==========

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Name(String),
    Number(String),
    Tilde,
    Plus,
    Minus,
    Star,
    Colon,
    LParen,
    RParen,
}

fn tokenize(source: &str) -> Result<Vec<(usize, Token)>, FormulaError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let token = match c {
            c if c.is_whitespace() => {
                i += 1;
                continue;
            }
            '~' => Token::Tilde,
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            ':' => Token::Colon,
            '(' => Token::LParen,
            ')' => Token::RParen,
            c if c.is_ascii_digit() => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                tokens.push((start, Token::Number(chars[start..i].iter().collect())));
                continue;
            }
            c if c.is_alphabetic() || c == '_' || c == '.' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '.')
                {
                    i += 1;
                }
                tokens.push((start, Token::Name(chars[start..i].iter().collect())));
                continue;
            }
            other => {
                return Err(FormulaError::Syntax {
                    position: i,
                    message: format!("unexpected character '{other}'"),
                })
            }
        };
        tokens.push((i, token));
        i += 1;
    }

    Ok(tokens)
}

// ========== Parser ==========

/// Set of terms produced by a sub-expression. Each term is a variable list;
/// the empty list stands for the intercept.
#[derive(Debug, Clone, Default)]
struct TermSet {
    terms: Vec<Vec<String>>,
    intercept: bool,
}

impl TermSet {
    fn single(name: String) -> Self {
        Self {
            terms: vec![vec![name]],
            intercept: false,
        }
    }

    fn union(mut self, other: TermSet) -> Self {
        for term in other.terms {
            self.push(term);
        }
        self.intercept |= other.intercept;
        self
    }

    fn push(&mut self, term: Vec<String>) {
        if !self.terms.iter().any(|t| same_term(t, &term)) {
            self.terms.push(term);
        }
    }

    fn remove(mut self, other: &TermSet) -> Self {
        self.terms
            .retain(|t| !other.terms.iter().any(|o| same_term(t, o)));
        self
    }

    fn interact(&self, other: &TermSet) -> Self {
        let mut out = TermSet::default();
        for a in &self.terms {
            for b in &other.terms {
                let mut merged = a.clone();
                for v in b {
                    if !merged.contains(v) {
                        merged.push(v.clone());
                    }
                }
                out.push(merged);
            }
        }
        out
    }

    fn cross(self, other: TermSet) -> Self {
        let product = self.interact(&other);
        self.union(other).union(product)
    }
}

fn same_term(a: &[String], b: &[String]) -> bool {
    a.len() == b.len() && a.iter().all(|v| b.contains(v))
}

struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
    /// Variables in order of first appearance on the right-hand side.
    order: Vec<String>,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, t)| t)
    }

    fn position(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map_or_else(|| self.tokens.last().map_or(0, |(p, _)| p + 1), |(p, _)| *p)
    }

    fn error(&self, message: impl Into<String>) -> FormulaError {
        FormulaError::Syntax {
            position: self.position(),
            message: message.into(),
        }
    }

    fn formula(&mut self) -> Result<(String, TermSet), FormulaError> {
        let response = match self.peek() {
            Some(Token::Name(name)) => name.clone(),
            Some(Token::Tilde) | None => return Err(FormulaError::MissingResponse),
            Some(_) => return Err(self.error("expected response variable")),
        };
        self.pos += 1;
        if self.peek() != Some(&Token::Tilde) {
            return Err(FormulaError::MissingResponse);
        }
        self.pos += 1;

        let mut rhs = self.sum()?;
        if self.pos < self.tokens.len() {
            return Err(self.error("unexpected trailing input"));
        }

        // Intercept is implicit unless explicitly removed.
        if !rhs.removed_intercept {
            rhs.set.intercept = true;
        }
        Ok((response, rhs.set))
    }

    fn sum(&mut self) -> Result<Sum, FormulaError> {
        let mut acc = Sum::default();
        let leading_minus = self.peek() == Some(&Token::Minus);
        if leading_minus {
            self.pos += 1;
        }
        let first = self.signed_cross(leading_minus)?;
        acc.apply(first);

        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.pos += 1;
                    let next = self.signed_cross(false)?;
                    acc.apply(next);
                }
                Some(Token::Minus) => {
                    self.pos += 1;
                    let next = self.signed_cross(true)?;
                    acc.apply(next);
                }
                _ => break,
            }
        }
        Ok(acc)
    }

    fn signed_cross(&mut self, negative: bool) -> Result<Signed, FormulaError> {
        match self.peek() {
            Some(Token::Number(n)) if n == "0" || n == "1" => {
                let keep = n == "1";
                self.pos += 1;
                Ok(Signed::Intercept(keep != negative))
            }
            Some(Token::Number(n)) => Err(self.error(format!("unexpected number '{n}'"))),
            _ => {
                let set = self.cross()?;
                Ok(if negative {
                    Signed::Remove(set)
                } else {
                    Signed::Add(set)
                })
            }
        }
    }

    fn cross(&mut self) -> Result<TermSet, FormulaError> {
        let mut acc = self.inter()?;
        while self.peek() == Some(&Token::Star) {
            self.pos += 1;
            let rhs = self.inter()?;
            acc = acc.cross(rhs);
        }
        Ok(acc)
    }

    fn inter(&mut self) -> Result<TermSet, FormulaError> {
        let mut acc = self.atom()?;
        while self.peek() == Some(&Token::Colon) {
            self.pos += 1;
            let rhs = self.atom()?;
            acc = acc.interact(&rhs);
        }
        Ok(acc)
    }

    fn atom(&mut self) -> Result<TermSet, FormulaError> {
        match self.peek().cloned() {
            Some(Token::Name(name)) => {
                self.pos += 1;
                if !self.order.contains(&name) {
                    self.order.push(name.clone());
                }
                Ok(TermSet::single(name))
            }
            Some(Token::LParen) => {
                self.pos += 1;
                let inner = self.sum()?;
                if self.peek() != Some(&Token::RParen) {
                    return Err(self.error("expected ')'"));
                }
                self.pos += 1;
                Ok(inner.set)
            }
            Some(other) => Err(self.error(format!("unexpected token {other:?}"))),
            None => Err(self.error("unexpected end of formula")),
        }
    }
}

enum Signed {
    Add(TermSet),
    Remove(TermSet),
    Intercept(bool),
}

#[derive(Default)]
struct Sum {
    set: TermSet,
    removed_intercept: bool,
}

impl Sum {
    fn apply(&mut self, part: Signed) {
        match part {
            Signed::Add(set) => self.set = std::mem::take(&mut self.set).union(set),
            Signed::Remove(set) => self.set = std::mem::take(&mut self.set).remove(&set),
            Signed::Intercept(keep) => self.removed_intercept = !keep,
        }
    }
}
