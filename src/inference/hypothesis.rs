//! Linear hypotheses over estimates.
//!
//! An expression such as `"b3 = 2 * b2"` or `` "`hp:wt` - hp = 0" `` is parsed
//! into a linear form `Σ wₖ θₖ - c` whose null value is zero. Estimates are
//! referenced either by 1-based position (`b1`, `b2`, ...) or by a label that
//! must identify exactly one row.

use std::fmt;
use thiserror::Error;

/// Errors that can occur when parsing or resolving a hypothesis.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum HypothesisError {
    #[error("hypothesis syntax error at position {position}: {message}")]
    Syntax { position: usize, message: String },

    #[error("hypothesis is not linear in the estimates: {0}")]
    Nonlinear(String),

    #[error("hypothesis references b{index} but only {n} estimates are available")]
    PositionOutOfRange { index: usize, n: usize },

    #[error("hypothesis references unknown estimate '{0}'")]
    UnknownName(String),

    #[error("name '{name}' matches {count} estimates; use positional references (b1, b2, ...)")]
    AmbiguousName { name: String, count: usize },

    #[error("hypothesis does not reference any estimate")]
    NoEstimates,

    #[error("keyword hypothesis needs at least {needed} estimates, got {got}")]
    TooFewEstimates { needed: usize, got: usize },
}

/// A hypothesis to test on a set of estimates.
#[derive(Debug, Clone, PartialEq)]
pub enum Hypothesis {
    /// Linear equation, e.g. `"b3 = 2 * b2"`.
    Expression(String),
    /// Every pair `bi - bj` with `i < j`.
    Pairwise,
    /// Every pair `bj - bi` with `i < j`.
    RevPairwise,
    /// Each estimate minus the first: `bk - b1` for `k ≥ 2`.
    Reference,
}

impl From<&str> for Hypothesis {
    fn from(expression: &str) -> Self {
        Self::Expression(expression.to_string())
    }
}

impl From<String> for Hypothesis {
    fn from(expression: String) -> Self {
        Self::Expression(expression)
    }
}

impl fmt::Display for Hypothesis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Expression(e) => f.write_str(e.trim()),
            Self::Pairwise => f.write_str("pairwise"),
            Self::RevPairwise => f.write_str("revpairwise"),
            Self::Reference => f.write_str("reference"),
        }
    }
}

/// Rows of a contrast matrix: estimate_r = Σ_i weights[r][i] θ_i - constants[r].
#[derive(Debug, Clone, PartialEq)]
pub struct Contrasts {
    pub labels: Vec<String>,
    pub weights: Vec<Vec<f64>>,
    pub constants: Vec<f64>,
}

impl Hypothesis {
    /// Resolve against the labels of the available estimates.
    ///
    /// `labels[i]` is the name of estimate `b{i+1}`; `None` marks rows that
    /// can only be referenced positionally.
    pub fn contrasts(&self, labels: &[Option<String>]) -> Result<Contrasts, HypothesisError> {
        let n = labels.len();
        let display = |i: usize| labels[i].clone().unwrap_or_else(|| format!("b{}", i + 1));

        match self {
            Self::Expression(source) => {
                let form = parse(source)?;
                let mut weights = vec![0.0; n];
                if form.terms.is_empty() {
                    return Err(HypothesisError::NoEstimates);
                }
                for (reference, w) in &form.terms {
                    let idx = reference.resolve(labels)?;
                    weights[idx] += w;
                }
                Ok(Contrasts {
                    labels: vec![source.trim().to_string()],
                    weights: vec![weights],
                    constants: vec![-form.constant],
                })
            }
            Self::Pairwise | Self::RevPairwise => {
                if n < 2 {
                    return Err(HypothesisError::TooFewEstimates { needed: 2, got: n });
                }
                let mut out = Contrasts {
                    labels: Vec::new(),
                    weights: Vec::new(),
                    constants: Vec::new(),
                };
                for i in 0..n {
                    for j in (i + 1)..n {
                        let (a, b) = if matches!(self, Self::Pairwise) {
                            (i, j)
                        } else {
                            (j, i)
                        };
                        let mut w = vec![0.0; n];
                        w[a] = 1.0;
                        w[b] = -1.0;
                        out.labels.push(format!("{} - {}", display(a), display(b)));
                        out.weights.push(w);
                        out.constants.push(0.0);
                    }
                }
                Ok(out)
            }
            Self::Reference => {
                if n < 2 {
                    return Err(HypothesisError::TooFewEstimates { needed: 2, got: n });
                }
                let mut out = Contrasts {
                    labels: Vec::new(),
                    weights: Vec::new(),
                    constants: Vec::new(),
                };
                for k in 1..n {
                    let mut w = vec![0.0; n];
                    w[k] = 1.0;
                    w[0] = -1.0;
                    out.labels.push(format!("{} - {}", display(k), display(0)));
                    out.weights.push(w);
                    out.constants.push(0.0);
                }
                Ok(out)
            }
        }
    }
}

/// A reference to one estimate.
#[derive(Debug, Clone, PartialEq)]
enum EstimateRef {
    /// 1-based position.
    Position(usize),
    Name(String),
}

impl EstimateRef {
    fn resolve(&self, labels: &[Option<String>]) -> Result<usize, HypothesisError> {
        match self {
            Self::Position(k) => {
                if *k == 0 || *k > labels.len() {
                    Err(HypothesisError::PositionOutOfRange {
                        index: *k,
                        n: labels.len(),
                    })
                } else {
                    Ok(k - 1)
                }
            }
            Self::Name(name) => {
                let matches: Vec<usize> = labels
                    .iter()
                    .enumerate()
                    .filter(|(_, l)| l.as_deref() == Some(name.as_str()))
                    .map(|(i, _)| i)
                    .collect();
                match matches.as_slice() {
                    [only] => Ok(*only),
                    [] => Err(HypothesisError::UnknownName(name.clone())),
                    many => Err(HypothesisError::AmbiguousName {
                        name: name.clone(),
                        count: many.len(),
                    }),
                }
            }
        }
    }
}

/// `Σ terms + constant`
#[derive(Debug, Clone, Default, PartialEq)]
struct LinearForm {
    terms: Vec<(EstimateRef, f64)>,
    constant: f64,
}

impl LinearForm {
    fn constant(value: f64) -> Self {
        Self {
            terms: Vec::new(),
            constant: value,
        }
    }

    fn reference(r: EstimateRef) -> Self {
        Self {
            terms: vec![(r, 1.0)],
            constant: 0.0,
        }
    }

    fn as_constant(&self) -> Option<f64> {
        self.terms.is_empty().then_some(self.constant)
    }

    fn scale(mut self, factor: f64) -> Self {
        for (_, w) in &mut self.terms {
            *w *= factor;
        }
        self.constant *= factor;
        self
    }

    fn add(mut self, other: LinearForm) -> Self {
        for (r, w) in other.terms {
            match self.terms.iter_mut().find(|(existing, _)| *existing == r) {
                Some((_, acc)) => *acc += w,
                None => self.terms.push((r, w)),
            }
        }
        self.constant += other.constant;
        self
    }
}

// ========== Tokenizer ==========

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Name(String),
    Plus,
    Minus,
    Star,
    Slash,
    Equals,
    LParen,
    RParen,
}

fn tokenize(source: &str) -> Result<Vec<(usize, Token)>, HypothesisError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let start = i;
        let token = match c {
            c if c.is_whitespace() => {
                i += 1;
                continue;
            }
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '=' => {
                // Accept both `=` and `==`.
                if chars.get(i + 1) == Some(&'=') {
                    i += 1;
                }
                Token::Equals
            }
            '(' if chars[i..].starts_with(&INTERCEPT) => {
                i += INTERCEPT.len();
                tokens.push((start, Token::Name("(Intercept)".to_string())));
                continue;
            }
            '(' => Token::LParen,
            ')' => Token::RParen,
            '`' => {
                let close = chars[i + 1..]
                    .iter()
                    .position(|&ch| ch == '`')
                    .ok_or_else(|| HypothesisError::Syntax {
                        position: i,
                        message: "unterminated backtick".to_string(),
                    })?;
                let name: String = chars[i + 1..i + 1 + close].iter().collect();
                i += close + 2;
                tokens.push((start, Token::Name(name)));
                continue;
            }
            c if c.is_ascii_digit() || c == '.' => {
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                    let mut j = i + 1;
                    if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                        j += 1;
                    }
                    if j < chars.len() && chars[j].is_ascii_digit() {
                        i = j;
                        while i < chars.len() && chars[i].is_ascii_digit() {
                            i += 1;
                        }
                    }
                }
                let text: String = chars[start..i].iter().collect();
                let value = text.parse::<f64>().map_err(|_| HypothesisError::Syntax {
                    position: start,
                    message: format!("invalid number '{text}'"),
                })?;
                tokens.push((start, Token::Number(value)));
                continue;
            }
            c if c.is_alphabetic() || c == '_' => {
                while i < chars.len()
                    && (chars[i].is_alphanumeric() || matches!(chars[i], '_' | '.' | ':'))
                {
                    i += 1;
                }
                tokens.push((start, Token::Name(chars[start..i].iter().collect())));
                continue;
            }
            other => {
                return Err(HypothesisError::Syntax {
                    position: i,
                    message: format!("unexpected character '{other}'"),
                })
            }
        };
        tokens.push((start, token));
        i += 1;
    }

    Ok(tokens)
}

const INTERCEPT: [char; 11] = ['(', 'I', 'n', 't', 'e', 'r', 'c', 'e', 'p', 't', ')'];

fn classify(name: &str) -> EstimateRef {
    let positional = name
        .strip_prefix('b')
        .filter(|digits| !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()))
        .map(|digits| digits.parse::<usize>().unwrap_or(usize::MAX));
    match positional {
        Some(k) => EstimateRef::Position(k),
        None => EstimateRef::Name(name.to_string()),
    }
}

// ========== Parser ==========

/// Parse `lhs [= rhs]` into `lhs - rhs`.
fn parse(source: &str) -> Result<LinearForm, HypothesisError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        len: source.chars().count(),
    };

    let lhs = parser.expr()?;
    let form = if parser.peek() == Some(&Token::Equals) {
        parser.pos += 1;
        let rhs = parser.expr()?;
        lhs.add(rhs.scale(-1.0))
    } else {
        lhs
    };

    if parser.pos < parser.tokens.len() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(form)
}

struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
    len: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, t)| t)
    }

    fn error(&self, message: impl Into<String>) -> HypothesisError {
        HypothesisError::Syntax {
            position: self.tokens.get(self.pos).map_or(self.len, |(p, _)| *p),
            message: message.into(),
        }
    }

    fn expr(&mut self) -> Result<LinearForm, HypothesisError> {
        let mut acc = self.term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.pos += 1;
                    let rhs = self.term()?;
                    acc = acc.add(rhs);
                }
                Some(Token::Minus) => {
                    self.pos += 1;
                    let rhs = self.term()?;
                    acc = acc.add(rhs.scale(-1.0));
                }
                _ => return Ok(acc),
            }
        }
    }

    fn term(&mut self) -> Result<LinearForm, HypothesisError> {
        let mut acc = self.unary()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.pos += 1;
                    let rhs = self.unary()?;
                    acc = match (acc.as_constant(), rhs.as_constant()) {
                        (Some(a), _) => rhs.scale(a),
                        (None, Some(b)) => acc.scale(b),
                        (None, None) => {
                            return Err(HypothesisError::Nonlinear(
                                "product of two estimates".to_string(),
                            ))
                        }
                    };
                }
                Some(Token::Slash) => {
                    self.pos += 1;
                    let rhs = self.unary()?;
                    match rhs.as_constant() {
                        Some(d) if d != 0.0 => acc = acc.scale(1.0 / d),
                        Some(_) => return Err(self.error("division by zero")),
                        None => {
                            return Err(HypothesisError::Nonlinear(
                                "division by an estimate".to_string(),
                            ))
                        }
                    }
                }
                _ => return Ok(acc),
            }
        }
    }

    fn unary(&mut self) -> Result<LinearForm, HypothesisError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                Ok(self.unary()?.scale(-1.0))
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.atom(),
        }
    }

    fn atom(&mut self) -> Result<LinearForm, HypothesisError> {
        match self.peek().cloned() {
            Some(Token::Number(v)) => {
                self.pos += 1;
                Ok(LinearForm::constant(v))
            }
            Some(Token::Name(name)) => {
                self.pos += 1;
                Ok(LinearForm::reference(classify(&name)))
            }
            Some(Token::LParen) => {
                self.pos += 1;
                let inner = self.expr()?;
                if self.peek() != Some(&Token::RParen) {
                    return Err(self.error("expected ')'"));
                }
                self.pos += 1;
                Ok(inner)
            }
            Some(other) => Err(self.error(format!("unexpected token {other:?}"))),
            None => Err(self.error("unexpected end of hypothesis")),
        }
    }
}
