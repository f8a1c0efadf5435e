//! Assignment statements and statement lists.
//!
//! A statement is a sequence of tokens representing one assignment:
//!
//! ```text
//! json.city = "Leeds";
//! ```
//!
//! where `json`, `.`, `city`, `=`, `"Leeds"` and `;` are discrete tokens.
//! Keeping statements as tokens rather than strings makes the natural sort
//! a cheap token-wise walk and lets the same type serve both directions of
//! the transformation.

use std::cmp::Ordering;
use std::fmt;
use std::io::Read;

use serde_json::Value;
use thiserror::Error;

use crate::identifier::is_valid_identifier;
use crate::token::{quote_string, value_token, Token, TokenKind};
use crate::ungron::{merge, ungron_tokens, UngronError};

/// Errors from converting between statements and the JSON-spec encoding.
#[derive(Debug, Error)]
pub enum JsonSpecError {
    /// The statement is not a complete assignment.
    #[error("non-assignment statement")]
    NotAssignment,
    /// The line is JSON, but not of the `[[path, ...], value]` shape.
    #[error("invalid JSON layout")]
    InvalidLayout,
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// One assignment statement, as an ordered token sequence.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Statement {
    tokens: Vec<Token>,
}

impl Statement {
    pub fn new() -> Self {
        Statement::default()
    }

    /// A path statement holding only the root anchor, conventionally `json`.
    pub fn root(anchor: &str) -> Self {
        Statement {
            tokens: vec![Token::new(anchor, TokenKind::Bare)],
        }
    }

    pub fn push(&mut self, t: Token) {
        self.tokens.push(t);
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Returns a copy of the statement with `. key` appended.
    pub fn with_bare(&self, key: &str) -> Statement {
        let mut s = self.clone();
        s.push(Token::new(".", TokenKind::Dot));
        s.push(Token::new(key, TokenKind::Bare));
        s
    }

    /// Returns a copy of the statement with `["key"]` appended.
    pub fn with_quoted_key(&self, key: &str) -> Statement {
        let mut s = self.clone();
        s.push(Token::new("[", TokenKind::LBrace));
        s.push(Token::new(quote_string(key), TokenKind::QuotedKey));
        s.push(Token::new("]", TokenKind::RBrace));
        s
    }

    /// Returns a copy of the statement with `[index]` appended.
    pub fn with_numeric_key(&self, index: usize) -> Statement {
        let mut s = self.clone();
        s.push(Token::new("[", TokenKind::LBrace));
        s.push(Token::new(index.to_string(), TokenKind::NumericKey));
        s.push(Token::new("]", TokenKind::RBrace));
        s
    }

    /// Returns the colorized string form of the statement.
    /// The plain [`fmt::Display`] form is the canonical wire format.
    pub fn color_string(&self) -> String {
        self.tokens.iter().map(Token::format_color).collect()
    }

    /// Rewrites a complete assignment into the JSON-spec encoding:
    /// a JSON array `[[pathElement, ...], value]` with the root anchor
    /// omitted from the path.
    pub fn jsonify(&self) -> Result<Statement, JsonSpecError> {
        let n = self.tokens.len();
        if n < 4
            || self.tokens[0].kind != TokenKind::Bare
            || self.tokens[n - 3].kind != TokenKind::Equals
            || self.tokens[n - 1].kind != TokenKind::Semi
        {
            return Err(JsonSpecError::NotAssignment);
        }

        let mut out: Vec<Token> = Vec::with_capacity(n + 1);
        out.push(Token::new("[", TokenKind::LBrace));
        out.push(Token::new("[", TokenKind::LBrace));
        for t in &self.tokens[1..n - 3] {
            match t.kind {
                TokenKind::NumericKey | TokenKind::QuotedKey => {
                    out.push(t.clone());
                    out.push(Token::new(",", TokenKind::Comma));
                }
                TokenKind::Bare => {
                    out.push(Token::new(quote_string(&t.text), TokenKind::QuotedKey));
                    out.push(Token::new(",", TokenKind::Comma));
                }
                _ => {}
            }
        }
        if out.last().map(|t| t.kind) == Some(TokenKind::Comma) {
            out.pop();
        }
        out.push(Token::new("]", TokenKind::RBrace));
        out.push(Token::new(",", TokenKind::Comma));
        out.push(self.tokens[n - 2].clone());
        out.push(Token::new("]", TokenKind::RBrace));

        Ok(Statement { tokens: out })
    }

    /// Parses one line of JSON-spec encoded input back into a statement.
    pub fn from_json_spec(line: &str) -> Result<Statement, JsonSpecError> {
        let parsed: Value = serde_json::from_str(line)?;
        let (path, value) = match parsed {
            Value::Array(mut parts) if parts.len() == 2 => {
                let value = parts.pop();
                let path = parts.pop();
                match (path, value) {
                    (Some(Value::Array(path)), Some(value)) => (path, value),
                    _ => return Err(JsonSpecError::InvalidLayout),
                }
            }
            _ => return Err(JsonSpecError::InvalidLayout),
        };

        let mut s = Statement::root("json");
        for element in path {
            s.push(Token::new("[", TokenKind::LBrace));
            match element {
                Value::String(key) => {
                    s.push(Token::new(quote_string(&key), TokenKind::QuotedKey));
                }
                // Array indices must be non-negative integers
                Value::Number(n) => match n.as_u64() {
                    Some(index) => s.push(Token::new(index.to_string(), TokenKind::NumericKey)),
                    None => return Err(JsonSpecError::InvalidLayout),
                },
                _ => return Err(JsonSpecError::InvalidLayout),
            }
            s.push(Token::new("]", TokenKind::RBrace));
        }

        s.push(Token::new("=", TokenKind::Equals));
        match &value {
            Value::Array(a) if !a.is_empty() => return Err(JsonSpecError::InvalidLayout),
            Value::Object(o) if !o.is_empty() => return Err(JsonSpecError::InvalidLayout),
            v => s.push(value_token(v)),
        }
        s.push(Token::new(";", TokenKind::Semi));

        Ok(s)
    }

    /// Total order over statements: a natural sort that keeps array
    /// indices in numeric order and a path's own definition immediately
    /// before its descendants.
    ///
    /// Walks both token sequences in parallel; at the first differing
    /// token, an equals sign wins, numeric keys compare as integers,
    /// number values compare as floats, and anything else compares by
    /// text. Identical statements compare equal.
    pub fn natural_cmp(&self, other: &Statement) -> Ordering {
        for (i, ta) in self.tokens.iter().enumerate() {
            let tb = match other.tokens.get(i) {
                Some(t) => t,
                // The shorter statement comes first
                None => return Ordering::Greater,
            };
            if ta == tb {
                continue;
            }

            // An equals sign always comes first, so `json.x = {};` sorts
            // immediately before `json.x.a = ...;`
            if ta.kind == TokenKind::Equals {
                return Ordering::Less;
            }
            if tb.kind == TokenKind::Equals {
                return Ordering::Greater;
            }

            if ta.kind == TokenKind::NumericKey && tb.kind == TokenKind::NumericKey {
                return cmp_integer_text(&ta.text, &tb.text);
            }
            if ta.kind == TokenKind::Number && tb.kind == TokenKind::Number {
                return cmp_number_text(&ta.text, &tb.text);
            }
            return ta.text.cmp(&tb.text);
        }
        if self.tokens.len() == other.tokens.len() {
            Ordering::Equal
        } else {
            Ordering::Less
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for t in &self.tokens {
            f.write_str(&t.format())?;
        }
        Ok(())
    }
}

impl From<Vec<Token>> for Statement {
    fn from(tokens: Vec<Token>) -> Self {
        Statement { tokens }
    }
}

fn cmp_integer_text(a: &str, b: &str) -> Ordering {
    let ia: u64 = a.parse().unwrap_or(0);
    let ib: u64 = b.parse().unwrap_or(0);
    ia.cmp(&ib)
}

// The float interpretation orders the output only; the preserved decimal
// text of the token is never rewritten.
fn cmp_number_text(a: &str, b: &str) -> Ordering {
    let fa: f64 = a.trim().parse().unwrap_or(f64::NAN);
    let fb: f64 = b.trim().parse().unwrap_or(f64::NAN);
    fa.partial_cmp(&fb).unwrap_or(Ordering::Equal)
}

/// An ordered list of assignment statements.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Statements {
    statements: Vec<Statement>,
}

impl Statements {
    pub fn new() -> Self {
        Statements::default()
    }

    /// Appends a complete statement.
    pub fn add(&mut self, s: Statement) {
        self.statements.push(s);
    }

    /// Copies `path`, appends `= value ;`, and adds the result.
    pub fn add_with_value(&mut self, path: &Statement, value: Token) {
        let mut s = path.clone();
        s.push(Token::new("=", TokenKind::Equals));
        s.push(value);
        s.push(Token::new(";", TokenKind::Semi));
        self.add(s);
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Statement> {
        self.statements.iter()
    }

    /// Sorts the statements into the canonical natural order. The sort is
    /// stable, so any permutation of the same list sorts identically.
    pub fn sort(&mut self) {
        self.statements.sort_by(Statement::natural_cmp);
    }

    /// Mostly here to make testing things easier.
    pub fn contains(&self, s: &Statement) -> bool {
        self.statements.contains(s)
    }

    /// Reads a single JSON document from `r` and flattens it into
    /// statements rooted at `prefix`.
    ///
    /// ```
    /// use gron::statement::{Statement, Statements};
    ///
    /// let input = br#"{"a": 1, "b": [10, 20]}"#;
    /// let mut ss = Statements::from_json(&input[..], Statement::root("json")).unwrap();
    /// ss.sort();
    /// let lines: Vec<String> = ss.iter().map(|s| s.to_string()).collect();
    /// assert_eq!(
    ///     lines,
    ///     [
    ///         "json = {};",
    ///         "json.a = 1;",
    ///         "json.b = [];",
    ///         "json.b[0] = 10;",
    ///         "json.b[1] = 20;",
    ///     ]
    /// );
    /// ```
    pub fn from_json<R: Read>(r: R, prefix: Statement) -> serde_json::Result<Statements> {
        let top: Value = serde_json::from_reader(r)?;
        let mut ss = Statements::new();
        ss.fill(&prefix, &top);
        Ok(ss)
    }

    /// Recursively walks `v`, adding a statement for every node reachable
    /// under `prefix`. Object keys extend the path bare when they qualify
    /// as identifiers and quoted otherwise; array elements extend it by
    /// index. Member order is whatever the decoder yielded; callers that
    /// want determinism sort afterwards.
    pub fn fill(&mut self, prefix: &Statement, v: &Value) {
        self.add_with_value(prefix, value_token(v));

        match v {
            Value::Object(members) => {
                for (key, sub) in members {
                    if is_valid_identifier(key) {
                        self.fill(&prefix.with_bare(key), sub);
                    } else {
                        self.fill(&prefix.with_quoted_key(key), sub);
                    }
                }
            }
            Value::Array(elements) => {
                for (index, sub) in elements.iter().enumerate() {
                    self.fill(&prefix.with_numeric_key(index), sub);
                }
            }
            _ => {}
        }
    }

    /// Parses every statement into its JSON fragment and merges the
    /// fragments into a single value. Blank and separator lines are
    /// skipped; any other failure is fatal and names the offending
    /// statement.
    pub fn to_value(&self) -> Result<Value, UngronError> {
        let mut merged: Option<Value> = None;
        for s in &self.statements {
            let fragment = match ungron_tokens(s.tokens()) {
                Ok(v) => v,
                Err(e) if e.is_recoverable() => continue,
                Err(e) => {
                    return Err(UngronError::Statement {
                        statement: s.to_string(),
                        source: Box::new(e),
                    })
                }
            };
            merged = Some(match merged {
                None => fragment,
                Some(m) => merge(m, fragment)?,
            });
        }
        merged.ok_or(UngronError::NoStatements)
    }
}

impl<'a> IntoIterator for &'a Statements {
    type Item = &'a Statement;
    type IntoIter = std::slice::Iter<'a, Statement>;

    fn into_iter(self) -> Self::IntoIter {
        self.statements.iter()
    }
}

impl FromIterator<Statement> for Statements {
    fn from_iter<I: IntoIterator<Item = Statement>>(iter: I) -> Self {
        Statements {
            statements: iter.into_iter().collect(),
        }
    }
}
