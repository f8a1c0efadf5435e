//! Statement tokens and the value-to-token mapping.

use colored::Colorize;
use serde_json::Value;

/// Identifies what kind of token something is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// An unquoted key; like `foo` in `json.foo = 1;`
    Bare,
    /// A numeric key; like `2` in `json[2] = "foo";`
    NumericKey,
    /// A quoted key; like `foo bar` in `json["foo bar"] = 2;`
    QuotedKey,

    // Punctuation
    Dot,
    LBrace,
    RBrace,
    Equals,
    Semi,
    Comma,

    // Values
    String,
    Number,
    True,
    False,
    Null,
    EmptyArray,
    EmptyObject,

    /// Recognized but skipped; e.g. the `--` separator lines `grep -A` inserts
    Ignored,
    /// Marks the point at which lexing gave up on a line
    Error,
}

/// A token is a chunk of text from a statement with a kind attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub kind: TokenKind,
}

impl Token {
    pub fn new(text: impl Into<String>, kind: TokenKind) -> Self {
        Token {
            text: text.into(),
            kind,
        }
    }

    /// Returns true if the token is a value type.
    pub fn is_value(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::String
                | TokenKind::Number
                | TokenKind::True
                | TokenKind::False
                | TokenKind::Null
                | TokenKind::EmptyArray
                | TokenKind::EmptyObject
        )
    }

    /// Returns true if the token is a punctuation type.
    pub fn is_punct(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Dot
                | TokenKind::LBrace
                | TokenKind::RBrace
                | TokenKind::Equals
                | TokenKind::Semi
                | TokenKind::Comma
        )
    }

    /// Returns the token text as it appears in a rendered statement.
    /// The equals sign carries a space on each side.
    pub fn format(&self) -> String {
        if self.kind == TokenKind::Equals {
            format!(" {} ", self.text)
        } else {
            self.text.clone()
        }
    }

    /// Like [`Token::format`], with the terminal color for the kind applied.
    pub fn format_color(&self) -> String {
        let text = self.format();
        match self.kind {
            TokenKind::Bare => text.blue().bold().to_string(),
            TokenKind::NumericKey | TokenKind::Number => text.red().to_string(),
            TokenKind::QuotedKey | TokenKind::String => text.yellow().to_string(),
            TokenKind::LBrace
            | TokenKind::RBrace
            | TokenKind::EmptyArray
            | TokenKind::EmptyObject => text.magenta().to_string(),
            TokenKind::True | TokenKind::False | TokenKind::Null => text.cyan().to_string(),
            _ => text,
        }
    }
}

/// Returns the value token representing `v` in an assignment statement.
///
/// Objects and arrays collapse to their empty literal here; their contents
/// are expressed by later statements with extended paths. That convention
/// is what makes the output greppable.
pub fn value_token(v: &Value) -> Token {
    match v {
        Value::Object(_) => Token::new("{}", TokenKind::EmptyObject),
        Value::Array(_) => Token::new("[]", TokenKind::EmptyArray),
        Value::Number(n) => Token::new(n.to_string(), TokenKind::Number),
        Value::String(s) => Token::new(quote_string(s), TokenKind::String),
        Value::Bool(true) => Token::new("true", TokenKind::True),
        Value::Bool(false) => Token::new("false", TokenKind::False),
        Value::Null => Token::new("null", TokenKind::Null),
    }
}

/// Quotes and escapes a string for use in statement output.
///
/// The result is a valid JSON string and also a valid JavaScript string
/// literal: U+2028 and U+2029 are legal in JSON strings but not in
/// JavaScript source, so they are escaped alongside the usual set.
/// Remaining control characters become uppercase `\uXXXX` escapes; all
/// other characters pass through literally.
pub fn quote_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\u{0008}' => out.push_str("\\b"),
            '\u{000C}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c if c.is_control() => {
                out.push_str(&format!("\\u{:04X}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
