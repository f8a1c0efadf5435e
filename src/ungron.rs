//! Turning statements back into a JSON value.
//!
//! Ungronning runs in two phases. First each lexed token sequence becomes
//! the JSON *fragment* it describes: a chain of single-member objects or
//! sparse single-element arrays ending in the assigned value. Then the
//! fragments are folded together with a recursive merge, unifying
//! overlapping objects and arrays while preserving index sparsity.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::token::{Token, TokenKind};

/// Errors from ungronning statements.
#[derive(Debug, Error)]
pub enum UngronError {
    /// A line carrying no statement: blank, or a separator such as the
    /// `--` lines `grep -A` inserts. Skipped rather than failing the batch.
    #[error("skipped: {0}")]
    Skipped(&'static str),
    /// The lexer gave up part-way through the line.
    #[error("invalid statement")]
    InvalidStatement,
    #[error("statement has no value")]
    NoValue,
    #[error("invalid value `{0}`")]
    InvalidValue(String),
    #[error("invalid quoted key `{0}`")]
    InvalidQuotedKey(String),
    #[error("invalid integer key `{0}`")]
    InvalidIntegerKey(String),
    #[error("unexpected token `{0}`")]
    UnexpectedToken(String),
    /// Two statements disagree on the shape of the value at some path.
    #[error("cannot merge {0} with {1}")]
    MergeConflict(&'static str, &'static str),
    #[error("no statements were parsed")]
    NoStatements,
    /// A fatal error, annotated with the statement it came from.
    #[error("ungron failed for `{statement}`: {source}")]
    Statement {
        statement: String,
        #[source]
        source: Box<UngronError>,
    },
}

impl UngronError {
    /// Recoverable errors skip the offending line instead of failing the
    /// whole batch.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, UngronError::Skipped(_))
    }
}

/// Converts one token sequence into the JSON fragment it describes.
///
/// Blank lines and separator lines return a recoverable error; anything
/// else that fails to convert is fatal for the line.
pub fn ungron_tokens(tokens: &[Token]) -> Result<Value, UngronError> {
    if tokens.is_empty() {
        return Err(UngronError::Skipped("empty input"));
    }
    if tokens[0].kind == TokenKind::Ignored {
        return Err(UngronError::Skipped("ignored line"));
    }
    if tokens.iter().any(|t| t.kind == TokenKind::Error) {
        return Err(UngronError::InvalidStatement);
    }

    // The optional trailing semicolon aside, the last token must be the
    // assigned value
    let mut significant = tokens;
    if let Some(t) = significant.last() {
        if t.kind == TokenKind::Semi {
            significant = &significant[..significant.len() - 1];
        }
    }
    match significant.last() {
        Some(t) if t.is_value() => {}
        _ => return Err(UngronError::NoValue),
    }

    ungron_path(tokens)
}

fn ungron_path(tokens: &[Token]) -> Result<Value, UngronError> {
    let (head, rest) = match tokens.split_first() {
        Some(split) => split,
        None => return Err(UngronError::NoValue),
    };

    if head.is_punct() {
        return ungron_path(rest);
    }
    if head.is_value() {
        return serde_json::from_str(&head.text)
            .map_err(|_| UngronError::InvalidValue(head.text.clone()));
    }

    match head.kind {
        TokenKind::Bare => {
            let val = ungron_path(rest)?;
            let mut out = Map::new();
            out.insert(head.text.clone(), val);
            Ok(Value::Object(out))
        }
        TokenKind::QuotedKey => {
            let val = ungron_path(rest)?;
            let key: String = serde_json::from_str(&head.text)
                .map_err(|_| UngronError::InvalidQuotedKey(head.text.clone()))?;
            let mut out = Map::new();
            out.insert(key, val);
            Ok(Value::Object(out))
        }
        TokenKind::NumericKey => {
            let index: usize = head
                .text
                .parse()
                .map_err(|_| UngronError::InvalidIntegerKey(head.text.clone()))?;
            let val = ungron_path(rest)?;
            // A sparse array: holes below the index, the value at it
            let mut out = vec![Value::Null; index + 1];
            out[index] = val;
            Ok(Value::Array(out))
        }
        _ => Err(UngronError::UnexpectedToken(head.text.clone())),
    }
}

/// Merges two fragments, unifying overlapping objects and arrays.
///
/// Objects union by key; arrays fill holes index-wise; two scalars at the
/// same path take the later value. Any other pairing means the statements
/// disagree on the shape of the document and is an error.
pub fn merge(a: Value, b: Value) -> Result<Value, UngronError> {
    match (a, b) {
        (Value::Object(a), Value::Object(b)) => merge_objects(a, b),
        (Value::Array(a), Value::Array(b)) => merge_arrays(a, b),
        (a, b) if is_container(&a) || is_container(&b) => {
            Err(UngronError::MergeConflict(type_name(&a), type_name(&b)))
        }
        (_, b) => Ok(b),
    }
}

fn merge_objects(
    mut a: Map<String, Value>,
    b: Map<String, Value>,
) -> Result<Value, UngronError> {
    for (key, value) in b {
        match a.get_mut(&key) {
            None => {
                a.insert(key, value);
            }
            Some(slot) => {
                let prev = slot.take();
                *slot = merge(prev, value)?;
            }
        }
    }
    Ok(Value::Object(a))
}

fn merge_arrays(mut a: Vec<Value>, b: Vec<Value>) -> Result<Value, UngronError> {
    if b.len() > a.len() {
        a.resize(b.len(), Value::Null);
    }
    for (i, value) in b.into_iter().enumerate() {
        if a[i].is_null() {
            a[i] = value;
        } else if !value.is_null() {
            // A populated slot never loses to a hole
            let prev = a[i].take();
            a[i] = merge(prev, value)?;
        }
    }
    Ok(Value::Array(a))
}

fn is_container(v: &Value) -> bool {
    v.is_object() || v.is_array()
}

/// Human name for a value's JSON type, for conflict reporting.
fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Strips the synthetic root wrapper: if the merged result is an object
/// whose only key is `anchor`, the value under it is the document.
pub fn unwrap_root(value: Value, anchor: &str) -> Value {
    match value {
        Value::Object(mut m) if m.len() == 1 && m.contains_key(anchor) => {
            m.remove(anchor).unwrap_or(Value::Null)
        }
        v => v,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex_line;
    use serde_json::json;

    fn fragment(line: &str) -> Value {
        ungron_tokens(lex_line(line).tokens()).unwrap()
    }

    #[test]
    fn test_fragments() {
        let cases = [
            (r#"json.foo = 1;"#, json!({"json": {"foo": 1}})),
            (r#"json.foo = "bar";"#, json!({"json": {"foo": "bar"}})),
            (r#"json.foo = {};"#, json!({"json": {"foo": {}}})),
            (r#"json.foo = [];"#, json!({"json": {"foo": []}})),
            (
                r#"json["foo bar"] = true;"#,
                json!({"json": {"foo bar": true}}),
            ),
            (
                r#"json[2] = "three";"#,
                json!({"json": [null, null, "three"]}),
            ),
            (
                r#"json.a[1].b = null;"#,
                json!({"json": {"a": [null, {"b": null}]}}),
            ),
            (r#"json = 3"#, json!({"json": 3})),
        ];
        for (line, want) in cases {
            assert_eq!(fragment(line), want, "fragment of `{line}`");
        }
    }

    #[test]
    fn test_blank_and_separator_lines_are_recoverable() {
        for line in ["", "--", "-- separator --"] {
            let err = ungron_tokens(lex_line(line).tokens()).unwrap_err();
            assert!(err.is_recoverable(), "`{line}` should be recoverable");
        }
    }

    #[test]
    fn test_fatal_lines() {
        for line in ["wat!", "json[foo] = 1;", "json.foo", "json.foo = ;"] {
            let err = ungron_tokens(lex_line(line).tokens()).unwrap_err();
            assert!(!err.is_recoverable(), "`{line}` should be fatal");
        }
    }

    #[test]
    fn test_bad_value_text_is_fatal() {
        // Lexes as a Number token, but the text is not decodable JSON
        let err = ungron_tokens(lex_line("json.foo = totes not json;").tokens()).unwrap_err();
        assert!(matches!(err, UngronError::InvalidValue(_)));
    }

    #[test]
    fn test_merge_objects() {
        let a = fragment(r#"json.contact["e-mail"][0] = "mail@example.com";"#);
        let b = fragment(r#"json.contact["e-mail"][1] = "mail@example.org";"#);
        let c = fragment(r#"json.contact["e-mail"][3] = "mail@example.net";"#);
        let d = fragment(r#"json.contact.twitter = "@example";"#);

        let merged = [b, c, d]
            .into_iter()
            .try_fold(a, merge)
            .unwrap();

        assert_eq!(
            merged,
            json!({
                "json": {
                    "contact": {
                        "e-mail": [
                            "mail@example.com",
                            "mail@example.org",
                            null,
                            "mail@example.net",
                        ],
                        "twitter": "@example",
                    }
                }
            })
        );
    }

    #[test]
    fn test_scalar_merge_takes_the_later_value() {
        let merged = merge(fragment("json.a = 1;"), fragment("json.a = 2;")).unwrap();
        assert_eq!(merged, json!({"json": {"a": 2}}));

        // Scalar types may differ; the later statement still wins
        let merged = merge(fragment("json.a = 1;"), fragment(r#"json.a = "s";"#)).unwrap();
        assert_eq!(merged, json!({"json": {"a": "s"}}));
    }

    #[test]
    fn test_merge_keeps_populated_slots_over_holes() {
        let a = fragment("json[2] = 2;");
        let b = fragment("json[0] = 0;");
        let merged = merge(a, b).unwrap();
        assert_eq!(merged, json!({"json": [0, null, 2]}));
    }

    #[test]
    fn test_shape_conflicts_are_errors() {
        let cases = [
            ("json.x[0] = 1;", "json.x.foo = 1;"),
            ("json.x.foo = 1;", "json.x[0] = 1;"),
            ("json.x = 1;", "json.x.foo = 1;"),
            ("json.x[0] = 1;", "json.x = 1;"),
        ];
        for (first, second) in cases {
            let err = merge(fragment(first), fragment(second)).unwrap_err();
            assert!(
                matches!(err, UngronError::MergeConflict(_, _)),
                "`{first}` + `{second}` should conflict, got {err:?}"
            );
        }
    }

    #[test]
    fn test_unwrap_root() {
        assert_eq!(
            unwrap_root(json!({"json": {"a": 1}}), "json"),
            json!({"a": 1})
        );
        // More than one top-level key: left alone
        assert_eq!(
            unwrap_root(json!({"json": 1, "other": 2}), "json"),
            json!({"json": 1, "other": 2})
        );
        // Different key: left alone
        assert_eq!(unwrap_root(json!({"data": 1}), "json"), json!({"data": 1}));
        // Not an object: left alone
        assert_eq!(unwrap_root(json!([1, 2]), "json"), json!([1, 2]));
    }
}
