//! Lexing of textual assignment lines back into token sequences.
//!
//! The expected input grammar is:
//!
//! ```text
//! Statement := Path Space* '=' Space* Value ';'?
//! Path      := Bare ('.' Bare | '[' (Digits | String) ']')*
//! Value     := String | Number | 'true' | 'false' | 'null' | '[]' | '{}'
//! String    := '"' (UnescapedChar | '\' (["\/bfnrt] | 'u' Hex Hex Hex Hex))* '"'
//! ```
//!
//! A line may also be a separator (`--` and friends, as inserted by
//! `grep -A`); those lex to a single [`TokenKind::Ignored`] token. A line
//! the lexer cannot make sense of ends in a [`TokenKind::Error`] token,
//! and downstream processing treats the whole line as unusable.

use crate::identifier::{is_valid_first_char, is_valid_secondary_char};
use crate::statement::Statement;
use crate::token::{Token, TokenKind};

/// A state consumes some input, may emit tokens, and hands back the next
/// state; `None` ends the lex. (The tuple struct breaks what would
/// otherwise be a recursive function-pointer type.)
struct State(fn(&mut Lexer<'_>) -> Option<State>);

/// Holds the state for lexing a single statement line.
///
/// A lexer is single-use: [`Lexer::lex`] consumes it, so a fresh lexer is
/// constructed per line and tokens come out strictly in input order.
pub struct Lexer<'a> {
    text: &'a str,
    pos: usize,
    token_start: usize,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    pub fn new(text: &'a str) -> Self {
        Lexer {
            text,
            pos: 0,
            token_start: 0,
            tokens: Vec::new(),
        }
    }

    /// Runs the lexer to completion and returns the lexed statement.
    pub fn lex(mut self) -> Statement {
        let mut state = Some(State(lex_statement));
        while let Some(State(f)) = state {
            state = f(&mut self);
        }
        Statement::from(self.tokens)
    }

    /// The next character, without consuming it.
    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    /// Consumes and returns the next character.
    fn next(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    /// Consumes the next character if it is in `valid`.
    fn accept(&mut self, valid: &str) -> bool {
        match self.peek() {
            Some(c) if valid.contains(c) => {
                self.next();
                true
            }
            _ => false,
        }
    }

    /// Consumes characters for as long as they are in `valid`.
    fn accept_run(&mut self, valid: &str) {
        while self.accept(valid) {}
    }

    /// Consumes the next character if `pred` allows it.
    fn accept_if(&mut self, pred: impl Fn(char) -> bool) -> bool {
        match self.peek() {
            Some(c) if pred(c) => {
                self.next();
                true
            }
            _ => false,
        }
    }

    /// Consumes characters for as long as `pred` allows them.
    fn accept_while(&mut self, pred: impl Fn(char) -> bool) {
        while self.accept_if(&pred) {}
    }

    /// Consumes characters up to (not including) any of `delims`, or to
    /// the end of the input.
    fn accept_until(&mut self, delims: &str) {
        while let Some(c) = self.peek() {
            if delims.contains(c) {
                return;
            }
            self.next();
        }
    }

    /// Like `accept_until`, except a backslash escapes the following
    /// character, so `\"` does not terminate a quoted string.
    fn accept_until_unescaped(&mut self, delims: &str) {
        let mut in_escape = false;
        while let Some(c) = self.peek() {
            if c == '\\' && !in_escape {
                in_escape = true;
                self.next();
                continue;
            }
            if delims.contains(c) && !in_escape {
                return;
            }
            in_escape = false;
            self.next();
        }
    }

    /// Drops the text consumed so far without emitting a token.
    fn ignore(&mut self) {
        self.token_start = self.pos;
    }

    /// Emits the text consumed since the last emit as a token of `kind`.
    fn emit(&mut self, kind: TokenKind) {
        let text = self.text[self.token_start..self.pos].to_string();
        self.token_start = self.pos;
        self.tokens.push(Token::new(text, kind));
    }
}

/// Lexes one line into a statement. Convenience wrapper over [`Lexer`].
pub fn lex_line(line: &str) -> Statement {
    Lexer::new(line).lex()
}

/// The highest-level state: dispatches on the first significant character.
fn lex_statement(l: &mut Lexer<'_>) -> Option<State> {
    match l.peek() {
        Some(c) if c == '.' || is_valid_first_char(c) => Some(State(lex_bare_word)),
        Some('[') => Some(State(lex_braces)),
        Some(' ') | Some('=') => Some(State(lex_value)),
        // grep -A and friends insert `--` between groups of lines; keep
        // the text but mark the line so it gets skipped downstream
        Some('-') => Some(State(lex_ignored)),
        None => None,
        Some(_) => {
            l.emit(TokenKind::Error);
            None
        }
    }
}

/// Lexes a bare identifier and its leading dot when present; e.g. the
/// `foo` in `foo.bar` or `foo[0]`.
fn lex_bare_word(l: &mut Lexer<'_>) -> Option<State> {
    if l.accept(".") {
        l.emit(TokenKind::Dot);
    }

    if !l.accept_if(is_valid_first_char) {
        l.emit(TokenKind::Error);
        return None;
    }
    l.accept_while(is_valid_secondary_char);
    l.emit(TokenKind::Bare);

    Some(State(lex_statement))
}

/// Lexes a key contained within square braces.
fn lex_braces(l: &mut Lexer<'_>) -> Option<State> {
    l.accept("[");
    l.emit(TokenKind::LBrace);

    match l.peek() {
        Some(c) if c.is_numeric() => Some(State(lex_numeric_key)),
        Some('"') => Some(State(lex_quoted_key)),
        _ => {
            l.emit(TokenKind::Error);
            None
        }
    }
}

/// Lexes a numeric key between square braces.
fn lex_numeric_key(l: &mut Lexer<'_>) -> Option<State> {
    l.accept_while(char::is_numeric);
    l.emit(TokenKind::NumericKey);

    if l.accept("]") {
        l.emit(TokenKind::RBrace);
        Some(State(lex_statement))
    } else {
        l.emit(TokenKind::Error);
        None
    }
}

/// Lexes a quoted key between square braces.
fn lex_quoted_key(l: &mut Lexer<'_>) -> Option<State> {
    l.accept("\"");
    l.accept_until_unescaped("\"");
    l.accept("\"");
    l.emit(TokenKind::QuotedKey);

    if l.accept("]") {
        l.emit(TokenKind::RBrace);
        Some(State(lex_statement))
    } else {
        l.emit(TokenKind::Error);
        None
    }
}

/// Lexes the `= value` tail of a statement. The value is always the last
/// thing in a statement, so this state never hands control back.
fn lex_value(l: &mut Lexer<'_>) -> Option<State> {
    l.accept_run(" ");
    l.ignore();

    if l.accept("=") {
        l.emit(TokenKind::Equals);
    } else {
        return None;
    }
    l.accept_run(" ");
    l.ignore();

    if l.accept("\"") {
        l.accept_until_unescaped("\"");
        l.accept("\"");
        l.emit(TokenKind::String);
    } else if l.accept("t") {
        l.accept_run("rue");
        l.emit(TokenKind::True);
    } else if l.accept("f") {
        l.accept_run("alse");
        l.emit(TokenKind::False);
    } else if l.accept("n") {
        l.accept_run("ul");
        l.emit(TokenKind::Null);
    } else if l.accept("[") {
        l.accept("]");
        l.emit(TokenKind::EmptyArray);
    } else if l.accept("{") {
        l.accept("}");
        l.emit(TokenKind::EmptyObject);
    } else {
        // Anything else is assumed to be a number; if it is not, decoding
        // the token text fails when the statement is ungronned
        l.accept_until(";");
        l.emit(TokenKind::Number);
    }

    l.accept_run(" ");
    l.ignore();
    if l.accept(";") {
        l.emit(TokenKind::Semi);
    }
    None
}

/// Consumes the rest of the line and emits it as a single ignored token.
fn lex_ignored(l: &mut Lexer<'_>) -> Option<State> {
    while l.next().is_some() {}
    l.emit(TokenKind::Ignored);
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(line: &str) -> Vec<TokenKind> {
        lex_line(line).tokens().iter().map(|t| t.kind).collect()
    }

    fn texts(line: &str) -> Vec<String> {
        lex_line(line)
            .tokens()
            .iter()
            .map(|t| t.text.clone())
            .collect()
    }

    #[test]
    fn test_lex_simple_assignments() {
        use TokenKind::*;

        let cases: &[(&str, &[(&str, TokenKind)])] = &[
            (
                r#"json.foo = 1;"#,
                &[
                    ("json", Bare),
                    (".", Dot),
                    ("foo", Bare),
                    ("=", Equals),
                    ("1", Number),
                    (";", Semi),
                ],
            ),
            (
                r#"json.foo = "bar";"#,
                &[
                    ("json", Bare),
                    (".", Dot),
                    ("foo", Bare),
                    ("=", Equals),
                    (r#""bar""#, String),
                    (";", Semi),
                ],
            ),
            (
                r#"json[0] = "bar";"#,
                &[
                    ("json", Bare),
                    ("[", LBrace),
                    ("0", NumericKey),
                    ("]", RBrace),
                    ("=", Equals),
                    (r#""bar""#, String),
                    (";", Semi),
                ],
            ),
            (
                r#"json["foo"] = "bar";"#,
                &[
                    ("json", Bare),
                    ("[", LBrace),
                    (r#""foo""#, QuotedKey),
                    ("]", RBrace),
                    ("=", Equals),
                    (r#""bar""#, String),
                    (";", Semi),
                ],
            ),
            (
                r#"json.foo["bar"][0] = true;"#,
                &[
                    ("json", Bare),
                    (".", Dot),
                    ("foo", Bare),
                    ("[", LBrace),
                    (r#""bar""#, QuotedKey),
                    ("]", RBrace),
                    ("[", LBrace),
                    ("0", NumericKey),
                    ("]", RBrace),
                    ("=", Equals),
                    ("true", True),
                    (";", Semi),
                ],
            ),
        ];

        for (line, want) in cases {
            let have = lex_line(line);
            let want: Vec<Token> = want
                .iter()
                .map(|(text, kind)| Token::new(*text, *kind))
                .collect();
            assert_eq!(have.tokens(), &want[..], "lexing `{line}`");
        }
    }

    #[test]
    fn test_lex_value_literals() {
        use TokenKind::*;
        assert_eq!(kinds("json = true;"), [Bare, Equals, True, Semi]);
        assert_eq!(kinds("json = false;"), [Bare, Equals, False, Semi]);
        assert_eq!(kinds("json = null;"), [Bare, Equals, Null, Semi]);
        assert_eq!(kinds("json = [];"), [Bare, Equals, EmptyArray, Semi]);
        assert_eq!(kinds("json = {};"), [Bare, Equals, EmptyObject, Semi]);
        assert_eq!(kinds("json = 1.21e7;"), [Bare, Equals, Number, Semi]);
        assert_eq!(kinds("json = -42;"), [Bare, Equals, Number, Semi]);
    }

    #[test]
    fn test_semicolon_is_optional() {
        use TokenKind::*;
        assert_eq!(kinds("json.a = 1"), [Bare, Dot, Bare, Equals, Number]);
    }

    #[test]
    fn test_escaped_quotes_do_not_terminate() {
        let have = texts(r#"json["a \"b\" c"] = "d \" e";"#);
        assert_eq!(
            have,
            ["json", "[", r#""a \"b\" c""#, "]", "=", r#""d \" e""#, ";"]
        );
    }

    #[test]
    fn test_unicode_keys_lex_bare() {
        use TokenKind::*;
        assert_eq!(kinds("json.ಠ_ಠ = 1;"), [Bare, Dot, Bare, Equals, Number, Semi]);
        assert_eq!(texts("json.ಠ_ಠ = 1;")[2], "ಠ_ಠ");
    }

    #[test]
    fn test_separator_lines_are_ignored() {
        use TokenKind::*;
        assert_eq!(kinds("--"), [Ignored]);
        assert_eq!(kinds("-- anything at all"), [Ignored]);
        assert_eq!(texts("--"), ["--"]);
    }

    #[test]
    fn test_empty_line_lexes_to_nothing() {
        assert!(lex_line("").is_empty());
    }

    #[test]
    fn test_malformed_lines_end_in_error() {
        use TokenKind::*;
        assert_eq!(kinds("wat!"), [Bare, Error]);
        assert_eq!(kinds("!wat"), [Error]);
        assert_eq!(kinds("json[foo]"), [Bare, LBrace, Error]);
        assert_eq!(kinds("json[0"), [Bare, LBrace, NumericKey, Error]);
        assert_eq!(
            kinds(r#"json["k""#),
            [Bare, LBrace, QuotedKey, Error]
        );
    }

    #[test]
    fn test_partial_lines_lex_without_error() {
        use TokenKind::*;
        // Not statements, but nothing the lexer chokes on either; the
        // ungron pre-checks are what reject these
        assert_eq!(kinds("not an identifier at all"), [Bare]);
        assert_eq!(kinds("json.foo"), [Bare, Dot, Bare]);
    }

    #[test]
    fn test_spaces_around_equals() {
        use TokenKind::*;
        assert_eq!(kinds("json.a   =   1;"), [Bare, Dot, Bare, Equals, Number, Semi]);
        let have = texts("json.a   =   1;");
        assert_eq!(have, ["json", ".", "a", "=", "1", ";"]);
    }
}
