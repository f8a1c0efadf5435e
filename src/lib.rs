//! # gron
//!
//! A bidirectional transformer between JSON documents and a line-oriented,
//! grep-friendly representation of discrete assignments.
//!
//! The forward direction flattens a document into statements, one per
//! node, each a JavaScript-style path assignment:
//!
//! ```text
//! json = {};
//! json.contact = {};
//! json.contact["e-mail"] = [];
//! json.contact["e-mail"][0] = "mail@example.com";
//! ```
//!
//! The reverse direction reconstructs a document from any self-consistent
//! subset of such lines, however filtered or reordered:
//!
//! ```
//! use gron::lexer::lex_line;
//! use gron::statement::Statements;
//! use gron::ungron::unwrap_root;
//!
//! let mut ss = Statements::new();
//! ss.add(lex_line(r#"json.contact["e-mail"][0] = "mail@example.com";"#));
//! ss.add(lex_line(r#"json.contact.twitter = "@example";"#));
//!
//! let value = unwrap_root(ss.to_value().unwrap(), "json");
//! assert_eq!(value["contact"]["twitter"], "@example");
//! ```
//!
//! Statements are token sequences end to end: the flattener emits them,
//! the [`lexer`] reads them back, the natural sort compares them token by
//! token, and color is applied only at rendering time.

pub mod identifier;
pub mod lexer;
pub mod statement;
pub mod token;
pub mod ungron;

pub use lexer::Lexer;
pub use statement::{JsonSpecError, Statement, Statements};
pub use token::{Token, TokenKind};
pub use ungron::{unwrap_root, UngronError};
