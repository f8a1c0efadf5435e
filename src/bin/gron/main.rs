//! gron CLI: transform JSON (from a file, URL, or stdin) into discrete
//! assignments to make it greppable, and back again.

use std::fmt::Write as _;
use std::fs::File;
use std::io::{self, BufRead, BufReader, IsTerminal, Read, Write};
use std::process;

use anyhow::anyhow;
use clap::Parser;
use colored::Colorize;
use serde_json::Value;
use thiserror::Error;

use gron::lexer::lex_line;
use gron::statement::{Statement, Statements};
use gron::token::{quote_string, Token, TokenKind};
use gron::ungron::unwrap_root;

mod url;

/// Maximum length of one input line in streaming and reverse modes.
const MAX_LINE: usize = 1024 * 1024;

const AFTER_HELP: &str = "\
Exit codes:
  0  OK
  1  Failed to open file
  2  Failed to read input
  3  Failed to form statements
  4  Failed to fetch URL
  5  Failed to parse statements
  6  Failed to encode JSON

Examples:
  gron /tmp/apiresponse.json
  gron http://jsonplaceholder.typicode.com/users/1
  curl -s http://jsonplaceholder.typicode.com/users/1 | gron
  gron http://jsonplaceholder.typicode.com/users/1 | grep company | gron --ungron";

#[derive(Debug, Parser)]
#[command(name = "gron", version)]
#[command(about = "Transform JSON into discrete assignments to make it greppable")]
#[command(after_help = AFTER_HELP)]
struct Cli {
    /// Input file, URL, or "-" for stdin (the default)
    input: Option<String>,

    /// Reverse the operation (turn assignments back into JSON)
    #[arg(short, long)]
    ungron: bool,

    /// Colorize output (default on tty)
    #[arg(short, long)]
    colorize: bool,

    /// Monochrome (don't colorize output)
    #[arg(short, long, conflicts_with = "colorize")]
    monochrome: bool,

    /// Treat each line of input as a separate JSON object
    #[arg(short, long)]
    stream: bool,

    /// Disable certificate validation when fetching over https
    #[arg(short = 'k', long)]
    insecure: bool,

    /// Represent gron data as a JSON stream
    #[arg(short, long)]
    json: bool,

    /// Don't sort output (faster)
    #[arg(long)]
    no_sort: bool,
}

/// Failures, each tied to the exit code scripts rely on.
#[derive(Debug, Error)]
enum CliError {
    #[error("failed to open file: {0}")]
    OpenFile(#[source] io::Error),
    #[error("failed to read input: {0}")]
    ReadInput(#[source] anyhow::Error),
    #[error("failed to form statements: {0}")]
    FormStatements(#[source] anyhow::Error),
    #[error("failed to fetch URL: {0}")]
    FetchUrl(#[source] anyhow::Error),
    #[error("failed to parse statements: {0}")]
    ParseStatements(#[source] anyhow::Error),
    #[error("failed to encode JSON: {0}")]
    JsonEncode(#[source] serde_json::Error),
}

impl CliError {
    fn exit_code(&self) -> i32 {
        match self {
            CliError::OpenFile(_) => 1,
            CliError::ReadInput(_) => 2,
            CliError::FormStatements(_) => 3,
            CliError::FetchUrl(_) => 4,
            CliError::ParseStatements(_) => 5,
            CliError::JsonEncode(_) => 6,
        }
    }
}

/// Rendering and processing options shared by the actions.
struct Options {
    color: bool,
    sort: bool,
    json_spec: bool,
}

fn main() {
    let cli = Cli::parse();

    // Color policy: forced on, forced off, otherwise only on a terminal
    // (SHOULD_COLORIZE also honors NO_COLOR and CLICOLOR)
    let color = if cli.colorize {
        colored::control::set_override(true);
        true
    } else if cli.monochrome || !io::stdout().is_terminal() {
        false
    } else {
        colored::control::SHOULD_COLORIZE.should_colorize()
    };

    let opts = Options {
        color,
        sort: !cli.no_sort,
        json_spec: cli.json,
    };

    let stdout = io::stdout();
    let result = resolve_input(&cli).and_then(|input| {
        if cli.ungron {
            ungron(input, stdout.lock(), &opts)
        } else if cli.stream {
            gron_stream(input, stdout.lock(), &opts)
        } else {
            gron(input, stdout.lock(), &opts)
        }
    });

    if let Err(e) = result {
        eprintln!("{e}");
        process::exit(e.exit_code());
    }
}

/// Resolves the input argument to a byte reader: a file path, an
/// `http(s)://` URL, `-`, or stdin when absent.
fn resolve_input(cli: &Cli) -> Result<Box<dyn Read>, CliError> {
    match cli.input.as_deref() {
        None | Some("-") => Ok(Box::new(io::stdin())),
        Some(target) if url::is_url(target) => {
            let body = url::fetch(target, cli.insecure)
                .map_err(|e| CliError::FetchUrl(e.into()))?;
            Ok(Box::new(body))
        }
        Some(path) => {
            let file = File::open(path).map_err(CliError::OpenFile)?;
            Ok(Box::new(file))
        }
    }
}

/// The default action: read one JSON document, write its statements.
fn gron(input: impl Read, mut out: impl Write, opts: &Options) -> Result<(), CliError> {
    let mut ss = Statements::from_json(input, Statement::root("json"))
        .map_err(|e| CliError::FormStatements(e.into()))?;

    // Object members carry no defined order, so sort for a stable output
    if opts.sort {
        ss.sort();
    }

    for s in &ss {
        let line = render(s, opts)?;
        let _ = writeln!(out, "{line}");
    }
    Ok(())
}

/// The streaming action: each input line is an independent JSON document,
/// flattened under a synthetic `json[i]` prefix so per-document output
/// stays contiguous.
fn gron_stream(input: impl Read, mut out: impl Write, opts: &Options) -> Result<(), CliError> {
    // The first line of output establishes that the top level is an array
    let mut top = Statement::root("json");
    top.push(Token::new("=", TokenKind::Equals));
    top.push(Token::new("[]", TokenKind::EmptyArray));
    top.push(Token::new(";", TokenKind::Semi));
    let line = render(&top, opts)?;
    let _ = writeln!(out, "{line}");

    let mut reader = BufReader::new(input);
    let mut buf = Vec::with_capacity(64 * 1024);
    let mut index = 0usize;
    loop {
        if !read_line_capped(&mut reader, &mut buf)? {
            break;
        }

        let prefix = Statement::root("json").with_numeric_key(index);
        index += 1;

        let mut ss = Statements::from_json(&buf[..], prefix)
            .map_err(|e| CliError::FormStatements(e.into()))?;
        if opts.sort {
            ss.sort();
        }
        for s in &ss {
            let line = render(s, opts)?;
            let _ = writeln!(out, "{line}");
        }
    }
    Ok(())
}

/// The reverse action: read statements (or their JSON-spec encoding),
/// merge them, and write the reconstructed JSON document.
fn ungron(input: impl Read, mut out: impl Write, opts: &Options) -> Result<(), CliError> {
    let mut reader = BufReader::new(input);
    let mut buf = Vec::new();
    let mut ss = Statements::new();
    loop {
        if !read_line_capped(&mut reader, &mut buf)? {
            break;
        }
        let line = String::from_utf8_lossy(&buf);
        let s = if opts.json_spec {
            Statement::from_json_spec(&line)
                .map_err(|e| CliError::ParseStatements(e.into()))?
        } else {
            lex_line(&line)
        };
        ss.add(s);
    }

    let merged = ss
        .to_value()
        .map_err(|e| CliError::ParseStatements(e.into()))?;

    // A round trip should not keep the synthetic root wrapper
    let merged = unwrap_root(merged, "json");

    if opts.color {
        let mut rendered = String::new();
        colorize_json(&merged, 0, &mut rendered);
        let _ = writeln!(out, "{rendered}");
    } else {
        let rendered = serde_json::to_string_pretty(&merged).map_err(CliError::JsonEncode)?;
        let _ = writeln!(out, "{rendered}");
    }
    Ok(())
}

/// Renders one statement, applying the JSON-spec rewrite and color policy.
fn render(s: &Statement, opts: &Options) -> Result<String, CliError> {
    let jsonified;
    let s = if opts.json_spec {
        jsonified = s
            .jsonify()
            .map_err(|e| CliError::FormStatements(e.into()))?;
        &jsonified
    } else {
        s
    };
    Ok(if opts.color {
        s.color_string()
    } else {
        s.to_string()
    })
}

/// Reads one `\n`-terminated line into `buf` (terminator stripped).
/// Returns false at end of input; lines over [`MAX_LINE`] bytes fail.
fn read_line_capped(reader: &mut impl BufRead, buf: &mut Vec<u8>) -> Result<bool, CliError> {
    buf.clear();
    let mut limited = reader.take((MAX_LINE + 2) as u64);
    let n = limited
        .read_until(b'\n', buf)
        .map_err(|e| CliError::ReadInput(e.into()))?;
    if n == 0 {
        return Ok(false);
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
    if buf.len() > MAX_LINE {
        return Err(CliError::ReadInput(anyhow!(
            "input line longer than {MAX_LINE} bytes"
        )));
    }
    Ok(true)
}

/// Pretty-prints a value with the same palette as forward-mode statements.
/// The monochrome `serde_json` rendering is the canonical byte form; this
/// variant exists for terminals only.
fn colorize_json(value: &Value, indent: usize, out: &mut String) {
    match value {
        Value::Object(members) if members.is_empty() => {
            let _ = write!(out, "{}", "{}".magenta());
        }
        Value::Object(members) => {
            let _ = writeln!(out, "{}", "{".magenta());
            for (i, (key, sub)) in members.iter().enumerate() {
                let _ = write!(
                    out,
                    "{}{}: ",
                    "  ".repeat(indent + 1),
                    quote_string(key).blue().bold()
                );
                colorize_json(sub, indent + 1, out);
                if i + 1 < members.len() {
                    out.push(',');
                }
                out.push('\n');
            }
            let _ = write!(out, "{}{}", "  ".repeat(indent), "}".magenta());
        }
        Value::Array(elements) if elements.is_empty() => {
            let _ = write!(out, "{}", "[]".magenta());
        }
        Value::Array(elements) => {
            let _ = writeln!(out, "{}", "[".magenta());
            for (i, sub) in elements.iter().enumerate() {
                out.push_str(&"  ".repeat(indent + 1));
                colorize_json(sub, indent + 1, out);
                if i + 1 < elements.len() {
                    out.push(',');
                }
                out.push('\n');
            }
            let _ = write!(out, "{}{}", "  ".repeat(indent), "]".magenta());
        }
        Value::String(s) => {
            let _ = write!(out, "{}", quote_string(s).yellow());
        }
        Value::Number(n) => {
            let _ = write!(out, "{}", n.to_string().red());
        }
        Value::Bool(b) => {
            let _ = write!(out, "{}", b.to_string().cyan());
        }
        Value::Null => {
            let _ = write!(out, "{}", "null".cyan());
        }
    }
}
