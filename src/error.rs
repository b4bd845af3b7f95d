use ariadne::{Color, Fmt, Label, Report, ReportKind, Source};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn single(pos: usize) -> Self {
        Self {
            start: pos,
            end: pos + 1,
        }
    }

    pub fn merge(start: Span, end: Span) -> Self {
        Self {
            start: start.start,
            end: end.end,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ErrorKind {
    LexError,
    ParseError,
    NameError,
    TypeError,
    MathError,
    FlowError,
    UserError,
    /// Clean termination requested by the `exit` built-in; renders nothing.
    Exit,
}

#[derive(Debug, Clone)]
pub struct QuillError {
    pub kind: ErrorKind,
    pub span: Option<Span>,
    pub message: String,
    pub status: i32,
}

impl QuillError {
    pub fn new(kind: ErrorKind, span: Option<Span>, message: String) -> Self {
        Self {
            kind,
            span,
            message,
            status: 1,
        }
    }

    pub fn lex_error(span: Span, message: String) -> Self {
        Self::new(ErrorKind::LexError, Some(span), message)
    }

    pub fn parse_error(span: Span, message: String) -> Self {
        Self::new(ErrorKind::ParseError, Some(span), message)
    }

    pub fn name_error(span: Span, message: String) -> Self {
        Self::new(ErrorKind::NameError, Some(span), message)
    }

    pub fn type_error(span: Span, message: String) -> Self {
        Self::new(ErrorKind::TypeError, Some(span), message)
    }

    pub fn math_error(span: Span, message: String) -> Self {
        Self::new(ErrorKind::MathError, Some(span), message)
    }

    pub fn flow_error(span: Span, message: String) -> Self {
        Self::new(ErrorKind::FlowError, Some(span), message)
    }

    pub fn user_error(span: Span, message: String) -> Self {
        Self::new(ErrorKind::UserError, Some(span), message)
    }

    /// A user error raised via `throw`: no source excerpt, custom status.
    pub fn thrown(message: String, status: i32) -> Self {
        let mut error = Self::new(ErrorKind::UserError, None, message);
        error.status = status;
        error
    }

    pub fn exit(status: i32) -> Self {
        let mut error = Self::new(ErrorKind::Exit, None, String::new());
        error.status = status;
        error
    }

    pub fn report(&self, source: &str, filename: Option<&str>) {
        if self.kind == ErrorKind::Exit {
            return;
        }
        let filename = filename.unwrap_or("<repl>");

        let (kind_str, color) = match self.kind {
            ErrorKind::LexError => ("Lexical Error", Color::Red),
            ErrorKind::ParseError => ("Parse Error", Color::Yellow),
            ErrorKind::NameError => ("Name Error", Color::Magenta),
            ErrorKind::TypeError => ("Type Error", Color::Magenta),
            ErrorKind::MathError => ("Math Error", Color::Magenta),
            ErrorKind::FlowError => ("Control Flow Error", Color::Magenta),
            ErrorKind::UserError => ("Error", Color::Red),
            ErrorKind::Exit => return,
        };

        let span = match self.span {
            Some(span) => span,
            None => {
                eprintln!("{}: {}", kind_str.fg(color), (&self.message).fg(color));
                return;
            }
        };

        // Spans produced at end of input can point one past the source.
        let end = span.end.min(source.len().max(1));
        let start = span.start.min(end.saturating_sub(1));

        Report::build(ReportKind::Error, filename, start)
            .with_message(format!("{}: {}", kind_str.fg(color), self.message))
            .with_label(
                Label::new((filename, start..end))
                    .with_message(&self.message)
                    .with_color(color),
            )
            .finish()
            .print((filename, Source::from(source)))
            .unwrap();
    }
}

impl fmt::Display for QuillError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for QuillError {}
