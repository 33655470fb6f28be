//! Inline rich-text formatting
//!
//! [`RichTextFormatter`] is the inline codec shared by both conversion
//! directions. It renders styled [`Run`]s to inline Markdown, parses inline
//! Markdown back into runs, and repairs bold spans that were concatenated
//! without a separator (`**a****b**`), which common renderers read as one
//! malformed span.

use crate::model::{merge_runs, Run, Style};
use crate::{Error, Result};

/// Spellings of an HTML line break accepted inside a node's text
const LINE_BREAKS: &[&str] = &["<br>", "<br/>", "<br />"];

/// Inline Markdown formatter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RichTextFormatter {
    /// Escape `\`, `*` and backticks in plain text when rendering
    pub escape_plain: bool,
}

impl Default for RichTextFormatter {
    fn default() -> Self {
        Self { escape_plain: true }
    }
}

impl RichTextFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Separate a closing bold marker from a directly following opening one.
    ///
    /// Runs are paired the same way [`parse`](Self::parse) pairs them. A
    /// `****` that closes one bold span and opens the next becomes `** **`.
    /// A `****` that only opens a bold span and leaves two literal asterisks
    /// behind carries an empty bold span, which is dropped so a single `**`
    /// remains. Other runs, asterisks inside code spans and escaped
    /// asterisks are left alone. The pass is idempotent.
    pub fn fix(&self, text: &str) -> String {
        let pieces = pieces(text);
        if !pieces.iter().any(|p| p.star_len() == 4) {
            return text.to_string();
        }

        let mut tokens = tokenize(text);
        pair_delimiters(&mut tokens);
        let mut delims = tokens.iter().filter_map(|token| match token {
            Token::Delim(delim) => Some(delim),
            _ => None,
        });

        let mut out = String::with_capacity(text.len() + 8);

        for piece in &pieces {
            match *piece {
                Piece::Text(start, end) => out.push_str(&text[start..end]),
                Piece::Stars(start, end) => {
                    let repaired = delims
                        .next()
                        .filter(|_| end - start == 4)
                        .and_then(Delim::repair);
                    out.push_str(repaired.unwrap_or(&text[start..end]));
                }
            }
        }

        out
    }

    /// Run [`fix`](Self::fix) and verify that the result is a fixed point
    pub fn fix_checked(&self, text: &str, line: usize) -> Result<String> {
        let fixed = self.fix(text);
        if self.fix(&fixed) != fixed {
            return Err(Error::FormattingRepair {
                line,
                text: text.to_string(),
            });
        }
        Ok(fixed)
    }

    /// Render styled runs as inline Markdown
    pub fn render(&self, runs: &[Run]) -> String {
        let mut out = String::new();
        for run in runs {
            self.render_run(run, &mut out);
        }
        out
    }

    fn render_run(&self, run: &Run, out: &mut String) {
        if run.text.is_empty() {
            return;
        }

        let delimiter = delimiter(run.style);

        if run.style.code {
            out.push_str(delimiter);
            out.push_str(&code_span(&run.text.replace('\n', " ")));
            out.push_str(delimiter);
            return;
        }

        let trimmed = run.text.trim();
        if delimiter.is_empty() || trimmed.is_empty() {
            out.push_str(&self.escape(&run.text));
            return;
        }

        // Emphasis cannot start or end on whitespace, so move it outside
        let lead = &run.text[..run.text.len() - run.text.trim_start().len()];
        let trail = &run.text[run.text.trim_end().len()..];

        out.push_str(&self.escape(lead));
        out.push_str(delimiter);
        out.push_str(&self.escape(trimmed));
        out.push_str(delimiter);
        out.push_str(&self.escape(trail));
    }

    fn escape(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;

        while let Some(c) = rest.chars().next() {
            match c {
                '\n' => out.push_str("<br>"),
                '\\' | '*' | '`' if self.escape_plain => {
                    out.push('\\');
                    out.push(c);
                }
                '<' if self.escape_plain && rest[1..].starts_with("br") => out.push_str("\\<"),
                _ => out.push(c),
            }
            rest = &rest[c.len_utf8()..];
        }

        out
    }

    /// Parse inline Markdown into styled runs.
    ///
    /// Recognizes `*` emphasis, `**` strong emphasis, backtick code spans,
    /// backslash escapes and `<br>` line breaks. Delimiters that cannot be
    /// paired stay in the text as literal asterisks.
    pub fn parse(&self, text: &str) -> Vec<Run> {
        let mut tokens = tokenize(text);
        pair_delimiters(&mut tokens);

        let mut runs = Vec::with_capacity(tokens.len());
        let (mut strong, mut em) = (0usize, 0usize);

        for token in tokens {
            match token {
                Token::Text(text) => runs.push(Run::new(text, style(strong, em, false))),
                Token::Code(code) => runs.push(Run::new(code, style(strong, em, true))),
                Token::Delim(delim) => {
                    for kind in &delim.closes {
                        match kind {
                            Emphasis::Strong => strong = strong.saturating_sub(1),
                            Emphasis::Em => em = em.saturating_sub(1),
                        }
                    }
                    if delim.count > 0 {
                        runs.push(Run::new("*".repeat(delim.count), style(strong, em, false)));
                    }
                    for kind in &delim.opens {
                        match kind {
                            Emphasis::Strong => strong += 1,
                            Emphasis::Em => em += 1,
                        }
                    }
                }
            }
        }

        merge_runs(runs)
    }
}

/// Remove style markers from inline Markdown.
///
/// Unescaped `*` and backticks are dropped, together with any whitespace run
/// that sits directly between two markers. Used to compare the text content
/// of a line before and after repair.
pub fn strip_markers(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let is_marker = |i: usize| matches!(chars[i], '*' | '`') && (i == 0 || chars[i - 1] != '\\');

    let mut out = String::with_capacity(text.len());
    let mut i = 0;

    while i < chars.len() {
        if is_marker(i) {
            i += 1;
            continue;
        }
        if chars[i].is_whitespace() {
            let end = (i..chars.len())
                .find(|&j| !chars[j].is_whitespace())
                .unwrap_or(chars.len());
            let between_markers = i > 0 && is_marker(i - 1) && end < chars.len() && is_marker(end);
            if !between_markers {
                out.extend(&chars[i..end]);
            }
            i = end;
            continue;
        }
        out.push(chars[i]);
        i += 1;
    }

    out
}

/// Byte range of a segment, either plain text (code spans included) or an
/// asterisk run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Piece {
    Text(usize, usize),
    Stars(usize, usize),
}

impl Piece {
    fn star_len(&self) -> usize {
        match *self {
            Piece::Stars(start, end) => end - start,
            Piece::Text(..) => 0,
        }
    }
}

fn pieces(text: &str) -> Vec<Piece> {
    let bytes = text.as_bytes();
    let mut pieces = Vec::new();
    let mut text_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' if i + 1 < bytes.len() && bytes[i + 1].is_ascii_punctuation() => i += 2,
            b'`' => {
                let len = run_len(bytes, i, b'`');
                i = match closing_backticks(bytes, i + len, len) {
                    Some(close) => close + len,
                    None => i + len,
                };
            }
            b'*' => {
                let len = run_len(bytes, i, b'*');
                if text_start < i {
                    pieces.push(Piece::Text(text_start, i));
                }
                pieces.push(Piece::Stars(i, i + len));
                i += len;
                text_start = i;
            }
            _ => i += 1,
        }
    }

    if text_start < bytes.len() {
        pieces.push(Piece::Text(text_start, bytes.len()));
    }

    pieces
}

fn run_len(bytes: &[u8], start: usize, byte: u8) -> usize {
    bytes[start..].iter().take_while(|&&b| b == byte).count()
}

fn closing_backticks(bytes: &[u8], from: usize, len: usize) -> Option<usize> {
    let mut j = from;
    while j < bytes.len() {
        if bytes[j] == b'`' {
            let run = run_len(bytes, j, b'`');
            if run == len {
                return Some(j);
            }
            j += run;
        } else {
            j += 1;
        }
    }
    None
}

fn delimiter(style: Style) -> &'static str {
    match (style.bold, style.italic) {
        (true, true) => "***",
        (true, false) => "**",
        (false, true) => "*",
        (false, false) => "",
    }
}

fn style(strong: usize, em: usize, code: bool) -> Style {
    Style {
        bold: strong > 0,
        italic: em > 0,
        code,
    }
}

/// Wrap code in enough backticks to enclose any backticks it contains
fn code_span(code: &str) -> String {
    let longest = code.split(|c: char| c != '`').map(str::len).max().unwrap_or(0);
    let fence = "`".repeat(longest + 1);

    let needs_padding = code.starts_with('`')
        || code.ends_with('`')
        || (code.starts_with(' ') && code.ends_with(' ') && !code.trim().is_empty());

    if needs_padding {
        format!("{fence} {code} {fence}")
    } else {
        format!("{fence}{code}{fence}")
    }
}

fn strip_code_padding(code: &str) -> &str {
    if code.len() >= 2 && code.starts_with(' ') && code.ends_with(' ') && !code.trim().is_empty() {
        &code[1..code.len() - 1]
    } else {
        code
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Emphasis {
    Strong,
    Em,
}

#[derive(Debug)]
struct Delim {
    count: usize,
    can_open: bool,
    can_close: bool,
    opens: Vec<Emphasis>,
    closes: Vec<Emphasis>,
}

impl Delim {
    /// Replacement for a paired `****` run
    fn repair(&self) -> Option<&'static str> {
        match (self.closes.as_slice(), self.opens.as_slice(), self.count) {
            ([Emphasis::Strong], [Emphasis::Strong], 0) => Some("** **"),
            ([], [Emphasis::Strong], 2) => Some("**"),
            _ => None,
        }
    }
}

#[derive(Debug)]
enum Token {
    Text(String),
    Code(String),
    Delim(Delim),
}

fn tokenize(text: &str) -> Vec<Token> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut buf = String::new();
    let mut i = 0;

    let flush = |buf: &mut String, tokens: &mut Vec<Token>| {
        if !buf.is_empty() {
            tokens.push(Token::Text(std::mem::take(buf)));
        }
    };

    while i < bytes.len() {
        match bytes[i] {
            b'\\' if i + 1 < bytes.len() && bytes[i + 1].is_ascii_punctuation() => {
                buf.push(bytes[i + 1] as char);
                i += 2;
            }
            b'`' => {
                let len = run_len(bytes, i, b'`');
                if let Some(close) = closing_backticks(bytes, i + len, len) {
                    flush(&mut buf, &mut tokens);
                    tokens.push(Token::Code(strip_code_padding(&text[i + len..close]).to_string()));
                    i = close + len;
                } else {
                    buf.push_str(&text[i..i + len]);
                    i += len;
                }
            }
            b'*' => {
                let len = run_len(bytes, i, b'*');
                let before = text[..i].chars().next_back();
                let after = text[i + len..].chars().next();
                flush(&mut buf, &mut tokens);
                tokens.push(Token::Delim(Delim {
                    count: len,
                    can_open: after.is_some_and(|c| !c.is_whitespace()),
                    can_close: before.is_some_and(|c| !c.is_whitespace()),
                    opens: Vec::new(),
                    closes: Vec::new(),
                }));
                i += len;
            }
            b'<' => match LINE_BREAKS.iter().find(|b| text[i..].starts_with(**b)) {
                Some(line_break) => {
                    buf.push('\n');
                    i += line_break.len();
                }
                None => {
                    buf.push('<');
                    i += 1;
                }
            },
            _ => {
                let Some(c) = text[i..].chars().next() else {
                    break;
                };
                buf.push(c);
                i += c.len_utf8();
            }
        }
    }

    flush(&mut buf, &mut tokens);
    tokens
}

fn delim_count(tokens: &[Token], i: usize) -> usize {
    match &tokens[i] {
        Token::Delim(d) => d.count,
        _ => 0,
    }
}

/// Pair asterisk runs the way CommonMark does, consuming two asterisks for
/// strong emphasis when both sides have them and one otherwise
fn pair_delimiters(tokens: &mut [Token]) {
    let mut openers: Vec<usize> = Vec::new();

    for i in 0..tokens.len() {
        let (can_open, can_close) = match &tokens[i] {
            Token::Delim(d) => (d.can_open, d.can_close),
            _ => continue,
        };

        if can_close {
            while delim_count(tokens, i) > 0 {
                let Some(&j) = openers.last() else {
                    break;
                };
                let used = if delim_count(tokens, j) >= 2 && delim_count(tokens, i) >= 2 {
                    2
                } else {
                    1
                };
                let kind = if used == 2 {
                    Emphasis::Strong
                } else {
                    Emphasis::Em
                };

                if let Token::Delim(opener) = &mut tokens[j] {
                    opener.count -= used;
                    opener.opens.push(kind);
                }
                if let Token::Delim(closer) = &mut tokens[i] {
                    closer.count -= used;
                    closer.closes.push(kind);
                }
                if delim_count(tokens, j) == 0 {
                    openers.pop();
                }
            }
        }

        if can_open && delim_count(tokens, i) > 0 {
            openers.push(i);
        }
    }
}
