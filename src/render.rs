//! Markdown-ish rendering of assistant replies.
//!
//! Supports exactly three constructs, scanned without nesting:
//! fenced code blocks, hard line breaks, and the inline spans `**bold**`,
//! `*italic*` and `` `code` ``. Anything unterminated is kept as literal text,
//! so rendering never fails.

use colored::*;

const FENCE: &str = "```";

/// One inline run inside a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    Bold(String),
    Italic(String),
    Code(String),
}

impl Inline {
    pub fn content(&self) -> &str {
        match self {
            Inline::Text(s) | Inline::Bold(s) | Inline::Italic(s) | Inline::Code(s) => s,
        }
    }

    pub fn is_plain(&self) -> bool {
        matches!(self, Inline::Text(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// Prose. Each inner `Vec` is one line; lines are separated by hard breaks.
    Text(Vec<Vec<Inline>>),
    Code {
        language: Option<String>,
        code: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RenderedMessage {
    pub blocks: Vec<Block>,
}

impl RenderedMessage {
    /// Text as a reader would see it, markup removed.
    pub fn visible_text(&self) -> String {
        self.blocks
            .iter()
            .map(|block| match block {
                Block::Text(lines) => lines
                    .iter()
                    .map(|line| line.iter().map(Inline::content).collect::<String>())
                    .collect::<Vec<_>>()
                    .join("\n"),
                Block::Code { code, .. } => code.clone(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Every inline span in reading order, across all text blocks.
    pub fn inlines(&self) -> impl Iterator<Item = &Inline> {
        self.blocks.iter().flat_map(|block| match block {
            Block::Text(lines) => lines.iter().flatten().collect::<Vec<_>>(),
            Block::Code { .. } => Vec::new(),
        })
    }

    /// Terminal rendering with ANSI styling.
    pub fn to_ansi(&self) -> String {
        let mut out = Vec::with_capacity(self.blocks.len());
        for block in &self.blocks {
            match block {
                Block::Text(lines) => {
                    let rendered: Vec<String> = lines
                        .iter()
                        .map(|line| line.iter().map(style_inline).collect::<String>())
                        .collect();
                    out.push(rendered.join("\n"));
                }
                Block::Code { language, code } => {
                    let mut s = String::new();
                    if let Some(lang) = language {
                        s.push_str(&format!("  [{lang}]").dimmed().to_string());
                        s.push('\n');
                    }
                    let body: Vec<String> = code
                        .lines()
                        .map(|l| format!("  {}", l.bright_cyan()))
                        .collect();
                    s.push_str(&body.join("\n"));
                    out.push(s);
                }
            }
        }
        out.join("\n")
    }
}

fn style_inline(inline: &Inline) -> String {
    match inline {
        Inline::Text(s) => s.clone(),
        Inline::Bold(s) => s.bold().to_string(),
        Inline::Italic(s) => s.italic().to_string(),
        Inline::Code(s) => s.bright_yellow().to_string(),
    }
}

/// Render raw assistant text into blocks and inline spans.
pub fn render_message(text: &str) -> RenderedMessage {
    let mut blocks = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find(FENCE) {
        let after_open = &rest[open + FENCE.len()..];
        let Some(close) = after_open.find(FENCE) else {
            break;
        };
        push_text_block(&mut blocks, &rest[..open]);
        blocks.push(code_block(&after_open[..close]));
        rest = &after_open[close + FENCE.len()..];
    }
    push_text_block(&mut blocks, rest);

    RenderedMessage { blocks }
}

fn push_text_block(blocks: &mut Vec<Block>, text: &str) {
    if text.is_empty() {
        return;
    }
    let lines = text
        .split('\n')
        .map(|line| parse_inline(line.strip_suffix('\r').unwrap_or(line)))
        .collect();
    blocks.push(Block::Text(lines));
}

fn code_block(inner: &str) -> Block {
    let (first, remainder) = match inner.split_once('\n') {
        Some((first, remainder)) => (first, Some(remainder)),
        None => (inner, None),
    };
    let (language, body) = match remainder {
        Some(body) if is_language_tag(first) => (Some(first.trim_end_matches('\r').to_string()), body),
        _ => (None, inner),
    };
    Block::Code {
        language,
        code: body.trim_matches(|c| c == '\n' || c == '\r').to_string(),
    }
}

fn is_language_tag(line: &str) -> bool {
    let line = line.trim_end_matches('\r');
    !line.is_empty()
        && line
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '+' | '-' | '#' | '.'))
}

/// Single left-to-right pass over one line. `**` is tried before `*`, and
/// a delimiter with no closing partner (or nothing inside) stays literal.
pub fn parse_inline(line: &str) -> Vec<Inline> {
    let chars: Vec<char> = line.chars().collect();
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut i = 0;

    while i < chars.len() {
        let span = match chars[i] {
            '*' if chars.get(i + 1) == Some(&'*') => match find_span(&chars, i + 2, &['*', '*']) {
                Some(end) => Some((Inline::Bold(collect(&chars[i + 2..end])), end + 2)),
                None => find_span(&chars, i + 1, &['*'])
                    .map(|end| (Inline::Italic(collect(&chars[i + 1..end])), end + 1)),
            },
            '*' => find_span(&chars, i + 1, &['*'])
                .map(|end| (Inline::Italic(collect(&chars[i + 1..end])), end + 1)),
            '`' => find_span(&chars, i + 1, &['`'])
                .map(|end| (Inline::Code(collect(&chars[i + 1..end])), end + 1)),
            _ => None,
        };

        match span {
            Some((inline, next)) => {
                if !current.is_empty() {
                    segments.push(Inline::Text(std::mem::take(&mut current)));
                }
                segments.push(inline);
                i = next;
            }
            None => {
                current.push(chars[i]);
                i += 1;
            }
        }
    }

    if !current.is_empty() {
        segments.push(Inline::Text(current));
    }
    segments
}

/// Index of the first `delim` at or after `start`, provided the span it
/// closes is non-empty.
fn find_span(chars: &[char], start: usize, delim: &[char]) -> Option<usize> {
    if start > chars.len() {
        return None;
    }
    let end = chars[start..]
        .windows(delim.len())
        .position(|w| w == delim)
        .map(|p| start + p)?;
    (end > start).then_some(end)
}

fn collect(chars: &[char]) -> String {
    chars.iter().collect()
}
