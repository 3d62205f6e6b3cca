//! Source Formatting
//!
//! `Formatter` is the seam for the code formatter collaborator. The built-in
//! `LayoutFormatter` canonicalizes layout only: it re-indents by bracket depth,
//! strips trailing whitespace, collapses blank-line runs and applies the configured
//! line ending. Token-level rewriting (quotes, semicolons, wrapping) is left to
//! the emitters, which already honor `StyleOptions`.
//!
//! `CodeWriter` is the small indentation-aware buffer all emitters write through.

use super::config::StyleOptions;

/// Formats generated source text
pub trait Formatter {
    fn format(&self, source: &str, style: &StyleOptions) -> Result<String, String>;
}

// =============================================================================
// CodeWriter
// =============================================================================

/// Line buffer with managed indentation
#[derive(Debug)]
pub struct CodeWriter {
    indent: String,
    depth: usize,
    out: String,
}

impl CodeWriter {
    pub fn new(indent: impl Into<String>) -> Self {
        Self {
            indent: indent.into(),
            depth: 0,
            out: String::new(),
        }
    }

    /// Append one line at the current depth (empty text writes a blank line)
    pub fn line(&mut self, text: impl AsRef<str>) -> &mut Self {
        let text = text.as_ref();
        if !text.is_empty() {
            for _ in 0..self.depth {
                self.out.push_str(&self.indent);
            }
            self.out.push_str(text);
        }
        self.out.push('\n');
        self
    }

    /// Append a line and indent what follows
    pub fn open(&mut self, text: impl AsRef<str>) -> &mut Self {
        self.line(text);
        self.depth += 1;
        self
    }

    /// Dedent and append a line
    pub fn close(&mut self, text: impl AsRef<str>) -> &mut Self {
        self.depth = self.depth.saturating_sub(1);
        self.line(text)
    }

    /// Dedent, append a line, indent again (`} else {`)
    pub fn reopen(&mut self, text: impl AsRef<str>) -> &mut Self {
        self.depth = self.depth.saturating_sub(1);
        self.open(text)
    }

    pub fn blank(&mut self) -> &mut Self {
        self.out.push('\n');
        self
    }

    /// Append pre-rendered text verbatim
    pub fn raw(&mut self, text: &str) -> &mut Self {
        self.out.push_str(text);
        if !text.is_empty() && !text.ends_with('\n') {
            self.out.push('\n');
        }
        self
    }

    pub fn finish(self) -> String {
        self.out
    }
}

// =============================================================================
// LayoutFormatter
// =============================================================================

/// Bracket-depth re-indenting formatter
#[derive(Debug, Default, Clone, Copy)]
pub struct LayoutFormatter;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Mode {
    Code,
    Single,
    Double,
    Template,
    Block,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Bracket {
    Open(char),
    TemplateExpr,
}

#[derive(Debug)]
struct Scanner {
    modes: Vec<Mode>,
    brackets: Vec<Bracket>,
}

impl Scanner {
    fn new() -> Self {
        Self {
            modes: vec![Mode::Code],
            brackets: Vec::new(),
        }
    }

    fn mode(&self) -> Mode {
        *self.modes.last().unwrap_or(&Mode::Code)
    }

    fn depth(&self) -> usize {
        self.brackets
            .iter()
            .filter(|b| matches!(b, Bracket::Open(_)))
            .count()
    }

    /// Advance over one line; `line_no` is 1-based for error messages
    fn scan(&mut self, line: &str, line_no: usize) -> Result<(), String> {
        let chars: Vec<char> = line.chars().collect();
        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            let next = chars.get(i + 1).copied();
            match self.mode() {
                Mode::Code => match c {
                    '/' if next == Some('/') => return Ok(()),
                    '/' if next == Some('*') => {
                        self.modes.push(Mode::Block);
                        i += 1;
                    }
                    '\'' => self.modes.push(Mode::Single),
                    '"' => self.modes.push(Mode::Double),
                    '`' => self.modes.push(Mode::Template),
                    '{' | '(' | '[' => self.brackets.push(Bracket::Open(c)),
                    '}' if self.brackets.last() == Some(&Bracket::TemplateExpr) => {
                        self.brackets.pop();
                        self.modes.pop();
                    }
                    '}' | ')' | ']' => {
                        let expected = match c {
                            '}' => '{',
                            ')' => '(',
                            _ => '[',
                        };
                        match self.brackets.pop() {
                            Some(Bracket::Open(open)) if open == expected => {}
                            _ => return Err(format!("unbalanced '{}' on line {}", c, line_no)),
                        }
                    }
                    _ => {}
                },
                Mode::Single | Mode::Double => {
                    let quote = if self.mode() == Mode::Single { '\'' } else { '"' };
                    if c == '\\' {
                        i += 1;
                    } else if c == quote {
                        self.modes.pop();
                    }
                }
                Mode::Template => {
                    if c == '\\' {
                        i += 1;
                    } else if c == '`' {
                        self.modes.pop();
                    } else if c == '$' && next == Some('{') {
                        self.brackets.push(Bracket::TemplateExpr);
                        self.modes.push(Mode::Code);
                        i += 1;
                    }
                }
                Mode::Block => {
                    if c == '*' && next == Some('/') {
                        self.modes.pop();
                        i += 1;
                    }
                }
            }
            i += 1;
        }

        if matches!(self.mode(), Mode::Single | Mode::Double) {
            return Err(format!("unterminated string on line {}", line_no));
        }
        Ok(())
    }
}

/// Number of closing brackets a line starts with
fn leading_closers(trimmed: &str) -> usize {
    trimmed
        .chars()
        .take_while(|c| matches!(c, '}' | ')' | ']'))
        .count()
}

impl Formatter for LayoutFormatter {
    fn format(&self, source: &str, style: &StyleOptions) -> Result<String, String> {
        let unit = style.indent_unit();
        let mut scanner = Scanner::new();
        let mut lines: Vec<String> = Vec::new();
        let mut blank_run = false;

        for (idx, raw) in source.lines().enumerate() {
            let raw = raw.trim_end_matches('\r');

            // Template literal content is significant whitespace
            if scanner.mode() == Mode::Template {
                lines.push(raw.to_string());
                scanner.scan(raw, idx + 1)?;
                blank_run = false;
                continue;
            }

            let trimmed = raw.trim();
            if trimmed.is_empty() {
                if !blank_run && !lines.is_empty() {
                    lines.push(String::new());
                }
                blank_run = true;
                continue;
            }
            blank_run = false;

            let in_block = scanner.mode() == Mode::Block;
            let depth = if in_block {
                scanner.depth()
            } else {
                scanner.depth().saturating_sub(leading_closers(trimmed))
            };

            let mut line = unit.repeat(depth);
            if in_block && trimmed.starts_with('*') {
                line.push(' ');
            }
            line.push_str(trimmed);
            lines.push(line);

            scanner.scan(trimmed, idx + 1)?;
        }

        if scanner.mode() != Mode::Code {
            return Err("unterminated comment or template literal at end of input".to_string());
        }
        if !scanner.brackets.is_empty() {
            return Err(format!("{} unclosed bracket(s) at end of input", scanner.brackets.len()));
        }

        while lines.last().map(|l| l.is_empty()).unwrap_or(false) {
            lines.pop();
        }

        let newline = style.newline();
        let mut out = lines.join(newline);
        out.push_str(newline);
        Ok(out)
    }
}
