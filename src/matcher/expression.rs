//! Compile expression patterns into anchored regular expressions.
//!
//! The expression syntax recognises three constructs:
//!
//! - `{name}` placeholders, replaced by the named parameter type's
//!   fragment inside a named capture group;
//! - `(text)` optional text, matched zero or one time;
//! - `a/b` alternation between whitespace-delimited words.
//!
//! Everything else is matched literally. A backslash escapes the next
//! character, so `\{`, `\(` and `\/` match the character itself.

use super::MatchError;
use crate::params::ParamTypeRegistry;
use std::mem;
use std::str::Chars;

/// Name of the capture group holding the placeholder at `index`.
pub(super) fn group_name(index: usize) -> String {
    format!("p{index}")
}

/// Regex source and ordered placeholder type names for an expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Expression {
    pub(super) source: String,
    pub(super) params: Vec<String>,
}

struct ExpressionBuilder<'a> {
    pattern: &'a str,
    registry: &'a ParamTypeRegistry,
    output: String,
    params: Vec<String>,
    current: String,
    alternatives: Vec<String>,
}

impl<'a> ExpressionBuilder<'a> {
    fn new(pattern: &'a str, registry: &'a ParamTypeRegistry) -> Self {
        let mut output = String::with_capacity(pattern.len().saturating_mul(2) + 2);
        output.push('^');
        Self {
            pattern,
            registry,
            output,
            params: Vec::new(),
            current: String::new(),
            alternatives: Vec::new(),
        }
    }

    fn invalid(&self, message: &str) -> MatchError {
        MatchError::InvalidPattern {
            pattern: self.pattern.to_owned(),
            message: message.to_owned(),
        }
    }

    fn push_literal(&mut self, ch: char) {
        let mut buf = [0_u8; 4];
        self.current.push_str(&regex::escape(ch.encode_utf8(&mut buf)));
    }

    fn push_optional(&mut self, text: &str) {
        self.current.push_str("(?:");
        self.current.push_str(&regex::escape(text));
        self.current.push_str(")?");
    }

    fn flush_word(&mut self) {
        if self.alternatives.is_empty() {
            self.output.push_str(&mem::take(&mut self.current));
            return;
        }
        self.alternatives.push(mem::take(&mut self.current));
        self.output.push_str("(?:");
        self.output.push_str(&mem::take(&mut self.alternatives).join("|"));
        self.output.push(')');
    }

    fn push_param(&mut self, name: &str) -> Result<(), MatchError> {
        if name.is_empty() {
            return Err(self.invalid("empty `{}` placeholder"));
        }
        let param = self
            .registry
            .get(name)
            .ok_or_else(|| MatchError::UnknownParamType {
                name: name.to_owned(),
                pattern: self.pattern.to_owned(),
            })?;
        let group = group_name(self.params.len());
        self.output.push_str(&format!("(?P<{group}>{})", param.regex()));
        self.params.push(name.to_owned());
        Ok(())
    }

    fn build(mut self) -> Result<Expression, MatchError> {
        let pattern = self.pattern;
        let mut chars = pattern.chars();
        while let Some(ch) = chars.next() {
            match ch {
                '\\' => {
                    let escaped = chars
                        .next()
                        .ok_or_else(|| self.invalid("trailing `\\` escape"))?;
                    self.push_literal(escaped);
                }
                '/' => self.alternatives.push(mem::take(&mut self.current)),
                '{' => {
                    let name = take_until(&mut chars, '}')
                        .ok_or_else(|| self.invalid("unclosed `{` placeholder"))?;
                    self.flush_word();
                    self.push_param(name.trim())?;
                }
                '(' => {
                    let text = take_until(&mut chars, ')')
                        .ok_or_else(|| self.invalid("unclosed `(` optional group"))?;
                    self.push_optional(&text);
                }
                c if c.is_whitespace() => {
                    self.flush_word();
                    self.push_literal(c);
                    self.flush_word();
                }
                c => self.push_literal(c),
            }
        }
        self.flush_word();
        self.output.push('$');
        Ok(Expression {
            source: self.output,
            params: self.params,
        })
    }
}

/// Collect characters up to `close`, resolving backslash escapes.
///
/// Returns `None` when `close` never appears.
fn take_until(chars: &mut Chars<'_>, close: char) -> Option<String> {
    let mut text = String::new();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => text.push(chars.next()?),
            c if c == close => return Some(text),
            c => text.push(c),
        }
    }
    None
}

/// Compile `pattern` against the types in `registry`.
pub(super) fn compile(
    pattern: &str,
    registry: &ParamTypeRegistry,
) -> Result<Expression, MatchError> {
    ExpressionBuilder::new(pattern, registry).build()
}
