//! Text-level editing of the per-design mask selection expression.
//!
//! Each pipelined module carries one declaration of the form
//!
//! ```text
//! localparam PIPELINE_STAGE_MASK = (INSTANCE_ID == 3) ? 5'b00010 :
//!                                  (INSTANCE_ID == 7) ? 4'b0100 :
//!                                  DEFAULT_MASK;
//! ```
//!
//! A branch for an instance id is rewritten in place when present, or
//! inserted in front of the existing expression otherwise. Only the
//! declaration's own text is touched.

use kairos_common::PipelineMask;
use std::ops::Range;

/// Names used to find the mask declaration and its per-instance branches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskExpression {
    /// The `localparam` holding the mask.
    pub mask_param: String,
    /// The parameter compared against in each branch.
    pub id_param: String,
}

impl Default for MaskExpression {
    fn default() -> Self {
        Self::new("PIPELINE_STAGE_MASK", "INSTANCE_ID")
    }
}

impl MaskExpression {
    /// Creates a matcher for the given parameter names.
    pub fn new(mask_param: impl Into<String>, id_param: impl Into<String>) -> Self {
        Self {
            mask_param: mask_param.into(),
            id_param: id_param.into(),
        }
    }

    /// Returns `true` if `content` contains the mask declaration.
    pub fn is_declared_in(&self, content: &str) -> bool {
        self.find_decl(content).is_some()
    }

    /// Returns `content` with the branch for `instance_id` set to `mask`.
    ///
    /// Returns `None` if there is no mask declaration. Applying the same
    /// `(instance_id, mask)` again yields identical text.
    pub fn patch(&self, content: &str, instance_id: u64, mask: &PipelineMask) -> Option<String> {
        let expr = self.find_decl(content)?;
        let branch = self.branch_text(instance_id, mask);
        let mut out = String::with_capacity(content.len() + branch.len() + 1);
        match self.find_branch(content, expr.clone(), instance_id) {
            Some(found) => {
                out.push_str(&content[..found.span.start]);
                out.push_str(&branch);
                out.push_str(&content[found.span.end..]);
            }
            None => {
                out.push_str(&content[..expr.start]);
                out.push_str(&branch);
                out.push(' ');
                out.push_str(&content[expr.start..]);
            }
        }
        Some(out)
    }

    /// Reads back the mask selected for `instance_id`, if it has a branch
    /// holding a binary literal.
    pub fn read(&self, content: &str, instance_id: u64) -> Option<PipelineMask> {
        let expr = self.find_decl(content)?;
        let found = self.find_branch(content, expr, instance_id)?;
        let literal = &content[found.value];
        let (width, digits) = literal
            .split_once("'b")
            .or_else(|| literal.split_once("'B"))?;
        let mask: PipelineMask = digits.trim().parse().ok()?;
        match width.trim().parse::<usize>() {
            Ok(w) if w != mask.len() => None,
            _ => Some(mask),
        }
    }

    fn branch_text(&self, instance_id: u64, mask: &PipelineMask) -> String {
        format!(
            "({} == {}) ? {} :",
            self.id_param,
            instance_id,
            mask.to_verilog_literal()
        )
    }

    /// Byte range of the declaration's right-hand side, without the `;`.
    fn find_decl(&self, content: &str) -> Option<Range<usize>> {
        const KEYWORD: &str = "localparam";
        for (idx, _) in content.match_indices(KEYWORD) {
            if content[..idx].chars().next_back().is_some_and(is_ident)
                || in_line_comment(content, idx)
            {
                continue;
            }
            let mut cur = Cursor::at(content, idx + KEYWORD.len());
            if !cur.peek().is_some_and(char::is_whitespace) {
                continue;
            }
            if !cur.skip_to_name(&self.mask_param) {
                continue;
            }
            cur.skip_ws();
            if !cur.eat("=") || cur.peek() == Some('=') {
                continue;
            }
            cur.skip_ws();
            let start = cur.pos;
            let semi = start + content[start..].find(';')?;
            let end = start + content[start..semi].trim_end().len();
            return Some(start..end);
        }
        None
    }

    fn find_branch(&self, content: &str, expr: Range<usize>, instance_id: u64) -> Option<Branch> {
        for (rel, _) in content[expr.clone()].match_indices('(') {
            let open = expr.start + rel;
            let mut cur = Cursor::at(&content[..expr.end], open + 1);
            cur.skip_ws();
            if !cur.eat_word(&self.id_param) {
                continue;
            }
            cur.skip_ws();
            if !cur.eat("==") {
                continue;
            }
            cur.skip_ws();
            if cur.number() != Some(instance_id) {
                continue;
            }
            cur.skip_ws();
            if !cur.eat(")") {
                continue;
            }
            cur.skip_ws();
            if !cur.eat("?") {
                continue;
            }
            cur.skip_ws();
            let value_start = cur.pos;
            let Some(colon) = content[value_start..expr.end].find(':').map(|c| value_start + c) else {
                continue;
            };
            let value_end = value_start + content[value_start..colon].trim_end().len();
            return Some(Branch {
                span: open..colon + 1,
                value: value_start..value_end,
            });
        }
        None
    }
}

/// One `(ID == N) ? VALUE :` branch.
struct Branch {
    span: Range<usize>,
    value: Range<usize>,
}

/// Returns `true` if a `//` precedes `idx` on its line.
fn in_line_comment(content: &str, idx: usize) -> bool {
    let line_start = content[..idx].rfind('\n').map_or(0, |n| n + 1);
    content[line_start..idx].contains("//")
}

fn is_ident(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

struct Cursor<'t> {
    text: &'t str,
    pos: usize,
}

impl<'t> Cursor<'t> {
    fn at(text: &'t str, pos: usize) -> Self {
        Self { text, pos }
    }

    fn rest(&self) -> &'t str {
        &self.text[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn skip_ws(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn eat(&mut self, s: &str) -> bool {
        if self.rest().starts_with(s) {
            self.pos += s.len();
            true
        } else {
            false
        }
    }

    fn eat_word(&mut self, word: &str) -> bool {
        let rest = self.rest();
        if rest.starts_with(word) && !rest[word.len()..].chars().next().is_some_and(is_ident) {
            self.pos += word.len();
            true
        } else {
            false
        }
    }

    fn eat_ident(&mut self) -> bool {
        let len = self.rest().find(|c: char| !is_ident(c)).unwrap_or(self.rest().len());
        self.pos += len;
        len > 0
    }

    /// Skips type keywords and packed ranges up to `name`.
    fn skip_to_name(&mut self, name: &str) -> bool {
        loop {
            self.skip_ws();
            if self.eat_word(name) {
                return true;
            }
            match self.peek() {
                Some('[') => match self.rest().find(']') {
                    Some(close) => self.pos += close + 1,
                    None => return false,
                },
                Some(c) if is_ident(c) => {
                    self.eat_ident();
                }
                _ => return false,
            }
        }
    }

    fn number(&mut self) -> Option<u64> {
        let rest = self.rest();
        let len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '_'))
            .unwrap_or(rest.len());
        if len == 0 {
            return None;
        }
        let digits: String = rest[..len].chars().filter(|c| *c != '_').collect();
        self.pos += len;
        digits.parse().ok()
    }
}
