//! The `$`-template replacement evaluator, plus `split`/`escape`/`unescape`.
//!
//! `expand` is the one function that understands template syntax; `Regex`'s
//! `replace`/`replace_all` in `lib.rs` just call it once per match and splice
//! the literal text between matches back in.

use crate::group::{GroupId, GroupTable};
use crate::state::Capture;

/// Everything `expand` needs to resolve a `$`-reference without depending on
/// the public `Match` type: the whole match's own span, the full input, and
/// per-group capture stacks (top of stack is used, matching `Match::group`).
pub struct ExpandContext<'a> {
    pub input: &'a [char],
    pub whole: Capture,
    pub captures: &'a [Vec<Capture>],
    pub groups: &'a GroupTable,
}

impl<'a> ExpandContext<'a> {
    fn group_text(&self, id: GroupId) -> Option<String> {
        self.captures[id.0 as usize].last().map(|cap| self.input[cap.start..cap.end].iter().collect())
    }

    fn whole_text(&self) -> String {
        self.input[self.whole.start..self.whole.end].iter().collect()
    }

    /// Resolve a `$name` reference by the group's user-visible name. `"0"`
    /// is handled specially: it is never in the group table's namespace
    /// (group 0 is the implicit whole match, not a registered name), but
    /// .NET still honors `$0`/`${0}` as a synonym for `$&`.
    fn text_by_name(&self, name: &str) -> Option<String> {
        if name == "0" {
            return Some(self.whole_text());
        }
        let id = self.groups.lookup(name)?;
        self.group_text(id)
    }
}

/// Expand a replacement template against one match, per the `$`-sequence
/// table: `$$`, `$n`/`${n}`/`${name}`, `$&`, `$_`, `` $` ``, `$'`, `$+`, and
/// any other `$x` passed through literally.
pub fn expand(template: &str, ctx: &ExpandContext) -> String {
    let mut out = String::with_capacity(template.len());
    let chars: Vec<char> = template.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] != '$' {
            out.push(chars[i]);
            i += 1;
            continue;
        }
        let Some(next) = chars.get(i + 1) else {
            out.push('$');
            break;
        };
        match next {
            '$' => {
                out.push('$');
                i += 2;
            }
            '&' => {
                out.extend(ctx.input[ctx.whole.start..ctx.whole.end].iter());
                i += 2;
            }
            '_' => {
                out.extend(ctx.input.iter());
                i += 2;
            }
            '`' => {
                out.extend(ctx.input[..ctx.whole.start].iter());
                i += 2;
            }
            '\'' => {
                out.extend(ctx.input[ctx.whole.end..].iter());
                i += 2;
            }
            '+' => {
                out.push_str(&last_group_text(ctx));
                i += 2;
            }
            '{' => match chars[i + 2..].iter().position(|&c| c == '}') {
                Some(rel_end) => {
                    let name: String = chars[i + 2..i + 2 + rel_end].iter().collect();
                    out.push_str(&resolve_named(ctx, &name).unwrap_or_default());
                    i += 2 + rel_end + 1;
                }
                None => {
                    out.push('$');
                    i += 1;
                }
            },
            c if c.is_ascii_digit() => {
                let digit_run: String = chars[i + 1..].iter().take_while(|c| c.is_ascii_digit()).collect();
                let (text, consumed) = resolve_longest_numeric_prefix(ctx, &digit_run);
                match text {
                    Some(t) => {
                        out.push_str(&t);
                        i += 1 + consumed;
                    }
                    None => {
                        out.push('$');
                        i += 1;
                    }
                }
            }
            _ => {
                out.push('$');
                i += 1;
            }
        }
    }
    out
}

fn resolve_named(ctx: &ExpandContext, name: &str) -> Option<String> {
    ctx.text_by_name(name)
}

/// `$12` resolves against the longest digit run that names an existing
/// group, falling back to shorter prefixes, per the "longest-existing-group
/// prefix of a digit run wins" rule.
fn resolve_longest_numeric_prefix(ctx: &ExpandContext, digit_run: &str) -> (Option<String>, usize) {
    for len in (1..=digit_run.len()).rev() {
        let candidate = &digit_run[..len];
        if candidate == "0" {
            return (Some(ctx.whole_text()), len);
        }
        if let Some(id) = ctx.groups.lookup(candidate) {
            if let Some(text) = ctx.group_text(id) {
                return (Some(text), len);
            }
            return (Some(String::new()), len);
        }
    }
    (None, 0)
}

fn last_group_text(ctx: &ExpandContext) -> String {
    for id in ctx.groups.collapsed_order().into_iter().rev() {
        if let Some(text) = ctx.group_text(id) {
            return text;
        }
    }
    ctx.input[ctx.whole.start..ctx.whole.end].iter().collect()
}

/// The fixed character set `escape` backslash-quotes: the full set of
/// pattern metacharacters plus whitespace forms that would otherwise need a
/// class/anchor escape to reproduce literally.
const ESCAPED_CHARS: &[char] = &['\\', '*', '+', '?', '|', '{', '}', '[', ']', '(', ')', '^', '$', '.', '#', ' '];

pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{0C}' => out.push_str("\\f"),
            '\u{0B}' => out.push_str("\\v"),
            c if ESCAPED_CHARS.contains(&c) => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out
}

pub fn unescape(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] != '\\' || i + 1 == chars.len() {
            out.push(chars[i]);
            i += 1;
            continue;
        }
        let c = chars[i + 1];
        let literal = match c {
            't' => '\t',
            'n' => '\n',
            'r' => '\r',
            'f' => '\u{0C}',
            'v' => '\u{0B}',
            other => other,
        };
        out.push(literal);
        i += 2;
    }
    out
}
