//! A backtracking regular expression engine matching .NET's
//! `System.Text.RegularExpressions` dialect.
//!
//! The pipeline is pattern text → [`parser::Parser`] → [`node::Expression`]
//! tree → [`engine::Engine`] search loop. Replacement templates are expanded
//! by [`replace::expand`]. None of the four stages know about each other's
//! public surface; this module is the only place that wires them together
//! into [`Regex`].
//!
//! # Limitations
//!
//! - Subject strings are matched as sequences of `char`, so indices reported
//!   on [`Match`]/[`Group`] are char offsets, not UTF-16 code units as in
//!   .NET or UTF-8 byte offsets as most of the rest of the Rust ecosystem
//!   uses. This keeps right-to-left and variable-length-lookbehind matching
//!   at O(1) per step without re-deriving char boundaries on every move.
//! - No recursive patterns, no atomic groups across `\G`-anchored chained
//!   matches, no culture-specific case folding — case-insensitive matching
//!   folds ASCII letters and falls back to `char::to_lowercase` for
//!   everything else.

mod engine;
mod error;
mod flags;
mod group;
mod node;
mod parser;
mod replace;
mod scanner;
mod state;

use crate::engine::Engine;
use crate::group::{GroupId, GroupTable, WHOLE_MATCH};
use crate::parser::Parser;
use crate::state::Capture;

pub use crate::error::{Error, ParseError, ParseErrorKind, RuntimeError};
pub use crate::flags::Flags;

/// Compilation options: the inline-flag letters that apply from the start of
/// the pattern, and whether the engine searches right-to-left.
///
/// `Copy` because options are cheap to pass around and never mutated after
/// `Regex::new` consumes them — there is no reason to make a caller borrow
/// or clone this.
#[derive(Clone, Copy, Debug, Default)]
pub struct RegexOptions {
    pub flags: Flags,
    pub right_to_left: bool,
}

impl RegexOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a flags string such as `"im"` or `"i-m"` into a `RegexOptions`.
    /// Unknown letters are reported through [`ParseErrorKind::UnknownFlag`]
    /// at position 0, since the options string has no position of its own
    /// in the pattern.
    pub fn from_str_flags(spec: &str, right_to_left: bool) -> Result<Self, Error> {
        let mut flags = Flags::NONE;
        flags.apply(spec).map_err(|bad| Error::Parse(ParseError::at(0, ParseErrorKind::UnknownFlag(bad))))?;
        Ok(Self { flags, right_to_left })
    }
}

/// A compiled pattern. Cheap to clone is not a goal here — `Regex` owns its
/// expression tree and group table outright rather than sharing them behind
/// a handle.
pub struct Regex {
    pattern: String,
    options: RegexOptions,
    engine: Engine,
}

impl Regex {
    pub fn new(pattern: &str, options: RegexOptions) -> Result<Self, Error> {
        let output = Parser::new(pattern, options.flags).parse()?;
        let mut root = output.root;
        // RTL inversion runs once, here, rather than being threaded through
        // every node's `match_`/`backtrack`: a single tree-wide flip is
        // equivalent to walking the whole match backward.
        if options.right_to_left {
            root.invert();
        }
        let engine = Engine::new(root, output.groups, options.right_to_left);
        Ok(Self { pattern: pattern.to_string(), options, engine })
    }

    pub fn options(&self) -> RegexOptions {
        self.options
    }

    fn window(&self, chars_len: usize, start: Option<usize>, length: Option<usize>) -> (usize, usize, usize) {
        if self.options.right_to_left {
            let right_bound = start.unwrap_or(chars_len).min(chars_len);
            let span = length.unwrap_or(right_bound);
            let left_bound = right_bound.saturating_sub(span);
            (left_bound, right_bound, right_bound)
        } else {
            let left_bound = start.unwrap_or(0).min(chars_len);
            let span = length.unwrap_or(chars_len - left_bound);
            let right_bound = (left_bound + span).min(chars_len);
            (left_bound, right_bound, left_bound)
        }
    }

    /// Search `input` for one match, starting no earlier (LTR) / no later
    /// (RTL) than `start` (default: the appropriate end of the string) and
    /// restricted to `length` chars of window (default: the rest of the
    /// string). Returns [`Match::empty`] rather than `None` — an unmatched
    /// pattern is a value, not an error, per the error-handling design.
    pub fn find(&self, input: &str, start: Option<usize>, length: Option<usize>) -> Match {
        let chars: Vec<char> = input.chars().collect();
        let (left_bound, right_bound, initial_index) = self.window(chars.len(), start, length);
        match self.engine.find_from(&chars, initial_index, left_bound, right_bound, Some(initial_index)) {
            Some(raw) => build_match(raw, &chars, &self.engine.groups),
            None => Match::empty(),
        }
    }

    pub fn is_match(&self, input: &str, start: Option<usize>) -> bool {
        let chars: Vec<char> = input.chars().collect();
        let (left_bound, right_bound, initial_index) = self.window(chars.len(), start, None);
        self.engine.is_match(&chars, initial_index, left_bound, right_bound)
    }

    /// All non-overlapping matches from `start` to the end of the window.
    pub fn find_iter(&self, input: &str, start: Option<usize>) -> Vec<Match> {
        let chars: Vec<char> = input.chars().collect();
        let (left_bound, right_bound, initial_index) = self.window(chars.len(), start, None);
        self.engine
            .find_all(&chars, initial_index, left_bound, right_bound)
            .into_iter()
            .map(|raw| build_match(raw, &chars, &self.engine.groups))
            .collect()
    }

    /// Replace at most `count` matches (`None` or `Some(-1)` for all,
    /// `Some(0)` for none) with `template`, expanded per match through the
    /// `$`-substitution rules.
    pub fn replace(&self, input: &str, template: &str, count: Option<i64>, start: Option<usize>) -> Result<String, Error> {
        let groups = &self.engine.groups;
        self.replace_impl(input, count, start, |raw, chars| {
            let ctx = replace::ExpandContext { input: chars, whole: Capture::new(raw.start, raw.end), captures: &raw.captures, groups };
            replace::expand(template, &ctx)
        })
    }

    /// Replace at most `count` matches by calling `f` with each match,
    /// splicing in whatever text it returns. The function-based counterpart
    /// to [`Regex::replace`]'s template substitution.
    pub fn replace_with<F>(&self, input: &str, count: Option<i64>, start: Option<usize>, mut f: F) -> Result<String, Error>
    where
        F: FnMut(&Match) -> String,
    {
        let groups = &self.engine.groups;
        self.replace_impl(input, count, start, |raw, chars| {
            let m = build_match_ref(raw, chars, groups);
            f(&m)
        })
    }

    fn replace_impl<F>(&self, input: &str, count: Option<i64>, start: Option<usize>, render: F) -> Result<String, Error>
    where
        F: Fn(&engine::RawMatch, &[char]) -> String,
    {
        let limit = validate_count(count)?;
        let chars: Vec<char> = input.chars().collect();
        let (left_bound, right_bound, initial_index) = self.window(chars.len(), start, None);
        let mut matches = self.engine.find_all(&chars, initial_index, left_bound, right_bound);
        // `count` bounds how many matches are taken in *search* order (the
        // first matches found, which for RTL means the rightmost ones);
        // splicing then proceeds left-to-right regardless of direction.
        if let Some(limit) = limit {
            matches.truncate(limit);
        }
        matches.sort_by_key(|m| m.start);

        let mut out = String::with_capacity(chars.len());
        let mut prev_end = 0usize;
        for m in &matches {
            out.extend(chars[prev_end..m.start].iter());
            out.push_str(&render(m, &chars));
            prev_end = m.end;
        }
        out.extend(chars[prev_end..].iter());
        Ok(out)
    }

    /// Split `input` at the first `count - 1` matches found (`None` or
    /// `Some(-1)` for every match). The matched text itself is dropped from
    /// the result, matching .NET's `Regex.Split`.
    pub fn split(&self, input: &str, count: Option<i64>, start: Option<usize>) -> Result<Vec<String>, Error> {
        let limit = validate_count(count)?;
        let chars: Vec<char> = input.chars().collect();
        let (left_bound, right_bound, initial_index) = self.window(chars.len(), start, None);
        let mut matches = self.engine.find_all(&chars, initial_index, left_bound, right_bound);
        if let Some(limit) = limit {
            matches.truncate(limit.saturating_sub(1));
        }
        matches.sort_by_key(|m| m.start);

        let mut out = Vec::with_capacity(matches.len() + 1);
        let mut prev_end = 0usize;
        for m in &matches {
            out.push(chars[prev_end..m.start].iter().collect());
            prev_end = m.end;
        }
        out.push(chars[prev_end..].iter().collect());
        Ok(out)
    }

    /// The pattern text this `Regex` was compiled from.
    pub fn as_str(&self) -> &str {
        &self.pattern
    }
}

impl std::fmt::Display for Regex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.pattern)
    }
}

fn validate_count(count: Option<i64>) -> Result<Option<usize>, Error> {
    match count {
        None | Some(-1) => Ok(None),
        Some(c) if c < 0 => Err(Error::Runtime(RuntimeError::NegativeCount(c))),
        Some(c) => Ok(Some(c as usize)),
    }
}

/// One captured span plus its text, as recorded the moment it closed. A
/// group matched inside a loop keeps every iteration's capture here, oldest
/// first — `Group::value` and `Group::index`/`length` always reflect the
/// last (most recent) one, matching .NET's `Group.Captures`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupCapture {
    pub index: usize,
    pub length: usize,
    pub value: String,
}

/// One capture group: either a named group, an auto-numbered group, or
/// group 0, the whole match.
#[derive(Clone, Debug)]
pub struct Group {
    name: String,
    success: bool,
    index: usize,
    length: usize,
    value: String,
    captures: Vec<GroupCapture>,
}

impl Group {
    pub fn success(&self) -> bool {
        self.success
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// Every capture this group recorded, oldest first. Empty if the group
    /// never participated in the match.
    pub fn captures(&self) -> &[GroupCapture] {
        &self.captures
    }
}

/// The result of one match attempt. An unmatched pattern produces
/// [`Match::empty`] rather than `Option::None` — callers that only care
/// whether something matched should use [`Regex::is_match`] instead.
#[derive(Clone, Debug)]
pub struct Match {
    matched: bool,
    value: String,
    index: usize,
    length: usize,
    groups: Vec<Group>,
    collapsed_order: Vec<usize>,
}

impl Match {
    pub fn empty() -> Self {
        Self { matched: false, value: String::new(), index: 0, length: 0, groups: Vec::new(), collapsed_order: Vec::new() }
    }

    pub fn success(&self) -> bool {
        self.matched
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// The matched text, or [`RuntimeError::NoMatch`] if this is
    /// [`Match::empty`] — the one runtime error the matching API itself can
    /// produce.
    pub fn result(&self) -> Result<&str, RuntimeError> {
        if self.matched {
            Ok(&self.value)
        } else {
            Err(RuntimeError::NoMatch)
        }
    }

    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.name == name)
    }

    pub fn group_at(&self, number: usize) -> Option<&Group> {
        self.groups.iter().find(|g| g.name == number.to_string())
    }

    /// Every group in "collapsed" order: decimal-named groups ascending,
    /// interleaved with non-decimal names once the numeric sequence has a
    /// gap — the same ordering `$+` and `.NET`'s `Match.Groups` use.
    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.collapsed_order.iter().map(move |&i| &self.groups[i])
    }
}

fn build_match(raw: engine::RawMatch, chars: &[char], groups: &GroupTable) -> Match {
    build_match_ref(&raw, chars, groups)
}

fn build_match_ref(raw: &engine::RawMatch, chars: &[char], groups: &GroupTable) -> Match {
    let mut by_id: Vec<Group> = Vec::with_capacity(groups.len());
    for id in groups.ids() {
        let stack: Vec<Capture> = if id == WHOLE_MATCH {
            vec![Capture::new(raw.start, raw.end)]
        } else {
            raw.captures[id.0 as usize].clone()
        };
        let success = !stack.is_empty();
        let (index, length, value) = match stack.last() {
            Some(cap) => (cap.start, cap.end - cap.start, chars[cap.start..cap.end].iter().collect()),
            None => (0, 0, String::new()),
        };
        let captures = stack
            .iter()
            .map(|cap| GroupCapture { index: cap.start, length: cap.end - cap.start, value: chars[cap.start..cap.end].iter().collect() })
            .collect();
        by_id.push(Group { name: groups.name_of(id).to_string(), success, index, length, value, captures });
    }
    let collapsed_order = groups.collapsed_order().into_iter().map(|id: GroupId| id.0 as usize).collect();
    Match {
        matched: true,
        value: chars[raw.start..raw.end].iter().collect(),
        index: raw.start,
        length: raw.end - raw.start,
        groups: by_id,
        collapsed_order,
    }
}

/// Escape every pattern metacharacter in `s` so it matches itself literally.
pub fn escape(s: &str) -> String {
    replace::escape(s)
}

/// Reverse [`escape`]: unescape backslash sequences `escape` would have
/// produced.
pub fn unescape(s: &str) -> String {
    replace::unescape(s)
}

#[cfg(test)]
mod tests;
