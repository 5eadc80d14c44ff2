//! The search loop: advances a start index across the window until the root
//! expression matches or the window is exhausted, per the engine loop
//! description — try, advance by one on failure, stop at the bound.
//!
//! This module knows nothing about the public `Match`/`Group` wrapper types
//! in `lib.rs`; it hands back raw capture-stack data and leaves presentation
//! to the caller.

use crate::group::GroupTable;
use crate::node::Expression;
use crate::state::{Capture, State};

/// Result of one successful search: the whole match's own span plus every
/// other group's capture stack (indexed by `GroupId.0`; index 0 is unused —
/// the whole match's span is carried separately since group 0 is never
/// wrapped in its own `Group` node).
pub struct RawMatch {
    pub start: usize,
    pub end: usize,
    pub captures: Vec<Vec<Capture>>,
}

pub struct Engine {
    pub root: Expression,
    pub groups: GroupTable,
    pub right_to_left: bool,
}

impl Engine {
    pub fn new(root: Expression, groups: GroupTable, right_to_left: bool) -> Self {
        Self { root, groups, right_to_left }
    }

    fn direction(&self) -> i8 {
        if self.right_to_left {
            -1
        } else {
            1
        }
    }

    /// Attempt a match with the root expression anchored at exactly `index`.
    /// No search — callers loop this across the window for `find_from`.
    fn try_at(&self, chars: &[char], index: usize, left_bound: usize, right_bound: usize, previous_match_end: Option<usize>) -> Option<RawMatch> {
        let mut state = State::new(chars, left_bound, right_bound, self.direction(), self.groups.len());
        state.index = index;
        state.previous_match_end = previous_match_end;
        let token = self.root.match_(&mut state)?;
        // The match succeeded outright; there is nothing to backtrack into
        // for a single attempt, so the token is dropped without calling
        // `discard` — that would undo the very captures just recorded.
        drop(token);
        // RTL consumes backward, so `state.index` ends up below `index`;
        // the reported span is always stored ascending.
        let (start, end) = if self.right_to_left { (state.index, index) } else { (index, state.index) };
        Some(RawMatch { start, end, captures: state.captures })
    }

    /// Search for one match starting no earlier (LTR) / no later (RTL) than
    /// `from`, within `[left_bound, right_bound]`. `previous_match_end`
    /// feeds `\G`.
    pub fn find_from(&self, chars: &[char], from: usize, left_bound: usize, right_bound: usize, previous_match_end: Option<usize>) -> Option<RawMatch> {
        let mut index = from;
        loop {
            if index < left_bound || index > right_bound {
                return None;
            }
            if let Some(m) = self.try_at(chars, index, left_bound, right_bound, previous_match_end) {
                return Some(m);
            }
            log::trace!("root expression exhausted its backtracking at index {index}, advancing");
            if self.right_to_left {
                if index == left_bound {
                    return None;
                }
                index -= 1;
            } else {
                if index == right_bound {
                    return None;
                }
                index += 1;
            }
        }
    }

    /// All non-overlapping matches from `from` to the window bound. After a
    /// zero-width match, the next search starts one position further in the
    /// direction of travel so the loop cannot stall.
    pub fn find_all(&self, chars: &[char], from: usize, left_bound: usize, right_bound: usize) -> Vec<RawMatch> {
        let mut out = Vec::new();
        let mut cursor = from;
        // \G anchors to the search start on the first attempt, then to the
        // end of the previous match for every attempt after that.
        let mut previous_match_end = Some(from);
        loop {
            let Some(m) = self.find_from(chars, cursor, left_bound, right_bound, previous_match_end) else {
                break;
            };
            previous_match_end = Some(if self.right_to_left { m.start } else { m.end });
            let zero_width = m.start == m.end;
            cursor = if self.right_to_left { m.start } else { m.end };
            out.push(m);
            if zero_width {
                if self.right_to_left {
                    if cursor == left_bound {
                        break;
                    }
                    cursor -= 1;
                } else {
                    if cursor == right_bound {
                        break;
                    }
                    cursor += 1;
                }
            }
        }
        out
    }

    pub fn is_match(&self, chars: &[char], from: usize, left_bound: usize, right_bound: usize) -> bool {
        self.find_from(chars, from, left_bound, right_bound, Some(from)).is_some()
    }
}
