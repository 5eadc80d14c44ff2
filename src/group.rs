//! Group identity table: the name → id namespace shared by numbered and
//! named capture groups.
//!
//! Numbered groups are assigned sequential decimal names "1", "2", … in
//! left-to-right order of their opening delimiter. An explicit `(?<3>...)`
//! claims that name out of order; a later auto-numbered group that would
//! have produced "3" is still assigned it — collisions are intentional and
//! both occurrences share one identity and one capture stack.

use std::collections::HashMap;

/// Opaque handle into a [`GroupTable`]. Group 0 (the whole match) always
/// has id 0 and is registered up front by [`GroupTable::new`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct GroupId(pub u32);

pub const WHOLE_MATCH: GroupId = GroupId(0);

#[derive(Default)]
pub struct GroupTable {
    names: Vec<String>,
    by_name: HashMap<String, GroupId>,
    next_auto_number: u32,
}

impl GroupTable {
    /// Group 0's name `"0"` is pushed into `names` for display purposes (so
    /// `name_of(WHOLE_MATCH) == "0"`) but deliberately left out of `by_name`:
    /// `lookup("0")` must return `None` so that `\0` parses as the octal
    /// null escape rather than a back-reference, and so an explicit
    /// `(?<0>...)` can be rejected as a reserved group number instead of
    /// silently aliasing the whole match.
    pub fn new() -> Self {
        Self { names: vec!["0".to_string()], by_name: HashMap::new(), next_auto_number: 1 }
    }

    fn push_name(&mut self, name: String) -> GroupId {
        let id = GroupId(self.names.len() as u32);
        self.by_name.insert(name.clone(), id);
        self.names.push(name);
        id
    }

    /// Register (or look up) a named group, e.g. `(?<foo>...)`. If the name
    /// was already seen, returns the existing identity so the two
    /// occurrences share one capture stack.
    pub fn named(&mut self, name: &str) -> GroupId {
        if let Some(&id) = self.by_name.get(name) {
            return id;
        }
        self.push_name(name.to_string())
    }

    /// Register (or look up) an explicitly-numbered group, e.g.
    /// `(?<3>...)`. Does not advance the auto-number counter; a later
    /// `(...)` can still independently claim the same decimal name.
    pub fn numbered(&mut self, n: u32) -> GroupId {
        self.named(&n.to_string())
    }

    /// The next sequential decimal name for a bare `(...)` group.
    pub fn auto_numbered(&mut self) -> GroupId {
        loop {
            let candidate = self.next_auto_number.to_string();
            self.next_auto_number += 1;
            if let Some(&id) = self.by_name.get(&candidate) {
                return id;
            }
            return self.push_name(candidate);
        }
    }

    /// Look up an existing group by name, without registering one. Used for
    /// back-reference and conditional resolution; leading-zero names like
    /// `01` only ever resolve through this path, never through `numbered`.
    pub fn lookup(&self, name: &str) -> Option<GroupId> {
        self.by_name.get(name).copied()
    }

    pub fn name_of(&self, id: GroupId) -> &str {
        &self.names[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn ids(&self) -> impl Iterator<Item = GroupId> {
        (0..self.names.len() as u32).map(GroupId)
    }

    /// The "collapsed" ordering .NET uses for `Match.Groups` enumeration and
    /// `$+`: walk the decimal-named groups in ascending numeric order,
    /// interleaved at the position their number would naturally fall, with
    /// non-decimal names appended once the numeric sequence is exhausted.
    pub fn collapsed_order(&self) -> Vec<GroupId> {
        let mut numeric: Vec<(u32, GroupId)> = Vec::new();
        let mut named: Vec<GroupId> = Vec::new();
        for id in self.ids() {
            if id == WHOLE_MATCH {
                continue;
            }
            match self.name_of(id).parse::<u32>() {
                Ok(n) => numeric.push((n, id)),
                Err(_) => named.push(id),
            }
        }
        numeric.sort_by_key(|&(n, _)| n);

        let mut result = Vec::with_capacity(numeric.len() + named.len());
        let mut numeric = numeric.into_iter().peekable();
        let mut named = named.into_iter();
        // Slot 0 belongs to the whole match, which is excluded above, so the
        // first assignable slot is 1.
        let mut i = 1u32;
        loop {
            match numeric.peek() {
                Some(&(n, id)) if n == i => {
                    result.push(id);
                    numeric.next();
                }
                _ => match named.next() {
                    Some(id) => result.push(id),
                    None => break,
                },
            }
            i += 1;
        }
        result.extend(numeric.map(|(_, id)| id));
        result
    }
}
