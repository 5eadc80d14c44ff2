//! The expression tree: node variants and their match/backtrack/discard/
//! invert protocol.
//!
//! Every variant implements the four operations from the design: `match_`
//! attempts the first candidate at `state.index`; `backtrack` undoes the
//! last candidate and seeks the next one; `discard` unconditionally undoes
//! without seeking an alternative; `invert` structurally flips the node for
//! right-to-left evaluation. Tokens are the opaque, per-kind record of what
//! a successful `match_`/`backtrack` did, so `discard`/`backtrack` know
//! exactly how much state to rewind.

use std::rc::Rc;

use crate::group::GroupId;
use crate::state::{Capture, State};

/// A predicate over a single character, as used by `Expression::Character`.
/// Composable so that classes, negation, and subtraction nest freely.
#[derive(Clone, Debug)]
pub enum CharPredicate {
    Literal(char),
    Any,
    AnyExceptNewline,
    Digit,
    Word,
    Whitespace,
    Range(char, char),
    Union(Vec<CharPredicate>),
    Negate(Box<CharPredicate>),
    Subtract(Box<CharPredicate>, Box<CharPredicate>),
}

impl CharPredicate {
    pub fn test(&self, c: char) -> bool {
        match self {
            CharPredicate::Literal(l) => *l == c,
            CharPredicate::Any => true,
            CharPredicate::AnyExceptNewline => c != '\n',
            CharPredicate::Digit => c.is_ascii_digit(),
            CharPredicate::Word => c == '_' || c.is_alphanumeric(),
            CharPredicate::Whitespace => matches!(c, ' ' | '\t' | '\r' | '\n' | '\x0C' | '\x0B' | '\u{0085}'),
            CharPredicate::Range(lo, hi) => *lo <= c && c <= *hi,
            CharPredicate::Union(preds) => preds.iter().any(|p| p.test(c)),
            CharPredicate::Negate(p) => !p.test(c),
            CharPredicate::Subtract(base, minus) => base.test(c) && !minus.test(c),
        }
    }

    fn fold_test(&self, c: char) -> bool {
        if self.test(c) {
            return true;
        }
        c.to_lowercase().chain(c.to_uppercase()).any(|folded| folded != c && self.test(folded))
    }
}

#[derive(Clone, Copy, Debug)]
pub enum AnchorKind {
    StartOfInput,
    StartOfLine,
    EndOfInputOrTrailingNewline,
    EndOfLine,
    EndOfInputOnly,
    ContiguousMatch,
    WordBoundary(bool),
}

/// The `cond` of a `(?(cond)yes|no)` conditional.
#[derive(Clone, Debug)]
pub enum ConditionalKind {
    Group(GroupId),
    Assertion(Box<Expression>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RepetitionKind {
    Greedy,
    Lazy,
    Possessive,
}

/// Late-bound placeholder, resolved by the parser's post-parse pass once
/// every group is known. `Rc<RefCell<..>>` would also work; a `Cell`-free
/// `Rc<Expression>` swapped in after resolution keeps `Expression` itself
/// `Clone`-free of interior mutability outside this one variant.
pub type ProxyCell = Rc<std::cell::RefCell<Option<Expression>>>;

#[derive(Clone, Debug)]
pub enum Expression {
    Sequence(Vec<Expression>),
    Alternation(Box<Expression>, Box<Expression>),
    Repetition { inner: Box<Expression>, min: u32, max: u32, kind: RepetitionKind },
    Character { predicate: CharPredicate, ignore_case: bool },
    Group { id: GroupId, inner: Box<Expression> },
    NonCapturing(Box<Expression>),
    BalancingGroup { pop: GroupId, push: Option<GroupId>, inner: Box<Expression> },
    Reference { group: GroupId, ignore_case: bool },
    Anchor(AnchorKind),
    Lookaround { inner: Box<Expression>, negate: bool, behind: bool },
    Atomic(Box<Expression>),
    Conditional { cond: ConditionalKind, yes: Box<Expression>, no: Option<Box<Expression>> },
    Proxy(ProxyCell),
    Empty,
}

/// Opaque per-node record of what a successful `match_`/`backtrack` did.
#[derive(Clone, Debug)]
pub enum Token {
    Epsilon,
    Sequence(Vec<Token>),
    Alternation { left: bool, inner: Box<Token> },
    Repetition { iterations: Vec<Token> },
    Character,
    Group { inner: Box<Token>, entry_index: usize },
    BalancingGroup { inner: Box<Token>, popped: Capture, pushed: bool },
    Reference { len: usize },
    Lookaround { entry_index: usize, exit_index: usize, inner: Option<Box<Token>> },
    Atomic(Box<Token>),
    Conditional { chose_yes: bool, inner: Box<Token> },
    Proxy(Box<Token>),
}

/// Resume a forward search over `nodes[idx..]`, appending to `tokens`
/// (already holding successful tokens for `nodes[..idx]`).
fn seq_extend(nodes: &[Expression], state: &mut State, tokens: &mut Vec<Token>) -> bool {
    loop {
        if tokens.len() == nodes.len() {
            return true;
        }
        let idx = tokens.len();
        match nodes[idx].match_(state) {
            Some(t) => tokens.push(t),
            None => {
                if !seq_backtrack_last(nodes, state, tokens) {
                    return false;
                }
            }
        }
    }
}

/// Backtrack the last-matched child in `tokens`, popping further back if it
/// exhausts its own alternatives. Leaves `tokens` one shorter than before on
/// total failure (the caller's own last token also gets consumed).
fn seq_backtrack_last(nodes: &[Expression], state: &mut State, tokens: &mut Vec<Token>) -> bool {
    while let Some(t) = tokens.pop() {
        let idx = tokens.len();
        if let Some(nt) = nodes[idx].backtrack(state, t) {
            tokens.push(nt);
            return true;
        }
    }
    false
}

fn seq_discard(nodes: &[Expression], state: &mut State, tokens: Vec<Token>) {
    for (node, token) in nodes.iter().zip(tokens).rev() {
        node.discard(state, token);
    }
}

impl Expression {
    pub fn match_(&self, state: &mut State) -> Option<Token> {
        match self {
            Expression::Empty => Some(Token::Epsilon),

            Expression::Sequence(children) => {
                let mut tokens = Vec::with_capacity(children.len());
                if seq_extend(children, state, &mut tokens) {
                    Some(Token::Sequence(tokens))
                } else {
                    None
                }
            }

            Expression::NonCapturing(inner) => inner.match_(state),

            Expression::Alternation(left, right) => {
                if let Some(t) = left.match_(state) {
                    return Some(Token::Alternation { left: true, inner: Box::new(t) });
                }
                right.match_(state).map(|t| Token::Alternation { left: false, inner: Box::new(t) })
            }

            Expression::Repetition { inner, min, max, kind } => repetition_match(inner, *min, *max, *kind, state),

            Expression::Character { predicate, ignore_case } => {
                let c = state.peek()?;
                let matched = if *ignore_case { predicate.fold_test(c) } else { predicate.test(c) };
                if matched {
                    state.consume_one();
                    Some(Token::Character)
                } else {
                    None
                }
            }

            Expression::Group { id, inner } => {
                let entry = state.index;
                let token = inner.match_(state)?;
                state.push_capture(*id, entry);
                Some(Token::Group { inner: Box::new(token), entry_index: entry })
            }

            Expression::BalancingGroup { pop, push, inner } => {
                let popped = state.top_capture(*pop)?;
                let entry = state.index;
                let token = inner.match_(state)?;
                state.pop_capture(*pop);
                let pushed = if let Some(push_id) = push {
                    // middle two of [Xstart, Xend, matchStart, cursor], sorted
                    let mut bounds = [popped.start, popped.end, entry, state.index];
                    bounds.sort_unstable();
                    state.captures[push_id.0 as usize].push(Capture::new(bounds[1], bounds[2]));
                    true
                } else {
                    false
                };
                Some(Token::BalancingGroup { inner: Box::new(token), popped, pushed })
            }

            Expression::Reference { group, ignore_case } => {
                let cap = state.top_capture(*group)?;
                let text = state.slice(cap);
                let len = text.len();
                let matches = if state.direction >= 0 {
                    let start = state.index;
                    if start + len > state.right_bound {
                        return None;
                    }
                    char_eq(&state.chars[start..start + len], text, *ignore_case)
                } else {
                    if state.index < len || state.index - len < state.left_bound {
                        return None;
                    }
                    let start = state.index - len;
                    char_eq(&state.chars[start..state.index], text, *ignore_case)
                };
                if !matches {
                    return None;
                }
                if state.direction >= 0 {
                    state.index += len;
                } else {
                    state.index -= len;
                }
                Some(Token::Reference { len })
            }

            Expression::Anchor(kind) => {
                if test_anchor(*kind, state) {
                    Some(Token::Epsilon)
                } else {
                    None
                }
            }

            Expression::Lookaround { inner, negate, behind } => lookaround_match(inner, *negate, *behind, state),

            Expression::Atomic(inner) => {
                let token = inner.match_(state)?;
                Some(Token::Atomic(Box::new(token)))
            }

            Expression::Conditional { cond, yes, no } => {
                let take_yes = eval_condition(cond, state);
                if take_yes {
                    yes.match_(state).map(|t| Token::Conditional { chose_yes: true, inner: Box::new(t) })
                } else if let Some(no) = no {
                    no.match_(state).map(|t| Token::Conditional { chose_yes: false, inner: Box::new(t) })
                } else {
                    Some(Token::Epsilon)
                }
            }

            Expression::Proxy(cell) => {
                let borrowed = cell.borrow();
                let target = borrowed.as_ref().expect("proxy resolved before matching");
                target.match_(state).map(|t| Token::Proxy(Box::new(t)))
            }
        }
    }

    pub fn backtrack(&self, state: &mut State, token: Token) -> Option<Token> {
        match (self, token) {
            (Expression::Empty, Token::Epsilon) => None,

            (Expression::Sequence(children), Token::Sequence(mut tokens)) => {
                if seq_backtrack_last(children, state, &mut tokens) && seq_extend(children, state, &mut tokens) {
                    Some(Token::Sequence(tokens))
                } else {
                    None
                }
            }

            (Expression::NonCapturing(inner), token) => inner.backtrack(state, token),

            (Expression::Alternation(left, right), Token::Alternation { left: was_left, inner }) => {
                if was_left {
                    if let Some(t) = left.backtrack(state, *inner) {
                        return Some(Token::Alternation { left: true, inner: Box::new(t) });
                    }
                    right.match_(state).map(|t| Token::Alternation { left: false, inner: Box::new(t) })
                } else {
                    right.backtrack(state, *inner).map(|t| Token::Alternation { left: false, inner: Box::new(t) })
                }
            }

            (Expression::Repetition { inner, min, max, kind }, Token::Repetition { iterations }) => {
                repetition_backtrack(inner, *min, *max, *kind, state, iterations)
            }

            (Expression::Character { .. }, Token::Character) => None,

            (Expression::Group { id, inner }, Token::Group { inner: inner_tok, entry_index }) => {
                state.pop_capture(*id);
                match inner.backtrack(state, *inner_tok) {
                    Some(t) => {
                        state.push_capture(*id, entry_index);
                        Some(Token::Group { inner: Box::new(t), entry_index })
                    }
                    None => None,
                }
            }

            (Expression::BalancingGroup { pop, push, inner }, Token::BalancingGroup { inner: inner_tok, popped, pushed }) => {
                if pushed {
                    state.pop_capture(push.expect("pushed implies push group"));
                }
                let entry = state.index;
                match inner.backtrack(state, *inner_tok) {
                    Some(t) => {
                        state.captures[pop.0 as usize].push(popped);
                        let new_popped = state.pop_capture(*pop).expect("just pushed");
                        let new_pushed = if let Some(push_id) = push {
                            let mut bounds = [new_popped.start, new_popped.end, entry, state.index];
                            bounds.sort_unstable();
                            state.captures[push_id.0 as usize].push(Capture::new(bounds[1], bounds[2]));
                            true
                        } else {
                            false
                        };
                        Some(Token::BalancingGroup { inner: Box::new(t), popped: new_popped, pushed: new_pushed })
                    }
                    None => {
                        state.captures[pop.0 as usize].push(popped);
                        None
                    }
                }
            }

            (Expression::Reference { .. }, Token::Reference { .. }) => None,

            (Expression::Anchor(_), Token::Epsilon) => None,

            (Expression::Lookaround { inner, negate, behind }, Token::Lookaround { entry_index, exit_index, inner: inner_tok }) => {
                lookaround_backtrack(inner, *negate, *behind, state, entry_index, exit_index, inner_tok)
            }

            (Expression::Atomic(_), Token::Atomic(_)) => None,

            (Expression::Conditional { cond: _, yes, no }, Token::Conditional { chose_yes, inner }) => {
                if chose_yes {
                    yes.backtrack(state, *inner).map(|t| Token::Conditional { chose_yes: true, inner: Box::new(t) })
                } else {
                    no.as_ref()?.backtrack(state, *inner).map(|t| Token::Conditional { chose_yes: false, inner: Box::new(t) })
                }
            }

            (Expression::Conditional { .. }, Token::Epsilon) => None,

            (Expression::Proxy(cell), Token::Proxy(inner)) => {
                let borrowed = cell.borrow();
                let target = borrowed.as_ref().expect("proxy resolved before matching");
                target.backtrack(state, *inner).map(|t| Token::Proxy(Box::new(t)))
            }

            _ => unreachable!("token/node kind mismatch"),
        }
    }

    pub fn discard(&self, state: &mut State, token: Token) {
        match (self, token) {
            (Expression::Sequence(children), Token::Sequence(tokens)) => seq_discard(children, state, tokens),
            (Expression::NonCapturing(inner), token) => inner.discard(state, token),
            (Expression::Alternation(left, right), Token::Alternation { left: was_left, inner }) => {
                if was_left {
                    left.discard(state, *inner);
                } else {
                    right.discard(state, *inner);
                }
            }
            (Expression::Repetition { inner, .. }, Token::Repetition { iterations }) => {
                for t in iterations.into_iter().rev() {
                    inner.discard(state, t);
                }
            }
            (Expression::Character { .. }, Token::Character) => state.unconsume_one(),
            (Expression::Group { id, inner }, Token::Group { inner: inner_tok, .. }) => {
                state.pop_capture(*id);
                inner.discard(state, *inner_tok);
            }
            (Expression::BalancingGroup { pop, push, inner }, Token::BalancingGroup { inner: inner_tok, popped, pushed }) => {
                if pushed {
                    state.pop_capture(push.expect("pushed implies push group"));
                }
                inner.discard(state, *inner_tok);
                state.captures[pop.0 as usize].push(popped);
            }
            (Expression::Reference { .. }, Token::Reference { len }) => {
                if state.direction >= 0 {
                    state.index -= len;
                } else {
                    state.index += len;
                }
            }
            (Expression::Anchor(_), Token::Epsilon) => {}
            (Expression::Lookaround { inner, behind, .. }, Token::Lookaround { entry_index, exit_index, inner: inner_tok }) => {
                if let Some(t) = inner_tok {
                    state.index = exit_index;
                    inner.discard(state, *t);
                }
                let _ = behind;
                state.index = entry_index;
            }
            (Expression::Atomic(inner), Token::Atomic(t)) => inner.discard(state, *t),
            (Expression::Conditional { yes, no, .. }, Token::Conditional { chose_yes, inner }) => {
                if chose_yes {
                    yes.discard(state, *inner);
                } else if let Some(no) = no {
                    no.discard(state, *inner);
                }
            }
            (Expression::Conditional { .. }, Token::Epsilon) => {}
            (Expression::Proxy(cell), Token::Proxy(inner)) => {
                let borrowed = cell.borrow();
                let target = borrowed.as_ref().expect("proxy resolved before matching");
                target.discard(state, *inner);
            }
            (Expression::Empty, Token::Epsilon) => {}
            _ => unreachable!("token/node kind mismatch in discard"),
        }
    }

    /// Structurally flip the tree for right-to-left evaluation. Applied
    /// once, at engine construction, when `rightToLeft` is requested.
    pub fn invert(&mut self) {
        match self {
            Expression::Sequence(children) => {
                children.reverse();
                for c in children.iter_mut() {
                    c.invert();
                }
            }
            Expression::Alternation(left, right) => {
                left.invert();
                right.invert();
            }
            Expression::Repetition { inner, .. } => inner.invert(),
            Expression::Character { .. } => {}
            Expression::Group { inner, .. } => inner.invert(),
            Expression::NonCapturing(inner) => inner.invert(),
            Expression::BalancingGroup { inner, .. } => inner.invert(),
            Expression::Reference { .. } => {}
            Expression::Anchor(kind) => {
                *kind = match *kind {
                    AnchorKind::StartOfInput => AnchorKind::StartOfInput,
                    AnchorKind::StartOfLine => AnchorKind::StartOfLine,
                    AnchorKind::EndOfInputOrTrailingNewline => AnchorKind::EndOfInputOrTrailingNewline,
                    AnchorKind::EndOfLine => AnchorKind::EndOfLine,
                    AnchorKind::EndOfInputOnly => AnchorKind::EndOfInputOnly,
                    AnchorKind::ContiguousMatch => AnchorKind::ContiguousMatch,
                    AnchorKind::WordBoundary(b) => AnchorKind::WordBoundary(b),
                };
            }
            Expression::Lookaround { inner, behind, .. } => {
                // Lookahead/lookbehind already evaluate with a fixed internal
                // direction independent of the engine's overall direction,
                // so inversion only needs to recurse; `behind` is left alone
                // since a lookbehind already inverted its inner expression
                // at parse time and shouldn't be flipped a second time here.
                let _ = behind;
                inner.invert();
            }
            Expression::Atomic(inner) => inner.invert(),
            Expression::Conditional { cond, yes, no } => {
                if let ConditionalKind::Assertion(a) = cond {
                    a.invert();
                }
                yes.invert();
                if let Some(no) = no {
                    no.invert();
                }
            }
            Expression::Proxy(_) => {}
            Expression::Empty => {}
        }
    }
}

fn char_eq(window: &[char], text: &[char], ignore_case: bool) -> bool {
    if window.len() != text.len() {
        return false;
    }
    if ignore_case {
        window.iter().zip(text).all(|(a, b)| a.to_lowercase().eq(b.to_lowercase()))
    } else {
        window == text
    }
}

fn eval_condition(cond: &ConditionalKind, state: &mut State) -> bool {
    match cond {
        ConditionalKind::Group(id) => state.top_capture(*id).is_some(),
        ConditionalKind::Assertion(expr) => {
            let entry = state.index;
            let saved_dir = state.direction;
            state.direction = 1;
            let result = match expr.match_(state) {
                Some(t) => {
                    expr.discard(state, t);
                    true
                }
                None => false,
            };
            state.index = entry;
            state.direction = saved_dir;
            result
        }
    }
}

/// Boundary-sensitive anchors operate on the match window, not the full
/// subject string (§4.5): a char outside `[left_bound, right_bound)` is
/// treated the same as running off the end of the real input.
fn test_anchor(kind: AnchorKind, state: &State) -> bool {
    let prev = if state.index <= state.left_bound { None } else { state.chars.get(state.index - 1).copied() };
    let next = if state.index >= state.right_bound { None } else { state.chars.get(state.index).copied() };
    match kind {
        AnchorKind::StartOfInput => prev.is_none(),
        AnchorKind::StartOfLine => prev.is_none() || prev == Some('\n'),
        AnchorKind::EndOfInputOnly => next.is_none(),
        AnchorKind::EndOfInputOrTrailingNewline => next.is_none() || (next == Some('\n') && state.index + 1 >= state.right_bound),
        AnchorKind::EndOfLine => next.is_none() || next == Some('\n'),
        AnchorKind::ContiguousMatch => Some(state.index) == state.previous_match_end,
        AnchorKind::WordBoundary(expect_boundary) => {
            let is_word = |c: Option<char>| c.is_some_and(|c| c == '_' || c.is_alphanumeric());
            (is_word(prev) != is_word(next)) == expect_boundary
        }
    }
}

fn lookaround_match(inner: &Expression, negate: bool, behind: bool, state: &mut State) -> Option<Token> {
    let entry_index = state.index;
    let saved_dir = state.direction;
    state.direction = if behind { -1 } else { 1 };

    let result = inner.match_(state);
    match result {
        Some(token) => {
            let exit_index = state.index;
            state.index = entry_index;
            state.direction = saved_dir;
            if negate {
                inner.discard(state, token);
                None
            } else {
                Some(Token::Lookaround { entry_index, exit_index, inner: Some(Box::new(token)) })
            }
        }
        None => {
            state.index = entry_index;
            state.direction = saved_dir;
            if negate {
                Some(Token::Lookaround { entry_index, exit_index: entry_index, inner: None })
            } else {
                None
            }
        }
    }
}

fn lookaround_backtrack(
    inner: &Expression,
    negate: bool,
    behind: bool,
    state: &mut State,
    entry_index: usize,
    exit_index: usize,
    inner_tok: Option<Box<Token>>,
) -> Option<Token> {
    if negate {
        // Negative lookaround never offers an alternative: its truth value
        // was already fully resolved (by exhausting `inner`'s own search)
        // at match time.
        return None;
    }
    let saved_dir = state.direction;
    state.direction = if behind { -1 } else { 1 };
    state.index = exit_index;
    let token = inner_tok.expect("positive lookaround always records its inner token");
    let result = inner.backtrack(state, *token);
    let outcome = match result {
        Some(new_token) => {
            let new_exit = state.index;
            state.index = entry_index;
            Some(Token::Lookaround { entry_index, exit_index: new_exit, inner: Some(Box::new(new_token)) })
        }
        None => {
            state.index = entry_index;
            None
        }
    };
    state.direction = saved_dir;
    outcome
}

fn repetition_match(inner: &Expression, min: u32, max: u32, kind: RepetitionKind, state: &mut State) -> Option<Token> {
    let mut iterations = Vec::new();
    for _ in 0..min {
        match inner.match_(state) {
            Some(t) => iterations.push(t),
            None => {
                for t in iterations.into_iter().rev() {
                    inner.discard(state, t);
                }
                return None;
            }
        }
    }
    match kind {
        RepetitionKind::Greedy | RepetitionKind::Possessive => {
            while (iterations.len() as u32) < max {
                let before = state.index;
                match inner.match_(state) {
                    Some(t) => {
                        let made_progress = state.index != before;
                        iterations.push(t);
                        if !made_progress {
                            break;
                        }
                    }
                    None => break,
                }
            }
        }
        RepetitionKind::Lazy => {}
    }
    Some(Token::Repetition { iterations })
}

fn repetition_backtrack(
    inner: &Expression,
    min: u32,
    max: u32,
    kind: RepetitionKind,
    state: &mut State,
    mut iterations: Vec<Token>,
) -> Option<Token> {
    match kind {
        RepetitionKind::Possessive => None,

        RepetitionKind::Greedy => loop {
            let last = iterations.pop()?;
            match inner.backtrack(state, last) {
                Some(t) => {
                    // This iteration now ends at a different cursor
                    // position; re-extend greedily up to max again before
                    // handing back the new candidate.
                    iterations.push(t);
                    while (iterations.len() as u32) < max {
                        let before = state.index;
                        match inner.match_(state) {
                            Some(nt) => {
                                let progressed = state.index != before;
                                iterations.push(nt);
                                if !progressed {
                                    break;
                                }
                            }
                            None => break,
                        }
                    }
                    return Some(Token::Repetition { iterations });
                }
                None => {
                    // This iteration has no alternative; drop it entirely
                    // ("one less repetition") if that still satisfies min,
                    // otherwise keep unwinding further iterations.
                    if (iterations.len() as u32) >= min {
                        return Some(Token::Repetition { iterations });
                    }
                }
            }
        },

        RepetitionKind::Lazy => {
            // Lazy already matched exactly `iterations.len()` repeats;
            // backtrack means "try one more", unless already at max, in
            // which case fall back to re-trying the last iteration's own
            // alternatives.
            if (iterations.len() as u32) < max {
                let before = state.index;
                if let Some(t) = inner.match_(state) {
                    let progressed = state.index != before;
                    iterations.push(t);
                    if progressed || (iterations.len() as u32) <= min {
                        return Some(Token::Repetition { iterations });
                    }
                    // zero-progress guard: this iteration added nothing,
                    // so don't offer it as grounds to keep growing.
                    let t = iterations.pop().unwrap();
                    inner.discard(state, t);
                }
            }
            let last = iterations.pop()?;
            inner.backtrack(state, last).map(|t| {
                iterations.push(t);
                Token::Repetition { iterations }
            })
        }
    }
}
