// api.rs - Idiomatic Rust API over the NFA machine.
//
// Wraps compile + Machine with caller-facing types: Regex, RegexBuilder,
// Match, Captures, FindIter. A Regex owns its program and a cache of idle
// machines, so it can be shared between threads.

use std::ops::Range;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use memchr::memmem;

use crate::compile::{Compiler, Expr};
use crate::error::RegexError;
use crate::input::{MachineInput, Utf16Input, Utf8Input};
use crate::machine::{Anchor, Machine, MatchKind};
use crate::pool::UNSET;
use crate::prog::Prog;

/// A compiled regular expression.
///
/// # Examples
///
/// ```
/// use linre::api::Regex;
/// use linre::compile::Expr;
///
/// // [0-9]+
/// let re = Regex::new(&Expr::plus(Expr::class(&[('0', '9')]))).unwrap();
/// assert!(re.is_match("hello 42"));
///
/// let m = re.find("hello 42").unwrap();
/// assert_eq!(m.as_str(), "42");
/// assert_eq!(m.start(), 6);
/// assert_eq!(m.end(), 8);
/// ```
pub struct Regex {
    prog: Arc<Prog>,
    kind: MatchKind,
    time_limit: Option<Duration>,
    cache: Mutex<Vec<Machine>>,
}

impl Regex {
    /// Compile an expression with default options (leftmost-first).
    pub fn new(expr: &Expr) -> Result<Regex, RegexError> {
        RegexBuilder::new(expr).build()
    }

    /// Create a [`RegexBuilder`] for fine-grained control over compilation.
    pub fn builder(expr: &Expr) -> RegexBuilder {
        RegexBuilder::new(expr)
    }

    /// Wrap an already frozen program.
    pub fn from_prog(prog: Prog, kind: MatchKind) -> Regex {
        Regex {
            prog: Arc::new(prog),
            kind,
            time_limit: None,
            cache: Mutex::new(Vec::new()),
        }
    }

    /// The compiled program.
    pub fn prog(&self) -> &Prog {
        &self.prog
    }

    pub fn match_kind(&self) -> MatchKind {
        self.kind
    }

    /// Check whether `text` matches anywhere.
    pub fn is_match(&self, text: &str) -> bool {
        self.try_is_match(text).unwrap_or(false)
    }

    /// Like [`is_match`](Self::is_match), reporting a time limit overrun.
    pub fn try_is_match(&self, text: &str) -> Result<bool, RegexError> {
        if let Some(found) = self.literal_search(text.as_bytes(), 0) {
            return Ok(found.is_some());
        }
        self.run(&Utf8Input::from(text), 0, 0).map(|caps| caps.is_some())
    }

    /// Return the first match in `text`, or `None` if no match.
    pub fn find<'t>(&self, text: &'t str) -> Option<Match<'t>> {
        self.find_at(text, 0)
    }

    /// Return the first match starting at or after byte offset `start`.
    /// Zero-width assertions still see the text before `start`. Returns
    /// `None` when `start` is past the end or inside a character.
    pub fn find_at<'t>(&self, text: &'t str, start: usize) -> Option<Match<'t>> {
        let (start, end) = self.span_at(text, start)?;
        Some(Match { text, start, end })
    }

    /// Return the first match with all capture groups, or `None`.
    pub fn captures<'t>(&self, text: &'t str) -> Option<Captures<'t>> {
        let slots = self
            .run(&Utf8Input::from(text), 0, self.prog.num_cap())
            .ok()??;
        Some(Captures { text, slots })
    }

    /// Iterate over all non-overlapping matches in `text`.
    pub fn find_iter<'r, 't>(&'r self, text: &'t str) -> FindIter<'r, 't> {
        FindIter {
            regex: self,
            text,
            pos: 0,
            prev_end: None,
        }
    }

    /// Check whether UTF-16 `text` matches anywhere.
    pub fn is_match_utf16(&self, text: &[u16]) -> bool {
        matches!(self.run(&Utf16Input::new(text), 0, 0), Ok(Some(_)))
    }

    /// First match in UTF-16 `text`, as a range of code units.
    pub fn find_utf16(&self, text: &[u16]) -> Option<Range<usize>> {
        let slots = self.run(&Utf16Input::new(text), 0, 2).ok()??;
        Some(slots[0]..slots[1])
    }

    /// Return the number of capture groups in the pattern (excluding group 0).
    pub fn captures_len(&self) -> usize {
        self.prog.num_cap() / 2 - 1
    }

    fn span_at(&self, text: &str, start: usize) -> Option<(usize, usize)> {
        if !text.is_char_boundary(start) {
            return None;
        }
        if let Some(found) = self.literal_search(text.as_bytes(), start) {
            return found;
        }
        let slots = self.run(&Utf8Input::from(text), start, 2).ok()??;
        Some((slots[0], slots[1]))
    }

    // When the whole pattern is one literal, a substring search answers
    // for group 0 without running the machine.
    fn literal_search(&self, text: &[u8], start: usize) -> Option<Option<(usize, usize)>> {
        let (prefix, complete) = self.prog.prefix();
        if !complete || self.prog.start_cond().is_none() {
            return None;
        }
        let hay = text.get(start..)?;
        Some(memmem::find(hay, prefix.as_bytes()).map(|i| (start + i, start + i + prefix.len())))
    }

    // Runs a cached machine tracking `ncap` slots. Ok(None) is no match.
    fn run<I: MachineInput + ?Sized>(
        &self,
        input: &I,
        pos: usize,
        ncap: usize,
    ) -> Result<Option<Vec<usize>>, RegexError> {
        let mut m = self.checkout();
        m.init(ncap);
        let result = m.try_match(input, pos, Anchor::Unanchored);
        let slots = m.submatches();
        self.checkin(m);
        Ok(if result? { Some(slots) } else { None })
    }

    fn checkout(&self) -> Machine {
        let cached = match self.cache.lock() {
            Ok(mut cache) => cache.pop(),
            Err(_) => None,
        };
        cached.unwrap_or_else(|| {
            let mut m = Machine::new(Arc::clone(&self.prog), self.kind);
            m.set_time_limit(self.time_limit);
            m
        })
    }

    fn checkin(&self, m: Machine) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.push(m);
        }
    }
}

impl std::fmt::Debug for Regex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Regex")
            .field("kind", &self.kind)
            .field("num_inst", &self.prog.num_inst())
            .finish_non_exhaustive()
    }
}

// === RegexBuilder ===

/// Builder for compiling a [`Regex`] with custom options.
///
/// # Examples
///
/// ```
/// use linre::api::Regex;
/// use linre::compile::Expr;
///
/// // a|ab
/// let expr = Expr::alt(vec![Expr::lit('a'), Expr::str("ab")]);
/// let re = Regex::builder(&expr).longest(true).build().unwrap();
/// assert_eq!(re.find("ab").unwrap().as_str(), "ab");
/// ```
pub struct RegexBuilder {
    expr: Expr,
    kind: MatchKind,
    time_limit: Option<Duration>,
    size_limit: Option<usize>,
}

impl RegexBuilder {
    /// Create a new builder for the given expression.
    pub fn new(expr: &Expr) -> Self {
        RegexBuilder {
            expr: expr.clone(),
            kind: MatchKind::LeftmostFirst,
            time_limit: None,
            size_limit: None,
        }
    }

    /// Prefer the longest of the leftmost matches instead of the first in
    /// priority order.
    pub fn longest(mut self, yes: bool) -> Self {
        self.kind = if yes {
            MatchKind::LeftmostLongest
        } else {
            MatchKind::LeftmostFirst
        };
        self
    }

    /// Give up on a search after `limit`; the search then reports no match.
    /// Without this the process-wide limit from
    /// [`crate::machine::set_time_limit`] applies.
    pub fn time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    /// Cap the compiled program at `limit` instructions. Without this the
    /// process-wide limit from [`crate::compile::set_program_size_limit`]
    /// applies.
    pub fn size_limit(mut self, limit: usize) -> Self {
        self.size_limit = Some(limit);
        self
    }

    /// Compile the expression into a [`Regex`].
    pub fn build(self) -> Result<Regex, RegexError> {
        let mut compiler = Compiler::new();
        if let Some(limit) = self.size_limit {
            compiler = compiler.size_limit(limit);
        }
        let prog = compiler.compile(&self.expr)?.freeze()?;
        let mut re = Regex::from_prog(prog, self.kind);
        re.time_limit = self.time_limit;
        Ok(re)
    }
}

// === Match ===

/// A single match result referencing the original text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match<'t> {
    text: &'t str,
    start: usize,
    end: usize,
}

impl<'t> Match<'t> {
    /// Byte offset of the start of the match.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Byte offset of the end of the match (exclusive).
    pub fn end(&self) -> usize {
        self.end
    }

    /// Byte range of the match.
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// The matched text.
    pub fn as_str(&self) -> &'t str {
        &self.text[self.start..self.end]
    }

    /// Returns the length of the match in bytes.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Returns `true` if the match is empty (zero-length).
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

// === Captures ===

/// All capture groups from a single match.
///
/// Group 0 is the entire match. Group `i` is `Expr::Capture { index: i, .. }`.
pub struct Captures<'t> {
    text: &'t str,
    slots: Vec<usize>,
}

impl<'t> Captures<'t> {
    /// Get capture group `i`, or `None` if the group did not participate.
    pub fn get(&self, i: usize) -> Option<Match<'t>> {
        let start = *self.slots.get(2 * i)?;
        let end = *self.slots.get(2 * i + 1)?;
        if start == UNSET || end == UNSET {
            return None;
        }
        Some(Match {
            text: self.text,
            start,
            end,
        })
    }

    /// Number of capture groups (including group 0).
    pub fn len(&self) -> usize {
        self.slots.len() / 2
    }

    /// Returns `true` if there are no capture groups (should never happen for a valid match).
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Raw slot offsets; unset slots hold [`UNSET`].
    pub fn slots(&self) -> &[usize] {
        &self.slots
    }

    /// Iterate over all capture groups.
    pub fn iter(&self) -> CapturesIter<'_, 't> {
        CapturesIter {
            captures: self,
            index: 0,
        }
    }
}

impl std::fmt::Debug for Captures<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut list = f.debug_list();
        for i in 0..self.len() {
            list.entry(&self.get(i).map(|m| m.as_str()));
        }
        list.finish()
    }
}

// === CapturesIter ===

/// Iterator over capture groups in a [`Captures`].
pub struct CapturesIter<'c, 't> {
    captures: &'c Captures<'t>,
    index: usize,
}

impl<'c, 't> Iterator for CapturesIter<'c, 't> {
    type Item = Option<Match<'t>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.captures.len() {
            return None;
        }
        let m = self.captures.get(self.index);
        self.index += 1;
        Some(m)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.captures.len() - self.index;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for CapturesIter<'_, '_> {}

// === FindIter ===

/// Iterator over all non-overlapping matches in a text.
///
/// An empty match that ends where the previous match ended is skipped.
pub struct FindIter<'r, 't> {
    regex: &'r Regex,
    text: &'t str,
    pos: usize,
    prev_end: Option<usize>,
}

impl<'t> FindIter<'_, 't> {
    // Offset just past the character at `at`, or past the end.
    fn skip_char(&self, at: usize) -> usize {
        at + self.text[at..].chars().next().map_or(1, char::len_utf8)
    }
}

impl<'r, 't> Iterator for FindIter<'r, 't> {
    type Item = Match<'t>;

    fn next(&mut self) -> Option<Match<'t>> {
        loop {
            if self.pos > self.text.len() {
                return None;
            }
            let (start, end) = self.regex.span_at(self.text, self.pos)?;
            if start == end && self.prev_end == Some(end) {
                self.pos = self.skip_char(end);
                continue;
            }
            self.prev_end = Some(end);
            self.pos = if start == end { self.skip_char(end) } else { end };
            return Some(Match {
                text: self.text,
                start,
                end,
            });
        }
    }
}
