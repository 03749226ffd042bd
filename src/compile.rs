// compile.rs - Thompson construction from an expression tree to a Prog.
//
// Every subexpression compiles to a fragment: an entry pc plus the list of
// holes still waiting for a successor. Fragments are glued together by
// patching holes; pc 0 is always Fail and a fragment whose entry is 0 never
// matches.

use std::sync::atomic::{AtomicUsize, Ordering};

use smallvec::SmallVec;

use crate::empty::{CodePoint, EmptyFlags};
use crate::error::RegexError;
use crate::inst::{Inst, RuneClass, PENDING};
use crate::prog::{PatchList, Prog, ProgBuilder};

// Flip to true for debugging
const TRACE: bool = false;
macro_rules! trace {
    ($($tts:tt)*) => {
        if TRACE {
            println!($($tts)*);
        }
    }
}

/// Largest repetition count accepted in `Repeat`.
pub const MAX_REPEAT: u32 = 1000;

const DEFAULT_PROGRAM_SIZE_LIMIT: usize = 1_000_000;
const MAX_CODE_POINT: CodePoint = 0x10FFFF;

static PROGRAM_SIZE_LIMIT: AtomicUsize = AtomicUsize::new(DEFAULT_PROGRAM_SIZE_LIMIT);

/// Sets the process-wide limit on instructions per compiled program.
pub fn set_program_size_limit(n: usize) {
    PROGRAM_SIZE_LIMIT.store(n, Ordering::Relaxed);
}

pub fn program_size_limit() -> usize {
    PROGRAM_SIZE_LIMIT.load(Ordering::Relaxed)
}

/// A regular expression as a tree. There is no syntax; trees are built in
/// code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Expr {
    /// Matches the empty string.
    Empty,
    /// Matches nothing.
    NoMatch,
    Literal { c: char, fold: bool },
    Str(String),
    /// Inclusive `[lo, hi]` ranges, in any order.
    Class(Vec<(CodePoint, CodePoint)>),
    NotClass(Vec<(CodePoint, CodePoint)>),
    AnyChar,
    AnyCharNotNl,
    Assert(EmptyFlags),
    Concat(Vec<Expr>),
    Alternate(Vec<Expr>),
    Star { expr: Box<Expr>, greedy: bool },
    Plus { expr: Box<Expr>, greedy: bool },
    Quest { expr: Box<Expr>, greedy: bool },
    /// `expr{min,max}`; `max: None` is unbounded.
    Repeat { expr: Box<Expr>, min: u32, max: Option<u32>, greedy: bool },
    /// Group `index` (1-based) recording into slots `2*index` and
    /// `2*index+1`.
    Capture { index: u32, expr: Box<Expr> },
}

impl Expr {
    pub fn lit(c: char) -> Expr {
        Expr::Literal { c, fold: false }
    }

    pub fn lit_fold(c: char) -> Expr {
        Expr::Literal { c, fold: true }
    }

    pub fn str(s: &str) -> Expr {
        Expr::Str(s.to_string())
    }

    pub fn class(ranges: &[(char, char)]) -> Expr {
        Expr::Class(
            ranges
                .iter()
                .map(|&(lo, hi)| (lo as CodePoint, hi as CodePoint))
                .collect(),
        )
    }

    pub fn not_class(ranges: &[(char, char)]) -> Expr {
        Expr::NotClass(
            ranges
                .iter()
                .map(|&(lo, hi)| (lo as CodePoint, hi as CodePoint))
                .collect(),
        )
    }

    pub fn cat(exprs: Vec<Expr>) -> Expr {
        Expr::Concat(exprs)
    }

    pub fn alt(exprs: Vec<Expr>) -> Expr {
        Expr::Alternate(exprs)
    }

    pub fn star(e: Expr) -> Expr {
        Expr::Star { expr: Box::new(e), greedy: true }
    }

    pub fn plus(e: Expr) -> Expr {
        Expr::Plus { expr: Box::new(e), greedy: true }
    }

    pub fn quest(e: Expr) -> Expr {
        Expr::Quest { expr: Box::new(e), greedy: true }
    }

    pub fn repeat(e: Expr, min: u32, max: Option<u32>) -> Expr {
        Expr::Repeat { expr: Box::new(e), min, max, greedy: true }
    }

    /// Makes a repetition operator non-greedy. Other nodes are returned
    /// unchanged.
    pub fn lazy(self) -> Expr {
        match self {
            Expr::Star { expr, .. } => Expr::Star { expr, greedy: false },
            Expr::Plus { expr, .. } => Expr::Plus { expr, greedy: false },
            Expr::Quest { expr, .. } => Expr::Quest { expr, greedy: false },
            Expr::Repeat { expr, min, max, .. } => Expr::Repeat { expr, min, max, greedy: false },
            other => other,
        }
    }

    pub fn group(index: u32, e: Expr) -> Expr {
        Expr::Capture { index, expr: Box::new(e) }
    }

    pub fn line_start() -> Expr {
        Expr::Assert(EmptyFlags::BEGIN_LINE)
    }

    pub fn line_end() -> Expr {
        Expr::Assert(EmptyFlags::END_LINE)
    }

    pub fn text_start() -> Expr {
        Expr::Assert(EmptyFlags::BEGIN_TEXT)
    }

    pub fn text_end() -> Expr {
        Expr::Assert(EmptyFlags::END_TEXT)
    }

    pub fn word_boundary() -> Expr {
        Expr::Assert(EmptyFlags::WORD_BOUNDARY)
    }

    pub fn not_word_boundary() -> Expr {
        Expr::Assert(EmptyFlags::NO_WORD_BOUNDARY)
    }
}

/// Compiles `expr` into a linked, flattened program.
pub fn compile(expr: &Expr) -> Result<Prog, RegexError> {
    Compiler::new().compile(expr)?.freeze()
}

/// Compiles `expr` keeping every alternation binary.
pub fn compile_unflattened(expr: &Expr) -> Result<Prog, RegexError> {
    Compiler::new().compile(expr)?.freeze_unflattened()
}

// A compiled subexpression: entry pc and dangling exits.
#[derive(Debug, Default)]
struct Frag {
    i: usize,
    out: PatchList,
}

/// Builds a program from an [`Expr`] by Thompson construction.
#[derive(Debug)]
pub struct Compiler {
    b: ProgBuilder,
    size_limit: usize,
}

impl Default for Compiler {
    fn default() -> Self {
        Compiler::new()
    }
}

impl Compiler {
    pub fn new() -> Self {
        let mut b = ProgBuilder::new();
        b.add_inst(Inst::Fail);
        Compiler {
            b,
            size_limit: program_size_limit(),
        }
    }

    /// Caps the instruction count for this compiler, overriding the
    /// process-wide [`program_size_limit`].
    pub fn size_limit(mut self, size_limit: usize) -> Self {
        self.size_limit = size_limit;
        self
    }

    /// Compiles `expr` followed by a final `Match` and returns the builder,
    /// ready to freeze.
    pub fn compile(mut self, expr: &Expr) -> Result<ProgBuilder, RegexError> {
        let f = self.c(expr)?;
        let m = self.inst(Inst::Match)?;
        self.b.patch(f.out, m);
        self.b.set_start(f.i);
        trace!("compiled {} instructions, start {}", self.b.num_inst(), f.i);
        Ok(self.b)
    }

    fn inst(&mut self, inst: Inst) -> Result<usize, RegexError> {
        let size = self.b.num_inst() + 1;
        if size > self.size_limit {
            return Err(RegexError::ProgramTooLarge {
                size,
                limit: self.size_limit,
            });
        }
        Ok(self.b.add_inst(inst))
    }

    fn c(&mut self, expr: &Expr) -> Result<Frag, RegexError> {
        match expr {
            Expr::Empty => self.nop(),
            Expr::NoMatch => Ok(fail()),
            Expr::Literal { c, fold } => self.literal(*c, *fold),
            Expr::Str(s) => {
                let mut chars = s.chars();
                let mut f = match chars.next() {
                    Some(c) => self.literal(c, false)?,
                    None => return self.nop(),
                };
                for c in chars {
                    let r = self.literal(c, false)?;
                    f = self.cat(f, r);
                }
                Ok(f)
            }
            Expr::Class(ranges) => self.class(normalize(ranges)),
            Expr::NotClass(ranges) => self.class(negate(&normalize(ranges))),
            Expr::AnyChar => self.rune(RuneClass::Any),
            Expr::AnyCharNotNl => self.rune(RuneClass::AnyNotNl),
            Expr::Assert(cond) => self.empty_width(*cond),
            Expr::Concat(exprs) => {
                let mut f = match exprs.first() {
                    Some(e) => self.c(e)?,
                    None => return self.nop(),
                };
                for e in &exprs[1..] {
                    let next = self.c(e)?;
                    f = self.cat(f, next);
                }
                Ok(f)
            }
            Expr::Alternate(exprs) => {
                let mut f = match exprs.first() {
                    Some(e) => self.c(e)?,
                    None => return Ok(fail()),
                };
                for e in &exprs[1..] {
                    let next = self.c(e)?;
                    f = self.alt(f, next)?;
                }
                Ok(f)
            }
            Expr::Star { expr, greedy } => {
                let f = self.c(expr)?;
                self.star(f, *greedy)
            }
            Expr::Plus { expr, greedy } => {
                let f = self.c(expr)?;
                self.plus(f, *greedy)
            }
            Expr::Quest { expr, greedy } => {
                let f = self.c(expr)?;
                self.quest(f, *greedy)
            }
            Expr::Repeat { expr, min, max, greedy } => self.repeat(expr, *min, *max, *greedy),
            Expr::Capture { index, expr } => {
                if *index == 0 {
                    // Slots 0 and 1 belong to the whole match.
                    return Err(RegexError::InvalidArgument);
                }
                let slot = 2 * *index as usize;
                let open = self.cap(slot)?;
                let body = self.c(expr)?;
                let close = self.cap(slot + 1)?;
                let f = self.cat(open, body);
                Ok(self.cat(f, close))
            }
        }
    }

    fn nop(&mut self) -> Result<Frag, RegexError> {
        let i = self.inst(Inst::Nop { out: PENDING })?;
        Ok(Frag { i, out: PatchList::hole(i, 0) })
    }

    fn cap(&mut self, slot: usize) -> Result<Frag, RegexError> {
        let i = self.inst(Inst::Capture { slot, out: PENDING })?;
        Ok(Frag { i, out: PatchList::hole(i, 0) })
    }

    fn empty_width(&mut self, cond: EmptyFlags) -> Result<Frag, RegexError> {
        let i = self.inst(Inst::EmptyWidth { cond, out: PENDING })?;
        Ok(Frag { i, out: PatchList::hole(i, 0) })
    }

    fn rune(&mut self, class: RuneClass) -> Result<Frag, RegexError> {
        let i = self.inst(Inst::rune(class))?;
        Ok(Frag { i, out: PatchList::hole(i, 0) })
    }

    fn literal(&mut self, c: char, fold: bool) -> Result<Frag, RegexError> {
        let orbit = if fold { fold_orbit(c) } else { SmallVec::new() };
        if orbit.len() > 1 {
            self.rune(RuneClass::Fold(orbit))
        } else {
            self.rune(RuneClass::Single(c as CodePoint))
        }
    }

    fn class(&mut self, ranges: Vec<(CodePoint, CodePoint)>) -> Result<Frag, RegexError> {
        if ranges.is_empty() {
            return Ok(fail());
        }
        if let [(lo, hi)] = ranges[..] {
            if lo == hi {
                return self.rune(RuneClass::Single(lo));
            }
            if lo == 0 && hi == MAX_CODE_POINT {
                return self.rune(RuneClass::Any);
            }
        }
        self.rune(RuneClass::Ranges(ranges.into_boxed_slice()))
    }

    fn cat(&mut self, f1: Frag, f2: Frag) -> Frag {
        if f1.i == 0 || f2.i == 0 {
            // Exits of the surviving half lead nowhere.
            self.b.patch(f1.out, 0);
            self.b.patch(f2.out, 0);
            return fail();
        }
        self.b.patch(f1.out, f2.i);
        Frag { i: f1.i, out: f2.out }
    }

    fn alt(&mut self, f1: Frag, f2: Frag) -> Result<Frag, RegexError> {
        if f1.i == 0 {
            return Ok(f2);
        }
        if f2.i == 0 {
            return Ok(f1);
        }
        let i = self.inst(Inst::alt(f1.i, f2.i))?;
        Ok(Frag { i, out: f1.out.append(f2.out) })
    }

    // Alternation with f1 on one arm and a hole on the other.
    fn split(&mut self, f1: &Frag, greedy: bool) -> Result<(usize, PatchList), RegexError> {
        if greedy {
            let i = self.inst(Inst::alt(f1.i, PENDING))?;
            Ok((i, PatchList::hole(i, 1)))
        } else {
            let i = self.inst(Inst::alt(PENDING, f1.i))?;
            Ok((i, PatchList::hole(i, 0)))
        }
    }

    fn quest(&mut self, f1: Frag, greedy: bool) -> Result<Frag, RegexError> {
        let (i, skip) = self.split(&f1, greedy)?;
        Ok(Frag { i, out: skip.append(f1.out) })
    }

    fn star(&mut self, f1: Frag, greedy: bool) -> Result<Frag, RegexError> {
        let (i, exit) = self.split(&f1, greedy)?;
        self.b.patch(f1.out, i);
        Ok(Frag { i, out: exit })
    }

    fn plus(&mut self, f1: Frag, greedy: bool) -> Result<Frag, RegexError> {
        if f1.i == 0 {
            return Ok(fail());
        }
        let entry = f1.i;
        let loop_ = self.star(f1, greedy)?;
        Ok(Frag { i: entry, out: loop_.out })
    }

    // x{n} is n copies, x{n,} is n-1 copies then x+, x{n,m} is n copies
    // then m-n nested optional copies: (x(x)?)?.
    fn repeat(
        &mut self,
        expr: &Expr,
        min: u32,
        max: Option<u32>,
        greedy: bool,
    ) -> Result<Frag, RegexError> {
        if let Some(max) = max {
            if min > max {
                return Err(RegexError::InvalidRepeat { min, max });
            }
            if max > MAX_REPEAT {
                return Err(RegexError::RepeatTooLarge(max));
            }
        }
        if min > MAX_REPEAT {
            return Err(RegexError::RepeatTooLarge(min));
        }

        let max = match max {
            Some(max) => max,
            None => {
                if min == 0 {
                    let f = self.c(expr)?;
                    return self.star(f, greedy);
                }
                let mut f = self.nop()?;
                for _ in 1..min {
                    let x = self.c(expr)?;
                    f = self.cat(f, x);
                }
                let x = self.c(expr)?;
                let last = self.plus(x, greedy)?;
                return Ok(self.cat(f, last));
            }
        };

        let mut f = self.nop()?;
        for _ in 0..min {
            let x = self.c(expr)?;
            f = self.cat(f, x);
        }
        let mut suffix: Option<Frag> = None;
        for _ in min..max {
            let x = self.c(expr)?;
            let body = match suffix.take() {
                Some(s) => self.cat(x, s),
                None => x,
            };
            suffix = Some(self.quest(body, greedy)?);
        }
        Ok(match suffix {
            Some(s) => self.cat(f, s),
            None => f,
        })
    }
}

fn fail() -> Frag {
    Frag::default()
}

fn single_mapping(mut it: impl Iterator<Item = char>) -> Option<CodePoint> {
    let first = it.next()?;
    match it.next() {
        Some(_) => None,
        None => Some(first as CodePoint),
    }
}

// `c` plus its simple upper/lower case mappings, closed under those
// mappings, capped at 4 symbols.
fn fold_orbit(c: char) -> SmallVec<[CodePoint; 4]> {
    let mut orbit: SmallVec<[CodePoint; 4]> = SmallVec::new();
    orbit.push(c as CodePoint);
    let mut i = 0;
    while i < orbit.len() {
        if let Some(ch) = char::from_u32(orbit[i]) {
            let lower = single_mapping(ch.to_lowercase());
            let upper = single_mapping(ch.to_uppercase());
            for m in [lower, upper].into_iter().flatten() {
                if orbit.len() < 4 && !orbit.contains(&m) {
                    orbit.push(m);
                }
            }
        }
        i += 1;
    }
    orbit
}

// Sorts and merges overlapping or adjacent ranges. Inverted pairs are
// dropped.
fn normalize(ranges: &[(CodePoint, CodePoint)]) -> Vec<(CodePoint, CodePoint)> {
    let mut sorted: Vec<(CodePoint, CodePoint)> = ranges
        .iter()
        .copied()
        .filter(|&(lo, hi)| lo <= hi)
        .map(|(lo, hi)| (lo, hi.min(MAX_CODE_POINT)))
        .filter(|&(lo, hi)| lo <= hi)
        .collect();
    sorted.sort_unstable();
    let mut out: Vec<(CodePoint, CodePoint)> = Vec::with_capacity(sorted.len());
    for (lo, hi) in sorted {
        match out.last_mut() {
            Some(last) if lo <= last.1.saturating_add(1) => last.1 = last.1.max(hi),
            _ => out.push((lo, hi)),
        }
    }
    out
}

// Complement of normalized ranges over 0..=0x10FFFF.
fn negate(ranges: &[(CodePoint, CodePoint)]) -> Vec<(CodePoint, CodePoint)> {
    let mut out = Vec::with_capacity(ranges.len() + 1);
    let mut next = 0;
    for &(lo, hi) in ranges {
        if lo > next {
            out.push((next, lo - 1));
        }
        next = hi + 1;
    }
    if next <= MAX_CODE_POINT {
        out.push((next, MAX_CODE_POINT));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dump(e: &Expr) -> Vec<String> {
        compile(e).unwrap().to_string().lines().map(str::to_string).collect()
    }

    #[test]
    fn literal_program() {
        let prog = compile(&Expr::str("ab")).unwrap();
        assert_eq!(prog.inst(0), &Inst::Fail);
        assert_eq!(prog.prefix(), ("ab", true));
        assert_eq!(prog.num_cap(), 2);
    }

    #[test]
    fn star_program_dump() {
        let lines = dump(&Expr::star(Expr::lit('a')));
        assert_eq!(
            lines,
            vec![
                "0       fail",
                "1       rune1 \"a\" -> 2",
                "2*      alt -> 1, 3",
                "3       match",
            ]
        );
    }

    #[test]
    fn lazy_star_prefers_exit() {
        let prog = compile(&Expr::star(Expr::lit('a')).lazy()).unwrap();
        assert_eq!(prog.inst(prog.start()).successors(), &[3, 1]);
    }

    #[test]
    fn capture_slots() {
        let prog = compile(&Expr::group(2, Expr::lit('x'))).unwrap();
        assert_eq!(prog.num_cap(), 6);
        assert_eq!(prog.inst(prog.start()), &Inst::Capture { slot: 4, out: 2 });
    }

    #[test]
    fn alternation_is_flattened() {
        let e = Expr::alt(vec![Expr::lit('a'), Expr::lit('b'), Expr::lit('c'), Expr::lit('d')]);
        let prog = compile(&e).unwrap();
        assert_eq!(prog.inst(prog.start()).successors().len(), 4);
        let plain = compile_unflattened(&e).unwrap();
        assert_eq!(plain.inst(plain.start()).successors().len(), 2);
    }

    #[test]
    fn no_match_compiles_to_fail() {
        let prog = compile(&Expr::NoMatch).unwrap();
        assert_eq!(prog.start(), 0);
        assert_eq!(prog.start_cond(), None);
        // An empty class and an alternation of nothing never match either.
        assert_eq!(compile(&Expr::Class(vec![])).unwrap().start_cond(), None);
        assert_eq!(compile(&Expr::alt(vec![])).unwrap().start_cond(), None);
        // Failing arms drop out of an alternation.
        let prog = compile(&Expr::alt(vec![Expr::NoMatch, Expr::lit('a')])).unwrap();
        assert_eq!(prog.prefix(), ("a", true));
    }

    #[test]
    fn classes_normalize() {
        assert_eq!(normalize(&[(5, 9), (0, 3), (4, 4), (20, 10)]), vec![(0, 9)]);
        assert_eq!(normalize(&[(10, 20), (0, 3)]), vec![(0, 3), (10, 20)]);
        assert_eq!(negate(&[(0, 9), (20, MAX_CODE_POINT)]), vec![(10, 19)]);
        assert_eq!(negate(&[]), vec![(0, MAX_CODE_POINT)]);

        let prog = compile(&Expr::class(&[('x', 'x')])).unwrap();
        assert_eq!(prog.prefix(), ("x", true));
        let prog = compile(&Expr::not_class(&[])).unwrap();
        assert_eq!(prog.inst(prog.start()).to_string(), "any -> 2");
    }

    #[test]
    fn fold_orbits() {
        assert_eq!(fold_orbit('a').as_slice(), &['a' as u32, 'A' as u32]);
        assert_eq!(fold_orbit('1').as_slice(), &['1' as u32]);
        let prog = compile(&Expr::lit_fold('A')).unwrap();
        assert_eq!(prog.inst(prog.start()).to_string(), "rune \"Aa\"/i -> 2");
        // A folded literal is not a literal prefix.
        assert_eq!(prog.prefix(), ("", false));
    }

    #[test]
    fn repeat_errors() {
        assert_eq!(
            compile(&Expr::repeat(Expr::lit('a'), 3, Some(2))).unwrap_err(),
            RegexError::InvalidRepeat { min: 3, max: 2 }
        );
        assert_eq!(
            compile(&Expr::repeat(Expr::lit('a'), 0, Some(1001))).unwrap_err(),
            RegexError::RepeatTooLarge(1001)
        );
        assert_eq!(
            compile(&Expr::repeat(Expr::lit('a'), 2000, None)).unwrap_err(),
            RegexError::RepeatTooLarge(2000)
        );
    }

    #[test]
    fn failing_concat_still_freezes() {
        // a[]b and (a?[])|c: exits of the live half are patched to fail.
        let e = Expr::cat(vec![Expr::lit('a'), Expr::Class(vec![]), Expr::lit('b')]);
        assert_eq!(compile(&e).unwrap().start_cond(), None);
        let e = Expr::alt(vec![
            Expr::cat(vec![Expr::quest(Expr::lit('a')), Expr::NoMatch]),
            Expr::lit('c'),
        ]);
        assert_eq!(compile(&e).unwrap().prefix(), ("c", true));
        assert!(compile(&Expr::plus(Expr::NoMatch)).is_ok());
    }

    #[test]
    fn group_zero_is_rejected() {
        assert_eq!(
            compile(&Expr::group(0, Expr::lit('a'))).unwrap_err(),
            RegexError::InvalidArgument
        );
    }

    #[test]
    fn repeat_exact_is_literal() {
        let prog = compile(&Expr::repeat(Expr::lit('a'), 3, Some(3))).unwrap();
        assert_eq!(prog.prefix(), ("aaa", true));
        let prog = compile(&Expr::repeat(Expr::lit('a'), 0, Some(0))).unwrap();
        assert_eq!(prog.prefix(), ("", true));
    }

    #[test]
    fn program_size_limit_is_enforced() {
        let e = Expr::repeat(Expr::lit('a'), 20, Some(20));
        assert_eq!(
            Compiler::new().size_limit(10).compile(&e).unwrap_err(),
            RegexError::ProgramTooLarge { size: 11, limit: 10 }
        );
    }
}
