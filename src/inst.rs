// inst.rs - Instructions of the NFA program.
//
// One tagged variant per opcode. Successor fields are program counters
// (indices into the program's instruction array); while a program is still
// being built they may hold PENDING.

use std::fmt;

use smallvec::SmallVec;

use crate::empty::{CodePoint, EmptyFlags};

/// Successor placeholder for an edge that has not been patched yet.
pub const PENDING: usize = usize::MAX;

const NEWLINE: CodePoint = '\n' as CodePoint;

/// The set of symbols a `Rune` instruction consumes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RuneClass {
    /// Exactly one symbol, from a literal.
    Single(CodePoint),
    /// A literal with case folding: up to 4 equivalent symbols.
    Fold(SmallVec<[CodePoint; 4]>),
    /// Sorted, non-overlapping `[lo, hi]` ranges. `hi` is inclusive.
    Ranges(Box<[(CodePoint, CodePoint)]>),
    /// Any symbol.
    Any,
    /// Any symbol except `\n`.
    AnyNotNl,
}

impl RuneClass {
    /// Reports whether `r` is in this class.
    pub fn matches(&self, r: CodePoint) -> bool {
        match self {
            RuneClass::Single(c) => *c == r,
            RuneClass::Fold(set) => set.contains(&r),
            RuneClass::Any => true,
            RuneClass::AnyNotNl => r != NEWLINE,
            RuneClass::Ranges(ranges) => ranges_contain(ranges, r),
        }
    }
}

fn ranges_contain(ranges: &[(CodePoint, CodePoint)], r: CodePoint) -> bool {
    // Peek at the first few pairs; handles ASCII classes well.
    for &(lo, hi) in ranges.iter().take(5) {
        if r < lo {
            return false;
        }
        if r <= hi {
            return true;
        }
    }
    if ranges.len() <= 5 {
        return false;
    }
    let (mut lo, mut hi) = (0, ranges.len());
    while lo < hi {
        let m = lo + (hi - lo) / 2;
        let (c_lo, c_hi) = ranges[m];
        if c_lo <= r {
            if r <= c_hi {
                return true;
            }
            lo = m + 1;
        } else {
            hi = m;
        }
    }
    false
}

/// A single instruction of the NFA program.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Inst {
    /// Explore every arm in order; the first arm has the highest priority.
    Alt { outs: SmallVec<[usize; 2]> },
    /// Record the current offset into capture slot `slot`.
    Capture { slot: usize, out: usize },
    /// Zero-width assertion; passable when `cond` holds at the position.
    EmptyWidth { cond: EmptyFlags, out: usize },
    Nop { out: usize },
    Fail,
    Match,
    /// Consume one symbol in `class`.
    Rune { class: RuneClass, out: usize },
}

impl Inst {
    /// A binary alternation, `out` preferred over `arg`.
    pub fn alt(out: usize, arg: usize) -> Inst {
        let mut outs = SmallVec::new();
        outs.push(out);
        outs.push(arg);
        Inst::Alt { outs }
    }

    pub fn rune(class: RuneClass) -> Inst {
        Inst::Rune {
            class,
            out: PENDING,
        }
    }

    /// The outgoing edges of this instruction, in priority order.
    pub fn successors(&self) -> &[usize] {
        match self {
            Inst::Alt { outs } => outs.as_slice(),
            Inst::Capture { out, .. }
            | Inst::EmptyWidth { out, .. }
            | Inst::Nop { out }
            | Inst::Rune { out, .. } => std::slice::from_ref(out),
            Inst::Fail | Inst::Match => &[],
        }
    }

    pub fn successors_mut(&mut self) -> &mut [usize] {
        match self {
            Inst::Alt { outs } => outs.as_mut_slice(),
            Inst::Capture { out, .. }
            | Inst::EmptyWidth { out, .. }
            | Inst::Nop { out }
            | Inst::Rune { out, .. } => std::slice::from_mut(out),
            Inst::Fail | Inst::Match => &mut [],
        }
    }

    /// The single successor, if this instruction has exactly one.
    pub fn out(&self) -> Option<usize> {
        match self {
            Inst::Alt { .. } | Inst::Fail | Inst::Match => None,
            _ => self.successors().first().copied(),
        }
    }
}

fn escape_rune(out: &mut String, r: CodePoint) {
    match char::from_u32(r) {
        Some('"') => out.push_str("\\\""),
        Some('\\') => out.push_str("\\\\"),
        Some('\n') => out.push_str("\\n"),
        Some('\t') => out.push_str("\\t"),
        Some('\r') => out.push_str("\\r"),
        Some(c) if c.is_ascii_graphic() || c == ' ' => out.push(c),
        Some(c) if !c.is_control() && !c.is_ascii() => out.push(c),
        _ => out.push_str(&format!("\\x{{{:x}}}", r)),
    }
}

fn quote_runes<'a>(runes: impl IntoIterator<Item = &'a CodePoint>) -> String {
    let mut s = String::from("\"");
    for &r in runes {
        escape_rune(&mut s, r);
    }
    s.push('"');
    s
}

impl fmt::Display for Inst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Inst::Alt { outs } => {
                write!(f, "alt -> ")?;
                for (i, pc) in outs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", pc)?;
                }
                Ok(())
            }
            Inst::Capture { slot, out } => write!(f, "cap {} -> {}", slot, out),
            Inst::EmptyWidth { cond, out } => write!(f, "empty {} -> {}", cond.bits(), out),
            Inst::Nop { out } => write!(f, "nop -> {}", out),
            Inst::Fail => write!(f, "fail"),
            Inst::Match => write!(f, "match"),
            Inst::Rune { class, out } => match class {
                RuneClass::Single(r) => write!(f, "rune1 {} -> {}", quote_runes([r]), out),
                RuneClass::Fold(set) => write!(f, "rune {}/i -> {}", quote_runes(set.iter()), out),
                RuneClass::Ranges(ranges) => {
                    let flat: Vec<CodePoint> =
                        ranges.iter().flat_map(|&(lo, hi)| [lo, hi]).collect();
                    write!(f, "rune {} -> {}", quote_runes(flat.iter()), out)
                }
                RuneClass::Any => write!(f, "any -> {}", out),
                RuneClass::AnyNotNl => write!(f, "anynotnl -> {}", out),
            },
        }
    }
}
