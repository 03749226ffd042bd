// prog.rs - Compiled program: instruction array, patch lists, linking.
//
// A program is built bottom-up through ProgBuilder. Forward references are
// tracked as PatchLists of holes (instruction + successor arm); patch()
// queues one fixup per hole and freeze() applies them all in one pass,
// validates the graph and flattens alternation chains. The resulting Prog is
// immutable and can be shared between any number of machines.

use std::fmt;

use smallvec::SmallVec;

use crate::empty::{CodePoint, EmptyFlags};
use crate::error::RegexError;
use crate::inst::{Inst, RuneClass, PENDING};

/// One not-yet-known successor edge: arm `arm` of instruction `pc`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Hole {
    pub pc: usize,
    pub arm: usize,
}

/// A list of holes that will all be patched to the same target.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PatchList {
    holes: SmallVec<[Hole; 4]>,
}

impl PatchList {
    pub fn empty() -> Self {
        PatchList::default()
    }

    /// A list holding the single hole `(pc, arm)`.
    pub fn hole(pc: usize, arm: usize) -> Self {
        let mut holes = SmallVec::new();
        holes.push(Hole { pc, arm });
        PatchList { holes }
    }

    /// Concatenates two lists; `self`'s holes come first.
    pub fn append(mut self, other: PatchList) -> Self {
        if self.holes.is_empty() {
            return other;
        }
        self.holes.extend(other.holes);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.holes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.holes.len()
    }

    pub fn holes(&self) -> &[Hole] {
        &self.holes
    }
}

/// Mutable program under construction.
#[derive(Debug, Default)]
pub struct ProgBuilder {
    insts: Vec<Inst>,
    start: usize,
    num_cap: usize,
    fixups: Vec<(Hole, usize)>,
}

impl ProgBuilder {
    pub fn new() -> Self {
        ProgBuilder {
            insts: Vec::new(),
            start: 0,
            num_cap: 2,
            fixups: Vec::new(),
        }
    }

    /// Appends `inst` and returns its program counter.
    pub fn add_inst(&mut self, inst: Inst) -> usize {
        if let Inst::Capture { slot, .. } = &inst {
            // Slots come in start/end pairs.
            let needed = (*slot + 2) & !1;
            if needed > self.num_cap {
                self.num_cap = needed;
            }
        }
        self.insts.push(inst);
        self.insts.len() - 1
    }

    pub fn num_inst(&self) -> usize {
        self.insts.len()
    }

    pub fn num_cap(&self) -> usize {
        self.num_cap
    }

    pub fn set_start(&mut self, pc: usize) {
        self.start = pc;
    }

    /// Queues every hole in `list` to be pointed at `target`.
    pub fn patch(&mut self, list: PatchList, target: usize) {
        self.fixups
            .extend(list.holes.into_iter().map(|hole| (hole, target)));
    }

    /// Applies all fixups, validates, flattens alternations and freezes.
    pub fn freeze(self) -> Result<Prog, RegexError> {
        self.finish(true)
    }

    /// Like [`freeze`](Self::freeze) but keeps binary alternations as built.
    pub fn freeze_unflattened(self) -> Result<Prog, RegexError> {
        self.finish(false)
    }

    fn finish(mut self, flatten: bool) -> Result<Prog, RegexError> {
        if self.insts.is_empty() {
            return Err(RegexError::bug("empty program"));
        }
        let n = self.insts.len();
        if self.start >= n {
            return Err(RegexError::bug(format!(
                "start {} out of range ({} instructions)",
                self.start, n
            )));
        }

        for (hole, target) in self.fixups.drain(..) {
            let inst = self.insts.get_mut(hole.pc).ok_or_else(|| {
                RegexError::bug(format!("patch of missing instruction {}", hole.pc))
            })?;
            let slot = inst.successors_mut().get_mut(hole.arm).ok_or_else(|| {
                RegexError::bug(format!("pc {} has no arm {}", hole.pc, hole.arm))
            })?;
            if *slot != PENDING {
                return Err(RegexError::bug(format!(
                    "pc {} arm {} patched twice",
                    hole.pc, hole.arm
                )));
            }
            *slot = target;
        }

        for (pc, inst) in self.insts.iter().enumerate() {
            for &s in inst.successors() {
                if s == PENDING {
                    return Err(RegexError::bug(format!("unresolved patch list at pc {}", pc)));
                }
                if s >= n {
                    return Err(RegexError::bug(format!(
                        "pc {} points to {} ({} instructions)",
                        pc, s, n
                    )));
                }
            }
        }

        if flatten {
            flatten_alts(&mut self.insts, self.start);
        }

        let mut prog = Prog {
            insts: self.insts,
            start: self.start,
            num_cap: self.num_cap,
            prefix: String::new(),
            prefix_complete: false,
            prefix_rune: None,
            start_cond: None,
        };
        let (prefix, complete) = prog.compute_prefix();
        prog.prefix_rune = prefix.chars().next().map(|c| c as CodePoint);
        prog.prefix = prefix;
        prog.prefix_complete = complete;
        prog.start_cond = prog.compute_start_cond();
        Ok(prog)
    }
}

// Replaces each alternation arm that is itself an alternation reachable only
// through that arm with the inner arms, in order. The inner node is left in
// place, unreachable.
fn flatten_alts(insts: &mut [Inst], start: usize) {
    let n = insts.len();
    let mut indegree = vec![0u32; n];
    indegree[start] += 1;
    for inst in insts.iter() {
        for &s in inst.successors() {
            indegree[s] += 1;
        }
    }

    for pc in 0..n {
        let outs = match &insts[pc] {
            Inst::Alt { outs } => outs.clone(),
            _ => continue,
        };
        let mut flat: SmallVec<[usize; 2]> = SmallVec::new();
        let mut work: Vec<usize> = outs.iter().rev().copied().collect();
        let mut expanded = 0usize;
        while let Some(arm) = work.pop() {
            let inner = match &insts[arm] {
                Inst::Alt { outs } if arm != pc && indegree[arm] == 1 && expanded < n => outs,
                _ => {
                    flat.push(arm);
                    continue;
                }
            };
            expanded += 1;
            work.extend(inner.iter().rev().copied());
        }
        if flat.len() != outs.len() {
            insts[pc] = Inst::Alt { outs: flat };
        }
    }
}

/// A frozen, pointer-resolved NFA program.
#[derive(Debug, Clone)]
pub struct Prog {
    insts: Vec<Inst>,
    start: usize,
    num_cap: usize,
    prefix: String,
    prefix_complete: bool,
    prefix_rune: Option<CodePoint>,
    start_cond: Option<EmptyFlags>,
}

impl Prog {
    /// Returns the instruction at `pc`.
    ///
    /// Panics if `pc >= num_inst()`.
    #[inline]
    pub fn inst(&self, pc: usize) -> &Inst {
        &self.insts[pc]
    }

    pub fn num_inst(&self) -> usize {
        self.insts.len()
    }

    pub fn start(&self) -> usize {
        self.start
    }

    /// Number of capture slots, including slots 0 and 1 for the whole match.
    pub fn num_cap(&self) -> usize {
        self.num_cap
    }

    /// The literal every match must start with, and whether that literal is
    /// the entire match.
    pub fn prefix(&self) -> (&str, bool) {
        (&self.prefix, self.prefix_complete)
    }

    /// First symbol of [`prefix`](Self::prefix), if the prefix is non-empty.
    pub fn prefix_rune(&self) -> Option<CodePoint> {
        self.prefix_rune
    }

    /// Leading zero-width conditions that must hold where a match starts.
    /// `None` means no match is possible at all.
    pub fn start_cond(&self) -> Option<EmptyFlags> {
        self.start_cond
    }

    // Follows Nop and Capture instructions from `pc`.
    fn skip_nop(&self, mut pc: usize) -> usize {
        for _ in 0..self.insts.len() {
            match &self.insts[pc] {
                Inst::Nop { out } | Inst::Capture { out, .. } => pc = *out,
                _ => break,
            }
        }
        pc
    }

    fn compute_prefix(&self) -> (String, bool) {
        let mut prefix = String::new();
        let mut pc = self.skip_nop(self.start);
        for _ in 0..self.insts.len() {
            let (r, out) = match &self.insts[pc] {
                Inst::Rune {
                    class: RuneClass::Single(r),
                    out,
                } => (*r, *out),
                _ => break,
            };
            match char::from_u32(r) {
                Some(c) => prefix.push(c),
                None => break,
            }
            pc = self.skip_nop(out);
        }
        let complete = matches!(self.insts[pc], Inst::Match);
        (prefix, complete)
    }

    fn compute_start_cond(&self) -> Option<EmptyFlags> {
        let mut flag = EmptyFlags::empty();
        let mut pc = self.start;
        for _ in 0..self.insts.len() {
            match &self.insts[pc] {
                Inst::EmptyWidth { cond, out } => {
                    flag |= *cond;
                    pc = *out;
                }
                Inst::Fail => return None,
                Inst::Capture { out, .. } | Inst::Nop { out } => pc = *out,
                _ => break,
            }
        }
        Some(flag)
    }
}

impl fmt::Display for Prog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (pc, inst) in self.insts.iter().enumerate() {
            let mut head = pc.to_string();
            if pc == self.start {
                head.push('*');
            }
            writeln!(f, "{:<8}{}", head, inst)?;
        }
        Ok(())
    }
}
