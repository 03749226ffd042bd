// machine.rs - Pike VM: simulates a Prog over an input in linear time.
//
// Two run queues hold the live threads for the current and next position.
// At each position every thread either dies, matches, or consumes the
// current symbol and has its epsilon closure added to the next queue. A pc
// enters a queue at most once per position, so one step costs at most the
// size of the program.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::empty::{empty_op_context, CodePoint, EmptyFlags};
use crate::error::RegexError;
use crate::inst::Inst;
use crate::input::MachineInput;
use crate::pool::{CapPool, UNSET};
use crate::prog::Prog;
use crate::queue::Queue;

// Flip to true for debugging
const TRACE: bool = false;
macro_rules! trace {
    ($($tts:tt)*) => {
        if TRACE {
            println!($($tts)*);
        }
    }
}

// ============================================================================
// Limits
// ============================================================================

const DEFAULT_TIME_LIMIT_MSEC: u64 = 0;
const CHECK_TIME_INTERVAL: usize = 512;

static TIME_LIMIT: AtomicU64 = AtomicU64::new(DEFAULT_TIME_LIMIT_MSEC);

/// Sets the process-wide match time limit in milliseconds. 0 = unlimited.
pub fn set_time_limit(msec: u64) {
    TIME_LIMIT.store(msec, Ordering::Relaxed);
}

pub fn time_limit() -> u64 {
    TIME_LIMIT.load(Ordering::Relaxed)
}

/// Where a match may start and end.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Anchor {
    /// A match may start at any offset at or after the search position.
    #[default]
    Unanchored,
    /// A match must start at offset 0.
    AnchorStart,
    /// A match must start at offset 0 and end at the end of input.
    AnchorBoth,
}

/// Which match wins when several are possible.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum MatchKind {
    /// The first match in alternation priority order.
    #[default]
    LeftmostFirst,
    /// Among the leftmost matches, the longest.
    LeftmostLongest,
}

// One unit of pending closure work.
#[derive(Clone, Copy, Debug)]
enum Frame {
    Explore(usize),
    Restore { slot: usize, old: usize },
}

/// Per-match mutable state for one program. Reusable across calls; not
/// shareable between threads while a match is running.
#[derive(Debug)]
pub struct Machine {
    prog: Arc<Prog>,
    kind: MatchKind,
    q0: Queue,
    q1: Queue,
    pool: CapPool,
    stack: Vec<Frame>,
    matchcap: Vec<usize>,
    matched: bool,
    ncap: usize,
    time_limit: Option<Duration>,
    work: u64,
}

impl Machine {
    pub fn new(prog: Arc<Prog>, kind: MatchKind) -> Self {
        let n = prog.num_inst();
        let ncap = prog.num_cap();
        Machine {
            prog,
            kind,
            q0: Queue::new(n),
            q1: Queue::new(n),
            pool: CapPool::new(ncap),
            stack: Vec::new(),
            matchcap: vec![UNSET; ncap],
            matched: false,
            ncap,
            time_limit: None,
            work: 0,
        }
    }

    /// Selects how many capture slots the next matches track: 0 for a
    /// yes/no answer, 2 for the overall span, `prog().num_cap()` for every
    /// group. Odd counts are rounded up.
    pub fn init(&mut self, ncap: usize) {
        let ncap = (ncap + 1) & !1;
        if ncap != self.ncap {
            self.pool.resize(ncap);
            self.matchcap.resize(ncap, UNSET);
            self.ncap = ncap;
        }
    }

    pub fn prog(&self) -> &Arc<Prog> {
        &self.prog
    }

    pub fn ncap(&self) -> usize {
        self.ncap
    }

    /// Overrides the process-wide time limit for this machine.
    pub fn set_time_limit(&mut self, limit: Option<Duration>) {
        self.time_limit = limit;
    }

    /// Capture offsets of the last successful match: `ncap` slots, unset
    /// slots hold [`UNSET`].
    pub fn submatches(&self) -> Vec<usize> {
        if !self.matched {
            return vec![UNSET; self.ncap];
        }
        self.matchcap.clone()
    }

    /// Instruction visits spent by the last match call.
    pub fn work(&self) -> u64 {
        self.work
    }

    /// Runs the program over `input` from `pos`. A time limit overrun counts
    /// as no match.
    pub fn match_input<I: MachineInput + ?Sized>(
        &mut self,
        input: &I,
        pos: usize,
        anchor: Anchor,
    ) -> bool {
        self.try_match(input, pos, anchor).unwrap_or(false)
    }

    /// Runs the program over `input` from `pos`.
    pub fn try_match<I: MachineInput + ?Sized>(
        &mut self,
        input: &I,
        pos: usize,
        anchor: Anchor,
    ) -> Result<bool, RegexError> {
        self.matched = false;
        self.matchcap.fill(UNSET);
        self.work = 0;

        let prog = Arc::clone(&self.prog);
        let start_cond = match prog.start_cond() {
            Some(cond) => cond,
            None => return Ok(false),
        };
        if anchor != Anchor::Unanchored && pos != 0 {
            return Ok(false);
        }

        let limit = self
            .time_limit
            .or_else(|| match time_limit() {
                0 => None,
                msec => Some(Duration::from_millis(msec)),
            });
        let started = limit.map(|_| Instant::now());

        let mut runq = std::mem::take(&mut self.q0);
        let mut nextq = std::mem::take(&mut self.q1);
        let result = self.run(
            &prog, input, pos, anchor, start_cond, limit, started, &mut runq, &mut nextq,
        );
        self.drain(&mut runq);
        self.drain(&mut nextq);
        self.q0 = runq;
        self.q1 = nextq;
        result
    }

    #[allow(clippy::too_many_arguments)]
    fn run<I: MachineInput + ?Sized>(
        &mut self,
        prog: &Prog,
        input: &I,
        mut pos: usize,
        anchor: Anchor,
        start_cond: EmptyFlags,
        limit: Option<Duration>,
        started: Option<Instant>,
        runq: &mut Queue,
        nextq: &mut Queue,
    ) -> Result<bool, RegexError> {
        let (prefix, _) = prog.prefix();
        let has_prefix = !prefix.is_empty() && input.can_check_prefix();
        let end = input.end_pos();

        let (mut rune, mut width) = split(input.step(pos));
        let (mut rune1, mut width1) = if rune.is_some() {
            split(input.step(pos + width))
        } else {
            (None, 0)
        };
        let mut flag = if pos == 0 {
            empty_op_context(None, rune)
        } else {
            input.context(pos)
        };

        let mut steps = 0usize;
        loop {
            if runq.is_empty() {
                if start_cond.contains(EmptyFlags::BEGIN_TEXT) && pos != 0 {
                    // Anchored program, past the beginning of text.
                    break;
                }
                if self.matched {
                    break;
                }
                if anchor != Anchor::Unanchored && pos != 0 {
                    // No more threads get seeded.
                    break;
                }
                if has_prefix && rune != prog.prefix_rune() {
                    let advance = match input.index_of_prefix(prog, pos) {
                        Some(advance) => advance,
                        None => break,
                    };
                    if advance > 0 {
                        pos += advance;
                        (rune, width) = split(input.step(pos));
                        (rune1, width1) = split(input.step(pos + width));
                        flag = input.context(pos);
                        trace!("prefix skip to {}", pos);
                    }
                }
            }

            if !self.matched && (pos == 0 || anchor == Anchor::Unanchored) {
                let mut cap = self.pool.alloc();
                if self.ncap > 0 {
                    cap.fill(UNSET);
                    cap[0] = pos;
                }
                self.add(prog, runq, prog.start(), pos, cap, flag);
            }

            let next_pos = pos + width;
            flag = input.context(next_pos);
            self.step(prog, runq, nextq, pos, next_pos, rune, flag, anchor, pos == end);
            if width == 0 {
                break;
            }
            if self.ncap == 0 && self.matched {
                // Not tracking where the match is, so any match will do.
                break;
            }

            steps += 1;
            if steps % CHECK_TIME_INTERVAL == 0 {
                if let (Some(limit), Some(started)) = (limit, started) {
                    if started.elapsed() >= limit {
                        return Err(RegexError::TimeLimitOver);
                    }
                }
            }

            pos += width;
            rune = rune1;
            width = width1;
            if rune.is_some() {
                (rune1, width1) = split(input.step(pos + width));
            }
            std::mem::swap(runq, nextq);
        }
        Ok(self.matched)
    }

    // Adds the epsilon closure of `pc0` at `pos` to `q`. Takes ownership of
    // `cap`, which is both the capture snapshot for the closure and the
    // buffer handed to the first thread when nothing else needs it.
    fn add(
        &mut self,
        prog: &Prog,
        q: &mut Queue,
        pc0: usize,
        pos: usize,
        mut cap: Vec<usize>,
        cond: EmptyFlags,
    ) {
        debug_assert!(self.stack.is_empty());
        self.stack.push(Frame::Explore(pc0));
        while let Some(frame) = self.stack.pop() {
            let pc = match frame {
                Frame::Restore { slot, old } => {
                    cap[slot] = old;
                    continue;
                }
                Frame::Explore(pc) => pc,
            };
            if q.contains(pc) {
                continue;
            }
            q.mark(pc);
            self.work += 1;
            match prog.inst(pc) {
                Inst::Fail => {}
                Inst::Alt { outs } => {
                    self.stack
                        .extend(outs.iter().rev().map(|&out| Frame::Explore(out)));
                }
                Inst::EmptyWidth { cond: need, out } => {
                    if cond.contains(*need) {
                        self.stack.push(Frame::Explore(*out));
                    }
                }
                Inst::Nop { out } => self.stack.push(Frame::Explore(*out)),
                Inst::Capture { slot, out } => {
                    if *slot < cap.len() {
                        self.stack.push(Frame::Restore {
                            slot: *slot,
                            old: cap[*slot],
                        });
                        cap[*slot] = pos;
                    }
                    self.stack.push(Frame::Explore(*out));
                }
                Inst::Match | Inst::Rune { .. } => {
                    trace!("add thread pc={} pos={} cap={:?}", pc, pos, cap);
                    if self.stack.is_empty() {
                        q.push_thread(pc, cap);
                        return;
                    }
                    let mut buf = self.pool.alloc();
                    buf.copy_from_slice(&cap);
                    q.push_thread(pc, buf);
                }
            }
        }
        self.pool.free(cap);
    }

    #[allow(clippy::too_many_arguments)]
    fn step(
        &mut self,
        prog: &Prog,
        runq: &mut Queue,
        nextq: &mut Queue,
        pos: usize,
        next_pos: usize,
        c: Option<CodePoint>,
        next_cond: EmptyFlags,
        anchor: Anchor,
        at_end: bool,
    ) {
        let longest = self.kind == MatchKind::LeftmostLongest;
        let mut threads = std::mem::take(&mut runq.dense);
        let mut pending = threads.drain(..);
        while let Some(mut t) = pending.next() {
            self.work += 1;
            if longest && self.matched && self.ncap > 0 && self.matchcap[0] < t.cap[0] {
                self.pool.free(t.cap);
                continue;
            }
            match prog.inst(t.pc) {
                Inst::Match => {
                    if anchor == Anchor::AnchorBoth && !at_end {
                        self.pool.free(t.cap);
                        continue;
                    }
                    if self.ncap > 0 && (!longest || !self.matched || self.better(&t.cap, pos)) {
                        t.cap[1] = pos;
                        self.matchcap.copy_from_slice(&t.cap);
                    }
                    trace!("match at {} cap={:?}", pos, self.matchcap);
                    self.pool.free(t.cap);
                    self.matched = true;
                    if !longest {
                        // Lower-priority threads lose.
                        for rest in pending.by_ref() {
                            self.pool.free(rest.cap);
                        }
                        break;
                    }
                }
                Inst::Rune { class, out } => {
                    if c.is_some_and(|c| class.matches(c)) {
                        self.add(prog, nextq, *out, next_pos, t.cap, next_cond);
                    } else {
                        self.pool.free(t.cap);
                    }
                }
                inst => panic!("bad instruction in run queue at pc {}: {}", t.pc, inst),
            }
        }
        drop(pending);
        runq.dense = threads;
        runq.clear();
    }

    // Leftmost-longest: whether a thread with captures `cap` matching up to
    // `pos` beats the current best.
    fn better(&self, cap: &[usize], pos: usize) -> bool {
        cap[0] < self.matchcap[0] || (cap[0] == self.matchcap[0] && pos > self.matchcap[1])
    }

    fn drain(&mut self, q: &mut Queue) {
        for t in q.dense.drain(..) {
            self.pool.free(t.cap);
        }
        q.clear();
    }
}

#[inline]
fn split(r: Option<(CodePoint, usize)>) -> (Option<CodePoint>, usize) {
    match r {
        Some((c, w)) => (Some(c), w),
        None => (None, 0),
    }
}
