// queue.rs - Run queue of the NFA machine.
//
// A set of program counters with insertion order. Membership is a bitset
// sized to the program; the dense list holds the live threads in priority
// order. Only terminal instructions (Match / Rune) become threads, but every
// pc visited during a closure is marked so it is not explored twice.

/// A candidate execution path: the instruction it runs next and its
/// capture array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thread {
    pub pc: usize,
    pub cap: Vec<usize>,
}

const WORD_BITS: usize = u64::BITS as usize;

#[derive(Debug, Default)]
pub struct Queue {
    bits: Vec<u64>,
    marked: bool,
    pub(crate) dense: Vec<Thread>,
}

impl Queue {
    /// A queue able to hold program counters `0..n`.
    pub fn new(n: usize) -> Self {
        Queue {
            bits: vec![0; n.div_ceil(WORD_BITS)],
            marked: false,
            dense: Vec::with_capacity(n),
        }
    }

    #[inline]
    pub fn contains(&self, pc: usize) -> bool {
        self.bits[pc / WORD_BITS] & (1u64 << (pc % WORD_BITS)) != 0
    }

    /// Marks `pc` as visited.
    #[inline]
    pub fn mark(&mut self, pc: usize) {
        self.bits[pc / WORD_BITS] |= 1u64 << (pc % WORD_BITS);
        self.marked = true;
    }

    #[inline]
    pub fn push_thread(&mut self, pc: usize, cap: Vec<usize>) {
        self.dense.push(Thread { pc, cap });
    }

    /// True when no thread is queued.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    pub fn len(&self) -> usize {
        self.dense.len()
    }

    pub fn threads(&self) -> &[Thread] {
        &self.dense
    }

    /// Removes all threads and marks. Capture arrays of remaining threads are
    /// dropped; callers that pool them drain the threads first.
    pub fn clear(&mut self) {
        self.dense.clear();
        if self.marked {
            self.bits.iter_mut().for_each(|w| *w = 0);
            self.marked = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership_across_words() {
        let mut q = Queue::new(130);
        assert!(!q.contains(0));
        q.mark(0);
        q.mark(64);
        q.mark(129);
        assert!(q.contains(0));
        assert!(q.contains(64));
        assert!(q.contains(129));
        assert!(!q.contains(63));
        assert!(!q.contains(128));
        // Marks alone do not make the queue non-empty.
        assert!(q.is_empty());
    }

    #[test]
    fn threads_keep_insertion_order() {
        let mut q = Queue::new(10);
        q.mark(7);
        q.push_thread(7, vec![1, 2]);
        q.mark(3);
        q.push_thread(3, vec![3, 4]);
        let pcs: Vec<usize> = q.threads().iter().map(|t| t.pc).collect();
        assert_eq!(pcs, vec![7, 3]);
        assert_eq!(q.len(), 2);
        assert!(!q.is_empty());
    }

    #[test]
    fn clear_resets_marks() {
        let mut q = Queue::new(70);
        q.mark(69);
        q.push_thread(69, Vec::new());
        q.clear();
        assert!(q.is_empty());
        assert!(!q.contains(69));
    }
}
