// pool.rs - Free list of capture arrays.
//
// Buffers move out on alloc() and back in on free(); a buffer is owned by
// exactly one thread or by the pool at any time.

/// Sentinel for a capture slot that has not been set.
pub const UNSET: usize = usize::MAX;

#[derive(Debug, Default)]
pub struct CapPool {
    free: Vec<Vec<usize>>,
    ncap: usize,
    allocated: usize,
}

impl CapPool {
    pub fn new(ncap: usize) -> Self {
        CapPool {
            free: Vec::new(),
            ncap,
            allocated: 0,
        }
    }

    /// Width of the buffers handed out.
    pub fn ncap(&self) -> usize {
        self.ncap
    }

    /// Checks out a buffer of `ncap` slots. Contents are unspecified.
    #[inline]
    pub fn alloc(&mut self) -> Vec<usize> {
        match self.free.pop() {
            Some(buf) => buf,
            None => {
                self.allocated += 1;
                vec![UNSET; self.ncap]
            }
        }
    }

    /// Checks a buffer back in.
    #[inline]
    pub fn free(&mut self, buf: Vec<usize>) {
        debug_assert_eq!(buf.len(), self.ncap);
        self.free.push(buf);
    }

    /// Changes the buffer width. Pooled buffers are resized in place.
    pub fn resize(&mut self, ncap: usize) {
        if ncap == self.ncap {
            return;
        }
        self.ncap = ncap;
        for buf in &mut self.free {
            buf.resize(ncap, UNSET);
        }
    }

    /// Number of buffers currently available.
    pub fn available(&self) -> usize {
        self.free.len()
    }

    /// Number of buffers ever created by this pool.
    pub fn allocated(&self) -> usize {
        self.allocated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reuses_freed_buffers() {
        let mut pool = CapPool::new(4);
        let a = pool.alloc();
        assert_eq!(a, vec![UNSET; 4]);
        assert_eq!(pool.allocated(), 1);
        pool.free(a);
        assert_eq!(pool.available(), 1);
        let b = pool.alloc();
        assert_eq!(b.len(), 4);
        assert_eq!(pool.allocated(), 1);
        assert_eq!(pool.available(), 0);
        pool.free(b);
    }

    #[test]
    fn resize_changes_width() {
        let mut pool = CapPool::new(2);
        let a = pool.alloc();
        pool.free(a);
        pool.resize(6);
        assert_eq!(pool.ncap(), 6);
        assert_eq!(pool.alloc().len(), 6);
        assert_eq!(pool.alloc().len(), 6);
    }

    #[test]
    fn zero_width_buffers() {
        let mut pool = CapPool::new(0);
        let a = pool.alloc();
        assert!(a.is_empty());
        pool.free(a);
    }
}
