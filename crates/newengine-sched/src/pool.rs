/// An item that can be recycled by [`Pool`].
///
/// `reset` must bring the item back to a state indistinguishable from `Default::default()`.
pub trait Poolable: Default {
    fn reset(&mut self);
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct PoolStats {
    /// Items allocated because the free list was empty.
    pub created: u64,
    /// Items handed out from the free list.
    pub reused: u64,
    pub released: u64,
    /// Released items dropped because the free list was full.
    pub dropped: u64,
    pub free: usize,
}

/// Free list of boxed items.
///
/// Boxes move between the pool and their owners, so a recycled item keeps its allocation.
pub struct Pool<T: Poolable> {
    free: Vec<Box<T>>,
    max_retained: usize,
    stats: PoolStats,
}

impl<T: Poolable> Pool<T> {
    #[inline]
    pub fn new(max_retained: usize) -> Self {
        Self {
            free: Vec::with_capacity(max_retained.min(64)),
            max_retained,
            stats: PoolStats::default(),
        }
    }

    pub fn get(&mut self) -> Box<T> {
        match self.free.pop() {
            Some(item) => {
                self.stats.reused += 1;
                item
            }
            None => {
                self.stats.created += 1;
                Box::default()
            }
        }
    }

    pub fn release(&mut self, mut item: Box<T>) {
        item.reset();
        self.stats.released += 1;
        if self.free.len() < self.max_retained {
            self.free.push(item);
        } else {
            self.stats.dropped += 1;
        }
    }

    #[inline]
    pub fn free_len(&self) -> usize {
        self.free.len()
    }

    #[inline]
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            free: self.free.len(),
            ..self.stats
        }
    }

    /// Drops every retained item.
    #[inline]
    pub fn clear(&mut self) {
        self.free.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default, Debug, PartialEq)]
    struct Slot {
        id: u64,
        label: Option<String>,
    }

    impl Poolable for Slot {
        fn reset(&mut self) {
            self.id = 0;
            self.label = None;
        }
    }

    #[test]
    fn released_item_is_reused_and_cleared() {
        let mut pool: Pool<Slot> = Pool::new(4);

        let mut a = pool.get();
        a.id = 7;
        a.label = Some("delay".into());
        let addr = &*a as *const Slot;
        pool.release(a);

        let b = pool.get();
        assert_eq!(&*b as *const Slot, addr);
        assert_eq!(*b, Slot::default());

        let stats = pool.stats();
        assert_eq!(stats.created, 1);
        assert_eq!(stats.reused, 1);
        assert_eq!(stats.released, 1);
    }

    #[test]
    fn free_list_is_bounded() {
        let mut pool: Pool<Slot> = Pool::new(1);
        let a = pool.get();
        let b = pool.get();
        pool.release(a);
        pool.release(b);

        assert_eq!(pool.free_len(), 1);
        assert_eq!(pool.stats().dropped, 1);
    }
}
