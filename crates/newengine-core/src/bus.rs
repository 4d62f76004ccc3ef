use crossbeam_channel::{bounded, unbounded, Receiver, Sender};

/// Multi-producer event channel shared by the engine and its modules.
///
/// Cloning yields another endpoint of the same channel, which is how scheduled callbacks
/// post events back to the modules that created them.
pub struct Bus<E: Send + 'static> {
    tx: Sender<E>,
    rx: Receiver<E>,
}

impl<E: Send + 'static> Clone for Bus<E> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            rx: self.rx.clone(),
        }
    }
}

impl<E: Send + 'static> Bus<E> {
    #[inline]
    pub fn new(tx: Sender<E>, rx: Receiver<E>) -> Self {
        Self { tx, rx }
    }

    #[inline]
    pub fn unbounded() -> Self {
        let (tx, rx) = unbounded();
        Self::new(tx, rx)
    }

    #[inline]
    pub fn bounded(capacity: usize) -> Self {
        let (tx, rx) = bounded(capacity);
        Self::new(tx, rx)
    }

    /// Best-effort send. Returns `true` if the event was accepted by the channel.
    #[inline]
    pub fn try_send(&self, ev: E) -> bool {
        self.tx.try_send(ev).is_ok()
    }

    /// Fire-and-forget send.
    #[inline]
    pub fn send(&self, ev: E) {
        let _ = self.tx.send(ev);
    }

    #[inline]
    pub fn sender(&self) -> Sender<E> {
        self.tx.clone()
    }

    #[inline]
    pub fn try_recv(&self) -> Option<E> {
        self.rx.try_recv().ok()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn drain_into(&self, out: &mut Vec<E>) -> usize {
        let mut n = 0usize;
        while let Ok(ev) = self.rx.try_recv() {
            out.push(ev);
            n += 1;
        }
        n
    }
}
