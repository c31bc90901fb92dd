use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use crossbeam_channel::{bounded, Receiver, Sender};

type Factory<T> = Box<dyn Fn() -> T + Send + Sync>;

/// A fixed set of reusable instances handed out one caller at a time.
///
/// The pool is filled when it is built. A caller that finds it empty blocks
/// until another caller hands an instance back.
pub struct Pool<T> {
    tx: Sender<T>,
    rx: Receiver<T>,
    make: Factory<T>,
    capacity: usize,
}

impl<T> Pool<T> {
    /// Create a new pool filled with `capacity` instances from `make`.
    pub fn new(capacity: usize, make: impl Fn() -> T + Send + Sync + 'static) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = bounded(capacity);
        for _ in 0..capacity {
            if tx.try_send(make()).is_err() {
                break;
            }
        }
        Self {
            tx,
            rx,
            make: Box::new(make),
            capacity,
        }
    }

    /// Run `f` with an instance, returning it to the pool afterwards even
    /// if `f` panics.
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        // Both channel ends live in `self`, so `recv` only fails if the
        // channel is torn down underneath us.
        let mut item = self.rx.recv().unwrap_or_else(|_| (self.make)());
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| f(&mut item)));
        let _ = self.tx.try_send(item);
        match outcome {
            Ok(out) => out,
            Err(payload) => panic::resume_unwind(payload),
        }
    }

    /// Number of instances the pool holds.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Instances currently idle.
    pub fn available(&self) -> usize {
        self.rx.len()
    }
}

impl<T> fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("capacity", &self.capacity)
            .field("available", &self.available())
            .finish()
    }
}
