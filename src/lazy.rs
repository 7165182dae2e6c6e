//! One-shot concurrent memoization for deferred values.
//!
//! The evaluator defers expensive constructions until first use: a value
//! that supports the [`Resolve`] capability is resolved when it is first
//! rendered, compared, or iterated. [`LazyValue`] guarantees the
//! constructor runs at most once even under concurrent access, with losers
//! of the race yielding cooperatively until the winner has published.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicI32, Ordering};
use std::thread;

/// Capability the evaluator probes for before using a value: anything that
/// can produce its final value on demand.
pub trait Resolve {
    type Output;

    fn resolve(&self) -> Self::Output;
}

/// A one-shot memoized cell.
///
/// The first caller of [`get`](LazyValue::get) runs the constructor and
/// publishes the value; every other caller observes that same value and
/// never re-runs the constructor. Readers that lose the race spin on
/// [`std::thread::yield_now`] until the writer finishes; construction is
/// assumed to terminate.
pub struct LazyValue<T> {
    /// One-shot flag, set 0 -> 1 by the single writer.
    initialized: AtomicI32,
    /// Incremented on entry, decremented after writing or after confirming
    /// the writer is elsewhere; readers wait for it to drain.
    writing: AtomicI32,
    create: Box<dyn Fn() -> T + Send + Sync>,
    value: UnsafeCell<MaybeUninit<T>>,
}

// The writing/initialized protocol serializes all access to `value`.
unsafe impl<T: Send + Sync> Sync for LazyValue<T> {}

impl<T: Clone> LazyValue<T> {
    pub fn new(create: impl Fn() -> T + Send + Sync + 'static) -> Self {
        Self {
            initialized: AtomicI32::new(0),
            writing: AtomicI32::new(0),
            create: Box::new(create),
            value: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }

    /// Returns the memoized value, constructing it on first call.
    pub fn get(&self) -> T {
        self.writing.fetch_add(1, Ordering::SeqCst);

        if self
            .initialized
            .compare_exchange(0, 1, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            // We are the writer: set the value, then release the counter.
            let value = (self.create)();
            unsafe { (*self.value.get()).write(value) };
            self.writing.fetch_sub(1, Ordering::SeqCst);
        } else {
            self.writing.fetch_sub(1, Ordering::SeqCst);

            // Just a reader: wait until there is no writer. The writer's
            // increment precedes its flag flip, so the counter stays
            // nonzero until the value is published.
            while self.writing.load(Ordering::SeqCst) != 0 {
                thread::yield_now();
            }
        }

        unsafe { (*self.value.get()).assume_init_ref().clone() }
    }
}

impl<T> Drop for LazyValue<T> {
    fn drop(&mut self) {
        if *self.initialized.get_mut() != 0 {
            unsafe { self.value.get_mut().assume_init_drop() };
        }
    }
}

impl<T: Clone> Resolve for LazyValue<T> {
    type Output = T;

    fn resolve(&self) -> T {
        self.get()
    }
}

/// A value that is already final; the trivial [`Resolve`] implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Immediate<T>(pub T);

impl<T: Clone> Resolve for Immediate<T> {
    type Output = T;

    fn resolve(&self) -> T {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[test]
    fn test_get_returns_constructed_value() {
        let lazy = LazyValue::new(|| "test".to_string());
        assert_eq!(lazy.get(), "test");
        assert_eq!(lazy.get(), "test");
    }

    #[test]
    fn test_constructor_runs_once_under_contention() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);
        let lazy = LazyValue::new(|| {
            CALLS.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(50));
            "test".to_string()
        });

        thread::scope(|scope| {
            let mut handles = Vec::new();
            for _ in 0..100 {
                handles.push(scope.spawn(|| lazy.get()));
            }
            for handle in handles {
                assert_eq!(handle.join().expect("reader panicked"), "test");
            }
        });

        assert_eq!(CALLS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_immediate() {
        let value = Immediate("now".to_string());
        assert_eq!(value.resolve(), "now");
    }

    #[test]
    fn test_resolve_through_lazy() {
        let lazy = LazyValue::new(|| 42);
        let resolved: i32 = lazy.resolve();
        assert_eq!(resolved, 42);
    }
}
