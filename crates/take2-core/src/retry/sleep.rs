//! Blocking waits between attempts.

use std::time::Duration;

/// Puts the current thread of control to sleep between attempts.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

/// Real blocking sleep via `std::thread::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

/// Adapts a closure into a [`Sleeper`] (handy for tests and custom clocks).
#[derive(Debug, Clone, Copy)]
pub struct FnSleeper<F>(pub F);

impl<F: Fn(Duration)> Sleeper for FnSleeper<F> {
    fn sleep(&self, duration: Duration) {
        (self.0)(duration)
    }
}

impl<S: Sleeper + ?Sized> Sleeper for &S {
    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}
