//! One-shot fault-injection hooks consulted on the commit path.
//!
//! Each flag is cleared atomically with its observation (`swap`), so a
//! setter racing a concurrent `commit` call races benignly: whichever side
//! observes `true` first gets to act on it, and every other observer sees
//! `false`.

use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Default)]
pub struct FaultInjection {
    throw_before_commit: AtomicBool,
    throw_after_commit: AtomicBool,
}

impl FaultInjection {
    pub fn set_throw_before_commit(&self, value: bool) {
        self.throw_before_commit.store(value, Ordering::SeqCst);
    }

    pub fn set_throw_after_commit(&self, value: bool) {
        self.throw_after_commit.store(value, Ordering::SeqCst);
    }

    /// Observes and clears `throw_before_commit` in one atomic step.
    pub(crate) fn test_and_clear_before_commit(&self) -> bool {
        self.throw_before_commit.swap(false, Ordering::SeqCst)
    }

    /// Observes and clears `throw_after_commit` in one atomic step.
    pub(crate) fn test_and_clear_after_commit(&self) -> bool {
        self.throw_after_commit.swap(false, Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_is_one_shot() {
        let faults = FaultInjection::default();
        faults.set_throw_before_commit(true);
        assert!(faults.test_and_clear_before_commit());
        assert!(!faults.test_and_clear_before_commit());
    }

    #[test]
    fn flags_are_independent() {
        let faults = FaultInjection::default();
        faults.set_throw_after_commit(true);
        assert!(!faults.test_and_clear_before_commit());
        assert!(faults.test_and_clear_after_commit());
    }
}
