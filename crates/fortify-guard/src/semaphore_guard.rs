use std::time::Duration;

use fortify_common::{Error, Result};
use fortify_concurrency::Semaphore;

struct ReleaseOnDrop<'a> {
    sem: &'a Semaphore,
}

impl Drop for ReleaseOnDrop<'_> {
    fn drop(&mut self) {
        self.sem.release();
    }
}

/// Optional hooks for [`via_semaphore`]/[`via_semaphore_with_timeout`]:
/// `on_semaphore_reject` replaces the default `SemaphoreRejected`
/// failure when no permit becomes available. Defaults to surfacing
/// that error unchanged.
#[derive(Default)]
pub struct SemaphoreGuardOptions<T> {
    pub on_semaphore_reject: Option<Box<dyn Fn(&str) -> Result<T>>>,
}

fn rejected<T>(sem: &Semaphore, options: &SemaphoreGuardOptions<T>) -> Result<T> {
    match &options.on_semaphore_reject {
        Some(hook) => hook(sem.name()),
        None => Err(Error::SemaphoreRejected {
            name: sem.name().to_string(),
        }),
    }
}

/// Denies with `SemaphoreRejected` (or `options.on_semaphore_reject`,
/// if set) when no permit is available, otherwise runs `task` inside a
/// scope that guarantees `release` on every exit path, including a
/// panic unwinding through `task`.
pub fn via_semaphore<T>(sem: &Semaphore, options: &SemaphoreGuardOptions<T>, task: impl FnOnce() -> Result<T>) -> Result<T> {
    if !sem.try_acquire() {
        return rejected(sem, options);
    }
    let _release = ReleaseOnDrop { sem };
    task()
}

/// As [`via_semaphore`], but waits up to `timeout` for a permit instead
/// of failing immediately.
pub fn via_semaphore_with_timeout<T>(
    sem: &Semaphore,
    timeout: Duration,
    options: &SemaphoreGuardOptions<T>,
    task: impl FnOnce() -> Result<T>,
) -> Result<T> {
    if !sem.try_acquire_timeout(timeout) {
        return rejected(sem, options);
    }
    let _release = ReleaseOnDrop { sem };
    task()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn semaphore_rejection_then_recovery() {
        let sem = Semaphore::new("s4", 10, false);
        for _ in 0..10 {
            assert!(sem.try_acquire());
        }

        let denied = via_semaphore(&sem, &SemaphoreGuardOptions::default(), || Ok(2 + 3));
        assert!(matches!(denied, Err(Error::SemaphoreRejected { .. })));

        sem.release();
        let allowed = via_semaphore(&sem, &SemaphoreGuardOptions::default(), || Ok(2 + 3));
        assert_eq!(allowed.unwrap(), 5);
    }

    #[test]
    fn release_happens_even_on_panic() {
        let sem = Semaphore::new("s", 1, false);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            via_semaphore(&sem, &SemaphoreGuardOptions::default(), || -> Result<()> { panic!("boom") })
        }));
        assert!(result.is_err());
        assert_eq!(sem.count_acquired(), 0);
    }

    #[test]
    fn on_semaphore_reject_hook_overrides_default_error() {
        let sem = Semaphore::new("s4b", 1, false);
        assert!(sem.try_acquire());

        let calls = Arc::new(AtomicUsize::new(0));
        let calls_hook = calls.clone();
        let options = SemaphoreGuardOptions {
            on_semaphore_reject: Some(Box::new(move |name: &str| {
                calls_hook.fetch_add(1, Ordering::SeqCst);
                Ok(name.len())
            })),
        };
        let result = via_semaphore(&sem, &options, || Ok(0));
        assert_eq!(result.unwrap(), "s4b".len());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
