use std::sync::atomic::AtomicBool;
use std::time::Duration;

use fortify_common::{Error, Result};
use fortify_concurrency::BoundedPool;

/// Optional hooks for [`via_pool`]: `on_task_timeout` replaces the
/// default `OperationTimedOut` failure when a timeout elapses,
/// `on_task_error` replaces a task's own propagated error (including a
/// panic caught by the pool), and `on_task_reject` replaces the default
/// `ThreadPoolRejected` failure on admission failure. Each defaults to
/// surfacing the corresponding error unchanged.
#[derive(Default)]
pub struct PoolGuardOptions<T> {
    pub on_task_timeout: Option<Box<dyn Fn() -> Result<T>>>,
    pub on_task_error: Option<Box<dyn Fn(Error) -> Result<T>>>,
    pub on_task_reject: Option<Box<dyn Fn() -> Result<T>>>,
}

/// Submits `task` and, if `timeout` is given,
/// waits at most that long for the result.
pub fn via_pool<T>(
    pool: &BoundedPool,
    timeout: Option<Duration>,
    options: &PoolGuardOptions<T>,
    task: impl FnOnce(&AtomicBool) -> Result<T> + Send + 'static,
) -> Result<T>
where
    T: Send + 'static,
{
    let result = match timeout {
        Some(timeout) => pool.submit_with_timeout(task, timeout),
        None => match pool.submit(task) {
            Ok(handle) => handle.await_blocking(),
            Err(err) => Err(err),
        },
    };

    match result {
        Ok(value) => Ok(value),
        Err(Error::ThreadPoolRejected { name }) => match &options.on_task_reject {
            Some(hook) => hook(),
            None => Err(Error::ThreadPoolRejected { name }),
        },
        Err(Error::OperationTimedOut { elapsed_ms, limit_ms }) => match &options.on_task_timeout {
            Some(hook) => hook(),
            None => Err(Error::OperationTimedOut { elapsed_ms, limit_ms }),
        },
        Err(err) => match &options.on_task_error {
            Some(hook) => hook(err),
            None => Err(err),
        },
    }
}
