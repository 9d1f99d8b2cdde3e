use fortify_common::{Error, Result};

use crate::classifier::ResultClassifier;

type Step<T> = Box<dyn FnOnce() -> Result<T>>;

/// Optional hooks for [`via_fallback`]: `pre_invoke` fires
/// before each attempt (primary or alternate), `post_result`/`post_error`
/// fire once on whichever attempt's outcome is finally surfaced.
/// `is_recoverable` gates which error classes are even eligible to fall
/// through to the next alternate; errors it rejects propagate
/// immediately. The default accepts every error as recoverable.
#[derive(Default)]
pub struct FallbackOptions<T> {
    pub pre_invoke: Option<Box<dyn Fn(usize)>>,
    pub post_result: Option<Box<dyn Fn(&T)>>,
    pub post_error: Option<Box<dyn Fn(&Error)>>,
    pub is_recoverable: Option<Box<dyn Fn(&Error) -> bool>>,
}

/// Evaluates `primary` first, then each of `alternates` in order, stopping at the first
/// success-classified result. If the final step still fails (by
/// classification or by error), that outcome is surfaced via
/// `post_result`/`post_error` and returned/re-thrown.
pub fn via_fallback<T>(
    alternates: Vec<Step<T>>,
    primary: impl FnOnce() -> Result<T> + 'static,
    classifier: &dyn ResultClassifier<T>,
    options: FallbackOptions<T>,
) -> Result<T> {
    let mut steps: Vec<Step<T>> = Vec::with_capacity(alternates.len() + 1);
    steps.push(Box::new(primary));
    steps.extend(alternates);
    let last = steps.len() - 1;

    for (i, step) in steps.into_iter().enumerate() {
        if let Some(pre) = &options.pre_invoke {
            pre(i);
        }
        match step() {
            Ok(value) => {
                if classifier.success_result(&value) || i == last {
                    if let Some(post) = &options.post_result {
                        post(&value);
                    }
                    return Ok(value);
                }
            }
            Err(err) => {
                let recoverable = options.is_recoverable.as_ref().map(|f| f(&err)).unwrap_or(true);
                if !recoverable || i == last {
                    if let Some(post) = &options.post_error {
                        post(&err);
                    }
                    return Err(err);
                }
            }
        }
    }
    unreachable!("steps is non-empty, the last index always returns")
}
