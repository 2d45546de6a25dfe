use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use tracing::warn;

use crate::action::Action;
use crate::params::ParameterSet;
use crate::types::{Envelope, FailureRecord, ResultEntry, Target};

/// Invoke `action` once per target and collect the outcomes.
///
/// The returned envelope always holds exactly one entry per target, in target
/// order. A failing invocation (an `Err` or a panic) becomes a failure entry
/// and never stops the remaining targets from running. `verbose` controls
/// whether failure entries carry diagnostic detail.
///
/// With `workers > 1` targets are spread over a bounded pool of scoped
/// threads; each outcome is written to the slot of its target index, and the
/// envelope is built only after every worker has finished.
pub fn dispatch(
    action: &dyn Action,
    targets: &[Target],
    params: &ParameterSet,
    verbose: bool,
    workers: usize,
) -> Envelope {
    let results = if workers <= 1 || targets.len() <= 1 {
        targets
            .iter()
            .map(|target| invoke_one(action, target, params, verbose))
            .collect()
    } else {
        dispatch_pooled(action, targets, params, verbose, workers)
    };
    Envelope { results }
}

fn dispatch_pooled(
    action: &dyn Action,
    targets: &[Target],
    params: &ParameterSet,
    verbose: bool,
    workers: usize,
) -> Vec<ResultEntry> {
    let mut slots: Vec<Option<ResultEntry>> = vec![None; targets.len()];
    let next = AtomicUsize::new(0);

    thread::scope(|scope| {
        let mut handles = Vec::with_capacity(workers);
        for _ in 0..workers.min(targets.len()) {
            handles.push(scope.spawn(|| {
                let mut done = Vec::new();
                loop {
                    let index = next.fetch_add(1, Ordering::Relaxed);
                    let Some(target) = targets.get(index) else {
                        break;
                    };
                    done.push((index, invoke_one(action, target, params, verbose)));
                }
                done
            }));
        }

        for handle in handles {
            match handle.join() {
                Ok(done) => {
                    for (index, entry) in done {
                        if let Some(slot) = slots.get_mut(index) {
                            *slot = Some(entry);
                        }
                    }
                }
                Err(_) => warn!(action = action.name(), "dispatch worker terminated abnormally"),
            }
        }
    });

    // A slot can only be empty if its worker died outside `invoke_one`.
    slots
        .into_iter()
        .map(|slot| slot.unwrap_or_else(|| ResultEntry::Failure(FailureRecord::action_failed(None))))
        .collect()
}

fn invoke_one(
    action: &dyn Action,
    target: &Target,
    params: &ParameterSet,
    verbose: bool,
) -> ResultEntry {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| action.invoke(target, params)));
    let diagnostic = match outcome {
        Ok(Ok(value)) => return ResultEntry::Success(value),
        Ok(Err(err)) => format!("{err:#}"),
        Err(payload) => format!("action panicked: {}", panic_message(payload.as_ref())),
    };
    warn!(
        action = action.name(),
        target = %target,
        error = %diagnostic,
        "action execution failed"
    );
    ResultEntry::Failure(FailureRecord::action_failed(verbose.then_some(diagnostic)))
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}
