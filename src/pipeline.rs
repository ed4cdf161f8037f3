//! Bounded parallel fan-out primitive.
//!
//! Every map- or array-valued field in the low-level model is built by
//! feeding its children through [`translate`]: a pool of blocking workers
//! pulls items from a channel, runs the per-item function, and a collector
//! restores source order by index. The first error cancels sibling tasks
//! through the shared [`Context`]; cancellation also propagates downward
//! from enclosing pipelines because contexts are shared by clone.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
};

use crossbeam_channel::{bounded, unbounded};

/// Marker for work abandoned because a sibling task failed first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

/// Shared cancellation signal plus the configured worker cap.
#[derive(Debug, Clone)]
pub struct Context {
    cancelled: Arc<AtomicBool>,
    max_workers: usize,
}

impl Context {
    /// Creates a context capping pools at `max_workers` threads; `0` means
    /// hardware concurrency.
    pub fn new(max_workers: usize) -> Self {
        Context {
            cancelled: Arc::new(AtomicBool::new(false)),
            max_workers,
        }
    }

    /// Signals every worker sharing this context to stop between items.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been signalled.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn workers_for(&self, items: usize) -> usize {
        let cap = if self.max_workers == 0 {
            usize::MAX
        } else {
            self.max_workers
        };

        num_cpus::get().min(items).min(cap).max(1)
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new(0)
    }
}

/// Runs `translate_fn` over every item on a bounded worker pool and returns
/// the outputs in input order.
///
/// The first task error cancels remaining work and is returned. All workers
/// have exited by the time this returns. Cancellation from an enclosing
/// pipeline surfaces as `E::from(Cancelled)`.
pub fn translate<I, O, E, F>(items: Vec<I>, ctx: &Context, translate_fn: F) -> Result<Vec<O>, E>
where
    I: Send,
    O: Send,
    E: From<Cancelled> + Send,
    F: Fn(usize, I) -> Result<O, E> + Sync,
{
    let count = items.len();

    if count == 0 {
        return Ok(Vec::new());
    }

    let workers = ctx.workers_for(count);

    if workers == 1 {
        let mut outputs = Vec::with_capacity(count);
        for (index, item) in items.into_iter().enumerate() {
            if ctx.is_cancelled() {
                return Err(Cancelled.into());
            }
            match translate_fn(index, item) {
                Ok(output) => outputs.push(output),
                Err(err) => {
                    ctx.cancel();
                    return Err(err);
                }
            }
        }
        return Ok(outputs);
    }

    let (work_tx, work_rx) = bounded::<(usize, I)>(workers);
    let (done_tx, done_rx) = unbounded::<(usize, Result<O, E>)>();

    let mut slots: Vec<Option<O>> = Vec::with_capacity(count);
    slots.resize_with(count, || None);
    let mut first_error: Option<E> = None;

    thread::scope(|scope| {
        for _ in 0..workers {
            let work_rx = work_rx.clone();
            let done_tx = done_tx.clone();
            let translate_fn = &translate_fn;

            scope.spawn(move || {
                while let Ok((index, item)) = work_rx.recv() {
                    // Checked between items, not just at dispatch.
                    if ctx.is_cancelled() {
                        break;
                    }
                    if done_tx.send((index, translate_fn(index, item))).is_err() {
                        break;
                    }
                }
            });
        }

        drop(work_rx);
        drop(done_tx);

        scope.spawn(move || {
            for entry in items.into_iter().enumerate() {
                // Disconnects once every worker has bailed out.
                if work_tx.send(entry).is_err() {
                    break;
                }
            }
        });

        for (index, result) in done_rx {
            match result {
                Ok(output) => slots[index] = Some(output),
                Err(err) => {
                    if first_error.is_none() {
                        ctx.cancel();
                        first_error = Some(err);
                    }
                }
            }
        }
    });

    if let Some(err) = first_error {
        return Err(err);
    }

    if ctx.is_cancelled() {
        return Err(Cancelled.into());
    }

    let mut outputs = Vec::with_capacity(count);
    for slot in slots {
        match slot {
            Some(output) => outputs.push(output),
            // Unreachable without cancellation or an error, both handled
            // above; kept as a guard instead of unwrapping.
            None => return Err(Cancelled.into()),
        }
    }

    Ok(outputs)
}

#[cfg(test)]
mod tests {
    use std::{sync::atomic::AtomicUsize, time::Duration};

    use pretty_assertions::assert_eq;

    use super::*;

    #[derive(Debug, PartialEq)]
    struct TestError(String);

    impl From<Cancelled> for TestError {
        fn from(_: Cancelled) -> Self {
            TestError("cancelled".to_owned())
        }
    }

    #[test]
    fn outputs_restore_input_order() {
        let items: Vec<usize> = (0..64).collect();
        let ctx = Context::default();

        let outputs = translate(items, &ctx, |index, item| {
            // Stagger completion so collection order differs from input.
            if index % 2 == 0 {
                thread::sleep(Duration::from_millis(2));
            }
            Ok::<_, TestError>(item * 10)
        })
        .unwrap();

        assert_eq!(outputs, (0..64).map(|n| n * 10).collect::<Vec<_>>());
    }

    #[test]
    fn empty_input_is_a_no_op() {
        let ctx = Context::default();
        let outputs: Vec<usize> = translate(Vec::<usize>::new(), &ctx, |_, item| {
            Ok::<_, TestError>(item)
        })
        .unwrap();

        assert!(outputs.is_empty());
    }

    #[test]
    fn first_error_cancels_siblings() {
        let ctx = Context::default();
        let processed = AtomicUsize::new(0);

        let result = translate((0..1000).collect::<Vec<usize>>(), &ctx, |_, item| {
            processed.fetch_add(1, Ordering::SeqCst);
            if item == 3 {
                Err(TestError("boom".to_owned()))
            } else {
                thread::sleep(Duration::from_millis(1));
                Ok(item)
            }
        });

        assert_eq!(result, Err(TestError("boom".to_owned())));
        assert!(ctx.is_cancelled());
        assert!(processed.load(Ordering::SeqCst) < 1000);
    }

    #[test]
    fn external_cancellation_propagates() {
        let ctx = Context::default();
        ctx.cancel();

        let result = translate(vec![1usize], &ctx, |_, item| Ok::<_, TestError>(item));
        assert_eq!(result, Err(TestError("cancelled".to_owned())));
    }

    #[test]
    fn worker_cap_is_honoured() {
        let ctx = Context::new(2);
        assert_eq!(ctx.workers_for(100), 2.min(num_cpus::get()));
        assert_eq!(ctx.workers_for(1), 1);
    }
}
