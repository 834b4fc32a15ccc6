use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, OnceLock, PoisonError};
use std::time::Duration;

use tracing::{debug, info, warn};

use mandelpool_core::{evaluate, Complex, RenderParams, Viewport};

use crate::backend::{sanitize_batch, Backend};
use crate::buffer::OutputImage;
use crate::color::iteration_color;
use crate::histogram::{Equalizer, Histogram};
use crate::iteration_buffer::IterationBuffer;
use crate::progress::RenderProgress;
use crate::sequence::WorkSequence;

/// How long a worker sleeps at the inter-pass barrier before re-checking
/// for cancellation.
const BARRIER_POLL: Duration = Duration::from_millis(10);

// ---------------------------------------------------------------------------
// Latch
// ---------------------------------------------------------------------------

/// Count-down latch used as the barrier between pass 1 and pass 2.
#[derive(Debug)]
struct Latch {
    count: Mutex<usize>,
    released: Condvar,
}

impl Latch {
    fn new(count: usize) -> Self {
        Self {
            count: Mutex::new(count),
            released: Condvar::new(),
        }
    }

    fn count_down(&self) {
        let mut count = self.count.lock().unwrap_or_else(PoisonError::into_inner);
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.released.notify_all();
        }
    }

    /// Wait up to `timeout`; returns `true` once the count has reached zero.
    fn wait_timeout(&self, timeout: Duration) -> bool {
        let count = self.count.lock().unwrap_or_else(PoisonError::into_inner);
        if *count == 0 {
            return true;
        }
        let (count, _) = self
            .released
            .wait_timeout(count, timeout)
            .unwrap_or_else(PoisonError::into_inner);
        *count == 0
    }

    /// Block until the count reaches zero.
    fn wait(&self) {
        let mut count = self.count.lock().unwrap_or_else(PoisonError::into_inner);
        while *count > 0 {
            count = self
                .released
                .wait(count)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Wake all waiters so they re-check their exit condition.
    fn wake(&self) {
        let _guard = self.count.lock().unwrap_or_else(PoisonError::into_inner);
        self.released.notify_all();
    }
}

/// Counts a latch down when dropped, including on unwind.
pub(crate) struct CountDownOnDrop<'a>(&'a Latch);

impl Drop for CountDownOnDrop<'_> {
    fn drop(&mut self) {
        self.0.count_down();
    }
}

// ---------------------------------------------------------------------------
// Live worker accounting
// ---------------------------------------------------------------------------

/// Increments a live-worker counter for as long as it is held.
pub(crate) struct LiveWorker(Arc<AtomicUsize>);

impl LiveWorker {
    pub(crate) fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for LiveWorker {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// Everything a generation's workers share.
pub(crate) struct GenerationSetup {
    pub id: u64,
    pub params: RenderParams,
    pub viewport: Viewport,
    pub sequence: WorkSequence,
    pub image: Arc<OutputImage>,
    pub iterations: Arc<IterationBuffer>,
    pub histogram: Arc<Histogram>,
    pub progress: Arc<RenderProgress>,
    pub backend: Backend,
    pub workers: usize,
}

/// One render attempt over a fixed viewport and parameter set.
///
/// Workers claim pixel positions from `first_cursor` (pass 1) and, with
/// histogram coloring, from `second_cursor` after every worker has passed
/// the barrier (pass 2). Cancellation is cooperative: the flag is checked
/// once per claimed pixel and while waiting at the barrier.
pub(crate) struct Generation {
    id: u64,
    params: RenderParams,
    viewport: Viewport,
    sequence: WorkSequence,
    image: Arc<OutputImage>,
    iterations: Arc<IterationBuffer>,
    histogram: Arc<Histogram>,
    progress: Arc<RenderProgress>,
    backend: Backend,

    first_cursor: AtomicUsize,
    second_cursor: AtomicUsize,
    cancelled: AtomicBool,
    pass_one_done: Latch,
    exited: Latch,
    unfinished: AtomicUsize,
    equalizer: OnceLock<Equalizer>,
    batch: OnceLock<Option<Vec<f64>>>,
}

impl Generation {
    pub(crate) fn new(setup: GenerationSetup) -> Self {
        let workers = setup.workers.max(1);
        Self {
            id: setup.id,
            params: setup.params,
            viewport: setup.viewport,
            sequence: setup.sequence,
            image: setup.image,
            iterations: setup.iterations,
            histogram: setup.histogram,
            progress: setup.progress,
            backend: setup.backend,
            first_cursor: AtomicUsize::new(0),
            second_cursor: AtomicUsize::new(0),
            cancelled: AtomicBool::new(false),
            pass_one_done: Latch::new(workers),
            exited: Latch::new(workers),
            unfinished: AtomicUsize::new(workers),
            equalizer: OnceLock::new(),
            batch: OnceLock::new(),
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    /// Signal all workers to stop at their next check.
    pub(crate) fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.pass_one_done.wake();
    }

    #[inline]
    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Block until every worker has returned from [`run_worker`](Self::run_worker).
    pub(crate) fn wait_exited(&self) {
        self.exited.wait();
    }

    /// Account for `count` workers that were never started.
    pub(crate) fn forfeit_workers(&self, count: usize) {
        for _ in 0..count {
            self.pass_one_done.count_down();
            self.exited.count_down();
        }
        self.release_slots(count);
    }

    /// Held by a worker thread for its whole lifetime; releasing it is what
    /// [`wait_exited`](Self::wait_exited) waits for.
    pub(crate) fn exit_guard(&self) -> CountDownOnDrop<'_> {
        CountDownOnDrop(&self.exited)
    }

    /// Body of one worker thread.
    pub(crate) fn run_worker(&self) {
        self.first_pass();
        self.pass_one_done.count_down();

        if self.params.histogram_coloring {
            if !self.wait_for_first_pass() {
                return;
            }
            self.second_pass();
        }

        self.finish_worker();
    }

    fn total(&self) -> usize {
        self.sequence.len()
    }

    fn first_pass(&self) {
        let batch = match &self.backend {
            Backend::Workers => None,
            Backend::Batch(_) => match self.batch_values() {
                Some(values) => Some(values),
                None => {
                    self.cancel();
                    self.progress.abandon();
                    return;
                }
            },
        };

        let total = self.total();
        let width = self.viewport.width as usize;
        let max_iterations = self.params.max_iterations;
        let record = self.params.histogram_coloring;

        loop {
            let pos = self.first_cursor.fetch_add(1, Ordering::Relaxed);
            if pos >= total || self.is_cancelled() {
                break;
            }
            let index = self.sequence.get(pos);
            let value = match batch {
                Some(values) => values[pos],
                None => {
                    let (px, py) = ((index % width) as u32, (index / width) as u32);
                    evaluate(&self.params, self.viewport.pixel_to_complex(px, py))
                }
            };

            self.image.set(index, iteration_color(value, max_iterations));
            if record {
                self.histogram.record(value);
                self.iterations.set(index, value);
            }
            self.progress.inc();
        }
    }

    /// Pass-1 values for the batch backend, computed once by whichever
    /// worker gets here first; indexed by cursor position.
    fn batch_values(&self) -> Option<&[f64]> {
        let Backend::Batch(evaluator) = &self.backend else {
            return None;
        };
        self.batch
            .get_or_init(|| {
                if self.is_cancelled() {
                    return None;
                }
                let width = self.viewport.width as usize;
                let points: Vec<Complex> = (0..self.total())
                    .map(|pos| {
                        let index = self.sequence.get(pos);
                        self.viewport
                            .pixel_to_complex((index % width) as u32, (index / width) as u32)
                    })
                    .collect();
                debug!(generation = self.id, points = points.len(), "Dispatching batch");
                let values = evaluator.compute_batch(
                    &points,
                    self.params.max_radius,
                    self.params.max_iterations,
                );
                match sanitize_batch(values, points.len(), self.params.max_iterations) {
                    Ok(values) => Some(values),
                    Err(err) => {
                        warn!(
                            generation = self.id,
                            %err,
                            "Batch backend failed; generation aborted"
                        );
                        None
                    }
                }
            })
            .as_deref()
    }

    /// Block at the barrier until every worker has finished pass 1.
    /// Returns `false` if the generation was canceled meanwhile.
    fn wait_for_first_pass(&self) -> bool {
        loop {
            if self.is_cancelled() {
                return false;
            }
            if self.pass_one_done.wait_timeout(BARRIER_POLL) {
                return !self.is_cancelled();
            }
        }
    }

    fn second_pass(&self) {
        let total = self.total();
        let equalizer = self
            .equalizer
            .get_or_init(|| Equalizer::new(&self.histogram, &self.iterations, total));

        loop {
            let pos = self.second_cursor.fetch_add(1, Ordering::Relaxed);
            if pos >= total || self.is_cancelled() {
                break;
            }
            let index = self.sequence.get(pos);
            self.image.set(index, equalizer.color(self.iterations.get(index)));
            self.progress.inc();
        }
    }

    fn finish_worker(&self) {
        self.release_slots(1);
    }

    /// The last worker out of an uncanceled generation records completion.
    fn release_slots(&self, count: usize) {
        if count == 0 {
            return;
        }
        if self.unfinished.fetch_sub(count, Ordering::AcqRel) == count && !self.is_cancelled() {
            let elapsed = self.progress.finish();
            info!(
                generation = self.id,
                elapsed_ms = elapsed.as_millis() as u64,
                pixels = self.total(),
                histogram = self.params.histogram_coloring,
                "Render complete"
            );
        }
    }
}
