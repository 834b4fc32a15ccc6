use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::thread::{self, JoinHandle};

use tracing::{debug, error, info, warn};

use mandelpool_core::{Complex, PixelRect, RenderParams, Viewport};

use crate::backend::Backend;
use crate::buffer::OutputImage;
use crate::generation::{Generation, GenerationSetup, LiveWorker};
use crate::histogram::Histogram;
use crate::iteration_buffer::IterationBuffer;
use crate::progress::RenderProgress;
use crate::sequence::WorkSequence;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A viewport mutation, applied between two generations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewportOp {
    /// Reset to the canonical framing of the whole set.
    Fit,
    /// Zoom by `factor` around pixel `(x, y)`; `factor < 1` zooms in.
    Zoom { x: f64, y: f64, factor: f64 },
    /// Shift by `(dx, dy)` pixels.
    Pan { dx: f64, dy: f64 },
    /// Show an arbitrary pixel rectangle across the full image.
    Show(PixelRect),
}

struct Running {
    generation: Arc<Generation>,
    handles: Vec<JoinHandle<()>>,
}

/// State that only changes at a generation boundary, guarded by one lock.
struct Control {
    params: RenderParams,
    viewport: Viewport,
    backend: Backend,
    active: bool,
    sequence: Option<WorkSequence>,
    iterations: Arc<IterationBuffer>,
    histogram: Arc<Histogram>,
    running: Option<Running>,
}

/// The progressive render engine.
///
/// Owns the output image and the worker pool of the current generation.
/// Every reconfiguration (parameters, viewport, size, backend, pause) is
/// synchronous: the running generation is canceled and its workers joined
/// before the change is applied and a new generation starts, so at most one
/// generation's workers are ever alive.
///
/// Presentation code polls [`current_image`](Self::current_image),
/// [`progress`](Self::progress) and [`elapsed_millis`](Self::elapsed_millis)
/// on its own timer; none of these take the reconfiguration lock.
pub struct Engine {
    control: Mutex<Control>,
    image: RwLock<Arc<OutputImage>>,
    progress: Arc<RenderProgress>,
    live: Arc<AtomicUsize>,
    generation: AtomicU64,
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

impl Engine {
    /// Create an engine and immediately start rendering `viewport`.
    pub fn new(viewport: Viewport, params: RenderParams) -> crate::Result<Self> {
        params.validate()?;
        let engine = Self {
            control: Mutex::new(Control {
                params,
                viewport,
                backend: Backend::default(),
                active: true,
                sequence: None,
                iterations: Arc::new(IterationBuffer::new(0)),
                histogram: Arc::new(Histogram::new(0)),
                running: None,
            }),
            image: RwLock::new(Arc::new(OutputImage::new(viewport.width, viewport.height))),
            progress: Arc::new(RenderProgress::new()),
            live: Arc::new(AtomicUsize::new(0)),
            generation: AtomicU64::new(0),
        };
        {
            let mut control = engine.lock();
            engine.start(&mut control);
        }
        Ok(engine)
    }

    /// An engine showing the whole set at the given image size.
    pub fn fitted(width: u32, height: u32, params: RenderParams) -> crate::Result<Self> {
        Self::new(Viewport::fitted(width, height)?, params)
    }

    fn lock(&self) -> MutexGuard<'_, Control> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ---------------------------------------------------------------------------
// Reconfiguration
// ---------------------------------------------------------------------------

impl Engine {
    /// Replace the render parameters, restarting the render.
    ///
    /// Invalid parameters are rejected before anything is touched; equal
    /// parameters are a no-op.
    pub fn configure(&self, params: RenderParams) -> crate::Result<()> {
        params.validate()?;
        let mut control = self.lock();
        if control.params == params {
            return Ok(());
        }
        self.stop(&mut control);
        debug!(?params, "Applying render parameters");
        control.params = params;
        if control.active {
            self.start(&mut control);
        }
        Ok(())
    }

    /// Apply a viewport operation and restart the render.
    ///
    /// While the new generation fills in, the image shows a nearest-neighbour
    /// resample of the previous frame.
    pub fn set_viewport(&self, op: ViewportOp) -> crate::Result<()> {
        let mut control = self.lock();
        let old = control.viewport;
        let mut next = old;
        match op {
            ViewportOp::Fit => {
                next.fit();
            }
            ViewportOp::Zoom { x, y, factor } => {
                next.zoom(x, y, factor)?;
            }
            ViewportOp::Pan { dx, dy } => {
                next.pan(dx, dy)?;
            }
            ViewportOp::Show(rect) => {
                next.show(rect)?;
            }
        }

        self.stop(&mut control);
        control.viewport = next;
        self.current_image().resample_from(source_rect(&old, &next));
        if control.active {
            self.start(&mut control);
        }
        Ok(())
    }

    pub fn fit(&self) -> crate::Result<()> {
        self.set_viewport(ViewportOp::Fit)
    }

    pub fn zoom(&self, x: f64, y: f64, factor: f64) -> crate::Result<()> {
        self.set_viewport(ViewportOp::Zoom { x, y, factor })
    }

    pub fn pan(&self, dx: f64, dy: f64) -> crate::Result<()> {
        self.set_viewport(ViewportOp::Pan { dx, dy })
    }

    pub fn show(&self, rect: PixelRect) -> crate::Result<()> {
        self.set_viewport(ViewportOp::Show(rect))
    }

    /// Change the image size, keeping origin and scale.
    ///
    /// The previous frame is stretched into the new image as a preview.
    pub fn resize(&self, width: u32, height: u32) -> crate::Result<()> {
        let mut control = self.lock();
        if control.viewport.width == width && control.viewport.height == height {
            return Ok(());
        }
        let next = control.viewport.resized(width, height)?;

        self.stop(&mut control);
        let scaled = OutputImage::scaled_from(&self.current_image(), width, height);
        *self.image.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(scaled);
        control.viewport = next;
        control.sequence = None;
        control.iterations = Arc::new(IterationBuffer::new(0));
        debug!(width, height, "Image resized");
        if control.active {
            self.start(&mut control);
        }
        Ok(())
    }

    /// Swap the source of pass-1 values.
    pub fn set_backend(&self, backend: Backend) {
        let mut control = self.lock();
        self.stop(&mut control);
        debug!(?backend, "Backend changed");
        control.backend = backend;
        if control.active {
            self.start(&mut control);
        }
    }

    /// Pause (`false`) or resume (`true`) rendering.
    ///
    /// Pausing cancels the running generation; changes made while paused
    /// are applied without rendering until the engine is resumed.
    pub fn set_active(&self, active: bool) {
        let mut control = self.lock();
        if control.active == active {
            return;
        }
        control.active = active;
        if active {
            self.start(&mut control);
        } else {
            self.stop(&mut control);
            info!("Rendering paused");
        }
    }

    /// Cancel and re-run the current configuration.
    pub fn restart(&self) {
        let mut control = self.lock();
        self.stop(&mut control);
        if control.active {
            self.start(&mut control);
        }
    }

    /// Block until the current generation's workers have exited, without
    /// canceling it.
    ///
    /// The reconfiguration lock is not held while waiting; the handles stay
    /// with the engine so a concurrent `stop` still joins them.
    pub fn wait(&self) {
        let generation = self
            .lock()
            .running
            .as_ref()
            .map(|running| Arc::clone(&running.generation));
        if let Some(generation) = generation {
            generation.wait_exited();
        }
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

impl Engine {
    /// The image currently being rendered into (may be mid-render).
    pub fn current_image(&self) -> Arc<OutputImage> {
        Arc::clone(&self.image.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Completion of the current generation in `[0, 1]`.
    pub fn progress(&self) -> f32 {
        self.progress.fraction()
    }

    /// Live duration of a running render, otherwise the last completed one.
    pub fn elapsed_millis(&self) -> u64 {
        self.progress.elapsed_millis()
    }

    pub fn is_complete(&self) -> bool {
        self.progress.is_complete()
    }

    /// Complex-plane point under a (fractional) pixel position.
    pub fn complex_coordinate_at(&self, px: f64, py: f64) -> Complex {
        self.lock().viewport.point_at(px, py)
    }

    pub fn params(&self) -> RenderParams {
        self.lock().params
    }

    pub fn viewport(&self) -> Viewport {
        self.lock().viewport
    }

    pub fn is_active(&self) -> bool {
        self.lock().active
    }

    /// Id of the most recently started generation (0 before the first).
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Number of worker threads currently alive.
    pub fn live_workers(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// Generation lifecycle
// ---------------------------------------------------------------------------

impl Engine {
    /// Cancel the running generation and join all its workers.
    fn stop(&self, control: &mut Control) {
        let Some(running) = control.running.take() else {
            return;
        };
        running.generation.cancel();
        for handle in running.handles {
            if handle.join().is_err() {
                warn!(generation = running.generation.id(), "Render worker panicked");
            }
        }
        if !self.progress.is_complete() {
            self.progress.abandon();
            debug!(generation = running.generation.id(), "Generation canceled");
        }
    }

    fn start(&self, control: &mut Control) {
        let params = control.params;
        let viewport = control.viewport;
        let total = viewport.pixel_count();

        let sequence = match &control.sequence {
            Some(seq) if seq.matches(total, params.shuffle) => seq.clone(),
            _ => {
                let seq = WorkSequence::new(total, params.shuffle);
                control.sequence = Some(seq.clone());
                seq
            }
        };
        if !params.histogram_coloring {
            if control.histogram.max_iterations() != 0 {
                control.histogram = Arc::new(Histogram::new(0));
            }
        } else if control.histogram.max_iterations() == params.max_iterations {
            control.histogram.reset();
        } else {
            control.histogram = Arc::new(Histogram::new(params.max_iterations));
        }
        if params.histogram_coloring && control.iterations.len() != total {
            control.iterations = Arc::new(IterationBuffer::new(total));
        }

        let id = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let workers = params.thread_count.max(1) as usize;
        self.progress.begin(total as u64 * params.pass_count());

        let generation = Arc::new(Generation::new(GenerationSetup {
            id,
            params,
            viewport,
            sequence,
            image: self.current_image(),
            iterations: Arc::clone(&control.iterations),
            histogram: Arc::clone(&control.histogram),
            progress: Arc::clone(&self.progress),
            backend: control.backend.clone(),
            workers,
        }));

        debug!(
            generation = id,
            threads = workers,
            total,
            histogram = params.histogram_coloring,
            algorithm = params.algorithm.label(),
            "Starting generation"
        );

        let mut handles = Vec::with_capacity(workers);
        for n in 0..workers {
            let worker = Arc::clone(&generation);
            let live = Arc::clone(&self.live);
            let spawned = thread::Builder::new()
                .name(format!("mandelpool-g{id}-w{n}"))
                .spawn(move || {
                    let _exit = worker.exit_guard();
                    let _alive = LiveWorker::enter(&live);
                    worker.run_worker();
                });
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(err) => {
                    error!(generation = id, %err, "Failed to spawn render worker");
                    self.abort(&generation, workers - n);
                    break;
                }
            }
        }

        control.running = Some(Running {
            generation,
            handles,
        });
    }

    /// Cancel a generation that cannot finish, stop its clock and release
    /// the slots of the `unspawned` workers it will never get.
    fn abort(&self, generation: &Generation, unspawned: usize) {
        generation.cancel();
        self.progress.abandon();
        generation.forfeit_workers(unspawned);
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        let control = self.control.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(running) = control.running.take() {
            running.generation.cancel();
            for handle in running.handles {
                let _ = handle.join();
            }
        }
    }
}

/// The rectangle of `old`'s pixel grid that `new` now shows.
fn source_rect(old: &Viewport, new: &Viewport) -> PixelRect {
    let k = new.scale / old.scale;
    let offset = new.origin - old.origin;
    PixelRect::new(
        offset.re / old.scale,
        -offset.im / old.scale,
        new.width as f64 * k,
        new.height as f64 * k,
    )
}
