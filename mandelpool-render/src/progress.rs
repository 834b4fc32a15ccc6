use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Largest `f32` below 1.0; reported until completion is recorded.
const ALMOST_DONE: f32 = 1.0 - f32::EPSILON / 2.0;

/// Lock-free progress and timing for the current render generation.
///
/// Workers call [`inc`](Self::inc) once per pixel per pass; the last worker
/// of a generation that was not canceled calls [`finish`](Self::finish).
/// `fraction()` only reports `1.0` once the render time has been frozen.
#[derive(Debug)]
pub struct RenderProgress {
    epoch: Instant,
    processed: AtomicU64,
    total: AtomicU64,
    started_nanos: AtomicU64,
    render_time_ms: AtomicU64,
    running: AtomicBool,
    complete: AtomicBool,
}

impl RenderProgress {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
            processed: AtomicU64::new(0),
            total: AtomicU64::new(0),
            started_nanos: AtomicU64::new(0),
            render_time_ms: AtomicU64::new(0),
            running: AtomicBool::new(false),
            complete: AtomicBool::new(false),
        }
    }

    /// Reset for a new generation with `total` work units (pixels × passes).
    pub fn begin(&self, total: u64) {
        self.complete.store(false, Ordering::Release);
        self.processed.store(0, Ordering::Relaxed);
        self.total.store(total, Ordering::Relaxed);
        self.started_nanos
            .store(self.epoch.elapsed().as_nanos() as u64, Ordering::Relaxed);
        self.running.store(true, Ordering::Release);
    }

    /// Increment completed work units by one.
    #[inline]
    pub fn inc(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    /// Freeze the render time for a completed generation and return it.
    pub fn finish(&self) -> Duration {
        let elapsed = self.running_for();
        self.render_time_ms
            .store(elapsed.as_millis() as u64, Ordering::Relaxed);
        self.running.store(false, Ordering::Release);
        self.complete.store(true, Ordering::Release);
        elapsed
    }

    /// Mark a canceled generation as no longer running; the last completed
    /// render time stays visible.
    pub fn abandon(&self) {
        self.running.store(false, Ordering::Release);
    }

    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    pub fn is_complete(&self) -> bool {
        self.complete.load(Ordering::Acquire)
    }

    /// Completion fraction in `[0, 1]`.
    pub fn fraction(&self) -> f32 {
        if self.is_complete() {
            return 1.0;
        }
        let total = self.total.load(Ordering::Relaxed);
        if total == 0 {
            return 0.0;
        }
        let f = (self.processed() as f64 / total as f64).min(1.0) as f32;
        f.min(ALMOST_DONE)
    }

    /// Live duration while running, otherwise the last completed render time.
    pub fn elapsed_millis(&self) -> u64 {
        if self.running.load(Ordering::Acquire) {
            self.running_for().as_millis() as u64
        } else {
            self.render_time_ms.load(Ordering::Relaxed)
        }
    }

    fn running_for(&self) -> Duration {
        let started = Duration::from_nanos(self.started_nanos.load(Ordering::Relaxed));
        self.epoch.elapsed().saturating_sub(started)
    }
}

impl Default for RenderProgress {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fraction_tracks_processed_units() {
        let p = RenderProgress::new();
        assert_eq!(p.fraction(), 0.0);
        p.begin(4);
        p.inc();
        assert!((p.fraction() - 0.25).abs() < 1e-6);
        p.inc();
        p.inc();
        p.inc();
        assert!(p.fraction() < 1.0, "1.0 is reserved for recorded completion");
        p.finish();
        assert_eq!(p.fraction(), 1.0);
        assert!(p.is_complete());
    }

    #[test]
    fn elapsed_freezes_on_finish() {
        let p = RenderProgress::new();
        p.begin(1);
        std::thread::sleep(Duration::from_millis(15));
        p.inc();
        let frozen = p.finish().as_millis() as u64;
        assert!(frozen >= 15);
        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(p.elapsed_millis(), frozen);
    }

    #[test]
    fn abandon_keeps_last_render_time() {
        let p = RenderProgress::new();
        p.begin(1);
        p.inc();
        let first = p.finish().as_millis() as u64;

        p.begin(100);
        assert!(!p.is_complete());
        std::thread::sleep(Duration::from_millis(5));
        p.abandon();
        assert_eq!(p.elapsed_millis(), first);
        assert!(p.fraction() < 1.0);
    }

    #[test]
    fn elapsed_is_live_while_running() {
        let p = RenderProgress::new();
        p.begin(10);
        std::thread::sleep(Duration::from_millis(10));
        assert!(p.elapsed_millis() >= 10);
    }
}
