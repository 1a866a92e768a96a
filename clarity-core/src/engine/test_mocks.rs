//! Mock implementations for testing the quality engine.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::clock::Clock;
use crate::surface::{
    OptionLabel, ProbeError, QualitySurface, SurfaceError, SurfaceId, SurfaceProbe, option_labels,
};

/// Clock whose time only moves when something sleeps on it or a test
/// advances it. Clones share the same timeline.
#[derive(Debug, Clone)]
pub struct ManualClock {
    inner: Arc<Mutex<ManualClockState>>,
}

#[derive(Debug)]
struct ManualClockState {
    now: Instant,
    sleeps: Vec<Duration>,
}

impl ManualClock {
    /// Creates a clock starting at the current instant.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ManualClockState {
                now: Instant::now(),
                sleeps: Vec::new(),
            })),
        }
    }

    /// Moves time forward without recording a sleep.
    pub fn advance(&self, duration: Duration) {
        self.inner.lock().now += duration;
    }

    /// Every sleep requested so far, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.inner.lock().sleeps.clone()
    }

    /// Total time slept.
    pub fn slept(&self) -> Duration {
        self.inner.lock().sleeps.iter().sum()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.inner.lock().now
    }

    async fn sleep(&self, duration: Duration) {
        {
            let mut state = self.inner.lock();
            state.now += duration;
            state.sleeps.push(duration);
        }
        tokio::task::yield_now().await;
    }
}

/// Scriptable quality surface. Clones share state, so a test can keep one
/// clone for assertions while the engine owns another.
#[derive(Debug, Clone)]
pub struct MockSurface {
    id: SurfaceId,
    supports_range: bool,
    inner: Arc<MockSurfaceState>,
}

#[derive(Debug, Default)]
struct MockSurfaceState {
    options: Mutex<Vec<OptionLabel>>,
    current: Mutex<Option<OptionLabel>>,
    applied: Mutex<Vec<OptionLabel>>,
    ranges: Mutex<Vec<(OptionLabel, OptionLabel)>>,
    release_count: AtomicUsize,
    fail_set: AtomicBool,
    fail_range: AtomicBool,
}

impl MockSurface {
    /// Creates a surface offering `labels`, best first.
    pub fn new<I, S>(id: SurfaceId, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let inner = MockSurfaceState {
            options: Mutex::new(option_labels(labels)),
            ..MockSurfaceState::default()
        };
        Self {
            id,
            supports_range: false,
            inner: Arc::new(inner),
        }
    }

    /// Enables the quality range capability.
    pub fn with_range_support(mut self) -> Self {
        self.supports_range = true;
        self
    }

    /// Replaces the listed options.
    pub fn set_options<I, S>(&self, labels: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        *self.inner.options.lock() = option_labels(labels);
    }

    /// Sets the option reported as active.
    pub fn set_current(&self, label: Option<&str>) {
        *self.inner.current.lock() = label.map(OptionLabel::new);
    }

    /// Makes primary selections fail.
    pub fn set_fail_set(&self, fail: bool) {
        self.inner.fail_set.store(fail, Ordering::SeqCst);
    }

    /// Makes range pins fail.
    pub fn set_fail_range(&self, fail: bool) {
        self.inner.fail_range.store(fail, Ordering::SeqCst);
    }

    /// Options selected so far, in order.
    pub fn applied(&self) -> Vec<OptionLabel> {
        self.inner.applied.lock().clone()
    }

    /// Ranges pinned so far, in order.
    pub fn ranges(&self) -> Vec<(OptionLabel, OptionLabel)> {
        self.inner.ranges.lock().clone()
    }

    /// Number of times the surface was released.
    pub fn release_count(&self) -> usize {
        self.inner.release_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QualitySurface for MockSurface {
    fn id(&self) -> SurfaceId {
        self.id
    }

    async fn list_available_options(&self) -> Result<Vec<OptionLabel>, SurfaceError> {
        Ok(self.inner.options.lock().clone())
    }

    async fn current_option(&self) -> Result<Option<OptionLabel>, SurfaceError> {
        tokio::task::yield_now().await;
        Ok(self.inner.current.lock().clone())
    }

    async fn set_option(&self, label: &OptionLabel) -> Result<(), SurfaceError> {
        tokio::task::yield_now().await;
        if self.inner.fail_set.load(Ordering::SeqCst) {
            return Err(SurfaceError::Environment {
                reason: format!("player rejected {label}"),
            });
        }
        if !self.inner.options.lock().contains(label) {
            return Err(SurfaceError::OptionUnavailable {
                label: label.clone(),
            });
        }
        self.inner.applied.lock().push(label.clone());
        *self.inner.current.lock() = Some(label.clone());
        Ok(())
    }

    fn supports_range(&self) -> bool {
        self.supports_range
    }

    async fn set_option_range(
        &self,
        low: &OptionLabel,
        high: &OptionLabel,
    ) -> Result<(), SurfaceError> {
        if !self.supports_range {
            return Err(SurfaceError::Unsupported {
                capability: "quality range",
            });
        }
        if self.inner.fail_range.load(Ordering::SeqCst) {
            return Err(SurfaceError::Environment {
                reason: "range pin rejected".to_string(),
            });
        }
        self.inner.ranges.lock().push((low.clone(), high.clone()));
        Ok(())
    }

    async fn release(&self) {
        self.inner.release_count.fetch_add(1, Ordering::SeqCst);
    }
}

/// Scriptable surface probe. Clones share the call counter and the surface.
#[derive(Debug, Clone)]
pub struct MockProbe {
    calls: Arc<AtomicUsize>,
    /// Calls answered with "nothing found" before the surface appears
    absent_calls: usize,
    /// Calls answered with an error before the surface appears
    failing_calls: usize,
    surface: Arc<Mutex<Option<MockSurface>>>,
}

impl MockProbe {
    fn scripted(absent_calls: usize, failing_calls: usize, surface: Option<MockSurface>) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            absent_calls,
            failing_calls,
            surface: Arc::new(Mutex::new(surface)),
        }
    }

    /// A probe that never finds anything.
    pub fn never_ready() -> Self {
        Self::scripted(0, 0, None)
    }

    /// A probe that finds `surface` on call number `call` (1-based).
    pub fn ready_after(call: usize, surface: MockSurface) -> Self {
        Self::scripted(call.saturating_sub(1), 0, Some(surface))
    }

    /// A probe that errors `failures` times before finding `surface`.
    pub fn failing_then_ready(failures: usize, surface: MockSurface) -> Self {
        Self::scripted(0, failures, Some(surface))
    }

    /// A probe that finds `surface` on every call.
    pub fn always(surface: MockSurface) -> Self {
        Self::scripted(0, 0, Some(surface))
    }

    /// Swaps the surface found from now on. `None` hides it.
    pub fn set_surface(&self, surface: Option<MockSurface>) {
        *self.surface.lock() = surface;
    }

    /// Number of probe calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SurfaceProbe for MockProbe {
    type Surface = MockSurface;

    async fn probe(&mut self) -> Result<Option<MockSurface>, ProbeError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

        if call <= self.failing_calls {
            return Err(ProbeError::Environment {
                reason: "player script not loaded".to_string(),
            });
        }
        if call <= self.failing_calls + self.absent_calls {
            return Ok(None);
        }
        Ok(self.surface.lock().clone())
    }
}
