//! Draggable bottom-sheet state machine
//!
//! A sheet is either `Closed`, resting `Open` at one of its configured snap
//! heights, or `Dragging` under the user's finger. `offset` is the vertical
//! translation from the resting position: `0.0` means fully open at the
//! current snap height, larger values slide the sheet downward.
//!
//! Animations are delegated to an [`AnimationDriver`]. The controller keeps
//! a generation counter; every animation start, drag grab, and disposal
//! bumps it, and frames carrying a stale generation are dropped. That is
//! what guarantees a single live animation per sheet and that nothing
//! mutates state after disposal. When a drag grabs a sheet mid-animation,
//! the last applied frame value becomes the drag baseline (`gesture_origin`)
//! instead of being discarded.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};

/// Extra travel past the sheet's own height used when animating it out.
const DISMISS_MARGIN: f64 = 24.0;

/// Phase of the sheet state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetPhase {
    /// Fully off-screen
    Closed,
    /// Resting at (or animating toward) a snap height
    Open,
    /// Following the user's finger
    Dragging,
}

/// Lifecycle events emitted by [`SheetController`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetEvent {
    /// The sheet finished opening at the given snap index
    Opened {
        /// Index into the configured snap heights
        snap_index: usize,
    },
    /// The sheet settled at a lower snap index after a drag
    Snapped {
        /// Index into the configured snap heights
        snap_index: usize,
    },
    /// The sheet finished closing
    Closed,
}

/// Configuration for one sheet instance
///
/// Distinct sheets use distinct thresholds: the location picker has a full
/// and a partial snap height, while the checkout drawer has a single snap
/// height and never demotes.
#[derive(Debug, Clone)]
pub struct SheetConfig {
    /// Ordered resting heights, tallest first (index 0 = fully expanded)
    pub snap_heights: Vec<f64>,
    /// Drag distance beyond which release dismisses the sheet
    pub dismiss_distance: f64,
    /// Downward release velocity (px/s) beyond which release dismisses
    pub dismiss_velocity: f64,
    /// Drag distance beyond which release demotes to the next lower snap;
    /// ignored when only one snap height is configured
    pub demote_distance: f64,
}

impl SheetConfig {
    /// Create a config with default thresholds
    pub fn new(snap_heights: Vec<f64>) -> Self {
        debug_assert!(!snap_heights.is_empty(), "a sheet needs at least one snap height");
        Self {
            snap_heights,
            dismiss_distance: 140.0,
            dismiss_velocity: 900.0,
            demote_distance: 60.0,
        }
    }

    /// Config for a sheet with a single resting height
    pub fn single(height: f64) -> Self {
        Self::new(vec![height])
    }

    /// Set the dismiss distance threshold
    pub fn with_dismiss_distance(mut self, distance: f64) -> Self {
        self.dismiss_distance = distance;
        self
    }

    /// Set the dismiss velocity threshold
    pub fn with_dismiss_velocity(mut self, velocity: f64) -> Self {
        self.dismiss_velocity = velocity;
        self
    }

    /// Set the demote distance threshold
    pub fn with_demote_distance(mut self, distance: f64) -> Self {
        self.demote_distance = distance;
        self
    }

    fn height_at(&self, snap_index: usize) -> f64 {
        self.snap_heights[snap_index.min(self.snap_heights.len() - 1)]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Completion {
    /// Settle open at `snap_index`, optionally announcing the arrival
    Settle {
        snap_index: usize,
        emit: Option<SheetEvent>,
    },
    /// Finish the close and announce it
    Close,
}

struct SheetInner {
    phase: SheetPhase,
    snap_index: usize,
    offset: f64,
    gesture_origin: f64,
    generation: u64,
    pending_close: bool,
    disposed: bool,
}

struct Shared {
    inner: Mutex<SheetInner>,
    offset_tx: watch::Sender<f64>,
    events_tx: broadcast::Sender<SheetEvent>,
}

/// Sink through which an [`AnimationDriver`] reports interpolated values
///
/// The sink is bound to the generation that started the animation; frames
/// and completions arriving after the animation was superseded (newer
/// animation, drag grab, disposal) are dropped.
pub struct AnimationSink {
    shared: Arc<Shared>,
    generation: u64,
    completion: Completion,
}

impl AnimationSink {
    /// Apply one interpolated offset frame
    pub fn frame(&self, value: f64) {
        let mut inner = self.shared.inner.lock();
        if inner.disposed || inner.generation != self.generation {
            return;
        }
        inner.offset = value.max(0.0);
        let offset = inner.offset;
        drop(inner);
        self.shared.offset_tx.send_replace(offset);
    }

    /// Mark the animation finished, applying its end-state transition
    pub fn complete(self) {
        let mut inner = self.shared.inner.lock();
        if inner.disposed || inner.generation != self.generation {
            return;
        }

        match self.completion {
            Completion::Settle { snap_index, emit } => {
                inner.phase = SheetPhase::Open;
                inner.snap_index = snap_index;
                inner.offset = 0.0;
                inner.pending_close = false;
                drop(inner);
                self.shared.offset_tx.send_replace(0.0);
                if let Some(event) = emit {
                    let _ = self.shared.events_tx.send(event);
                }
            }
            Completion::Close => {
                inner.phase = SheetPhase::Closed;
                inner.pending_close = false;
                drop(inner);
                let _ = self.shared.events_tx.send(SheetEvent::Closed);
            }
        }
    }
}

/// Drives interpolation of the sheet offset between two values
pub trait AnimationDriver: Send + Sync {
    /// Animate from `from` to `to`, delivering frames and the final
    /// completion through `sink`
    fn animate(&self, from: f64, to: f64, sink: AnimationSink);
}

/// Driver that jumps straight to the target value
///
/// Used headless and in tests; also a sensible reduced-motion driver.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImmediateDriver;

impl AnimationDriver for ImmediateDriver {
    fn animate(&self, _from: f64, to: f64, sink: AnimationSink) {
        sink.frame(to);
        sink.complete();
    }
}

/// Fixed-tick driver with cubic ease-out, running on the tokio runtime
#[derive(Debug, Clone)]
pub struct TimedDriver {
    /// Total animation duration
    pub duration: Duration,
    /// Frame interval
    pub tick: Duration,
}

impl Default for TimedDriver {
    fn default() -> Self {
        Self {
            duration: Duration::from_millis(220),
            tick: Duration::from_millis(16),
        }
    }
}

impl AnimationDriver for TimedDriver {
    fn animate(&self, from: f64, to: f64, sink: AnimationSink) {
        let duration = self.duration.as_secs_f64().max(f64::EPSILON);
        let tick = self.tick;
        tokio::spawn(async move {
            let started = tokio::time::Instant::now();
            let mut frames = tokio::time::interval(tick);
            frames.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                frames.tick().await;
                let t = (started.elapsed().as_secs_f64() / duration).min(1.0);
                let eased = 1.0 - (1.0 - t).powi(3);
                sink.frame(from + (to - from) * eased);
                if t >= 1.0 {
                    break;
                }
            }
            sink.complete();
        });
    }
}

/// Controller for one draggable bottom sheet
pub struct SheetController {
    config: SheetConfig,
    shared: Arc<Shared>,
    driver: Arc<dyn AnimationDriver>,
}

impl SheetController {
    /// Create a controller in the `Closed` phase
    pub fn new(config: SheetConfig, driver: Arc<dyn AnimationDriver>) -> Self {
        let initial_offset = config.height_at(0) + DISMISS_MARGIN;
        let (offset_tx, _) = watch::channel(initial_offset);
        let (events_tx, _) = broadcast::channel(16);

        Self {
            config,
            shared: Arc::new(Shared {
                inner: Mutex::new(SheetInner {
                    phase: SheetPhase::Closed,
                    snap_index: 0,
                    offset: initial_offset,
                    gesture_origin: 0.0,
                    generation: 0,
                    pending_close: false,
                    disposed: false,
                }),
                offset_tx,
                events_tx,
            }),
            driver,
        }
    }

    /// The configuration this sheet was built with
    pub fn config(&self) -> &SheetConfig {
        &self.config
    }

    /// Current phase
    pub fn phase(&self) -> SheetPhase {
        self.shared.inner.lock().phase
    }

    /// Current snap index; meaningful only while `Open` or `Dragging`
    pub fn snap_index(&self) -> usize {
        self.shared.inner.lock().snap_index
    }

    /// Current vertical offset
    pub fn offset(&self) -> f64 {
        self.shared.inner.lock().offset
    }

    /// Subscribe to offset changes (for the rendering layer)
    pub fn subscribe_offset(&self) -> watch::Receiver<f64> {
        self.shared.offset_tx.subscribe()
    }

    /// Subscribe to lifecycle events
    pub fn subscribe_events(&self) -> broadcast::Receiver<SheetEvent> {
        self.shared.events_tx.subscribe()
    }

    /// Open the sheet at the given snap index
    ///
    /// Idempotent: re-invoking while already open (or opening) at that
    /// index starts no new animation. Invoking at a different index while
    /// open re-targets the sheet. Ignored while dragging.
    pub fn open(&self, snap_index: usize) {
        let snap_index = snap_index.min(self.config.snap_heights.len() - 1);
        let mut inner = self.shared.inner.lock();
        if inner.disposed {
            return;
        }
        match inner.phase {
            SheetPhase::Dragging => {
                tracing::debug!("open({}) ignored while dragging", snap_index);
                return;
            }
            SheetPhase::Open if inner.snap_index == snap_index && !inner.pending_close => {
                return;
            }
            _ => {}
        }

        inner.phase = SheetPhase::Open;
        inner.snap_index = snap_index;
        inner.pending_close = false;
        inner.generation += 1;
        let generation = inner.generation;
        let from = inner.offset;
        drop(inner);

        self.driver.animate(
            from,
            0.0,
            self.sink(
                generation,
                Completion::Settle {
                    snap_index,
                    emit: Some(SheetEvent::Opened { snap_index }),
                },
            ),
        );
    }

    /// Close the sheet
    ///
    /// Animates the offset past the sheet's own height; on completion the
    /// phase becomes `Closed` and [`SheetEvent::Closed`] is emitted. A
    /// no-op when already closed or when a close is already in flight.
    pub fn close(&self) {
        let mut inner = self.shared.inner.lock();
        if inner.disposed {
            return;
        }
        match inner.phase {
            SheetPhase::Closed => return,
            SheetPhase::Open if inner.pending_close => return,
            _ => {}
        }

        // The sheet stays grabbable until the close animation completes.
        inner.phase = SheetPhase::Open;
        inner.pending_close = true;
        inner.generation += 1;
        let generation = inner.generation;
        let from = inner.offset;
        let target = self.config.height_at(inner.snap_index) + DISMISS_MARGIN;
        drop(inner);

        self.driver
            .animate(from, target, self.sink(generation, Completion::Close));
    }

    /// Begin a drag
    ///
    /// Valid while `Open`, including mid-animation: the running animation
    /// is cancelled and its last applied value becomes the drag baseline.
    pub fn on_drag_start(&self) {
        let mut inner = self.shared.inner.lock();
        if inner.disposed {
            return;
        }
        if inner.phase != SheetPhase::Open {
            tracing::debug!("drag start ignored in phase {:?}", inner.phase);
            return;
        }
        inner.generation += 1;
        inner.phase = SheetPhase::Dragging;
        inner.pending_close = false;
        inner.gesture_origin = inner.offset;
    }

    /// Track the finger during a drag
    ///
    /// Upward travel past the open position is clamped; downward travel is
    /// unbounded during the gesture. Non-finite deltas recover to zero.
    pub fn on_drag_move(&self, dy: f64) {
        let dy = sanitize(dy);
        let mut inner = self.shared.inner.lock();
        if inner.disposed || inner.phase != SheetPhase::Dragging {
            return;
        }
        inner.offset = (inner.gesture_origin + dy).max(0.0);
        let offset = inner.offset;
        drop(inner);
        self.shared.offset_tx.send_replace(offset);
    }

    /// Finish a drag and decide where the sheet goes
    ///
    /// In precedence order: dismiss when the travel or velocity threshold
    /// is exceeded, demote to the next lower snap when one exists and the
    /// demote threshold is exceeded, otherwise snap back.
    pub fn on_drag_end(&self, dy: f64, velocity_y: f64) {
        let dy = sanitize(dy);
        let velocity_y = sanitize(velocity_y);

        let mut inner = self.shared.inner.lock();
        if inner.disposed || inner.phase != SheetPhase::Dragging {
            return;
        }

        if dy > self.config.dismiss_distance || velocity_y > self.config.dismiss_velocity {
            drop(inner);
            self.close();
            return;
        }

        let has_lower_snap = inner.snap_index + 1 < self.config.snap_heights.len();
        let snap_index = if has_lower_snap && dy > self.config.demote_distance {
            inner.snap_index + 1
        } else {
            inner.snap_index
        };
        let emit = if snap_index != inner.snap_index {
            Some(SheetEvent::Snapped { snap_index })
        } else {
            None
        };

        inner.phase = SheetPhase::Open;
        inner.snap_index = snap_index;
        inner.generation += 1;
        let generation = inner.generation;
        let from = inner.offset;
        drop(inner);

        self.driver.animate(
            from,
            0.0,
            self.sink(generation, Completion::Settle { snap_index, emit }),
        );
    }

    /// Cancel any running animation and suppress all further callbacks
    ///
    /// After disposal every operation and every outstanding animation
    /// frame is a no-op. Also invoked on `Drop`.
    pub fn dispose(&self) {
        let mut inner = self.shared.inner.lock();
        inner.disposed = true;
        inner.generation += 1;
    }

    fn sink(&self, generation: u64, completion: Completion) -> AnimationSink {
        AnimationSink {
            shared: Arc::clone(&self.shared),
            generation,
            completion,
        }
    }
}

impl Drop for SheetController {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn sanitize(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        tracing::debug!("non-finite gesture value treated as 0");
        0.0
    }
}
