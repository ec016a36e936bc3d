//! Background thread that cycles blink pattern frames onto the strip.

use crate::error::{ControllerError, TransportError};
use crate::modes::BlinkSettings;
use crate::pixel::SharedPixels;
use crate::transport::SharedTransport;

use log::{debug, trace, warn};
use std::ops::Range;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Position within a blink pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PatternCycle {
    pattern_count: usize,
    pattern_len: usize,
    index: usize,
}

impl PatternCycle {
    pub(crate) fn new(settings: &BlinkSettings) -> Self {
        Self {
            pattern_count: usize::from(settings.pattern_count),
            pattern_len: usize::from(settings.pattern_len),
            index: 0,
        }
    }

    /// Pattern buffer range of the current frame.
    pub(crate) fn frame_range(&self) -> Range<usize> {
        let start = self.index * self.pattern_len;
        start..start + self.pattern_len
    }

    pub(crate) fn advance(&mut self) {
        self.index = (self.index + 1) % self.pattern_count.max(1);
    }
}

/// One blink step: copy the current frame into the live buffer and send it.
#[derive(Debug)]
pub(crate) struct BlinkTask {
    cycle: PatternCycle,
    pattern: SharedPixels,
    live: SharedPixels,
    transport: Arc<SharedTransport>,
}

impl BlinkTask {
    pub(crate) fn new(
        settings: &BlinkSettings,
        pattern: SharedPixels,
        live: SharedPixels,
        transport: Arc<SharedTransport>,
    ) -> Self {
        Self {
            cycle: PatternCycle::new(settings),
            pattern,
            live,
            transport,
        }
    }

    /// Show the current frame and move to the next one.
    ///
    /// The pattern lock is released before the live buffer is touched, so the two
    /// buffer locks are never held together. The frame advances even if sending fails.
    pub(crate) fn tick(&mut self) -> Result<usize, TransportError> {
        let range = self.cycle.frame_range();
        let frame = self
            .pattern
            .lock()
            .get(range.clone())
            .map(<[_]>::to_vec)
            .unwrap_or_default();
        self.cycle.advance();

        if frame.is_empty() {
            trace!("blink frame {:?} outside pattern buffer", range);
            return Ok(0);
        }

        let mut live = self.live.lock();
        live.fill_tiled(&frame);
        self.transport.send_pixels(live.as_slice())
    }
}

/// Handle to the running blink thread.
///
/// The thread checks the stop flag once per period; [`BlinkScheduler::stop`]
/// wakes it early and joins it. Dropping the handle stops the thread too.
#[derive(Debug)]
pub struct BlinkScheduler {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl BlinkScheduler {
    /// Spawn the blink thread.
    pub(crate) fn start(
        mut task: BlinkTask,
        period: Duration,
        thread_name: &str,
    ) -> Result<Self, ControllerError> {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);

        let handle = thread::Builder::new()
            .name(thread_name.to_string())
            .spawn(move || {
                debug!("blink thread started (period {:?})", period);
                while wait_period(&flag, period) {
                    if let Err(e) = task.tick() {
                        warn!("blink frame not sent: {}", e);
                    }
                }
                debug!("blink thread stopped");
            })?;

        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    /// Whether the thread is still alive.
    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Signal the thread and block until it has exited.
    ///
    /// Once this returns no further writes to the live buffer come from this scheduler.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            handle.thread().unpark();
            if handle.join().is_err() {
                warn!("blink thread panicked");
            }
        }
    }
}

impl Drop for BlinkScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Sleep for one period unless stopped first. Returns `false` once stopped.
fn wait_period(stop: &AtomicBool, period: Duration) -> bool {
    let deadline = Instant::now() + period;
    loop {
        if stop.load(Ordering::Acquire) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::park_timeout(deadline - now);
    }
}
