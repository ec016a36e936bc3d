//! Strip mode controller.
//!
//! # Lock order
//!
//! Three locks exist: the live buffer, the blink pattern buffer and the transport.
//!
//! - The pattern lock is never held together with any other lock. The blink
//!   thread copies one frame out of the pattern and releases it before it
//!   touches the live buffer.
//! - The live lock may be held while the transport lock is taken (so a
//!   retransmission always sends a consistent buffer). The transport lock is
//!   never held while waiting for a buffer lock.

use crate::config::{DriverConfig, LengthSync};
use crate::error::{ControllerError, TransportError};
use crate::frame::{WireFrame, block_count};
use crate::modes::{BlinkMode, DataKind, Mode, ModeSpec};
use crate::packet::ReadView;
use crate::pixel::{PixelColor, SharedPixels};
use crate::scheduler::{BlinkScheduler, BlinkTask};
use crate::transport::{SharedTransport, Transport};

use log::{debug, info};
use std::sync::Arc;

/// Drives one LED strip: owns the live pixel buffer and the active mode.
///
/// Starts in static mode with an empty strip. Every mode switch first
/// deactivates the current mode (joining the blink thread) and then activates
/// the new one. Dropping the controller deactivates the active mode.
///
/// # Example
///
/// ```
/// use ws2812_core::{BlinkSettings, MockStrip, ModeSpec, PixelColor, StripController};
///
/// let strip = MockStrip::new();
/// let mut controller = StripController::new(strip.clone());
///
/// controller.set_length(16)?;
/// controller.set_pixel_data(0, &[PixelColor::new(65, 0, 0); 16])?;
/// assert_eq!(strip.display()[15], PixelColor::new(65, 0, 0));
///
/// controller.set_mode(ModeSpec::Blink(BlinkSettings::new(3, 3, 100)?))?;
/// controller.clear()?;
/// assert_eq!(controller.mode_spec(), ModeSpec::Static);
/// # Ok::<(), ws2812_core::ControllerError>(())
/// ```
#[derive(Debug)]
pub struct StripController {
    config: DriverConfig,
    transport: Arc<SharedTransport>,
    live: SharedPixels,
    mode: Mode,
}

impl StripController {
    /// Create a controller with the default configuration.
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self::with_config(transport, DriverConfig::default())
    }

    /// Create a controller with a custom configuration.
    pub fn with_config(transport: impl Transport + 'static, config: DriverConfig) -> Self {
        Self {
            config,
            transport: Arc::new(SharedTransport::new(Box::new(transport))),
            live: SharedPixels::default(),
            mode: Mode::Static,
        }
    }

    /// The active mode and its settings.
    pub fn mode_spec(&self) -> ModeSpec {
        self.mode.spec()
    }

    /// Length of the live buffer.
    pub fn length(&self) -> u16 {
        self.live.len()
    }

    /// Copy of the live buffer.
    pub fn live_pixels(&self) -> Vec<PixelColor> {
        self.live.snapshot()
    }

    /// Copy of the blink pattern buffer.
    ///
    /// # Errors
    /// Returns [`ControllerError::ModeMismatch`] unless blink mode is active.
    pub fn pattern_pixels(&self) -> Result<Vec<PixelColor>, ControllerError> {
        match &self.mode {
            Mode::Blink(blink) => Ok(blink.pattern.snapshot()),
            Mode::Static => Err(ControllerError::ModeMismatch("static")),
        }
    }

    /// Whether a blink thread is currently running.
    pub fn is_blinking(&self) -> bool {
        match &self.mode {
            Mode::Blink(blink) => blink.scheduler.is_running(),
            Mode::Static => false,
        }
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Resize the live buffer and tell the board its new count.
    ///
    /// In static mode the whole buffer is retransmitted; in blink mode the
    /// display content comes from the pattern cycle, so only the count is sent.
    ///
    /// # Errors
    /// - [`ControllerError::OutOfMemory`] if the buffer cannot grow
    /// - [`ControllerError::Transport`] if the board cannot be reached
    pub fn set_length(&mut self, length: u16) -> Result<(), ControllerError> {
        debug!("set length {} ({} mode)", length, self.mode.spec().id().name());
        let mut live = self.live.lock();
        live.resize(length)?;
        self.transport.send(&WireFrame::SetCount {
            count: length,
            max: 0,
        })?;
        if matches!(self.mode, Mode::Static) {
            self.transport.send_pixels(live.as_slice())?;
        }
        Ok(())
    }

    /// Write pixels into the active mode's buffer starting at `offset`.
    ///
    /// Static mode writes the live buffer and retransmits it. Blink mode writes
    /// the pattern buffer; the change shows up when its frame comes around.
    ///
    /// # Errors
    /// - [`ControllerError::OutOfRange`] if `offset + pixels.len()` exceeds the target buffer
    /// - [`ControllerError::Transport`] if the retransmission fails
    pub fn set_pixel_data(
        &mut self,
        offset: u16,
        pixels: &[PixelColor],
    ) -> Result<(), ControllerError> {
        debug!("set {} pixels at offset {}", pixels.len(), offset);
        match &self.mode {
            Mode::Static => {
                let mut live = self.live.lock();
                live.write(usize::from(offset), pixels)?;
                self.transport.send_pixels(live.as_slice())?;
            }
            Mode::Blink(blink) => {
                blink.pattern.lock().write(usize::from(offset), pixels)?;
            }
        }
        Ok(())
    }

    /// Switch the strip off.
    ///
    /// Blink mode is stopped first, so the controller always ends up in static
    /// mode. The live buffer keeps its contents.
    pub fn clear(&mut self) -> Result<(), ControllerError> {
        if matches!(self.mode, Mode::Blink(_)) {
            info!("clear: leaving blink mode");
            self.deactivate();
        }
        debug!("clear strip");
        self.transport.send(&WireFrame::Clear)?;
        Ok(())
    }

    /// Switch to another mode: deactivate the current one, then activate `spec`.
    ///
    /// # Errors
    /// See [`StripController::activate`]. On failure the controller is left in static mode.
    pub fn set_mode(&mut self, spec: ModeSpec) -> Result<(), ControllerError> {
        info!(
            "switching mode {} -> {}",
            self.mode.spec().id().name(),
            spec.id().name()
        );
        self.deactivate();
        self.activate(spec)
    }

    /// Activate `spec`, deactivating whatever mode is active first.
    ///
    /// Blink activation allocates a black pattern buffer of
    /// `pattern_count * pattern_len` pixels and starts the blink thread.
    ///
    /// # Errors
    /// - [`ControllerError::InvalidModeSettings`] for a zero pattern count or length
    /// - [`ControllerError::OutOfMemory`] if the pattern buffer cannot be allocated
    /// - [`ControllerError::Io`] if the blink thread cannot be spawned
    pub fn activate(&mut self, spec: ModeSpec) -> Result<(), ControllerError> {
        self.deactivate();
        match spec {
            ModeSpec::Static => {}
            ModeSpec::Blink(settings) => {
                let pattern = BlinkMode::allocate_pattern(&settings)?;
                let task = BlinkTask::new(
                    &settings,
                    pattern.clone(),
                    self.live.clone(),
                    Arc::clone(&self.transport),
                );
                let period = settings.period(self.config.min_blink_period);
                let scheduler =
                    BlinkScheduler::start(task, period, &self.config.scheduler_thread_name)?;
                debug!(
                    "blink active: {} frames of {} pixels every {:?}",
                    settings.pattern_count, settings.pattern_len, period
                );
                self.mode = Mode::Blink(BlinkMode {
                    settings,
                    pattern,
                    scheduler,
                });
            }
        }
        Ok(())
    }

    /// Stop the active mode and fall back to static.
    ///
    /// For blink mode this blocks until the blink thread has exited, then
    /// releases the pattern buffer.
    pub fn deactivate(&mut self) {
        if let Mode::Blink(blink) = std::mem::take(&mut self.mode) {
            blink.stop();
            debug!("blink stopped");
        }
    }

    /// Render the view requested by a GetData command.
    ///
    /// Length and pixel-data views are read back from the board; a pixel-data
    /// read first brings the live buffer to the board's length (see
    /// [`LengthSync`]). Mode-pixel-data renders the buffer owned by the active
    /// mode.
    ///
    /// # Errors
    /// Returns [`ControllerError::Transport`] if the board does not answer or
    /// answers with the wrong frame.
    pub fn get_view(&self, kind: DataKind) -> Result<ReadView, ControllerError> {
        debug!("get view {:?}", kind);
        match kind {
            DataKind::Length => self.device_length().map(ReadView::Length),
            DataKind::ModeSettings => Ok(ReadView::ModeSettings(self.mode.spec())),
            DataKind::PixelData => self.device_pixels().map(ReadView::Pixels),
            DataKind::ModePixelData => Ok(ReadView::Pixels(match &self.mode {
                Mode::Static => self.live.snapshot(),
                Mode::Blink(blink) => blink.pattern.snapshot(),
            })),
        }
    }

    // =========================================================================
    // Board reads
    // =========================================================================

    fn device_length(&self) -> Result<u16, ControllerError> {
        match self.transport.request(&WireFrame::RequestLength)? {
            WireFrame::SetCount { count, max } => {
                debug!("board length {} (max {})", count, max);
                Ok(count)
            }
            other => Err(TransportError::UnexpectedResponse(other.control()).into()),
        }
    }

    fn device_pixels(&self) -> Result<Vec<PixelColor>, ControllerError> {
        let count = self.device_length()?;
        {
            let mut live = self.live.lock();
            let resync = match self.config.length_sync {
                LengthSync::Always => true,
                LengthSync::OnMismatch => live.len() != count,
            };
            if resync {
                debug!("resync live buffer {} -> {}", live.len(), count);
                live.resize(count)?;
            }
        }

        let total = usize::from(count);
        let mut pixels = Vec::new();
        pixels
            .try_reserve_exact(total)
            .map_err(|_| ControllerError::OutOfMemory(total))?;
        for block_index in 0..block_count(count) {
            match self
                .transport
                .request(&WireFrame::RequestPixelBlock { block_index })?
            {
                WireFrame::PixelData(block) => {
                    let remaining = total - pixels.len();
                    pixels.extend(block.into_iter().take(remaining));
                }
                other => return Err(TransportError::UnexpectedResponse(other.control()).into()),
            }
        }
        Ok(pixels)
    }
}

impl Drop for StripController {
    fn drop(&mut self) {
        self.deactivate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::RawFrame;
    use crate::mock::MockStrip;
    use crate::modes::BlinkSettings;
    use std::thread;
    use std::time::{Duration, Instant};

    const RED: PixelColor = PixelColor::new(65, 0, 0);
    const GREEN: PixelColor = PixelColor::new(0, 65, 0);

    fn blink(pattern_count: u8, pattern_len: u8, period_ms: u16) -> ModeSpec {
        ModeSpec::Blink(BlinkSettings::new(pattern_count, pattern_len, period_ms).unwrap())
    }

    fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        false
    }

    #[test]
    fn test_new_controller_is_static_and_empty() {
        let controller = StripController::new(MockStrip::new());
        assert_eq!(controller.mode_spec(), ModeSpec::Static);
        assert_eq!(controller.length(), 0);
        assert!(!controller.is_blinking());
        assert!(matches!(
            controller.pattern_pixels(),
            Err(ControllerError::ModeMismatch(_))
        ));
    }

    #[test]
    fn test_set_length_syncs_board() {
        let strip = MockStrip::new();
        let mut controller = StripController::new(strip.clone());

        controller.set_length(3).unwrap();
        controller.set_pixel_data(0, &[RED, GREEN, RED]).unwrap();
        controller.set_length(5).unwrap();

        assert_eq!(strip.count(), 5);
        let expected = vec![RED, GREEN, RED, PixelColor::BLACK, PixelColor::BLACK];
        assert_eq!(controller.live_pixels(), expected);
        assert_eq!(strip.display(), expected);
    }

    #[test]
    fn test_set_length_in_blink_sends_count_only() {
        let strip = MockStrip::new();
        let mut controller = StripController::new(strip.clone());
        controller.set_length(2).unwrap();
        controller.set_mode(blink(1, 2, 60_000)).unwrap();
        controller.set_pixel_data(0, &[RED, GREEN]).unwrap();

        let before = strip.frames().len();
        controller.set_length(5).unwrap();
        assert_eq!(
            strip.frames()[before..],
            [WireFrame::SetCount { count: 5, max: 0 }]
        );
        assert_eq!(strip.count(), 5);
        assert_eq!(controller.live_pixels(), vec![PixelColor::BLACK; 5]);

        // Run the next blink step by hand instead of waiting a full period.
        let Mode::Blink(active) = &controller.mode else {
            panic!("blink mode should still be active");
        };
        let mut task = BlinkTask::new(
            &active.settings,
            active.pattern.clone(),
            controller.live.clone(),
            Arc::clone(&controller.transport),
        );
        task.tick().unwrap();

        let tiled = vec![RED, GREEN, RED, GREEN, RED];
        assert_eq!(controller.live_pixels(), tiled);
        assert_eq!(strip.display(), tiled);
    }

    #[test]
    fn test_set_pixel_data_bounds() {
        let strip = MockStrip::new();
        let mut controller = StripController::new(strip.clone());
        controller.set_length(4).unwrap();

        controller.set_pixel_data(2, &[GREEN, GREEN]).unwrap();
        assert!(matches!(
            controller.set_pixel_data(3, &[RED, RED]),
            Err(ControllerError::OutOfRange {
                offset: 3,
                length: 2,
                capacity: 4
            })
        ));

        let expected = vec![PixelColor::BLACK, PixelColor::BLACK, GREEN, GREEN];
        assert_eq!(controller.live_pixels(), expected);
        assert_eq!(strip.display(), expected);
    }

    #[test]
    fn test_blink_writes_pattern_buffer() {
        let strip = MockStrip::new();
        let mut controller = StripController::new(strip.clone());
        controller.set_length(2).unwrap();
        controller.set_mode(blink(2, 2, 60_000)).unwrap();
        assert!(controller.is_blinking());
        assert_eq!(controller.pattern_pixels().unwrap(), vec![PixelColor::BLACK; 4]);

        controller.set_pixel_data(1, &[RED, GREEN, RED]).unwrap();
        assert!(matches!(
            controller.set_pixel_data(2, &[RED, RED, RED]),
            Err(ControllerError::OutOfRange { capacity: 4, .. })
        ));

        assert_eq!(
            controller.pattern_pixels().unwrap(),
            vec![PixelColor::BLACK, RED, GREEN, RED]
        );
        assert_eq!(controller.live_pixels(), vec![PixelColor::BLACK; 2]);
        assert_eq!(
            controller.get_view(DataKind::ModePixelData).unwrap(),
            ReadView::Pixels(vec![PixelColor::BLACK, RED, GREEN, RED])
        );
    }

    #[test]
    fn test_blink_reaches_live_buffer() {
        let strip = MockStrip::new();
        let mut controller = StripController::new(strip.clone());
        controller.set_length(4).unwrap();
        controller.set_mode(blink(1, 2, 5)).unwrap();
        controller.set_pixel_data(0, &[RED, GREEN]).unwrap();

        let live = controller.live.clone();
        assert!(wait_until(|| live.snapshot() == vec![RED, GREEN, RED, GREEN]));
        assert!(wait_until(|| strip.display() == vec![RED, GREEN, RED, GREEN]));
    }

    #[test]
    fn test_switch_to_static_stops_blink_thread() {
        let strip = MockStrip::new();
        let mut controller = StripController::new(strip.clone());
        controller.set_length(3).unwrap();
        let before = strip.pixel_frames_received();

        controller.set_mode(blink(2, 3, 5)).unwrap();
        assert!(wait_until(|| strip.pixel_frames_received() > before + 1));

        controller.set_mode(ModeSpec::Static).unwrap();
        assert!(!controller.is_blinking());
        let stopped_at = strip.pixel_frames_received();
        thread::sleep(Duration::from_millis(30));
        assert_eq!(strip.pixel_frames_received(), stopped_at);
    }

    #[test]
    fn test_blink_period_raised_to_minimum() {
        let strip = MockStrip::new();
        let config = DriverConfig::default().with_min_blink_period(Duration::from_secs(60));
        let mut controller = StripController::with_config(strip.clone(), config);
        controller.set_length(2).unwrap();
        let before = strip.pixel_frames_received();

        controller.set_mode(blink(2, 2, 0)).unwrap();
        assert!(controller.is_blinking());
        thread::sleep(Duration::from_millis(30));
        assert_eq!(strip.pixel_frames_received(), before);
    }

    /// Records the name of the thread behind every send.
    #[derive(Debug, Clone, Default)]
    struct SenderNames(Arc<std::sync::Mutex<Vec<Option<String>>>>);

    impl Transport for SenderNames {
        fn send_frame(&mut self, _frame: &RawFrame) -> Result<(), TransportError> {
            let name = thread::current().name().map(str::to_string);
            self.0.lock().unwrap().push(name);
            Ok(())
        }

        fn send_and_receive(&mut self, _request: &RawFrame) -> Result<RawFrame, TransportError> {
            Err(TransportError::Timeout)
        }
    }

    #[test]
    fn test_blink_thread_uses_configured_name() {
        let names = SenderNames::default();
        let config = DriverConfig::default().with_scheduler_thread_name("strip-7-blink");
        let mut controller = StripController::with_config(names.clone(), config);
        controller.set_length(1).unwrap();
        controller.set_mode(blink(1, 1, 5)).unwrap();

        let expected = Some(String::from("strip-7-blink"));
        assert!(wait_until(|| names.0.lock().unwrap().contains(&expected)));
    }

    #[test]
    fn test_clear_leaves_blink_mode() {
        let strip = MockStrip::new();
        let mut controller = StripController::new(strip.clone());
        controller.set_length(3).unwrap();
        controller.set_pixel_data(0, &[RED; 3]).unwrap();
        controller.set_mode(blink(3, 1, 60_000)).unwrap();

        controller.clear().unwrap();

        assert_eq!(controller.mode_spec(), ModeSpec::Static);
        assert!(!controller.is_blinking());
        assert_eq!(strip.frames().last(), Some(&WireFrame::Clear));
        assert_eq!(strip.display(), vec![PixelColor::BLACK; 3]);
        assert_eq!(controller.live_pixels(), vec![RED; 3]);
    }

    #[test]
    fn test_invalid_blink_falls_back_to_static() {
        let mut controller = StripController::new(MockStrip::new());
        controller.set_mode(blink(2, 2, 60_000)).unwrap();

        let zero_count = ModeSpec::Blink(BlinkSettings {
            pattern_count: 0,
            pattern_len: 4,
            period_ms: 10,
        });
        assert!(matches!(
            controller.set_mode(zero_count),
            Err(ControllerError::InvalidModeSettings { .. })
        ));
        assert_eq!(controller.mode_spec(), ModeSpec::Static);
        assert!(!controller.is_blinking());
    }

    #[test]
    fn test_mode_settings_view() {
        let mut controller = StripController::new(MockStrip::new());
        assert_eq!(
            controller.get_view(DataKind::ModeSettings).unwrap(),
            ReadView::ModeSettings(ModeSpec::Static)
        );

        let spec = blink(3, 3, 250);
        controller.set_mode(spec).unwrap();
        assert_eq!(
            controller.get_view(DataKind::ModeSettings).unwrap(),
            ReadView::ModeSettings(spec)
        );
    }

    #[test]
    fn test_pixel_view_follows_board_length() {
        let strip = MockStrip::with_max_count(10);
        let mut controller = StripController::new(strip.clone());
        controller.set_length(12).unwrap();
        assert_eq!(controller.length(), 12);

        assert_eq!(
            controller.get_view(DataKind::Length).unwrap(),
            ReadView::Length(10)
        );
        match controller.get_view(DataKind::PixelData).unwrap() {
            ReadView::Pixels(pixels) => assert_eq!(pixels.len(), 10),
            other => panic!("unexpected view: {other:?}"),
        }
        assert_eq!(controller.length(), 10);
    }

    #[test]
    fn test_pixel_view_spans_blocks() {
        let strip = MockStrip::new();
        let config = DriverConfig::default().with_length_sync(LengthSync::Always);
        let mut controller = StripController::with_config(strip.clone(), config);
        let pixels: Vec<PixelColor> = (0..50u8).map(|i| PixelColor::new(i, 0, 255 - i)).collect();
        controller.set_length(50).unwrap();
        controller.set_pixel_data(0, &pixels).unwrap();

        assert_eq!(
            controller.get_view(DataKind::PixelData).unwrap(),
            ReadView::Pixels(pixels)
        );
        let block_requests = strip
            .frames()
            .iter()
            .filter(|frame| matches!(frame, WireFrame::RequestPixelBlock { .. }))
            .count();
        assert_eq!(block_requests, 3);
    }

    #[test]
    fn test_transport_failure_is_reported() {
        let strip = MockStrip::new();
        let mut controller = StripController::new(strip.clone());
        strip.disconnect();

        assert!(matches!(
            controller.set_length(4),
            Err(ControllerError::Transport(TransportError::Disconnected))
        ));
        assert!(matches!(
            controller.get_view(DataKind::Length),
            Err(ControllerError::Transport(TransportError::Disconnected))
        ));
    }
}
