//! Host-side driver core for WS2812 LED strips behind a USB controller board.
//!
//! This crate implements the control protocol between a user program and the
//! board: the control-channel record codec, the 64-byte USB frame codec, a
//! static/blink mode controller with its background blink thread, and the
//! queue of pending read requests.
//!
//! # Layers
//!
//! - [`StripController`] drives the strip through a [`Transport`].
//! - [`StripSession`] exposes a controller as a byte stream with device-file
//!   semantics (packed command writes, one view per read).
//! - [`StripClient`] is the user library: typed calls over any device file
//!   or session.
//!
//! # Example
//!
//! ```no_run
//! use ws2812_core::{PixelColor, StripClient};
//!
//! fn main() -> Result<(), ws2812_core::ControllerError> {
//!     let mut client = StripClient::open("/dev/usb_ws2812_0")?;
//!
//!     client.set_length(16)?;
//!     client.set_pixels(0, &[PixelColor::new(65, 0, 0); 16])?;
//!
//!     // blink three frames, 500 ms each
//!     client.set_mode_blink(3, 3, 500)?;
//!     client.set_blink_pattern(&Default::default())?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Testing
//!
//! Use [`MockStrip`] to run the whole stack without hardware:
//!
//! ```
//! use ws2812_core::{MockStrip, StripClient, StripSession};
//!
//! let strip = MockStrip::new();
//! let mut client = StripClient::new(StripSession::open(strip.clone(), Default::default()));
//! client.set_length(30).unwrap();
//! assert_eq!(strip.count(), 30);
//! ```

#![warn(missing_docs)]

mod client;
mod config;
mod controller;
mod error;
mod frame;
mod mock;
mod modes;
mod packet;
mod pixel;
mod requests;
mod scheduler;
mod session;
mod state;
mod transport;

// Re-export public API
pub use client::{BlinkPattern, DEFAULT_DEVICE_PATH, MAX_VIEW_SIZE, StripClient};
pub use config::{DriverConfig, LengthSync};
pub use controller::StripController;
pub use error::{ControllerError, TransportError};
pub use frame::{FRAME_SIZE, PIXELS_PER_FRAME, RawFrame, WireFrame, block_count, pixel_frames};
pub use mock::{DEFAULT_MAX_COUNT, MockStrip};
pub use modes::{BlinkSettings, DataKind, ModeId, ModeSpec};
pub use packet::{Command, ReadView};
pub use pixel::{PIXEL_SIZE, PixelBuffer, PixelColor, SharedPixels};
pub use requests::ReadRequestQueue;
pub use scheduler::BlinkScheduler;
pub use session::StripSession;
pub use state::StripState;
pub use transport::{SharedTransport, Transport};

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::{Duration, Instant};

    const RED: PixelColor = PixelColor::new(65, 0, 0);

    fn open() -> (StripSession, MockStrip) {
        let strip = MockStrip::new();
        (StripSession::open(strip.clone(), DriverConfig::default()), strip)
    }

    #[test]
    fn test_pixel_read_end_to_end() {
        let (mut session, _) = open();
        let mut write = Command::SetLength(16).encode();
        Command::SetPixelData {
            offset: 0,
            pixels: vec![RED; 16],
        }
        .encode_into(&mut write);
        Command::GetData(DataKind::PixelData).encode_into(&mut write);
        assert_eq!(session.write(&write).unwrap(), write.len());

        let mut buf = vec![0u8; 128];
        let read = session.read(&mut buf).unwrap();
        assert_eq!(read, 5 + 16 * 3);
        assert_eq!(&buf[..5], &[1, 0, 16, 0, 0]);
        for pixel in buf[5..read].chunks(3) {
            assert_eq!(pixel, &[65, 0, 0]);
        }
    }

    #[test]
    fn test_reads_follow_request_order() {
        let (mut session, _) = open();
        let mut write = Command::SetLength(2).encode();
        Command::GetData(DataKind::Length).encode_into(&mut write);
        Command::GetData(DataKind::ModeSettings).encode_into(&mut write);
        Command::GetData(DataKind::PixelData).encode_into(&mut write);
        session.write(&write).unwrap();

        let mut buf = vec![0u8; 64];
        let mut views = Vec::new();
        loop {
            let read = session.read(&mut buf).unwrap();
            if read == 0 {
                break;
            }
            views.push(ReadView::decode(&buf[..read]).unwrap());
        }

        assert_eq!(
            views,
            vec![
                ReadView::Length(2),
                ReadView::ModeSettings(ModeSpec::Static),
                ReadView::Pixels(vec![PixelColor::BLACK; 2]),
            ]
        );
    }

    #[test]
    fn test_blink_to_static_stops_updates() {
        let (mut session, strip) = open();
        let blink = BlinkSettings::new(3, 3, 5).unwrap();
        let mut write = Command::SetLength(9).encode();
        Command::SetMode(ModeSpec::Blink(blink)).encode_into(&mut write);
        Command::SetPixelData {
            offset: 0,
            pixels: BlinkPattern::default().pixels().to_vec(),
        }
        .encode_into(&mut write);
        session.write(&write).unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        while strip.refreshes() < 4 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(2));
        }
        assert!(strip.refreshes() >= 4);

        session
            .write(&Command::SetMode(ModeSpec::Static).encode())
            .unwrap();
        let live = session.controller().live_pixels();
        let frames = strip.pixel_frames_received();
        thread::sleep(Duration::from_millis(30));

        assert_eq!(session.controller().live_pixels(), live);
        assert_eq!(strip.pixel_frames_received(), frames);
        assert_eq!(session.state().mode, ModeSpec::Static);
    }

    #[test]
    fn test_client_over_session() {
        let strip = MockStrip::with_max_count(20);
        let session = StripSession::open(strip.clone(), DriverConfig::default());
        let mut client = StripClient::new(session);

        client.set_length(16).unwrap();
        client.set_pixels(0, &[RED; 16]).unwrap();
        client.set_pixels(4, &[PixelColor::new(0, 65, 0); 4]).unwrap();
        assert_eq!(client.get_data().unwrap(), strip.display());

        client.set_length(40).unwrap();
        assert_eq!(client.get_length().unwrap(), 20);
        assert_eq!(client.get_data().unwrap().len(), 20);

        let session = client.into_inner();
        assert_eq!(session.state().length, 20);
        session.close();
    }
}
