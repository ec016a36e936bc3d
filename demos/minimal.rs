//! Example: light 16 LEDs red, then turn LEDs 5 to 8 green.
//!
//! Run with: `cargo run --example minimal` (add `-- --simulate` without hardware)

use std::thread;
use std::time::Duration;

use ws2812_core::{
    ControllerError, DEFAULT_DEVICE_PATH, DriverConfig, MockStrip, PixelColor, StripClient,
    StripSession,
};

fn run<D: std::io::Read + std::io::Write>(
    client: &mut StripClient<D>,
    hold: Duration,
) -> Result<(), ControllerError> {
    client.set_length(16)?;

    // All LEDs red
    client.set_pixels(0, &[PixelColor::new(65, 0, 0); 16])?;
    thread::sleep(hold);

    // LEDs 5 to 8 green
    client.set_pixels(4, &[PixelColor::new(0, 65, 0); 4])?;

    let pixels = client.get_data()?;
    println!("Strip now holds {} pixels: {:?}", pixels.len(), pixels);
    Ok(())
}

fn main() -> Result<(), ControllerError> {
    // Initialize logging (optional)
    env_logger::init();

    if std::env::args().any(|arg| arg == "--simulate") {
        let session = StripSession::open(MockStrip::new(), DriverConfig::default());
        let mut client = StripClient::new(session);
        return run(&mut client, Duration::from_millis(500));
    }

    let mut client = StripClient::open(DEFAULT_DEVICE_PATH)?;
    run(&mut client, Duration::from_secs(10))
}
