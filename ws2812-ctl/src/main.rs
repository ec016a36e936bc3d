//! Command-line control for a WS2812 strip.
//!
//! Run with: `ws2812-ctl [--device PATH | --simulate] COMMAND`

mod files;

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::{env, fs};

use log::{debug, error, info};
use ws2812_core::{
    BlinkPattern, ControllerError, DEFAULT_DEVICE_PATH, DriverConfig, MockStrip, ModeSpec,
    PixelColor, StripClient, StripSession,
};

use files::{ParseError, parse_pattern, parse_pixels};

const DEFAULT_BLINK_DELAY_MS: u16 = 1000;

const USAGE: &str = "\
Usage: ws2812-ctl [--device PATH | --simulate] COMMAND

Commands:
  length N                          set the number of LEDs
  get-length                        print the LED count reported by the board
  mode                              print the active mode
  static                            switch to static mode
  blink [--delay MS] [PATTERN_FILE] start blinking (default: RGB rotation, 1000 ms)
  pixels FILE                       write pixels from FILE (COUNT OFFSET R G B ...)
  get-data                          print the pixels held by the board
  get-mode-data                     print the buffer of the active mode
  clear                             switch all LEDs off

Pattern files hold LEN COUNT R G B ... with LEN * COUNT colors.";

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("{0}")]
    Usage(String),

    #[error("Invalid {what}: {value:?}")]
    InvalidNumber { what: &'static str, value: String },

    #[error("Cannot read {}: {source}", .path.display())]
    File {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{}: {source}", .path.display())]
    Format { path: PathBuf, source: ParseError },

    #[error(transparent)]
    Controller(#[from] ControllerError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    Device(PathBuf),
    Simulate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Action {
    SetLength(u16),
    GetLength,
    Mode,
    Static,
    Blink {
        delay_ms: u16,
        pattern: Option<PathBuf>,
    },
    Pixels(PathBuf),
    GetData,
    GetModeData,
    Clear,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Args {
    target: Target,
    action: Action,
}

fn parse_number<T: std::str::FromStr>(what: &'static str, value: &str) -> Result<T, CliError> {
    value.parse().map_err(|_| CliError::InvalidNumber {
        what,
        value: value.to_string(),
    })
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Args, CliError> {
    let mut args = args.into_iter();
    let mut target = Target::Device(PathBuf::from(DEFAULT_DEVICE_PATH));

    let command = loop {
        match args.next().as_deref() {
            Some("--device" | "-d") => {
                let path = args
                    .next()
                    .ok_or_else(|| CliError::Usage("--device needs a path".into()))?;
                target = Target::Device(PathBuf::from(path));
            }
            Some("--simulate") => target = Target::Simulate,
            Some(command) => break command.to_string(),
            None => return Err(CliError::Usage("missing command".into())),
        }
    };

    let action = match command.as_str() {
        "length" => {
            let value = args
                .next()
                .ok_or_else(|| CliError::Usage("length needs a value".into()))?;
            Action::SetLength(parse_number("length", &value)?)
        }
        "get-length" => Action::GetLength,
        "mode" => Action::Mode,
        "static" => Action::Static,
        "blink" => {
            let mut delay_ms = DEFAULT_BLINK_DELAY_MS;
            let mut pattern = None;
            while let Some(arg) = args.next() {
                match arg.as_str() {
                    "--delay" => {
                        let value = args
                            .next()
                            .ok_or_else(|| CliError::Usage("--delay needs a value".into()))?;
                        delay_ms = parse_number("delay", &value)?;
                    }
                    _ if pattern.is_none() => pattern = Some(PathBuf::from(&arg)),
                    _ => return Err(CliError::Usage(format!("unexpected argument {arg:?}"))),
                }
            }
            Action::Blink { delay_ms, pattern }
        }
        "pixels" => {
            let path = args
                .next()
                .ok_or_else(|| CliError::Usage("pixels needs a file".into()))?;
            Action::Pixels(PathBuf::from(path))
        }
        "get-data" => Action::GetData,
        "get-mode-data" => Action::GetModeData,
        "clear" => Action::Clear,
        other => return Err(CliError::Usage(format!("unknown command {other:?}"))),
    };

    if let Some(extra) = args.next() {
        return Err(CliError::Usage(format!("unexpected argument {extra:?}")));
    }
    Ok(Args { target, action })
}

fn read_file(path: &Path) -> Result<String, CliError> {
    fs::read_to_string(path).map_err(|source| CliError::File {
        path: path.to_path_buf(),
        source,
    })
}

fn print_pixels(pixels: &[PixelColor]) {
    println!("{} pixels", pixels.len());
    for (index, pixel) in pixels.iter().enumerate() {
        println!(
            "  [{index:3}] {:3} {:3} {:3}",
            pixel.red, pixel.green, pixel.blue
        );
    }
}

fn run<D: Read + Write>(client: &mut StripClient<D>, action: &Action) -> Result<(), CliError> {
    match action {
        Action::SetLength(length) => client.set_length(*length)?,
        Action::GetLength => println!("Length: {}", client.get_length()?),
        Action::Mode => match client.get_mode()? {
            ModeSpec::Static => println!("Mode: static"),
            ModeSpec::Blink(settings) => println!(
                "Mode: blink (pattern_count = {}, pattern_len = {}, period = {} ms)",
                settings.pattern_count, settings.pattern_len, settings.period_ms
            ),
        },
        Action::Static => client.set_mode_static()?,
        Action::Blink { delay_ms, pattern } => {
            let pattern = match pattern {
                Some(path) => parse_pattern(&read_file(path)?).map_err(|source| {
                    CliError::Format {
                        path: path.clone(),
                        source,
                    }
                })?,
                None => BlinkPattern::default(),
            };
            debug!(
                "blink pattern {}x{}",
                pattern.pattern_count(),
                pattern.pattern_len()
            );
            client.set_mode_blink(pattern.pattern_count(), pattern.pattern_len(), *delay_ms)?;
            client.set_blink_pattern(&pattern)?;
        }
        Action::Pixels(path) => {
            let file = parse_pixels(&read_file(path)?).map_err(|source| CliError::Format {
                path: path.clone(),
                source,
            })?;
            client.set_pixels(file.offset, &file.pixels)?;
        }
        Action::GetData => print_pixels(&client.get_data()?),
        Action::GetModeData => print_pixels(&client.get_mode_data()?),
        Action::Clear => client.clear()?,
    }
    Ok(())
}

fn execute(args: &Args) -> Result<(), CliError> {
    match &args.target {
        Target::Device(path) => {
            info!("using device {}", path.display());
            let mut client = StripClient::open(path)?;
            run(&mut client, &args.action)
        }
        Target::Simulate => {
            info!("using simulated strip");
            let strip = MockStrip::new();
            let session = StripSession::open(strip.clone(), DriverConfig::default());
            let mut client = StripClient::new(session);
            run(&mut client, &args.action)?;
            client.into_inner().close();
            println!("Simulated strip: {} LEDs", strip.count());
            Ok(())
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();

    let result = parse_args(env::args().skip(1)).and_then(|args| execute(&args));
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::Controller(e)) => {
            error!("{}", e);
            eprintln!("Error: {} (code {})", e, e.code());
            ExitCode::FAILURE
        }
        Err(e @ CliError::Usage(_)) => {
            eprintln!("Error: {}\n\n{}", e, USAGE);
            ExitCode::from(2)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
