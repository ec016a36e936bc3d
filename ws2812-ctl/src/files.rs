//! Text formats for pattern and pixel files.
//!
//! Both are whitespace-separated decimal numbers:
//!
//! - pattern file: `LEN COUNT R G B ...` with `LEN * COUNT` colors
//! - pixel file: `COUNT OFFSET R G B ...` with `COUNT` colors

use ws2812_core::{BlinkPattern, ControllerError, PixelColor};

use std::str::{FromStr, SplitWhitespace};

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Missing {0}")]
    Missing(&'static str),

    #[error("Invalid {field}: {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("Expected {expected} colors, found {actual}")]
    ColorCount { expected: usize, actual: usize },

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] ControllerError),
}

/// Pixels to write at an offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelFile {
    pub offset: u16,
    pub pixels: Vec<PixelColor>,
}

struct Fields<'a> {
    inner: SplitWhitespace<'a>,
}

impl<'a> Fields<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            inner: text.split_whitespace(),
        }
    }

    fn next<T: FromStr>(&mut self, field: &'static str) -> Result<T, ParseError> {
        let value = self.inner.next().ok_or(ParseError::Missing(field))?;
        value.parse().map_err(|_| ParseError::InvalidNumber {
            field,
            value: value.to_string(),
        })
    }

    fn colors(mut self, expected: usize) -> Result<Vec<PixelColor>, ParseError> {
        let mut pixels = Vec::with_capacity(expected);
        while pixels.len() < expected {
            if self.inner.clone().next().is_none() {
                return Err(ParseError::ColorCount {
                    expected,
                    actual: pixels.len(),
                });
            }
            let red = self.next("red")?;
            let green = self.next("green")?;
            let blue = self.next("blue")?;
            pixels.push(PixelColor::new(red, green, blue));
        }
        let extra = self.inner.count();
        if extra > 0 {
            return Err(ParseError::ColorCount {
                expected,
                actual: expected + extra.div_ceil(3),
            });
        }
        Ok(pixels)
    }
}

pub fn parse_pattern(text: &str) -> Result<BlinkPattern, ParseError> {
    let mut fields = Fields::new(text);
    let pattern_len: u8 = fields.next("pattern length")?;
    let pattern_count: u8 = fields.next("pattern count")?;
    let pixels = fields.colors(usize::from(pattern_len) * usize::from(pattern_count))?;
    Ok(BlinkPattern::new(pattern_count, pattern_len, pixels)?)
}

pub fn parse_pixels(text: &str) -> Result<PixelFile, ParseError> {
    let mut fields = Fields::new(text);
    let count: u16 = fields.next("pixel count")?;
    let offset: u16 = fields.next("offset")?;
    let pixels = fields.colors(usize::from(count))?;
    Ok(PixelFile { offset, pixels })
}
