//! Optional avatar image shown at the center of some effects.

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use crate::{VizError, Result};

/// Decoded RGBA8 avatar image.
#[derive(Debug, Clone)]
pub struct Avatar {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Avatar {
    /// Decodes an image file into RGBA8.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let image = image::open(path.as_ref())
            .map_err(|e| VizError::Image(e.to_string()))?
            .to_rgba8();
        let (width, height) = image.dimensions();
        Ok(Self {
            width,
            height,
            pixels: image.into_raw(),
        })
    }

    /// Loads with a bounded timeout, so a stalled read can never block the
    /// caller indefinitely. Returns `None` on timeout or decode failure;
    /// callers substitute a generic glow treatment.
    pub fn load_with_timeout(path: PathBuf, timeout: Duration) -> Option<Self> {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let _ = tx.send(Self::load(&path));
        });
        match rx.recv_timeout(timeout) {
            Ok(Ok(avatar)) => Some(avatar),
            _ => None,
        }
    }

    /// Builds a solid-color avatar, mostly useful in tests.
    pub fn solid(size: u32, r: u8, g: u8, b: u8) -> Self {
        let size = size.max(1);
        let mut pixels = Vec::with_capacity((size * size * 4) as usize);
        for _ in 0..size * size {
            pixels.extend_from_slice(&[r, g, b, 255]);
        }
        Self {
            width: size,
            height: size,
            pixels,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}
