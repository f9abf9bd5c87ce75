//! Writing finished frames to disk.

use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use super::error::Result;
use super::frame::Frame;
use super::ppm::PpmImage;

/// Save `frame` to `path`. `.ppm` is written as plain text; anything else is
/// encoded by the `image` crate according to its extension.
pub fn save<P: AsRef<Path>>(frame: &Frame, path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let is_ppm = path.extension().map_or(false, |ext| ext.eq_ignore_ascii_case("ppm"));
    if is_ppm {
        fs::write(path, PpmImage::from_frame(frame).get_text())?;
    }
    else {
        image::save_buffer(path, &frame.to_rgb8(), frame.width as u32, frame.height as u32, image::ColorType::Rgb8)?;
    }

    info!("Wrote {}x{} image to {}", frame.width, frame.height, path.display());
    Ok(())
}

/// First `CaptureN.png` in `dir` that does not exist yet, counting from 0
pub fn next_capture_path<P: AsRef<Path>>(dir: P) -> PathBuf {
    let dir = dir.as_ref();
    (0u32..)
        .map(|count| dir.join(format!("Capture{}.png", count)))
        .find(|candidate| !candidate.exists())
        .unwrap_or_else(|| dir.join("Capture.png"))
}
