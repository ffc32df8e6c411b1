// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Images submitted for identification.

use std::path::{Path, PathBuf};

use image::DynamicImage;
use tracescope_core::error::{Result, TraceError};
use tracing::debug;

/// Pixel data for one submitted image, in whatever form the caller has it.
#[derive(Debug, Clone)]
pub enum ImagePayload {
    /// Encoded JPEG/PNG/TIFF bytes, decoded on extraction.
    Encoded(Vec<u8>),
    /// An image the caller has already decoded.
    Decoded(DynamicImage),
    /// A file on disk, read and decoded on extraction.
    File(PathBuf),
}

/// One image plus the identifier it is reported under.
#[derive(Debug, Clone)]
pub struct ImageInput {
    pub source: String,
    pub payload: ImagePayload,
}

impl ImageInput {
    pub fn encoded(source: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            source: source.into(),
            payload: ImagePayload::Encoded(bytes),
        }
    }

    pub fn decoded(source: impl Into<String>, image: DynamicImage) -> Self {
        Self {
            source: source.into(),
            payload: ImagePayload::Decoded(image),
        }
    }

    /// Reference a file; the source is its file name.
    pub fn file(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let source = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            source,
            payload: ImagePayload::File(path.to_path_buf()),
        }
    }

    /// Decode the payload. Every failure (including unreadable files) is a
    /// [`TraceError::Decode`] so it stays local to this image.
    pub fn decode(&self) -> Result<DynamicImage> {
        let image = match &self.payload {
            ImagePayload::Decoded(image) => return Ok(image.clone()),
            ImagePayload::Encoded(bytes) => image::load_from_memory(bytes),
            ImagePayload::File(path) => image::open(path),
        }
        .map_err(|err| TraceError::Decode(format!("{}: {}", self.source, err)))?;

        debug!(
            source = %self.source,
            width = image.width(),
            height = image.height(),
            "Image decoded"
        );
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_bytes_fail_with_decode() {
        let input = ImageInput::encoded("broken.png", vec![0x89, b'P', b'N', b'G', 0, 1, 2]);
        let err = input.decode().unwrap_err();
        assert!(matches!(err, TraceError::Decode(_)));
        assert!(err.to_string().contains("broken.png"));
    }

    #[test]
    fn missing_file_fails_with_decode() {
        let input = ImageInput::file("/nonexistent/scan-01.png");
        assert_eq!(input.source, "scan-01.png");
        assert!(matches!(input.decode(), Err(TraceError::Decode(_))));
    }

    #[test]
    fn encoded_png_round_trips() {
        let img = DynamicImage::new_luma8(12, 7);
        let mut bytes = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        let decoded = ImageInput::encoded("a.png", bytes).decode().unwrap();
        assert_eq!((decoded.width(), decoded.height()), (12, 7));
    }
}
