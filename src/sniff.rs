//! Media type sniffing.
//!
//! The inference service is told what it is receiving through the
//! `Content-Type` header, and that header is derived from the image bytes
//! alone. File extensions and caller-declared types are never trusted.
//!
//! Sniffing is conservative: a guess is only forwarded when it is certain.
//! Formats whose signature is two bytes long or otherwise easy to hit by
//! accident (BMP, ICO, PNM) are reported, but flagged as uncertain, as is
//! anything that only maps to a generic non-`image/` type.

use image::ImageFormat;

use crate::error::{AnnotateError, AnnotateResult};

/// Outcome of inspecting an image prefix.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MediaGuess {
    /// Best-guess MIME type, `None` when no signature matched.
    pub media_type: Option<&'static str>,
    /// Whether the signature is strong enough to act on.
    pub certain: bool,
}

impl MediaGuess {
    /// Returns the media type when it is known and certain, an input error otherwise.
    pub fn require_certain(self) -> AnnotateResult<&'static str> {
        match self.media_type {
            Some(media_type) if self.certain => Ok(media_type),
            Some(media_type) => Err(AnnotateError::input(format!(
                "unknown image type (uncertain guess: {})",
                media_type
            ))),
            None => Err(AnnotateError::input("unknown image type")),
        }
    }
}

/// Guess the media type of `bytes` from its magic prefix.
pub fn sniff(bytes: &[u8]) -> AnnotateResult<MediaGuess> {
    if bytes.is_empty() {
        return Err(AnnotateError::input("image buffer is empty"));
    }
    let guess = match image::guess_format(bytes) {
        Ok(format) => MediaGuess {
            media_type: Some(format.to_mime_type()),
            certain: has_strong_signature(format)
                && format.to_mime_type().starts_with("image/"),
        },
        Err(_) => MediaGuess {
            media_type: None,
            certain: false,
        },
    };
    log::debug!(
        "sniffed {} bytes as {:?} (certain: {})",
        bytes.len(),
        guess.media_type,
        guess.certain
    );
    Ok(guess)
}

/// Sniff and insist on a certain result.
pub fn sniff_certain(bytes: &[u8]) -> AnnotateResult<&'static str> {
    sniff(bytes)?.require_certain()
}

fn has_strong_signature(format: ImageFormat) -> bool {
    !matches!(
        format,
        ImageFormat::Bmp | ImageFormat::Ico | ImageFormat::Pnm
    )
}
