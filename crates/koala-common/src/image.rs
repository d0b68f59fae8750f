//! The asynchronous image-ready contract.
//!
//! [§ 14.2 The background](https://www.w3.org/TR/CSS21/colors.html#background)
//!
//! Layout issues a request for every background or replaced-element image
//! it encounters. The request is answered later, on the layout thread's
//! tick, by exactly one completion carrying either the intrinsic size of
//! the decoded image or the reason it failed. Fetching and decoding are the
//! business of the [`ImageSource`] implementation; layout only sees ids.

use std::collections::HashMap;

use thiserror::Error;

/// Handle for one in-flight or completed image request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageRequestId(pub u64);

/// Intrinsic dimensions of a decoded image, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImageSize {
    /// Intrinsic width.
    pub width: u32,
    /// Intrinsic height.
    pub height: u32,
}

impl ImageSize {
    /// Dimensions as `(width, height)` in `f32`, for layout.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn to_f32(self) -> (f32, f32) {
        (self.width as f32, self.height as f32)
    }
}

/// Why an image request did not produce an image.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageError {
    /// The fetch finished with a non-success status code.
    #[error("image fetch finished with status {0}")]
    Status(u16),
    /// Nothing is known under this URL.
    #[error("no image available for {0}")]
    NotFound(String),
}

/// Result delivered by a completion.
pub type ImageOutcome = Result<ImageSize, ImageError>;

/// A source of images that answers requests asynchronously.
///
/// Implementations must deliver exactly one completion per request id, and
/// only from [`ImageSource::drain_completed`], which the layout engine calls
/// at the start of each tick.
pub trait ImageSource {
    /// Issue a request for `url`.
    fn request(&mut self, url: &str) -> ImageRequestId;

    /// Take every completion that became available since the last call.
    fn drain_completed(&mut self) -> Vec<(ImageRequestId, ImageOutcome)>;

    /// Number of requests that have been issued but not yet drained.
    fn pending(&self) -> usize;
}

/// An [`ImageSource`] backed by a fixed table of known images.
///
/// Every request completes on the next drain: known URLs succeed with their
/// registered size, unknown URLs fail with status 404. Requests can be held
/// back with [`StaticImageSource::set_paused`] to model a slow network.
#[derive(Debug, Default)]
pub struct StaticImageSource {
    fixtures: HashMap<String, ImageSize>,
    in_flight: Vec<(ImageRequestId, String)>,
    next_id: u64,
    paused: bool,
}

impl StaticImageSource {
    /// Create an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the intrinsic size of the image behind `url`.
    pub fn insert(&mut self, url: impl Into<String>, size: ImageSize) {
        let _ = self.fixtures.insert(url.into(), size);
    }

    /// While paused, requests stay in flight and draining yields nothing.
    pub const fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }
}

impl ImageSource for StaticImageSource {
    fn request(&mut self, url: &str) -> ImageRequestId {
        let id = ImageRequestId(self.next_id);
        self.next_id += 1;
        self.in_flight.push((id, url.to_owned()));
        id
    }

    fn drain_completed(&mut self) -> Vec<(ImageRequestId, ImageOutcome)> {
        if self.paused {
            return Vec::new();
        }
        std::mem::take(&mut self.in_flight)
            .into_iter()
            .map(|(id, url)| {
                let outcome = match self.fixtures.get(&url) {
                    Some(size) => Ok(*size),
                    None if url.is_empty() => Err(ImageError::NotFound(url)),
                    None => Err(ImageError::Status(404)),
                };
                (id, outcome)
            })
            .collect()
    }

    fn pending(&self) -> usize {
        self.in_flight.len()
    }
}
