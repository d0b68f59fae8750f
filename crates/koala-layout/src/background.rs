//! Background paint parameters and the image request lifecycle.
//!
//! [§ 14.2 The background](https://www.w3.org/TR/CSS21/colors.html#background)
//!
//! A box with a 'background-image' issues a request through the engine's
//! [`ImageSource`] the first time it is laid out. The completion arrives
//! on a later tick; until then the document's load delay counts it. A box
//! destroyed while its request is in flight detaches from it, so the late
//! completion only settles the count.

use std::collections::HashMap;

use koala_common::image::{ImageOutcome, ImageRequestId, ImageSize, ImageSource};

use crate::box_tree::{BoxId, BoxTree};
use crate::flags::LayoutFlags;
use crate::pass::LayoutPass;
use crate::style::BackgroundAttachment;
use crate::values::Length;

/// Where a background image request stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageState {
    /// No image.
    #[default]
    None,
    /// Requested, not answered yet.
    Loading,
    /// Decoded with this intrinsic size.
    Ready(ImageSize),
    /// The request failed; only the color paints.
    Failed,
}

/// Resolved background of one box, as painting consumes it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Background {
    /// 'background-color' as `0xRRGGBBAA`.
    pub color: u32,
    /// 'background-image' URL.
    pub url: Option<String>,
    /// The request issued for [`Background::url`].
    pub request: Option<ImageRequestId>,
    /// State of the image.
    pub image: ImageState,
    /// Horizontal position of the image within its positioning area.
    pub left: f32,
    /// Vertical position of the image within its positioning area.
    pub top: f32,
}

/// In-flight image requests and the boxes waiting on them.
pub struct ImageRequests {
    source: Box<dyn ImageSource>,
    owners: HashMap<ImageRequestId, Option<BoxId>>,
    load_delay: usize,
}

impl std::fmt::Debug for ImageRequests {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageRequests")
            .field("owners", &self.owners)
            .field("load_delay", &self.load_delay)
            .finish_non_exhaustive()
    }
}

impl ImageRequests {
    /// Track requests issued through `source`.
    #[must_use]
    pub fn new(source: Box<dyn ImageSource>) -> Self {
        Self {
            source,
            owners: HashMap::new(),
            load_delay: 0,
        }
    }

    /// Request `url` on behalf of `owner`.
    pub fn request(&mut self, url: &str, owner: BoxId) -> ImageRequestId {
        let id = self.source.request(url);
        let _ = self.owners.insert(id, Some(owner));
        self.load_delay += 1;
        log::trace!("image request {} for {owner}: {url}", id.0);
        id
    }

    /// The owner of `request` no longer wants the result.
    pub fn detach(&mut self, request: ImageRequestId) {
        if let Some(owner) = self.owners.get_mut(&request) {
            *owner = None;
        }
    }

    /// Requests issued and not yet completed.
    #[must_use]
    pub const fn load_delay_count(&self) -> usize {
        self.load_delay
    }

    /// Take the completions delivered since the last call, paired with the
    /// boxes still waiting on them.
    pub fn drain(&mut self) -> Vec<(BoxId, ImageRequestId, ImageOutcome)> {
        let mut out = Vec::new();
        for (request, outcome) in self.source.drain_completed() {
            let Some(owner) = self.owners.remove(&request) else {
                continue;
            };
            self.load_delay = self.load_delay.saturating_sub(1);
            match owner {
                Some(owner) => out.push((owner, request, outcome)),
                None => log::debug!("image request {} completed after its box was destroyed", request.0),
            }
        }
        out
    }

    /// Apply pending completions to the boxes of `tree`. A successful load
    /// marks the box for reflow so the image gets positioned. Returns the
    /// number of boxes updated.
    pub fn deliver(&mut self, tree: &mut BoxTree) -> usize {
        let mut applied = 0;
        for (owner, request, outcome) in self.drain() {
            let Some(b) = tree.get_mut(owner) else {
                continue;
            };
            if b.background.request != Some(request) {
                continue;
            }
            applied += 1;
            match outcome {
                Ok(size) => {
                    b.background.image = ImageState::Ready(size);
                    tree.set_flags(owner, LayoutFlags::NEED_REFLOW);
                }
                Err(err) => {
                    log::debug!("background image for {owner} failed: {err}");
                    b.background.image = ImageState::Failed;
                }
            }
        }
        applied
    }
}

/// [§ 14.2.1 'background-position'](https://www.w3.org/TR/CSS21/colors.html#background-properties)
///
/// "Percentage: A percentage X aligns the point X% across (for horizontal)
/// or down (for vertical) the image with the point X% across (for
/// horizontal) or down (for vertical) the element's padding box."
fn background_offset(position: Length, area: f32, image: f32) -> f32 {
    match position {
        Length::Px(px) => px,
        Length::Percent { percent } => (area - image) * percent / 100.0,
    }
}

impl LayoutPass<'_> {
    /// Bring the background of `id` in line with its style: color, the
    /// image request and the image position.
    pub(crate) fn update_background(&mut self, id: BoxId) {
        let Some(b) = self.tree.get(id) else {
            return;
        };
        let Some(style) = b.node.and_then(|n| self.styles.computed(n)) else {
            return;
        };
        let color = style.background_color;
        let url = style.background_image.clone();
        let (position_x, position_y) = (style.background_position_x, style.background_position_y);
        let fixed_root = style.background_attachment == BackgroundAttachment::Fixed && Some(id) == self.tree.root();
        let (area_w, area_h) = if fixed_root {
            (self.config.viewport_width, self.config.viewport_height)
        } else {
            (b.padding_width(), b.padding_height())
        };
        let previous = b.background.request.filter(|_| b.background.url != url);

        if let Some(request) = previous {
            self.images.detach(request);
        }
        let request = match (&url, previous.is_some() || b.background.request.is_none()) {
            (Some(url), true) => Some(self.images.request(url, id)),
            _ => None,
        };

        let Some(b) = self.tree.get_mut(id) else {
            return;
        };
        b.background.color = color;
        if b.background.url != url || request.is_some() {
            b.background.request = request;
            b.background.image = if request.is_some() {
                ImageState::Loading
            } else {
                ImageState::None
            };
            b.background.url = url;
        }
        let (image_w, image_h) = match b.background.image {
            ImageState::Ready(size) => size.to_f32(),
            _ => (0.0, 0.0),
        };
        b.background.left = background_offset(position_x, area_w, image_w);
        b.background.top = background_offset(position_y, area_h, image_h);
    }
}

#[cfg(test)]
mod tests {
    use koala_common::image::StaticImageSource;

    use super::*;
    use crate::box_tree::{BlockVariant, LayoutBox};

    fn requests(paused: bool) -> ImageRequests {
        let mut source = StaticImageSource::new();
        source.insert("a.png", ImageSize { width: 10, height: 10 });
        source.set_paused(paused);
        ImageRequests::new(Box::new(source))
    }

    #[test]
    fn completion_marks_owner_for_reflow() {
        let mut tree = BoxTree::new();
        let id = tree.alloc(LayoutBox::block(BlockVariant::Plain, None));
        tree.clear_flags(id, LayoutFlags::all());
        let mut images = requests(false);
        let request = images.request("a.png", id);
        if let Some(b) = tree.get_mut(id) {
            b.background.request = Some(request);
        }
        assert_eq!(images.load_delay_count(), 1);

        assert_eq!(images.deliver(&mut tree), 1);
        assert_eq!(images.load_delay_count(), 0);
        let b = tree.get(id).unwrap();
        assert_eq!(b.background.image, ImageState::Ready(ImageSize { width: 10, height: 10 }));
        assert!(b.flags.contains(LayoutFlags::NEED_REFLOW));
    }

    #[test]
    fn detached_request_completes_as_no_op() {
        let mut tree = BoxTree::new();
        let id = tree.alloc(LayoutBox::block(BlockVariant::Plain, None));
        let mut images = requests(false);
        let request = images.request("a.png", id);
        images.detach(request);
        assert_eq!(images.deliver(&mut tree), 0);
        assert_eq!(images.load_delay_count(), 0);
    }

    #[test]
    fn percentage_position_aligns_image_and_area() {
        assert_eq!(background_offset(Length::percent(50.0), 100.0, 20.0), 40.0);
        assert_eq!(background_offset(Length::Px(7.0), 100.0, 20.0), 7.0);
    }
}
