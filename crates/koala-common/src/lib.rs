//! Common utilities for the Koala layout engine.
//!
//! This crate provides shared infrastructure used by the layout components:
//! - **Warning System** - deduplicated warnings for unsupported inputs
//! - **Image Requests** - the asynchronous image-ready contract used for
//!   background and replaced-element images

pub mod image;
pub mod warning;
