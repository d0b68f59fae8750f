//! Incremental CSS 2.1 visual formatting model for the Koala layout engine.
//!
//! # Scope
//!
//! This crate implements:
//! - **Box generation** ([§ 9.2](https://www.w3.org/TR/CSS21/visuren.html#box-gen))
//!   - Principal, anonymous block and embedded boxes
//!   - Anonymous table objects
//!
//! - **Block layout** ([§ 10](https://www.w3.org/TR/CSS21/visudet.html))
//!   - Width and height equations, min/max constraints
//!   - Shrink-to-fit widths, replaced elements
//!   - Margin collapsing and clearance ([§ 8.3.1](https://www.w3.org/TR/CSS21/box.html#collapsing-margins))
//!
//! - **Inline layout** ([§ 9.4.2](https://www.w3.org/TR/CSS21/visuren.html#inline-formatting))
//!   - Line breaking with 'white-space' processing
//!   - 'text-align', baselines, inline-blocks
//!
//! - **Floats** ([§ 9.5](https://www.w3.org/TR/CSS21/visuren.html#floats))
//!
//! - **Positioning** ([§ 9.3](https://www.w3.org/TR/CSS21/visuren.html#positioning-scheme))
//!   - Relative offsets, absolute and fixed boxes
//!   - Stacking contexts ([Appendix E](https://www.w3.org/TR/CSS21/zindex.html))
//!
//! - **Tables** ([§ 17.5.2.2](https://www.w3.org/TR/CSS21/tables.html#auto-table-layout))
//!
//! - **Incremental reflow**: dirty flags, saved formatting-context state and
//!   reuse of clean subtrees
//!
//! # Not Yet Implemented
//!
//! - Right-to-left inline layout
//! - List markers
//! - Collapsing table borders, row spans

/// Background paint parameters and image requests per [§ 14.2](https://www.w3.org/TR/CSS21/colors.html#background).
pub mod background;
/// Block width and height resolution per [§ 10.3](https://www.w3.org/TR/CSS21/visudet.html#Computing_widths_and_margins).
pub mod block;
/// The box tree arena.
pub mod box_tree;
/// Engine settings.
pub mod config;
mod construct;
/// Content tree input.
pub mod content;
mod dump;
/// The incremental layout engine.
pub mod engine;
/// Public API errors.
pub mod error;
/// Dirty flags.
pub mod flags;
/// Float placement per [§ 9.5](https://www.w3.org/TR/CSS21/visuren.html#floats).
pub mod float;
/// Block formatting context state.
pub mod formatting_context;
/// Rectangles, edges and containing blocks.
pub mod geometry;
/// Inline formatting per [§ 9.4.2](https://www.w3.org/TR/CSS21/visuren.html#inline-formatting).
pub mod inline;
/// Margin collapsing per [§ 8.3.1](https://www.w3.org/TR/CSS21/box.html#collapsing-margins).
pub mod margin;
mod pass;
mod placement;
/// Positioning schemes per [§ 9.3](https://www.w3.org/TR/CSS21/visuren.html#positioning-scheme).
pub mod positioned;
/// JSON scene descriptions.
pub mod scene;
/// Stacking contexts per [§ 9.9](https://www.w3.org/TR/CSS21/visuren.html#layers).
pub mod stacking;
/// Computed and resolved style input.
pub mod style;
/// Table layout per [§ 17](https://www.w3.org/TR/CSS21/tables.html).
pub mod table;
/// Length values.
pub mod values;

// Re-exports for convenience
pub use background::{Background, ImageState};
pub use block::{UsedWidth, WidthConstraint, replaced_size, solve_block_width};
pub use box_tree::{BlockVariant, BoxId, BoxKind, BoxTree, BoxType, LayoutBox};
pub use config::LayoutConfig;
pub use content::{ContentTree, NodeId};
pub use engine::LayoutEngine;
pub use error::{LayoutError, Result};
pub use flags::LayoutFlags;
pub use float::{ClearSide, FloatSide};
pub use geometry::{ContainingBlock, EdgeSizes, Rect};
pub use inline::{ApproximateFontMetrics, FontMetrics};
pub use pass::LayoutStats;
pub use positioned::PositionType;
pub use scene::{LoadedScene, Scene, SceneNode};
pub use stacking::{StackingContextId, StackingTree, ZIndex};
pub use style::{ComputedStyle, Display, IntrinsicSize, Overflow, Sides, TextAlign, WhiteSpace};
pub use values::{AutoOr, Length, LengthOrAuto};
