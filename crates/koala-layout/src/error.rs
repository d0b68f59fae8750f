//! Errors reported by the engine's public API.
//!
//! Layout itself never fails: a sub-layout that cannot proceed leaves its
//! box dirty and is retried on the next pass. These errors cover callers
//! handing the engine inputs it does not know about.

use thiserror::Error;

use crate::box_tree::BoxId;
use crate::content::NodeId;

/// Error type for [`crate::LayoutEngine`] operations.
#[derive(Debug, Error)]
pub enum LayoutError {
    /// The node is not part of the content tree.
    #[error("unknown content node {0}")]
    UnknownNode(NodeId),

    /// The box handle outlived its box.
    #[error("stale box handle {0}")]
    StaleBox(BoxId),

    /// An element was inserted without a computed style.
    #[error("element {0} has no computed style")]
    MissingStyle(NodeId),

    /// The document has no root element to generate boxes for.
    #[error("document has no root element")]
    NoRootElement,

    /// A scene names an element it does not define.
    #[error("scene has no element named {0:?}")]
    UnknownName(String),

    /// A scene description could not be parsed.
    #[error("invalid scene: {0}")]
    Scene(#[from] serde_json::Error),
}

/// Result alias for engine operations.
pub type Result<T> = std::result::Result<T, LayoutError>;
