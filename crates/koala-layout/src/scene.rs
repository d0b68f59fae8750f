//! Scene descriptions.
//!
//! A scene is a JSON document describing a content tree with the computed
//! style of every element, the images its backgrounds reference and the
//! engine settings:
//!
//! ```json
//! {
//!   "config": { "viewport_width": 800 },
//!   "images": { "tile.png": { "width": 16, "height": 16 } },
//!   "root": {
//!     "tag": "html",
//!     "style": { "display": "block" },
//!     "children": [
//!       { "tag": "p", "name": "first", "style": { "display": "block" },
//!         "children": [ { "text": "Hello" } ] }
//!     ]
//!   }
//! }
//! ```

use std::collections::{BTreeMap, HashMap};

use koala_common::image::{ImageSize, StaticImageSource};
use koala_common::warning::{clear_warnings, warn_once};
use serde::Deserialize;

use crate::config::LayoutConfig;
use crate::content::NodeId;
use crate::engine::LayoutEngine;
use crate::error::{LayoutError, Result};
use crate::style::ComputedStyle;

/// Intrinsic size of a fixture image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ImageFixture {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// One node of a scene's content tree.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SceneNode {
    /// A text node.
    Text {
        /// Character data.
        text: String,
    },
    /// An element.
    Element {
        /// Tag name.
        tag: String,
        /// Name the element can be looked up by after loading.
        #[serde(default)]
        name: Option<String>,
        /// Computed style.
        #[serde(default)]
        style: ComputedStyle,
        /// Children in document order.
        #[serde(default)]
        children: Vec<SceneNode>,
    },
}

impl SceneNode {
    /// A text node.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// An unnamed element.
    #[must_use]
    pub fn element(tag: impl Into<String>, style: ComputedStyle, children: Vec<Self>) -> Self {
        Self::Element {
            tag: tag.into(),
            name: None,
            style,
            children,
        }
    }

    /// Give an element a name. Text nodes are returned unchanged.
    #[must_use]
    pub fn named(self, name: impl Into<String>) -> Self {
        match self {
            Self::Element {
                tag, style, children, ..
            } => Self::Element {
                tag,
                name: Some(name.into()),
                style,
                children,
            },
            text @ Self::Text { .. } => text,
        }
    }
}

/// A complete scene.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Scene {
    /// Engine settings.
    #[serde(default)]
    pub config: LayoutConfig,
    /// Images by URL.
    #[serde(default)]
    pub images: BTreeMap<String, ImageFixture>,
    /// The root element.
    pub root: SceneNode,
}

/// An engine built from a scene, with the named elements.
#[derive(Debug)]
pub struct LoadedScene {
    /// The engine holding the scene's content.
    pub engine: LayoutEngine,
    names: HashMap<String, NodeId>,
}

impl LoadedScene {
    /// The element named `name`.
    ///
    /// # Errors
    ///
    /// [`LayoutError::UnknownName`] when no element has that name.
    pub fn node(&self, name: &str) -> Result<NodeId> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| LayoutError::UnknownName(name.to_owned()))
    }
}

impl Scene {
    /// A scene with default settings and no images.
    #[must_use]
    pub fn new(root: SceneNode) -> Self {
        Self {
            config: LayoutConfig::default(),
            images: BTreeMap::new(),
            root,
        }
    }

    /// Parse a scene from JSON.
    ///
    /// # Errors
    ///
    /// [`LayoutError::Scene`] when the JSON does not describe a scene.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Create an engine holding the scene's content. Nothing is laid out
    /// until the engine ticks.
    ///
    /// # Errors
    ///
    /// [`LayoutError::NoRootElement`] when the root is a text node.
    pub fn load(&self) -> Result<LoadedScene> {
        self.load_with(StaticImageSource::new())
    }

    /// Like [`Scene::load`], answering image requests from `source` after
    /// the scene's fixtures are added to it.
    ///
    /// # Errors
    ///
    /// [`LayoutError::NoRootElement`] when the root is a text node.
    pub fn load_with(&self, mut source: StaticImageSource) -> Result<LoadedScene> {
        if matches!(self.root, SceneNode::Text { .. }) {
            return Err(LayoutError::NoRootElement);
        }
        clear_warnings();
        for (url, fixture) in &self.images {
            source.insert(
                url.clone(),
                ImageSize {
                    width: fixture.width,
                    height: fixture.height,
                },
            );
        }
        let mut engine = LayoutEngine::new(self.config, Box::new(source));
        let mut names = HashMap::new();
        let root = add_node(&mut engine, &self.root, &mut names)?;
        engine.append_content(NodeId::ROOT, root)?;
        log::debug!("scene loaded: {} nodes", engine.content().len());
        Ok(LoadedScene { engine, names })
    }
}

fn add_node(engine: &mut LayoutEngine, node: &SceneNode, names: &mut HashMap<String, NodeId>) -> Result<NodeId> {
    match node {
        SceneNode::Text { text } => Ok(engine.create_text(text.clone())),
        SceneNode::Element {
            tag,
            name,
            style,
            children,
        } => {
            let id = engine.create_element(tag.clone(), style.clone());
            if let Some(name) = name {
                if names.insert(name.clone(), id).is_some() {
                    let _ = warn_once("Scene", &format!("element name {name:?} is used twice"));
                }
            }
            for child in children {
                let child = add_node(engine, child, names)?;
                engine.append_content(id, child)?;
            }
            Ok(id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::Display;

    #[test]
    fn parses_nested_elements_and_text() {
        let scene = Scene::from_json(
            r#"{
                "root": {
                    "tag": "html",
                    "style": { "display": "block" },
                    "children": [
                        { "tag": "p", "name": "p", "style": { "display": "block" },
                          "children": [ { "text": "hi" } ] }
                    ]
                }
            }"#,
        )
        .unwrap();
        let loaded = scene.load().unwrap();
        let p = loaded.node("p").unwrap();
        assert_eq!(loaded.engine.content().tag(p), Some("p"));
        assert_eq!(
            loaded.engine.styles().computed(p).map(|s| s.display),
            Some(Display::Block)
        );
        assert!(matches!(loaded.node("missing"), Err(LayoutError::UnknownName(_))));
    }

    #[test]
    fn text_root_is_rejected() {
        let scene = Scene::new(SceneNode::text("loose"));
        assert!(matches!(scene.load(), Err(LayoutError::NoRootElement)));
    }

    #[test]
    fn malformed_json_is_a_scene_error() {
        assert!(matches!(Scene::from_json("{"), Err(LayoutError::Scene(_))));
    }
}
