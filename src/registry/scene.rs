//! Capability interfaces toward the rendering layer.
//!
//! The registry never touches a scene graph while it mutates. It queues
//! [`SceneChange`]s and replays them into a [`SceneSink`] when the caller
//! runs [`ModuleRegistry::sync`](super::ModuleRegistry::sync).

use std::collections::HashMap;
use std::fmt;

use crate::geometry::{Size3, Vec3};
use crate::panel::PanelRole;

/// Identity of one node in the external scene
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeKey {
    Module(String),
    Panel { module: String, role: PanelRole },
    SubModel { module: String, instance: String },
}

impl NodeKey {
    pub fn module(&self) -> &str {
        match self {
            NodeKey::Module(module)
            | NodeKey::Panel { module, .. }
            | NodeKey::SubModel { module, .. } => module,
        }
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKey::Module(id) => write!(f, "module:{}", id),
            NodeKey::Panel { module, role } => write!(f, "panel:{}/{}", module, role),
            NodeKey::SubModel { module, instance } => write!(f, "sub-model:{}/{}", module, instance),
        }
    }
}

/// What the scene should show for a node. Panel and sub-model positions are
/// relative to their module node.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneNode<H> {
    Module {
        position: Vec3,
        rotation: f64,
        size: Size3,
    },
    Panel {
        size: Size3,
        position: Vec3,
        material: Option<H>,
    },
    SubModel {
        model: String,
        position: Vec3,
        size: Option<Size3>,
        asset: Option<String>,
        material: Option<H>,
    },
}

/// Scene-graph insertion and removal, keyed by node identity
pub trait SceneSink<H> {
    /// Insert a node, replacing any node already stored under `key`
    fn insert(&mut self, key: NodeKey, node: SceneNode<H>);

    /// Remove a node; unknown keys are ignored
    fn remove(&mut self, key: &NodeKey);

    /// Signal that a redraw is due
    fn request_update(&mut self);
}

/// Resolves a material name to an opaque visual handle
pub trait MaterialResolver {
    type Handle;

    fn resolve(&self, name: &str) -> Option<Self::Handle>;
}

/// Resolver that hands the material name back as its own handle
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughMaterials;

impl MaterialResolver for PassthroughMaterials {
    type Handle = String;

    fn resolve(&self, name: &str) -> Option<String> {
        Some(name.to_string())
    }
}

impl<H: Clone> MaterialResolver for HashMap<String, H> {
    type Handle = H;

    fn resolve(&self, name: &str) -> Option<H> {
        self.get(name).cloned()
    }
}

/// A queued change, replayed on the next sync
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneChange {
    Upsert(NodeKey),
    Remove(NodeKey),
}

/// One call received by a [`SceneLog`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneEvent {
    Insert(NodeKey),
    Remove(NodeKey),
}

/// In-memory sink that mirrors the scene and records every call
#[derive(Debug, Clone)]
pub struct SceneLog<H> {
    pub nodes: HashMap<NodeKey, SceneNode<H>>,
    pub events: Vec<SceneEvent>,
    pub updates: usize,
}

impl<H> Default for SceneLog<H> {
    fn default() -> Self {
        Self {
            nodes: HashMap::new(),
            events: Vec::new(),
            updates: 0,
        }
    }
}

impl<H> SceneLog<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events recorded since the last call, clearing the log
    pub fn take_events(&mut self) -> Vec<SceneEvent> {
        std::mem::take(&mut self.events)
    }
}

impl<H> SceneSink<H> for SceneLog<H> {
    fn insert(&mut self, key: NodeKey, node: SceneNode<H>) {
        self.events.push(SceneEvent::Insert(key.clone()));
        self.nodes.insert(key, node);
    }

    fn remove(&mut self, key: &NodeKey) {
        self.events.push(SceneEvent::Remove(key.clone()));
        self.nodes.remove(key);
    }

    fn request_update(&mut self) {
        self.updates += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_key_display() {
        let key = NodeKey::Panel {
            module: "base-1".to_string(),
            role: PanelRole::Shelf(0),
        };
        assert_eq!(key.to_string(), "panel:base-1/shelf-0");
        assert_eq!(key.module(), "base-1");
    }

    #[test]
    fn test_map_resolver() {
        let mut materials = HashMap::new();
        materials.insert("oak".to_string(), 7u32);
        assert_eq!(materials.resolve("oak"), Some(7));
        assert_eq!(materials.resolve("pine"), None);
    }

    #[test]
    fn test_scene_log_mirrors_nodes() {
        let mut log: SceneLog<String> = SceneLog::new();
        let key = NodeKey::Module("m".to_string());
        log.insert(
            key.clone(),
            SceneNode::Module {
                position: Vec3::ZERO,
                rotation: 0.0,
                size: Size3::uniform(1.0),
            },
        );
        assert!(log.nodes.contains_key(&key));
        log.remove(&key);
        assert!(log.nodes.is_empty());
        assert_eq!(
            log.take_events(),
            vec![SceneEvent::Insert(key.clone()), SceneEvent::Remove(key)]
        );
    }
}
