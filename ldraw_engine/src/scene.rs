use glam::{Quat, Vec3};

use crate::geometry::{MaterialHandle, MeshHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

/// Render pass a node is drawn in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderLayer {
    #[default]
    Normal,
    Highlight,
    Preview,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Renderable {
    pub mesh: MeshHandle,
    pub material: Option<MaterialHandle>,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub position: Vec3,
    pub rotation: Quat,
    pub active: bool,
    pub layer: RenderLayer,
    pub renderable: Option<Renderable>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    fn new(name: String, parent: Option<NodeId>) -> Self {
        Self {
            name,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            active: true,
            layer: RenderLayer::Normal,
            renderable: None,
            parent,
            children: Vec::new(),
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Generational arena of nodes. Despawning a node frees its subtree and
/// leaves stale ids behind.
#[derive(Debug, Default)]
pub struct SceneGraph {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_ref()
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_mut()
    }

    /// Creates an active node. A stale `parent` leaves the node at the root.
    pub fn spawn(&mut self, name: impl Into<String>, parent: Option<NodeId>) -> NodeId {
        let parent = parent.filter(|id| self.contains(*id));
        let node = Node::new(name.into(), parent);
        let id = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.node = Some(node);
                NodeId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                NodeId {
                    index,
                    generation: 0,
                }
            }
        };
        self.live += 1;
        if let Some(parent) = parent.and_then(|parent| self.get_mut(parent)) {
            parent.children.push(id);
        }
        id
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(Node::children).unwrap_or(&[])
    }

    /// Moves `id` under `parent` (or to the root). Refuses to create cycles.
    pub fn set_parent(&mut self, id: NodeId, parent: Option<NodeId>) -> bool {
        if !self.contains(id) {
            return false;
        }
        if let Some(parent) = parent {
            if !self.contains(parent) || self.is_ancestor(id, parent) {
                return false;
            }
        }
        self.detach(id);
        if let Some(node) = self.get_mut(id) {
            node.parent = parent;
        }
        if let Some(parent) = parent.and_then(|parent| self.get_mut(parent)) {
            parent.children.push(id);
        }
        true
    }

    pub fn set_active(&mut self, id: NodeId, active: bool) -> bool {
        match self.get_mut(id) {
            Some(node) => {
                node.active = active;
                true
            }
            None => false,
        }
    }

    pub fn is_active(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(|node| node.active)
    }

    /// True when the node and every ancestor are active.
    pub fn is_active_in_hierarchy(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node_id) = current {
            match self.get(node_id) {
                Some(node) if node.active => current = node.parent,
                _ => return false,
            }
        }
        true
    }

    pub fn set_layer_recursive(&mut self, id: NodeId, layer: RenderLayer) {
        for node_id in self.subtree(id) {
            if let Some(node) = self.get_mut(node_id) {
                node.layer = layer;
            }
        }
    }

    /// Ids of `id` and all its descendants, parents before children.
    pub fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if !self.contains(id) {
            return out;
        }
        let mut stack = vec![id];
        while let Some(node_id) = stack.pop() {
            out.push(node_id);
            stack.extend(self.children(node_id).iter().rev().copied());
        }
        out
    }

    /// Frees `id` and its subtree. Returns the number of nodes freed.
    pub fn despawn(&mut self, id: NodeId) -> usize {
        let doomed = self.subtree(id);
        if doomed.is_empty() {
            return 0;
        }
        self.detach(id);
        for node_id in &doomed {
            let slot = &mut self.slots[node_id.index as usize];
            slot.node = None;
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(node_id.index);
        }
        self.live -= doomed.len();
        doomed.len()
    }

    /// Deep copy of the subtree rooted at `id`, attached under `parent`.
    pub fn clone_subtree(&mut self, id: NodeId, parent: Option<NodeId>) -> Option<NodeId> {
        let source = self.get(id)?.clone();
        let copy = self.spawn(source.name.clone(), parent);
        if let Some(node) = self.get_mut(copy) {
            node.position = source.position;
            node.rotation = source.rotation;
            node.active = source.active;
            node.layer = source.layer;
            node.renderable = source.renderable;
        }
        for child in source.children {
            self.clone_subtree(child, Some(copy));
        }
        Some(copy)
    }

    fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.get(id).and_then(Node::parent) else {
            return;
        };
        if let Some(parent) = self.get_mut(parent) {
            parent.children.retain(|child| *child != id);
        }
    }

    fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node_id) = current {
            if node_id == ancestor {
                return true;
            }
            current = self.get(node_id).and_then(Node::parent);
        }
        false
    }
}
