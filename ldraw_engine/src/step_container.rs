//! Lazily instantiated geometry for one build step. A container is either
//! unloaded (only the step data and the visibility/highlight bits exist) or
//! loaded (one scene node per resolvable part under a per-step group node).
//! Stored state is re-applied every time geometry is recreated, in the order
//! part visibility, highlight, then step visibility.

use std::{collections::BTreeSet, sync::Arc};

use glam::{Quat, Vec3};
use ldraw_formats::{part_file_name, ColorTable, Part, Step};

use crate::geometry::GeometryProvider;
use crate::scene::{NodeId, RenderLayer, Renderable, SceneGraph};

/// Everything a container needs to turn step data into scene nodes.
pub struct LoadContext<'a> {
    pub graph: &'a mut SceneGraph,
    pub geometry: &'a dyn GeometryProvider,
    pub colors: &'a ColorTable,
    pub model_names: &'a BTreeSet<String>,
}

#[derive(Debug)]
pub struct StepContainer {
    step: Arc<Step>,
    label: String,
    parent: NodeId,
    group: Option<NodeId>,
    /// Indexed by part; `None` where the part could not be resolved.
    instances: Vec<Option<NodeId>>,
    visible: Vec<bool>,
    shown: bool,
    highlighted: bool,
    unloadable: bool,
}

impl StepContainer {
    pub fn new(step: Arc<Step>, label: impl Into<String>, parent: NodeId) -> Self {
        let visible = vec![true; step.part_count()];
        Self {
            step,
            label: label.into(),
            parent,
            group: None,
            instances: Vec::new(),
            visible,
            shown: false,
            highlighted: false,
            unloadable: true,
        }
    }

    /// Container whose geometry stays resident once loaded.
    pub fn resident(step: Arc<Step>, label: impl Into<String>, parent: NodeId) -> Self {
        Self {
            unloadable: false,
            ..Self::new(step, label, parent)
        }
    }

    pub fn step(&self) -> &Step {
        &self.step
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn part_count(&self) -> usize {
        self.visible.len()
    }

    pub fn is_loaded(&self) -> bool {
        self.group.is_some()
    }

    pub fn is_unloadable(&self) -> bool {
        self.unloadable
    }

    pub fn is_shown(&self) -> bool {
        self.shown
    }

    pub fn is_highlighted(&self) -> bool {
        self.highlighted
    }

    pub fn visible(&self) -> &[bool] {
        &self.visible
    }

    pub fn group(&self) -> Option<NodeId> {
        self.group
    }

    pub fn instance(&self, index: usize) -> Option<NodeId> {
        self.instances.get(index).copied().flatten()
    }

    /// Number of parts that currently have a scene node.
    pub fn instance_count(&self) -> usize {
        self.instances.iter().flatten().count()
    }

    pub fn ensure_loaded(&mut self, ctx: &mut LoadContext<'_>) {
        if self.group.is_some_and(|group| ctx.graph.contains(group)) {
            return;
        }
        self.load(ctx);
    }

    fn load(&mut self, ctx: &mut LoadContext<'_>) {
        let group = ctx.graph.spawn(self.label.clone(), Some(self.parent));
        ctx.graph.set_active(group, false);

        let step = Arc::clone(&self.step);
        self.instances = step
            .parts
            .iter()
            .enumerate()
            .map(|(index, part)| self.instantiate(ctx, group, index, part))
            .collect();
        self.group = Some(group);

        let layer = self.layer();
        ctx.graph.set_layer_recursive(group, layer);
        ctx.graph.set_active(group, self.shown);

        log::debug!(
            "loaded step {} ({} of {} parts)",
            self.label,
            self.instance_count(),
            self.part_count()
        );
    }

    fn instantiate(
        &self,
        ctx: &mut LoadContext<'_>,
        group: NodeId,
        index: usize,
        part: &Part,
    ) -> Option<NodeId> {
        let file_name = part_file_name(part.part_id());
        let Some(mesh) = ctx.geometry.load_geometry(&file_name) else {
            log::warn!("missing geometry for part {} in {}", part.part_id(), self.label);
            return None;
        };

        let material = if ctx.model_names.contains(part.part_id()) {
            None
        } else {
            let Some(color) = ctx.colors.get(part.color()) else {
                log::warn!(
                    "missing color {} for part {} in {}",
                    part.color(),
                    part.part_id(),
                    self.label
                );
                return None;
            };
            let Some(material) = ctx.geometry.load_material(color.color) else {
                log::warn!(
                    "missing material {} for part {}",
                    color.color.material_key(),
                    part.part_id()
                );
                return None;
            };
            Some(material)
        };

        let node_id = ctx.graph.spawn(file_name, Some(group));
        if let Some(node) = ctx.graph.get_mut(node_id) {
            node.position = Vec3::from_array(part.position.to_array());
            node.rotation = part_rotation(part);
            node.active = self.visible.get(index).copied().unwrap_or(true);
            node.renderable = Some(Renderable { mesh, material });
        }
        Some(node_id)
    }

    pub fn show(&mut self, ctx: &mut LoadContext<'_>, show: bool) {
        self.shown = show;
        if show {
            self.ensure_loaded(ctx);
        }
        if let Some(group) = self.group {
            ctx.graph.set_active(group, show);
        }
    }

    /// Sets the visibility of parts `start..=end` (`end` of `None` runs to
    /// the last part). Out-of-range requests are ignored.
    pub fn show_parts(
        &mut self,
        ctx: &mut LoadContext<'_>,
        show: bool,
        start: usize,
        end: Option<usize>,
    ) -> bool {
        self.ensure_loaded(ctx);
        let Some(last) = self.part_count().checked_sub(1) else {
            return false;
        };
        let end = end.unwrap_or(last);
        if start > end || end > last {
            log::debug!(
                "ignoring part range {start}..={end} for {} ({} parts)",
                self.label,
                self.part_count()
            );
            return false;
        }

        for index in start..=end {
            self.visible[index] = show;
            if let Some(node_id) = self.instance(index) {
                ctx.graph.set_active(node_id, show);
            }
        }
        true
    }

    pub fn highlight(&mut self, ctx: &mut LoadContext<'_>, highlight: bool) {
        self.highlighted = highlight;
        if highlight {
            self.ensure_loaded(ctx);
        }
        if let Some(group) = self.group {
            ctx.graph.set_layer_recursive(group, self.layer());
        }
    }

    /// Frees the step geometry. Resident containers keep theirs.
    pub fn unload(&mut self, graph: &mut SceneGraph) -> bool {
        if !self.unloadable {
            return false;
        }
        let Some(group) = self.group.take() else {
            return false;
        };
        graph.despawn(group);
        self.instances.clear();
        log::debug!("unloaded step {}", self.label);
        true
    }

    /// Detached, inactive copy of part `index` on the preview layer.
    pub fn clone_part(&mut self, ctx: &mut LoadContext<'_>, index: usize) -> Option<NodeId> {
        self.ensure_loaded(ctx);
        let Some(source) = self.instance(index) else {
            log::error!("no instance for part {index} of {}", self.label);
            return None;
        };
        let copy = ctx.graph.clone_subtree(source, None)?;
        ctx.graph.set_active(copy, false);
        ctx.graph.set_layer_recursive(copy, RenderLayer::Preview);
        Some(copy)
    }

    fn layer(&self) -> RenderLayer {
        if self.highlighted {
            RenderLayer::Highlight
        } else {
            RenderLayer::Normal
        }
    }
}

fn part_rotation(part: &Part) -> Quat {
    let rotation = Quat::from_array(part.rotation.to_array());
    if rotation.length_squared() <= f32::EPSILON {
        Quat::IDENTITY
    } else {
        rotation.normalize()
    }
}
