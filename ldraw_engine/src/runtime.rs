use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use ldraw_formats::{BuildMod, ColorTable, FlatStep, Step, StepPackage};
use serde::Serialize;

use crate::geometry::GeometryProvider;
use crate::model_container::ModelContainer;
use crate::scene::{NodeId, RenderLayer, SceneGraph};
use crate::step_container::{LoadContext, StepContainer};

/// Whether hidden models give their step geometry back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GeometryPolicy {
    #[default]
    Lazy,
    Resident,
}

impl GeometryPolicy {
    pub fn from_resident(resident: bool) -> Self {
        if resident {
            GeometryPolicy::Resident
        } else {
            GeometryPolicy::Lazy
        }
    }
}

#[derive(Debug)]
pub struct RuntimeModel {
    name: String,
    steps: Vec<Arc<Step>>,
    build_mods: BTreeMap<usize, BuildMod>,
    container: ModelContainer,
}

impl RuntimeModel {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn step(&self, index: usize) -> Option<&Step> {
        self.steps.get(index).map(Arc::as_ref)
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn is_last_step(&self, index: usize) -> bool {
        index + 1 == self.steps.len()
    }

    pub fn build_mod(&self, step: usize) -> Option<&BuildMod> {
        self.build_mods.get(&step)
    }

    pub fn has_build_mods(&self) -> bool {
        !self.build_mods.is_empty()
    }

    pub fn container(&self) -> &ModelContainer {
        &self.container
    }
}

/// Serializable view of one step container, used by tests and reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepSnapshot {
    pub label: String,
    pub loaded: bool,
    pub shown: bool,
    pub highlighted: bool,
    pub visible: Vec<bool>,
    pub instances: usize,
}

impl StepSnapshot {
    fn of(container: &StepContainer) -> Self {
        Self {
            label: container.label().to_string(),
            loaded: container.is_loaded(),
            shown: container.is_shown(),
            highlighted: container.is_highlighted(),
            visible: container.visible().to_vec(),
            instances: container.instance_count(),
        }
    }
}

pub struct BuildScene {
    graph: SceneGraph,
    geometry: Box<dyn GeometryProvider>,
    colors: ColorTable,
    model_names: BTreeSet<String>,
    models: Vec<RuntimeModel>,
    flat_steps: Vec<FlatStep>,
}

impl BuildScene {
    /// Builds hidden, unloaded containers for every model of `package`.
    pub fn new(
        package: &StepPackage,
        colors: ColorTable,
        geometry: Box<dyn GeometryProvider>,
        policy: GeometryPolicy,
    ) -> Self {
        let mut graph = SceneGraph::new();
        let resident = policy == GeometryPolicy::Resident;
        let models = package
            .models
            .iter()
            .map(|model| {
                let steps: Vec<Arc<Step>> =
                    model.steps.iter().cloned().map(Arc::new).collect();
                let container =
                    ModelContainer::new(&mut graph, &model.model_name, &steps, resident);
                RuntimeModel {
                    name: model.model_name.clone(),
                    steps,
                    build_mods: model.build_mods.clone(),
                    container,
                }
            })
            .collect::<Vec<_>>();
        log::info!(
            "scene ready: {} models, {} flat steps, {} parts ({policy:?} geometry)",
            models.len(),
            package.total_steps(),
            package.part_count()
        );
        Self {
            graph,
            geometry,
            colors,
            model_names: package.model_names(),
            models,
            flat_steps: package.flat_steps.clone(),
        }
    }

    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    pub fn colors(&self) -> &ColorTable {
        &self.colors
    }

    pub fn is_submodel(&self, part_id: &str) -> bool {
        self.model_names.contains(part_id)
    }

    pub fn models(&self) -> &[RuntimeModel] {
        &self.models
    }

    pub fn model(&self, index: usize) -> Option<&RuntimeModel> {
        self.models.get(index)
    }

    pub fn total_steps(&self) -> usize {
        self.flat_steps.len()
    }

    pub fn flat_step(&self, index: usize) -> Option<FlatStep> {
        self.flat_steps.get(index).copied()
    }

    /// Step data behind a flattened index.
    pub fn flat_step_data(&self, index: usize) -> Option<(&RuntimeModel, &Step)> {
        let flat = self.flat_step(index)?;
        let model = self.model(flat.model)?;
        Some((model, model.step(flat.model_step_idx)?))
    }

    pub fn show_model(&mut self, model: usize, show: bool) {
        let Some(runtime) = self.models.get_mut(model) else {
            log::debug!("model {model} out of range");
            return;
        };
        runtime.container.show(&mut self.graph, show);
    }

    pub fn is_model_shown(&self, model: usize) -> bool {
        self.model(model)
            .is_some_and(|runtime| runtime.container.is_shown(&self.graph))
    }

    pub fn show_step(&mut self, model: usize, step: usize, show: bool) {
        self.with_model(model, |container, ctx| container.show_step(ctx, step, show));
    }

    pub fn highlight_step(&mut self, model: usize, step: usize, highlight: bool) {
        self.with_model(model, |container, ctx| {
            container.highlight_step(ctx, step, highlight)
        });
    }

    pub fn show_step_parts(
        &mut self,
        model: usize,
        step: usize,
        show: bool,
        start: usize,
        end: Option<usize>,
    ) -> bool {
        self.with_model(model, |container, ctx| {
            container.show_step_parts(ctx, step, show, start, end)
        })
        .unwrap_or(false)
    }

    /// Detached, inactive copy of one part instance.
    pub fn clone_part(&mut self, model: usize, step: usize, index: usize) -> Option<NodeId> {
        self.with_model(model, |container, ctx| {
            container
                .step_container_mut(step)
                .and_then(|step| step.clone_part(ctx, index))
        })
        .flatten()
    }

    /// Frees a copy made by `clone_part`. Nodes that are not part previews
    /// are left alone.
    pub fn release_clone(&mut self, clone: NodeId) -> bool {
        let is_preview = self.graph.get(clone).is_some_and(|node| {
            node.parent().is_none() && node.layer == RenderLayer::Preview
        });
        if !is_preview {
            log::debug!("{clone:?} is not a part preview; not released");
            return false;
        }
        self.graph.despawn(clone) > 0
    }

    pub fn step_snapshot(&self, model: usize, step: usize) -> Option<StepSnapshot> {
        let container = self.model(model)?.container.step_container(step)?;
        Some(StepSnapshot::of(container))
    }

    /// Steps of `model` that are currently switched on, in order. Empty when
    /// the model itself is hidden.
    pub fn visible_steps(&self, model: usize) -> Vec<usize> {
        let Some(runtime) = self.model(model) else {
            return Vec::new();
        };
        if !runtime.container.is_shown(&self.graph) {
            return Vec::new();
        }
        (0..runtime.step_count())
            .filter(|&step| {
                runtime
                    .container
                    .step_container(step)
                    .is_some_and(StepContainer::is_shown)
            })
            .collect()
    }

    pub fn loaded_steps(&self) -> usize {
        self.models
            .iter()
            .map(|model| model.container.loaded_steps())
            .sum()
    }

    fn with_model<R>(
        &mut self,
        model: usize,
        f: impl FnOnce(&mut ModelContainer, &mut LoadContext<'_>) -> R,
    ) -> Option<R> {
        let Self {
            graph,
            geometry,
            colors,
            model_names,
            models,
            ..
        } = self;
        let Some(runtime) = models.get_mut(model) else {
            log::debug!("model {model} out of range ({} models)", models.len());
            return None;
        };
        let mut ctx = LoadContext {
            graph,
            geometry: &**geometry,
            colors,
            model_names,
        };
        Some(f(&mut runtime.container, &mut ctx))
    }
}

/// Converts a wire vector into the math type used by the scene.
pub(crate) fn to_glam(v: ldraw_formats::Vec3) -> glam::Vec3 {
    glam::Vec3::from_array(v.to_array())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::CatalogGeometry;
    use ldraw_formats::{ModelData, Part, Vec3};

    fn package() -> StepPackage {
        let step = |ids: &[&str]| {
            Step::new(
                ids.iter().map(|id| Part::new(*id, 16)).collect(),
                Vec3::ZERO,
                1.0,
            )
        };
        let main = ModelData::new("main.ldr", vec![step(&["a.dat", "b.dat"]), step(&["sub.ldr"])]);
        let sub = ModelData::new("sub.ldr", vec![step(&["c.dat"])]);
        StepPackage::new(
            vec![sub, main],
            vec![FlatStep::new(0, 0), FlatStep::new(1, 0), FlatStep::new(1, 1)],
        )
        .expect("valid package")
    }

    fn scene(policy: GeometryPolicy) -> BuildScene {
        let package = package();
        let colors = ColorTable::placeholder_for(&package);
        BuildScene::new(&package, colors, Box::new(CatalogGeometry::permissive()), policy)
    }

    #[test]
    fn builds_hidden_unloaded_models() {
        let scene = scene(GeometryPolicy::Lazy);
        assert_eq!(scene.models().len(), 2);
        assert_eq!(scene.total_steps(), 3);
        assert_eq!(scene.graph().len(), 2);
        assert_eq!(scene.loaded_steps(), 0);
        assert!(!scene.is_model_shown(1));
        assert!(scene.is_submodel("sub.ldr"));
        let (model, step) = scene.flat_step_data(2).expect("flat step");
        assert_eq!(model.name(), "main.ldr");
        assert_eq!(step.parts[0].part_id(), "sub.ldr");
    }

    #[test]
    fn snapshot_reflects_step_state() {
        let mut scene = scene(GeometryPolicy::Lazy);
        scene.show_model(1, true);
        scene.show_step(1, 0, true);
        assert!(scene.show_step_parts(1, 0, false, 1, None));
        let snapshot = scene.step_snapshot(1, 0).expect("snapshot");
        assert_eq!(snapshot.label, "main.ldr_1");
        assert!(snapshot.loaded && snapshot.shown && !snapshot.highlighted);
        assert_eq!(snapshot.visible, vec![true, false]);
        assert_eq!(snapshot.instances, 2);
        assert_eq!(scene.visible_steps(1), vec![0]);
    }

    #[test]
    fn released_clones_leave_the_graph() {
        let mut scene = scene(GeometryPolicy::Lazy);
        scene.show_step(1, 0, true);
        let before = scene.graph().len();
        let clones: Vec<NodeId> = (0..5)
            .map(|_| scene.clone_part(1, 0, 0).expect("clone"))
            .collect();
        assert_eq!(scene.graph().len(), before + 5);

        for clone in &clones {
            assert!(scene.release_clone(*clone));
        }
        assert_eq!(scene.graph().len(), before);
        assert!(!scene.release_clone(clones[0]), "stale id released twice");

        let model_node = scene.model(1).expect("model").container().node();
        assert!(!scene.release_clone(model_node));
        assert!(scene.graph().contains(model_node));
    }

    #[test]
    fn lazy_policy_unloads_hidden_models() {
        let mut scene = scene(GeometryPolicy::Lazy);
        scene.show_step(1, 0, true);
        scene.show_step(1, 1, true);
        scene.show_model(1, true);
        assert_eq!(scene.loaded_steps(), 2);
        scene.show_model(1, false);
        assert_eq!(scene.loaded_steps(), 0);
        assert!(scene.visible_steps(1).is_empty());
    }

    #[test]
    fn resident_policy_keeps_geometry() {
        let mut scene = scene(GeometryPolicy::Resident);
        scene.show_step(1, 0, true);
        scene.show_model(1, false);
        assert_eq!(scene.loaded_steps(), 1);
    }

    #[test]
    fn invalid_indices_are_ignored() {
        let mut scene = scene(GeometryPolicy::Lazy);
        scene.show_step(9, 0, true);
        scene.show_model(9, true);
        assert!(!scene.show_step_parts(0, 5, true, 0, None));
        assert!(scene.step_snapshot(1, 9).is_none());
        assert_eq!(scene.loaded_steps(), 0);
        assert!(scene.clone_part(1, 0, 7).is_none());
        assert!(scene.clone_part(1, 0, 1).is_some());
    }
}
