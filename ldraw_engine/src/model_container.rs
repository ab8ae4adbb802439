use std::sync::Arc;

use ldraw_formats::Step;

use crate::scene::{NodeId, SceneGraph};
use crate::step_container::{LoadContext, StepContainer};

const MODEL_NODE_PREFIX: &str = "model_";

/// Ordered step containers of one model under a shared model node. Hiding the
/// model frees the geometry of every step.
#[derive(Debug)]
pub struct ModelContainer {
    node: NodeId,
    steps: Vec<StepContainer>,
}

impl ModelContainer {
    /// Creates the (hidden) model node and one container per step.
    pub fn new(
        graph: &mut SceneGraph,
        model_name: &str,
        steps: &[Arc<Step>],
        resident: bool,
    ) -> Self {
        let node = graph.spawn(format!("{MODEL_NODE_PREFIX}{model_name}"), None);
        graph.set_active(node, false);
        let steps = steps
            .iter()
            .enumerate()
            .map(|(index, step)| {
                let label = format!("{model_name}_{}", index + 1);
                if resident {
                    StepContainer::resident(Arc::clone(step), label, node)
                } else {
                    StepContainer::new(Arc::clone(step), label, node)
                }
            })
            .collect();
        Self { node, steps }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn is_shown(&self, graph: &SceneGraph) -> bool {
        graph.is_active(self.node)
    }

    pub fn show(&mut self, graph: &mut SceneGraph, show: bool) {
        graph.set_active(self.node, show);
        if !show {
            for step in &mut self.steps {
                step.unload(graph);
            }
        }
    }

    pub fn show_step(&mut self, ctx: &mut LoadContext<'_>, step: usize, show: bool) {
        if let Some(container) = self.step_mut(step) {
            container.show(ctx, show);
        }
    }

    pub fn highlight_step(&mut self, ctx: &mut LoadContext<'_>, step: usize, highlight: bool) {
        if let Some(container) = self.step_mut(step) {
            container.highlight(ctx, highlight);
        }
    }

    pub fn show_step_parts(
        &mut self,
        ctx: &mut LoadContext<'_>,
        step: usize,
        show: bool,
        start: usize,
        end: Option<usize>,
    ) -> bool {
        self.step_mut(step)
            .is_some_and(|container| container.show_parts(ctx, show, start, end))
    }

    pub fn step_container(&self, step: usize) -> Option<&StepContainer> {
        self.steps.get(step)
    }

    pub fn step_container_mut(&mut self, step: usize) -> Option<&mut StepContainer> {
        self.steps.get_mut(step)
    }

    pub fn loaded_steps(&self) -> usize {
        self.steps.iter().filter(|step| step.is_loaded()).count()
    }

    fn step_mut(&mut self, step: usize) -> Option<&mut StepContainer> {
        let count = self.steps.len();
        let container = self.steps.get_mut(step);
        if container.is_none() {
            log::debug!("step {step} out of range ({count} steps)");
        }
        container
    }
}
