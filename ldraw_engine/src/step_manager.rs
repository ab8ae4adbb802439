use std::collections::HashMap;

use ldraw_formats::PartCore;
use serde::Serialize;

use crate::runtime::{BuildScene, RuntimeModel};
use crate::scene::NodeId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartTally {
    pub part: PartCore,
    pub count: usize,
    /// Index of the first occurrence in the step's part list.
    pub first_index: usize,
}

/// Counts the parts of `step` in first-seen order, minus the parts hidden by
/// the build modification keyed on that step. Zero counts are dropped.
pub fn tally_step_parts(model: &RuntimeModel, step: usize) -> Vec<PartTally> {
    let Some(data) = model.step(step) else {
        return Vec::new();
    };

    let mut tallies: Vec<PartTally> = Vec::new();
    let mut slots: HashMap<&PartCore, usize> = HashMap::new();
    for (index, part) in data.parts.iter().enumerate() {
        match slots.get(&part.core) {
            Some(&slot) => tallies[slot].count += 1,
            None => {
                slots.insert(&part.core, tallies.len());
                tallies.push(PartTally {
                    part: part.core.clone(),
                    count: 1,
                    first_index: index,
                });
            }
        }
    }

    if let Some(build_mod) = model.build_mod(step) {
        let removed = model
            .step(build_mod.step)
            .and_then(|target| target.parts.get(build_mod.start..=build_mod.end))
            .unwrap_or_default();
        for part in removed {
            if let Some(&slot) = slots.get(&part.core) {
                let tally = &mut tallies[slot];
                tally.count = tally.count.saturating_sub(1);
            }
        }
    }

    tallies.retain(|tally| tally.count > 0);
    tallies
}

impl BuildScene {
    pub fn step_parts(&self, flat: usize) -> Vec<PartTally> {
        let Some(step) = self.flat_step(flat) else {
            log::debug!("no part list for flat step {flat}");
            return Vec::new();
        };
        self.model(step.model)
            .map(|model| tally_step_parts(model, step.model_step_idx))
            .unwrap_or_default()
    }

    pub fn model_of(&self, flat: usize) -> Option<usize> {
        self.flat_step(flat).map(|step| step.model)
    }

    /// Standalone copy of part `index` of a flattened step, for previews.
    pub fn clone_step_part(&mut self, flat: usize, index: usize) -> Option<NodeId> {
        let step = self.flat_step(flat)?;
        self.clone_part(step.model, step.model_step_idx, index)
    }
}
