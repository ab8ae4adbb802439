use thiserror::Error;

use crate::package::StepPackage;

/// Data-integrity problems that make a package unrenderable. These are
/// authoring bugs, so they are reported at load time instead of being
/// clamped away during navigation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("package contains no models or no flat steps")]
    EmptyPackage,
    #[error("flat step {flat} references model {model} but only {models} models exist")]
    FlatModelOutOfRange {
        flat: usize,
        model: usize,
        models: usize,
    },
    #[error("flat step {flat} references step {step} of model {model} which has {steps} steps")]
    FlatStepOutOfRange {
        flat: usize,
        model: usize,
        step: usize,
        steps: usize,
    },
    #[error("flat step {flat} goes back to step {step} of model {model} after step {previous}")]
    FlatStepOrder {
        flat: usize,
        model: usize,
        step: usize,
        previous: usize,
    },
    #[error("step {step} of model {model} borrows rotation from missing step {rot_ref}")]
    RotationRefOutOfRange {
        model: usize,
        step: usize,
        rot_ref: i32,
    },
    #[error("step {step} of model {model} has invalid framing radius {radius}")]
    InvalidRadius {
        model: usize,
        step: usize,
        radius: f32,
    },
    #[error("model {model} has a build modification keyed on missing step {key}")]
    BuildModKeyOutOfRange { model: usize, key: usize },
    #[error("build modification at step {key} of model {model} targets missing step {target}")]
    BuildModStepOutOfRange {
        model: usize,
        key: usize,
        target: usize,
    },
    #[error(
        "build modification at step {key} of model {model} hides parts {start}..={end} of step {target} which has {parts} parts"
    )]
    BuildModRange {
        model: usize,
        key: usize,
        target: usize,
        start: usize,
        end: usize,
        parts: usize,
    },
}

impl StepPackage {
    /// Checks every cross reference in the package, returning the first
    /// violation found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.models.is_empty() || self.flat_steps.is_empty() {
            return Err(ValidationError::EmptyPackage);
        }

        for (model_idx, model) in self.models.iter().enumerate() {
            let step_count = model.steps.len();
            for (step_idx, step) in model.steps.iter().enumerate() {
                if !step.radius.is_finite() || step.radius <= 0.0 {
                    return Err(ValidationError::InvalidRadius {
                        model: model_idx,
                        step: step_idx,
                        radius: step.radius,
                    });
                }
                if step.rot_ref < -1
                    || step.rotation_ref().is_some_and(|target| target >= step_count)
                {
                    return Err(ValidationError::RotationRefOutOfRange {
                        model: model_idx,
                        step: step_idx,
                        rot_ref: step.rot_ref,
                    });
                }
            }

            for (&key, build_mod) in &model.build_mods {
                if key >= step_count {
                    return Err(ValidationError::BuildModKeyOutOfRange {
                        model: model_idx,
                        key,
                    });
                }
                let Some(target) = model.steps.get(build_mod.step) else {
                    return Err(ValidationError::BuildModStepOutOfRange {
                        model: model_idx,
                        key,
                        target: build_mod.step,
                    });
                };
                if build_mod.start > build_mod.end || build_mod.end >= target.part_count() {
                    return Err(ValidationError::BuildModRange {
                        model: model_idx,
                        key,
                        target: build_mod.step,
                        start: build_mod.start,
                        end: build_mod.end,
                        parts: target.part_count(),
                    });
                }
            }
        }

        let mut previous: Option<(usize, usize)> = None;
        for (flat_idx, flat) in self.flat_steps.iter().enumerate() {
            let Some(model) = self.models.get(flat.model) else {
                return Err(ValidationError::FlatModelOutOfRange {
                    flat: flat_idx,
                    model: flat.model,
                    models: self.models.len(),
                });
            };
            if flat.model_step_idx >= model.steps.len() {
                return Err(ValidationError::FlatStepOutOfRange {
                    flat: flat_idx,
                    model: flat.model,
                    step: flat.model_step_idx,
                    steps: model.steps.len(),
                });
            }
            if let Some((prev_model, prev_step)) = previous {
                if prev_model == flat.model && flat.model_step_idx <= prev_step {
                    return Err(ValidationError::FlatStepOrder {
                        flat: flat_idx,
                        model: flat.model,
                        step: flat.model_step_idx,
                        previous: prev_step,
                    });
                }
            }
            previous = Some((flat.model, flat.model_step_idx));
        }

        Ok(())
    }
}
