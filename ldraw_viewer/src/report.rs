use std::{fs::File, io::BufWriter, path::Path};

use anyhow::{Context, Result};
use ldraw_engine::{BuildSession, StepPhase};
use serde::Serialize;

/// Observable session state after one scripted command.
#[derive(Debug, Clone, Serialize)]
pub struct CommandReport {
    pub command: String,
    pub accepted: bool,
    pub current_step: usize,
    pub phase: StepPhase,
    pub can_navigate: bool,
    pub camera_center: [f32; 3],
    pub camera_radius: f32,
    pub camera_position: [f32; 3],
    /// Steps of the current model with their parts shown.
    pub visible_steps: Vec<usize>,
    pub loaded_steps: usize,
    pub part_list_len: usize,
}

impl CommandReport {
    pub fn capture(command: String, accepted: bool, session: &BuildSession) -> Self {
        let state = session.camera_state();
        let visible_steps = session
            .navigator()
            .current_model()
            .map(|model| session.scene().visible_steps(model))
            .unwrap_or_default();
        Self {
            command,
            accepted,
            current_step: session.current_step(),
            phase: session.phase(),
            can_navigate: session.can_navigate(),
            camera_center: state.center.to_array(),
            camera_radius: state.radius,
            camera_position: session.camera().transform().position.to_array(),
            visible_steps,
            loaded_steps: session.scene().loaded_steps(),
            part_list_len: session.current_parts().len(),
        }
    }

    /// One-line summary printed while replaying.
    pub fn summary(&self) -> String {
        format!(
            "{:<16} {} step {} ({:?}) visible {:?} radius {:.3}",
            self.command,
            if self.accepted { "ok     " } else { "blocked" },
            self.current_step + 1,
            self.phase,
            self.visible_steps,
            self.camera_radius,
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub package: String,
    pub total_steps: usize,
    pub start_step: usize,
    pub commands: Vec<CommandReport>,
    pub final_step: usize,
    pub build_progress: f32,
}

pub fn write_report(path: &Path, report: &RunReport) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("creating report {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), report)
        .with_context(|| format!("writing report {}", path.display()))
}
