use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Where the user left off; enough to resume the step screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub current_step: usize,
    #[serde(default)]
    pub build_progress: f32,
}

/// Reads saved progress. A missing file means a fresh start.
pub fn load_progress(path: &Path) -> Result<Option<Progress>> {
    if !path.exists() {
        return Ok(None);
    }
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading progress {}", path.display()))?;
    let progress = serde_json::from_str(&data)
        .with_context(|| format!("parsing progress {}", path.display()))?;
    Ok(Some(progress))
}

pub fn save_progress(path: &Path, progress: &Progress) -> Result<()> {
    let data = serde_json::to_string_pretty(progress).context("serializing progress")?;
    fs::write(path, data).with_context(|| format!("writing progress {}", path.display()))
}
