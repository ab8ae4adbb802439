use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    about = "Headless step viewer: replays a navigation script against a step package",
    version
)]
pub struct Args {
    /// Step package JSON (models and flattened steps)
    #[arg(long)]
    pub package: PathBuf,

    /// LDraw color table JSON; neutral placeholder colors are used when absent
    #[arg(long)]
    pub colors: Option<PathBuf>,

    /// Part description JSON used for the part list
    #[arg(long)]
    pub descriptions: Option<PathBuf>,

    /// Viewer configuration JSON (field of view, radius limits, animation)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Text file listing the part files that have geometry, one per line.
    /// Without it every part resolves.
    #[arg(long)]
    pub known_parts: Option<PathBuf>,

    /// Progress JSON read at start and rewritten whenever the step changes
    #[arg(long)]
    pub progress: Option<PathBuf>,

    /// Flattened step to open at; overrides saved progress
    #[arg(long)]
    pub start_step: Option<usize>,

    /// Inline script, commands separated by `;` or newlines
    #[arg(long, conflicts_with = "script_file")]
    pub script: Option<String>,

    /// Script file, one command per line
    #[arg(long)]
    pub script_file: Option<PathBuf>,

    /// Simulated frames per second for `wait` and `settle`
    #[arg(long, default_value_t = 60.0)]
    pub frame_rate: f32,

    /// When set, write a JSON report of every command's outcome
    #[arg(long)]
    pub report_json: Option<PathBuf>,

    /// Frame whole-model bounds instead of single steps
    #[arg(long)]
    pub preview: bool,
}

impl Args {
    pub fn script_source(&self) -> Result<String> {
        match (&self.script, &self.script_file) {
            (Some(script), _) => Ok(script.clone()),
            (None, Some(path)) => fs::read_to_string(path)
                .with_context(|| format!("reading script {}", path.display())),
            (None, None) => Ok(String::new()),
        }
    }

    /// Seconds per simulated frame.
    pub fn frame_time(&self) -> f32 {
        if self.frame_rate.is_finite() && self.frame_rate >= 1.0 {
            1.0 / self.frame_rate
        } else {
            log::warn!("ignoring frame rate {}; using 60", self.frame_rate);
            1.0 / 60.0
        }
    }
}

pub fn load_known_parts(path: &Path) -> Result<Vec<String>> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading known part list {}", path.display()))?;
    Ok(data
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}
