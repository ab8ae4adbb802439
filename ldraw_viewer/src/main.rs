mod cli;
mod progress;
mod report;
mod script;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use glam::Vec2;
use ldraw_engine::{
    BuildScene, BuildSession, CatalogGeometry, GeometryPolicy, GeometryProvider, ViewerConfig,
    load_viewer_config,
};
use ldraw_formats::{ColorTable, PartDescriptions, StepPackage};

use cli::Args;
use progress::Progress;
use report::{CommandReport, RunReport};
use script::Command;

/// Longest a `settle` command keeps ticking before giving up.
const SETTLE_LIMIT_SECONDS: f32 = 10.0;
/// Longest simulated time a single `wait` covers.
const WAIT_LIMIT_SECONDS: f32 = 600.0;

const DRAG_POINTER: u64 = 1;
const PINCH_POINTERS: (u64, u64) = (10, 11);
const PINCH_GAP: f32 = 100.0;

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::init();

    let mut config = match &args.config {
        Some(path) => load_viewer_config(path).context("loading viewer config")?,
        None => ViewerConfig::default(),
    };
    if args.preview {
        config.preview = true;
    }

    let commands = script::parse_script(&args.script_source()?).context("parsing script")?;

    let package = StepPackage::from_path(&args.package).context("loading step package")?;
    let colors = match &args.colors {
        Some(path) => ColorTable::from_path(path)?,
        None => {
            log::warn!("no color table given; using neutral placeholder colors");
            ColorTable::placeholder_for(&package)
        }
    };
    let descriptions = match &args.descriptions {
        Some(path) => PartDescriptions::from_path(path)?,
        None => PartDescriptions::default(),
    };
    let geometry: Box<dyn GeometryProvider> = match &args.known_parts {
        Some(path) => Box::new(CatalogGeometry::with_parts(cli::load_known_parts(path)?)),
        None => Box::new(CatalogGeometry::permissive()),
    };

    let scene = BuildScene::new(
        &package,
        colors,
        geometry,
        GeometryPolicy::from_resident(config.resident_geometry),
    );
    let mut session = BuildSession::new(scene, descriptions, &config);

    let saved = match &args.progress {
        Some(path) => progress::load_progress(path)?,
        None => None,
    };
    let start_step = args
        .start_step
        .or(saved.map(|progress| progress.current_step))
        .unwrap_or(0);
    session.start(start_step);
    let start_step = session.current_step();

    let dt = args.frame_time();
    let mut reports = Vec::with_capacity(commands.len());
    let mut last_saved = saved.map(|progress| progress.current_step);
    for command in commands {
        let accepted = execute(&mut session, command, dt);
        let report = CommandReport::capture(command.to_string(), accepted, &session);
        println!("{}", report.summary());
        reports.push(report);

        if let Some(path) = &args.progress {
            if last_saved != Some(session.current_step()) {
                store_progress(path, &session)?;
                last_saved = Some(session.current_step());
            }
        }
    }

    println!(
        "finished at step {} of {} ({:.0}% built)",
        session.current_step() + 1,
        session.total_steps(),
        session.build_progress() * 100.0
    );

    if let Some(path) = &args.report_json {
        let report = RunReport {
            package: args.package.display().to_string(),
            total_steps: session.total_steps(),
            start_step,
            commands: reports,
            final_step: session.current_step(),
            build_progress: session.build_progress(),
        };
        report::write_report(path, &report)?;
        log::info!("wrote run report to {}", path.display());
    }

    Ok(())
}

/// Applies one scripted command. Returns whether the session accepted it.
fn execute(session: &mut BuildSession, command: Command, dt: f32) -> bool {
    match command {
        Command::Next => session.next_step(),
        Command::Previous => session.previous_step(),
        Command::Select(step) => session.select_step(step),
        Command::Rotate { dx, dy } => session.rotate(dx, dy),
        Command::Zoom(delta) => session.zoom(delta),
        Command::Drag { dx, dy } => {
            session.pointer_down(DRAG_POINTER, Vec2::ZERO);
            let moved = session.pointer_move(DRAG_POINTER, Vec2::new(dx, dy));
            session.pointer_up(DRAG_POINTER);
            moved
        }
        Command::Pinch(delta) => {
            let (first, second) = PINCH_POINTERS;
            session.pointer_down(first, Vec2::ZERO);
            session.pointer_down(second, Vec2::new(PINCH_GAP, 0.0));
            let moved = session.pointer_move(second, Vec2::new(PINCH_GAP + delta, 0.0));
            session.pointer_up(second);
            session.pointer_up(first);
            moved
        }
        Command::Wait(seconds) => {
            for _ in 0..wait_frames(seconds, dt) {
                session.tick(dt);
            }
            true
        }
        Command::Settle => {
            let mut elapsed = 0.0;
            while !session.can_navigate() && elapsed < SETTLE_LIMIT_SECONDS {
                session.tick(dt);
                elapsed += dt;
            }
            if !session.can_navigate() {
                log::warn!("camera still moving after {SETTLE_LIMIT_SECONDS}s");
            }
            session.can_navigate()
        }
    }
}

/// Frames needed to cover `seconds`, capped at `WAIT_LIMIT_SECONDS`.
fn wait_frames(seconds: f32, dt: f32) -> usize {
    if !seconds.is_finite() {
        log::warn!("ignoring wait of {seconds}s");
        return 0;
    }
    if seconds > WAIT_LIMIT_SECONDS {
        log::warn!("capping wait of {seconds}s to {WAIT_LIMIT_SECONDS}s");
    }
    (seconds.clamp(0.0, WAIT_LIMIT_SECONDS) / dt).ceil() as usize
}

fn store_progress(path: &Path, session: &BuildSession) -> Result<()> {
    progress::save_progress(
        path,
        &Progress {
            current_step: session.current_step(),
            build_progress: session.build_progress(),
        },
    )
}
