use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use ldraw_formats::StepPackage;

/// Validate a step package and list its models, steps and build modifications.
#[derive(Parser)]
struct Args {
    /// Path to the step package JSON
    path: PathBuf,

    /// Also list every part of every step
    #[arg(long)]
    parts: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let package = StepPackage::from_path(&args.path)?;

    println!(
        "{} models, {} flat steps, {} parts",
        package.models.len(),
        package.total_steps(),
        package.part_count()
    );

    for (model_idx, model) in package.models.iter().enumerate() {
        println!(
            "model {model_idx:>3}  {name}  ({steps} steps, {mods} build mods)",
            name = model.model_name,
            steps = model.steps.len(),
            mods = model.build_mods.len()
        );
        for (step_idx, step) in model.steps.iter().enumerate() {
            let rotation = match (step.rotation, step.rotation_ref()) {
                (Some(rot), _) => format!("rot {:.1},{:.1},{:.1}", rot.x, rot.y, rot.z),
                (None, Some(target)) => format!("rot ref {target}"),
                (None, None) => String::from("rot default"),
            };
            println!(
                "  step {step_idx:>3}  parts {parts:>4}  radius {radius:>8.3}  {rotation}",
                parts = step.part_count(),
                radius = step.radius
            );
            if let Some(build_mod) = model.build_mod(step_idx) {
                println!(
                    "            hides parts {}..={} of step {}",
                    build_mod.start, build_mod.end, build_mod.step
                );
            }
            if args.parts {
                for part in &step.parts {
                    println!("            {:<24} color {}", part.part_id(), part.color());
                }
            }
        }
    }

    Ok(())
}
