use anyhow::{Context, Result};
use glam::Vec3;
use ldraw_engine::{
    BuildScene, CameraLens, CameraTag, CatalogGeometry, FlatStepNavigator, GeometryPolicy,
    StepCamera,
};
use ldraw_formats::{ColorTable, StepPackage};
use serde_json::json;

fn parts(ids: &[&str]) -> serde_json::Value {
    ids.iter()
        .map(|id| json!({"partId": id, "color": 4, "position": {"x": 0.0, "y": 0.0, "z": 0.0}}))
        .collect()
}

fn load(package: serde_json::Value) -> Result<(BuildScene, StepCamera)> {
    let bytes = serde_json::to_vec(&package)?;
    let package = StepPackage::from_slice(&bytes).context("loading fixture package")?;
    let colors = ColorTable::placeholder_for(&package);
    let scene = BuildScene::new(
        &package,
        colors,
        Box::new(CatalogGeometry::permissive()),
        GeometryPolicy::Lazy,
    );
    Ok((scene, StepCamera::new(CameraLens::default(), true)))
}

fn navigator() -> FlatStepNavigator {
    FlatStepNavigator::new(Vec3::new(30.0, 45.0, 0.0), false)
}

fn three_step_model() -> serde_json::Value {
    json!({
        "models": [{
            "modelName": "main.ldr",
            "steps": [
                {"parts": parts(&["a.dat", "b.dat"]), "rotation": null, "rotationRef": -1,
                 "radius": 1.0, "center": {"x": 0.0, "y": 0.0, "z": 0.0}},
                {"parts": parts(&["c.dat"]), "rotationRef": -1,
                 "radius": 1.5, "center": {"x": 1.0, "y": 0.0, "z": 0.0}},
                {"parts": parts(&["d.dat", "e.dat", "f.dat"]), "rotationRef": -1,
                 "radius": 2.0, "center": {"x": 2.0, "y": 1.0, "z": 0.0}}
            ],
            "buildMods": {}
        }],
        "flatSteps": [
            {"model": 0, "modelStepIndex": 0},
            {"model": 0, "modelStepIndex": 1},
            {"model": 0, "modelStepIndex": 2}
        ]
    })
}

#[test]
fn goto_last_step_shows_everything_and_frames_it() -> Result<()> {
    let (mut scene, mut camera) = load(three_step_model())?;
    let mut nav = navigator();

    assert!(nav.goto_step(&mut scene, &mut camera, 2, false));
    assert!(nav.can_navigate());
    assert_eq!(scene.visible_steps(0), vec![0, 1, 2]);
    for step in 0..3 {
        let snapshot = scene.step_snapshot(0, step).context("snapshot")?;
        assert!(snapshot.loaded, "step {step} should be loaded");
        assert!(snapshot.visible.iter().all(|visible| *visible));
    }

    let state = camera.state();
    assert_eq!(state.center, Vec3::new(2.0, 1.0, 0.0));
    assert_eq!(state.radius, 2.0);
    let transform = camera.transform();
    let to_center = (state.center - transform.position).normalize();
    assert!((to_center - transform.forward).length() < 1e-4);
    let distance = transform.position.distance(state.center);
    assert!((distance - camera.lens().framing_distance(2.0)).abs() < 1e-3);
    Ok(())
}

#[test]
fn visibility_is_monotonic_in_step_index() -> Result<()> {
    let (mut scene, mut camera) = load(three_step_model())?;
    let mut nav = navigator();
    for target in [0, 2, 1, 0, 2] {
        nav.goto_step(&mut scene, &mut camera, target, false);
        let expected: Vec<usize> = (0..=target).collect();
        assert_eq!(scene.visible_steps(0), expected, "after goto {target}");
    }
    Ok(())
}

#[test]
fn build_mod_hides_only_its_range() -> Result<()> {
    let steps: Vec<serde_json::Value> = (0..6)
        .map(|i| {
            let ids: Vec<String> = (0..5).map(|p| format!("s{i}p{p}.dat")).collect();
            let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
            json!({"parts": parts(&ids), "radius": 1.0, "center": {"x": 0.0, "y": 0.0, "z": 0.0}})
        })
        .collect();
    let flat_steps: Vec<serde_json::Value> = (0..6)
        .map(|i| json!({"model": 0, "modelStepIdx": i}))
        .collect();
    let (mut scene, mut camera) = load(json!({
        "models": [{
            "modelName": "main.ldr",
            "steps": steps,
            "buildMods": {"5": {"step": 3, "start": 2, "end": 4}}
        }],
        "flatSteps": flat_steps
    }))?;
    let mut nav = navigator();

    nav.goto_step(&mut scene, &mut camera, 5, false);
    for step in 0..6 {
        let visible = scene.step_snapshot(0, step).context("snapshot")?.visible;
        if step == 3 {
            assert_eq!(visible, vec![true, true, false, false, false]);
        } else {
            assert!(visible.iter().all(|v| *v), "step {step} lost parts");
        }
    }

    // Going back before the modification restores the retracted parts.
    nav.goto_step(&mut scene, &mut camera, 4, false);
    let visible = scene.step_snapshot(0, 3).context("snapshot")?.visible;
    assert!(visible.iter().all(|v| *v));

    let parts = scene.step_parts(5);
    assert_eq!(parts.len(), 5);
    Ok(())
}

#[test]
fn animated_step_gates_navigation_until_camera_arrives() -> Result<()> {
    let (mut scene, mut camera) = load(three_step_model())?;
    let mut nav = navigator();
    nav.goto_step(&mut scene, &mut camera, 0, false);

    assert!(nav.next_step(&mut scene, &mut camera, true));
    assert!(!nav.can_navigate());
    assert!(!nav.next_step(&mut scene, &mut camera, true));
    assert!(!nav.previous_step(&mut scene, &mut camera, true));
    assert_eq!(nav.current_step(), Some(1));
    assert_eq!(scene.visible_steps(0), vec![0]);

    let mut ticks = 0;
    loop {
        ticks += 1;
        if let Some(id) = camera.advance(1.0 / 60.0) {
            assert!(nav.finish_transition(&mut scene, id));
            break;
        }
        assert!(ticks < 200, "transition never finished");
    }
    assert!(nav.can_navigate());
    assert_eq!(scene.visible_steps(0), vec![0, 1]);
    Ok(())
}

#[test]
fn last_step_of_model_leaves_camera_untagged() -> Result<()> {
    let (mut scene, mut camera) = load(three_step_model())?;
    let mut nav = navigator();
    nav.goto_step(&mut scene, &mut camera, 0, false);
    assert!(camera.current_tag().is_some());
    nav.goto_step(&mut scene, &mut camera, 2, false);
    assert_eq!(camera.current_tag(), None);
    assert!(camera.tag_pose(CameraTag(0)).is_none());
    Ok(())
}

#[test]
fn switching_models_unloads_previous_geometry() -> Result<()> {
    let (mut scene, mut camera) = load(json!({
        "models": [
            {"modelName": "wheel.ldr", "steps": [
                {"parts": parts(&["tyre.dat", "rim.dat"]), "radius": 1.0,
                 "center": {"x": 0.0, "y": 0.0, "z": 0.0}}
            ]},
            {"modelName": "car.ldr", "steps": [
                {"parts": parts(&["chassis.dat"]), "radius": 3.0,
                 "center": {"x": 0.0, "y": 0.0, "z": 0.0}},
                {"parts": parts(&["wheel.ldr", "wheel.ldr"]), "radius": 3.0,
                 "center": {"x": 0.0, "y": 0.0, "z": 0.0}}
            ], "buildMods": null}
        ],
        "flatSteps": [
            {"model": 0, "modelStepIndex": 0},
            {"model": 1, "modelStepIndex": 0},
            {"model": 1, "modelStepIndex": 1}
        ]
    }))?;
    let mut nav = navigator();

    nav.goto_step(&mut scene, &mut camera, 0, false);
    assert_eq!(scene.loaded_steps(), 1);

    nav.hide_current_model(&mut scene);
    nav.goto_step(&mut scene, &mut camera, 2, false);
    assert!(!scene.is_model_shown(0));
    assert_eq!(scene.model(0).map(|m| m.container().loaded_steps()), Some(0));
    assert_eq!(scene.visible_steps(1), vec![0, 1]);

    let parts = scene.step_parts(2);
    assert_eq!(parts.len(), 1);
    assert_eq!(parts[0].count, 2);
    assert!(scene.is_submodel(&parts[0].part.part_id));
    Ok(())
}
