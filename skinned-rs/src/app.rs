//! Headless application shell.
//!
//! [`App`] owns every piece of mutable state in one [`AppState`] and runs an
//! ordered list of plain update functions once per frame. Each stage gets the
//! state by `&mut` and the frame timer by `&`, so the order below is the
//! whole data-flow story of a frame.

use std::f32::consts::PI;
use std::sync::Arc;

use anyhow::{Context, Result};
use glam::{Vec3, Vec4};
use m3d::{M3dModel, ModelParts, SkinnedModelInstance, StaticMesh};

use crate::camera::{Camera, MovementKeys};
use crate::config::AppConfig;
use crate::frame::{FrameConstants, LightConstants, PassConstants, SkinnedConstants};
use crate::scene::Scene;
use crate::shadow::{BoundingSphere, RotatingLight, ShadowTransform};
use crate::timer::GameTimer;

/// One per-frame update step
pub type UpdateStage = fn(&mut AppState, &GameTimer) -> Result<()>;

/// Update stages in the order a frame runs them
pub const DEFAULT_STAGES: [(&str, UpdateStage); 7] = [
    ("camera", update_camera),
    ("object constants", update_object_constants),
    ("material constants", update_material_constants),
    ("shadow transform", update_shadow_transform),
    ("main pass", update_main_pass),
    ("shadow pass", update_shadow_pass),
    ("skinned constants", update_skinned_constants),
];

const AMBIENT_LIGHT: Vec4 = Vec4::new(0.25, 0.25, 0.35, 1.0);
const LIGHT_STRENGTH: Vec3 = Vec3::splat(0.6);

/// Everything a frame reads or writes
#[derive(Debug)]
pub struct AppState {
    pub config: AppConfig,
    pub camera: Camera,
    pub keys: MovementKeys,
    pub light: RotatingLight,
    pub bounds: BoundingSphere,
    pub shadow: ShadowTransform,
    pub scene: Scene,
    pub skinned: SkinnedModelInstance,
    pub frame: FrameConstants,
}

impl AppState {
    /// Load the model and optional skull named by `config`
    pub fn load(config: AppConfig) -> Result<Self> {
        let model = M3dModel::load(&config.model)
            .with_context(|| format!("Failed to load model {}", config.model.display()))?;
        model
            .validate()
            .with_context(|| format!("Model {} failed validation", config.model.display()))?;
        let parts = model.into_parts()?;

        let skull = match &config.skull {
            Some(path) => Some(
                StaticMesh::load(path)
                    .with_context(|| format!("Failed to load mesh {}", path.display()))?,
            ),
            None => None,
        };

        Self::new(config, parts, skull.as_ref())
    }

    pub fn new(config: AppConfig, parts: ModelParts, skull: Option<&StaticMesh>) -> Result<Self> {
        config.check()?;

        let scene = Scene::sample(&parts, skull, &config.texture_dir)?;
        let skinned = SkinnedModelInstance::new(Arc::new(parts.skinned), &config.clip)
            .with_context(|| format!("Cannot play clip '{}'", config.clip))?;

        let mut camera = Camera::new(config.camera_position);
        camera.set_lens(0.25 * PI, config.aspect_ratio(), 1.0, 1000.0);

        let light = RotatingLight::new(config.light_direction, config.light_rotation_speed);
        let bounds = BoundingSphere::new(Vec3::ZERO, config.scene_radius);
        let shadow = ShadowTransform::fit(light.direction(), &bounds);

        let frame = FrameConstants::new(
            scene.render_items().len(),
            scene.materials().len(),
            scene.skinned_palette_count().max(1),
        );

        Ok(Self {
            config,
            camera,
            keys: MovementKeys::default(),
            light,
            bounds,
            shadow,
            scene,
            skinned,
            frame,
        })
    }
}

pub struct App {
    state: AppState,
    timer: GameTimer,
    stages: Vec<(&'static str, UpdateStage)>,
}

impl App {
    pub fn new(state: AppState, timer: GameTimer) -> Self {
        Self {
            state,
            timer,
            stages: DEFAULT_STAGES.to_vec(),
        }
    }

    /// Append a stage that runs after the built-in ones
    pub fn add_stage(&mut self, name: &'static str, stage: UpdateStage) {
        self.stages.push((name, stage));
    }

    pub fn stage_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.stages.iter().map(|(name, _)| *name)
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut AppState {
        &mut self.state
    }

    pub fn timer(&self) -> &GameTimer {
        &self.timer
    }

    pub fn into_state(self) -> AppState {
        self.state
    }

    /// Tick the timer and run every stage once
    pub fn frame(&mut self) -> Result<()> {
        self.timer.tick();
        for (name, stage) in &self.stages {
            stage(&mut self.state, &self.timer)
                .with_context(|| format!("Update stage '{name}' failed"))?;
        }
        Ok(())
    }

    /// Run `frames` frames, calling `on_frame` after each
    pub fn run<F>(&mut self, frames: u32, mut on_frame: F) -> Result<()>
    where
        F: FnMut(&AppState, &GameTimer),
    {
        self.timer.reset();
        log::info!(
            "Running {} frames with stages: {}",
            frames,
            self.stage_names().collect::<Vec<_>>().join(", ")
        );
        for _ in 0..frames {
            self.frame()?;
            on_frame(&self.state, &self.timer);
        }
        Ok(())
    }
}

fn update_camera(state: &mut AppState, timer: &GameTimer) -> Result<()> {
    let speed = state.config.camera_speed;
    state
        .camera
        .apply_keys(state.keys, speed, timer.delta_time());
    state.camera.update_view_matrix();
    Ok(())
}

fn update_object_constants(state: &mut AppState, _timer: &GameTimer) -> Result<()> {
    for item in state.scene.render_items() {
        anyhow::ensure!(
            state.frame.objects.copy_data(item.obj_cb_index, &item.constants()),
            "object constant slot {} out of range",
            item.obj_cb_index
        );
    }
    Ok(())
}

fn update_material_constants(state: &mut AppState, _timer: &GameTimer) -> Result<()> {
    for material in state.scene.materials() {
        anyhow::ensure!(
            state
                .frame
                .materials
                .copy_data(material.cb_index, &material.constants()),
            "material constant slot {} out of range",
            material.cb_index
        );
    }
    Ok(())
}

fn update_shadow_transform(state: &mut AppState, timer: &GameTimer) -> Result<()> {
    state.shadow = state.light.advance(timer.delta_time(), &state.bounds);
    Ok(())
}

fn update_main_pass(state: &mut AppState, _timer: &GameTimer) -> Result<()> {
    let mut pass = PassConstants::with_camera(state.camera.view(), state.camera.proj());
    pass.shadow_transform = state.shadow.shadow_transform.to_cols_array();
    pass.ambient_light = AMBIENT_LIGHT.to_array();
    pass.eye_pos_w = state.camera.position().to_array();
    pass.light_count = 1;
    pass.lights[0] = LightConstants::directional(state.shadow.light_direction, LIGHT_STRENGTH);

    anyhow::ensure!(
        state.frame.passes.copy_data(FrameConstants::MAIN_PASS, &pass),
        "main pass slot missing"
    );
    Ok(())
}

fn update_shadow_pass(state: &mut AppState, _timer: &GameTimer) -> Result<()> {
    let mut pass = PassConstants::with_camera(state.shadow.view, state.shadow.proj);
    pass.eye_pos_w = state.shadow.light_position.to_array();

    anyhow::ensure!(
        state.frame.passes.copy_data(FrameConstants::SHADOW_PASS, &pass),
        "shadow pass slot missing"
    );
    Ok(())
}

fn update_skinned_constants(state: &mut AppState, timer: &GameTimer) -> Result<()> {
    state.skinned.advance(timer.delta_time());
    let constants = SkinnedConstants::from_transforms(state.skinned.final_transforms());
    anyhow::ensure!(
        state.frame.skinned.copy_data(0, &constants),
        "skinned constant slot missing"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Mat4, Quat};
    use m3d::{
        AnimationClip, BonePose, BoneTrack, Keyframe, M3dMaterial, Skeleton, SkinnedVertex,
        Subset,
    };

    /// One bone sliding from x = 0 to x = 1 over one second
    fn slider() -> ModelParts {
        let track = BoneTrack::new(vec![
            Keyframe::new(0.0, BonePose::IDENTITY),
            Keyframe::new(1.0, BonePose::from_translation(Vec3::X)),
        ])
        .unwrap();
        M3dModel {
            materials: vec![M3dMaterial {
                name: "body".to_string(),
                diffuse_map_name: "body.dds".to_string(),
                ..Default::default()
            }],
            subsets: vec![Subset {
                vertex_count: 3,
                face_count: 1,
                ..Default::default()
            }],
            vertices: vec![SkinnedVertex::default(); 3],
            indices: vec![0, 1, 2],
            skeleton: Skeleton::from_parts(&[None], &[Mat4::IDENTITY]).unwrap(),
            clips: vec![AnimationClip::new("Take1", vec![Some(track)])],
        }
        .into_parts()
        .unwrap()
    }

    fn app(step: f32) -> App {
        let config = AppConfig {
            time_step: step,
            ..Default::default()
        };
        let state = AppState::new(config, slider(), None).unwrap();
        App::new(state, GameTimer::fixed(step))
    }

    #[test]
    fn test_stage_order() {
        let app = app(0.25);
        let names: Vec<_> = app.stage_names().collect();
        assert_eq!(
            names,
            vec![
                "camera",
                "object constants",
                "material constants",
                "shadow transform",
                "main pass",
                "shadow pass",
                "skinned constants",
            ]
        );
    }

    #[test]
    fn test_skinned_palette_follows_instance() {
        let mut app = app(0.25);
        app.run(2, |_, _| {}).unwrap();

        let state = app.state();
        assert_eq!(state.skinned.time_pos(), 0.5);
        let palette = state.frame.skinned.element(0).unwrap();
        let bone = palette.bone(0).unwrap();
        assert!(bone.abs_diff_eq(Mat4::from_translation(Vec3::X * 0.5), 1e-6));
        assert_eq!(palette.bone(1), Some(Mat4::IDENTITY));
    }

    #[test]
    fn test_loop_restarts_during_run() {
        let mut app = app(0.25);
        let mut times = Vec::new();
        app.run(5, |state, _| times.push(state.skinned.time_pos()))
            .unwrap();
        assert_eq!(times, vec![0.25, 0.5, 0.75, 1.0, 0.0]);
    }

    #[test]
    fn test_pass_constants() {
        let mut app = app(1.0);
        app.frame().unwrap();

        let state = app.state();
        let main = state.frame.main_pass().unwrap();
        assert_eq!(main.light_count, 1);
        assert_eq!(main.eye_pos_w, [0.0, 2.0, -15.0]);
        assert_eq!(main.ambient_light, [0.25, 0.25, 0.35, 1.0]);
        let expected = Quat::from_rotation_y(0.1) * Vec3::new(0.57735, -0.57735, 0.57735);
        assert!(Vec3::from_array(main.lights[0].direction).abs_diff_eq(expected, 1e-5));
        assert_eq!(
            main.shadow_transform,
            state.shadow.shadow_transform.to_cols_array()
        );

        let shadow = state.frame.shadow_pass().unwrap();
        assert_eq!(shadow.eye_pos_w, state.shadow.light_position.to_array());
        assert_eq!(shadow.view, state.shadow.view.to_cols_array());
    }

    #[test]
    fn test_object_and_material_constants() {
        let mut app = app(0.1);
        app.frame().unwrap();

        let state = app.state();
        let sky = state.frame.objects.element(0).unwrap();
        assert_eq!(sky.world[0], 5000.0);

        let body = state.scene.find_material("body").unwrap();
        let cb = state.scene.material(body).cb_index;
        let constants = state.frame.materials.element(cb).unwrap();
        assert_eq!((constants.texture_on, constants.normal_on), (1, 0));
    }

    #[test]
    fn test_held_keys_move_camera() {
        let mut app = app(0.5);
        app.state_mut().keys = MovementKeys::parse("W").unwrap();
        app.frame().unwrap();
        assert!(
            app.state()
                .camera
                .position()
                .abs_diff_eq(Vec3::new(0.0, 2.0, -10.0), 1e-5)
        );
    }

    #[test]
    fn test_failing_stage_names_itself() {
        fn broken(_: &mut AppState, _: &GameTimer) -> Result<()> {
            anyhow::bail!("boom")
        }
        let mut app = app(0.1);
        app.add_stage("broken", broken);
        let err = app.frame().unwrap_err();
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn test_unknown_clip() {
        let config = AppConfig {
            clip: "Walk".to_string(),
            ..Default::default()
        };
        let err = AppState::new(config, slider(), None).unwrap_err();
        assert!(format!("{err:#}").contains("Walk"));
    }
}
