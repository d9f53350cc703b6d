//! Run the demo scene headlessly and report what a frame produces

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use glam::Mat4;

use crate::app::{App, AppState};
use crate::camera::MovementKeys;
use crate::config::AppConfig;
use crate::scene::{RenderLayer, Scene};
use crate::timer::{GameTimer, TimerMode};
use crate::utils::{
    add_table_row, create_table, format_bytes, format_matrix, format_seconds, format_vec3,
};

#[derive(Args)]
pub struct SceneArgs {
    /// Path to the M3D file
    #[arg(env = "SKINNED_MODEL")]
    pub file: Option<PathBuf>,

    /// Plain position/normal mesh drawn as the skull
    #[arg(long)]
    pub skull: Option<PathBuf>,

    /// Clip the character plays
    #[arg(short, long, env = "SKINNED_CLIP")]
    pub clip: Option<String>,

    /// Number of frames to run
    #[arg(short, long)]
    pub frames: Option<u32>,

    /// Seconds per frame
    #[arg(long)]
    pub dt: Option<f32>,

    /// Movement keys held every frame, any of W, A, S, D
    #[arg(long, value_parser = parse_keys)]
    pub keys: Option<MovementKeys>,

    /// Measure frames with the wall clock instead of a fixed step
    #[arg(long)]
    pub real_time: bool,

    /// Also list textures, materials and every render item
    #[arg(short, long)]
    pub detailed: bool,
}

fn parse_keys(value: &str) -> std::result::Result<MovementKeys, String> {
    MovementKeys::parse(value).ok_or_else(|| format!("'{value}' is not a combination of W, A, S, D"))
}

/// Apply command-line overrides on top of the loaded configuration
fn resolve_config(args: &SceneArgs, config: &AppConfig) -> AppConfig {
    let mut config = config.clone();
    if let Some(file) = &args.file {
        config.model = file.clone();
    }
    if let Some(skull) = &args.skull {
        config.skull = Some(skull.clone());
    }
    if let Some(clip) = &args.clip {
        config.clip = clip.clone();
    }
    if let Some(frames) = args.frames {
        config.frames = frames;
    }
    if let Some(dt) = args.dt {
        config.time_step = dt;
    }
    config
}

pub fn execute(args: SceneArgs, config: &AppConfig) -> Result<()> {
    let config = resolve_config(&args, config);
    config.check().context("Invalid scene settings")?;

    let frames = config.frames;
    let mode = if args.real_time {
        TimerMode::RealTime
    } else {
        TimerMode::Fixed(config.time_step)
    };

    let mut state = AppState::load(config)?;
    if let Some(keys) = args.keys {
        state.keys = keys;
    }

    let mut app = App::new(state, GameTimer::new(mode));
    let mut loops = 0u32;
    let mut previous = 0.0f32;
    app.run(frames, |state, _| {
        let time = state.skinned.time_pos();
        if time < previous {
            loops += 1;
        }
        previous = time;
    })?;

    print_report(&app, loops, args.detailed);
    Ok(())
}

fn print_report(app: &App, loops: u32, detailed: bool) {
    let state = app.state();
    let scene = &state.scene;
    let timer = app.timer();

    println!("{}", style("Scene Summary").bold().cyan());
    println!("{}", style("=============").cyan());
    println!("{}: {}", style("Frames").bold(), timer.frame_count());
    println!("{}: {}", style("Elapsed").bold(), format_seconds(timer.total_time()));
    println!(
        "{}: '{}' at {} ({} loops)",
        style("Clip").bold(),
        state.skinned.clip_name(),
        format_seconds(state.skinned.time_pos()),
        loops
    );
    println!(
        "{}: {}",
        style("Camera").bold(),
        format_vec3(state.camera.position())
    );
    println!(
        "{}: {}",
        style("Constant data").bold(),
        format_bytes(state.frame.byte_size() as u64)
    );
    println!();

    println!("{}", style("Render layers:").bold());
    let mut layers = create_table(vec!["Layer", "Items", "Triangles"]);
    for layer in RenderLayer::ALL {
        let ids = scene.layer(layer);
        let triangles: usize = ids
            .iter()
            .map(|&id| scene.geometry(scene.render_item(id).geometry).triangle_count())
            .sum();
        add_table_row(
            &mut layers,
            vec![
                layer.name().to_string(),
                ids.len().to_string(),
                triangles.to_string(),
            ],
        );
    }
    layers.printstd();
    println!();

    println!("{}", style("Light:").bold());
    println!("  Direction: {}", format_vec3(state.shadow.light_direction));
    println!("  Position:  {}", format_vec3(state.shadow.light_position));
    println!(
        "  Depth:     {:.3} .. {:.3}",
        state.shadow.near_z, state.shadow.far_z
    );
    print_matrix("Shadow transform", &state.shadow.shadow_transform);

    if detailed {
        print_scene_tables(scene);
    }
}

fn print_matrix(label: &str, m: &Mat4) {
    println!("  {label}:");
    for row in format_matrix(m) {
        println!("    {row}");
    }
}

fn print_scene_tables(scene: &Scene) {
    println!();
    println!("{}", style("Textures:").bold());
    let mut textures = create_table(vec!["Slot", "Name", "File"]);
    for texture in scene.textures() {
        add_table_row(
            &mut textures,
            vec![
                texture.srv_index.to_string(),
                texture.name.clone(),
                texture.filename.display().to_string(),
            ],
        );
    }
    textures.printstd();

    println!();
    println!("{}", style("Materials:").bold());
    let slot = |s: Option<usize>| s.map_or_else(|| "-".to_string(), |s| s.to_string());
    let mut materials = create_table(vec!["CB", "Name", "Diffuse", "Normal", "Roughness"]);
    for material in scene.materials() {
        add_table_row(
            &mut materials,
            vec![
                material.cb_index.to_string(),
                material.name.clone(),
                slot(material.diffuse_srv),
                slot(material.normal_srv),
                format!("{:.2}", material.roughness),
            ],
        );
    }
    materials.printstd();

    println!();
    println!("{}", style("Render items:").bold());
    let mut items = create_table(vec!["CB", "Layer", "Geometry", "Material", "Position"]);
    for layer in RenderLayer::ALL {
        for &id in scene.layer(layer) {
            let item = scene.render_item(id);
            add_table_row(
                &mut items,
                vec![
                    item.obj_cb_index.to_string(),
                    layer.name().to_string(),
                    scene.geometry(item.geometry).name.clone(),
                    scene.material(item.material).name.clone(),
                    format_vec3(item.world.w_axis.truncate()),
                ],
            );
        }
    }
    items.printstd();
}
