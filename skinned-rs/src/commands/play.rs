//! Headless animation playback

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use m3d::skinning::{SkinningOptions, VertexSkinner, bounds};
use m3d::{M3dModel, SkinnedModelInstance};
use serde::Serialize;

use crate::config::AppConfig;
use crate::utils::{
    add_table_row, create_progress_bar, create_table, format_percentage, format_seconds,
    format_vec3, hidden_progress_bar,
};

#[derive(Args)]
pub struct PlayArgs {
    /// Path to the M3D file
    #[arg(env = "SKINNED_MODEL")]
    pub file: Option<PathBuf>,

    /// Clip to play
    #[arg(short, long, env = "SKINNED_CLIP")]
    pub clip: Option<String>,

    /// Number of frames to advance
    #[arg(short, long)]
    pub frames: Option<u32>,

    /// Seconds per frame
    #[arg(long)]
    pub dt: Option<f32>,

    /// Write every frame's bone matrices to a JSON file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// List the model's clips and exit
    #[arg(long)]
    pub list: bool,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,
}

/// One frame of exported playback
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackFrame {
    pub frame: u32,
    pub time: f32,
    /// Column-major final transform per bone
    pub bones: Vec<[f32; 16]>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackExport {
    pub model: PathBuf,
    pub clip: String,
    pub duration: f32,
    pub time_step: f32,
    pub frames: Vec<PlaybackFrame>,
}

/// Totals gathered while playing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaybackSummary {
    pub frames: u32,
    pub loops: u32,
    pub final_time: f32,
}

/// Advance `instance` by `dt` for `frames` frames, counting loop restarts.
///
/// `on_frame` sees the instance after each advance.
pub fn play<F>(
    instance: &mut SkinnedModelInstance,
    frames: u32,
    dt: f32,
    mut on_frame: F,
) -> PlaybackSummary
where
    F: FnMut(u32, &SkinnedModelInstance),
{
    let mut summary = PlaybackSummary::default();
    for frame in 0..frames {
        instance.advance(dt);
        // A positive step only lands on zero through a restart
        if dt > 0.0 && instance.time_pos() == 0.0 {
            summary.loops += 1;
        }
        on_frame(frame, instance);
        summary.frames += 1;
    }
    summary.final_time = instance.time_pos();
    summary
}

pub fn execute(args: PlayArgs, config: &AppConfig) -> Result<()> {
    let path = args.file.clone().unwrap_or_else(|| config.model.clone());
    let model = M3dModel::load(&path)
        .with_context(|| format!("Failed to load M3D file {}", path.display()))?;
    model.validate()?;

    if args.list {
        return list_clips(&model);
    }

    let clip = args.clip.clone().unwrap_or_else(|| config.clip.clone());
    let frames = args.frames.unwrap_or(config.frames);
    let dt = args.dt.unwrap_or(config.time_step);
    anyhow::ensure!(dt.is_finite() && dt >= 0.0, "--dt must be a non-negative number");

    let vertices = model.vertices.clone();
    let parts = model.into_parts()?;
    let mut instance = SkinnedModelInstance::new(Arc::new(parts.skinned), &clip)
        .with_context(|| format!("Cannot play clip '{clip}'"))?;

    log::info!(
        "Playing '{}' ({}) for {} frames at {} s per frame",
        clip,
        format_seconds(instance.clip_duration()),
        frames,
        dt
    );

    let progress = if args.no_progress {
        hidden_progress_bar(u64::from(frames))
    } else {
        create_progress_bar(u64::from(frames), &format!("Playing {clip}"))
    };

    let mut recorded = Vec::new();
    let record = args.output.is_some();
    let summary = play(&mut instance, frames, dt, |frame, instance| {
        if record {
            recorded.push(PlaybackFrame {
                frame,
                time: instance.time_pos(),
                bones: instance.gpu_matrices(),
            });
        }
        progress.inc(1);
    });
    progress.finish_and_clear();

    let skinner = VertexSkinner::new(instance.final_transforms(), SkinningOptions::default());
    let posed = skinner.skin_vertices(&vertices);

    println!("{}", style("Playback Summary").bold().cyan());
    println!("{}", style("================").cyan());
    let mut table = create_table(vec!["Property", "Value"]);
    add_table_row(&mut table, vec!["Clip".to_string(), clip.clone()]);
    add_table_row(
        &mut table,
        vec![
            "Duration".to_string(),
            format_seconds(instance.clip_duration()),
        ],
    );
    add_table_row(&mut table, vec!["Frames".to_string(), summary.frames.to_string()]);
    add_table_row(&mut table, vec!["Loops".to_string(), summary.loops.to_string()]);
    add_table_row(
        &mut table,
        vec!["Final time".to_string(), format_seconds(summary.final_time)],
    );
    add_table_row(
        &mut table,
        vec![
            "Bones".to_string(),
            instance.final_transforms().len().to_string(),
        ],
    );
    if let Some((min, max)) = bounds(&posed) {
        add_table_row(
            &mut table,
            vec![
                "Posed bounds".to_string(),
                format!("{} - {}", format_vec3(min), format_vec3(max)),
            ],
        );
    }
    table.printstd();

    if let Some(out) = &args.output {
        let export = PlaybackExport {
            model: path,
            clip,
            duration: instance.clip_duration(),
            time_step: dt,
            frames: recorded,
        };
        write_export(out, &export)?;
        println!(
            "{} Wrote {} frames to {}",
            style("✓").green(),
            export.frames.len(),
            out.display()
        );
    }

    Ok(())
}

fn list_clips(model: &M3dModel) -> Result<()> {
    let mut table = create_table(vec!["Clip", "Duration", "Animated bones", "Share"]);
    for clip in &model.clips {
        add_table_row(
            &mut table,
            vec![
                clip.name.clone(),
                format_seconds(clip.duration()),
                clip.animated_bone_count().to_string(),
                animated_share(clip.animated_bone_count(), clip.bone_count()),
            ],
        );
    }
    table.printstd();
    Ok(())
}

/// Animated bones as a share of the skeleton
fn animated_share(animated: usize, bones: usize) -> String {
    if bones == 0 {
        return "-".to_string();
    }
    format_percentage(animated as f64 / bones as f64 * 100.0)
}

fn write_export(path: &Path, export: &PlaybackExport) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), export)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
