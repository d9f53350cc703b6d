//! M3D model file command implementations

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Subcommand, ValueEnum};
use console::style;
use m3d::{M3dModel, Skeleton};

use crate::frame::MAX_BONES;
use crate::utils::{
    NodeType, TreeNode, TreeOptions, add_table_row, create_table, format_bytes, format_seconds,
    render_tree,
};

#[derive(Subcommand)]
pub enum ModelCommands {
    /// Display information about an M3D model file
    Info {
        /// Path to the M3D file
        file: PathBuf,

        /// Show per-bone and per-vertex details
        #[arg(short, long)]
        detailed: bool,
    },

    /// Display M3D file structure as a tree
    Tree {
        /// Path to the M3D file
        file: PathBuf,

        /// Maximum depth to display
        #[arg(short, long)]
        depth: Option<usize>,

        /// Directory to check referenced textures against
        #[arg(short, long)]
        textures: Option<PathBuf>,

        /// Hide texture references
        #[arg(long)]
        no_external_refs: bool,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,

        /// Show metadata inline
        #[arg(long)]
        compact: bool,
    },

    /// Validate an M3D model file
    Validate {
        /// Path to the M3D file
        file: PathBuf,
    },

    /// Export the parsed model as JSON or YAML
    Export {
        /// Path to the M3D file
        file: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "json")]
        format: ExportFormat,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Json,
    Yaml,
}

pub fn execute(cmd: ModelCommands) -> Result<()> {
    match cmd {
        ModelCommands::Info { file, detailed } => handle_info(&file, detailed),
        ModelCommands::Tree {
            file,
            depth,
            textures,
            no_external_refs,
            no_color,
            compact,
        } => handle_tree(
            &file,
            textures.as_deref(),
            &TreeOptions {
                max_depth: depth,
                show_external_refs: !no_external_refs,
                no_color,
                show_metadata: true,
                compact,
            },
        ),
        ModelCommands::Validate { file } => handle_validate(&file),
        ModelCommands::Export {
            file,
            format,
            output,
        } => handle_export(&file, format, output.as_deref()),
    }
}

fn load(path: &Path) -> Result<M3dModel> {
    M3dModel::load(path).with_context(|| format!("Failed to load M3D file {}", path.display()))
}

fn handle_info(path: &Path, detailed: bool) -> Result<()> {
    let model = load(path)?;
    let header = model.header();
    let size = fs::metadata(path).map(|m| m.len()).unwrap_or(0);

    println!("{}", style("M3D Model Information").bold().cyan());
    println!("{}", style("=====================").cyan());
    println!();
    println!("{}: {}", style("File").bold(), path.display());
    println!("{}: {}", style("Size").bold(), format_bytes(size));
    println!("{}: {}", style("Materials").bold(), header.material_count);
    println!("{}: {}", style("Vertices").bold(), header.vertex_count);
    println!("{}: {}", style("Triangles").bold(), header.triangle_count);
    println!("{}: {}", style("Bones").bold(), header.bone_count);
    println!("{}: {}", style("Animation clips").bold(), header.clip_count);
    println!();

    println!("{}", style("Materials:").bold());
    let mut materials = create_table(vec!["#", "Name", "Diffuse map", "Normal map", "Roughness"]);
    for (i, material) in model.materials.iter().enumerate() {
        add_table_row(
            &mut materials,
            vec![
                i.to_string(),
                material.name.clone(),
                material.diffuse_map_name.clone(),
                material.normal_map_name.clone(),
                format!("{:.2}", material.roughness),
            ],
        );
    }
    materials.printstd();
    println!();

    println!("{}", style("Subsets:").bold());
    let mut subsets = create_table(vec!["ID", "Vertices", "Faces", "Material"]);
    for (subset, material) in model.subsets.iter().zip(&model.materials) {
        add_table_row(
            &mut subsets,
            vec![
                subset.id.to_string(),
                format!(
                    "{}..{}",
                    subset.vertex_start,
                    subset.vertex_start + subset.vertex_count
                ),
                format!("{}..{}", subset.face_start, subset.face_start + subset.face_count),
                material.name.clone(),
            ],
        );
    }
    subsets.printstd();
    println!();

    println!("{}", style("Animation clips:").bold());
    let mut clips = create_table(vec!["Name", "Start", "End", "Animated bones", "Keyframes"]);
    for clip in &model.clips {
        add_table_row(
            &mut clips,
            vec![
                clip.name.clone(),
                format_seconds(clip.start_time()),
                format_seconds(clip.end_time()),
                format!("{} / {}", clip.animated_bone_count(), clip.bone_count()),
                clip.keyframe_count().to_string(),
            ],
        );
    }
    clips.printstd();

    if detailed {
        println!();
        println!("{}", style("Bones:").bold());
        let mut bones = create_table(vec!["#", "Parent", "Depth", "Children"]);
        let skeleton = &model.skeleton;
        for i in 0..skeleton.bone_count() {
            add_table_row(
                &mut bones,
                vec![
                    i.to_string(),
                    skeleton
                        .parent(i)
                        .map_or_else(|| "-".to_string(), |p| p.to_string()),
                    skeleton.depth(i).to_string(),
                    skeleton.children(i).count().to_string(),
                ],
            );
        }
        bones.printstd();
    }

    Ok(())
}

fn bone_node(skeleton: &Skeleton, bone: usize) -> TreeNode {
    let mut node = TreeNode::new(format!("Bone{bone}"), NodeType::Bone);
    if let Some(parent) = skeleton.parent(bone) {
        node = node.with_metadata("parent", parent);
    }
    for child in skeleton.children(bone) {
        node = node.add_child(bone_node(skeleton, child));
    }
    node
}

/// Build the section tree shown by `model tree`
pub fn model_tree(name: &str, model: &M3dModel, textures: Option<&Path>) -> TreeNode {
    let header = model.header();
    let exists = |file: &str| textures.map(|dir| dir.join(file).exists());

    let header_node = TreeNode::new("Header", NodeType::Header)
        .with_metadata("materials", header.material_count)
        .with_metadata("vertices", header.vertex_count)
        .with_metadata("triangles", header.triangle_count)
        .with_metadata("bones", header.bone_count)
        .with_metadata("clips", header.clip_count);

    let mut materials = TreeNode::new("Materials", NodeType::Section)
        .with_metadata("count", model.materials.len());
    for material in &model.materials {
        let mut node = TreeNode::new(material.name.clone(), NodeType::Property)
            .with_metadata("roughness", material.roughness)
            .with_metadata("alpha clip", material.alpha_clip);
        for file in [&material.diffuse_map_name, &material.normal_map_name] {
            if !file.is_empty() {
                node = node.with_external_ref(file, exists(file));
            }
        }
        materials = materials.add_child(node);
    }

    let mut subsets =
        TreeNode::new("SubsetTable", NodeType::Table).with_metadata("count", model.subsets.len());
    for subset in &model.subsets {
        subsets = subsets.add_child(
            TreeNode::new(format!("Subset{}", subset.id), NodeType::Property)
                .with_metadata("faces", format!("{:?}", subset.faces())),
        );
    }

    let geometry = TreeNode::new("Geometry", NodeType::Section)
        .add_child(
            TreeNode::new("Vertices", NodeType::Table)
                .with_metadata("count", model.vertices.len()),
        )
        .add_child(
            TreeNode::new("Triangles", NodeType::Table)
                .with_metadata("count", model.triangle_count()),
        );

    let mut skeleton = TreeNode::new("Skeleton", NodeType::Section)
        .with_metadata("count", model.skeleton.bone_count());
    for root in model.skeleton.roots() {
        skeleton = skeleton.add_child(bone_node(&model.skeleton, root));
    }

    let mut clips =
        TreeNode::new("AnimationClips", NodeType::Section).with_metadata("count", model.clips.len());
    for clip in &model.clips {
        clips = clips.add_child(
            TreeNode::new(clip.name.clone(), NodeType::Clip)
                .with_metadata("duration", format_seconds(clip.duration()))
                .with_metadata("keys", clip.keyframe_count()),
        );
    }

    TreeNode::new(name, NodeType::Root)
        .add_child(header_node)
        .add_child(materials)
        .add_child(subsets)
        .add_child(geometry)
        .add_child(skeleton)
        .add_child(clips)
}

fn handle_tree(path: &Path, textures: Option<&Path>, options: &TreeOptions) -> Result<()> {
    let model = load(path)?;
    let name = path
        .file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());

    let mut root = model_tree(&name, &model, textures);
    if let Ok(meta) = fs::metadata(path) {
        root = root.with_size(meta.len());
    }

    print!("{}", render_tree(&root, options));
    Ok(())
}

fn handle_validate(path: &Path) -> Result<()> {
    println!("{}", style("Validating M3D File").bold().cyan());
    println!("{}", style("===================").cyan());
    println!();

    let model = load(path)?;
    let mut warnings = Vec::new();

    if model.skeleton.bone_count() > MAX_BONES {
        warnings.push(format!(
            "{} bones exceed the {MAX_BONES} bone palette used for rendering",
            model.skeleton.bone_count()
        ));
    }
    for clip in &model.clips {
        if clip.animated_bone_count() == 0 {
            warnings.push(format!("clip '{}' animates no bones", clip.name));
        }
    }
    for (i, vertex) in model.vertices.iter().enumerate() {
        if (vertex.weight_sum() - 1.0).abs() > 1e-3 {
            warnings.push(format!(
                "vertex {i} blend weights sum to {:.4}",
                vertex.weight_sum()
            ));
        }
    }

    match model.validate() {
        Ok(()) => println!("{} {}", style("✓").green(), style("File is valid!").green()),
        Err(err) => {
            println!("{} {}", style("✗").red(), err);
            return Err(err).with_context(|| format!("{} is not a valid model", path.display()));
        }
    }

    if !warnings.is_empty() {
        println!("\n{} {} warning(s):", style("⚠").yellow(), warnings.len());
        for warning in warnings {
            println!("  {} {}", style("•").yellow(), warning);
        }
    }

    Ok(())
}

fn handle_export(path: &Path, format: ExportFormat, output: Option<&Path>) -> Result<()> {
    let model = load(path)?;
    let text = match format {
        ExportFormat::Json => serde_json::to_string_pretty(&model)?,
        ExportFormat::Yaml => serde_yaml_ng::to_string(&model)?,
    };

    match output {
        Some(out) => {
            fs::write(out, text)
                .with_context(|| format!("Failed to write {}", out.display()))?;
            log::info!("Exported {} to {}", path.display(), out.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(text.as_bytes())?;
            writeln!(stdout)?;
        }
    }
    Ok(())
}
