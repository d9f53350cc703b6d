//! Integration tests for the M3D parser and writer.

use std::io::Cursor;

use glam::{Mat4, Vec3, Vec4};
use m3d::{M3dError, M3dModel, StaticMesh};
use pretty_assertions::assert_eq;
use test_case::test_case;

const ARM: &str = "***************m3d-File-Header***************
#Materials 1
#Vertices 3
#Triangles 1
#Bones 2
#AnimationClips 1

***************Materials*********************
Name: arm
Diffuse: 1 0.9 0.8
Fresnel0: 0.05 0.05 0.05
Roughness: 0.4
AlphaClip: 0
MaterialTypeName: Skinned
DiffuseMap: arm_diff.dds
NormalMap: arm_norm.dds

***************SubsetTable*******************
SubsetID: 0 VertexStart: 0 VertexCount: 3 FaceStart: 0 FaceCount: 1

***************Vertices**********************
Position: 0 0 0
Tangent: 1 0 0 1
Normal: 0 0 -1
Tex-Coords: 0 0
BlendWeights: 1 0 0 0
BlendIndices: 0 0 0 0

Position: 0 1 0
Tangent: 1 0 0 1
Normal: 0 0 -1
Tex-Coords: 0 0.5
BlendWeights: 0.5 0.5 0 0
BlendIndices: 0 1 0 0

Position: 0 2 0
Tangent: 1 0 0 1
Normal: 0 0 -1
Tex-Coords: 0 1
BlendWeights: 1 0 0 0
BlendIndices: 1 0 0 0

***************Triangles*********************
0 1 2

***************BoneOffsets*******************
BoneOffset0 1 0 0 0 0 1 0 0 0 0 1 0 0 0 0 1
BoneOffset1 1 0 0 0 0 1 0 0 0 0 1 0 0 -1 0 1

***************BoneHierarchy*****************
ParentIndexOfBone0: -1
ParentIndexOfBone1: 0

***************AnimationClips****************
AnimationClip Take1
{
\tBone0 #Keyframes: 2
\t{
\t\tTime: 0 Pos: 0 0 0 Scale: 1 1 1 Quat: 0 0 0 1
\t\tTime: 1 Pos: 1 0 0 Scale: 1 1 1 Quat: 0 0 0 1
\t}

\tBone1 #Keyframes: 1
\t{
\t\tTime: 0 Pos: 0 1 0 Scale: 1 1 1 Quat: 0 0 0 1
\t}

}
";

#[test]
fn test_parse_complete_model() {
    let model = M3dModel::parse(Cursor::new(ARM)).unwrap();

    let header = model.header();
    assert_eq!(header.material_count, 1);
    assert_eq!(header.vertex_count, 3);
    assert_eq!(header.triangle_count, 1);
    assert_eq!(header.bone_count, 2);
    assert_eq!(header.clip_count, 1);

    let material = &model.materials[0];
    assert_eq!(material.name, "arm");
    assert_eq!(material.diffuse_albedo, Vec4::new(1.0, 0.9, 0.8, 1.0));
    assert_eq!(material.normal_map_name, "arm_norm.dds");

    assert_eq!(model.subsets[0].index_range(), 0..3);
    assert_eq!(model.indices, vec![0, 1, 2]);
    assert_eq!(model.vertices[1].bone_indices, [0, 1, 0, 0]);

    assert_eq!(model.skeleton.parent(1), Some(0));
    assert_eq!(
        model.skeleton.bones()[1].offset,
        Mat4::from_translation(Vec3::new(0.0, -1.0, 0.0))
    );

    let clip = &model.clips[0];
    assert_eq!(clip.name, "Take1");
    assert_eq!(clip.duration(), 1.0);

    model.validate().unwrap();
}

#[test]
fn test_write_matches_parse() {
    let model = M3dModel::parse(Cursor::new(ARM)).unwrap();
    let mut buffer = Vec::new();
    model.write(&mut buffer).unwrap();

    let reparsed = M3dModel::parse(Cursor::new(buffer)).unwrap();
    assert_eq!(reparsed, model);
}

#[test]
fn test_load_and_save_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("arm.m3d");
    std::fs::write(&path, ARM).unwrap();

    let model = M3dModel::load(&path).unwrap();
    let copy = dir.path().join("copy.m3d");
    model.save(&copy).unwrap();
    assert_eq!(M3dModel::load(&copy).unwrap(), model);
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = M3dModel::load(dir.path().join("soldier.m3d")).unwrap_err();
    assert!(matches!(err, M3dError::FileNotFound(path) if path.ends_with("soldier.m3d")));
}

#[test_case("#Vertices 3", "#Vertexes 3" ; "misspelled header tag")]
#[test_case("***************SubsetTable*******************", "***SubsetTable***" ; "wrong section marker")]
#[test_case("Tex-Coords: 0 0.5", "Tex-Coords: 0 half" ; "non numeric value")]
#[test_case("BoneOffset1", "BoneOffset2" ; "bone offset out of order")]
#[test_case("ParentIndexOfBone1: 0", "ParentIndexOfBone1: 1" ; "bone is its own parent")]
#[test_case("ParentIndexOfBone1: 0", "ParentIndexOfBone1: -3" ; "negative parent index")]
#[test_case("#Triangles 1", "#Triangles 2" ; "triangle count too high")]
#[test_case("#AnimationClips 1", "#AnimationClips 2" ; "missing clip")]
#[test_case("Time: 1 Pos: 1 0 0", "Time: -1 Pos: 1 0 0" ; "keyframes out of order")]
#[test_case("Quat: 0 0 0 1\n\t}\n\n\tBone1", "Quat: 0 0 0 0\n\t}\n\n\tBone1" ; "zero quaternion")]
#[test_case("\n}\n", "\n" ; "unterminated clip")]
fn test_malformed(from: &str, to: &str) {
    let text = ARM.replacen(from, to, 1);
    assert_ne!(text, ARM, "fixture replacement did not apply");
    let err = M3dModel::parse(Cursor::new(text)).unwrap_err();
    assert!(
        matches!(err, M3dError::MalformedFormat { .. }),
        "unexpected error: {err}"
    );
}

#[test_case("9223372036854775807" ; "index count overflows")]
#[test_case("1000000000000000000" ; "index count too large to allocate")]
fn test_huge_triangle_count(count: &str) {
    let text = ARM.replace("#Triangles 1", &format!("#Triangles {count}"));
    let err = M3dModel::parse_str(&text).unwrap_err();
    assert!(
        matches!(err, M3dError::MalformedFormat { .. }),
        "unexpected error: {err}"
    );
}

const QUAD_MESH: &str = "VertexCount: 4\nTriangleCount: 2\nVertexList (pos, normal)\n{\n\
    0 0 0 0 1 0\n1 0 0 0 1 0\n1 0 1 0 1 0\n0 0 1 0 1 0\n}\n\
    TriangleList\n{\n0 1 2\n0 2 3\n}\n";

#[test_case("9223372036854775807" ; "index count overflows")]
#[test_case("1000000000000000000" ; "index count too large to allocate")]
fn test_static_mesh_huge_triangle_count(count: &str) {
    let text = QUAD_MESH.replace("TriangleCount: 2", &format!("TriangleCount: {count}"));
    let err = StaticMesh::parse(Cursor::new(text)).unwrap_err();
    assert!(
        matches!(err, M3dError::MalformedFormat { .. }),
        "unexpected error: {err}"
    );
}

#[test]
fn test_error_reports_line() {
    let text = ARM.replace("Roughness: 0.4", "Roughnes: 0.4");
    match M3dModel::parse(Cursor::new(text)).unwrap_err() {
        M3dError::MalformedFormat { line, message } => {
            assert_eq!(line, 12);
            assert!(message.contains("Roughness:"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_validation_rejects_bad_blend_index() {
    let text = ARM.replace("BlendIndices: 1 0 0 0", "BlendIndices: 4 0 0 0");
    let model = M3dModel::parse(Cursor::new(text)).unwrap();
    assert!(matches!(
        model.validate(),
        Err(M3dError::ValidationError(_))
    ));
}

#[test]
fn test_static_mesh_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("skull.txt");
    std::fs::write(&path, QUAD_MESH).unwrap();

    let mesh = StaticMesh::load(&path).unwrap();
    assert_eq!(mesh.triangle_count(), 2);
    assert_eq!(mesh.bounds(), Some((Vec3::ZERO, Vec3::new(1.0, 0.0, 1.0))));
}
