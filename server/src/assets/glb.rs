// hearth-server/src/assets/glb.rs

//! Binary glTF 2.0 (GLB) reading, just enough to compute a model's bounds.
//!
//! Only the JSON chunk is parsed. Bounds come from the `min`/`max` that glTF
//! requires on every `POSITION` accessor, transformed through the node tree of
//! the default scene. The result is the axis-aligned box around the
//! transformed accessor boxes, which can be slightly larger than the tight
//! mesh bounds under rotation.

use crate::errors::AppError;
use crate::models::Boundary;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

const GLB_MAGIC: u32 = 0x4654_6C67; // "glTF"
const CHUNK_JSON: u32 = 0x4E4F_534A; // "JSON"
const HEADER_LEN: usize = 12;
const MAX_NODE_DEPTH: usize = 64;

#[derive(Debug, Error)]
pub enum GlbError {
  #[error("not a GLB file")]
  BadMagic,
  #[error("unsupported glTF version {0}")]
  UnsupportedVersion(u32),
  #[error("GLB container is truncated")]
  Truncated,
  #[error("first GLB chunk is not JSON")]
  MissingJson,
  #[error("invalid glTF JSON: {0}")]
  Json(#[from] serde_json::Error),
  #[error("mesh is empty")]
  EmptyMesh,
  #[error("node {0} is reachable more than once")]
  SharedNode(usize),
}

impl From<GlbError> for AppError {
  fn from(e: GlbError) -> Self {
    AppError::Validation(format!("Home model mesh is empty or invalid: {e}"))
  }
}

#[derive(Debug, Default, Deserialize)]
struct Document {
  scene: Option<usize>,
  #[serde(default)]
  scenes: Vec<Scene>,
  #[serde(default)]
  nodes: Vec<Node>,
  #[serde(default)]
  meshes: Vec<Mesh>,
  #[serde(default)]
  accessors: Vec<Accessor>,
}

#[derive(Debug, Default, Deserialize)]
struct Scene {
  #[serde(default)]
  nodes: Vec<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct Node {
  #[serde(default)]
  children: Vec<usize>,
  mesh: Option<usize>,
  matrix: Option<[f64; 16]>,
  translation: Option<[f64; 3]>,
  rotation: Option<[f64; 4]>,
  scale: Option<[f64; 3]>,
}

#[derive(Debug, Default, Deserialize)]
struct Mesh {
  #[serde(default)]
  primitives: Vec<Primitive>,
}

#[derive(Debug, Default, Deserialize)]
struct Primitive {
  #[serde(default)]
  attributes: HashMap<String, usize>,
}

#[derive(Debug, Default, Deserialize)]
struct Accessor {
  #[serde(default)]
  min: Vec<f64>,
  #[serde(default)]
  max: Vec<f64>,
}

/// Column-major 4x4, as glTF stores it.
type Mat4 = [f64; 16];

const IDENTITY: Mat4 = [1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0];

fn mul(a: &Mat4, b: &Mat4) -> Mat4 {
  let mut out = [0.0; 16];
  for col in 0..4 {
    for row in 0..4 {
      out[col * 4 + row] = (0..4).map(|k| a[k * 4 + row] * b[col * 4 + k]).sum();
    }
  }
  out
}

fn transform_point(m: &Mat4, p: [f64; 3]) -> [f64; 3] {
  [
    m[0] * p[0] + m[4] * p[1] + m[8] * p[2] + m[12],
    m[1] * p[0] + m[5] * p[1] + m[9] * p[2] + m[13],
    m[2] * p[0] + m[6] * p[1] + m[10] * p[2] + m[14],
  ]
}

impl Node {
  fn local_matrix(&self) -> Mat4 {
    if let Some(m) = self.matrix {
      return m;
    }
    let [tx, ty, tz] = self.translation.unwrap_or([0.0; 3]);
    let [x, y, z, w] = self.rotation.unwrap_or([0.0, 0.0, 0.0, 1.0]);
    let [sx, sy, sz] = self.scale.unwrap_or([1.0; 3]);
    [
      (1.0 - 2.0 * (y * y + z * z)) * sx,
      (2.0 * (x * y + w * z)) * sx,
      (2.0 * (x * z - w * y)) * sx,
      0.0,
      (2.0 * (x * y - w * z)) * sy,
      (1.0 - 2.0 * (x * x + z * z)) * sy,
      (2.0 * (y * z + w * x)) * sy,
      0.0,
      (2.0 * (x * z + w * y)) * sz,
      (2.0 * (y * z - w * x)) * sz,
      (1.0 - 2.0 * (x * x + y * y)) * sz,
      0.0,
      tx,
      ty,
      tz,
      1.0,
    ]
  }
}

#[derive(Debug)]
struct BoundsAccumulator {
  min: [f64; 3],
  max: [f64; 3],
  seen: bool,
}

impl BoundsAccumulator {
  fn new() -> Self {
    Self {
      min: [f64::INFINITY; 3],
      max: [f64::NEG_INFINITY; 3],
      seen: false,
    }
  }

  fn add_point(&mut self, p: [f64; 3]) {
    for axis in 0..3 {
      self.min[axis] = self.min[axis].min(p[axis]);
      self.max[axis] = self.max[axis].max(p[axis]);
    }
    self.seen = true;
  }

  fn add_box(&mut self, world: &Mat4, min: [f64; 3], max: [f64; 3]) {
    for corner in 0..8 {
      let p = [
        if corner & 1 == 0 { min[0] } else { max[0] },
        if corner & 2 == 0 { min[1] } else { max[1] },
        if corner & 4 == 0 { min[2] } else { max[2] },
      ];
      self.add_point(transform_point(world, p));
    }
  }

  fn finish(self) -> Result<Boundary, GlbError> {
    if !self.seen || self.min.iter().chain(self.max.iter()).any(|v| !v.is_finite()) {
      return Err(GlbError::EmptyMesh);
    }
    Ok(Boundary {
      min: self.min,
      max: self.max,
    })
  }
}

impl Document {
  fn position_box(&self, accessor_idx: usize) -> Option<([f64; 3], [f64; 3])> {
    let accessor = self.accessors.get(accessor_idx)?;
    match (accessor.min.as_slice(), accessor.max.as_slice()) {
      ([a, b, c], [d, e, f]) => Some(([*a, *b, *c], [*d, *e, *f])),
      _ => None,
    }
  }

  fn add_mesh(&self, mesh_idx: usize, world: &Mat4, acc: &mut BoundsAccumulator) {
    let Some(mesh) = self.meshes.get(mesh_idx) else {
      return;
    };
    for primitive in &mesh.primitives {
      if let Some((min, max)) = primitive.attributes.get("POSITION").and_then(|idx| self.position_box(*idx)) {
        acc.add_box(world, min, max);
      }
    }
  }

  /// Every node may appear once in the scene graph; `visited` spans the
  /// whole traversal, so a node reached a second time (shared subtree or
  /// cycle) is rejected.
  fn visit(
    &self,
    node_idx: usize,
    parent: &Mat4,
    depth: usize,
    visited: &mut HashSet<usize>,
    acc: &mut BoundsAccumulator,
  ) -> Result<(), GlbError> {
    if depth > MAX_NODE_DEPTH {
      return Ok(());
    }
    if !visited.insert(node_idx) {
      return Err(GlbError::SharedNode(node_idx));
    }
    if let Some(node) = self.nodes.get(node_idx) {
      let world = mul(parent, &node.local_matrix());
      if let Some(mesh_idx) = node.mesh {
        self.add_mesh(mesh_idx, &world, acc);
      }
      for child in &node.children {
        self.visit(*child, &world, depth + 1, visited, acc)?;
      }
    }
    Ok(())
  }

  fn root_nodes(&self) -> Vec<usize> {
    if let Some(scene) = self.scenes.get(self.scene.unwrap_or(0)) {
      return scene.nodes.clone();
    }
    let children: HashSet<usize> = self.nodes.iter().flat_map(|n| n.children.iter().copied()).collect();
    (0..self.nodes.len()).filter(|i| !children.contains(i)).collect()
  }

  fn bounds(&self) -> Result<Boundary, GlbError> {
    let mut acc = BoundsAccumulator::new();
    if self.nodes.is_empty() {
      // No scene graph: meshes sit at the origin.
      for mesh_idx in 0..self.meshes.len() {
        self.add_mesh(mesh_idx, &IDENTITY, &mut acc);
      }
    } else {
      let mut visited = HashSet::new();
      for root in self.root_nodes() {
        self.visit(root, &IDENTITY, 0, &mut visited, &mut acc)?;
      }
    }
    acc.finish()
  }
}

fn read_u32(bytes: &[u8], offset: usize) -> Result<u32, GlbError> {
  bytes
    .get(offset..offset + 4)
    .and_then(|s| s.try_into().ok())
    .map(u32::from_le_bytes)
    .ok_or(GlbError::Truncated)
}

fn json_chunk(bytes: &[u8]) -> Result<&[u8], GlbError> {
  if read_u32(bytes, 0).map_err(|_| GlbError::BadMagic)? != GLB_MAGIC {
    return Err(GlbError::BadMagic);
  }
  let version = read_u32(bytes, 4)?;
  if version != 2 {
    return Err(GlbError::UnsupportedVersion(version));
  }
  let declared_len = read_u32(bytes, 8)? as usize;
  if declared_len > bytes.len() {
    return Err(GlbError::Truncated);
  }
  let chunk_len = read_u32(bytes, HEADER_LEN)? as usize;
  if read_u32(bytes, HEADER_LEN + 4)? != CHUNK_JSON {
    return Err(GlbError::MissingJson);
  }
  let start = HEADER_LEN + 8;
  bytes.get(start..start + chunk_len).ok_or(GlbError::Truncated)
}

/// World-space bounds of the default scene of a GLB file.
pub fn model_bounds(bytes: &[u8]) -> Result<Boundary, GlbError> {
  let document: Document = serde_json::from_slice(json_chunk(bytes)?)?;
  document.bounds()
}

/// Wraps a glTF JSON document into a GLB container with no binary chunk.
pub fn write_glb(json: &[u8]) -> Vec<u8> {
  let padded_len = json.len().div_ceil(4) * 4;
  let total_len = HEADER_LEN + 8 + padded_len;
  let mut out = Vec::with_capacity(total_len);
  out.extend_from_slice(&GLB_MAGIC.to_le_bytes());
  out.extend_from_slice(&2u32.to_le_bytes());
  out.extend_from_slice(&(total_len as u32).to_le_bytes());
  out.extend_from_slice(&(padded_len as u32).to_le_bytes());
  out.extend_from_slice(&CHUNK_JSON.to_le_bytes());
  out.extend_from_slice(json);
  out.resize(total_len, b' ');
  out
}

#[cfg(test)]
mod tests {
  use super::*;
  use actix_web::ResponseError;
  use serde_json::json;

  fn cube_doc(nodes: serde_json::Value) -> Vec<u8> {
    let doc = json!({
      "asset": { "version": "2.0" },
      "scene": 0,
      "scenes": [{ "nodes": [0] }],
      "nodes": nodes,
      "meshes": [{ "primitives": [{ "attributes": { "POSITION": 0 } }] }],
      "accessors": [{ "min": [-1.0, -1.0, -1.0], "max": [1.0, 1.0, 1.0] }]
    });
    write_glb(&serde_json::to_vec(&doc).unwrap())
  }

  fn assert_close(actual: [f64; 3], expected: [f64; 3]) {
    for i in 0..3 {
      assert!((actual[i] - expected[i]).abs() < 1e-9, "{actual:?} != {expected:?}");
    }
  }

  #[test]
  fn unit_cube_at_origin() {
    let bounds = model_bounds(&cube_doc(json!([{ "mesh": 0 }]))).unwrap();
    assert_close(bounds.min, [-1.0, -1.0, -1.0]);
    assert_close(bounds.max, [1.0, 1.0, 1.0]);
  }

  #[test]
  fn node_translation_and_scale_apply() {
    let nodes = json!([{ "mesh": 0, "translation": [10.0, 0.0, -2.0], "scale": [2.0, 3.0, 1.0] }]);
    let bounds = model_bounds(&cube_doc(nodes)).unwrap();
    assert_close(bounds.min, [8.0, -3.0, -3.0]);
    assert_close(bounds.max, [12.0, 3.0, -1.0]);
  }

  #[test]
  fn child_transforms_compose_with_parents() {
    let nodes = json!([
      { "children": [1], "translation": [0.0, 5.0, 0.0] },
      // 90 degrees around Z
      { "mesh": 0, "rotation": [0.0, 0.0, std::f64::consts::FRAC_1_SQRT_2, std::f64::consts::FRAC_1_SQRT_2], "scale": [4.0, 1.0, 1.0] }
    ]);
    let bounds = model_bounds(&cube_doc(nodes)).unwrap();
    assert_close(bounds.min, [-1.0, 1.0, -1.0]);
    assert_close(bounds.max, [1.0, 9.0, 1.0]);
  }

  #[test]
  fn cyclic_children_are_rejected() {
    let nodes = json!([{ "mesh": 0, "children": [1] }, { "children": [0] }]);
    assert!(matches!(model_bounds(&cube_doc(nodes)), Err(GlbError::SharedNode(0))));
  }

  #[test]
  fn shared_subtrees_are_rejected_without_walking_them() {
    // Node i lists node i + 1 twice; walking every path would take 2^40 visits.
    let mut nodes: Vec<serde_json::Value> = (0..40).map(|i| json!({ "children": [i + 1, i + 1] })).collect();
    nodes.push(json!({ "mesh": 0 }));
    let err = model_bounds(&cube_doc(serde_json::Value::Array(nodes))).unwrap_err();
    assert!(matches!(err, GlbError::SharedNode(_)));
    assert_eq!(AppError::from(err).status_code(), actix_web::http::StatusCode::BAD_REQUEST);
  }

  #[test]
  fn model_without_positions_is_empty() {
    let doc = json!({ "asset": { "version": "2.0" }, "nodes": [{}] });
    let err = model_bounds(&write_glb(&serde_json::to_vec(&doc).unwrap())).unwrap_err();
    assert!(matches!(err, GlbError::EmptyMesh));
  }

  #[test]
  fn garbage_is_rejected() {
    assert!(matches!(model_bounds(b"not a model"), Err(GlbError::BadMagic)));
    assert!(matches!(model_bounds(b""), Err(GlbError::BadMagic)));
    let mut glb = cube_doc(json!([{ "mesh": 0 }]));
    glb.truncate(30);
    assert!(matches!(model_bounds(&glb), Err(GlbError::Truncated)));
  }
}
