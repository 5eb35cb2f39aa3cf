// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! 3D model previews
//!
//! STL (ASCII and binary) and Wavefront OBJ meshes are drawn by a small
//! software rasterizer: orthographic projection from a fixed viewpoint,
//! depth buffer, flat Lambert shading of a single foreground colour on a
//! plain background.

use async_trait::async_trait;
use image::{DynamicImage, Rgb, RgbImage};
use std::path::Path;

use super::pipeline;
use crate::domain::render::{RenderError, ThumbnailGenerator};
use crate::domain::thumbnail::{source_extension, HIGH_JPEG_QUALITY, THUMBNAIL_EDGE};

/// #f2f542
pub const FOREGROUND: Rgb<u8> = Rgb([0xf2, 0xf5, 0x42]);
/// #ffffff
pub const BACKGROUND: Rgb<u8> = Rgb([0xff, 0xff, 0xff]);

const YAW_DEGREES: f32 = 35.0;
const PITCH_DEGREES: f32 = 25.0;
const AMBIENT: f32 = 0.35;
/// Share of the frame the projected model may occupy
const FILL: f32 = 0.9;

type Vec3 = [f32; 3];

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Mesh {
    pub triangles: Vec<[Vec3; 3]>,
}

pub struct ModelPreviewGenerator;

#[async_trait]
impl ThumbnailGenerator for ModelPreviewGenerator {
    fn name(&self) -> &'static str {
        "model"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["stl", "obj"]
    }

    async fn generate(&self, source: &Path, target: &Path) -> Result<(), RenderError> {
        let bytes = tokio::fs::read(source).await?;
        let is_obj = source_extension(source).as_deref() == Some("obj");

        let jpeg = pipeline::blocking(move || {
            let mesh = if is_obj {
                parse_obj(&String::from_utf8_lossy(&bytes))?
            } else {
                parse_stl(&bytes)?
            };
            let img = rasterize(&mesh, THUMBNAIL_EDGE, FOREGROUND, BACKGROUND);
            pipeline::encode_jpeg(&DynamicImage::ImageRgb8(img), HIGH_JPEG_QUALITY)
        })
        .await?;

        pipeline::write_atomic(target, &jpeg).await
    }
}

// ============================================================================
// Parsers
// ============================================================================

/// Parse binary or ASCII STL
///
/// A file is binary when its triangle count matches its length exactly,
/// since some exporters write binary files whose header begins with `solid`.
pub fn parse_stl(bytes: &[u8]) -> Result<Mesh, RenderError> {
    if bytes.len() >= 84 {
        let count = u32::from_le_bytes([bytes[80], bytes[81], bytes[82], bytes[83]]) as usize;
        if count.checked_mul(50).and_then(|n| n.checked_add(84)) == Some(bytes.len()) {
            return parse_binary_stl(&bytes[84..], count);
        }
    }

    if bytes.trim_ascii_start().starts_with(b"solid") {
        return parse_ascii_stl(&String::from_utf8_lossy(bytes));
    }

    Err(RenderError::Decode("unrecognised STL layout".to_string()))
}

fn parse_binary_stl(body: &[u8], count: usize) -> Result<Mesh, RenderError> {
    let mut triangles = Vec::with_capacity(count);
    for record in body.chunks_exact(50) {
        // 12 bytes of facet normal precede the three vertices
        let mut tri = [[0.0f32; 3]; 3];
        for (v, vertex) in tri.iter_mut().enumerate() {
            for (axis, value) in vertex.iter_mut().enumerate() {
                let at = 12 + v * 12 + axis * 4;
                *value = f32::from_le_bytes([
                    record[at],
                    record[at + 1],
                    record[at + 2],
                    record[at + 3],
                ]);
            }
        }
        triangles.push(tri);
    }
    non_empty(Mesh { triangles })
}

fn parse_ascii_stl(text: &str) -> Result<Mesh, RenderError> {
    let mut vertices = Vec::new();
    let mut tokens = text.split_whitespace();
    while let Some(token) = tokens.next() {
        if token.eq_ignore_ascii_case("vertex") {
            vertices.push([
                parse_float(tokens.next())?,
                parse_float(tokens.next())?,
                parse_float(tokens.next())?,
            ]);
        }
    }

    if vertices.len() % 3 != 0 {
        return Err(RenderError::Decode(format!(
            "STL vertex count {} is not a multiple of three",
            vertices.len()
        )));
    }

    let triangles = vertices
        .chunks_exact(3)
        .map(|c| [c[0], c[1], c[2]])
        .collect();
    non_empty(Mesh { triangles })
}

/// Parse the vertex and face statements of a Wavefront OBJ file
///
/// Polygons are fan-triangulated; negative indices count back from the last
/// vertex defined so far.
pub fn parse_obj(text: &str) -> Result<Mesh, RenderError> {
    let mut vertices: Vec<Vec3> = Vec::new();
    let mut triangles = Vec::new();

    for line in text.lines() {
        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("v") => vertices.push([
                parse_float(parts.next())?,
                parse_float(parts.next())?,
                parse_float(parts.next())?,
            ]),
            Some("f") => {
                let corners = parts
                    .map(|p| resolve_obj_index(p, vertices.len()))
                    .collect::<Result<Vec<usize>, RenderError>>()?;
                if corners.len() < 3 {
                    return Err(RenderError::Decode(format!("face with {} corners", corners.len())));
                }
                for i in 1..corners.len() - 1 {
                    triangles.push([
                        vertices[corners[0]],
                        vertices[corners[i]],
                        vertices[corners[i + 1]],
                    ]);
                }
            }
            _ => {}
        }
    }

    non_empty(Mesh { triangles })
}

fn resolve_obj_index(token: &str, defined: usize) -> Result<usize, RenderError> {
    let raw = token.split('/').next().unwrap_or_default();
    let index: i64 = raw
        .parse()
        .map_err(|_| RenderError::Decode(format!("bad face index '{}'", token)))?;

    let resolved = match index {
        i if i > 0 => i - 1,
        i if i < 0 => defined as i64 + i,
        _ => -1,
    };
    if resolved < 0 || resolved as usize >= defined {
        return Err(RenderError::Decode(format!("face index {} out of range", index)));
    }
    Ok(resolved as usize)
}

fn parse_float(token: Option<&str>) -> Result<f32, RenderError> {
    token
        .and_then(|t| t.parse::<f32>().ok())
        .filter(|v| v.is_finite())
        .ok_or_else(|| RenderError::Decode("bad coordinate".to_string()))
}

fn non_empty(mesh: Mesh) -> Result<Mesh, RenderError> {
    if mesh.triangles.is_empty() {
        return Err(RenderError::Decode("model has no triangles".to_string()));
    }
    Ok(mesh)
}

// ============================================================================
// Rasterizer
// ============================================================================

/// Draw `mesh` into an `edge` x `edge` image
pub fn rasterize(mesh: &Mesh, edge: u32, fg: Rgb<u8>, bg: Rgb<u8>) -> RgbImage {
    let mut img = RgbImage::from_pixel(edge, edge, bg);

    let view: Vec<[Vec3; 3]> = mesh
        .triangles
        .iter()
        .map(|tri| [to_view(tri[0]), to_view(tri[1]), to_view(tri[2])])
        .collect();

    // Centre the projected bounding box and scale it into the frame
    let (mut min_x, mut max_x) = (f32::INFINITY, f32::NEG_INFINITY);
    let (mut min_y, mut max_y) = (f32::INFINITY, f32::NEG_INFINITY);
    for v in view.iter().flatten() {
        min_x = min_x.min(v[0]);
        max_x = max_x.max(v[0]);
        min_y = min_y.min(v[1]);
        max_y = max_y.max(v[1]);
    }
    let span = (max_x - min_x).max(max_y - min_y);
    if !span.is_finite() || span <= f32::EPSILON {
        return img;
    }
    let size = edge as f32;
    let scale = size * FILL / span;
    let (mid_x, mid_y) = ((min_x + max_x) / 2.0, (min_y + max_y) / 2.0);
    let to_screen = |v: Vec3| -> Vec3 {
        [
            size / 2.0 + (v[0] - mid_x) * scale,
            size / 2.0 - (v[1] - mid_y) * scale,
            v[2],
        ]
    };

    let light = normalize([-0.4, 0.7, -0.6]);
    let mut depth = vec![f32::INFINITY; (edge * edge) as usize];

    for tri in &view {
        let normal = normalize(cross(sub(tri[1], tri[0]), sub(tri[2], tri[0])));
        let lambert = dot(normal, light).abs();
        let shade = AMBIENT + (1.0 - AMBIENT) * lambert;
        let colour = Rgb([
            (fg[0] as f32 * shade).round().min(255.0) as u8,
            (fg[1] as f32 * shade).round().min(255.0) as u8,
            (fg[2] as f32 * shade).round().min(255.0) as u8,
        ]);

        let [a, b, c] = [to_screen(tri[0]), to_screen(tri[1]), to_screen(tri[2])];
        let area = edge_fn(a, b, c);
        if area.abs() <= f32::EPSILON {
            continue;
        }

        let x0 = a[0].min(b[0]).min(c[0]).floor().max(0.0) as u32;
        let x1 = (a[0].max(b[0]).max(c[0]).ceil() as u32).min(edge);
        let y0 = a[1].min(b[1]).min(c[1]).floor().max(0.0) as u32;
        let y1 = (a[1].max(b[1]).max(c[1]).ceil() as u32).min(edge);

        for py in y0..y1 {
            for px in x0..x1 {
                let p = [px as f32 + 0.5, py as f32 + 0.5, 0.0];
                let w0 = edge_fn(b, c, p) / area;
                let w1 = edge_fn(c, a, p) / area;
                let w2 = edge_fn(a, b, p) / area;
                if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                    continue;
                }
                let z = w0 * a[2] + w1 * b[2] + w2 * c[2];
                let slot = (py * edge + px) as usize;
                if z < depth[slot] {
                    depth[slot] = z;
                    img.put_pixel(px, py, colour);
                }
            }
        }
    }

    img
}

/// Model space (Z up) to view space: x right, y up, z away from the camera
fn to_view(v: Vec3) -> Vec3 {
    let (sy, cy) = YAW_DEGREES.to_radians().sin_cos();
    let (sp, cp) = PITCH_DEGREES.to_radians().sin_cos();

    let x1 = v[0] * cy - v[1] * sy;
    let y1 = v[0] * sy + v[1] * cy;
    let z1 = v[2];

    let up = z1 * cp - y1 * sp;
    let away = z1 * sp + y1 * cp;
    [x1, up, away]
}

fn edge_fn(a: Vec3, b: Vec3, p: Vec3) -> f32 {
    (b[0] - a[0]) * (p[1] - a[1]) - (b[1] - a[1]) * (p[0] - a[0])
}

fn sub(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn cross(a: Vec3, b: Vec3) -> Vec3 {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn dot(a: Vec3, b: Vec3) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn normalize(v: Vec3) -> Vec3 {
    let len = dot(v, v).sqrt();
    if len <= f32::EPSILON {
        return [0.0, 0.0, 0.0];
    }
    [v[0] / len, v[1] / len, v[2] / len]
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GenericImageView;

    const TETRA_STL: &str = "solid tetra
  facet normal 0 0 -1
    outer loop
      vertex 0 0 0
      vertex 1 0 0
      vertex 0 1 0
    endloop
  endfacet
  facet normal 0 -1 0
    outer loop
      vertex 0 0 0
      vertex 0 0 1
      vertex 1 0 0
    endloop
  endfacet
  facet normal -1 0 0
    outer loop
      vertex 0 0 0
      vertex 0 1 0
      vertex 0 0 1
    endloop
  endfacet
  facet normal 1 1 1
    outer loop
      vertex 1 0 0
      vertex 0 0 1
      vertex 0 1 0
    endloop
  endfacet
endsolid tetra
";

    fn binary_stl(triangles: &[[Vec3; 3]]) -> Vec<u8> {
        let mut out = vec![0u8; 80];
        out.extend_from_slice(&(triangles.len() as u32).to_le_bytes());
        for tri in triangles {
            out.extend_from_slice(&[0u8; 12]);
            for v in tri {
                for c in v {
                    out.extend_from_slice(&c.to_le_bytes());
                }
            }
            out.extend_from_slice(&[0u8; 2]);
        }
        out
    }

    #[test]
    fn test_parse_ascii_stl() {
        let mesh = parse_stl(TETRA_STL.as_bytes()).unwrap();
        assert_eq!(mesh.triangles.len(), 4);
        assert_eq!(mesh.triangles[0][1], [1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_parse_binary_stl_with_solid_header() {
        let tri = [[0.0, 0.0, 0.0], [2.0, 0.0, 0.0], [0.0, 2.0, 0.5]];
        let mut bytes = binary_stl(&[tri]);
        bytes[..5].copy_from_slice(b"solid");

        let mesh = parse_stl(&bytes).unwrap();
        assert_eq!(mesh.triangles, vec![tri]);
    }

    #[test]
    fn test_parse_obj_fans_polygons_and_negative_indices() {
        let obj = "# quad\nv 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nvn 0 0 1\nf 1//1 2//1 3//1 4//1\nf -4 -3 -1\n";
        let mesh = parse_obj(obj).unwrap();

        assert_eq!(mesh.triangles.len(), 3);
        assert_eq!(mesh.triangles[1], [[0.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]]);
        assert_eq!(mesh.triangles[2][2], [0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_parse_rejects_out_of_range_and_empty() {
        assert!(parse_obj("v 0 0 0\nf 1 2 3\n").is_err());
        assert!(parse_obj("# nothing here\n").is_err());
        assert!(parse_stl(b"solid empty\nendsolid empty\n").is_err());
        assert!(parse_stl(b"\x01\x02garbage").is_err());
    }

    #[test]
    fn test_rasterize_draws_centred_model_on_background() {
        let mesh = parse_stl(TETRA_STL.as_bytes()).unwrap();
        let img = rasterize(&mesh, 480, FOREGROUND, BACKGROUND);

        assert_eq!(img.dimensions(), (480, 480));
        assert_eq!(*img.get_pixel(0, 0), BACKGROUND);
        assert_eq!(*img.get_pixel(479, 479), BACKGROUND);
        let painted = img.pixels().filter(|p| **p != BACKGROUND).count();
        assert!(painted > 480 * 480 / 10, "only {} pixels painted", painted);
    }

    #[tokio::test]
    async fn test_generate_writes_square_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("tetra.stl");
        tokio::fs::write(&source, TETRA_STL).await.unwrap();
        let target = dir.path().join("tetra.stl.jpg");

        ModelPreviewGenerator.generate(&source, &target).await.unwrap();

        let thumb = image::open(&target).unwrap();
        assert_eq!(thumb.dimensions(), (480, 480));
    }
}
