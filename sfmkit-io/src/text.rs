//! Text encoding of the sparse model
//!
//! Line-oriented UTF-8 files with `#`-prefixed header comments. Floats are
//! printed with Rust's shortest round-trip formatting, so a re-read
//! reproduces the written values exactly. Writers emit records in ascending
//! id order; readers accept any order and non-contiguous ids.

use crate::error::{IoError, Result};
use sfmkit_core::{Camera, CameraModel, Point2, Point3, PosedImage, Point3D, Vector3};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::str::FromStr;

/// Write `cameras.txt`
pub fn write_cameras(path: &Path, cameras: &BTreeMap<u64, Camera>) -> Result<()> {
    crate::atomic_write(path, |w| {
        writeln!(w, "# Camera list with one line of data per camera:")?;
        writeln!(w, "#   CAMERA_ID, MODEL, WIDTH, HEIGHT, PARAMS[]")?;
        writeln!(w, "# Number of cameras: {}", cameras.len())?;
        for camera in cameras.values() {
            write!(
                w,
                "{} {} {} {}",
                camera.id,
                camera.model.name(),
                camera.width,
                camera.height
            )?;
            for param in &camera.params {
                write!(w, " {}", param)?;
            }
            writeln!(w)?;
        }
        Ok(())
    })
}

/// Write `images.txt`
pub fn write_images(path: &Path, images: &BTreeMap<u64, PosedImage>) -> Result<()> {
    crate::atomic_write(path, |w| {
        writeln!(w, "# Image list with two lines of data per image:")?;
        writeln!(
            w,
            "#   IMAGE_ID, QW, QX, QY, QZ, TX, TY, TZ, CAMERA_ID, NAME"
        )?;
        writeln!(w, "#   POINTS2D[] as (X, Y, POINT3D_ID)")?;
        writeln!(w, "# Number of images: {}", images.len())?;
        for image in images.values() {
            writeln!(
                w,
                "{} {} {} {} {} {} {} {} {} {}",
                image.id,
                image.qvec[0],
                image.qvec[1],
                image.qvec[2],
                image.qvec[3],
                image.tvec.x,
                image.tvec.y,
                image.tvec.z,
                image.camera_id,
                image.name
            )?;
            for (i, (xy, point3d_id)) in image.xys.iter().zip(&image.point3d_ids).enumerate() {
                if i > 0 {
                    write!(w, " ")?;
                }
                write!(w, "{} {} {}", xy.x, xy.y, point3d_id)?;
            }
            writeln!(w)?;
        }
        Ok(())
    })
}

/// Write `points3D.txt`
pub fn write_points(path: &Path, points: &BTreeMap<u64, Point3D>) -> Result<()> {
    crate::atomic_write(path, |w| {
        writeln!(w, "# 3D point list with one line of data per point:")?;
        writeln!(
            w,
            "#   POINT3D_ID, X, Y, Z, R, G, B, ERROR, TRACK[] as (IMAGE_ID, POINT2D_IDX)"
        )?;
        writeln!(w, "# Number of points: {}", points.len())?;
        for point in points.values() {
            write!(
                w,
                "{} {} {} {} {} {} {} {}",
                point.id,
                point.xyz.x,
                point.xyz.y,
                point.xyz.z,
                point.rgb[0],
                point.rgb[1],
                point.rgb[2],
                point.error
            )?;
            for (image_id, point2d_idx) in point.image_ids.iter().zip(&point.point2d_idxs) {
                write!(w, " {} {}", image_id, point2d_idx)?;
            }
            writeln!(w)?;
        }
        Ok(())
    })
}

/// Read `cameras.txt`
pub fn read_cameras(path: &Path) -> Result<BTreeMap<u64, Camera>> {
    let reader = BufReader::new(File::open(path)?);
    let mut cameras = BTreeMap::new();
    for (idx, line) in reader.lines().enumerate() {
        let lineno = idx + 1;
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let camera = parse_camera_line(path, lineno, trimmed)?;
        if cameras.insert(camera.id, camera).is_some() {
            return Err(parse_error(path, lineno, "duplicate camera id"));
        }
    }
    Ok(cameras)
}

/// Read `images.txt`
pub fn read_images(path: &Path) -> Result<BTreeMap<u64, PosedImage>> {
    let reader = BufReader::new(File::open(path)?);
    let mut images = BTreeMap::new();
    let mut lines = reader.lines().enumerate();
    while let Some((idx, line)) = lines.next() {
        let lineno = idx + 1;
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        // The line after an image line holds its observations; it may be
        // empty but must be present.
        let (obs_idx, obs_line) = lines
            .next()
            .ok_or_else(|| parse_error(path, lineno, "missing observations line"))?;
        let obs_line = obs_line?;
        let image = parse_image_lines(path, lineno, trimmed, obs_idx + 1, obs_line.trim())?;
        if images.insert(image.id, image).is_some() {
            return Err(parse_error(path, lineno, "duplicate image id"));
        }
    }
    Ok(images)
}

/// Read `points3D.txt`
pub fn read_points(path: &Path) -> Result<BTreeMap<u64, Point3D>> {
    let reader = BufReader::new(File::open(path)?);
    let mut points = BTreeMap::new();
    for (idx, line) in reader.lines().enumerate() {
        let lineno = idx + 1;
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let point = parse_point_line(path, lineno, trimmed)?;
        if points.insert(point.id, point).is_some() {
            return Err(parse_error(path, lineno, "duplicate point id"));
        }
    }
    Ok(points)
}

fn parse_error(path: &Path, line: usize, message: impl Into<String>) -> IoError {
    IoError::Parse {
        path: path.to_path_buf(),
        line,
        message: message.into(),
    }
}

fn parse_token<T: FromStr>(path: &Path, line: usize, token: &str) -> Result<T>
where
    T::Err: Display,
{
    token
        .parse::<T>()
        .map_err(|e| parse_error(path, line, format!("invalid value '{}': {}", token, e)))
}

fn parse_camera_line(path: &Path, lineno: usize, line: &str) -> Result<Camera> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < 5 {
        return Err(parse_error(
            path,
            lineno,
            format!("expected at least 5 fields, got {}", tokens.len()),
        ));
    }
    let id: u64 = parse_token(path, lineno, tokens[0])?;
    let model = CameraModel::from_name(tokens[1])
        .ok_or_else(|| parse_error(path, lineno, format!("unknown camera model '{}'", tokens[1])))?;
    let width: u64 = parse_token(path, lineno, tokens[2])?;
    let height: u64 = parse_token(path, lineno, tokens[3])?;
    let params = tokens[4..]
        .iter()
        .map(|token| parse_token(path, lineno, token))
        .collect::<Result<Vec<f64>>>()?;
    Camera::new(id, model, width, height, params)
        .map_err(|e| parse_error(path, lineno, e.to_string()))
}

fn parse_image_lines(
    path: &Path,
    lineno: usize,
    line: &str,
    obs_lineno: usize,
    obs_line: &str,
) -> Result<PosedImage> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() != 10 {
        return Err(parse_error(
            path,
            lineno,
            format!("expected 10 fields, got {}", tokens.len()),
        ));
    }
    let id: u64 = parse_token(path, lineno, tokens[0])?;
    let mut qvec = [0.0; 4];
    for (slot, token) in qvec.iter_mut().zip(&tokens[1..5]) {
        *slot = parse_token(path, lineno, token)?;
    }
    let tvec = Vector3::new(
        parse_token(path, lineno, tokens[5])?,
        parse_token(path, lineno, tokens[6])?,
        parse_token(path, lineno, tokens[7])?,
    );
    let camera_id: u64 = parse_token(path, lineno, tokens[8])?;
    let name = tokens[9].to_string();

    let obs_tokens: Vec<&str> = obs_line.split_whitespace().collect();
    if obs_tokens.len() % 3 != 0 {
        return Err(parse_error(
            path,
            obs_lineno,
            format!(
                "observation count {} is not a multiple of 3",
                obs_tokens.len()
            ),
        ));
    }
    let mut xys = Vec::with_capacity(obs_tokens.len() / 3);
    let mut point3d_ids = Vec::with_capacity(obs_tokens.len() / 3);
    for triple in obs_tokens.chunks_exact(3) {
        xys.push(Point2::new(
            parse_token(path, obs_lineno, triple[0])?,
            parse_token(path, obs_lineno, triple[1])?,
        ));
        point3d_ids.push(parse_token(path, obs_lineno, triple[2])?);
    }

    PosedImage::new(id, qvec, tvec, camera_id, name, xys, point3d_ids)
        .map_err(|e| parse_error(path, lineno, e.to_string()))
}

fn parse_point_line(path: &Path, lineno: usize, line: &str) -> Result<Point3D> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < 8 {
        return Err(parse_error(
            path,
            lineno,
            format!("expected at least 8 fields, got {}", tokens.len()),
        ));
    }
    if (tokens.len() - 8) % 2 != 0 {
        return Err(parse_error(
            path,
            lineno,
            "track entries are not (IMAGE_ID, POINT2D_IDX) pairs",
        ));
    }
    let id: u64 = parse_token(path, lineno, tokens[0])?;
    let xyz = Point3::new(
        parse_token(path, lineno, tokens[1])?,
        parse_token(path, lineno, tokens[2])?,
        parse_token(path, lineno, tokens[3])?,
    );
    let rgb = [
        parse_token(path, lineno, tokens[4])?,
        parse_token(path, lineno, tokens[5])?,
        parse_token(path, lineno, tokens[6])?,
    ];
    let error: f64 = parse_token(path, lineno, tokens[7])?;
    let mut image_ids = Vec::with_capacity((tokens.len() - 8) / 2);
    let mut point2d_idxs = Vec::with_capacity((tokens.len() - 8) / 2);
    for pair in tokens[8..].chunks_exact(2) {
        image_ids.push(parse_token(path, lineno, pair[0])?);
        point2d_idxs.push(parse_token(path, lineno, pair[1])?);
    }
    Point3D::new(id, xyz, rgb, error, image_ids, point2d_idxs)
        .map_err(|e| parse_error(path, lineno, e.to_string()))
}
