//! Sparse-model serialization for sfmkit
//!
//! This crate reads and writes the three collections of a sparse
//! reconstruction (cameras, images, 3D points) in two on-disk encodings, a
//! human-readable text triple (`cameras.txt`, `images.txt`, `points3D.txt`)
//! and a compact binary triple (`.bin`), inside a caller-supplied directory.
//! Re-reading a written directory yields collections equal in every field to
//! the originals, for both encodings.

pub mod binary;
pub mod error;
pub mod text;

pub use error::{IoError, Result};

use log::info;
use sfmkit_core::{Camera, Point3D, PosedImage, NO_POINT3D};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Cameras keyed by id
pub type CameraMap = BTreeMap<u64, Camera>;
/// Posed images keyed by id
pub type ImageMap = BTreeMap<u64, PosedImage>;
/// 3D points keyed by id
pub type PointMap = BTreeMap<u64, Point3D>;

/// On-disk encoding of the sparse model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SparseFormat {
    Text,
    Binary,
}

impl SparseFormat {
    /// File extension used by the encoding
    pub fn extension(&self) -> &'static str {
        match self {
            SparseFormat::Text => "txt",
            SparseFormat::Binary => "bin",
        }
    }
}

fn model_file(dir: &Path, stem: &str, format: SparseFormat) -> PathBuf {
    dir.join(format!("{}.{}", stem, format.extension()))
}

/// Write the three model files into `dir`, creating it if needed
///
/// Referential integrity is validated before any file or directory is
/// created; a validation failure leaves the file system untouched. Each
/// file is written to a temporary sibling and renamed into place.
pub fn write_model(
    cameras: &CameraMap,
    images: &ImageMap,
    points: &PointMap,
    dir: &Path,
    format: SparseFormat,
) -> Result<()> {
    validate_model(cameras, images, points)?;
    fs::create_dir_all(dir)?;
    match format {
        SparseFormat::Text => {
            text::write_cameras(&model_file(dir, "cameras", format), cameras)?;
            text::write_images(&model_file(dir, "images", format), images)?;
            text::write_points(&model_file(dir, "points3D", format), points)?;
        }
        SparseFormat::Binary => {
            binary::write_cameras(&model_file(dir, "cameras", format), cameras)?;
            binary::write_images(&model_file(dir, "images", format), images)?;
            binary::write_points(&model_file(dir, "points3D", format), points)?;
        }
    }
    info!(
        "wrote sparse model ({} cameras, {} images, {} points) to {}",
        cameras.len(),
        images.len(),
        points.len(),
        dir.display()
    );
    Ok(())
}

/// Read the three model files from `dir`
pub fn read_model(dir: &Path, format: SparseFormat) -> Result<(CameraMap, ImageMap, PointMap)> {
    let (cameras, images, points) = match format {
        SparseFormat::Text => (
            text::read_cameras(&model_file(dir, "cameras", format))?,
            text::read_images(&model_file(dir, "images", format))?,
            text::read_points(&model_file(dir, "points3D", format))?,
        ),
        SparseFormat::Binary => (
            binary::read_cameras(&model_file(dir, "cameras", format))?,
            binary::read_images(&model_file(dir, "images", format))?,
            binary::read_points(&model_file(dir, "points3D", format))?,
        ),
    };
    info!(
        "read sparse model ({} cameras, {} images, {} points) from {}",
        cameras.len(),
        images.len(),
        points.len(),
        dir.display()
    );
    Ok((cameras, images, points))
}

/// Detect the encoding in `dir` and read the model
///
/// Probes for `cameras.bin` first, then `cameras.txt`.
pub fn read_model_auto(dir: &Path) -> Result<(CameraMap, ImageMap, PointMap)> {
    for format in [SparseFormat::Binary, SparseFormat::Text] {
        if model_file(dir, "cameras", format).exists() {
            info!(
                "located sparse model ({}) in {}",
                format.extension(),
                dir.display()
            );
            return read_model(dir, format);
        }
    }
    Err(IoError::Io(std::io::Error::new(
        std::io::ErrorKind::NotFound,
        format!("no sparse model found in {}", dir.display()),
    )))
}

/// Directory holding the sparse model files inside a dataset root
pub fn sparse_model_dir(root: &Path) -> PathBuf {
    root.join("sparse").join("0")
}

/// Directory holding the rendered images inside a dataset root
pub fn images_dir(root: &Path) -> PathBuf {
    root.join("images")
}

/// Write a dataset skeleton under `root`
///
/// Writes the sparse model into `root/sparse/0` and creates `root/images`
/// for the rendering side to fill.
pub fn write_dataset(
    cameras: &CameraMap,
    images: &ImageMap,
    points: &PointMap,
    root: &Path,
    format: SparseFormat,
) -> Result<()> {
    write_model(cameras, images, points, &sparse_model_dir(root), format)?;
    fs::create_dir_all(images_dir(root))?;
    Ok(())
}

/// Check cross-collection references
///
/// Every image must reference a known camera; every non-sentinel
/// observation must reference a known point; every track entry must
/// reference a known image and a valid observation index within it.
/// Parallel observation and track sequences must have matching lengths.
pub fn validate_model(cameras: &CameraMap, images: &ImageMap, points: &PointMap) -> Result<()> {
    for image in images.values() {
        if image.xys.len() != image.point3d_ids.len() {
            return Err(referential_error(format!(
                "image {} has {} observations but {} point ids",
                image.id,
                image.xys.len(),
                image.point3d_ids.len()
            )));
        }
        if !cameras.contains_key(&image.camera_id) {
            return Err(referential_error(format!(
                "image {} references unknown camera {}",
                image.id, image.camera_id
            )));
        }
        for point3d_id in &image.point3d_ids {
            if *point3d_id == NO_POINT3D {
                continue;
            }
            let known = u64::try_from(*point3d_id)
                .map(|id| points.contains_key(&id))
                .unwrap_or(false);
            if !known {
                return Err(referential_error(format!(
                    "image {} references unknown point {}",
                    image.id, point3d_id
                )));
            }
        }
    }
    for point in points.values() {
        if point.image_ids.len() != point.point2d_idxs.len() {
            return Err(referential_error(format!(
                "point {} has {} track image ids but {} 2D indices",
                point.id,
                point.image_ids.len(),
                point.point2d_idxs.len()
            )));
        }
        for (image_id, point2d_idx) in point.image_ids.iter().zip(&point.point2d_idxs) {
            match images.get(image_id) {
                None => {
                    return Err(referential_error(format!(
                        "point {} track references unknown image {}",
                        point.id, image_id
                    )));
                }
                Some(image) if *point2d_idx as usize >= image.xys.len() => {
                    return Err(referential_error(format!(
                        "point {} track references observation {} of image {}, which has {}",
                        point.id,
                        point2d_idx,
                        image_id,
                        image.xys.len()
                    )));
                }
                Some(_) => {}
            }
        }
    }
    Ok(())
}

fn referential_error(message: String) -> IoError {
    IoError::Referential { message }
}

/// Write a file through a temporary sibling, renaming into place on success
///
/// The temporary file is removed on any failure, so a partial write never
/// occupies the target path.
pub(crate) fn atomic_write<F>(path: &Path, write_fn: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let mut writer = BufWriter::new(File::create(&tmp)?);
    let result = write_fn(&mut writer).and_then(|()| writer.flush().map_err(IoError::from));
    drop(writer);

    match result {
        Ok(()) => {
            fs::rename(&tmp, path)?;
            Ok(())
        }
        Err(e) => {
            let _ = fs::remove_file(&tmp);
            Err(e)
        }
    }
}
