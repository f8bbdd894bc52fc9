//! Binary encoding of the sparse model
//!
//! Fixed little-endian layout. Each file starts with a u64 record count.
//! All ids are stored as 64-bit integers and the camera model code as an
//! i32; these widths are part of the format contract. Image names are
//! length-prefixed UTF-8 (u64 length, no terminator). Absent 3D point
//! references use the i64 sentinel -1.

use crate::error::{IoError, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use sfmkit_core::{Camera, CameraModel, Point2, Point3, PosedImage, Point3D, Vector3};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;

/// Write `cameras.bin`
pub fn write_cameras(path: &Path, cameras: &BTreeMap<u64, Camera>) -> Result<()> {
    crate::atomic_write(path, |w| {
        w.write_u64::<LittleEndian>(cameras.len() as u64)?;
        for camera in cameras.values() {
            w.write_u64::<LittleEndian>(camera.id)?;
            w.write_i32::<LittleEndian>(camera.model.code())?;
            w.write_u64::<LittleEndian>(camera.width)?;
            w.write_u64::<LittleEndian>(camera.height)?;
            for param in &camera.params {
                w.write_f64::<LittleEndian>(*param)?;
            }
        }
        Ok(())
    })
}

/// Write `images.bin`
pub fn write_images(path: &Path, images: &BTreeMap<u64, PosedImage>) -> Result<()> {
    crate::atomic_write(path, |w| {
        w.write_u64::<LittleEndian>(images.len() as u64)?;
        for image in images.values() {
            w.write_u64::<LittleEndian>(image.id)?;
            for component in image.qvec {
                w.write_f64::<LittleEndian>(component)?;
            }
            for component in image.tvec.iter() {
                w.write_f64::<LittleEndian>(*component)?;
            }
            w.write_u64::<LittleEndian>(image.camera_id)?;
            w.write_u64::<LittleEndian>(image.name.len() as u64)?;
            w.write_all(image.name.as_bytes())?;
            w.write_u64::<LittleEndian>(image.xys.len() as u64)?;
            for (xy, point3d_id) in image.xys.iter().zip(&image.point3d_ids) {
                w.write_f64::<LittleEndian>(xy.x)?;
                w.write_f64::<LittleEndian>(xy.y)?;
                w.write_i64::<LittleEndian>(*point3d_id)?;
            }
        }
        Ok(())
    })
}

/// Write `points3D.bin`
pub fn write_points(path: &Path, points: &BTreeMap<u64, Point3D>) -> Result<()> {
    crate::atomic_write(path, |w| {
        w.write_u64::<LittleEndian>(points.len() as u64)?;
        for point in points.values() {
            w.write_u64::<LittleEndian>(point.id)?;
            for component in point.xyz.iter() {
                w.write_f64::<LittleEndian>(*component)?;
            }
            w.write_all(&point.rgb)?;
            w.write_f64::<LittleEndian>(point.error)?;
            w.write_u64::<LittleEndian>(point.image_ids.len() as u64)?;
            for (image_id, point2d_idx) in point.image_ids.iter().zip(&point.point2d_idxs) {
                w.write_u64::<LittleEndian>(*image_id)?;
                w.write_i64::<LittleEndian>(i64::from(*point2d_idx))?;
            }
        }
        Ok(())
    })
}

/// Read `cameras.bin`
pub fn read_cameras(path: &Path) -> Result<BTreeMap<u64, Camera>> {
    let mut r = Tracked::new(BufReader::new(File::open(path)?));
    let count = next_u64(&mut r, path)?;
    let mut cameras = BTreeMap::new();
    for _ in 0..count {
        let record_at = r.offset();
        let id = next_u64(&mut r, path)?;
        let code = next_i32(&mut r, path)?;
        let model = CameraModel::from_code(code).ok_or_else(|| {
            format_error(path, record_at, format!("unknown camera model code {}", code))
        })?;
        let width = next_u64(&mut r, path)?;
        let height = next_u64(&mut r, path)?;
        let mut params = Vec::with_capacity(model.param_count());
        for _ in 0..model.param_count() {
            params.push(next_f64(&mut r, path)?);
        }
        let camera = Camera::new(id, model, width, height, params)
            .map_err(|e| format_error(path, record_at, e.to_string()))?;
        if cameras.insert(id, camera).is_some() {
            return Err(format_error(path, record_at, "duplicate camera id"));
        }
    }
    expect_eof(&mut r, path, count)?;
    Ok(cameras)
}

/// Read `images.bin`
pub fn read_images(path: &Path) -> Result<BTreeMap<u64, PosedImage>> {
    let mut r = Tracked::new(BufReader::new(File::open(path)?));
    let count = next_u64(&mut r, path)?;
    let mut images = BTreeMap::new();
    for _ in 0..count {
        let record_at = r.offset();
        let id = next_u64(&mut r, path)?;
        let mut qvec = [0.0; 4];
        for slot in &mut qvec {
            *slot = next_f64(&mut r, path)?;
        }
        let tvec = Vector3::new(
            next_f64(&mut r, path)?,
            next_f64(&mut r, path)?,
            next_f64(&mut r, path)?,
        );
        let camera_id = next_u64(&mut r, path)?;
        let name_len = next_u64(&mut r, path)?;
        let name_at = r.offset();
        let name_bytes = next_bytes(&mut r, path, name_len as usize)?;
        let name = String::from_utf8(name_bytes)
            .map_err(|_| format_error(path, name_at, "image name is not valid UTF-8"))?;
        let n_obs = next_u64(&mut r, path)?;
        let mut xys = Vec::with_capacity(n_obs as usize);
        let mut point3d_ids = Vec::with_capacity(n_obs as usize);
        for _ in 0..n_obs {
            xys.push(Point2::new(next_f64(&mut r, path)?, next_f64(&mut r, path)?));
            point3d_ids.push(next_i64(&mut r, path)?);
        }
        let image = PosedImage::new(id, qvec, tvec, camera_id, name, xys, point3d_ids)
            .map_err(|e| format_error(path, record_at, e.to_string()))?;
        if images.insert(id, image).is_some() {
            return Err(format_error(path, record_at, "duplicate image id"));
        }
    }
    expect_eof(&mut r, path, count)?;
    Ok(images)
}

/// Read `points3D.bin`
pub fn read_points(path: &Path) -> Result<BTreeMap<u64, Point3D>> {
    let mut r = Tracked::new(BufReader::new(File::open(path)?));
    let count = next_u64(&mut r, path)?;
    let mut points = BTreeMap::new();
    for _ in 0..count {
        let record_at = r.offset();
        let id = next_u64(&mut r, path)?;
        let xyz = Point3::new(
            next_f64(&mut r, path)?,
            next_f64(&mut r, path)?,
            next_f64(&mut r, path)?,
        );
        let mut rgb = [0u8; 3];
        for slot in &mut rgb {
            *slot = next_u8(&mut r, path)?;
        }
        let error = next_f64(&mut r, path)?;
        let track_len = next_u64(&mut r, path)?;
        let mut image_ids = Vec::with_capacity(track_len as usize);
        let mut point2d_idxs = Vec::with_capacity(track_len as usize);
        for _ in 0..track_len {
            image_ids.push(next_u64(&mut r, path)?);
            let idx_at = r.offset();
            let idx = next_i64(&mut r, path)?;
            let idx = u32::try_from(idx).map_err(|_| {
                format_error(path, idx_at, format!("point2D index {} out of range", idx))
            })?;
            point2d_idxs.push(idx);
        }
        let point = Point3D::new(id, xyz, rgb, error, image_ids, point2d_idxs)
            .map_err(|e| format_error(path, record_at, e.to_string()))?;
        if points.insert(id, point).is_some() {
            return Err(format_error(path, record_at, "duplicate point id"));
        }
    }
    expect_eof(&mut r, path, count)?;
    Ok(points)
}

/// Reader wrapper that tracks the byte offset for error reporting
struct Tracked<R> {
    inner: R,
    offset: u64,
}

impl<R: Read> Tracked<R> {
    fn new(inner: R) -> Self {
        Self { inner, offset: 0 }
    }

    fn offset(&self) -> u64 {
        self.offset
    }
}

impl<R: Read> Read for Tracked<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.offset += n as u64;
        Ok(n)
    }
}

fn format_error(path: &Path, offset: u64, message: impl Into<String>) -> IoError {
    IoError::Format {
        path: path.to_path_buf(),
        offset,
        message: message.into(),
    }
}

fn read_failure(path: &Path, offset: u64, e: std::io::Error) -> IoError {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        format_error(path, offset, "unexpected end of file")
    } else {
        IoError::Io(e)
    }
}

fn next_u8<R: Read>(r: &mut Tracked<R>, path: &Path) -> Result<u8> {
    let at = r.offset();
    r.read_u8().map_err(|e| read_failure(path, at, e))
}

fn next_i32<R: Read>(r: &mut Tracked<R>, path: &Path) -> Result<i32> {
    let at = r.offset();
    r.read_i32::<LittleEndian>()
        .map_err(|e| read_failure(path, at, e))
}

fn next_u64<R: Read>(r: &mut Tracked<R>, path: &Path) -> Result<u64> {
    let at = r.offset();
    r.read_u64::<LittleEndian>()
        .map_err(|e| read_failure(path, at, e))
}

fn next_i64<R: Read>(r: &mut Tracked<R>, path: &Path) -> Result<i64> {
    let at = r.offset();
    r.read_i64::<LittleEndian>()
        .map_err(|e| read_failure(path, at, e))
}

fn next_f64<R: Read>(r: &mut Tracked<R>, path: &Path) -> Result<f64> {
    let at = r.offset();
    r.read_f64::<LittleEndian>()
        .map_err(|e| read_failure(path, at, e))
}

fn next_bytes<R: Read>(r: &mut Tracked<R>, path: &Path, len: usize) -> Result<Vec<u8>> {
    let at = r.offset();
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)
        .map_err(|e| read_failure(path, at, e))?;
    Ok(buf)
}

fn expect_eof<R: Read>(r: &mut Tracked<R>, path: &Path, count: u64) -> Result<()> {
    let at = r.offset();
    let mut probe = [0u8; 1];
    match r.read(&mut probe) {
        Ok(0) => Ok(()),
        Ok(_) => Err(format_error(
            path,
            at,
            format!("trailing data after {} records", count),
        )),
        Err(e) => Err(IoError::Io(e)),
    }
}
