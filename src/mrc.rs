//! Minimal MRC2014 reader: the first section of a 2D image or stack.
//!
//! Files are expected in little-endian byte order, which is what every
//! current writer in the Relion/CTFFIND ecosystem produces.

use std::fs::File;
use std::path::Path;

use bytemuck::{Pod, Zeroable};
use memmap2::Mmap;

use crate::core::MvfError;

const HEADER_SIZE: usize = 1024;

/// Leading words of the MRC header, through the extended header size.
#[derive(Clone, Copy, Pod, Zeroable)]
#[repr(C)]
struct HeaderPrefix {
    nx: i32,
    ny: i32,
    nz: i32,
    mode: i32,
    start: [i32; 3],
    sampling: [i32; 3],
    cell_lengths: [f32; 3],
    cell_angles: [f32; 3],
    axes: [i32; 3],
    dmin: f32,
    dmax: f32,
    dmean: f32,
    ispg: i32,
    nsymbt: i32,
}

const PREFIX_SIZE: usize = std::mem::size_of::<HeaderPrefix>();

/// Single-channel image, row-major, `width * height` pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<f32>,
}

impl Raster {
    pub fn new(width: u32, height: u32, pixels: Vec<f32>) -> Result<Self, MvfError> {
        if pixels.len() != width as usize * height as usize {
            return Err(MvfError::MrcError(format!(
                "{}x{} raster needs {} pixels, got {}",
                width,
                height,
                width as usize * height as usize,
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }
}

/// Reads the first section of an MRC file. The mapping is released before
/// returning, on success and on error.
pub fn read(path: &Path) -> Result<Raster, MvfError> {
    let file = File::open(path)
        .map_err(|e| MvfError::IoError(format!("opening {}: {}", path.display(), e)))?;
    // SAFETY: the file is opened read-only and the mapping is only read.
    let mmap = unsafe { Mmap::map(&file) }
        .map_err(|e| MvfError::IoError(format!("mapping {}: {}", path.display(), e)))?;
    decode(&mmap).map_err(|e| match e {
        MvfError::MrcError(msg) => MvfError::MrcError(format!("{}: {}", path.display(), msg)),
        other => other,
    })
}

fn decode(data: &[u8]) -> Result<Raster, MvfError> {
    if data.len() < HEADER_SIZE {
        return Err(MvfError::MrcError(format!(
            "file too small for header: {} bytes",
            data.len()
        )));
    }
    let header: HeaderPrefix = bytemuck::pod_read_unaligned(&data[..PREFIX_SIZE]);
    if header.nx <= 0 || header.ny <= 0 {
        return Err(MvfError::MrcError(format!(
            "invalid dimensions {}x{}",
            header.nx, header.ny
        )));
    }
    if header.nsymbt < 0 {
        return Err(MvfError::MrcError(format!(
            "invalid extended header size {}",
            header.nsymbt
        )));
    }

    let count = header.nx as usize * header.ny as usize;
    let bytes_per_pixel = match header.mode {
        0 => 1,
        1 | 6 => 2,
        2 => 4,
        mode => {
            return Err(MvfError::MrcError(format!("unsupported data mode {mode}")));
        }
    };
    let start = HEADER_SIZE + header.nsymbt as usize;
    let end = start + count * bytes_per_pixel;
    if data.len() < end {
        return Err(MvfError::MrcError(format!(
            "data block truncated: need {} bytes, file has {}",
            end,
            data.len()
        )));
    }
    let payload = &data[start..end];

    let pixels: Vec<f32> = match header.mode {
        0 => payload.iter().map(|&b| b as i8 as f32).collect(),
        1 => bytemuck::pod_collect_to_vec::<u8, i16>(payload)
            .into_iter()
            .map(f32::from)
            .collect(),
        6 => bytemuck::pod_collect_to_vec::<u8, u16>(payload)
            .into_iter()
            .map(f32::from)
            .collect(),
        _ => bytemuck::pod_collect_to_vec::<u8, f32>(payload),
    };

    Raster::new(header.nx as u32, header.ny as u32, pixels)
}

/// Encodes a float32 (mode 2) single-section MRC file.
#[cfg(any(test, feature = "testutil"))]
pub fn encode_f32(raster: &Raster) -> Vec<u8> {
    let mut header = HeaderPrefix::zeroed();
    header.nx = raster.width as i32;
    header.ny = raster.height as i32;
    header.nz = 1;
    header.mode = 2;
    header.sampling = [raster.width as i32, raster.height as i32, 1];
    header.axes = [1, 2, 3];

    let mut buf = Vec::with_capacity(HEADER_SIZE + raster.pixels.len() * 4);
    buf.extend_from_slice(bytemuck::bytes_of(&header));
    buf.resize(HEADER_SIZE, 0);
    buf[208..212].copy_from_slice(b"MAP ");
    buf[212..216].copy_from_slice(&[0x44, 0x44, 0x00, 0x00]);
    buf.extend_from_slice(bytemuck::cast_slice(&raster.pixels));
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn header_bytes(nx: i32, ny: i32, mode: i32, nsymbt: i32) -> Vec<u8> {
        let mut header = HeaderPrefix::zeroed();
        header.nx = nx;
        header.ny = ny;
        header.nz = 1;
        header.mode = mode;
        header.nsymbt = nsymbt;
        let mut buf = bytemuck::bytes_of(&header).to_vec();
        buf.resize(HEADER_SIZE + nsymbt as usize, 0);
        buf
    }

    #[test]
    fn test_read_float32_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.mrc");
        let raster = Raster::new(3, 2, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.5]).unwrap();
        std::fs::write(&path, encode_f32(&raster)).unwrap();

        assert_eq!(read(&path).unwrap(), raster);
    }

    #[test]
    fn test_decode_int16_with_extended_header() {
        let mut buf = header_bytes(2, 2, 1, 8);
        for v in [-3i16, 0, 7, 1000] {
            buf.extend_from_slice(&v.to_le_bytes());
        }
        let raster = decode(&buf).unwrap();
        assert_eq!(raster.pixels, vec![-3.0, 0.0, 7.0, 1000.0]);
    }

    #[test]
    fn test_decode_uint16() {
        let mut buf = header_bytes(2, 1, 6, 0);
        for v in [65535u16, 1] {
            buf.extend_from_slice(&v.to_le_bytes());
        }
        assert_eq!(decode(&buf).unwrap().pixels, vec![65535.0, 1.0]);
    }

    #[test]
    fn test_decode_reads_first_section_of_stack() {
        let mut header = HeaderPrefix::zeroed();
        header.nx = 1;
        header.ny = 1;
        header.nz = 2;
        header.mode = 0;
        let mut buf = bytemuck::bytes_of(&header).to_vec();
        buf.resize(HEADER_SIZE, 0);
        buf.extend_from_slice(&[0xFF, 0x05]);
        assert_eq!(decode(&buf).unwrap().pixels, vec![-1.0]);
    }

    #[test]
    fn test_decode_truncated_data() {
        let buf = header_bytes(4, 4, 2, 0);
        let err = decode(&buf).unwrap_err();
        assert!(matches!(err, MvfError::MrcError(msg) if msg.contains("truncated")));
    }

    #[test]
    fn test_decode_unsupported_mode() {
        let buf = header_bytes(1, 1, 12, 0);
        assert!(matches!(decode(&buf), Err(MvfError::MrcError(_))));
    }

    #[test]
    fn test_read_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = read(&dir.path().join("missing.mrc")).unwrap_err();
        assert!(matches!(err, MvfError::IoError(_)));
    }
}
