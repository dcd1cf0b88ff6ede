//! NIfTI file reading and writing.
//!
//! Uncompressed `.nii` files are read through a memory map; `.nii.gz`
//! files are decompressed in one shot with libdeflate, sized from the
//! gzip ISIZE trailer, with a streaming flate2 fallback for multi-member
//! streams. Writing mirrors the read path: the original header prefix is
//! emitted verbatim, followed by the raw voxel bytes.

use super::header::NiftiHeader;
use super::image::NiftiImage;
use crate::error::{Error, Result};
use byteorder::{ByteOrder, LittleEndian};
use flate2::bufread::MultiGzDecoder;
use memmap2::Mmap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

const GZIP_BUFFER_SIZE: usize = 256 * 1024;

/// Load a NIfTI image from file.
///
/// Supports `.nii` and `.nii.gz` with automatic detection from the
/// extension. A missing or unreadable path maps to [`Error::NotFound`].
pub fn load<P: AsRef<Path>>(path: P) -> Result<NiftiImage> {
    let path = path.as_ref();
    let is_gzipped = path.extension().is_some_and(|e| e == "gz");

    if is_gzipped {
        load_gzipped(path)
    } else {
        load_uncompressed(path)
    }
}

fn open_input(path: &Path) -> Result<File> {
    File::open(path).map_err(|source| Error::NotFound {
        path: path.to_path_buf(),
        source,
    })
}

/// Load an uncompressed .nii file via memory mapping.
#[allow(unsafe_code)]
fn load_uncompressed(path: &Path) -> Result<NiftiImage> {
    let file = open_input(path)?;
    // SAFETY: the map is read-only and dropped before this function
    // returns; external modification could yield stale data but no UB.
    let mmap = unsafe { Mmap::map(&file)? };

    image_from_bytes(&mmap, path)
}

/// Load a gzipped .nii.gz file.
///
/// The uncompressed size is taken from the gzip ISIZE trailer so the
/// output buffer can be allocated once and filled by libdeflate. If the
/// trailer lies (multi-member stream, payload over 4 GiB) we fall back to
/// streaming decompression.
fn load_gzipped(path: &Path) -> Result<NiftiImage> {
    let mut compressed = Vec::new();
    let file = open_input(path)?;
    BufReader::with_capacity(GZIP_BUFFER_SIZE, file).read_to_end(&mut compressed)?;

    if compressed.len() < 18 {
        return Err(Error::Decompression(format!(
            "gzip stream too short: {} bytes",
            compressed.len()
        )));
    }

    let isize_hint = LittleEndian::read_u32(&compressed[compressed.len() - 4..]) as usize;
    let decompressed = match decompress_single_shot(&compressed, isize_hint) {
        Ok(bytes) => bytes,
        Err(_) => decompress_streaming(&compressed)?,
    };

    image_from_bytes(&decompressed, path)
}

fn decompress_single_shot(compressed: &[u8], expected_size: usize) -> Result<Vec<u8>> {
    let mut decompressor = libdeflater::Decompressor::new();
    let mut output = vec![0u8; expected_size];
    let written = decompressor
        .gzip_decompress(compressed, &mut output)
        .map_err(|e| Error::Decompression(format!("{:?}", e)))?;
    if written != expected_size {
        return Err(Error::Decompression(format!(
            "decompressed {} bytes but trailer declared {}",
            written, expected_size
        )));
    }
    Ok(output)
}

fn decompress_streaming(compressed: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = MultiGzDecoder::new(BufReader::with_capacity(GZIP_BUFFER_SIZE, compressed));
    let mut output = Vec::new();
    decoder
        .read_to_end(&mut output)
        .map_err(|e| Error::Decompression(e.to_string()))?;
    Ok(output)
}

fn image_from_bytes(bytes: &[u8], path: &Path) -> Result<NiftiImage> {
    let header = NiftiHeader::from_bytes(bytes)?;
    let offset = header.vox_offset;
    let data_size = header.data_size();

    if bytes.len() < offset + data_size {
        return Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            format!(
                "{}: file truncated ({} bytes, expected {})",
                path.display(),
                bytes.len(),
                offset + data_size
            ),
        )));
    }

    let data = bytes[offset..offset + data_size].to_vec();
    NiftiImage::new(header, data)
}

/// Save a NIfTI image to file.
///
/// Format is determined by file extension (`.nii` or `.nii.gz`). An
/// existing file at the path is overwritten.
pub fn save<P: AsRef<Path>>(image: &NiftiImage, path: P) -> Result<()> {
    let path = path.as_ref();
    let is_gzipped = path.extension().is_some_and(|e| e == "gz");

    if is_gzipped {
        save_gzipped(image, path)
    } else {
        save_uncompressed(image, path)
    }
}

fn save_uncompressed(image: &NiftiImage, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::with_capacity(1024 * 1024, file);

    writer.write_all(image.header().prefix_bytes())?;
    writer.write_all(image.data())?;
    writer.flush()?;

    Ok(())
}

fn save_gzipped(image: &NiftiImage, path: &Path) -> Result<()> {
    let prefix = image.header().prefix_bytes();
    let data = image.data();

    let mut uncompressed = Vec::with_capacity(prefix.len() + data.len());
    uncompressed.extend_from_slice(prefix);
    uncompressed.extend_from_slice(data);

    // Level 1: DWI series recompress fast and the pipeline rereads them anyway
    let mut compressor = libdeflater::Compressor::new(libdeflater::CompressionLvl::fastest());
    let max_compressed_size = compressor.gzip_compress_bound(uncompressed.len());
    let mut compressed = vec![0u8; max_compressed_size];

    let actual_size = compressor
        .gzip_compress(&uncompressed, &mut compressed)
        .map_err(|e| Error::Io(std::io::Error::other(format!("compression failed: {e:?}"))))?;
    compressed.truncate(actual_size);

    let mut file = File::create(path)?;
    file.write_all(&compressed)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nifti::header::DataType;
    use tempfile::tempdir;

    fn test_image() -> NiftiImage {
        let header = NiftiHeader::new_4d([3, 2, 2, 4], DataType::Float32);
        let voxels = 3 * 2 * 2 * 4;
        let mut data = Vec::with_capacity(voxels * 4);
        for i in 0..voxels {
            data.extend_from_slice(&(i as f32).to_le_bytes());
        }
        NiftiImage::new(header, data).unwrap()
    }

    #[test]
    fn test_roundtrip_uncompressed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.nii");

        let img = test_image();
        save(&img, &path).unwrap();
        let loaded = load(&path).unwrap();

        assert_eq!(loaded.shape(), vec![3, 2, 2, 4]);
        assert_eq!(loaded.data(), img.data());
        assert_eq!(loaded.header().prefix_bytes(), img.header().prefix_bytes());
    }

    #[test]
    fn test_roundtrip_gzipped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.nii.gz");

        let img = test_image();
        save(&img, &path).unwrap();
        let loaded = load(&path).unwrap();

        assert_eq!(loaded.shape(), vec![3, 2, 2, 4]);
        assert_eq!(loaded.data(), img.data());
    }

    #[test]
    fn test_gzipped_multi_member_fallback() {
        // A concatenated two-member gzip stream defeats the ISIZE trailer
        // hint and must go through the streaming path.
        use flate2::write::GzEncoder;
        use flate2::Compression;

        let dir = tempdir().unwrap();
        let path = dir.path().join("test.nii.gz");

        let img = test_image();
        let mut uncompressed = img.header().prefix_bytes().to_vec();
        uncompressed.extend_from_slice(img.data());
        // Uneven split so the trailer of the last member cannot match the
        // total size and the one-shot path bails out.
        let split = 100;

        let mut bytes = Vec::new();
        for chunk in [&uncompressed[..split], &uncompressed[split..]] {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
            encoder.write_all(chunk).unwrap();
            bytes.extend_from_slice(&encoder.finish().unwrap());
        }
        std::fs::write(&path, bytes).unwrap();

        let loaded = load(&path).unwrap();
        assert_eq!(loaded.data(), img.data());
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let err = load("/nonexistent/volume.nii").unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
        assert!(err.to_string().contains("/nonexistent/volume.nii"));
    }

    #[test]
    fn test_truncated_file_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.nii");

        let img = test_image();
        save(&img, &path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();

        let err = load(&path).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("truncated") || msg.contains("shorter"));
    }
}
