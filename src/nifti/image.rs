//! In-memory NIfTI image as raw volume blocks.
//!
//! Voxel bytes are stored exactly as they appear on disk (F-order, file
//! endianness, original datatype). Because the volume index is the
//! slowest-varying axis, volume `i` occupies one contiguous byte block,
//! and reordering volumes is a permutation of equal-sized blocks. No
//! value conversion ever happens.

use super::header::NiftiHeader;
use crate::error::{Error, Result};

/// A loaded NIfTI image: verbatim header prefix plus raw voxel bytes.
#[derive(Debug, Clone)]
pub struct NiftiImage {
    header: NiftiHeader,
    data: Vec<u8>,
}

impl NiftiImage {
    /// Wrap a header and raw voxel bytes. The byte count must match the
    /// header's declared data size.
    pub fn new(header: NiftiHeader, data: Vec<u8>) -> Result<Self> {
        let expected = header.data_size();
        if data.len() != expected {
            return Err(Error::InvalidDimensions(format!(
                "voxel data is {} bytes but header declares {}",
                data.len(),
                expected
            )));
        }
        Ok(Self { header, data })
    }

    /// The parsed header.
    pub fn header(&self) -> &NiftiHeader {
        &self.header
    }

    /// Image shape (first `ndim` axes).
    pub fn shape(&self) -> Vec<usize> {
        self.header.shape()
    }

    /// Number of volumes along the 4th axis.
    pub fn num_volumes(&self) -> Result<usize> {
        self.header.num_volumes()
    }

    /// Raw voxel bytes in file order.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Raw bytes of volume `i`.
    pub fn volume(&self, i: usize) -> Result<&[u8]> {
        let n = self.num_volumes()?;
        if i >= n {
            return Err(Error::InvalidDimensions(format!(
                "volume index {} out of range (image has {} volumes)",
                i, n
            )));
        }
        let size = self.header.volume_size();
        Ok(&self.data[i * size..(i + 1) * size])
    }

    /// Apply a permutation along the volume axis, producing a new image.
    ///
    /// `order[k]` names the input volume that lands at output position `k`
    /// (fancy-indexing semantics). The order must be a permutation of
    /// `0..num_volumes()`: every index exactly once.
    pub fn reorder_volumes(&self, order: &[usize]) -> Result<Self> {
        let n = self.num_volumes()?;
        if order.len() != n {
            return Err(Error::ShapeMismatch(format!(
                "permutation has {} entries but image has {} volumes",
                order.len(),
                n
            )));
        }
        let mut seen = vec![false; n];
        for &idx in order {
            if idx >= n {
                return Err(Error::ShapeMismatch(format!(
                    "permutation index {} out of range (image has {} volumes)",
                    idx, n
                )));
            }
            if seen[idx] {
                return Err(Error::ShapeMismatch(format!(
                    "permutation repeats index {}",
                    idx
                )));
            }
            seen[idx] = true;
        }

        let size = self.header.volume_size();
        let mut data = Vec::with_capacity(self.data.len());
        for &idx in order {
            data.extend_from_slice(&self.data[idx * size..(idx + 1) * size]);
        }

        Ok(Self {
            header: self.header.clone(),
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nifti::header::DataType;

    /// 2x2x1 volumes of u8, volume i filled with value i.
    fn test_image(num_volumes: usize) -> NiftiImage {
        let header = NiftiHeader::new_4d([2, 2, 1, num_volumes], DataType::UInt8);
        let data: Vec<u8> = (0..num_volumes)
            .flat_map(|i| std::iter::repeat(i as u8).take(4))
            .collect();
        NiftiImage::new(header, data).unwrap()
    }

    #[test]
    fn test_volume_blocks() {
        let img = test_image(3);
        assert_eq!(img.volume(0).unwrap(), &[0, 0, 0, 0]);
        assert_eq!(img.volume(2).unwrap(), &[2, 2, 2, 2]);
        assert!(img.volume(3).is_err());
    }

    #[test]
    fn test_reorder_moves_blocks() {
        let img = test_image(4);
        let out = img.reorder_volumes(&[2, 0, 3, 1]).unwrap();
        assert_eq!(out.volume(0).unwrap(), &[2, 2, 2, 2]);
        assert_eq!(out.volume(1).unwrap(), &[0, 0, 0, 0]);
        assert_eq!(out.volume(2).unwrap(), &[3, 3, 3, 3]);
        assert_eq!(out.volume(3).unwrap(), &[1, 1, 1, 1]);
        // header untouched
        assert_eq!(out.header().prefix_bytes(), img.header().prefix_bytes());
    }

    #[test]
    fn test_reorder_rejects_non_permutations() {
        let img = test_image(3);
        assert!(img.reorder_volumes(&[0, 1]).is_err());
        assert!(img.reorder_volumes(&[0, 1, 3]).is_err());
        assert!(img.reorder_volumes(&[0, 1, 1]).is_err());
    }

    #[test]
    fn test_new_rejects_size_mismatch() {
        let header = NiftiHeader::new_4d([2, 2, 1, 2], DataType::UInt8);
        assert!(NiftiImage::new(header, vec![0u8; 7]).is_err());
    }
}
