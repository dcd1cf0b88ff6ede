//! `NIfTI`-1 header parsing and representation.
//!
//! Only the fields needed to locate and slice the voxel data are parsed
//! (dimensions, datatype, data offset, endianness). The header bytes
//! themselves, together with any extension bytes before `vox_offset`, are
//! carried verbatim so that writing an image back preserves the spatial
//! frame and all metadata exactly.

use crate::error::{Error, Result};
use byteorder::{BigEndian, ByteOrder, LittleEndian};

/// NIfTI-1 header field byte offsets.
mod offsets {
    pub const SIZEOF_HDR: usize = 0;
    pub const DIM: usize = 40;
    pub const DATATYPE: usize = 70;
    pub const BITPIX: usize = 72;
    pub const PIXDIM: usize = 76;
    pub const VOX_OFFSET: usize = 108;
    pub const SCL_SLOPE: usize = 112;
    pub const XYZT_UNITS: usize = 123;
    pub const SFORM_CODE: usize = 254;
    pub const SROW_X: usize = 280;
    pub const SROW_Y: usize = 296;
    pub const SROW_Z: usize = 312;
    pub const MAGIC: usize = 344;
}

/// `NIfTI` data type codes.
///
/// Voxel data is never converted by this crate; the datatype is used only
/// to compute element sizes and for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i16)]
pub enum DataType {
    /// Unsigned 8-bit integer
    UInt8 = 2,
    /// Signed 16-bit integer
    Int16 = 4,
    /// Signed 32-bit integer
    Int32 = 8,
    /// 32-bit floating point
    Float32 = 16,
    /// 64-bit floating point
    Float64 = 64,
    /// Signed 8-bit integer
    Int8 = 256,
    /// Unsigned 16-bit integer
    UInt16 = 512,
    /// Unsigned 32-bit integer
    UInt32 = 768,
    /// Signed 64-bit integer
    Int64 = 1024,
    /// Unsigned 64-bit integer
    UInt64 = 1280,
}

impl DataType {
    /// Parse from `NIfTI` datatype code.
    pub fn from_code(code: i16) -> Result<Self> {
        match code {
            2 => Ok(Self::UInt8),
            4 => Ok(Self::Int16),
            8 => Ok(Self::Int32),
            16 => Ok(Self::Float32),
            64 => Ok(Self::Float64),
            256 => Ok(Self::Int8),
            512 => Ok(Self::UInt16),
            768 => Ok(Self::UInt32),
            1024 => Ok(Self::Int64),
            1280 => Ok(Self::UInt64),
            _ => Err(Error::UnsupportedDataType(code)),
        }
    }

    /// Size of each element in bytes.
    pub const fn byte_size(self) -> usize {
        match self {
            Self::UInt8 | Self::Int8 => 1,
            Self::Int16 | Self::UInt16 => 2,
            Self::Int32 | Self::UInt32 | Self::Float32 => 4,
            Self::Int64 | Self::UInt64 | Self::Float64 => 8,
        }
    }

    /// Get the Rust type name for diagnostics.
    pub const fn type_name(self) -> &'static str {
        match self {
            Self::UInt8 => "u8",
            Self::Int8 => "i8",
            Self::Int16 => "i16",
            Self::UInt16 => "u16",
            Self::Int32 => "i32",
            Self::UInt32 => "u32",
            Self::Int64 => "i64",
            Self::UInt64 => "u64",
            Self::Float32 => "f32",
            Self::Float64 => "f64",
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

/// Parsed NIfTI-1 header plus the verbatim on-disk prefix.
///
/// `raw` holds every byte from the start of the file up to `vox_offset`
/// (header, extension flag, and any extensions). Serialization writes it
/// back untouched.
#[derive(Debug, Clone)]
pub struct NiftiHeader {
    /// Bytes `0..vox_offset` of the source file, unmodified.
    raw: Vec<u8>,
    /// Number of dimensions (1-7).
    pub ndim: u8,
    /// Size along each dimension; unused trailing entries are 1.
    pub dim: [usize; 7],
    /// Data type.
    pub datatype: DataType,
    /// Voxel data offset in file.
    pub vox_offset: usize,
    /// File endianness (true = little endian).
    pub(crate) little_endian: bool,
}

impl NiftiHeader {
    /// Size of a NIfTI-1 header in bytes.
    pub const SIZE: usize = 348;

    /// Default data offset (header + 4-byte extension flag).
    pub const DEFAULT_VOX_OFFSET: usize = 352;

    /// Read a header from the leading bytes of a file, with endianness
    /// detection. `bytes` must cover at least `0..vox_offset`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::SIZE {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!(
                    "header too short: got {} bytes, need {}",
                    bytes.len(),
                    Self::SIZE
                ),
            )));
        }

        // sizeof_hdr doubles as the version/endianness marker
        let sizeof_le = LittleEndian::read_i32(&bytes[offsets::SIZEOF_HDR..4]);
        let sizeof_be = BigEndian::read_i32(&bytes[offsets::SIZEOF_HDR..4]);

        if sizeof_le == 540 || sizeof_be == 540 {
            return Err(Error::InvalidFileFormat(
                "NIfTI-2 files are not supported".to_string(),
            ));
        }

        if sizeof_le == 348 {
            Self::parse::<LittleEndian>(bytes, true)
        } else if sizeof_be == 348 {
            Self::parse::<BigEndian>(bytes, false)
        } else {
            Err(Error::InvalidMagic([
                bytes[0], bytes[1], bytes[2], bytes[3],
            ]))
        }
    }

    #[allow(clippy::wildcard_imports)]
    fn parse<E: ByteOrder>(bytes: &[u8], little_endian: bool) -> Result<Self> {
        use offsets::*;

        let magic = &bytes[MAGIC..MAGIC + 4];
        if magic == b"ni1\0" {
            // Detached .hdr/.img pairs keep voxel data in a second file
            return Err(Error::InvalidFileFormat(
                "detached .hdr/.img pairs are not supported; use a single .nii".to_string(),
            ));
        }
        if magic != b"n+1\0" {
            return Err(Error::InvalidMagic([
                magic[0], magic[1], magic[2], magic[3],
            ]));
        }

        let ndim_raw = E::read_i16(&bytes[DIM..DIM + 2]);
        if !(1..=7).contains(&ndim_raw) {
            return Err(Error::InvalidDimensions(format!(
                "ndim must be 1..=7, got {}",
                ndim_raw
            )));
        }
        let ndim = ndim_raw as u8;

        let mut dim = [1usize; 7];
        for (i, dim_val) in dim.iter_mut().enumerate().take(ndim as usize) {
            let offset = DIM + 2 + i * 2;
            let raw = E::read_i16(&bytes[offset..offset + 2]);
            if raw < 1 {
                return Err(Error::InvalidDimensions(format!(
                    "dimension {} has non-positive value: {}",
                    i, raw
                )));
            }
            *dim_val = raw as usize;
        }

        let datatype = DataType::from_code(E::read_i16(&bytes[DATATYPE..DATATYPE + 2]))?;
        let bitpix = E::read_i16(&bytes[BITPIX..BITPIX + 2]);
        let expected_bitpix = (datatype.byte_size() * 8) as i16;
        if bitpix != expected_bitpix {
            return Err(Error::InvalidDimensions(format!(
                "bitpix {} does not match datatype {} (expected {})",
                bitpix,
                datatype.type_name(),
                expected_bitpix
            )));
        }

        let vox_offset_raw = E::read_f32(&bytes[VOX_OFFSET..VOX_OFFSET + 4]);
        if !vox_offset_raw.is_finite() || vox_offset_raw.fract() != 0.0 || vox_offset_raw < 0.0 {
            return Err(Error::InvalidDimensions(format!(
                "vox_offset must be a non-negative integer, got {}",
                vox_offset_raw
            )));
        }
        let vox_offset = vox_offset_raw as usize;
        if vox_offset < Self::SIZE {
            return Err(Error::InvalidDimensions(format!(
                "vox_offset {} before header end ({})",
                vox_offset,
                Self::SIZE
            )));
        }
        if bytes.len() < vox_offset {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!(
                    "file shorter ({} bytes) than vox_offset {}",
                    bytes.len(),
                    vox_offset
                ),
            )));
        }

        let header = Self {
            raw: bytes[..vox_offset].to_vec(),
            ndim,
            dim,
            datatype,
            vox_offset,
            little_endian,
        };
        header.validate()?;
        Ok(header)
    }

    /// Build a fresh little-endian 4D header with unit spacing and an
    /// identity sform. Used by tests and by callers constructing images
    /// in memory.
    #[allow(clippy::wildcard_imports)]
    pub fn new_4d(shape: [usize; 4], datatype: DataType) -> Self {
        use offsets::*;

        let mut raw = vec![0u8; Self::DEFAULT_VOX_OFFSET];
        LittleEndian::write_i32(&mut raw[SIZEOF_HDR..SIZEOF_HDR + 4], Self::SIZE as i32);

        LittleEndian::write_i16(&mut raw[DIM..DIM + 2], 4);
        for (i, &d) in shape.iter().enumerate() {
            let offset = DIM + 2 + i * 2;
            LittleEndian::write_i16(&mut raw[offset..offset + 2], d as i16);
        }
        for i in shape.len()..7 {
            let offset = DIM + 2 + i * 2;
            LittleEndian::write_i16(&mut raw[offset..offset + 2], 1);
        }

        LittleEndian::write_i16(&mut raw[DATATYPE..DATATYPE + 2], datatype as i16);
        LittleEndian::write_i16(
            &mut raw[BITPIX..BITPIX + 2],
            (datatype.byte_size() * 8) as i16,
        );

        // qfac plus unit spacing on every axis
        for i in 0..8 {
            let offset = PIXDIM + i * 4;
            LittleEndian::write_f32(&mut raw[offset..offset + 4], 1.0);
        }

        LittleEndian::write_f32(
            &mut raw[VOX_OFFSET..VOX_OFFSET + 4],
            Self::DEFAULT_VOX_OFFSET as f32,
        );
        LittleEndian::write_f32(&mut raw[SCL_SLOPE..SCL_SLOPE + 4], 1.0);

        // millimeters, no temporal units
        raw[XYZT_UNITS] = 2;

        // identity sform
        LittleEndian::write_i16(&mut raw[SFORM_CODE..SFORM_CODE + 2], 1);
        LittleEndian::write_f32(&mut raw[SROW_X..SROW_X + 4], 1.0);
        LittleEndian::write_f32(&mut raw[SROW_Y + 4..SROW_Y + 8], 1.0);
        LittleEndian::write_f32(&mut raw[SROW_Z + 8..SROW_Z + 12], 1.0);

        raw[MAGIC..MAGIC + 4].copy_from_slice(b"n+1\0");

        let mut dim = [1usize; 7];
        dim[..4].copy_from_slice(&shape);

        Self {
            raw,
            ndim: 4,
            dim,
            datatype,
            vox_offset: Self::DEFAULT_VOX_OFFSET,
            little_endian: true,
        }
    }

    /// The verbatim on-disk prefix (`0..vox_offset`).
    pub fn prefix_bytes(&self) -> &[u8] {
        &self.raw
    }

    /// Image shape (first `ndim` axes).
    pub fn shape(&self) -> Vec<usize> {
        self.dim[..self.ndim as usize].to_vec()
    }

    /// Number of voxels in one 3D volume.
    pub fn volume_voxels(&self) -> usize {
        self.dim[..(self.ndim as usize).min(3)].iter().product()
    }

    /// Byte size of one 3D volume.
    pub fn volume_size(&self) -> usize {
        self.volume_voxels() * self.datatype.byte_size()
    }

    /// Number of volumes along the 4th axis.
    ///
    /// A 3D image counts as a single volume. Images with more than four
    /// axes are accepted only when the trailing axes are singleton
    /// (effectively 4D).
    pub fn num_volumes(&self) -> Result<usize> {
        if self.ndim as usize > 4 {
            for (i, &d) in self.dim[4..self.ndim as usize].iter().enumerate() {
                if d != 1 {
                    return Err(Error::InvalidDimensions(format!(
                        "image is not effectively 4D: dim[{}] = {}",
                        i + 5,
                        d
                    )));
                }
            }
        }
        if self.ndim >= 4 {
            Ok(self.dim[3])
        } else {
            Ok(1)
        }
    }

    /// Total number of voxels.
    pub fn num_voxels(&self) -> usize {
        self.dim[..self.ndim as usize].iter().product()
    }

    /// Total size of image data in bytes.
    pub fn data_size(&self) -> usize {
        self.num_voxels() * self.datatype.byte_size()
    }

    /// Returns true if the file is little endian.
    pub fn is_little_endian(&self) -> bool {
        self.little_endian
    }

    /// Validate dimension fields against overflow.
    pub fn validate(&self) -> Result<()> {
        let mut voxels: usize = 1;
        for i in 0..self.ndim as usize {
            voxels = voxels
                .checked_mul(self.dim[i])
                .ok_or_else(|| Error::InvalidDimensions("dimension product overflow".into()))?;
        }
        voxels
            .checked_mul(self.datatype.byte_size())
            .ok_or_else(|| Error::InvalidDimensions("data size overflow".into()))?;
        Ok(())
    }
}
