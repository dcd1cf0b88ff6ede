//! `NIfTI` file format support.
//!
//! A deliberately small NIfTI-1 layer: enough to read a 4D series, slice
//! it into per-volume byte blocks, and write it back with the header and
//! spatial frame untouched. `.nii` and `.nii.gz` are both handled.

pub(crate) mod header;
pub(crate) mod image;
pub mod io;

pub use header::{DataType, NiftiHeader};
pub use image::NiftiImage;
pub use io::{load, save};
