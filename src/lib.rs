//! Reorder DWI NIfTI volumes so all baseline (b=0) acquisitions come
//! first, keeping the image, b-value table, and b-vector table aligned.
//!
//! The transform is a stable partition along the volume axis: baseline
//! volumes in their original relative order, then diffusion-weighted
//! volumes in theirs. The same permutation is applied to all three data
//! sources, so position `k` of the output image, bvals, and bvecs always
//! refer to the same physical acquisition. The image header, affine, and
//! voxel datatype pass through untouched.
//!
//! # Example
//! ```ignore
//! use dwireorder::ReorderConfig;
//!
//! let config = ReorderConfig::new(
//!     "dwi.nii.gz", "dwi.bval", "dwi.bvec",
//!     "out.nii.gz", "out.bval", "out.bvec",
//! );
//! let summary = dwireorder::run(&config)?;
//! println!("{} of {} volumes are baseline", summary.num_baseline, summary.num_volumes);
//! ```

pub mod error;
pub mod gradients;
pub mod nifti;
pub mod reorder;

pub use error::{Error, Result};
pub use gradients::{Bvals, Bvecs};
pub use reorder::{baseline_first_order, run, ReorderConfig, ReorderSummary, B0_THRESHOLD};
