//! The volume reorder transform.
//!
//! Places all baseline (b=0) volumes ahead of diffusion-weighted volumes
//! while keeping the image, b-value table, and b-vector table aligned:
//! one permutation, applied identically to all three.

use crate::error::{Error, Result};
use crate::gradients::{Bvals, Bvecs};
use crate::nifti;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Gradient magnitudes below this are treated as baseline (b=0).
///
/// Exclusive bound: a volume with b-value exactly 50 counts as weighted.
/// Units are those of the b-value table, typically s/mm².
pub const B0_THRESHOLD: f64 = 50.0;

/// The six file paths of one transform run plus the baseline threshold.
///
/// Paths are explicit; nothing is read from ambient state.
#[derive(Debug, Clone)]
pub struct ReorderConfig {
    /// Input 4D NIfTI image (`.nii` or `.nii.gz`).
    pub nifti_in: PathBuf,
    /// Input b-value table.
    pub bval_in: PathBuf,
    /// Input b-vector table.
    pub bvec_in: PathBuf,
    /// Output NIfTI image; overwritten if present.
    pub nifti_out: PathBuf,
    /// Output b-value table; overwritten if present.
    pub bval_out: PathBuf,
    /// Output b-vector table; overwritten if present.
    pub bvec_out: PathBuf,
    /// Baseline classification threshold.
    pub b0_threshold: f64,
}

impl ReorderConfig {
    /// Configure a run over the six paths with the default threshold.
    pub fn new<P: AsRef<Path>>(
        nifti_in: P,
        bval_in: P,
        bvec_in: P,
        nifti_out: P,
        bval_out: P,
        bvec_out: P,
    ) -> Self {
        Self {
            nifti_in: nifti_in.as_ref().to_path_buf(),
            bval_in: bval_in.as_ref().to_path_buf(),
            bvec_in: bvec_in.as_ref().to_path_buf(),
            nifti_out: nifti_out.as_ref().to_path_buf(),
            bval_out: bval_out.as_ref().to_path_buf(),
            bvec_out: bvec_out.as_ref().to_path_buf(),
            b0_threshold: B0_THRESHOLD,
        }
    }

    /// Override the baseline threshold.
    pub fn with_b0_threshold(mut self, threshold: f64) -> Self {
        self.b0_threshold = threshold;
        self
    }
}

/// What one run did; the CLI prints its completion line from this.
#[derive(Debug, Clone)]
pub struct ReorderSummary {
    /// Total number of volumes.
    pub num_volumes: usize,
    /// How many were classified as baseline.
    pub num_baseline: usize,
    /// The applied permutation: `order[k]` is the input index written at
    /// output position `k`.
    pub order: Vec<usize>,
    /// Path of the written image.
    pub nifti_out: PathBuf,
}

/// Compute the baseline-first ordering: indices of all volumes with
/// b-value below `threshold`, in original order, followed by the rest,
/// in original order. A stable partition, not a sort.
pub fn baseline_first_order(bvals: &Bvals, threshold: f64) -> Vec<usize> {
    let values = bvals.values();
    let mut order: Vec<usize> = (0..values.len()).filter(|&i| values[i] < threshold).collect();
    order.extend((0..values.len()).filter(|&i| values[i] >= threshold));
    order
}

/// Run the full transform: load the three inputs, reorder, write the
/// three outputs.
///
/// Outputs already written when a later step fails are left on disk;
/// there is no cleanup or retry at this level.
pub fn run(config: &ReorderConfig) -> Result<ReorderSummary> {
    let image = nifti::load(&config.nifti_in)?;
    let bvals = Bvals::load(&config.bval_in)?;
    let bvecs = Bvecs::load(&config.bvec_in)?;

    let num_volumes = image.num_volumes()?;
    debug!(
        image = %config.nifti_in.display(),
        shape = ?image.shape(),
        dtype = %image.header().datatype,
        volumes = num_volumes,
        "loaded DWI series"
    );

    if bvals.len() != num_volumes || bvecs.num_volumes() != num_volumes {
        return Err(Error::ShapeMismatch(format!(
            "image has {} volumes but bval table has {} entries and bvec table has {} columns",
            num_volumes,
            bvals.len(),
            bvecs.num_volumes()
        )));
    }

    let order = baseline_first_order(&bvals, config.b0_threshold);
    let num_baseline = bvals
        .values()
        .iter()
        .filter(|&&b| b < config.b0_threshold)
        .count();
    debug!(?order, num_baseline, "computed baseline-first ordering");

    let image = image.reorder_volumes(&order)?;
    let bvals = bvals.reorder(&order);
    let bvecs = bvecs.reorder(&order);

    nifti::save(&image, &config.nifti_out)?;
    bvals.save(&config.bval_out)?;
    bvecs.save(&config.bvec_out)?;

    info!(
        output = %config.nifti_out.display(),
        num_volumes,
        num_baseline,
        "reordered DWI series written"
    );

    Ok(ReorderSummary {
        num_volumes,
        num_baseline,
        order,
        nifti_out: config.nifti_out.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bvals(values: &str) -> Bvals {
        Bvals::parse(values).unwrap()
    }

    #[test]
    fn test_concrete_scenario() {
        let order = baseline_first_order(&bvals("0 1000 0 1000 1000"), B0_THRESHOLD);
        assert_eq!(order, vec![0, 2, 1, 3, 4]);
    }

    #[test]
    fn test_all_baseline_is_identity() {
        let order = baseline_first_order(&bvals("0 5 10 49.9"), B0_THRESHOLD);
        assert_eq!(order, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_no_baseline_is_identity() {
        let order = baseline_first_order(&bvals("1000 2000 3000"), B0_THRESHOLD);
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        // exactly 50 is weighted, 49.999 is baseline
        let order = baseline_first_order(&bvals("50 49.999 50.001"), B0_THRESHOLD);
        assert_eq!(order, vec![1, 0, 2]);
    }

    #[test]
    fn test_partition_is_stable_within_groups() {
        let order = baseline_first_order(&bvals("1000 0 2000 0 500 0"), B0_THRESHOLD);
        assert_eq!(order, vec![1, 3, 5, 0, 2, 4]);
    }

    #[test]
    fn test_order_is_permutation() {
        let order = baseline_first_order(&bvals("0 700 0 0 2000 300 0"), B0_THRESHOLD);
        let mut sorted = order.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..7).collect::<Vec<_>>());
    }

    #[test]
    fn test_idempotent_on_canonical_input() {
        let canonical = bvals("0 0 1000 1000 1000");
        let order = baseline_first_order(&canonical, B0_THRESHOLD);
        assert_eq!(order, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_custom_threshold() {
        let order = baseline_first_order(&bvals("100 1000 100"), 200.0);
        assert_eq!(order, vec![0, 2, 1]);
    }
}
