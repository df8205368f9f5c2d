//! Dynamic minimum-prevalence thresholds.
//!
//! The bar depends on how many postings were analyzed and on the category's
//! priority tier. Sparse samples get a lower bar so results are not starved;
//! dense samples get a stricter one to cut noise. At any volume a high-priority
//! category is held to a lower bar than a low-priority one.

use crate::vocabulary::categories::PriorityTier;

/// Below this many postings the sample counts as sparse.
const SPARSE_VOLUME: u32 = 20;
/// At or above this many postings the sample counts as dense.
const DENSE_VOLUME: u32 = 50;

/// Minimum prevalence (percent) a skill in `category` needs to be kept.
///
/// | postings  | high | normal | low |
/// |-----------|------|--------|-----|
/// | < 20      | 5    | 10     | 15  |
/// | 20 – 49   | 10   | 15     | 20  |
/// | ≥ 50      | 15   | 20     | 30  |
pub fn min_prevalence(total_postings: u32, category: &str) -> f64 {
    let tier = PriorityTier::of(category);
    if total_postings < SPARSE_VOLUME {
        match tier {
            PriorityTier::High => 5.0,
            PriorityTier::Normal => 10.0,
            PriorityTier::Low => 15.0,
        }
    } else if total_postings < DENSE_VOLUME {
        match tier {
            PriorityTier::High => 10.0,
            PriorityTier::Normal => 15.0,
            PriorityTier::Low => 20.0,
        }
    } else {
        match tier {
            PriorityTier::High => 15.0,
            PriorityTier::Normal => 20.0,
            PriorityTier::Low => 30.0,
        }
    }
}
