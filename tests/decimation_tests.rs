// SPDX-License-Identifier: MIT

//! Test cases for the decimation plan
//!
//! Tests cover:
//! - Pass-through below the budget
//! - Pixel-capacity computation
//! - Stride selection for oversized data
//! - Determinism of the stride filter

use wafermap_viewer::pipeline::DecimationPlan;

#[test]
fn test_small_data_passes_through() {
    let plan = DecimationPlan::compute(5_000, 100, 20.0, 20.0, 30_000);
    assert_eq!(plan.stride, 1);
    assert!(!plan.pixel_dedup);
    assert!(plan.budget >= 5_000);
}

#[test]
fn test_capacity_is_dies_times_pixels() {
    // 50 dies of 10x8 px: 4000 distinguishable points.
    let plan = DecimationPlan::compute(1_000_000, 50, 10.0, 8.0, 30_000);
    assert_eq!(plan.capacity, 4_000);
    // Budget never exceeds capacity.
    assert_eq!(plan.budget, 4_000);
}

#[test]
fn test_budget_respects_max_render_when_capacity_is_large() {
    let plan = DecimationPlan::compute(1_000_000, 500, 100.0, 100.0, 30_000);
    assert_eq!(plan.budget, 30_000);
    assert!(plan.capacity > 30_000);
}

#[test]
fn test_stride_targets_eighty_percent_of_capacity() {
    // capacity 4000, presample target 3200, so 1M defects need stride 313.
    let plan = DecimationPlan::compute(1_000_000, 50, 10.0, 8.0, 30_000);
    assert_eq!(plan.stride, 313);
    assert!(plan.pixel_dedup);

    let kept = (0..1_000_000).filter(|&i| plan.keeps(i)).count();
    assert!(
        kept <= 3_200,
        "stride pre-sampling must land at or under the 80% target, kept {kept}"
    );
    assert!(kept >= 3_000, "stride must not over-decimate, kept {kept}");
}

#[test]
fn test_stride_filter_is_deterministic() {
    let plan = DecimationPlan::compute(100_000, 10, 10.0, 10.0, 30_000);
    let first: Vec<usize> = (0..100_000).filter(|&i| plan.keeps(i)).collect();
    let second: Vec<usize> = (0..100_000).filter(|&i| plan.keeps(i)).collect();
    assert_eq!(first, second);
    assert!(plan.keeps(0), "index 0 always survives the stride");
}

#[test]
fn test_degenerate_inputs_never_panic() {
    let plan = DecimationPlan::compute(0, 0, 0.0, 0.0, 0);
    assert!(plan.budget >= 1);
    assert!(plan.capacity >= 1);
    assert!(plan.keeps(0));

    let keep_all = DecimationPlan::keep_all(0);
    assert_eq!(keep_all.stride, 1);
    assert!(keep_all.budget >= 1);
}

#[test]
fn test_sub_pixel_dies_clamp_to_one_pixel() {
    // Dies smaller than a pixel still contribute one point each.
    let plan = DecimationPlan::compute(100_000, 200, 0.3, 0.4, 30_000);
    assert_eq!(plan.capacity, 200);
}
