//! Even-stride screenshot selection

use crate::capture::types::ScreenshotRecord;

/// Indices picked from `n` items when keeping at most `cap` of them.
///
/// Index `i` of the output is `floor(i * (n - 1) / (cap - 1))`, so the first
/// and last items are always kept and ties resolve to the lower index.
pub fn stride_indices(n: usize, cap: usize) -> Vec<usize> {
    if cap == 0 || n == 0 {
        return Vec::new();
    }
    if n <= cap {
        return (0..n).collect();
    }
    if cap == 1 {
        return vec![0];
    }
    (0..cap).map(|i| i * (n - 1) / (cap - 1)).collect()
}

/// Keep at most `cap` records spread evenly over the capture, in
/// sequence order.
pub fn select_evenly(records: &[ScreenshotRecord], cap: usize) -> Vec<ScreenshotRecord> {
    let mut ordered = records.to_vec();
    ordered.sort_by_key(|r| r.sequence_index);
    stride_indices(ordered.len(), cap)
        .into_iter()
        .map(|i| ordered[i].clone())
        .collect()
}
