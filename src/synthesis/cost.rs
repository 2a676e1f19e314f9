//! Pre-flight cost estimate
//!
//! Computed from artifact statistics only; no network access.

use crate::artifacts::CompiledArtifactSet;
use crate::synthesis::model::ModelTier;
use serde::Serialize;

/// Tokens charged for one image at or below the reference size
pub const TOKENS_PER_IMAGE: u64 = 1600;

/// Compressed size the per-image token count is calibrated against
pub const REFERENCE_IMAGE_BYTES: u64 = 200 * 1024;

/// Tokens for the fixed instruction prompt
pub const PROMPT_TOKENS: u64 = 500;

/// Expected size of the generated document
pub const EXPECTED_OUTPUT_TOKENS: u64 = 2000;

/// Approximate price of one compile request
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CostEstimate {
    pub tier: ModelTier,
    pub image_count: usize,
    pub input_tokens: u64,
    pub output_tokens: u64,
    /// USD
    pub input_cost: f64,
    /// USD
    pub output_cost: f64,
    /// USD
    pub total_cost: f64,
}

fn tokens_per_image(average_bytes: u64) -> u64 {
    if average_bytes <= REFERENCE_IMAGE_BYTES {
        TOKENS_PER_IMAGE
    } else {
        (TOKENS_PER_IMAGE * average_bytes).div_ceil(REFERENCE_IMAGE_BYTES)
    }
}

/// Estimate from raw statistics
pub fn estimate_from_stats(
    image_count: usize,
    average_image_bytes: usize,
    action_log_len: usize,
    tier: ModelTier,
) -> CostEstimate {
    let image_tokens = image_count as u64 * tokens_per_image(average_image_bytes as u64);
    let text_tokens = PROMPT_TOKENS + (action_log_len as u64).div_ceil(4);
    let input_tokens = image_tokens + text_tokens;
    let output_tokens = EXPECTED_OUTPUT_TOKENS;

    let pricing = tier.pricing();
    let input_cost = input_tokens as f64 / 1_000_000.0 * pricing.input_per_mtok;
    let output_cost = output_tokens as f64 / 1_000_000.0 * pricing.output_per_mtok;

    CostEstimate {
        tier,
        image_count,
        input_tokens,
        output_tokens,
        input_cost,
        output_cost,
        total_cost: input_cost + output_cost,
    }
}

/// Estimate the cost of sending `set` to the given tier
pub fn estimate(set: &CompiledArtifactSet, tier: ModelTier) -> crate::Result<CostEstimate> {
    let actions_len = set.actions_json()?.len();
    Ok(estimate_from_stats(
        set.images.len(),
        set.average_image_bytes(),
        actions_len,
        tier,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_values() {
        let est = estimate_from_stats(25, 100 * 1024, 2000, ModelTier::Balanced);
        assert_eq!(est.input_tokens, 25 * 1600 + 500 + 500);
        assert_eq!(est.output_tokens, 2000);
        assert!((est.input_cost - 41_000.0 / 1_000_000.0 * 3.0).abs() < 1e-9);
        assert!((est.output_cost - 0.03).abs() < 1e-9);
        assert!((est.total_cost - (est.input_cost + est.output_cost)).abs() < 1e-12);
    }

    #[test]
    fn test_monotonic_in_count() {
        let mut last = 0.0;
        for n in 0..60 {
            let est = estimate_from_stats(n, 150 * 1024, 500, ModelTier::Fast);
            assert!(est.total_cost >= last);
            last = est.total_cost;
        }
    }

    #[test]
    fn test_monotonic_in_image_size() {
        let mut last = 0;
        for kib in (0..1000).step_by(25) {
            let est = estimate_from_stats(10, kib * 1024, 0, ModelTier::Best);
            assert!(est.input_tokens >= last);
            last = est.input_tokens;
        }
        let big = estimate_from_stats(1, 400 * 1024, 0, ModelTier::Best);
        assert_eq!(big.input_tokens, 3200 + 500);
    }

    #[test]
    fn test_tier_ordering() {
        let fast = estimate_from_stats(5, 50_000, 100, ModelTier::Fast);
        let balanced = estimate_from_stats(5, 50_000, 100, ModelTier::Balanced);
        let best = estimate_from_stats(5, 50_000, 100, ModelTier::Best);
        assert!(fast.total_cost < balanced.total_cost);
        assert!(balanced.total_cost < best.total_cost);
    }

    #[test]
    fn test_empty_set_costs_prompt_only() {
        let est = estimate_from_stats(0, 0, 0, ModelTier::Balanced);
        assert_eq!(est.input_tokens, PROMPT_TOKENS);
    }
}
