//! Model tiers, ids and pricing

use serde::{Deserialize, Serialize};
use std::fmt;

/// External model variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ModelTier {
    /// Fastest, lowest cost
    #[serde(alias = "haiku")]
    #[value(alias = "haiku")]
    Fast,
    /// Fast and capable (default)
    #[default]
    #[serde(alias = "sonnet")]
    #[value(alias = "sonnet")]
    Balanced,
    /// Most capable, higher cost
    #[serde(alias = "opus")]
    #[value(alias = "opus")]
    Best,
}

impl ModelTier {
    pub const ALL: [ModelTier; 3] = [ModelTier::Fast, ModelTier::Balanced, ModelTier::Best];

    /// Parse a tier name or one of its aliases (case-insensitive)
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "fast" | "haiku" => Some(ModelTier::Fast),
            "balanced" | "sonnet" => Some(ModelTier::Balanced),
            "best" | "opus" => Some(ModelTier::Best),
            _ => None,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ModelTier::Fast => "Fastest, lowest cost",
            ModelTier::Balanced => "Fast and capable (default)",
            ModelTier::Best => "Most capable, higher cost",
        }
    }

    /// Per-million-token prices for this tier
    pub fn pricing(&self) -> Pricing {
        match self {
            ModelTier::Fast => Pricing { input_per_mtok: 0.80, output_per_mtok: 4.00 },
            ModelTier::Balanced => Pricing { input_per_mtok: 3.00, output_per_mtok: 15.00 },
            ModelTier::Best => Pricing { input_per_mtok: 15.00, output_per_mtok: 75.00 },
        }
    }
}

impl fmt::Display for ModelTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModelTier::Fast => "fast",
            ModelTier::Balanced => "balanced",
            ModelTier::Best => "best",
        };
        f.write_str(name)
    }
}

/// USD per million tokens
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pricing {
    pub input_per_mtok: f64,
    pub output_per_mtok: f64,
}

/// Model id used for each tier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelIds {
    pub fast: String,
    pub balanced: String,
    pub best: String,
}

impl Default for ModelIds {
    fn default() -> Self {
        Self {
            fast: "claude-haiku-4-5-20251001".to_string(),
            balanced: "claude-sonnet-4-5-20250929".to_string(),
            best: "claude-opus-4-1-20250805".to_string(),
        }
    }
}

impl ModelIds {
    pub fn id_for(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Fast => &self.fast,
            ModelTier::Balanced => &self.balanced,
            ModelTier::Best => &self.best,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases() {
        assert_eq!(ModelTier::parse("sonnet"), Some(ModelTier::Balanced));
        assert_eq!(ModelTier::parse("OPUS"), Some(ModelTier::Best));
        assert_eq!(ModelTier::parse(" haiku "), Some(ModelTier::Fast));
        assert_eq!(ModelTier::parse("best"), Some(ModelTier::Best));
        assert_eq!(ModelTier::parse("gpt"), None);
    }

    #[test]
    fn test_pricing_increases_with_tier() {
        let fast = ModelTier::Fast.pricing();
        let balanced = ModelTier::Balanced.pricing();
        let best = ModelTier::Best.pricing();
        assert!(fast.input_per_mtok < balanced.input_per_mtok);
        assert!(balanced.input_per_mtok < best.input_per_mtok);
        assert!(fast.output_per_mtok < balanced.output_per_mtok);
        assert!(balanced.output_per_mtok < best.output_per_mtok);
    }

    #[test]
    fn test_display_matches_serde_name() {
        for tier in ModelTier::ALL {
            let json = serde_json::to_string(&tier).unwrap();
            assert_eq!(json, format!("\"{}\"", tier));
        }
    }

    #[test]
    fn test_model_ids_per_tier() {
        let ids = ModelIds::default();
        assert!(ids.id_for(ModelTier::Balanced).contains("sonnet"));
        assert!(ids.id_for(ModelTier::Fast).contains("haiku"));
        assert!(ids.id_for(ModelTier::Best).contains("opus"));
    }
}
