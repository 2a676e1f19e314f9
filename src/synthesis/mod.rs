//! Skill synthesis
//!
//! Turns a compiled artifact set into a model request, prices it, and sends it.

pub mod cost;
pub mod model;
pub mod request;
pub mod transport;

pub use cost::{estimate, CostEstimate};
pub use model::{ModelIds, ModelTier};
pub use request::{build_request, SkillRequest};
pub use transport::{AnthropicTransport, Credential, ModelResponse, SkillTransport};

/// Environment variable selecting the model tier
pub const MODEL_ENV: &str = "MIMIC_MODEL";

/// Pick the tier: explicit flag, then `MIMIC_MODEL`, then the preferences file.
/// An unrecognized environment value is ignored.
pub fn resolve_tier(flag: Option<ModelTier>, env_value: Option<&str>, configured: ModelTier) -> ModelTier {
    if let Some(tier) = flag {
        return tier;
    }
    if let Some(raw) = env_value {
        match ModelTier::parse(raw) {
            Some(tier) => return tier,
            None => tracing::warn!(value = raw, "Ignoring unknown {} value", MODEL_ENV),
        }
    }
    configured
}
