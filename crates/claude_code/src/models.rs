//! Pricing and context-window lookup for Claude model names and aliases.

use agent_events::ModelPricing;

const OPUS: ModelPricing = ModelPricing::new(5.0, 25.0);
const SONNET: ModelPricing = ModelPricing::new(3.0, 15.0);
const HAIKU: ModelPricing = ModelPricing::new(1.0, 5.0);

/// Unknown models are priced as Opus.
pub fn pricing_for_model(model: &str) -> ModelPricing {
    match model {
        "opus" | "claude-opus-4-6" => OPUS,
        "sonnet" | "claude-sonnet-4-5-20250929" => SONNET,
        "haiku" | "claude-haiku-4-5-20251001" => HAIKU,
        _ => OPUS,
    }
}

pub fn context_window_for_model(_model: &str) -> u64 {
    200_000
}
