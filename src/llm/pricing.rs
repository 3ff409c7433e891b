use std::collections::HashMap;
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy)]
pub struct PriceEntry {
    pub input: f64,
    pub output: f64,
}

// USD per 1M tokens for the models this service is configured with.
pub static PRICING: LazyLock<HashMap<&'static str, PriceEntry>> = LazyLock::new(|| {
    HashMap::from([
        (
            "llama-3.3-70b-versatile",
            PriceEntry {
                input: 0.59,
                output: 0.79,
            },
        ),
        (
            "gpt-4.1",
            PriceEntry {
                input: 2.00,
                output: 8.00,
            },
        ),
        (
            "gpt-4.1-mini",
            PriceEntry {
                input: 0.40,
                output: 1.60,
            },
        ),
        (
            "claude-haiku-4-5-20251001",
            PriceEntry {
                input: 1.00,
                output: 5.00,
            },
        ),
        (
            "claude-sonnet-4-5-20250929",
            PriceEntry {
                input: 3.00,
                output: 15.00,
            },
        ),
    ])
});

pub fn calculate_cost(model: &str, input_tokens: u32, output_tokens: u32) -> f64 {
    match PRICING.get(model) {
        Some(entry) => {
            (f64::from(input_tokens) * entry.input / 1_000_000.0)
                + (f64::from(output_tokens) * entry.output / 1_000_000.0)
        }
        None => 0.0,
    }
}

pub static PROVIDER_SERVERS: LazyLock<HashMap<&str, &str>> = LazyLock::new(|| {
    HashMap::from([
        ("groq", "api.groq.com"),
        ("openai", "api.openai.com"),
        ("anthropic", "api.anthropic.com"),
    ])
});

pub static PROVIDER_PORTS: LazyLock<HashMap<&str, i64>> = LazyLock::new(|| {
    HashMap::from([("groq", 443_i64), ("openai", 443), ("anthropic", 443)])
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_cost_known_model() {
        let cost = calculate_cost("llama-3.3-70b-versatile", 1_000_000, 1_000_000);
        assert!((cost - 1.38).abs() < 1e-9);
    }

    #[test]
    fn test_calculate_cost_unknown_model() {
        assert_eq!(calculate_cost("nonexistent-model-xyz", 1000, 1000), 0.0);
    }

    #[test]
    fn test_calculate_cost_zero_tokens() {
        assert_eq!(calculate_cost("gpt-4.1", 0, 0), 0.0);
    }

    #[test]
    fn test_provider_servers() {
        assert_eq!(PROVIDER_SERVERS.get("groq"), Some(&"api.groq.com"));
        assert_eq!(
            PROVIDER_SERVERS.get("anthropic"),
            Some(&"api.anthropic.com")
        );
        assert_eq!(PROVIDER_PORTS.get("openai"), Some(&443));
    }
}
