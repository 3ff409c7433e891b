use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub environment: String,
    pub llm_provider: String,
    pub llm_model: String,
    pub fallback_provider: String,
    pub fallback_model: String,
    pub groq_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub autodev_api_key: Option<String>,
    pub exa_api_key: Option<String>,
    pub autodev_base_url: String,
    pub nhtsa_base_url: String,
    pub exa_base_url: String,
    pub default_zip: String,
    pub comp_radius_miles: u32,
    pub comp_page_size: u32,
    pub otel_service_name: String,
    pub otel_exporter_endpoint: String,
    pub default_temperature: f64,
    pub default_max_tokens: u32,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            port: env::var("APP_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .expect("APP_PORT must be a number"),
            environment: env::var("SCOUT_ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
            llm_provider: env::var("LLM_PROVIDER").unwrap_or_else(|_| "groq".to_string()),
            llm_model: env::var("LLM_MODEL")
                .unwrap_or_else(|_| "llama-3.3-70b-versatile".to_string()),
            fallback_provider: env::var("FALLBACK_PROVIDER")
                .unwrap_or_else(|_| "anthropic".to_string()),
            fallback_model: env::var("FALLBACK_MODEL")
                .unwrap_or_else(|_| "claude-haiku-4-5-20251001".to_string()),
            groq_api_key: env::var("GROQ_API_KEY").ok(),
            openai_api_key: env::var("OPENAI_API_KEY").ok(),
            anthropic_api_key: env::var("ANTHROPIC_API_KEY").ok(),
            autodev_api_key: env::var("AUTODEV_API_KEY").ok(),
            exa_api_key: env::var("EXA_API_KEY").ok(),
            autodev_base_url: env::var("AUTODEV_BASE_URL")
                .unwrap_or_else(|_| "https://auto.dev/api/listings".to_string()),
            nhtsa_base_url: env::var("NHTSA_BASE_URL")
                .unwrap_or_else(|_| "https://api.nhtsa.gov".to_string()),
            exa_base_url: env::var("EXA_BASE_URL")
                .unwrap_or_else(|_| "https://api.exa.ai".to_string()),
            default_zip: env::var("DEFAULT_ZIP").unwrap_or_else(|_| "48309".to_string()),
            comp_radius_miles: env::var("COMP_RADIUS_MILES")
                .unwrap_or_else(|_| "100".to_string())
                .parse()
                .expect("COMP_RADIUS_MILES must be a number"),
            comp_page_size: env::var("COMP_PAGE_SIZE")
                .unwrap_or_else(|_| "50".to_string())
                .parse()
                .expect("COMP_PAGE_SIZE must be a number"),
            otel_service_name: env::var("OTEL_SERVICE_NAME")
                .unwrap_or_else(|_| "car-scout".to_string()),
            otel_exporter_endpoint: env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
                .unwrap_or_else(|_| "http://localhost:4317".to_string()),
            default_temperature: env::var("DEFAULT_TEMPERATURE")
                .unwrap_or_else(|_| "0.3".to_string())
                .parse()
                .expect("DEFAULT_TEMPERATURE must be a number"),
            default_max_tokens: env::var("DEFAULT_MAX_TOKENS")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .expect("DEFAULT_MAX_TOKENS must be a number"),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// API key for the configured primary LLM provider, if any.
    pub fn llm_api_key(&self) -> Option<&str> {
        match self.llm_provider.as_str() {
            "anthropic" => self.anthropic_api_key.as_deref(),
            "openai" => self.openai_api_key.as_deref(),
            _ => self.groq_api_key.as_deref(),
        }
    }
}
