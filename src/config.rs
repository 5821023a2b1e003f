use serde::Deserialize;

pub const DEFAULT_BIGDATA_BASE_URL: &str = "https://plataforma.bigdatacorp.com.br";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub bigdata_base_url: String,
    pub bigdata_token_key: String,
    pub bigdata_token_id: String,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub openai_model: String,
    /// Related lookups in flight at once; 1 means strictly sequential.
    pub expansion_concurrency: usize,
    pub http_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            database_url: std::env::var("DB_URL")
                .or_else(|_| std::env::var("DATABASE_URL"))
                .map_err(|_| {
                    anyhow::anyhow!("DB_URL or DATABASE_URL environment variable required")
                })
                .and_then(|url| {
                    if url.trim().is_empty() {
                        anyhow::bail!("DB_URL cannot be empty");
                    }
                    if !url.starts_with("postgresql://") && !url.starts_with("postgres://") {
                        anyhow::bail!("DB_URL must start with postgresql:// or postgres://");
                    }
                    Ok(url)
                })?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            bigdata_base_url: http_url(
                "BIGDATA_BASE_URL",
                std::env::var("BIGDATA_BASE_URL")
                    .ok()
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_BIGDATA_BASE_URL.to_string()),
            )?,
            bigdata_token_key: required_secret(&["BIGDATA_TOKEN_KEY", "TOKEN_KEY"])?,
            bigdata_token_id: required_secret(&["BIGDATA_TOKEN_ID", "TOKEN_ID"])?,
            openai_api_key: required_secret(&["OPENAI_API_KEY"])?,
            openai_base_url: http_url(
                "OPENAI_BASE_URL",
                std::env::var("OPENAI_BASE_URL")
                    .ok()
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            )?,
            openai_model: std::env::var("OPENAI_MODEL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            expansion_concurrency: std::env::var("EXPANSION_CONCURRENCY")
                .unwrap_or_else(|_| "1".to_string())
                .parse::<usize>()
                .map_err(|_| anyhow::anyhow!("EXPANSION_CONCURRENCY must be a positive number"))?
                .clamp(1, 5),
            http_timeout_secs: std::env::var("HTTP_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("HTTP_TIMEOUT_SECS must be a number of seconds"))?,
        };

        // Log successful configuration load (without sensitive values)
        tracing::debug!("Database URL: {}", redacted_url(&config.database_url));
        tracing::debug!("BigData Base URL: {}", config.bigdata_base_url);
        tracing::debug!(
            "OpenAI Base URL: {} (model {})",
            config.openai_base_url,
            config.openai_model
        );
        tracing::debug!("Expansion concurrency: {}", config.expansion_concurrency);
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }
}

/// Reads the first of `names` that is set; blank values are rejected.
fn required_secret(names: &[&str]) -> anyhow::Result<String> {
    let value = names
        .iter()
        .find_map(|name| std::env::var(name).ok())
        .ok_or_else(|| anyhow::anyhow!("{} environment variable required", names.join(" or ")))?;
    if value.trim().is_empty() {
        anyhow::bail!("{} cannot be empty", names[0]);
    }
    Ok(value)
}

fn http_url(name: &str, value: String) -> anyhow::Result<String> {
    let parsed = url::Url::parse(&value)
        .map_err(|e| anyhow::anyhow!("{} is not a valid URL: {}", name, e))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        anyhow::bail!("{} must start with http:// or https://", name);
    }
    Ok(value.trim_end_matches('/').to_string())
}

/// `value` with the password removed, for logging.
fn redacted_url(value: &str) -> String {
    match url::Url::parse(value) {
        Ok(mut parsed) => {
            if parsed.password().is_some() {
                let _ = parsed.set_password(Some("***"));
            }
            parsed.to_string()
        }
        Err(_) => "<unparseable>".to_string(),
    }
}
