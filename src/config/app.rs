use anyhow::{anyhow, Result};
use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub log_level: String,
    pub jwt_secret: String,
    /// Share of each booking price kept by the platform, in whole percent
    pub platform_fee_percent: u8,
    pub seed_demo_data: bool,
    /// Rate limit on `x-forwarded-for` rather than the peer address
    pub trust_proxy_headers: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .unwrap_or(3000);
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let jwt_secret = env::var("JWT_SECRET")
            .unwrap_or_else(|_| "your-secret-key-change-in-production".to_string());
        let platform_fee_percent: u8 = env::var("PLATFORM_FEE_PERCENT")
            .unwrap_or_else(|_| "15".to_string())
            .parse()
            .map_err(|e| anyhow!("PLATFORM_FEE_PERCENT must be an integer: {}", e))?;
        let seed_demo_data = env_flag("SEED_DEMO_DATA");
        let trust_proxy_headers = env_flag("TRUST_PROXY_HEADERS");

        let config = AppConfig {
            host,
            port,
            environment,
            log_level,
            jwt_secret,
            platform_fee_percent,
            seed_demo_data,
            trust_proxy_headers,
        };
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.platform_fee_percent > 100 {
            return Err(anyhow!("PLATFORM_FEE_PERCENT must be between 0 and 100"));
        }
        if self.is_production() && self.jwt_secret == "your-secret-key-change-in-production" {
            return Err(anyhow!("JWT_SECRET must be set in production"));
        }
        Ok(())
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            environment: "development".to_string(),
            log_level: "info".to_string(),
            jwt_secret: "your-secret-key-change-in-production".to_string(),
            platform_fee_percent: 15,
            seed_demo_data: false,
            trust_proxy_headers: false,
        }
    }
}

fn env_flag(name: &str) -> bool {
    env::var(name)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server_address(), "0.0.0.0:3000");
        assert!(config.is_development());
    }

    #[test]
    fn test_fee_above_hundred_rejected() {
        let config = AppConfig {
            platform_fee_percent: 120,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_production_requires_real_secret() {
        let config = AppConfig {
            environment: "production".to_string(),
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
