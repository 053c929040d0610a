//! Application configuration loaded from environment variables.

use std::time::Duration;

use gateway::GatewayConfig;

/// Per-gateway integration settings.
///
/// Reads from environment variables with the given prefix, e.g. for
/// `ALPHAPAY`:
/// - `ALPHAPAY_MERCHANT_ID`
/// - `ALPHAPAY_SECRET`
/// - `ALPHAPAY_ENDPOINT`
/// - `ALPHAPAY_TIMEOUT_MS`
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub merchant_id: String,
    pub secret: String,
    pub endpoint: String,
    pub timeout_ms: u64,
}

impl GatewaySettings {
    fn from_env(prefix: &str, defaults: GatewaySettings) -> Self {
        let var = |suffix: &str| std::env::var(format!("{prefix}_{suffix}")).ok();
        Self {
            merchant_id: var("MERCHANT_ID").unwrap_or(defaults.merchant_id),
            secret: var("SECRET").unwrap_or(defaults.secret),
            endpoint: var("ENDPOINT").unwrap_or(defaults.endpoint),
            timeout_ms: var("TIMEOUT_MS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.timeout_ms),
        }
    }

    /// Builds the adapter configuration, deriving the return and notify
    /// URLs from the shop's public base URL.
    pub fn to_gateway_config(&self, public_url: &str, callback_path: &str) -> GatewayConfig {
        GatewayConfig::new(
            &self.merchant_id,
            &self.secret,
            &self.endpoint,
            format!("{public_url}/return"),
            format!("{public_url}{callback_path}"),
        )
        .with_timeout(Duration::from_millis(self.timeout_ms))
    }
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `PUBLIC_URL` — externally reachable base URL for gateway redirects
///   and callbacks (default: `"http://localhost:3000"`)
/// - `ORDER_TAX_CENTS` / `ORDER_SHIPPING_FEE_CENTS` — flat pricing
///   (defaults: `0` / `0`)
/// - gateway settings, see [`GatewaySettings`]
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub public_url: String,
    pub tax_cents: i64,
    pub shipping_fee_cents: i64,
    pub alphapay: GatewaySettings,
    pub betapay: GatewaySettings,
}

impl Config {
    /// Loads configuration from environment variables, falling back to
    /// defaults.
    pub fn from_env() -> Self {
        let defaults = Config::default();
        Self {
            host: std::env::var("HOST").unwrap_or(defaults.host),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: std::env::var("RUST_LOG").unwrap_or(defaults.log_level),
            public_url: std::env::var("PUBLIC_URL").unwrap_or(defaults.public_url),
            tax_cents: std::env::var("ORDER_TAX_CENTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.tax_cents),
            shipping_fee_cents: std::env::var("ORDER_SHIPPING_FEE_CENTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.shipping_fee_cents),
            alphapay: GatewaySettings::from_env("ALPHAPAY", defaults.alphapay),
            betapay: GatewaySettings::from_env("BETAPAY", defaults.betapay),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            public_url: "http://localhost:3000".to_string(),
            tax_cents: 0,
            shipping_fee_cents: 0,
            alphapay: GatewaySettings {
                merchant_id: "M-000000".to_string(),
                secret: "alphapay-dev-secret".to_string(),
                endpoint: "https://alphapay.example".to_string(),
                timeout_ms: 10_000,
            },
            betapay: GatewaySettings {
                merchant_id: "B-000000".to_string(),
                secret: "betapay-dev-secret".to_string(),
                endpoint: "https://betapay.example".to_string(),
                timeout_ms: 10_000,
            },
        }
    }
}
