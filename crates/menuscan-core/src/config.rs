use std::path::PathBuf;

use crate::app_config::AppConfig;
use crate::ConfigError;

/// Desktop Chrome user agent sent by the static fetcher unless overridden.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36";

const DEFAULT_BROWSER_INSTALL_CMD: &str = "npx @puppeteer/browsers install chrome@stable";
const DEFAULT_SCREENSHOT_API_URL: &str = "https://api.screenshotmachine.com/";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but cannot be parsed.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but cannot be parsed.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Every key is optional; the lookup is injected so tests can feed a plain
/// `HashMap` instead of mutating the process environment.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let log_level = or_default("MENUSCAN_LOG_LEVEL", "info");
    let request_timeout_secs = parse_u64("MENUSCAN_REQUEST_TIMEOUT_SECS", "20")?;
    let user_agent = or_default("MENUSCAN_USER_AGENT", DEFAULT_USER_AGENT);
    let max_retries = parse_u32("MENUSCAN_MAX_RETRIES", "2")?;
    let retry_backoff_base_secs = parse_u64("MENUSCAN_RETRY_BACKOFF_BASE_SECS", "1")?;
    let browser_timeout_secs = parse_u64("MENUSCAN_BROWSER_TIMEOUT_SECS", "45")?;
    let max_pages = parse_usize("MENUSCAN_MAX_PAGES", "20")?;
    if max_pages == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "MENUSCAN_MAX_PAGES".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    let chrome_path = optional("MENUSCAN_CHROME_PATH").map(PathBuf::from);
    let auto_install_browser = parse_bool(
        "MENUSCAN_AUTO_INSTALL_BROWSER",
        &or_default("MENUSCAN_AUTO_INSTALL_BROWSER", "false"),
    )?;
    let browser_install_cmd =
        or_default("MENUSCAN_BROWSER_INSTALL_CMD", DEFAULT_BROWSER_INSTALL_CMD);
    let tesseract_path = or_default("MENUSCAN_TESSERACT_PATH", "tesseract");
    let screenshot_api_key = optional("MENUSCAN_SCREENSHOT_API_KEY");
    let screenshot_api_url =
        or_default("MENUSCAN_SCREENSHOT_API_URL", DEFAULT_SCREENSHOT_API_URL);

    Ok(AppConfig {
        log_level,
        request_timeout_secs,
        user_agent,
        max_retries,
        retry_backoff_base_secs,
        browser_timeout_secs,
        max_pages,
        chrome_path,
        auto_install_browser,
        browser_install_cmd,
        tesseract_path,
        screenshot_api_key,
        screenshot_api_url,
    })
}

/// Parse a boolean switch. Accepts `true/false`, `1/0`, `yes/no`, `on/off`.
fn parse_bool(var: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" | "" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: format!("expected a boolean, got \"{other}\""),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
