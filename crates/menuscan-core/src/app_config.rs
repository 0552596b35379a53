use std::path::PathBuf;

#[derive(Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub max_retries: u32,
    pub retry_backoff_base_secs: u64,
    pub browser_timeout_secs: u64,
    pub max_pages: usize,
    pub chrome_path: Option<PathBuf>,
    pub auto_install_browser: bool,
    pub browser_install_cmd: String,
    pub tesseract_path: String,
    pub screenshot_api_key: Option<String>,
    pub screenshot_api_url: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("log_level", &self.log_level)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_base_secs", &self.retry_backoff_base_secs)
            .field("browser_timeout_secs", &self.browser_timeout_secs)
            .field("max_pages", &self.max_pages)
            .field("chrome_path", &self.chrome_path)
            .field("auto_install_browser", &self.auto_install_browser)
            .field("browser_install_cmd", &self.browser_install_cmd)
            .field("tesseract_path", &self.tesseract_path)
            .field(
                "screenshot_api_key",
                &self.screenshot_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("screenshot_api_url", &self.screenshot_api_url)
            .finish()
    }
}
