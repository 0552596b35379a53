//! Chromium-backed capture engine over the DevTools protocol.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{
    EventLoadingFinished, EventResponseReceived, GetResponseBodyParams,
};
use chromiumoxide::cdp::browser_protocol::page::{
    AddScriptToEvaluateOnNewDocumentParams, CaptureScreenshotFormat,
};
use chromiumoxide::listeners::EventStream;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::age_gate::{dismiss_script, AGE_GATE_INIT_SCRIPT};
use super::provision::{is_missing_browser_error, BrowserProvisioner, MISSING_BROWSER_WARNING};
use super::{
    keep_after_initial_navigation, should_capture, CaptureEngine, CaptureSession, ResponseSender,
    ResponseStream,
};
use crate::error::ScraperError;

/// Pause after each navigation so client-side rendering can start.
const POST_NAVIGATION_DELAY: Duration = Duration::from_millis(2000);
const POST_AGE_GATE_DELAY: Duration = Duration::from_millis(1500);
const SCROLL_STEP_DELAY: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone)]
pub struct ChromiumSettings {
    /// Wall-clock budget for one session, from launch to close.
    pub session_timeout: Duration,
    pub user_agent: String,
    pub chrome_path: Option<PathBuf>,
    pub auto_install: bool,
    pub install_cmd: String,
}

impl ChromiumSettings {
    #[must_use]
    pub fn from_config(config: &menuscan_core::AppConfig) -> Self {
        Self {
            session_timeout: Duration::from_secs(config.browser_timeout_secs),
            user_agent: config.user_agent.clone(),
            chrome_path: config.chrome_path.clone(),
            auto_install: config.auto_install_browser,
            install_cmd: config.browser_install_cmd.clone(),
        }
    }
}

/// Launches a fresh Chromium process with a throwaway profile per session.
pub struct ChromiumEngine {
    settings: ChromiumSettings,
    provisioner: BrowserProvisioner,
}

impl ChromiumEngine {
    #[must_use]
    pub fn new(settings: ChromiumSettings) -> Self {
        let provisioner = BrowserProvisioner::new(settings.install_cmd.clone());
        Self {
            settings,
            provisioner,
        }
    }

    async fn launch(&self, profile_dir: &Path) -> Result<(Browser, JoinHandle<()>), ScraperError> {
        let mut builder = BrowserConfig::builder()
            .user_data_dir(profile_dir)
            .window_size(1400, 900)
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu")
            .arg("--no-first-run")
            .arg(format!("--user-agent={}", self.settings.user_agent));
        if let Some(path) = &self.settings.chrome_path {
            builder = builder.chrome_executable(path);
        }
        let config = builder.build().map_err(ScraperError::Browser)?;

        let (browser, mut handler) = Browser::launch(config).await?;
        let handler_task = tokio::spawn(async move { while handler.next().await.is_some() {} });
        Ok((browser, handler_task))
    }

    /// Launches, provisioning the runtime and retrying once when the binary
    /// is missing and auto-install is enabled.
    async fn launch_with_provisioning(
        &self,
        profile_dir: &Path,
    ) -> Result<(Browser, JoinHandle<()>), ScraperError> {
        match self.launch(profile_dir).await {
            Ok(launched) => Ok(launched),
            Err(err) if is_missing_browser_error(&err) => {
                if !self.settings.auto_install {
                    tracing::warn!(error = %err, "{MISSING_BROWSER_WARNING}");
                    return Err(err);
                }
                match self.provisioner.provision_once().await {
                    Ok(true) => self.launch(profile_dir).await,
                    Ok(false) => Err(err),
                    Err(provision_err) => {
                        tracing::warn!(error = %provision_err, "{MISSING_BROWSER_WARNING}");
                        Err(provision_err)
                    }
                }
            }
            Err(err) => Err(err),
        }
    }
}

#[async_trait]
impl CaptureEngine for ChromiumEngine {
    async fn open_session(&self, url: &str) -> Result<Box<dyn CaptureSession>, ScraperError> {
        let deadline = Instant::now() + self.settings.session_timeout;
        let profile_dir = std::env::temp_dir().join(format!("menuscan-{}", uuid::Uuid::new_v4()));

        let (browser, handler_task) = match self.launch_with_provisioning(&profile_dir).await {
            Ok(launched) => launched,
            Err(err) => {
                let _ = std::fs::remove_dir_all(&profile_dir);
                return Err(err);
            }
        };
        tracing::debug!(url, profile = %profile_dir.display(), "browser launched");

        // From here on the session owns the process; dropping it kills Chromium.
        let mut session = ChromiumSession {
            browser: Some(browser),
            page: None,
            handler_task,
            listener_task: None,
            responses: None,
            deadline,
            timeout_secs: self.settings.session_timeout.as_secs(),
            profile_dir,
        };
        session.prepare_page().await?;
        if keep_after_initial_navigation(session.navigate(url).await)? {
            session.dismiss_age_gate().await;
        } else {
            tracing::warn!(url, "initial load hit the session deadline");
        }

        Ok(Box::new(session))
    }
}

pub struct ChromiumSession {
    browser: Option<Browser>,
    page: Option<Page>,
    handler_task: JoinHandle<()>,
    listener_task: Option<JoinHandle<()>>,
    responses: Option<ResponseStream>,
    deadline: Instant,
    timeout_secs: u64,
    profile_dir: PathBuf,
}

impl ChromiumSession {
    fn page(&self) -> Result<&Page, ScraperError> {
        self.page
            .as_ref()
            .ok_or_else(|| ScraperError::Browser("session has no open page".to_owned()))
    }

    fn timeout_error(&self) -> ScraperError {
        ScraperError::Timeout {
            stage: "browser session".to_owned(),
            secs: self.timeout_secs,
        }
    }

    /// Opens a blank page, registers the age-gate init script and attaches
    /// the response listener. Must run before the first navigation.
    async fn prepare_page(&mut self) -> Result<(), ScraperError> {
        let browser = self
            .browser
            .as_ref()
            .ok_or_else(|| ScraperError::Browser("browser already closed".to_owned()))?;
        let page = browser.new_page("about:blank").await?;
        page.execute(AddScriptToEvaluateOnNewDocumentParams::new(
            AGE_GATE_INIT_SCRIPT,
        ))
        .await?;

        let received = page.event_listener::<EventResponseReceived>().await?;
        let finished = page.event_listener::<EventLoadingFinished>().await?;
        let (sender, stream) = ResponseStream::channel();
        self.listener_task = Some(tokio::spawn(forward_responses(
            page.clone(),
            received,
            finished,
            sender,
        )));
        self.responses = Some(stream);
        self.page = Some(page);
        Ok(())
    }

    async fn dismiss_age_gate(&mut self) {
        let Ok(page) = self.page() else {
            return;
        };
        let clicked = match tokio::time::timeout_at(self.deadline, page.evaluate(dismiss_script()))
            .await
        {
            Ok(Ok(result)) => result.into_value::<bool>().unwrap_or(false),
            Ok(Err(e)) => {
                tracing::debug!(error = %e, "age-gate script failed");
                false
            }
            Err(_) => false,
        };
        if clicked {
            tracing::debug!("age gate dismissed");
            tokio::time::sleep(POST_AGE_GATE_DELAY).await;
        }
    }

    fn remove_profile_dir(&self) {
        if let Err(e) = std::fs::remove_dir_all(&self.profile_dir) {
            tracing::debug!(error = %e, path = %self.profile_dir.display(), "profile dir cleanup failed");
        }
    }
}

#[async_trait]
impl CaptureSession for ChromiumSession {
    async fn navigate(&mut self, url: &str) -> Result<(), ScraperError> {
        let page = self.page()?;
        match tokio::time::timeout_at(self.deadline, page.goto(url)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                return Err(ScraperError::Navigation {
                    url: url.to_owned(),
                    reason: e.to_string(),
                })
            }
            Err(_) => return Err(self.timeout_error()),
        }
        tokio::time::sleep(POST_NAVIGATION_DELAY).await;
        Ok(())
    }

    async fn rendered_html(&mut self) -> Result<String, ScraperError> {
        let page = self.page()?;
        tokio::time::timeout_at(self.deadline, page.content())
            .await
            .map_err(|_| self.timeout_error())?
            .map_err(ScraperError::from)
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>, ScraperError> {
        let page = self.page()?;
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(true)
            .build();
        let bytes = tokio::time::timeout_at(self.deadline, page.screenshot(params))
            .await
            .map_err(|_| self.timeout_error())??;
        if bytes.is_empty() {
            return Err(ScraperError::CaptureEmpty {
                url: self.current_url().await.unwrap_or_default(),
            });
        }
        Ok(bytes)
    }

    async fn scroll(&mut self, steps: u32) -> Result<(), ScraperError> {
        for _ in 0..steps {
            if self.is_expired() {
                return Err(self.timeout_error());
            }
            self.page()?
                .evaluate("window.scrollBy(0, window.innerHeight * 3)")
                .await?;
            tokio::time::sleep(SCROLL_STEP_DELAY).await;
        }
        Ok(())
    }

    async fn current_url(&mut self) -> Option<String> {
        let page = self.page.as_ref()?;
        page.url().await.ok().flatten()
    }

    fn captured_responses(&mut self) -> &mut ResponseStream {
        self.responses.get_or_insert_with(|| ResponseStream::channel().1)
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    async fn close(&mut self) -> Result<(), ScraperError> {
        if let Some(task) = self.listener_task.take() {
            task.abort();
        }
        self.page = None;
        let result = match self.browser.take() {
            Some(mut browser) => {
                let closed = browser.close().await.map(|_| ());
                let _ = browser.wait().await;
                closed.map_err(ScraperError::from)
            }
            None => Ok(()),
        };
        self.handler_task.abort();
        self.remove_profile_dir();
        result
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        if let Some(task) = self.listener_task.take() {
            task.abort();
        }
        self.handler_task.abort();
        if self.browser.take().is_some() {
            // Browser's own drop kills the child process.
            self.remove_profile_dir();
        }
    }
}

/// Pairs `responseReceived` with `loadingFinished` for matching requests and
/// forwards the body once it is complete.
async fn forward_responses(
    page: Page,
    mut received: EventStream<EventResponseReceived>,
    mut finished: EventStream<EventLoadingFinished>,
    mut sender: ResponseSender,
) {
    let mut pending: HashMap<String, (String, u16)> = HashMap::new();
    loop {
        tokio::select! {
            biased;
            Some(event) = received.next() => {
                let response = &event.response;
                if should_capture(&response.url, &response.mime_type) {
                    let status = u16::try_from(response.status).unwrap_or_default();
                    pending.insert(
                        event.request_id.inner().clone(),
                        (response.url.clone(), status),
                    );
                }
            }
            Some(event) = finished.next() => {
                let Some((url, status)) = pending.remove(event.request_id.inner()) else {
                    continue;
                };
                match page
                    .execute(GetResponseBodyParams::new(event.request_id.clone()))
                    .await
                {
                    Ok(reply) if !reply.result.base64_encoded => {
                        let body = reply.result.body.clone();
                        if body.trim().is_empty() {
                            continue;
                        }
                        tracing::debug!(url, status, bytes = body.len(), "captured response");
                        if !sender.push(url, status, body) {
                            break;
                        }
                    }
                    Ok(_) => tracing::debug!(url, "skipping binary response body"),
                    Err(e) => tracing::debug!(url, error = %e, "could not read response body"),
                }
            }
            else => break,
        }
    }
}
