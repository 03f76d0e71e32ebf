use super::{scripts, ElementQuery, FrameRef, Launcher, Surface};
use crate::config::{DashboardConfig, Point, Timing};
use crate::error::{Result, WatchError};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchMouseEventParams, DispatchMouseEventType, MouseButton,
};
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::{FrameId, NavigateParams};
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::handler::viewport::Viewport as CdpViewport;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Browser, BrowserConfig, Handler, Page};
use futures::StreamExt;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, warn};

/// Launches headless Chromium and loads the dashboard.
pub struct ChromiumLauncher;

#[async_trait]
impl Launcher for ChromiumLauncher {
    async fn open(&self, config: &DashboardConfig) -> Result<Box<dyn Surface>> {
        let session = ChromiumSession::launch(config).await?;
        session.navigate(&config.url, &config.timing).await;
        Ok(Box::new(session))
    }
}

pub struct ChromiumSession {
    browser: Mutex<Browser>,
    page: Page,
    handler_task: JoinHandle<()>,
}

impl ChromiumSession {
    pub async fn launch(config: &DashboardConfig) -> Result<Self> {
        let browser_config = BrowserConfig::builder()
            .no_sandbox()
            .arg("--disable-setuid-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg(format!("--lang={}", config.locale))
            .window_size(config.viewport.width, config.viewport.height)
            .viewport(None::<CdpViewport>)
            .request_timeout(config.timing.navigation_timeout())
            .build()
            .map_err(WatchError::Browser)?;

        let (browser, handler) = Browser::launch(browser_config).await?;
        let handler_task = spawn_handler_task(handler);

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                handler_task.abort();
                return Err(e.into());
            }
        };
        page.set_user_agent(SetUserAgentOverrideParams::new(config.user_agent.clone()))
            .await?;

        info!(
            "Launched Chromium ({}x{}, locale {})",
            config.viewport.width, config.viewport.height, config.locale
        );

        Ok(Self {
            browser: Mutex::new(browser),
            page,
            handler_task,
        })
    }

    /// Loads `url` waiting for network quiescence, then once more with a
    /// relaxed DOM-ready condition. Returns false when both failed; the page
    /// stays usable either way.
    pub async fn navigate(&self, url: &str, timing: &Timing) -> bool {
        let limit = timing.navigation_timeout();

        info!("Loading dashboard...");
        match timeout(limit, self.load_until_idle(url, limit)).await {
            Ok(Ok(())) => return true,
            Ok(Err(e)) => warn!("Network-idle load failed ({}), retrying with DOM ready", e),
            Err(_) => warn!(
                "Network-idle load timed out after {}s, retrying with DOM ready",
                limit.as_secs()
            ),
        }

        match timeout(limit, self.load_until_dom_ready(url, timing.poll_step())).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                warn!("Relaxed load failed ({}), continuing with a degraded page", e);
                false
            }
            Err(_) => {
                warn!("Relaxed load timed out, continuing with a degraded page");
                false
            }
        }
    }

    async fn load_until_idle(&self, url: &str, limit: Duration) -> Result<()> {
        self.page.goto(url).await?;
        let idle: bool = self
            .evaluate(None, scripts::network_idle(limit.as_millis() as u64))
            .await?;
        if idle {
            Ok(())
        } else {
            Err(WatchError::Timeout("network never went idle".to_string()))
        }
    }

    async fn load_until_dom_ready(&self, url: &str, step: Duration) -> Result<()> {
        self.page.execute(NavigateParams::new(url)).await?;
        loop {
            match self.evaluate::<String>(None, scripts::ready_state()).await {
                Ok(state) if state != "loading" => return Ok(()),
                Ok(_) => {}
                Err(e) => debug!("readyState check failed: {}", e),
            }
            sleep(step).await;
        }
    }

    async fn evaluate<T: DeserializeOwned>(
        &self,
        frame: Option<&FrameRef>,
        expression: String,
    ) -> Result<T> {
        let mut builder = EvaluateParams::builder()
            .expression(expression)
            .return_by_value(true)
            .await_promise(true);

        if let Some(frame) = frame.filter(|f| !f.main) {
            let context = self
                .page
                .frame_execution_context(FrameId::new(frame.id.clone()))
                .await?
                .ok_or_else(|| {
                    WatchError::Browser(format!("frame {} has no execution context", frame.id))
                })?;
            builder = builder.context_id(context);
        }

        let params = builder.build().map_err(WatchError::Browser)?;
        let result = self.page.evaluate_expression(params).await?;
        Ok(result.into_value()?)
    }
}

#[async_trait]
impl Surface for ChromiumSession {
    async fn frames(&self) -> Result<Vec<FrameRef>> {
        let main = self.page.mainframe().await?;
        let frames = self.page.frames().await?;

        Ok(frames
            .into_iter()
            .enumerate()
            .map(|(index, id)| FrameRef {
                main: main.as_ref().map_or(index == 0, |m| *m == id),
                id: id.inner().clone(),
            })
            .collect())
    }

    async fn inner_text(&self, frame: &FrameRef) -> Result<String> {
        self.evaluate(Some(frame), scripts::body_text()).await
    }

    async fn click(&self, frame: &FrameRef, query: &ElementQuery) -> Result<bool> {
        self.evaluate(Some(frame), scripts::click_query(query)).await
    }

    async fn candidate_texts(&self, frame: &FrameRef, selector: &str) -> Result<Vec<String>> {
        self.evaluate(Some(frame), scripts::candidate_texts(selector))
            .await
    }

    async fn click_candidate(
        &self,
        frame: &FrameRef,
        selector: &str,
        index: usize,
    ) -> Result<bool> {
        self.evaluate(Some(frame), scripts::click_candidate(selector, index))
            .await
    }

    async fn click_at(&self, point: Point) -> Result<()> {
        for kind in [
            DispatchMouseEventType::MousePressed,
            DispatchMouseEventType::MouseReleased,
        ] {
            let params = DispatchMouseEventParams::builder()
                .r#type(kind)
                .x(point.x)
                .y(point.y)
                .button(MouseButton::Left)
                .click_count(1)
                .build()
                .map_err(WatchError::Browser)?;
            self.page.execute(params).await?;
            sleep(Duration::from_millis(40)).await;
        }
        Ok(())
    }

    async fn screenshot(&self, path: &Path) -> Result<()> {
        self.page
            .save_screenshot(ScreenshotParams::builder().build(), path)
            .await?;
        Ok(())
    }

    async fn close(&self) {
        let started = Instant::now();
        let mut browser = self.browser.lock().await;
        if let Err(e) = browser.close().await {
            warn!("Closing Chromium failed: {}", e);
        }
        if let Err(e) = browser.wait().await {
            warn!("Waiting for Chromium to exit failed: {}", e);
        }
        self.handler_task.abort();
        debug!("Browser closed in {}ms", started.elapsed().as_millis());
    }
}

fn spawn_handler_task(mut handler: Handler) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                debug!("CDP handler event error: {}", e);
            }
        }
    })
}
