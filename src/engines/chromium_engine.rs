// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::BrowserSettings;
use crate::engines::traits::{BrowserEngine, BrowserSession, EngineError, SessionOptions};
use async_trait::async_trait;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Chromium 引擎
///
/// 基于 chromiumoxide 的无头浏览器引擎。浏览器进程在第一次打开会话时启动
/// （或连接到远程调试地址），之后所有会话共享该进程，每个会话一个标签页。
/// 浏览器的事件循环退出后（进程崩溃或远程连接断开），下一次打开会话时重新启动
pub struct ChromiumEngine {
    settings: BrowserSettings,
    browser: Mutex<Option<BrowserHandle>>,
}

/// 共享的浏览器实例及其事件循环状态
#[derive(Clone)]
struct BrowserHandle {
    browser: Arc<Browser>,
    alive: Arc<AtomicBool>,
}

impl BrowserHandle {
    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }
}

impl ChromiumEngine {
    pub fn new(settings: BrowserSettings) -> Self {
        Self {
            settings,
            browser: Mutex::new(None),
        }
    }

    async fn browser(&self) -> Result<BrowserHandle, EngineError> {
        let mut current = self.browser.lock().await;
        if let Some(handle) = current.as_ref() {
            if handle.is_alive() {
                return Ok(handle.clone());
            }
            warn!("Browser connection lost, relaunching");
        }

        // Dropping the old handle releases the dead browser
        *current = None;
        let handle = self.launch().await?;
        *current = Some(handle.clone());
        Ok(handle)
    }

    async fn launch(&self) -> Result<BrowserHandle, EngineError> {
        let remote_debugging_url = self
            .settings
            .remote_debugging_url
            .clone()
            .or_else(|| std::env::var("CHROMIUM_REMOTE_DEBUGGING_URL").ok());

        let (browser, mut handler) = if let Some(ref url) = remote_debugging_url {
            info!("Connecting to remote Chrome instance at: {}", url);
            Browser::connect(url).await.map_err(|e| {
                EngineError::Launch(format!("Failed to connect to remote Chrome: {}", e))
            })?
        } else {
            let mut builder = BrowserConfig::builder()
                .no_sandbox()
                .request_timeout(Duration::from_secs(self.settings.request_timeout_secs))
                .window_size(self.settings.viewport_width, self.settings.viewport_height)
                .viewport(Viewport {
                    width: self.settings.viewport_width,
                    height: self.settings.viewport_height,
                    ..Viewport::default()
                })
                .arg("--disable-gpu")
                .arg("--disable-dev-shm-usage");

            if !self.settings.headless {
                builder = builder.with_head();
            }
            if let Some(ref path) = self.settings.chrome_executable {
                builder = builder.chrome_executable(path);
            }

            let config = builder.build().map_err(EngineError::Launch)?;
            info!(
                "Launching Chromium (headless: {}, viewport: {}x{})",
                self.settings.headless, self.settings.viewport_width, self.settings.viewport_height
            );
            Browser::launch(config)
                .await
                .map_err(|e| EngineError::Launch(e.to_string()))?
        };

        // Spawn a handler to process browser events
        let alive = Arc::new(AtomicBool::new(true));
        let handler_alive = alive.clone();
        tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if let Err(e) = h {
                    warn!("Browser handler stopped: {}", e);
                    break;
                }
            }
            handler_alive.store(false, Ordering::SeqCst);
            debug!("Browser event loop ended");
        });

        Ok(BrowserHandle {
            browser: Arc::new(browser),
            alive,
        })
    }
}

#[async_trait]
impl BrowserEngine for ChromiumEngine {
    async fn open_session(
        &self,
        options: &SessionOptions,
    ) -> Result<Box<dyn BrowserSession>, EngineError> {
        let handle = self.browser().await?;
        let page = with_timeout(options.page_timeout, handle.browser.new_page("about:blank"))
            .await?
            .map_err(|e| open_tab_error(handle.is_alive(), e))?;

        debug!(session_id = %options.session_id, "Opened browser tab");
        Ok(Box::new(ChromiumSession {
            page,
            session_id: options.session_id.clone(),
            timeout: options.page_timeout,
        }))
    }

    fn name(&self) -> &'static str {
        "chromium"
    }
}

/// 单个标签页上的会话
struct ChromiumSession {
    page: Page,
    session_id: String,
    timeout: Duration,
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn navigate(&mut self, url: &str) -> Result<(), EngineError> {
        // goto waits for the load event
        with_timeout(self.timeout, self.page.goto(url))
            .await?
            .map_err(|e| EngineError::Navigation(e.to_string()))?;
        Ok(())
    }

    async fn evaluate_bool(&mut self, function: &str) -> Result<bool, EngineError> {
        let result = with_timeout(self.timeout, self.page.evaluate_function(function))
            .await?
            .map_err(|e| EngineError::Script(e.to_string()))?;
        result
            .into_value::<bool>()
            .map_err(|e| EngineError::Script(e.to_string()))
    }

    async fn html(&mut self) -> Result<String, EngineError> {
        with_timeout(self.timeout, self.page.content())
            .await?
            .map_err(|e| EngineError::Other(e.to_string()))
    }

    async fn close(self: Box<Self>) -> Result<(), EngineError> {
        let ChromiumSession {
            page, session_id, ..
        } = *self;
        page.close()
            .await
            .map_err(|e| EngineError::Other(e.to_string()))?;
        debug!(session_id = %session_id, "Closed browser tab");
        Ok(())
    }
}

/// 打开标签页失败时，事件循环已退出说明浏览器本身不可用
fn open_tab_error(browser_alive: bool, error: impl Display) -> EngineError {
    if browser_alive {
        EngineError::Other(format!("Failed to open tab: {}", error))
    } else {
        EngineError::Launch(format!("Browser connection lost: {}", error))
    }
}

async fn with_timeout<F: Future>(timeout: Duration, future: F) -> Result<F::Output, EngineError> {
    tokio::time::timeout(timeout, future)
        .await
        .map_err(|_| EngineError::Timeout)
}
