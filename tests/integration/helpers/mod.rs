// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use axum_test::TestServer;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use waitrose_scraper::config::settings::ScraperSettings;
use waitrose_scraper::domain::services::scrape_service::{ScrapeService, LOAD_MORE_SCRIPT};
use waitrose_scraper::engines::traits::{
    BrowserEngine, BrowserSession, EngineError, SessionOptions,
};
use waitrose_scraper::presentation::routes;

#[allow(dead_code)]
pub struct TestApp {
    pub server: TestServer,
    pub engine: Arc<ScriptedEngine>,
}

/// Browser double that serves a fixed sequence of listing snapshots.
pub struct ScriptedEngine {
    pages: Vec<String>,
    available: bool,
    pub navigated: Arc<Mutex<Vec<String>>>,
    pub sessions_opened: AtomicUsize,
    pub sessions_closed: Arc<AtomicUsize>,
}

impl ScriptedEngine {
    pub fn new(pages: Vec<String>) -> Self {
        Self {
            pages,
            available: true,
            navigated: Arc::new(Mutex::new(Vec::new())),
            sessions_opened: AtomicUsize::new(0),
            sessions_closed: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new(Vec::new())
        }
    }
}

struct ScriptedSession {
    pages: Vec<String>,
    current: usize,
    navigated: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicUsize>,
}

#[async_trait]
impl BrowserEngine for ScriptedEngine {
    async fn open_session(
        &self,
        _options: &SessionOptions,
    ) -> Result<Box<dyn BrowserSession>, EngineError> {
        if !self.available {
            return Err(EngineError::Launch("Chromium executable not found".to_string()));
        }
        self.sessions_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedSession {
            pages: self.pages.clone(),
            current: 0,
            navigated: self.navigated.clone(),
            closed: self.sessions_closed.clone(),
        }))
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

#[async_trait]
impl BrowserSession for ScriptedSession {
    async fn navigate(&mut self, url: &str) -> Result<(), EngineError> {
        self.navigated
            .lock()
            .expect("navigation log poisoned")
            .push(url.to_string());
        Ok(())
    }

    async fn evaluate_bool(&mut self, function: &str) -> Result<bool, EngineError> {
        if function == LOAD_MORE_SCRIPT {
            if self.current + 1 < self.pages.len() {
                self.current += 1;
                return Ok(true);
            }
            return Ok(false);
        }
        Ok(true)
    }

    async fn html(&mut self) -> Result<String, EngineError> {
        self.pages
            .get(self.current)
            .cloned()
            .ok_or_else(|| EngineError::Other("no page loaded".to_string()))
    }

    async fn close(self: Box<Self>) -> Result<(), EngineError> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Renders a listing page holding `count` product pods.
pub fn listing(count: usize, has_more: bool) -> String {
    let pods: String = (0..count)
        .map(|i| {
            format!(
                r#"<article data-testid="product-pod">
                    <a class="nameLink___iKLUD" href="/ecom/products/wine-{i}/{i}">
                        <h2 data-testid="product-pod-name">Wine {i}</h2>
                    </a>
                    <span class="redText___eRw74">£{i}.50</span>
                    <div data-testid="meta"><span data-testid="typography">Italy</span></div>
                    <span class="srOnly___sJU_Z">{i} out of 5 stars</span>
                    <img src="https://images.example.com/wine-{i}.jpg">
                </article>"#
            )
        })
        .collect();
    let button = if has_more {
        r#"<button data-testid="button-load-more">Load more</button>"#
    } else {
        ""
    };
    format!("<html><body><main>{pods}</main>{button}</body></html>")
}

pub fn scraper_settings() -> ScraperSettings {
    ScraperSettings {
        base_url: "https://www.waitrose.com/ecom/shop/search".to_string(),
        max_pages: 5,
        page_timeout_secs: 5,
        wait_poll_interval_ms: 10,
    }
}

pub fn create_test_app(engine: ScriptedEngine) -> TestApp {
    let engine = Arc::new(engine);
    let service = ScrapeService::new(engine.clone(), scraper_settings(), 2)
        .expect("Failed to build scrape service");
    let server = TestServer::new(routes::routes(Arc::new(service)))
        .expect("Failed to start test server");

    TestApp { server, engine }
}
