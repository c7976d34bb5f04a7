// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use metrics::{counter, gauge, histogram};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use crate::config::settings::ScraperSettings;
use crate::domain::models::product::Product;
use crate::domain::services::extraction_service::{
    ExtractionError, ExtractionSchema, ExtractionService,
};
use crate::engines::traits::{BrowserEngine, BrowserSession, EngineError, SessionOptions};
use crate::infrastructure::metrics::{
    BROWSER_SESSIONS_ACTIVE, PRODUCTS_EXTRACTED_TOTAL, PRODUCTS_REJECTED_TOTAL,
    SCRAPE_DURATION_SECONDS, SCRAPE_FAILURES_TOTAL, SCRAPE_PAGES_TOTAL,
    SCRAPE_PAGE_FAILURES_TOTAL, SCRAPE_REQUESTS_TOTAL,
};

/// 页面上仍有“加载更多”按钮时 HTML 中出现的标记
pub const LOAD_MORE_MARKER: &str = "button-load-more";

/// 点击“加载更多”按钮，按钮不存在时返回 `false`
pub const LOAD_MORE_SCRIPT: &str = r#"() => {
    const btn = document.querySelector('button[data-testid="button-load-more"]');
    if (btn) { btn.click(); return true; }
    return false;
}"#;

/// 搜索参数名
const SEARCH_TERM_PARAM: &str = "searchTerm";

/// 抓取错误类型
#[derive(Error, Debug)]
pub enum ScrapeError {
    /// 搜索地址无效
    #[error("invalid search url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// 浏览器引擎错误
    #[error(transparent)]
    Engine(#[from] EngineError),
    /// 会话池已关闭
    #[error("scraper is shutting down")]
    Closed,
}

/// 商品抓取服务
///
/// 打开搜索结果页，反复点击“加载更多”直到没有新商品、按钮消失或达到页数上限，
/// 每次只提取新出现的商品卡片
pub struct ScrapeService {
    engine: Arc<dyn BrowserEngine>,
    extractor: ExtractionService,
    settings: ScraperSettings,
    sessions: Arc<Semaphore>,
}

impl ScrapeService {
    /// 使用默认商品卡片模式创建服务
    pub fn new(
        engine: Arc<dyn BrowserEngine>,
        settings: ScraperSettings,
        max_sessions: usize,
    ) -> Result<Self, ExtractionError> {
        Self::with_schema(engine, &ExtractionSchema::product_pods(), settings, max_sessions)
    }

    pub fn with_schema(
        engine: Arc<dyn BrowserEngine>,
        schema: &ExtractionSchema,
        settings: ScraperSettings,
        max_sessions: usize,
    ) -> Result<Self, ExtractionError> {
        Ok(Self {
            engine,
            extractor: ExtractionService::new(schema)?,
            settings,
            sessions: Arc::new(Semaphore::new(max_sessions.max(1))),
        })
    }

    /// 默认最大翻页次数
    pub fn default_max_pages(&self) -> u32 {
        self.settings.max_pages
    }

    /// 构建搜索地址，搜索词经过 URL 编码
    pub fn search_url(&self, search_term: &str) -> Result<Url, ScrapeError> {
        let mut url = Url::parse(&self.settings.base_url)?;
        url.query_pairs_mut()
            .append_pair(SEARCH_TERM_PARAM, search_term);
        Ok(url)
    }

    /// 抓取搜索结果
    ///
    /// # 参数
    ///
    /// * `search_term` - 搜索词
    /// * `max_pages` - 最多加载的页数（首屏算一页）
    ///
    /// # 返回值
    ///
    /// * `Ok(Vec<Product>)` - 按页面顺序排列、按链接去重的商品，单页失败时返回已抓取的部分
    /// * `Err(ScrapeError)` - 无法打开浏览器会话
    pub async fn scrape(
        &self,
        search_term: &str,
        max_pages: u32,
    ) -> Result<Vec<Product>, ScrapeError> {
        let url = self.search_url(search_term)?;
        counter!(SCRAPE_REQUESTS_TOTAL).increment(1);
        let start = Instant::now();

        let permit = self
            .sessions
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ScrapeError::Closed)?;

        let options = SessionOptions {
            session_id: Uuid::new_v4().to_string(),
            page_timeout: self.settings.page_timeout(),
        };
        info!(
            session_id = %options.session_id,
            engine = self.engine.name(),
            "Scraping {} (max pages: {})",
            url,
            max_pages
        );

        let session = match self.engine.open_session(&options).await {
            Ok(session) => session,
            Err(e) => {
                counter!(SCRAPE_FAILURES_TOTAL).increment(1);
                return Err(e.into());
            }
        };
        let mut guard = SessionGuard::new(session, permit, options.session_id.clone());

        let products = match guard.session.as_deref_mut() {
            Some(session) => {
                self.paginate(session, url.as_str(), max_pages, &options.session_id)
                    .await
            }
            None => Vec::new(),
        };
        guard.close().await;

        counter!(PRODUCTS_EXTRACTED_TOTAL).increment(products.len() as u64);
        histogram!(SCRAPE_DURATION_SECONDS).record(start.elapsed().as_secs_f64());
        info!(
            session_id = %options.session_id,
            "Scraped {} products in {:?}",
            products.len(),
            start.elapsed()
        );
        Ok(products)
    }

    async fn paginate(
        &self,
        session: &mut dyn BrowserSession,
        url: &str,
        max_pages: u32,
        session_id: &str,
    ) -> Vec<Product> {
        let mut products = Vec::new();
        let mut seen_urls = HashSet::new();
        let mut consumed = 0;

        for page in 0..max_pages {
            let html = match self.load_page(session, url, page, consumed).await {
                Ok(Some(html)) => html,
                Ok(None) => {
                    debug!(session_id, page, "No load-more button left");
                    break;
                }
                Err(e) => {
                    counter!(SCRAPE_PAGE_FAILURES_TOTAL).increment(1);
                    warn!(session_id, page, "Page load failed: {}", e);
                    break;
                }
            };
            counter!(SCRAPE_PAGES_TOTAL).increment(1);

            let (records, total) = self.extractor.extract_after(&html, consumed);
            consumed = consumed.max(total);
            if records.is_empty() {
                debug!(session_id, page, "No new products on page");
                break;
            }

            for record in records {
                match Product::from_record(record) {
                    Ok(product) => {
                        if seen_urls.insert(product.product_url.clone()) {
                            products.push(product);
                        }
                    }
                    Err(e) => {
                        counter!(PRODUCTS_REJECTED_TOTAL).increment(1);
                        warn!(session_id, page, "Skipping incomplete product: {}", e);
                    }
                }
            }
            debug!(session_id, page, total, "Collected {} products so far", products.len());

            if !html.contains(LOAD_MORE_MARKER) {
                break;
            }
        }

        products
    }

    /// 加载一页
    ///
    /// 首页直接导航；之后每页点击“加载更多”并等待商品卡片数超过 `consumed`。
    /// 按钮不存在时返回 `Ok(None)`
    async fn load_page(
        &self,
        session: &mut dyn BrowserSession,
        url: &str,
        page: u32,
        consumed: usize,
    ) -> Result<Option<String>, EngineError> {
        if page == 0 {
            session.navigate(url).await?;
        } else {
            if !session.evaluate_bool(LOAD_MORE_SCRIPT).await? {
                return Ok(None);
            }
            session
                .wait_for(
                    &self.more_items_script(consumed),
                    self.settings.page_timeout(),
                    self.settings.wait_poll_interval(),
                )
                .await?;
        }
        session.html().await.map(Some)
    }

    fn more_items_script(&self, consumed: usize) -> String {
        // serde_json produces a valid JS string literal
        let selector = serde_json::to_string(self.extractor.base_selector())
            .unwrap_or_else(|_| "\"\"".to_string());
        format!(
            "() => document.querySelectorAll({}).length > {}",
            selector, consumed
        )
    }
}

/// 已打开的浏览器会话
///
/// 持有标签页和会话许可。正常结束时调用 `close`；请求在中途被取消时，
/// `Drop` 在后台关闭标签页，许可在标签页关闭之后才归还
struct SessionGuard {
    session: Option<Box<dyn BrowserSession>>,
    permit: Option<OwnedSemaphorePermit>,
    session_id: String,
}

impl SessionGuard {
    fn new(
        session: Box<dyn BrowserSession>,
        permit: OwnedSemaphorePermit,
        session_id: String,
    ) -> Self {
        gauge!(BROWSER_SESSIONS_ACTIVE).increment(1.0);
        Self {
            session: Some(session),
            permit: Some(permit),
            session_id,
        }
    }

    async fn close(mut self) {
        if let Some(session) = self.session.take() {
            let session_id = std::mem::take(&mut self.session_id);
            close_session(session, session_id, self.permit.take()).await;
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        let session_id = std::mem::take(&mut self.session_id);
        let permit = self.permit.take();
        warn!(session_id = %session_id, "Scrape cancelled, closing browser session in background");

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(close_session(session, session_id, permit));
            }
            Err(_) => {
                gauge!(BROWSER_SESSIONS_ACTIVE).decrement(1.0);
                warn!(session_id = %session_id, "No runtime left to close browser session");
            }
        }
    }
}

async fn close_session(
    session: Box<dyn BrowserSession>,
    session_id: String,
    _permit: Option<OwnedSemaphorePermit>,
) {
    if let Err(e) = session.close().await {
        warn!(session_id = %session_id, "Failed to close browser session: {}", e);
    }
    gauge!(BROWSER_SESSIONS_ACTIVE).decrement(1.0);
}
