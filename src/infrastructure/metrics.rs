// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::{info, warn};

use crate::config::settings::MetricsSettings;

pub const SCRAPE_REQUESTS_TOTAL: &str = "scrape_requests_total";
pub const SCRAPE_FAILURES_TOTAL: &str = "scrape_failures_total";
pub const SCRAPE_PAGES_TOTAL: &str = "scrape_pages_total";
pub const SCRAPE_PAGE_FAILURES_TOTAL: &str = "scrape_page_failures_total";
pub const PRODUCTS_EXTRACTED_TOTAL: &str = "products_extracted_total";
pub const PRODUCTS_REJECTED_TOTAL: &str = "products_rejected_total";
pub const SCRAPE_DURATION_SECONDS: &str = "scrape_duration_seconds";
pub const BROWSER_SESSIONS_ACTIVE: &str = "browser_sessions_active";

/// 初始化指标系统
///
/// 未启用时不安装导出器，`metrics` 宏调用变为空操作
pub fn init_metrics(settings: &MetricsSettings) -> anyhow::Result<()> {
    if !settings.enabled {
        return Ok(());
    }

    let addr: SocketAddr = settings.listen_addr.parse()?;

    // Ignore error if address is already in use (for development/testing)
    if let Err(e) = PrometheusBuilder::new().with_http_listener(addr).install() {
        warn!(
            "Failed to install Prometheus recorder: {}. This might happen if the port is already in use.",
            e
        );
        return Ok(());
    }

    describe_counter!(SCRAPE_REQUESTS_TOTAL, "Total number of scrape requests");
    describe_counter!(
        SCRAPE_FAILURES_TOTAL,
        "Total number of scrape requests that could not open a browser session"
    );
    describe_counter!(SCRAPE_PAGES_TOTAL, "Total number of listing pages loaded");
    describe_counter!(
        SCRAPE_PAGE_FAILURES_TOTAL,
        "Total number of listing page passes that failed"
    );
    describe_counter!(PRODUCTS_EXTRACTED_TOTAL, "Total number of products returned");
    describe_counter!(
        PRODUCTS_REJECTED_TOTAL,
        "Total number of extracted records missing required fields"
    );
    describe_histogram!(
        SCRAPE_DURATION_SECONDS,
        "Duration of scrape requests in seconds"
    );
    describe_gauge!(BROWSER_SESSIONS_ACTIVE, "Number of open browser tabs");

    info!("Metrics exporter listening on {}", addr);
    Ok(())
}
