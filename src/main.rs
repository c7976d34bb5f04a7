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

use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use waitrose_scraper::config::settings::Settings;
use waitrose_scraper::domain::services::scrape_service::ScrapeService;
use waitrose_scraper::engines::chromium_engine::ChromiumEngine;
use waitrose_scraper::engines::traits::BrowserEngine;
use waitrose_scraper::infrastructure::metrics;
use waitrose_scraper::presentation::routes;
use waitrose_scraper::utils::telemetry;

/// 主函数
///
/// 应用程序入口点。运行时的工作线程数来自配置，因此手动构建 tokio 运行时
fn main() -> anyhow::Result<()> {
    // 1. Load .env and configuration
    dotenvy::dotenv().ok();
    let settings = Settings::new()?;

    // 2. Initialize logging
    telemetry::init_telemetry(&settings.logging);
    info!("Starting waitrose-scraper...");

    // 3. Build runtime
    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if settings.server.workers > 0 {
        builder.worker_threads(settings.server.workers);
    }
    let runtime = builder.build()?;
    info!(
        "Runtime started with {} worker threads",
        runtime.metrics().num_workers()
    );

    runtime.block_on(serve(settings))
}

async fn serve(settings: Settings) -> anyhow::Result<()> {
    metrics::init_metrics(&settings.metrics)?;

    // Browser is launched lazily on the first scrape
    let engine: Arc<dyn BrowserEngine> = Arc::new(ChromiumEngine::new(settings.browser.clone()));
    let service = Arc::new(ScrapeService::new(
        engine,
        settings.scraper.clone(),
        settings.browser.max_sessions,
    )?);
    info!("Scrape service initialized");

    let app = routes::routes(service);

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// 等待关闭信号（Ctrl+C 或 SIGTERM）
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!("Unable to listen for shutdown signal: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!("Unable to listen for SIGTERM: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
