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

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// 单次抓取允许的最大页数
pub const MAX_PAGES_LIMIT: u32 = 20;

/// 应用程序配置设置
///
/// 包含服务器、浏览器、抓取器、日志和指标等所有配置项
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// 服务器配置
    pub server: ServerSettings,
    /// 浏览器配置
    pub browser: BrowserSettings,
    /// 抓取器配置
    pub scraper: ScraperSettings,
    /// 日志配置
    pub logging: LoggingSettings,
    /// 指标配置
    pub metrics: MetricsSettings,
}

/// 服务器配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// 服务器监听主机地址
    pub host: String,
    /// 服务器监听端口
    pub port: u16,
    /// 运行时工作线程数（0 表示使用 tokio 默认值）
    pub workers: usize,
}

/// 浏览器配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserSettings {
    /// 是否以无头模式运行
    pub headless: bool,
    /// 视口宽度
    pub viewport_width: u32,
    /// 视口高度
    pub viewport_height: u32,
    /// 远程调试地址，设置后连接已有的 Chrome 实例而不是启动新进程
    pub remote_debugging_url: Option<String>,
    /// Chrome 可执行文件路径
    pub chrome_executable: Option<String>,
    /// CDP 请求超时时间（秒）
    pub request_timeout_secs: u64,
    /// 同时打开的最大标签页数
    pub max_sessions: usize,
}

/// 抓取器配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct ScraperSettings {
    /// 搜索页面地址
    pub base_url: String,
    /// 默认最大翻页次数
    pub max_pages: u32,
    /// 单页操作超时时间（秒）
    pub page_timeout_secs: u64,
    /// 等待条件的轮询间隔（毫秒）
    pub wait_poll_interval_ms: u64,
}

/// 日志配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    /// 是否输出 JSON 格式日志
    pub json: bool,
}

/// 指标配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsSettings {
    /// 是否启用 Prometheus 导出
    pub enabled: bool,
    /// Prometheus 监听地址
    pub listen_addr: String,
}

impl ScraperSettings {
    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_secs)
    }

    pub fn wait_poll_interval(&self) -> Duration {
        Duration::from_millis(self.wait_poll_interval_ms)
    }
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 从 `config/` 目录和环境变量加载配置，支持默认值
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        Self::load(Path::new("config"), &env)
    }

    /// 从指定目录加载配置
    ///
    /// 优先级（从低到高）：代码默认值、`<dir>/default`、`<dir>/<env>`、
    /// `SCRAPER__*` 环境变量、`PORT` 环境变量
    pub fn load(config_dir: &Path, env: &str) -> Result<Self, ConfigError> {
        let port_override = std::env::var("PORT").ok();

        let builder = Config::builder()
            // Start with default settings
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 10000)?
            .set_default("server.workers", 0)?
            // Default browser settings
            .set_default("browser.headless", true)?
            .set_default("browser.viewport_width", 1280)?
            .set_default("browser.viewport_height", 800)?
            .set_default("browser.request_timeout_secs", 30)?
            .set_default("browser.max_sessions", 4)?
            // Default scraper settings
            .set_default(
                "scraper.base_url",
                "https://www.waitrose.com/ecom/shop/search",
            )?
            .set_default("scraper.max_pages", 5)?
            .set_default("scraper.page_timeout_secs", 60)?
            .set_default("scraper.wait_poll_interval_ms", 250)?
            // Default logging and metrics settings
            .set_default("logging.json", false)?
            .set_default("metrics.enabled", false)?
            .set_default("metrics.listen_addr", "0.0.0.0:9000")?
            .add_source(File::from(config_dir.join("default")).required(false))
            .add_source(File::from(config_dir.join(env)).required(false))
            .add_source(Environment::with_prefix("SCRAPER").separator("__"))
            .set_override_option("server.port", port_override)?;

        let settings: Self = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_PAGES_LIMIT).contains(&self.scraper.max_pages) {
            return Err(ConfigError::Message(format!(
                "scraper.max_pages must be between 1 and {}, got {}",
                MAX_PAGES_LIMIT, self.scraper.max_pages
            )));
        }
        Ok(())
    }
}
