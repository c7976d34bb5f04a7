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

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

/// 引擎错误类型
#[derive(Error, Debug)]
pub enum EngineError {
    /// 浏览器启动或连接失败
    #[error("Browser unavailable: {0}")]
    Launch(String),
    /// 页面导航失败
    #[error("Navigation failed: {0}")]
    Navigation(String),
    /// 脚本执行失败
    #[error("Script evaluation failed: {0}")]
    Script(String),
    /// 超时
    #[error("Timeout")]
    Timeout,
    /// 其他错误
    #[error("Other error: {0}")]
    Other(String),
}

impl EngineError {
    /// 判断错误是否意味着浏览器本身不可用
    pub fn is_unavailable(&self) -> bool {
        matches!(self, EngineError::Launch(_))
    }
}

/// 会话选项
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// 会话标识，仅用于日志关联
    pub session_id: String,
    /// 单个页面操作的超时时间
    pub page_timeout: Duration,
}

/// 浏览器会话
///
/// 一个会话对应一个标签页，在多次操作之间保留页面状态
#[async_trait]
pub trait BrowserSession: Send {
    /// 导航到指定地址并等待页面加载
    async fn navigate(&mut self, url: &str) -> Result<(), EngineError>;

    /// 执行一个 `() => ...` 形式的 JS 函数并返回布尔结果
    async fn evaluate_bool(&mut self, function: &str) -> Result<bool, EngineError>;

    /// 当前页面的完整 HTML
    async fn html(&mut self) -> Result<String, EngineError>;

    /// 关闭会话
    async fn close(self: Box<Self>) -> Result<(), EngineError>;

    /// 轮询 JS 谓词直到返回 `true`
    ///
    /// 超过 `timeout` 仍未满足时返回 `EngineError::Timeout`
    async fn wait_for(
        &mut self,
        predicate: &str,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<(), EngineError> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.evaluate_bool(predicate).await? {
                return Ok(());
            }
            if Instant::now() + poll_interval > deadline {
                return Err(EngineError::Timeout);
            }
            tokio::time::sleep(poll_interval).await;
        }
    }
}

/// 浏览器引擎特质
#[async_trait]
pub trait BrowserEngine: Send + Sync {
    /// 打开一个新的会话
    async fn open_session(
        &self,
        options: &SessionOptions,
    ) -> Result<Box<dyn BrowserSession>, EngineError>;

    /// 引擎名称
    fn name(&self) -> &'static str;
}
