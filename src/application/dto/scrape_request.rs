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

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// 抓取查询参数
///
/// 对应 `GET /scrape?searchTerm=...&maxPages=...`
#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct ScrapeQueryDto {
    /// 搜索词（例如 `wine`）
    #[serde(rename = "searchTerm")]
    #[validate(
        required(message = "searchTerm is required"),
        length(max = 200),
        custom(function = "validate_not_blank")
    )]
    pub search_term: Option<String>,
    /// 最多加载的页数，缺省时使用配置值
    #[serde(rename = "maxPages")]
    #[validate(range(min = 1, max = 20))]
    pub max_pages: Option<u32>,
}

fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank").with_message("searchTerm cannot be blank".into()));
    }
    Ok(())
}
