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

use axum::{
    extract::{rejection::QueryRejection, Extension, Query},
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;
use validator::Validate;

use crate::{
    application::dto::scrape_request::ScrapeQueryDto,
    domain::{models::product::Product, services::scrape_service::ScrapeService},
    presentation::errors::{AppError, RequestValidationError},
};

/// 搜索并抓取商品列表
pub async fn scrape(
    Extension(service): Extension<Arc<ScrapeService>>,
    query: Result<Query<ScrapeQueryDto>, QueryRejection>,
) -> Result<Json<Vec<Product>>, AppError> {
    let Query(params) = query.map_err(|e| RequestValidationError(e.body_text()))?;
    params.validate()?;

    let search_term = params
        .search_term
        .as_deref()
        .map(str::trim)
        .ok_or_else(|| RequestValidationError("searchTerm is required".to_string()))?;
    let max_pages = params
        .max_pages
        .unwrap_or_else(|| service.default_max_pages());

    info!("Scrape requested for '{}' ({} pages)", search_term, max_pages);
    let products = service.scrape(search_term, max_pages).await?;
    Ok(Json(products))
}

/// 避免浏览器请求 favicon 时产生 404
pub async fn favicon() -> Json<Value> {
    Json(json!({}))
}
