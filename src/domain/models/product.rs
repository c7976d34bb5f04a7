// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 商品
///
/// 搜索结果列表中单个商品卡片的数据，缺失的可选字段序列化为 `null`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Product {
    /// 商品名称
    pub product_name: String,
    /// 商品详情链接
    pub product_url: String,
    /// 列表中显示的价格
    #[serde(default)]
    pub price: Option<String>,
    /// 产地
    #[serde(default)]
    pub country: Option<String>,
    /// 列表中显示的评分
    #[serde(default)]
    pub rating: Option<String>,
    /// 主图地址
    #[serde(default)]
    pub image_url: Option<String>,
}

impl Product {
    /// 从提取出的记录构建商品
    ///
    /// `product_name` 和 `product_url` 缺失时返回错误
    pub fn from_record(record: Map<String, Value>) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(record))
    }
}
