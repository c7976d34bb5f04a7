// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// 提取错误类型
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// 选择器无效
    #[error("invalid selector `{selector}`: {reason}")]
    InvalidSelector { selector: String, reason: String },
    /// 属性字段缺少属性名
    #[error("field `{0}` has type attribute but no attribute name")]
    MissingAttribute(String),
    /// 模式 JSON 无效
    #[error("invalid extraction schema: {0}")]
    InvalidSchema(#[from] serde_json::Error),
}

/// 字段取值方式
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// 元素文本
    Text,
    /// 元素属性
    Attribute,
    /// 元素内部 HTML
    Html,
}

/// 提取规则
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldRule {
    pub name: String,
    pub selector: String,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

/// CSS 提取模式
///
/// 每个匹配 `base_selector` 的元素生成一条记录，
/// `fields` 中的选择器在该元素内部求值
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionSchema {
    pub name: String,
    pub base_selector: String,
    pub fields: Vec<FieldRule>,
}

impl ExtractionSchema {
    /// 搜索结果页商品卡片的默认模式
    pub fn product_pods() -> Self {
        let text = |name: &str, selector: &str| FieldRule {
            name: name.to_string(),
            selector: selector.to_string(),
            kind: FieldKind::Text,
            attribute: None,
        };
        let attribute = |name: &str, selector: &str, attribute: &str| FieldRule {
            name: name.to_string(),
            selector: selector.to_string(),
            kind: FieldKind::Attribute,
            attribute: Some(attribute.to_string()),
        };

        Self {
            name: "Product Block".to_string(),
            base_selector: "article[data-testid='product-pod']".to_string(),
            fields: vec![
                text("product_name", "h2[data-testid='product-pod-name']"),
                attribute("product_url", "a.nameLink___iKLUD", "href"),
                text("price", "span.redText___eRw74"),
                text(
                    "country",
                    "div[data-testid] > span[data-testid='typography']",
                ),
                text("rating", "span.srOnly___sJU_Z"),
                attribute("image_url", "img", "src"),
            ],
        }
    }

    /// 从 JSON 解析模式并校验所有选择器
    pub fn from_json(json: &str) -> Result<Self, ExtractionError> {
        let schema: Self = serde_json::from_str(json)?;
        ExtractionService::new(&schema)?;
        Ok(schema)
    }
}

struct CompiledField {
    name: String,
    selector: Selector,
    kind: FieldKind,
    attribute: Option<String>,
}

/// 提取服务
///
/// 负责按 CSS 模式从 HTML 内容中提取结构化记录。选择器在构造时编译一次，
/// 之后可在多次提取之间复用
pub struct ExtractionService {
    base_selector: String,
    base: Selector,
    fields: Vec<CompiledField>,
}

fn parse_selector(selector: &str) -> Result<Selector, ExtractionError> {
    Selector::parse(selector).map_err(|e| ExtractionError::InvalidSelector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

impl ExtractionService {
    pub fn new(schema: &ExtractionSchema) -> Result<Self, ExtractionError> {
        let base = parse_selector(&schema.base_selector)?;
        let fields = schema
            .fields
            .iter()
            .map(|rule| {
                if rule.kind == FieldKind::Attribute && rule.attribute.is_none() {
                    return Err(ExtractionError::MissingAttribute(rule.name.clone()));
                }
                Ok(CompiledField {
                    name: rule.name.clone(),
                    selector: parse_selector(&rule.selector)?,
                    kind: rule.kind,
                    attribute: rule.attribute.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            base_selector: schema.base_selector.clone(),
            base,
            fields,
        })
    }

    /// 基础选择器
    pub fn base_selector(&self) -> &str {
        &self.base_selector
    }

    /// 提取数据
    ///
    /// 按文档顺序返回记录。未匹配的元素、缺失的属性和空文本不会出现在记录中，
    /// 没有任何字段的记录被丢弃
    pub fn extract(&self, html_content: &str) -> Vec<Map<String, Value>> {
        self.extract_after(html_content, 0).0
    }

    /// 跳过前 `skip` 个基础元素后提取
    ///
    /// 返回新记录以及页面中基础元素的总数，供增量加载的页面只处理新出现的元素
    pub fn extract_after(&self, html_content: &str, skip: usize) -> (Vec<Map<String, Value>>, usize) {
        let document = Html::parse_document(html_content);
        let mut total = 0;
        let mut records = Vec::new();

        for (index, element) in document.select(&self.base).enumerate() {
            total = index + 1;
            if index < skip {
                continue;
            }
            let record: Map<String, Value> = self
                .fields
                .iter()
                .filter_map(|field| {
                    self.extract_field(element, field)
                        .map(|v| (field.name.clone(), Value::String(v)))
                })
                .collect();
            if !record.is_empty() {
                records.push(record);
            }
        }

        (records, total)
    }

    /// 页面中匹配基础选择器的元素数量
    pub fn count(&self, html_content: &str) -> usize {
        Html::parse_document(html_content)
            .select(&self.base)
            .count()
    }

    fn extract_field(&self, element: ElementRef<'_>, field: &CompiledField) -> Option<String> {
        let target = element.select(&field.selector).next()?;

        let value = match field.kind {
            FieldKind::Text => normalize_whitespace(&target.text().collect::<Vec<_>>().join(" ")),
            FieldKind::Attribute => target
                .value()
                .attr(field.attribute.as_deref()?)?
                .trim()
                .to_string(),
            FieldKind::Html => target.inner_html().trim().to_string(),
        };

        (!value.is_empty()).then_some(value)
    }
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
