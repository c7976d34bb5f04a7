// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域模型模块
///
/// 商品（product）：搜索结果列表中的一个商品卡片
pub mod product;
