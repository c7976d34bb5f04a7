// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{create_test_app, listing, ScriptedEngine};
use axum::http::StatusCode;
use serde_json::Value;
use std::sync::atomic::Ordering;
use waitrose_scraper::domain::models::product::Product;

/// 测试抓取单页搜索结果
///
/// 验证 /scrape 返回商品数组，字段名与值均正确
#[tokio::test]
async fn test_scrape_single_page() {
    let app = create_test_app(ScriptedEngine::new(vec![listing(3, false)]));

    let response = app
        .server
        .get("/scrape")
        .add_query_param("searchTerm", "wine")
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);

    let body: Value = response.json();
    let items = body.as_array().unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0]["product_name"], "Wine 0");
    assert_eq!(items[0]["product_url"], "/ecom/products/wine-0/0");
    assert_eq!(items[0]["price"], "£0.50");
    assert_eq!(items[0]["country"], "Italy");
    assert_eq!(items[0]["rating"], "0 out of 5 stars");
    assert_eq!(items[0]["image_url"], "https://images.example.com/wine-0.jpg");

    assert_eq!(app.engine.sessions_opened.load(Ordering::SeqCst), 1);
    assert_eq!(app.engine.sessions_closed.load(Ordering::SeqCst), 1);
}

/// 测试“加载更多”分页
///
/// 每次点击后只追加新出现的商品
#[tokio::test]
async fn test_scrape_follows_load_more() {
    let app = create_test_app(ScriptedEngine::new(vec![
        listing(2, true),
        listing(4, true),
        listing(6, false),
    ]));

    let response = app
        .server
        .get("/scrape")
        .add_query_param("searchTerm", "wine")
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let products: Vec<Product> = response.json();
    let urls: Vec<_> = products.iter().map(|p| p.product_url.as_str()).collect();
    assert_eq!(urls.len(), 6);
    assert_eq!(urls[5], "/ecom/products/wine-5/5");
}

/// 测试 maxPages 参数限制翻页次数
#[tokio::test]
async fn test_scrape_max_pages_param() {
    let app = create_test_app(ScriptedEngine::new(vec![
        listing(2, true),
        listing(4, true),
        listing(6, true),
    ]));

    let response = app
        .server
        .get("/scrape")
        .add_query_param("searchTerm", "wine")
        .add_query_param("maxPages", 1)
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let products: Vec<Product> = response.json();
    assert_eq!(products.len(), 2);
}

/// 测试搜索词经过编码后传给浏览器
#[tokio::test]
async fn test_scrape_encodes_search_term() {
    let app = create_test_app(ScriptedEngine::new(vec![listing(1, false)]));

    let response = app
        .server
        .get("/scrape")
        .add_query_param("searchTerm", "rosé wine")
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let navigated = app.engine.navigated.lock().unwrap().clone();
    assert_eq!(
        navigated,
        vec!["https://www.waitrose.com/ecom/shop/search?searchTerm=ros%C3%A9+wine"]
    );
}

/// 测试缺少搜索词
#[tokio::test]
async fn test_scrape_missing_search_term() {
    let app = create_test_app(ScriptedEngine::new(vec![listing(1, false)]));

    let response = app.server.get("/scrape").await;

    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert!(body["error"].is_string());
    assert_eq!(app.engine.sessions_opened.load(Ordering::SeqCst), 0);
}

/// 测试空白搜索词
#[tokio::test]
async fn test_scrape_blank_search_term() {
    let app = create_test_app(ScriptedEngine::new(vec![listing(1, false)]));

    let response = app
        .server
        .get("/scrape")
        .add_query_param("searchTerm", "   ")
        .await;

    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
}

/// 测试无效的 maxPages
#[tokio::test]
async fn test_scrape_invalid_max_pages() {
    let app = create_test_app(ScriptedEngine::new(vec![listing(1, false)]));

    let out_of_range = app
        .server
        .get("/scrape")
        .add_query_param("searchTerm", "wine")
        .add_query_param("maxPages", 0)
        .await;
    assert_eq!(out_of_range.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

    let not_a_number = app
        .server
        .get("/scrape")
        .add_query_param("searchTerm", "wine")
        .add_query_param("maxPages", "many")
        .await;
    assert_eq!(not_a_number.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
}

/// 测试浏览器不可用
#[tokio::test]
async fn test_scrape_browser_unavailable() {
    let app = create_test_app(ScriptedEngine::unavailable());

    let response = app
        .server
        .get("/scrape")
        .add_query_param("searchTerm", "wine")
        .await;

    assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = response.json();
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("Browser unavailable"));
}

/// 测试无结果的搜索
#[tokio::test]
async fn test_scrape_no_results() {
    let app = create_test_app(ScriptedEngine::new(vec![listing(0, false)]));

    let response = app
        .server
        .get("/scrape")
        .add_query_param("searchTerm", "zzzz")
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let products: Vec<Product> = response.json();
    assert!(products.is_empty());
}
