mod common;

use axum::http::{Method, StatusCode};
use common::{wings, TestApp};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};

fn restocked_at(item: &Value) -> DateTime<Utc> {
    item["data"]["lastRestocked"]
        .as_str()
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .expect("lastRestocked timestamp")
        .with_timezone(&Utc)
}

#[tokio::test]
async fn nightly_list_is_grouped_by_category_then_name() {
    let app = TestApp::new().await;
    let chef = app.signup("Head Chef", "chef@bistro.test").await;

    for (name, category, nightly) in [
        ("Wing Sauce", "Sauces", true),
        ("Ranch", "Sauces", true),
        ("Chicken Wings", "Freezer", true),
        ("Flour", "Dry Goods", false),
    ] {
        let mut body = wings(20.0);
        body["name"] = json!(name);
        body["category"] = json!(category);
        body["isNightly"] = json!(nightly);
        app.create_item(&chef.token, body).await;
    }

    let (status, body) = app
        .call(Method::GET, "/api/items/nightly-list", None, Some(&chef.token))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 3);
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Chicken Wings", "Ranch", "Wing Sauce"]);
}

#[tokio::test]
async fn deleted_items_leave_the_nightly_list() {
    let app = TestApp::new().await;
    let chef = app.signup("Head Chef", "chef@bistro.test").await;
    let id = app.create_item(&chef.token, wings(20.0)).await;

    app.call(Method::DELETE, &format!("/api/items/{id}"), None, Some(&chef.token))
        .await;

    let (_, body) = app
        .call(Method::GET, "/api/items/nightly-list", None, Some(&chef.token))
        .await;
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn end_of_day_count_sets_quantities_independently() {
    let app = TestApp::new().await;
    let chef = app.signup("Head Chef", "chef@bistro.test").await;
    let wings_id = app.create_item(&chef.token, wings(3.0)).await;
    let (_, before) = app
        .call(Method::GET, &format!("/api/items/{wings_id}"), None, Some(&chef.token))
        .await;
    let mut sauce = wings(6.0);
    sauce["name"] = json!("Wing Sauce");
    let sauce_id = app.create_item(&chef.token, sauce).await;
    let missing = uuid::Uuid::new_v4().to_string();

    let (status, body) = app
        .call(
            Method::POST,
            "/api/items/end-of-day-count",
            Some(json!({
                "counts": [
                    { "itemId": wings_id, "newQuantity": 12 },
                    { "itemId": sauce_id, "newQuantity": "-4" },
                    { "itemId": missing, "newQuantity": 7 },
                    { "itemId": "garbage", "newQuantity": 1 }
                ]
            })),
            Some(&chef.token),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Nightly count completed: 1 success, 3 failed");
    assert_eq!(body["summary"]["successful"], 1);
    assert_eq!(body["summary"]["failed"], 3);
    assert_eq!(body["summary"]["updated"], 1);
    assert_eq!(body["summary"]["created"], 0);

    let results = body["results"].as_array().unwrap();
    assert_eq!(results[0]["itemId"], wings_id.as_str());
    assert_eq!(results[0]["action"], "updated");
    assert_eq!(results[1]["error"], "Quantity must be a positive number");
    assert_eq!(results[2]["error"], "Item not found");
    assert_eq!(results[3]["error"], "Invalid item id");

    let (_, item) = app
        .call(Method::GET, &format!("/api/items/{wings_id}"), None, Some(&chef.token))
        .await;
    assert_eq!(item["data"]["quantity"], 12.0);
    assert_eq!(item["data"]["stockStatus"], "stable");
    assert!(restocked_at(&item) > restocked_at(&before));

    let (_, item) = app
        .call(Method::GET, &format!("/api/items/{sauce_id}"), None, Some(&chef.token))
        .await;
    assert_eq!(item["data"]["quantity"], 6.0);
}

#[tokio::test]
async fn end_of_day_count_needs_a_non_empty_list() {
    let app = TestApp::new().await;
    let chef = app.signup("Head Chef", "chef@bistro.test").await;

    for body in [json!({}), json!({ "counts": [] }), json!({ "counts": "12" })] {
        let (status, response) = app
            .call(
                Method::POST,
                "/api/items/end-of-day-count",
                Some(body),
                Some(&chef.token),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["message"], "Invalid count data");
    }
}

#[tokio::test]
async fn reconciliation_is_not_audited() {
    let app = TestApp::new().await;
    let chef = app.signup("Head Chef", "chef@bistro.test").await;
    let id = app.create_item(&chef.token, wings(3.0)).await;

    app.call(
        Method::POST,
        "/api/items/end-of-day-count",
        Some(json!({ "counts": [{ "itemId": id, "newQuantity": 9 }] })),
        Some(&chef.token),
    )
    .await;

    let (_, logs) = app
        .call(
            Method::GET,
            "/api/admin/activity-logs?action=ITEM_UPDATED",
            None,
            Some(&chef.token),
        )
        .await;
    assert_eq!(logs["pagination"]["total"], 0);
}
