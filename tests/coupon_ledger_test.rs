mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn coupon_is_single_use_over_http() {
    let app = TestApp::spawn().await;
    app.seed_account("ada@example.com", "Ada").await;

    let (status, body) = app
        .post_json(
            "/api/users/coupon/add",
            json!({
                "email": "ada@example.com",
                "code": "SPRING50",
                "amount": 50,
                "description": "Spring promo"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["code"], "SPRING50");

    let (status, body) = app
        .post_json(
            "/api/users/coupon/use",
            json!({ "email": "ada@example.com", "code": "SPRING50" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 0);

    // Second redemption of the same code
    let (status, _) = app
        .post_json(
            "/api/users/coupon/use",
            json!({ "email": "ada@example.com", "code": "SPRING50" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn concurrent_redemptions_settle_with_one_winner() {
    let app = TestApp::spawn().await;
    app.seed_account("ada@example.com", "Ada").await;
    app.seed_coupon("ada@example.com", "ONCE", 100).await;

    let coupons = app.state.services.coupons.clone();
    let (a, b) = tokio::join!(
        coupons.redeem("ada@example.com", "ONCE"),
        coupons.redeem("ada@example.com", "ONCE"),
    );

    let successes = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(successes, 1, "exactly one redemption may win");

    let remaining = coupons.list("ada@example.com").await.unwrap();
    assert!(remaining.is_empty());
}

#[tokio::test]
async fn welcome_coupon_is_granted_exactly_once() {
    let app = TestApp::spawn().await;
    app.seed_account("ada@example.com", "Ada").await;

    let (status, body) = app
        .put_json(
            "/api/users/profile",
            json!({
                "email": "ada@example.com",
                "skin_type": "dry",
                "hair_type": "curly"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Profile updated, welcome coupon added");
    let coupons = body["data"]["coupons"].as_array().unwrap();
    assert_eq!(coupons.len(), 1);
    assert_eq!(coupons[0]["code"], "WELCOME100");
    assert_eq!(coupons[0]["amount"], 100);

    let (status, body) = app
        .put_json(
            "/api/users/profile",
            json!({
                "email": "ada@example.com",
                "skin_type": "oily",
                "hair_type": "straight"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Profile updated");
    assert_eq!(body["data"]["account"]["skin_type"], "oily");
    assert_eq!(body["data"]["coupons"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn empty_profile_update_grants_nothing() {
    let app = TestApp::spawn().await;
    app.seed_account("ada@example.com", "Ada").await;

    let (status, body) = app
        .put_json(
            "/api/users/profile",
            json!({ "email": "ada@example.com", "skin_type": "", "hair_type": "" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Profile updated");
    assert_eq!(body["data"]["coupons"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn order_creation_redeems_the_coupon_atomically() {
    let app = TestApp::spawn().await;
    app.seed_account("ada@example.com", "Ada").await;
    app.seed_product("mask-01", "Hydration Mask", 900).await;
    app.seed_coupon("ada@example.com", "SAVE100", 100).await;

    let order = json!({
        "email": "ada@example.com",
        "items": [{ "product_id": "mask-01", "quantity": 1 }],
        "last_name": "Lovelace",
        "first_name": "Ada",
        "phone": "0912345678",
        "city": "Taipei",
        "address": "1 Example Rd",
        "payment_method": "credit",
        "coupon_code": "SAVE100"
    });

    let (status, body) = app.post_json("/api/orders", order.clone()).await;
    assert_eq!(status, StatusCode::CREATED);
    let order_id = body["data"]["order_id"].as_str().unwrap().to_string();

    let details = app
        .state
        .services
        .orders
        .find_by_order_id(&order_id)
        .await
        .unwrap();
    assert_eq!(details.order.subtotal, 900);
    assert_eq!(details.order.discount, 100);
    assert_eq!(details.order.shipping_fee, 100);
    assert_eq!(details.order.total, 900);

    let remaining = app
        .state
        .services
        .coupons
        .list("ada@example.com")
        .await
        .unwrap();
    assert!(remaining.is_empty());

    // The code is spent; a second order naming it must fail whole
    let (status, _) = app.post_json("/api/orders", order).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let orders = app
        .state
        .services
        .orders
        .list_by_email("ada@example.com")
        .await
        .unwrap();
    assert_eq!(orders.len(), 1);
}

#[tokio::test]
async fn missing_coupon_rolls_the_order_back() {
    let app = TestApp::spawn().await;
    app.seed_account("ada@example.com", "Ada").await;
    app.seed_product("mask-01", "Hydration Mask", 900).await;

    let (status, _) = app
        .post_json(
            "/api/orders",
            json!({
                "email": "ada@example.com",
                "items": [{ "product_id": "mask-01", "quantity": 1 }],
                "last_name": "Lovelace",
                "first_name": "Ada",
                "phone": "0912345678",
                "city": "Taipei",
                "address": "1 Example Rd",
                "payment_method": "credit",
                "coupon_code": "NO-SUCH-CODE"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let orders = app
        .state
        .services
        .orders
        .list_by_email("ada@example.com")
        .await
        .unwrap();
    assert!(orders.is_empty());
}

#[tokio::test]
async fn grant_rejects_non_positive_amounts() {
    let app = TestApp::spawn().await;
    app.seed_account("ada@example.com", "Ada").await;

    let (status, _) = app
        .post_json(
            "/api/users/coupon/add",
            json!({ "email": "ada@example.com", "code": "ZERO", "amount": 0 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
