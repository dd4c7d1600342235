use actix_web::test::{self, TestRequest};
use actix_web::App;
use serde_json::json;

use stylist_api::routes;

mod support;

#[actix_web::test]
async fn register_rejects_duplicate_email() {
    let Some(test_db) = support::init_test_db().await else {
        return;
    };
    let app = test::init_service(App::new().app_data(support::build_state(&test_db)).configure(routes)).await;
    let email = support::unique_email("dup");

    let resp = test::call_service(
        &app,
        support::post("/auth", json!({"action": "register", "email": email, "name": "Аня"})).to_request(),
    )
    .await;
    let (status, body) = support::status_and_json(resp).await;
    assert_eq!(status, 200);
    assert_eq!(body["trial_days_left"], 3);
    assert_eq!(body["user"]["subscription_type"], "trial");

    let resp = test::call_service(
        &app,
        support::post("/auth", json!({"action": "register", "email": email})).to_request(),
    )
    .await;
    let (status, body) = support::status_and_json(resp).await;
    assert_eq!(status, 409);
    assert_eq!(body["error"], "Пользователь уже существует");

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = $1")
        .bind(&email)
        .fetch_one(&test_db.pool)
        .await
        .expect("count users");
    assert_eq!(count, 1);
}

#[actix_web::test]
async fn referral_codes_are_unique_and_well_formed() {
    let Some(test_db) = support::init_test_db().await else {
        return;
    };
    let app = test::init_service(App::new().app_data(support::build_state(&test_db)).configure(routes)).await;

    for i in 0..20 {
        let resp = test::call_service(
            &app,
            support::post(
                "/auth",
                json!({"action": "register", "email": support::unique_email(&format!("code{i}"))}),
            )
            .to_request(),
        )
        .await;
        assert!(resp.status().is_success());
    }

    let codes: Vec<String> = sqlx::query_scalar("SELECT referral_code FROM users")
        .fetch_all(&test_db.pool)
        .await
        .expect("select codes");
    assert_eq!(codes.len(), 20);

    let distinct: std::collections::HashSet<&String> = codes.iter().collect();
    assert_eq!(distinct.len(), 20);
    for code in &codes {
        assert_eq!(code.len(), 8);
        assert!(code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }
}

#[actix_web::test]
async fn referral_edge_is_recorded_and_unknown_code_ignored() {
    let Some(test_db) = support::init_test_db().await else {
        return;
    };
    let app = test::init_service(App::new().app_data(support::build_state(&test_db)).configure(routes)).await;

    let resp = test::call_service(
        &app,
        support::post("/auth", json!({"action": "register", "email": support::unique_email("referrer")}))
            .to_request(),
    )
    .await;
    let (_, referrer) = support::status_and_json(resp).await;
    let referrer_id = referrer["user"]["id"].as_i64().unwrap();
    let code = referrer["user"]["referral_code"].as_str().unwrap().to_string();

    let resp = test::call_service(
        &app,
        support::post(
            "/auth",
            json!({"action": "register", "email": support::unique_email("friend"), "referral_code": code}),
        )
        .to_request(),
    )
    .await;
    assert!(resp.status().is_success());

    let resp = test::call_service(
        &app,
        support::post(
            "/auth",
            json!({"action": "register", "email": support::unique_email("stranger"), "referral_code": "ZZZZZZZZ"}),
        )
        .to_request(),
    )
    .await;
    let (status, stranger) = support::status_and_json(resp).await;
    assert_eq!(status, 200);
    assert_eq!(stranger["user"]["referred_by_code"], "ZZZZZZZZ");

    let edges: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM referrals")
        .fetch_one(&test_db.pool)
        .await
        .expect("count referrals");
    assert_eq!(edges, 1);

    let resp = test::call_service(
        &app,
        TestRequest::get().uri(&format!("/auth?user_id={referrer_id}")).to_request(),
    )
    .await;
    let (status, profile) = support::status_and_json(resp).await;
    assert_eq!(status, 200);
    assert_eq!(profile["referrals"]["total"], 1);
    assert_eq!(profile["referrals"]["subscribed"], 0);
    assert_eq!(profile["referrals"]["progress_to_bonus"], 0.0);
}

#[actix_web::test]
async fn login_reports_trial_access() {
    let Some(test_db) = support::init_test_db().await else {
        return;
    };
    let app = test::init_service(App::new().app_data(support::build_state(&test_db)).configure(routes)).await;
    let email = support::unique_email("login");

    let resp = test::call_service(
        &app,
        support::post("/auth", json!({"action": "login", "email": email})).to_request(),
    )
    .await;
    assert_eq!(resp.status().as_u16(), 404);

    let resp = test::call_service(
        &app,
        support::post("/auth", json!({"action": "register", "email": email})).to_request(),
    )
    .await;
    assert!(resp.status().is_success());

    let resp = test::call_service(
        &app,
        support::post("/auth", json!({"action": "login", "email": email})).to_request(),
    )
    .await;
    let (status, body) = support::status_and_json(resp).await;
    assert_eq!(status, 200);
    assert_eq!(body["has_access"], true);
    assert_eq!(body["days_left"], 2);
    assert_eq!(body["user"]["email"], email.as_str());
}

#[actix_web::test]
async fn profile_of_unknown_user_is_404() {
    let Some(test_db) = support::init_test_db().await else {
        return;
    };
    let app = test::init_service(App::new().app_data(support::build_state(&test_db)).configure(routes)).await;

    let resp = test::call_service(&app, TestRequest::get().uri("/auth?user_id=999999").to_request()).await;
    let (status, body) = support::status_and_json(resp).await;
    assert_eq!(status, 404);
    assert_eq!(body["error"], "Пользователь не найден");
}

#[actix_web::test]
async fn long_unknown_referral_code_is_stored_as_given() {
    let Some(test_db) = support::init_test_db().await else {
        return;
    };
    let app = test::init_service(App::new().app_data(support::build_state(&test_db)).configure(routes)).await;
    let code = "X".repeat(40);

    let resp = test::call_service(
        &app,
        support::post(
            "/auth",
            json!({"action": "register", "email": support::unique_email("longcode"), "referral_code": code}),
        )
        .to_request(),
    )
    .await;
    let (status, body) = support::status_and_json(resp).await;
    assert_eq!(status, 200);
    assert_eq!(body["user"]["referred_by_code"], code.as_str());

    let edges: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM referrals")
        .fetch_one(&test_db.pool)
        .await
        .expect("count referrals");
    assert_eq!(edges, 0);
}
