//! Integration tests for the REST persistence endpoints: users, donors,
//! conversations and messages.

use serde_json::{json, Value};
use std::net::SocketAddr;
use tokio::net::TcpListener;

async fn start_test_server() -> String {
    let tmp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let data_dir = tmp_dir.path().to_str().unwrap().to_string();

    let config = donation_server::config::Config::default();
    let db = donation_server::db::init_db(&data_dir).expect("Failed to init DB");
    let state = donation_server::state::AppState::new(db, config.realtime.clone());

    let app = donation_server::routes::build_router(state, &config);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
        let _keep = tmp_dir;
    });

    format!("http://{}", addr)
}

#[tokio::test]
async fn test_health_check() {
    let base_url = start_test_server().await;
    let resp = reqwest::get(format!("{}/health", base_url)).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn test_user_upsert_create_then_update() {
    let base_url = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/user", base_url))
        .json(&json!({
            "uid": "u-1",
            "displayName": "Nadia",
            "photoURL": "http://img/n.png",
            "email": "nadia@example.com",
            "phoneNumber": "555-0101"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "User created successfully");

    let resp = client
        .post(format!("{}/user", base_url))
        .json(&json!({"uid": "u-1", "displayName": "Nadia R."}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "User updated successfully");

    let profile: Value = client
        .get(format!("{}/users/u-1", base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(profile["displayName"], "Nadia R.");
    assert_eq!(profile["photoURL"], "http://img/n.png");
    assert_eq!(profile["email"], "nadia@example.com");

    let users: Vec<Value> = client
        .get(format!("{}/users", base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["uid"], "u-1");
}

#[tokio::test]
async fn test_user_upsert_requires_uid() {
    let base_url = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/user", base_url))
        .json(&json!({"displayName": "Nobody"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "User ID (uid) is required");

    let resp = client
        .get(format!("{}/users/missing", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_donors_create_and_list() {
    let base_url = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/donors", base_url))
        .json(&json!({"name": "Rafi", "bloodGroup": "A+", "location": "Dhaka"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let donor: Value = resp.json().await.unwrap();
    assert!(donor["id"].as_str().is_some());

    let resp = client
        .post(format!("{}/donors", base_url))
        .json(&json!("just a string"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let donors: Vec<Value> = client
        .get(format!("{}/donors", base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(donors.len(), 1);
    assert_eq!(donors[0]["bloodGroup"], "A+");
    assert_eq!(donors[0]["id"], donor["id"]);
}

#[tokio::test]
async fn test_duplicate_donor_id_conflicts() {
    let base_url = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/donors", base_url))
        .json(&json!({"id": "d-1", "name": "Rafi"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);

    let resp = client
        .post(format!("{}/donors", base_url))
        .json(&json!({"id": "d-1", "name": "Someone else"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);

    let donors: Vec<Value> = client
        .get(format!("{}/donors", base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(donors.len(), 1);
    assert_eq!(donors[0]["name"], "Rafi");
}

#[tokio::test]
async fn test_conversation_find_or_create() {
    let base_url = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{}/conversations?userId=u-1&donorId=d-1", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "No conversation found");

    let resp = client
        .post(format!("{}/conversations", base_url))
        .json(&json!({"userId": "u-1", "donorId": "d-1"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let created: Value = resp.json().await.unwrap();
    assert_eq!(created["members"], json!(["d-1", "u-1"]));
    assert!(created["createdAt"].as_str().is_some());

    // Existing pair wins over creation, in either member order
    let resp = client
        .post(format!("{}/conversations", base_url))
        .json(&json!({"userId": "d-1", "donorId": "u-1"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let existing: Value = resp.json().await.unwrap();
    assert_eq!(existing["id"], created["id"]);

    let found: Value = client
        .get(format!("{}/conversations?userId=u-1&donorId=d-1", base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(found["id"], created["id"]);
}

#[tokio::test]
async fn test_conversation_rejects_invalid_members() {
    let base_url = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/conversations", base_url))
        .json(&json!({"userId": "u-1"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = client
        .post(format!("{}/conversations", base_url))
        .json(&json!({"userId": "u-1", "donorId": "u-1"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_messages_append_and_list_in_order() {
    let base_url = start_test_server().await;
    let client = reqwest::Client::new();

    let conversation: Value = client
        .post(format!("{}/conversations", base_url))
        .json(&json!({"userId": "u-1", "donorId": "d-1"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let conversation_id = conversation["id"].as_str().unwrap();

    for (sender, content) in [("u-1", "Can you donate?"), ("d-1", "Yes, tomorrow"), ("u-1", "Thanks!")] {
        let resp = client
            .post(format!("{}/messages", base_url))
            .json(&json!({
                "conversationId": conversation_id,
                "senderId": sender,
                "content": content
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 201);
        let stored: Value = resp.json().await.unwrap();
        assert_eq!(stored["conversationId"], conversation_id);
        assert!(stored["timestamp"].as_str().is_some());
    }

    let messages: Vec<Value> = client
        .get(format!("{}/messages/{}", base_url, conversation_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let contents: Vec<&str> = messages
        .iter()
        .map(|m| m["content"].as_str().unwrap())
        .collect();
    assert_eq!(contents, vec!["Can you donate?", "Yes, tomorrow", "Thanks!"]);
}

#[tokio::test]
async fn test_message_validation() {
    let base_url = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/messages", base_url))
        .json(&json!({"conversationId": "nope", "senderId": "u-1", "content": "hi"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let resp = client
        .post(format!("{}/messages", base_url))
        .json(&json!({"conversationId": "nope", "content": "hi"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = client
        .post(format!("{}/messages", base_url))
        .json(&json!({"conversationId": "nope", "senderId": "u-1"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let messages: Vec<Value> = client
        .get(format!("{}/messages/unknown", base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(messages.is_empty());
}
