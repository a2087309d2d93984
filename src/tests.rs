//! Integration tests for the banner service.

use std::sync::Arc;

use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::auth::{PasswordAuthenticator, TokenIssuer};
use crate::db::{init_database, Repository};
use crate::models::Role;
use crate::service::{AuthService, BannerService};
use crate::{create_router, AppState};

const SIGNING_KEY: &str = "integration-signing-key";

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    admin_token: String,
    user_token: String,
    _temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.sqlite");

        // Initialize database
        let pool = init_database(&db_path).await.expect("Failed to init DB");
        let repo = Arc::new(Repository::new(pool));

        let state = AppState {
            auth: Arc::new(AuthService::new(
                repo.clone(),
                Arc::new(TokenIssuer::new(SIGNING_KEY, None)),
                PasswordAuthenticator::with_cost(4),
            )),
            banners: Arc::new(BannerService::new(repo)),
        };

        let app = create_router(state);

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        // Spawn server
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        let mut fixture = TestFixture {
            client: Client::new(),
            base_url,
            admin_token: String::new(),
            user_token: String::new(),
            _temp_dir: temp_dir,
        };

        fixture.register("admin", "admin").await;
        fixture.register("user", "user").await;
        fixture.admin_token = fixture.login("admin", "password").await;
        fixture.user_token = fixture.login("user", "password").await;
        fixture
    }

    /// Fixture seeded with the three reference banners.
    async fn seeded() -> Self {
        let fixture = Self::new().await;
        for body in [
            banner_body(&[0, 1, 2], 1, 1, true),
            banner_body(&[0, 2], 2, 2, false),
            banner_body(&[0], 3, 3, true),
        ] {
            let resp = fixture.post_banner(&fixture.admin_token, &body).await;
            assert_eq!(resp.status(), StatusCode::CREATED);
        }
        fixture
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn register(&self, nickname: &str, role: &str) -> reqwest::Response {
        self.client
            .post(self.url("/register"))
            .json(&json!({
                "nickname": nickname,
                "email": format!("{}@gmail.com", nickname),
                "password": "password",
                "password_confirm": "password",
                "role": role,
            }))
            .send()
            .await
            .unwrap()
    }

    async fn login(&self, nickname: &str, password: &str) -> String {
        let resp = self
            .client
            .post(self.url("/login"))
            .json(&json!({"nickname": nickname, "password": password}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = resp.json().await.unwrap();
        body["data"]["token"].as_str().unwrap().to_string()
    }

    async fn post_banner(&self, token: &str, body: &Value) -> reqwest::Response {
        self.client
            .post(self.url("/banner"))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .unwrap()
    }

    async fn user_banner(&self, token: &str, tag_id: i64, feature_id: i64) -> reqwest::Response {
        self.client
            .get(self.url(&format!(
                "/user_banner?tag_id={}&feature_id={}",
                tag_id, feature_id
            )))
            .bearer_auth(token)
            .send()
            .await
            .unwrap()
    }
}

fn banner_body(tags: &[i64], feature_id: i64, n: u32, is_active: bool) -> Value {
    json!({
        "tag_ids": tags,
        "feature_id": feature_id,
        "content": {
            "title": format!("Test banner{}", n),
            "text": format!("Test text{}", n),
            "url": format!("https://test{}.url", n),
        },
        "is_active": is_active,
    })
}

async fn error_code(resp: reqwest::Response) -> String {
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    body["error"]["code"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

// ============================================================================
// Authentication
// ============================================================================

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let fixture = TestFixture::seeded().await;

    let resp = fixture
        .client
        .get(fixture.url("/user_banner?tag_id=0&feature_id=1"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(resp).await, "UNAUTHORIZED");
}

#[tokio::test]
async fn test_invalid_token_is_unauthorized() {
    let fixture = TestFixture::seeded().await;

    let resp = fixture.user_banner("not-a-token", 0, 1).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // A token signed with another key is rejected as well
    let foreign = TokenIssuer::new("some-other-signing-key", None)
        .issue(1, Role::Admin)
        .unwrap();
    let resp = fixture.user_banner(&foreign, 0, 1).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_wrong_password_is_unauthorized() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/login"))
        .json(&json!({"nickname": "user", "password": "wrong"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let fixture = TestFixture::new().await;

    let resp = fixture.register("user", "user").await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(error_code(resp).await, "CONFLICT");
}

#[tokio::test]
async fn test_registration_validation() {
    let fixture = TestFixture::new().await;

    let resp = fixture.register("root", "superuser").await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = fixture
        .client
        .post(fixture.url("/register"))
        .json(&json!({
            "nickname": "mismatch",
            "email": "mismatch@gmail.com",
            "password": "password",
            "password_confirm": "different",
            "role": "user",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_code(resp).await, "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_register_returns_created_id() {
    let fixture = TestFixture::new().await;

    let resp = fixture.register("newcomer", "user").await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert!(body["data"]["id"].as_i64().unwrap() > 0);
}

// ============================================================================
// Resolution
// ============================================================================

#[tokio::test]
async fn test_active_banner_visible_to_both_roles() {
    let fixture = TestFixture::seeded().await;

    for token in [&fixture.admin_token, &fixture.user_token] {
        let resp = fixture.user_banner(token, 0, 1).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = resp.json().await.unwrap();
        assert_eq!(
            body["data"],
            json!({
                "title": "Test banner1",
                "text": "Test text1",
                "url": "https://test1.url",
            })
        );
    }
}

#[tokio::test]
async fn test_inactive_banner_hidden_from_user() {
    let fixture = TestFixture::seeded().await;

    let resp = fixture.user_banner(&fixture.user_token, 2, 2).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(error_code(resp).await, "NOT_FOUND");

    let resp = fixture.user_banner(&fixture.admin_token, 2, 2).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["title"], "Test banner2");
}

#[tokio::test]
async fn test_unknown_pair_is_not_found() {
    let fixture = TestFixture::seeded().await;

    let resp = fixture.user_banner(&fixture.admin_token, 1, 3).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_query_is_validation_error() {
    let fixture = TestFixture::seeded().await;

    let resp = fixture
        .client
        .get(fixture.url("/user_banner?tag_id=abc&feature_id=1"))
        .bearer_auth(&fixture.user_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_code(resp).await, "VALIDATION_ERROR");
}

// ============================================================================
// Mutations
// ============================================================================

#[tokio::test]
async fn test_user_cannot_mutate() {
    let fixture = TestFixture::seeded().await;

    let resp = fixture
        .post_banner(&fixture.user_token, &banner_body(&[9], 9, 9, true))
        .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(error_code(resp).await, "FORBIDDEN");

    let resp = fixture
        .client
        .patch(fixture.url("/banner/1"))
        .bearer_auth(&fixture.user_token)
        .json(&json!({"is_active": false}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = fixture
        .client
        .delete(fixture.url("/banner/1"))
        .bearer_auth(&fixture.user_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = fixture
        .client
        .get(fixture.url("/banner"))
        .bearer_auth(&fixture.user_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // Nothing changed
    let resp = fixture.user_banner(&fixture.user_token, 0, 1).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_duplicate_banner_conflicts() {
    let fixture = TestFixture::seeded().await;

    let resp = fixture
        .post_banner(&fixture.admin_token, &banner_body(&[2, 1, 0], 1, 7, false))
        .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(error_code(resp).await, "CONFLICT");
}

#[tokio::test]
async fn test_create_returns_banner_id() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .post_banner(&fixture.admin_token, &banner_body(&[4, 5], 6, 4, true))
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["banner_id"], 1);
}

#[tokio::test]
async fn test_create_validation() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .post_banner(&fixture.admin_token, &json!({"feature_id": 1}))
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = fixture
        .client
        .post(fixture.url("/banner"))
        .bearer_auth(&fixture.admin_token)
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_code(resp).await, "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_patch_merges_fields() {
    let fixture = TestFixture::seeded().await;

    let resp = fixture
        .client
        .patch(fixture.url("/banner/2"))
        .bearer_auth(&fixture.admin_token)
        .json(&json!({"is_active": true, "content": {"title": "Updated"}}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["banner_id"], 2);
    assert_eq!(body["data"]["tag_ids"], json!([0, 2]));
    assert_eq!(body["data"]["is_active"], true);
    assert_eq!(body["data"]["content"]["title"], "Updated");
    assert_eq!(body["data"]["content"]["text"], "Test text2");

    // Now visible to users
    let resp = fixture.user_banner(&fixture.user_token, 2, 2).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["title"], "Updated");
}

#[tokio::test]
async fn test_patch_onto_existing_pair_conflicts() {
    let fixture = TestFixture::seeded().await;

    let resp = fixture
        .client
        .patch(fixture.url("/banner/3"))
        .bearer_auth(&fixture.admin_token)
        .json(&json!({"tag_ids": [0, 1, 2], "feature_id": 1}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_patch_missing_banner_is_not_found() {
    let fixture = TestFixture::seeded().await;

    let resp = fixture
        .client
        .patch(fixture.url("/banner/999"))
        .bearer_auth(&fixture.admin_token)
        .json(&json!({"is_active": false}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_banner() {
    let fixture = TestFixture::seeded().await;

    let resp = fixture
        .client
        .delete(fixture.url("/banner/1"))
        .bearer_auth(&fixture.admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = fixture.user_banner(&fixture.admin_token, 0, 1).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = fixture
        .client
        .delete(fixture.url("/banner/1"))
        .bearer_auth(&fixture.admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_non_numeric_id_is_validation_error() {
    let fixture = TestFixture::seeded().await;

    let resp = fixture
        .client
        .delete(fixture.url("/banner/abc"))
        .bearer_auth(&fixture.admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// ============================================================================
// Listing
// ============================================================================

#[tokio::test]
async fn test_list_filters_by_tag_or_feature() {
    let fixture = TestFixture::seeded().await;

    let list = |query: &'static str| {
        let request = fixture
            .client
            .get(fixture.url(&format!("/banner{}", query)))
            .bearer_auth(&fixture.admin_token);
        async move {
            let resp = request.send().await.unwrap();
            assert_eq!(resp.status(), StatusCode::OK);
            let body: Value = resp.json().await.unwrap();
            body["data"]
                .as_array()
                .unwrap()
                .iter()
                .map(|b| b["banner_id"].as_i64().unwrap())
                .collect::<Vec<_>>()
        }
    };

    assert_eq!(list("").await, vec![1, 2, 3]);
    assert_eq!(list("?tag_id=2").await, vec![1, 2]);
    assert_eq!(list("?feature_id=3").await, vec![3]);
    assert_eq!(list("?tag_id=1&feature_id=3").await, vec![1, 3]);
    assert_eq!(list("?limit=1&offset=1").await, vec![2]);
}
