use std::sync::Arc;

use axum::{
    body::Body,
    http::{header::AUTHORIZATION, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;

use crate::{
    config::AppConfig,
    create_router,
    models::{loan::{IssueLoan, ReturnLoan}, Role, UserClaims},
    repository::{memory::MemoryStore, Repository},
    services::{ledger::LedgerService, Services},
    AppState,
};

struct TestApp {
    router: Router,
    store: Arc<MemoryStore>,
    ledger: LedgerService,
    secret: String,
}

impl TestApp {
    /// Router whose ledger runs on the in-memory store; the pool never connects
    fn new() -> Self {
        let config = AppConfig::default();
        let pool = PgPoolOptions::new()
            .connect_lazy(&config.database.url)
            .expect("lazy pool");

        let store = Arc::new(MemoryStore::new());
        let ledger = LedgerService::new(store.clone(), config.loans.clone());
        let services = Services::new(Repository::new(pool), &config).with_ledger(ledger.clone());
        let secret = config.auth.jwt_secret.clone();

        let router = create_router(AppState {
            config: Arc::new(config),
            services: Arc::new(services),
        });

        Self { router, store, ledger, secret }
    }

    fn token(&self, user_id: i32, role: Role) -> String {
        let claims = UserClaims {
            sub: format!("user{}@example.org", user_id),
            user_id,
            role,
            iat: Utc::now().timestamp(),
            exp: (Utc::now() + Duration::hours(1)).timestamp(),
        };
        claims.create_token(&self.secret).unwrap()
    }

    async fn send(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new();
    let (status, body) = app.send(Method::GET, "/api/v1/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_ledger_routes_require_a_token() {
    let app = TestApp::new();
    let (status, body) = app
        .send(Method::POST, "/api/v1/transactions/issue", None, Some(json!({"book_id": 1, "borrower_id": 2})))
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "NotAuthorized");

    let (status, _) = app
        .send(Method::GET, "/api/v1/transactions", Some("not-a-jwt"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_members_cannot_issue() {
    let app = TestApp::new();
    let book = app.store.add_book(1, 1);
    let member = app.store.add_user(Role::Member);
    let token = app.token(member, Role::Member);

    let (status, _) = app
        .send(
            Method::POST,
            "/api/v1/transactions/issue",
            Some(&token),
            Some(json!({"book_id": book, "borrower_id": member})),
        )
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(app.store.book(book).unwrap().available_copies, 1);
}

#[tokio::test]
async fn test_issue_and_return_over_http() {
    let app = TestApp::new();
    let book = app.store.add_book(1, 1);
    let librarian = app.store.add_user(Role::Librarian);
    let u1 = app.store.add_user(Role::Member);
    let u2 = app.store.add_user(Role::Member);
    let token = app.token(librarian, Role::Librarian);

    let (status, loan) = app
        .send(
            Method::POST,
            "/api/v1/transactions/issue",
            Some(&token),
            Some(json!({"book_id": book, "borrower_id": u1})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(loan["status"], "issued");
    assert_eq!(loan["issued_by"], librarian);
    assert_eq!(loan["is_overdue"], false);

    let (status, body) = app
        .send(
            Method::POST,
            "/api/v1/transactions/issue",
            Some(&token),
            Some(json!({"book_id": book, "borrower_id": u2})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "NoCopiesAvailable");

    let uri = format!("/api/v1/transactions/return/{}", loan["id"]);
    let (status, body) = app.send(Method::POST, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["loan"]["status"], "returned");
    assert!(body["fine"].is_null());
    assert_eq!(app.store.book(book).unwrap().available_copies, 1);

    let (status, body) = app.send(Method::POST, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "AlreadyReturned");
}

#[tokio::test]
async fn test_unknown_loan_is_not_found() {
    let app = TestApp::new();
    let token = app.token(1, Role::Admin);

    let (status, body) = app
        .send(Method::POST, "/api/v1/transactions/renew/999", Some(&token), None)
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NotFound");
}

#[tokio::test]
async fn test_fine_payment_and_waiver_permissions() {
    let app = TestApp::new();
    let book = app.store.add_book(1, 1);
    let librarian = app.store.add_user(Role::Librarian);
    let owner = app.store.add_user(Role::Member);
    let stranger = app.store.add_user(Role::Member);

    let issued_at = Utc::now() - Duration::days(20);
    let request = IssueLoan {
        book_id: book,
        borrower_id: owner,
        due_date: None,
    };
    let loan = app.ledger.issue_at(librarian, request, issued_at).await.unwrap();
    let (_, fine) = app.ledger.return_loan(loan.id, ReturnLoan::default()).await.unwrap();
    let fine = fine.unwrap();

    let uri = format!("/api/v1/fines/pay/{}", fine.id);
    let (status, _) = app
        .send(Method::POST, &uri, Some(&app.token(stranger, Role::Member)), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let waive = format!("/api/v1/fines/waive/{}", fine.id);
    let (status, _) = app
        .send(Method::POST, &waive, Some(&app.token(librarian, Role::Librarian)), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let owner_token = app.token(owner, Role::Member);
    let (status, body) = app
        .send(Method::POST, &uri, Some(&owner_token), Some(json!({"amount": "1000"})))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "AmountExceedsFine");

    let (status, body) = app.send(Method::POST, &uri, Some(&owner_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "paid");

    let (status, body) = app
        .send(Method::GET, &format!("/api/v1/fines/user/{}", owner), Some(&owner_token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["fines"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_overdue_listing() {
    let app = TestApp::new();
    let book = app.store.add_book(2, 2);
    let librarian = app.store.add_user(Role::Librarian);
    let member = app.store.add_user(Role::Member);

    let request = IssueLoan {
        book_id: book,
        borrower_id: member,
        due_date: None,
    };
    app.ledger
        .issue_at(librarian, request, Utc::now() - Duration::days(15))
        .await
        .unwrap();

    let token = app.token(librarian, Role::Librarian);
    let (status, body) = app
        .send(Method::GET, "/api/v1/transactions/overdue", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["is_overdue"], true);

    let (status, body) = app
        .send(Method::GET, "/api/v1/transactions?status=issued", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["pages"], 1);
}

#[tokio::test]
async fn test_out_of_range_page_is_empty() {
    let app = TestApp::new();
    let token = app.token(1, Role::Librarian);

    for uri in [
        "/api/v1/transactions?page=9223372036854775807",
        "/api/v1/fines?page=9223372036854775807&per_page=1",
    ] {
        let (status, body) = app.send(Method::GET, uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["items"].as_array().unwrap().len(), 0);
        assert_eq!(body["total"], 0);
    }
}
