//! End-to-end request flows against the full router and an in-memory database

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use pl_api::{router, AppState};
use pl_core::config::AppConfig;
use pl_db::Database;
use serde_json::{json, Value};
use tower::ServiceExt;

struct TestApp {
    app: Router,
    cookie: Option<String>,
}

impl TestApp {
    async fn new() -> Self {
        let db = Database::in_memory().await.unwrap();
        let state = AppState::new(db, &AppConfig::default().auth);
        Self {
            app: router().with_state(state),
            cookie: None,
        }
    }

    async fn request(&mut self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = &self.cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        if let Some(set_cookie) = response.headers().get(header::SET_COOKIE) {
            let pair = set_cookie.to_str().unwrap().split(';').next().unwrap();
            self.cookie = Some(pair.to_string());
        }

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn get(&mut self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, None).await
    }

    async fn post(&mut self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(body)).await
    }

    async fn put(&mut self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, Some(body)).await
    }

    async fn delete(&mut self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, None).await
    }

    /// Register and log in; returns the user id
    async fn sign_in(&mut self, email: &str) -> i64 {
        let credentials = json!({"email": email, "password": "secret-pass"});
        let (status, body) = self.post("/register", credentials.clone()).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        let (status, _) = self.post("/login", credentials).await;
        assert_eq!(status, StatusCode::OK);
        body["user"]["id"].as_i64().unwrap()
    }

    async fn create_project(&mut self, code: &str, budget: f64) -> i64 {
        let (status, body) = self
            .post(
                "/projects",
                json!({"project_code": code, "name": format!("Project {code}"), "budget_amount": budget}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["project"]["id"].as_i64().unwrap()
    }
}

#[tokio::test]
async fn test_requests_without_session_are_rejected() {
    let mut app = TestApp::new().await;

    let (status, body) = app.get("/projects").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "unauthorized");

    let (status, _) = app.get("/analytics/dashboard").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let mut app = TestApp::new().await;
    let credentials = json!({"email": "a@x.com", "password": "p1"});

    let (status, _) = app.post("/register", credentials.clone()).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = app.post("/register", credentials.clone()).await;
    assert_eq!(status, StatusCode::CONFLICT);

    app.post("/login", credentials).await;
    let (status, body) = app.get("/users").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["users"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_login_rejects_bad_password_and_logout_ends_session() {
    let mut app = TestApp::new().await;
    app.sign_in("b@x.com").await;

    let (status, body) = app.get("/profile").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "b@x.com");

    let (status, _) = app.post("/logout", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.get("/profile").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .post("/login", json!({"email": "b@x.com", "password": "wrong"}))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_missing_fields_are_reported() {
    let mut app = TestApp::new().await;
    app.sign_in("c@x.com").await;

    let (status, body) = app.post("/projects", json!({"name": "No code"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["details"]["project_code"].is_array());
}

#[tokio::test]
async fn test_project_budget_summary() {
    let mut app = TestApp::new().await;
    app.sign_in("pm@x.com").await;
    let project_id = app.create_project("P-1", 1000.0).await;

    let (status, _) = app
        .post(
            &format!("/projects/{project_id}/timesheets"),
            json!({"work_date": "2024-03-04", "hours": 8, "cost_amount": 200, "billable": true}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = app
        .post(
            &format!("/projects/{project_id}/expenses"),
            json!({"description": "Travel", "amount": 300, "expense_date": "2024-03-05", "billable": true}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .get(&format!("/analytics/projects/{project_id}/summary"))
        .await;
    assert_eq!(status, StatusCode::OK);
    let budget = &body["budget_analysis"];
    assert_eq!(budget["total_cost"], 200.0);
    assert_eq!(budget["total_expenses"], 300.0);
    assert_eq!(budget["total_spent"], 500.0);
    assert_eq!(budget["remaining_budget"], 500.0);
    assert_eq!(budget["budget_utilization_percent"], 50.0);
    assert_eq!(body["timesheets"]["billable_percentage"], 100.0);
}

#[tokio::test]
async fn test_timesheet_report_echoes_filters() {
    let mut app = TestApp::new().await;
    app.sign_in("t@x.com").await;
    let project_id = app.create_project("P-2", 0.0).await;
    for (date, hours) in [("2024-01-10", 2.0), ("2024-02-10", 3.0)] {
        app.post(
            &format!("/projects/{project_id}/timesheets"),
            json!({"work_date": date, "hours": hours}),
        )
        .await;
    }

    let (status, body) = app
        .get("/analytics/timesheets/overview?start_date=2024-02-01")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_hours"], 3.0);
    assert_eq!(body["filters"]["start_date"], "2024-02-01");
    assert_eq!(body["filters"]["end_date"], Value::Null);

    let (status, _) = app
        .get("/analytics/timesheets/overview?start_date=02/01/2024")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_sales_order_totals() {
    let mut app = TestApp::new().await;
    app.sign_in("sales@x.com").await;

    let (status, body) = app
        .post("/partners", json!({"name": "Acme", "partner_type": "customer"}))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let customer_id = body["partner"]["id"].as_i64().unwrap();

    let (status, body) = app
        .post(
            "/sales-orders",
            json!({
                "so_number": "SO-1",
                "customer_id": customer_id,
                "order_date": "2024-03-01",
                "lines": [{"description": "Consulting", "quantity": 3, "unit_price": 10}],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let order = &body["sales_order"];
    assert_eq!(order["total_amount"], 30.0);
    assert_eq!(order["lines"][0]["line_total"], 30.0);

    let order_id = order["id"].as_i64().unwrap();
    let (status, body) = app.get(&format!("/sales-orders/{order_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sales_order"]["customer_name"], "Acme");
}

#[tokio::test]
async fn test_vendor_cannot_receive_sales_order() {
    let mut app = TestApp::new().await;
    app.sign_in("buyer@x.com").await;

    let (_, body) = app
        .post("/partners", json!({"name": "Supplies Ltd", "partner_type": "vendor"}))
        .await;
    let vendor_id = body["partner"]["id"].as_i64().unwrap();

    let (status, body) = app
        .post(
            "/sales-orders",
            json!({"so_number": "SO-2", "customer_id": vendor_id, "order_date": "2024-03-01"}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Valid customer not found");

    let (status, _) = app
        .post(
            "/purchase-orders",
            json!({"po_number": "PO-1", "vendor_id": vendor_id, "order_date": "2024-03-01"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_project_delete_restricted_by_timesheet() {
    let mut app = TestApp::new().await;
    app.sign_in("d@x.com").await;
    let project_id = app.create_project("P-3", 0.0).await;

    app.post(
        &format!("/projects/{project_id}/timesheets"),
        json!({"work_date": "2024-03-04", "hours": 1}),
    )
    .await;

    let (status, _) = app.delete(&format!("/projects/{project_id}")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = app.get(&format!("/projects/{project_id}")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_referenced_user_and_partner_deletes_conflict() {
    let mut app = TestApp::new().await;
    let creator_id = app.sign_in("creator@x.com").await;
    let project_id = app.create_project("P-5", 0.0).await;
    let (status, _) = app
        .post(&format!("/projects/{project_id}/tasks"), json!({"title": "Kickoff"}))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = app
        .post("/partners", json!({"name": "Acme", "partner_type": "customer"}))
        .await;
    let customer_id = body["partner"]["id"].as_i64().unwrap();
    let (status, _) = app
        .post(
            "/sales-orders",
            json!({"so_number": "SO-9", "customer_id": customer_id, "order_date": "2024-03-01"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    app.sign_in("admin@x.com").await;
    let (status, body) = app.delete(&format!("/users/{creator_id}")).await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");
    assert_eq!(body["code"], "conflict");

    let (status, body) = app.delete(&format!("/partners/{customer_id}")).await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");
    assert_eq!(body["code"], "conflict");

    let (status, _) = app.get(&format!("/users/{creator_id}")).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.get(&format!("/partners/{customer_id}")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_null_clears_fields_and_absent_keeps_them() {
    let mut app = TestApp::new().await;
    let manager_id = app.sign_in("pm@x.com").await;

    let (status, body) = app
        .post(
            "/projects",
            json!({
                "project_code": "P-6",
                "name": "Rollout",
                "project_manager_id": manager_id,
                "start_date": "2024-01-01",
                "end_date": "2024-06-30",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let project_id = body["project"]["id"].as_i64().unwrap();

    let uri = format!("/projects/{project_id}");
    let (status, body) = app.put(&uri, json!({"name": "Rollout 2"})).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["project"]["project_manager_id"], manager_id);
    assert_eq!(body["project"]["end_date"], "2024-06-30");

    let (status, body) = app
        .put(&uri, json!({"project_manager_id": null, "end_date": null}))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["project"]["project_manager_id"], Value::Null);
    assert_eq!(body["project"]["end_date"], Value::Null);
    assert_eq!(body["project"]["start_date"], "2024-01-01");
    assert_eq!(body["project"]["name"], "Rollout 2");

    let (_, body) = app
        .post(
            &format!("/projects/{project_id}/tasks"),
            json!({"title": "Cutover", "due_date": "2024-05-01"}),
        )
        .await;
    let task_id = body["task"]["id"].as_i64().unwrap();

    let (status, body) = app
        .put(&format!("/tasks/{task_id}"), json!({"due_date": null}))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["task"]["due_date"], Value::Null);
    assert_eq!(body["task"]["title"], "Cutover");
}

#[tokio::test]
async fn test_only_author_deletes_comment() {
    let mut app = TestApp::new().await;
    app.sign_in("author@x.com").await;
    let project_id = app.create_project("P-4", 0.0).await;

    let (_, body) = app
        .post(&format!("/projects/{project_id}/tasks"), json!({"title": "Write docs"}))
        .await;
    let task_id = body["task"]["id"].as_i64().unwrap();
    let (status, body) = app
        .post(&format!("/tasks/{task_id}/comments"), json!({"comment": "First draft"}))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let comment_id = body["comment"]["id"].as_i64().unwrap();

    app.sign_in("other@x.com").await;
    let uri = format!("/tasks/{task_id}/comments/{comment_id}");
    let (status, body) = app.delete(&uri).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Only the author can delete this comment");

    app.post("/login", json!({"email": "author@x.com", "password": "secret-pass"}))
        .await;
    let (status, _) = app.delete(&uri).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_project_is_not_found() {
    let mut app = TestApp::new().await;
    app.sign_in("e@x.com").await;

    let (status, body) = app.get("/projects/999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
}
