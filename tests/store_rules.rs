//! End-to-end rules that need the store.
//!
//! Runs against the Postgres named by `TEST_DATABASE_URL` and is skipped when
//! it is unset. Every test creates its own users and restaurants, so the
//! suite can share one database.

use axum::{
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use diesel_migrations::{EmbeddedMigrations, embed_migrations};
use restaurant_ops::{
    app_state::AppState,
    auth::{JwtConfig, JwtService},
    config::DatabaseConfig,
    db, routes,
};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use tokio::sync::OnceCell;
use tower::ServiceExt;
use uuid::Uuid;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");
const PASSWORD: &str = "secret123";

static MIGRATED: OnceCell<()> = OnceCell::const_new();

struct TestApp {
    state: AppState,
}

impl TestApp {
    async fn start(max_connections: u32) -> Option<Self> {
        let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
            eprintln!("TEST_DATABASE_URL is not set, skipping");
            return None;
        };

        MIGRATED
            .get_or_init(|| async {
                db::run_migrations_blocking(MIGRATIONS, &url).await.unwrap();
            })
            .await;

        let pool = db::create_pool(&DatabaseConfig {
            url,
            max_connections,
            connect_timeout_secs: 2,
        })
        .await
        .unwrap();
        let jwt = JwtService::with_config(JwtConfig {
            secret: "store-test-secret-that-is-at-least-32-bytes".into(),
            expiration_minutes: 60,
        });
        Some(Self {
            state: AppState::new(pool, jwt, 0),
        })
    }

    fn booking_at(&self, restaurant_id: i32) -> Self {
        let mut state = self.state.clone();
        state.booking_restaurant_id = restaurant_id;
        Self { state }
    }

    async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = routes::app(self.state.clone())
            .oneshot(request)
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    /// Registers a fresh account and returns its id, email and token.
    async fn sign_up(&self, label: &str) -> (i32, String, String) {
        let email = format!("{label}-{}@example.com", Uuid::new_v4().simple());
        let (status, body) = self
            .call(
                Method::POST,
                "/auth/register",
                None,
                Some(json!({ "name": label, "email": email, "password": PASSWORD })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        let id = body["data"]["user"]["id"].as_i64().unwrap() as i32;
        let token = body["data"]["token"].as_str().unwrap().to_owned();
        (id, email, token)
    }

    async fn log_in(&self, email: &str) -> String {
        let (status, body) = self
            .call(
                Method::POST,
                "/auth/login",
                None,
                Some(json!({ "email": email, "password": PASSWORD })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["data"]["token"].as_str().unwrap().to_owned()
    }

    async fn open_restaurant(&self, token: &str, menu: Value) -> i32 {
        let (status, body) = self
            .call(
                Method::POST,
                "/restaurants/register",
                Some(token),
                Some(json!({
                    "name": unique("Cafe"),
                    "address": "12 Market Road",
                    "phone": "555-0100",
                    "menu": menu,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"]["id"].as_i64().unwrap() as i32
    }

    /// Hires a new account and returns the employee id, email and token.
    async fn hire(&self, owner: &str, restaurant_id: i32, role: &str) -> (i32, String, String) {
        let email = format!("{role}-{}@example.com", Uuid::new_v4().simple());
        let (status, body) = self
            .call(
                Method::POST,
                &format!("/employees/{restaurant_id}/add"),
                Some(owner),
                Some(json!({
                    "name": role,
                    "email": email,
                    "password": PASSWORD,
                    "role": role,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        let employee_id = body["data"]["id"].as_i64().unwrap() as i32;
        let token = self.log_in(&email).await;
        (employee_id, email, token)
    }

    async fn menu_ids(&self, restaurant_id: i32) -> Vec<(String, i32)> {
        let (status, body) = self
            .call(Method::GET, &format!("/menu/{restaurant_id}"), None, None)
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|item| {
                (
                    item["name"].as_str().unwrap().to_owned(),
                    item["id"].as_i64().unwrap() as i32,
                )
            })
            .collect()
    }

    async fn profile(&self, token: &str) -> Value {
        let (status, body) = self.call(Method::GET, "/users/profile", Some(token), None).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["data"].clone()
    }
}

fn unique(label: &str) -> String {
    format!("{label} {}", Uuid::new_v4().simple())
}

fn money(value: &Value) -> Decimal {
    value.as_str().unwrap().parse().unwrap()
}

fn id_of(menu: &[(String, i32)], name: &str) -> i32 {
    menu.iter().find(|(n, _)| n == name).unwrap().1
}

#[tokio::test]
async fn authenticated_request_fits_in_a_single_connection_pool() {
    let Some(app) = TestApp::start(1).await else {
        return;
    };
    let (id, _, token) = app.sign_up("solo").await;

    let profile = app.profile(&token).await;
    assert_eq!(profile["id"], id);
    assert_eq!(profile["role"], "customer");
}

#[tokio::test]
async fn one_restaurant_per_owner_and_unique_names() {
    let Some(app) = TestApp::start(4).await else {
        return;
    };
    let (_, _, first) = app.sign_up("owner").await;
    let (_, _, second) = app.sign_up("rival").await;
    let name = unique("Cafe1");
    let restaurant = |name: &str| {
        json!({ "name": name, "address": "1 High Street", "phone": "555-0101" })
    };

    let (status, body) = app
        .call(Method::POST, "/restaurants/register", Some(&first), Some(restaurant(&name)))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(app.profile(&first).await["role"], "admin");

    let (status, body) = app
        .call(
            Method::POST,
            "/restaurants/register",
            Some(&first),
            Some(restaurant(&unique("Cafe2"))),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "You have already registered a restaurant.");

    let (status, body) = app
        .call(Method::POST, "/restaurants/register", Some(&second), Some(restaurant(&name)))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Restaurant name already taken.");
    assert_eq!(app.profile(&second).await["role"], "customer");
}

#[tokio::test]
async fn order_total_is_snapshotted_and_billed_once() {
    let Some(app) = TestApp::start(4).await else {
        return;
    };
    let (_, _, owner) = app.sign_up("owner").await;
    let restaurant_id = app
        .open_restaurant(
            &owner,
            json!([{ "name": "Paneer", "price": 100 }, { "name": "Naan", "price": 50 }]),
        )
        .await;
    let menu = app.menu_ids(restaurant_id).await;

    let (status, body) = app
        .call(
            Method::POST,
            &format!("/orders/{restaurant_id}"),
            Some(&owner),
            Some(json!({
                "table_number": "T1",
                "customer_name": "Asha",
                "items": [
                    { "menu_item_id": id_of(&menu, "Paneer"), "quantity": 2 },
                    { "menu_item_id": id_of(&menu, "Naan"), "quantity": 1 },
                ],
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let order_id = body["data"]["order"]["id"].as_i64().unwrap();
    assert_eq!(money(&body["data"]["order"]["total_amount"]), Decimal::new(250, 0));

    let (status, _) = app
        .call(
            Method::PUT,
            &format!("/menu/{restaurant_id}/{}", id_of(&menu, "Paneer")),
            Some(&owner),
            Some(json!({ "price": 300 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app
        .call(Method::GET, &format!("/orders/{restaurant_id}"), Some(&owner), None)
        .await;
    let listed = &body["data"][0];
    assert_eq!(listed["order"]["id"], order_id);
    assert_eq!(money(&listed["order"]["total_amount"]), Decimal::new(250, 0));
    assert_eq!(money(&listed["items"][0]["price"]), Decimal::new(100, 0));

    let generate = format!("/bills/generate-from-order/{order_id}");
    let (status, body) = app
        .call(Method::POST, &generate, Some(&owner), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(money(&body["data"]["bill"]["total_without_tax"]), Decimal::new(250, 0));
    assert_eq!(money(&body["data"]["bill"]["total_amount"]), Decimal::new(295, 0));
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 2);

    let (status, body) = app
        .call(Method::POST, &generate, Some(&owner), Some(json!({ "gst_percentage": 0 })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Bill already generated for this order");

    let (_, body) = app
        .call(
            Method::GET,
            &format!("/orders/{restaurant_id}?status=billed"),
            Some(&owner),
            None,
        )
        .await;
    assert_eq!(body["data"][0]["order"]["id"], order_id);
}

#[tokio::test]
async fn chef_and_waiter_status_rules() {
    let Some(app) = TestApp::start(4).await else {
        return;
    };
    let (_, _, owner) = app.sign_up("owner").await;
    let restaurant_id = app
        .open_restaurant(&owner, json!([{ "name": "Dal", "price": 80 }]))
        .await;
    let menu = app.menu_ids(restaurant_id).await;
    let (_, _, chef) = app.hire(&owner, restaurant_id, "chef").await;
    let (_, _, waiter) = app.hire(&owner, restaurant_id, "waiter").await;

    let (status, _) = app
        .call(
            Method::POST,
            &format!("/orders/{restaurant_id}"),
            Some(&waiter),
            Some(json!({ "table_number": "T4", "customer_name": "Ravi", "items": [] })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .call(
            Method::POST,
            &format!("/orders/{restaurant_id}"),
            Some(&waiter),
            Some(json!({
                "table_number": "T4",
                "customer_name": "Ravi",
                "items": [{ "menu_item_id": id_of(&menu, "Dal"), "quantity": 1 }],
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let status_uri = format!("/orders/{}/status", body["data"]["order"]["id"]);

    for target in ["billed", "served"] {
        let (status, body) = app
            .call(Method::PUT, &status_uri, Some(&chef), Some(json!({ "status": target })))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{target}: {body}");
        assert_eq!(body["message"], "Chef can only set status to preparing or ready");
    }

    let (status, body) = app
        .call(Method::PUT, &status_uri, Some(&chef), Some(json!({ "status": "preparing" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["served_at"].is_null());

    let (status, body) = app
        .call(Method::PUT, &status_uri, Some(&waiter), Some(json!({ "status": "served" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "served");
    assert!(body["data"]["served_at"].is_string());

    let (status, _) = app
        .call(Method::PUT, &status_uri, Some(&waiter), Some(json!({ "status": "billed" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn dismissed_employee_becomes_an_unbound_customer() {
    let Some(app) = TestApp::start(4).await else {
        return;
    };
    let (_, _, owner) = app.sign_up("owner").await;
    let restaurant_id = app.open_restaurant(&owner, json!([])).await;
    let (employee_id, _, cashier) = app.hire(&owner, restaurant_id, "cashier").await;

    let profile = app.profile(&cashier).await;
    assert_eq!(profile["role"], "cashier");
    assert_eq!(profile["restaurant_id"], restaurant_id);

    let (status, body) = app
        .call(
            Method::DELETE,
            &format!("/employees/{restaurant_id}/{employee_id}"),
            Some(&owner),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let profile = app.profile(&cashier).await;
    assert_eq!(profile["role"], "customer");
    assert!(profile["restaurant_id"].is_null());

    let (status, _) = app
        .call(Method::GET, &format!("/bills/restaurant/{restaurant_id}"), Some(&cashier), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn employee_roles_change_only_through_the_employee_registry() {
    let Some(app) = TestApp::start(4).await else {
        return;
    };
    let (_, _, owner) = app.sign_up("owner").await;
    let restaurant_id = app.open_restaurant(&owner, json!([])).await;
    let (employee_id, waiter_email, waiter) = app.hire(&owner, restaurant_id, "waiter").await;

    let (status, _) = app
        .call(
            Method::PUT,
            "/users/update-role",
            Some(&owner),
            Some(json!({ "email": waiter_email, "new_role": "customer" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(app.profile(&waiter).await["role"], "waiter");

    let (status, body) = app
        .call(
            Method::PUT,
            &format!("/employees/{restaurant_id}/{employee_id}"),
            Some(&owner),
            Some(json!({ "role": "chef" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["role"], "chef");
    let profile = app.profile(&waiter).await;
    assert_eq!(profile["role"], "chef");
    assert_eq!(profile["restaurant_id"], restaurant_id);

    let (_, guest_email, guest) = app.sign_up("guest").await;
    let (status, body) = app
        .call(
            Method::PUT,
            "/users/update-role",
            Some(&owner),
            Some(json!({ "email": guest_email, "new_role": "cashier" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let profile = app.profile(&guest).await;
    assert_eq!(profile["role"], "cashier");
    assert_eq!(profile["restaurant_id"], restaurant_id);
}

#[tokio::test]
async fn customer_bookings_are_private_and_filtered_by_date() {
    let Some(app) = TestApp::start(4).await else {
        return;
    };
    let (_, _, owner) = app.sign_up("owner").await;
    let restaurant_id = app.open_restaurant(&owner, json!([])).await;
    let app = app.booking_at(restaurant_id);
    let (guest_id, _, guest) = app.sign_up("guest").await;
    let (other_id, _, _) = app.sign_up("other").await;

    let (status, body) = app
        .call(
            Method::POST,
            "/bookings",
            Some(&guest),
            Some(json!({ "date": "2099-01-01", "time": "19:30", "guests": 4 })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["status"], "pending");
    let booking_id = body["data"]["id"].clone();

    let (status, _) = app
        .call(Method::GET, &format!("/bookings/customer/{other_id}"), Some(&guest), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .call(Method::GET, &format!("/bookings/customer/{guest_id}"), Some(&guest), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["id"], booking_id);

    let listing = |filter: &str| format!("/bookings/restaurant/{restaurant_id}?filter={filter}");
    let (_, body) = app.call(Method::GET, &listing("upcoming"), Some(&owner), None).await;
    assert_eq!(body["data"][0]["id"], booking_id);
    let (_, body) = app.call(Method::GET, &listing("past"), Some(&owner), None).await;
    assert!(body["data"].as_array().unwrap().is_empty());
}
