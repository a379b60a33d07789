use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response, StatusCode, header},
};
use jokeshop::{AppState, app, auth, db, ledger};
use sqlx::SqlitePool;
use tower::ServiceExt;
use tower_sessions::{MemoryStore, SessionManagerLayer};

struct Client {
    app: Router,
    cookie: Option<String>,
}

impl Client {
    async fn new() -> (Client, SqlitePool) {
        let db_pool = db::connect("sqlite::memory:", 1).await.unwrap();
        let session_layer = SessionManagerLayer::new(MemoryStore::default()).with_secure(false);
        let app = app(AppState { db_pool: db_pool.clone() }, session_layer);
        (Client { app, cookie: None }, db_pool)
    }

    /// A second browser talking to the same server.
    fn another(&self) -> Client {
        Client {
            app: self.app.clone(),
            cookie: None,
        }
    }

    async fn send(&mut self, request: Request<Body>) -> Response<Body> {
        let response = self.app.clone().oneshot(request).await.unwrap();
        if let Some(set_cookie) = response.headers().get(header::SET_COOKIE) {
            let pair = set_cookie.to_str().unwrap().split(';').next().unwrap();
            self.cookie = Some(pair.to_owned());
        }
        response
    }

    async fn get(&mut self, uri: &str) -> Response<Body> {
        let mut request = Request::get(uri);
        if let Some(cookie) = &self.cookie {
            request = request.header(header::COOKIE, cookie);
        }
        self.send(request.body(Body::empty()).unwrap()).await
    }

    async fn post(&mut self, uri: &str, form: &str) -> Response<Body> {
        let mut request = Request::post(uri).header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = &self.cookie {
            request = request.header(header::COOKIE, cookie);
        }
        self.send(request.body(Body::from(form.to_owned())).unwrap()).await
    }

    async fn login(&mut self, identity: &str, password: &str) {
        let response = self.post("/auth/login", &format!("identity={identity}&password={password}")).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(self.cookie.is_some());
    }
}

fn location(response: &Response<Body>) -> &str {
    response.headers()[header::LOCATION].to_str().unwrap()
}

async fn text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn anonymous_user_is_sent_to_login() {
    let (mut client, _) = Client::new().await;

    let response = client.get("/jokes/my").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/auth/login");

    let page = text(client.get("/auth/login").await).await;
    assert!(page.contains("You need to be logged in to view this page."));
}

#[tokio::test]
async fn register_login_leave_and_check_balance() {
    let (mut client, _) = Client::new().await;

    let response = client
        .post("/auth/register", "email=alice%40example.com&nickname=alice&password=pw")
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/auth/login");

    let response = client.post("/auth/login", "identity=alice&password=pw").await;
    assert_eq!(location(&response), "/jokes/leave");

    let response = client.post("/jokes/leave", "title=Knock+knock&body=Who%27s+there%3F").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/jokes/my");

    let response = client.get("/jokes/balance").await;
    assert_eq!(response.status(), StatusCode::OK);
    let balance: serde_json::Value = serde_json::from_str(&text(response).await).unwrap();
    assert_eq!(balance, serde_json::json!({ "joke_balance": 1 }));

    let page = text(client.get("/jokes/my").await).await;
    assert!(page.contains("Your joke was successfully added!"));
    assert!(page.contains("Knock knock"));
}

#[tokio::test]
async fn bad_login_flashes_and_stays_logged_out() {
    let (mut client, db_pool) = Client::new().await;
    auth::register(&db_pool, "alice@example.com", "alice", "pw").await.unwrap();

    let response = client.post("/auth/login", "identity=alice&password=wrong").await;
    assert_eq!(location(&response), "/auth/login");

    let response = client.get("/jokes/leave").await;
    assert_eq!(location(&response), "/auth/login");
}

#[tokio::test]
async fn moderator_pages_need_the_role() {
    let (mut client, db_pool) = Client::new().await;
    auth::register(&db_pool, "bob@example.com", "bob", "pw").await.unwrap();
    client.login("bob", "pw").await;

    let response = client.get("/moderate/roles").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    auth::init_moderator(&db_pool, "bob@example.com", "unused").await.unwrap();

    let response = client.get("/moderate/roles").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(text(response).await.contains("bob@example.com"));
}

#[tokio::test]
async fn last_moderator_cannot_step_down() {
    let (mut client, db_pool) = Client::new().await;
    let root = auth::init_moderator(&db_pool, "root@example.com", "pw").await.unwrap();
    client.login("root@example.com", "pw").await;

    let response = client
        .post("/moderate/roles", &format!("user_id={}&action=remove_moderator", root.id))
        .await;
    assert_eq!(location(&response), "/moderate/roles");

    let page = text(client.get("/moderate/roles").await).await;
    assert!(page.contains("Cannot remove the last Moderator!"));
    assert!(db::get_user(&db_pool, root.id).await.unwrap().unwrap().is_moderator());
}

#[tokio::test]
async fn view_without_credits_is_refused() {
    let (mut client, db_pool) = Client::new().await;
    let alice = auth::register(&db_pool, "alice@example.com", "alice", "pw").await.unwrap();
    let joke = ledger::leave(&db_pool, alice.id, "Knock knock", "Who's there?").await.unwrap();
    let bob = auth::register(&db_pool, "bob@example.com", "bob", "pw").await.unwrap();
    client.login("bob", "pw").await;

    let response = client.get(&format!("/jokes/{}", joke.id)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/jokes/my");
    assert_eq!(ledger::balance(&db_pool, bob.id).await.unwrap(), 0);
    assert!(!ledger::has_viewed(&db_pool, bob.id, joke.id).await.unwrap());
}

#[tokio::test]
async fn paid_view_shows_the_joke() {
    let (mut client, db_pool) = Client::new().await;
    let alice = auth::register(&db_pool, "alice@example.com", "alice", "pw").await.unwrap();
    let joke = ledger::leave(&db_pool, alice.id, "Knock knock", "Who's *there*?").await.unwrap();
    let bob = auth::register(&db_pool, "bob@example.com", "bob", "pw").await.unwrap();
    ledger::leave(&db_pool, bob.id, "Why the chicken", "To get across.").await.unwrap();
    client.login("bob", "pw").await;

    let response = client.get(&format!("/jokes/{}", joke.id)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(text(response).await.contains("<em>there</em>"));
    assert_eq!(ledger::balance(&db_pool, bob.id).await.unwrap(), 0);

    let response = client.get(&format!("/jokes/{}", joke.id)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(ledger::balance(&db_pool, bob.id).await.unwrap(), 0);
}

#[tokio::test]
async fn logout_only_follows_local_return_urls() {
    let (mut client, _) = Client::new().await;

    let response = client.get("/auth/logout?return_url=//evil.example").await;
    assert_eq!(location(&response), "/");

    let response = client.get("/auth/logout?return_url=/jokes/take").await;
    assert_eq!(location(&response), "/jokes/take");
}

#[tokio::test]
async fn unknown_pages_are_not_found() {
    let (mut client, _) = Client::new().await;

    let response = client.get("/no/such/page").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn take_then_take_again() {
    let (mut client, db_pool) = Client::new().await;
    let alice = auth::register(&db_pool, "alice@example.com", "alice", "pw").await.unwrap();
    let joke = ledger::leave(&db_pool, alice.id, "Knock knock", "Who's there?").await.unwrap();
    let bob = auth::register(&db_pool, "bob@example.com", "bob", "pw").await.unwrap();
    ledger::leave(&db_pool, bob.id, "Why the chicken", "To get across.").await.unwrap();
    client.login("bob", "pw").await;

    let form = format!("joke_id={}", joke.id);
    let response = client.post("/jokes/take", &form).await;
    assert_eq!(location(&response), "/jokes/my");
    assert!(ledger::has_taken(&db_pool, bob.id, joke.id).await.unwrap());
    assert_eq!(ledger::balance(&db_pool, bob.id).await.unwrap(), 1);

    let response = client.post("/jokes/take", &form).await;
    assert_eq!(location(&response), "/jokes/take");
    let page = text(client.get("/jokes/take").await).await;
    assert!(page.contains("You have already taken this joke."));
}

#[tokio::test]
async fn rating_goes_back_to_the_joke() {
    let (mut client, db_pool) = Client::new().await;
    let alice = auth::register(&db_pool, "alice@example.com", "alice", "pw").await.unwrap();
    let joke = ledger::leave(&db_pool, alice.id, "Knock knock", "Who's there?").await.unwrap();
    auth::register(&db_pool, "bob@example.com", "bob", "pw").await.unwrap();
    client.login("bob", "pw").await;

    let uri = format!("/jokes/{}/rate", joke.id);
    let back = format!("/jokes/{}", joke.id);

    let response = client.post(&uri, "rating=5").await;
    assert_eq!(location(&response), back);
    assert_eq!(ledger::average_rating(&db_pool, joke.id).await.unwrap(), 5.0);

    let response = client.post(&uri, "rating=9").await;
    assert_eq!(location(&response), back);
    assert_eq!(ledger::average_rating(&db_pool, joke.id).await.unwrap(), 5.0);
}

#[tokio::test]
async fn only_the_author_edits_and_deletes() {
    let (mut bob_client, db_pool) = Client::new().await;
    let mut alice_client = bob_client.another();
    let alice = auth::register(&db_pool, "alice@example.com", "alice", "pw").await.unwrap();
    let joke = ledger::leave(&db_pool, alice.id, "Knock knock", "Who's there?").await.unwrap();
    auth::register(&db_pool, "bob@example.com", "bob", "pw").await.unwrap();
    bob_client.login("bob", "pw").await;
    alice_client.login("alice", "pw").await;

    let edit = format!("/jokes/{}/edit", joke.id);
    let delete = format!("/jokes/{}/delete", joke.id);

    let response = bob_client.post(&edit, "body=hijacked").await;
    assert_eq!(location(&response), "/jokes/my");
    let response = bob_client.post(&delete, "").await;
    assert_eq!(location(&response), "/jokes/my");
    let page = text(bob_client.get("/jokes/my").await).await;
    assert!(page.contains("You are not allowed to change this joke."));
    let stored = db::get_joke(&db_pool, joke.id).await.unwrap().unwrap();
    assert_eq!(stored.body, "Who's there?");

    let response = alice_client.post(&edit, "body=Doctor.").await;
    assert_eq!(location(&response), format!("/jokes/{}", joke.id));
    let stored = db::get_joke(&db_pool, joke.id).await.unwrap().unwrap();
    assert_eq!(stored.body, "Doctor.");

    let response = alice_client.post(&delete, "").await;
    assert_eq!(location(&response), "/jokes/my");
    assert!(db::get_joke(&db_pool, joke.id).await.unwrap().is_none());
}

#[tokio::test]
async fn moderators_edit_and_delete_any_joke() {
    let (mut client, db_pool) = Client::new().await;
    let mut outsider = client.another();
    let alice = auth::register(&db_pool, "alice@example.com", "alice", "pw").await.unwrap();
    let joke = ledger::leave(&db_pool, alice.id, "Knock knock", "Who's there?").await.unwrap();
    auth::init_moderator(&db_pool, "root@example.com", "pw").await.unwrap();
    client.login("root@example.com", "pw").await;
    outsider.login("alice", "pw").await;

    let delete = format!("/moderate/jokes/{}/delete", joke.id);
    let response = outsider.post(&delete, "").await;
    assert_eq!(location(&response), "/");
    assert!(db::get_joke(&db_pool, joke.id).await.unwrap().is_some());

    let response = client.get("/moderate/jokes").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(text(response).await.contains("Knock knock"));

    let response = client
        .post(&format!("/moderate/jokes/{}/edit", joke.id), "body=Cleaned+up.")
        .await;
    assert_eq!(location(&response), "/moderate/jokes");
    let stored = db::get_joke(&db_pool, joke.id).await.unwrap().unwrap();
    assert_eq!(stored.body, "Cleaned up.");

    let response = client.post(&delete, "").await;
    assert_eq!(location(&response), "/moderate/jokes");
    assert!(db::get_joke(&db_pool, joke.id).await.unwrap().is_none());
}
