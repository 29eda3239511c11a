//! Integration tests: the relay is served in-process on an ephemeral port and
//! driven by real WebSocket clients.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use survivors_server::{
    config::RelayConfig,
    infrastructure::{auth::issue_token, dto::http::HealthDto, identity::NoopIdentityProvider},
    ui::Server,
};
use tokio::{net::TcpStream, sync::oneshot};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

const SECRET: &str = "integration-secret";
const RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// Helper struct to manage the in-process server lifecycle
struct TestServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestServer {
    async fn start() -> Self {
        let config = RelayConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            twitch_client_secret: Some(SECRET.to_string()),
            ..RelayConfig::default()
        };
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel::<()>();

        let server = Server::from_config(config, Arc::new(NoopIdentityProvider));
        tokio::spawn(async move {
            server
                .serve(listener, async move {
                    let _ = rx.await;
                })
                .await
                .map_err(|e| e.to_string())
        });

        TestServer {
            addr,
            shutdown: Some(tx),
        }
    }

    fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    fn http_url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    async fn health(&self) -> HealthDto {
        reqwest::get(self.http_url("/health"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }

    /// Poll `/health` until `predicate` holds.
    async fn wait_for(&self, predicate: impl Fn(&HealthDto) -> bool) -> HealthDto {
        for _ in 0..50 {
            let health = self.health().await;
            if predicate(&health) {
                return health;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("server never reached the expected state");
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// Helper struct wrapping a WebSocket client
struct TestClient {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl TestClient {
    async fn connect(server: &TestServer) -> Self {
        let (ws, _) = connect_async(server.ws_url()).await.unwrap();
        TestClient { ws }
    }

    async fn send_json(&mut self, value: Value) {
        self.send_text(&value.to_string()).await;
    }

    async fn send_text(&mut self, text: &str) {
        self.ws.send(Message::Text(text.into())).await.unwrap();
    }

    /// Next text frame as JSON, skipping control frames.
    async fn recv_json(&mut self) -> Value {
        loop {
            let message = tokio::time::timeout(RECV_TIMEOUT, self.ws.next())
                .await
                .expect("timed out waiting for a message")
                .expect("stream ended")
                .unwrap();
            if let Message::Text(text) = message {
                return serde_json::from_str(text.as_str()).unwrap();
            }
        }
    }

    /// `true` if no text frame arrives within `wait`.
    async fn stays_silent(&mut self, wait: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + wait;
        loop {
            match tokio::time::timeout_at(deadline, self.ws.next()).await {
                Err(_) => return true,
                Ok(Some(Ok(Message::Text(_)))) => return false,
                Ok(Some(Ok(_))) => continue,
                Ok(_) => return true,
            }
        }
    }
}

fn token_for(subject: &str) -> String {
    let now = Utc::now().timestamp();
    issue_token(SECRET.as_bytes(), subject, now, now + 3600).unwrap()
}

async fn connect_game(server: &TestServer) -> TestClient {
    let mut game = TestClient::connect(server).await;
    game.send_json(json!({"role": "game"})).await;
    server.wait_for(|health| health.games == 1).await;
    game
}

#[tokio::test]
async fn test_health_reports_connections() {
    // テスト項目: /health が接続数を返す
    // given (前提条件):
    let server = TestServer::start().await;

    // when (操作):
    let empty = server.health().await;
    let _game = connect_game(&server).await;
    let _viewer = TestClient::connect(&server).await;
    let health = server.wait_for(|health| health.connections == 2).await;

    // then (期待する結果):
    assert_eq!(empty.status, "healthy");
    assert_eq!(empty.connections, 0);
    assert_eq!(health.games, 1);
    assert_eq!(health.extensions, 0);
}

#[tokio::test]
async fn test_extension_join_and_actions_reach_game() {
    // テスト項目: extension の join と str がゲームに届き、ゲームのイベントが extension に届く
    // given (前提条件):
    let server = TestServer::start().await;
    let mut game = connect_game(&server).await;
    let mut extension = TestClient::connect(&server).await;
    let token = token_for("u1");

    // when (操作): join して str を送る
    extension
        .send_json(json!({
            "role": "extension", "token": token, "user": {"id": "u1", "display_name": "Alice"}, "action": "join"
        }))
        .await;
    let joined = game.recv_json().await;
    extension
        .send_json(json!({
            "role": "extension", "token": token, "user": {"id": "u1"}, "action": "str", "data": 5
        }))
        .await;
    let forwarded = game.recv_json().await;

    // then (期待する結果):
    assert_eq!(
        joined,
        json!({"user": {"id": "u1", "display_name": "Alice"}, "action": "join", "data": null})
    );
    assert_eq!(
        forwarded,
        json!({"user": {"id": "u1", "display_name": "Alice"}, "action": "str", "data": 5})
    );

    // when (操作): ゲームが level_up イベントを送る
    game.send_json(json!({
        "role": "game", "user": {"id": "u1", "display_name": "Alice"}, "event": 4, "data": {"level": 3}
    }))
    .await;

    // then (期待する結果):
    assert_eq!(
        extension.recv_json().await,
        json!({"user": {"id": "u1", "display_name": "Alice"}, "action": "level_up", "data": {"level": 3}})
    );
}

#[tokio::test]
async fn test_untrusted_join_is_dropped() {
    // テスト項目: トークンの無い join はゲームに届かない
    let server = TestServer::start().await;
    let mut game = connect_game(&server).await;
    let mut intruder = TestClient::connect(&server).await;

    intruder
        .send_json(json!({"role": "mod", "user": {"id": "u1"}, "action": "join"}))
        .await;

    assert!(game.stays_silent(Duration::from_millis(300)).await);
    assert_eq!(server.health().await.extensions, 0);
}

#[tokio::test]
async fn test_malformed_frame_keeps_connection_open() {
    // テスト項目: 不正なフレームの後も同じ接続でやり取りできる
    let server = TestServer::start().await;
    let mut viewer = TestClient::connect(&server).await;

    viewer.send_text("{ not json").await;
    viewer
        .send_json(json!({"role": "viewer", "user": {"id": "v1"}, "action": "storekeeper"}))
        .await;

    let reply = viewer.recv_json().await;
    assert_eq!(reply["action"], "storekeeper");
    assert_eq!(reply["data"]["error"], "No storekeepers available right now");
}

#[tokio::test]
async fn test_storekeeper_record_is_served_from_cache() {
    // テスト項目: ゲームが送った商品レコードが viewer に返される
    let server = TestServer::start().await;
    let mut game = connect_game(&server).await;
    let record = json!({"name": "Seksal", "phrases": ["Welcome!"], "common_items": [{"id": 1}]});
    game.send_json(record.clone()).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    let mut viewer = TestClient::connect(&server).await;
    viewer
        .send_json(json!({"role": "viewer", "user": {"id": "v1"}, "action": "storekeeper"}))
        .await;

    let reply = viewer.recv_json().await;
    assert_eq!(reply["data"], record);
}

#[tokio::test]
async fn test_second_extension_displaces_first() {
    // テスト項目: 同じユーザーの 2 つ目の extension が 1 つ目を切断する
    let server = TestServer::start().await;
    let token = token_for("u1");
    let join = json!({"role": "extension", "token": token, "user": {"id": "u1"}, "action": "join"});

    let mut first = TestClient::connect(&server).await;
    first.send_json(join.clone()).await;
    server.wait_for(|health| health.extensions == 1).await;
    let mut second = TestClient::connect(&server).await;
    second.send_json(join).await;

    let closed = tokio::time::timeout(RECV_TIMEOUT, async {
        loop {
            match first.ws.next().await {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return true,
                Some(Ok(_)) => continue,
            }
        }
    })
    .await;
    assert!(matches!(closed, Ok(true)));
    let health = server.wait_for(|health| health.connections == 1).await;
    assert_eq!(health.extensions, 1);
}

#[tokio::test]
async fn test_displaced_extension_is_dropped_even_when_not_reading() {
    // テスト項目: 受信を止めて書き込みが詰まった extension も、差し替え時に即座に切断される
    // given (前提条件): u1 として join した後、一切受信しないクライアント
    let server = TestServer::start().await;
    let _game = connect_game(&server).await;
    let token = token_for("u1");
    let join = json!({"role": "extension", "token": token, "user": {"id": "u1"}, "action": "join"});
    let mut stalled = TestClient::connect(&server).await;
    stalled.send_json(join.clone()).await;
    server.wait_for(|health| health.extensions == 1).await;

    // when (操作): u1 宛ての応答を大量に流して書き込みを詰まらせ、別の接続で join する
    let mut flooder = TestClient::connect(&server).await;
    let payload = "x".repeat(8 * 1024);
    for _ in 0..4000 {
        flooder
            .send_json(json!({"user": {"id": "u1"}, "action": "shop", "data": payload}))
            .await;
    }
    let mut replacement = TestClient::connect(&server).await;
    replacement.send_json(join).await;

    // then (期待する結果): game, flooder, replacement の 3 本だけが残る
    let health = server.wait_for(|health| health.connections == 3).await;
    assert_eq!(health.extensions, 1);
    drop(stalled);
}

#[tokio::test]
async fn test_unknown_path_is_not_found() {
    // テスト項目: 未定義のパスは 404
    let server = TestServer::start().await;

    let response = reqwest::get(server.http_url("/nope")).await.unwrap();
    let root = reqwest::get(server.http_url("/")).await.unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
    assert!(root.status().is_success());
}
