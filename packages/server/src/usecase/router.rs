//! UseCase: 受信フレームのルーティング
//!
//! 1 フレームごとに以下の順で処理する。
//!
//! 1. デコード（テキスト、または UTF-8 のバイナリ）
//! 2. JSON オブジェクトとしてのパース
//! 3. パススルー（商品レコード、ゲームのハンドシェイク、ゲームイベント、
//!    ロール無しの応答）
//! 4. 信頼判定
//! 5. レート制限
//! 6. アクションのディスパッチ
//!
//! 不正なフレームや拒否されたフレームはログを残して破棄する。
//! 呼び出し側に返るエラーは送信エンベロープの検証失敗 ([`BusError`]) のみ。

use std::sync::Arc;

use serde_json::Value;

use crate::{
    domain::{
        Action, BusError, Connection, ConnectionRegistry, GameEvent, InboundEnvelope,
        InboundFrame, Role, UserId,
        envelope::{is_merchandise_record, parse_object},
    },
    infrastructure::cache::MerchandiseCache,
};

use super::{
    forward_action::ForwardActionUseCase, join::JoinUseCase, message_bus::MessageBus,
    rate_limiter::RateLimiter, storekeeper::StorekeeperUseCase, trust_gate::TrustGate,
};

/// Longest slice of a rejected frame written to the log.
const LOG_EXCERPT_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    InvalidTransportPayload,
    MalformedEnvelope,
    UnknownGameEvent,
    Untrusted,
    RateLimited,
    MissingAction,
    UnknownAction,
    MissingUserId,
}

/// What the router did with a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    Dropped(DropReason),
    MerchandiseCached,
    GameRegistered,
    GameEventForwarded(GameEvent),
    ResponseForwarded,
    Dispatched(Action),
}

/// ルーティングのユースケース
pub struct EnvelopeRouter {
    registry: Arc<dyn ConnectionRegistry>,
    bus: Arc<MessageBus>,
    trust_gate: TrustGate,
    rate_limiter: Arc<RateLimiter>,
    merchandise: Arc<MerchandiseCache>,
    join: JoinUseCase,
    storekeeper: StorekeeperUseCase,
    forward_action: ForwardActionUseCase,
}

impl EnvelopeRouter {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        registry: Arc<dyn ConnectionRegistry>,
        bus: Arc<MessageBus>,
        trust_gate: TrustGate,
        rate_limiter: Arc<RateLimiter>,
        merchandise: Arc<MerchandiseCache>,
        join: JoinUseCase,
        storekeeper: StorekeeperUseCase,
        forward_action: ForwardActionUseCase,
    ) -> Self {
        Self {
            registry,
            bus,
            trust_gate,
            rate_limiter,
            merchandise,
            join,
            storekeeper,
            forward_action,
        }
    }

    pub async fn route(
        &self,
        connection: &Arc<Connection>,
        frame: InboundFrame<'_>,
    ) -> Result<RouteOutcome, BusError> {
        let text = match frame.decode_text() {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(connection_id = %connection.id(), error = %e, "Invalid transport payload");
                return Ok(RouteOutcome::Dropped(DropReason::InvalidTransportPayload));
            }
        };

        let object = match parse_object(text) {
            Ok(object) => object,
            Err(e) => {
                tracing::error!(
                    connection_id = %connection.id(),
                    error = %e,
                    data = %excerpt(text),
                    "Malformed envelope"
                );
                return Ok(RouteOutcome::Dropped(DropReason::MalformedEnvelope));
            }
        };

        if is_merchandise_record(&object) {
            self.merchandise.set(Value::Object(object)).await;
            tracing::info!("Storekeeper record cached");
            return Ok(RouteOutcome::MerchandiseCached);
        }

        let envelope = match InboundEnvelope::from_object(object) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::error!(
                    connection_id = %connection.id(),
                    error = %e,
                    data = %excerpt(text),
                    "Malformed envelope"
                );
                return Ok(RouteOutcome::Dropped(DropReason::MalformedEnvelope));
            }
        };

        if let Some(outcome) = self.passthrough(connection, &envelope).await? {
            return Ok(outcome);
        }

        let role = envelope.role();
        let user_id = envelope.user_id();

        let claim = match self.trust_gate.evaluate(&envelope) {
            Ok(claim) => claim,
            Err(e) => {
                tracing::warn!(
                    role = envelope.role.as_deref().unwrap_or("unknown"),
                    user_id = user_id.as_ref().map(UserId::as_str).unwrap_or("unknown"),
                    error = %e,
                    "Envelope rejected by trust gate"
                );
                return Ok(RouteOutcome::Dropped(DropReason::Untrusted));
            }
        };
        connection
            .record_claim(
                role.clone(),
                user_id.clone(),
                claim.map(|claim| claim.subject),
            )
            .await;

        if !self.rate_limiter.check(role.as_ref(), user_id.as_ref()).await {
            tracing::warn!(
                role = envelope.role.as_deref().unwrap_or("unknown"),
                user_id = user_id.as_ref().map(UserId::as_str).unwrap_or("unknown"),
                "Rate limit exceeded"
            );
            return Ok(RouteOutcome::Dropped(DropReason::RateLimited));
        }

        self.dispatch(connection, &envelope, user_id).await
    }

    /// Shapes the game sends, routed without trust or rate limiting.
    async fn passthrough(
        &self,
        connection: &Arc<Connection>,
        envelope: &InboundEnvelope,
    ) -> Result<Option<RouteOutcome>, BusError> {
        match envelope.role() {
            Some(Role::Game) if !envelope.has_user() => {
                self.registry.register_game(Arc::clone(connection)).await;
                connection.record_claim(Some(Role::Game), None, None).await;
                tracing::info!(connection_id = %connection.id(), "Game connection registered");
                Ok(Some(RouteOutcome::GameRegistered))
            }
            Some(Role::Game) if envelope.event.is_some() => {
                self.forward_game_event(envelope).await.map(Some)
            }
            None => {
                let (Some(user_id), Some(action)) = (envelope.user_id(), envelope.action_name())
                else {
                    return Ok(None);
                };
                let delivered = self
                    .bus
                    .send_to_user(&user_id, envelope.display_name(), action, envelope.data.clone())
                    .await?;
                tracing::debug!(user_id = %user_id, action, delivered, "Game response forwarded");
                Ok(Some(RouteOutcome::ResponseForwarded))
            }
            Some(_) => Ok(None),
        }
    }

    async fn forward_game_event(&self, envelope: &InboundEnvelope) -> Result<RouteOutcome, BusError> {
        let Some(event) = envelope.event_code().and_then(GameEvent::from_code) else {
            tracing::warn!(event = ?envelope.event, "Unknown game event");
            return Ok(RouteOutcome::Dropped(DropReason::UnknownGameEvent));
        };
        let Some(user_id) = envelope.user_id() else {
            tracing::warn!(event = event.action_name(), "Game event without user.id");
            return Ok(RouteOutcome::Dropped(DropReason::MissingUserId));
        };

        let delivered = self
            .bus
            .send_to_user(
                &user_id,
                envelope.display_name(),
                event.action_name(),
                envelope.data.clone(),
            )
            .await?;
        tracing::info!(
            user_id = %user_id,
            event = event.action_name(),
            delivered,
            "Game event forwarded"
        );
        Ok(RouteOutcome::GameEventForwarded(event))
    }

    async fn dispatch(
        &self,
        connection: &Arc<Connection>,
        envelope: &InboundEnvelope,
        user_id: Option<UserId>,
    ) -> Result<RouteOutcome, BusError> {
        let Some(name) = envelope.action_name() else {
            if envelope.has_non_string_action() {
                tracing::warn!(action = ?envelope.action, "Unknown action");
                return Ok(RouteOutcome::Dropped(DropReason::UnknownAction));
            }
            tracing::warn!(role = ?envelope.role, "Envelope without action");
            return Ok(RouteOutcome::Dropped(DropReason::MissingAction));
        };
        let Some(action) = Action::parse(name) else {
            tracing::warn!(action = name, "Unknown action");
            return Ok(RouteOutcome::Dropped(DropReason::UnknownAction));
        };
        // Anonymous viewers may still ask for the storekeeper.
        let user_id = match (action, user_id) {
            (_, Some(user_id)) => user_id,
            (Action::Storekeeper, None) => UserId::anonymous(),
            (_, None) => {
                tracing::warn!(action = %action, "Action without user.id");
                return Ok(RouteOutcome::Dropped(DropReason::MissingUserId));
            }
        };

        let display_name = envelope.display_name();
        match action {
            Action::Join => {
                self.join.execute(connection, &user_id, display_name).await?;
            }
            Action::Storekeeper => {
                self.storekeeper
                    .execute(connection, &user_id, display_name)
                    .await?;
            }
            _ => {
                self.forward_action
                    .execute(
                        connection,
                        &user_id,
                        action,
                        display_name,
                        envelope.data.clone(),
                    )
                    .await?;
            }
        }
        Ok(RouteOutcome::Dispatched(action))
    }
}

fn excerpt(text: &str) -> &str {
    match text.char_indices().nth(LOG_EXCERPT_CHARS) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;
    use survivors_shared::time::{ManualClock, offset_from_hours};

    use super::*;
    use crate::{
        domain::{
            ANONYMOUS_USER_ID, ConnectionMeta, OutboundFrame, OutboundReceiver,
            identity::MockIdentityProvider,
        },
        infrastructure::{
            auth::{JwtTokenVerifier, issue_token},
            cache::DisplayNameCache,
            registry::InMemoryConnectionRegistry,
        },
        usecase::display_name::DisplayNameResolver,
    };

    const SECRET: &[u8] = b"router-secret";

    struct Fixture {
        router: EnvelopeRouter,
        registry: Arc<InMemoryConnectionRegistry>,
        merchandise: Arc<MerchandiseCache>,
        clock: Arc<ManualClock>,
    }

    fn fixture() -> Fixture {
        let mut provider = MockIdentityProvider::new();
        provider
            .expect_display_name()
            .returning(|_| Ok(Some("Resolved".to_string())));

        let clock = Arc::new(ManualClock::new(1672574400000));
        let registry = Arc::new(InMemoryConnectionRegistry::new());
        let names = Arc::new(DisplayNameCache::new());
        let bus = Arc::new(MessageBus::new(registry.clone(), names.clone()));
        let resolver = Arc::new(DisplayNameResolver::new(names, Arc::new(provider)));
        let merchandise = Arc::new(MerchandiseCache::new(clock.clone(), offset_from_hours(-3)));
        let router = EnvelopeRouter::new(
            registry.clone(),
            bus.clone(),
            TrustGate::new(Arc::new(JwtTokenVerifier::new(SECRET))),
            Arc::new(RateLimiter::new(5, clock.clone())),
            merchandise.clone(),
            JoinUseCase::new(registry.clone(), bus.clone(), resolver.clone()),
            StorekeeperUseCase::new(bus.clone(), merchandise.clone()),
            ForwardActionUseCase::new(registry.clone(), bus, resolver),
        );
        Fixture {
            router,
            registry,
            merchandise,
            clock,
        }
    }

    fn token_for(subject: &str) -> String {
        let now = Utc::now().timestamp();
        issue_token(SECRET, subject, now, now + 3600).unwrap()
    }

    async fn route_json(
        router: &EnvelopeRouter,
        connection: &Arc<Connection>,
        value: Value,
    ) -> RouteOutcome {
        let text = value.to_string();
        router
            .route(connection, InboundFrame::Text(&text))
            .await
            .unwrap()
    }

    fn drain_json(rx: &mut OutboundReceiver) -> Vec<Value> {
        let mut frames = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            if let OutboundFrame::Text(text) = frame {
                frames.push(serde_json::from_str(&text).unwrap());
            }
        }
        frames
    }

    async fn register_game(fixture: &Fixture) -> (Arc<Connection>, OutboundReceiver) {
        let (game, rx) = Connection::new(0);
        let outcome = route_json(&fixture.router, &game, json!({"role": "game"})).await;
        assert_eq!(outcome, RouteOutcome::GameRegistered);
        (game, rx)
    }

    #[tokio::test]
    async fn test_game_handshake_registers_game() {
        // テスト項目: user を持たない role=game はゲーム接続として登録される
        // given (前提条件):
        let fixture = fixture();

        // when (操作):
        let (game, _rx) = register_game(&fixture).await;

        // then (期待する結果):
        let registered = fixture.registry.game().await.unwrap();
        assert!(Arc::ptr_eq(&registered, &game));
    }

    #[tokio::test]
    async fn test_sixth_action_within_a_second_is_dropped() {
        // テスト項目: 有効なトークンの str を 1 秒以内に 6 回送ると 5 回だけゲームに届く
        // given (前提条件):
        let fixture = fixture();
        let (_game, mut game_rx) = register_game(&fixture).await;
        let (extension, _rx) = Connection::new(0);
        let message = json!({
            "role": "extension",
            "token": token_for("u1"),
            "user": {"id": "u1", "display_name": "Alice"},
            "action": "str",
            "data": 5
        });

        // when (操作):
        let mut outcomes = Vec::new();
        for _ in 0..6 {
            outcomes.push(route_json(&fixture.router, &extension, message.clone()).await);
            fixture.clock.advance(50);
        }

        // then (期待する結果):
        assert_eq!(&outcomes[..5], &[RouteOutcome::Dispatched(Action::Str); 5]);
        assert_eq!(outcomes[5], RouteOutcome::Dropped(DropReason::RateLimited));
        let forwarded = drain_json(&mut game_rx);
        assert_eq!(forwarded.len(), 5);
        for sent in forwarded {
            assert_eq!(
                sent,
                json!({"user": {"id": "u1", "display_name": "Alice"}, "action": "str", "data": 5})
            );
        }
    }

    #[tokio::test]
    async fn test_unknown_role_without_token_never_joins() {
        // テスト項目: トークンの無い role=mod の join は信頼判定で破棄される
        let fixture = fixture();
        let (_game, mut game_rx) = register_game(&fixture).await;
        let (connection, _rx) = Connection::new(0);
        let user_id = UserId::try_from("u1").unwrap();

        let outcome = route_json(
            &fixture.router,
            &connection,
            json!({"role": "mod", "user": {"id": "u1"}, "action": "join"}),
        )
        .await;

        assert_eq!(outcome, RouteOutcome::Dropped(DropReason::Untrusted));
        assert!(fixture.registry.lookup_extension(&user_id).await.is_none());
        assert!(drain_json(&mut game_rx).is_empty());
    }

    #[tokio::test]
    async fn test_game_event_is_translated_and_sent_to_user() {
        // テスト項目: event=4 は level_up として対象ユーザーの extension に届く
        // given (前提条件):
        let fixture = fixture();
        let (game, _game_rx) = register_game(&fixture).await;
        let (extension, mut extension_rx) = Connection::new(0);
        fixture
            .registry
            .register_extension(UserId::try_from("u2").unwrap(), extension)
            .await;

        // when (操作):
        let outcome = route_json(
            &fixture.router,
            &game,
            json!({"role": "game", "user": {"id": "u2", "display_name": "Bob"}, "event": 4, "data": {"level": 3}}),
        )
        .await;

        // then (期待する結果):
        assert_eq!(outcome, RouteOutcome::GameEventForwarded(GameEvent::LevelUp));
        assert_eq!(
            drain_json(&mut extension_rx),
            vec![json!({"user": {"id": "u2", "display_name": "Bob"}, "action": "level_up", "data": {"level": 3}})]
        );
    }

    #[tokio::test]
    async fn test_unknown_game_event_is_dropped() {
        // テスト項目: 未知のイベントコードは破棄される
        let fixture = fixture();
        let (game, _game_rx) = register_game(&fixture).await;

        let outcome = route_json(
            &fixture.router,
            &game,
            json!({"role": "game", "user": {"id": "u2"}, "event": 99}),
        )
        .await;

        assert_eq!(outcome, RouteOutcome::Dropped(DropReason::UnknownGameEvent));
    }

    #[tokio::test]
    async fn test_malformed_json_is_dropped_and_connection_stays_open() {
        // テスト項目: 不正な JSON は破棄され、接続は開いたまま
        let fixture = fixture();
        let (connection, _rx) = Connection::new(0);

        let outcome = fixture
            .router
            .route(&connection, InboundFrame::Text("{ not json"))
            .await
            .unwrap();

        assert_eq!(outcome, RouteOutcome::Dropped(DropReason::MalformedEnvelope));
        assert!(connection.is_open());
    }

    #[tokio::test]
    async fn test_non_object_json_never_reaches_trust_gate() {
        // テスト項目: オブジェクト以外の JSON は構造エラーで破棄され、接続情報も記録されない
        let fixture = fixture();
        let (connection, _rx) = Connection::new(0);

        for text in ["[1,2,3]", "42", "null", "\"join\""] {
            let outcome = fixture
                .router
                .route(&connection, InboundFrame::Text(text))
                .await
                .unwrap();
            assert_eq!(outcome, RouteOutcome::Dropped(DropReason::MalformedEnvelope));
        }
        assert_eq!(connection.meta().await, ConnectionMeta::default());
    }

    #[tokio::test]
    async fn test_invalid_utf8_binary_is_dropped() {
        // テスト項目: UTF-8 でないバイナリフレームは破棄される
        let fixture = fixture();
        let (connection, _rx) = Connection::new(0);

        let outcome = fixture
            .router
            .route(&connection, InboundFrame::Binary(&[0xc3, 0x28]))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            RouteOutcome::Dropped(DropReason::InvalidTransportPayload)
        );
    }

    #[tokio::test]
    async fn test_merchandise_record_is_cached() {
        // テスト項目: 商品レコードの形をしたメッセージはキャッシュに保存される
        let fixture = fixture();
        let (game, _rx) = register_game(&fixture).await;
        let record = json!({"name": "Seksal", "phrases": ["hello"], "common_items": [1, 2]});

        let outcome = route_json(&fixture.router, &game, record.clone()).await;

        assert_eq!(outcome, RouteOutcome::MerchandiseCached);
        assert_eq!(fixture.merchandise.get().await, Some(record));
    }

    #[tokio::test]
    async fn test_roleless_response_is_forwarded_to_user() {
        // テスト項目: role の無い user.id + action はユーザーへの応答として転送される
        let fixture = fixture();
        let (game, _game_rx) = register_game(&fixture).await;
        let (extension, mut extension_rx) = Connection::new(0);
        fixture
            .registry
            .register_extension(UserId::try_from("u1").unwrap(), extension)
            .await;

        let outcome = route_json(
            &fixture.router,
            &game,
            json!({"user": {"id": "u1"}, "action": "shop", "data": {"items": []}}),
        )
        .await;

        assert_eq!(outcome, RouteOutcome::ResponseForwarded);
        let sent = drain_json(&mut extension_rx);
        assert_eq!(sent[0]["action"], "shop");
        assert_eq!(sent[0]["user"]["display_name"], "Unknown");
    }

    #[tokio::test]
    async fn test_join_registers_extension_and_notifies_game() {
        // テスト項目: 認証済み join で extension 登録・表示名解決・ゲーム通知が行われる
        let fixture = fixture();
        let (_game, mut game_rx) = register_game(&fixture).await;
        let (extension, _rx) = Connection::new(0);

        let outcome = route_json(
            &fixture.router,
            &extension,
            json!({"role": "extension", "token": token_for("42"), "user": {"id": 42}, "action": "join"}),
        )
        .await;

        assert_eq!(outcome, RouteOutcome::Dispatched(Action::Join));
        let user_id = UserId::try_from("42").unwrap();
        assert!(fixture.registry.lookup_extension(&user_id).await.is_some());
        assert_eq!(
            drain_json(&mut game_rx),
            vec![json!({"user": {"id": "42", "display_name": "Resolved"}, "action": "join", "data": null})]
        );
        let meta = extension.meta().await;
        assert_eq!(meta.role, Some(Role::Extension));
        assert_eq!(meta.subject.as_deref(), Some("42"));
    }

    #[tokio::test]
    async fn test_unknown_action_is_dropped() {
        // テスト項目: 未知のアクションは破棄される
        let fixture = fixture();
        let (connection, _rx) = Connection::new(0);

        let outcome = route_json(
            &fixture.router,
            &connection,
            json!({"role": "extension", "token": token_for("u1"), "user": {"id": "u1"}, "action": "dance"}),
        )
        .await;

        assert_eq!(outcome, RouteOutcome::Dropped(DropReason::UnknownAction));
    }

    #[tokio::test]
    async fn test_anonymous_viewer_gets_cached_storekeeper() {
        // テスト項目: user.id の無い viewer にもキャッシュ済みの商品レコードが返る
        // given (前提条件):
        let fixture = fixture();
        let record = json!({"name": "Seksal", "phrases": ["hi"], "common_items": []});
        fixture.merchandise.set(record.clone()).await;
        let (viewer, mut rx) = Connection::new(0);

        // when (操作):
        let outcome = route_json(
            &fixture.router,
            &viewer,
            json!({"role": "viewer", "action": "storekeeper"}),
        )
        .await;

        // then (期待する結果):
        assert_eq!(outcome, RouteOutcome::Dispatched(Action::Storekeeper));
        let replies = drain_json(&mut rx);
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0]["data"], record);
        assert_eq!(replies[0]["user"]["id"], ANONYMOUS_USER_ID);
    }

    #[tokio::test]
    async fn test_anonymous_storekeeper_request_reaches_game() {
        // テスト項目: キャッシュが空なら匿名の要求もゲームに転送され、送信者には「商人なし」が返る
        let fixture = fixture();
        let (_game, mut game_rx) = register_game(&fixture).await;
        let (viewer, mut rx) = Connection::new(0);

        let outcome = route_json(
            &fixture.router,
            &viewer,
            json!({"role": "viewer", "action": "storekeeper"}),
        )
        .await;

        assert_eq!(outcome, RouteOutcome::Dispatched(Action::Storekeeper));
        let requests = drain_json(&mut game_rx);
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0]["action"], "storekeeper");
        assert_eq!(requests[0]["user"]["id"], ANONYMOUS_USER_ID);
        let replies = drain_json(&mut rx);
        assert_eq!(replies[0]["data"]["error"], "No storekeepers available right now");
    }

    #[tokio::test]
    async fn test_anonymous_viewer_other_actions_need_user_id() {
        // テスト項目: storekeeper 以外のアクションは user.id が無ければ破棄される
        let fixture = fixture();
        let (_game, mut game_rx) = register_game(&fixture).await;
        let (viewer, _rx) = Connection::new(0);

        let outcome = route_json(
            &fixture.router,
            &viewer,
            json!({"role": "viewer", "action": "str", "data": 1}),
        )
        .await;

        assert_eq!(outcome, RouteOutcome::Dropped(DropReason::MissingUserId));
        assert!(drain_json(&mut game_rx).is_empty());
    }

    #[tokio::test]
    async fn test_non_string_action_is_unknown() {
        // テスト項目: 文字列でない action は構造エラーではなく未知のアクションとして破棄される
        let fixture = fixture();
        let (viewer, _rx) = Connection::new(0);

        let outcome = route_json(
            &fixture.router,
            &viewer,
            json!({"role": "viewer", "user": {"id": "v1"}, "action": 5}),
        )
        .await;

        assert_eq!(outcome, RouteOutcome::Dropped(DropReason::UnknownAction));
    }

    #[tokio::test]
    async fn test_viewer_storekeeper_gets_fallback() {
        // テスト項目: キャッシュが空なら viewer には「商人なし」が返る
        let fixture = fixture();
        let (viewer, mut rx) = Connection::new(0);

        let outcome = route_json(
            &fixture.router,
            &viewer,
            json!({"role": "viewer", "user": {"id": "v1"}, "action": "storekeeper"}),
        )
        .await;

        assert_eq!(outcome, RouteOutcome::Dispatched(Action::Storekeeper));
        let replies = drain_json(&mut rx);
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0]["data"]["error"], "No storekeepers available right now");
    }
}
