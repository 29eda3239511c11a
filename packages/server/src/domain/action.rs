//! Closed sets of actions accepted from clients and events emitted by the game.

use std::fmt;

/// Action requested by an inbound envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Join,
    Storekeeper,
    Str,
    Agi,
    Vit,
    Luc,
    Equip,
    Buy,
    Sell,
    Shop,
}

impl Action {
    /// Actions forwarded verbatim to the game on behalf of a user.
    pub const GAME_ACTIONS: [Action; 8] = [
        Action::Str,
        Action::Agi,
        Action::Vit,
        Action::Luc,
        Action::Equip,
        Action::Buy,
        Action::Sell,
        Action::Shop,
    ];

    pub fn parse(name: &str) -> Option<Self> {
        let action = match name {
            "join" => Self::Join,
            "storekeeper" => Self::Storekeeper,
            "str" => Self::Str,
            "agi" => Self::Agi,
            "vit" => Self::Vit,
            "luc" => Self::Luc,
            "equip" => Self::Equip,
            "buy" => Self::Buy,
            "sell" => Self::Sell,
            "shop" => Self::Shop,
            _ => return None,
        };
        Some(action)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Join => "join",
            Self::Storekeeper => "storekeeper",
            Self::Str => "str",
            Self::Agi => "agi",
            Self::Vit => "vit",
            Self::Luc => "luc",
            Self::Equip => "equip",
            Self::Buy => "buy",
            Self::Sell => "sell",
            Self::Shop => "shop",
        }
    }

    pub fn is_game_action(self) -> bool {
        Self::GAME_ACTIONS.contains(&self)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Gameplay event pushed by the game, identified on the wire by its code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameEvent {
    Joined,
    CantJoin,
    Died,
    ExperienceUp,
    LevelUp,
    HealthChanged,
    StatusIncreased,
    Inventory,
    Used,
    Equipped,
    Buyed,
    Sold,
    ShopOpened,
    CantBuy,
    CantSell,
}

/// Indexed by event code.
const EVENT_TABLE: [GameEvent; 15] = [
    GameEvent::Joined,
    GameEvent::CantJoin,
    GameEvent::Died,
    GameEvent::ExperienceUp,
    GameEvent::LevelUp,
    GameEvent::HealthChanged,
    GameEvent::StatusIncreased,
    GameEvent::Inventory,
    GameEvent::Used,
    GameEvent::Equipped,
    GameEvent::Buyed,
    GameEvent::Sold,
    GameEvent::ShopOpened,
    GameEvent::CantBuy,
    GameEvent::CantSell,
];

impl GameEvent {
    pub fn from_code(code: u64) -> Option<Self> {
        usize::try_from(code)
            .ok()
            .and_then(|index| EVENT_TABLE.get(index))
            .copied()
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    /// Action name delivered to the extension for this event.
    pub fn action_name(self) -> &'static str {
        match self {
            Self::Joined => "joined",
            Self::CantJoin => "cant_join",
            Self::Died => "died",
            Self::ExperienceUp => "experience_up",
            Self::LevelUp => "level_up",
            Self::HealthChanged => "health_changed",
            Self::StatusIncreased => "status_increased",
            Self::Inventory => "inventory",
            Self::Used => "used",
            Self::Equipped => "equipped",
            Self::Buyed => "buyed",
            Self::Sold => "sold",
            Self::ShopOpened => "shop_opened",
            Self::CantBuy => "cant_buy",
            Self::CantSell => "cant_sell",
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_action_parse_round_trips_known_names() {
        // テスト項目: 既知のアクション名はすべて解釈できる
        // given (前提条件):
        let names = [
            "join",
            "storekeeper",
            "str",
            "agi",
            "vit",
            "luc",
            "equip",
            "buy",
            "sell",
            "shop",
        ];

        // then (期待する結果):
        for name in names {
            let action = Action::parse(name).expect("known action");
            assert_eq!(action.as_str(), name);
        }
    }

    #[test]
    fn test_action_parse_rejects_unknown_names() {
        // テスト項目: 未知のアクション名は None になる
        assert_eq!(Action::parse("dance"), None);
        assert_eq!(Action::parse("JOIN"), None);
        assert_eq!(Action::parse(""), None);
    }

    #[test]
    fn test_join_and_storekeeper_are_not_game_actions() {
        // テスト項目: join と storekeeper は転送対象アクションに含まれない
        assert!(!Action::Join.is_game_action());
        assert!(!Action::Storekeeper.is_game_action());
        assert!(Action::Shop.is_game_action());
        assert!(Action::Str.is_game_action());
    }

    #[test]
    fn test_event_codes_map_to_action_names() {
        // テスト項目: イベントコードがアクション名に変換される
        assert_eq!(GameEvent::from_code(0), Some(GameEvent::Joined));
        assert_eq!(GameEvent::from_code(4).map(GameEvent::action_name), Some("level_up"));
        assert_eq!(GameEvent::from_code(14).map(GameEvent::action_name), Some("cant_sell"));
        assert_eq!(GameEvent::from_code(15), None);
        assert_eq!(GameEvent::from_code(u64::MAX), None);
    }

    #[test]
    fn test_event_table_is_consistent() {
        // テスト項目: テーブルの順序とコード・名前が一致し重複がない
        let mut names = HashSet::new();
        for (index, event) in EVENT_TABLE.iter().enumerate() {
            assert_eq!(usize::from(event.code()), index);
            assert!(names.insert(event.action_name()));
        }
    }
}
