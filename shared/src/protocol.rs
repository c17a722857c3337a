use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::config::TableConfig;

/// Protocol version - increment when making breaking changes.
pub const PROTOCOL_VERSION: u32 = 1;

/// Opaque identifier of a client connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(transparent)]
pub struct ConnectionId(pub String);

impl ConnectionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// === Server -> Client ===

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type")]
pub enum ServerMsg {
    #[serde(rename = "welcome")]
    Welcome(WelcomeMsg),
    #[serde(rename = "objects_snapshot")]
    ObjectsSnapshot(ObjectsSnapshotMsg),
    #[serde(rename = "body_created")]
    BodyCreated(BodyWire),
    #[serde(rename = "body_deleted")]
    BodyDeleted { id: u64 },
    #[serde(rename = "positions_delta")]
    PositionsDelta(PositionsDeltaMsg),
    #[serde(rename = "scored")]
    Scored(ScoredMsg),
    #[serde(rename = "scoreboard")]
    Scoreboard(ScoreboardMsg),
    #[serde(rename = "chat_message")]
    ChatMessage { text: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct WelcomeMsg {
    pub protocol_version: u32,
    pub self_id: ConnectionId,
    pub config: TableConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ObjectsSnapshotMsg {
    pub table_id: u64,
    pub bodies: Vec<BodyWire>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BodyWire {
    pub id: u64,
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    pub value: u32,
    pub color: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<ConnectionId>,
}

/// `[bodyId, x, y]` with coordinates truncated to whole pixels
pub type BodyPosition = (u64, i32, i32);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PositionsDeltaMsg {
    pub positions: Vec<BodyPosition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ScoredMsg {
    pub delta: i64,
    pub x: f64,
    pub y: f64,
}

/// `[nickname, score, tableId]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ScoreboardEntry(pub String, pub u32, pub u64);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ScoreboardMsg {
    /// Every player on every table, best first
    pub overall: Vec<ScoreboardEntry>,
    /// Players on the receiver's table, best first
    pub table: Vec<ScoreboardEntry>,
}

// === Client -> Server ===

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type")]
pub enum ClientMsg {
    #[serde(rename = "click")]
    Click { x: f64, y: f64 },
    #[serde(rename = "chat_message")]
    ChatMessage { text: String },
}
