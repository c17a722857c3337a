use crate::body::BodyId;
use crate::table::TableId;
use pocket_shared::protocol::ConnectionId;

/// Per-connection state, owned by the table the connection sits at.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub connection_id: ConnectionId,
    pub nickname: String,
    pub score: u32,
    pub table_id: TableId,
    pub owned_body: Option<BodyId>,
}

impl Session {
    pub fn new(connection_id: ConnectionId, nickname: String, table_id: TableId) -> Self {
        Self {
            connection_id,
            nickname,
            score: 0,
            table_id,
            owned_body: None,
        }
    }

    /// Apply a score change, never going below zero.
    pub fn add_score(&mut self, delta: i64) {
        let next = (self.score as i64).saturating_add(delta).clamp(0, u32::MAX as i64);
        self.score = next as u32;
    }
}

/// Trim a requested nickname and cap it at `max_len` characters.
/// Returns None when nothing is left.
pub fn sanitize_nickname(raw: &str, max_len: usize) -> Option<String> {
    let trimmed: String = raw.trim().chars().take(max_len).collect();
    let trimmed = trimmed.trim_end();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
