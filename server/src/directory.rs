use crate::commands::{self, ChatCommand};
use crate::ids::IdSequence;
use crate::outbox::Outbox;
use crate::session::{sanitize_nickname, Session};
use crate::table::{Table, TableId};
use pocket_shared::config::TableConfig;
use pocket_shared::protocol::{
    ClientMsg, ConnectionId, PositionsDeltaMsg, ScoreboardEntry, ScoreboardMsg, ServerMsg,
    WelcomeMsg, PROTOCOL_VERSION,
};
use pocket_shared::vec2::vec2;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::{BTreeMap, HashMap};

/// Why a connection could not be moved to another table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinRejection {
    TableNotFound,
    AlreadyOnTable(TableId),
    TableFull,
    NotConnected,
}

impl std::fmt::Display for JoinRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JoinRejection::TableNotFound => write!(f, "Table not found!"),
            JoinRejection::AlreadyOnTable(id) => write!(f, "Already on table {}!", id),
            JoinRejection::TableFull => write!(f, "Table is full!"),
            JoinRejection::NotConnected => write!(f, "Not connected!"),
        }
    }
}

impl std::error::Error for JoinRejection {}

/// All tables and where every connection sits. Owned by the game loop.
pub struct RoomDirectory {
    config: TableConfig,
    tables: BTreeMap<TableId, Table>,
    locations: HashMap<ConnectionId, TableId>,
    ids: IdSequence,
    rng: ChaCha8Rng,
    /// Simulation time in seconds
    sim_time: f64,
    last_scoreboard: Option<String>,
}

impl RoomDirectory {
    pub fn new(config: TableConfig, rng_seed: u64) -> Self {
        Self {
            config,
            tables: BTreeMap::new(),
            locations: HashMap::new(),
            ids: IdSequence::new(),
            rng: ChaCha8Rng::seed_from_u64(rng_seed),
            sim_time: 0.0,
            last_scoreboard: None,
        }
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    pub fn now_ms(&self) -> i64 {
        (self.sim_time * 1000.0) as i64
    }

    pub fn table(&self, id: TableId) -> Option<&Table> {
        self.tables.get(&id)
    }

    pub fn table_mut(&mut self, id: TableId) -> Option<&mut Table> {
        self.tables.get_mut(&id)
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    pub fn table_of(&self, id: &ConnectionId) -> Option<TableId> {
        self.locations.get(id).copied()
    }

    pub fn session(&self, id: &ConnectionId) -> Option<&Session> {
        let table_id = self.locations.get(id)?;
        self.tables.get(table_id)?.session(id)
    }

    pub fn connection_count(&self) -> usize {
        self.locations.len()
    }

    /// Greet a new connection and seat it at the first table with room.
    pub fn connect(&mut self, id: ConnectionId, out: &mut Outbox) -> Option<TableId> {
        if self.locations.contains_key(&id) {
            tracing::warn!(connection = %id, "Connection already known, ignoring connect");
            return None;
        }
        out.send(
            &id,
            ServerMsg::Welcome(WelcomeMsg {
                protocol_version: PROTOCOL_VERSION,
                self_id: id.clone(),
                config: self.config,
            }),
        );
        let nickname = format!("Player {}", self.ids.next_id());
        let session = Session::new(id, nickname, TableId(0));
        Some(self.assign_connection(session, out))
    }

    /// Seat a session at the lowest-numbered table with a free seat, opening
    /// a new table when every table is full.
    pub fn assign_connection(&mut self, session: Session, out: &mut Outbox) -> TableId {
        let open = self
            .tables
            .values()
            .find(|t| !t.is_full())
            .map(|t| t.id);
        let table_id = match open {
            Some(id) => id,
            None => self.create_table(out),
        };
        self.seat(session, table_id, out);
        table_id
    }

    /// Remove a connection entirely. Unknown ids are a no-op; returns whether
    /// anything was removed.
    pub fn disconnect(&mut self, id: &ConnectionId, out: &mut Outbox) -> bool {
        match self.unseat(id, out) {
            Some(session) => {
                tracing::info!(connection = %id, nickname = %session.nickname, score = session.score, "Connection left");
                true
            }
            None => false,
        }
    }

    /// Move a connection to a freshly created table.
    pub fn new_table(&mut self, id: &ConnectionId, out: &mut Outbox) -> Option<TableId> {
        let session = self.unseat(id, out)?;
        let table_id = self.create_table(out);
        self.seat(session, table_id, out);
        Some(table_id)
    }

    /// Move a connection to an existing table. Nothing changes on rejection.
    pub fn transfer_connection(
        &mut self,
        id: &ConnectionId,
        target: TableId,
        out: &mut Outbox,
    ) -> Result<TableId, JoinRejection> {
        let table = self
            .tables
            .get(&target)
            .ok_or(JoinRejection::TableNotFound)?;
        let current = self.table_of(id).ok_or(JoinRejection::NotConnected)?;
        if current == target {
            return Err(JoinRejection::AlreadyOnTable(target));
        }
        if table.is_full() {
            return Err(JoinRejection::TableFull);
        }

        let session = self.unseat(id, out).ok_or(JoinRejection::NotConnected)?;
        self.seat(session, target, out);
        Ok(target)
    }

    /// Apply one client intent. Messages from unknown connections are dropped.
    pub fn handle_client_msg(&mut self, id: &ConnectionId, msg: ClientMsg, out: &mut Outbox) {
        let Some(table_id) = self.table_of(id) else {
            tracing::debug!(connection = %id, "Message from unknown connection");
            return;
        };
        match msg {
            ClientMsg::Click { x, y } => {
                if !x.is_finite() || !y.is_finite() {
                    tracing::debug!(connection = %id, x, y, "Ignoring non-finite click");
                    return;
                }
                let applied = self
                    .tables
                    .get_mut(&table_id)
                    .is_some_and(|t| t.apply_click(id, vec2(x, y)));
                if !applied {
                    tracing::debug!(connection = %id, x, y, "Click had no effect");
                }
            }
            ClientMsg::ChatMessage { text } => self.handle_chat(id, &text, out),
        }
    }

    fn handle_chat(&mut self, id: &ConnectionId, text: &str, out: &mut Outbox) {
        let Some(command) = commands::parse(text) else {
            return;
        };
        match command {
            ChatCommand::Nick(raw) => {
                let max_len = self.config.max_nickname_length as usize;
                let Some(nickname) = sanitize_nickname(raw, max_len) else {
                    out.notice(id, "Nickname cannot be empty!");
                    return;
                };
                let Some(session) = self.session_mut(id) else {
                    return;
                };
                let previous = std::mem::replace(&mut session.nickname, nickname.clone());
                self.announce_all(format!("{} is now known as {}!", previous, nickname), out);
            }
            ChatCommand::NewTable => {
                self.new_table(id, out);
            }
            ChatCommand::JoinTable(target) => {
                let result = target
                    .map(TableId)
                    .ok_or(JoinRejection::TableNotFound)
                    .and_then(|target| self.transfer_connection(id, target, out));
                if let Err(rejection) = result {
                    tracing::debug!(connection = %id, %rejection, "Join rejected");
                    out.notice(id, rejection.to_string());
                }
            }
            ChatCommand::Unknown(name) => {
                out.notice(id, format!("Unknown command: /{}", name));
            }
            ChatCommand::Say(line) => {
                let Some(session) = self.session(id) else {
                    return;
                };
                let text = format!("{}: {}", session.nickname, line);
                self.announce_all(text, out);
            }
        }
    }

    /// Advance every table by one step.
    pub fn tick(&mut self, dt: f64, out: &mut Outbox) {
        self.sim_time += dt;
        let now_ms = self.now_ms();
        for table in self.tables.values_mut() {
            table.tick(dt, now_ms, &mut self.ids, &mut self.rng, out);
        }
    }

    /// Send each table's body positions to everyone seated there.
    pub fn broadcast_positions(&self, out: &mut Outbox) {
        for table in self.tables.values() {
            if table.bodies().is_empty() {
                continue;
            }
            let msg = ServerMsg::PositionsDelta(PositionsDeltaMsg {
                positions: table.positions(),
            });
            out.send_all(table.connection_ids(), msg);
        }
    }

    /// Every player across all tables, best first. Ties keep table order,
    /// then join order.
    pub fn overall_ranking(&self) -> Vec<ScoreboardEntry> {
        let mut overall: Vec<ScoreboardEntry> =
            self.tables.values().flat_map(|t| t.ranking()).collect();
        overall.sort_by(|a, b| b.1.cmp(&a.1));
        overall
    }

    /// Send the scoreboard to every session unless the overall ranking is
    /// unchanged since the last one sent. Returns whether anything was sent.
    pub fn broadcast_scoreboard(&mut self, out: &mut Outbox) -> bool {
        let overall = self.overall_ranking();
        let serialized = match serde_json::to_string(&overall) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize scoreboard");
                return false;
            }
        };
        if self.last_scoreboard.as_deref() == Some(serialized.as_str()) {
            return false;
        }
        self.last_scoreboard = Some(serialized);

        for table in self.tables.values() {
            let msg = ServerMsg::Scoreboard(ScoreboardMsg {
                overall: overall.clone(),
                table: table.ranking(),
            });
            out.send_all(table.connection_ids(), msg);
        }
        true
    }

    fn session_mut(&mut self, id: &ConnectionId) -> Option<&mut Session> {
        let table_id = self.locations.get(id)?;
        self.tables.get_mut(table_id)?.session_mut(id)
    }

    fn announce_all(&self, text: String, out: &mut Outbox) {
        let everyone = self.tables.values().flat_map(|t| t.connection_ids());
        out.send_all(everyone, ServerMsg::ChatMessage { text });
    }

    fn create_table(&mut self, out: &mut Outbox) -> TableId {
        let id = TableId(self.ids.next_id());
        let mut table = Table::new(id, self.config);
        let now_ms = self.now_ms();
        table.seed_neutrals(&mut self.ids, &mut self.rng, now_ms, out);
        self.tables.insert(id, table);
        tracing::info!(table = %id, tables = self.tables.len(), "Table created");
        id
    }

    fn seat(&mut self, session: Session, table_id: TableId, out: &mut Outbox) {
        let now_ms = self.now_ms();
        let Some(table) = self.tables.get_mut(&table_id) else {
            tracing::warn!(table = %table_id, "Cannot seat connection at missing table");
            return;
        };
        let id = session.connection_id.clone();
        let nickname = session.nickname.clone();
        table.add_session(session, &mut self.ids, &mut self.rng, now_ms, out);
        out.send_all(
            table.connection_ids(),
            ServerMsg::ChatMessage {
                text: format!("{} joined Table {}!", nickname, table_id),
            },
        );
        self.locations.insert(id.clone(), table_id);
        tracing::info!(connection = %id, table = %table_id, "Connection seated");
    }

    /// Take a connection off its table, destroying the table if it empties.
    fn unseat(&mut self, id: &ConnectionId, out: &mut Outbox) -> Option<Session> {
        let table_id = self.locations.remove(id)?;
        let table = self.tables.get_mut(&table_id)?;
        let session = table.remove_session(id, out);
        if table.is_empty() {
            if let Some(mut table) = self.tables.remove(&table_id) {
                let dropped = table.teardown();
                tracing::info!(table = %table_id, bodies = dropped, "Table destroyed");
            }
        }
        session
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f64 = 1.0 / 60.0;

    fn directory() -> RoomDirectory {
        RoomDirectory::new(TableConfig::default(), 7)
    }

    fn connect(dir: &mut RoomDirectory, id: &str) -> ConnectionId {
        let cid = ConnectionId::new(id);
        dir.connect(cid.clone(), &mut Outbox::new()).unwrap();
        cid
    }

    fn say(dir: &mut RoomDirectory, id: &ConnectionId, text: &str) -> Outbox {
        let mut out = Outbox::new();
        dir.handle_client_msg(
            id,
            ClientMsg::ChatMessage {
                text: text.to_string(),
            },
            &mut out,
        );
        out
    }

    fn texts(out: &Outbox, id: &ConnectionId) -> Vec<String> {
        out.for_connection(id)
            .filter_map(|m| match m {
                ServerMsg::ChatMessage { text } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn first_connection_opens_seeded_table() {
        let mut dir = directory();
        let c1 = ConnectionId::new("c1");
        let mut out = Outbox::new();
        let table_id = dir.connect(c1.clone(), &mut out).unwrap();

        let table = dir.table(table_id).unwrap();
        assert_eq!(table.neutral_count(), 8);
        assert_eq!(table.bodies().len(), 9);

        let msgs: Vec<&ServerMsg> = out.for_connection(&c1).collect();
        assert!(matches!(msgs[0], ServerMsg::Welcome(w) if w.self_id == c1 && w.protocol_version == PROTOCOL_VERSION));
        assert!(matches!(msgs[1], ServerMsg::ObjectsSnapshot(s) if s.bodies.len() == 9 && s.table_id == table_id.0));
        assert_eq!(
            texts(&out, &c1),
            vec![format!("Player 1 joined Table {}!", table_id)]
        );
    }

    #[test]
    fn duplicate_connect_is_ignored() {
        let mut dir = directory();
        let c1 = connect(&mut dir, "c1");
        assert!(dir.connect(c1, &mut Outbox::new()).is_none());
        assert_eq!(dir.connection_count(), 1);
    }

    #[test]
    fn fifth_connection_overflows_to_second_table() {
        let mut dir = directory();
        let ids: Vec<_> = (0..5).map(|i| connect(&mut dir, &format!("c{}", i))).collect();
        let first = dir.table_of(&ids[0]).unwrap();
        for id in &ids[1..4] {
            assert_eq!(dir.table_of(id), Some(first));
        }
        let second = dir.table_of(&ids[4]).unwrap();
        assert!(second > first);
        assert_eq!(dir.tables().count(), 2);
    }

    #[test]
    fn freed_seat_is_reused_before_new_table() {
        let mut dir = directory();
        let ids: Vec<_> = (0..5).map(|i| connect(&mut dir, &format!("c{}", i))).collect();
        let first = dir.table_of(&ids[0]).unwrap();
        dir.disconnect(&ids[1], &mut Outbox::new());
        let late = connect(&mut dir, "late");
        assert_eq!(dir.table_of(&late), Some(first));
    }

    #[test]
    fn last_leaver_destroys_table() {
        let mut dir = directory();
        let c1 = connect(&mut dir, "c1");
        let table_id = dir.table_of(&c1).unwrap();

        assert!(dir.disconnect(&c1, &mut Outbox::new()));
        assert!(dir.table(table_id).is_none());
        assert!(dir.table_of(&c1).is_none());
        assert!(!dir.disconnect(&c1, &mut Outbox::new()));
    }

    #[test]
    fn leaving_notifies_remaining_players() {
        let mut dir = directory();
        let c1 = connect(&mut dir, "c1");
        let c2 = connect(&mut dir, "c2");
        let body = dir.session(&c1).unwrap().owned_body.unwrap();

        let mut out = Outbox::new();
        dir.disconnect(&c1, &mut out);
        assert!(out
            .for_connection(&c2)
            .any(|m| m == &ServerMsg::BodyDeleted { id: body.0 }));
        assert_eq!(dir.table(dir.table_of(&c2).unwrap()).unwrap().bodies().len(), 9);
    }

    #[test]
    fn transfer_to_unknown_table_is_rejected() {
        let mut dir = directory();
        let c1 = connect(&mut dir, "c1");
        let before = dir.table_of(&c1);
        let result = dir.transfer_connection(&c1, TableId(9999), &mut Outbox::new());
        assert_eq!(result, Err(JoinRejection::TableNotFound));
        assert_eq!(dir.table_of(&c1), before);
    }

    #[test]
    fn transfer_to_own_table_is_rejected() {
        let mut dir = directory();
        let c1 = connect(&mut dir, "c1");
        let table_id = dir.table_of(&c1).unwrap();
        let mut out = Outbox::new();
        let result = dir.transfer_connection(&c1, table_id, &mut out);
        assert_eq!(result, Err(JoinRejection::AlreadyOnTable(table_id)));
        assert!(out.is_empty());
    }

    #[test]
    fn transfer_to_full_table_is_rejected() {
        let mut dir = directory();
        let ids: Vec<_> = (0..5).map(|i| connect(&mut dir, &format!("c{}", i))).collect();
        let full = dir.table_of(&ids[0]).unwrap();
        let mut out = Outbox::new();
        let result = dir.transfer_connection(&ids[4], full, &mut out);
        assert_eq!(result, Err(JoinRejection::TableFull));
        assert!(out.is_empty());
        assert_ne!(dir.table_of(&ids[4]), Some(full));
        assert_eq!(dir.table(full).unwrap().sessions().len(), 4);
    }

    #[test]
    fn transfer_moves_session_and_body() {
        let mut dir = directory();
        let ids: Vec<_> = (0..5).map(|i| connect(&mut dir, &format!("c{}", i))).collect();
        let first = dir.table_of(&ids[0]).unwrap();
        let second = dir.table_of(&ids[4]).unwrap();
        dir.table_mut(first)
            .unwrap()
            .session_mut(&ids[0])
            .unwrap()
            .score = 12;

        let mut out = Outbox::new();
        assert_eq!(dir.transfer_connection(&ids[0], second, &mut out), Ok(second));
        assert_eq!(dir.table_of(&ids[0]), Some(second));
        assert_eq!(dir.session(&ids[0]).unwrap().score, 12);
        assert_eq!(dir.table(first).unwrap().sessions().len(), 3);
        assert_eq!(dir.table(second).unwrap().sessions().len(), 2);
        // 8 neutrals plus two player bodies
        assert_eq!(dir.table(second).unwrap().bodies().len(), 10);
        assert!(out
            .for_connection(&ids[0])
            .any(|m| matches!(m, ServerMsg::ObjectsSnapshot(s) if s.table_id == second.0)));
    }

    #[test]
    fn transfer_of_sole_player_destroys_old_table() {
        let mut dir = directory();
        let ids: Vec<_> = (0..5).map(|i| connect(&mut dir, &format!("c{}", i))).collect();
        let second = dir.table_of(&ids[4]).unwrap();
        dir.disconnect(&ids[1], &mut Outbox::new());
        let first = dir.table_of(&ids[0]).unwrap();

        dir.transfer_connection(&ids[4], first, &mut Outbox::new())
            .unwrap();
        assert!(dir.table(second).is_none());
    }

    #[test]
    fn newtable_command_moves_to_fresh_table() {
        let mut dir = directory();
        let c1 = connect(&mut dir, "c1");
        let c2 = connect(&mut dir, "c2");
        let old = dir.table_of(&c1).unwrap();

        say(&mut dir, &c1, "/newtable");
        let new = dir.table_of(&c1).unwrap();
        assert_ne!(new, old);
        assert_eq!(dir.table(new).unwrap().neutral_count(), 8);
        assert_eq!(dir.table_of(&c2), Some(old));
    }

    #[test]
    fn jointable_command_reports_rejections() {
        let mut dir = directory();
        let c1 = connect(&mut dir, "c1");
        let own = dir.table_of(&c1).unwrap();

        let out = say(&mut dir, &c1, "/jointable abc");
        assert_eq!(texts(&out, &c1), vec!["Table not found!"]);

        let out = say(&mut dir, &c1, "/jointable 424242");
        assert_eq!(texts(&out, &c1), vec!["Table not found!"]);

        let out = say(&mut dir, &c1, &format!("/jointable {}", own));
        assert_eq!(texts(&out, &c1), vec![format!("Already on table {}!", own)]);
    }

    #[test]
    fn jointable_command_moves_connection() {
        let mut dir = directory();
        let c1 = connect(&mut dir, "c1");
        let c2 = connect(&mut dir, "c2");
        say(&mut dir, &c2, "/newtable");
        let target = dir.table_of(&c2).unwrap();

        let out = say(&mut dir, &c1, &format!("/jointable {}", target));
        assert_eq!(dir.table_of(&c1), Some(target));
        let nick = dir.session(&c1).unwrap().nickname.clone();
        assert!(texts(&out, &c2).contains(&format!("{} joined Table {}!", nick, target)));
    }

    #[test]
    fn nick_is_trimmed_capped_and_announced_everywhere() {
        let mut dir = directory();
        let c1 = connect(&mut dir, "c1");
        let c2 = connect(&mut dir, "c2");
        say(&mut dir, &c2, "/newtable");
        let old = dir.session(&c1).unwrap().nickname.clone();

        let out = say(&mut dir, &c1, "/nick   abcdefghijklmnopqrstuvwxyz ");
        let new = dir.session(&c1).unwrap().nickname.clone();
        assert_eq!(new, "abcdefghijklmnopqrstu");
        let expected = format!("{} is now known as {}!", old, new);
        assert_eq!(texts(&out, &c1), vec![expected.clone()]);
        assert_eq!(texts(&out, &c2), vec![expected]);
    }

    #[test]
    fn empty_nick_is_refused() {
        let mut dir = directory();
        let c1 = connect(&mut dir, "c1");
        let old = dir.session(&c1).unwrap().nickname.clone();
        let out = say(&mut dir, &c1, "/nick    ");
        assert_eq!(texts(&out, &c1), vec!["Nickname cannot be empty!"]);
        assert_eq!(dir.session(&c1).unwrap().nickname, old);
    }

    #[test]
    fn unknown_command_is_reported_to_sender_only() {
        let mut dir = directory();
        let c1 = connect(&mut dir, "c1");
        let c2 = connect(&mut dir, "c2");
        let out = say(&mut dir, &c1, "/shrug");
        assert_eq!(texts(&out, &c1), vec!["Unknown command: /shrug"]);
        assert!(texts(&out, &c2).is_empty());
    }

    #[test]
    fn chat_reaches_every_table() {
        let mut dir = directory();
        let c1 = connect(&mut dir, "c1");
        let c2 = connect(&mut dir, "c2");
        say(&mut dir, &c2, "/newtable");
        let nick = dir.session(&c1).unwrap().nickname.clone();

        let out = say(&mut dir, &c1, "  good game ");
        let line = format!("{}: good game", nick);
        assert_eq!(texts(&out, &c1), vec![line.clone()]);
        assert_eq!(texts(&out, &c2), vec![line]);

        assert!(say(&mut dir, &c1, "   ").is_empty());
    }

    #[test]
    fn messages_from_unknown_connections_are_dropped() {
        let mut dir = directory();
        connect(&mut dir, "c1");
        let ghost = ConnectionId::new("ghost");
        let out = say(&mut dir, &ghost, "hello");
        assert!(out.is_empty());
        dir.handle_client_msg(&ghost, ClientMsg::Click { x: 1.0, y: 1.0 }, &mut Outbox::new());
    }

    #[test]
    fn non_finite_click_is_ignored() {
        let mut dir = directory();
        let c1 = connect(&mut dir, "c1");
        let body_id = dir.session(&c1).unwrap().owned_body.unwrap();
        let table_id = dir.table_of(&c1).unwrap();

        let mut out = Outbox::new();
        dir.handle_client_msg(&c1, ClientMsg::Click { x: f64::NAN, y: 10.0 }, &mut out);
        dir.handle_client_msg(&c1, ClientMsg::Click { x: 10.0, y: f64::INFINITY }, &mut out);
        assert!(out.is_empty());
        let body = dir.table(table_id).unwrap().body(body_id).unwrap();
        assert_eq!(body.acel, pocket_shared::vec2::Vec2::ZERO);
    }

    #[test]
    fn simulation_clock_advances_with_ticks() {
        let mut dir = directory();
        for _ in 0..60 {
            dir.tick(DT, &mut Outbox::new());
        }
        assert!((dir.now_ms() - 1000).abs() <= 1);
    }

    #[test]
    fn scoreboard_is_deduplicated() {
        let mut dir = directory();
        let c1 = connect(&mut dir, "c1");

        let mut out = Outbox::new();
        assert!(dir.broadcast_scoreboard(&mut out));
        assert_eq!(out.for_connection(&c1).count(), 1);

        let mut out = Outbox::new();
        assert!(!dir.broadcast_scoreboard(&mut out));
        assert!(out.is_empty());

        let table_id = dir.table_of(&c1).unwrap();
        dir.table_mut(table_id)
            .unwrap()
            .session_mut(&c1)
            .unwrap()
            .score = 4;
        assert!(dir.broadcast_scoreboard(&mut Outbox::new()));
    }

    #[test]
    fn scoreboard_ranks_overall_and_per_table() {
        let mut dir = directory();
        let ids: Vec<_> = (0..5).map(|i| connect(&mut dir, &format!("c{}", i))).collect();
        let first = dir.table_of(&ids[0]).unwrap();
        let second = dir.table_of(&ids[4]).unwrap();
        for (i, score) in [(0, 3), (1, 7), (2, 3), (3, 0)] {
            dir.table_mut(first)
                .unwrap()
                .session_mut(&ids[i])
                .unwrap()
                .score = score;
        }
        dir.table_mut(second)
            .unwrap()
            .session_mut(&ids[4])
            .unwrap()
            .score = 7;

        let mut out = Outbox::new();
        dir.broadcast_scoreboard(&mut out);
        let board = out
            .for_connection(&ids[4])
            .find_map(|m| match m {
                ServerMsg::Scoreboard(s) => Some(s.clone()),
                _ => None,
            })
            .unwrap();

        let nick = |i: usize| dir.session(&ids[i]).unwrap().nickname.clone();
        assert_eq!(
            board.overall,
            vec![
                ScoreboardEntry(nick(1), 7, first.0),
                ScoreboardEntry(nick(4), 7, second.0),
                ScoreboardEntry(nick(0), 3, first.0),
                ScoreboardEntry(nick(2), 3, first.0),
                ScoreboardEntry(nick(3), 0, first.0),
            ]
        );
        assert_eq!(board.table, vec![ScoreboardEntry(nick(4), 7, second.0)]);
    }

    #[test]
    fn click_moves_body_and_positions_reflect_it() {
        let mut dir = directory();
        let c1 = connect(&mut dir, "c1");
        let table_id = dir.table_of(&c1).unwrap();
        let body_id = dir.session(&c1).unwrap().owned_body.unwrap();

        // Clear the neutrals out of the way so nothing collides with the player
        {
            let table = dir.table_mut(table_id).unwrap();
            let neutral_ids: Vec<_> = table
                .bodies()
                .iter()
                .filter(|b| b.is_neutral())
                .map(|b| b.id)
                .collect();
            for (i, id) in neutral_ids.into_iter().enumerate() {
                let x = 100.0 + 60.0 * i as f64;
                table.body_mut(id).unwrap().place_at(vec2(x, 560.0));
            }
            table.body_mut(body_id).unwrap().place_at(vec2(200.0, 200.0));
        }

        dir.handle_client_msg(&c1, ClientMsg::Click { x: 500.0, y: 200.0 }, &mut Outbox::new());
        for _ in 0..10 {
            dir.tick(DT, &mut Outbox::new());
        }

        let mut out = Outbox::new();
        dir.broadcast_positions(&mut out);
        let positions = out
            .for_connection(&c1)
            .find_map(|m| match m {
                ServerMsg::PositionsDelta(p) => Some(p.positions.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(positions.len(), 9);
        let (_, x, y) = positions
            .into_iter()
            .find(|(id, _, _)| *id == body_id.0)
            .unwrap();
        assert!(x > 200, "body should have moved right, x = {}", x);
        assert_eq!(y, 200);
    }

    #[test]
    fn pocketing_own_body_costs_its_value_and_respawns() {
        let mut dir = directory();
        let c1 = connect(&mut dir, "c1");
        let table_id = dir.table_of(&c1).unwrap();
        let old = dir.session(&c1).unwrap().owned_body.unwrap();
        {
            let table = dir.table_mut(table_id).unwrap();
            table.session_mut(&c1).unwrap().score = 15;
            let neutral_ids: Vec<_> = table
                .bodies()
                .iter()
                .filter(|b| b.is_neutral())
                .map(|b| b.id)
                .collect();
            for (i, id) in neutral_ids.into_iter().enumerate() {
                let x = 150.0 + 50.0 * i as f64;
                table.body_mut(id).unwrap().place_at(vec2(x, 340.0));
            }
            let body = table.body_mut(old).unwrap();
            body.ppos = vec2(90.0, 90.0);
            body.cpos = vec2(60.0, 60.0);
        }

        let mut out = Outbox::new();
        dir.tick(DT, &mut out);

        let session = dir.session(&c1).unwrap();
        assert_eq!(session.score, 6);
        let new = session.owned_body.unwrap();
        assert_ne!(new, old);
        assert!(dir.table(table_id).unwrap().body(new).is_some());
        assert!(out
            .for_connection(&c1)
            .any(|m| matches!(m, ServerMsg::Scored(s) if s.delta == -9)));
    }
}
