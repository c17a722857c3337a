use crate::body::{color_from_id, Body, BodyId, NEUTRAL_COLORS};
use crate::geometry::{self, Segment};
use crate::ids::IdSequence;
use crate::outbox::Outbox;
use crate::physics::{
    accelerate, inertia, overlap, resolve_circle_circle, resolve_circle_edge,
    rewind_to_collision_point,
};
use crate::session::Session;
use pocket_shared::config::TableConfig;
use pocket_shared::protocol::{
    BodyPosition, ConnectionId, ObjectsSnapshotMsg, ScoreboardEntry, ScoredMsg, ServerMsg,
};
use pocket_shared::vec2::{add, length, normalize, scale, sub, Vec2};
use rand::Rng;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId(pub u64);

impl std::fmt::Display for TableId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One simulation arena: fixed rails and pocket lines, the sessions seated at
/// it, and its live bodies. Sessions are kept in join order and bodies in
/// insertion order; both orders are observable (scoreboard ties, collision
/// order, position payloads).
#[derive(Debug)]
pub struct Table {
    pub id: TableId,
    config: TableConfig,
    rails: [Segment; 4],
    pocket_lines: [Segment; 4],
    sessions: Vec<Session>,
    bodies: Vec<Body>,
}

impl Table {
    /// An empty table with no sessions and no bodies.
    pub fn new(id: TableId, config: TableConfig) -> Self {
        Self {
            id,
            rails: geometry::rails(&config),
            pocket_lines: geometry::pocket_lines(&config),
            config,
            sessions: Vec::new(),
            bodies: Vec::new(),
        }
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn session(&self, id: &ConnectionId) -> Option<&Session> {
        self.sessions.iter().find(|s| &s.connection_id == id)
    }

    pub fn session_mut(&mut self, id: &ConnectionId) -> Option<&mut Session> {
        self.sessions.iter_mut().find(|s| &s.connection_id == id)
    }

    pub fn connection_ids(&self) -> impl Iterator<Item = &ConnectionId> {
        self.sessions.iter().map(|s| &s.connection_id)
    }

    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    pub fn body(&self, id: BodyId) -> Option<&Body> {
        self.bodies.iter().find(|b| b.id == id)
    }

    pub fn body_mut(&mut self, id: BodyId) -> Option<&mut Body> {
        self.bodies.iter_mut().find(|b| b.id == id)
    }

    pub fn is_full(&self) -> bool {
        self.sessions.len() >= self.config.max_connections_per_table as usize
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn neutral_count(&self) -> usize {
        self.bodies.iter().filter(|b| b.is_neutral()).count()
    }

    /// Add a body and announce it to everyone seated.
    pub fn insert_body(&mut self, body: Body, out: &mut Outbox) -> BodyId {
        let id = body.id;
        out.send_all(
            self.sessions.iter().map(|s| &s.connection_id),
            ServerMsg::BodyCreated(body.to_wire()),
        );
        self.bodies.push(body);
        id
    }

    /// Spawn one neutral ball per configured value at random positions.
    pub fn seed_neutrals(
        &mut self,
        ids: &mut IdSequence,
        rng: &mut impl Rng,
        now_ms: i64,
        out: &mut Outbox,
    ) {
        for value in self.config.neutral_value_min..=self.config.neutral_value_max {
            let pos = geometry::random_position(&self.config, rng);
            let color = NEUTRAL_COLORS
                .get(value as usize)
                .copied()
                .unwrap_or(0xffffff);
            let body = Body::new(
                BodyId(ids.next_id()),
                pos,
                self.config.ball_radius,
                self.config.ball_mass,
                value,
                now_ms,
            )
            .with_color(color)
            .with_label(value.to_string());
            self.insert_body(body, out);
        }
        tracing::debug!(table = %self.id, "Neutral balls seeded");
    }

    fn player_body(
        &self,
        owner: &ConnectionId,
        ids: &mut IdSequence,
        rng: &mut impl Rng,
        now_ms: i64,
    ) -> Body {
        let id = ids.next_id();
        Body::new(
            BodyId(id),
            geometry::random_position(&self.config, rng),
            self.config.ball_radius,
            self.config.ball_mass,
            self.config.player_ball_value,
            now_ms,
        )
        .with_owner(owner.clone())
        .with_color(color_from_id(id))
    }

    /// Give a seated session a fresh player body.
    fn respawn_player(
        &mut self,
        owner: &ConnectionId,
        ids: &mut IdSequence,
        rng: &mut impl Rng,
        now_ms: i64,
        out: &mut Outbox,
    ) {
        let body = self.player_body(owner, ids, rng, now_ms);
        let body_id = self.insert_body(body, out);
        if let Some(session) = self.session_mut(owner) {
            session.owned_body = Some(body_id);
        }
    }

    /// Seat a session: spawn its body (announced to the others), then send
    /// the full body list to the newcomer.
    pub fn add_session(
        &mut self,
        mut session: Session,
        ids: &mut IdSequence,
        rng: &mut impl Rng,
        now_ms: i64,
        out: &mut Outbox,
    ) {
        let body = self.player_body(&session.connection_id, ids, rng, now_ms);
        session.owned_body = Some(self.insert_body(body, out));
        session.table_id = self.id;

        out.send(&session.connection_id, ServerMsg::ObjectsSnapshot(self.snapshot()));
        self.sessions.push(session);
    }

    /// Unseat a session and remove its body.
    pub fn remove_session(&mut self, id: &ConnectionId, out: &mut Outbox) -> Option<Session> {
        let idx = self.sessions.iter().position(|s| &s.connection_id == id)?;
        let mut session = self.sessions.remove(idx);
        if let Some(body_id) = session.owned_body.take() {
            self.delete_body(body_id, out);
        }
        Some(session)
    }

    fn delete_body(&mut self, id: BodyId, out: &mut Outbox) -> Option<Body> {
        let idx = self.bodies.iter().position(|b| b.id == id)?;
        let body = self.bodies.remove(idx);
        out.send_all(
            self.sessions.iter().map(|s| &s.connection_id),
            ServerMsg::BodyDeleted { id: id.0 },
        );
        Some(body)
    }

    /// Push the session's body toward `target`, harder the further away it is.
    /// Returns false when there is nothing to push or no direction to push in.
    pub fn apply_click(&mut self, id: &ConnectionId, target: Vec2) -> bool {
        let Some(body_id) = self.session(id).and_then(|s| s.owned_body) else {
            return false;
        };
        let impulse = self.config.click_impulse;
        let canvas = self.config.canvas_size;
        let Some(body) = self.body_mut(body_id) else {
            return false;
        };
        let offset = sub(target, body.cpos);
        let Some(direction) = normalize(offset) else {
            return false;
        };
        let magnitude = impulse * length(offset) / canvas;
        body.acel = add(body.acel, scale(direction, magnitude));
        true
    }

    /// Advance the table by one physics step.
    pub fn tick(
        &mut self,
        dt: f64,
        now_ms: i64,
        ids: &mut IdSequence,
        rng: &mut impl Rng,
        out: &mut Outbox,
    ) {
        let config = self.config;
        let table_id = self.id;

        for body in &mut self.bodies {
            if geometry::is_out_of_bounds(&config, body.cpos) {
                tracing::warn!(table = %table_id, body = %body.id, pos = ?body.cpos, "Body left the table, repositioning");
                body.place_at(geometry::random_position(&config, rng));
            }
            accelerate(body, dt);
        }

        let count = self.bodies.len();
        for i in 0..count {
            for j in (i + 1)..count {
                let (head, tail) = self.bodies.split_at_mut(j);
                let a = &mut head[i];
                let b = &mut tail[0];
                if !overlap(a, b) {
                    continue;
                }
                propagate_touch(a, b, now_ms);
                if !resolve_circle_circle(a, b, config.restitution, true) {
                    tracing::debug!(table = %table_id, a = %a.id, b = %b.id, "Skipped degenerate collision");
                }
            }
        }

        for body in &mut self.bodies {
            let radius = body.radius;
            for rail in &self.rails {
                if rewind_to_collision_point(body, radius, rail.a, rail.b) {
                    resolve_circle_edge(body, rail.a, rail.b, config.restitution);
                }
            }
        }

        // Collected first, removed after the pass
        let mut pocketed = Vec::new();
        for body in &mut self.bodies {
            let radius = body.radius;
            if self
                .pocket_lines
                .iter()
                .any(|line| rewind_to_collision_point(body, radius, line.a, line.b))
            {
                pocketed.push(body.id);
            }
        }
        for body_id in pocketed {
            self.pocket(body_id, ids, rng, now_ms, out);
        }

        for body in &mut self.bodies {
            inertia(body, config.inertia_damping);
        }
    }

    /// Remove a pocketed body and settle its score.
    fn pocket(
        &mut self,
        body_id: BodyId,
        ids: &mut IdSequence,
        rng: &mut impl Rng,
        now_ms: i64,
        out: &mut Outbox,
    ) {
        let Some(body) = self.delete_body(body_id, out) else {
            return;
        };
        let (x, y) = (body.cpos.x, body.cpos.y);
        let value = body.value as i64;

        if let Some(owner) = &body.owner {
            if let Some(session) = self.session_mut(owner) {
                session.add_score(-value);
                session.owned_body = None;
                out.send(owner, ServerMsg::Scored(ScoredMsg { delta: -value, x, y }));
                self.respawn_player(owner, ids, rng, now_ms, out);
            }
        }

        if let Some(toucher) = &body.last_touched_by {
            if let Some(session) = self.session_mut(toucher) {
                session.add_score(value);
                out.send(toucher, ServerMsg::Scored(ScoredMsg { delta: value, x, y }));
            }
        }

        tracing::debug!(
            table = %self.id,
            body = %body.id,
            value,
            owner = ?body.owner,
            credited = ?body.last_touched_by,
            "Body pocketed"
        );

        if self.neutral_count() == 0 {
            self.seed_neutrals(ids, rng, now_ms, out);
        }
    }

    /// `[id, x, y]` for every body, coordinates truncated to whole pixels
    pub fn positions(&self) -> Vec<BodyPosition> {
        self.bodies
            .iter()
            .map(|b| (b.id.0, b.cpos.x.trunc() as i32, b.cpos.y.trunc() as i32))
            .collect()
    }

    pub fn snapshot(&self) -> ObjectsSnapshotMsg {
        ObjectsSnapshotMsg {
            table_id: self.id.0,
            bodies: self.bodies.iter().map(Body::to_wire).collect(),
        }
    }

    /// Seated players, best score first; ties keep join order.
    pub fn ranking(&self) -> Vec<ScoreboardEntry> {
        let mut entries: Vec<ScoreboardEntry> = self
            .sessions
            .iter()
            .map(|s| ScoreboardEntry(s.nickname.clone(), s.score, self.id.0))
            .collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        entries
    }

    /// Drop every remaining body without scoring. Returns how many were dropped.
    pub fn teardown(&mut self) -> usize {
        let dropped = self.bodies.len();
        self.bodies.clear();
        dropped
    }
}

/// Record who last influenced each body of a colliding pair.
///
/// An owned body stamps its owner on the other body. Between two neutral
/// bodies the more recently touched one hands its attribution to the other;
/// on a tie any known attribution is shared.
fn propagate_touch(a: &mut Body, b: &mut Body, now_ms: i64) {
    if a.owner.is_some() || b.owner.is_some() {
        if let Some(owner) = &a.owner {
            b.last_touched_by = Some(owner.clone());
        }
        if let Some(owner) = &b.owner {
            a.last_touched_by = Some(owner.clone());
        }
    } else {
        match a.last_touched_at.cmp(&b.last_touched_at) {
            Ordering::Greater => b.last_touched_by = a.last_touched_by.clone(),
            Ordering::Less => a.last_touched_by = b.last_touched_by.clone(),
            Ordering::Equal => {
                let shared = a.last_touched_by.clone().or_else(|| b.last_touched_by.clone());
                a.last_touched_by = shared.clone();
                b.last_touched_by = shared;
            }
        }
    }
    a.last_touched_at = now_ms;
    b.last_touched_at = now_ms;
}
