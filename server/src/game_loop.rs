use crate::config::ServerConfig;
use crate::directory::RoomDirectory;
use crate::ids::IdSequence;
use crate::outbox::{Outbound, Outbox};
use crate::schedule::Cadence;
use pocket_shared::protocol::{ClientMsg, ConnectionId, ServerMsg};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};

/// Commands from client connections to the game loop
#[derive(Debug)]
pub enum GameCommand {
    PlayerJoin {
        /// Mailbox the loop delivers this connection's messages to
        outbound: mpsc::Sender<ServerMsg>,
        response: oneshot::Sender<ConnectionId>,
    },
    PlayerLeave {
        id: ConnectionId,
    },
    Client {
        id: ConnectionId,
        msg: ClientMsg,
    },
}

/// Run the main game loop. Owns the room directory and every mailbox.
pub async fn run_game_loop(mut cmd_rx: mpsc::Receiver<GameCommand>, server_config: ServerConfig) {
    let mut directory = RoomDirectory::new(server_config.table, server_config.rng_seed);
    let mut mailboxes: HashMap<ConnectionId, mpsc::Sender<ServerMsg>> = HashMap::new();
    let mut connection_ids = IdSequence::new();
    let mut out = Outbox::new();

    let dt = server_config.tick_dt();
    let mut positions = Cadence::from_rate_hz(server_config.position_broadcast_hz);
    let mut scoreboard = Cadence::from_rate_hz(server_config.scoreboard_broadcast_hz);

    let mut tick_interval = tokio::time::interval(Duration::from_secs_f64(dt));
    tick_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = tick_interval.tick() => {
                directory.tick(dt, &mut out);
                if positions.advance(dt) {
                    directory.broadcast_positions(&mut out);
                }
                if scoreboard.advance(dt) {
                    directory.broadcast_scoreboard(&mut out);
                }
            }

            Some(cmd) = cmd_rx.recv() => {
                match cmd {
                    GameCommand::PlayerJoin { outbound, response } => {
                        let id = ConnectionId::new(format!("c{}", connection_ids.next_id()));
                        if response.send(id.clone()).is_ok() {
                            mailboxes.insert(id.clone(), outbound);
                            directory.connect(id, &mut out);
                        } else {
                            tracing::debug!(connection = %id, "Connection gone before join completed");
                        }
                    }
                    GameCommand::PlayerLeave { id } => {
                        mailboxes.remove(&id);
                        directory.disconnect(&id, &mut out);
                    }
                    GameCommand::Client { id, msg } => {
                        directory.handle_client_msg(&id, msg, &mut out);
                    }
                }
            }

            else => break,
        }

        deliver(&mailboxes, &mut out);
    }

    tracing::info!("Game loop ended");
}

/// Hand every pending message to its connection's mailbox without waiting.
/// Full mailboxes drop the message.
fn deliver(mailboxes: &HashMap<ConnectionId, mpsc::Sender<ServerMsg>>, out: &mut Outbox) {
    for Outbound { to, msg } in out.drain() {
        let Some(mailbox) = mailboxes.get(&to) else {
            continue;
        };
        match mailbox.try_send(msg) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                tracing::warn!(connection = %to, "Outbound mailbox full, dropping message");
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!(connection = %to, "Outbound mailbox closed");
            }
        }
    }
}
