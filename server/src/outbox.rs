use pocket_shared::protocol::{ConnectionId, ServerMsg};

/// A message addressed to one connection.
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub to: ConnectionId,
    pub msg: ServerMsg,
}

/// Effects produced while handling a command or a tick, delivered by the game
/// loop once the handler has returned.
#[derive(Debug, Default)]
pub struct Outbox {
    messages: Vec<Outbound>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn send(&mut self, to: &ConnectionId, msg: ServerMsg) {
        self.messages.push(Outbound {
            to: to.clone(),
            msg,
        });
    }

    pub fn send_all<'a>(&mut self, to: impl IntoIterator<Item = &'a ConnectionId>, msg: ServerMsg) {
        for id in to {
            self.send(id, msg.clone());
        }
    }

    pub fn notice(&mut self, to: &ConnectionId, text: impl Into<String>) {
        self.send(to, ServerMsg::ChatMessage { text: text.into() });
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Outbound> {
        self.messages.iter()
    }

    /// Messages addressed to `to`, in send order
    pub fn for_connection<'a>(&'a self, to: &'a ConnectionId) -> impl Iterator<Item = &'a ServerMsg> {
        self.messages.iter().filter(move |o| &o.to == to).map(|o| &o.msg)
    }

    pub fn drain(&mut self) -> std::vec::Drain<'_, Outbound> {
        self.messages.drain(..)
    }
}
