/// Id source shared by a directory's tables, bodies and default nicknames.
///
/// Ids are handed out monotonically starting at 1. After `u64::MAX` the
/// sequence wraps back to 1, so after a wrap a new id can collide with a
/// long-lived table or body that still holds a low number.
#[derive(Debug, Clone)]
pub struct IdSequence {
    next: u64,
}

impl Default for IdSequence {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl IdSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequence whose next id is `next` (0 is never issued).
    pub fn starting_at(next: u64) -> Self {
        Self { next: next.max(1) }
    }

    pub fn next_id(&mut self) -> u64 {
        let id = self.next;
        self.next = if id == u64::MAX { 1 } else { id + 1 };
        id
    }
}
