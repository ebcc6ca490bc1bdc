//! Ordered record of the conversation.

use pdfchat_core::types::{Role, Turn};

/// Append-only list of committed turns.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    turns: Vec<Turn>,
}

/// A turn as rendered: either committed, or the assistant answer still being
/// revealed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectedTurn<'a> {
    pub role: Role,
    pub text: &'a str,
    pub pending: bool,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Drop every turn. Only used when the session starts over.
    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// Committed turns followed by the pending assistant turn, if any.
    ///
    /// The pending turn is not committed. The iterator is `Clone`, so it can
    /// be walked more than once.
    pub fn projection<'a>(
        &'a self,
        pending: Option<&'a str>,
    ) -> impl Iterator<Item = ProjectedTurn<'a>> + Clone + 'a {
        self.turns
            .iter()
            .map(|turn| ProjectedTurn {
                role: turn.role,
                text: &turn.text,
                pending: false,
            })
            .chain(pending.map(|text| ProjectedTurn {
                role: Role::Assistant,
                text,
                pending: true,
            }))
    }
}
