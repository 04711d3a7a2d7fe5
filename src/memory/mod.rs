//! Conversation memory.
//!
//! An in-memory, append-only log of answered questions for one session.
//! Nothing here is persisted; a restart starts a fresh conversation.

use crate::types::{ConversationTurn, QueryAnswer};
use chrono::Utc;
use parking_lot::RwLock;

/// Default number of recent turns shown by `/history`.
pub const DEFAULT_HISTORY_WINDOW: usize = 10;

/// Ordered log of conversation turns, shared between concurrent queries.
#[derive(Debug, Default)]
pub struct ConversationLog {
    turns: RwLock<Vec<ConversationTurn>>,
}

impl ConversationLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an answered query, stamped with the current time.
    pub fn record(&self, query: &str, answer: &QueryAnswer) -> ConversationTurn {
        let turn = ConversationTurn {
            query: query.to_string(),
            response: answer.response_text.clone(),
            provider_id: answer.provider_id.clone(),
            model_id: answer.model_id.clone(),
            timestamp: Utc::now(),
        };
        self.turns.write().push(turn.clone());
        turn
    }

    /// All turns, oldest first.
    pub fn turns(&self) -> Vec<ConversationTurn> {
        self.turns.read().clone()
    }

    /// The last `window` turns, oldest first.
    pub fn recent(&self, window: usize) -> Vec<ConversationTurn> {
        let turns = self.turns.read();
        let start = turns.len().saturating_sub(window);
        turns[start..].to_vec()
    }

    /// Number of recorded turns
    pub fn len(&self) -> usize {
        self.turns.read().len()
    }

    /// Whether nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.turns.read().is_empty()
    }

    /// Forget every turn.
    pub fn clear(&self) {
        self.turns.write().clear();
    }
}
