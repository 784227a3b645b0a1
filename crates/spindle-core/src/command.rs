//! Player commands accepted while a round is paused.
//!
//! A component that needs a player decision returns
//! [`Step::Await`](crate::component::Step::Await) with the valid options.
//! The chosen option is validated by
//! [`Runner::resume`](crate::runner::Runner::resume) and recorded here so a
//! replay can feed the same decisions back in order.

use serde::{Deserialize, Serialize};

use crate::id::ComponentId;

/// One accepted command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerCommand {
    /// Round step at which the round was waiting.
    pub step: u32,
    /// Component that asked for the decision.
    pub component: ComponentId,
    pub choice: String,
}

/// Ordered history of the commands a round accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandLog {
    history: Vec<PlayerCommand>,
}

impl CommandLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, step: u32, component: ComponentId, choice: &str) {
        self.history.push(PlayerCommand {
            step,
            component,
            choice: choice.to_string(),
        });
    }

    /// Accepted commands, oldest first.
    pub fn history(&self) -> &[PlayerCommand] {
        &self.history
    }

    /// The choices alone, in order. This is what a replay feeds back.
    pub fn choices(&self) -> Vec<String> {
        self.history.iter().map(|c| c.choice.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_keeps_submission_order() {
        let mut log = CommandLog::new();
        log.push(3, ComponentId(2), "left");
        log.push(9, ComponentId(2), "right");
        assert_eq!(log.len(), 2);
        assert_eq!(log.choices(), vec!["left".to_string(), "right".to_string()]);
        assert_eq!(log.history()[1].step, 9);
    }

    #[test]
    fn clear_empties_history() {
        let mut log = CommandLog::new();
        log.push(0, ComponentId(0), "a");
        log.clear();
        assert!(log.is_empty());
    }
}
