// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-invocation classifier state machine.

use std::fmt;

use tracing::{debug, warn};

/// `Idle -> Extracting -> Scoring -> Done | Failed`. Failure is reachable from
/// any non-terminal stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Extracting,
    Scoring,
    Done,
    Failed,
}

impl Stage {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    pub fn can_advance_to(self, next: Stage) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Extracting)
                | (Self::Extracting, Self::Scoring)
                | (Self::Scoring, Self::Done)
                | (Self::Idle | Self::Extracting | Self::Scoring, Self::Failed)
        )
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Extracting => "extracting",
            Self::Scoring => "scoring",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Tracks one invocation's progress through [`Stage`].
#[derive(Debug)]
pub struct StageTracker {
    label: &'static str,
    stage: Stage,
}

impl StageTracker {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            stage: Stage::Idle,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Move to `next`. Illegal transitions are logged and leave the stage
    /// unchanged; returns whether the move happened.
    pub fn advance(&mut self, next: Stage) -> bool {
        if !self.stage.can_advance_to(next) {
            warn!(path = self.label, from = %self.stage, to = %next, "Illegal stage transition");
            return false;
        }
        debug!(path = self.label, from = %self.stage, to = %next, "Stage transition");
        self.stage = next;
        true
    }

    pub fn fail(&mut self) -> bool {
        self.advance(Stage::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path() {
        let mut t = StageTracker::new("baseline");
        assert!(t.advance(Stage::Extracting));
        assert!(t.advance(Stage::Scoring));
        assert!(t.advance(Stage::Done));
        assert!(t.stage().is_terminal());
    }

    #[test]
    fn skipping_stages_is_rejected() {
        let mut t = StageTracker::new("hybrid");
        assert!(!t.advance(Stage::Scoring));
        assert_eq!(t.stage(), Stage::Idle);
    }

    #[test]
    fn terminal_stages_are_final() {
        let mut t = StageTracker::new("hybrid");
        t.advance(Stage::Extracting);
        assert!(t.fail());
        assert!(!t.advance(Stage::Scoring));
        assert!(!t.fail());
        assert_eq!(t.stage(), Stage::Failed);
    }
}
