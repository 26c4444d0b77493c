//! Behaviors shared across the emulation.

use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[must_use]
pub enum Kind {
    /// Restore user-facing settings only.
    Soft,
    /// Also clear all signal state and reseed the noise generator.
    Hard,
}

pub trait Reset {
    fn reset(&mut self, _kind: Kind) {}
}
