//! Typed lead/lag regressor identities.

use std::cmp::Ordering;

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// One lead or lag of the treatment exposure.
///
/// `Lead(k)` reads the exposure `k` periods ahead of the current row and
/// `Lag(k)` reads it `k` periods behind. The `Display` form (`lead3`,
/// `lag0`, ...) is the regressor column name used throughout the
/// workspace, so coefficient labels can be compared against offsets
/// without any string parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum EventOffset {
    /// Exposure `k` periods ahead of the current row (`x[t + k]`), `k >= 1`.
    #[display("lead{_0}")]
    Lead(u32),
    /// Exposure `k` periods behind the current row (`x[t - k]`), `k >= 0`.
    #[display("lag{_0}")]
    Lag(u32),
}

impl EventOffset {
    /// Signed displacement of the source period relative to the current
    /// row: `Lead(k)` reads from `t + k`, `Lag(k)` from `t - k`.
    #[must_use]
    pub const fn displacement(&self) -> i64 {
        match self {
            Self::Lead(k) => *k as i64,
            Self::Lag(k) => -(*k as i64),
        }
    }

    /// Whether this offset is a lead.
    #[must_use]
    pub const fn is_lead(&self) -> bool {
        matches!(self, Self::Lead(_))
    }
}

impl Ord for EventOffset {
    /// Canonical regressor order: deepest lead first, then lags by
    /// increasing depth.
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Lead(a), Self::Lead(b)) => b.cmp(a),
            (Self::Lead(_), Self::Lag(_)) => Ordering::Less,
            (Self::Lag(_), Self::Lead(_)) => Ordering::Greater,
            (Self::Lag(a), Self::Lag(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for EventOffset {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
