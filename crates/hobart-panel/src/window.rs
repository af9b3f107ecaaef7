//! Event window validation and the derived regressor layout.
//!
//! An event window `[from, to]` spans the periods relative to treatment
//! onset that the analysis reports on. The window fixes the whole
//! regression design:
//!
//! ```text
//! num_leads  = -from - 1        leads of the exposure
//! num_lags   =  to + 1          lags of the exposure (lag 0 included)
//! K          =  to - from       lead/lag coefficients in total
//! num_before =  reference - from   reported rows before the reference
//! num_after  =  to - reference     reported rows after the reference
//! ```
//!
//! Effects at `from` and `to` absorb everything at or beyond the window
//! endpoints, so `from` and `to` are endpoint bins rather than single
//! periods.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::error::{PanelError, Result};
use crate::offset::EventOffset;

/// A validated event window `[from, to]` with a reference period.
///
/// `from` must be strictly negative, `to` strictly positive, and the
/// reference period must lie inside `[from, to]`. The reference period is
/// the omitted category of the reported event-study table; its row is
/// pinned to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventWindow {
    from: i64,
    to: i64,
    reference: i64,
}

impl EventWindow {
    /// Builds a window with an explicit reference period.
    ///
    /// # Errors
    ///
    /// Returns [`PanelError::InvalidWindow`] when `from >= 0`, `to <= 0`,
    /// `from >= to`, or the reference period falls outside `[from, to]`.
    pub const fn new(from: i64, to: i64, reference: i64) -> Result<Self> {
        if from >= 0 {
            return Err(PanelError::InvalidWindow {
                from,
                to,
                reference,
                reason: "from must be strictly negative",
            });
        }
        if to <= 0 {
            return Err(PanelError::InvalidWindow {
                from,
                to,
                reference,
                reason: "to must be strictly positive",
            });
        }
        if from >= to {
            return Err(PanelError::InvalidWindow {
                from,
                to,
                reference,
                reason: "from must be strictly less than to",
            });
        }
        if reference < from || reference > to {
            return Err(PanelError::InvalidWindow {
                from,
                to,
                reference,
                reason: "reference period must lie inside the window",
            });
        }
        Ok(Self { from, to, reference })
    }

    /// Builds a window with the conventional reference period `-1`.
    ///
    /// # Errors
    ///
    /// Returns [`PanelError::InvalidWindow`] under the same conditions as
    /// [`EventWindow::new`].
    pub const fn with_default_reference(from: i64, to: i64) -> Result<Self> {
        Self::new(from, to, -1)
    }

    /// First event period in the window (negative).
    #[must_use]
    pub const fn from(&self) -> i64 {
        self.from
    }

    /// Last event period in the window (positive).
    #[must_use]
    pub const fn to(&self) -> i64 {
        self.to
    }

    /// The omitted reference period.
    #[must_use]
    pub const fn reference(&self) -> i64 {
        self.reference
    }

    /// Number of lead regressors, `-from - 1`.
    #[must_use]
    pub const fn num_leads(&self) -> usize {
        (-self.from - 1) as usize
    }

    /// Number of lag regressors, `to + 1` (lag 0 included).
    #[must_use]
    pub const fn num_lags(&self) -> usize {
        (self.to + 1) as usize
    }

    /// Total number of lead/lag coefficients, `to - from`.
    #[must_use]
    pub const fn num_coefficients(&self) -> usize {
        (self.to - self.from) as usize
    }

    /// Reported event-study rows strictly before the reference period.
    #[must_use]
    pub const fn num_before(&self) -> usize {
        (self.reference - self.from) as usize
    }

    /// Reported event-study rows strictly after the reference period.
    #[must_use]
    pub const fn num_after(&self) -> usize {
        (self.to - self.reference) as usize
    }

    /// Reported event-study rows, `to - from + 1` (reference included).
    #[must_use]
    pub const fn total_periods(&self) -> usize {
        (self.to - self.from + 1) as usize
    }

    /// All event periods covered by the window, ascending.
    #[must_use]
    pub const fn event_times(&self) -> RangeInclusive<i64> {
        self.from..=self.to
    }

    /// Canonical regressor offsets: `Lead(num_leads) .. Lead(1)` followed
    /// by `Lag(0) .. Lag(to)`.
    ///
    /// The order is total under [`EventOffset`]'s `Ord` and is the order
    /// in which the regression engine must report the lead/lag
    /// coefficients.
    #[must_use]
    pub fn offsets(&self) -> Vec<EventOffset> {
        let mut out = Vec::with_capacity(self.num_coefficients());
        for k in (1..=self.num_leads()).rev() {
            out.push(EventOffset::Lead(k as u32));
        }
        for k in 0..self.num_lags() {
            out.push(EventOffset::Lag(k as u32));
        }
        out
    }
}
