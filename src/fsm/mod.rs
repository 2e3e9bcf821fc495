//! Table-driven finite state machine engine.
//!
//! Classic embedded transition-table FSM expressed in safe Rust:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  Transition table (evaluated top to bottom)                  │
//! │  ┌────────────┬──────────────────┬────────────┬────────────┐ │
//! │  │ from       │ guard            │ to         │ action     │ │
//! │  ├────────────┼──────────────────┼────────────┼────────────┤ │
//! │  │ Released   │ fn(&C, &H)->bool │ PressedWait│ fn(&mut ..)│ │
//! │  │ PressedWait│ fn(&C, &H)->bool │ Pressed    │ None       │ │
//! │  │ ...        │ ...              │ ...        │ ...        │ │
//! │  └────────────┴──────────────────┴────────────┴────────────┘ │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each [`Fsm::fire`] scans the table in declared order for the first row
//! whose source equals the current state **and** whose guard holds.  The
//! state moves to the row's destination, then the row's action (if any)
//! runs against the owning context `C` and the injected hardware handle `H`.
//! At most one row fires per call.  No matching row means the machine idles,
//! which is not an error.
//!
//! Guards only receive shared references, so they cannot mutate anything
//! during evaluation; evaluation order is therefore reproducible.

pub mod button;
pub mod buzzer;
pub mod display;
pub mod ultrasound;
pub mod urbanite;

use core::fmt::Debug;

use log::trace;

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Pure predicate over the owning context and the hardware handle.
pub type Guard<C, H> = fn(&C, &H) -> bool;

/// Side-effecting procedure run when its row fires.
pub type Action<C, H> = fn(&mut C, &mut H);

// ---------------------------------------------------------------------------
// Transition row
// ---------------------------------------------------------------------------

/// One row of a transition table.
pub struct Transition<S, C, H> {
    pub from: S,
    pub guard: Guard<C, H>,
    pub to: S,
    pub action: Option<Action<C, H>>,
}

/// The `(from, to)` pair of a transition that fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fired<S> {
    pub from: S,
    pub to: S,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

/// The finite state machine engine.
///
/// Owns a fixed-size table of `N` rows (no heap, no `dyn`) and the current
/// state.  The domain wrapper owns both the engine and the context `C`.
pub struct Fsm<S, C, H, const N: usize> {
    name: &'static str,
    table: [Transition<S, C, H>; N],
    current: S,
}

impl<S, C, H, const N: usize> Fsm<S, C, H, N>
where
    S: Copy + PartialEq + Debug,
{
    /// Construct an FSM bound to `table`, starting in `initial`.
    pub fn new(name: &'static str, table: [Transition<S, C, H>; N], initial: S) -> Self {
        Self {
            name,
            table,
            current: initial,
        }
    }

    /// Construct an FSM starting in the source state of the first row.
    ///
    /// An empty table leaves the machine without a binding, which is an
    /// invariant violation.
    pub fn from_table(name: &'static str, table: [Transition<S, C, H>; N]) -> Result<Self> {
        let initial = table
            .first()
            .map(|row| row.from)
            .ok_or(Error::Invariant("empty transition table"))?;
        Ok(Self::new(name, table, initial))
    }

    /// Evaluate the table once.
    ///
    /// Returns the transition that fired, or `None` if no row matched.
    pub fn fire(&mut self, ctx: &mut C, hw: &mut H) -> Option<Fired<S>> {
        let current = self.current;
        let (to, action) = {
            let (c, h) = (&*ctx, &*hw);
            self.table
                .iter()
                .find(|row| row.from == current && (row.guard)(c, h))
                .map(|row| (row.to, row.action))?
        };

        self.current = to;
        if let Some(action) = action {
            action(ctx, hw);
        }

        trace!("{}: {:?} -> {:?}", self.name, current, to);
        Some(Fired { from: current, to })
    }

    /// The current state.
    pub fn state(&self) -> S {
        self.current
    }

    /// Force the current state without running any action (debug / tests).
    pub fn set_state(&mut self, state: S) {
        self.current = state;
    }

    /// Name used in trace output.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Number of rows in the bound table.
    pub fn table_len(&self) -> usize {
        N
    }
}
