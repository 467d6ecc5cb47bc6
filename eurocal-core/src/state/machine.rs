//! State machine engine
//!
//! States own a table of transitions keyed by action. Each transition is an
//! ordered list of handlers plus an optional default destination:
//!
//! ```text
//! machine.state(Start)
//!     .when(Button2).run(init).goto_and(Point, show_point);
//! ```
//!
//! A wildcard table (`any_state`) is consulted before the current state's
//! table. Its handlers run for side effects only.
//!
//! At most one action is pending. A new action replaces one that has not
//! been executed yet; this is the intended loss-of-event policy for a
//! front panel polled by a single loop.

use heapless::Vec;

/// Maximum number of registered states (excluding the wildcard table)
pub const MAX_STATES: usize = 16;

/// Maximum number of actions handled per state
pub const MAX_TRANSITIONS: usize = 8;

/// Maximum number of handlers per transition, entry handler included
pub const MAX_HANDLERS: usize = 4;

/// Transition handler
///
/// Receives the procedure context and the action being executed. Returning
/// `Some(state)` overrides the transition's default destination.
pub type Handler<S, A, C> = fn(&mut C, A) -> Option<S>;

/// Errors from starting a state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MachineError {
    /// The initial state has no registered transitions
    UnknownState,
    /// A table exceeded its fixed capacity, or a handler was registered
    /// before any `when`
    CapacityExceeded,
}

/// Outcome of one [`StateMachine::execute`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Dispatch<S, A> {
    /// Nothing pending, or the machine is parked in its end state
    Idle,
    /// The current state does not handle the action; it was dropped
    Discarded(A),
    /// Handlers ran and the machine stayed where it was
    Stayed(A),
    /// Handlers ran and the machine entered `to`
    Moved {
        /// Executed action
        action: A,
        /// State before the action
        from: S,
        /// State after the action
        to: S,
    },
}

struct Transition<S, A, C> {
    action: A,
    handlers: Vec<Handler<S, A, C>, MAX_HANDLERS>,
    target: Option<S>,
}

impl<S, A, C> Transition<S, A, C> {
    fn new(action: A) -> Self {
        Self {
            action,
            handlers: Vec::new(),
            target: None,
        }
    }
}

struct StateTable<S, A, C> {
    id: S,
    transitions: Vec<Transition<S, A, C>, MAX_TRANSITIONS>,
}

fn find<'t, S, A: PartialEq, C>(
    transitions: &'t [Transition<S, A, C>],
    action: A,
) -> Option<&'t Transition<S, A, C>> {
    transitions.iter().find(|t| t.action == action)
}

/// Fluent registration of transitions for one state
///
/// Returned by [`StateMachine::state`] and [`StateMachine::any_state`].
/// Capacity problems are recorded on the machine and reported by
/// [`StateMachine::start`].
pub struct StateBuilder<'m, S, A, C> {
    transitions: Option<&'m mut Vec<Transition<S, A, C>, MAX_TRANSITIONS>>,
    overflow: &'m mut bool,
    current: Option<usize>,
}

impl<S: Copy, A: Copy + PartialEq, C> StateBuilder<'_, S, A, C> {
    /// Select (creating on first use) the transition for `action`
    pub fn when(&mut self, action: A) -> &mut Self {
        self.current = None;
        if let Some(transitions) = self.transitions.as_mut() {
            self.current = match transitions.iter().position(|t| t.action == action) {
                Some(index) => Some(index),
                None => transitions
                    .push(Transition::new(action))
                    .ok()
                    .map(|()| transitions.len() - 1),
            };
        }
        if self.current.is_none() {
            *self.overflow = true;
        }
        self
    }

    /// Append a handler to the selected transition
    pub fn run(&mut self, handler: Handler<S, A, C>) -> &mut Self {
        let pushed = match self.transition() {
            Some(transition) => transition.handlers.push(handler).is_ok(),
            None => false,
        };
        if !pushed {
            *self.overflow = true;
        }
        self
    }

    /// Set the default destination of the selected transition
    pub fn goto(&mut self, state: S) -> &mut Self {
        match self.transition() {
            Some(transition) => transition.target = Some(state),
            None => *self.overflow = true,
        }
        self
    }

    /// Set the default destination and append an entry handler
    ///
    /// The entry handler runs after the handlers registered with `run`.
    pub fn goto_and(&mut self, state: S, entry: Handler<S, A, C>) -> &mut Self {
        self.run(entry).goto(state)
    }

    fn transition(&mut self) -> Option<&mut Transition<S, A, C>> {
        let index = self.current?;
        self.transitions.as_mut()?.get_mut(index)
    }
}

/// Declarative single-pending-action state machine
///
/// `S` identifies states, `A` identifies actions and `C` is the context
/// handed to every handler.
pub struct StateMachine<S, A, C> {
    states: Vec<StateTable<S, A, C>, MAX_STATES>,
    any: Vec<Transition<S, A, C>, MAX_TRANSITIONS>,
    current: Option<S>,
    end: Option<S>,
    pending: Option<A>,
    overflow: bool,
}

impl<S: Copy + PartialEq, A: Copy + PartialEq, C> Default for StateMachine<S, A, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Copy + PartialEq, A: Copy + PartialEq, C> StateMachine<S, A, C> {
    /// Create an empty, unstarted machine
    pub fn new() -> Self {
        Self {
            states: Vec::new(),
            any: Vec::new(),
            current: None,
            end: None,
            pending: None,
            overflow: false,
        }
    }

    /// Registration builder for state `id`
    pub fn state(&mut self, id: S) -> StateBuilder<'_, S, A, C> {
        let index = match self.states.iter().position(|t| t.id == id) {
            Some(index) => Some(index),
            None => {
                let table = StateTable {
                    id,
                    transitions: Vec::new(),
                };
                self.states.push(table).ok().map(|()| self.states.len() - 1)
            }
        };
        if index.is_none() {
            self.overflow = true;
        }
        let transitions = match index {
            Some(index) => Some(&mut self.states[index].transitions),
            None => None,
        };
        StateBuilder {
            transitions,
            overflow: &mut self.overflow,
            current: None,
        }
    }

    /// Registration builder for the wildcard table
    pub fn any_state(&mut self) -> StateBuilder<'_, S, A, C> {
        StateBuilder {
            transitions: Some(&mut self.any),
            overflow: &mut self.overflow,
            current: None,
        }
    }

    /// Declare the reserved end state, in which `execute` does nothing
    pub fn set_end_state(&mut self, id: S) {
        self.end = Some(id);
    }

    /// Enter `id` and clear any pending action
    pub fn start(&mut self, id: S) -> Result<(), MachineError> {
        if self.overflow {
            return Err(MachineError::CapacityExceeded);
        }
        if !self.is_registered(id) {
            return Err(MachineError::UnknownState);
        }
        self.current = Some(id);
        self.pending = None;
        Ok(())
    }

    /// Queue `action`, replacing any action not yet executed
    pub fn do_action(&mut self, action: A) {
        self.pending = Some(action);
    }

    /// Execute the pending action, if any
    pub fn execute(&mut self, ctx: &mut C) -> Dispatch<S, A> {
        let Some(action) = self.pending else {
            return Dispatch::Idle;
        };
        if self.current.is_some() && self.current == self.end {
            return Dispatch::Idle;
        }
        self.pending = None;

        let Some(from) = self.current else {
            return Dispatch::Discarded(action);
        };

        if let Some(wildcard) = find(&self.any, action) {
            for &handler in &wildcard.handlers {
                let _ = handler(&mut *ctx, action);
            }
        }

        let transition = self
            .states
            .iter()
            .find(|t| t.id == from)
            .and_then(|t| find(&t.transitions, action));
        let Some(transition) = transition else {
            return Dispatch::Discarded(action);
        };

        let mut next = None;
        for &handler in &transition.handlers {
            if let Some(state) = handler(&mut *ctx, action) {
                next = Some(state);
            }
        }

        match next.or(transition.target) {
            Some(to) => {
                self.current = Some(to);
                Dispatch::Moved { action, from, to }
            }
            None => Dispatch::Stayed(action),
        }
    }

    /// Check if the machine is in state `id`
    pub fn in_state(&self, id: S) -> bool {
        self.current == Some(id)
    }

    /// Current state, `None` before `start`
    pub fn state_id(&self) -> Option<S> {
        self.current
    }

    /// The action waiting for `execute`
    pub fn pending_action(&self) -> Option<A> {
        self.pending
    }

    /// Check if an action is waiting for `execute`
    pub fn has_pending_action(&self) -> bool {
        self.pending.is_some()
    }

    /// Check if `id` has been registered with [`StateMachine::state`]
    pub fn is_registered(&self, id: S) -> bool {
        self.states.iter().any(|t| t.id == id)
    }
}
