//! State machine for guided procedures
//!
//! A small declarative engine: procedures register handlers per
//! (state, action) pair and feed operator actions through a single
//! pending-action slot.

pub mod action;
pub mod machine;

pub use action::Action;
pub use machine::{
    Dispatch, Handler, MachineError, StateBuilder, StateMachine, MAX_HANDLERS, MAX_STATES,
    MAX_TRANSITIONS,
};
