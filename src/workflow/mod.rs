//! Report workflow: state transitions and the notifications they emit.

pub mod lifecycle;
pub mod notifications;

pub use lifecycle::{Assignment, Effect, LifecycleError, NewReport, Transition};
pub use notifications::{notification_for, Outcome};
