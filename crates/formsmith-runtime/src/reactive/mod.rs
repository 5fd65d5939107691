//! Read-only reactive projections of designer state.

pub mod observable;

pub use observable::{Observable, Subscription};
