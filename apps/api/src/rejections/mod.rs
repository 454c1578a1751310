//! Rejection-email pipeline: scheduling, due-email selection, batch dispatch
//! and delivery outcome recording.

pub mod dispatcher;
pub mod handlers;
#[cfg(test)]
pub mod memory;
pub mod postgres;
pub mod recorder;
pub mod repository;
pub mod schedule;
