//! Background tasks.

pub mod replay_purger;
