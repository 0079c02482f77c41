//! Thread-safe access to the fork choice store.
//!
//! [`Controller`] owns the [`Store`] behind a single read-write lock.
//! Mutations take the lock exclusively. Queries share it.
//! Checkpoint states are advanced outside the lock so that long slot processing
//! does not block queries or other mutations.
//!
//! [`Store`]: fork_choice_store::Store

pub use crate::{controller::Controller, misc::ForkChoiceDump};

mod controller;
mod misc;
mod queries;
