// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Muster Contributors

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! muster-store: backing store adapter.
//!
//! The [`Store`] trait is the only place a concrete store is named; the rest
//! of the control plane depends on this interface. The in-tree backend is
//! [`MemoryStore`]; durable persistence is out of scope for the control
//! plane, which re-learns fleet state from worker registrations.

pub mod keys;
mod memory;
mod store;

pub use memory::MemoryStore;
pub use store::{Op, SharedStore, Store, StoreError, Subscription};
