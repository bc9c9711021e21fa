//! # Trigger Client
//!
//! The remote seam of schedule trigger reconciliation.
//!
//! [`RemoteTriggerClient`] exposes the five calls a trigger is reachable
//! through: get, create-or-update, start, stop and delete. Start and stop
//! return a [`LongRunningOperation`] the caller awaits under its own deadline.
//!
//! [`InMemoryTriggerClient`] implements the trait without I/O for tests and
//! local runs. It records every call and can inject failures or stall
//! long-running operations.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod client;
pub mod error;
pub mod memory;

pub use client::{LongRunningOperation, RemoteOperation, RemoteTriggerClient};
pub use error::{ClientError, ClientResult};
pub use memory::{InMemoryTriggerClient, RecordedCall};
