//! Compatibility between different async runtimes for Remora.
//!
//! We isolate the runtime dependencies in a single place so that the
//! rest of the workspace depends only on the minimal set of features
//! it actually needs from a runtime: spawning tasks, blocking on a
//! future, sleeping, and making, accepting, and resolving TCP
//! connections.
//!
//! Right now only a tokio backend exists; the worker-thread count of
//! its executor is chosen by the caller.  Streams are exposed with the
//! [`futures::io`] traits, which are more standard than tokio's own.

#![deny(missing_docs)]
#![deny(unreachable_pub)]
#![deny(clippy::await_holding_lock)]
#![warn(clippy::clone_on_ref_ptr)]
#![warn(clippy::cognitive_complexity)]
#![deny(clippy::debug_assert_with_mut_call)]
#![deny(clippy::exhaustive_enums)]
#![deny(clippy::exhaustive_structs)]
#![deny(clippy::fallible_impl_from)]
#![deny(clippy::large_stack_arrays)]
#![warn(clippy::manual_ok_or)]
#![deny(clippy::missing_docs_in_private_items)]
#![warn(clippy::needless_borrow)]
#![warn(clippy::option_option)]
#![warn(clippy::rc_buffer)]
#![deny(clippy::ref_option_ref)]
#![warn(clippy::unseparated_literal_suffix)]

pub(crate) mod impls;
mod timeout;
mod traits;

pub mod tokio;

#[cfg(test)]
mod test;

pub use timeout::{SleepProviderExt, Timeout, TimeoutError};
pub use traits::{Runtime, SleepProvider, SpawnBlocking, TcpListener, TcpProvider, TcpStream};
