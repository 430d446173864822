//! Implementations of the traits in this crate for the runtimes we
//! support.  (That's just tokio right now.)

pub(crate) mod tokio;
