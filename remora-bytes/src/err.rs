use thiserror::Error;

/// Error type for decoding protocol objects from bytes.
#[derive(Error, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The object is truncated, or not fully present in the input.
    #[error("object truncated (or not fully present)")]
    Truncated,
    /// There were bytes left over after parsing the object.
    #[error("extra bytes at end of object")]
    ExtraneousBytes,
    /// The object was malformed in some way.
    #[error("bad object: {0}")]
    BadMessage(&'static str),
    /// Something went wrong that indicates a bug in this crate.
    #[error("internal programming error")]
    Internal,
}
