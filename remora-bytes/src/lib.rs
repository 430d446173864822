//! Utilities to decode/encode things into bytes.
//!
//! We use these to parse and build the byte-encoded messages of the
//! SOCKS protocol.  Everything here works on small in-memory buffers:
//! the caller is responsible for having read the bytes off the
//! network first.
//!
//! These tools are generally unsuitable for handling anything bigger
//! than a few kilobytes in size.

mod err;
mod impls;
mod reader;
mod writer;

pub use err::Error;
pub use reader::Reader;
pub use writer::Writer;

use arrayref::array_ref;

/// Result type returned by this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Trait for an object that can be encoded onto a Writer by reference.
pub trait Writeable {
    /// Encode this object into the writer `b`.
    fn write_onto<B: Writer + ?Sized>(&self, b: &mut B);
}

/// Trait for an object that can be encoded onto a Writer in a way that
/// consumes the original object.
pub trait WriteableOnce {
    /// Encode this object into the writer `b`, consuming it.
    fn write_into<B: Writer + ?Sized>(self, b: &mut B);
}

// ----------------------------------------------------------------------

/// Trait for an object that can be extracted from a Reader.
pub trait Readable: Sized {
    /// Try to extract an object of this type from a Reader.
    fn take_from(b: &mut Reader<'_>) -> Result<Self>;
}

// ----------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn writer() {
        let mut v: Vec<u8> = Vec::new();
        v.write_u8(0x57);
        v.write_u16(0x6520);
        v.write_u32(0x68617665);
        v.write_u64(0x2061206d61636869);
        v.write_all(b"ne in a plexiglass dome");
        v.write_zeros(3);
        assert_eq!(&v[..], &b"We have a machine in a plexiglass dome\0\0\0"[..]);
    }

    #[test]
    fn reader() {
        let v = &b"We have a machine in a plexiglass dome"[..];
        let mut r = Reader::from_slice(v);
        assert_eq!(r.take_u8().unwrap(), 0x57);
        assert_eq!(r.take_u16().unwrap(), 0x6520);
        assert_eq!(r.take_u32().unwrap(), 0x68617665);
        assert_eq!(r.take_u64().unwrap(), 0x2061206d61636869);
        assert_eq!(r.consumed(), 15);
        assert_eq!(r.take(8).unwrap(), &b"ne in a "[..]);
        assert_eq!(r.remaining(), 15);
        assert_eq!(r.take(15).unwrap(), &b"plexiglass dome"[..]);
        assert!(r.should_be_exhausted().is_ok());
        assert_eq!(r.take_u8(), Err(Error::Truncated));
    }
}
