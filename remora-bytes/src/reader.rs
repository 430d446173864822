use crate::{Error, Readable, Result};
use arrayref::array_ref;

/// A type for reading messages from a slice of bytes.
///
/// The Reader keeps track of how much of its input it has consumed,
/// so that the caller can find out how many bytes a message occupied
/// once it has been parsed, and drain exactly that many from its own
/// buffer.
///
/// Multi-byte integers are read in network (big-endian) byte order.
///
/// # Examples
///
/// You can use a Reader to extract information byte-by-byte:
///
/// ```
/// use remora_bytes::{Error, Reader};
/// let msg = [0x05, 0x01, 0x00, 0x50];
/// let mut r = Reader::from_slice(&msg[..]);
/// assert_eq!(r.take_u8().unwrap(), 5);
/// assert_eq!(r.take_u8().unwrap(), 1);
/// assert_eq!(r.take_u16().unwrap(), 80);
/// assert_eq!(r.consumed(), 4);
/// // Trying to read more than is present gives Truncated.
/// assert_eq!(r.take_u8(), Err(Error::Truncated));
/// ```
#[derive(Debug)]
pub struct Reader<'a> {
    /// The underlying slice that we're reading from.
    b: &'a [u8],
    /// The next position in the slice that we intend to read from.
    off: usize,
}

impl<'a> Reader<'a> {
    /// Construct a new Reader from a slice of bytes.
    pub fn from_slice(slice: &'a [u8]) -> Self {
        Reader { b: slice, off: 0 }
    }
    /// Return the total length of the slice in this reader, including
    /// the bytes already consumed.
    pub fn total_len(&self) -> usize {
        self.b.len()
    }
    /// Return the number of bytes in this reader that have not yet
    /// been consumed.
    pub fn remaining(&self) -> usize {
        self.b.len() - self.off
    }
    /// Return the number of bytes that have been consumed from this
    /// reader so far.
    pub fn consumed(&self) -> usize {
        self.off
    }
    /// Return the next `n` bytes without consuming them, or Truncated
    /// if there are not that many available.
    fn peek(&self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(Error::Truncated);
        }
        Ok(&self.b[self.off..(self.off + n)])
    }
    /// Skip the next `n` bytes, or give Truncated if there are not
    /// that many available.
    pub fn advance(&mut self, n: usize) -> Result<()> {
        self.peek(n)?;
        self.off += n;
        Ok(())
    }
    /// Check that there are no more bytes to consume, and give
    /// ExtraneousBytes otherwise.
    pub fn should_be_exhausted(&self) -> Result<()> {
        if self.remaining() != 0 {
            return Err(Error::ExtraneousBytes);
        }
        Ok(())
    }
    /// Consume and return the next `n` bytes.
    pub fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let b = self.peek(n)?;
        self.off += n;
        Ok(b)
    }
    /// Consume and return all the bytes up to (but not including) the
    /// next occurrence of `term`, and skip the terminator itself.
    ///
    /// Gives Truncated if the terminator never appears: the caller
    /// may not have received it yet.
    pub fn take_until(&mut self, term: u8) -> Result<&'a [u8]> {
        let pos = self.b[self.off..]
            .iter()
            .position(|b| *b == term)
            .ok_or(Error::Truncated)?;
        let result = self.take(pos)?;
        self.advance(1)?;
        Ok(result)
    }
    /// Consume and return the next byte.
    pub fn take_u8(&mut self) -> Result<u8> {
        let b = self.take(1)?;
        Ok(b[0])
    }
    /// Consume and return the next 2 bytes as a big-endian u16.
    pub fn take_u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes(*array_ref![b, 0, 2]))
    }
    /// Consume and return the next 4 bytes as a big-endian u32.
    pub fn take_u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes(*array_ref![b, 0, 4]))
    }
    /// Consume and return the next 8 bytes as a big-endian u64.
    pub fn take_u64(&mut self) -> Result<u64> {
        let b = self.take(8)?;
        Ok(u64::from_be_bytes(*array_ref![b, 0, 8]))
    }
    /// Consume and return the next 16 bytes as a big-endian u128.
    pub fn take_u128(&mut self) -> Result<u128> {
        let b = self.take(16)?;
        Ok(u128::from_be_bytes(*array_ref![b, 0, 16]))
    }
    /// Try to decode and consume a Readable object from this reader.
    pub fn extract<E: Readable>(&mut self) -> Result<E> {
        E::take_from(self)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn bytecursor_ok() {
        let bytes = b"hinges hold the door";
        let mut r = Reader::from_slice(&bytes[..]);
        assert_eq!(r.total_len(), 20);
        assert_eq!(r.take(6).unwrap(), &b"hinges"[..]);
        r.advance(1).unwrap();
        assert_eq!(r.consumed(), 7);
        assert_eq!(r.remaining(), 13);
        assert_eq!(r.take_until(b' ').unwrap(), &b"hold"[..]);
        assert_eq!(r.take(8).unwrap(), &b"the door"[..]);
        r.should_be_exhausted().unwrap();
    }

    #[test]
    fn bytecursor_failures() {
        let bytes = b"smol";
        let mut r = Reader::from_slice(&bytes[..]);
        assert_eq!(r.take_u64(), Err(Error::Truncated));
        assert_eq!(r.take_until(0), Err(Error::Truncated));
        assert_eq!(r.take_u32().unwrap(), 0x736d6f6c);
        assert_eq!(r.should_be_exhausted(), Ok(()));
        assert_eq!(r.advance(1), Err(Error::Truncated));

        let mut r = Reader::from_slice(&bytes[..]);
        r.advance(1).unwrap();
        assert_eq!(r.should_be_exhausted(), Err(Error::ExtraneousBytes));
    }

    #[test]
    fn extract_addrs() {
        use std::net::{Ipv4Addr, Ipv6Addr};
        let bytes = [127, 0, 0, 1];
        let mut r = Reader::from_slice(&bytes[..]);
        let ip: Ipv4Addr = r.extract().unwrap();
        assert_eq!(ip, Ipv4Addr::LOCALHOST);

        let bytes = [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1];
        let mut r = Reader::from_slice(&bytes[..]);
        let ip: Ipv6Addr = r.extract().unwrap();
        assert_eq!(ip, Ipv6Addr::LOCALHOST);
    }
}
