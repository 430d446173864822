//! Implementations of Writeable and Readable for the types we use
//! when handling SOCKS messages.
//!
//! These don't need to be in a separate module, but for convenience
//! this is where I'm putting them.

use super::*;

// ----------------------------------------------------------------------

/// Vec<u8> is the main type that implements Writer.
impl Writer for Vec<u8> {
    fn write_all(&mut self, bytes: &[u8]) {
        self.extend_from_slice(bytes);
    }
    fn write_u8(&mut self, byte: u8) {
        // specialize for performance
        self.push(byte);
    }
    fn write_zeros(&mut self, n: usize) {
        // specialize for performance
        let new_len = self.len() + n;
        self.resize(new_len, 0);
    }
}

// ----------------------------------------------------------------------

impl Writeable for [u8] {
    fn write_onto<B: Writer + ?Sized>(&self, b: &mut B) {
        b.write_all(self)
    }
}

impl Writeable for Vec<u8> {
    fn write_onto<B: Writer + ?Sized>(&self, b: &mut B) {
        b.write_all(&self[..])
    }
}

// Implementations for reading and writing the unsigned types.
macro_rules! impl_u {
    ( $t:ty, $wrfn:ident, $rdfn:ident ) => {
        impl Writeable for $t {
            fn write_onto<B: Writer + ?Sized>(&self, b: &mut B) {
                b.$wrfn(*self)
            }
        }
        impl Readable for $t {
            fn take_from(b: &mut Reader<'_>) -> Result<Self> {
                b.$rdfn()
            }
        }
    };
}

impl_u!(u8, write_u8, take_u8);
impl_u!(u16, write_u16, take_u16);
impl_u!(u32, write_u32, take_u32);
impl_u!(u64, write_u64, take_u64);
impl_u!(u128, write_u128, take_u128);

// ----------------------------------------------------------------------

/// Implement Readable and Writeable for IPv4 and IPv6 addresses.
///
/// These are encoded as a sequence of octets, not as strings.
mod net_impls {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    impl Writeable for Ipv4Addr {
        fn write_onto<B: Writer + ?Sized>(&self, b: &mut B) {
            b.write_all(&self.octets()[..])
        }
    }

    impl Readable for Ipv4Addr {
        fn take_from(r: &mut Reader<'_>) -> Result<Self> {
            Ok(r.take_u32()?.into())
        }
    }

    impl Writeable for Ipv6Addr {
        fn write_onto<B: Writer + ?Sized>(&self, b: &mut B) {
            b.write_all(&self.octets()[..])
        }
    }
    impl Readable for Ipv6Addr {
        fn take_from(r: &mut Reader<'_>) -> Result<Self> {
            Ok(r.take_u128()?.into())
        }
    }
}

/// Implement readable and writeable for common sizes of u8 arrays.
mod u8_array_impls {
    use super::*;
    macro_rules! impl_array {
        ($n:literal) => {
            impl Writeable for [u8; $n] {
                fn write_onto<B: Writer + ?Sized>(&self, b: &mut B) {
                    b.write_all(&self[..])
                }
            }
            impl Readable for [u8; $n] {
                fn take_from(r: &mut Reader<'_>) -> Result<Self> {
                    let bytes = r.take($n)?;
                    Ok(array_ref!(bytes, 0, $n).clone())
                }
            }
        };
    }
    // These are the lengths we know we need right now.
    impl_array! {4}
    impl_array! {16}
}

#[cfg(test)]
mod test {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[test]
    fn vec_u8() {
        let mut v: Vec<u8> = Vec::new();
        v.write(&7u8);
        v.write(&(999u16));
        v.write_zeros(2);
        assert_eq!(&v[..], &[7, 3, 0xe7, 0, 0]);

        let mut r = Reader::from_slice(&v[..]);
        assert_eq!(r.extract::<u8>().unwrap(), 7);
        assert_eq!(r.extract::<u16>().unwrap(), 999);
        assert_eq!(r.extract::<u16>().unwrap(), 0);
    }

    #[test]
    fn addr_round_trip() {
        let ip4 = Ipv4Addr::new(192, 0, 2, 33);
        let ip6: Ipv6Addr = "2001:db8::f00".parse().unwrap();

        let mut v: Vec<u8> = Vec::new();
        v.write(&ip4);
        v.write(&ip6);
        assert_eq!(v.len(), 20);

        let mut r = Reader::from_slice(&v[..]);
        assert_eq!(r.extract::<Ipv4Addr>().unwrap(), ip4);
        assert_eq!(r.extract::<Ipv6Addr>().unwrap(), ip6);
        r.should_be_exhausted().unwrap();
    }

    #[test]
    fn array_round_trip() {
        let mut v: Vec<u8> = Vec::new();
        v.write(&[9_u8; 4]);
        v.write(&[177_u8; 16]);

        let mut r = Reader::from_slice(&v[..]);
        assert_eq!(r.extract::<[u8; 4]>().unwrap(), [9_u8; 4]);
        assert_eq!(r.extract::<[u8; 16]>().unwrap(), [177_u8; 16]);
    }
}
