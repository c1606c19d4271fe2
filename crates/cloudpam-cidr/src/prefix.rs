use std::fmt;
use std::str::FromStr;

use crate::error::CidrError;

/// A normalized IPv4 network prefix: `addr` is always the *network* address for `bits`, i.e.
/// every host bit beyond the prefix length is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
pub struct Ipv4Prefix {
    addr: u32,
    bits: u8,
}

impl Ipv4Prefix {
    /// Builds a prefix from a raw network address and length, rejecting addresses that are not
    /// aligned to that length (`spec.md` §4.1: "the address must equal its own network address
    /// for its prefix length").
    pub fn new(addr: u32, bits: u8) -> Result<Self, CidrError> {
        if bits > 32 {
            return Err(CidrError::new(
                format!("{addr:#010x}/{bits}"),
                "prefix length must be in [0, 32]",
            ));
        }
        let mask = Self::mask(bits);
        if addr & !mask != 0 {
            return Err(CidrError::new(
                Self::format(addr, bits),
                "address is not the network address for this prefix length",
            ));
        }
        Ok(Self { addr, bits })
    }

    fn mask(bits: u8) -> u32 {
        if bits == 0 {
            0
        } else {
            u32::MAX << (32 - bits)
        }
    }

    fn format(addr: u32, bits: u8) -> String {
        let [a, b, c, d] = addr.to_be_bytes();
        format!("{a}.{b}.{c}.{d}/{bits}")
    }

    #[must_use]
    pub fn addr(&self) -> u32 {
        self.addr
    }

    #[must_use]
    pub fn bits(&self) -> u8 {
        self.bits
    }

    /// Lowest address in the block, as a 64-bit value (see [`Ipv4Prefix::hi`] for why).
    #[must_use]
    pub fn lo(&self) -> u64 {
        u64::from(self.addr)
    }

    /// Highest address in the block. Using `u64` throughout (rather than `u32`) lets a `/0`
    /// block's highest address (`2^32 - 1`) and its exclusive upper bound (`2^32`) both be
    /// represented without overflow.
    #[must_use]
    pub fn hi(&self) -> u64 {
        self.lo() + address_count(self.bits) - 1
    }

    /// Parses a string of the form `A.B.C.D/n`. Rejects octets out of range, prefix lengths
    /// outside `[0, 32]`, and addresses that are not network-aligned for `n`.
    pub fn parse(s: &str) -> Result<Self, CidrError> {
        let (addr_part, bits_part) = s
            .split_once('/')
            .ok_or_else(|| CidrError::new(s, "missing '/prefix-length'"))?;
        let bits: u8 = bits_part
            .parse()
            .map_err(|_| CidrError::new(s, "prefix length is not a valid integer"))?;
        if bits > 32 {
            return Err(CidrError::new(s, "prefix length must be in [0, 32]"));
        }
        let addr = parse_ipv4_octets(addr_part).map_err(|reason| CidrError::new(s, reason))?;
        Self::new(addr, bits).map_err(|_| {
            CidrError::new(
                s,
                "address is not the network address for this prefix length",
            )
        })
    }

    /// Parses a CIDR, or a bare IPv4 address treated as a `/32` (`spec.md` §4.1:
    /// `parse_cidr_or_ip`).
    pub fn parse_cidr_or_ip(s: &str) -> Result<Self, CidrError> {
        if s.contains('/') {
            Self::parse(s)
        } else {
            let addr = parse_ipv4_octets(s).map_err(|reason| CidrError::new(s, reason))?;
            Self::new(addr, 32).map_err(|_| CidrError::new(s, "not a valid /32 address"))
        }
    }
}

fn parse_ipv4_octets(s: &str) -> Result<u32, &'static str> {
    let mut octets = [0u8; 4];
    let mut parts = s.split('.');
    for octet in &mut octets {
        let part = parts.next().ok_or("expected 4 dotted decimal octets")?;
        if part.is_empty() || (part.len() > 1 && part.starts_with('0')) {
            return Err("octet has leading zero or is empty");
        }
        let value: u16 = part.parse().map_err(|_| "octet is not a valid integer")?;
        if value > 255 {
            return Err("octet out of range 0-255");
        }
        *octet = value as u8;
    }
    if parts.next().is_some() {
        return Err("expected exactly 4 dotted decimal octets");
    }
    Ok(u32::from_be_bytes(octets))
}

impl FromStr for Ipv4Prefix {
    type Err = CidrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Ipv4Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Self::format(self.addr, self.bits))
    }
}

#[cfg(feature = "serde")]
impl TryFrom<String> for Ipv4Prefix {
    type Error = CidrError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

#[cfg(feature = "serde")]
impl From<Ipv4Prefix> for String {
    fn from(value: Ipv4Prefix) -> Self {
        value.to_string()
    }
}

/// `1 << (32 - bits)`, as a 64-bit count so that `bits == 0` (the whole IPv4 space) doesn't
/// overflow `u32` (`spec.md` §4.1: `address_count`).
#[must_use]
pub fn address_count(bits: u8) -> u64 {
    1u64 << (32 - u32::from(bits))
}

/// True iff `child` lies entirely inside `parent` (`spec.md` §4.1: `prefix_contains` — "`child.
/// bits >= parent.bits` and the high `parent.bits` of `child.addr` equal `parent.addr`").
#[must_use]
pub fn prefix_contains(parent: Ipv4Prefix, child: Ipv4Prefix) -> bool {
    if child.bits < parent.bits {
        return false;
    }
    let shift = 32 - u32::from(parent.bits);
    let parent_network = if shift >= 32 { 0 } else { parent.addr >> shift };
    let child_network = if shift >= 32 { 0 } else { child.addr >> shift };
    parent_network == child_network
}

/// True iff `a` and `b` overlap at all, i.e. one contains the other (`spec.md` §4.1:
/// `prefix_overlaps`).
#[must_use]
pub fn prefix_overlaps(a: Ipv4Prefix, b: Ipv4Prefix) -> bool {
    prefix_contains(a, b) || prefix_contains(b, a)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_cidr() {
        let p = Ipv4Prefix::parse("10.0.1.0/24").unwrap();
        assert_eq!(p.addr(), u32::from_be_bytes([10, 0, 1, 0]));
        assert_eq!(p.bits(), 24);
    }

    #[test]
    fn rejects_unaligned_address() {
        let err = Ipv4Prefix::parse("10.0.1.1/24").unwrap_err();
        assert_eq!(err.input, "10.0.1.1/24");
    }

    #[test]
    fn rejects_out_of_range_octet() {
        assert!(Ipv4Prefix::parse("10.0.1.256/24").is_err());
    }

    #[test]
    fn rejects_bad_prefix_length() {
        assert!(Ipv4Prefix::parse("10.0.1.0/33").is_err());
    }

    #[test]
    fn parse_cidr_or_ip_accepts_bare_address_as_slash_32() {
        let p = Ipv4Prefix::parse_cidr_or_ip("10.0.0.5").unwrap();
        assert_eq!(p.bits(), 32);
        assert_eq!(p.to_string(), "10.0.0.5/32");
    }

    #[test]
    fn display_round_trips() {
        for s in ["10.0.0.0/16", "0.0.0.0/0", "192.168.1.1/32"] {
            let p = Ipv4Prefix::parse(s).unwrap();
            assert_eq!(p.to_string(), s);
            assert_eq!(Ipv4Prefix::parse(&p.to_string()).unwrap(), p);
        }
    }

    #[test]
    fn containment_requires_bits_order() {
        let parent = Ipv4Prefix::parse("10.0.0.0/16").unwrap();
        let child = Ipv4Prefix::parse("10.0.1.0/24").unwrap();
        assert!(prefix_contains(parent, child));
        assert!(!prefix_contains(child, parent));
    }

    #[test]
    fn overlap_is_symmetric() {
        let a = Ipv4Prefix::parse("10.0.0.0/24").unwrap();
        let b = Ipv4Prefix::parse("10.0.1.0/24").unwrap();
        assert!(!prefix_overlaps(a, b));
        assert!(prefix_overlaps(a, a));
    }

    #[test]
    fn address_count_matches_prefix_length() {
        assert_eq!(address_count(32), 1);
        assert_eq!(address_count(24), 256);
        assert_eq!(address_count(0), 1u64 << 32);
    }

    proptest::proptest! {
        #[test]
        fn round_trip_any_valid_prefix(a in 0u8..=255, b in 0u8..=255, c in 0u8..=255, d in 0u8..=255, bits in 0u8..=32) {
            let addr = u32::from_be_bytes([a, b, c, d]);
            let mask = if bits == 0 { 0 } else { u32::MAX << (32 - bits) };
            let network = addr & mask;
            let p = Ipv4Prefix::new(network, bits).unwrap();
            let formatted = p.to_string();
            let reparsed = Ipv4Prefix::parse(&formatted).unwrap();
            proptest::prop_assert_eq!(p, reparsed);
        }
    }
}
