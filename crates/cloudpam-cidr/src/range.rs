use crate::error::CidrError;
use crate::prefix::{address_count, Ipv4Prefix};

/// Lazily enumerates the `/new_bits` children of `parent`, without materializing the full list
/// (`spec.md` §4.1: `subdivide` — "lazy enumeration of /newBits children inside parent; bounded
/// generator, terminates naturally"; reinforced by §9's "avoid materializing full lists for
/// large `/8`→`/24` enumerations").
pub struct Subdivide {
    next_addr: u64,
    end_exclusive: u64,
    bits: u8,
}

impl Subdivide {
    pub fn new(parent: Ipv4Prefix, new_bits: u8) -> Result<Self, CidrError> {
        if new_bits < parent.bits() || new_bits > 32 {
            return Err(CidrError {
                input: format!("{parent}/{new_bits}"),
                reason: "new prefix length must be between the parent's length and 32".to_owned(),
            });
        }
        Ok(Self {
            next_addr: parent.lo(),
            end_exclusive: parent.hi() + 1,
            bits: new_bits,
        })
    }
}

impl Iterator for Subdivide {
    type Item = Ipv4Prefix;

    fn next(&mut self) -> Option<Ipv4Prefix> {
        if self.next_addr >= self.end_exclusive {
            return None;
        }
        let addr = u32::try_from(self.next_addr).ok()?;
        self.next_addr += address_count(self.bits);
        // `addr` is `parent.lo() + k * address_count(bits)`, which is always a multiple of
        // `address_count(bits)` since `parent.lo()` is itself network-aligned at `parent.bits()`
        // and `new_bits >= parent.bits()`.
        #[allow(clippy::expect_used)]
        Some(Ipv4Prefix::new(addr, self.bits).expect("subdivision addresses are always aligned"))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.end_exclusive - self.next_addr) / address_count(self.bits);
        let remaining = usize::try_from(remaining).unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

/// Computes the minimal set of aligned CIDRs covering `[lo, hi]`, in ascending `lo` order
/// (`spec.md` §4.1: `range_to_cidrs`). Greedy: at each step, picks the largest prefix aligned at
/// `lo` whose size does not exceed the remaining range, then advances.
#[must_use]
pub fn range_to_cidrs(lo: u64, hi: u64) -> Vec<Ipv4Prefix> {
    if lo > hi {
        return Vec::new();
    }
    let mut blocks = Vec::new();
    let mut lo = lo;
    loop {
        let remaining = hi - lo + 1;
        let size_limit_bits = 63 - remaining.leading_zeros();
        let align_bits = if lo == 0 { 32 } else { lo.trailing_zeros().min(32) };
        let block_bits = size_limit_bits.min(align_bits);
        let block_size = 1u64 << block_bits;
        let prefix_len = 32 - u8::try_from(block_bits).unwrap_or(32);

        #[allow(clippy::expect_used)]
        let addr = u32::try_from(lo).expect("lo stays within u32 range for IPv4 blocks");
        #[allow(clippy::expect_used)]
        blocks.push(
            Ipv4Prefix::new(addr, prefix_len)
                .expect("block address is aligned to block_size by construction"),
        );

        lo += block_size;
        if lo > hi {
            break;
        }
    }
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subdivide_slash_16_into_slash_24s() {
        let parent = Ipv4Prefix::parse("10.0.0.0/16").unwrap();
        let children: Vec<_> = Subdivide::new(parent, 24).unwrap().collect();
        assert_eq!(children.len(), 256);
        assert_eq!(children[0].to_string(), "10.0.0.0/24");
        assert_eq!(children[255].to_string(), "10.0.255.0/24");
    }

    #[test]
    fn subdivide_rejects_smaller_prefix() {
        let parent = Ipv4Prefix::parse("10.0.0.0/24").unwrap();
        assert!(Subdivide::new(parent, 16).is_err());
    }

    #[test]
    fn range_to_cidrs_matches_spec_example() {
        // spec.md S2: gaps inside 10.0.0.0/16 after carving 10.0.0.0/24, 10.0.1.0/24, 10.0.3.0/24.
        let p = Ipv4Prefix::parse("10.0.2.0/24").unwrap();
        let cidrs = range_to_cidrs(p.lo(), p.hi());
        assert_eq!(cidrs, vec![p]);
    }

    #[test]
    fn range_to_cidrs_large_gap_decomposes_as_in_spec() {
        let lo = Ipv4Prefix::parse("10.0.4.0/24").unwrap().lo();
        let hi = Ipv4Prefix::parse("10.0.255.0/24").unwrap().hi();
        let cidrs = range_to_cidrs(lo, hi);
        let expected = [
            "10.0.4.0/22",
            "10.0.8.0/21",
            "10.0.16.0/20",
            "10.0.32.0/19",
            "10.0.64.0/18",
            "10.0.128.0/17",
        ];
        let rendered: Vec<String> = cidrs.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, expected);
    }

    #[test]
    fn range_to_cidrs_whole_space_is_one_slash_zero() {
        let cidrs = range_to_cidrs(0, u32::MAX.into());
        assert_eq!(cidrs.len(), 1);
        assert_eq!(cidrs[0].to_string(), "0.0.0.0/0");
    }

    #[test]
    fn range_to_cidrs_empty_for_inverted_range() {
        assert!(range_to_cidrs(10, 5).is_empty());
    }

    #[test]
    fn range_to_cidrs_single_address() {
        let cidrs = range_to_cidrs(167_772_161, 167_772_161);
        assert_eq!(cidrs[0].bits(), 32);
    }

    proptest::proptest! {
        #[test]
        fn decomposition_covers_exact_range_with_bounded_block_count(
            lo in 0u32..=u32::MAX,
            len in 1u32..=1_000_000,
        ) {
            let hi = u64::from(lo).saturating_add(u64::from(len)).min(u64::from(u32::MAX));
            let lo = u64::from(lo);
            if lo > hi {
                return Ok(());
            }
            let cidrs = range_to_cidrs(lo, hi);
            // Concatenated ranges reconstruct [lo, hi] with no gaps or overlaps.
            let mut cursor = lo;
            for c in &cidrs {
                proptest::prop_assert_eq!(c.lo(), cursor);
                cursor = c.hi() + 1;
            }
            proptest::prop_assert_eq!(cursor, hi + 1);

            let span = hi - lo + 1;
            let bound = 2 * (63 - span.leading_zeros()) as usize;
            proptest::prop_assert!(cidrs.len() <= bound.max(1));
        }
    }
}
