use std::sync::LazyLock;

use crate::prefix::{prefix_contains, Ipv4Prefix};

#[allow(clippy::expect_used)]
static RFC1918_BLOCKS: LazyLock<[Ipv4Prefix; 3]> = LazyLock::new(|| {
    [
        Ipv4Prefix::parse("10.0.0.0/8").expect("literal RFC1918 block"),
        Ipv4Prefix::parse("172.16.0.0/12").expect("literal RFC1918 block"),
        Ipv4Prefix::parse("192.168.0.0/16").expect("literal RFC1918 block"),
    ]
});

/// True iff `prefix` lies entirely inside `10.0.0.0/8`, `172.16.0.0/12`, or `192.168.0.0/16`
/// (`spec.md` §4.1: `is_rfc1918`).
#[must_use]
pub fn is_rfc1918(prefix: Ipv4Prefix) -> bool {
    RFC1918_BLOCKS.iter().any(|block| prefix_contains(*block, prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn private_blocks_are_rfc1918() {
        for s in ["10.1.2.0/24", "172.16.0.0/16", "192.168.1.0/24"] {
            assert!(is_rfc1918(Ipv4Prefix::parse(s).unwrap()), "{s}");
        }
    }

    #[test]
    fn public_block_is_not_rfc1918() {
        assert!(!is_rfc1918(Ipv4Prefix::parse("8.8.8.0/24").unwrap()));
    }

    #[test]
    fn block_straddling_boundary_is_not_fully_rfc1918() {
        // 172.0.0.0/8 spans well outside 172.16.0.0/12.
        assert!(!is_rfc1918(Ipv4Prefix::parse("172.0.0.0/8").unwrap()));
    }
}
