use cloudpam_cidr::{range_to_cidrs, Ipv4Prefix};
use cloudpam_domain::Pool;

/// Free address space inside `parent` not covered by `children`, as its minimal CIDR cover,
/// sorted ascending by address (`spec.md` §4.6.1).
///
/// `children` need not be pre-sorted. Overlapping ranges are forbidden by store invariants but
/// handled defensively here by merging them before the walk, so a caller that hands in a
/// corrupted snapshot still gets a sane (if conservative) answer instead of a panic.
#[must_use]
pub fn find_gaps(parent: Ipv4Prefix, children: &[Pool]) -> Vec<Ipv4Prefix> {
    let mut ranges: Vec<(u64, u64)> = children.iter().map(|c| (c.cidr.lo(), c.cidr.hi())).collect();
    ranges.sort_unstable_by_key(|r| r.0);

    let mut merged: Vec<(u64, u64)> = Vec::with_capacity(ranges.len());
    for (lo, hi) in ranges {
        match merged.last_mut() {
            Some(last) if lo <= last.1 + 1 => last.1 = last.1.max(hi),
            _ => merged.push((lo, hi)),
        }
    }

    let mut gaps = Vec::new();
    let mut cursor = parent.lo();
    for (lo, hi) in merged {
        if lo > cursor {
            gaps.extend(range_to_cidrs(cursor, lo - 1));
        }
        cursor = cursor.max(hi + 1);
    }
    if cursor <= parent.hi() {
        gaps.extend(range_to_cidrs(cursor, parent.hi()));
    }
    gaps
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudpam_domain::{PoolSource, PoolStatus, PoolType};
    use std::collections::BTreeMap;
    use chrono::Utc;

    fn child(cidr: &str) -> Pool {
        Pool {
            id: 0,
            name: cidr.to_owned(),
            cidr: Ipv4Prefix::parse(cidr).unwrap(),
            parent_id: Some(1),
            account_id: None,
            pool_type: PoolType::Subnet,
            status: PoolStatus::Active,
            source: PoolSource::Manual,
            description: String::new(),
            tags: BTreeMap::new(),
            ancestor_path: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        }
    }

    #[test]
    fn matches_spec_scenario_s2() {
        let parent = Ipv4Prefix::parse("10.0.0.0/16").unwrap();
        let children = vec![child("10.0.0.0/24"), child("10.0.1.0/24"), child("10.0.3.0/24")];
        let gaps = find_gaps(parent, &children);
        let rendered: Vec<String> = gaps.iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            vec![
                "10.0.2.0/24",
                "10.0.4.0/22",
                "10.0.8.0/21",
                "10.0.16.0/20",
                "10.0.32.0/19",
                "10.0.64.0/18",
                "10.0.128.0/17",
            ]
        );
    }

    #[test]
    fn no_children_yields_the_whole_parent() {
        let parent = Ipv4Prefix::parse("10.0.0.0/24").unwrap();
        let gaps = find_gaps(parent, &[]);
        assert_eq!(gaps, vec![parent]);
    }

    #[test]
    fn fully_covered_parent_has_no_gaps() {
        let parent = Ipv4Prefix::parse("10.0.0.0/24").unwrap();
        let children = vec![child("10.0.0.0/24")];
        assert!(find_gaps(parent, &children).is_empty());
    }

    #[test]
    fn overlapping_children_are_merged_defensively() {
        let parent = Ipv4Prefix::parse("10.0.0.0/24").unwrap();
        // 10.0.0.0/25 and 10.0.0.64/26 overlap; still only half the parent is free.
        let children = vec![child("10.0.0.0/25"), child("10.0.0.64/26")];
        let gaps = find_gaps(parent, &children);
        assert_eq!(gaps, vec![Ipv4Prefix::parse("10.0.0.128/25").unwrap()]);
    }

    #[test]
    fn unsorted_input_is_handled() {
        let parent = Ipv4Prefix::parse("10.0.0.0/16").unwrap();
        let children = vec![child("10.0.3.0/24"), child("10.0.0.0/24"), child("10.0.1.0/24")];
        let gaps = find_gaps(parent, &children);
        assert_eq!(gaps[0], Ipv4Prefix::parse("10.0.2.0/24").unwrap());
    }
}
