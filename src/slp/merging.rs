//! Pack merging: chains of packs become longer runs.
//!
//! Whenever one pack's last lane is another pack's first lane, the two
//! concatenate with the shared lane appearing once at the boundary.
//! Greedy fixed point; the result is maximal under this merge rule, not
//! necessarily the globally longest chaining.

use crate::core::InstId;

use super::pack::Pack;
use super::pack_set::PackSet;

/// Merge packs until no pair chains anymore.
pub fn merge_packs<I: InstId>(mut packs: PackSet<I>) -> PackSet<I> {
    let mut dirty = true;

    while dirty {
        dirty = false;

        let snapshot: Vec<Pack<I>> = packs.iter().cloned().collect();
        'scan: for p1 in &snapshot {
            for p2 in &snapshot {
                if p1 == p2 {
                    continue;
                }
                if p1.last() != p2.first() {
                    continue;
                }

                // Concatenate, keeping the join lane once.
                let mut merged = p1.clone();
                for &lane in &p2.lanes()[1..] {
                    merged.append_lane(lane);
                }

                if p1.is_seed() {
                    // Seed packs only ever chain with other seeds.
                    assert!(p2.is_seed());
                    merged.set_seed(true);
                }

                packs.remove(p1);
                packs.remove(p2);
                packs.insert(merged);

                // The set changed; rescan from a fresh snapshot.
                dirty = true;
                break 'scan;
            }
        }
    }

    packs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disjoint_packs_do_not_merge() {
        let mut packs: PackSet<u32> = PackSet::new();
        packs.insert_pair(1, 2, false);
        packs.insert_pair(3, 4, false);

        let merged = merge_packs(packs.clone());
        assert_eq!(merged, packs);
    }

    #[test]
    fn chain_collapses_to_one_pack() {
        let mut packs: PackSet<u32> = PackSet::new();
        packs.insert_pair(1, 2, true);
        packs.insert_pair(2, 3, true);
        packs.insert_pair(3, 4, true);

        let merged = merge_packs(packs);
        assert_eq!(merged.len(), 1);
        let pack = merged.iter().next().unwrap();
        assert_eq!(pack.lanes(), &[1, 2, 3, 4]);
        assert!(pack.is_seed());
    }
}
