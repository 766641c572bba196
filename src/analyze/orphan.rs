//! Adoption of unassigned atoms into surrounding grains.
//!
//! After region growing, atoms near grain boundaries and atoms whose
//! orientation could not be solved remain unassigned. Each adoption pass
//! lets such an atom join the grain that holds a clear majority among its
//! nearest neighbors. Adopted atoms are counted as orphan members of the
//! grain and do not contribute to its mean orientation.

use crate::model::atom::{AtomHandle, GrainId};
use crate::model::grain::Grain;

use super::index::SpatialIndex;

/// Minimum number of same-grain neighbors required for adoption.
const MIN_MAJORITY: usize = 4;

/// The pending list is rebuilt once it holds mostly adopted entries; small
/// lists are never worth the pass.
const COMPACTION_MIN_LEN: usize = 500;

/// Runs orphan-adoption passes over all unassigned atoms.
///
/// `grains` must already carry their final ids, with `grains[id]`
/// addressed by the ids stored in the atoms. With `depth == 0` passes
/// repeat until a pass adopts nothing; otherwise exactly `depth` passes
/// run. Returns the total number of adopted atoms.
pub fn adopt_orphans(
    index: &mut SpatialIndex,
    grains: &mut [Grain],
    depth: u32,
    max_neighbors: usize,
) -> usize {
    let mut pending: Vec<AtomHandle> = index
        .handles()
        .filter(|&h| index.atom(h).grain().is_none())
        .collect();
    let mut total = 0;
    let mut passes = 0;
    loop {
        let adopted = adoption_pass(index, grains, &mut pending, max_neighbors);
        total += adopted;
        passes += 1;
        let done = if depth == 0 {
            adopted == 0
        } else {
            passes >= depth
        };
        if done || pending.is_empty() {
            break;
        }
    }
    total
}

/// One pass over the pending list. Adoptions take effect immediately, so
/// atoms later in the list already see their adopted predecessors.
fn adoption_pass(
    index: &mut SpatialIndex,
    grains: &mut [Grain],
    pending: &mut Vec<AtomHandle>,
    max_neighbors: usize,
) -> usize {
    let mut adopted = 0;
    let mut remaining = 0;
    for i in 0..pending.len() {
        let handle = pending[i];
        if index.atom(handle).grain().is_some() {
            continue;
        }
        match majority_grain(index, handle, max_neighbors) {
            Some(id) => {
                index.atom_mut(handle).set_grain(Some(id));
                grains[id as usize].add_orphan(handle);
                adopted += 1;
            }
            None => remaining += 1,
        }
    }
    if pending.len() > 2 * remaining && pending.len() > COMPACTION_MIN_LEN {
        pending.retain(|&h| index.atom(h).grain().is_none());
    }
    adopted
}

/// Looks for a grain that holds at least [`MIN_MAJORITY`] of the atom's
/// nearest neighbors. Neighbors without a grain do not vote; on a tie the
/// smallest grain id wins.
fn majority_grain(index: &SpatialIndex, handle: AtomHandle, max_neighbors: usize) -> Option<GrainId> {
    let mut ids: Vec<GrainId> = index
        .nearest_neighbors(handle, max_neighbors)
        .iter()
        .filter_map(|n| index.atom(n.handle).grain())
        .collect();
    if ids.len() < MIN_MAJORITY {
        return None;
    }
    ids.sort_unstable();

    let mut best_id = ids[0];
    let mut best_run = 0;
    let mut run_start = 0;
    for i in 0..=ids.len() {
        if i == ids.len() || ids[i] != ids[run_start] {
            if i - run_start > best_run {
                best_run = i - run_start;
                best_id = ids[run_start];
            }
            run_start = i;
        }
    }
    (best_run >= MIN_MAJORITY).then_some(best_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_index() -> SpatialIndex {
        SpatialIndex::new(&[10.0, 10.0, 10.0], &[20.0, 20.0, 20.0], 10.0, false).unwrap()
    }

    /// Adds an atom at `pos` (box-relative to a 20 Å cube centered at 10)
    /// and assigns it to `grain`.
    fn add_grain_atom(index: &mut SpatialIndex, pos: [f64; 3], grain: GrainId) -> AtomHandle {
        let h = index.add_atom(&pos).unwrap();
        index.atom_mut(h).set_grain(Some(grain));
        h
    }

    #[test]
    fn surrounded_atom_is_adopted() {
        let mut index = open_index();
        for p in [
            [4.0, 4.0, 4.0],
            [5.0, 4.0, 4.0],
            [4.0, 5.0, 4.0],
            [5.0, 5.0, 4.0],
            [4.5, 4.5, 5.0],
        ] {
            add_grain_atom(&mut index, p, 0);
        }
        let orphan = index.add_atom(&[4.5, 4.5, 3.2]).unwrap();

        let mut grains = vec![Grain::new()];
        let adopted = adopt_orphans(&mut index, &mut grains, 0, 12);
        assert_eq!(adopted, 1);
        assert_eq!(index.atom(orphan).grain(), Some(0));
        assert_eq!(grains[0].num_orphan_atoms(), 1);
        assert_eq!(grains[0].num_regular_atoms(), 0);
    }

    #[test]
    fn weak_majority_is_rejected() {
        let mut index = open_index();
        for p in [[4.0, 4.0, 4.0], [5.0, 4.0, 4.0], [4.0, 5.0, 4.0]] {
            add_grain_atom(&mut index, p, 0);
        }
        let orphan = index.add_atom(&[4.5, 4.5, 5.0]).unwrap();

        let mut grains = vec![Grain::new()];
        assert_eq!(adopt_orphans(&mut index, &mut grains, 0, 12), 0);
        assert_eq!(index.atom(orphan).grain(), None);
    }

    #[test]
    fn split_vote_needs_a_full_run() {
        let mut index = open_index();
        for p in [[4.0, 4.0, 4.0], [5.0, 4.0, 4.0], [4.0, 5.0, 4.0]] {
            add_grain_atom(&mut index, p, 0);
        }
        for p in [[4.0, 4.0, 6.0], [5.0, 4.0, 6.0], [4.0, 5.0, 6.0]] {
            add_grain_atom(&mut index, p, 1);
        }
        let orphan = index.add_atom(&[4.5, 4.5, 5.0]).unwrap();

        let mut grains = vec![Grain::new(), Grain::new()];
        assert_eq!(adopt_orphans(&mut index, &mut grains, 0, 12), 0);
        assert_eq!(index.atom(orphan).grain(), None);
    }

    /// Chain adoption: `late` only reaches a majority once `early` has
    /// been adopted. Adoptions take effect within a pass, so `late` is
    /// inserted first; the pending list visits it before `early` and the
    /// chain takes a second pass.
    fn chain_setup() -> (SpatialIndex, AtomHandle, AtomHandle) {
        let mut index = open_index();
        for p in [
            [3.0, 3.0, 3.0],
            [4.0, 3.0, 3.0],
            [3.0, 4.0, 3.0],
            [4.0, 4.0, 3.0],
            [5.0, 4.0, 3.0],
            [5.0, 2.0, 3.0],
        ] {
            add_grain_atom(&mut index, p, 0);
        }
        let late = index.add_atom(&[6.5, 3.0, 3.0]).unwrap();
        let early = index.add_atom(&[5.0, 3.0, 3.0]).unwrap();
        (index, early, late)
    }

    #[test]
    fn adoption_cascades_until_fixed_point() {
        let (mut index, early, late) = chain_setup();
        let mut grains = vec![Grain::new()];
        let adopted = adopt_orphans(&mut index, &mut grains, 0, 4);
        assert_eq!(adopted, 2);
        assert_eq!(index.atom(early).grain(), Some(0));
        assert_eq!(index.atom(late).grain(), Some(0));
    }

    #[test]
    fn fixed_depth_limits_the_cascade() {
        let (mut index, early, late) = chain_setup();
        let mut grains = vec![Grain::new()];
        let adopted = adopt_orphans(&mut index, &mut grains, 1, 4);
        assert_eq!(adopted, 1);
        assert_eq!(index.atom(early).grain(), Some(0));
        assert_eq!(index.atom(late).grain(), None);
    }
}
