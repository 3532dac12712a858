// seedalign/src/seed.rs
//
// Seed policies and their instantiation against a concrete read offset.
// A Seed describes how one search root covers a seed: which positions are
// visited in what order (the step schedule), which budget zone each
// position charges, and where zones close.

use crate::constraint::Constraint;
use crate::penalty::Penalties;

/// Search strategy of a seed.
///
/// Halved seeds pin one half to exact matching (the near zone, searched
/// first) and allow edits in the other (the far zone).  Inside-out seeds
/// pin the center half and allow edits in the outer quarters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedType {
    Exact,
    LeftToRight,
    RightToLeft,
    InsideOut,
}

/// Zone bookkeeping for one step of the schedule.
#[derive(Debug, Clone, Copy)]
pub struct ZoneStep {
    /// Zone charged for mismatches and deletions at this step.
    pub non_ins: u8,
    /// Zone charged for insertions at this step.
    pub ins: u8,
    /// True iff this is the last step of its zone; the zone's ceilings
    /// are checked when the step completes.
    pub closes: bool,
}

/// A seed search policy: length, strategy, and the budgets of its zones.
#[derive(Debug, Clone)]
pub struct Seed {
    pub len: usize,
    pub seed_type: SeedType,
    pub overall: Constraint,
    /// Halved seeds use zones[0] (near) and zones[1] (far); inside-out
    /// seeds use zones[0] (center), zones[1] (left quarter) and zones[2]
    /// (right quarter).
    pub zones: [Constraint; 3],
}

/// A Seed bound to a read offset and orientation, ready to search.
#[derive(Debug, Clone)]
pub struct InstantiatedSeed {
    /// Visit order over seed positions, as signed offsets from the pivot:
    /// step `v > 0` visits `pivot + v - 1` extending rightward, `v < 0`
    /// visits `pivot + v + 1` extending leftward.
    pub steps: Vec<i32>,
    pub zones: Vec<ZoneStep>,
    /// Zone budgets with the cost of any Ns already charged.
    pub cons: [Constraint; 3],
    /// Whole-seed budget, resolved against the read length.
    pub overall: Constraint,
    /// Number of leading steps that are forced matches in one direction;
    /// the index jump tables may cover this many steps at once.
    pub maxjump: usize,
    /// Seed position visited by the first step.
    pub pivot: usize,
    /// Offset of the seed from the 5' end of the read.
    pub seedoff: usize,
    pub seedoffidx: usize,
    pub seedtypeidx: usize,
    /// Extracted from the forward read orientation?
    pub fw: bool,
    /// Filtered at instantiation (too many Ns); skipped by the search.
    pub nfiltered: bool,
}

impl InstantiatedSeed {
    /// Placeholder for a seed rejected before its schedule was built.
    pub fn filtered(seedoff: usize, seedoffidx: usize, seedtypeidx: usize, fw: bool) -> Self {
        InstantiatedSeed {
            steps: Vec::new(),
            zones: Vec::new(),
            cons: [Constraint::default(); 3],
            overall: Constraint::default(),
            maxjump: 0,
            pivot: 0,
            seedoff,
            seedoffidx,
            seedtypeidx,
            fw,
            nfiltered: true,
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Seed position visited by step `k`.
    #[inline]
    pub fn pos_of_step(&self, k: usize) -> usize {
        let v = self.steps[k];
        if v > 0 {
            self.pivot + v as usize - 1
        } else {
            self.pivot - ((-v) as usize - 1)
        }
    }

    /// Internal consistency: every position visited exactly once, zone
    /// indices in range, each populated zone closed exactly once at its
    /// final step.
    pub fn rep_ok(&self) -> bool {
        if self.nfiltered {
            return self.steps.is_empty();
        }
        let len = self.steps.len();
        if self.zones.len() != len {
            return false;
        }
        let mut seen = vec![false; len];
        for k in 0..len {
            let p = self.pos_of_step(k);
            if p >= len || seen[p] {
                return false;
            }
            seen[p] = true;
            if self.zones[k].non_ins > 2 || self.zones[k].ins > 2 {
                return false;
            }
        }
        for z in 0..3u8 {
            let last = (0..len).rev().find(|&k| self.zones[k].non_ins == z);
            for k in 0..len {
                let expect = Some(k) == last;
                if self.zones[k].non_ins == z && self.zones[k].closes != expect {
                    return false;
                }
            }
        }
        true
    }
}

/// Budget zone of a seed position, given the seed strategy and length.
fn zone_of(ty: SeedType, len: usize, pos: usize) -> usize {
    match ty {
        SeedType::Exact => 0,
        SeedType::LeftToRight => {
            if pos < len / 2 { 0 } else { 1 }
        }
        SeedType::RightToLeft => {
            if pos >= len / 2 { 0 } else { 1 }
        }
        SeedType::InsideOut => {
            let q = len / 4;
            if pos < q {
                1
            } else if pos >= len - q {
                2
            } else {
                0
            }
        }
    }
}

/// Build the visit order and signed step values for a strategy.
fn schedule(ty: SeedType, len: usize) -> (Vec<i32>, Vec<usize>, usize) {
    assert!(len > 0);
    match ty {
        SeedType::Exact | SeedType::LeftToRight => {
            let steps = (1..=len as i32).collect();
            let order = (0..len).collect();
            (steps, order, 0)
        }
        SeedType::RightToLeft => {
            let steps = (1..=len as i32).map(|v| -v).collect();
            let order = (0..len).rev().collect();
            (steps, order, len - 1)
        }
        SeedType::InsideOut => {
            let quarter = len / 4;
            let (cl, cr) = (quarter, len - quarter);
            let clen = cr - cl;
            let pivot = cl + (clen + 1) / 2 - 1;
            let mut order = Vec::with_capacity(len);
            let mut steps = Vec::with_capacity(len);
            order.push(pivot);
            steps.push(1);
            let (mut l, mut r) = (pivot, pivot);
            let mut prefer_right = true;
            // Span the center block first, then continue outward.
            for bound in [(cl, cr), (0, len)] {
                let (lo, hi) = bound;
                let goal = hi - lo;
                while order.len() < goal.min(len) && (l > lo || r + 1 < hi) {
                    let can_r = r + 1 < hi;
                    let can_l = l > lo;
                    if (prefer_right && can_r) || !can_l {
                        r += 1;
                        order.push(r);
                        steps.push((r - pivot + 1) as i32);
                    } else {
                        l -= 1;
                        order.push(l);
                        steps.push(-((pivot - l + 1) as i32));
                    }
                    prefer_right = !prefer_right;
                }
            }
            debug_assert_eq!(order.len(), len);
            (steps, order, pivot)
        }
    }
}

impl Seed {
    pub fn new(len: usize, seed_type: SeedType, overall: Constraint) -> Self {
        Seed {
            len,
            seed_type,
            overall,
            zones: [Constraint::exact(); 3],
        }
    }

    /// Bind this policy to a seed extracted from a read.
    ///
    /// `seq`/`qual` are the already-extracted seed sequence and qualities
    /// (possibly shorter than `self.len` for a short read); `read_len` is
    /// the whole read's length, which penalty functions resolve against.
    /// Returns `None` when the seed's Ns cannot be absorbed by the zone
    /// and overall budgets.
    #[allow(clippy::too_many_arguments)]
    pub fn instantiate(
        &self,
        read_len: usize,
        seq: &[u8],
        qual: &[u8],
        pens: &Penalties,
        seedoff: usize,
        seedoffidx: usize,
        seedtypeidx: usize,
        fw: bool,
    ) -> Option<InstantiatedSeed> {
        let len = seq.len();
        debug_assert!(len > 0 && len <= self.len && qual.len() == len);
        let (steps, order, pivot) = schedule(self.seed_type, len);

        // Zone per step, with close flags at each zone's last step.
        let mut last_of_zone = [None; 3];
        for (k, &p) in order.iter().enumerate() {
            last_of_zone[zone_of(self.seed_type, len, p)] = Some(k);
        }
        let zones: Vec<ZoneStep> = order
            .iter()
            .enumerate()
            .map(|(k, &p)| {
                let z = zone_of(self.seed_type, len, p) as u8;
                ZoneStep {
                    non_ins: z,
                    ins: z,
                    closes: last_of_zone[z as usize] == Some(k),
                }
            })
            .collect();

        let mut cons = self.zones;
        for c in cons.iter_mut() {
            c.instantiate(read_len);
        }
        let mut overall = self.overall;
        overall.instantiate(read_len);

        // Pre-charge Ns into their zones and compute how far the index
        // jump tables may carry the search: the leading run of forced,
        // same-direction, N-free steps.
        let dir0 = steps[0] > 0;
        let mut maxjump = 0;
        let mut streak = true;
        for (k, &p) in order.iter().enumerate() {
            let z = zones[k].non_ins as usize;
            if (steps[k] > 0) != dir0 {
                streak = false;
            }
            if seq[p] > 3 {
                if cons[z].can_n(qual[p], pens) && overall.can_n(qual[p], pens) {
                    cons[z].charge_n(qual[p], pens);
                    overall.charge_n(qual[p], pens);
                } else {
                    log::trace!(
                        "seed at off {} ({}) filtered: N at {} exceeds zone {} budget",
                        seedoff,
                        if fw { "fw" } else { "rc" },
                        p,
                        z
                    );
                    return None;
                }
                streak = false;
            } else if streak && cons[z].must_match() {
                maxjump += 1;
            } else {
                streak = false;
            }
        }

        Some(InstantiatedSeed {
            steps,
            zones,
            cons,
            overall,
            maxjump,
            pivot,
            seedoff,
            seedoffidx,
            seedtypeidx,
            fw,
            nfiltered: false,
        })
    }

    /// Canned policy sets allowing up to `mms` mismatches per seed.
    ///
    /// Panics for `mms >= 3`; no such canned set exists.
    pub fn mm_seeds(mms: u32, len: usize, pols: &mut Vec<Seed>, overall: Constraint) {
        match mms {
            0 => Seed::zero_mm_seeds(len, pols, overall),
            1 => Seed::one_mm_seeds(len, pols, overall),
            2 => Seed::two_mm_seeds(len, pols, overall),
            _ => panic!("no canned seed policy for {} mismatches", mms),
        }
    }

    pub fn zero_mm_seeds(len: usize, pols: &mut Vec<Seed>, overall: Constraint) {
        pols.push(Seed::new(len, SeedType::Exact, overall));
    }

    /// Two roots covering all placements of a single mismatch.  The
    /// right-to-left root must consume its mismatch in the far zone, so an
    /// exact alignment is only ever found by the left-to-right root.
    pub fn one_mm_seeds(len: usize, pols: &mut Vec<Seed>, overall: Constraint) {
        let mut ltr = Seed::new(len, SeedType::LeftToRight, overall);
        ltr.zones[1] = Constraint::mm_based(1);
        pols.push(ltr);

        let mut rtl = Seed::new(len, SeedType::RightToLeft, overall);
        rtl.zones[1] = Constraint::mm_based(1);
        rtl.zones[1].mms_ceil = 0;
        pols.push(rtl);
    }

    /// Three roots covering the placements of up to two mismatches.
    pub fn two_mm_seeds(len: usize, pols: &mut Vec<Seed>, overall: Constraint) {
        let mut ltr = Seed::new(len, SeedType::LeftToRight, overall);
        ltr.zones[1] = Constraint::mm_based(2);
        pols.push(ltr);

        let mut rtl = Seed::new(len, SeedType::RightToLeft, overall);
        rtl.zones[1] = Constraint::mm_based(2);
        rtl.zones[1].mms_ceil = 1;
        pols.push(rtl);

        let mut io = Seed::new(len, SeedType::InsideOut, overall);
        io.zones[1] = Constraint::mm_based(1);
        io.zones[1].mms_ceil = 0;
        io.zones[2] = Constraint::mm_based(1);
        io.zones[2].mms_ceil = 0;
        pols.push(io);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dna::encode_seq;

    fn inst(seed: &Seed, seq: &[u8]) -> InstantiatedSeed {
        let codes = encode_seq(seq);
        let quals = vec![30u8; codes.len()];
        seed.instantiate(codes.len(), &codes, &quals, &Penalties::default(), 0, 0, 0, true)
            .expect("instantiable")
    }

    #[test]
    fn test_ltr_schedule() {
        let s = Seed::new(6, SeedType::LeftToRight, Constraint::default());
        let is = inst(&s, b"ACGTAC");
        assert_eq!(is.steps, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!((0..6).map(|k| is.pos_of_step(k)).collect::<Vec<_>>(), vec![0, 1, 2, 3, 4, 5]);
        // Near zone [0,3) closes at step 2, far zone at the last step.
        assert_eq!(is.zones[2].non_ins, 0);
        assert!(is.zones[2].closes);
        assert_eq!(is.zones[3].non_ins, 1);
        assert!(is.zones[5].closes);
        assert!(is.rep_ok());
    }

    #[test]
    fn test_rtl_schedule() {
        let s = Seed::new(5, SeedType::RightToLeft, Constraint::default());
        let is = inst(&s, b"ACGTA");
        assert_eq!(is.steps, vec![-1, -2, -3, -4, -5]);
        assert_eq!((0..5).map(|k| is.pos_of_step(k)).collect::<Vec<_>>(), vec![4, 3, 2, 1, 0]);
        // Near zone is [2,5); it closes once position 2 is visited.
        assert_eq!(is.zones[2].non_ins, 0);
        assert!(is.zones[2].closes);
        assert_eq!(is.zones[3].non_ins, 1);
        assert!(is.rep_ok());
    }

    #[test]
    fn test_inside_out_covers_center_first() {
        let s = Seed::new(8, SeedType::InsideOut, Constraint::default());
        let is = inst(&s, b"ACGTACGT");
        let order: Vec<usize> = (0..8).map(|k| is.pos_of_step(k)).collect();
        assert_eq!(order, vec![3, 4, 2, 5, 1, 6, 0, 7]);
        // Center [2,6) visited before either quarter.
        assert!(order[..4].iter().all(|&p| (2..6).contains(&p)));
        assert!(is.rep_ok());
        // Zig-zag breaks the jump streak after the first two steps.
        assert_eq!(is.maxjump, 2);
    }

    #[test]
    fn test_exact_maxjump_spans_seed() {
        let s = Seed::new(4, SeedType::Exact, Constraint::default());
        let is = inst(&s, b"ACGT");
        assert_eq!(is.maxjump, 4);
    }

    #[test]
    fn test_ltr_maxjump_is_near_zone() {
        let mut s = Seed::new(6, SeedType::LeftToRight, Constraint::default());
        s.zones[1] = Constraint::mm_based(1);
        let is = inst(&s, b"ACGTAC");
        assert_eq!(is.maxjump, 3);
    }

    #[test]
    fn test_n_filtering_in_exact_zone() {
        let mut s = Seed::new(6, SeedType::LeftToRight, Constraint::default());
        s.zones[1] = Constraint::mm_based(1);
        let codes = encode_seq(b"ANGTAC"); // N in the exact near zone
        let quals = vec![30u8; 6];
        assert!(s
            .instantiate(6, &codes, &quals, &Penalties::default(), 0, 0, 0, true)
            .is_none());
    }

    #[test]
    fn test_n_precharged_in_far_zone() {
        let mut s = Seed::new(6, SeedType::LeftToRight, Constraint::default());
        s.zones[1] = Constraint::mm_based(1);
        let codes = encode_seq(b"ACGTNC"); // N in the far zone
        let quals = vec![30u8; 6];
        let is = s
            .instantiate(6, &codes, &quals, &Penalties::default(), 0, 0, 0, true)
            .expect("absorbable");
        // The far zone's single mismatch is spent on the N up front.
        assert_eq!(is.cons[1].mms, 0);
    }

    #[test]
    #[should_panic]
    fn test_mm_seeds_rejects_three() {
        let mut pols = Vec::new();
        Seed::mm_seeds(3, 20, &mut pols, Constraint::default());
    }

    #[test]
    fn test_canned_policy_counts() {
        for (mms, n) in [(0u32, 1usize), (1, 2), (2, 3)] {
            let mut pols = Vec::new();
            Seed::mm_seeds(mms, 20, &mut pols, Constraint::default());
            assert_eq!(pols.len(), n);
        }
    }
}
