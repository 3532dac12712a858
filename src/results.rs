// seedalign/src/results.rs
//
// All seed hits for one read, bucketed by orientation and seed offset.
// Buckets are ranked by ascending number of index elements so downstream
// extension can start from the most specific seeds.

use crate::cache::{AlignmentCache, QVal};
use crate::seed::InstantiatedSeed;

#[derive(Default)]
pub struct SeedResults {
    seq_fw: Vec<Vec<u8>>,
    seq_rc: Vec<Vec<u8>>,
    qual_fw: Vec<Vec<u8>>,
    qual_rc: Vec<Vec<u8>>,
    hits_fw: Vec<QVal>,
    hits_rc: Vec<QVal>,
    is_fw: Vec<Vec<InstantiatedSeed>>,
    is_rc: Vec<Vec<InstantiatedSeed>>,
    sorted_fw: Vec<bool>,
    sorted_rc: Vec<bool>,
    off_idx2off: Vec<u32>,
    rank_offs: Vec<u32>,
    rank_fws: Vec<bool>,
    sorted: bool,
    nonz_tot: usize,
    nonz_fw: usize,
    nonz_rc: usize,
    num_ranges: usize,
    num_elts: usize,
    num_ranges_fw: usize,
    num_elts_fw: usize,
    num_ranges_rc: usize,
    num_elts_rc: usize,
    num_offs: usize,
}

impl SeedResults {
    pub fn new() -> Self {
        SeedResults::default()
    }

    /// Drop all buffered state and size the buckets for a new read.
    pub fn reset(&mut self, off_idx2off: Vec<u32>) {
        let num_offs = off_idx2off.len();
        assert!(num_offs > 0);
        self.clear();
        self.num_offs = num_offs;
        self.off_idx2off = off_idx2off;
        self.seq_fw = vec![Vec::new(); num_offs];
        self.seq_rc = vec![Vec::new(); num_offs];
        self.qual_fw = vec![Vec::new(); num_offs];
        self.qual_rc = vec![Vec::new(); num_offs];
        self.hits_fw = vec![QVal::invalid(); num_offs];
        self.hits_rc = vec![QVal::invalid(); num_offs];
        self.is_fw = vec![Vec::new(); num_offs];
        self.is_rc = vec![Vec::new(); num_offs];
        self.sorted_fw = vec![false; num_offs];
        self.sorted_rc = vec![false; num_offs];
    }

    pub fn clear(&mut self) {
        self.seq_fw.clear();
        self.seq_rc.clear();
        self.qual_fw.clear();
        self.qual_rc.clear();
        self.hits_fw.clear();
        self.hits_rc.clear();
        self.is_fw.clear();
        self.is_rc.clear();
        self.sorted_fw.clear();
        self.sorted_rc.clear();
        self.off_idx2off.clear();
        self.rank_offs.clear();
        self.rank_fws.clear();
        self.sorted = false;
        self.nonz_tot = 0;
        self.nonz_fw = 0;
        self.nonz_rc = 0;
        self.num_ranges = 0;
        self.num_elts = 0;
        self.num_ranges_fw = 0;
        self.num_elts_fw = 0;
        self.num_ranges_rc = 0;
        self.num_elts_rc = 0;
        self.num_offs = 0;
    }

    /// Record a bucket's hits.  Each (orientation, offset) bucket is set
    /// at most once per read; empty results are dropped.
    pub fn add(&mut self, qv: QVal, cache: &AlignmentCache, seed_idx: usize, fw: bool) {
        debug_assert!(qv.rep_ok(cache));
        debug_assert!(self.rep_ok());
        assert!(seed_idx < self.num_offs, "bucket out of range");
        if qv.empty() {
            return;
        }
        let slot = if fw {
            &mut self.hits_fw[seed_idx]
        } else {
            &mut self.hits_rc[seed_idx]
        };
        assert!(!slot.valid(), "bucket already set");
        *slot = qv;
        if fw {
            self.num_elts_fw += qv.num_elts() as usize;
            self.num_ranges_fw += qv.num_ranges() as usize;
            if qv.num_ranges() > 0 {
                self.nonz_fw += 1;
            }
        } else {
            self.num_elts_rc += qv.num_elts() as usize;
            self.num_ranges_rc += qv.num_ranges() as usize;
            if qv.num_ranges() > 0 {
                self.nonz_rc += 1;
            }
        }
        self.num_elts += qv.num_elts() as usize;
        self.num_ranges += qv.num_ranges() as usize;
        if qv.num_ranges() > 0 {
            self.nonz_tot += 1;
        }
        debug_assert!(self.rep_ok());
    }

    pub fn set_seq(&mut self, fw: bool, i: usize, seq: Vec<u8>, qual: Vec<u8>) {
        if fw {
            self.seq_fw[i] = seq;
            self.qual_fw[i] = qual;
        } else {
            self.seq_rc[i] = seq;
            self.qual_rc[i] = qual;
        }
    }

    pub fn seq(&self, fw: bool, i: usize) -> &[u8] {
        if fw { &self.seq_fw[i] } else { &self.seq_rc[i] }
    }

    pub fn qual(&self, fw: bool, i: usize) -> &[u8] {
        if fw { &self.qual_fw[i] } else { &self.qual_rc[i] }
    }

    pub fn instantiated_seeds(&self, fw: bool, i: usize) -> &[InstantiatedSeed] {
        if fw { &self.is_fw[i] } else { &self.is_rc[i] }
    }

    pub fn instantiated_seeds_mut(&mut self, fw: bool, i: usize) -> &mut Vec<InstantiatedSeed> {
        if fw { &mut self.is_fw[i] } else { &mut self.is_rc[i] }
    }

    pub fn hits_at_off_idx(&self, fw: bool, i: usize) -> &QVal {
        if fw { &self.hits_fw[i] } else { &self.hits_rc[i] }
    }

    pub fn num_offs(&self) -> usize {
        self.num_offs
    }

    pub fn off_idx2off(&self) -> &[u32] {
        &self.off_idx2off
    }

    pub fn num_ranges(&self) -> usize {
        self.num_ranges
    }

    pub fn num_elts(&self) -> usize {
        self.num_elts
    }

    pub fn num_ranges_fw(&self) -> usize {
        self.num_ranges_fw
    }

    pub fn num_elts_fw(&self) -> usize {
        self.num_elts_fw
    }

    pub fn num_ranges_rc(&self) -> usize {
        self.num_ranges_rc
    }

    pub fn num_elts_rc(&self) -> usize {
        self.num_elts_rc
    }

    pub fn is_empty(&self) -> bool {
        self.num_ranges == 0
    }

    /// Number of (orientation, offset) buckets with at least one hit.
    pub fn nonzero_offsets(&self) -> usize {
        self.nonz_tot
    }

    pub fn nonzero_offsets_fw(&self) -> usize {
        self.nonz_fw
    }

    pub fn nonzero_offsets_rc(&self) -> usize {
        self.nonz_rc
    }

    /// Rank non-empty buckets by ascending element count.  Selection
    /// sort; ties keep forward before reverse-complement and lower
    /// offsets first.
    pub fn sort(&mut self) {
        while self.rank_offs.len() < self.nonz_tot {
            let mut minsz = u32::MAX;
            let mut minidx = 0usize;
            let mut minfw = true;
            for fw in [true, false] {
                let (rrs, sorted) = if fw {
                    (&self.hits_fw, &self.sorted_fw)
                } else {
                    (&self.hits_rc, &self.sorted_rc)
                };
                for i in 0..self.num_offs {
                    if rrs[i].valid() && rrs[i].num_elts() > 0 && !sorted[i] && rrs[i].num_elts() < minsz
                    {
                        minsz = rrs[i].num_elts();
                        minidx = i;
                        minfw = fw;
                    }
                }
            }
            assert_ne!(minsz, u32::MAX);
            if minfw {
                self.sorted_fw[minidx] = true;
            } else {
                self.sorted_rc[minidx] = true;
            }
            self.rank_offs.push(minidx as u32);
            self.rank_fws.push(minfw);
        }
        assert_eq!(self.rank_offs.len(), self.rank_fws.len());
        self.sorted = true;
    }

    /// The r-th ranked bucket: its hits plus (offidx, off, fw, seedlen).
    pub fn hits_by_rank(&self, r: usize) -> (&QVal, u32, u32, bool, u32) {
        assert!(self.sorted, "call sort() first");
        assert!(r < self.nonz_tot);
        let offidx = self.rank_offs[r];
        let fw = self.rank_fws[r];
        let off = self.off_idx2off[offidx as usize];
        let seqs = if fw { &self.seq_fw } else { &self.seq_rc };
        let hits = if fw { &self.hits_fw } else { &self.hits_rc };
        let seedlen = seqs[offidx as usize].len() as u32;
        (&hits[offidx as usize], offidx, off, fw, seedlen)
    }

    pub fn seq_by_rank(&self, r: usize) -> &[u8] {
        assert!(self.sorted);
        let offidx = self.rank_offs[r] as usize;
        if self.rank_fws[r] { &self.seq_fw[offidx] } else { &self.seq_rc[offidx] }
    }

    pub fn qual_by_rank(&self, r: usize) -> &[u8] {
        assert!(self.sorted);
        let offidx = self.rank_offs[r] as usize;
        if self.rank_fws[r] { &self.qual_fw[offidx] } else { &self.qual_rc[offidx] }
    }

    /// Aggregate counters agree with bucket contents.
    pub fn rep_ok(&self) -> bool {
        if self.num_offs == 0 {
            return self.num_ranges == 0;
        }
        if self.hits_fw.len() != self.num_offs || self.hits_rc.len() != self.num_offs {
            return false;
        }
        let mut nonzs = 0;
        let mut ranges = 0;
        let mut elts = 0;
        for hits in [&self.hits_fw, &self.hits_rc] {
            for qv in hits.iter() {
                if qv.valid() {
                    if qv.num_ranges() > 0 {
                        nonzs += 1;
                    }
                    ranges += qv.num_ranges() as usize;
                    elts += qv.num_elts() as usize;
                }
            }
        }
        nonzs == self.nonz_tot && ranges == self.num_ranges && elts == self.num_elts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheIface, SeedRange};

    fn stage(iface: &mut CacheIface, seq: &[u8], sizes: &[u32]) -> QVal {
        iface.begin_align(seq);
        let mut top = 10;
        for &s in sizes {
            iface.add(SeedRange {
                topf: top,
                botf: top + s,
                topb: top,
                botb: top + s,
                len: seq.len() as u32,
                edits: Vec::new(),
            });
            top += s + 1;
        }
        iface.finish_align()
    }

    #[test]
    fn test_add_and_aggregates() {
        let mut iface = CacheIface::new(64, None);
        let mut sr = SeedResults::new();
        sr.reset(vec![0, 5]);
        let qv = stage(&mut iface, b"AAAA", &[2, 3]);
        sr.add(qv, iface.local(), 0, true);
        assert_eq!(sr.num_ranges(), 2);
        assert_eq!(sr.num_elts(), 5);
        assert_eq!(sr.nonzero_offsets(), 1);
        assert_eq!(sr.nonzero_offsets_fw(), 1);
        assert_eq!(sr.nonzero_offsets_rc(), 0);
        assert!(sr.rep_ok());
    }

    #[test]
    fn test_empty_qval_dropped() {
        let mut iface = CacheIface::new(64, None);
        let mut sr = SeedResults::new();
        sr.reset(vec![0]);
        let qv = stage(&mut iface, b"AAAA", &[]);
        sr.add(qv, iface.local(), 0, true);
        assert_eq!(sr.nonzero_offsets(), 0);
        assert!(sr.is_empty());
    }

    #[test]
    fn test_sort_orders_by_elts_with_stable_ties() {
        let mut iface = CacheIface::new(64, None);
        let mut sr = SeedResults::new();
        sr.reset(vec![0, 5, 10]);
        sr.set_seq(true, 0, b"AAAA".to_vec(), vec![30; 4]);
        sr.set_seq(true, 1, b"CCCC".to_vec(), vec![30; 4]);
        sr.set_seq(false, 1, b"GGGG".to_vec(), vec![30; 4]);
        let big = stage(&mut iface, b"AAAA", &[4, 3]);
        let small = stage(&mut iface, b"CCCC", &[2]);
        let small_tie = stage(&mut iface, b"GGGG", &[2]);
        sr.add(big, iface.local(), 0, true);
        sr.add(small, iface.local(), 1, true);
        sr.add(small_tie, iface.local(), 1, false);
        sr.sort();
        // Two size-2 buckets first (fw before rc), then the size-7 one.
        let (qv0, _, off0, fw0, _) = sr.hits_by_rank(0);
        let (qv1, _, _, fw1, _) = sr.hits_by_rank(1);
        let (qv2, _, _, _, _) = sr.hits_by_rank(2);
        assert_eq!(qv0.num_elts(), 2);
        assert!(fw0);
        assert_eq!(off0, 5);
        assert_eq!(qv1.num_elts(), 2);
        assert!(!fw1);
        assert_eq!(qv2.num_elts(), 7);
        assert!(qv0.num_elts() <= qv1.num_elts() && qv1.num_elts() <= qv2.num_elts());
    }

    #[test]
    #[should_panic]
    fn test_double_add_panics() {
        let mut iface = CacheIface::new(64, None);
        let mut sr = SeedResults::new();
        sr.reset(vec![0]);
        let a = stage(&mut iface, b"AAAA", &[2]);
        let b = stage(&mut iface, b"CCCC", &[2]);
        sr.add(a, iface.local(), 0, true);
        sr.add(b, iface.local(), 0, true);
    }
}
