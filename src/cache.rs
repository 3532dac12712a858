// seedalign/src/cache.rs
//
// Two-tier cache of seed-alignment results, keyed by seed sequence.  The
// local tier belongs to one worker and is cleared per read; the global
// tier is shared across workers behind a mutex.  Both tiers are bounded;
// a full local tier surfaces as an out-of-memory condition that aborts
// the current seed's search.

use std::sync::{Arc, Mutex};

use rustc_hash::FxHashMap;

use crate::edit::Edit;

/// One hit interval of a seed search, with the edits that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct SeedRange {
    pub topf: u32,
    pub botf: u32,
    pub topb: u32,
    pub botb: u32,
    /// Seed length the range was found at.
    pub len: u32,
    pub edits: Vec<Edit>,
}

impl SeedRange {
    #[inline]
    pub fn num_elts(&self) -> u32 {
        self.botf - self.topf
    }
}

/// Descriptor of a run of `SeedRange`s inside a cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QVal {
    i: u32,
    rangen: u32,
    eltn: u32,
}

impl QVal {
    pub fn invalid() -> Self {
        QVal { i: u32::MAX, rangen: 0, eltn: 0 }
    }

    #[inline]
    pub fn valid(&self) -> bool {
        self.i != u32::MAX
    }

    #[inline]
    pub fn empty(&self) -> bool {
        self.rangen == 0
    }

    #[inline]
    pub fn num_ranges(&self) -> u32 {
        self.rangen
    }

    #[inline]
    pub fn num_elts(&self) -> u32 {
        self.eltn
    }

    /// The descriptor points at real ranges and its element count agrees
    /// with them.
    pub fn rep_ok(&self, cache: &AlignmentCache) -> bool {
        if !self.valid() {
            return false;
        }
        let end = self.i as usize + self.rangen as usize;
        if end > cache.ranges.len() {
            return false;
        }
        let elts: u32 = cache.ranges[self.i as usize..end]
            .iter()
            .map(|r| r.num_elts())
            .sum();
        elts == self.eltn
    }
}

impl Default for QVal {
    fn default() -> Self {
        QVal::invalid()
    }
}

/// One cache tier: seed sequence -> descriptor into a flat range list.
pub struct AlignmentCache {
    map: FxHashMap<Vec<u8>, QVal>,
    ranges: Vec<SeedRange>,
    cap_ranges: usize,
}

impl AlignmentCache {
    pub fn new(cap_ranges: usize) -> Self {
        AlignmentCache {
            map: FxHashMap::default(),
            ranges: Vec::new(),
            cap_ranges,
        }
    }

    pub fn lookup(&self, seq: &[u8]) -> Option<QVal> {
        self.map.get(seq).copied()
    }

    pub fn ranges(&self, qv: &QVal) -> &[SeedRange] {
        debug_assert!(qv.rep_ok(self));
        &self.ranges[qv.i as usize..qv.i as usize + qv.rangen as usize]
    }

    pub fn clear(&mut self) {
        self.map.clear();
        self.ranges.clear();
    }

    /// Copy a finished entry in; `None` when it does not fit.
    fn add_entry(&mut self, seq: &[u8], ranges: &[SeedRange]) -> Option<QVal> {
        if self.ranges.len() + ranges.len() > self.cap_ranges {
            return None;
        }
        let i = self.ranges.len() as u32;
        self.ranges.extend_from_slice(ranges);
        let qv = QVal {
            i,
            rangen: ranges.len() as u32,
            eltn: ranges.iter().map(|r| r.num_elts()).sum(),
        };
        self.map.insert(seq.to_vec(), qv);
        Some(qv)
    }
}

/// Which tier answered a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheHit {
    Local,
    Global,
}

/// Worker-facing cache handle: local tier plus optional shared tier.
///
/// Search results for one seed sequence are staged with `begin_align` /
/// `add` / `finish_align`; a finished entry is also offered to the global
/// tier so other readers can reuse it.
pub struct CacheIface {
    local: AlignmentCache,
    global: Option<Arc<Mutex<AlignmentCache>>>,
    cur_seq: Option<Vec<u8>>,
    cur_start: usize,
}

impl CacheIface {
    pub fn new(local_cap: usize, global: Option<Arc<Mutex<AlignmentCache>>>) -> Self {
        CacheIface {
            local: AlignmentCache::new(local_cap),
            global,
            cur_seq: None,
            cur_start: 0,
        }
    }

    /// Forget the per-read tier.
    pub fn next_read(&mut self) {
        debug_assert!(self.cur_seq.is_none());
        self.local.clear();
    }

    /// Local tier first, then the shared tier; a shared answer is copied
    /// into the local tier so repeated offsets of this read stay cheap.
    pub fn query(&mut self, seq: &[u8]) -> Option<(QVal, CacheHit)> {
        if let Some(qv) = self.local.lookup(seq) {
            return Some((qv, CacheHit::Local));
        }
        let global = self.global.as_ref()?;
        let copied: Option<Vec<SeedRange>> = {
            let g = global.lock().unwrap();
            g.lookup(seq).map(|qv| g.ranges(&qv).to_vec())
        };
        let ranges = copied?;
        let qv = self.local.add_entry(seq, &ranges)?;
        Some((qv, CacheHit::Global))
    }

    /// Start staging results for one seed sequence.
    pub fn begin_align(&mut self, seq: &[u8]) {
        debug_assert!(self.cur_seq.is_none());
        self.cur_seq = Some(seq.to_vec());
        self.cur_start = self.local.ranges.len();
    }

    /// Stage one hit range; `false` means the local tier is full and the
    /// caller should abort the current seed's search.
    pub fn add(&mut self, r: SeedRange) -> bool {
        debug_assert!(self.cur_seq.is_some());
        if self.local.ranges.len() >= self.local.cap_ranges {
            return false;
        }
        self.local.ranges.push(r);
        true
    }

    /// Commit the staged entry locally and offer it to the shared tier.
    pub fn finish_align(&mut self) -> QVal {
        let seq = self.cur_seq.take().expect("finish_align without begin_align");
        let qv = QVal {
            i: self.cur_start as u32,
            rangen: (self.local.ranges.len() - self.cur_start) as u32,
            eltn: self.local.ranges[self.cur_start..]
                .iter()
                .map(|r| r.num_elts())
                .sum(),
        };
        self.local.map.insert(seq.clone(), qv);
        if let Some(global) = &self.global {
            let ranges = &self.local.ranges[self.cur_start..];
            let mut g = global.lock().unwrap();
            if g.lookup(&seq).is_none() {
                // A full shared tier just stops absorbing new entries.
                let _ = g.add_entry(&seq, ranges);
            }
        }
        qv
    }

    pub fn local(&self) -> &AlignmentCache {
        &self.local
    }

    pub fn ranges(&self, qv: &QVal) -> &[SeedRange] {
        self.local.ranges(qv)
    }
}
