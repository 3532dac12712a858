// seedalign/src/metrics.rs
//
// Counters describing seed-search work.  SeedSearchMetrics accumulates
// across reads and is merged into a shared instance under the caller's
// lock; SACounters is reset per read and optionally shipped to counter
// sinks.

use crate::edit::Edit;

/// Process-level seed search summary.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeedSearchMetrics {
    pub seedsearch: u64,   // instantiated-seed searches executed
    pub possearch: u64,    // offsets where at least one search ran
    pub intrahit: u64,     // answered by the current read's cache
    pub interhit: u64,     // answered by the across-read cache
    pub filteredseed: u64, // seed instantiations skipped due to Ns
    pub ooms: u64,         // searches cut short by a full cache
    pub bwops: u64,        // Burrows-Wheeler interval updates
    pub bweds: u64,        // Burrows-Wheeler edit enumerations
}

impl SeedSearchMetrics {
    pub fn new() -> Self {
        SeedSearchMetrics::default()
    }

    pub fn reset(&mut self) {
        *self = SeedSearchMetrics::default();
    }

    /// Sum another metrics object into this one.  Callers sharing an
    /// instance across threads hold its lock around this call.
    pub fn merge(&mut self, m: &SeedSearchMetrics) {
        self.seedsearch += m.seedsearch;
        self.possearch += m.possearch;
        self.intrahit += m.intrahit;
        self.interhit += m.interhit;
        self.filteredseed += m.filteredseed;
        self.ooms += m.ooms;
        self.bwops += m.bwops;
        self.bweds += m.bweds;
    }
}

/// Per-read work profile, stratified by recursion depth (0, 1, 2, >=3).
#[derive(Debug, Clone, Copy, Default)]
pub struct SACounters {
    pub seed: u64,       // seeds searched
    pub ftab: u64,       // ftab jumps
    pub fchr: u64,       // fchr jumps
    pub matches: u64,    // match advances
    pub matchd: [u64; 4],
    pub edit: u64,       // edit advances
    pub editd: [u64; 4],
    pub hits: u64,       // hits accepted
    pub max_depth: usize,
}

impl SACounters {
    pub fn reset(&mut self) {
        *self = SACounters::default();
    }
}

/// What a recorded search action was.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// ftab or fchr jump into the search.
    Jump,
    /// Advance on the read base.
    Match,
    /// Advance via an edit.
    Edit,
}

/// One step taken by the search, recorded only when action sinks are
/// attached.
#[derive(Debug, Clone, Copy)]
pub struct SAAction {
    pub kind: ActionKind,
    pub seed: usize,    // seed type index within the policy set
    pub seedoff: usize, // seed offset from the 5' end
    pub pos: usize,     // seed position of the step
    pub ltr: bool,      // step direction
    pub depth: usize,   // recursion depth
    pub edit: Option<Edit>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_sums_all_fields() {
        let mut a = SeedSearchMetrics::new();
        a.seedsearch = 2;
        a.bwops = 10;
        let mut b = SeedSearchMetrics::new();
        b.seedsearch = 3;
        b.bwops = 1;
        b.ooms = 1;
        a.merge(&b);
        assert_eq!(a.seedsearch, 5);
        assert_eq!(a.bwops, 11);
        assert_eq!(a.ooms, 1);
        assert_eq!(a.intrahit, 0);
    }
}
