// seedalign/src/sinks.rs
//
// Observation callbacks fed by the seed search.  Sinks never influence
// the search path; the provided implementations serialize one call at a
// time through an internal mutex and emit fixed-column tab-delimited
// records.

use std::io::Write;
use std::sync::{Arc, Mutex};

use crate::dna::decode_seq;
use crate::metrics::{ActionKind, SAAction, SACounters};
use crate::read::Read;

/// Receives the seed sequence each time a seed search produced hits.
pub trait SeedHitSink: Send + Sync {
    fn report_seed_hit(&self, read: &Read, seed_seq: &[u8]);
}

/// Receives each read's search counters.
pub trait SeedCounterSink: Send + Sync {
    fn report_counters(&self, read: &Read, c: &SACounters);
}

/// Receives the recorded actions of each read's searches.
pub trait SeedActionSink: Send + Sync {
    fn report_actions(&self, read: &Read, actions: &[SAAction]);
}

/// Columns: read seq, read quals, seed seq.
pub struct StreamTabSeedHitSink<W: Write + Send> {
    os: Mutex<W>,
}

impl<W: Write + Send> StreamTabSeedHitSink<W> {
    pub fn new(os: W) -> Self {
        StreamTabSeedHitSink { os: Mutex::new(os) }
    }
}

impl<W: Write + Send> SeedHitSink for StreamTabSeedHitSink<W> {
    fn report_seed_hit(&self, read: &Read, seed_seq: &[u8]) {
        let mut os = self.os.lock().unwrap();
        // Writer failures must not disturb the search; drop them.
        let _ = writeln!(
            os,
            "{}\t{}\t{}",
            read.seq_ascii(),
            read.qual_ascii(),
            decode_seq(seed_seq)
        );
    }
}

/// Columns: read seq, read quals, seeds searched, ftab jumps, fchr jumps,
/// match advances at depth 0/1/2/>=3, edit advances at depth 0/1/2/>=3,
/// hits, max depth.
pub struct StreamTabSeedCounterSink<W: Write + Send> {
    os: Mutex<W>,
}

impl<W: Write + Send> StreamTabSeedCounterSink<W> {
    pub fn new(os: W) -> Self {
        StreamTabSeedCounterSink { os: Mutex::new(os) }
    }
}

impl<W: Write + Send> SeedCounterSink for StreamTabSeedCounterSink<W> {
    fn report_counters(&self, read: &Read, c: &SACounters) {
        let mut os = self.os.lock().unwrap();
        let _ = writeln!(
            os,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            read.seq_ascii(),
            read.qual_ascii(),
            c.seed,
            c.ftab,
            c.fchr,
            c.matchd[0],
            c.matchd[1],
            c.matchd[2],
            c.matchd[3],
            c.editd[0],
            c.editd[1],
            c.editd[2],
            c.editd[3],
            c.hits,
            c.max_depth
        );
    }
}

/// Columns per action: read seq, read quals, pos, kind, seed, seedoff,
/// depth, edit (or `-`).
pub struct StreamTabSeedActionSink<W: Write + Send> {
    os: Mutex<W>,
}

impl<W: Write + Send> StreamTabSeedActionSink<W> {
    pub fn new(os: W) -> Self {
        StreamTabSeedActionSink { os: Mutex::new(os) }
    }
}

impl<W: Write + Send> SeedActionSink for StreamTabSeedActionSink<W> {
    fn report_actions(&self, read: &Read, actions: &[SAAction]) {
        let mut os = self.os.lock().unwrap();
        for a in actions {
            let kind = match a.kind {
                ActionKind::Jump => 0,
                ActionKind::Match => 1,
                ActionKind::Edit => 2,
            };
            let edit = a.edit.map(|e| e.to_string()).unwrap_or_else(|| "-".to_string());
            let _ = writeln!(
                os,
                "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
                read.seq_ascii(),
                read.qual_ascii(),
                a.pos,
                kind,
                a.seed,
                a.seedoff,
                a.depth,
                edit
            );
        }
    }
}

/// The sinks attached to one search run; all optional and empty by
/// default.
#[derive(Default, Clone)]
pub struct SinkSet {
    pub hit: Vec<Arc<dyn SeedHitSink>>,
    pub counter: Vec<Arc<dyn SeedCounterSink>>,
    pub action: Vec<Arc<dyn SeedActionSink>>,
}

impl SinkSet {
    pub fn new() -> Self {
        SinkSet::default()
    }

    /// Actions are only worth recording when someone listens.
    pub fn wants_actions(&self) -> bool {
        !self.action.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_sink_columns() {
        let buf: Vec<u8> = Vec::new();
        let sink = StreamTabSeedHitSink::new(buf);
        let read = Read::from_ascii("r1", b"ACGT", b"IIII");
        sink.report_seed_hit(&read, &[0, 1, 2, 3]);
        let out = sink.os.into_inner().unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "ACGT\tIIII\tACGT\n");
    }

    #[test]
    fn test_counter_sink_column_count() {
        let sink = StreamTabSeedCounterSink::new(Vec::new());
        let read = Read::from_ascii("r1", b"ACGT", b"IIII");
        sink.report_counters(&read, &SACounters::default());
        let out = String::from_utf8(sink.os.into_inner().unwrap()).unwrap();
        assert_eq!(out.trim_end().split('\t').count(), 15);
    }
}
