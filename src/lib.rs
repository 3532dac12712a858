// seedalign/src/lib.rs
//
// Seed-alignment core of a short-read DNA aligner.  Reads are expanded
// into instantiated seeds by policy, each seed is searched in a
// bidirectional FM index under per-zone edit budgets, and the resulting
// hit intervals are cached, deduplicated and ranked for extension.

pub mod aligner; // seed instantiation + recursive bidirectional search
pub mod cache; // two-tier (per-read / shared) alignment cache
pub mod constraint;
pub mod dna;
pub mod ebwt; // bidirectional FM index (BWT + mirror)
pub mod edit;
pub mod metrics;
pub mod penalty;
pub mod read; // reads and FASTQ ingestion
pub mod results;
pub mod seed; // seed policies, step schedules, zone maps
pub mod sinks; // optional observation callbacks
