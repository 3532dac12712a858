// seedalign/src/main.rs
//
// Driver: build both FM indexes from a FASTA reference, stream FASTQ
// reads through a worker pool, and report each read's ranked seed hits.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;

use clap::Parser;
use crossbeam_channel::bounded;
use rayon::prelude::*;

use seedalign::aligner::SeedAligner;
use seedalign::cache::{AlignmentCache, CacheIface};
use seedalign::constraint::Constraint;
use seedalign::dna::encode_base;
use seedalign::ebwt::Ebwt;
use seedalign::metrics::SeedSearchMetrics;
use seedalign::penalty::Penalties;
use seedalign::read::{FastqSource, Read};
use seedalign::results::SeedResults;
use seedalign::seed::Seed;
use seedalign::sinks::{
    SinkSet, StreamTabSeedActionSink, StreamTabSeedCounterSink, StreamTabSeedHitSink,
};

// Pipeline sizing: a few batches in flight keeps the reader ahead of the
// workers without buffering the whole file.
const BATCHES_IN_FLIGHT: usize = 4;
const LOCAL_CACHE_RANGES: usize = 1 << 16;

#[derive(Parser)]
#[command(name = "seedalign")]
#[command(about = "Seed alignment: bidirectional FM-index seed search with per-zone edit budgets", long_about = None)]
#[command(version)]
struct Cli {
    /// Reference FASTA
    #[arg(value_name = "REF.FA")]
    reference: PathBuf,

    /// Reads in FASTQ (optionally .gz)
    #[arg(value_name = "READS.FQ")]
    reads: PathBuf,

    /// Seed length
    #[arg(short = 'L', long, value_name = "INT", default_value = "20")]
    seed_len: usize,

    /// Interval between seed offsets
    #[arg(short = 'i', long, value_name = "INT", default_value = "5")]
    interval: usize,

    /// Mismatches allowed per seed (selects the canned policy set)
    #[arg(short = 'N', long, value_name = "INT", default_value = "0",
          value_parser = clap::value_parser!(u32).range(0..=2))]
    mms: u32,

    /// Constant coefficient of the N-count ceiling
    #[arg(long, value_name = "FLOAT", default_value = "2.0")]
    n_ceil_const: f32,

    /// Per-base coefficient of the N-count ceiling
    #[arg(long, value_name = "FLOAT", default_value = "0.1")]
    n_ceil_linear: f32,

    /// Constant coefficient of the overall penalty ceiling; unset leaves
    /// the overall budget unbounded
    #[arg(long, value_name = "FLOAT")]
    pen_const: Option<f32>,

    /// Per-read-base coefficient of the overall penalty ceiling
    #[arg(long, value_name = "FLOAT", default_value = "0.0")]
    pen_linear: f32,

    /// Output file (default: stdout)
    #[arg(short = 'o', long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Dump one tab-delimited record per seed with hits
    #[arg(long, value_name = "FILE")]
    dump_hits: Option<PathBuf>,

    /// Dump one tab-delimited counter record per read
    #[arg(long, value_name = "FILE")]
    dump_counters: Option<PathBuf>,

    /// Dump one tab-delimited record per search action
    #[arg(long, value_name = "FILE")]
    dump_actions: Option<PathBuf>,

    /// Across-read cache capacity, in hit ranges
    #[arg(long, value_name = "INT", default_value = "1048576")]
    global_cache_ranges: usize,

    /// Reads per batch
    #[arg(long, value_name = "INT", default_value = "512")]
    batch_size: usize,

    /// Number of threads (default: all available cores)
    #[arg(short = 't', long, value_name = "INT")]
    threads: Option<usize>,

    /// Verbose logging
    #[arg(short = 'v', long)]
    verbose: bool,
}

/// Load and pack a FASTA reference.  Positions that are not ACGT are
/// packed as A; the index only answers queries, it never emits reference
/// text.
fn load_reference(path: &Path) -> io::Result<Vec<u8>> {
    let reader = bio::io::fasta::Reader::new(BufReader::new(File::open(path)?));
    let mut packed = Vec::new();
    let mut ambiguous = 0usize;
    let mut n_seqs = 0usize;
    for rec in reader.records() {
        let rec = rec.map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        n_seqs += 1;
        for &b in rec.seq() {
            let c = encode_base(b);
            if c > 3 {
                ambiguous += 1;
                packed.push(0);
            } else {
                packed.push(c);
            }
        }
    }
    if packed.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "reference contains no sequence",
        ));
    }
    if ambiguous > 0 {
        log::warn!("{} ambiguous reference bases packed as A", ambiguous);
    }
    log::info!("reference: {} sequences, {} bases", n_seqs, packed.len());
    Ok(packed)
}

fn build_sinks(cli: &Cli) -> io::Result<SinkSet> {
    let mut sinks = SinkSet::new();
    if let Some(path) = &cli.dump_hits {
        sinks
            .hit
            .push(Arc::new(StreamTabSeedHitSink::new(BufWriter::new(File::create(path)?))));
    }
    if let Some(path) = &cli.dump_counters {
        sinks
            .counter
            .push(Arc::new(StreamTabSeedCounterSink::new(BufWriter::new(File::create(path)?))));
    }
    if let Some(path) = &cli.dump_actions {
        sinks
            .action
            .push(Arc::new(StreamTabSeedActionSink::new(BufWriter::new(File::create(path)?))));
    }
    Ok(sinks)
}

/// Align one read and render its ranked buckets.
#[allow(clippy::too_many_arguments)]
fn process_read(
    read: &Read,
    policies: &[Seed],
    ebwt_fw: &Ebwt,
    ebwt_bw: &Ebwt,
    pens: &Penalties,
    cli: &Cli,
    aligner: &mut SeedAligner,
    sr: &mut SeedResults,
    cache: &mut CacheIface,
    sinks: &SinkSet,
    shared_met: &Mutex<SeedSearchMetrics>,
) -> String {
    let mut met = SeedSearchMetrics::new();
    cache.next_read();
    aligner.instantiate_seeds(
        policies,
        cli.interval,
        read,
        pens,
        cli.n_ceil_const,
        cli.n_ceil_linear,
        sr,
        &mut met,
    );
    aligner.search_all_seeds(ebwt_fw, ebwt_bw, read, pens, cache, sr, &mut met, sinks);
    sr.sort();

    let mut out = String::new();
    out.push_str(&format!(
        "{}\t{}\t{}\t{}\n",
        read.name,
        sr.nonzero_offsets(),
        sr.num_ranges(),
        sr.num_elts()
    ));
    for r in 0..sr.nonzero_offsets() {
        let (qv, _, off, fw, seedlen) = sr.hits_by_rank(r);
        out.push_str(&format!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\n",
            read.name,
            r,
            if fw { '+' } else { '-' },
            off,
            seedlen,
            qv.num_ranges(),
            qv.num_elts()
        ));
    }
    shared_met.lock().unwrap().merge(&met);
    out
}

fn run(cli: &Cli) -> io::Result<()> {
    let reference = load_reference(&cli.reference)?;
    log::info!("building forward index");
    let ebwt_fw = Ebwt::build(&reference);
    log::info!("building mirror index");
    let mut reversed = reference.clone();
    reversed.reverse();
    // Jump-table probes always go through the forward index, so the
    // mirror skips building one.
    let ebwt_bw = Ebwt::build_with_ftab_width(&reversed, 0);
    drop(reversed);

    let overall = match cli.pen_const {
        Some(pc) => Constraint::penalty_func_based(pc, cli.pen_linear),
        None => Constraint::default(),
    };
    let mut policies = Vec::new();
    Seed::mm_seeds(cli.mms, cli.seed_len, &mut policies, overall);
    let pens = Penalties::default();
    let sinks = build_sinks(cli)?;
    let global_cache = Arc::new(Mutex::new(AlignmentCache::new(cli.global_cache_ranges)));
    let shared_met = Mutex::new(SeedSearchMetrics::new());

    let mut output: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout())),
    };

    let (tx, rx) = bounded::<Vec<Read>>(BATCHES_IN_FLIGHT);
    let reads_path = cli.reads.clone();
    let batch_size = cli.batch_size.max(1);
    let reader = thread::spawn(move || -> io::Result<()> {
        let mut source = FastqSource::open(&reads_path)?;
        while let Some(batch) = source.next_batch(batch_size)? {
            if tx.send(batch).is_err() {
                break;
            }
        }
        Ok(())
    });

    let mut n_reads = 0usize;
    for batch in rx.iter() {
        n_reads += batch.len();
        let rendered: Vec<String> = batch
            .par_iter()
            .map_init(
                || {
                    (
                        SeedAligner::new(),
                        SeedResults::new(),
                        CacheIface::new(LOCAL_CACHE_RANGES, Some(Arc::clone(&global_cache))),
                    )
                },
                |(aligner, sr, cache), read| {
                    if read.is_empty() {
                        log::warn!("skipping empty read {}", read.name);
                        return String::new();
                    }
                    process_read(
                        read, &policies, &ebwt_fw, &ebwt_bw, &pens, cli, aligner, sr, cache,
                        &sinks, &shared_met,
                    )
                },
            )
            .collect();
        for s in rendered {
            output.write_all(s.as_bytes())?;
        }
    }
    output.flush()?;
    reader.join().expect("reader thread panicked")?;

    let met = shared_met.lock().unwrap();
    log::info!("{} reads aligned", n_reads);
    log::info!(
        "seed searches: {} ({} offsets), cache hits: {} local / {} shared",
        met.seedsearch,
        met.possearch,
        met.intrahit,
        met.interhit
    );
    log::info!(
        "bw ops: {}, bw edits: {}, filtered seeds: {}, cache overflows: {}",
        met.bwops,
        met.bweds,
        met.filteredseed,
        met.ooms
    );
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    env_logger::Builder::from_default_env()
        .filter_level(if cli.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .format_timestamp(None)
        .format_target(false)
        .init();

    if let Some(threads) = cli.threads {
        if let Err(e) = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
        {
            log::warn!("could not size thread pool: {}", e);
        }
    }

    if let Err(e) = run(&cli) {
        log::error!("alignment failed: {}", e);
        std::process::exit(1);
    }
}
