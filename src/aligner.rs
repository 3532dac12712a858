// seedalign/src/aligner.rs
//
// The seed aligner: expands a read into instantiated seeds, then runs a
// budgeted depth-first bidirectional search per seed.  Each recursion
// frame owns value copies of the zone and overall constraints, so backing
// out of a branch undoes its charges for free.  All mutable state here is
// per-worker; the only shared structures are the read-only indexes and
// the global cache tier behind the CacheIface.

use rustc_hash::FxHashSet;

use crate::cache::{CacheHit, CacheIface, SeedRange};
use crate::constraint::Constraint;
use crate::ebwt::{BiRange, Ebwt, SideLocus};
use crate::edit::{apply_to_seed, Edit, EditKind};
use crate::metrics::{ActionKind, SAAction, SACounters, SeedSearchMetrics};
use crate::penalty::Penalties;
use crate::read::Read;
use crate::results::SeedResults;
use crate::seed::{InstantiatedSeed, Seed};
use crate::sinks::SinkSet;

/// Read-only context of one seed search.
struct SearchCtx<'a> {
    ebwt_fw: &'a Ebwt,
    ebwt_bw: &'a Ebwt,
    pens: &'a Penalties,
    s: &'a InstantiatedSeed,
    seq: &'a [u8],
    qual: &'a [u8],
    record_actions: bool,
}

/// Per-worker seed aligner with its scratch state.
pub struct SeedAligner {
    counters: SACounters,
    actions: Vec<SAAction>,
    edit_path: Vec<Edit>,
    hits_seen: FxHashSet<Vec<u8>>,
    bwops: u64,
    bwedits: u64,
    oom: bool,
    bwops_limit: Option<u64>,
}

impl Default for SeedAligner {
    fn default() -> Self {
        SeedAligner::new()
    }
}

impl SeedAligner {
    pub fn new() -> Self {
        SeedAligner {
            counters: SACounters::default(),
            actions: Vec::new(),
            edit_path: Vec::new(),
            hits_seen: FxHashSet::default(),
            bwops: 0,
            bwedits: 0,
            oom: false,
            bwops_limit: None,
        }
    }

    /// Cap on Burrows-Wheeler operations per seed search; branches past
    /// the cap are abandoned and the hits found so far are kept.
    pub fn set_bwops_limit(&mut self, limit: Option<u64>) {
        self.bwops_limit = limit;
    }

    pub fn counters(&self) -> &SACounters {
        &self.counters
    }

    /// Extract the seed covering `[depth, depth+len)` of the chosen read
    /// orientation.
    pub fn instantiate_seq(read: &Read, len: usize, depth: usize, fw: bool) -> (Vec<u8>, Vec<u8>) {
        debug_assert!(depth + len <= read.len());
        let seq = (0..len).map(|i| read.base(depth + i, fw)).collect();
        let qual = (0..len).map(|i| read.quality(depth + i, fw)).collect();
        (seq, qual)
    }

    /// Walk the seed offsets of a read and instantiate every policy at
    /// every offset and orientation.  Returns (instantiated, filtered).
    #[allow(clippy::too_many_arguments)]
    pub fn instantiate_seeds(
        &mut self,
        seeds: &[Seed],
        per: usize,
        read: &Read,
        pens: &Penalties,
        n_ceil_const: f32,
        n_ceil_linear: f32,
        sr: &mut SeedResults,
        met: &mut SeedSearchMetrics,
    ) -> (usize, usize) {
        assert!(!seeds.is_empty() && per > 0);
        assert!(!read.is_empty());
        let seed_len = seeds[0].len;
        debug_assert!(seeds.iter().all(|s| s.len == seed_len));
        let read_len = read.len();
        // A read shorter than the seed gets one seed, shrunk to fit.
        let eff_len = seed_len.min(read_len);
        let num_offs = if read_len <= seed_len {
            1
        } else {
            (read_len - seed_len) / per + 1
        };
        sr.reset((0..num_offs).map(|i| (i * per) as u32).collect());
        let n_ceil =
            Constraint::instantiate_penalty(eff_len, n_ceil_const, n_ceil_linear).max(0) as usize;

        let mut inst = 0;
        let mut filtered = 0;
        for i in 0..num_offs {
            let off = i * per;
            for fw in [true, false] {
                let (seq, qual) = Self::instantiate_seq(read, eff_len, off, fw);
                let n_count = seq.iter().filter(|&&c| c > 3).count();
                sr.set_seq(fw, i, seq.clone(), qual.clone());
                for (ti, p) in seeds.iter().enumerate() {
                    if n_count > n_ceil {
                        met.filteredseed += 1;
                        filtered += 1;
                        sr.instantiated_seeds_mut(fw, i)
                            .push(InstantiatedSeed::filtered(off, i, ti, fw));
                        continue;
                    }
                    match p.instantiate(read_len, &seq, &qual, pens, off, i, ti, fw) {
                        Some(is) => {
                            debug_assert!(is.rep_ok());
                            inst += 1;
                            sr.instantiated_seeds_mut(fw, i).push(is);
                        }
                        None => {
                            met.filteredseed += 1;
                            filtered += 1;
                            sr.instantiated_seeds_mut(fw, i)
                                .push(InstantiatedSeed::filtered(off, i, ti, fw));
                        }
                    }
                }
            }
        }
        (inst, filtered)
    }

    /// Search every instantiated seed of the read, consulting the cache
    /// first, and collect the results into `sr`.
    #[allow(clippy::too_many_arguments)]
    pub fn search_all_seeds(
        &mut self,
        ebwt_fw: &Ebwt,
        ebwt_bw: &Ebwt,
        read: &Read,
        pens: &Penalties,
        cache: &mut CacheIface,
        sr: &mut SeedResults,
        met: &mut SeedSearchMetrics,
        sinks: &SinkSet,
    ) {
        self.counters.reset();
        self.actions.clear();
        let record_actions = sinks.wants_actions();
        for i in 0..sr.num_offs() {
            for fw in [true, false] {
                if !sr.instantiated_seeds(fw, i).iter().any(|s| !s.nfiltered) {
                    continue;
                }
                let seed_seq = sr.seq(fw, i).to_vec();
                let seed_qual = sr.qual(fw, i).to_vec();
                if let Some((qv, tier)) = cache.query(&seed_seq) {
                    match tier {
                        CacheHit::Local => met.intrahit += 1,
                        CacheHit::Global => met.interhit += 1,
                    }
                    sr.add(qv, cache.local(), i, fw);
                    continue;
                }
                met.possearch += 1;
                cache.begin_align(&seed_seq);
                self.hits_seen.clear();
                self.oom = false;
                let n_seeds = sr.instantiated_seeds(fw, i).len();
                for k in 0..n_seeds {
                    let s = sr.instantiated_seeds(fw, i)[k].clone();
                    if s.nfiltered {
                        continue;
                    }
                    self.bwops = 0;
                    self.bwedits = 0;
                    met.seedsearch += 1;
                    self.counters.seed += 1;
                    let ctx = SearchCtx {
                        ebwt_fw,
                        ebwt_bw,
                        pens,
                        s: &s,
                        seq: &seed_seq,
                        qual: &seed_qual,
                        record_actions,
                    };
                    self.search_seed_bi(&ctx, cache);
                    met.bwops += self.bwops;
                    met.bweds += self.bwedits;
                    if self.oom {
                        // Keep whatever this bucket found and move on.
                        met.ooms += 1;
                        break;
                    }
                }
                let qv = cache.finish_align();
                if !qv.empty() {
                    for sink in &sinks.hit {
                        sink.report_seed_hit(read, &seed_seq);
                    }
                }
                sr.add(qv, cache.local(), i, fw);
            }
        }
        for sink in &sinks.counter {
            sink.report_counters(read, &self.counters);
        }
        if record_actions {
            for sink in &sinks.action {
                sink.report_actions(read, &self.actions);
            }
        }
    }

    /// Search one instantiated seed.  Seeds the interval from the pivot
    /// character (or jumps the leading forced-match steps through the
    /// ftab when it is wide enough) and recurses over the step schedule.
    fn search_seed_bi(&mut self, ctx: &SearchCtx, cache: &mut CacheIface) -> bool {
        let s = ctx.s;
        let len = s.len();
        debug_assert!(len > 0 && !s.nfiltered);
        self.edit_path.clear();

        let ftw = ctx.ebwt_fw.ftab_width();
        let (step0, rng) = if ftw >= 2 && s.maxjump >= ftw {
            // The first ftw steps are unidirectional forced matches:
            // collapse them into one ftab probe of their window.
            let mut lo = s.pivot;
            let mut hi = s.pivot + 1;
            for k in 1..ftw {
                let p = s.pos_of_step(k);
                lo = lo.min(p);
                hi = hi.max(p + 1);
            }
            debug_assert_eq!(hi - lo, ftw);
            self.counters.ftab += 1;
            match ctx.ebwt_fw.ftab_jump(&ctx.seq[lo..hi]) {
                Some(r) => (ftw, r),
                None => return false,
            }
        } else if s.maxjump >= 1 {
            let c = ctx.seq[s.pivot];
            debug_assert!(c < 4, "an N at the pivot cannot survive maxjump >= 1");
            self.counters.fchr += 1;
            let r = ctx.ebwt_fw.fchr_jump(c);
            if !r.valid() {
                return false;
            }
            (1, r)
        } else {
            // Edits are possible from the very first step; start from the
            // whole index.
            (0, ctx.ebwt_fw.full_range())
        };
        if ctx.record_actions {
            self.actions.push(SAAction {
                kind: ActionKind::Jump,
                seed: s.seedtypeidx,
                seedoff: s.seedoff,
                pos: s.pivot,
                ltr: s.steps[0] > 0,
                depth: 0,
                edit: None,
            });
        }
        let (tloc, bloc) = Self::next_locs_bi(s, step0, rng);
        let found = self.search_rec(
            ctx, cache, step0, 0, rng, tloc, bloc, s.cons[0], s.cons[1], s.cons[2], s.overall,
        );
        log::trace!(
            "seed off {} ({}) type {}: {} ({} bwops, {} bwedits)",
            s.seedoff,
            if s.fw { "fw" } else { "rc" },
            s.seedtypeidx,
            if found { "hit" } else { "no hit" },
            self.bwops,
            self.bwedits
        );
        found
    }

    /// Loci for the interval bounds the next step will LF-map through.
    /// Singleton intervals skip the locus and use direct character lookup.
    fn next_locs_bi(s: &InstantiatedSeed, step: usize, r: BiRange) -> (SideLocus, SideLocus) {
        if step >= s.len() {
            return (SideLocus::invalid(), SideLocus::invalid());
        }
        let ltr = s.steps[step] > 0;
        let (top, bot) = if ltr { (r.topb, r.botb) } else { (r.topf, r.botf) };
        if bot - top > 1 {
            (SideLocus::from_row(top), SideLocus::from_row(bot))
        } else {
            (SideLocus::invalid(), SideLocus::invalid())
        }
    }

    /// One step of the schedule: try the true base, then substitutions,
    /// deletions and insertions, in that fixed order.
    #[allow(clippy::too_many_arguments)]
    fn search_rec(
        &mut self,
        ctx: &SearchCtx,
        cache: &mut CacheIface,
        step: usize,
        depth: usize,
        r: BiRange,
        tloc: SideLocus,
        bloc: SideLocus,
        c0: Constraint,
        c1: Constraint,
        c2: Constraint,
        overall: Constraint,
    ) -> bool {
        let s = ctx.s;
        let len = s.len();
        self.counters.max_depth = self.counters.max_depth.max(depth);
        if self.oom {
            return false;
        }
        if let Some(limit) = self.bwops_limit {
            if self.bwops > limit {
                return false;
            }
        }
        debug_assert!(r.valid());
        if step == len {
            if !(overall.acceptable()
                && c0.acceptable()
                && c1.acceptable()
                && c2.acceptable())
            {
                return false;
            }
            return self.report_hit(ctx, cache, r, len);
        }

        let ltr = s.steps[step] > 0;
        let pos = s.pos_of_step(step);
        let zs = s.zones[step];
        let c_base = ctx.seq[pos];
        let q = ctx.qual[pos];

        // One interval update yields the candidate extension for every
        // base at once; empty candidates terminate their branches.
        let prim = if ltr { ctx.ebwt_bw } else { ctx.ebwt_fw };
        let (top, bot, otop, obot) = if ltr {
            (r.topb, r.botb, r.topf, r.botf)
        } else {
            (r.topf, r.botf, r.topb, r.botb)
        };
        let mut cand: [Option<BiRange>; 4] = [None; 4];
        self.bwops += 1;
        if bloc.valid() {
            let ext = prim.lookup_lf_top_bot(&tloc, &bloc, top, bot, otop, obot);
            for c in 0..4 {
                if ext.bots[c] > ext.tops[c] {
                    cand[c] = Some(Self::orient(ltr, ext.tops[c], ext.bots[c], ext.otops[c], ext.obots[c]));
                }
            }
        } else if let Some((c, row)) = prim.lookup_lf1(top) {
            // A singleton's mirror coordinates are unchanged by a step.
            cand[c as usize] = Some(Self::orient(ltr, row, row + 1, otop, obot));
        }

        let mut found = false;

        // Match.
        if c_base < 4 {
            if let Some(nr) = cand[c_base as usize] {
                if !zs.closes || Self::zone(&c0, &c1, &c2, zs.non_ins).acceptable() {
                    self.counters.matches += 1;
                    self.counters.matchd[depth.min(3)] += 1;
                    if ctx.record_actions {
                        self.actions.push(SAAction {
                            kind: ActionKind::Match,
                            seed: s.seedtypeidx,
                            seedoff: s.seedoff,
                            pos,
                            ltr,
                            depth,
                            edit: None,
                        });
                    }
                    let (ntl, nbl) = Self::next_locs_bi(s, step + 1, nr);
                    found |= self.search_rec(
                        ctx, cache, step + 1, depth + 1, nr, ntl, nbl, c0, c1, c2, overall,
                    );
                }
            }
        }

        // Substitutions.  An N position had its cost charged at
        // instantiation, so every base stands in for it for free; a
        // regular position charges its zone and the overall budget.
        if c_base < 4 {
            if Self::zone(&c0, &c1, &c2, zs.non_ins).can_mismatch(q, ctx.pens)
                && overall.can_mismatch(q, ctx.pens)
            {
                for alt in 0..4u8 {
                    if alt == c_base {
                        continue;
                    }
                    let Some(nr) = cand[alt as usize] else { continue };
                    let (mut n0, mut n1, mut n2, mut nov) = (c0, c1, c2, overall);
                    Self::zone_mut(&mut n0, &mut n1, &mut n2, zs.non_ins)
                        .charge_mismatch(q, ctx.pens);
                    nov.charge_mismatch(q, ctx.pens);
                    if zs.closes && !Self::zone(&n0, &n1, &n2, zs.non_ins).acceptable() {
                        continue;
                    }
                    found |= self.edit_branch(
                        ctx,
                        cache,
                        Edit::mismatch(pos, alt, c_base, ltr),
                        step + 1,
                        depth,
                        nr,
                        n0,
                        n1,
                        n2,
                        nov,
                    );
                }
            }
        } else {
            let closing_ok = !zs.closes || Self::zone(&c0, &c1, &c2, zs.non_ins).acceptable();
            if closing_ok {
                for alt in 0..4u8 {
                    let Some(nr) = cand[alt as usize] else { continue };
                    found |= self.edit_branch(
                        ctx,
                        cache,
                        Edit::mismatch(pos, alt, c_base, ltr),
                        step + 1,
                        depth,
                        nr,
                        c0,
                        c1,
                        c2,
                        overall,
                    );
                }
            }
        }

        // Gaps.  A deletion consumes a reference character and stays on
        // this step; an insertion consumes the read character and leaves
        // the interval alone.  Alternating gap kinds back-to-back is
        // disallowed so each indel run has one canonical trail.
        let prev = self.edit_path.last().copied();
        if depth > 0 && prev.map_or(true, |e| e.kind != EditKind::RefGap) {
            let ex = self.trailing_gap_run(EditKind::ReadGap);
            if Self::zone(&c0, &c1, &c2, zs.non_ins).can_delete(ex, ctx.pens)
                && overall.can_delete(ex, ctx.pens)
            {
                for cdel in 0..4u8 {
                    let Some(nr) = cand[cdel as usize] else { continue };
                    let (mut n0, mut n1, mut n2, mut nov) = (c0, c1, c2, overall);
                    Self::zone_mut(&mut n0, &mut n1, &mut n2, zs.non_ins)
                        .charge_delete(ex, ctx.pens);
                    nov.charge_delete(ex, ctx.pens);
                    found |= self.edit_branch(
                        ctx,
                        cache,
                        Edit::read_gap(pos, cdel, ltr),
                        step,
                        depth,
                        nr,
                        n0,
                        n1,
                        n2,
                        nov,
                    );
                }
            }
        }
        if depth > 0 && prev.map_or(true, |e| e.kind != EditKind::ReadGap) {
            let ex = self.trailing_gap_run(EditKind::RefGap);
            if Self::zone(&c0, &c1, &c2, zs.ins).can_insert(ex, ctx.pens)
                && overall.can_insert(ex, ctx.pens)
            {
                let (mut n0, mut n1, mut n2, mut nov) = (c0, c1, c2, overall);
                Self::zone_mut(&mut n0, &mut n1, &mut n2, zs.ins).charge_insert(ex, ctx.pens);
                nov.charge_insert(ex, ctx.pens);
                // The read position is consumed, so a closing step still
                // closes its zone.
                if !zs.closes || Self::zone(&n0, &n1, &n2, zs.non_ins).acceptable() {
                    found |= self.edit_branch(
                        ctx,
                        cache,
                        Edit::ref_gap(pos, c_base, ltr),
                        step + 1,
                        depth,
                        r,
                        n0,
                        n1,
                        n2,
                        nov,
                    );
                }
            }
        }

        found
    }

    /// Book-keeping shared by every edit alternative: counters, action
    /// trace, edit-trail push/pop around the recursive call.
    #[allow(clippy::too_many_arguments)]
    fn edit_branch(
        &mut self,
        ctx: &SearchCtx,
        cache: &mut CacheIface,
        edit: Edit,
        next_step: usize,
        depth: usize,
        nr: BiRange,
        c0: Constraint,
        c1: Constraint,
        c2: Constraint,
        overall: Constraint,
    ) -> bool {
        self.counters.edit += 1;
        self.counters.editd[depth.min(3)] += 1;
        self.bwedits += 1;
        if ctx.record_actions {
            self.actions.push(SAAction {
                kind: ActionKind::Edit,
                seed: ctx.s.seedtypeidx,
                seedoff: ctx.s.seedoff,
                pos: edit.pos as usize,
                ltr: edit.ltr,
                depth,
                edit: Some(edit),
            });
        }
        self.edit_path.push(edit);
        let (ntl, nbl) = Self::next_locs_bi(ctx.s, next_step, nr);
        let found = self.search_rec(
            ctx,
            cache,
            next_step,
            depth + 1,
            nr,
            ntl,
            nbl,
            c0,
            c1,
            c2,
            overall,
        );
        self.edit_path.pop();
        found
    }

    /// Accept a completed branch: dedup, then stage the hit in the cache.
    fn report_hit(&mut self, ctx: &SearchCtx, cache: &mut CacheIface, r: BiRange, len: usize) -> bool {
        let implied_ref = apply_to_seed(ctx.seq, &self.edit_path);
        let mut key = implied_ref;
        key.push(0xFF);
        for e in &self.edit_path {
            key.extend_from_slice(&e.pos.to_le_bytes());
            key.push(match e.kind {
                EditKind::Mismatch => 0,
                EditKind::ReadGap => 1,
                EditKind::RefGap => 2,
            });
            key.push(e.chr);
            key.push(e.qchr);
        }
        key.extend_from_slice(&r.topf.to_le_bytes());
        key.extend_from_slice(&r.botf.to_le_bytes());
        if !self.hits_seen.insert(key) {
            return false;
        }
        if !cache.add(SeedRange {
            topf: r.topf,
            botf: r.botf,
            topb: r.topb,
            botb: r.botb,
            len: len as u32,
            edits: self.edit_path.clone(),
        }) {
            self.oom = true;
            return false;
        }
        self.counters.hits += 1;
        true
    }

    #[inline]
    fn trailing_gap_run(&self, kind: EditKind) -> u32 {
        self.edit_path
            .iter()
            .rev()
            .take_while(|e| e.kind == kind)
            .count() as u32
    }

    #[inline]
    fn zone<'c>(c0: &'c Constraint, c1: &'c Constraint, c2: &'c Constraint, z: u8) -> &'c Constraint {
        match z {
            0 => c0,
            1 => c1,
            _ => c2,
        }
    }

    #[inline]
    fn zone_mut<'c>(
        c0: &'c mut Constraint,
        c1: &'c mut Constraint,
        c2: &'c mut Constraint,
        z: u8,
    ) -> &'c mut Constraint {
        match z {
            0 => c0,
            1 => c1,
            _ => c2,
        }
    }

    /// Map a primary/mirror pair back to (fw, bw) orientation.
    #[inline]
    fn orient(ltr: bool, t: u32, b: u32, ot: u32, ob: u32) -> BiRange {
        if ltr {
            BiRange::new(ot, ob, t, b)
        } else {
            BiRange::new(t, b, ot, ob)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dna::encode_seq;

    fn build_indexes(text: &[u8]) -> (Ebwt, Ebwt) {
        let codes = encode_seq(text);
        let mut rev = codes.clone();
        rev.reverse();
        (Ebwt::build(&codes), Ebwt::build(&rev))
    }

    fn run(
        reference: &[u8],
        read_seq: &[u8],
        seeds: &[Seed],
        per: usize,
    ) -> (SeedResults, CacheIface, SeedSearchMetrics) {
        let (fw, bw) = build_indexes(reference);
        let read = Read::from_ascii("r", read_seq, &vec![b'I'; read_seq.len()]);
        let pens = Penalties::simple(30, 1, 40, 15);
        let mut aligner = SeedAligner::new();
        let mut sr = SeedResults::new();
        let mut met = SeedSearchMetrics::new();
        let mut cache = CacheIface::new(1024, None);
        aligner.instantiate_seeds(seeds, per, &read, &pens, 2.0, 0.1, &mut sr, &mut met);
        aligner.search_all_seeds(&fw, &bw, &read, &pens, &mut cache, &mut sr, &mut met, &SinkSet::new());
        (sr, cache, met)
    }

    #[test]
    fn test_exact_seed_finds_both_occurrences() {
        let mut pols = Vec::new();
        Seed::mm_seeds(0, 4, &mut pols, Constraint::default());
        let (sr, cache, met) = run(b"ACGTACGT", b"ACGT", &pols, 1);
        let qv = sr.hits_at_off_idx(true, 0);
        assert!(qv.valid());
        assert_eq!(qv.num_ranges(), 1);
        assert_eq!(qv.num_elts(), 2);
        let ranges = cache.ranges(qv);
        assert!(ranges[0].edits.is_empty());
        assert!(met.seedsearch >= 1);
    }

    #[test]
    fn test_exact_seed_misses_mismatch() {
        let mut pols = Vec::new();
        Seed::mm_seeds(0, 4, &mut pols, Constraint::default());
        let (sr, _, _) = run(b"ACGTACGT", b"ACGA", &pols, 1);
        assert!(!sr.hits_at_off_idx(true, 0).valid());
    }

    #[test]
    fn test_one_mm_seed_finds_substitution() {
        let mut pols = Vec::new();
        Seed::mm_seeds(1, 4, &mut pols, Constraint::penalty_based(30));
        let (sr, cache, _) = run(b"ACGTACGT", b"ACGA", &pols, 1);
        let qv = sr.hits_at_off_idx(true, 0);
        assert!(qv.valid());
        let ranges = cache.ranges(qv);
        assert_eq!(ranges.len(), 1);
        assert_eq!(ranges[0].edits.len(), 1);
        let e = ranges[0].edits[0];
        assert_eq!((e.pos, e.chr, e.qchr, e.kind), (3, 3, 0, EditKind::Mismatch));
        assert_eq!(ranges[0].botf - ranges[0].topf, 2);
    }

    #[test]
    fn test_intrahit_for_repeated_offset() {
        // Stride 1 over a homopolymer read: every offset extracts the
        // same seed sequence, so only the first search runs.
        let mut pols = Vec::new();
        Seed::mm_seeds(0, 4, &mut pols, Constraint::default());
        let (_, _, met) = run(b"AAAAAAAA", b"AAAAAA", &pols, 1);
        // One search per distinct seed sequence (AAAA and its rc TTTT);
        // the remaining four buckets hit the local cache.
        assert_eq!(met.possearch, 2);
        assert_eq!(met.intrahit, 4);
    }

    #[test]
    fn test_short_read_shrinks_seed() {
        let mut pols = Vec::new();
        Seed::mm_seeds(0, 8, &mut pols, Constraint::default());
        let (sr, cache, _) = run(b"ACGTACGT", b"ACG", &pols, 1);
        assert_eq!(sr.num_offs(), 1);
        let qv = sr.hits_at_off_idx(true, 0);
        assert!(qv.valid());
        assert_eq!(cache.ranges(qv)[0].len, 3);
    }

    #[test]
    fn test_all_n_seed_filtered() {
        let mut pols = Vec::new();
        Seed::mm_seeds(1, 4, &mut pols, Constraint::default());
        let (sr, _, met) = run(b"ACGTACGT", b"NNNN", &pols, 1);
        assert!(met.filteredseed > 0);
        assert!(sr.is_empty());
    }

    #[test]
    fn test_bwops_accounted() {
        let mut pols = Vec::new();
        Seed::mm_seeds(0, 4, &mut pols, Constraint::default());
        let (_, _, met) = run(b"ACGTACGT", b"ACGT", &pols, 1);
        assert!(met.bwops > 0);
        assert_eq!(met.bweds, 0);
    }

    #[test]
    fn test_oom_aborts_but_keeps_partial() {
        // Reference holds the read plus two 1-mismatch variants, so the
        // 1mm policies stage several ranges; a 1-range cache fills up.
        let (fwi, bwi) = build_indexes(b"ACGTAAGTTCGT");
        let read = Read::from_ascii("r", b"ACGT", b"IIII");
        let pens = Penalties::simple(30, 1, 40, 15);
        let mut pols = Vec::new();
        Seed::mm_seeds(1, 4, &mut pols, Constraint::default());
        let mut aligner = SeedAligner::new();
        let mut sr = SeedResults::new();
        let mut met = SeedSearchMetrics::new();
        let mut cache = CacheIface::new(1, None);
        aligner.instantiate_seeds(&pols, 1, &read, &pens, 2.0, 0.1, &mut sr, &mut met);
        aligner.search_all_seeds(&fwi, &bwi, &read, &pens, &mut cache, &mut sr, &mut met, &SinkSet::new());
        assert!(met.ooms >= 1);
        // The range staged before the cache filled is kept.
        assert!(sr.num_ranges() >= 1);
    }
}
