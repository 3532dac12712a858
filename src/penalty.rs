// seedalign/src/penalty.rs
//
// Penalty table consulted by the seed search when it considers an edit.
// All penalties are non-negative; charging subtracts them from the
// remaining budget carried in a Constraint.

/// Penalties for the edit types the seed search can introduce.
///
/// Mismatch penalties scale with the base quality between `mm_min` (at
/// quality 0) and `mm_max` (at `qual_ceil` and above). N penalties and gap
/// penalties are flat; a gap costs `open` for its first character and
/// `extend` for each additional character.
#[derive(Debug, Clone)]
pub struct Penalties {
    pub mm_max: i32,    // mismatch penalty at or above qual_ceil
    pub mm_min: i32,    // mismatch penalty at quality 0
    pub n_pen: i32,     // penalty for a position involving an N
    pub gap_open: i32,  // first character of a gap
    pub gap_extend: i32, // each subsequent gap character
    pub qual_ceil: u8,  // quality at which mm() saturates
}

impl Default for Penalties {
    fn default() -> Self {
        Penalties {
            mm_max: 30,
            mm_min: 10,
            n_pen: 1,
            gap_open: 40,
            gap_extend: 15,
            qual_ceil: 40,
        }
    }
}

impl Penalties {
    /// Flat tables, mostly useful in tests and small drivers.
    pub fn simple(mm: i32, n: i32, gap_open: i32, gap_extend: i32) -> Self {
        Penalties {
            mm_max: mm,
            mm_min: mm,
            n_pen: n,
            gap_open,
            gap_extend,
            qual_ceil: 40,
        }
    }

    /// Penalty for a mismatch at a base of quality `q`.
    #[inline]
    pub fn mm(&self, q: u8) -> i32 {
        let q = q.min(self.qual_ceil) as i32;
        let ceil = self.qual_ceil.max(1) as i32;
        self.mm_min + (self.mm_max - self.mm_min) * q / ceil
    }

    /// Penalty for a position where the read base is N.
    #[inline]
    pub fn n(&self, _q: u8) -> i32 {
        self.n_pen
    }

    /// Penalty for an insertion; `ex` is 0 for a gap open, otherwise the
    /// number of gap characters already in the run.
    #[inline]
    pub fn ins(&self, ex: u32) -> i32 {
        if ex == 0 { self.gap_open } else { self.gap_extend }
    }

    /// Penalty for a deletion; same open/extend convention as `ins`.
    #[inline]
    pub fn del(&self, ex: u32) -> i32 {
        if ex == 0 { self.gap_open } else { self.gap_extend }
    }
}
