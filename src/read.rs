// seedalign/src/read.rs
//
// Sequencing reads and FASTQ ingestion.  Reads carry 0..4-coded bases and
// decoded (Phred+33) qualities; the reverse-complement orientation is
// derived on demand rather than stored.

use std::fs::File;
use std::io::{self, BufReader, Read as IoRead};
use std::path::Path;

use flate2::read::MultiGzDecoder;

use crate::dna::{comp, decode_seq, encode_seq};

/// One read: name, coded bases, 0-based quality values.
#[derive(Debug, Clone)]
pub struct Read {
    pub name: String,
    pub seq: Vec<u8>,
    pub qual: Vec<u8>,
}

impl Read {
    /// Decode from ASCII sequence and Phred+33 quality string.  A missing
    /// or short quality string pads with a default.
    pub fn from_ascii(name: &str, seq: &[u8], qual: &[u8]) -> Self {
        let codes = encode_seq(seq);
        let mut quals: Vec<u8> = qual.iter().map(|&q| q.saturating_sub(33)).collect();
        quals.resize(codes.len(), 30);
        Read {
            name: name.to_string(),
            seq: codes,
            qual: quals,
        }
    }

    pub fn len(&self) -> usize {
        self.seq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }

    /// Base at `i` of the chosen orientation; the reverse complement is
    /// indexed from its own 5' end.
    #[inline]
    pub fn base(&self, i: usize, fw: bool) -> u8 {
        if fw {
            self.seq[i]
        } else {
            comp(self.seq[self.seq.len() - 1 - i])
        }
    }

    /// Quality at `i` of the chosen orientation.
    #[inline]
    pub fn quality(&self, i: usize, fw: bool) -> u8 {
        if fw {
            self.qual[i]
        } else {
            self.qual[self.qual.len() - 1 - i]
        }
    }

    /// ASCII rendering of the forward sequence.
    pub fn seq_ascii(&self) -> String {
        decode_seq(&self.seq)
    }

    /// ASCII rendering of the quality string (Phred+33).
    pub fn qual_ascii(&self) -> String {
        self.qual.iter().map(|&q| (q + 33) as char).collect()
    }
}

/// Open a FASTQ file, transparently decompressing `.gz`.
fn open_reads(path: &Path) -> io::Result<Box<dyn IoRead + Send>> {
    let f = File::open(path)?;
    if path.extension().is_some_and(|e| e == "gz") {
        Ok(Box::new(MultiGzDecoder::new(f)))
    } else {
        Ok(Box::new(f))
    }
}

/// Streaming FASTQ source producing batches of decoded reads.
pub struct FastqSource {
    records: bio::io::fastq::Records<BufReader<Box<dyn IoRead + Send>>>,
}

impl FastqSource {
    pub fn open(path: &Path) -> io::Result<Self> {
        let inner = open_reads(path)?;
        let reader = bio::io::fastq::Reader::new(inner);
        Ok(FastqSource {
            records: reader.records(),
        })
    }

    /// Up to `batch_size` reads; `None` at end of input.
    pub fn next_batch(&mut self, batch_size: usize) -> io::Result<Option<Vec<Read>>> {
        let mut batch = Vec::with_capacity(batch_size);
        for rec in self.records.by_ref() {
            let rec = rec.map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            batch.push(Read::from_ascii(rec.id(), rec.seq(), rec.qual()));
            if batch.len() == batch_size {
                break;
            }
        }
        if batch.is_empty() {
            Ok(None)
        } else {
            Ok(Some(batch))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_ascii_decodes() {
        let r = Read::from_ascii("r1", b"ACGTN", b"IIII#");
        assert_eq!(r.seq, vec![0, 1, 2, 3, 4]);
        assert_eq!(r.qual, vec![40, 40, 40, 40, 2]);
        assert_eq!(r.seq_ascii(), "ACGTN");
    }

    #[test]
    fn test_orientation_involution() {
        let r = Read::from_ascii("r1", b"AACGT", b"IIIII");
        let fw: Vec<u8> = (0..r.len()).map(|i| r.base(i, true)).collect();
        let rc: Vec<u8> = (0..r.len()).map(|i| r.base(i, false)).collect();
        assert_eq!(crate::dna::revcomp(&rc), fw);
        assert_eq!(rc, encode_seq(b"ACGTT"));
    }

    #[test]
    fn test_short_qual_padded() {
        let r = Read::from_ascii("r1", b"ACGT", b"II");
        assert_eq!(r.qual.len(), 4);
        assert_eq!(r.qual[3], 30);
    }
}
