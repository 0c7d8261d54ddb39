use std::path::PathBuf;

use log::info;

use crate::cli::counters::SectCounters;
use crate::kmers::binning::{coverage_bin, fraction_bin, CoverageScale};
use crate::kmers::chunks::{SequenceChunks, DEFAULT_RECORDS_PER_CHUNK};
use crate::kmers::errors::{KmerBinError, KmerBinResult};
use crate::kmers::gc::gc_fraction;
use crate::kmers::hash_table::KmerHashTable;
use crate::kmers::sparse_matrix::{SparseMatrix, ThreadedSparseMatrix};

/// Settings for per-sequence coverage estimation
#[derive(Debug, Clone)]
pub struct SectConfig {
    pub threads: usize,
    pub gc_bins: usize,
    pub cvg_bins: usize,
    /// Compress coverage with log10 instead of the linear ×0.1 scale
    pub log_scale: bool,
    /// Look up canonical k-mers; must match how the hash was counted
    pub canonical: bool,
    /// Use the median rather than the mean k-mer coverage of a sequence
    pub median: bool,
    /// Keep one `SequenceCoverage` row per input sequence
    pub per_sequence: bool,
    pub records_per_chunk: usize,
}

impl Default for SectConfig {
    fn default() -> Self {
        SectConfig {
            threads: 1,
            gc_bins: 1001,
            cvg_bins: 1001,
            log_scale: false,
            canonical: false,
            median: false,
            per_sequence: true,
            records_per_chunk: DEFAULT_RECORDS_PER_CHUNK,
        }
    }
}

/// Coverage estimate of one input sequence
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceCoverage {
    pub name: String,
    pub length: usize,
    /// Mean or median k-mer count; 0 when the sequence has no valid k-mer
    pub coverage: f64,
    /// GC fraction over unambiguous bases
    pub gc: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct SectResult {
    /// GC% bin × coverage bin, weighted by sequence length in bases
    pub matrix: SparseMatrix,
    /// One row per sequence, in input order (files, then records). Empty
    /// unless `SectConfig::per_sequence` is set.
    pub sequences: Vec<SequenceCoverage>,
    pub counters: SectCounters,
}

/// Estimate the k-mer coverage of every sequence in `paths` from `table` and
/// bin each sequence by GC fraction and average coverage.
///
/// k-mers containing non-ACGT bases are ignored; sequences without any valid
/// k-mer are counted but not binned, and report a coverage of 0.
pub fn sect(paths: &[PathBuf], table: &KmerHashTable, config: &SectConfig) -> KmerBinResult<SectResult> {
    if paths.is_empty() {
        return Err(KmerBinError::Config("no sequence files given".to_string()));
    }
    table.ensure_finalized()?;
    let spec = *table.spec();
    let threads = config.threads.max(1);
    let scale = CoverageScale::for_sequences(config.log_scale);
    let chunks = SequenceChunks::new(paths, threads.min(paths.len()), config.records_per_chunk);

    let mut sect_mx = ThreadedSparseMatrix::new(config.gc_bins.max(1), config.cvg_bins.max(1), threads);
    let per_thread = sect_mx.run_workers(|_, mx| -> KmerBinResult<_> {
        let (rows, cols) = (mx.rows(), mx.cols());
        let mut counters = SectCounters::default();
        let mut rows_out: Vec<((usize, u64), SequenceCoverage)> = Vec::new();
        let mut coverages: Vec<u64> = Vec::new();
        loop {
            let chunk = match chunks.next_chunk() {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(e) => {
                    chunks.abort();
                    return Err(e);
                }
            };
            for (i, rec) in chunk.records.iter().enumerate() {
                let seq = &rec.seq;
                counters.records += 1;
                coverages.clear();
                for (_, code) in spec.kmers(seq) {
                    let key = if config.canonical {
                        spec.canonical(code)
                    } else {
                        code
                    };
                    coverages.push(table.get(key).unwrap_or(0));
                }
                let gc = gc_fraction(seq);
                let order = (chunk.source_index, chunk.first_record + i as u64);
                if coverages.is_empty() {
                    counters.no_kmers += 1;
                    if config.per_sequence {
                        rows_out.push((order, sequence_row(rec.name(), seq.len(), 0.0, gc)));
                    }
                    continue;
                }
                counters.kmers += coverages.len() as u64;
                counters.zero_coverage += coverages.iter().filter(|&&c| c == 0).count() as u64;

                let average = if config.median {
                    median(&mut coverages)
                } else {
                    coverages.iter().sum::<u64>() as f64 / coverages.len() as f64
                };
                mx.increment(
                    fraction_bin(gc.unwrap_or(0.0), rows),
                    coverage_bin(average, scale, cols),
                    seq.len() as u64,
                );
                counters.binned += 1;
                if config.per_sequence {
                    rows_out.push((order, sequence_row(rec.name(), seq.len(), average, gc)));
                }
            }
        }
        Ok((counters, rows_out))
    })?;

    let mut counters = SectCounters::default();
    let mut ordered = Vec::new();
    for (c, rows_out) in per_thread {
        counters += c;
        ordered.extend(rows_out);
    }
    ordered.sort_unstable_by_key(|(order, _)| *order);
    info!(
        "Estimated coverage for {} of {} sequences ({} without valid k-mers)",
        counters.binned, counters.records, counters.no_kmers
    );
    Ok(SectResult {
        matrix: sect_mx.merge_all(),
        sequences: ordered.into_iter().map(|(_, row)| row).collect(),
        counters,
    })
}

fn sequence_row(name: String, length: usize, coverage: f64, gc: Option<f64>) -> SequenceCoverage {
    SequenceCoverage {
        name,
        length,
        coverage,
        gc,
    }
}

/// Median of a non-empty slice; the mean of the two middle values when even.
fn median(values: &mut [u64]) -> f64 {
    values.sort_unstable();
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) as f64 / 2.0
    } else {
        values[mid] as f64
    }
}

#[cfg(test)]
mod tests {
    use super::median;

    #[test]
    fn median_of_odd_and_even() {
        assert_eq!(median(&mut [5, 1, 3]), 3.0);
        assert_eq!(median(&mut [4, 1, 3, 2]), 2.5);
    }
}
