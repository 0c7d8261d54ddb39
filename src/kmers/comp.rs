use log::info;

use crate::cli::counters::CompCounters;
use crate::cli::BigCount;
use crate::kmers::binning::{coverage_bin, CoverageScale};
use crate::kmers::classify::{Category, ClassificationCounters};
use crate::kmers::errors::{KmerBinError, KmerBinResult};
use crate::kmers::hash_table::KmerHashTable;
use crate::kmers::sparse_matrix::{SparseMatrix, ThreadedSparseMatrix};

/// Settings for comparing k-mer hashes
#[derive(Debug, Clone)]
pub struct CompConfig {
    pub threads: usize,
    /// Scale and bins for the first dataset's coverage (main matrix rows,
    /// category matrix columns)
    pub d1_scale: f64,
    pub d1_bins: usize,
    /// Scale and bins for the second dataset's coverage (main matrix columns)
    pub d2_scale: f64,
    pub d2_bins: usize,
    /// Minimum count in every dataset for a shared k-mer to be "above"
    pub threshold: BigCount,
}

impl Default for CompConfig {
    fn default() -> Self {
        CompConfig {
            threads: 1,
            d1_scale: 1.0,
            d1_bins: 1001,
            d2_scale: 1.0,
            d2_bins: 1001,
            threshold: 1,
        }
    }
}

/// Matrices and statistics from a comparison
#[derive(Debug, Clone)]
pub struct CompResult {
    /// First-dataset coverage × second-dataset coverage, distinct k-mers
    pub main: SparseMatrix,
    /// Category × combined coverage, distinct k-mers
    pub categories: SparseMatrix,
    pub counters: CompCounters,
}

/// Compare two or more hashes of the same k.
///
/// Every k-mer of the union is visited exactly once: worker `t` scans slot
/// range `t` of each dataset in turn and skips keys already owned by an
/// earlier dataset.
pub fn comp(datasets: &[&KmerHashTable], config: &CompConfig) -> KmerBinResult<CompResult> {
    if datasets.len() < 2 {
        return Err(KmerBinError::Config(format!(
            "comparison needs at least two hashes, got {}",
            datasets.len()
        )));
    }
    let key_len = datasets[0].key_len_bits();
    for d in datasets {
        d.ensure_finalized()?;
        if d.key_len_bits() != key_len {
            return Err(KmerBinError::Config(format!(
                "cannot compare hashes with key lengths of {} and {} bits",
                key_len,
                d.key_len_bits()
            )));
        }
    }

    let n = datasets.len();
    let threads = config.threads.max(1);
    let shards: Vec<_> = datasets.iter().map(|d| d.shards(threads)).collect();
    let d1 = CoverageScale::Linear(config.d1_scale);
    let d2 = CoverageScale::Linear(config.d2_scale);

    let main_dims = (config.d1_bins.max(1), config.d2_bins.max(1));
    let mut cat_mx = ThreadedSparseMatrix::new(Category::count(n), config.d1_bins.max(1), threads);

    // The category matrix is the threaded one; each worker also builds a
    // private main matrix and returns it alongside its statistics.
    let per_thread: Vec<(CompCounters, SparseMatrix)> =
        cat_mx.run_workers(|th_id, cat| -> KmerBinResult<_> {
            let mut counters = CompCounters::new(n);
            let mut main = SparseMatrix::new(main_dims.0, main_dims.1);
            let cat_cols = cat.cols();
            for_each_union_kmer(datasets, &shards, th_id, |cc| {
                counters.record(cc);
                if let Some(row) = cc.classify(config.threshold).index(n) {
                    cat.increment(row, coverage_bin(cc.total() as f64, d1, cat_cols), 1);
                }
                main.increment(
                    coverage_bin(cc.counts[0] as f64, d1, main_dims.0),
                    coverage_bin(cc.counts[1] as f64, d2, main_dims.1),
                    1,
                );
            });
            Ok((counters, main))
        })?;

    let mut counters = CompCounters::new(n);
    let mut main = SparseMatrix::new(main_dims.0, main_dims.1);
    for (c, mx) in per_thread {
        counters += c;
        main.merge(&mx);
    }
    info!(
        "Compared {} hashes: {} distinct k-mers in the union, {} shared",
        n, counters.union_distinct, counters.shared_distinct
    );

    Ok(CompResult {
        main,
        categories: cat_mx.merge_all(),
        counters,
    })
}

/// Visit every union k-mer owned by worker `th_id`.
fn for_each_union_kmer<F>(
    datasets: &[&KmerHashTable],
    shards: &[Vec<std::ops::Range<usize>>],
    th_id: usize,
    mut f: F,
) where
    F: FnMut(&ClassificationCounters),
{
    for (d, table) in datasets.iter().enumerate() {
        let Some(range) = shards[d].get(th_id) else {
            continue;
        };
        for (key, _) in table.entries_in(range.clone()) {
            if datasets[..d].iter().any(|earlier| earlier.get(key).is_some()) {
                continue;
            }
            f(&ClassificationCounters::lookup(key, datasets));
        }
    }
}
