use log::info;

use crate::kmers::binning::{coverage_bin, CoverageScale};
use crate::kmers::errors::KmerBinResult;
use crate::kmers::hash_table::KmerHashTable;
use crate::kmers::sparse_matrix::{SparseMatrix, ThreadedSparseMatrix};

/// Settings for the GC × coverage pass
#[derive(Debug, Clone)]
pub struct GcpConfig {
    pub threads: usize,
    /// Number of coverage bins (matrix columns)
    pub cvg_bins: usize,
    /// Factor applied to each k-mer count before binning
    pub cvg_scale: f64,
}

impl Default for GcpConfig {
    fn default() -> Self {
        GcpConfig {
            threads: 1,
            cvg_bins: 1001,
            cvg_scale: 1.0,
        }
    }
}

/// Count distinct k-mers per (GC count, coverage) cell.
///
/// Rows are the number of G/C bases in the k-mer (`0..=k`), columns the
/// scaled count. Each worker scans one contiguous slot range of the table.
pub fn gcp(table: &KmerHashTable, config: &GcpConfig) -> KmerBinResult<SparseMatrix> {
    table.ensure_finalized()?;
    let spec = *table.spec();
    let scale = CoverageScale::Linear(config.cvg_scale);
    let shards = table.shards(config.threads);

    let mut gcp_mx = ThreadedSparseMatrix::new(spec.k() + 1, config.cvg_bins.max(1), shards.len());
    gcp_mx.run_workers(|th_id, mx| -> KmerBinResult<()> {
        let cols = mx.cols();
        for (key, count) in table.entries_in(shards[th_id].clone()) {
            let gc = spec.gc_count(key) as usize;
            mx.increment(gc, coverage_bin(count as f64, scale, cols), 1);
        }
        Ok(())
    })?;

    let merged = gcp_mx.merge_all();
    info!(
        "Binned {} distinct k-mers into a {}x{} GC/coverage matrix",
        merged.total(),
        merged.rows(),
        merged.cols()
    );
    Ok(merged)
}
