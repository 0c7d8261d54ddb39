use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::Context;
use log::debug;
use ndarray::Array1;
use ndarray_npy::{write_npy, WriteNpyExt};
use rayon::prelude::*;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::kmers::errors::{KmerBinError, KmerBinResult};
use crate::kmers::hash_table::KmerHashTable;
use crate::kmers::header::{HashFormat, HashHeader};
use crate::kmers::sect::SequenceCoverage;
use crate::kmers::sparse_matrix::SparseMatrix;

/// Serialize every occupied entry of `table` into one binary hash file.
///
/// * `header` supplies the value width, counter width and metadata. Its k-mer
///   length must match the table's.
/// * `threads` sizes the pool that gathers and sorts entries; the file itself
///   is always written as a single contiguous stream.
///
/// Records are sorted by key, so the bytes written depend only on the table
/// contents. Counters wider than the header's counter width saturate.
pub fn dump_hash(
    table: &KmerHashTable,
    header: &HashHeader,
    threads: usize,
    output: &Path,
) -> KmerBinResult<()> {
    table.ensure_finalized()?;
    if header.key_len_bits != table.key_len_bits() {
        return Err(KmerBinError::Config(format!(
            "header key length ({} bits) does not match the table ({} bits)",
            header.key_len_bits,
            table.key_len_bits()
        )));
    }

    let mut header = header.clone();
    header.format = HashFormat::Binary;
    header.table_size = table.capacity() as u64;
    header.max_reprobe = table.max_reprobe();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads.max(1))
        .build()
        .map_err(|e| KmerBinError::Config(format!("building dump thread pool: {e}")))?;
    let shards = table.shards(threads);
    let entries: Vec<(u64, u64)> = pool.install(|| {
        let mut entries: Vec<(u64, u64)> = shards
            .par_iter()
            .flat_map_iter(|r| table.entries_in(r.clone()))
            .collect();
        entries.par_sort_unstable_by_key(|&(key, _)| key);
        entries
    });

    let key_bytes = header.key_bytes();
    let counter_bytes = header.counter_len_bytes as usize;
    let max_counter = if counter_bytes >= 8 {
        u64::MAX
    } else {
        (1u64 << (8 * counter_bytes)) - 1
    };

    let file = File::create(output).map_err(|source| KmerBinError::Open {
        path: output.to_path_buf(),
        source,
    })?;
    let mut writer = BufWriter::new(file);
    writer.write_all(&header.to_bytes()?)?;
    for &(key, count) in &entries {
        writer.write_all(&key.to_le_bytes()[..key_bytes])?;
        writer.write_all(&count.min(max_counter).to_le_bytes()[..counter_bytes])?;
    }
    writer.flush()?;

    debug!("Dumped {} records to {:?}", entries.len(), output);
    Ok(())
}

/// Write one space-separated line per sequence: name, coverage, GC fraction
/// and length. Rows keep the order of `sequences`.
pub fn write_sequence_coverage(sequences: &[SequenceCoverage], path: &Path) -> anyhow::Result<()> {
    let mut writer = BufWriter::new(File::create(path).context(format!("creating {:?}", path))?);
    writeln!(writer, "seq_name coverage gc seq_length").context("Write table header fail")?;
    for row in sequences {
        let gc = match row.gc {
            Some(gc) => format!("{:.5}", gc),
            None => "nan".to_string(),
        };
        writeln!(writer, "{} {:.5} {} {}", row.name, row.coverage, gc, row.length)
            .context("Write table line fail")?;
    }
    writer.flush().context(format!("finishing {:?}", path))?;
    Ok(())
}

/// Write the dense form of `matrix` as `<prefix>.npy`.
pub fn write_matrix_npy(matrix: &SparseMatrix, out_dir: &Path, prefix: &str) -> anyhow::Result<()> {
    let path = out_dir.join(format!("{}.npy", prefix));
    write_npy(&path, &matrix.to_dense()).context(format!("writing {:?}", path))?;
    Ok(())
}

/// Write `matrix` as a COO sparse archive `<prefix>.npz` holding the
/// `row`, `col`, `data` and `shape` arrays.
///
/// Large coverage ranges produce mostly-empty matrices, so this keeps
/// output size proportional to the number of non-zero cells.
pub fn write_matrix_npz(matrix: &SparseMatrix, out_dir: &Path, prefix: &str) -> anyhow::Result<()> {
    let path = out_dir.join(format!("{}.npz", prefix));
    let triplets = matrix.triplets();

    let row: Array1<u64> = triplets.iter().map(|&(r, _, _)| r as u64).collect();
    let col: Array1<u64> = triplets.iter().map(|&(_, c, _)| c as u64).collect();
    let data: Array1<u64> = triplets.iter().map(|&(_, _, v)| v).collect();
    let shape: Array1<u64> = Array1::from(vec![matrix.rows() as u64, matrix.cols() as u64]);

    let file = File::create(&path).context(format!("creating {:?}", path))?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    for (name, arr) in [("row", &row), ("col", &col), ("data", &data), ("shape", &shape)] {
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        zip.start_file(format!("{}.npy", name), options)
            .context(format!("adding {} to {:?}", name, path))?;
        arr.write_npy(&mut zip)
            .context(format!("writing {} to {:?}", name, path))?;
    }
    zip.finish().context(format!("finishing {:?}", path))?;
    Ok(())
}
