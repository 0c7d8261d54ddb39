use std::path::PathBuf;
use std::thread;

use log::{debug, info};

use crate::cli::counters::CountingCounters;
use crate::kmers::chunks::{SequenceChunks, DEFAULT_RECORDS_PER_CHUNK};
use crate::kmers::errors::{KmerBinError, KmerBinResult};
use crate::kmers::hash_table::KmerHashTable;
use crate::kmers::kmer_codec::KmerSpec;

/// Length of the leading barcode + linker region of a tagged (10x) read.
pub const TAG_REGION_LEN: usize = 23;

/// Settings for one counting pass
#[derive(Debug, Clone)]
pub struct CountConfig {
    /// Collapse each k-mer with its reverse complement
    pub canonical: bool,
    /// Skip the leading tag region of every record
    pub tagged: bool,
    pub threads: usize,
    pub records_per_chunk: usize,
}

impl Default for CountConfig {
    fn default() -> Self {
        CountConfig {
            canonical: false,
            tagged: false,
            threads: 1,
            records_per_chunk: DEFAULT_RECORDS_PER_CHUNK,
        }
    }
}

/// Count k-mers of every input into the shared `table`.
///
/// * k is taken from the table's key width.
/// * At most `min(paths.len(), threads)` inputs are read concurrently.
/// * `threads` workers run `count_slice`; the table is finalized once all
///   of them have joined.
///
/// The first worker error aborts the pass and is returned.
pub fn count_sequence_files(
    paths: &[PathBuf],
    table: &KmerHashTable,
    config: &CountConfig,
) -> KmerBinResult<CountingCounters> {
    if paths.is_empty() {
        return Err(KmerBinError::Config("no sequence files to count".to_string()));
    }
    let threads = config.threads.max(1);
    let spec = *table.spec();
    let chunks = SequenceChunks::new(paths, threads.min(paths.len()), config.records_per_chunk);
    info!(
        "Counting {}-mers in {} file(s) with {} thread(s) over {} stream(s)",
        spec.k(),
        paths.len(),
        threads,
        chunks.n_streams()
    );

    let results: Vec<KmerBinResult<CountingCounters>> = thread::scope(|s| {
        let handles: Vec<_> = (0..threads)
            .map(|th_id| {
                let chunks = &chunks;
                s.spawn(move || {
                    let out = count_slice(table, chunks, &spec, config);
                    if out.is_err() {
                        chunks.abort();
                    }
                    debug!("Counting worker {} done", th_id);
                    out
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
            .collect()
    });

    let mut total = CountingCounters::default();
    for res in results {
        total += res?;
    }
    table.finalize();
    info!(
        "Counted {} k-mers from {} records ({} distinct)",
        total.counted,
        total.records,
        table.distinct()
    );
    Ok(total)
}

/// Worker loop: pull chunks until the stream is exhausted and add every
/// k-mer to `table` with a count of one.
pub fn count_slice(
    table: &KmerHashTable,
    chunks: &SequenceChunks,
    spec: &KmerSpec,
    config: &CountConfig,
) -> KmerBinResult<CountingCounters> {
    let mut counters = CountingCounters::default();
    while let Some(chunk) = chunks.next_chunk()? {
        for rec in &chunk.records {
            counters.records += 1;
            counters.bases += rec.seq.len() as u64;

            let seq: &[u8] = if config.tagged {
                &rec.seq[TAG_REGION_LEN.min(rec.seq.len())..]
            } else {
                &rec.seq
            };
            if seq.len() < spec.k() {
                counters.too_short += 1;
                continue;
            }

            let windows = (seq.len() - spec.k() + 1) as u64;
            let mut valid = 0u64;
            for (_, code) in spec.kmers(seq) {
                let key = if config.canonical {
                    spec.canonical(code)
                } else {
                    code
                };
                table.insert_or_increment(key, 1)?;
                valid += 1;
            }
            counters.counted += valid;
            counters.ambiguous += windows - valid;
        }
    }
    Ok(counters)
}
