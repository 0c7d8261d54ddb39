use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

use crate::cli::counters::CountingCounters;
use crate::cli::opts::{HashArgs, OutputArgs};
use crate::kmers::counting::{count_sequence_files, CountConfig};
use crate::kmers::hash_table::KmerHashTable;
use crate::kmers::header::HashHeader;
use crate::kmers::kmer_codec::KmerSpec;
use crate::kmers::read::load_hash;
use crate::kmers::sparse_matrix::SparseMatrix;
use crate::kmers::write::{dump_hash, write_matrix_npy, write_matrix_npz};

/// Value width recorded for freshly counted hashes.
pub const COUNTED_VAL_LEN_BITS: u32 = 7;
/// Counter width of dumped records.
pub const COUNTED_COUNTER_LEN_BYTES: u32 = 4;
pub const COUNTED_MAX_REPROBE: u32 = 126;

/// A k-mer table plus the header describing it
pub struct HashSource {
    pub header: HashHeader,
    pub table: KmerHashTable,
    /// Present when the table was counted rather than loaded
    pub counters: Option<CountingCounters>,
}

/// Spinner shown while a single long step runs.
pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("       {spinner} [{elapsed_precise}] {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(200));
    pb
}

/// Load `--hash`, or count `--seqs` into a new table (and dump it when
/// `--dump-hash` is given).
pub fn load_or_count(args: &HashArgs, n_threads: usize, verbose: bool, cmdline: &[String]) -> Result<HashSource> {
    if let Some(path) = &args.hash {
        println!("Start: Loading hash {:?}", path);
        let loaded = load_hash(path, verbose).context(format!("loading hash {:?}", path))?;
        return Ok(HashSource {
            header: loaded.header,
            table: loaded.table,
            counters: None,
        });
    }

    let seqs = args
        .seqs
        .as_deref()
        .context("either --hash or --seqs must be given")?;
    let spec = KmerSpec::new(args.mer_len as usize)?;
    let table = KmerHashTable::new(
        args.hash_size,
        spec.key_len_bits(),
        COUNTED_VAL_LEN_BITS,
        COUNTED_MAX_REPROBE,
    )?;
    let config = CountConfig {
        canonical: args.canonical,
        tagged: args.tagged,
        threads: n_threads,
        ..CountConfig::default()
    };

    println!("Start: Counting {}-mers", spec.k());
    let pb = spinner("Counting");
    let counted = count_sequence_files(seqs, &table, &config);
    pb.finish_with_message("| Finished counting");
    let counters = counted.context("counting k-mers")?;

    let mut header = HashHeader::binary(
        &spec,
        COUNTED_VAL_LEN_BITS,
        COUNTED_COUNTER_LEN_BYTES,
        COUNTED_MAX_REPROBE,
        table.capacity() as u64,
        args.canonical,
    );
    header.cmdline = cmdline.to_vec();

    if let Some(out) = &args.dump_hash {
        println!("Start: Writing hash to {:?}", out);
        dump_hash(&table, &header, n_threads, out).context(format!("dumping hash to {:?}", out))?;
    }
    Ok(HashSource {
        header,
        table,
        counters: Some(counters),
    })
}

/// Write a matrix in the format requested on the command line.
pub fn write_matrix(matrix: &SparseMatrix, out_dir: &Path, name: &str, opts: &OutputArgs) -> Result<()> {
    let prefix = format!("{}_{}", opts.prefix, name);
    if opts.save_sparse {
        write_matrix_npz(matrix, out_dir, &prefix)
    } else {
        write_matrix_npy(matrix, out_dir, &prefix)
    }
}
