use anyhow::{bail, Context, Result};
use clap::Parser;
use kmerbin::cli::commands::{Cli, Command, CompCmd, CountCmd, GcpCmd, InfoCmd, SectCmd};
use kmerbin::cli::counters::CompCounters;
use kmerbin::cli::io::{load_or_count, spinner, write_matrix};
use kmerbin::cli::opts::IOArgs;
use kmerbin::kmers::classify::Category;
use kmerbin::kmers::comp::{comp, CompConfig};
use kmerbin::kmers::gcp::{gcp, GcpConfig};
use kmerbin::kmers::hash_table::{estimated_memory_bytes, KmerHashTable};
use kmerbin::kmers::header::read_header;
use kmerbin::kmers::read::load_hash;
use kmerbin::kmers::sect::{sect, SectConfig};
use kmerbin::kmers::sparse_matrix::SparseMatrix;
use kmerbin::kmers::write::write_sequence_coverage;
use std::{
    fs::{create_dir_all, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    time::Instant,
};

fn main() {
    // Catch and handle errors
    if let Err(e) = run() {
        eprintln!("{:?}", e);
        std::process::exit(1);
    }
    std::process::exit(0);
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .try_init();
}

fn run() -> Result<()> {
    let start_time = Instant::now();
    let cmdline: Vec<String> = std::env::args().collect();
    let opt = Cli::parse();

    match &opt.command {
        Command::Count(cmd) => run_count(cmd, &cmdline)?,
        Command::Gcp(cmd) => run_gcp(cmd, &cmdline)?,
        Command::Comp(cmd) => run_comp(cmd)?,
        Command::Sect(cmd) => run_sect(cmd, &cmdline)?,
        Command::Info(cmd) => run_info(cmd)?,
    }

    let elapsed = start_time.elapsed();
    println!("Elapsed time: {:.2?}", elapsed);
    Ok(())
}

fn prepare_output(io: &IOArgs) -> Result<()> {
    init_logging(io.verbose);
    create_dir_all(&io.output_dir).context("Cannot create output_dir")?;
    Ok(())
}

fn run_count(cmd: &CountCmd, cmdline: &[String]) -> Result<()> {
    prepare_output(&cmd.io)?;
    if cmd.hash.seqs.is_none() || cmd.hash.dump_hash.is_none() {
        bail!("count needs --seqs and --dump-hash");
    }
    let source = load_or_count(&cmd.hash, cmd.io.n_threads as usize, cmd.io.verbose, cmdline)?;
    if let Some(c) = &source.counters {
        println!(
            "Counted {} k-mers ({} distinct) from {} records",
            c.counted,
            source.table.distinct(),
            c.records
        );
    }
    Ok(())
}

fn run_gcp(cmd: &GcpCmd, cmdline: &[String]) -> Result<()> {
    prepare_output(&cmd.io)?;
    let source = load_or_count(&cmd.hash, cmd.io.n_threads as usize, cmd.io.verbose, cmdline)?;

    println!("Start: Binning k-mers by GC and coverage");
    let config = GcpConfig {
        threads: cmd.io.n_threads as usize,
        cvg_bins: cmd.cvg.cvg_bins as usize,
        cvg_scale: cmd.cvg.cvg_scale,
    };
    let pb = spinner("Binning");
    let matrix = gcp(&source.table, &config);
    pb.finish_with_message("| Finished binning");
    let matrix = matrix.context("building GC x coverage matrix")?;

    println!("Start: Writing matrix to disk");
    write_matrix(&matrix, &cmd.io.output_dir, "gcp", &cmd.out)
}

fn run_comp(cmd: &CompCmd) -> Result<()> {
    if cmd.hashes.len() < 2 {
        bail!("comp needs at least two hashes, got {}", cmd.hashes.len());
    }
    prepare_output(&cmd.io)?;

    println!("Start: Loading {} hashes", cmd.hashes.len());
    let mut tables: Vec<KmerHashTable> = Vec::with_capacity(cmd.hashes.len());
    for path in &cmd.hashes {
        let loaded = load_hash(path, cmd.io.verbose).context(format!("loading hash {:?}", path))?;
        tables.push(loaded.table);
    }
    let datasets: Vec<&KmerHashTable> = tables.iter().collect();

    println!("Start: Comparing hashes");
    let config = CompConfig {
        threads: cmd.io.n_threads as usize,
        d1_scale: cmd.d1.cvg_scale,
        d1_bins: cmd.d1.cvg_bins as usize,
        d2_scale: cmd.d2_scale,
        d2_bins: cmd.d2_bins as usize,
        threshold: cmd.threshold,
    };
    let pb = spinner("Comparing");
    let result = comp(&datasets, &config);
    pb.finish_with_message("| Finished comparing");
    let result = result.context("comparing hashes")?;

    println!("Start: Writing matrices to disk");
    write_matrix(&result.main, &cmd.io.output_dir, "comp_main", &cmd.out)?;
    write_matrix(&result.categories, &cmd.io.output_dir, "comp_categories", &cmd.out)?;
    write_comp_stats(
        &result.counters,
        &result.categories,
        &cmd.hashes,
        &cmd.io.output_dir.join(format!("{}_comp_stats.tsv", cmd.out.prefix)),
    )
}

fn write_comp_stats(
    counters: &CompCounters,
    categories: &SparseMatrix,
    hashes: &[PathBuf],
    path: &Path,
) -> Result<()> {
    let mut w = BufWriter::new(File::create(path).context("Create stats file fail")?);
    writeln!(w, "stat\tvalue").context("Write stats line fail")?;
    for (i, hash) in hashes.iter().enumerate() {
        writeln!(w, "distinct_{}\t{}", i + 1, counters.distinct[i])?;
        writeln!(w, "total_{}\t{}", i + 1, counters.total[i])?;
        writeln!(w, "shared_total_{}\t{}", i + 1, counters.shared_total[i])?;
        writeln!(w, "path_{}\t{}", i + 1, hash.display())?;
    }
    writeln!(w, "shared_distinct\t{}", counters.shared_distinct)?;
    writeln!(w, "union_distinct\t{}", counters.union_distinct)?;

    let n = hashes.len();
    let mut cats: Vec<Category> = (0..n).map(Category::Only).collect();
    cats.extend([
        Category::SharedAboveThreshold,
        Category::SharedBelowThreshold,
        Category::Partial,
    ]);
    for cat in cats {
        if let Some(row) = cat.index(n) {
            writeln!(w, "{}\t{}", cat.label(), categories.row_sum(row))?;
        }
    }
    Ok(())
}

fn run_sect(cmd: &SectCmd, cmdline: &[String]) -> Result<()> {
    prepare_output(&cmd.io)?;
    let source = load_or_count(&cmd.hash, cmd.io.n_threads as usize, cmd.io.verbose, cmdline)?;

    println!("Start: Estimating per-sequence coverage");
    let config = SectConfig {
        threads: cmd.io.n_threads as usize,
        gc_bins: cmd.gc_bins as usize,
        cvg_bins: cmd.cvg_bins as usize,
        log_scale: cmd.log_scale,
        canonical: source.header.canonical,
        median: cmd.median,
        per_sequence: !cmd.no_count_stats,
        ..SectConfig::default()
    };
    let pb = spinner("Binning sequences");
    let result = sect(&cmd.sequences, &source.table, &config);
    pb.finish_with_message("| Finished binning");
    let result = result.context("binning sequences")?;

    println!(
        "Binned {} of {} sequences ({} without valid k-mers)",
        result.counters.binned, result.counters.records, result.counters.no_kmers
    );
    if !cmd.no_count_stats {
        println!("Start: Writing per-sequence coverage to disk");
        let path = cmd.io.output_dir.join(format!("{}_sect_stats.tsv", cmd.out.prefix));
        write_sequence_coverage(&result.sequences, &path)?;
    }
    println!("Start: Writing matrix to disk");
    write_matrix(&result.matrix, &cmd.io.output_dir, "sect", &cmd.out)
}

fn run_info(cmd: &InfoCmd) -> Result<()> {
    init_logging(false);
    let header = read_header(&cmd.hash).context(format!("reading header of {:?}", cmd.hash))?;
    println!("{}", header.describe());
    let bytes = estimated_memory_bytes(
        header.key_len_bits,
        header.val_len_bits,
        header.max_reprobe,
        header.table_size,
    );
    println!(" - Estimated table memory: {} bytes", bytes);
    Ok(())
}
