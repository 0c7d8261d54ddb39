use clap::{value_parser, Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::cli::opts::{CoverageBinArgs, HashArgs, IOArgs, OutputArgs};

/// Command-line options for k-mer hash binning
#[derive(Parser)]
#[command(
    name = "kmerbin",
    about = "Count k-mers and bin k-mer hashes by GC content and coverage",
    long_about = "Count k-mers and bin k-mer hashes by GC content and coverage.


EXAMPLES:
    // Count 31-mers from reads and keep the hash
    $ kmerbin count --seqs reads_1.fq.gz,reads_2.fq.gz --dump-hash reads.jf -o out/ -t 8

    // GC x coverage matrix of an existing hash
    $ kmerbin gcp --hash reads.jf -o out/ -t 8

    // Compare the spectra of two hashes
    $ kmerbin comp --hashes pe.jf,mp.jf -o out/ -t 8

    // Per-sequence coverage of an assembly
    $ kmerbin sect --hash reads.jf --sequences contigs.fa -o out/ -t 8
    ",
    version = "0.1.0"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Count k-mers into a hash and write it to disk
    Count(CountCmd),
    /// Bin distinct k-mers by GC count and coverage
    Gcp(GcpCmd),
    /// Compare two or more hashes
    Comp(CompCmd),
    /// Estimate the k-mer coverage of each sequence in a file
    Sect(SectCmd),
    /// Print a hash header and the memory a table of its size would need
    Info(InfoCmd),
}

#[derive(Args)]
pub struct CountCmd {
    #[command(flatten)]
    pub io: IOArgs,
    #[command(flatten)]
    pub hash: HashArgs,
}

#[derive(Args)]
pub struct GcpCmd {
    #[command(flatten)]
    pub io: IOArgs,
    #[command(flatten)]
    pub hash: HashArgs,
    #[command(flatten)]
    pub cvg: CoverageBinArgs,
    #[command(flatten)]
    pub out: OutputArgs,
}

#[derive(Args)]
pub struct CompCmd {
    #[command(flatten)]
    pub io: IOArgs,

    /// Binary k-mer hashes to compare, in order [path]
    ///
    /// Comma-separated or repeated; at least two are needed.
    #[clap(long, value_parser, num_args = 1.., value_delimiter = ',', required = true, help_heading = "Core")]
    pub hashes: Vec<PathBuf>,

    // Coverage bins of the first hash
    #[command(flatten)]
    pub d1: CoverageBinArgs,

    /// Factor applied to the second hash's counts [float]
    #[clap(long, default_value = "1.0", help_heading = "Binning")]
    pub d2_scale: f64,

    /// Number of coverage bins for the second hash [integer]
    #[clap(long, default_value = "1001", value_parser = value_parser!(u32).range(1..), help_heading = "Binning")]
    pub d2_bins: u32,

    /// Minimum count in every hash for a shared k-mer to be "above" [integer]
    #[clap(long, default_value = "1", help_heading = "Binning")]
    pub threshold: u64,

    #[command(flatten)]
    pub out: OutputArgs,
}

#[derive(Args)]
pub struct SectCmd {
    #[command(flatten)]
    pub io: IOArgs,
    #[command(flatten)]
    pub hash: HashArgs,

    /// FASTA/FASTQ files whose sequences are binned [path]
    #[clap(long, value_parser, num_args = 1.., value_delimiter = ',', required = true, help_heading = "Core")]
    pub sequences: Vec<PathBuf>,

    /// Number of GC% bins [integer]
    #[clap(long, default_value = "1001", value_parser = value_parser!(u32).range(1..), help_heading = "Binning")]
    pub gc_bins: u32,

    /// Number of coverage bins [integer]
    #[clap(long, default_value = "1001", value_parser = value_parser!(u32).range(1..), help_heading = "Binning")]
    pub cvg_bins: u32,

    /// Compress coverage with log10 instead of the linear x0.1 scale [flag]
    #[clap(long, help_heading = "Binning")]
    pub log_scale: bool,

    /// Use the median rather than the mean k-mer coverage [flag]
    #[clap(long, help_heading = "Binning")]
    pub median: bool,

    /// Skip the per-sequence coverage table [flag]
    ///
    /// Useful when the sequences are reads and the table would be huge.
    #[clap(short = 'n', long, help_heading = "Output")]
    pub no_count_stats: bool,

    #[command(flatten)]
    pub out: OutputArgs,
}

#[derive(Args)]
pub struct InfoCmd {
    /// Binary k-mer hash [path]
    #[clap(long, value_parser, required = true)]
    pub hash: PathBuf,
}
