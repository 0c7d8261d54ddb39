use clap::{value_parser, ArgGroup, Args};
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct IOArgs {
    /// Output directory for results [path]
    #[clap(
        short = 'o',
        long,
        value_parser,
        required = true,
        help_heading = "Core"
    )]
    pub output_dir: PathBuf,

    /// Number of threads to use (increases RAM usage) [integer]
    #[clap(short = 't', long, default_value = "1", value_parser = value_parser!(u16).range(1..), help_heading = "Core")]
    pub n_threads: u16,

    /// Print the hash header and per-thread progress [flag]
    #[clap(short = 'v', long, help_heading = "Core")]
    pub verbose: bool,
}

/// Where the k-mer counts come from: an existing hash or sequences to count.
#[derive(Debug, Args)]
#[clap(group = ArgGroup::new("source").required(true).args(&["hash", "seqs"]).multiple(false))]
pub struct HashArgs {
    /// Existing binary k-mer hash [path]
    #[clap(long, value_parser, group = "source", help_heading = "Hash (select one)")]
    pub hash: Option<PathBuf>,

    /// FASTA/FASTQ files to count k-mers from (gzip accepted) [path]
    #[clap(long, value_parser, num_args = 1.., value_delimiter = ',', group = "source", help_heading = "Hash (select one)")]
    pub seqs: Option<Vec<PathBuf>>,

    /// K-mer length when counting [integer]
    #[clap(short = 'k', long, default_value = "31", value_parser = value_parser!(u8).range(1..33), help_heading = "Counting")]
    pub mer_len: u8,

    /// Initial hash size when counting; rounded up to a power of two [integer]
    #[clap(short = 's', long, default_value = "10000000", help_heading = "Counting")]
    pub hash_size: usize,

    /// Count each k-mer together with its reverse complement [flag]
    #[clap(short = 'c', long, help_heading = "Counting")]
    pub canonical: bool,

    /// Reads carry a 10x barcode + linker prefix that is not counted [flag]
    #[clap(long, help_heading = "Counting")]
    pub tagged: bool,

    /// Write the counted hash to this path [path]
    #[clap(long, value_parser, requires = "seqs", help_heading = "Counting")]
    pub dump_hash: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct CoverageBinArgs {
    /// Number of coverage bins [integer]
    #[clap(long, default_value = "1001", value_parser = value_parser!(u32).range(1..), help_heading = "Binning")]
    pub cvg_bins: u32,

    /// Factor applied to counts before binning [float]
    #[clap(long, default_value = "1.0", help_heading = "Binning")]
    pub cvg_scale: f64,
}

#[derive(Debug, Args)]
pub struct OutputArgs {
    /// Save matrices as sparse COO arrays (.npz) instead of dense .npy [flag]
    ///
    /// Load with `scipy.sparse.load_npz()`.
    #[clap(long, help_heading = "Output")]
    pub save_sparse: bool,

    /// Prefix for output file names [string]
    #[clap(long, default_value = "kmerbin", help_heading = "Output")]
    pub prefix: String,
}
