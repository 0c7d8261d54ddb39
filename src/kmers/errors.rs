use std::io;
use std::path::PathBuf;
use std::result::Result as StdResult;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum KmerBinError {
    #[error("failed to load/read/write file: {0:?}")]
    Io(#[from] io::Error),
    #[error("failed to open {path:?}: {source}")]
    Open { path: PathBuf, source: io::Error },
    #[error("invalid hash header: {0}")]
    Format(String),
    #[error("unsupported hash format '{format}'. {guidance}")]
    UnsupportedFormat {
        format: String,
        guidance: &'static str,
    },
    #[error("corrupt hash file {path:?}: {msg}")]
    CorruptFile { path: PathBuf, msg: String },
    #[error(
        "hash table full: key {key:#x} found no free slot after {probes} probes \
         (capacity {capacity}). Rebuild with a larger hash size"
    )]
    Capacity {
        key: u64,
        capacity: usize,
        probes: usize,
    },
    #[error("malformed sequence record #{record} in {path:?}: {msg}")]
    MalformedRecord {
        path: PathBuf,
        record: u64,
        msg: String,
    },
    #[error("hash table is finalized and does not accept further writes")]
    Finalized,
    #[error("hash table must be finalized before it can be scanned or dumped")]
    NotFinalized,
    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type KmerBinResult<T> = StdResult<T, KmerBinError>;
