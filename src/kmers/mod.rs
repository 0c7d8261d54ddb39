pub mod binning;
pub mod chunks;
pub mod classify;
pub mod comp;
pub mod counting;
pub mod errors;
pub mod gc;
pub mod gcp;
pub mod hash_table;
pub mod header;
pub mod kmer_codec;
pub mod read;
pub mod sect;
pub mod sparse_matrix;
pub mod write;
