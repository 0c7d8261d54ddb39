use std::fs::File;
use std::path::Path;

use log::{debug, info, warn};
use memmap::MmapOptions;

use crate::kmers::errors::{KmerBinError, KmerBinResult};
use crate::kmers::hash_table::{estimated_memory_bytes, KmerHashTable};
use crate::kmers::header::{read_header, HashHeader};

/// A hash reconstructed from disk together with the header it was read with.
pub struct LoadedHash {
    pub header: HashHeader,
    pub table: KmerHashTable,
}

/// Sequential cursor over fixed-size `(key, counter)` records in a byte region.
///
/// Each record is the key in `key_bytes` little-endian bytes followed by the
/// counter in `counter_bytes` little-endian bytes.
pub struct RecordReader<'a> {
    data: &'a [u8],
    pos: usize,
    key_bytes: usize,
    counter_bytes: usize,
}

impl<'a> RecordReader<'a> {
    pub fn new(data: &'a [u8], key_bytes: usize, counter_bytes: usize) -> Self {
        RecordReader {
            data,
            pos: 0,
            key_bytes,
            counter_bytes,
        }
    }

    fn record_bytes(&self) -> usize {
        self.key_bytes + self.counter_bytes
    }
}

impl Iterator for RecordReader<'_> {
    type Item = (u64, u64);

    fn next(&mut self) -> Option<Self::Item> {
        let end = self.pos + self.record_bytes();
        if end > self.data.len() {
            return None;
        }
        let record = &self.data[self.pos..end];
        self.pos = end;
        let (key, counter) = record.split_at(self.key_bytes);
        Some((le_u64(key), le_u64(counter)))
    }
}

#[inline]
fn le_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf[..bytes.len()].copy_from_slice(bytes);
    u64::from_le_bytes(buf)
}

/// Load a binary hash file into a freshly sized, finalized table.
///
/// * The table capacity is the next power of two ≥ twice the record count.
/// * A key seen twice in the record stream has its counters summed and is
///   reported with a warning.
pub fn load_hash(path: &Path, verbose: bool) -> KmerBinResult<LoadedHash> {
    let header = read_header(path)?;
    if verbose {
        info!("{}", header.describe());
    }
    header.validate_for_processing()?;

    let file = File::open(path).map_err(|source| KmerBinError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let map = unsafe { MmapOptions::new().map(&file)? };

    let offset = header.data_offset as usize;
    if offset > map.len() {
        return Err(KmerBinError::CorruptFile {
            path: path.to_path_buf(),
            msg: format!(
                "data offset {} lies beyond the end of the file ({} bytes)",
                offset,
                map.len()
            ),
        });
    }
    let data = &map[offset..];
    let key_bytes = header.key_bytes();
    let record_bytes = header.record_bytes();

    if data.len() % record_bytes != 0 {
        return Err(KmerBinError::CorruptFile {
            path: path.to_path_buf(),
            msg: format!(
                "size of database ({}) must be a multiple of the length of a record ({})",
                data.len(),
                record_bytes
            ),
        });
    }
    let n_records = data.len() / record_bytes;

    let table = KmerHashTable::new(
        n_records.saturating_mul(2),
        header.key_len_bits,
        header.val_len_bits,
        header.max_reprobe,
    )?;

    if verbose {
        info!(
            "Hash properties: data size {} bytes, k-mer length {}, key length {} bytes, \
             record size {}, {} records",
            data.len(),
            header.k(),
            key_bytes,
            record_bytes,
            n_records
        );
        let mem_mb = estimated_memory_bytes(
            header.key_len_bits,
            header.val_len_bits,
            header.max_reprobe,
            header.table_size,
        ) / 1_000_000
            + 1;
        info!("Approximate amount of RAM required for handling this hash (MB): {}", mem_mb);
    }

    let key_mask = table.spec().mask();
    let mut duplicates = 0u64;
    let records = RecordReader::new(data, key_bytes, header.counter_len_bytes as usize);
    for (index, (key, counter)) in records.enumerate() {
        if key & !key_mask != 0 {
            return Err(KmerBinError::CorruptFile {
                path: path.to_path_buf(),
                msg: format!(
                    "record {} holds key {:#x}, wider than {} bits",
                    index, key, header.key_len_bits
                ),
            });
        }
        if !table.insert_or_increment(key, counter)? {
            duplicates += 1;
        }
    }
    if duplicates > 0 {
        warn!(
            "{:?} contains {} duplicated keys; their counters were summed",
            path, duplicates
        );
    }
    table.finalize();
    debug!(
        "Loaded {} records from {:?} into a table of {} slots",
        n_records,
        path,
        table.capacity()
    );

    Ok(LoadedHash { header, table })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_reader_stops_at_partial_record() {
        // key 2 bytes + counter 1 byte; 7 bytes hold two full records
        let data = [0x01, 0x02, 0x05, 0xff, 0x00, 0x07, 0xaa];
        let records: Vec<_> = RecordReader::new(&data, 2, 1).collect();
        assert_eq!(records, vec![(0x0201, 5), (0x00ff, 7)]);
    }
}
