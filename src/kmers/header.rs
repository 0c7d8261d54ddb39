use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::kmers::errors::{KmerBinError, KmerBinResult};
use crate::kmers::kmer_codec::KmerSpec;

/// Width of the ASCII decimal length prefix in front of the JSON header.
const LEN_PREFIX: usize = 9;
/// The data region starts on a multiple of this many bytes.
const ALIGNMENT: usize = 8;

/// Serialization format recorded in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashFormat {
    Binary,
    Text,
    Bloom,
}

impl HashFormat {
    fn parse(tag: &str) -> Option<Self> {
        match tag {
            "binary/sorted" | "binary" => Some(HashFormat::Binary),
            "text/sorted" | "text" => Some(HashFormat::Text),
            "bloomcounter" | "bloom" => Some(HashFormat::Bloom),
            _ => None,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            HashFormat::Binary => "binary/sorted",
            HashFormat::Text => "text/sorted",
            HashFormat::Bloom => "bloomcounter",
        }
    }
}

/// Metadata block at the start of a hash file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashHeader {
    pub format: HashFormat,
    pub key_len_bits: u32,
    pub val_len_bits: u32,
    pub counter_len_bytes: u32,
    pub num_hashes: u32,
    pub max_reprobe: u32,
    pub max_reprobe_offset: u64,
    pub data_offset: u64,
    pub table_size: u64,
    pub canonical: bool,
    pub cmdline: Vec<String>,
}

/// On-disk JSON shape, field names as written by jellyfish-compatible tools.
#[derive(Debug, Serialize, Deserialize)]
struct RawHeader {
    format: String,
    key_len: u32,
    val_len: u32,
    counter_len: u32,
    #[serde(default = "one")]
    nb_hashes: u32,
    max_reprobe: u32,
    #[serde(default)]
    max_reprobe_offset: u64,
    size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    offset: Option<u64>,
    #[serde(default)]
    canonical: bool,
    #[serde(default)]
    cmdline: Vec<String>,
}

fn one() -> u32 {
    1
}

impl HashHeader {
    /// A binary-format header for a freshly counted table.
    pub fn binary(
        spec: &KmerSpec,
        val_len_bits: u32,
        counter_len_bytes: u32,
        max_reprobe: u32,
        table_size: u64,
        canonical: bool,
    ) -> Self {
        HashHeader {
            format: HashFormat::Binary,
            key_len_bits: spec.key_len_bits(),
            val_len_bits,
            counter_len_bytes,
            num_hashes: 1,
            max_reprobe,
            max_reprobe_offset: reprobe_offset(max_reprobe as usize) as u64,
            data_offset: 0,
            table_size,
            canonical,
            cmdline: Vec::new(),
        }
    }

    /// k-mer length; two bits are stored per base.
    pub fn k(&self) -> usize {
        (self.key_len_bits / 2) as usize
    }

    pub fn key_bytes(&self) -> usize {
        ((self.key_len_bits + 7) / 8) as usize
    }

    pub fn record_bytes(&self) -> usize {
        self.counter_len_bytes as usize + self.key_bytes()
    }

    /// Refuse anything but binary hashes for processing.
    pub fn validate_for_processing(&self) -> KmerBinResult<()> {
        match self.format {
            HashFormat::Binary => Ok(()),
            HashFormat::Bloom => Err(KmerBinError::UnsupportedFormat {
                format: self.format.tag().to_string(),
                guidance: "Bloom counted k-mer hashes are not supported. \
                           Please create a binary hash and use that instead.",
            }),
            HashFormat::Text => Err(KmerBinError::UnsupportedFormat {
                format: self.format.tag().to_string(),
                guidance: "Processing a text format hash would be painfully slow. \
                           Please create a binary hash and use that instead.",
            }),
        }
    }

    /// Human-readable summary of every header field.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Hash Header Info:");
        let _ = writeln!(out, " - Cmdline: {}", self.cmdline.join(" "));
        let _ = writeln!(out, " - Format: {}", self.format.tag());
        let _ = writeln!(out, " - Key length (bits): {}", self.key_len_bits);
        let _ = writeln!(out, " - Value length (bits): {}", self.val_len_bits);
        let _ = writeln!(out, " - Counter length (bytes): {}", self.counter_len_bytes);
        let _ = writeln!(out, " - # Hashes: {}", self.num_hashes);
        let _ = writeln!(out, " - Max reprobe: {}", self.max_reprobe);
        let _ = writeln!(out, " - Max reprobe offset: {}", self.max_reprobe_offset);
        let _ = writeln!(out, " - Offset: {}", self.data_offset);
        let _ = write!(out, " - Size: {}", self.table_size);
        out
    }

    /// Serialize the header block. The returned bytes are padded so that the
    /// data region starts on an aligned offset, and that offset is recorded
    /// inside the header itself.
    pub fn to_bytes(&self) -> KmerBinResult<Vec<u8>> {
        let mut raw = RawHeader {
            format: self.format.tag().to_string(),
            key_len: self.key_len_bits,
            val_len: self.val_len_bits,
            counter_len: self.counter_len_bytes,
            nb_hashes: self.num_hashes,
            max_reprobe: self.max_reprobe,
            max_reprobe_offset: self.max_reprobe_offset,
            size: self.table_size,
            offset: None,
            canonical: self.canonical,
            cmdline: self.cmdline.clone(),
        };

        // The offset is part of the JSON, so iterate until its own digits
        // no longer move the data start.
        let mut offset = 0usize;
        loop {
            raw.offset = Some(offset as u64);
            let json = serde_json::to_vec(&raw)
                .map_err(|e| KmerBinError::Format(format!("cannot encode header: {e}")))?;
            if json.len() >= 10usize.pow(LEN_PREFIX as u32) {
                return Err(KmerBinError::Format(format!(
                    "header of {} bytes is too large",
                    json.len()
                )));
            }
            let total = align(LEN_PREFIX + json.len());
            if total <= offset {
                let mut out = Vec::with_capacity(offset);
                out.extend_from_slice(format!("{:0width$}", json.len(), width = LEN_PREFIX).as_bytes());
                out.extend_from_slice(&json);
                out.resize(offset, 0);
                return Ok(out);
            }
            offset = total;
        }
    }
}

fn align(n: usize) -> usize {
    (n + ALIGNMENT - 1) / ALIGNMENT * ALIGNMENT
}

/// Triangular reprobe offset for attempt `i` (0, 1, 3, 6, 10, ...).
#[inline]
pub fn reprobe_offset(i: usize) -> usize {
    i * (i + 1) / 2
}

/// Parse the leading header block from `reader`.
pub fn parse_header<R: Read>(reader: &mut R) -> KmerBinResult<HashHeader> {
    let mut prefix = [0u8; LEN_PREFIX];
    read_exact_or_format(reader, &mut prefix, "length prefix")?;
    let len_str = std::str::from_utf8(&prefix)
        .map_err(|_| KmerBinError::Format("length prefix is not ASCII".to_string()))?;
    let json_len: usize = len_str.trim().parse().map_err(|_| {
        KmerBinError::Format(format!("length prefix {len_str:?} is not a decimal number"))
    })?;

    // Grow with the bytes actually present rather than trusting the prefix
    let mut json = Vec::new();
    (&mut *reader).take(json_len as u64).read_to_end(&mut json)?;
    if json.len() != json_len {
        return Err(KmerBinError::Format(format!(
            "stream ended inside the header JSON block ({} of {} bytes)",
            json.len(),
            json_len
        )));
    }
    let raw: RawHeader = serde_json::from_slice(&json)
        .map_err(|e| KmerBinError::Format(format!("cannot parse JSON block: {e}")))?;

    let format = HashFormat::parse(&raw.format)
        .ok_or_else(|| KmerBinError::Format(format!("unknown format '{}'", raw.format)))?;

    if raw.key_len == 0 || raw.key_len % 2 != 0 || raw.key_len > 64 {
        return Err(KmerBinError::Format(format!(
            "key length of {} bits must be even and within 2..=64",
            raw.key_len
        )));
    }
    if raw.counter_len == 0 || raw.counter_len > 8 {
        return Err(KmerBinError::Format(format!(
            "counter length of {} bytes must be within 1..=8",
            raw.counter_len
        )));
    }

    let header_len = align(LEN_PREFIX + json_len) as u64;
    let data_offset = match raw.offset {
        Some(offset) if offset < (LEN_PREFIX + json_len) as u64 => {
            return Err(KmerBinError::Format(format!(
                "data offset {offset} points inside the header"
            )))
        }
        Some(offset) => offset,
        None => header_len,
    };

    Ok(HashHeader {
        format,
        key_len_bits: raw.key_len,
        val_len_bits: raw.val_len,
        counter_len_bytes: raw.counter_len,
        num_hashes: raw.nb_hashes,
        max_reprobe: raw.max_reprobe,
        max_reprobe_offset: raw.max_reprobe_offset,
        data_offset,
        table_size: raw.size,
        canonical: raw.canonical,
        cmdline: raw.cmdline,
    })
}

/// Open `path` and parse its header.
pub fn read_header(path: &Path) -> KmerBinResult<HashHeader> {
    let file = File::open(path).map_err(|source| KmerBinError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    parse_header(&mut BufReader::new(file))
}

fn read_exact_or_format<R: Read>(reader: &mut R, buf: &mut [u8], what: &str) -> KmerBinResult<()> {
    reader.read_exact(buf).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            KmerBinError::Format(format!("stream ended inside the header {what}"))
        } else {
            KmerBinError::Io(e)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_bytes_records_its_own_aligned_offset() {
        let spec = KmerSpec::new(31).unwrap();
        let header = HashHeader::binary(&spec, 7, 1, 126, 1024, true);
        let bytes = header.to_bytes().unwrap();
        assert_eq!(bytes.len() % ALIGNMENT, 0);

        let parsed = parse_header(&mut bytes.as_slice()).unwrap();
        assert_eq!(parsed.data_offset as usize, bytes.len());
        assert_eq!(parsed.key_len_bits, 62);
        assert!(parsed.canonical);
    }

    #[test]
    fn missing_offset_defaults_to_padded_header_length() {
        let json = br#"{"format":"binary/sorted","key_len":8,"val_len":7,"counter_len":1,"max_reprobe":126,"size":16}"#;
        let mut bytes = format!("{:09}", json.len()).into_bytes();
        bytes.extend_from_slice(json);
        let header = parse_header(&mut bytes.as_slice()).unwrap();
        assert_eq!(header.data_offset as usize, align(9 + json.len()));
        assert_eq!(header.num_hashes, 1);
    }

    #[test]
    fn oversized_length_prefix_is_a_format_error() {
        let mut bytes = b"999999999".to_vec();
        bytes.extend_from_slice(br#"{"format":"binary/sorted"}"#);
        match parse_header(&mut bytes.as_slice()) {
            Err(KmerBinError::Format(msg)) => assert!(msg.contains("of 999999999 bytes")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn reprobe_offsets_are_triangular() {
        let offsets: Vec<usize> = (0..5).map(reprobe_offset).collect();
        assert_eq!(offsets, vec![0, 1, 3, 6, 10]);
    }
}
