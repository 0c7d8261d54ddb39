use std::collections::VecDeque;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use log::debug;
use needletail::errors::ParseErrorKind;
use needletail::{parse_fastx_reader, FastxReader};

use crate::kmers::errors::{KmerBinError, KmerBinResult};

/// Default number of sequence records handed out per chunk.
pub const DEFAULT_RECORDS_PER_CHUNK: usize = 256;

/// One parsed sequence record
#[derive(Debug, Clone)]
pub struct SequenceRecord {
    /// Header line without the leading `>`/`@`
    pub id: Vec<u8>,
    pub seq: Vec<u8>,
}

impl SequenceRecord {
    /// Record name: the header up to the first whitespace.
    pub fn name(&self) -> String {
        let end = self
            .id
            .iter()
            .position(|b| b.is_ascii_whitespace())
            .unwrap_or(self.id.len());
        String::from_utf8_lossy(&self.id[..end]).into_owned()
    }
}

/// A batch of consecutive records from one input.
#[derive(Debug)]
pub struct SequenceChunk {
    pub source: PathBuf,
    /// Position of `source` in the input list
    pub source_index: usize,
    /// Index of the first record within its source
    pub first_record: u64,
    pub records: Vec<SequenceRecord>,
}

struct OpenStream {
    path: PathBuf,
    source_index: usize,
    reader: Box<dyn FastxReader>,
    next_record: u64,
}

/// Thread-safe stream of sequence chunks drawn from one or more FASTA/FASTQ
/// inputs.
///
/// Up to `streams` inputs are open at once; each is guarded by its own lock so
/// workers reading different inputs do not contend. Every record is handed
/// to exactly one caller of `next_chunk`.
pub struct SequenceChunks {
    pending: Mutex<VecDeque<(usize, PathBuf)>>,
    streams: Vec<Mutex<Option<OpenStream>>>,
    cursor: AtomicUsize,
    records_per_chunk: usize,
    aborted: AtomicBool,
}

impl SequenceChunks {
    pub fn new(paths: &[PathBuf], streams: usize, records_per_chunk: usize) -> Self {
        let n_streams = streams.clamp(1, paths.len().max(1));
        SequenceChunks {
            pending: Mutex::new(paths.iter().cloned().enumerate().collect()),
            streams: (0..n_streams).map(|_| Mutex::new(None)).collect(),
            cursor: AtomicUsize::new(0),
            records_per_chunk: records_per_chunk.max(1),
            aborted: AtomicBool::new(false),
        }
    }

    pub fn n_streams(&self) -> usize {
        self.streams.len()
    }

    /// Stop handing out chunks, e.g. after a worker hit a fatal error.
    pub fn abort(&self) {
        self.aborted.store(true, Ordering::Release);
    }

    /// Next available chunk, or `None` once every input is exhausted.
    pub fn next_chunk(&self) -> KmerBinResult<Option<SequenceChunk>> {
        let n = self.streams.len();
        let start = self.cursor.fetch_add(1, Ordering::Relaxed);
        for offset in 0..n {
            if self.aborted.load(Ordering::Acquire) {
                return Ok(None);
            }
            if let Some(chunk) = self.fill_from(&self.streams[(start + offset) % n])? {
                return Ok(Some(chunk));
            }
        }
        Ok(None)
    }

    /// Read up to one chunk from a stream slot, opening the next pending input
    /// whenever the slot is empty or its input ran dry.
    fn fill_from(&self, slot: &Mutex<Option<OpenStream>>) -> KmerBinResult<Option<SequenceChunk>> {
        let mut guard = slot.lock().unwrap_or_else(|p| p.into_inner());
        loop {
            if guard.is_none() {
                let next = self
                    .pending
                    .lock()
                    .unwrap_or_else(|p| p.into_inner())
                    .pop_front();
                match next {
                    Some((source_index, path)) => *guard = open_stream(source_index, path)?,
                    None => return Ok(None),
                }
            }
            // An empty input leaves the slot empty; move on to the next one
            let Some(stream) = guard.as_mut() else {
                continue;
            };

            let first_record = stream.next_record;
            let mut records = Vec::with_capacity(self.records_per_chunk);
            while records.len() < self.records_per_chunk {
                match stream.reader.next() {
                    Some(Ok(rec)) => {
                        records.push(SequenceRecord {
                            id: rec.id().to_vec(),
                            seq: rec.seq().into_owned(),
                        });
                        stream.next_record += 1;
                    }
                    Some(Err(e)) => {
                        return Err(KmerBinError::MalformedRecord {
                            path: stream.path.clone(),
                            record: stream.next_record,
                            msg: e.to_string(),
                        })
                    }
                    None => break,
                }
            }

            if records.is_empty() {
                debug!("Finished reading {:?}", stream.path);
                *guard = None;
                continue;
            }
            return Ok(Some(SequenceChunk {
                source: stream.path.clone(),
                source_index: stream.source_index,
                first_record,
                records,
            }));
        }
    }
}

/// Open one input. Empty inputs hold no records and yield `None`.
fn open_stream(source_index: usize, path: PathBuf) -> KmerBinResult<Option<OpenStream>> {
    let file = File::open(&path).map_err(|source| KmerBinError::Open {
        path: path.clone(),
        source,
    })?;
    let reader = match parse_fastx_reader(file) {
        Ok(reader) => reader,
        Err(e) if e.kind == ParseErrorKind::EmptyFile => {
            debug!("Skipping empty input {:?}", path);
            return Ok(None);
        }
        Err(e) => {
            return Err(KmerBinError::MalformedRecord {
                path,
                record: 0,
                msg: e.to_string(),
            })
        }
    };
    debug!("Opened {:?}{}", path, if is_pipe(&path) { " (pipe)" } else { "" });
    Ok(Some(OpenStream {
        path,
        source_index,
        reader,
        next_record: 0,
    }))
}

/// Paths under `/proc` or `/dev` are streams rather than regular files.
pub fn is_pipe(path: &Path) -> bool {
    path.starts_with("/proc") || path.starts_with("/dev")
}
