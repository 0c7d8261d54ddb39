#[cfg(test)]
mod hash_file_tests {
    use kmerbin::kmers::errors::KmerBinError;
    use kmerbin::kmers::hash_table::KmerHashTable;
    use kmerbin::kmers::header::{parse_header, read_header, HashFormat, HashHeader};
    use kmerbin::kmers::kmer_codec::KmerSpec;
    use kmerbin::kmers::read::load_hash;
    use kmerbin::kmers::write::dump_hash;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    /// Write a hash file from a header and raw `(key, counter)` records.
    fn write_hash_file(path: &Path, header: &HashHeader, records: &[(u64, u64)]) {
        let mut bytes = header.to_bytes().unwrap();
        let key_bytes = header.key_bytes();
        let counter_bytes = header.counter_len_bytes as usize;
        for &(key, counter) in records {
            bytes.extend_from_slice(&key.to_le_bytes()[..key_bytes]);
            bytes.extend_from_slice(&counter.to_le_bytes()[..counter_bytes]);
        }
        fs::write(path, bytes).unwrap();
    }

    fn header_json(json: &str) -> Vec<u8> {
        let mut bytes = format!("{:09}", json.len()).into_bytes();
        bytes.extend_from_slice(json.as_bytes());
        bytes
    }

    #[test]
    fn loads_31mer_hash_with_four_records() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.jf");
        let spec = KmerSpec::new(31).unwrap();
        let header = HashHeader::binary(&spec, 7, 1, 126, 8, false);
        assert_eq!(header.record_bytes(), 9);

        let records = [
            (spec.encode(b"ACGTACGTACGTACGTACGTACGTACGTACG").unwrap(), 3),
            (spec.encode(b"TTTTTTTTTTTTTTTTTTTTTTTTTTTTTTT").unwrap(), 1),
            (spec.encode(b"GATTACAGATTACAGATTACAGATTACAGAT").unwrap(), 200),
            (spec.encode(b"CCCCCCCCCCCCCCCGGGGGGGGGGGGGGGG").unwrap(), 42),
        ];
        write_hash_file(&path, &header, &records);

        let loaded = load_hash(&path, false).unwrap();
        assert_eq!(loaded.header.key_len_bits, 62);
        assert_eq!(loaded.table.capacity(), 8);
        assert_eq!(loaded.table.distinct(), 4);
        assert!(loaded.table.is_finalized());
        for &(key, counter) in &records {
            assert_eq!(loaded.table.get(key), Some(counter));
        }
    }

    #[test]
    fn data_region_not_a_multiple_of_record_size_is_corrupt() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("d.jf");
        let spec = KmerSpec::new(31).unwrap();
        let header = HashHeader::binary(&spec, 7, 1, 126, 8, false);
        write_hash_file(&path, &header, &[(1, 1), (2, 2)]);

        // Chop one byte off the last record
        let mut bytes = fs::read(&path).unwrap();
        bytes.pop();
        fs::write(&path, bytes).unwrap();

        match load_hash(&path, false) {
            Err(KmerBinError::CorruptFile { path: p, .. }) => assert_eq!(p, path),
            Err(e) => panic!("unexpected error: {e}"),
            Ok(_) => panic!("corrupt file loaded"),
        }
    }

    #[test]
    fn keys_wider_than_k_are_corrupt() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wide.jf");
        let spec = KmerSpec::new(31).unwrap();
        let header = HashHeader::binary(&spec, 7, 1, 126, 8, false);
        // Second record sets bit 62, outside the 62-bit key
        write_hash_file(&path, &header, &[(5, 1), (1 << 62 | 5, 1)]);

        match load_hash(&path, false) {
            Err(KmerBinError::CorruptFile { path: p, msg }) => {
                assert_eq!(p, path);
                assert!(msg.contains("record 1"), "{msg}");
            }
            Err(e) => panic!("unexpected error: {e}"),
            Ok(_) => panic!("over-wide key loaded"),
        }
    }

    #[test]
    fn duplicate_keys_are_summed_on_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dup.jf");
        let spec = KmerSpec::new(4).unwrap();
        let header = HashHeader::binary(&spec, 7, 2, 126, 8, false);
        write_hash_file(&path, &header, &[(5, 10), (7, 1), (5, 3)]);

        let loaded = load_hash(&path, false).unwrap();
        assert_eq!(loaded.table.get(5), Some(13));
        assert_eq!(loaded.table.get(7), Some(1));
        assert_eq!(loaded.table.distinct(), 2);
    }

    #[test]
    fn text_and_bloom_hashes_are_refused_with_guidance() {
        let dir = tempdir().unwrap();
        for (tag, expected) in [("text/sorted", "text"), ("bloomcounter", "Bloom")] {
            let path = dir.path().join("h.jf");
            let json = format!(
                r#"{{"format":"{tag}","key_len":8,"val_len":7,"counter_len":1,"max_reprobe":126,"size":16}}"#
            );
            fs::write(&path, header_json(&json)).unwrap();

            let header = read_header(&path).unwrap();
            assert_ne!(header.format, HashFormat::Binary);
            match load_hash(&path, false) {
                Err(KmerBinError::UnsupportedFormat { guidance, .. }) => {
                    assert!(guidance.contains(expected))
                }
                Err(e) => panic!("unexpected error: {e}"),
                Ok(_) => panic!("{tag} hash loaded"),
            }
        }
    }

    #[test]
    fn unknown_format_and_truncated_headers_are_format_errors() {
        let json = r#"{"format":"sequence","key_len":8,"val_len":7,"counter_len":1,"max_reprobe":126,"size":16}"#;
        let bytes = header_json(json);
        assert!(matches!(
            parse_header(&mut bytes.as_slice()),
            Err(KmerBinError::Format(_))
        ));

        let full = header_json(json);
        let truncated = &full[..20];
        assert!(matches!(
            parse_header(&mut &truncated[..]),
            Err(KmerBinError::Format(_))
        ));

        let not_a_number = b"abcdefghi{}".to_vec();
        assert!(matches!(
            parse_header(&mut not_a_number.as_slice()),
            Err(KmerBinError::Format(_))
        ));
    }

    #[test]
    fn missing_offset_defaults_to_padded_header_length() {
        let json = r#"{"format":"binary/sorted","key_len":8,"val_len":7,"counter_len":1,"max_reprobe":126,"size":16}"#;
        let bytes = header_json(json);
        let header = parse_header(&mut bytes.as_slice()).unwrap();
        let unpadded = (9 + json.len()) as u64;
        assert!(header.data_offset >= unpadded);
        assert_eq!(header.data_offset % 8, 0);
        assert_eq!(header.k(), 4);
        assert_eq!(header.num_hashes, 1);
    }

    #[test]
    fn dump_then_load_keeps_every_entry() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dump.jf");
        let spec = KmerSpec::new(5).unwrap();
        let table = KmerHashTable::new(64, spec.key_len_bits(), 7, 126).unwrap();
        for seq in [&b"ACGTA"[..], b"CCCCC", b"GATTA", b"ACGTA", b"TTTTT"] {
            table.insert_or_increment(spec.encode(seq).unwrap(), 1).unwrap();
        }
        table.finalize();

        let mut header = HashHeader::binary(&spec, 7, 4, 126, 64, true);
        header.cmdline = vec!["kmerbin".to_string(), "count".to_string()];
        dump_hash(&table, &header, 3, &path).unwrap();

        let loaded = load_hash(&path, false).unwrap();
        assert!(loaded.header.canonical);
        assert_eq!(loaded.header.cmdline, header.cmdline);
        let mut original: Vec<_> = table.entries().collect();
        let mut reloaded: Vec<_> = loaded.table.entries().collect();
        original.sort_unstable();
        reloaded.sort_unstable();
        assert_eq!(original, reloaded);
        assert_eq!(loaded.table.get(spec.encode(b"ACGTA").unwrap()), Some(2));
    }

    #[test]
    fn dump_is_sorted_and_independent_of_thread_count() {
        let dir = tempdir().unwrap();
        let spec = KmerSpec::new(6).unwrap();
        let table = KmerHashTable::new(256, spec.key_len_bits(), 7, 126).unwrap();
        for key in (0..100u64).map(|i| (i * 37) % 4096) {
            table.insert_or_increment(key, key % 5 + 1).unwrap();
        }
        table.finalize();
        let header = HashHeader::binary(&spec, 7, 2, 126, 256, false);

        let one = dir.path().join("t1.jf");
        let four = dir.path().join("t4.jf");
        dump_hash(&table, &header, 1, &one).unwrap();
        dump_hash(&table, &header, 4, &four).unwrap();
        assert_eq!(fs::read(&one).unwrap(), fs::read(&four).unwrap());

        let bytes = fs::read(&one).unwrap();
        let parsed = parse_header(&mut bytes.as_slice()).unwrap();
        let data = &bytes[parsed.data_offset as usize..];
        let keys: Vec<u64> = data
            .chunks(parsed.record_bytes())
            .map(|r| u64::from(r[0]) | (u64::from(r[1]) << 8))
            .collect();
        assert_eq!(keys.len(), 100);
        assert!(keys.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn dumped_counters_saturate_at_counter_width() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sat.jf");
        let spec = KmerSpec::new(4).unwrap();
        let table = KmerHashTable::new(8, spec.key_len_bits(), 7, 126).unwrap();
        table.insert_or_increment(3, 1000).unwrap();
        table.finalize();

        dump_hash(&table, &HashHeader::binary(&spec, 7, 1, 126, 8, false), 1, &path).unwrap();
        assert_eq!(load_hash(&path, false).unwrap().table.get(3), Some(255));
    }

    #[test]
    fn unfinalized_table_cannot_be_dumped() {
        let dir = tempdir().unwrap();
        let spec = KmerSpec::new(4).unwrap();
        let table = KmerHashTable::new(8, spec.key_len_bits(), 7, 126).unwrap();
        let header = HashHeader::binary(&spec, 7, 1, 126, 8, false);
        assert!(matches!(
            dump_hash(&table, &header, 1, &dir.path().join("x.jf")),
            Err(KmerBinError::NotFinalized)
        ));
    }
}
