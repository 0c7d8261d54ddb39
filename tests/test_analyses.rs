#[cfg(test)]
mod analyses_tests {
    use kmerbin::kmers::comp::{comp, CompConfig};
    use kmerbin::kmers::counting::{count_sequence_files, CountConfig};
    use kmerbin::kmers::errors::KmerBinError;
    use kmerbin::kmers::gcp::{gcp, GcpConfig};
    use kmerbin::kmers::hash_table::KmerHashTable;
    use kmerbin::kmers::kmer_codec::KmerSpec;
    use kmerbin::kmers::sect::{sect, SectConfig};
    use kmerbin::kmers::write::write_sequence_coverage;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::tempdir;

    fn table_from(k: usize, entries: &[(&[u8], u64)]) -> KmerHashTable {
        let spec = KmerSpec::new(k).unwrap();
        let table = KmerHashTable::new(64, spec.key_len_bits(), 7, 126).unwrap();
        for &(kmer, count) in entries {
            table.insert_or_increment(spec.encode(kmer).unwrap(), count).unwrap();
        }
        table.finalize();
        table
    }

    fn write_fasta(path: &Path, seqs: &[&[u8]]) -> PathBuf {
        let mut text = Vec::new();
        for (i, seq) in seqs.iter().enumerate() {
            text.extend_from_slice(format!(">s{}\n", i + 1).as_bytes());
            text.extend_from_slice(seq);
            text.push(b'\n');
        }
        fs::write(path, text).unwrap();
        path.to_path_buf()
    }

    #[test]
    fn gcp_bins_by_gc_count_and_coverage() {
        let table = table_from(4, &[(b"ACGT", 2), (b"CCCC", 5), (b"AAAA", 2000), (b"ATAT", 2)]);
        let mx = gcp(&table, &GcpConfig::default()).unwrap();

        assert_eq!((mx.rows(), mx.cols()), (5, 1001));
        assert_eq!(mx.get(2, 2), 1);
        assert_eq!(mx.get(4, 5), 1);
        assert_eq!(mx.get(0, 1000), 1);
        assert_eq!(mx.get(0, 2), 1);
        assert_eq!(mx.total(), 4);
    }

    #[test]
    fn gcp_matrix_does_not_depend_on_thread_count() {
        let dir = tempdir().unwrap();
        let mut state = 11u64;
        let seqs: Vec<Vec<u8>> = (0..200)
            .map(|_| {
                (0..90)
                    .map(|_| {
                        state = state
                            .wrapping_mul(6364136223846793005)
                            .wrapping_add(1442695040888963407);
                        b"ACGT"[(state >> 62) as usize]
                    })
                    .collect()
            })
            .collect();
        let refs: Vec<&[u8]> = seqs.iter().map(|s| s.as_slice()).collect();
        let fa = write_fasta(&dir.path().join("reads.fa"), &refs);

        let mut matrices = Vec::new();
        for threads in [1, 4] {
            let spec = KmerSpec::new(9).unwrap();
            let table = KmerHashTable::new(1 << 15, spec.key_len_bits(), 7, 126).unwrap();
            let config = CountConfig {
                threads,
                records_per_chunk: 16,
                ..CountConfig::default()
            };
            count_sequence_files(&[fa.clone()], &table, &config).unwrap();
            let mx = gcp(
                &table,
                &GcpConfig {
                    threads,
                    cvg_bins: 50,
                    cvg_scale: 1.0,
                },
            )
            .unwrap();
            matrices.push(mx);
        }
        assert_eq!(matrices[0], matrices[1]);
        assert_eq!(matrices[0].triplets(), matrices[1].triplets());
    }

    #[test]
    fn comp_categorizes_the_union_once() {
        let first = table_from(4, &[(b"AAAA", 3), (b"ACGT", 1), (b"CCCC", 2)]);
        let second = table_from(4, &[(b"ACGT", 4), (b"CCCC", 2), (b"GGGA", 7)]);

        for threads in [1, 3] {
            let config = CompConfig {
                threads,
                threshold: 2,
                ..CompConfig::default()
            };
            let res = comp(&[&first, &second], &config).unwrap();

            // Only(0), Only(1), above, below, partial
            assert_eq!(res.categories.rows(), 5);
            assert_eq!(res.categories.get(0, 3), 1);
            assert_eq!(res.categories.get(1, 7), 1);
            assert_eq!(res.categories.get(2, 4), 1);
            assert_eq!(res.categories.get(3, 5), 1);
            assert_eq!(res.categories.row_sum(4), 0);
            assert_eq!(res.categories.total(), 4);

            assert_eq!(res.main.get(3, 0), 1);
            assert_eq!(res.main.get(1, 4), 1);
            assert_eq!(res.main.get(2, 2), 1);
            assert_eq!(res.main.get(0, 7), 1);

            let c = &res.counters;
            assert_eq!(c.union_distinct, 4);
            assert_eq!(c.shared_distinct, 2);
            assert_eq!(c.distinct, vec![3, 3]);
            assert_eq!(c.total, vec![6, 13]);
            assert_eq!(c.shared_total, vec![3, 6]);
        }
    }

    #[test]
    fn comp_rejects_single_or_mismatched_hashes() {
        let k4 = table_from(4, &[(b"ACGT", 1)]);
        let k5 = table_from(5, &[(b"ACGTA", 1)]);
        assert!(matches!(
            comp(&[&k4], &CompConfig::default()),
            Err(KmerBinError::Config(_))
        ));
        assert!(matches!(
            comp(&[&k4, &k5], &CompConfig::default()),
            Err(KmerBinError::Config(_))
        ));
    }

    #[test]
    fn sect_bins_sequences_by_gc_and_mean_coverage() {
        let dir = tempdir().unwrap();
        let fa = write_fasta(&dir.path().join("contigs.fa"), &[b"ACGTACGT", b"NNNN", b"AC"]);
        let table = table_from(4, &[(b"ACGT", 200)]);

        let res = sect(&[fa.clone()], &table, &SectConfig::default()).unwrap();
        // coverages 200 0 0 0 200: mean 80, x0.1 -> bin 8; GC 0.5 -> bin 500
        assert_eq!(res.matrix.get(500, 8), 8);
        assert_eq!(res.matrix.total(), 8);
        assert_eq!(res.counters.records, 3);
        assert_eq!(res.counters.no_kmers, 2);
        assert_eq!(res.counters.binned, 1);
        assert_eq!(res.counters.kmers, 5);
        assert_eq!(res.counters.zero_coverage, 3);

        let log = SectConfig {
            log_scale: true,
            threads: 2,
            ..SectConfig::default()
        };
        let res = sect(&[fa.clone()], &table, &log).unwrap();
        // log10(81) x 100 = 190.8
        assert_eq!(res.matrix.get(500, 190), 8);

        let median = SectConfig {
            median: true,
            ..SectConfig::default()
        };
        let res = sect(&[fa], &table, &median).unwrap();
        assert_eq!(res.matrix.get(500, 0), 8);
    }

    #[test]
    fn sect_reports_each_sequence_in_input_order() {
        let dir = tempdir().unwrap();
        let seqs: Vec<Vec<u8>> = (0..40)
            .map(|i| match i % 3 {
                0 => b"ACGTACGT".to_vec(),
                1 => b"GGGGCCCC".to_vec(),
                _ => b"NNNN".to_vec(),
            })
            .collect();
        let refs: Vec<&[u8]> = seqs.iter().map(|s| s.as_slice()).collect();
        let a = write_fasta(&dir.path().join("a.fa"), &refs[..25]);
        let b = write_fasta(&dir.path().join("b.fa"), &refs[25..]);
        let paths = vec![a, b];
        let table = table_from(4, &[(b"ACGT", 200), (b"GGGG", 10)]);

        let mut runs = Vec::new();
        for threads in [1, 4] {
            let config = SectConfig {
                threads,
                records_per_chunk: 3,
                ..SectConfig::default()
            };
            runs.push(sect(&paths, &table, &config).unwrap().sequences);
        }
        assert_eq!(runs[0], runs[1]);

        let rows = &runs[0];
        assert_eq!(rows.len(), 40);
        // Records are named s1.. per file
        let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names[0], "s1");
        assert_eq!(names[24], "s25");
        assert_eq!(names[25], "s1");
        assert_eq!(names[39], "s15");

        assert_eq!(rows[0].coverage, 80.0);
        assert_eq!(rows[0].gc, Some(0.5));
        assert_eq!(rows[1].coverage, 2.0);
        assert_eq!(rows[1].gc, Some(1.0));
        assert_eq!(rows[2].coverage, 0.0);
        assert_eq!(rows[2].gc, None);
        assert_eq!(rows[2].length, 4);

        let out = dir.path().join("stats.tsv");
        write_sequence_coverage(rows, &out).unwrap();
        let text = fs::read_to_string(&out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 41);
        assert_eq!(lines[0], "seq_name coverage gc seq_length");
        assert_eq!(lines[1], "s1 80.00000 0.50000 8");
        assert_eq!(lines[3], "s3 0.00000 nan 4");
    }

    #[test]
    fn sect_can_skip_the_per_sequence_table() {
        let dir = tempdir().unwrap();
        let fa = write_fasta(&dir.path().join("c.fa"), &[b"ACGTACGT"]);
        let table = table_from(4, &[(b"ACGT", 200)]);
        let config = SectConfig {
            per_sequence: false,
            ..SectConfig::default()
        };
        let res = sect(&[fa], &table, &config).unwrap();
        assert!(res.sequences.is_empty());
        assert_eq!(res.counters.binned, 1);
    }

    #[test]
    fn analyses_require_a_finalized_table() {
        let spec = KmerSpec::new(4).unwrap();
        let open = KmerHashTable::new(8, spec.key_len_bits(), 7, 126).unwrap();
        assert!(matches!(
            gcp(&open, &GcpConfig::default()),
            Err(KmerBinError::NotFinalized)
        ));
    }
}
