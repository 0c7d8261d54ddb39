#[cfg(test)]
mod cli_tests {
    use clap::Parser;
    use kmerbin::cli::commands::{Cli, Command};
    use std::path::PathBuf;

    #[test]
    fn comp_accepts_comma_separated_hashes() {
        let cli = Cli::try_parse_from([
            "kmerbin", "comp", "--hashes", "pe.jf,mp.jf", "-o", "out/", "-t", "8",
        ])
        .unwrap();
        match cli.command {
            Command::Comp(cmd) => {
                assert_eq!(cmd.hashes, vec![PathBuf::from("pe.jf"), PathBuf::from("mp.jf")]);
                assert_eq!(cmd.io.n_threads, 8);
            }
            _ => panic!("parsed the wrong subcommand"),
        }
    }

    #[test]
    fn comp_accepts_space_separated_hashes() {
        let cli = Cli::try_parse_from(["kmerbin", "comp", "--hashes", "a.jf", "b.jf", "c.jf", "-o", "out/"])
            .unwrap();
        match cli.command {
            Command::Comp(cmd) => assert_eq!(cmd.hashes.len(), 3),
            _ => panic!("parsed the wrong subcommand"),
        }
    }

    #[test]
    fn sect_takes_hash_or_sequences_but_not_both() {
        assert!(Cli::try_parse_from([
            "kmerbin", "sect", "--hash", "reads.jf", "--sequences", "contigs.fa", "-o", "out/",
        ])
        .is_ok());
        assert!(Cli::try_parse_from([
            "kmerbin", "sect", "--hash", "reads.jf", "--seqs", "reads.fq", "--sequences", "contigs.fa",
            "-o", "out/",
        ])
        .is_err());
    }
}
