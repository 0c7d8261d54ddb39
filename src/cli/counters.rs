use crate::cli::BigCount;
use crate::kmers::classify::ClassificationCounters;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CountingCounters {
    pub records: u64,
    pub bases: u64,
    /// Records shorter than k after tag trimming
    pub too_short: u64,
    /// Windows skipped for containing a non-ACGT base
    pub ambiguous: u64,
    pub counted: u64,
}

impl std::ops::AddAssign for CountingCounters {
    fn add_assign(&mut self, other: Self) {
        self.records += other.records;
        self.bases += other.bases;
        self.too_short += other.too_short;
        self.ambiguous += other.ambiguous;
        self.counted += other.counted;
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SectCounters {
    pub records: u64,
    pub no_kmers: u64,
    pub kmers: u64,
    pub zero_coverage: u64,
    pub binned: u64,
}

impl std::ops::AddAssign for SectCounters {
    fn add_assign(&mut self, other: Self) {
        self.records += other.records;
        self.no_kmers += other.no_kmers;
        self.kmers += other.kmers;
        self.zero_coverage += other.zero_coverage;
        self.binned += other.binned;
    }
}

/// Per-dataset statistics of a hash comparison
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CompCounters {
    /// Distinct k-mers per dataset
    pub distinct: Vec<BigCount>,
    /// Summed counts per dataset
    pub total: Vec<BigCount>,
    /// Distinct k-mers present in at least two datasets
    pub shared_distinct: BigCount,
    /// Summed counts of shared k-mers per dataset
    pub shared_total: Vec<BigCount>,
    pub union_distinct: BigCount,
}

impl CompCounters {
    pub fn new(n_datasets: usize) -> Self {
        CompCounters {
            distinct: vec![0; n_datasets],
            total: vec![0; n_datasets],
            shared_distinct: 0,
            shared_total: vec![0; n_datasets],
            union_distinct: 0,
        }
    }

    /// Account for one k-mer of the union.
    pub fn record(&mut self, cc: &ClassificationCounters) {
        self.union_distinct += 1;
        let mut present = 0;
        for (i, &c) in cc.counts.iter().enumerate() {
            if c > 0 {
                self.distinct[i] += 1;
                self.total[i] += c;
                present += 1;
            }
        }
        if present > 1 {
            self.shared_distinct += 1;
            for (i, &c) in cc.counts.iter().enumerate() {
                self.shared_total[i] += c;
            }
        }
    }
}

fn add_vec(into: &mut Vec<BigCount>, from: Vec<BigCount>) {
    if into.len() < from.len() {
        into.resize(from.len(), 0);
    }
    for (a, b) in into.iter_mut().zip(from) {
        *a += b;
    }
}

impl std::ops::AddAssign for CompCounters {
    fn add_assign(&mut self, other: Self) {
        add_vec(&mut self.distinct, other.distinct);
        add_vec(&mut self.total, other.total);
        add_vec(&mut self.shared_total, other.shared_total);
        self.shared_distinct += other.shared_distinct;
        self.union_distinct += other.union_distinct;
    }
}
