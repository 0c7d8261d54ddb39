use smallvec::SmallVec;

use crate::cli::BigCount;
use crate::kmers::hash_table::KmerHashTable;

/// Where a k-mer sits across the compared datasets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Present only in the dataset with this index
    Only(usize),
    /// Present everywhere, at or above the threshold in every dataset
    SharedAboveThreshold,
    /// Present everywhere, below the threshold in at least one dataset
    SharedBelowThreshold,
    /// Present in more than one dataset but not all of them
    Partial,
    /// Present nowhere
    Absent,
}

impl Category {
    /// Number of binnable categories for `n_datasets` inputs
    /// (`Absent` is never binned).
    pub fn count(n_datasets: usize) -> usize {
        n_datasets + 3
    }

    /// Row index of this category in a category matrix.
    pub fn index(&self, n_datasets: usize) -> Option<usize> {
        match *self {
            Category::Only(i) => Some(i),
            Category::SharedAboveThreshold => Some(n_datasets),
            Category::SharedBelowThreshold => Some(n_datasets + 1),
            Category::Partial => Some(n_datasets + 2),
            Category::Absent => None,
        }
    }

    pub fn label(&self) -> String {
        match *self {
            Category::Only(i) => format!("only_{}", i + 1),
            Category::SharedAboveThreshold => "shared_above".to_string(),
            Category::SharedBelowThreshold => "shared_below".to_string(),
            Category::Partial => "partial".to_string(),
            Category::Absent => "absent".to_string(),
        }
    }
}

/// Per-k-mer counts across datasets, one entry per dataset in input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationCounters {
    pub counts: SmallVec<[BigCount; 4]>,
}

impl ClassificationCounters {
    /// Look `key` up in every dataset. Missing keys count as zero.
    pub fn lookup(key: u64, datasets: &[&KmerHashTable]) -> Self {
        ClassificationCounters {
            counts: datasets.iter().map(|d| d.get(key).unwrap_or(0)).collect(),
        }
    }

    pub fn total(&self) -> BigCount {
        self.counts.iter().sum()
    }

    pub fn classify(&self, threshold: BigCount) -> Category {
        classify_counts(&self.counts, threshold)
    }
}

/// Categorize a k-mer from its per-dataset counts.
///
/// A dataset "has" the k-mer when its count is non-zero. `threshold` only
/// splits k-mers present everywhere.
pub fn classify_counts(counts: &[BigCount], threshold: BigCount) -> Category {
    let mut present = counts.iter().enumerate().filter(|&(_, &c)| c > 0);
    let first = match present.next() {
        None => return Category::Absent,
        Some((i, _)) => i,
    };
    let n_present = 1 + present.count();

    if n_present == 1 {
        Category::Only(first)
    } else if n_present < counts.len() {
        Category::Partial
    } else if counts.iter().all(|&c| c >= threshold) {
        Category::SharedAboveThreshold
    } else {
        Category::SharedBelowThreshold
    }
}

/// Classify `key` against every dataset.
pub fn classify(key: u64, datasets: &[&KmerHashTable], threshold: BigCount) -> Category {
    ClassificationCounters::lookup(key, datasets).classify(threshold)
}
