use crate::cli::BigCount;
use fxhash::FxHashMap;
use ndarray::Array2;
use std::panic::resume_unwind;
use std::thread;

/// A 2-D histogram that only materializes non-zero cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SparseMatrix {
    rows: usize,
    cols: usize,
    cells: FxHashMap<(usize, usize), BigCount>,
}

impl SparseMatrix {
    pub fn new(rows: usize, cols: usize) -> Self {
        assert!(rows > 0 && cols > 0, "matrix dimensions must be positive");
        SparseMatrix {
            rows,
            cols,
            cells: FxHashMap::default(),
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Add `delta` to a cell. Out-of-range bins clamp to the edge bin.
    #[inline]
    pub fn increment(&mut self, row: usize, col: usize, delta: BigCount) {
        if delta == 0 {
            return;
        }
        let cell = (row.min(self.rows - 1), col.min(self.cols - 1));
        *self.cells.entry(cell).or_insert(0) += delta;
    }

    pub fn get(&self, row: usize, col: usize) -> BigCount {
        self.cells.get(&(row, col)).copied().unwrap_or(0)
    }

    /// Number of non-zero cells.
    pub fn nnz(&self) -> usize {
        self.cells.len()
    }

    /// Sum over all cells.
    pub fn total(&self) -> BigCount {
        self.cells.values().sum()
    }

    /// Sum of one row.
    pub fn row_sum(&self, row: usize) -> BigCount {
        self.cells
            .iter()
            .filter(|((r, _), _)| *r == row)
            .map(|(_, &v)| v)
            .sum()
    }

    /// Cell-wise sum of `other` into `self`.
    pub fn merge(&mut self, other: &SparseMatrix) {
        assert_eq!(
            (self.rows, self.cols),
            (other.rows, other.cols),
            "merging matrices of different dimensions"
        );
        for (&cell, &v) in &other.cells {
            *self.cells.entry(cell).or_insert(0) += v;
        }
    }

    /// Non-zero cells as `(row, col, count)`, sorted by row then column.
    pub fn triplets(&self) -> Vec<(usize, usize, BigCount)> {
        let mut out: Vec<_> = self.cells.iter().map(|(&(r, c), &v)| (r, c, v)).collect();
        out.sort_unstable();
        out
    }

    pub fn to_dense(&self) -> Array2<BigCount> {
        let mut mat = Array2::<BigCount>::zeros((self.rows, self.cols));
        for (&(r, c), &v) in &self.cells {
            mat[(r, c)] = v;
        }
        mat
    }
}

/// One private `SparseMatrix` per worker thread, summed once all workers
/// have joined. Addition commutes, so the merged result does not depend on
/// which worker saw which item.
#[derive(Debug, Clone)]
pub struct ThreadedSparseMatrix {
    per_thread: Vec<SparseMatrix>,
}

impl ThreadedSparseMatrix {
    pub fn new(rows: usize, cols: usize, threads: usize) -> Self {
        ThreadedSparseMatrix {
            per_thread: vec![SparseMatrix::new(rows, cols); threads.max(1)],
        }
    }

    pub fn threads(&self) -> usize {
        self.per_thread.len()
    }

    #[inline]
    pub fn increment(&mut self, thread_id: usize, row: usize, col: usize, delta: BigCount) {
        self.per_thread[thread_id].increment(row, col, delta);
    }

    pub fn thread_matrix(&self, thread_id: usize) -> &SparseMatrix {
        &self.per_thread[thread_id]
    }

    /// Run `work` once per thread-local matrix, each on its own OS thread,
    /// and return the per-thread results in thread order.
    ///
    /// Workers only ever see their own matrix; the first error is returned
    /// after every worker has joined.
    pub fn run_workers<T, E, F>(&mut self, work: F) -> Result<Vec<T>, E>
    where
        F: Fn(usize, &mut SparseMatrix) -> Result<T, E> + Sync,
        T: Send,
        E: Send,
    {
        let work = &work;
        let results: Vec<Result<T, E>> = thread::scope(|s| {
            let handles: Vec<_> = self
                .per_thread
                .iter_mut()
                .enumerate()
                .map(|(th_id, mx)| s.spawn(move || work(th_id, mx)))
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap_or_else(|e| resume_unwind(e)))
                .collect()
        });
        results.into_iter().collect()
    }

    pub fn merge_all(&self) -> SparseMatrix {
        let mut merged = SparseMatrix::new(self.per_thread[0].rows, self.per_thread[0].cols);
        for mx in &self.per_thread {
            merged.merge(mx);
        }
        merged
    }
}
