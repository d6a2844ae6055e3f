//! Partition layout computation.
//!
//! Divides a record count into batches (the fetch unit, which bounds memory)
//! and files (the publishing unit, capped by the protocol). The layout is
//! derived per run and never stored.

/// File/batch layout for one source.
///
/// Invariant: batch indices `1..=num_batches` are assigned to exactly one
/// file each, in contiguous, non-overlapping ranges. This holds for every
/// input satisfying `batch_size >= 1`, `max_per_file >= 2` and
/// `batch_size <= max_per_file`; those preconditions are enforced at
/// configuration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionPlan {
    count: u64,
    batch_size: u64,
    num_batches: u64,
    num_files: u64,
}

/// The inclusive batch range one file covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilePartition {
    /// 1-based file index.
    pub file_index: u64,
    /// First batch in this file (1-based, inclusive).
    pub batch_start: u64,
    /// Last batch in this file (inclusive).
    pub batch_end: u64,
}

impl FilePartition {
    /// Batch indices covered by this file.
    pub fn batches(&self) -> impl Iterator<Item = u64> + use<> {
        self.batch_start..=self.batch_end
    }
}

/// One bounded fetch against the data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Batch {
    /// 1-based batch index.
    pub index: u64,
    /// Records to skip.
    pub offset: u64,
    /// Records to fetch. The last batch holds the remainder,
    /// `count - offset`, so every record is covered exactly once.
    pub limit: u64,
}

fn ceil_div(a: u64, b: u64) -> u64 {
    a.div_ceil(b)
}

impl PartitionPlan {
    /// Compute the layout for `count` records.
    pub fn new(count: u64, batch_size: u64, max_per_file: u64) -> Self {
        debug_assert!(batch_size >= 1);
        debug_assert!(max_per_file >= 2);
        debug_assert!(batch_size <= max_per_file);

        if count <= batch_size {
            // One batch, one file, covering the whole count.
            return Self {
                count,
                batch_size,
                num_batches: 1,
                num_files: 1,
            };
        }

        // batch_size <= max_per_file guarantees num_batches >= num_files,
        // so the split below gives every file at least one batch.
        let num_batches = ceil_div(count, batch_size);
        let num_files = ceil_div(count, max_per_file);
        Self {
            count,
            batch_size,
            num_batches,
            num_files,
        }
    }

    /// Total record count the plan covers.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Number of batches.
    pub fn num_batches(&self) -> u64 {
        self.num_batches
    }

    /// Number of files.
    pub fn num_files(&self) -> u64 {
        self.num_files
    }

    /// The per-file batch ranges, in file order.
    ///
    /// File `f` covers batches `(f-1)*num_batches/num_files + 1` through
    /// `f*num_batches/num_files`. Pure integer arithmetic keeps the ranges
    /// contiguous and covering for all valid inputs.
    pub fn files(&self) -> impl Iterator<Item = FilePartition> + use<> {
        let num_batches = self.num_batches;
        let num_files = self.num_files;
        (1..=num_files).map(move |file_index| FilePartition {
            file_index,
            batch_start: (file_index - 1) * num_batches / num_files + 1,
            batch_end: file_index * num_batches / num_files,
        })
    }

    /// Offset and limit for batch `index` (1-based).
    pub fn batch(&self, index: u64) -> Batch {
        let offset = (index - 1) * self.batch_size;
        Batch {
            index,
            offset,
            limit: self.batch_size.min(self.count - offset),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_covering(plan: &PartitionPlan) {
        let mut expected = 1;
        for file in plan.files() {
            assert_eq!(
                file.batch_start, expected,
                "file {} does not start where the previous one ended",
                file.file_index
            );
            assert!(
                file.batch_end >= file.batch_start,
                "file {} covers no batches",
                file.file_index
            );
            expected = file.batch_end + 1;
        }
        assert_eq!(expected, plan.num_batches() + 1, "batches left unassigned");
    }

    #[test]
    fn test_small_count_is_one_batch_one_file() {
        let plan = PartitionPlan::new(10, 100, 200);
        assert_eq!(plan.num_batches(), 1);
        assert_eq!(plan.num_files(), 1);
        let batch = plan.batch(1);
        assert_eq!(batch.offset, 0);
        assert_eq!(batch.limit, 10);
    }

    #[test]
    fn test_empty_count_still_produces_one_file() {
        let plan = PartitionPlan::new(0, 100, 200);
        assert_eq!(plan.num_files(), 1);
        assert_eq!(plan.batch(1).limit, 0);
    }

    #[test]
    fn test_four_records_two_per_file() {
        // count=4, batch_size=1, max_per_file=2
        let plan = PartitionPlan::new(4, 1, 2);
        assert_eq!(plan.num_batches(), 4);
        assert_eq!(plan.num_files(), 2);

        let files: Vec<_> = plan.files().collect();
        assert_eq!(files[0].batch_start, 1);
        assert_eq!(files[0].batch_end, 2);
        assert_eq!(files[1].batch_start, 3);
        assert_eq!(files[1].batch_end, 4);

        // File 1 covers records 0-1, file 2 covers records 2-3.
        assert_eq!(plan.batch(1).offset, 0);
        assert_eq!(plan.batch(2).offset, 1);
        assert_eq!(plan.batch(3).offset, 2);
        assert_eq!(plan.batch(4).offset, 3);
    }

    #[test]
    fn test_last_batch_holds_remainder() {
        let plan = PartitionPlan::new(10, 3, 4);
        assert_eq!(plan.num_batches(), 4);
        let last = plan.batch(4);
        assert_eq!(last.offset, 9);
        assert_eq!(last.limit, 1);

        let total: u64 = (1..=plan.num_batches()).map(|b| plan.batch(b).limit).sum();
        assert_eq!(total, 10);
    }

    #[test]
    fn test_uneven_split_still_covers() {
        // Historically lost batch 2 under the real-valued formula.
        let plan = PartitionPlan::new(10, 3, 4);
        assert_eq!(plan.num_files(), 3);
        assert_covering(&plan);
    }

    #[test]
    fn test_file_count_matches_protocol_cap() {
        let plan = PartitionPlan::new(100_001, 1000, 50_000);
        assert_eq!(plan.num_files(), 3);
        assert_covering(&plan);
    }

    #[test]
    fn test_covering_invariant_sweep() {
        for count in [0, 1, 2, 5, 7, 49, 50, 51, 99, 100, 101, 997, 10_000] {
            for batch_size in [1, 2, 3, 7, 10, 50] {
                for max_per_file in [2, 3, 10, 50, 100] {
                    if batch_size > max_per_file {
                        continue;
                    }
                    let plan = PartitionPlan::new(count, batch_size, max_per_file);
                    assert_covering(&plan);

                    let total: u64 =
                        (1..=plan.num_batches()).map(|b| plan.batch(b).limit).sum();
                    assert_eq!(
                        total, count,
                        "batches do not cover the count for ({count}, {batch_size}, {max_per_file})"
                    );
                }
            }
        }
    }

    #[test]
    fn test_batch_limits_never_exceed_batch_size() {
        let plan = PartitionPlan::new(1000, 7, 10);
        for b in 1..=plan.num_batches() {
            assert!(plan.batch(b).limit <= 7);
        }
    }
}
