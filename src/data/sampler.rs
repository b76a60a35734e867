/// Fixed-size batch sampling over the dataset splits
use rand::seq::SliceRandom;
use rand::Rng;

use super::splitter::{DatasetSplits, SetName};
use crate::config::{CursorMode, IndexSpace, LoaderConfig};
use crate::SegError;

/// Rolling cursor over the splits that hands out stems `batch_size` at a time.
///
/// The last batch of a pass is topped up with stems drawn without
/// replacement from the part of the ordering already consumed in that pass,
/// after which the cursor returns to 0 and the train subset is reshuffled.
/// With per-subset cursors, a val or test wrap that lands while train is
/// mid-pass defers the train reshuffle until train is back at cursor 0.
#[derive(Debug, Clone)]
pub struct BatchSampler {
    valid: Vec<String>,
    splits: DatasetSplits,
    batch_size: usize,
    cursor_mode: CursorMode,
    index_space: IndexSpace,
    cursors: [usize; 3],
    train_reshuffle_pending: bool,
}

impl BatchSampler {
    /// `valid` is the full shuffled ordering the splits were cut from.
    pub fn new(valid: Vec<String>, splits: DatasetSplits, config: &LoaderConfig) -> Self {
        Self {
            valid,
            splits,
            batch_size: config.batch_size,
            cursor_mode: config.cursor_mode,
            index_space: config.index_space,
            cursors: [0; 3],
            train_reshuffle_pending: false,
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn valid_fnames(&self) -> &[String] {
        &self.valid
    }

    pub fn splits(&self) -> &DatasetSplits {
        &self.splits
    }

    /// Whole batches per pass over `set`
    pub fn num_steps(&self, set: SetName) -> usize {
        self.splits.get(set).len() / self.batch_size
    }

    fn cursor_slot(&self, set: SetName) -> usize {
        match self.cursor_mode {
            CursorMode::PerSubset => set.index(),
            CursorMode::Shared => 0,
        }
    }

    /// Current cursor position used for `set`
    pub fn cursor(&self, set: SetName) -> usize {
        self.cursors[self.cursor_slot(set)]
    }

    /// Rewind every cursor to the start of its ordering
    pub fn reset(&mut self) {
        self.cursors = [0; 3];
    }

    fn reshuffle_train<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let train_slot = self.cursor_slot(SetName::Train);
        if self.cursors[train_slot] == 0 {
            self.splits.train.shuffle(rng);
            self.train_reshuffle_pending = false;
        } else {
            log::debug!(
                "train is mid-pass at cursor {}; deferring its reshuffle",
                self.cursors[train_slot]
            );
            self.train_reshuffle_pending = true;
        }
    }

    /// Next `batch_size` stems from `set`.
    ///
    /// Fails before touching the cursor when `set` holds fewer stems than
    /// one batch.
    pub fn next_batch_filenames<R: Rng + ?Sized>(
        &mut self,
        set: SetName,
        rng: &mut R,
    ) -> crate::Result<Vec<String>> {
        let set_len = self.splits.get(set).len();
        if self.batch_size > set_len {
            return Err(SegError::BatchSize {
                set,
                batch_size: self.batch_size,
                available: set_len,
            });
        }

        let slot = self.cursor_slot(set);
        if set == SetName::Train && self.cursors[slot] == 0 && self.train_reshuffle_pending {
            self.splits.train.shuffle(rng);
            self.train_reshuffle_pending = false;
        }

        let idx_start = self.cursors[slot];
        let idx_end = idx_start + self.batch_size;
        self.cursors[slot] = idx_end;
        let final_batch = idx_end >= set_len;

        let source: &[String] = match self.index_space {
            IndexSpace::Subset => self.splits.get(set),
            IndexSpace::Valid => &self.valid,
        };

        let primary_end = idx_end.min(set_len);
        // A shared cursor can sit past the end of a smaller subset.
        let mut batch = source[idx_start.min(primary_end)..primary_end].to_vec();

        if final_batch {
            let overflow_count = self.batch_size - batch.len();
            let pool = &source[..idx_start.min(source.len())];
            let mut overflow: Vec<String> =
                pool.choose_multiple(rng, overflow_count).cloned().collect();
            overflow.shuffle(rng);
            batch.extend(overflow);

            log::debug!(
                "{} pass complete at cursor {}: drew {} overflow stems from {} consumed",
                set,
                idx_start,
                overflow_count,
                pool.len()
            );

            self.cursors[slot] = 0;
            self.reshuffle_train(rng);
        }

        debug_assert_eq!(batch.len(), self.batch_size);
        Ok(batch)
    }
}
