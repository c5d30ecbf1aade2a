//! Packing of the per-state action rows into a single shared array.

use crate::BuildError;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Entry {
    pub lookahead: usize,
    pub action: u32,
}

/// The action table under construction.
///
/// Rows are added one by one with [`ActionTable::add_action`] and then placed
/// with [`ActionTable::insert`], which returns the offset to be added to a
/// lookahead to get its position in the shared array.
#[derive(Debug)]
pub struct ActionTable {
    entries: Vec<Option<Entry>>,
    pending: Vec<Entry>,
    nterminal: usize,
}

impl ActionTable {
    pub fn new(nterminal: usize) -> Self {
        Self {
            entries: vec![],
            pending: vec![],
            nterminal,
        }
    }

    /// Add an entry to the row being built.
    pub fn add_action(&mut self, lookahead: usize, action: u32) {
        self.pending.push(Entry { lookahead, action });
    }

    /// Place the pending row into the shared array.
    ///
    /// An identical row already placed is reused. Otherwise the row goes to
    /// the first position where every slot it needs is empty and where no
    /// other entry could be mistaken for one of its lookaheads.
    ///
    /// With `safe` the offset is non-negative and the array is extended so
    /// that the offset plus any terminal stays within bounds, so that rows
    /// looked up with arbitrary terminals never read outside the array.
    pub fn insert(&mut self, safe: bool) -> Result<i32, BuildError> {
        let mut row = std::mem::take(&mut self.pending);
        if row.is_empty() {
            return Err(BuildError::OffsetOverflow);
        }
        row.sort_by_key(|e| e.lookahead);
        let min_lookahead = row[0].lookahead;
        let start = if safe { min_lookahead } else { 0 };

        let i = match self.find_duplicate(&row, start) {
            Some(i) => i,
            None => self.find_hole(&row, start),
        };

        for e in &row {
            let k = e.lookahead - min_lookahead + i;
            if k >= self.entries.len() {
                self.entries.resize(k + 1, None);
            }
            self.entries[k] = Some(*e);
        }
        if safe && i + self.nterminal >= self.entries.len() {
            self.entries.resize(i + self.nterminal + 1, None);
        }

        let offset = i as i64 - min_lookahead as i64;
        i32::try_from(offset).map_err(|_| BuildError::OffsetOverflow)
    }

    /// Number of entries a lookahead could be aliased with, if the row is
    /// placed so that its smallest lookahead lands on `i`.
    fn aliases(&self, min_lookahead: usize, i: usize) -> usize {
        self.entries
            .iter()
            .enumerate()
            .filter(|(j, e)| {
                e.map_or(false, |e| e.lookahead + i == j + min_lookahead)
            })
            .count()
    }

    fn find_duplicate(&self, row: &[Entry], start: usize) -> Option<usize> {
        let first = row[0];
        (start..self.entries.len()).rev().find(|&i| {
            if self.entries[i] != Some(first) {
                return false;
            }
            let all_match = row.iter().all(|e| {
                let k = e.lookahead - first.lookahead + i;
                self.entries.get(k).copied().flatten() == Some(*e)
            });
            all_match && self.aliases(first.lookahead, i) == row.len()
        })
    }

    fn find_hole(&self, row: &[Entry], start: usize) -> usize {
        let min_lookahead = row[0].lookahead;
        // Past `len + min_lookahead` every slot is empty and nothing can alias.
        (start..)
            .find(|&i| {
                let fits = row.iter().all(|e| {
                    let k = e.lookahead - min_lookahead + i;
                    self.entries.get(k).map_or(true, |slot| slot.is_none())
                });
                fits && self.aliases(min_lookahead, i) == 0
            })
            .unwrap_or(start)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Option<Entry>] {
        &self.entries
    }
}
