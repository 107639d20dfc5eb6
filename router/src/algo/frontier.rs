use crate::Cost;
use crate::error::RouterError;
use gcr_common::db::indices::CellId;
use std::cmp::Ordering;

const NOT_IN_HEAP: u32 = u32::MAX;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryState {
    Untouched,
    Queued,
    /// Popped as best; its cost is final for this search.
    Finalized,
}

/// Search bookkeeping for one cell.
#[derive(Clone, Copy, Debug)]
pub struct CellEntry {
    pub state: EntryState,
    pub total_cost: Cost,
    pub path_cost: Cost,
    pub parent: Option<CellId>,
    heap_pos: u32,
}

impl Default for CellEntry {
    fn default() -> Self {
        Self {
            state: EntryState::Untouched,
            total_cost: Cost::INFINITY,
            path_cost: Cost::INFINITY,
            parent: None,
            heap_pos: NOT_IN_HEAP,
        }
    }
}

/// Bit per cell plus the list of set bits, so clearing costs O(set bits).
#[derive(Clone, Default)]
struct TouchedSet {
    bits: Vec<bool>,
    set: Vec<CellId>,
}

impl TouchedSet {
    fn insert(&mut self, id: CellId) {
        let bit = &mut self.bits[id.index()];
        if !*bit {
            *bit = true;
            self.set.push(id);
        }
    }

    #[inline(always)]
    fn contains(&self, id: CellId) -> bool {
        self.bits.get(id.index()).copied().unwrap_or(false)
    }
}

/// Min-heap of cells keyed by total cost with decrease-key.
///
/// Ties on total cost prefer the larger path cost (the entry that has
/// travelled further, so is nearer the target), then the smaller cell id.
#[derive(Clone, Default)]
pub struct Frontier {
    entries: Vec<CellEntry>,
    touched: TouchedSet,
    heap: Vec<CellId>,
}

impl Frontier {
    pub fn new(num_cells: usize) -> Self {
        let mut frontier = Self::default();
        frontier.resize(num_cells);
        frontier
    }

    /// Sizes the per-cell tables for a grid of `num_cells`. Clears the frontier.
    pub fn resize(&mut self, num_cells: usize) {
        self.clear();
        self.entries.resize(num_cells, CellEntry::default());
        self.touched.bits.resize(num_cells, false);
    }

    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// True once `id` has been inserted since the last `clear`.
    pub fn is_visited(&self, id: CellId) -> bool {
        self.touched.contains(id)
    }

    pub fn data_for(&self, id: CellId) -> &CellEntry {
        &self.entries[id.index()]
    }

    /// Inserts `id` or lowers its cost and parent if `total` beats the queued
    /// value. Finalized cells are left alone.
    pub fn set_cost(&mut self, id: CellId, heuristic: Cost, total: Cost, parent: Option<CellId>) {
        let entry = &mut self.entries[id.index()];
        match entry.state {
            EntryState::Finalized => {}
            EntryState::Queued => {
                if total < entry.total_cost {
                    entry.total_cost = total;
                    entry.path_cost = total - heuristic;
                    entry.parent = parent;
                    let pos = entry.heap_pos as usize;
                    self.sift_up(pos);
                }
            }
            EntryState::Untouched => {
                *entry = CellEntry {
                    state: EntryState::Queued,
                    total_cost: total,
                    path_cost: total - heuristic,
                    parent,
                    heap_pos: self.heap.len() as u32,
                };
                self.touched.insert(id);
                self.heap.push(id);
                self.sift_up(self.heap.len() - 1);
            }
        }
    }

    /// Removes and returns the cheapest queued cell.
    pub fn pop_best(&mut self) -> Result<CellId, RouterError> {
        if self.heap.is_empty() {
            return Err(RouterError::EmptyFrontier);
        }
        let best = self.heap.swap_remove(0);
        if let Some(&moved) = self.heap.first() {
            self.entries[moved.index()].heap_pos = 0;
            self.sift_down(0);
        }
        let entry = &mut self.entries[best.index()];
        entry.state = EntryState::Finalized;
        entry.heap_pos = NOT_IN_HEAP;
        Ok(best)
    }

    /// Resets every cell touched since the last clear.
    pub fn clear(&mut self) {
        for &id in &self.touched.set {
            self.entries[id.index()] = CellEntry::default();
            self.touched.bits[id.index()] = false;
        }
        self.touched.set.clear();
        self.heap.clear();
    }

    /// Cells touched since the last clear, in insertion order.
    pub fn touched(&self) -> &[CellId] {
        &self.touched.set
    }

    #[inline(always)]
    fn less(&self, a: CellId, b: CellId) -> bool {
        let ea = &self.entries[a.index()];
        let eb = &self.entries[b.index()];
        match ea.total_cost.total_cmp(&eb.total_cost) {
            Ordering::Less => true,
            Ordering::Greater => false,
            Ordering::Equal => match eb.path_cost.total_cmp(&ea.path_cost) {
                Ordering::Less => true,
                Ordering::Greater => false,
                Ordering::Equal => a < b,
            },
        }
    }

    fn swap(&mut self, i: usize, j: usize) {
        self.heap.swap(i, j);
        let (a, b) = (self.heap[i], self.heap[j]);
        self.entries[a.index()].heap_pos = i as u32;
        self.entries[b.index()].heap_pos = j as u32;
    }

    fn sift_up(&mut self, mut pos: usize) {
        while pos > 0 {
            let parent = (pos - 1) / 2;
            if !self.less(self.heap[pos], self.heap[parent]) {
                break;
            }
            self.swap(pos, parent);
            pos = parent;
        }
    }

    fn sift_down(&mut self, mut pos: usize) {
        let len = self.heap.len();
        loop {
            let left = 2 * pos + 1;
            let right = left + 1;
            let mut smallest = pos;
            if left < len && self.less(self.heap[left], self.heap[smallest]) {
                smallest = left;
            }
            if right < len && self.less(self.heap[right], self.heap[smallest]) {
                smallest = right;
            }
            if smallest == pos {
                break;
            }
            self.swap(pos, smallest);
            pos = smallest;
        }
    }

    #[cfg(test)]
    fn heap_is_valid(&self) -> bool {
        (1..self.heap.len()).all(|i| !self.less(self.heap[i], self.heap[(i - 1) / 2]))
            && self
                .heap
                .iter()
                .enumerate()
                .all(|(i, id)| self.entries[id.index()].heap_pos as usize == i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(i: usize) -> CellId {
        CellId::new(i)
    }

    #[test]
    fn pops_in_cost_order() {
        let mut f = Frontier::new(16);
        let costs = [7.0, 3.0, 9.0, 1.0, 5.0, 3.5, 8.0];
        for (i, &c) in costs.iter().enumerate() {
            f.set_cost(id(i), 0.0, c, None);
            assert!(f.heap_is_valid());
        }
        let mut popped = Vec::new();
        while let Ok(cell) = f.pop_best() {
            assert!(f.heap_is_valid());
            popped.push(f.data_for(cell).total_cost);
        }
        assert_eq!(popped, vec![1.0, 3.0, 3.5, 5.0, 7.0, 8.0, 9.0]);
    }

    #[test]
    fn decrease_key_reorders_and_updates_parent() {
        let mut f = Frontier::new(8);
        f.set_cost(id(0), 1.0, 10.0, None);
        f.set_cost(id(1), 1.0, 6.0, None);
        f.set_cost(id(2), 1.0, 8.0, None);

        f.set_cost(id(0), 1.0, 4.0, Some(id(5)));
        assert!(f.heap_is_valid());
        let entry = f.data_for(id(0));
        assert_eq!(entry.total_cost, 4.0);
        assert_eq!(entry.path_cost, 3.0);
        assert_eq!(entry.parent, Some(id(5)));

        // A worse cost never replaces a better one.
        f.set_cost(id(0), 1.0, 20.0, Some(id(6)));
        assert_eq!(f.data_for(id(0)).parent, Some(id(5)));

        assert_eq!(f.pop_best(), Ok(id(0)));
        assert_eq!(f.pop_best(), Ok(id(1)));
    }

    #[test]
    fn finalized_cells_ignore_updates() {
        let mut f = Frontier::new(4);
        f.set_cost(id(2), 0.0, 5.0, None);
        assert_eq!(f.pop_best(), Ok(id(2)));
        f.set_cost(id(2), 0.0, 1.0, Some(id(3)));
        assert!(f.is_empty());
        assert_eq!(f.data_for(id(2)).total_cost, 5.0);
        assert_eq!(f.data_for(id(2)).state, EntryState::Finalized);
        assert!(f.is_visited(id(2)));
    }

    #[test]
    fn empty_pop_reports_empty_frontier() {
        let mut f = Frontier::new(2);
        assert_eq!(f.pop_best(), Err(RouterError::EmptyFrontier));
    }

    #[test]
    fn ties_prefer_deeper_then_lower_id() {
        let mut f = Frontier::new(8);
        f.set_cost(id(4), 4.0, 6.0, None);
        f.set_cost(id(3), 2.0, 6.0, None);
        f.set_cost(id(1), 2.0, 6.0, None);
        assert_eq!(f.pop_best(), Ok(id(1)));
        assert_eq!(f.pop_best(), Ok(id(3)));
        assert_eq!(f.pop_best(), Ok(id(4)));
    }

    #[test]
    fn clear_resets_only_touched_cells() {
        let mut f = Frontier::new(64);
        for i in (0..64).step_by(3) {
            f.set_cost(id(i), 0.0, (64 - i) as Cost, None);
        }
        f.pop_best().unwrap();
        assert_eq!(f.touched().len(), 22);

        f.clear();
        assert!(f.is_empty());
        assert!(f.touched().is_empty());
        for i in 0..64 {
            assert!(!f.is_visited(id(i)));
            assert_eq!(f.data_for(id(i)).state, EntryState::Untouched);
        }

        // Reusable after clear.
        f.set_cost(id(9), 0.0, 2.0, None);
        assert_eq!(f.pop_best(), Ok(id(9)));
    }
}
