use crate::{CellRef, Value, VmError};
use anyhow::{bail, Result};
use tracing::error;

pub const DEFAULT_HEAP_CAPACITY: usize = 1 << 24;

pub const POISON_HEAD: i64 = 0xDEAD_BABE;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    pub head: Value,
    pub tail: Value,
    pub marked: bool,
    pub free: bool,
    pub generation: u32,
}

impl Cell {
    fn new(head: Value, tail: Value) -> Self {
        Self {
            head,
            tail,
            marked: false,
            free: false,
            generation: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapStats {
    pub live: usize,
    pub free: usize,
    pub high_water: usize,
    pub capacity: usize,
}

#[derive(Debug, Clone)]
pub struct Heap {
    cells: Vec<Cell>,
    free_list: Vec<u32>,
    capacity: usize,
    live: usize,
}

impl Default for Heap {
    fn default() -> Self {
        Self::new(DEFAULT_HEAP_CAPACITY)
    }
}

impl Heap {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.min(u32::MAX as usize);
        Self {
            cells: Vec::new(),
            free_list: Vec::new(),
            capacity,
            live: 0,
        }
    }

    pub fn has_space(&self) -> bool {
        self.cells.len() < self.capacity || !self.free_list.is_empty()
    }

    pub fn allocate(&mut self, head: Value, tail: Value) -> Result<CellRef> {
        let index = if self.cells.len() < self.capacity {
            self.cells.push(Cell::new(head, tail));
            (self.cells.len() - 1) as u32
        } else if let Some(index) = self.free_list.pop() {
            let cell = &mut self.cells[index as usize];
            cell.head = head;
            cell.tail = tail;
            cell.free = false;
            cell.marked = false;
            index
        } else {
            let stats = self.stats();
            error!(?stats, "heap exhausted");
            bail!(VmError::OutOfMemory {
                live: stats.live,
                capacity: stats.capacity,
            });
        };

        self.live += 1;
        Ok(CellRef::new(index, self.cells[index as usize].generation))
    }

    pub fn free(&mut self, index: u32) {
        let cell = match self.cells.get_mut(index as usize) {
            Some(cell) if !cell.free => cell,
            _ => return,
        };
        cell.head = Value::Integer(POISON_HEAD);
        cell.tail = Value::Integer(0);
        cell.marked = false;
        cell.free = true;
        cell.generation = cell.generation.wrapping_add(1);
        self.free_list.push(index);
        self.live -= 1;
    }

    pub fn sweep_unmarked(&mut self) -> usize {
        let mut freed = 0;
        for index in 0..self.cells.len() {
            let cell = &mut self.cells[index];
            if !cell.free && !cell.marked {
                self.free(index as u32);
                freed += 1;
            } else {
                cell.marked = false;
            }
        }
        freed
    }

    pub fn get(&self, cell: CellRef) -> Result<&Cell> {
        match self.cells.get(cell.index as usize) {
            Some(resolved) if !resolved.free && resolved.generation == cell.generation => Ok(resolved),
            _ => bail!(VmError::DanglingPointer { index: cell.index }),
        }
    }

    pub fn mark(&mut self, cell: CellRef) -> bool {
        match self.cells.get_mut(cell.index as usize) {
            Some(resolved)
                if !resolved.free && !resolved.marked && resolved.generation == cell.generation =>
            {
                resolved.marked = true;
                true
            }
            _ => false,
        }
    }

    pub fn cell(&self, index: u32) -> Option<&Cell> {
        self.cells.get(index as usize)
    }

    pub fn stats(&self) -> HeapStats {
        HeapStats {
            live: self.live,
            free: self.free_list.len(),
            high_water: self.cells.len(),
            capacity: self.capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(value: i64) -> Value {
        Value::Integer(value)
    }

    #[test]
    fn test_bump_allocation() -> Result<()> {
        let mut heap = Heap::new(3);
        let first = heap.allocate(int(1), int(2))?;
        let second = heap.allocate(int(3), int(4))?;
        assert_eq!(first.index, 0);
        assert_eq!(second.index, 1);
        assert_eq!(heap.get(second)?.head, int(3));
        assert_eq!(heap.stats(), HeapStats { live: 2, free: 0, high_water: 2, capacity: 3 });
        Ok(())
    }

    #[test]
    fn test_full_heap_without_free_cells_is_out_of_memory() -> Result<()> {
        let mut heap = Heap::new(1);
        heap.allocate(int(1), int(1))?;
        assert!(!heap.has_space());
        let error = heap.allocate(int(2), int(2)).unwrap_err();
        assert_eq!(
            error.downcast_ref::<VmError>(),
            Some(&VmError::OutOfMemory { live: 1, capacity: 1 })
        );
        Ok(())
    }

    #[test]
    fn test_free_list_reuse_is_last_in_first_out() -> Result<()> {
        let mut heap = Heap::new(3);
        for value in 0..3 {
            heap.allocate(int(value), int(0))?;
        }
        heap.free(0);
        heap.free(2);
        assert!(heap.has_space());

        let reused = heap.allocate(int(9), int(9))?;
        assert_eq!(reused.index, 2);
        let reused = heap.allocate(int(8), int(8))?;
        assert_eq!(reused.index, 0);
        assert!(!heap.has_space());
        Ok(())
    }

    #[test]
    fn test_free_poisons_and_invalidates_references() -> Result<()> {
        let mut heap = Heap::new(2);
        let cell = heap.allocate(int(5), int(6))?;
        heap.free(cell.index);

        let freed = heap.cell(cell.index).unwrap();
        assert!(freed.free);
        assert_eq!(freed.head, int(POISON_HEAD));
        assert_eq!(freed.tail, int(0));

        let error = heap.get(cell).unwrap_err();
        assert_eq!(
            error.downcast_ref::<VmError>(),
            Some(&VmError::DanglingPointer { index: cell.index })
        );
        Ok(())
    }

    #[test]
    fn test_free_ignores_unknown_and_already_free_cells() -> Result<()> {
        let mut heap = Heap::new(2);
        let cell = heap.allocate(int(1), int(1))?;
        heap.free(7);
        heap.free(cell.index);
        heap.free(cell.index);
        assert_eq!(heap.stats(), HeapStats { live: 0, free: 1, high_water: 1, capacity: 2 });
        Ok(())
    }

    #[test]
    fn test_stale_reference_marks_nothing() -> Result<()> {
        let mut heap = Heap::new(1);
        let stale = heap.allocate(int(1), int(0))?;
        heap.free(stale.index);
        let reused = heap.allocate(int(2), int(0))?;
        assert_eq!(reused.index, stale.index);

        assert!(!heap.mark(stale));
        assert!(!heap.cell(reused.index).unwrap().marked);
        assert!(heap.mark(reused));
        Ok(())
    }

    #[test]
    fn test_sweep_frees_unmarked_and_clears_marks() -> Result<()> {
        let mut heap = Heap::new(4);
        let cells = (0..4)
            .map(|value| heap.allocate(int(value), int(0)))
            .collect::<Result<Vec<_>>>()?;
        heap.free(cells[3].index);

        assert!(heap.mark(cells[1]));
        assert!(!heap.mark(cells[1]));
        assert!(!heap.mark(cells[3]));

        assert_eq!(heap.sweep_unmarked(), 2);
        assert!(heap.get(cells[1]).is_ok());
        assert!(heap.get(cells[0]).is_err());
        assert!(heap.get(cells[2]).is_err());
        assert!(!heap.cell(1).unwrap().marked);
        assert_eq!(heap.stats(), HeapStats { live: 1, free: 3, high_water: 4, capacity: 4 });
        Ok(())
    }
}
