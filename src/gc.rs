use crate::{Cell, CellRef, Heap, HeapStats, OperandStack, Value, VmError};
use anyhow::{bail, Result};
use tracing::debug;

// Roots are the pointer entries of the operand stack, mirrored in `roots`.
// Marking follows `tail` only; a pointer in the `head` of a heap cell does
// not keep its target alive.
#[derive(Debug, Clone, Default)]
pub struct Collector {
    stack: OperandStack,
    heap: Heap,
    roots: Vec<CellRef>,
    collections: usize,
}

impl Collector {
    pub fn new(stack: OperandStack, heap: Heap) -> Self {
        Self {
            stack,
            heap,
            roots: Vec::new(),
            collections: 0,
        }
    }

    pub fn push(&mut self, value: Value) -> Result<()> {
        self.stack.push(value)?;
        if let Value::Pointer(cell) = value {
            self.roots.push(cell);
        }
        Ok(())
    }

    pub fn pop(&mut self) -> Value {
        let value = self.stack.pop();
        if value.is_pointer() {
            self.roots.pop();
        }
        value
    }

    pub fn dup(&mut self) -> Result<()> {
        self.stack.dup()?;
        if let Some(Value::Pointer(cell)) = self.stack.peek() {
            self.roots.push(cell);
        }
        Ok(())
    }

    pub fn swap(&mut self) -> Result<()> {
        self.stack.swap()?;
        let top_two = &self.stack.as_slice()[self.stack.len() - 2..];
        if top_two.iter().all(|value| value.is_pointer()) {
            let length = self.roots.len();
            self.roots.swap(length - 1, length - 2);
        }
        Ok(())
    }

    pub fn allocate(&mut self, head: Value, tail: Value) -> Result<CellRef> {
        if !self.heap.has_space() {
            // not reachable from the stack yet
            let pending = [head, tail]
                .iter()
                .filter_map(|value| value.as_pointer())
                .collect::<Vec<_>>();
            self.collect(&pending);
        }
        self.heap.allocate(head, tail)
    }

    pub fn dereference_head(&self, value: Value) -> Result<Value> {
        Ok(self.resolve(value)?.head)
    }

    pub fn dereference_tail(&self, value: Value) -> Result<Value> {
        Ok(self.resolve(value)?.tail)
    }

    fn resolve(&self, value: Value) -> Result<&Cell> {
        match value {
            Value::Pointer(cell) => self.heap.get(cell),
            Value::Integer(word) => bail!(VmError::InvalidPointer { word }),
        }
    }

    pub fn collect(&mut self, extra_roots: &[CellRef]) -> usize {
        let before = self.heap.stats();
        let marked = self.mark(extra_roots);
        let freed = self.heap.sweep_unmarked();
        self.collections += 1;
        debug!(
            cycle = self.collections,
            roots = self.roots.len() + extra_roots.len(),
            marked,
            freed,
            live_before = before.live,
            live_after = self.heap.stats().live,
            "collection finished"
        );
        freed
    }

    fn mark(&mut self, extra_roots: &[CellRef]) -> usize {
        let mut worklist = self
            .roots
            .iter()
            .chain(extra_roots.iter())
            .copied()
            .collect::<Vec<_>>();
        let mut marked = 0;

        while let Some(cell) = worklist.pop() {
            if !self.heap.mark(cell) {
                continue;
            }
            marked += 1;
            if let Ok(resolved) = self.heap.get(cell) {
                if let Value::Pointer(next) = resolved.tail {
                    worklist.push(next);
                }
            }
        }

        marked
    }

    pub fn roots(&self) -> &[CellRef] {
        &self.roots
    }

    pub fn stack_snapshot(&self) -> &[Value] {
        self.stack.as_slice()
    }

    pub fn stack_len(&self) -> usize {
        self.stack.len()
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub fn heap_stats(&self) -> HeapStats {
        self.heap.stats()
    }

    pub fn collections(&self) -> usize {
        self.collections
    }
}
