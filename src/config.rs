use crate::{DEFAULT_HEAP_CAPACITY, DEFAULT_STACK_CAPACITY};

/// Resource limits fixed when a machine is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VmConfig {
    pub stack_capacity: usize,
    pub heap_capacity: usize,
    /// Stop with an error after this many instructions. `None` runs until `@`.
    pub max_steps: Option<u64>,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            stack_capacity: DEFAULT_STACK_CAPACITY,
            heap_capacity: DEFAULT_HEAP_CAPACITY,
            max_steps: None,
        }
    }
}

impl VmConfig {
    pub fn with_heap_capacity(mut self, heap_capacity: usize) -> Self {
        self.heap_capacity = heap_capacity;
        self
    }

    pub fn with_stack_capacity(mut self, stack_capacity: usize) -> Self {
        self.stack_capacity = stack_capacity;
        self
    }

    pub fn with_max_steps(mut self, max_steps: Option<u64>) -> Self {
        self.max_steps = max_steps;
        self
    }
}
