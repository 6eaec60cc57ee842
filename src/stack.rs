use crate::{Value, VmError};
use anyhow::{bail, Result};

pub const DEFAULT_STACK_CAPACITY: usize = 1 << 20;

#[derive(Debug, Clone)]
pub struct OperandStack {
    contents: Vec<Value>,
    capacity: usize,
}

impl Default for OperandStack {
    fn default() -> Self {
        Self::new(DEFAULT_STACK_CAPACITY)
    }
}

impl OperandStack {
    pub fn new(capacity: usize) -> Self {
        Self {
            contents: Vec::new(),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.contents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    pub fn push(&mut self, value: Value) -> Result<()> {
        if self.contents.len() >= self.capacity {
            bail!(VmError::StackOverflow {
                capacity: self.capacity
            });
        }
        self.contents.push(value);
        Ok(())
    }

    pub fn pop(&mut self) -> Value {
        self.contents.pop().unwrap_or_default()
    }

    pub fn peek(&self) -> Option<Value> {
        self.contents.last().copied()
    }

    pub fn dup(&mut self) -> Result<()> {
        let top = self.peek().unwrap_or_default();
        self.push(top)
    }

    // missing operands are zeros: [x] becomes [x, 0]
    pub fn swap(&mut self) -> Result<()> {
        let a = self.pop();
        let b = self.pop();
        self.push(a)?;
        self.push(b)
    }

    pub fn as_slice(&self) -> &[Value] {
        &self.contents
    }
}
