use std::fmt::{self, Display, Formatter};

/// The two high bits that mark a word as a heap address.
pub const POINTER_TAG: u64 = 0b11 << 62;

const INDEX_BITS: u32 = 32;
const INDEX_MASK: u64 = (1 << INDEX_BITS) - 1;
const GENERATION_MASK: u64 = !POINTER_TAG >> INDEX_BITS;

/// Arena index plus the generation the cell had when it was handed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRef {
    pub index: u32,
    pub generation: u32,
}

impl CellRef {
    pub fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn to_word(self) -> i64 {
        let generation = self.generation as u64 & GENERATION_MASK;
        (POINTER_TAG | (generation << INDEX_BITS) | self.index as u64) as i64
    }

    pub fn from_word(word: i64) -> Option<Self> {
        if !is_pointer_word(word) {
            return None;
        }
        let bits = word as u64 & !POINTER_TAG;
        Some(Self {
            index: (bits & INDEX_MASK) as u32,
            generation: (bits >> INDEX_BITS) as u32,
        })
    }
}

pub fn is_pointer_word(word: i64) -> bool {
    word as u64 & POINTER_TAG == POINTER_TAG
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value {
    Integer(i64),
    Pointer(CellRef),
}

impl Default for Value {
    fn default() -> Self {
        Value::Integer(0)
    }
}

impl Value {
    pub fn is_pointer(self) -> bool {
        matches!(self, Value::Pointer(_))
    }

    pub fn as_pointer(self) -> Option<CellRef> {
        match self {
            Value::Pointer(cell) => Some(cell),
            Value::Integer(_) => None,
        }
    }

    pub fn to_word(self) -> i64 {
        match self {
            Value::Integer(value) => value,
            Value::Pointer(cell) => cell.to_word(),
        }
    }

    pub fn is_zero(self) -> bool {
        self == Value::Integer(0)
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Value::Integer(value) => write!(f, "{}", value),
            Value::Pointer(cell) => write!(f, "cell@{}", cell.index),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<u8> for Value {
    fn from(value: u8) -> Self {
        Value::Integer(value as i64)
    }
}

impl From<CellRef> for Value {
    fn from(cell: CellRef) -> Self {
        Value::Pointer(cell)
    }
}
