use std::path::PathBuf;
use thiserror::Error;

/// Every condition that stops the machine. None of them are recoverable
/// inside the VM; the runner prints the message and exits with `exit_code`.
#[derive(Debug, Error, PartialEq)]
pub enum VmError {
    #[error("unable to open file {path:?}: {reason}")]
    UnreadableProgram { path: PathBuf, reason: String },

    #[error("not a valid befunge93 file: row={row}, column={column}")]
    InvalidProgramShape { row: usize, column: usize },

    #[error("division by zero")]
    DivisionByZero,

    #[error("modulo by zero")]
    ModuloByZero,

    #[error("stack overflow (capacity {capacity})")]
    StackOverflow { capacity: usize },

    #[error("out of memory: {live} live cells, {capacity} capacity")]
    OutOfMemory { live: usize, capacity: usize },

    #[error("invalid pointer access: {word}")]
    InvalidPointer { word: i64 },

    #[error("dangling pointer access: cell {index} was reclaimed")]
    DanglingPointer { index: u32 },

    #[error("{op}: invalid program location access: x={x} y={y}")]
    InvalidGridAccess { op: char, x: i64, y: i64 },

    #[error("all program values have to be ascii chars, instead {value} was given")]
    InvalidGridValue { value: i64 },

    #[error("invalid command detected << {symbol} >> at {x},{y}")]
    InvalidCommand { symbol: char, x: usize, y: usize },

    #[error("step limit of {limit} reached")]
    StepLimitExceeded { limit: u64 },

    #[error("i/o failure: {0}")]
    Io(String),
}

impl VmError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::UnreadableProgram { .. } | Self::InvalidProgramShape { .. } => 2,
            Self::DivisionByZero | Self::ModuloByZero => 3,
            Self::StackOverflow { .. } => 4,
            Self::OutOfMemory { .. } => 5,
            Self::InvalidPointer { .. } | Self::DanglingPointer { .. } => 6,
            Self::InvalidGridAccess { .. } | Self::InvalidGridValue { .. } => 7,
            Self::InvalidCommand { .. } => 8,
            Self::StepLimitExceeded { .. } => 9,
            Self::Io(_) => 10,
        }
    }
}

impl From<std::io::Error> for VmError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error.to_string())
    }
}
