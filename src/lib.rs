mod config;
mod error;
mod gc;
mod grid;
mod heap;
mod stack;
mod symbol;
mod value;
mod vm;

pub use self::{
    config::*, error::*, gc::*, grid::*, heap::*, stack::*, symbol::*, value::*, vm::*,
};
