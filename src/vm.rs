use crate::{
    Collector, Direction, Grid, Heap, Opcode, OperandStack, ProgramCounter, Symbol, Value, VmConfig,
    VmError,
};
use anyhow::{bail, Result};
use std::io::{BufRead, Write};
use tracing::trace;

#[derive(Debug)]
pub struct VirtualMachine {
    pub grid: Grid,
    pub pc: ProgramCounter,
    pub direction: Direction,
    pub gc: Collector,
    config: VmConfig,
    steps: u64,
    halted: bool,
}

impl VirtualMachine {
    pub fn new(grid: Grid) -> Self {
        Self::with_config(grid, VmConfig::default())
    }

    pub fn with_config(grid: Grid, config: VmConfig) -> Self {
        Self {
            grid,
            pc: ProgramCounter::default(),
            direction: Direction::Right,
            gc: Collector::new(
                OperandStack::new(config.stack_capacity),
                Heap::new(config.heap_capacity),
            ),
            config,
            steps: 0,
            halted: false,
        }
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn run(&mut self, input: &mut impl BufRead, output: &mut impl Write) -> Result<()> {
        while !self.halted {
            self.execute_cycle(input, output)?;
        }
        Ok(())
    }

    pub fn execute_cycle(
        &mut self,
        input: &mut impl BufRead,
        output: &mut impl Write,
    ) -> Result<()> {
        if self.halted {
            return Ok(());
        }
        if let Some(limit) = self.config.max_steps {
            if self.steps >= limit {
                bail!(VmError::StepLimitExceeded { limit });
            }
        }
        self.steps += 1;

        let symbol = self.grid.symbol_at(self.pc);
        let opcode = match symbol.opcode() {
            Some(opcode) => opcode,
            None => bail!(VmError::InvalidCommand {
                symbol: symbol.decode() as char,
                x: self.pc.x,
                y: self.pc.y,
            }),
        };
        trace!(x = self.pc.x, y = self.pc.y, ?opcode, "dispatch");

        match opcode {
            Opcode::Push0
            | Opcode::Push1
            | Opcode::Push2
            | Opcode::Push3
            | Opcode::Push4
            | Opcode::Push5
            | Opcode::Push6
            | Opcode::Push7
            | Opcode::Push8
            | Opcode::Push9 => {
                self.gc.push(Value::Integer(u8::from(opcode) as i64))?;
            }
            Opcode::Add
            | Opcode::Subtract
            | Opcode::Multiply
            | Opcode::Divide
            | Opcode::Modulo
            | Opcode::GreaterThan => {
                let right = self.gc.pop().to_word();
                let left = self.gc.pop().to_word();
                let result = match opcode {
                    Opcode::Add => left.wrapping_add(right),
                    Opcode::Subtract => left.wrapping_sub(right),
                    Opcode::Multiply => left.wrapping_mul(right),
                    Opcode::Divide if right == 0 => bail!(VmError::DivisionByZero),
                    Opcode::Divide => left.wrapping_div(right),
                    Opcode::Modulo if right == 0 => bail!(VmError::ModuloByZero),
                    Opcode::Modulo => left.wrapping_rem(right),
                    _ => (left > right) as i64,
                };
                self.gc.push(Value::Integer(result))?;
            }
            Opcode::Not => {
                let value = self.gc.pop();
                self.gc.push(Value::Integer(value.is_zero() as i64))?;
            }
            Opcode::Right => self.direction = Direction::Right,
            Opcode::Left => self.direction = Direction::Left,
            Opcode::Up => self.direction = Direction::Up,
            Opcode::Down => self.direction = Direction::Down,
            Opcode::Random => self.direction = Direction::random(),
            Opcode::HorizontalIf => {
                self.direction = if self.gc.pop().is_zero() {
                    Direction::Right
                } else {
                    Direction::Left
                };
            }
            Opcode::VerticalIf => {
                self.direction = if self.gc.pop().is_zero() {
                    Direction::Down
                } else {
                    Direction::Up
                };
            }
            Opcode::StringMode => {
                self.read_string()?;
                return Ok(());
            }
            Opcode::Duplicate => self.gc.dup()?,
            Opcode::Swap => self.gc.swap()?,
            Opcode::Discard => {
                self.gc.pop();
            }
            Opcode::OutputInteger => {
                let value = self.gc.pop();
                emit(output, |output| write!(output, "{}", value.to_word()))?;
            }
            Opcode::OutputCharacter => {
                let value = self.gc.pop();
                emit(output, |output| output.write_all(&[value.to_word() as u8]))?;
            }
            Opcode::Bridge => self.advance(),
            Opcode::Get => {
                let y = self.gc.pop().to_word();
                let x = self.gc.pop().to_word();
                match self.grid.get(x, y) {
                    Some(symbol) => self.gc.push(Value::from(symbol.decode()))?,
                    None => bail!(VmError::InvalidGridAccess { op: 'g', x, y }),
                }
            }
            Opcode::Put => {
                let y = self.gc.pop().to_word();
                let x = self.gc.pop().to_word();
                let value = self.gc.pop().to_word();
                let byte = match u8::try_from(value) {
                    Ok(byte) => byte,
                    Err(_) => bail!(VmError::InvalidGridValue { value }),
                };
                if !self.grid.put(x, y, Symbol::encode(byte)) {
                    bail!(VmError::InvalidGridAccess { op: 'p', x, y });
                }
            }
            Opcode::InputInteger => {
                let value = read_integer(input)?;
                self.gc.push(Value::Integer(value))?;
            }
            Opcode::InputCharacter => {
                let value = read_character(input)?;
                self.gc.push(Value::Integer(value))?;
            }
            Opcode::End => {
                self.halted = true;
                return Ok(());
            }
            Opcode::Cons => {
                let tail = self.gc.pop();
                let head = self.gc.pop();
                let cell = self.gc.allocate(head, tail)?;
                self.gc.push(Value::Pointer(cell))?;
            }
            Opcode::Head => {
                let pointer = self.gc.pop();
                let head = self.gc.dereference_head(pointer)?;
                self.gc.push(head)?;
            }
            Opcode::Tail => {
                let pointer = self.gc.pop();
                let tail = self.gc.dereference_tail(pointer)?;
                self.gc.push(tail)?;
            }
            Opcode::Blank => { /* Nothing to do */ }
        }

        self.advance();
        Ok(())
    }

    fn advance(&mut self) {
        self.pc.step(self.direction);
    }

    /// Pushes every byte between the quotes, leaving the counter one step
    /// past the closing quote.
    fn read_string(&mut self) -> Result<()> {
        self.advance();
        loop {
            let symbol = self.grid.symbol_at(self.pc);
            if symbol.opcode() == Some(Opcode::StringMode) {
                break;
            }
            self.gc.push(Value::from(symbol.decode()))?;
            self.advance();
        }
        self.advance();
        Ok(())
    }
}

fn emit<W: Write>(
    output: &mut W,
    write: impl FnOnce(&mut W) -> std::io::Result<()>,
) -> Result<()> {
    write(output)
        .and_then(|_| output.flush())
        .map_err(VmError::from)?;
    Ok(())
}

fn peek_byte(input: &mut impl BufRead) -> Result<Option<u8>> {
    let buffer = input.fill_buf().map_err(VmError::from)?;
    Ok(buffer.first().copied())
}

/// Skips leading whitespace and reads a signed decimal. Pushes 0 when no
/// digits follow.
fn read_integer(input: &mut impl BufRead) -> Result<i64> {
    while let Some(byte) = peek_byte(input)? {
        if !byte.is_ascii_whitespace() {
            break;
        }
        input.consume(1);
    }

    let mut text = String::new();
    if let Some(sign @ (b'-' | b'+')) = peek_byte(input)? {
        text.push(sign as char);
        input.consume(1);
    }
    while let Some(byte) = peek_byte(input)? {
        if !byte.is_ascii_digit() {
            break;
        }
        text.push(byte as char);
        input.consume(1);
    }

    Ok(text.parse::<i64>().unwrap_or(0))
}

fn read_character(input: &mut impl BufRead) -> Result<i64> {
    match peek_byte(input)? {
        Some(byte) => {
            input.consume(1);
            Ok(byte as i64)
        }
        None => Ok(-1),
    }
}
