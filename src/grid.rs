use crate::{Symbol, VmError};
use anyhow::{bail, Result};
use std::{
    fmt::{self, Display, Formatter},
    fs,
    path::Path,
};

pub const GRID_WIDTH: usize = 80;
pub const GRID_HEIGHT: usize = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Self::Up, Self::Down, Self::Left, Self::Right];

    pub fn random() -> Self {
        Self::ALL[fastrand::usize(..Self::ALL.len())]
    }
}

/// Position on the torus. Movement is total: leaving one edge re-enters at
/// the opposite edge and never touches the other axis.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProgramCounter {
    pub x: usize,
    pub y: usize,
}

impl ProgramCounter {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    pub fn step(&mut self, direction: Direction) {
        match direction {
            Direction::Up => self.y = (self.y + GRID_HEIGHT - 1) % GRID_HEIGHT,
            Direction::Down => self.y = (self.y + 1) % GRID_HEIGHT,
            Direction::Left => self.x = (self.x + GRID_WIDTH - 1) % GRID_WIDTH,
            Direction::Right => self.x = (self.x + 1) % GRID_WIDTH,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    cells: [[Symbol; GRID_WIDTH]; GRID_HEIGHT],
}

impl Default for Grid {
    fn default() -> Self {
        Self {
            cells: [[Symbol::BLANK; GRID_WIDTH]; GRID_HEIGHT],
        }
    }
}

impl Grid {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = match fs::read(path) {
            Ok(source) => source,
            Err(error) => bail!(VmError::UnreadableProgram {
                path: path.to_path_buf(),
                reason: error.to_string(),
            }),
        };
        Self::parse(&source)
    }

    pub fn parse(source: &[u8]) -> Result<Self> {
        let source = source.strip_suffix(b"\n").unwrap_or(source);
        let mut grid = Self::default();
        if source.is_empty() {
            return Ok(grid);
        }

        for (row, line) in source.split(|byte| *byte == b'\n').enumerate() {
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            if row >= GRID_HEIGHT {
                bail!(VmError::InvalidProgramShape { row, column: 0 });
            }
            if line.len() > GRID_WIDTH {
                bail!(VmError::InvalidProgramShape {
                    row,
                    column: line.len(),
                });
            }
            for (column, byte) in line.iter().enumerate() {
                grid.cells[row][column] = Symbol::encode(*byte);
            }
        }

        Ok(grid)
    }

    pub fn symbol_at(&self, pc: ProgramCounter) -> Symbol {
        self.cells[pc.y][pc.x]
    }

    pub fn get(&self, x: i64, y: i64) -> Option<Symbol> {
        let (x, y) = Self::checked_coordinates(x, y)?;
        Some(self.cells[y][x])
    }

    pub fn put(&mut self, x: i64, y: i64, symbol: Symbol) -> bool {
        match Self::checked_coordinates(x, y) {
            Some((x, y)) => {
                self.cells[y][x] = symbol;
                true
            }
            None => false,
        }
    }

    fn checked_coordinates(x: i64, y: i64) -> Option<(usize, usize)> {
        let x = usize::try_from(x).ok().filter(|x| *x < GRID_WIDTH)?;
        let y = usize::try_from(y).ok().filter(|y| *y < GRID_HEIGHT)?;
        Some((x, y))
    }
}

impl Display for Grid {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        for row in self.cells.iter() {
            let line = row.iter().map(|symbol| symbol.decode() as char).collect::<String>();
            writeln!(f, "{}", line.trim_end())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Opcode;
    use anyhow::Result;

    #[test]
    fn test_movement_wraps_around_edges() {
        let tests = [
            ((79, 3), Direction::Right, (0, 3)),
            ((0, 3), Direction::Left, (79, 3)),
            ((5, 24), Direction::Down, (5, 0)),
            ((5, 0), Direction::Up, (5, 24)),
            ((10, 10), Direction::Right, (11, 10)),
            ((10, 10), Direction::Up, (10, 9)),
        ];

        for ((x, y), direction, (expected_x, expected_y)) in tests {
            let mut pc = ProgramCounter::new(x, y);
            pc.step(direction);
            assert_eq!(pc, ProgramCounter::new(expected_x, expected_y), "Failed for {:?}", direction);
        }
    }

    #[test]
    fn test_parse_pads_with_blanks() -> Result<()> {
        let grid = Grid::parse(b"12\n\n@")?;
        assert_eq!(grid.symbol_at(ProgramCounter::new(0, 0)).opcode(), Some(Opcode::Push1));
        assert_eq!(grid.symbol_at(ProgramCounter::new(2, 0)), Symbol::BLANK);
        assert_eq!(grid.symbol_at(ProgramCounter::new(0, 1)), Symbol::BLANK);
        assert_eq!(grid.symbol_at(ProgramCounter::new(0, 2)).opcode(), Some(Opcode::End));
        assert_eq!(grid.symbol_at(ProgramCounter::new(79, 24)), Symbol::BLANK);
        Ok(())
    }

    #[test]
    fn test_parse_accepts_full_grid() -> Result<()> {
        let row = vec![b'v'; GRID_WIDTH];
        let source = vec![row; GRID_HEIGHT].join(&b"\r\n"[..]);
        let grid = Grid::parse(&source)?;
        assert_eq!(grid.symbol_at(ProgramCounter::new(79, 24)).opcode(), Some(Opcode::Down));
        Ok(())
    }

    #[test]
    fn test_parse_rejects_oversized_programs() {
        let too_wide = vec![b'1'; GRID_WIDTH + 1];
        let error = Grid::parse(&too_wide).unwrap_err();
        assert_eq!(
            error.downcast_ref::<VmError>(),
            Some(&VmError::InvalidProgramShape { row: 0, column: 81 })
        );

        let too_tall = "@\n".repeat(GRID_HEIGHT + 1);
        let error = Grid::parse(too_tall.as_bytes()).unwrap_err();
        assert_eq!(
            error.downcast_ref::<VmError>(),
            Some(&VmError::InvalidProgramShape { row: 25, column: 0 })
        );
    }

    #[test]
    fn test_load_missing_file() {
        let error = Grid::load("/nonexistent/program.bf").unwrap_err();
        assert!(matches!(
            error.downcast_ref::<VmError>(),
            Some(VmError::UnreadableProgram { .. })
        ));
    }

    #[test]
    fn test_get_and_put_check_bounds() {
        let mut grid = Grid::default();
        assert!(grid.put(79, 24, Symbol::encode(b'x')));
        assert_eq!(grid.get(79, 24).map(Symbol::decode), Some(b'x'));

        let tests = [(80, 0), (0, 25), (-1, 0), (0, -1)];
        for (x, y) in tests {
            assert_eq!(grid.get(x, y), None);
            assert!(!grid.put(x, y, Symbol::BLANK));
        }
    }

    #[test]
    fn test_display_renders_program_text() -> Result<()> {
        let grid = Grid::parse(b"\"ih\",,@\n  x")?;
        let rendered = grid.to_string();
        let mut lines = rendered.lines();
        assert_eq!(lines.next(), Some("\"ih\",,@"));
        assert_eq!(lines.next(), Some("  x"));
        assert_eq!(rendered.lines().count(), GRID_HEIGHT);
        Ok(())
    }
}
