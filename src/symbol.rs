use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::fmt::{self, Display, Formatter};

/// Command characters in opcode order; the position of a character is its
/// opcode number.
pub const CHARSET: &[u8; 40] = b"0123456789+-*/%!`><^v?_|\":\\$.,#gp&~@cht ";

pub const DATA_OFFSET: u32 = 1000;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
pub enum Opcode {
    Push0,
    Push1,
    Push2,
    Push3,
    Push4,
    Push5,
    Push6,
    Push7,
    Push8,
    Push9,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Not,
    GreaterThan,
    Right,
    Left,
    Up,
    Down,
    Random,
    HorizontalIf,
    VerticalIf,
    StringMode,
    Duplicate,
    Swap,
    Discard,
    OutputInteger,
    OutputCharacter,
    Bridge,
    Get,
    Put,
    InputInteger,
    InputCharacter,
    End,
    Cons,
    Head,
    Tail,
    Blank,
}

impl Opcode {
    pub fn character(self) -> char {
        CHARSET[u8::from(self) as usize] as char
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Symbol(u32);

impl Symbol {
    pub const BLANK: Symbol = Symbol(Opcode::Blank as u32);

    pub fn encode(byte: u8) -> Self {
        match CHARSET.iter().position(|c| *c == byte) {
            Some(code) => Symbol(code as u32),
            None => Symbol(DATA_OFFSET + byte as u32),
        }
    }

    pub fn decode(self) -> u8 {
        if self.0 < DATA_OFFSET {
            CHARSET[self.0 as usize]
        } else {
            (self.0 - DATA_OFFSET) as u8
        }
    }

    pub fn opcode(self) -> Option<Opcode> {
        u8::try_from(self.0)
            .ok()
            .and_then(|code| Opcode::try_from(code).ok())
    }

    pub fn id(self) -> u32 {
        self.0
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.decode() as char)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_byte_round_trips() {
        for byte in 0..=u8::MAX {
            assert_eq!(Symbol::encode(byte).decode(), byte, "Failed for byte {}", byte);
        }
    }

    #[test]
    fn test_commands_are_densely_packed() {
        let tests = [
            (b'0', Opcode::Push0),
            (b'9', Opcode::Push9),
            (b'+', Opcode::Add),
            (b'`', Opcode::GreaterThan),
            (b'"', Opcode::StringMode),
            (b'\\', Opcode::Swap),
            (b'@', Opcode::End),
            (b'c', Opcode::Cons),
            (b'h', Opcode::Head),
            (b't', Opcode::Tail),
            (b' ', Opcode::Blank),
        ];

        for (byte, opcode) in tests {
            let symbol = Symbol::encode(byte);
            assert!(symbol.id() < CHARSET.len() as u32);
            assert_eq!(symbol.opcode(), Some(opcode));
            assert_eq!(opcode.character(), byte as char);
        }
    }

    #[test]
    fn test_data_bytes_have_no_opcode() {
        let tests = [b'a', b'x', b'\t', 0, 200];
        for byte in tests {
            let symbol = Symbol::encode(byte);
            assert_eq!(symbol.id(), DATA_OFFSET + byte as u32);
            assert_eq!(symbol.opcode(), None);
        }
    }

    #[test]
    fn test_blank_symbol() {
        assert_eq!(Symbol::BLANK, Symbol::encode(b' '));
        assert_eq!(Symbol::BLANK.to_string(), " ");
    }
}
