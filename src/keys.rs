//! Logical keys and the raw byte decoder
//!
//! Remote input arrives as raw bytes, possibly with escape sequences
//! split across reads. The decoder keeps a tiny pending buffer so a
//! half-received arrow sequence survives until its tail shows up.
//! Bytes that decode to nothing are dropped without a state change.

/// A decoded input key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// Printable character, lowercased
    Char(char),
    Up,
    Down,
    Left,
    Right,
    /// Ctrl-C, the quit key in every screen state
    CtrlC,
}

const ESC: u8 = 0x1b;
const CTRL_C: u8 = 0x03;

/// Stateful byte-to-key decoder, one per session
#[derive(Debug, Default)]
pub struct KeyDecoder {
    pending: Vec<u8>,
}

impl KeyDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes, returning every key they complete
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Key> {
        self.pending.extend_from_slice(bytes);
        let mut keys = Vec::new();

        loop {
            match self.decode_front() {
                Decoded::Key(consumed, key) => {
                    self.pending.drain(..consumed);
                    keys.push(key);
                }
                Decoded::Skip(consumed) => {
                    self.pending.drain(..consumed);
                }
                Decoded::NeedMore => break,
                Decoded::Empty => break,
            }
        }
        keys
    }

    fn decode_front(&self) -> Decoded {
        let Some(&first) = self.pending.first() else {
            return Decoded::Empty;
        };

        match first {
            CTRL_C => Decoded::Key(1, Key::CtrlC),
            ESC => self.decode_escape(),
            b' ' => Decoded::Key(1, Key::Char(' ')),
            b if b.is_ascii_graphic() => {
                Decoded::Key(1, Key::Char((b as char).to_ascii_lowercase()))
            }
            // Control bytes, newlines, and anything non-ASCII: ignored.
            _ => Decoded::Skip(1),
        }
    }

    /// CSI arrow sequences: ESC [ A/B/C/D. Anything else starting with
    /// ESC is discarded once it is clearly not an arrow.
    fn decode_escape(&self) -> Decoded {
        match self.pending.get(1) {
            None => Decoded::NeedMore,
            Some(b'[') => match self.pending.get(2) {
                None => Decoded::NeedMore,
                Some(b'A') => Decoded::Key(3, Key::Up),
                Some(b'B') => Decoded::Key(3, Key::Down),
                Some(b'C') => Decoded::Key(3, Key::Right),
                Some(b'D') => Decoded::Key(3, Key::Left),
                Some(_) => Decoded::Skip(3),
            },
            Some(_) => Decoded::Skip(1),
        }
    }
}

enum Decoded {
    /// (bytes consumed, key)
    Key(usize, Key),
    /// Bytes consumed with no key produced
    Skip(usize),
    /// Sequence prefix; wait for more bytes
    NeedMore,
    Empty,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_printable_chars_are_lowercased() {
        let mut dec = KeyDecoder::new();
        assert_eq!(
            dec.feed(b"Hp"),
            vec![Key::Char('h'), Key::Char('p')]
        );
    }

    #[test]
    fn test_arrow_sequences() {
        let mut dec = KeyDecoder::new();
        assert_eq!(
            dec.feed(b"\x1b[A\x1b[B\x1b[C\x1b[D"),
            vec![Key::Up, Key::Down, Key::Right, Key::Left]
        );
    }

    #[test]
    fn test_split_escape_sequence_across_reads() {
        let mut dec = KeyDecoder::new();
        assert_eq!(dec.feed(b"\x1b"), vec![]);
        assert_eq!(dec.feed(b"["), vec![]);
        assert_eq!(dec.feed(b"D"), vec![Key::Left]);
    }

    #[test]
    fn test_ctrl_c_decodes_everywhere_in_stream() {
        let mut dec = KeyDecoder::new();
        assert_eq!(
            dec.feed(b"a\x03b"),
            vec![Key::Char('a'), Key::CtrlC, Key::Char('b')]
        );
    }

    #[test]
    fn test_undecodable_bytes_are_ignored() {
        let mut dec = KeyDecoder::new();
        assert_eq!(dec.feed(b"\x00\x1b[Z\xff"), vec![]);
        // Decoder still works afterwards.
        assert_eq!(dec.feed(b"x"), vec![Key::Char('x')]);
    }

    #[test]
    fn test_space_is_a_key() {
        let mut dec = KeyDecoder::new();
        assert_eq!(dec.feed(b" "), vec![Key::Char(' ')]);
    }
}
