//! Text rendering of the arena, one run of characters per block.
//!
//! Each block prints as its zero-padded size, its availability flag, then
//! one character per payload byte: the free-list link padded with `-` for
//! a free block, or `-c-` (the first payload byte) padded with `#` for a
//! used block.

use std::io::{self, Write};

use tas::arena::{BlockState, Heap};

/// Escape sequences wrapped around each part of a block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Palette {
    size: &'static str,
    link: &'static str,
    data: &'static str,
    reset: &'static str,
}

impl Palette {
    pub const ANSI: Palette = Palette {
        size: "\x1b[33m",
        link: "\x1b[32m",
        data: "\x1b[34m",
        reset: "\x1b[0m",
    };

    pub const PLAIN: Palette = Palette {
        size: "",
        link: "",
        data: "",
        reset: "",
    };
}

/// Write every block of `heap` in address order, then a newline.
pub fn render<W: Write>(heap: &Heap, palette: Palette, out: &mut W) -> io::Result<()> {
    for info in heap.blocks() {
        let width = info.capacity();
        write!(out, "{}{:08}", palette.size, info.size)?;
        write!(out, "{}{}", palette.reset, u8::from(info.is_free()))?;
        match info.state {
            BlockState::Free { next } => {
                let link = next.map_or_else(|| "nil".to_owned(), |b| b.to_string());
                write!(out, "{}{link:-<width$}", palette.link)?;
            }
            BlockState::Used => {
                let first = info
                    .payload()
                    .and_then(|p| heap.payload(p).first().copied())
                    .map_or('?', printable);
                write!(out, "{}{:#<width$}", palette.data, format!("-{first}-"))?;
            }
        }
        write!(out, "{}", palette.reset)?;
    }
    writeln!(out)
}

fn printable(byte: u8) -> char {
    if byte.is_ascii_graphic() {
        char::from(byte)
    } else {
        '.'
    }
}
