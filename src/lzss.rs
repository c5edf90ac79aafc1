//! LZSS codec (§4.4): a 4 KB sliding-window LZ77 variant used by the
//! `EXPAND`/`MSHELP`/`QBASIC` auxiliary cabinet dialects. Unlike the other
//! three codecs, matches and literals are selected by a raw one-bit-per-op
//! control byte rather than a Huffman code, so no entropy coder is involved
//! at all — this module is a direct, from-scratch reading of §4.4's decode
//! loop, the closest available reference in the retrieval pack being the
//! PKWare/`blast`-style LZ-with-dictionary structure (bit-buffer-driven
//! control flow, a circular window seeded with a fill byte), adapted to the
//! CAB dialects' much simpler unencoded control/offset/length fields.

use crate::error::{CabError, Result};

/// Size of the circular dictionary window.
const WINDOW_SIZE: usize = 4096;
const FILL_BYTE: u8 = 0x20;
const MIN_MATCH: usize = 3;
const MAX_MATCH: usize = 18;

/// The three CAB LZSS dialects, differing only in initial dictionary write
/// position and control-byte inversion (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LzssMode {
    Expand,
    MsHelp,
    QBasic,
}

impl LzssMode {
    fn initial_write_pos(self) -> usize {
        match self {
            LzssMode::Expand => WINDOW_SIZE - 16,
            LzssMode::MsHelp => WINDOW_SIZE - 16,
            LzssMode::QBasic => WINDOW_SIZE - 18,
        }
    }

    fn control_xor(self) -> u8 {
        match self {
            LzssMode::Expand => 0x00,
            LzssMode::MsHelp => 0xff,
            LzssMode::QBasic => 0x00,
        }
    }
}

struct Window {
    buf: [u8; WINDOW_SIZE],
    pos: usize,
}

impl Window {
    fn new(mode: LzssMode) -> Window {
        Window { buf: [FILL_BYTE; WINDOW_SIZE], pos: mode.initial_write_pos() }
    }

    fn push(&mut self, byte: u8) {
        self.buf[self.pos] = byte;
        self.pos = (self.pos + 1) % WINDOW_SIZE;
    }

    fn at(&self, offset: usize) -> u8 {
        self.buf[offset % WINDOW_SIZE]
    }
}

/// Decompresses an LZSS stream. `max_output`, if given, stops decoding once
/// that many bytes have been produced (the extractor uses this for the
/// skip-and-extract discipline of §4.10); otherwise decoding runs until the
/// input is exhausted.
pub fn decompress(
    data: &[u8],
    mode: LzssMode,
    max_output: Option<usize>,
) -> Result<Vec<u8>> {
    let mut window = Window::new(mode);
    let mut output = Vec::new();
    let mut pos = 0usize;

    'outer: while pos < data.len() {
        if let Some(limit) = max_output {
            if output.len() >= limit {
                break;
            }
        }
        let control = data[pos] ^ mode.control_xor();
        pos += 1;
        for bit in 0..8 {
            if let Some(limit) = max_output {
                if output.len() >= limit {
                    break 'outer;
                }
            }
            if pos >= data.len() {
                break 'outer;
            }
            let is_literal = (control >> bit) & 1 != 0;
            if is_literal {
                let byte = data[pos];
                pos += 1;
                output.push(byte);
                window.push(byte);
            } else {
                if pos + 1 >= data.len() {
                    break 'outer;
                }
                let b0 = data[pos];
                let b1 = data[pos + 1];
                pos += 2;
                let offset = (b0 as usize) | (((b1 & 0xf0) as usize) << 4);
                let length = (b1 & 0x0f) as usize + 3;
                for i in 0..length {
                    if let Some(limit) = max_output {
                        if output.len() >= limit {
                            break 'outer;
                        }
                    }
                    let byte = window.at(offset + i);
                    output.push(byte);
                    window.push(byte);
                }
            }
        }
    }

    if let Some(limit) = max_output {
        if output.len() < limit {
            return Err(CabError::truncated(
                "LZSS stream ended before requested output length",
            ));
        }
        output.truncate(limit);
    }
    Ok(output)
}

/// Compresses `data` with a brute-force longest-match search over the
/// circular window (§4.4's encode contract: symmetric with decode, min
/// match 3, max match 18, eight operations packed per control byte).
pub fn compress(data: &[u8], mode: LzssMode) -> Vec<u8> {
    let mut window = Window::new(mode);
    let mut output = Vec::new();
    let mut control_byte = 0u8;
    let mut control_bit = 0u32;
    let mut control_index: Option<usize> = None;
    let mut pos = 0usize;

    let flush_control = |output: &mut Vec<u8>,
                          control_index: &mut Option<usize>,
                          control_byte: u8,
                          mode: LzssMode| {
        if let Some(idx) = control_index.take() {
            output[idx] = control_byte ^ mode.control_xor();
        }
    };

    while pos < data.len() {
        if control_index.is_none() {
            output.push(0); // placeholder, patched in on flush
            control_index = Some(output.len() - 1);
            control_byte = 0;
            control_bit = 0;
        }

        let best = find_longest_match(&window, data, pos);
        match best {
            Some((match_offset, length)) if length >= MIN_MATCH => {
                let b0 = (match_offset & 0xff) as u8;
                let b1 = (((match_offset >> 4) & 0xf0) as u8)
                    | ((length - 3) as u8 & 0x0f);
                output.push(b0);
                output.push(b1);
                for i in 0..length {
                    window.push(data[pos + i]);
                }
                pos += length;
            }
            _ => {
                control_byte |= 1 << control_bit;
                output.push(data[pos]);
                window.push(data[pos]);
                pos += 1;
            }
        }

        control_bit += 1;
        if control_bit == 8 {
            flush_control(&mut output, &mut control_index, control_byte, mode);
        }
    }
    if control_bit != 0 {
        flush_control(&mut output, &mut control_index, control_byte, mode);
    }
    output
}

/// Searches the whole dictionary window for the longest run (3..=18 bytes)
/// that matches `data` starting at `pos`. The match source position is
/// expressed as an absolute window index (`window.pos`-relative arithmetic
/// is handled by the caller via modular indexing), matching the decoder's
/// `offset` field directly.
fn find_longest_match(
    window: &Window,
    data: &[u8],
    pos: usize,
) -> Option<(usize, usize)> {
    let max_len = MAX_MATCH.min(data.len() - pos);
    if max_len < MIN_MATCH {
        return None;
    }
    let mut best_len = 0usize;
    let mut best_offset = 0usize;
    for offset in 0..WINDOW_SIZE {
        let mut len = 0;
        while len < max_len && window.at(offset + len) == data[pos + len] {
            len += 1;
        }
        if len > best_len {
            best_len = len;
            best_offset = offset;
            if best_len == max_len {
                break;
            }
        }
    }
    if best_len >= MIN_MATCH {
        Some((best_offset, best_len))
    } else {
        None
    }
}
