//! Quantum codec (§4.7): an LZ77 + adaptive arithmetic coder, directly
//! grounded in the pack's standalone Quantum decompressor
//! (`dcarrero-unquantum`), whose `decode_symbol`/`Model`/`BitReader` this
//! module adapts from a whole-archive-at-once design to the per-CFDATA-
//! block, cross-block-persistent-state shape the rest of this crate's
//! codecs use. The encoder is this implementation's own addition (the
//! reference tool is decode-only): a standard complementary range coder
//! with E3 underflow scaling, built to produce exactly the bitstream shape
//! `decode_symbol` expects.

use crate::bitio::{MsbBitReader, MsbBitWriter};
use crate::error::{CabError, Result};

const POSITION_BASE: [u32; 42] = [
    0, 1, 2, 3, 4, 6, 8, 12, 16, 24, 32, 48, 64, 96, 128, 192, 256, 384, 512,
    768, 1024, 1536, 2048, 3072, 4096, 6144, 8192, 12288, 16384, 24576,
    32768, 49152, 65536, 98304, 131072, 196608, 262144, 393216, 524288,
    786432, 1048576, 1572864,
];

const EXTRA_BITS: [u8; 42] = [
    0, 0, 0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 8, 9, 9, 10, 10,
    11, 11, 12, 12, 13, 13, 14, 14, 15, 15, 16, 16, 17, 17, 18, 18, 19, 19,
];

const LENGTH_BASE: [u16; 27] = [
    0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 12, 14, 16, 20, 24, 32, 40, 48, 64, 80,
    96, 128, 192, 256, 384, 512,
];

const LENGTH_EXTRA: [u8; 27] = [
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 2, 2, 3, 3, 3, 4, 4, 4, 5, 6, 6, 7,
    7, 9,
];

const RESCALE_THRESHOLD: u16 = 3800;
const FREQ_INCREMENT: u16 = 8;

#[derive(Clone)]
struct ModelSym {
    sym: u16,
    cumfreq: u16,
}

/// An adaptive frequency model over a contiguous symbol range, mirroring
/// `unquantum`'s `Model` exactly (including its move-to-front-by-frequency
/// rescale behavior).
struct Model {
    shift_left: i32,
    entries: usize,
    syms: Vec<ModelSym>,
}

impl Model {
    fn new(start: u16, len: usize) -> Model {
        let mut syms = Vec::with_capacity(len + 1);
        for i in 0..=len {
            syms.push(ModelSym { sym: start + i as u16, cumfreq: (len - i) as u16 });
        }
        Model { shift_left: 4, entries: len, syms }
    }

    fn update(&mut self) {
        self.shift_left -= 1;
        if self.shift_left > 0 {
            for i in (0..self.entries).rev() {
                self.syms[i].cumfreq >>= 1;
                if self.syms[i].cumfreq <= self.syms[i + 1].cumfreq {
                    self.syms[i].cumfreq = self.syms[i + 1].cumfreq + 1;
                }
            }
        } else {
            self.shift_left = 50;
            for i in 0..self.entries {
                self.syms[i].cumfreq -= self.syms[i + 1].cumfreq;
                self.syms[i].cumfreq += 1;
                self.syms[i].cumfreq >>= 1;
            }
            for i in 0..self.entries.saturating_sub(1) {
                for j in (i + 1)..self.entries {
                    if self.syms[i].cumfreq < self.syms[j].cumfreq {
                        self.syms.swap(i, j);
                    }
                }
            }
            for i in (0..self.entries).rev() {
                self.syms[i].cumfreq += self.syms[i + 1].cumfreq;
            }
        }
    }

    /// Index of the symbol whose frequency bracket contains `sym` (its
    /// position in `self.syms`, not the symbol value itself).
    fn index_of(&self, sym: u16) -> usize {
        self.syms.iter().position(|s| s.sym == sym).expect("symbol in model")
    }

    fn bump(&mut self, index: usize) {
        let mut j = index;
        loop {
            self.syms[j].cumfreq += FREQ_INCREMENT;
            if j == 0 {
                break;
            }
            j -= 1;
        }
        if self.syms[0].cumfreq > RESCALE_THRESHOLD {
            self.update();
        }
    }
}

/// The arithmetic coder's H/L/C registers, shared by encode and decode.
struct Coder {
    h: u16,
    l: u16,
}

impl Coder {
    fn new() -> Coder {
        Coder { h: 0xffff, l: 0 }
    }
}

fn decode_symbol(
    model: &mut Model,
    coder: &mut Coder,
    c: &mut u16,
    bits: &mut MsbBitReader,
) -> Result<u16> {
    let h_val = coder.h as u32;
    let l_val = coder.l as u32;
    let c_val = *c as u32;

    let range = (h_val.wrapping_sub(l_val) & 0xffff) + 1;
    let total_freq = model.syms[0].cumfreq as u32;
    if total_freq == 0 || range == 0 {
        return Err(CabError::decompress(
            "Quantum arithmetic coder desync (zero frequency or range)",
        ));
    }

    let symf = ((c_val.wrapping_sub(l_val).wrapping_add(1).wrapping_mul(total_freq))
        .wrapping_sub(1)
        / range)
        & 0xffff;

    let mut i = 1usize;
    while i < model.entries {
        if (model.syms[i].cumfreq as u32) <= symf {
            break;
        }
        i += 1;
    }
    let sym = model.syms[i - 1].sym;

    let range2 = h_val.wrapping_sub(l_val) + 1;
    let new_h = l_val + ((model.syms[i - 1].cumfreq as u32 * range2) / total_freq) - 1;
    let new_l = l_val + ((model.syms[i].cumfreq as u32 * range2) / total_freq);
    coder.h = new_h as u16;
    coder.l = new_l as u16;

    model.bump(i - 1);

    loop {
        if (coder.l & 0x8000) != (coder.h & 0x8000) {
            if (coder.l & 0x4000) != 0 && (coder.h & 0x4000) == 0 {
                *c ^= 0x4000;
                coder.l &= 0x3fff;
                coder.h |= 0x4000;
            } else {
                break;
            }
        }
        coder.l <<= 1;
        coder.h = (coder.h << 1) | 1;
        let bit = bits.read_bits(1) as u16;
        *c = (*c << 1) | bit;
    }

    Ok(sym)
}

/// Encode-side counterpart of [`decode_symbol`]: a standard range coder
/// with E3 underflow scaling (pending-bit deferral), built to emit exactly
/// the bitstream `decode_symbol` consumes for the same model updates.
fn encode_symbol(
    model: &mut Model,
    coder: &mut Coder,
    pending: &mut u32,
    writer: &mut MsbBitWriter,
    sym: u16,
) {
    let index = model.index_of(sym);
    let total_freq = model.syms[0].cumfreq as u32;
    let range = coder.h as u32 - coder.l as u32 + 1;
    let new_h =
        coder.l as u32 + ((model.syms[index].cumfreq as u32 * range) / total_freq) - 1;
    let new_l = coder.l as u32
        + ((model.syms[index + 1].cumfreq as u32 * range) / total_freq);
    coder.h = new_h as u16;
    coder.l = new_l as u16;

    model.bump(index);

    loop {
        if (coder.l & 0x8000) == (coder.h & 0x8000) {
            let bit = ((coder.h >> 15) & 1) as u32;
            writer.write_bit(bit);
            while *pending > 0 {
                writer.write_bit(1 - bit);
                *pending -= 1;
            }
            coder.l <<= 1;
            coder.h = (coder.h << 1) | 1;
        } else if (coder.l & 0x4000) != 0 && (coder.h & 0x4000) == 0 {
            *pending += 1;
            coder.l &= 0x3fff;
            coder.h |= 0x4000;
            coder.l <<= 1;
            coder.h = (coder.h << 1) | 1;
        } else {
            break;
        }
    }
}

fn flush_encoder(coder: &mut Coder, pending: &mut u32, writer: &mut MsbBitWriter) {
    let bit = ((coder.l >> 15) & 1) as u32;
    writer.write_bit(bit);
    while *pending > 0 {
        writer.write_bit(1 - bit);
        *pending -= 1;
    }
    writer.write_bits((coder.l & 0x7fff) as u32, 15);
}

fn position_slot_for(offset: u32) -> Result<(usize, u32)> {
    let value = offset - 1;
    for (slot, &base) in POSITION_BASE.iter().enumerate() {
        let extra = EXTRA_BITS[slot] as u32;
        let span = 1u32 << extra;
        if value >= base && value < base + span {
            return Ok((slot, value - base));
        }
    }
    Err(CabError::decompress("Quantum match offset out of range"))
}

fn length_slot_for(extra_length: u32) -> Result<(usize, u32)> {
    for (slot, &base) in LENGTH_BASE.iter().enumerate() {
        let extra = LENGTH_EXTRA[slot] as u32;
        let span = 1u32 << extra;
        if (extra_length as u16) >= base && extra_length < base as u32 + span {
            return Ok((slot, extra_length - base as u32));
        }
    }
    Err(CabError::decompress("Quantum match length out of range"))
}

struct Models {
    model0: Model,
    model1: Model,
    model2: Model,
    model3: Model,
    model4: Model,
    model5: Model,
    model6: Model,
    model6len: Model,
    model7: Model,
}

impl Models {
    fn new(window_bits: u8) -> Models {
        let i = (window_bits as usize) * 2;
        Models {
            model0: Model::new(0, 64),
            model1: Model::new(64, 64),
            model2: Model::new(128, 64),
            model3: Model::new(192, 64),
            model4: Model::new(0, i.min(24)),
            model5: Model::new(0, i.min(36)),
            model6: Model::new(0, i),
            model6len: Model::new(0, 27),
            model7: Model::new(0, 7),
        }
    }
}

struct Window {
    buf: Vec<u8>,
    size: usize,
    pos: usize,
}

impl Window {
    fn new(window_bits: u8) -> Window {
        let size = 1usize << window_bits;
        Window { buf: vec![0u8; size], size, pos: 0 }
    }

    fn push(&mut self, byte: u8) {
        self.buf[self.pos] = byte;
        self.pos = (self.pos + 1) % self.size;
    }

    fn copy_match(&mut self, distance: usize, length: usize, out: &mut Vec<u8>) {
        for _ in 0..length {
            let src = (self.pos + self.size - distance) % self.size;
            let byte = self.buf[src];
            self.push(byte);
            out.push(byte);
        }
    }
}

/// Decodes Quantum frames one CFDATA block at a time, keeping the
/// arithmetic coder state, adaptive models, and match window alive across
/// calls within a folder.
pub struct QuantumDecoder {
    window: Window,
    models: Models,
    coder: Coder,
    c: u16,
    started: bool,
}

impl QuantumDecoder {
    pub fn new(window_bits: u8) -> Result<QuantumDecoder> {
        if !(10..=21).contains(&window_bits) {
            return Err(CabError::unsupported(format!(
                "Quantum window size of {} bits is out of the supported 10..=21 range",
                window_bits
            )));
        }
        Ok(QuantumDecoder {
            window: Window::new(window_bits),
            models: Models::new(window_bits),
            coder: Coder::new(),
            c: 0,
            started: false,
        })
    }

    /// Decodes one CFDATA block's payload into exactly `uncompressed_size`
    /// bytes. Each block's compressed bytes are treated as their own
    /// byte-aligned bitstream (matching this crate's LZX decoder, and this
    /// encoder's matching per-block `finish()`), while the arithmetic coder
    /// registers, adaptive models, and match window persist across blocks.
    pub fn decompress_block(
        &mut self,
        data: &[u8],
        uncompressed_size: usize,
    ) -> Result<Vec<u8>> {
        let mut bits = MsbBitReader::new(data);

        if !self.started {
            let _header = bits.read_bits(1);
            self.c = bits.read_bits(16);
            self.started = true;
        }

        let mut output = Vec::with_capacity(uncompressed_size);
        while output.len() < uncompressed_size {
            let selector = decode_symbol(
                &mut self.models.model7,
                &mut self.coder,
                &mut self.c,
                &mut bits,
            )?;

            if selector < 4 {
                let model = match selector {
                    0 => &mut self.models.model0,
                    1 => &mut self.models.model1,
                    2 => &mut self.models.model2,
                    _ => &mut self.models.model3,
                };
                let sym =
                    decode_symbol(model, &mut self.coder, &mut self.c, &mut bits)?;
                let byte = sym as u8;
                self.window.push(byte);
                output.push(byte);
            } else {
                let (offset, length) = match selector {
                    4 => {
                        let sym = decode_symbol(
                            &mut self.models.model4,
                            &mut self.coder,
                            &mut self.c,
                            &mut bits,
                        )? as usize;
                        if sym >= POSITION_BASE.len() {
                            return Err(CabError::decompress(
                                "invalid Quantum position slot",
                            ));
                        }
                        let extra = bits.read_many_bits(EXTRA_BITS[sym] as u32);
                        (POSITION_BASE[sym] + extra + 1, 3usize)
                    }
                    5 => {
                        let sym = decode_symbol(
                            &mut self.models.model5,
                            &mut self.coder,
                            &mut self.c,
                            &mut bits,
                        )? as usize;
                        if sym >= POSITION_BASE.len() {
                            return Err(CabError::decompress(
                                "invalid Quantum position slot",
                            ));
                        }
                        let extra = bits.read_many_bits(EXTRA_BITS[sym] as u32);
                        (POSITION_BASE[sym] + extra + 1, 4usize)
                    }
                    6 => {
                        let len_sym = decode_symbol(
                            &mut self.models.model6len,
                            &mut self.coder,
                            &mut self.c,
                            &mut bits,
                        )? as usize;
                        if len_sym >= LENGTH_BASE.len() {
                            return Err(CabError::decompress(
                                "invalid Quantum length slot",
                            ));
                        }
                        let len_extra =
                            bits.read_many_bits(LENGTH_EXTRA[len_sym] as u32);
                        let length =
                            LENGTH_BASE[len_sym] as usize + len_extra as usize + 5;
                        let pos_sym = decode_symbol(
                            &mut self.models.model6,
                            &mut self.coder,
                            &mut self.c,
                            &mut bits,
                        )? as usize;
                        if pos_sym >= POSITION_BASE.len() {
                            return Err(CabError::decompress(
                                "invalid Quantum position slot",
                            ));
                        }
                        let pos_extra =
                            bits.read_many_bits(EXTRA_BITS[pos_sym] as u32);
                        (POSITION_BASE[pos_sym] + pos_extra + 1, length)
                    }
                    _ => {
                        return Err(CabError::decompress(format!(
                            "invalid Quantum selector {}",
                            selector
                        )))
                    }
                };
                let copy_len = length.min(uncompressed_size - output.len());
                if offset as usize == 0 || offset as usize > self.window.size {
                    return Err(CabError::decompress(
                        "Quantum match offset out of range",
                    ));
                }
                self.window.copy_match(offset as usize, copy_len, &mut output);
            }
        }

        Ok(output)
    }
}

/// Encodes Quantum frames one CFDATA block at a time. Literal bytes are
/// routed through one of `model0`..`model3`, chosen by the two high bits of
/// the previously emitted byte, matching the decoder's literal branch
/// (which selects the same model from the selector it reads off
/// `model7`).
pub struct QuantumEncoder {
    window: Window,
    models: Models,
    coder: Coder,
    pending: u32,
    started: bool,
    prev_byte: u8,
}

impl QuantumEncoder {
    pub fn new(window_bits: u8) -> Result<QuantumEncoder> {
        if !(10..=21).contains(&window_bits) {
            return Err(CabError::unsupported(format!(
                "Quantum window size of {} bits is out of the supported 10..=21 range",
                window_bits
            )));
        }
        Ok(QuantumEncoder {
            window: Window::new(window_bits),
            models: Models::new(window_bits),
            coder: Coder::new(),
            pending: 0,
            started: false,
            prev_byte: 0,
        })
    }

    pub fn compress_frame(&mut self, data: &[u8]) -> Vec<u8> {
        let mut writer = MsbBitWriter::new();
        if !self.started {
            // One header bit precedes the 16 bits that seed `c`. Both are
            // arbitrary from the encoder's perspective: the first
            // renormalization step is consistent regardless of their value
            // (mirrors the classic range-coder "dummy" priming read/write
            // pair).
            writer.write_bits(0, 1);
            writer.write_bits(0, 16);
            self.started = true;
        }

        let tokens = self.tokenize(data);
        for token in tokens {
            match token {
                Token::Literal(byte) => {
                    let model_idx = ((self.prev_byte >> 6) & 0x3) as usize;
                    encode_symbol(
                        &mut self.models.model7,
                        &mut self.coder,
                        &mut self.pending,
                        &mut writer,
                        model_idx as u16,
                    );
                    let model = match model_idx {
                        0 => &mut self.models.model0,
                        1 => &mut self.models.model1,
                        2 => &mut self.models.model2,
                        _ => &mut self.models.model3,
                    };
                    encode_symbol(
                        model,
                        &mut self.coder,
                        &mut self.pending,
                        &mut writer,
                        byte as u16,
                    );
                    self.prev_byte = byte;
                }
                Token::Match { distance, length, last_byte } => {
                    if length == 3 {
                        let (slot, extra) = position_slot_for(distance).unwrap_or((0, 0));
                        encode_symbol(
                            &mut self.models.model7,
                            &mut self.coder,
                            &mut self.pending,
                            &mut writer,
                            4,
                        );
                        encode_symbol(
                            &mut self.models.model4,
                            &mut self.coder,
                            &mut self.pending,
                            &mut writer,
                            slot as u16,
                        );
                        writer.write_many_bits(extra, EXTRA_BITS[slot] as u32);
                    } else if length == 4 {
                        let (slot, extra) = position_slot_for(distance).unwrap_or((0, 0));
                        encode_symbol(
                            &mut self.models.model7,
                            &mut self.coder,
                            &mut self.pending,
                            &mut writer,
                            5,
                        );
                        encode_symbol(
                            &mut self.models.model5,
                            &mut self.coder,
                            &mut self.pending,
                            &mut writer,
                            slot as u16,
                        );
                        writer.write_many_bits(extra, EXTRA_BITS[slot] as u32);
                    } else {
                        let (len_slot, len_extra) =
                            length_slot_for((length - 5) as u32).unwrap_or((0, 0));
                        let (pos_slot, pos_extra) =
                            position_slot_for(distance).unwrap_or((0, 0));
                        encode_symbol(
                            &mut self.models.model7,
                            &mut self.coder,
                            &mut self.pending,
                            &mut writer,
                            6,
                        );
                        encode_symbol(
                            &mut self.models.model6len,
                            &mut self.coder,
                            &mut self.pending,
                            &mut writer,
                            len_slot as u16,
                        );
                        writer.write_many_bits(
                            len_extra,
                            LENGTH_EXTRA[len_slot] as u32,
                        );
                        encode_symbol(
                            &mut self.models.model6,
                            &mut self.coder,
                            &mut self.pending,
                            &mut writer,
                            pos_slot as u16,
                        );
                        writer.write_many_bits(
                            pos_extra,
                            EXTRA_BITS[pos_slot] as u32,
                        );
                    }
                    self.prev_byte = last_byte;
                }
            }
        }
        flush_encoder(&mut self.coder, &mut self.pending, &mut writer);
        writer.finish()
    }

    fn tokenize(&mut self, data: &[u8]) -> Vec<Token> {
        const MAX_LEN: usize = 1023 + 5;
        let mut tokens = Vec::new();
        let mut pos = 0usize;
        let mut history: Vec<u8> = Vec::new();
        while pos < data.len() {
            let max_len = MAX_LEN.min(data.len() - pos);
            let mut best_len = 0usize;
            let mut best_distance = 0u32;
            if max_len >= 3 {
                let search_limit = history.len().min(self.window.size);
                for back in 1..=search_limit {
                    let start = history.len() - back;
                    let mut len = 0;
                    while len < max_len
                        && start + len < history.len()
                        && history[start + len] == data[pos + len]
                    {
                        len += 1;
                    }
                    while len < max_len
                        && start + len >= history.len()
                        && data[pos + (start + len - history.len())] == data[pos + len]
                    {
                        len += 1;
                    }
                    if len > best_len {
                        best_len = len;
                        best_distance = back as u32;
                        if best_len == max_len {
                            break;
                        }
                    }
                }
            }
            if best_len >= 3 {
                let last_byte = data[pos + best_len - 1];
                tokens.push(Token::Match {
                    distance: best_distance,
                    length: best_len,
                    last_byte,
                });
                for i in 0..best_len {
                    let byte = data[pos + i];
                    self.window.push(byte);
                    history.push(byte);
                }
                pos += best_len;
            } else {
                let byte = data[pos];
                tokens.push(Token::Literal(byte));
                self.window.push(byte);
                history.push(byte);
                pos += 1;
            }
        }
        tokens
    }
}

enum Token {
    Literal(u8),
    Match { distance: u32, length: usize, last_byte: u8 },
}

trait WriteManyBits {
    fn write_many_bits(&mut self, value: u32, n: u32);
}

impl WriteManyBits for MsbBitWriter {
    fn write_many_bits(&mut self, value: u32, n: u32) {
        if n <= 16 {
            self.write_bits(value, n);
            return;
        }
        self.write_bits(value >> 16, n - 16);
        self.write_bits(value & 0xffff, 16);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_small_text() {
        let input = b"abababababababababababab".to_vec();
        let mut encoder = QuantumEncoder::new(10).unwrap();
        let compressed = encoder.compress_frame(&input);
        let mut decoder = QuantumDecoder::new(10).unwrap();
        let decompressed =
            decoder.decompress_block(&compressed, input.len()).unwrap();
        assert_eq!(decompressed, input);
    }

    #[test]
    fn round_trip_empty_frame() {
        let input: Vec<u8> = Vec::new();
        let mut encoder = QuantumEncoder::new(10).unwrap();
        let compressed = encoder.compress_frame(&input);
        let mut decoder = QuantumDecoder::new(10).unwrap();
        let decompressed = decoder.decompress_block(&compressed, 0).unwrap();
        assert_eq!(decompressed, input);
    }

    #[test]
    fn rejects_unsupported_window_size() {
        assert!(QuantumDecoder::new(9).is_err());
        assert!(QuantumDecoder::new(22).is_err());
    }

    #[test]
    fn model_rescale_preserves_monotonic_cumfreq() {
        let mut model = Model::new(0, 8);
        for _ in 0..600 {
            model.bump(0);
        }
        for i in 0..model.entries {
            assert!(model.syms[i].cumfreq > model.syms[i + 1].cumfreq);
        }
    }
}
