use std::io;

use crate::lzx::LzxDecoder;
use crate::mszip::MsZipDecompressor;
use crate::quantum::QuantumDecoder;

const CTYPE_NONE: u16 = 0;
const CTYPE_MSZIP: u16 = 1;
const CTYPE_QUANTUM: u16 = 2;
const CTYPE_LZX: u16 = 3;

const QUANTUM_LEVEL_MIN: u16 = 1;
const QUANTUM_LEVEL_MAX: u16 = 7;
const QUANTUM_MEMORY_MIN: u16 = 10;
const QUANTUM_MEMORY_MAX: u16 = 21;

const LZX_WINDOW_MIN: u16 = 15;
const LZX_WINDOW_MAX: u16 = 21;

/// A scheme for compressing data within the cabinet.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum CompressionType {
    /// No compression.
    None,
    /// MSZIP compression.  MSZIP is described further in
    /// [MS-MCI](https://msdn.microsoft.com/en-us/library/cc483131.aspx).
    MsZip,
    /// Quantum compression with the given level and memory (window bits).
    Quantum(u16, u16),
    /// LZX compression with the given window size, in bits (15..=21, i.e.
    /// 32 KB to 2 MB).  The LZX compression scheme is described further in
    /// [MS-PATCH](https://msdn.microsoft.com/en-us/library/cc483133.aspx).
    Lzx(u16),
}

impl CompressionType {
    pub(crate) fn from_bitfield(bits: u16) -> io::Result<CompressionType> {
        let ctype = bits & 0x000f;
        if ctype == CTYPE_NONE {
            Ok(CompressionType::None)
        } else if ctype == CTYPE_MSZIP {
            Ok(CompressionType::MsZip)
        } else if ctype == CTYPE_QUANTUM {
            let level = (bits & 0x00f0) >> 4;
            if !(QUANTUM_LEVEL_MIN..=QUANTUM_LEVEL_MAX).contains(&level) {
                invalid_data!("Invalid Quantum level: 0x{:02x}", level);
            }
            let memory = (bits & 0x1f00) >> 8;
            if !(QUANTUM_MEMORY_MIN..=QUANTUM_MEMORY_MAX).contains(&memory) {
                invalid_data!("Invalid Quantum memory: 0x{:02x}", memory);
            }
            Ok(CompressionType::Quantum(level, memory))
        } else if ctype == CTYPE_LZX {
            let window = (bits & 0x1f00) >> 8;
            if !(LZX_WINDOW_MIN..=LZX_WINDOW_MAX).contains(&window) {
                invalid_data!("Invalid LZX window: 0x{:02x}", window);
            }
            Ok(CompressionType::Lzx(window))
        } else {
            invalid_data!("Invalid compression type: 0x{:04x}", bits);
        }
    }

    pub(crate) fn to_bitfield(self) -> u16 {
        match self {
            CompressionType::None => CTYPE_NONE,
            CompressionType::MsZip => CTYPE_MSZIP,
            CompressionType::Quantum(level, memory) => {
                CTYPE_QUANTUM
                    | (level.max(QUANTUM_LEVEL_MIN).min(QUANTUM_LEVEL_MAX)
                        << 4)
                    | (memory.max(QUANTUM_MEMORY_MIN).min(QUANTUM_MEMORY_MAX)
                        << 8)
            }
            CompressionType::Lzx(window) => {
                CTYPE_LZX
                    | (window.max(LZX_WINDOW_MIN).min(LZX_WINDOW_MAX) << 8)
            }
        }
    }

    pub(crate) fn into_decompressor(self) -> io::Result<Decompressor> {
        match self {
            CompressionType::None => Ok(Decompressor::Uncompressed),
            CompressionType::MsZip => {
                Ok(Decompressor::MsZip(Box::new(MsZipDecompressor::new())))
            }
            CompressionType::Quantum(_, memory) => Ok(Decompressor::Quantum(
                Box::new(QuantumDecoder::new(memory as u8)?),
            )),
            CompressionType::Lzx(window) => {
                Ok(Decompressor::Lzx(Box::new(LzxDecoder::new(window as u8)?)))
            }
        }
    }
}

pub enum Decompressor {
    Uncompressed,
    MsZip(Box<MsZipDecompressor>),
    Lzx(Box<LzxDecoder>),
    Quantum(Box<QuantumDecoder>),
}

impl Decompressor {
    pub(crate) fn reset(&mut self) {
        match self {
            Self::Uncompressed => {}
            Self::MsZip(d) => d.reset(),
            // LZX and Quantum decoders are constructed fresh per folder
            // (they have no separate reset operation); nothing to do here.
            Self::Lzx(_) | Self::Quantum(_) => {}
        }
    }

    pub(crate) fn decompress(
        &mut self,
        data: Vec<u8>,
        uncompressed_size: usize,
    ) -> io::Result<Vec<u8>> {
        let data = match self {
            Decompressor::Uncompressed => data,
            Decompressor::MsZip(decompressor) => {
                decompressor.decompress_block(&data, uncompressed_size)?
            }
            Decompressor::Lzx(decompressor) => decompressor
                .decompress_block(&data, uncompressed_size)
                .map_err(io::Error::from)?,
            Decompressor::Quantum(decompressor) => decompressor
                .decompress_block(&data, uncompressed_size)
                .map_err(io::Error::from)?,
        };
        Ok(data)
    }
}
