//! A library for reading, writing, searching, and extracting [Windows
//! cabinet](https://en.wikipedia.org/wiki/Cabinet_(file_format)) (CAB)
//! archives.
//!
//! A cabinet is a lossless container: a header, a table of folders (each an
//! independently-compressed run of bytes), and a table of files (each a
//! named byte range within one folder). This crate implements the container
//! format itself plus the handful of compression schemes Windows cabinets
//! use to pack folder data: no compression, MSZIP, LZX, and Quantum. A
//! fourth codec, [`lzss`], is included for compatibility with older
//! Microsoft archive formats that are not themselves cabinets but use the
//! same compression scheme.
//!
//! ```no_run
//! use std::fs::File;
//! use cabx::Cabinet;
//!
//! # fn main() -> std::io::Result<()> {
//! let mut cabinet = Cabinet::new(File::open("package.cab")?)?;
//! let mut file_reader = cabinet.read_file("readme.txt")?;
//! std::io::copy(&mut file_reader, &mut std::io::stdout())?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

extern crate byteorder;

#[macro_use]
mod macros;

mod bitio;
pub mod builder;
pub mod cabinet;
pub mod chain;
mod checksum;
pub mod consts;
pub mod ctype;
mod datetime;
pub mod error;
pub mod extractor;
pub mod file;
pub mod folder;
mod huffman;
pub mod lzss;
mod lzx;
mod mszip;
pub mod options;
mod quantum;
pub mod searcher;
mod string;

pub use crate::builder::{
    CabinetBuilder, CabinetWriter, FileBuilder, FileWriter, FolderBuilder,
};
pub use crate::cabinet::Cabinet;
pub use crate::chain::CabinetChain;
pub use crate::ctype::CompressionType;
pub use crate::error::{CabError, CabErrorKind, Result};
pub use crate::extractor::Extractor;
pub use crate::file::{FileEntries, FileEntry, FileReader};
pub use crate::folder::{FolderEntries, FolderEntry};
pub use crate::options::CabinetReaderConfig;
pub use crate::searcher::{find_cabinets, open_candidate, CabinetCandidate};
