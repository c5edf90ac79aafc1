//! Cabinet signature scanner (§4.9): finds cabinets embedded at arbitrary
//! offsets within a larger byte stream, such as a self-extracting archive.

use std::io::{Read, Seek, SeekFrom};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::cabinet::Cabinet;

/// Default chunk size used when scanning for embedded cabinet signatures.
pub const DEFAULT_SEARCH_BUFFER_SIZE: usize = 0x8000;

/// A candidate cabinet found while scanning a byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CabinetCandidate {
    /// Absolute byte offset of the candidate's `MSCF` signature.
    pub offset: u64,
    /// The candidate's declared total cabinet length, in bytes.
    pub cabinet_length: u32,
    /// The candidate's declared offset (relative to `offset`) of its first
    /// file entry.
    pub files_offset: u32,
}

/// Scans `reader` for byte sequences that look like valid cabinet headers,
/// returning every offset where [`Cabinet::new`] can successfully parse a
/// cabinet.
///
/// This does not require the signature to appear at the start of the
/// stream: a self-extracting installer, for instance, typically has an
/// executable stub before the first embedded cabinet. Scanning resumes 4
/// bytes past a signature that fails validation or parsing, so overlapping
/// `MSCF` byte patterns inside unrelated data are tolerated.
pub fn find_cabinets<R: Read + Seek>(
    mut reader: R,
) -> std::io::Result<Vec<CabinetCandidate>> {
    let file_length = reader.seek(SeekFrom::End(0))?;
    reader.seek(SeekFrom::Start(0))?;

    let mut found = Vec::new();
    let mut buffer = vec![0u8; DEFAULT_SEARCH_BUFFER_SIZE];
    let mut base_offset: u64 = 0;
    let mut carry: Vec<u8> = Vec::new();

    loop {
        let num_read = reader.read(&mut buffer)?;
        if num_read == 0 {
            break;
        }
        let mut window = carry.clone();
        window.extend_from_slice(&buffer[..num_read]);
        let window_base = base_offset - carry.len() as u64;

        let mut i = 0;
        while i + 4 <= window.len() {
            if &window[i..i + 4] == b"MSCF" {
                let absolute = window_base + i as u64;
                if let Some(candidate) = read_candidate_header(
                    &mut reader,
                    absolute,
                    file_length,
                )? {
                    found.push(candidate);
                    tracing::debug!(offset = absolute, "cabinet signature accepted");
                } else {
                    tracing::debug!(offset = absolute, "cabinet signature rejected");
                }
            }
            i += 1;
        }

        let keep = window.len().min(3);
        carry = window[window.len() - keep..].to_vec();
        base_offset += num_read as u64;
    }

    Ok(found)
}

/// Validates and reads the length/files-offset fields for a candidate
/// `MSCF` signature found at `offset`. Returns `None` (without consuming
/// stream position guarantees) if the candidate fails the bounds check in
/// §4.9.
fn read_candidate_header<R: Read + Seek>(
    reader: &mut R,
    offset: u64,
    file_length: u64,
) -> std::io::Result<Option<CabinetCandidate>> {
    reader.seek(SeekFrom::Start(offset + 8))?;
    let cabinet_length = reader.read_u32::<LittleEndian>()?;
    reader.seek(SeekFrom::Start(offset + 16))?;
    let files_offset = reader.read_u32::<LittleEndian>()?;

    let within_cabinet = (files_offset as u64) < (cabinet_length as u64);
    let offset_sane =
        offset + files_offset as u64 < file_length + 32;
    let length_sane =
        offset + cabinet_length as u64 < file_length + 32;
    if !within_cabinet || !offset_sane || !length_sane {
        return Ok(None);
    }

    reader.seek(SeekFrom::Start(offset))?;
    Ok(Some(CabinetCandidate { offset, cabinet_length, files_offset }))
}

/// Opens the cabinet at the given candidate offset within `reader`.
pub fn open_candidate<R: Read + Seek>(
    mut reader: R,
    candidate: &CabinetCandidate,
) -> std::io::Result<Cabinet<R>> {
    reader.seek(SeekFrom::Start(candidate.offset))?;
    Cabinet::new(reader)
}
