use std::io::{self, Read, Seek, SeekFrom};
use std::marker::PhantomData;
use std::slice;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::cabinet::{Cabinet, ReadSeek};
use crate::checksum::Checksum;
use crate::ctype::{CompressionType, Decompressor};
use crate::file::{FileEntries, FileEntry};

/// An iterator over the folder entries in a cabinet.
#[derive(Clone)]
pub struct FolderEntries<'a> {
    pub(crate) iter: slice::Iter<'a, FolderEntry>,
}

/// Metadata about one folder in a cabinet.
pub struct FolderEntry {
    first_data_block_offset: u32,
    num_data_blocks: u16,
    compression_type: CompressionType,
    reserve_data: Vec<u8>,
    pub(crate) files: Vec<FileEntry>,
}

#[derive(Debug, Clone)]
struct DataBlockEntry {
    checksum: u32,
    compressed_size: u16,
    uncompressed_size: u16,
    reserve_data: Vec<u8>,
    data_offset: u64,
    cumulative_size: u64,
    segment_index: usize,
}

/// One physical cabinet's contribution to a (possibly chained) folder's
/// data blocks (§4.10).
///
/// A folder whose data is confined to a single cabinet has exactly one
/// segment; a folder that straddles a cabinet-set boundary is represented
/// as two or more segments, one per cabinet, read in order.
pub(crate) struct Segment<'a> {
    pub(crate) reader: &'a Cabinet<dyn ReadSeek + 'a>,
    pub(crate) first_data_block_offset: u32,
    pub(crate) num_data_blocks: usize,
    pub(crate) data_reserve_size: u8,
}

/// A reader for reading decompressed data from a cabinet folder.
pub(crate) struct FolderReader<'a, R> {
    segments: Vec<Segment<'a>>,
    num_data_blocks: usize,
    compression_type: CompressionType,
    decompressor: Decompressor,
    salvage: bool,
    /// The data blocks we've read so far.
    /// This always has len() <= num_data_blocks and grows once we encounter
    /// a new block in load_block().
    data_blocks: Vec<DataBlockEntry>,
    current_block_index: usize,
    current_block_data: Vec<u8>,
    current_offset_within_block: usize,
    current_offset_within_folder: u64,
    _p: PhantomData<R>,
}

impl<'a> Iterator for FolderEntries<'a> {
    type Item = &'a FolderEntry;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.iter.size_hint()
    }
}

impl<'a> ExactSizeIterator for FolderEntries<'a> {}

impl FolderEntry {
    /// Returns the scheme used to compress this folder's data.
    pub fn compression_type(&self) -> CompressionType {
        self.compression_type
    }

    /// Returns the number of data blocks used to store this folder's data.
    pub fn num_data_blocks(&self) -> u16 {
        self.num_data_blocks
    }

    /// Returns the application-defined reserve data for this folder.
    pub fn reserve_data(&self) -> &[u8] {
        &self.reserve_data
    }

    /// Returns an iterator over the file entries in this folder.
    pub fn file_entries(&self) -> FileEntries {
        FileEntries { iter: self.files.iter() }
    }

    /// Returns the byte offset, within its cabinet, of this folder's first
    /// CFDATA block.
    pub(crate) fn first_data_block_offset(&self) -> u32 {
        self.first_data_block_offset
    }

    /// Returns true if any file in this folder has its data continuing into
    /// the next cabinet in the set (§4.10).
    pub(crate) fn continues_to_next_cabinet(&self) -> bool {
        self.files.iter().any(|f| f.is_continued_to_next())
    }

    /// Returns true if any file in this folder has its data continued from
    /// the previous cabinet in the set (§4.10).
    pub(crate) fn continues_from_prev_cabinet(&self) -> bool {
        self.files.iter().any(|f| f.is_continued_from_prev())
    }
}

impl<'a, R: Read + Seek> FolderReader<'a, R> {
    /// Builds a folder reader over one or more segments, each contributed by
    /// a (possibly different) physical cabinet, concatenated in order. Used
    /// both for ordinary single-cabinet folders (a single segment) and for
    /// folders merged across a cabinet-set boundary (§4.10).
    pub(crate) fn new_chained(
        segments: Vec<Segment<'a>>,
        compression_type: CompressionType,
        salvage: bool,
    ) -> io::Result<FolderReader<'a, R>> {
        let num_data_blocks =
            segments.iter().map(|segment| segment.num_data_blocks).sum();
        let decompressor = compression_type.into_decompressor()?;
        let mut folder_reader = FolderReader {
            segments,
            num_data_blocks,
            compression_type,
            decompressor,
            salvage,
            data_blocks: Vec::new(),
            current_block_index: 0,
            current_block_data: Vec::new(),
            current_offset_within_block: 0,
            current_offset_within_folder: 0,
            _p: PhantomData,
        };
        folder_reader.load_block()?;
        Ok(folder_reader)
    }

    pub fn seek_to_uncompressed_offset(
        &mut self,
        new_offset: u64,
    ) -> io::Result<()> {
        if new_offset < self.current_block_start() {
            self.rewind()?;
        }
        if new_offset > 0 {
            // TODO: If folder is uncompressed, we should just jump straight to
            // the correct block without "decompressing" those in between.
            while self.data_blocks[self.current_block_index].cumulative_size
                < new_offset
            {
                self.current_block_index += 1;
                self.load_block()?;
            }
        }
        debug_assert!(new_offset >= self.current_block_start());
        self.current_offset_within_block =
            (new_offset - self.current_block_start()) as usize;
        self.current_offset_within_folder = new_offset;
        Ok(())
    }

    fn current_block_start(&self) -> u64 {
        if self.current_block_index == 0 {
            0
        } else {
            self.data_blocks[self.current_block_index - 1].cumulative_size
        }
    }

    fn rewind(&mut self) -> io::Result<()> {
        self.current_offset_within_block = 0;
        self.current_offset_within_folder = 0;
        if self.current_block_index != 0 {
            self.current_block_index = 0;
            // LZX and Quantum carry dictionary/bitstream state that a bare
            // `reset()` can't unwind (§4.10): rebuild the decompressor from
            // scratch so re-reading from block 0 starts from a clean state,
            // same as MsZip's own reset.
            self.decompressor = self.compression_type.into_decompressor()?;
            self.load_block()?;
        }
        Ok(())
    }

    /// Maps a global block ordinal to the segment that contributes it, and
    /// that block's ordinal within that segment.
    fn locate_segment(&self, ordinal: usize) -> (usize, usize) {
        let mut remaining = ordinal;
        for (index, segment) in self.segments.iter().enumerate() {
            if remaining < segment.num_data_blocks {
                return (index, remaining);
            }
            remaining -= segment.num_data_blocks;
        }
        (self.segments.len().saturating_sub(1), remaining)
    }

    /// Parses the CFDATA entry for a block not yet seen, seeking the owning
    /// segment's reader to the right position first (either the segment's
    /// first block, or immediately after the previous block in that same
    /// segment).
    fn discover_next_block(&mut self) -> io::Result<DataBlockEntry> {
        let ordinal = self.current_block_index;
        let (segment_index, local_ordinal) = self.locate_segment(ordinal);
        let segment = &self.segments[segment_index];
        let cumulative_size =
            self.data_blocks.last().map(|b| b.cumulative_size).unwrap_or(0);
        if local_ordinal == 0 {
            let reader = &mut &segment.reader.inner;
            reader.seek(SeekFrom::Start(
                segment.first_data_block_offset as u64,
            ))?;
        } else {
            let previous_block = self.data_blocks.last().unwrap();
            let reader = &mut &segment.reader.inner;
            reader.seek(SeekFrom::Start(
                previous_block.data_offset
                    + previous_block.compressed_size as u64,
            ))?;
        }
        let reader = &mut &segment.reader.inner;
        let mut block = parse_block_entry(
            reader,
            cumulative_size,
            segment.data_reserve_size as usize,
        )?;
        block.segment_index = segment_index;
        Ok(block)
    }

    fn load_block(&mut self) -> io::Result<()> {
        if self.current_block_index >= self.num_data_blocks {
            self.current_block_data = Vec::new();
            return Ok(());
        }
        debug_assert!(self.current_block_index <= self.data_blocks.len());
        let block = if self.current_block_index == self.data_blocks.len() {
            let block = self.discover_next_block()?;
            self.data_blocks.push(block);
            self.data_blocks[self.current_block_index].clone()
        } else {
            let block = self.data_blocks[self.current_block_index].clone();
            let segment = &self.segments[block.segment_index];
            let reader = &mut &segment.reader.inner;
            reader.seek(SeekFrom::Start(block.data_offset))?;
            block
        };

        let mut compressed_data = vec![0u8; block.compressed_size as usize];
        let segment = &self.segments[block.segment_index];
        let reader = &mut &segment.reader.inner;
        reader.read_exact(&mut compressed_data)?;
        if block.checksum != 0 {
            let mut checksum = Checksum::new();
            checksum.update(&block.reserve_data);
            checksum.update(&compressed_data);
            let actual_checksum = checksum.value()
                ^ ((block.compressed_size as u32)
                    | ((block.uncompressed_size as u32) << 16));
            if actual_checksum != block.checksum {
                if self.salvage {
                    tracing::warn!(
                        block_index = self.current_block_index,
                        expected = block.checksum,
                        actual = actual_checksum,
                        "salvage: checksum mismatch in data block, using \
                         block as-is",
                    );
                } else {
                    invalid_data!(
                        "Checksum error in data block {} \
                         (expected {:08x}, actual {:08x})",
                        self.current_block_index,
                        block.checksum,
                        actual_checksum
                    );
                }
            }
        }
        self.current_block_data = self
            .decompressor
            .decompress(compressed_data, block.uncompressed_size as usize)?;
        Ok(())
    }
}

impl<'a, R: Read + Seek + 'a> Read for FolderReader<'a, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() || self.current_block_index >= self.num_data_blocks {
            return Ok(0);
        }
        if self.current_offset_within_block == self.current_block_data.len() {
            self.current_block_index += 1;
            self.current_offset_within_block = 0;
            self.load_block()?;
        }
        let max_bytes = buf.len().min(
            self.current_block_data.len() - self.current_offset_within_block,
        );
        buf[..max_bytes].copy_from_slice(
            &self.current_block_data[self.current_offset_within_block..]
                [..max_bytes],
        );
        self.current_offset_within_block += max_bytes;
        self.current_offset_within_folder += max_bytes as u64;
        Ok(max_bytes)
    }
}

pub(crate) fn parse_folder_entry<R: Read>(
    mut reader: R,
    reserve_size: usize,
) -> io::Result<FolderEntry> {
    let first_data_offset = reader.read_u32::<LittleEndian>()?;
    let num_data_blocks = reader.read_u16::<LittleEndian>()?;
    let compression_bits = reader.read_u16::<LittleEndian>()?;
    let compression_type = CompressionType::from_bitfield(compression_bits)?;
    let mut folder_reserve_data = vec![0u8; reserve_size];
    if reserve_size > 0 {
        reader.read_exact(&mut folder_reserve_data)?;
    }
    let entry = FolderEntry {
        first_data_block_offset: first_data_offset,
        num_data_blocks,
        compression_type,
        reserve_data: folder_reserve_data,
        files: vec![],
    };
    Ok(entry)
}

/// Parse a data block entry from a reader.
///
/// The reader must be positioned at the start of the data block,
/// which is either at the start first data block or immediately after
/// the previous data block, i.e. at position
/// `previous_data_block.data_offset + previous_data_block.compressed_size`.
///
/// Once this function returns, the reader will be positioned at the current
/// block's `data_offset`.
fn parse_block_entry<R: ReadSeek>(
    mut reader: R,
    cumulative_size: u64,
    data_reserve_size: usize,
) -> io::Result<DataBlockEntry> {
    let checksum = reader.read_u32::<LittleEndian>()?;
    let compressed_size = reader.read_u16::<LittleEndian>()?;
    let uncompressed_size = reader.read_u16::<LittleEndian>()?;
    let mut reserve_data = vec![0u8; data_reserve_size];
    reader.read_exact(&mut reserve_data)?;
    let data_offset = reader.stream_position()?;
    let cumulative_size = cumulative_size + uncompressed_size as u64;

    Ok(DataBlockEntry {
        checksum,
        compressed_size,
        uncompressed_size,
        reserve_data,
        cumulative_size,
        data_offset,
        segment_index: 0,
    })
}
