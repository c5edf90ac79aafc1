//! Cross-file extraction state machine (§4.10).
//!
//! [`Cabinet::read_file`](crate::cabinet::Cabinet::read_file) hands back a
//! fresh, self-contained reader for a single file, which is simple but
//! wasteful: every call re-parses the folder's data blocks from the start,
//! and for LZX/Quantum folders it throws away and rebuilds the dictionary
//! and bitstream state each time. `Extractor` instead keeps one folder
//! reader alive across calls and only resets it when the request can't be
//! satisfied by skipping forward.

use std::io::{self, Read, Seek, Write};

use crate::cabinet::Cabinet;
use crate::file::FileEntry;
use crate::folder::FolderReader;

/// Extracts files from a cabinet one at a time, reusing folder-level codec
/// state across files in the same folder (§4.10).
///
/// Within one folder, files must be extracted without regard to order: the
/// extractor transparently decompresses-and-discards any bytes between the
/// current position and the requested file's offset. Extracting the same
/// folder's files out of increasing-offset order (or revisiting an earlier
/// file) works too, but forces the folder reader to restart from the
/// beginning, so sequential-offset order is the efficient path.
pub struct Extractor<'a, R> {
    cabinet: &'a Cabinet<R>,
    current: Option<CurrentFolder<'a, R>>,
}

struct CurrentFolder<'a, R> {
    folder_index: usize,
    reader: FolderReader<'a, R>,
    position: u64,
}

impl<'a, R: Read + Seek> Extractor<'a, R> {
    /// Creates a new extractor over the given cabinet. No folder reader is
    /// opened until the first call to [`extract_file`](Self::extract_file).
    pub fn new(cabinet: &'a Cabinet<R>) -> Extractor<'a, R> {
        Extractor { cabinet, current: None }
    }

    /// Decompresses `file`'s data and writes it to `sink`.
    ///
    /// `file` must be an entry from the same cabinet this extractor was
    /// created from (typically obtained via
    /// [`Cabinet::get_file_entry`](crate::cabinet::Cabinet::get_file_entry)
    /// or [`FolderEntry::file_entries`](crate::folder::FolderEntry::file_entries)).
    pub fn extract_file<W: Write>(
        &mut self,
        file: &FileEntry,
        sink: &mut W,
    ) -> io::Result<()> {
        let folder_index = self.cabinet.resolved_folder_index(file).ok_or_else(
            || {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    "file entry folder index out of bounds",
                )
            },
        )?;
        let file_offset = file.uncompressed_offset() as u64;
        let file_len = file.uncompressed_size() as u64;

        let needs_new_reader = match &self.current {
            None => true,
            Some(current) => {
                current.folder_index != folder_index
                    || file_offset < current.position
            }
        };
        if needs_new_reader {
            let reader = self.cabinet.read_folder(folder_index)?;
            self.current =
                Some(CurrentFolder { folder_index, reader, position: 0 });
        }
        let current = self.current.as_mut().unwrap();

        if file_offset > current.position {
            let gap = file_offset - current.position;
            let mut limited = (&mut current.reader).take(gap);
            let copied = io::copy(&mut limited, &mut io::sink())?;
            if copied != gap {
                unexpected_eof!(
                    "Folder ended while skipping to file {:?}",
                    file.name()
                );
            }
            current.position += gap;
        }

        let mut limited = (&mut current.reader).take(file_len);
        let copied = io::copy(&mut limited, sink)?;
        if copied != file_len {
            unexpected_eof!(
                "Folder ended while extracting file {:?} \
                 ({} of {} bytes)",
                file.name(),
                copied,
                file_len
            );
        }
        current.position += file_len;
        Ok(())
    }

    /// Drops any cached folder reader, releasing its codec state. The next
    /// call to [`extract_file`](Self::extract_file) will start a fresh
    /// folder reader regardless of which file is requested.
    pub fn reset(&mut self) {
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::Extractor;
    use crate::cabinet::Cabinet;

    fn two_file_uncompressed_cabinet() -> &'static [u8] {
        b"MSCF\0\0\0\0\x80\0\0\0\0\0\0\0\
          \x2c\0\0\0\0\0\0\0\x03\x01\x01\0\x02\0\0\0\x34\x12\0\0\
          \x5b\0\0\0\x01\0\0\0\
          \x0e\0\0\0\0\0\0\0\0\0\x6c\x22\xe7\x59\x01\0hi.txt\0\
          \x0f\0\0\0\x0e\0\0\0\0\0\x6c\x22\xe7\x59\x01\0bye.txt\0\
          \0\0\0\0\x1d\0\x1d\0Hello, world!\nSee you later!\n"
    }

    #[test]
    fn extract_files_in_order() {
        let binary = two_file_uncompressed_cabinet();
        let cabinet = Cabinet::new(Cursor::new(binary)).unwrap();
        let mut extractor = Extractor::new(&cabinet);

        let hi = cabinet.get_file_entry("hi.txt").unwrap().clone();
        let mut data = Vec::new();
        extractor.extract_file(&hi, &mut data).unwrap();
        assert_eq!(data, b"Hello, world!\n");

        let bye = cabinet.get_file_entry("bye.txt").unwrap().clone();
        let mut data = Vec::new();
        extractor.extract_file(&bye, &mut data).unwrap();
        assert_eq!(data, b"See you later!\n");
    }

    #[test]
    fn extract_files_out_of_order() {
        let binary = two_file_uncompressed_cabinet();
        let cabinet = Cabinet::new(Cursor::new(binary)).unwrap();
        let mut extractor = Extractor::new(&cabinet);

        let bye = cabinet.get_file_entry("bye.txt").unwrap().clone();
        let mut data = Vec::new();
        extractor.extract_file(&bye, &mut data).unwrap();
        assert_eq!(data, b"See you later!\n");

        let hi = cabinet.get_file_entry("hi.txt").unwrap().clone();
        let mut data = Vec::new();
        extractor.extract_file(&hi, &mut data).unwrap();
        assert_eq!(data, b"Hello, world!\n");
    }

    #[test]
    fn extract_same_file_twice_is_idempotent() {
        let binary = two_file_uncompressed_cabinet();
        let cabinet = Cabinet::new(Cursor::new(binary)).unwrap();
        let mut extractor = Extractor::new(&cabinet);

        let hi = cabinet.get_file_entry("hi.txt").unwrap().clone();
        let mut first = Vec::new();
        extractor.extract_file(&hi, &mut first).unwrap();
        let mut second = Vec::new();
        extractor.extract_file(&hi, &mut second).unwrap();
        assert_eq!(first, second);
    }
}
