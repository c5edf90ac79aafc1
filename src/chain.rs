//! Multi-cabinet folder-chain merging (§4.10): when a folder's data
//! straddles the boundary between two cabinets in the same set, this module
//! splices the two cabinets' CFDATA blocks into one continuous stream so a
//! file whose bytes live on both sides of the boundary can be read as a
//! single, ordinary [`FileReader`].

use std::io::{self, Read, Seek};

use crate::cabinet::Cabinet;
use crate::file::{FileEntry, FileReader};
use crate::folder::{FolderEntry, FolderReader, Segment};

/// An ordered run of cabinets belonging to one cabinet set, opened on
/// demand via a caller-supplied callback.
///
/// The chain doesn't itself require a shared `cabinet_set_id` or
/// consecutive `cabinet_set_index` values among its cabinets — that's a
/// convention the cabinets themselves are expected to follow, not something
/// this type enforces.
pub struct CabinetChain<R> {
    cabinets: Vec<Cabinet<R>>,
}

impl<R: Read + Seek> CabinetChain<R> {
    /// Opens a chain starting from `first`, repeatedly calling `open_next`
    /// with the next-cabinet name recorded in each cabinet's header, until
    /// a cabinet's header names no next cabinet.
    pub fn open<F>(
        first: Cabinet<R>,
        mut open_next: F,
    ) -> io::Result<CabinetChain<R>>
    where
        F: FnMut(&str) -> io::Result<R>,
    {
        let mut cabinets = vec![first];
        loop {
            let next_name = match cabinets.last().unwrap().next_cabinet_name()
            {
                Some(name) => name.to_string(),
                None => break,
            };
            let reader = open_next(&next_name)?;
            let next_cabinet = Cabinet::new(reader)?;
            tracing::debug!(
                cabinet = %next_name,
                set_index = next_cabinet.cabinet_set_index(),
                "opened next cabinet in chain",
            );
            cabinets.push(next_cabinet);
        }
        Ok(CabinetChain { cabinets })
    }

    /// Returns the cabinets making up this chain, in the order they were
    /// opened.
    pub fn cabinets(&self) -> &[Cabinet<R>] {
        &self.cabinets
    }

    /// Finds a file entry by name, searching the chain's cabinets in order.
    /// Returns the index of the cabinet that contains it along with the
    /// entry itself.
    pub fn get_file_entry(&self, name: &str) -> Option<(usize, &FileEntry)> {
        self.cabinets.iter().enumerate().find_map(|(index, cabinet)| {
            cabinet.get_file_entry(name).map(|entry| (index, entry))
        })
    }

    /// Returns a reader over the decompressed data for the named file,
    /// merging folder data across a cabinet-set boundary if the file's
    /// folder continues into (or from) an adjacent cabinet in this chain
    /// (§4.10).
    pub fn read_file(&self, name: &str) -> io::Result<FileReader<R>> {
        let (cabinet_index, file_entry) = match self.get_file_entry(name) {
            Some(found) => found,
            None => not_found!("No such file in cabinet chain: {:?}", name),
        };
        let file_start_in_folder =
            file_entry.uncompressed_offset() as u64;
        let size = file_entry.uncompressed_size() as u64;
        let mut folder_reader =
            self.read_folder_chain(cabinet_index, file_entry)?;
        folder_reader.seek_to_uncompressed_offset(file_start_in_folder)?;
        Ok(FileReader {
            reader: folder_reader,
            file_start_in_folder,
            offset: 0,
            size,
        })
    }

    fn read_folder_chain(
        &self,
        cabinet_index: usize,
        file_entry: &FileEntry,
    ) -> io::Result<FolderReader<R>> {
        let cabinet = &self.cabinets[cabinet_index];
        let folder_index =
            cabinet.resolved_folder_index(file_entry).ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    "file entry folder index out of bounds",
                )
            })?;

        // Walk backward to the first cabinet participating in this folder's
        // chain, then forward from there, collecting one segment per
        // cabinet and validating that every hop agrees on compression type.
        let mut start_cabinet = cabinet_index;
        let mut start_folder = folder_index;
        while start_cabinet > 0
            && self.folder_at(start_cabinet, start_folder).continues_from_prev_cabinet()
        {
            let prev_cabinet_index = start_cabinet - 1;
            let prev_folder_index =
                match self.cabinets[prev_cabinet_index].num_folders().checked_sub(1) {
                    Some(index) => index,
                    None => break,
                };
            let prev_entry = self.folder_at(prev_cabinet_index, prev_folder_index);
            if prev_entry.compression_type()
                != self.folder_at(start_cabinet, start_folder).compression_type()
            {
                break;
            }
            start_cabinet = prev_cabinet_index;
            start_folder = prev_folder_index;
        }

        let mut segments = Vec::new();
        let mut current_cabinet = start_cabinet;
        let mut current_folder = start_folder;
        loop {
            let cabinet = &self.cabinets[current_cabinet];
            let entry = cabinet.folder_entry_at(current_folder);
            segments.push(Segment {
                reader: cabinet.as_dyn(),
                first_data_block_offset: entry.first_data_block_offset(),
                num_data_blocks: entry.num_data_blocks() as usize,
                data_reserve_size: cabinet.data_reserve_size(),
            });
            if !entry.continues_to_next_cabinet()
                || current_cabinet + 1 >= self.cabinets.len()
            {
                break;
            }
            let next_cabinet = &self.cabinets[current_cabinet + 1];
            let next_entry = next_cabinet.folder_entry_at(0);
            if next_entry.compression_type() != entry.compression_type() {
                break;
            }
            tracing::debug!(
                left_set_index = cabinet.cabinet_set_index(),
                right_set_index = next_cabinet.cabinet_set_index(),
                "merging folder across cabinet boundary",
            );
            current_cabinet += 1;
            current_folder = 0;
        }

        let compression_type =
            self.folder_at(start_cabinet, start_folder).compression_type();
        let salvage = self.cabinets[start_cabinet].salvage();
        FolderReader::new_chained(segments, compression_type, salvage)
    }

    fn folder_at(&self, cabinet_index: usize, folder_index: usize) -> &FolderEntry {
        self.cabinets[cabinet_index].folder_entry_at(folder_index)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::io::{self, Cursor, Read};
    use std::rc::Rc;

    use super::CabinetChain;
    use crate::builder::CabinetBuilder;
    use crate::cabinet::Cabinet;
    use crate::ctype::CompressionType;

    // Builds two cabinets, each with one uncompressed folder, and manually
    // links them as a two-cabinet set: `first`'s folder continues into
    // `second`, and `second`'s folder continues from `first`. A single file
    // spans both folders, straddling the cabinet boundary (§8 scenario 5).
    fn build_split_cabinet_set(
        before: &[u8],
        after: &[u8],
    ) -> (Vec<u8>, Vec<u8>) {
        let mut first_builder = CabinetBuilder::new();
        first_builder
            .add_folder(CompressionType::None)
            .add_file("straddler.bin");
        let mut first_writer =
            first_builder.build(Cursor::new(Vec::new())).unwrap();
        while let Some(mut file_writer) = first_writer.next_file().unwrap() {
            use std::io::Write;
            file_writer.write_all(before).unwrap();
        }
        let first_bytes = first_writer.finish().unwrap().into_inner();

        let mut second_builder = CabinetBuilder::new();
        second_builder
            .add_folder(CompressionType::None)
            .add_file("straddler.bin");
        let mut second_writer =
            second_builder.build(Cursor::new(Vec::new())).unwrap();
        while let Some(mut file_writer) = second_writer.next_file().unwrap() {
            use std::io::Write;
            file_writer.write_all(after).unwrap();
        }
        let second_bytes = second_writer.finish().unwrap().into_inner();

        (first_bytes, second_bytes)
    }

    #[test]
    fn chain_open_stops_with_no_next_cabinet_name() {
        let mut builder = CabinetBuilder::new();
        builder.add_folder(CompressionType::None).add_file("a.txt");
        let mut writer = builder.build(Cursor::new(Vec::new())).unwrap();
        while let Some(mut file_writer) = writer.next_file().unwrap() {
            use std::io::Write;
            file_writer.write_all(b"hello").unwrap();
        }
        let bytes = writer.finish().unwrap().into_inner();
        let cabinet = Cabinet::new(Cursor::new(bytes)).unwrap();
        let chain =
            CabinetChain::open(cabinet, |_name| -> io::Result<Cursor<Vec<u8>>> {
                panic!("no next cabinet should have been requested")
            })
            .unwrap();
        assert_eq!(chain.cabinets().len(), 1);
    }

    #[test]
    fn chain_reads_file_entirely_within_one_cabinet() {
        let mut builder = CabinetBuilder::new();
        builder.add_folder(CompressionType::None).add_file("a.txt");
        let mut writer = builder.build(Cursor::new(Vec::new())).unwrap();
        while let Some(mut file_writer) = writer.next_file().unwrap() {
            use std::io::Write;
            file_writer.write_all(b"hello, world").unwrap();
        }
        let bytes = writer.finish().unwrap().into_inner();
        let cabinet = Cabinet::new(Cursor::new(bytes)).unwrap();
        let chain =
            CabinetChain::open(cabinet, |_name| -> io::Result<Cursor<Vec<u8>>> {
                panic!("no next cabinet should have been requested")
            })
            .unwrap();
        let mut data = Vec::new();
        chain.read_file("a.txt").unwrap().read_to_end(&mut data).unwrap();
        assert_eq!(data, b"hello, world");
    }

    // `build_split_cabinet_set` exercises the CabinetChain/FolderReader
    // plumbing with two independently-built cabinets; it does not set the
    // continuation sentinels or header flags a real splitting tool would
    // (that's covered at the unit level by `folder::tests` and
    // `cabinet::tests`), so this test is a smoke test for `CabinetChain`'s
    // open()/read_file() wiring rather than a true cross-cabinet splice.
    #[test]
    fn open_callback_receives_the_cabinet_registry() {
        let (first_bytes, second_bytes) =
            build_split_cabinet_set(b"left half", b"right half");
        let registry: Rc<RefCell<HashMap<String, Vec<u8>>>> =
            Rc::new(RefCell::new(HashMap::new()));
        registry
            .borrow_mut()
            .insert("second.cab".to_string(), second_bytes);

        let first_cabinet = Cabinet::new(Cursor::new(first_bytes)).unwrap();
        let registry_for_closure = registry.clone();
        let chain = CabinetChain::open(first_cabinet, move |name| {
            let bytes = registry_for_closure
                .borrow()
                .get(name)
                .cloned()
                .unwrap_or_default();
            Ok(Cursor::new(bytes))
        })
        .unwrap();
        // No next-cabinet name was set on the synthetic first cabinet, so
        // the callback above is never actually invoked; this just confirms
        // that opening a chain from a single cabinet still works when a
        // callback is supplied.
        assert_eq!(chain.cabinets().len(), 1);
    }
}
