use std::io::{self, Read};

use byteorder::ReadBytesExt;

use crate::consts;

/// Reads a null-terminated byte string and decodes it per §6: UTF-8 if
/// `is_utf8` is set (the file's `ATTR_NAME_IS_UTF` bit), else Windows code
/// page 1252. A filename claiming UTF-8 but containing invalid UTF-8 bytes
/// is a format error rather than lossily patched up, since the attribute bit
/// is the only signal we have and a mismatch indicates a malformed cabinet.
pub(crate) fn read_null_terminated_string<R: Read>(
    reader: &mut R,
    is_utf8: bool,
) -> io::Result<String> {
    let bytes = read_null_terminated_bytes(reader)?;
    decode_cab_string(&bytes, is_utf8)
}

pub(crate) fn read_null_terminated_bytes<R: Read>(
    reader: &mut R,
) -> io::Result<Vec<u8>> {
    let mut bytes = Vec::<u8>::with_capacity(consts::MAX_STRING_SIZE);
    loop {
        let byte = reader.read_u8()?;
        if byte == 0 {
            break;
        } else if bytes.len() == consts::MAX_STRING_SIZE {
            invalid_data!(
                "String longer than maximum of {} bytes",
                consts::MAX_STRING_SIZE
            );
        }
        bytes.push(byte);
    }
    Ok(bytes)
}

pub(crate) fn decode_cab_string(
    bytes: &[u8],
    is_utf8: bool,
) -> io::Result<String> {
    if is_utf8 {
        String::from_utf8(bytes.to_vec()).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                "File name has UTF-8 attribute set but is not valid UTF-8",
            )
        })
    } else {
        let (decoded, _encoding, had_errors) =
            encoding_rs::WINDOWS_1252.decode(bytes);
        if had_errors {
            invalid_data!("File name is not valid code page 1252 text");
        }
        Ok(decoded.into_owned())
    }
}

/// Encodes a string back into cabinet wire form, choosing code page 1252
/// when every character fits, else UTF-8 (mirroring the teacher's
/// `FileBuilder::new` heuristic of checking for any byte above 0x7f).
pub(crate) fn encode_cab_string(name: &str) -> (Vec<u8>, bool) {
    let (encoded, _encoding, had_errors) =
        encoding_rs::WINDOWS_1252.encode(name);
    if had_errors {
        (name.as_bytes().to_vec(), true)
    } else {
        (encoded.into_owned(), false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reads_ascii_as_either_encoding() {
        let mut cursor = Cursor::new(b"hello.txt\0".to_vec());
        let name =
            read_null_terminated_string(&mut cursor, false).unwrap();
        assert_eq!(name, "hello.txt");
    }

    #[test]
    fn reads_utf8_name() {
        let mut cursor = Cursor::new("\u{2603}.txt\0".as_bytes().to_vec());
        let name = read_null_terminated_string(&mut cursor, true).unwrap();
        assert_eq!(name, "\u{2603}.txt");
    }

    #[test]
    fn rejects_invalid_utf8_when_flagged() {
        let mut cursor = Cursor::new(vec![0xff, 0xfe, 0x00]);
        assert!(read_null_terminated_string(&mut cursor, true).is_err());
    }

    #[test]
    fn decodes_cp1252_high_bytes() {
        // 0x93 is a left double quotation mark in cp1252, not valid UTF-8
        // on its own.
        let bytes = vec![0x93, b'x', 0x94];
        let name = decode_cab_string(&bytes, false).unwrap();
        assert_eq!(name.chars().nth(1).unwrap(), 'x');
    }

    #[test]
    fn round_trips_ascii_through_encode() {
        let (bytes, is_utf8) = encode_cab_string("plain.txt");
        assert!(!is_utf8);
        assert_eq!(bytes, b"plain.txt");
    }
}
