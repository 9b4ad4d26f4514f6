//! Plutus data model and its on-chain CBOR layout.
//!
//! Encoding must be byte-exact against what the head validators expect:
//! constructors use tags 121..=127 (alternatives 0..=6), 1280..=1400
//! (alternatives 7..=127) and the general tag 102 beyond that; non-empty
//! arrays are indefinite-length, empty arrays definite; byte strings longer
//! than 64 bytes are chunked into indefinite segments.

use thiserror::Error;

/// A Plutus data item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Data {
    Constr(u64, Vec<Data>),
    Map(Vec<(Data, Data)>),
    List(Vec<Data>),
    Int(i128),
    Bytes(Vec<u8>),
}

#[derive(Debug, Error)]
pub enum CborError {
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("trailing bytes after data item")]
    TrailingBytes,
    #[error("unsupported cbor construct: {0}")]
    Unsupported(&'static str),
    #[error("integer out of supported range")]
    IntRange,
    #[error("invalid constructor tag {0}")]
    InvalidTag(u64),
    #[error("indefinite item not terminated")]
    Unterminated,
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),
}

const BYTES_CHUNK: usize = 64;

impl Data {
    pub fn bytes(b: impl Into<Vec<u8>>) -> Self {
        Data::Bytes(b.into())
    }

    pub fn int(i: impl Into<i128>) -> Self {
        Data::Int(i.into())
    }

    pub fn constr(alternative: u64, fields: Vec<Data>) -> Self {
        Data::Constr(alternative, fields)
    }

    pub fn to_cbor(&self) -> Result<Vec<u8>, CborError> {
        let mut out = Vec::new();
        encode_item(self, &mut out)?;
        Ok(out)
    }

    pub fn to_hex(&self) -> Result<String, CborError> {
        Ok(hex::encode(self.to_cbor()?))
    }

    pub fn from_cbor(bytes: &[u8]) -> Result<Data, CborError> {
        let mut pos = 0;
        let item = decode_item(bytes, &mut pos)?;
        if pos != bytes.len() {
            return Err(CborError::TrailingBytes);
        }
        Ok(item)
    }

    pub fn from_hex(s: &str) -> Result<Data, CborError> {
        Data::from_cbor(&hex::decode(s)?)
    }
}

// --- encoding ---

fn encode_head(major: u8, value: u64, out: &mut Vec<u8>) {
    let m = major << 5;
    if value < 24 {
        out.push(m | value as u8);
    } else if value <= u8::MAX as u64 {
        out.push(m | 24);
        out.push(value as u8);
    } else if value <= u16::MAX as u64 {
        out.push(m | 25);
        out.extend_from_slice(&(value as u16).to_be_bytes());
    } else if value <= u32::MAX as u64 {
        out.push(m | 26);
        out.extend_from_slice(&(value as u32).to_be_bytes());
    } else {
        out.push(m | 27);
        out.extend_from_slice(&value.to_be_bytes());
    }
}

fn encode_bytes(bytes: &[u8], out: &mut Vec<u8>) {
    if bytes.len() <= BYTES_CHUNK {
        encode_head(2, bytes.len() as u64, out);
        out.extend_from_slice(bytes);
    } else {
        out.push(0x5f);
        for chunk in bytes.chunks(BYTES_CHUNK) {
            encode_head(2, chunk.len() as u64, out);
            out.extend_from_slice(chunk);
        }
        out.push(0xff);
    }
}

fn encode_array(items: &[Data], out: &mut Vec<u8>) -> Result<(), CborError> {
    if items.is_empty() {
        out.push(0x80);
    } else {
        out.push(0x9f);
        for item in items {
            encode_item(item, out)?;
        }
        out.push(0xff);
    }
    Ok(())
}

fn encode_item(item: &Data, out: &mut Vec<u8>) -> Result<(), CborError> {
    match item {
        Data::Int(i) => {
            // one 64-bit argument per sign; bignum tags are not part of
            // the validator encoding
            if *i >= 0 {
                let n = u64::try_from(*i).map_err(|_| CborError::IntRange)?;
                encode_head(0, n, out);
            } else {
                let n = u64::try_from(-1 - *i).map_err(|_| CborError::IntRange)?;
                encode_head(1, n, out);
            }
        }
        Data::Bytes(b) => encode_bytes(b, out),
        Data::List(items) => encode_array(items, out)?,
        Data::Map(entries) => {
            encode_head(5, entries.len() as u64, out);
            for (k, v) in entries {
                encode_item(k, out)?;
                encode_item(v, out)?;
            }
        }
        Data::Constr(alt, fields) => {
            if *alt <= 6 {
                encode_head(6, 121 + alt, out);
                encode_array(fields, out)?;
            } else if *alt <= 127 {
                encode_head(6, 1280 + (alt - 7), out);
                encode_array(fields, out)?;
            } else {
                encode_head(6, 102, out);
                out.push(0x82);
                encode_head(0, *alt, out);
                encode_array(fields, out)?;
            }
        }
    }
    Ok(())
}

// --- decoding ---

fn read_u8(bytes: &[u8], pos: &mut usize) -> Result<u8, CborError> {
    let b = *bytes.get(*pos).ok_or(CborError::UnexpectedEof)?;
    *pos += 1;
    Ok(b)
}

/// Read a head, returning (major type, argument, is_indefinite)
fn read_head(bytes: &[u8], pos: &mut usize) -> Result<(u8, u64, bool), CborError> {
    let b = read_u8(bytes, pos)?;
    let major = b >> 5;
    let info = b & 0x1f;
    let arg = match info {
        0..=23 => info as u64,
        24 => read_u8(bytes, pos)? as u64,
        25 => {
            let mut buf = [0u8; 2];
            read_exact(bytes, pos, &mut buf)?;
            u16::from_be_bytes(buf) as u64
        }
        26 => {
            let mut buf = [0u8; 4];
            read_exact(bytes, pos, &mut buf)?;
            u32::from_be_bytes(buf) as u64
        }
        27 => {
            let mut buf = [0u8; 8];
            read_exact(bytes, pos, &mut buf)?;
            u64::from_be_bytes(buf)
        }
        31 => return Ok((major, 0, true)),
        _ => return Err(CborError::Unsupported("reserved additional info")),
    };
    Ok((major, arg, false))
}

fn read_exact(bytes: &[u8], pos: &mut usize, buf: &mut [u8]) -> Result<(), CborError> {
    let end = *pos + buf.len();
    if end > bytes.len() {
        return Err(CborError::UnexpectedEof);
    }
    buf.copy_from_slice(&bytes[*pos..end]);
    *pos = end;
    Ok(())
}

fn at_break(bytes: &[u8], pos: &mut usize) -> Result<bool, CborError> {
    if *bytes.get(*pos).ok_or(CborError::Unterminated)? == 0xff {
        *pos += 1;
        Ok(true)
    } else {
        Ok(false)
    }
}

fn decode_item(bytes: &[u8], pos: &mut usize) -> Result<Data, CborError> {
    let (major, arg, indefinite) = read_head(bytes, pos)?;
    match major {
        0 => Ok(Data::Int(arg as i128)),
        1 => Ok(Data::Int(-1 - arg as i128)),
        2 => {
            if indefinite {
                let mut buf = Vec::new();
                loop {
                    if at_break(bytes, pos)? {
                        break;
                    }
                    let (m, len, ind) = read_head(bytes, pos)?;
                    if m != 2 || ind {
                        return Err(CborError::Unsupported("nested indefinite bytes"));
                    }
                    let mut chunk = vec![0u8; len as usize];
                    read_exact(bytes, pos, &mut chunk)?;
                    buf.extend_from_slice(&chunk);
                }
                Ok(Data::Bytes(buf))
            } else {
                let mut buf = vec![0u8; arg as usize];
                read_exact(bytes, pos, &mut buf)?;
                Ok(Data::Bytes(buf))
            }
        }
        4 => Ok(Data::List(decode_array(bytes, pos, arg, indefinite)?)),
        5 => {
            let mut entries = Vec::new();
            if indefinite {
                loop {
                    if at_break(bytes, pos)? {
                        break;
                    }
                    let k = decode_item(bytes, pos)?;
                    let v = decode_item(bytes, pos)?;
                    entries.push((k, v));
                }
            } else {
                for _ in 0..arg {
                    let k = decode_item(bytes, pos)?;
                    let v = decode_item(bytes, pos)?;
                    entries.push((k, v));
                }
            }
            Ok(Data::Map(entries))
        }
        6 => decode_tagged(bytes, pos, arg),
        _ => Err(CborError::Unsupported("major type")),
    }
}

fn decode_array(
    bytes: &[u8],
    pos: &mut usize,
    len: u64,
    indefinite: bool,
) -> Result<Vec<Data>, CborError> {
    let mut items = Vec::new();
    if indefinite {
        loop {
            if at_break(bytes, pos)? {
                break;
            }
            items.push(decode_item(bytes, pos)?);
        }
    } else {
        for _ in 0..len {
            items.push(decode_item(bytes, pos)?);
        }
    }
    Ok(items)
}

fn decode_tagged(bytes: &[u8], pos: &mut usize, tag: u64) -> Result<Data, CborError> {
    let alternative = match tag {
        121..=127 => tag - 121,
        1280..=1400 => tag - 1280 + 7,
        102 => {
            let (major, len, indefinite) = read_head(bytes, pos)?;
            if major != 4 || (!indefinite && len != 2) {
                return Err(CborError::Unsupported("tag 102 payload"));
            }
            let alt = match decode_item(bytes, pos)? {
                Data::Int(i) if i >= 0 => i as u64,
                _ => return Err(CborError::Unsupported("tag 102 alternative")),
            };
            let fields = match decode_item(bytes, pos)? {
                Data::List(fields) => fields,
                _ => return Err(CborError::Unsupported("tag 102 fields")),
            };
            if indefinite && !at_break(bytes, pos)? {
                return Err(CborError::Unterminated);
            }
            return Ok(Data::Constr(alt, fields));
        }
        _ => return Err(CborError::InvalidTag(tag)),
    };
    let (major, len, indefinite) = read_head(bytes, pos)?;
    if major != 4 {
        return Err(CborError::Unsupported("constr fields"));
    }
    let fields = decode_array(bytes, pos, len, indefinite)?;
    Ok(Data::Constr(alternative, fields))
}

/// End offset of the single CBOR item starting at `at`.
///
/// Generic over all major types, so callers can slice out the raw bytes of
/// an item (e.g. a transaction body) without fully interpreting it.
pub fn cbor_item_end(bytes: &[u8], at: usize) -> Result<usize, CborError> {
    let mut pos = at;
    skip_item(bytes, &mut pos)?;
    Ok(pos)
}

fn skip_item(bytes: &[u8], pos: &mut usize) -> Result<(), CborError> {
    let (major, arg, indefinite) = read_head(bytes, pos)?;
    match major {
        0 | 1 | 7 => {
            // argument already consumed; floats were consumed by read_head's
            // additional-info bytes, break (0xff) never reaches here
            Ok(())
        }
        2 | 3 => {
            if indefinite {
                loop {
                    if at_break(bytes, pos)? {
                        return Ok(());
                    }
                    let (m, len, ind) = read_head(bytes, pos)?;
                    if m != major || ind {
                        return Err(CborError::Unsupported("nested indefinite string"));
                    }
                    *pos += len as usize;
                    if *pos > bytes.len() {
                        return Err(CborError::UnexpectedEof);
                    }
                }
            } else {
                *pos += arg as usize;
                if *pos > bytes.len() {
                    return Err(CborError::UnexpectedEof);
                }
                Ok(())
            }
        }
        4 | 5 => {
            let per_entry = if major == 5 { 2 } else { 1 };
            if indefinite {
                loop {
                    if at_break(bytes, pos)? {
                        return Ok(());
                    }
                    skip_item(bytes, pos)?;
                    if major == 5 {
                        skip_item(bytes, pos)?;
                    }
                }
            } else {
                for _ in 0..arg * per_entry {
                    skip_item(bytes, pos)?;
                }
                Ok(())
            }
        }
        6 => skip_item(bytes, pos),
        _ => Err(CborError::Unsupported("major type")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_small_constr_with_tag_121_family() {
        let d = Data::constr(0, vec![Data::int(1)]);
        assert_eq!(d.to_hex().unwrap(), "d8799f01ff");
        let d = Data::constr(1, vec![]);
        assert_eq!(d.to_hex().unwrap(), "d87a80");
        let d = Data::constr(6, vec![]);
        assert_eq!(d.to_hex().unwrap(), "d87f80");
    }

    #[test]
    fn encodes_high_alternatives_with_tag_1280_family() {
        let d = Data::constr(7, vec![]);
        assert_eq!(d.to_hex().unwrap(), "d9050080");
        assert_eq!(Data::from_hex("d9050080").unwrap(), Data::constr(7, vec![]));
    }

    #[test]
    fn encodes_very_high_alternatives_with_tag_102() {
        let d = Data::constr(200, vec![Data::int(0)]);
        assert_eq!(d.to_hex().unwrap(), "d8668218c89f00ff");
        assert_eq!(Data::from_hex("d8668218c89f00ff").unwrap(), d);
    }

    #[test]
    fn empty_list_is_definite_nonempty_is_indefinite() {
        assert_eq!(Data::List(vec![]).to_hex().unwrap(), "80");
        assert_eq!(Data::List(vec![Data::int(0)]).to_hex().unwrap(), "9f00ff");
    }

    #[test]
    fn negative_integers_round_trip() {
        let d = Data::int(-1000);
        let cbor = d.to_cbor().unwrap();
        assert_eq!(Data::from_cbor(&cbor).unwrap(), d);
    }

    #[test]
    fn integers_keep_the_full_64_bit_range_and_reject_beyond() {
        let max = Data::Int(u64::MAX as i128);
        assert_eq!(Data::from_cbor(&max.to_cbor().unwrap()).unwrap(), max);
        let min = Data::Int(-(1i128 << 64));
        assert_eq!(Data::from_cbor(&min.to_cbor().unwrap()).unwrap(), min);

        assert!(matches!(
            Data::Int(u64::MAX as i128 + 1).to_cbor(),
            Err(CborError::IntRange)
        ));
        assert!(matches!(
            Data::Int(-(1i128 << 64) - 1).to_cbor(),
            Err(CborError::IntRange)
        ));
        // nested items propagate the failure
        assert!(Data::constr(0, vec![Data::Int(i128::MAX)]).to_hex().is_err());
    }

    #[test]
    fn long_byte_strings_are_chunked() {
        let payload = vec![0xabu8; 100];
        let d = Data::bytes(payload.clone());
        let cbor = d.to_cbor().unwrap();
        assert_eq!(cbor[0], 0x5f);
        assert_eq!(*cbor.last().unwrap(), 0xff);
        assert_eq!(Data::from_cbor(&cbor).unwrap(), Data::Bytes(payload));
    }

    #[test]
    fn maps_are_definite_length() {
        let d = Data::Map(vec![(Data::bytes(vec![0x01]), Data::int(5))]);
        assert_eq!(d.to_hex().unwrap(), "a1410105");
        assert_eq!(Data::from_hex("a1410105").unwrap(), d);
    }

    #[test]
    fn rejects_trailing_bytes() {
        assert!(matches!(
            Data::from_hex("0000"),
            Err(CborError::TrailingBytes)
        ));
    }

    #[test]
    fn item_end_skips_nested_structures() {
        // [[1, 2], 3] definite outer, indefinite inner
        let bytes = hex::decode("829f0102ff03").unwrap();
        assert_eq!(cbor_item_end(&bytes, 0).unwrap(), bytes.len());
        assert_eq!(cbor_item_end(&bytes, 1).unwrap(), 5);
    }
}
