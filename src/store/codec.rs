//! On-disk encodings for the vector matrix and the passage texts

use crate::error::{Error, Result};

const MATRIX_MAGIC: &[u8; 4] = b"KBRV";
const MATRIX_VERSION: u32 = 1;
const MATRIX_HEADER_LEN: usize = 4 + 4 + 8 + 8;

/// Marker character that passages may not contain
pub const RESERVED_CHAR: char = '\u{1e}';

/// Terminator written after every passage in `chunks.txt`
pub const CHUNK_TERMINATOR: &str = "\n\u{1e}chunk\u{1e}\n";

/// Encode a row-major f32 matrix: magic, version, rows, cols, little-endian values
pub fn encode_matrix(rows: &[Vec<f32>]) -> Result<Vec<u8>> {
    let cols = rows.first().map_or(0, Vec::len);
    if !rows.is_empty() && cols == 0 {
        return Err(Error::CacheCorrupt(
            "refusing to store zero-dimension vectors".to_string(),
        ));
    }
    if let Some(row) = rows.iter().position(|r| r.len() != cols) {
        return Err(Error::CacheCorrupt(format!(
            "vector {} has dimension {}, expected {}",
            row,
            rows[row].len(),
            cols
        )));
    }

    let mut bytes = Vec::with_capacity(MATRIX_HEADER_LEN + rows.len() * cols * 4);
    bytes.extend_from_slice(MATRIX_MAGIC);
    bytes.extend_from_slice(&MATRIX_VERSION.to_le_bytes());
    bytes.extend_from_slice(&(rows.len() as u64).to_le_bytes());
    bytes.extend_from_slice(&(cols as u64).to_le_bytes());
    for row in rows {
        for &value in row {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
    }
    Ok(bytes)
}

fn read_u64(bytes: &[u8], at: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[at..at + 8]);
    u64::from_le_bytes(buf)
}

/// Decode a matrix written by [`encode_matrix`]
pub fn decode_matrix(bytes: &[u8]) -> Result<Vec<Vec<f32>>> {
    if bytes.len() < MATRIX_HEADER_LEN {
        return Err(Error::CacheCorrupt("vector file too short".to_string()));
    }
    if &bytes[..4] != MATRIX_MAGIC {
        return Err(Error::CacheCorrupt("vector file has wrong magic".to_string()));
    }

    let version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    if version != MATRIX_VERSION {
        return Err(Error::CacheCorrupt(format!(
            "unsupported vector file version {}",
            version
        )));
    }

    let rows = read_u64(bytes, 8);
    let cols = read_u64(bytes, 16);
    if rows > 0 && cols == 0 {
        return Err(Error::CacheCorrupt("vector file has zero columns".to_string()));
    }

    let body = &bytes[MATRIX_HEADER_LEN..];
    let expected = rows.checked_mul(cols).and_then(|n| n.checked_mul(4));
    if expected != Some(body.len() as u64) {
        return Err(Error::CacheCorrupt(format!(
            "vector file holds {} bytes, header says {}x{}",
            body.len(),
            rows,
            cols
        )));
    }
    if rows == 0 {
        return Ok(Vec::new());
    }

    let values: Vec<f32> = body
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();

    Ok(values
        .chunks(cols as usize)
        .map(<[f32]>::to_vec)
        .collect())
}

/// Join passages, each followed by [`CHUNK_TERMINATOR`]
pub fn encode_chunks(chunks: &[String]) -> Result<String> {
    if let Some(idx) = chunks.iter().position(|c| c.contains(RESERVED_CHAR)) {
        return Err(Error::CacheCorrupt(format!(
            "passage {} contains the reserved separator character U+001E",
            idx
        )));
    }

    let capacity = chunks.iter().map(|c| c.len() + CHUNK_TERMINATOR.len()).sum();
    let mut out = String::with_capacity(capacity);
    for chunk in chunks {
        out.push_str(chunk);
        out.push_str(CHUNK_TERMINATOR);
    }
    Ok(out)
}

/// Split text written by [`encode_chunks`]
pub fn decode_chunks(text: &str) -> Result<Vec<String>> {
    if !text.is_empty() && !text.ends_with(CHUNK_TERMINATOR) {
        return Err(Error::CacheCorrupt(
            "passage file is truncated".to_string(),
        ));
    }
    Ok(text
        .split_terminator(CHUNK_TERMINATOR)
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_round_trip_exact() {
        let rows = vec![
            vec![0.1f32, -2.5, f32::MIN_POSITIVE],
            vec![1e-30, 3.0e38, -0.0],
        ];
        let decoded = decode_matrix(&encode_matrix(&rows).unwrap()).unwrap();

        assert_eq!(decoded.len(), 2);
        for (a, b) in rows.iter().zip(&decoded) {
            let a_bits: Vec<u32> = a.iter().map(|v| v.to_bits()).collect();
            let b_bits: Vec<u32> = b.iter().map(|v| v.to_bits()).collect();
            assert_eq!(a_bits, b_bits);
        }
    }

    #[test]
    fn test_empty_matrix() {
        let rows: Vec<Vec<f32>> = Vec::new();
        let decoded = decode_matrix(&encode_matrix(&rows).unwrap()).unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn test_ragged_matrix_rejected() {
        let rows: Vec<Vec<f32>> = vec![vec![1.0, 2.0], vec![1.0]];
        assert!(matches!(encode_matrix(&rows), Err(Error::CacheCorrupt(_))));
    }

    #[test]
    fn test_truncated_matrix_rejected() {
        let rows: Vec<Vec<f32>> = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
        let mut bytes = encode_matrix(&rows).unwrap();
        bytes.pop();
        assert!(matches!(decode_matrix(&bytes), Err(Error::CacheCorrupt(_))));
        assert!(matches!(decode_matrix(b"KBR"), Err(Error::CacheCorrupt(_))));
    }

    #[test]
    fn test_bad_magic_rejected() {
        let mut bytes = encode_matrix(&[vec![1.0f32]]).unwrap();
        bytes[0] = b'X';
        assert!(matches!(decode_matrix(&bytes), Err(Error::CacheCorrupt(_))));
    }

    #[test]
    fn test_chunks_round_trip_with_newlines() {
        let chunks = vec![
            "Liu Fang\nlikes singing".to_string(),
            "===\nlooks like the old separator\n===".to_string(),
            "trailing newline\n".to_string(),
            String::new(),
            "刘芳喜欢唱歌".to_string(),
        ];
        let encoded = encode_chunks(&chunks).unwrap();
        assert_eq!(decode_chunks(&encoded).unwrap(), chunks);
    }

    #[test]
    fn test_no_chunks() {
        assert_eq!(encode_chunks(&[]).unwrap(), "");
        assert!(decode_chunks("").unwrap().is_empty());
    }

    #[test]
    fn test_reserved_char_refused() {
        let chunks = vec!["bad \u{1e} text".to_string()];
        assert!(matches!(encode_chunks(&chunks), Err(Error::CacheCorrupt(_))));
    }

    #[test]
    fn test_truncated_chunks_rejected() {
        let encoded = encode_chunks(&["a".to_string(), "b".to_string()]).unwrap();
        let truncated = &encoded[..encoded.len() - 2];
        assert!(matches!(decode_chunks(truncated), Err(Error::CacheCorrupt(_))));
    }
}
