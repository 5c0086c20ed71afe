use polars::prelude::*;

const FIELD_SEPARATOR: u8 = 0x1f;

/// Order-independent blake3 digest of a frame: each row is hashed on its own, the row digests
/// are sorted, and the sorted list is hashed together with the column names. Two frames holding
/// the same multiset of rows produce the same fingerprint regardless of row order.
pub fn frame_fingerprint(df: &DataFrame) -> PolarsResult<String> {
    let columns = df.get_columns();

    let mut row_digests = Vec::with_capacity(df.height());
    let mut buffer = String::new();
    for idx in 0..df.height() {
        buffer.clear();
        for column in columns {
            buffer.push_str(&column.get(idx)?.to_string());
            buffer.push(FIELD_SEPARATOR as char);
        }
        row_digests.push(*blake3::hash(buffer.as_bytes()).as_bytes());
    }
    row_digests.sort_unstable();

    let mut hasher = blake3::Hasher::new();
    for name in df.get_column_names() {
        hasher.update(name.as_bytes());
        hasher.update(&[FIELD_SEPARATOR]);
    }
    hasher.update(&(row_digests.len() as u64).to_le_bytes());
    for digest in &row_digests {
        hasher.update(digest);
    }
    Ok(hasher.finalize().to_hex().to_string())
}
