use crate::chunking::ChunkStrategy;

/// Deterministic chunk identifier: blake3 over (document id, strategy,
/// sequence) rendered as a UUID-shaped string. Re-ingesting the same chunk
/// yields the same id, so index upserts overwrite instead of duplicating.
pub fn chunk_id(document_id: &str, strategy: ChunkStrategy, sequence: u32) -> String {
    let mut hasher = blake3::Hasher::new();
    // Length prefixes keep ("ab", "c") and ("a", "bc") apart.
    for part in [document_id, strategy.as_str()] {
        hasher.update(&(part.len() as u64).to_le_bytes());
        hasher.update(part.as_bytes());
    }
    hasher.update(&sequence.to_le_bytes());
    let hex = hasher.finalize().to_hex();
    let hex = hex.as_str();
    format!("{}-{}-{}-{}-{}", &hex[0..8], &hex[8..12], &hex[12..16], &hex[16..20], &hex[20..32])
}

/// Human-readable chunk name, `{article_id}_chunk_{sequence}`.
pub fn chunk_name(article_id: &str, sequence: u32) -> String {
    format!("{article_id}_chunk_{sequence}")
}
