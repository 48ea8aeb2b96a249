/// In-place L2 normalization helper to keep allocations down during hot paths.
pub(crate) fn l2_normalize_in_place(v: &mut [f32]) {
    let norm_sq: f32 = v.iter().map(|x| x * x).sum();
    if norm_sq > 0.0 {
        let inv_norm = norm_sq.sqrt().recip();
        for x in v.iter_mut() {
            *x *= inv_norm;
        }
    }
}

/// Cut `text` down to at most `max_tokens` whitespace-separated tokens.
///
/// Word count is a conservative stand-in for the provider's tokenizer:
/// subword tokenizers never produce fewer tokens than words.
pub(crate) fn truncate_to_token_limit(text: &str, max_tokens: usize) -> String {
    let token_count = text.split_whitespace().count();
    if token_count <= max_tokens {
        return text.to_string();
    }
    tracing::warn!(
        tokens = token_count,
        max_tokens,
        "input text too long, truncating"
    );
    text.split_whitespace()
        .take(max_tokens)
        .collect::<Vec<_>>()
        .join(" ")
}
