//! Approximate Shannon entropy of a byte sample.

/// Scores a sample by its empirical byte distribution.
///
/// Computes `-Σ p·log2(p)` over the observed byte values, multiplies by
/// the sample length and rounds up. The result approximates the number of
/// bits of information in the sample under an i.i.d. byte model. It is a
/// density diagnostic, not a certified entropy test: structured data with a
/// flat histogram (a counter, for example) scores at the maximum.
///
/// Counts are summed in sorted order so that relabeling byte values never
/// changes the score.
pub fn shannon_entropy(data: &[u8]) -> u64 {
    if data.is_empty() {
        return 0;
    }

    let mut freqs = [0u64; 256];
    for &b in data {
        freqs[b as usize] += 1;
    }

    let mut counts: Vec<u64> = freqs.into_iter().filter(|&c| c > 0).collect();
    counts.sort_unstable();

    let len = data.len() as f64;
    let per_symbol: f64 = counts
        .iter()
        .map(|&c| {
            let p = c as f64 / len;
            -p * p.log2()
        })
        .sum();

    (per_symbol * len).ceil() as u64
}
