//! Suffix array, LCP array and the repeat profile derived from them.
//!
//! The t-Tuple and LRS estimators and the IID longest-repeat check all ask
//! the same questions of a sequence: how often does the most common
//! `t`-tuple occur, how many pairs of positions share a `W`-tuple, and how
//! long is the longest repeated substring. One suffix array answers all three
//! in `O(L log L)` instead of one hash table per tuple length.

/// Sorted suffixes and the longest common prefix of each adjacent pair.
#[derive(Debug, Clone)]
pub struct SuffixArray {
    sa: Vec<usize>,
    /// `lcp[i]` = common prefix of suffixes `sa[i-1]` and `sa[i]`; `lcp[0] = 0`.
    lcp: Vec<usize>,
}

impl SuffixArray {
    /// Prefix doubling over rank pairs, then Kasai's LCP construction.
    pub fn build(symbols: &[u8]) -> Self {
        let n = symbols.len();
        let mut sa: Vec<usize> = (0..n).collect();
        let mut rank: Vec<usize> = symbols.iter().map(|&s| s as usize).collect();
        let mut next = vec![0usize; n];
        let mut k = 1usize;

        while n > 1 {
            let key = |i: usize| -> u64 {
                let second = if i + k < n { rank[i + k] as u64 + 1 } else { 0 };
                ((rank[i] as u64 + 1) << 32) | second
            };
            sa.sort_unstable_by_key(|&i| key(i));
            next[sa[0]] = 0;
            for w in 1..n {
                let bump = (key(sa[w]) != key(sa[w - 1])) as usize;
                next[sa[w]] = next[sa[w - 1]] + bump;
            }
            std::mem::swap(&mut rank, &mut next);
            if rank[sa[n - 1]] == n - 1 || k >= n {
                break;
            }
            k *= 2;
        }

        let lcp = kasai(symbols, &sa);
        Self { sa, lcp }
    }

    pub fn suffixes(&self) -> &[usize] {
        &self.sa
    }

    pub fn lcp(&self) -> &[usize] {
        &self.lcp
    }

    /// Length of the longest repeated substring.
    pub fn max_lcp(&self) -> usize {
        self.lcp.iter().copied().max().unwrap_or(0)
    }
}

fn kasai(symbols: &[u8], sa: &[usize]) -> Vec<usize> {
    let n = symbols.len();
    let mut inverse = vec![0usize; n];
    for (pos, &start) in sa.iter().enumerate() {
        inverse[start] = pos;
    }
    let mut lcp = vec![0usize; n];
    let mut h = 0usize;
    for i in 0..n {
        if inverse[i] == 0 {
            h = 0;
            continue;
        }
        let j = sa[inverse[i] - 1];
        while i + h < n && j + h < n && symbols[i + h] == symbols[j + h] {
            h += 1;
        }
        lcp[inverse[i]] = h;
        h = h.saturating_sub(1);
    }
    lcp
}

/// Tuple statistics for every tuple length at once.
#[derive(Debug, Clone)]
pub struct RepeatProfile {
    len: usize,
    longest_repeat: usize,
    /// `tuple_max[t]`: occurrences of the most common `t`-tuple, `t ≤ longest_repeat`.
    tuple_max: Vec<u64>,
    /// `pairs[w]`: position pairs sharing a `w`-tuple, i.e. `Σ C(count, 2)`.
    pairs: Vec<u64>,
}

impl RepeatProfile {
    pub fn new(symbols: &[u8]) -> Self {
        Self::from_suffix_array(symbols.len(), &SuffixArray::build(symbols))
    }

    pub fn from_suffix_array(len: usize, suffixes: &SuffixArray) -> Self {
        let lcp = suffixes.lcp();
        let longest_repeat = suffixes.max_lcp();
        let n = lcp.len();

        // For lcp[i] as the minimum of an interval of adjacent pairs: extent
        // to the left over strictly larger values, to the right over larger
        // or equal ones, so each interval is attributed to exactly one i.
        let mut left = vec![0usize; n];
        let mut stack: Vec<usize> = Vec::new();
        for i in 1..n {
            while stack.last().is_some_and(|&j| lcp[j] > lcp[i]) {
                stack.pop();
            }
            let boundary = stack.last().copied().unwrap_or(0);
            left[i] = i - boundary - 1;
            stack.push(i);
        }
        let mut right = vec![0usize; n];
        stack.clear();
        for i in (1..n).rev() {
            while stack.last().is_some_and(|&j| lcp[j] >= lcp[i]) {
                stack.pop();
            }
            let boundary = stack.last().copied().unwrap_or(n);
            right[i] = boundary - i - 1;
            stack.push(i);
        }

        let mut pair_hist = vec![0u64; longest_repeat + 1];
        let mut group = vec![0u64; longest_repeat + 1];
        for i in 1..n {
            let m = lcp[i];
            if m == 0 {
                continue;
            }
            pair_hist[m] += (left[i] as u64 + 1) * (right[i] as u64 + 1);
            group[m] = group[m].max((left[i] + right[i] + 2) as u64);
        }

        let mut tuple_max = vec![0u64; longest_repeat + 1];
        let mut pairs = vec![0u64; longest_repeat + 1];
        let (mut best, mut total) = (1u64, 0u64);
        for m in (1..=longest_repeat).rev() {
            best = best.max(group[m]);
            total += pair_hist[m];
            tuple_max[m] = best;
            pairs[m] = total;
        }

        Self {
            len,
            longest_repeat,
            tuple_max,
            pairs,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Longest substring that occurs at least twice.
    pub fn longest_repeat(&self) -> usize {
        self.longest_repeat
    }

    /// Occurrences of the most common `t`-tuple (`t ≥ 1`).
    pub fn max_tuple_count(&self, t: usize) -> u64 {
        if t == 0 || t > self.len {
            0
        } else if t > self.longest_repeat {
            1
        } else {
            self.tuple_max[t]
        }
    }

    /// Number of position pairs `(i < j)` whose `w`-tuples agree.
    pub fn pair_count(&self, w: usize) -> u64 {
        if w == 0 || w > self.longest_repeat {
            0
        } else {
            self.pairs[w]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn naive_counts(s: &[u8], t: usize) -> HashMap<&[u8], u64> {
        let mut counts = HashMap::new();
        for w in s.windows(t) {
            *counts.entry(w).or_insert(0u64) += 1;
        }
        counts
    }

    fn pseudo_random(n: usize, modulus: u8) -> Vec<u8> {
        let mut state: u64 = 0x2545_F491_4F6C_DD1D;
        (0..n)
            .map(|_| {
                state = state
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(1442695040888963407);
                ((state >> 33) % modulus as u64) as u8
            })
            .collect()
    }

    #[test]
    fn test_banana_suffix_array() {
        let sa = SuffixArray::build(b"banana");
        assert_eq!(sa.suffixes(), &[5, 3, 1, 0, 4, 2]);
        assert_eq!(sa.lcp(), &[0, 1, 3, 0, 0, 2]);
        assert_eq!(sa.max_lcp(), 3);
    }

    #[test]
    fn test_degenerate_inputs() {
        assert!(SuffixArray::build(&[]).suffixes().is_empty());
        let p = RepeatProfile::new(&[7]);
        assert_eq!(p.longest_repeat(), 0);
        assert_eq!(p.max_tuple_count(1), 1);
        assert_eq!(p.pair_count(1), 0);
    }

    #[test]
    fn test_constant_sequence_profile() {
        let p = RepeatProfile::new(&[1u8; 50]);
        assert_eq!(p.longest_repeat(), 49);
        assert_eq!(p.max_tuple_count(1), 50);
        assert_eq!(p.max_tuple_count(10), 41);
        assert_eq!(p.pair_count(49), 1);
        assert_eq!(p.pair_count(1), 50 * 49 / 2);
    }

    #[test]
    fn test_profile_matches_naive_counting() {
        for modulus in [2u8, 3, 16] {
            let s = pseudo_random(600, modulus);
            let profile = RepeatProfile::new(&s);
            for t in 1..=profile.longest_repeat() + 1 {
                let counts = naive_counts(&s, t);
                let max = counts.values().copied().max().unwrap_or(0);
                let pairs: u64 = counts.values().map(|&c| c * (c - 1) / 2).sum();
                assert_eq!(profile.max_tuple_count(t), max, "mod {modulus} t {t}");
                assert_eq!(profile.pair_count(t), pairs, "mod {modulus} t {t}");
            }
        }
    }
}
