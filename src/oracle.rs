//! Exhaustive longest-match search over a suffix array.
//!
//! The tree only looks at the nodes on one root-to-leaf path. This module
//! answers the same question by brute force (well, with a suffix array and
//! an LCP table) so we can see how much the shortcut costs.

use crate::codec::Token;
use crate::tree::Match;
use crate::Config;

// build inverse suffix array given a regular suffix array
fn inv_suffix_array(suff_arr: &[i32]) -> Vec<u32> {
    let mut out = vec![0u32; suff_arr.len()];
    for (i, v) in suff_arr.iter().enumerate() {
        out[*v as usize] = i as u32;
    }
    out
}

fn lcp_len(a: &[u8], b: &[u8]) -> u32 {
    a.iter()
        .zip(b.iter())
        .take_while(|(ca, cb)| ca == cb)
        .count() as u32
}

// lcp[r] = length of the common prefix of the suffixes ranked r and r-1.
// Kasai's algorithm, as in lcp_lens_linear of https://github.com/BurntSushi/suffix
// (src/table.rs, unlicense).
fn build_lcp(data: &[u8], suff: &[i32], inv_suff: &[u32]) -> Vec<u32> {
    let mut lcps = vec![0u32; data.len()];
    let mut len = 0u32;
    for (sufi2, &rank) in inv_suff.iter().enumerate() {
        if rank == 0 {
            len = 0;
            continue;
        }
        let sufi1 = suff[(rank - 1) as usize];
        len += lcp_len(
            &data[(sufi1 as u32 + len) as usize..],
            &data[(sufi2 as u32 + len) as usize..],
        );
        lcps[rank as usize] = len;
        if len > 0 {
            len -= 1;
        }
    }
    lcps
}

pub struct SuffixIndex {
    suff: Vec<i32>,
    inv_suff: Vec<u32>,
    lcp: Vec<u32>,
}

impl SuffixIndex {
    pub fn new(data: &[u8]) -> Self {
        let suff = {
            let mut tmp = vec![0i32; data.len()];
            if !data.is_empty() {
                divsufsort::sort_in_place(data, &mut tmp);
            }
            tmp
        };
        let inv_suff = inv_suffix_array(&suff);
        let lcp = build_lcp(data, &suff, &inv_suff);
        SuffixIndex {
            suff,
            inv_suff,
            lcp,
        }
    }

    /// Longest match for the suffix at `pos` among earlier positions at most
    /// `max_distance` back, capped at `max_len` bytes. Matches may run into
    /// `pos` itself, same as the ones the encoder emits.
    pub fn longest_match(&self, pos: usize, max_distance: usize, max_len: usize) -> Match {
        let rank = self.inv_suff[pos] as usize;
        let mut best = Match::NONE;
        let consider = |r: usize, common: usize, best: &mut Match| {
            let j = self.suff[r] as usize;
            if j < pos && pos - j <= max_distance {
                *best = Match {
                    distance: pos - j,
                    length: common,
                };
            }
        };
        // neighbours in suffix order share a prefix no longer than the
        // smallest lcp crossed on the way there
        let mut common = max_len;
        for r in rank + 1..self.suff.len() {
            common = common.min(self.lcp[r] as usize);
            if common <= best.length {
                break;
            }
            consider(r, common, &mut best);
        }
        let mut common = max_len;
        for r in (0..rank).rev() {
            common = common.min(self.lcp[r + 1] as usize);
            if common <= best.length {
                break;
            }
            consider(r, common, &mut best);
        }
        best
    }
}

/// How far the tree's matches fall short of the exhaustive ones.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct MatchGap {
    pub steps: usize,
    pub optimal_steps: usize,
    pub missed_bytes: usize,
    pub worst_gap: usize,
}

/// Replay `tokens` (as produced by [`crate::tokenize`] with `config`) over
/// `data` and compare every step against the best match the encoder could
/// have seen at that position.
pub fn measure(data: &[u8], tokens: &[Token], config: &Config) -> MatchGap {
    let sa = SuffixIndex::new(data);
    let mut gap = MatchGap::default();
    let mut pos = 0;
    for t in tokens {
        // the encoder's lookahead, and the history still in its window
        let lookahead = config.max_match_length.min(data.len() - pos);
        let reach = config.window_size - lookahead;
        let mut best = sa.longest_match(pos, reach, lookahead - 1);
        if best.length < config.min_match_length {
            best = Match::NONE;
        }
        let got = t.length as usize;
        gap.steps += 1;
        if got == best.length {
            gap.optimal_steps += 1;
        }
        let missed = best.length - got;
        gap.missed_bytes += missed;
        gap.worst_gap = gap.worst_gap.max(missed);
        pos += t.span();
    }
    gap
}
