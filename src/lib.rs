//! LZ77 compression around a binary-search-tree match finder.
//!
//! [`MatchIndex`] keeps one node per position of the sliding window and
//! answers "what is the longest earlier sequence that starts like the
//! lookahead". [`codec`] drives it over a [`SlidingWindow`] to produce and
//! read back a token stream, and [`oracle`] finds the truly longest matches
//! with a suffix array so the tree's single-descent heuristic can be measured.

pub mod codec;
pub mod oracle;
pub mod tree;
pub mod window;

pub use codec::{compress, decompress, tokenize, CompressStats, Token};
pub use tree::{Match, MatchIndex};
pub use window::{SlidingWindow, Window};

// the token format stores distances in 16 bits and lengths in one byte,
// with 0xFF reserved for end of stream
pub const MAX_WINDOW_SIZE: usize = 1 << 16;
pub const MAX_MATCH_LIMIT: usize = 254;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("window size must be between 2 and 65536, got {0}")]
    WindowSize(usize),
    #[error("max match length must be between 2 and 254, got {0}")]
    MaxMatchLength(usize),
    #[error("max match length {max_match_length} does not fit in a window of {window_size}")]
    LookaheadTooLarge {
        window_size: usize,
        max_match_length: usize,
    },
    #[error("min match length must be between 1 and {max_match_length}, got {min_match_length}")]
    MinMatchLength {
        min_match_length: usize,
        max_match_length: usize,
    },
    #[error("token stream truncated at byte {0}")]
    Truncated(usize),
    #[error("back-reference at byte {at} reaches {distance} bytes back but only {available} bytes were decoded")]
    BadDistance {
        at: usize,
        distance: usize,
        available: usize,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Parameters of one compression run. The decoder needs none of them.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Config {
    /// Bytes of history plus lookahead kept in the circular window.
    pub window_size: usize,
    /// Lookahead capacity. Matches are at most one byte shorter than this.
    pub max_match_length: usize,
    /// Shorter matches are emitted as literals instead.
    pub min_match_length: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            window_size: 4096,
            max_match_length: 32,
            min_match_length: 2,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if !(2..=MAX_WINDOW_SIZE).contains(&self.window_size) {
            return Err(Error::WindowSize(self.window_size));
        }
        if !(2..=MAX_MATCH_LIMIT).contains(&self.max_match_length) {
            return Err(Error::MaxMatchLength(self.max_match_length));
        }
        if self.max_match_length >= self.window_size {
            return Err(Error::LookaheadTooLarge {
                window_size: self.window_size,
                max_match_length: self.max_match_length,
            });
        }
        if !(1..=self.max_match_length).contains(&self.min_match_length) {
            return Err(Error::MinMatchLength {
                min_match_length: self.min_match_length,
                max_match_length: self.max_match_length,
            });
        }
        Ok(())
    }
}
