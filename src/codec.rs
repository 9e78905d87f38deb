use tracing::{debug, trace};

use crate::tree::{Match, MatchIndex};
use crate::window::SlidingWindow;
use crate::{Config, Error, Result};

const LITERAL: u8 = 0x00;
const EOF: u8 = 0xFF;

fn next_byte(data: &mut &[u8]) -> Option<u8> {
    let (res, rest) = data.split_first()?;
    *data = rest;
    Some(*res)
}
fn next_chunk<'a>(data: &mut &'a [u8], size: usize) -> Option<&'a [u8]> {
    if data.len() >= size {
        let (res, rest) = data.split_at(size);
        *data = rest;
        Some(res)
    } else {
        None
    }
}
fn next_word_be(data: &mut &[u8]) -> Option<u16> {
    let d = next_chunk(data, 2)?;
    Some(u16::from_be_bytes(d.try_into().ok()?))
}

/// One encoder step: copy `length` bytes from `distance` back, then emit
/// `next` verbatim. A literal is a token with `length == 0`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Token {
    pub distance: u16,
    pub length: u8,
    pub next: u8,
}

impl Token {
    pub fn literal(next: u8) -> Self {
        Token {
            distance: 0,
            length: 0,
            next,
        }
    }

    // literal:   00 next
    // reference: len dist_hi dist_lo next   (len in 1..=253)
    fn write(&self, buf: &mut Vec<u8>) {
        if self.length == 0 {
            buf.push(LITERAL);
        } else {
            assert!(self.length != EOF, "length collides with end marker");
            buf.push(self.length);
            buf.extend_from_slice(&self.distance.to_be_bytes());
        }
        buf.push(self.next);
    }

    fn read(data: &mut &[u8]) -> Option<Self> {
        let length = next_byte(data)?;
        let distance = if length == LITERAL {
            0
        } else {
            next_word_be(data)?
        };
        let next = next_byte(data)?;
        Some(Token {
            distance,
            length,
            next,
        })
    }

    fn decompress(&self, at: usize, buf: &mut Vec<u8>) -> Result<()> {
        if self.length > 0 {
            let distance = self.distance as usize;
            if distance == 0 || distance > buf.len() {
                return Err(Error::BadDistance {
                    at,
                    distance,
                    available: buf.len(),
                });
            }
            // may overlap the bytes being written, so copy one at a time
            let off = buf.len() - distance;
            for i in off..off + self.length as usize {
                buf.push(buf[i]);
            }
        }
        buf.push(self.next);
        Ok(())
    }

    /// Bytes this token expands to.
    pub fn span(&self) -> usize {
        self.length as usize + 1
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct CompressStats {
    pub input_bytes: usize,
    pub output_bytes: usize,
    pub literals: usize,
    pub references: usize,
    pub matched_bytes: usize,
}

// Owns the window and the index for one pass over `data`, and remembers the
// length every slot was inserted with so it can be removed again.
struct Encoder<'a> {
    data: &'a [u8],
    config: Config,
    window: SlidingWindow,
    index: MatchIndex,
    inserted: Vec<usize>,
    scratch: Vec<u8>,
}

impl<'a> Encoder<'a> {
    fn new(data: &'a [u8], config: Config) -> Self {
        Encoder {
            data,
            config,
            window: SlidingWindow::new(config.window_size),
            index: MatchIndex::new(),
            inserted: vec![0; config.window_size],
            scratch: Vec::with_capacity(config.max_match_length),
        }
    }

    // read input into the window up to absolute position `upto`, dropping
    // each position from the index just before its slot gets overwritten
    fn fill(&mut self, upto: usize) {
        let upto = upto.min(self.data.len());
        while self.window.end() < upto {
            if let Some(old) = self.window.next_evicted() {
                self.evict(old);
            }
            self.window.push(self.data[self.window.end()]);
        }
    }

    fn evict(&mut self, pos: usize) {
        let slot = self.window.slot(pos);
        let len = std::mem::take(&mut self.inserted[slot]);
        if len > 0 {
            let removed = self
                .index
                .remove(&self.window, slot, len, self.config.window_size);
            debug_assert!(removed, "position {} was not in the index", pos);
        }
    }

    fn insert(&mut self, pos: usize) {
        self.fill(pos + self.config.max_match_length);
        let len = self.config.max_match_length.min(self.window.end() - pos);
        self.window.copy_to(pos, len, &mut self.scratch);
        let slot = self.window.slot(pos);
        self.index.insert(&self.scratch, slot);
        self.inserted[slot] = len;
    }

    fn step(&mut self, pos: usize) -> Token {
        self.fill(pos + self.config.max_match_length);
        let lookahead_size = self.window.end() - pos;
        let mut m = self.index.find_longest_match(
            &self.window,
            self.window.slot(pos),
            lookahead_size,
            self.config.window_size,
        );
        if m.length < self.config.min_match_length {
            m = Match::NONE;
        }
        trace!(pos, distance = m.distance, length = m.length, "step");
        Token {
            distance: m.distance as u16,
            length: m.length as u8,
            next: self.window.get(pos + m.length),
        }
    }

    fn run(&mut self) -> Vec<Token> {
        let mut tokens = vec![];
        let mut pos = 0;
        while pos < self.data.len() {
            let token = self.step(pos);
            for p in pos..pos + token.span() {
                self.insert(p);
            }
            pos += token.span();
            tokens.push(token);
        }
        debug!(
            tokens = tokens.len(),
            nodes = self.index.len(),
            depth = self.index.depth(),
            "finished tokenizing"
        );
        tokens
    }
}

/// Split `data` into LZ77 tokens using the tree match finder.
pub fn tokenize(data: &[u8], config: &Config) -> Result<Vec<Token>> {
    config.validate()?;
    Ok(Encoder::new(data, *config).run())
}

/// Compress `data` into `buf` as a token stream followed by an end marker.
pub fn compress(data: &[u8], config: &Config, buf: &mut Vec<u8>) -> Result<CompressStats> {
    let tokens = tokenize(data, config)?;
    let start = buf.len();
    let mut stats = CompressStats {
        input_bytes: data.len(),
        ..Default::default()
    };
    for t in &tokens {
        if t.length == 0 {
            stats.literals += 1;
        } else {
            stats.references += 1;
            stats.matched_bytes += t.length as usize;
        }
        t.write(buf);
    }
    buf.push(EOF);
    stats.output_bytes = buf.len() - start;
    debug!(?stats, "compressed");
    Ok(stats)
}

/// Expand a token stream produced by [`compress`], appending to `buf`.
///
/// Anything after the end marker is ignored.
pub fn decompress(mut data: &[u8], buf: &mut Vec<u8>) -> Result<()> {
    let total = data.len();
    let base = buf.len();
    loop {
        let at = total - data.len();
        match data.first() {
            None => return Err(Error::Truncated(at)),
            Some(&EOF) => break,
            Some(_) => {}
        }
        let token = Token::read(&mut data).ok_or(Error::Truncated(at))?;
        token.decompress(at, buf)?;
    }
    debug!(input = total, output = buf.len() - base, "decompressed");
    Ok(())
}
