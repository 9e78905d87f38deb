/// Read access to window bytes by window-relative position.
///
/// Callers (the match index) reduce positions modulo the window size before
/// asking, so implementations only need to handle `0..window_size`.
pub trait Window {
    fn byte_at(&self, pos: usize) -> u8;
}

impl Window for [u8] {
    fn byte_at(&self, pos: usize) -> u8 {
        self[pos]
    }
}

impl Window for Vec<u8> {
    fn byte_at(&self, pos: usize) -> u8 {
        self[pos]
    }
}

impl<const N: usize> Window for [u8; N] {
    fn byte_at(&self, pos: usize) -> u8 {
        self[pos]
    }
}

/// Circular buffer over the most recent `size` bytes of a stream.
///
/// Bytes are pushed with ever-increasing absolute positions; position `p`
/// lives in slot `p % size` until position `p + size` overwrites it.
#[derive(Debug, Clone)]
pub struct SlidingWindow {
    buf: Vec<u8>,
    // absolute position one past the newest byte
    end: usize,
}

impl SlidingWindow {
    pub fn new(size: usize) -> Self {
        assert!(size > 0, "window must hold at least one byte");
        SlidingWindow {
            buf: vec![0; size],
            end: 0,
        }
    }

    pub fn size(&self) -> usize {
        self.buf.len()
    }

    /// Number of bytes pushed so far (absolute position of the next push).
    pub fn end(&self) -> usize {
        self.end
    }

    pub fn slot(&self, pos: usize) -> usize {
        pos % self.buf.len()
    }

    /// Absolute position whose slot the next push overwrites, if any.
    pub fn next_evicted(&self) -> Option<usize> {
        self.end.checked_sub(self.buf.len())
    }

    pub fn push(&mut self, byte: u8) {
        let slot = self.slot(self.end);
        self.buf[slot] = byte;
        self.end += 1;
    }

    /// Byte at absolute position `pos`. Only meaningful while `pos` is still
    /// inside the window.
    pub fn get(&self, pos: usize) -> u8 {
        debug_assert!(pos < self.end && pos + self.buf.len() >= self.end);
        self.buf[self.slot(pos)]
    }

    /// Copy `len` bytes starting at absolute position `pos` into `out`,
    /// following wraparound.
    pub fn copy_to(&self, pos: usize, len: usize, out: &mut Vec<u8>) {
        out.clear();
        let start = self.slot(pos);
        let first = len.min(self.buf.len() - start);
        out.extend_from_slice(&self.buf[start..start + first]);
        out.extend_from_slice(&self.buf[..len - first]);
    }
}

impl Window for SlidingWindow {
    fn byte_at(&self, pos: usize) -> u8 {
        self.buf[pos % self.buf.len()]
    }
}
