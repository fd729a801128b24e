use std::ops::{Deref, Range};

use crate::Pointer;

/// Bytes copied out of the target, tagged with the address they came
/// from so that later slices can be taken by pointer rather than by
/// local offset.
#[derive(Clone)]
pub struct OwnedBytes {
    start: Pointer,
    bytes: Vec<u8>,
}

impl OwnedBytes {
    pub fn new(start: Pointer, bytes: Vec<u8>) -> Self {
        Self { start, bytes }
    }

    pub fn start(&self) -> Pointer {
        self.start
    }

    pub fn end(&self) -> Pointer {
        self.start + self.bytes.len()
    }

    pub fn ptr_range(&self) -> Range<Pointer> {
        self.start..self.end()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn contains_range(&self, range: &Range<Pointer>) -> bool {
        self.start <= range.start && range.end <= self.end()
    }

    /// Slice by target address.  Panics if the range was never read.
    pub fn subrange(&self, range: Range<Pointer>) -> &[u8] {
        let start = range.start - self.start;
        let end = range.end - self.start;
        &self.bytes[start..end]
    }

    pub fn take(self) -> Vec<u8> {
        self.bytes
    }
}

impl Deref for OwnedBytes {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.bytes
    }
}

impl IntoIterator for OwnedBytes {
    type Item = u8;
    type IntoIter = <Vec<u8> as IntoIterator>::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.bytes.into_iter()
    }
}
