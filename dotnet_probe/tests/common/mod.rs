#![allow(dead_code)]

use std::ops::Range;
use std::sync::Mutex;

use process_memory::{
    Error, MemoryAccess, OwnedBytes, Pointer, PointerWidth,
};

/// In-memory stand-in for a target process: one contiguous mapping at a
/// fixed base, with explicitly marked executable ranges.
pub struct FixtureMemory {
    base: Pointer,
    bytes: Mutex<Vec<u8>>,
    executable: Vec<Range<Pointer>>,
}

impl FixtureMemory {
    pub fn new(base: usize, bytes: Vec<u8>) -> Self {
        Self {
            base: base.into(),
            bytes: Mutex::new(bytes),
            executable: Vec::new(),
        }
    }

    pub fn zeroed(base: usize, len: usize) -> Self {
        Self::new(base, vec![0u8; len])
    }

    pub fn executable(mut self, range: Range<usize>) -> Self {
        self.executable
            .push(Pointer::new(range.start)..Pointer::new(range.end));
        self
    }

    /// Mark the whole mapping executable.
    pub fn all_executable(self) -> Self {
        let range = self.base.as_usize()
            ..self.base.as_usize() + self.bytes.lock().unwrap().len();
        self.executable(range)
    }

    pub fn base(&self) -> Pointer {
        self.base
    }

    pub fn end(&self) -> Pointer {
        self.base + self.bytes.lock().unwrap().len()
    }

    pub fn place(&self, addr: usize, bytes: &[u8]) {
        let offset = addr - self.base.as_usize();
        self.bytes.lock().unwrap()[offset..offset + bytes.len()]
            .copy_from_slice(bytes);
    }

    pub fn place_word(&self, width: PointerWidth, addr: usize, value: usize) {
        match width {
            PointerWidth::Bits32 => {
                self.place(addr, &(value as u32).to_le_bytes())
            }
            PointerWidth::Bits64 => {
                self.place(addr, &(value as u64).to_le_bytes())
            }
        }
    }
}

impl MemoryAccess for FixtureMemory {
    fn read_bytes(&self, range: Range<Pointer>) -> Result<OwnedBytes, Error> {
        if range.start.is_null() {
            return Err(Error::MemoryReadNullPointer);
        }

        let bytes = self.bytes.lock().unwrap();
        let end = self.base + bytes.len();

        if range.start < self.base || range.end > end {
            return Err(Error::MemoryReadBadAddress(
                range.start,
                range.end - range.start,
            ));
        }

        let start = range.start - self.base;
        let len = range.end - range.start;
        Ok(OwnedBytes::new(
            range.start,
            bytes[start..start + len].to_vec(),
        ))
    }

    fn write_bytes(&self, ptr: Pointer, data: &[u8]) -> Result<(), Error> {
        if ptr.is_null() {
            return Err(Error::MemoryWriteNullPointer);
        }

        let mut bytes = self.bytes.lock().unwrap();
        let end = self.base + bytes.len();

        if ptr < self.base || ptr + data.len() > end {
            return Err(Error::MemoryReadBadAddress(ptr, data.len()));
        }

        let start = ptr - self.base;
        bytes[start..start + data.len()].copy_from_slice(data);
        Ok(())
    }

    fn is_readable(&self, ptr: Pointer) -> bool {
        !ptr.is_null() && self.base <= ptr && ptr < self.end()
    }

    fn is_executable(&self, ptr: Pointer) -> bool {
        self.executable.iter().any(|range| range.contains(&ptr))
    }
}

/// Raw bytes of a managed string object: type-descriptor placeholder,
/// 32-bit code-unit count, UTF-16 data.
pub fn managed_string_bytes(width: PointerWidth, text: &str) -> Vec<u8> {
    let units: Vec<u16> = text.encode_utf16().collect();

    let mut bytes = vec![0u8; width.word_size()];
    bytes.extend((units.len() as u32).to_le_bytes());
    bytes.extend(units.iter().flat_map(|unit| unit.to_le_bytes()));
    bytes
}

/// Place a managed string object at `addr` and return its length in
/// bytes.
pub fn place_managed_string(
    memory: &FixtureMemory,
    width: PointerWidth,
    addr: usize,
    text: &str,
) -> usize {
    let bytes = managed_string_bytes(width, text);
    memory.place(addr, &bytes);
    bytes.len()
}

pub fn utf16z_bytes(text: &str) -> Vec<u8> {
    text.encode_utf16()
        .chain(std::iter::once(0))
        .flat_map(|unit| unit.to_le_bytes())
        .collect()
}

pub fn read_utf16z(memory: &impl MemoryAccess, addr: Pointer) -> String {
    let mut units = Vec::new();
    let mut cursor = addr;
    loop {
        let pair: [u8; 2] = memory.read_byte_array(cursor).unwrap();
        let unit = u16::from_le_bytes(pair);
        if unit == 0 {
            break;
        }
        units.push(unit);
        cursor = cursor + 2;
    }
    String::from_utf16(&units).unwrap()
}
