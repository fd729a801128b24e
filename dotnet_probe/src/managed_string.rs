use itertools::Itertools as _;
use log::warn;
use process_memory::{MemoryAccess, Pointer, PointerWidth};

use crate::{Error, ObjectRef};

/// Maximum plausible length for a confirmed string read, in UTF-16 code
/// units.  A length field at or above this is assumed to be garbage
/// rather than a string header, and the decode degrades to a marker
/// instead of reading further.
pub const STRING_SANITY_BOUND: u32 = 0x20000;

/// Tighter bound for probing unconfirmed memory, where a false positive
/// costs more than a false negative.
pub const STRING_HEURISTIC_BOUND: u32 = 0x2000;

/// Result of decoding a managed string reference.
///
/// The in-memory shape is a type-descriptor pointer, then a 32-bit
/// length in UTF-16 code units, then the code units themselves.
#[derive(Clone, PartialEq, Eq)]
pub enum ManagedString {
    Null,
    /// The length field failed the sanity bound.  The handle was most
    /// likely never a string; nothing past the length word was read.
    Suspicious { length: u32 },
    Text(String),
}

impl ManagedString {
    pub fn read(
        memory: &impl MemoryAccess,
        width: PointerWidth,
        obj: ObjectRef,
    ) -> Result<Self, Error> {
        let Some(base) = obj.address().as_non_null() else {
            return Ok(ManagedString::Null);
        };

        // Advance past the type-descriptor pointer.
        let length_ptr = base.try_add(width.word_size())?;
        let length =
            u32::from_le_bytes(memory.read_byte_array::<4>(length_ptr)?);

        if length >= STRING_SANITY_BOUND {
            warn!("string at {base} has implausible length {length}");
            return Ok(ManagedString::Suspicious { length });
        }

        let data_ptr = length_ptr.try_add(4)?;
        let num_str_bytes = (length as usize) * 2;
        let bytes =
            memory.read_bytes(data_ptr..data_ptr.try_add(num_str_bytes)?)?;

        let iter_u16 = bytes
            .iter()
            .copied()
            .tuples()
            .map(|(a, b)| u16::from_le_bytes([a, b]));

        let text = char::decode_utf16(iter_u16)
            .collect::<Result<String, _>>()
            .map_err(|err| -> Error { err.into() })?;

        Ok(ManagedString::Text(text))
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ManagedString::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl std::fmt::Display for ManagedString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ManagedString::Null => write!(f, "<null>"),
            ManagedString::Suspicious { length } => {
                write!(f, "[suspicious length={length}]")
            }
            ManagedString::Text(text) => write!(f, "{text}"),
        }
    }
}

impl std::fmt::Debug for ManagedString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ManagedString::Text(text) => {
                f.debug_tuple("Text").field(text).finish()
            }
            other => write!(f, "{}", other),
        }
    }
}

/// Heuristic probe for use before a confirmed decode is safe, as when
/// scanning stack slots whose contents are entirely untrusted.
///
/// Reads defensively and never surfaces a fault; returns true only for
/// a length field in the plausible range for a live string.
pub fn looks_like_string(
    memory: &impl MemoryAccess,
    width: PointerWidth,
    ptr: Pointer,
) -> bool {
    let Some(base) = ptr.as_non_null() else {
        return false;
    };
    let Some(length_ptr) = base.checked_add(width.word_size()) else {
        return false;
    };
    let Some(end) = length_ptr.checked_add(4) else {
        return false;
    };
    let Some(bytes) = memory.try_read_bytes(length_ptr..end) else {
        return false;
    };

    let length = u32::from_le_bytes(bytes[..4].try_into().unwrap());
    length > 0 && length < STRING_HEURISTIC_BOUND
}
