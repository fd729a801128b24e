use crate::Pointer;

/// Addressing model of the probed process.
///
/// The prober may be a 64-bit process inspecting a 32-bit target, so the
/// target's word size is carried explicitly rather than inferred from the
/// host.  It decides how wide a stack slot is, where a managed string's
/// length field sits, and how indirect jump slots are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerWidth {
    Bits32,
    Bits64,
}

impl PointerWidth {
    #[inline]
    pub fn word_size(self) -> usize {
        match self {
            PointerWidth::Bits32 => 4,
            PointerWidth::Bits64 => 8,
        }
    }

    /// Decode one target-sized word from the start of `bytes`.  The
    /// caller guarantees at least `word_size()` bytes.
    pub fn decode_word(self, bytes: &[u8]) -> Pointer {
        let address = match self {
            PointerWidth::Bits32 => {
                u32::from_le_bytes(bytes[..4].try_into().unwrap()) as usize
            }
            PointerWidth::Bits64 => {
                u64::from_le_bytes(bytes[..8].try_into().unwrap()) as usize
            }
        };
        address.into()
    }
}

impl std::fmt::Display for PointerWidth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PointerWidth::Bits32 => write!(f, "32-bit"),
            PointerWidth::Bits64 => write!(f, "64-bit"),
        }
    }
}
