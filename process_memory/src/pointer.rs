use std::fmt::{Debug, Display};

use crate::Error;

/// Address in the probed process.  Never dereferenced directly; all
/// access goes through a reader so that a bad address surfaces as an
/// error instead of a fault.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pointer {
    address: usize,
}

impl Pointer {
    pub const SIZE: usize = std::mem::size_of::<Self>();

    #[inline]
    pub fn new(address: impl Into<Self>) -> Self {
        address.into()
    }

    #[inline]
    pub fn null() -> Self {
        Self { address: 0 }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        self.address == 0
    }

    #[inline]
    pub fn as_non_null(self) -> Option<Self> {
        if self.is_null() {
            None
        } else {
            Some(self)
        }
    }

    #[inline]
    pub fn as_usize(self) -> usize {
        self.address
    }

    #[inline]
    pub fn is_aligned(&self, alignment: usize) -> bool {
        self.address % alignment == 0
    }

    #[inline]
    pub fn checked_add(self, offset: usize) -> Option<Self> {
        self.address
            .checked_add(offset)
            .map(|address| Self { address })
    }

    #[inline]
    pub fn checked_sub(self, offset: usize) -> Option<Self> {
        self.address
            .checked_sub(offset)
            .map(|address| Self { address })
    }

    /// Signed displacement, as produced by relative jump instructions.
    #[inline]
    pub fn checked_offset(self, offset: isize) -> Option<Self> {
        self.address
            .checked_add_signed(offset)
            .map(|address| Self { address })
    }

    #[inline]
    pub fn try_add(self, offset: usize) -> Result<Self, Error> {
        self.checked_add(offset).ok_or(Error::PointerOverflow(self))
    }

    #[inline]
    pub fn try_offset(self, offset: isize) -> Result<Self, Error> {
        self.checked_offset(offset)
            .ok_or(Error::PointerOverflow(self))
    }
}

impl std::ops::Add<usize> for Pointer {
    type Output = Pointer;

    #[inline]
    fn add(self, rhs: usize) -> Self::Output {
        self.checked_add(rhs).unwrap()
    }
}

impl std::ops::Sub<usize> for Pointer {
    type Output = Pointer;

    #[inline]
    fn sub(self, rhs: usize) -> Self::Output {
        self.checked_sub(rhs).unwrap()
    }
}

impl std::ops::Sub for Pointer {
    type Output = usize;

    #[inline]
    fn sub(self, rhs: Self) -> Self::Output {
        self.address - rhs.address
    }
}

/// Flags are sometimes stored in the low bits of pointers.  This
/// overload exists to allow them to be masked out.
impl std::ops::BitAnd<usize> for Pointer {
    type Output = Pointer;

    fn bitand(self, mask: usize) -> Self::Output {
        (self.address & mask).into()
    }
}

impl Debug for Pointer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Pointer(0x{:016x})", self.address)
    }
}

impl Display for Pointer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:016x}", self.address)
    }
}

impl From<usize> for Pointer {
    #[inline]
    fn from(address: usize) -> Self {
        Self { address }
    }
}

impl From<[u8; 8]> for Pointer {
    #[inline]
    fn from(bytes: [u8; 8]) -> Self {
        let address = usize::from_le_bytes(bytes);
        Self { address }
    }
}

impl TryFrom<&[u8]> for Pointer {
    type Error = std::array::TryFromSliceError;

    #[inline]
    fn try_from(bytes: &[u8]) -> std::result::Result<Self, Self::Error> {
        let address = usize::from_le_bytes(bytes.try_into()?);
        Ok(Self { address })
    }
}
