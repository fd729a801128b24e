mod error;
pub use error::{Error, Result};

mod pointer;
pub use pointer::*;

mod arch;
pub use arch::PointerWidth;

mod owned_bytes;
pub use owned_bytes::OwnedBytes;

mod access;
pub use access::MemoryAccess;

mod region;
pub use region::MemoryMapRegion;

mod process;
pub use process::ProcessMemory;

mod exports;
pub use exports::Export;
