use std::{fs::File, path::Path};

use elf::{endian::AnyEndian, ElfStream};
use itertools::Itertools as _;

use crate::{Error, MemoryMapRegion, Pointer};

/// One visible function of a module mapped into the target: symbolic
/// name plus the address the symbol landed at in the target's address
/// space.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Export {
    pub name: String,
    pub address: Pointer,
}

impl Export {
    /// Enumerate the visible functions of the module backing `region`.
    /// A region with no on-disk backing yields an empty list.
    pub fn collect_from_region(
        region: &MemoryMapRegion,
    ) -> Result<Vec<Export>, Error> {
        let Some(path) = region.name().filter(|p| Path::new(p).exists())
        else {
            return Ok(Vec::new());
        };
        Self::collect_from_file(path, region.mmap_start_address())
    }

    /// Parse the symbol tables of the ELF file at `path`, shifting each
    /// defined symbol by `base` to its mapped address.
    pub fn collect_from_file(
        path: impl AsRef<Path>,
        base: Pointer,
    ) -> Result<Vec<Export>, Error> {
        let file_obj = File::open(path)?;
        let mut elf = ElfStream::<AnyEndian, _>::open_stream(&file_obj)?;

        let mut exports = Vec::new();

        for i in 0..2 {
            // The symbol table and the dynamic symbol table each hold a
            // mutable borrow of the stream, so they are visited in
            // sequence rather than chained into one iterator.
            let Some((table, names)) = if i == 0 {
                elf.symbol_table()
            } else {
                elf.dynamic_symbol_table()
            }?
            else {
                continue;
            };

            for symbol in table {
                if symbol.is_undefined() || symbol.st_name == 0 {
                    continue;
                }
                let name = names.get(symbol.st_name as usize)?.to_string();
                let address = base.try_add(symbol.st_value as usize)?;
                exports.push(Export { name, address });
            }
        }

        // The same symbol commonly appears in both tables.
        Ok(exports.into_iter().unique().collect())
    }
}

impl std::fmt::Display for Export {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} @ {}", self.name, self.address)
    }
}
