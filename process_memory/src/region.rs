use std::ops::Range;
use std::path::Path;

use crate::{Error, Pointer, Result};

/// One mapped region of the target's address space, with the permission
/// flags that decide whether the probe may read it or hook inside it.
#[derive(Debug, Clone)]
pub struct MemoryMapRegion {
    start: Pointer,
    end: Pointer,
    file_offset: usize,
    pub name: Option<String>,
    pub is_readable: bool,
    pub is_writable: bool,
    pub is_executable: bool,
    pub is_shared_memory: bool,
}

impl MemoryMapRegion {
    pub fn new(map_range: proc_maps::MapRange) -> Result<Self> {
        let name = map_range
            .filename()
            .map(|p| {
                p.to_str()
                    .ok_or(Error::InvalidUTF8InPath)
                    .map(|s| s.to_string())
            })
            .transpose()?;
        Ok(Self {
            start: map_range.start().into(),
            end: (map_range.start() + map_range.size()).into(),
            file_offset: map_range.offset,
            name,
            is_readable: map_range.is_read(),
            is_writable: map_range.is_write(),
            is_executable: map_range.is_exec(),
            is_shared_memory: &map_range.flags[3..4] == "s",
        })
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn short_name(&self) -> &str {
        self.name
            .as_deref()
            .and_then(|name| Path::new(name).file_name())
            .and_then(|name| name.to_str())
            .unwrap_or("[anon]")
    }

    pub fn size_bytes(&self) -> usize {
        self.end - self.start
    }

    pub fn address_range(&self) -> Range<Pointer> {
        self.start..self.end
    }

    /// Start of the whole file mapping this region belongs to.  Symbol
    /// addresses from the backing file are relative to this, not to the
    /// region's own start.
    pub fn mmap_start_address(&self) -> Pointer {
        self.start - self.file_offset
    }

    pub fn file_offset(&self) -> usize {
        self.file_offset
    }

    pub fn contains(&self, ptr: Pointer) -> bool {
        (self.start <= ptr) && (ptr < self.end)
    }

    pub fn matches_name(&self, search_name: &str) -> bool {
        self.name
            .as_deref()
            .map(|name| name == search_name)
            .unwrap_or(false)
    }

    pub fn is_file_backed(&self) -> bool {
        self.name
            .as_deref()
            .map(|name| Path::new(name).exists())
            .unwrap_or(false)
    }

    pub fn flag_str(&self) -> String {
        format!(
            "{}{}{}{}",
            if self.is_readable { 'r' } else { '-' },
            if self.is_writable { 'w' } else { '-' },
            if self.is_executable { 'x' } else { '-' },
            if self.is_shared_memory { 's' } else { 'p' },
        )
    }
}
