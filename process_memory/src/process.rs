use std::cell::RefCell;
use std::io::{Read as _, Seek as _, SeekFrom, Write as _};
use std::ops::Range;

use itertools::Itertools as _;
use process_vm_io::ProcessVirtualMemoryIO;

use crate::{
    Error, Export, MemoryAccess, MemoryMapRegion, OwnedBytes, Pointer, Result,
};

/// Reader/writer over a live process's address space, addressed by pid.
///
/// Intended for the setup phase on a single thread.  Probe callbacks that
/// fire inside the target use whatever accessor the instrumentation
/// engine provides there instead.
pub struct ProcessMemory {
    pid: u32,
    regions: Vec<MemoryMapRegion>,
    process_io: RefCell<ProcessVirtualMemoryIO>,
}

impl ProcessMemory {
    pub fn new(pid: u32) -> Result<Self> {
        let regions = Self::get_memory_regions(pid)?;

        let process_io =
            RefCell::new(unsafe { ProcessVirtualMemoryIO::new(pid, 0) }?);

        Ok(Self {
            pid,
            regions,
            process_io,
        })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    fn get_memory_regions(pid: u32) -> Result<Vec<MemoryMapRegion>> {
        proc_maps::get_process_maps(
            pid.try_into().unwrap_or_else(|_| {
                panic!("Could not convert PID {pid} to pid_t")
            }),
        )
        .map_err(|_| Error::MemoryMapNotFound(pid))?
        .into_iter()
        .map(MemoryMapRegion::new)
        .collect()
    }

    /// Re-read /proc/pid/maps.  The target may map or unmap regions at
    /// any time, so long-lived sessions refresh before walking stubs.
    pub fn refresh_regions(&mut self) -> Result<()> {
        self.regions = Self::get_memory_regions(self.pid)?;
        Ok(())
    }

    pub fn iter_regions(&self) -> impl Iterator<Item = &MemoryMapRegion> + '_ {
        self.regions.iter()
    }

    pub fn find_containing_region(
        &self,
        ptr: Pointer,
    ) -> Option<&MemoryMapRegion> {
        if ptr.is_null() {
            return None;
        }

        self.iter_regions().find(|region| region.contains(ptr))
    }

    pub fn read_exact(
        &self,
        ptr: impl Into<Pointer>,
        buffer: &mut [u8],
    ) -> Result<()> {
        let ptr: Pointer = ptr.into();

        if ptr.is_null() {
            return Err(Error::MemoryReadNullPointer);
        }

        let mut process_io = self.process_io.borrow_mut();

        process_io.seek(SeekFrom::Start(ptr.as_usize() as u64))?;
        process_io.read_exact(buffer).map_err(|err| {
            let err_string = format!("{}", err);
            if err_string.contains("Operation not permitted") {
                Error::MemoryReadInsufficientPermission
            } else if err_string.contains("Bad address") {
                Error::MemoryReadBadAddress(ptr, buffer.len())
            } else {
                Error::MemoryReadOther { err }
            }
        })?;

        Ok(())
    }

    /// Exports of the first file-backed mapping whose path contains
    /// `name_fragment`, shifted to their mapped addresses.
    pub fn module_exports(&self, name_fragment: &str) -> Result<Vec<Export>> {
        let region = self
            .iter_regions()
            .filter(|region| {
                region
                    .name()
                    .map(|name| name.contains(name_fragment))
                    .unwrap_or(false)
            })
            .sorted_by_key(|region| region.file_offset())
            .next()
            .ok_or_else(|| {
                Error::MissingMemoryMapSection(name_fragment.to_string())
            })?;

        Export::collect_from_region(region)
    }
}

impl MemoryAccess for ProcessMemory {
    fn read_bytes(&self, range: Range<Pointer>) -> Result<OwnedBytes> {
        let mut buffer = vec![0u8; range.end - range.start];
        self.read_exact(range.start, &mut buffer)?;
        Ok(OwnedBytes::new(range.start, buffer))
    }

    fn write_bytes(&self, ptr: Pointer, bytes: &[u8]) -> Result<()> {
        if ptr.is_null() {
            return Err(Error::MemoryWriteNullPointer);
        }

        let mut process_io = self.process_io.borrow_mut();

        process_io.seek(SeekFrom::Start(ptr.as_usize() as u64))?;
        process_io.write_all(bytes).map_err(|err| {
            let err_string = format!("{}", err);
            if err_string.contains("Operation not permitted") {
                Error::MemoryReadInsufficientPermission
            } else if err_string.contains("Bad address") {
                Error::MemoryReadBadAddress(ptr, bytes.len())
            } else {
                Error::MemoryReadOther { err }
            }
        })?;

        Ok(())
    }

    fn is_readable(&self, ptr: Pointer) -> bool {
        self.find_containing_region(ptr)
            .map(|region| region.is_readable)
            .unwrap_or(false)
    }

    fn is_executable(&self, ptr: Pointer) -> bool {
        self.find_containing_region(ptr)
            .map(|region| region.is_executable)
            .unwrap_or(false)
    }
}
