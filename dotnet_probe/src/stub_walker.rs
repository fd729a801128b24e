use log::{debug, trace};
use process_memory::{MemoryAccess, Pointer, PointerWidth};

use crate::Error;

/// Hop budget for a single walk.  Cyclic or malformed stub chains fail
/// with `StubWalkExhausted` instead of spinning.
pub const MAX_STUB_HOPS: usize = 16;

/// Follow dispatch stubs from `start` to the stable code body.
///
/// The entry address the runtime reports for a freshly-compiled method
/// often lands on a one-shot stub that the runtime patches or discards
/// after first use.  Attaching there is unreliable, so the walker
/// follows the handful of trampoline shapes such stubs use until it
/// reaches an instruction that is none of them.
pub fn walk(
    memory: &impl MemoryAccess,
    width: PointerWidth,
    start: Pointer,
) -> Result<Pointer, Error> {
    walk_hops(memory, width, start, MAX_STUB_HOPS)
}

pub fn walk_hops(
    memory: &impl MemoryAccess,
    width: PointerWidth,
    start: Pointer,
    max_hops: usize,
) -> Result<Pointer, Error> {
    let mut current = start;

    for hop in 0..max_hops {
        let Some(next) = decode_hop(memory, width, current)? else {
            if current != start {
                debug!("stub walk {start} -> {current} ({hop} hops)");
            }
            return Ok(current);
        };

        if !memory.is_readable(next.target) {
            return Err(Error::UnreadableStubTarget {
                from: current,
                target: next.target,
            });
        }

        trace!(
            "hop {hop}: {} at {current} -> {}",
            next.pattern,
            next.target,
        );
        current = next.target;
    }

    // The budget allows max_hops hops; failure means the chain still
    // had not terminated afterwards.
    match decode_hop(memory, width, current)? {
        Some(_) => Err(Error::StubWalkExhausted { start, max_hops }),
        None => {
            debug!("stub walk {start} -> {current} ({max_hops} hops)");
            Ok(current)
        }
    }
}

/// Walk plus the final safety check: an address is only handed to the
/// interception engine if it lies in executable memory.  Attaching
/// anywhere else would crash the target on the next call.
pub fn verified_hook_target(
    memory: &impl MemoryAccess,
    width: PointerWidth,
    start: Pointer,
) -> Result<Pointer, Error> {
    let target = walk(memory, width, start)?;
    if memory.is_executable(target) {
        Ok(target)
    } else {
        Err(Error::NonExecutableTarget(target))
    }
}

struct Hop {
    target: Pointer,
    pattern: &'static str,
}

/// Decode the instruction at `current` as a stub hop, or `None` for
/// anything that is not one of the recognized trampoline shapes.
///
/// The first byte must be readable; operands are read defensively, and
/// a truncated pattern at the edge of a mapping counts as "not a stub"
/// rather than an error.
fn decode_hop(
    memory: &impl MemoryAccess,
    width: PointerWidth,
    current: Pointer,
) -> Result<Option<Hop>, Error> {
    let [opcode] = memory.read_byte_array::<1>(current)?;

    match opcode {
        // jmp rel32
        0xE9 => {
            let Some(rel) = read_array::<4>(memory, current, 1) else {
                return Ok(None);
            };
            let rel = i32::from_le_bytes(rel);
            let target = current.try_add(5)?.try_offset(rel as isize)?;
            Ok(Some(Hop {
                target,
                pattern: "jmp rel32",
            }))
        }

        // jmp rel8
        0xEB => {
            let Some(rel) = read_array::<1>(memory, current, 1) else {
                return Ok(None);
            };
            let rel = rel[0] as i8;
            let target = current.try_add(2)?.try_offset(rel as isize)?;
            Ok(Some(Hop {
                target,
                pattern: "jmp rel8",
            }))
        }

        // jmp [mem]
        0xFF => {
            let Some([modrm]) = read_array::<1>(memory, current, 1) else {
                return Ok(None);
            };
            if modrm != 0x25 {
                return Ok(None);
            }
            let Some(disp) = read_array::<4>(memory, current, 2) else {
                return Ok(None);
            };

            let slot = match width {
                // Slot address is relative to the next instruction.
                PointerWidth::Bits64 => {
                    let disp = i32::from_le_bytes(disp);
                    current.try_add(6)?.try_offset(disp as isize)?
                }
                // Slot address is the raw displacement itself.
                PointerWidth::Bits32 => {
                    Pointer::new(u32::from_le_bytes(disp) as usize)
                }
            };

            let bytes =
                memory.read_bytes(slot..slot.try_add(width.word_size())?)?;
            Ok(Some(Hop {
                target: width.decode_word(&bytes),
                pattern: "jmp [mem]",
            }))
        }

        // mov rax, imm64; jmp rax
        0x48 if width == PointerWidth::Bits64 => {
            let Some(body) = read_array::<11>(memory, current, 1) else {
                return Ok(None);
            };
            if body[0] != 0xB8 || body[9] != 0xFF || body[10] != 0xE0 {
                return Ok(None);
            }
            let imm = u64::from_le_bytes(body[1..9].try_into().unwrap());
            Ok(Some(Hop {
                target: Pointer::new(imm as usize),
                pattern: "mov imm64; jmp reg",
            }))
        }

        // mov eax, imm32; jmp eax
        0xB8 if width == PointerWidth::Bits32 => {
            let Some(body) = read_array::<6>(memory, current, 1) else {
                return Ok(None);
            };
            if body[4] != 0xFF || body[5] != 0xE0 {
                return Ok(None);
            }
            let imm = u32::from_le_bytes(body[..4].try_into().unwrap());
            Ok(Some(Hop {
                target: Pointer::new(imm as usize),
                pattern: "mov imm32; jmp reg",
            }))
        }

        _ => Ok(None),
    }
}

fn read_array<const N: usize>(
    memory: &impl MemoryAccess,
    base: Pointer,
    offset: usize,
) -> Option<[u8; N]> {
    let start = base.checked_add(offset)?;
    let bytes = memory.try_read_bytes(start..start.checked_add(N)?)?;
    let mut buffer = [0u8; N];
    buffer.copy_from_slice(&bytes);
    Some(buffer)
}
