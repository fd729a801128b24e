use derive_more::derive::From;
use log::trace;
use process_memory::{MemoryAccess, Pointer, PointerWidth};

use crate::{looks_like_string, Error, ManagedString, ObjectRef};

/// Register and stack state captured at a freshly-entered call frame.
///
/// Frame-local by contract: each invocation of a probed method gets its
/// own snapshot, so concurrent calls from different target threads
/// never observe each other's state.
#[derive(Debug, Clone, Copy)]
pub struct FrameSnapshot {
    pub instruction_ptr: Pointer,
    pub stack_ptr: Pointer,
    /// Register carrying the instance receiver under the assumed
    /// convention.  Null for static methods.
    pub this_register: Pointer,
}

impl FrameSnapshot {
    /// Address of stack slot `slot`, counted in words outward from the
    /// stack pointer.  Writing through it overwrites an argument of
    /// the current invocation only; other frames are untouched.
    pub fn slot_address(
        &self,
        width: PointerWidth,
        slot: usize,
    ) -> Result<Pointer, Error> {
        Ok(self.stack_ptr.try_add(slot * width.word_size())?)
    }
}

#[derive(Debug, Clone, PartialEq, From)]
pub enum ArgumentValue {
    String(ManagedString),
    Int32(i32),
    Boolean(bool),
    Object(ObjectRef),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecoveredArgument {
    /// Stack slot the value was read from, counted in words outward
    /// from the stack pointer.
    pub slot: usize,
    pub value: ArgumentValue,
}

/// Number of stack slots the heuristic scan inspects before giving up.
pub const DEFAULT_SCAN_SLOTS: usize = 12;

/// Strategy for turning a frame snapshot into argument values.
///
/// `Deterministic` is the documented decode point for methods whose
/// parameter list is known: fixed slot offsets, one value per
/// parameter.  `HeuristicStringScan` is the fallback for
/// single-string-argument methods when the layout is not separately
/// known; it holds to a much weaker correctness bar and callers must
/// treat its output as a guess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgumentDecoder {
    /// Parameter type full-names, in declaration order.
    Deterministic(Vec<String>),
    HeuristicStringScan { max_slots: usize },
}

impl ArgumentDecoder {
    pub fn heuristic() -> Self {
        ArgumentDecoder::HeuristicStringScan {
            max_slots: DEFAULT_SCAN_SLOTS,
        }
    }

    /// Deterministic when the signature is known, scanning otherwise.
    pub fn for_signature(signature: &[String]) -> Self {
        if signature.is_empty() {
            Self::heuristic()
        } else {
            ArgumentDecoder::Deterministic(signature.to_vec())
        }
    }

    pub fn recover(
        &self,
        memory: &impl MemoryAccess,
        width: PointerWidth,
        frame: &FrameSnapshot,
    ) -> Result<Vec<RecoveredArgument>, Error> {
        match self {
            ArgumentDecoder::Deterministic(parameter_types) => {
                decode_by_signature(memory, width, frame, parameter_types)
            }
            ArgumentDecoder::HeuristicStringScan { max_slots } => {
                scan_for_string(memory, width, frame, *max_slots)
            }
        }
    }
}

fn read_slot(
    memory: &impl MemoryAccess,
    width: PointerWidth,
    frame: &FrameSnapshot,
    slot: usize,
) -> Result<Pointer, Error> {
    let addr = frame.slot_address(width, slot)?;
    let bytes = memory.read_bytes(addr..addr.try_add(width.word_size())?)?;
    Ok(width.decode_word(&bytes))
}

/// Fixed-layout decode for an assumed native-word convention: the slot
/// at the stack pointer holds the return address, simple arguments
/// occupy the following slots in order.
fn decode_by_signature(
    memory: &impl MemoryAccess,
    width: PointerWidth,
    frame: &FrameSnapshot,
    parameter_types: &[String],
) -> Result<Vec<RecoveredArgument>, Error> {
    parameter_types
        .iter()
        .enumerate()
        .map(|(index, parameter_type)| {
            let slot = index + 1;
            let word = read_slot(memory, width, frame, slot)?;

            let value = match parameter_type.as_str() {
                "System.String" => {
                    ManagedString::read(memory, width, ObjectRef::new(word))?
                        .into()
                }
                "System.Int32" => {
                    ArgumentValue::Int32(word.as_usize() as u32 as i32)
                }
                "System.Boolean" => {
                    ArgumentValue::Boolean(!word.is_null())
                }
                _ => ArgumentValue::Object(ObjectRef::new(word)),
            };

            Ok(RecoveredArgument { slot, value })
        })
        .collect()
}

/// Scan outward from the stack pointer for the first slot holding
/// something shaped like a managed string.  Reliable only for methods
/// taking a single string argument; anything richer needs the
/// signature-driven decode.
fn scan_for_string(
    memory: &impl MemoryAccess,
    width: PointerWidth,
    frame: &FrameSnapshot,
    max_slots: usize,
) -> Result<Vec<RecoveredArgument>, Error> {
    for slot in 1..=max_slots {
        let word = read_slot(memory, width, frame, slot)?;
        trace!("scan slot {slot}: {word}");

        if looks_like_string(memory, width, word) {
            let value =
                ManagedString::read(memory, width, ObjectRef::new(word))?;
            return Ok(vec![RecoveredArgument {
                slot,
                value: value.into(),
            }]);
        }
    }

    Ok(Vec::new())
}
