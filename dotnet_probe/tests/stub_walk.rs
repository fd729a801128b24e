mod common;

use common::FixtureMemory;
use dotnet_probe::{verified_hook_target, walk, walk_hops, Error};
use process_memory::{Pointer, PointerWidth};

const BASE: usize = 0x10_0000;

// A byte that no stub pattern starts with, standing in for the first
// instruction of a compiled body.
const BODY: u8 = 0x55;

fn fixture(len: usize) -> FixtureMemory {
    FixtureMemory::zeroed(BASE, len)
}

#[test]
fn non_stub_start_is_returned_unchanged() {
    let memory = fixture(0x100);
    memory.place(BASE, &[BODY]);

    let result = walk(&memory, PointerWidth::Bits64, Pointer::new(BASE));

    assert_eq!(result.unwrap(), Pointer::new(BASE));
}

#[test]
fn rel32_jump_reaches_body() {
    let memory = fixture(0x100);
    // jmp rel32 over 0x20 bytes: target = start + 5 + 0x20
    memory.place(BASE, &[0xE9, 0x20, 0x00, 0x00, 0x00]);
    memory.place(BASE + 0x25, &[BODY]);

    let result = walk(&memory, PointerWidth::Bits64, Pointer::new(BASE));

    assert_eq!(result.unwrap(), Pointer::new(BASE + 0x25));
}

#[test]
fn rel32_jump_may_go_backward() {
    let memory = fixture(0x100);
    memory.place(BASE + 0x10, &[BODY]);
    // rel32 = -0x35: target = (BASE+0x40) + 5 - 0x35 = BASE + 0x10
    memory.place(BASE + 0x40, &[0xE9, 0xCB, 0xFF, 0xFF, 0xFF]);

    let result =
        walk(&memory, PointerWidth::Bits64, Pointer::new(BASE + 0x40));

    assert_eq!(result.unwrap(), Pointer::new(BASE + 0x10));
}

#[test]
fn rel8_chain_reaches_body() {
    let memory = fixture(0x100);
    // Two short jumps, then the body.
    memory.place(BASE, &[0xEB, 0x10]);
    memory.place(BASE + 0x12, &[0xEB, 0x0E]);
    memory.place(BASE + 0x22, &[BODY]);

    let result = walk(&memory, PointerWidth::Bits32, Pointer::new(BASE));

    assert_eq!(result.unwrap(), Pointer::new(BASE + 0x22));
}

#[test]
fn indirect_jump_through_rip_relative_slot() {
    let width = PointerWidth::Bits64;
    let memory = fixture(0x200);
    // jmp [rip + 0x3A]: slot at BASE + 6 + 0x3A
    memory.place(BASE, &[0xFF, 0x25, 0x3A, 0x00, 0x00, 0x00]);
    memory.place_word(width, BASE + 0x40, BASE + 0x80);
    memory.place(BASE + 0x80, &[BODY]);

    let result = walk(&memory, width, Pointer::new(BASE));

    assert_eq!(result.unwrap(), Pointer::new(BASE + 0x80));
}

#[test]
fn indirect_jump_through_absolute_slot() {
    let width = PointerWidth::Bits32;
    let memory = fixture(0x200);
    // jmp [abs]: the displacement itself is the slot address.
    let slot = BASE + 0x40;
    memory.place(BASE, &[0xFF, 0x25]);
    memory.place(BASE + 2, &(slot as u32).to_le_bytes());
    memory.place_word(width, slot, BASE + 0x90);
    memory.place(BASE + 0x90, &[BODY]);

    let result = walk(&memory, width, Pointer::new(BASE));

    assert_eq!(result.unwrap(), Pointer::new(BASE + 0x90));
}

#[test]
fn mov_imm64_jmp_reg_is_followed() {
    let memory = fixture(0x200);
    let target = (BASE + 0x100) as u64;

    let mut stub = vec![0x48, 0xB8];
    stub.extend(target.to_le_bytes());
    stub.extend([0xFF, 0xE0]);
    memory.place(BASE, &stub);
    memory.place(BASE + 0x100, &[BODY]);

    let result = walk(&memory, PointerWidth::Bits64, Pointer::new(BASE));

    assert_eq!(result.unwrap(), Pointer::new(BASE + 0x100));
}

#[test]
fn mov_imm32_jmp_reg_is_followed() {
    let memory = fixture(0x200);
    let target = (BASE + 0x100) as u32;

    let mut stub = vec![0xB8];
    stub.extend(target.to_le_bytes());
    stub.extend([0xFF, 0xE0]);
    memory.place(BASE, &stub);
    memory.place(BASE + 0x100, &[BODY]);

    let result = walk(&memory, PointerWidth::Bits32, Pointer::new(BASE));

    assert_eq!(result.unwrap(), Pointer::new(BASE + 0x100));
}

#[test]
fn mov_imm_without_jmp_reg_is_not_a_stub() {
    // mov eax, imm32 followed by something other than jmp eax is plain
    // code and must terminate the walk where it stands.
    let memory = fixture(0x100);
    memory.place(BASE, &[0xB8, 0x01, 0x00, 0x00, 0x00, 0xC3, 0x00]);

    let result = walk(&memory, PointerWidth::Bits32, Pointer::new(BASE));

    assert_eq!(result.unwrap(), Pointer::new(BASE));
}

#[test]
fn walk_is_idempotent() {
    let memory = fixture(0x100);
    memory.place(BASE, &[0xE9, 0x20, 0x00, 0x00, 0x00]);
    memory.place(BASE + 0x25, &[0xEB, 0x09]);
    memory.place(BASE + 0x30, &[BODY]);

    let width = PointerWidth::Bits64;
    let once = walk(&memory, width, Pointer::new(BASE)).unwrap();
    let twice = walk(&memory, width, once).unwrap();

    assert_eq!(once, Pointer::new(BASE + 0x30));
    assert_eq!(twice, once);
}

#[test]
fn jump_to_self_reports_exhaustion() {
    let memory = fixture(0x100);
    // jmp rel8 -2: hops back onto itself forever.
    memory.place(BASE, &[0xEB, 0xFE]);

    let result = walk(&memory, PointerWidth::Bits32, Pointer::new(BASE));

    assert!(matches!(
        result,
        Err(Error::StubWalkExhausted { max_hops: 16, .. })
    ));
}

#[test]
fn chain_longer_than_budget_reports_exhaustion() {
    // 40 consecutive two-byte jumps, each to the next.
    let memory = fixture(0x100);
    for i in 0..40 {
        memory.place(BASE + 2 * i, &[0xEB, 0x00]);
    }

    let result = walk(&memory, PointerWidth::Bits64, Pointer::new(BASE));

    assert!(matches!(result, Err(Error::StubWalkExhausted { .. })));
}

#[test]
fn chain_exactly_at_budget_succeeds() {
    let memory = fixture(0x100);
    for i in 0..16 {
        memory.place(BASE + 2 * i, &[0xEB, 0x00]);
    }
    memory.place(BASE + 32, &[BODY]);

    let result = walk(&memory, PointerWidth::Bits64, Pointer::new(BASE));

    assert_eq!(result.unwrap(), Pointer::new(BASE + 32));
}

#[test]
fn custom_hop_budget_is_honored() {
    let memory = fixture(0x100);
    memory.place(BASE, &[0xEB, 0x00]);
    memory.place(BASE + 2, &[0xEB, 0x00]);
    memory.place(BASE + 4, &[BODY]);

    let short = walk_hops(&memory, PointerWidth::Bits64, Pointer::new(BASE), 1);
    assert!(matches!(
        short,
        Err(Error::StubWalkExhausted { max_hops: 1, .. })
    ));

    let enough =
        walk_hops(&memory, PointerWidth::Bits64, Pointer::new(BASE), 2);
    assert_eq!(enough.unwrap(), Pointer::new(BASE + 4));
}

#[test]
fn jump_to_unreadable_address_is_an_error() {
    let memory = fixture(0x100);
    // Jumps far outside the fixture mapping.
    memory.place(BASE, &[0xE9, 0x00, 0x00, 0x10, 0x00]);

    let result = walk(&memory, PointerWidth::Bits64, Pointer::new(BASE));

    assert!(matches!(result, Err(Error::UnreadableStubTarget { .. })));
}

#[test]
fn unreadable_start_is_an_error() {
    let memory = fixture(0x100);

    let result =
        walk(&memory, PointerWidth::Bits64, Pointer::new(0xDEAD_0000));

    assert!(matches!(result, Err(Error::ProcessMemory { .. })));
}

#[test]
fn verified_target_requires_executable_memory() {
    let memory = fixture(0x100);
    memory.place(BASE, &[0xE9, 0x20, 0x00, 0x00, 0x00]);
    memory.place(BASE + 0x25, &[BODY]);

    let result = verified_hook_target(
        &memory,
        PointerWidth::Bits64,
        Pointer::new(BASE),
    );

    assert!(matches!(
        result,
        Err(Error::NonExecutableTarget(target))
            if target == Pointer::new(BASE + 0x25)
    ));
}

#[test]
fn verified_target_accepts_executable_memory() {
    let memory = fixture(0x100).executable(BASE..BASE + 0x100);
    memory.place(BASE, &[0xE9, 0x20, 0x00, 0x00, 0x00]);
    memory.place(BASE + 0x25, &[BODY]);

    let result = verified_hook_target(
        &memory,
        PointerWidth::Bits64,
        Pointer::new(BASE),
    );

    assert_eq!(result.unwrap(), Pointer::new(BASE + 0x25));
}
