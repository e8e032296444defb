/// 32-bit data word carried on `data_i` / `data_o`.
pub type Word = u32;
/// Register index carried on `addr_i`. Only the low 5 bits reach the device.
pub type Addr = u8;

pub const WORD_BITS: u8 = 32;
pub const ADDR_BITS: u8 = 5;
/// Number of addressable registers.
pub const NUM_REGS: usize = 1 << ADDR_BITS;

/// Value returned by finished tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Val {
    None,
    Int(Word),
}

/// Bit mask for a signal of `width` bits.
#[inline]
pub fn width_mask(width: u8) -> u32 {
    if width >= 32 {
        u32::MAX
    } else {
        (1u32 << width) - 1
    }
}
