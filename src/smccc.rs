// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Types and helpers related to the SMC Calling Convention.

use core::fmt::{self, Debug, Display, Formatter};

const FAST_CALL: u32 = 0x8000_0000;
const SMC64: u32 = 0x4000_0000;
const OEN_MASK: u32 = 0x3f00_0000;
const OEN_SHIFT: u8 = 24;
const SVE_HINT: u32 = 1 << 16;
const RESERVED_BITS: u32 = 0x7f << 17;

/// The call completed successfully.
pub const SUCCESS: i32 = 0;

/// The call is not supported by the implementation.
///
/// This is also the architectural "unknown SMC" result.
pub const NOT_SUPPORTED: i32 = -1;

/// The type of an SMCCC call: whether it is a fast call or yielding call, and which calling
/// convention it uses.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SmcccCallType {
    /// An SMC32/HVC32 fast call.
    Fast32,
    /// An SMC64/HVC64 fast call.
    Fast64,
    /// A yielding call.
    Yielding,
}

/// Owning Entity Number (OEN)
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct OwningEntityNumber(pub u8);

impl OwningEntityNumber {
    /// Silicon Partner calls, where the power management service lives.
    pub const SIP: Self = Self(2);
}

impl Display for OwningEntityNumber {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An SMCCC function ID.
#[derive(Copy, Clone, Eq, PartialEq)]
#[repr(transparent)]
pub struct FunctionId(pub u32);

impl FunctionId {
    /// Creates a new `FunctionId` from its components.
    #[cfg(test)]
    pub const fn new(call_type: SmcccCallType, oen: OwningEntityNumber, number: u16) -> Self {
        let type_bits = match call_type {
            SmcccCallType::Fast32 => FAST_CALL,
            SmcccCallType::Fast64 => FAST_CALL | SMC64,
            SmcccCallType::Yielding => 0,
        };
        Self(type_bits | (((oen.0 as u32) << OEN_SHIFT) & OEN_MASK) | (number as u32))
    }

    /// Returns the Owning Entity Number of the function ID.
    pub fn oen(self) -> OwningEntityNumber {
        OwningEntityNumber(((self.0 & OEN_MASK) >> OEN_SHIFT) as u8)
    }

    /// Returns the lower 16 bits of the function ID.
    pub fn number(self) -> u16 {
        self.0 as u16
    }

    /// Returns what type of call this is.
    pub fn call_type(self) -> SmcccCallType {
        if self.0 & FAST_CALL != 0 {
            if self.0 & SMC64 != 0 {
                SmcccCallType::Fast64
            } else {
                SmcccCallType::Fast32
            }
        } else {
            SmcccCallType::Yielding
        }
    }

    /// Sets the SVE hint bit.
    #[cfg(test)]
    pub fn set_sve_hint(&mut self) {
        self.0 |= SVE_HINT
    }

    /// Clears the SVE hint bit.
    pub fn clear_sve_hint(&mut self) {
        self.0 &= !SVE_HINT
    }

    /// Returns false if this is a fast call but has any of bits 17-23 set.
    ///
    /// They are reserved for future use and should always be 0.
    pub fn valid(self) -> bool {
        self.call_type() == SmcccCallType::Yielding || self.0 & RESERVED_BITS == 0
    }
}

impl Display for FunctionId {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

impl Debug for FunctionId {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(
            f,
            "{:#010x} ({:?} OEN {})",
            self.0,
            self.call_type(),
            self.oen(),
        )
    }
}

/// A value which can be returned from an SMC call by writing to the caller's registers.
#[derive(Clone, Default, Eq, PartialEq)]
pub struct SmcReturn {
    /// The number of elements from `values` that are actually used for this return.
    used: usize,
    values: [u64; Self::MAX_VALUES],
}

impl SmcReturn {
    /// The maximum number of registers an SMC call can return.
    pub const MAX_VALUES: usize = 18;

    /// A return which doesn't touch any of the caller's registers.
    pub const EMPTY: Self = Self {
        used: 0,
        values: [0; 18],
    };

    /// Creates a return which writes the given values to x0 onwards.
    ///
    /// Panics if more than `MAX_VALUES` values are given.
    pub fn from_values(values: &[u64]) -> Self {
        let mut ret = Self::EMPTY;
        ret.values[..values.len()].copy_from_slice(values);
        ret.used = values.len();
        ret
    }

    /// Returns a slice containing the used values.
    pub fn values(&self) -> &[u64] {
        &self.values[0..self.used]
    }

    /// Returns true if no values are used.
    pub fn is_empty(&self) -> bool {
        self.used == 0
    }
}

impl Debug for SmcReturn {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "SmcReturn([")?;
        let values = self.values();
        if let Some(first) = values.first() {
            write!(f, "{first:#x}")?;
            for value in &values[1..] {
                write!(f, ", {value:#x}")?;
            }
        }
        write!(f, "])")?;
        Ok(())
    }
}

impl From<u64> for SmcReturn {
    fn from(value: u64) -> Self {
        Self::from_values(&[value])
    }
}

impl From<u32> for SmcReturn {
    fn from(value: u32) -> Self {
        Self::from(u64::from(value))
    }
}

impl From<i32> for SmcReturn {
    fn from(value: i32) -> Self {
        Self::from(value as u64)
    }
}

macro_rules! smc_return_from_array {
    ($length:literal) => {
        impl From<[u64; $length]> for SmcReturn {
            fn from(value: [u64; $length]) -> Self {
                Self::from_values(&value)
            }
        }
    };
}

smc_return_from_array!(2);
smc_return_from_array!(3);
smc_return_from_array!(4);
