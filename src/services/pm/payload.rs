// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Request frames sent to the platform management controller.
//!
//! A frame is [`PAYLOAD_ARG_CNT`] words. Word 0 is the header:
//!
//! ```text
//!  31      25 24 23     16 15         8 7          0
//! +----------+--+---------+------------+------------+
//! | reserved |NS| reserved | module ID  |   API ID   |
//! +----------+--+---------+------------+------------+
//! ```
//!
//! followed by up to five arguments. Unused words are zero.

use super::defs::{LIBPM_MODULE_ID, PAYLOAD_ARG_CNT, PmApiId, SecurityFlag};
use arrayvec::ArrayVec;

const MODULE_ID_SHIFT: u32 = 8;
const FLAG_SHIFT: u32 = 24;

/// Maximum number of arguments following the header.
pub const MAX_ARGS: usize = PAYLOAD_ARG_CNT - 1;

/// The header word of a request frame.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PayloadHeader {
    /// Low byte of the API ID.
    pub api_id: u8,
    /// Module implementing the API.
    pub module_id: u8,
    /// Security state of the caller.
    pub flag: SecurityFlag,
}

impl PayloadHeader {
    /// Creates a header, resolving module 0 to LibPM.
    pub fn new(api_id: u8, module_id: u8, flag: SecurityFlag) -> Self {
        Self {
            api_id,
            module_id: if module_id == 0 {
                LIBPM_MODULE_ID
            } else {
                module_id
            },
            flag,
        }
    }

    /// Creates the header for a call to the given API.
    pub fn for_api(api: PmApiId, flag: SecurityFlag) -> Self {
        Self::new(api as u32 as u8, api.module(), flag)
    }

    /// Packs the header into word 0 of a frame.
    pub fn encode(self) -> u32 {
        u32::from(self.api_id)
            | (u32::from(self.module_id) << MODULE_ID_SHIFT)
            | ((self.flag as u32) << FLAG_SHIFT)
    }

    /// Unpacks word 0 of a frame.
    pub fn decode(word: u32) -> Self {
        Self {
            api_id: word as u8,
            module_id: (word >> MODULE_ID_SHIFT) as u8,
            flag: if word & (1 << FLAG_SHIFT) != 0 {
                SecurityFlag::NonSecure
            } else {
                SecurityFlag::Secure
            },
        }
    }
}

/// A request frame.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Payload {
    header: PayloadHeader,
    args: ArrayVec<u32, MAX_ARGS>,
}

impl Payload {
    /// Creates a frame with no arguments.
    pub fn new(header: PayloadHeader) -> Self {
        Self {
            header,
            args: ArrayVec::new(),
        }
    }

    /// Creates a frame for a call to the given API with the given arguments.
    ///
    /// Panics if more than [`MAX_ARGS`] arguments are given.
    pub fn call(api: PmApiId, flag: SecurityFlag, args: &[u32]) -> Self {
        let mut payload = Self::new(PayloadHeader::for_api(api, flag));
        for &arg in args {
            payload = payload.arg(arg);
        }
        payload
    }

    /// Appends an argument.
    ///
    /// Panics if the frame already has [`MAX_ARGS`] arguments.
    pub fn arg(mut self, value: u32) -> Self {
        self.args.push(value);
        self
    }

    /// Returns the header.
    pub fn header(&self) -> PayloadHeader {
        self.header
    }

    /// Returns the arguments.
    pub fn args(&self) -> &[u32] {
        &self.args
    }

    /// Returns the words to write to the request buffer.
    pub fn to_words(&self) -> [u32; PAYLOAD_ARG_CNT] {
        let mut words = [0; PAYLOAD_ARG_CNT];
        words[0] = self.header.encode();
        words[1..=self.args.len()].copy_from_slice(&self.args);
        words
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::pm::defs::LOADER_MODULE_ID;

    #[test]
    fn module_zero_is_libpm() {
        let header = PayloadHeader::new(0x23, 0, SecurityFlag::Secure);
        assert_eq!(header.module_id, LIBPM_MODULE_ID);
        assert_eq!(header.encode(), 0x0000_0223);

        let header = PayloadHeader::new(0x01, LOADER_MODULE_ID, SecurityFlag::Secure);
        assert_eq!(header.encode(), 0x0000_0701);
    }

    #[test]
    fn header_decodes_fields() {
        for (api_id, module_id, flag) in [
            (0x07, 2, SecurityFlag::NonSecure),
            (0xff, 0x1c, SecurityFlag::Secure),
            (0x01, 7, SecurityFlag::NonSecure),
        ] {
            let header = PayloadHeader::new(api_id, module_id, flag);
            assert_eq!(PayloadHeader::decode(header.encode()), header);
        }
    }

    #[test]
    fn decode_ignores_reserved_bits() {
        let header = PayloadHeader::decode(0xfe80_0207);
        assert_eq!(header.api_id, 0x07);
        assert_eq!(header.module_id, 2);
        assert_eq!(header.flag, SecurityFlag::Secure);
    }

    #[test]
    fn words_are_zero_padded() {
        let payload = Payload::call(PmApiId::ClockSetDivider, SecurityFlag::NonSecure, &[3, 4]);
        assert_eq!(payload.to_words(), [0x0100_0227, 3, 4, 0, 0, 0]);
    }

    #[test]
    fn loader_api_uses_loader_module() {
        let payload = Payload::call(PmApiId::LoadPdi, SecurityFlag::Secure, &[1, 2, 3]);
        assert_eq!(payload.header().module_id, LOADER_MODULE_ID);
        assert_eq!(payload.to_words()[0], 0x0000_0701);
    }

    #[test]
    fn five_args_fill_the_frame() {
        let payload = Payload::call(PmApiId::SelfSuspend, SecurityFlag::NonSecure, &[1, 2, 3, 4, 5]);
        assert_eq!(payload.to_words(), [0x0100_0207, 1, 2, 3, 4, 5]);
    }

    #[test]
    #[should_panic]
    fn six_args_panic() {
        Payload::call(PmApiId::SelfSuspend, SecurityFlag::NonSecure, &[1, 2, 3, 4, 5, 6]);
    }
}
