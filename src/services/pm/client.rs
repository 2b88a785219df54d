// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Processors which make power management requests.

use super::ipi::IpiChannel;
use bitflags::bitflags;

bitflags! {
    /// Power down request bits of the APU power control register.
    #[derive(Debug, Eq, PartialEq, Clone, Copy)]
    #[repr(transparent)]
    pub struct ApuPowerControl: u32 {
        /// Requests core 0 to be powered down when it enters WFI.
        const CPU0_PWRDWN_REQ = 1 << 0;
        /// Requests core 1 to be powered down when it enters WFI.
        const CPU1_PWRDWN_REQ = 1 << 1;
    }
}

/// A processor as known to the platform management controller.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PmProc {
    /// Node ID of the processor.
    pub node_id: u32,
    /// Linear index of the core.
    pub core: usize,
    /// Bit to set in the APU power control register to power the core down.
    pub pwrdn_mask: ApuPowerControl,
    /// The IPI channel through which the processor reaches the controller.
    pub ipi: IpiChannel,
}
