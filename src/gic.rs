// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! The interrupt controller operations needed by the power management service.

use arm_gic::IntId;

/// Interrupt controller driver as seen from EL3.
///
/// Implementations are expected to act on the GIC CPU interface of the calling core unless a core
/// is named explicitly.
pub trait InterruptController {
    /// Acknowledges the highest priority pending Group 0 interrupt, returning its ID if there was
    /// one.
    fn acknowledge(&self) -> Option<IntId>;

    /// Signals the end of handling of the given interrupt.
    fn end_of_interrupt(&self, int_id: IntId);

    /// Clears the pending state of the given interrupt.
    fn clear_pending(&self, int_id: IntId);

    /// Configures the given interrupt as Group 0 so that it is taken to EL3, routes it to any
    /// participating core and enables it.
    fn route_to_el3(&self, int_id: IntId);

    /// Raises the given Group 0 SGI on the core with the given linear index.
    fn raise_el3_sgi(&self, sgi: IntId, core_index: usize);

    /// Raises the given non-secure Group 1 SGI on the cores in `target_list` of affinity 0.
    fn raise_ns_sgi(&self, sgi: IntId, target_list: u16);

    /// Disables the GIC CPU interface of the calling core so that nothing can wake it again.
    fn disable_cpu_interface(&self);
}

