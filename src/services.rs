// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! SMC services and the routing of SMC calls and EL3 interrupts to them.

pub mod pm;

use crate::smccc::{FunctionId, NOT_SUPPORTED, SmcReturn};
use arm_gic::IntId;
use log::warn;
use pm::{Pm, PmPlatformInterface};

/// Helper macro to define the range of SMC function ID values covered by a service
macro_rules! owns {
    // service handles the entire Owning Entity Number (OEN)
    ($owning_entity:expr) => {
        #[inline(always)]
        fn owns(&self, function: $crate::smccc::FunctionId) -> bool {
            function.oen() == $owning_entity
                && matches!(
                    function.call_type(),
                    $crate::smccc::SmcccCallType::Fast32 | $crate::smccc::SmcccCallType::Fast64
                )
        }
    };
    // service handles a sub-range of the OEN
    // range refers to the lower 16 bits [15:0] of the SMC FunctionId
    ($owning_entity:expr, $range:expr) => {
        #[inline(always)]
        fn owns(&self, function: $crate::smccc::FunctionId) -> bool {
            function.oen() == $owning_entity
                && $range.contains(&function.number())
                && matches!(
                    function.call_type(),
                    $crate::smccc::SmcccCallType::Fast32 | $crate::smccc::SmcccCallType::Fast64
                )
        }
    };
}
pub(crate) use owns;

/// The security state an SMC was issued from.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum World {
    /// Secure world, i.e. S-EL1 or S-EL2.
    Secure,
    /// Normal world, i.e. EL1 or EL2.
    NonSecure,
}

/// A service which handles some range of SMC calls.
///
/// According to SMCCC v1.3+ the implementation must disregard the SVE hint bit in the function ID
/// and consider it to be 0 for the purpose of function identification.
pub trait Service {
    /// Returns whether this service is intended to handle the given function ID.
    fn owns(&self, function: FunctionId) -> bool;

    /// Handles the given SMC call from Normal World.
    fn handle_non_secure_smc(&self, _regs: &[u64; 18]) -> SmcReturn {
        NOT_SUPPORTED.into()
    }

    /// Handles the given SMC call from Secure World.
    fn handle_secure_smc(&self, _regs: &[u64; 18]) -> SmcReturn {
        NOT_SUPPORTED.into()
    }
}

/// Contains an instance of all of the currently implemented services.
pub struct Services<P: PmPlatformInterface> {
    /// The Versal power management service.
    pub pm: Pm<P>,
}

impl<P: PmPlatformInterface> Services<P> {
    /// Creates the services for the given platform. They must be set up with [`Pm::setup`] before
    /// they accept calls.
    pub fn new(platform: P) -> Self {
        Self {
            pm: Pm::new(platform),
        }
    }

    /// Handles an SMC trapped from the given world, with the caller's saved x0-x17.
    pub fn handle_smc(&self, regs: &[u64; 18], world: World) -> SmcReturn {
        let mut function = FunctionId(regs[0] as u32);
        function.clear_sve_hint();

        if !function.valid() {
            return NOT_SUPPORTED.into();
        }

        let service: &dyn Service = if self.pm.owns(function) {
            &self.pm
        } else {
            warn!("Unowned SMC call: {function:?}");
            return NOT_SUPPORTED.into();
        };

        match world {
            World::NonSecure => service.handle_non_secure_smc(regs),
            World::Secure => service.handle_secure_smc(regs),
        }
    }

    /// Handles a Group 0 interrupt taken to EL3.
    ///
    /// The interrupt has not been acknowledged yet. Handlers acknowledge it and signal the end of
    /// interrupt themselves, except for the CPU idle SGI which never returns.
    pub fn handle_group0_interrupt(&self, int_id: IntId) {
        if int_id == P::IPI_IRQ {
            self.pm.handle_ipi_interrupt(int_id);
        } else if int_id == P::CPU_IDLE_SGI {
            self.pm.handle_cpu_idle_sgi(int_id);
        } else {
            warn!("Unexpected group 0 interrupt {int_id:?}");
        }
    }
}
