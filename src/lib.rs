// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! RF-A Versal power management: the EL3 service which bridges SiP SMC calls from EL1/EL2 to the
//! platform management controller over the IPI mailbox, and forwards the controller's
//! asynchronous callbacks back to the OS.

#![cfg_attr(not(test), no_std)]

pub mod gic;
pub mod logger;
#[cfg(test)]
mod platform;
pub mod services;
pub mod smccc;

pub use services::{
    Service, Services, World,
    pm::{Pm, PmPlatformInterface},
};
