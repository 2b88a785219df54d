// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Registration of the SGI through which the OS is told about controller callbacks.

use thiserror::Error;

/// Error registering an SGI.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub enum SgiError {
    /// Another SGI is already registered.
    #[error("an SGI is already registered")]
    Busy,
    /// The SGI number is out of range.
    #[error("invalid SGI {0}")]
    InvalidSgi(u32),
}

/// The SGI registered by the OS, if any.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum SgiRegistration {
    /// Callbacks are dropped.
    #[default]
    Unregistered,
    /// Callbacks raise this SGI.
    Registered(u32),
}

impl SgiRegistration {
    /// Registers `sgi`, which must be below `max_targets`, or clears the registration if `reset`
    /// is set.
    pub fn register(&mut self, sgi: u32, reset: bool, max_targets: u32) -> Result<(), SgiError> {
        if reset {
            *self = Self::Unregistered;
            return Ok(());
        }
        if let Self::Registered(_) = self {
            return Err(SgiError::Busy);
        }
        if sgi >= max_targets {
            return Err(SgiError::InvalidSgi(sgi));
        }
        *self = Self::Registered(sgi);
        Ok(())
    }

    /// Returns the registered SGI.
    pub fn sgi(self) -> Option<u32> {
        match self {
            Self::Unregistered => None,
            Self::Registered(sgi) => Some(sgi),
        }
    }
}
