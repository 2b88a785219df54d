// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Identifiers and status codes of the EEMI protocol spoken with the platform management
//! controller.

use crate::services::World;
use num_enum::TryFromPrimitive;
use thiserror::Error;

/// Number of words in a request frame.
pub const PAYLOAD_ARG_CNT: usize = 6;

/// Maximum number of reply words which can follow the status word.
pub const MAX_REPLY_WORDS: usize = 8;

/// Number of words in an asynchronous callback payload.
pub const CALLBACK_WORDS: usize = 4;

/// Bits of an API ID holding the module which implements it.
pub const MODULE_ID_MASK: u32 = 0xff00;

/// The base power management module.
pub const LIBPM_MODULE_ID: u8 = 2;

/// The image loader module.
pub const LOADER_MODULE_ID: u8 = 7;

/// Base version of every LibPM API.
pub const PM_API_BASE_VERSION: u32 = 1;

/// Version of the APIs which changed with the query data format.
pub const PM_API_QUERY_DATA_VERSION: u32 = 2;

/// Version of the trusted firmware interface reported by `GET_TRUSTZONE_VERSION`: 1.0.
pub const VERSAL_TZ_VERSION: u32 = 1 << 16;

/// Acknowledge value requesting a blocking call.
pub const IPI_BLOCKING: u32 = 1;

/// PLL parameter selecting the fractional data.
pub const PM_PLL_PARAM_DATA: u32 = 2;

/// Notifier event asking a subsystem's cores to power down.
pub const EVENT_CPU_IDLE_FORCE_PWRDWN_SUBSYS: u32 = 4;

/// Node ID of APU core 0.
pub const XPM_DEVID_ACPU_0: u32 = 0x1810_C003;

/// Node ID of APU core 1.
pub const XPM_DEVID_ACPU_1: u32 = 0x1810_C004;

/// Extracts the module ID from an API ID.
pub fn module_of(api_id: u32) -> u8 {
    ((api_id & MODULE_ID_MASK) >> 8) as u8
}

/// PM API identifiers, which are also the function numbers of the SiP SMCs.
#[derive(Clone, Copy, Debug, Eq, PartialEq, TryFromPrimitive)]
#[repr(u32)]
pub enum PmApiId {
    /// Returns the firmware API version.
    GetApiVersion = 1,
    /// Returns the status of a device.
    GetDeviceStatus = 3,
    /// Returns an operating characteristic of a device.
    GetOpCharacteristic = 4,
    /// Registers for an event notification.
    RegisterNotifier = 5,
    /// Requests another subsystem to suspend.
    ReqSuspend = 6,
    /// Suspends the calling core.
    SelfSuspend = 7,
    /// Forces another subsystem to power down.
    ForcePowerdown = 8,
    /// Aborts a suspend of the calling subsystem.
    AbortSuspend = 9,
    /// Wakes up a core or subsystem.
    ReqWakeup = 10,
    /// Configures a wakeup source.
    SetWakeupSource = 11,
    /// Shuts down or resets.
    SystemShutdown = 12,
    /// Requests a device.
    RequestDevice = 13,
    /// Releases a device.
    ReleaseDevice = 14,
    /// Changes the requirements of a requested device.
    SetRequirement = 15,
    /// Sets the maximum wakeup latency of a device.
    SetMaxLatency = 16,
    /// Asserts or releases a reset line.
    ResetAssert = 17,
    /// Returns the state of a reset line.
    ResetGetStatus = 18,
    /// Tells the controller the subsystem has finished initialising.
    InitFinalize = 21,
    /// Returns the chip ID.
    GetChipId = 24,
    /// Requests a pin.
    PinctrlRequest = 28,
    /// Releases a pin.
    PinctrlRelease = 29,
    /// Returns the function of a pin.
    PinctrlGetFunction = 30,
    /// Sets the function of a pin.
    PinctrlSetFunction = 31,
    /// Returns a configuration parameter of a pin.
    PinctrlConfigParamGet = 32,
    /// Sets a configuration parameter of a pin.
    PinctrlConfigParamSet = 33,
    /// Device specific control.
    Ioctl = 34,
    /// Queries firmware data such as clock names.
    QueryData = 35,
    /// Enables a clock.
    ClockEnable = 36,
    /// Disables a clock.
    ClockDisable = 37,
    /// Returns whether a clock is enabled.
    ClockGetState = 38,
    /// Sets a clock divider.
    ClockSetDivider = 39,
    /// Returns a clock divider.
    ClockGetDivider = 40,
    /// Returns the rate of a clock.
    ClockGetRate = 42,
    /// Sets the parent of a clock.
    ClockSetParent = 43,
    /// Returns the parent of a clock.
    ClockGetParent = 44,
    /// Sets a PLL parameter.
    PllSetParameter = 48,
    /// Returns a PLL parameter.
    PllGetParameter = 49,
    /// Sets the mode of a PLL.
    PllSetMode = 50,
    /// Returns the mode of a PLL.
    PllGetMode = 51,
    /// Returns the version of an API, if the firmware supports it.
    FeatureCheck = 63,
    /// Loads a PDI image. Implemented by the loader module.
    LoadPdi = 0x701,
    /// Returns the pending callback payload. Handled locally.
    GetCallbackData = 0xa01,
    /// Returns the version of this service. Handled locally.
    GetTrustzoneVersion = 0xa03,
}

impl PmApiId {
    /// Returns the module implementing this API, defaulting to LibPM.
    pub fn module(self) -> u8 {
        match module_of(self as u32) {
            0 => LIBPM_MODULE_ID,
            module => module,
        }
    }
}

/// IDs of the IOCTL calls handled by this service.
#[derive(Clone, Copy, Debug, Eq, PartialEq, TryFromPrimitive)]
#[repr(u32)]
pub enum IoctlId {
    /// Sets the fractional mode of a PLL.
    SetPllFracMode = 8,
    /// Returns the fractional mode of a PLL.
    GetPllFracMode = 9,
    /// Sets the fractional data of a PLL.
    SetPllFracData = 10,
    /// Returns the fractional data of a PLL.
    GetPllFracData = 11,
    /// Registers the SGI used to notify the OS of callbacks.
    SetSgi = 25,
}

/// Query data IDs which need special handling.
#[derive(Clone, Copy, Debug, Eq, PartialEq, TryFromPrimitive)]
#[repr(u32)]
pub enum QueryId {
    /// Returns the name of a clock.
    ClockGetName = 1,
    /// Returns the name of a pin function.
    PinctrlGetFunctionName = 9,
}

/// Type argument of `SYSTEM_SHUTDOWN`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, TryFromPrimitive)]
#[repr(u32)]
pub enum ShutdownType {
    /// Shuts down.
    Shutdown = 0,
    /// Resets.
    Reset = 1,
    /// Only records the scope for later PSCI shutdown or reset calls.
    SetScopeOnly = 2,
}

/// Scope of a shutdown or reset.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, TryFromPrimitive)]
#[repr(u32)]
pub enum ShutdownSubtype {
    /// The calling subsystem only.
    Subsystem = 0,
    /// The processing system only.
    PsOnly = 1,
    /// The whole system.
    #[default]
    System = 2,
}

/// Type of an asynchronous callback, in word 0 of its payload.
#[derive(Clone, Copy, Debug, Eq, PartialEq, TryFromPrimitive)]
#[repr(u32)]
pub enum CallbackType {
    /// The controller asks the OS to initiate a suspend.
    InitSuspend = 30,
    /// A registered notifier event happened.
    Notify = 32,
}

/// Security flag carried in bit 24 of a request header.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum SecurityFlag {
    /// Request from the secure world.
    Secure = 0,
    /// Request from the normal world.
    NonSecure = 1,
}

impl From<World> for SecurityFlag {
    fn from(world: World) -> Self {
        match world {
            World::Secure => Self::Secure,
            World::NonSecure => Self::NonSecure,
        }
    }
}

/// An error status returned by the platform management controller, or detected locally.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub enum PmError {
    /// Invalid arguments.
    #[error("invalid arguments")]
    Args,
    /// The call isn't supported.
    #[error("not supported")]
    NotSupported,
    /// The request failed its CRC check.
    #[error("invalid CRC")]
    InvalidCrc,
    /// Internal error, e.g. no processor descriptor for the calling core.
    #[error("internal error")]
    Internal,
    /// Conflicting requirements.
    #[error("conflict")]
    Conflict,
    /// Access denied.
    #[error("access denied")]
    Access,
    /// The node doesn't exist.
    #[error("invalid node")]
    InvalidNode,
    /// The request was already made.
    #[error("double request")]
    DoubleRequest,
    /// The suspend was aborted.
    #[error("suspend aborted")]
    AbortSuspend,
    /// The controller didn't acknowledge in time.
    #[error("timeout")]
    Timeout,
    /// The node is in use.
    #[error("node in use")]
    NodeUsed,
    /// The feature isn't available.
    #[error("no feature")]
    NoFeature,
    /// Any other status, passed through unchanged.
    #[error("error status {0}")]
    Other(u32),
}

impl PmError {
    /// Returns the numeric status code.
    pub fn code(self) -> u32 {
        match self {
            Self::Args => 1,
            Self::NotSupported => 4,
            Self::InvalidCrc => 301,
            Self::Internal => 2000,
            Self::Conflict => 2001,
            Self::Access => 2002,
            Self::InvalidNode => 2003,
            Self::DoubleRequest => 2004,
            Self::AbortSuspend => 2005,
            Self::Timeout => 2006,
            Self::NodeUsed => 2007,
            Self::NoFeature => 2008,
            Self::Other(code) => code,
        }
    }

    /// Converts a status word into a result, 0 being success.
    pub fn from_status(status: u32) -> Result<(), Self> {
        Err(match status {
            0 => return Ok(()),
            1 => Self::Args,
            4 => Self::NotSupported,
            301 => Self::InvalidCrc,
            2000 => Self::Internal,
            2001 => Self::Conflict,
            2002 => Self::Access,
            2003 => Self::InvalidNode,
            2004 => Self::DoubleRequest,
            2005 => Self::AbortSuspend,
            2006 => Self::Timeout,
            2007 => Self::NodeUsed,
            2008 => Self::NoFeature,
            other => Self::Other(other),
        })
    }
}
