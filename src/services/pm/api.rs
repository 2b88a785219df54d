// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! The EEMI calls made on behalf of callers of the power management service.
//!
//! Unless noted otherwise each call is sent on the primary processor's IPI channel and waits for
//! the controller's response.

use super::{
    Pm, PmPlatformInterface,
    client::PmProc,
    defs::{
        IPI_BLOCKING, IoctlId, LIBPM_MODULE_ID, MAX_REPLY_WORDS, PAYLOAD_ARG_CNT,
        PM_PLL_PARAM_DATA, PmApiId, PmError, SecurityFlag, ShutdownType, module_of,
    },
    ipi::IpiTransport,
    payload::{Payload, PayloadHeader},
    version::{QueryDataFormat, local_version, strip_status_word},
};
use log::{debug, warn};
use percore::Cores;

/// The reply to [`Pm::query_data`].
///
/// The controller may fill in data along with an error status, so the data is kept either way.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct QueryReply {
    /// Whether the query succeeded.
    pub status: Result<(), PmError>,
    /// The first three data words.
    pub data: [u32; 3],
}

impl QueryReply {
    fn failed(error: PmError) -> Self {
        Self {
            status: Err(error),
            data: [0; 3],
        }
    }
}

impl<P: PmPlatformInterface> Pm<P> {
    fn send_sync(&self, proc: &PmProc, payload: &Payload, values: &mut [u32]) -> Result<(), PmError> {
        self.ipi
            .send_sync(self.platform.ipi(), &proc.ipi, payload, values)
    }

    /// Sends the payload and waits for the response if `ack` asks for a blocking call, otherwise
    /// only waits for the controller to pick it up.
    fn send_acked(&self, payload: &Payload, ack: u32) -> Result<(), PmError> {
        let primary = self.primary_proc();
        if ack == IPI_BLOCKING {
            self.send_sync(primary, payload, &mut [])
        } else {
            self.ipi.send(self.platform.ipi(), &primary.ipi, payload)
        }
    }

    fn call_values<const N: usize>(
        &self,
        api: PmApiId,
        flag: SecurityFlag,
        args: &[u32],
    ) -> Result<[u32; N], PmError> {
        let mut values = [0; N];
        self.send_sync(
            self.primary_proc(),
            &Payload::call(api, flag, args),
            &mut values,
        )?;
        Ok(values)
    }

    fn call(&self, api: PmApiId, flag: SecurityFlag, args: &[u32]) -> Result<(), PmError> {
        self.call_values::<0>(api, flag, args)?;
        Ok(())
    }

    fn call_value(&self, api: PmApiId, flag: SecurityFlag, args: &[u32]) -> Result<u32, PmError> {
        let [value] = self.call_values::<1>(api, flag, args)?;
        Ok(value)
    }

    /// Passes a raw EEMI request through to the controller, returning its reply words.
    ///
    /// Word 0 holds the API ID in bits 0 to 7 and the module ID in bits 8 to 15. The security
    /// flag is replaced by `flag`.
    pub fn handle_eemi_call(
        &self,
        flag: SecurityFlag,
        words: [u32; PAYLOAD_ARG_CNT],
    ) -> Result<[u32; MAX_REPLY_WORDS], PmError> {
        let header = PayloadHeader::new(words[0] as u8, module_of(words[0]), flag);
        let payload = words[1..]
            .iter()
            .fold(Payload::new(header), |payload, &word| payload.arg(word));
        let mut values = [0; MAX_REPLY_WORDS];
        self.send_sync(self.primary_proc(), &payload, &mut values)?;
        Ok(values)
    }

    /// Suspends the calling core, to resume at `address`.
    ///
    /// The request is made for the node of the calling core, on its own IPI channel.
    pub fn self_suspend(
        &self,
        latency: u32,
        state: u32,
        address: u64,
        flag: SecurityFlag,
    ) -> Result<(), PmError> {
        let core = P::Cores::core_index();
        let Some(proc) = self.proc_for_core(core) else {
            warn!("Failed to get proc {core}");
            return Err(PmError::Internal);
        };

        self.platform.client_suspend(proc, state);

        let payload = Payload::call(
            PmApiId::SelfSuspend,
            flag,
            &[
                proc.node_id,
                latency,
                state,
                address as u32,
                (address >> 32) as u32,
            ],
        );
        self.send_sync(proc, &payload, &mut [])
    }

    /// Aborts a suspend previously requested by the calling core.
    pub fn abort_suspend(&self, reason: u32, flag: SecurityFlag) -> Result<(), PmError> {
        self.platform.client_abort_suspend();
        self.call(
            PmApiId::AbortSuspend,
            flag,
            &[reason, self.primary_proc().node_id],
        )
    }

    /// Requests another subsystem to suspend.
    pub fn req_suspend(
        &self,
        target: u32,
        ack: u32,
        latency: u32,
        state: u32,
        flag: SecurityFlag,
    ) -> Result<(), PmError> {
        let payload = Payload::call(PmApiId::ReqSuspend, flag, &[target, ack, latency, state]);
        self.send_acked(&payload, ack)
    }

    /// Wakes up a core or subsystem, optionally at `address`.
    pub fn req_wakeup(
        &self,
        target: u32,
        set_address: u32,
        address: u64,
        ack: u32,
        flag: SecurityFlag,
    ) -> Result<(), PmError> {
        self.call(
            PmApiId::ReqWakeup,
            flag,
            &[target, set_address, address as u32, ack],
        )
    }

    /// Forces another subsystem to power down.
    pub fn force_powerdown(&self, target: u32, ack: u32, flag: SecurityFlag) -> Result<(), PmError> {
        let payload = Payload::call(PmApiId::ForcePowerdown, flag, &[target, ack]);
        self.send_acked(&payload, ack)
    }

    /// Shuts down or resets, or only records the scope for later shutdowns.
    ///
    /// Shutdown and reset requests don't wait for the controller, which may take the calling core
    /// down before replying.
    pub fn system_shutdown(
        &self,
        shutdown_type: u32,
        subtype: u32,
        flag: SecurityFlag,
    ) -> Result<(), PmError> {
        if matches!(
            ShutdownType::try_from(shutdown_type),
            Ok(ShutdownType::SetScopeOnly)
        ) {
            debug!("Shutdown scope set to {subtype:#x}");
            self.set_shutdown_scope(subtype);
            return Ok(());
        }

        let payload = Payload::call(PmApiId::SystemShutdown, flag, &[shutdown_type, subtype]);
        self.ipi
            .send_non_blocking(self.platform.ipi(), &self.primary_proc().ipi, &payload)
    }

    /// Shuts the system down within the current shutdown scope, for PSCI `SYSTEM_OFF`.
    pub fn system_off(&self) -> Result<(), PmError> {
        self.system_shutdown(
            ShutdownType::Shutdown as u32,
            self.shutdown_scope(),
            SecurityFlag::Secure,
        )
    }

    /// Resets the system within the current shutdown scope, for PSCI `SYSTEM_RESET`.
    pub fn system_reset(&self) -> Result<(), PmError> {
        self.system_shutdown(
            ShutdownType::Reset as u32,
            self.shutdown_scope(),
            SecurityFlag::Secure,
        )
    }

    /// Enables or disables a device as a wakeup source for `target`.
    pub fn set_wakeup_source(
        &self,
        target: u32,
        wakeup_device: u32,
        enable: u32,
        flag: SecurityFlag,
    ) -> Result<(), PmError> {
        self.call(
            PmApiId::SetWakeupSource,
            flag,
            &[target, wakeup_device, enable],
        )
    }

    /// Requests a device with the given capabilities and quality of service.
    pub fn request_device(
        &self,
        device_id: u32,
        capabilities: u32,
        qos: u32,
        ack: u32,
        flag: SecurityFlag,
    ) -> Result<(), PmError> {
        self.call(
            PmApiId::RequestDevice,
            flag,
            &[device_id, capabilities, qos, ack],
        )
    }

    /// Releases a device.
    pub fn release_device(&self, device_id: u32, flag: SecurityFlag) -> Result<(), PmError> {
        self.call(PmApiId::ReleaseDevice, flag, &[device_id])
    }

    /// Changes the requirements of a requested device.
    pub fn set_requirement(
        &self,
        device_id: u32,
        capabilities: u32,
        latency: u32,
        qos: u32,
        flag: SecurityFlag,
    ) -> Result<(), PmError> {
        self.call(
            PmApiId::SetRequirement,
            flag,
            &[device_id, capabilities, latency, qos],
        )
    }

    /// Sets the maximum wakeup latency of a device.
    pub fn set_max_latency(
        &self,
        device_id: u32,
        latency: u32,
        flag: SecurityFlag,
    ) -> Result<(), PmError> {
        self.call(PmApiId::SetMaxLatency, flag, &[device_id, latency])
    }

    /// Returns the status, requirements and usage of a device.
    pub fn get_device_status(&self, device_id: u32, flag: SecurityFlag) -> Result<[u32; 3], PmError> {
        self.call_values(PmApiId::GetDeviceStatus, flag, &[device_id])
    }

    /// Returns an operating characteristic of a device.
    pub fn get_op_characteristic(
        &self,
        device_id: u32,
        kind: u32,
        flag: SecurityFlag,
    ) -> Result<u32, PmError> {
        self.call_value(PmApiId::GetOpCharacteristic, flag, &[device_id, kind])
    }

    /// Returns the firmware API version.
    ///
    /// The controller's status is ignored, so this only fails if the request times out.
    pub fn get_api_version(&self, flag: SecurityFlag) -> Result<u32, PmError> {
        let mut version = [0];
        let status = self.ipi.send_sync_status(
            self.platform.ipi(),
            &self.primary_proc().ipi,
            &Payload::call(PmApiId::GetApiVersion, flag, &[]),
            &mut version,
        )?;
        if status != 0 {
            debug!("GET_API_VERSION status {status} ignored");
        }
        Ok(version[0])
    }

    /// Tells the controller the calling subsystem has finished initialising.
    pub fn init_finalize(&self, flag: SecurityFlag) -> Result<(), PmError> {
        self.call(PmApiId::InitFinalize, flag, &[])
    }

    /// Returns the version of this service's interface. Answered locally.
    pub fn get_trustzone_version(&self) -> u32 {
        P::TZ_VERSION
    }

    /// Returns the chip ID and version.
    pub fn get_chipid(&self, flag: SecurityFlag) -> Result<[u32; 2], PmError> {
        self.call_values(PmApiId::GetChipId, flag, &[])
    }

    /// Asserts, releases or pulses a reset line.
    pub fn reset_assert(&self, reset: u32, action: u32, flag: SecurityFlag) -> Result<(), PmError> {
        self.call(PmApiId::ResetAssert, flag, &[reset, action])
    }

    /// Returns the state of a reset line.
    pub fn reset_get_status(&self, reset: u32, flag: SecurityFlag) -> Result<u32, PmError> {
        self.call_value(PmApiId::ResetGetStatus, flag, &[reset])
    }

    /// Requests a pin.
    pub fn pinctrl_request(&self, pin: u32, flag: SecurityFlag) -> Result<(), PmError> {
        self.call(PmApiId::PinctrlRequest, flag, &[pin])
    }

    /// Releases a pin.
    pub fn pinctrl_release(&self, pin: u32, flag: SecurityFlag) -> Result<(), PmError> {
        self.call(PmApiId::PinctrlRelease, flag, &[pin])
    }

    /// Returns the function of a pin.
    pub fn pinctrl_get_function(&self, pin: u32, flag: SecurityFlag) -> Result<u32, PmError> {
        self.call_value(PmApiId::PinctrlGetFunction, flag, &[pin])
    }

    /// Sets the function of a pin.
    pub fn pinctrl_set_function(
        &self,
        pin: u32,
        function: u32,
        flag: SecurityFlag,
    ) -> Result<(), PmError> {
        self.call(PmApiId::PinctrlSetFunction, flag, &[pin, function])
    }

    /// Returns a configuration parameter of a pin.
    pub fn pinctrl_get_pin_param(
        &self,
        pin: u32,
        param: u32,
        flag: SecurityFlag,
    ) -> Result<u32, PmError> {
        self.call_value(PmApiId::PinctrlConfigParamGet, flag, &[pin, param])
    }

    /// Sets a configuration parameter of a pin.
    pub fn pinctrl_set_pin_param(
        &self,
        pin: u32,
        param: u32,
        value: u32,
        flag: SecurityFlag,
    ) -> Result<(), PmError> {
        self.call(PmApiId::PinctrlConfigParamSet, flag, &[pin, param, value])
    }

    /// Enables a clock.
    pub fn clock_enable(&self, clock_id: u32, flag: SecurityFlag) -> Result<(), PmError> {
        self.call(PmApiId::ClockEnable, flag, &[clock_id])
    }

    /// Disables a clock.
    pub fn clock_disable(&self, clock_id: u32, flag: SecurityFlag) -> Result<(), PmError> {
        self.call(PmApiId::ClockDisable, flag, &[clock_id])
    }

    /// Returns whether a clock is enabled.
    pub fn clock_get_state(&self, clock_id: u32, flag: SecurityFlag) -> Result<u32, PmError> {
        self.call_value(PmApiId::ClockGetState, flag, &[clock_id])
    }

    /// Sets the divider of a clock.
    pub fn clock_set_divider(
        &self,
        clock_id: u32,
        divider: u32,
        flag: SecurityFlag,
    ) -> Result<(), PmError> {
        self.call(PmApiId::ClockSetDivider, flag, &[clock_id, divider])
    }

    /// Returns the divider of a clock.
    pub fn clock_get_divider(&self, clock_id: u32, flag: SecurityFlag) -> Result<u32, PmError> {
        self.call_value(PmApiId::ClockGetDivider, flag, &[clock_id])
    }

    /// Sets the parent of a clock.
    pub fn clock_set_parent(
        &self,
        clock_id: u32,
        parent: u32,
        flag: SecurityFlag,
    ) -> Result<(), PmError> {
        self.call(PmApiId::ClockSetParent, flag, &[clock_id, parent])
    }

    /// Returns the parent of a clock.
    pub fn clock_get_parent(&self, clock_id: u32, flag: SecurityFlag) -> Result<u32, PmError> {
        self.call_value(PmApiId::ClockGetParent, flag, &[clock_id])
    }

    /// Returns the rate of a clock, as its low and high words.
    pub fn clock_get_rate(&self, clock_id: u32, flag: SecurityFlag) -> Result<[u32; 2], PmError> {
        self.call_values(PmApiId::ClockGetRate, flag, &[clock_id])
    }

    /// Sets a PLL parameter.
    pub fn pll_set_param(
        &self,
        clock_id: u32,
        param: u32,
        value: u32,
        flag: SecurityFlag,
    ) -> Result<(), PmError> {
        self.call(PmApiId::PllSetParameter, flag, &[clock_id, param, value])
    }

    /// Returns a PLL parameter.
    pub fn pll_get_param(&self, clock_id: u32, param: u32, flag: SecurityFlag) -> Result<u32, PmError> {
        self.call_value(PmApiId::PllGetParameter, flag, &[clock_id, param])
    }

    /// Sets the mode of a PLL.
    pub fn pll_set_mode(&self, clock_id: u32, mode: u32, flag: SecurityFlag) -> Result<(), PmError> {
        self.call(PmApiId::PllSetMode, flag, &[clock_id, mode])
    }

    /// Returns the mode of a PLL.
    pub fn pll_get_mode(&self, clock_id: u32, flag: SecurityFlag) -> Result<u32, PmError> {
        self.call_value(PmApiId::PllGetMode, flag, &[clock_id])
    }

    /// Handles the IOCTLs implemented in terms of other calls, or locally.
    pub fn ioctl(
        &self,
        _device_id: u32,
        ioctl_id: u32,
        arg1: u32,
        arg2: u32,
        flag: SecurityFlag,
    ) -> Result<u32, PmError> {
        match IoctlId::try_from(ioctl_id) {
            Ok(IoctlId::SetPllFracMode) => self.pll_set_mode(arg1, arg2, flag).map(|()| 0),
            Ok(IoctlId::GetPllFracMode) => self.pll_get_mode(arg1, flag),
            Ok(IoctlId::SetPllFracData) => self
                .pll_set_param(arg1, PM_PLL_PARAM_DATA, arg2, flag)
                .map(|()| 0),
            Ok(IoctlId::GetPllFracData) => self.pll_get_param(arg1, PM_PLL_PARAM_DATA, flag),
            Ok(IoctlId::SetSgi) => {
                self.register_sgi(arg1, arg2 == 1).map_err(|e| {
                    warn!("SGI registration failed: {e}");
                    PmError::Args
                })?;
                Ok(0)
            }
            Err(_) => Err(PmError::NotSupported),
        }
    }

    /// Queries firmware data, adapting to the reply format of the firmware's version of the call.
    pub fn query_data(
        &self,
        qid: u32,
        arg1: u32,
        arg2: u32,
        arg3: u32,
        flag: SecurityFlag,
    ) -> QueryReply {
        let version = match self.feature_check(PmApiId::QueryData as u32, flag) {
            Ok(version) => version,
            Err(e) => return QueryReply::failed(e),
        };
        let payload = Payload::call(PmApiId::QueryData, flag, &[qid, arg1, arg2, arg3]);
        let channel = &self.primary_proc().ipi;

        let format = QueryDataFormat::classify(version, qid);
        let mut data = [0; MAX_REPLY_WORDS];
        let reply = &mut data[..format.reply_words()];
        let status = match format {
            QueryDataFormat::Retired => return QueryReply::failed(PmError::NotSupported),
            QueryDataFormat::StatusPrefixed => self
                .ipi
                .send_sync_status(self.platform.ipi(), channel, &payload, reply)
                .map(|_| strip_status_word(reply)),
            QueryDataFormat::Plain => {
                self.ipi
                    .send_sync_status(self.platform.ipi(), channel, &payload, reply)
            }
        };
        QueryReply {
            status: status.and_then(PmError::from_status),
            data: [data[0], data[1], data[2]],
        }
    }

    /// Returns the version of the given API, combining this service's version of it in the upper
    /// half with the firmware's.
    ///
    /// APIs of modules other than LibPM aren't checked and give 0.
    pub fn feature_check(&self, api_id: u32, flag: SecurityFlag) -> Result<u32, PmError> {
        match module_of(api_id) {
            0 | LIBPM_MODULE_ID => {}
            _ => return Ok(0),
        }
        let firmware = self.call_value(PmApiId::FeatureCheck, flag, &[api_id])?;
        Ok(local_version(api_id) | firmware)
    }

    /// Loads a PDI image from the given boot device and address.
    pub fn load_pdi(
        &self,
        source: u32,
        address_low: u32,
        address_high: u32,
        flag: SecurityFlag,
    ) -> Result<(), PmError> {
        self.call(PmApiId::LoadPdi, flag, &[source, address_high, address_low])
    }

    /// Registers for or unregisters from an event notification.
    pub fn register_notifier(
        &self,
        device_id: u32,
        event: u32,
        wake: u32,
        enable: u32,
        flag: SecurityFlag,
    ) -> Result<(), PmError> {
        self.call(
            PmApiId::RegisterNotifier,
            flag,
            &[device_id, event, wake, enable],
        )
    }

    /// Reads the pending callback payload, clearing the IPI interrupt if `ack` is set.
    ///
    /// Gives zeros if no callback is pending.
    pub fn get_callback_data(&self, ack: bool) -> [u32; 4] {
        let ipi = self.platform.ipi();
        let channel = &self.primary_proc().ipi;
        let mut data = [0; 4];
        if !ipi.irq_status(channel) {
            return data;
        }
        ipi.read_callback(channel, &mut data);
        if ack {
            ipi.irq_clear(channel);
        }
        data
    }
}
