// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Versal power management service.
//!
//! SiP SMCs from EL1/EL2 are turned into EEMI requests to the platform management controller,
//! sent over the IPI mailbox. Callbacks from the controller arrive on the IPI interrupt and are
//! either handled here or forwarded to the OS with an SGI.

pub mod api;
pub mod client;
pub mod defs;
pub mod ipi;
pub mod notify;
pub mod payload;
pub mod version;

use crate::{
    gic::InterruptController,
    services::{Service, owns},
    smccc::{FunctionId, NOT_SUPPORTED, OwningEntityNumber, SUCCESS, SmcReturn},
};
use api::QueryReply;
use arm_gic::IntId;
use client::{ApuPowerControl, PmProc};
use core::{
    iter,
    sync::atomic::{AtomicBool, AtomicU32, Ordering},
};
use defs::{
    CallbackType, EVENT_CPU_IDLE_FORCE_PWRDWN_SUBSYS, PmApiId, PmError,
    SecurityFlag, ShutdownSubtype, VERSAL_TZ_VERSION, XPM_DEVID_ACPU_0,
};
use ipi::{IpiError, IpiTransport, PmIpi, WaitPolicy};
use log::{debug, info, trace, warn};
use notify::{SgiError, SgiRegistration};
use percore::Cores;
use spin::mutex::SpinMutex;

const FUNCTION_NUMBER_MIN: u16 = 0x0000;
const FUNCTION_NUMBER_MAX: u16 = 0x0FFF;

/// Platform-specific power management interface.
pub trait PmPlatformInterface {
    /// The number of cores which can be asked to idle.
    const CORE_COUNT: usize;

    /// SGI numbers the OS may register must be below this.
    const MAX_SGI_TARGETS: u32 = 16;

    /// The SGI raised on cores which must power down for a forced subsystem idle.
    const CPU_IDLE_SGI: IntId;

    /// The interrupt raised by the controller's IPI agent.
    const IPI_IRQ: IntId;

    /// How long to wait for the controller to acknowledge a request.
    const IPI_WAIT: WaitPolicy = WaitPolicy::Forever;

    /// The version reported by `GET_TRUSTZONE_VERSION`.
    const TZ_VERSION: u32 = VERSAL_TZ_VERSION;

    /// Gives the linear index of the calling core.
    type Cores: Cores;

    /// The IPI mailbox driver.
    type Ipi: IpiTransport;

    /// The interrupt controller driver.
    type Gic: InterruptController;

    /// Returns the IPI mailbox driver.
    fn ipi(&self) -> &Self::Ipi;

    /// Returns the interrupt controller driver.
    fn gic(&self) -> &Self::Gic;

    /// Returns the processors of the platform. The first one is the primary processor, whose IPI
    /// channel is used for every request not made on behalf of a particular core.
    fn procs(&self) -> &[PmProc];

    /// Performs client-specific suspend operations for the given processor, such as setting its
    /// power down request bit.
    fn client_suspend(&self, _proc: &PmProc, _state: u32) {}

    /// Undoes [`client_suspend`](Self::client_suspend) for the calling processor.
    fn client_abort_suspend(&self) {}

    /// Sets the given bits in the APU power control register.
    fn request_power_down(&self, mask: ApuPowerControl);

    /// Waits for interrupt forever, to be powered down.
    fn power_down_wfi(&self) -> !;
}

/// The power management service.
pub struct Pm<P: PmPlatformInterface> {
    platform: P,
    ipi: PmIpi,
    up: AtomicBool,
    shutdown_scope: AtomicU32,
    sgi: SpinMutex<SgiRegistration>,
}

impl<P: PmPlatformInterface> Pm<P> {
    /// Creates the service. It rejects every SMC until [`setup`](Self::setup) succeeds.
    pub fn new(platform: P) -> Self {
        Self {
            platform,
            ipi: PmIpi::new(P::IPI_WAIT),
            up: AtomicBool::new(false),
            shutdown_scope: AtomicU32::new(ShutdownSubtype::default() as u32),
            sgi: SpinMutex::new(SgiRegistration::Unregistered),
        }
    }

    /// Returns the platform.
    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Returns whether setup has succeeded.
    pub fn is_up(&self) -> bool {
        self.up.load(Ordering::Acquire)
    }

    /// Opens the IPI channel to the controller and sets up the interrupts the service handles.
    ///
    /// If the channel can't be opened the service stays down.
    pub fn setup(&self) -> Result<(), IpiError> {
        let primary = self.primary_proc();
        if let Err(e) = self.platform.ipi().open(&primary.ipi) {
            info!("PM service init failed: {e}");
            return Err(e);
        }
        self.up.store(true, Ordering::Release);

        let gic = self.platform.gic();
        gic.route_to_el3(P::CPU_IDLE_SGI);
        self.platform.ipi().irq_enable(&primary.ipi);
        gic.route_to_el3(P::IPI_IRQ);

        if let Err(e) = self.register_notifier(
            XPM_DEVID_ACPU_0,
            EVENT_CPU_IDLE_FORCE_PWRDWN_SUBSYS,
            0,
            1,
            SecurityFlag::Secure,
        ) {
            warn!("Registering CPU idle notifier failed: {e}");
        }

        info!("PM service initialised");
        Ok(())
    }

    fn primary_proc(&self) -> &PmProc {
        &self.platform.procs()[0]
    }

    fn proc_for_core(&self, core: usize) -> Option<&PmProc> {
        self.platform.procs().iter().find(|proc| proc.core == core)
    }

    /// Returns the scope of the next shutdown or reset, normally a [`ShutdownSubtype`].
    ///
    /// Whatever subtype the last set-scope-only shutdown gave is kept as is, for the controller to
    /// judge.
    pub fn shutdown_scope(&self) -> u32 {
        self.shutdown_scope.load(Ordering::Relaxed)
    }

    fn set_shutdown_scope(&self, scope: u32) {
        self.shutdown_scope.store(scope, Ordering::Relaxed);
    }

    /// Registers the SGI used to notify the OS of callbacks, or clears it if `reset` is set.
    pub fn register_sgi(&self, sgi: u32, reset: bool) -> Result<(), SgiError> {
        self.sgi.lock().register(sgi, reset, P::MAX_SGI_TARGETS)
    }

    /// Raises the registered SGI on the calling core, if there is one.
    fn notify_os(&self) {
        let Some(sgi) = self.sgi.lock().sgi() else {
            return;
        };
        let target_list = (P::Cores::core_index() + 1) as u16;
        debug!("Notifying OS with SGI {sgi}, target list {target_list:#x}");
        self.platform.gic().raise_ns_sgi(IntId::sgi(sgi), target_list);
    }

    /// Raises the CPU idle SGI on every core in `core_mask`.
    fn request_cpu_idle(&self, core_mask: u32) {
        debug!("CPU idle request received for {core_mask:#x}");
        for core in 0..P::CORE_COUNT {
            if core_mask & (1 << core) != 0 {
                trace!("Raise SGI for {core}");
                self.platform.gic().raise_el3_sgi(P::CPU_IDLE_SGI, core);
            }
        }
    }

    /// Handles the IPI interrupt, through which the controller sends callbacks.
    pub fn handle_ipi_interrupt(&self, int_id: IntId) {
        debug!("Received IPI interrupt from firmware");
        let gic = self.platform.gic();
        gic.acknowledge();

        let payload = self.get_callback_data(false);
        match CallbackType::try_from(payload[0]) {
            Ok(CallbackType::InitSuspend) => self.notify_os(),
            Ok(CallbackType::Notify) => {
                if payload[2] == EVENT_CPU_IDLE_FORCE_PWRDWN_SUBSYS {
                    self.request_cpu_idle(payload[1]);
                    self.platform.ipi().irq_clear(&self.primary_proc().ipi);
                } else {
                    self.notify_os();
                }
            }
            Err(_) => {
                self.platform.ipi().irq_clear(&self.primary_proc().ipi);
                warn!("Invalid IPI payload {payload:#x?}");
            }
        }

        gic.end_of_interrupt(int_id);
    }

    /// Handles the CPU idle SGI by powering the calling core down. Never returns.
    pub fn handle_cpu_idle_sgi(&self, int_id: IntId) -> ! {
        let core = P::Cores::core_index();
        debug!("Entering wfi {core}");

        let gic = self.platform.gic();
        gic.clear_pending(int_id);
        gic.disable_cpu_interface();

        match self.proc_for_core(core) {
            Some(proc) => self.platform.request_power_down(proc.pwrdn_mask),
            None => warn!("Failed to get proc {core}"),
        }

        self.platform.power_down_wfi()
    }

    fn handle_smc_common(&self, regs: &[u64; 18], flag: SecurityFlag) -> SmcReturn {
        if !self.is_up() {
            return NOT_SUPPORTED.into();
        }

        let function = FunctionId(regs[0] as u32);
        let arg = [
            regs[1] as u32,
            (regs[1] >> 32) as u32,
            regs[2] as u32,
            (regs[2] >> 32) as u32,
        ];

        let Ok(api) = PmApiId::try_from(u32::from(function.number())) else {
            warn!("Unimplemented PM service call: {function}");
            return NOT_SUPPORTED.into();
        };

        match api {
            PmApiId::SelfSuspend => {
                status(self.self_suspend(arg[1], arg[2], u64::from(arg[3]), flag))
            }
            PmApiId::ForcePowerdown => status(self.force_powerdown(arg[0], arg[1], flag)),
            PmApiId::ReqSuspend => {
                status(self.req_suspend(arg[0], arg[1], arg[2], arg[3], flag))
            }
            PmApiId::AbortSuspend => status(self.abort_suspend(arg[0], flag)),
            PmApiId::SystemShutdown => status(self.system_shutdown(arg[0], arg[1], flag)),
            PmApiId::ReqWakeup => status(self.req_wakeup(
                arg[0],
                arg[1],
                u64::from(arg[2]),
                arg[3],
                flag,
            )),
            PmApiId::SetWakeupSource => {
                status(self.set_wakeup_source(arg[0], arg[1], arg[2], flag))
            }
            PmApiId::RequestDevice => {
                status(self.request_device(arg[0], arg[1], arg[2], arg[3], flag))
            }
            PmApiId::ReleaseDevice => status(self.release_device(arg[0], flag)),
            PmApiId::SetRequirement => {
                status(self.set_requirement(arg[0], arg[1], arg[2], arg[3], flag))
            }
            PmApiId::SetMaxLatency => status(self.set_max_latency(arg[0], arg[1], flag)),
            PmApiId::GetApiVersion => value(self.get_api_version(flag)),
            PmApiId::GetDeviceStatus => reply(self.get_device_status(arg[0], flag)),
            PmApiId::GetOpCharacteristic => {
                value(self.get_op_characteristic(arg[0], arg[1], flag))
            }
            PmApiId::ResetAssert => status(self.reset_assert(arg[0], arg[1], flag)),
            PmApiId::ResetGetStatus => value(self.reset_get_status(arg[0], flag)),
            PmApiId::InitFinalize => status(self.init_finalize(flag)),
            PmApiId::GetCallbackData => {
                let data = self.get_callback_data(true);
                SmcReturn::from([
                    u64::from(data[0]) | u64::from(data[1]) << 32,
                    u64::from(data[2]) | u64::from(data[3]) << 32,
                ])
            }
            PmApiId::PinctrlRequest => status(self.pinctrl_request(arg[0], flag)),
            PmApiId::PinctrlRelease => status(self.pinctrl_release(arg[0], flag)),
            PmApiId::PinctrlGetFunction => value(self.pinctrl_get_function(arg[0], flag)),
            PmApiId::PinctrlSetFunction => {
                status(self.pinctrl_set_function(arg[0], arg[1], flag))
            }
            PmApiId::PinctrlConfigParamGet => {
                value(self.pinctrl_get_pin_param(arg[0], arg[1], flag))
            }
            PmApiId::PinctrlConfigParamSet => {
                status(self.pinctrl_set_pin_param(arg[0], arg[1], arg[2], flag))
            }
            PmApiId::Ioctl => value(self.ioctl(arg[0], arg[1], arg[2], arg[3], flag)),
            PmApiId::QueryData => {
                let QueryReply { status, data } =
                    self.query_data(arg[0], arg[1], arg[2], arg[3], flag);
                pack_words(status.map_or_else(PmError::code, |()| SUCCESS as u32), &data)
            }
            PmApiId::ClockEnable => status(self.clock_enable(arg[0], flag)),
            PmApiId::ClockDisable => status(self.clock_disable(arg[0], flag)),
            PmApiId::ClockGetState => value(self.clock_get_state(arg[0], flag)),
            PmApiId::ClockSetDivider => status(self.clock_set_divider(arg[0], arg[1], flag)),
            PmApiId::ClockGetDivider => value(self.clock_get_divider(arg[0], flag)),
            PmApiId::ClockSetParent => status(self.clock_set_parent(arg[0], arg[1], flag)),
            PmApiId::ClockGetParent => value(self.clock_get_parent(arg[0], flag)),
            PmApiId::ClockGetRate => reply(self.clock_get_rate(arg[0], flag)),
            PmApiId::PllSetParameter => {
                status(self.pll_set_param(arg[0], arg[1], arg[2], flag))
            }
            PmApiId::PllGetParameter => value(self.pll_get_param(arg[0], arg[1], flag)),
            PmApiId::PllSetMode => status(self.pll_set_mode(arg[0], arg[1], flag)),
            PmApiId::PllGetMode => value(self.pll_get_mode(arg[0], flag)),
            PmApiId::GetTrustzoneVersion => value(Ok(self.get_trustzone_version())),
            PmApiId::GetChipId => reply(self.get_chipid(flag)),
            PmApiId::FeatureCheck => value(self.feature_check(arg[0], flag)),
            PmApiId::LoadPdi => status(self.load_pdi(arg[0], arg[1], arg[2], flag)),
            PmApiId::RegisterNotifier => {
                status(self.register_notifier(arg[0], arg[1], arg[2], arg[3], flag))
            }
        }
    }
}

impl<P: PmPlatformInterface> Service for Pm<P> {
    owns!(
        OwningEntityNumber::SIP,
        FUNCTION_NUMBER_MIN..=FUNCTION_NUMBER_MAX
    );

    fn handle_non_secure_smc(&self, regs: &[u64; 18]) -> SmcReturn {
        self.handle_smc_common(regs, SecurityFlag::NonSecure)
    }

    fn handle_secure_smc(&self, regs: &[u64; 18]) -> SmcReturn {
        self.handle_smc_common(regs, SecurityFlag::Secure)
    }
}

/// Packs a status word followed by output values into return registers, two words per register
/// with the first in the low half.
fn pack_words(status: u32, values: &[u32]) -> SmcReturn {
    let mut regs = [0u64; 4];
    let mut used = 0;
    for (i, word) in iter::once(status).chain(values.iter().copied()).enumerate() {
        regs[i / 2] |= u64::from(word) << (32 * (i % 2));
        used = i / 2 + 1;
    }
    SmcReturn::from_values(&regs[..used])
}

/// Packs the result of a call. Output values are only returned on success; an error gives just its
/// status code followed by zeroes.
fn reply<const N: usize>(result: Result<[u32; N], PmError>) -> SmcReturn {
    match result {
        Ok(values) => pack_words(SUCCESS as u32, &values),
        Err(e) => pack_words(e.code(), &[0; N]),
    }
}

fn value(result: Result<u32, PmError>) -> SmcReturn {
    reply(result.map(|value| [value]))
}

fn status(result: Result<(), PmError>) -> SmcReturn {
    reply(result.map(|()| []))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::test::{
        ClientEvent, FakeRequest, GicEvent, PRIMARY_CHANNEL, RequestKind, TestPlatform,
        set_core_index,
    };
    use std::panic::{AssertUnwindSafe, catch_unwind};

    fn smc(pm: &Pm<TestPlatform>, api: u16, x1: u64, x2: u64) -> SmcReturn {
        let mut regs = [0u64; 18];
        regs[0] = u64::from(0x8200_0000 | u32::from(api));
        regs[1] = x1;
        regs[2] = x2;
        pm.handle_non_secure_smc(&regs)
    }

    fn ready_pm() -> Pm<TestPlatform> {
        let pm = Pm::new(TestPlatform::new());
        pm.setup().unwrap();
        pm.platform().ipi().take_requests();
        pm.platform().gic().take_events();
        pm
    }

    fn expect_power_down_wfi(f: impl FnOnce()) {
        let result = catch_unwind(AssertUnwindSafe(f));
        let message = result.unwrap_err();
        assert_eq!(
            message.downcast_ref::<String>().map(String::as_str),
            Some(TestPlatform::POWER_DOWN_WFI_MAGIC)
        );
    }

    #[test]
    fn pack_words_layout() {
        assert_eq!(pack_words(0, &[]).values(), [0]);
        assert_eq!(pack_words(1, &[2]).values(), [0x0000_0002_0000_0001]);
        assert_eq!(
            pack_words(1, &[2, 3]).values(),
            [0x0000_0002_0000_0001, 0x0000_0003]
        );
        assert_eq!(
            pack_words(1, &[2, 3, 4]).values(),
            [0x0000_0002_0000_0001, 0x0000_0004_0000_0003]
        );
    }

    #[test]
    fn setup_opens_channel_and_interrupts() {
        let pm = Pm::new(TestPlatform::new());
        assert!(!pm.is_up());

        pm.setup().unwrap();

        assert!(pm.is_up());
        let ipi = pm.platform().ipi();
        assert_eq!(ipi.opened(), [PRIMARY_CHANNEL]);
        assert!(ipi.irq_enabled());
        assert_eq!(
            ipi.take_requests(),
            [FakeRequest::sync(
                PmApiId::RegisterNotifier as u32 | 2 << 8,
                &[XPM_DEVID_ACPU_0, EVENT_CPU_IDLE_FORCE_PWRDWN_SUBSYS, 0, 1]
            )]
        );
        assert_eq!(
            pm.platform().gic().take_events(),
            [
                GicEvent::RouteToEl3(TestPlatform::CPU_IDLE_SGI),
                GicEvent::RouteToEl3(TestPlatform::IPI_IRQ),
            ]
        );
    }

    #[test]
    fn setup_survives_notifier_failure() {
        let pm = Pm::new(TestPlatform::new());
        pm.platform().ipi().push_response(PmError::NoFeature.code(), &[]);
        assert_eq!(pm.setup(), Ok(()));
        assert!(pm.is_up());
    }

    #[test]
    fn setup_failure_keeps_service_down() {
        let pm = Pm::new(TestPlatform::new());
        pm.platform().ipi().fail_open(IpiError::InvalidAgent(1));

        assert_eq!(pm.setup(), Err(IpiError::InvalidAgent(1)));
        assert!(!pm.is_up());
        assert!(pm.platform().gic().take_events().is_empty());

        let result = smc(&pm, PmApiId::GetApiVersion as u16, 0, 0);
        assert_eq!(result.values(), [NOT_SUPPORTED as u64]);
        assert!(pm.platform().ipi().take_requests().is_empty());
    }

    #[test]
    fn unknown_function_not_supported() {
        let pm = ready_pm();
        for number in [0, 2, 19, 41, 62, 64, 0x700, 0xa02, 0xfff] {
            let result = smc(&pm, number, u64::MAX, u64::MAX);
            assert_eq!(result.values(), [NOT_SUPPORTED as u64]);
        }
        assert!(pm.platform().ipi().take_requests().is_empty());
    }

    #[test]
    fn self_suspend_frame() {
        let pm = ready_pm();

        let result = smc(&pm, PmApiId::SelfSuspend as u16, 3, 1 | 0x1000 << 32);

        assert_eq!(result.values(), [SUCCESS as u64]);
        assert_eq!(
            pm.platform().ipi().take_requests(),
            [FakeRequest::sync(0x0100_0207, &[3, 0, 1, 0x1000, 0])]
        );
        assert_eq!(
            pm.platform().take_client_events(),
            [ClientEvent::Suspend {
                node_id: 3,
                state: 1
            }]
        );
    }

    #[test]
    fn self_suspend_uses_calling_core_channel() {
        let pm = ready_pm();
        set_core_index(1);

        assert_eq!(pm.self_suspend(0, 4, 0x8000_0000, SecurityFlag::Secure), Ok(()));

        let requests = pm.platform().ipi().take_requests();
        assert_eq!(requests[0].channel, TestPlatform::PROCS[1].ipi);
        assert_eq!(requests[0].words[1], TestPlatform::PROCS[1].node_id);
    }

    #[test]
    fn self_suspend_without_proc_is_internal_error() {
        let pm = ready_pm();
        set_core_index(7);

        let result = smc(&pm, PmApiId::SelfSuspend as u16, 0, 0);

        assert_eq!(result.values(), [u64::from(PmError::Internal.code())]);
        assert!(pm.platform().ipi().take_requests().is_empty());
        assert!(pm.platform().take_client_events().is_empty());
    }

    #[test]
    fn error_status_packed_in_low_half() {
        let pm = ready_pm();
        pm.platform().ipi().push_response(2002, &[99]);

        let result = smc(&pm, PmApiId::ClockGetState as u16, 5, 0);

        assert_eq!(result.values(), [2002]);
    }

    #[test]
    fn api_version_ignores_status() {
        let pm = ready_pm();
        pm.platform().ipi().push_response(2002, &[0x0001_0002]);

        let result = smc(&pm, PmApiId::GetApiVersion as u16, 0, 0);

        assert_eq!(result.values(), [0x0001_0002_0000_0000]);
    }

    #[test]
    fn query_data_error_keeps_data() {
        let pm = ready_pm();
        pm.platform().ipi().push_response(0, &[2]);
        pm.platform()
            .ipi()
            .push_response(0, &[1, 0x61, 0x62, 0x63, 0, 0, 0, 0]);

        let result = smc(&pm, PmApiId::QueryData as u16, 1 | 3 << 32, 0);

        assert_eq!(result.values(), [0x0000_0061_0000_0001, 0x0000_0063_0000_0062]);
    }

    #[test]
    fn value_in_high_half() {
        let pm = ready_pm();
        pm.platform().ipi().push_response(0, &[0x1234]);

        let result = smc(&pm, PmApiId::PinctrlGetFunction as u16, 5, 0);

        assert_eq!(result.values(), [0x0000_1234_0000_0000]);
        assert_eq!(
            pm.platform().ipi().take_requests(),
            [FakeRequest::sync(0x0100_021e, &[5])]
        );
    }

    #[test]
    fn device_status_three_values() {
        let pm = ready_pm();
        pm.platform().ipi().push_response(0, &[1, 2, 3]);

        let result = smc(&pm, PmApiId::GetDeviceStatus as u16, 0x1822_4018, 0);

        assert_eq!(
            result.values(),
            [0x0000_0001_0000_0000, 0x0000_0003_0000_0002]
        );
    }

    #[test]
    fn clock_rate_two_values() {
        let pm = ready_pm();
        pm.platform().ipi().push_response(0, &[0x5f5e_1000, 0x1]);

        let result = smc(&pm, PmApiId::ClockGetRate as u16, 3, 0);

        assert_eq!(result.values(), [0x5f5e_1000_0000_0000, 0x1]);
    }

    #[test]
    fn trustzone_version_is_local() {
        let pm = ready_pm();

        let result = smc(&pm, PmApiId::GetTrustzoneVersion as u16, 0, 0);

        assert_eq!(result.values(), [u64::from(VERSAL_TZ_VERSION) << 32]);
        assert!(pm.platform().ipi().take_requests().is_empty());
    }

    #[test]
    fn load_pdi_uses_loader_module() {
        let pm = ready_pm();

        // Source 1 from address 0x2_1000_0000: the low half comes in x1 and the high half in x2.
        let result = smc(&pm, PmApiId::LoadPdi as u16, 0x1 | 0x1000_0000 << 32, 0x2);

        assert_eq!(result.values(), [SUCCESS as u64]);
        assert_eq!(
            pm.platform().ipi().take_requests(),
            [FakeRequest::sync(0x0100_0701, &[1, 0x2, 0x1000_0000])]
        );
    }

    #[test]
    fn set_scope_only_has_no_traffic() {
        let pm = ready_pm();
        assert_eq!(pm.shutdown_scope(), ShutdownSubtype::System as u32);

        let result = smc(&pm, PmApiId::SystemShutdown as u16, 2 | 1 << 32, 0);
        assert_eq!(result.values(), [SUCCESS as u64]);
        assert_eq!(pm.shutdown_scope(), ShutdownSubtype::PsOnly as u32);

        let result = smc(&pm, PmApiId::SystemShutdown as u16, 2, 0);
        assert_eq!(result.values(), [SUCCESS as u64]);
        assert_eq!(pm.shutdown_scope(), ShutdownSubtype::Subsystem as u32);

        assert!(pm.platform().ipi().take_requests().is_empty());
    }

    #[test]
    fn shutdown_is_non_blocking() {
        let pm = ready_pm();

        let result = smc(&pm, PmApiId::SystemShutdown as u16, 1 | 2 << 32, 0);

        assert_eq!(result.values(), [SUCCESS as u64]);
        let requests = pm.platform().ipi().take_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].kind, RequestKind::NonBlocking);
        assert_eq!(requests[0].words[..3], [0x0100_020c, 1, 2]);
    }

    #[test]
    fn sgi_registration_via_ioctl() {
        let pm = ready_pm();
        let set_sgi = |sgi: u64, reset: u64| {
            smc(&pm, PmApiId::Ioctl as u16, 25 << 32, sgi | reset << 32).values()[0]
        };

        assert_eq!(set_sgi(5, 0), SUCCESS as u64);
        assert_eq!(set_sgi(5, 0), u64::from(PmError::Args.code()));
        assert_eq!(set_sgi(0, 1), SUCCESS as u64);
        assert_eq!(set_sgi(16, 0), u64::from(PmError::Args.code()));
        assert_eq!(set_sgi(15, 0), SUCCESS as u64);
        assert!(pm.platform().ipi().take_requests().is_empty());
    }

    #[test]
    fn init_suspend_callback_notifies_registered_sgi() {
        let pm = ready_pm();
        pm.register_sgi(7, false).unwrap();
        pm.platform().ipi().push_callback([30, 0, 0, 0]);

        pm.handle_ipi_interrupt(TestPlatform::IPI_IRQ);

        assert_eq!(
            pm.platform().gic().take_events(),
            [
                GicEvent::Acknowledge,
                GicEvent::NsSgi {
                    sgi: IntId::sgi(7),
                    target_list: 1
                },
                GicEvent::EndOfInterrupt(TestPlatform::IPI_IRQ),
            ]
        );
        // Suspend callbacks are left pending for the OS to collect.
        assert_eq!(pm.platform().ipi().take_irq_clears(), 0);
    }

    #[test]
    fn notify_target_list_follows_core() {
        let pm = ready_pm();
        set_core_index(1);
        pm.register_sgi(7, false).unwrap();
        pm.platform().ipi().push_callback([32, 0, 1, 0]);

        pm.handle_ipi_interrupt(TestPlatform::IPI_IRQ);

        assert!(pm.platform().gic().take_events().contains(&GicEvent::NsSgi {
            sgi: IntId::sgi(7),
            target_list: 2
        }));
    }

    #[test]
    fn callbacks_dropped_without_registration() {
        let pm = ready_pm();
        pm.platform().ipi().push_callback([30, 0, 0, 0]);

        pm.handle_ipi_interrupt(TestPlatform::IPI_IRQ);

        assert_eq!(
            pm.platform().gic().take_events(),
            [
                GicEvent::Acknowledge,
                GicEvent::EndOfInterrupt(TestPlatform::IPI_IRQ),
            ]
        );
    }

    #[test]
    fn forced_idle_raises_idle_sgi() {
        let pm = ready_pm();
        pm.register_sgi(7, false).unwrap();
        pm.platform()
            .ipi()
            .push_callback([32, 0b11, EVENT_CPU_IDLE_FORCE_PWRDWN_SUBSYS, 0]);

        pm.handle_ipi_interrupt(TestPlatform::IPI_IRQ);

        assert_eq!(
            pm.platform().gic().take_events(),
            [
                GicEvent::Acknowledge,
                GicEvent::El3Sgi {
                    sgi: TestPlatform::CPU_IDLE_SGI,
                    core: 0
                },
                GicEvent::El3Sgi {
                    sgi: TestPlatform::CPU_IDLE_SGI,
                    core: 1
                },
                GicEvent::EndOfInterrupt(TestPlatform::IPI_IRQ),
            ]
        );
        assert_eq!(pm.platform().ipi().take_irq_clears(), 1);
    }

    #[test]
    fn invalid_callback_cleared() {
        let pm = ready_pm();
        pm.register_sgi(7, false).unwrap();
        pm.platform().ipi().push_callback([31, 0, 0, 0]);

        pm.handle_ipi_interrupt(TestPlatform::IPI_IRQ);

        assert_eq!(pm.platform().ipi().take_irq_clears(), 1);
        assert_eq!(
            pm.platform().gic().take_events(),
            [
                GicEvent::Acknowledge,
                GicEvent::EndOfInterrupt(TestPlatform::IPI_IRQ),
            ]
        );
    }

    #[test]
    fn callback_data_acks() {
        let pm = ready_pm();
        pm.platform().ipi().push_callback([30, 1, 2, 3]);

        let result = smc(&pm, PmApiId::GetCallbackData as u16, 0, 0);

        assert_eq!(
            result.values(),
            [0x0000_0001_0000_001e, 0x0000_0003_0000_0002]
        );
        assert_eq!(pm.platform().ipi().take_irq_clears(), 1);

        // Nothing pending any more.
        let result = smc(&pm, PmApiId::GetCallbackData as u16, 0, 0);
        assert_eq!(result.values(), [0, 0]);
    }

    #[test]
    fn cpu_idle_sgi_powers_core_down() {
        let pm = ready_pm();
        set_core_index(1);

        expect_power_down_wfi(|| pm.handle_cpu_idle_sgi(TestPlatform::CPU_IDLE_SGI));

        assert_eq!(
            pm.platform().gic().take_events(),
            [
                GicEvent::ClearPending(TestPlatform::CPU_IDLE_SGI),
                GicEvent::DisableCpuInterface,
            ]
        );
        assert_eq!(
            pm.platform().take_client_events(),
            [ClientEvent::PowerDown(ApuPowerControl::CPU1_PWRDWN_REQ)]
        );
    }
}
