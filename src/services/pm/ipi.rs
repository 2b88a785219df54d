// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Request/response transactions with the platform management controller over the IPI mailbox.

pub mod mailbox;

use super::{
    defs::{CALLBACK_WORDS, PAYLOAD_ARG_CNT, PmError},
    payload::Payload,
};
use core::hint::spin_loop;
use log::trace;
use spin::mutex::SpinMutex;
use thiserror::Error;

/// The pair of IPI agents a channel connects.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct IpiChannel {
    /// The agent used by this core.
    pub local_id: usize,
    /// The agent of the platform management controller.
    pub remote_id: usize,
}

/// Error opening an IPI channel.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub enum IpiError {
    /// One of the agents of the channel doesn't exist.
    #[error("no IPI agent {0}")]
    InvalidAgent(usize),
    /// The channel's message buffers run past the end of the buffer memory.
    #[error("IPI buffers for agent {0} out of range")]
    BufferOutOfRange(usize),
}

/// An IPI mailbox driver.
pub trait IpiTransport {
    /// Prepares the channel for use, masking and clearing any interrupt from the remote agent.
    fn open(&self, channel: &IpiChannel) -> Result<(), IpiError>;

    /// Writes a request frame to the channel's request buffer.
    fn write_request(&self, channel: &IpiChannel, words: &[u32; PAYLOAD_ARG_CNT]);

    /// Raises the IPI on the remote agent.
    fn trigger(&self, channel: &IpiChannel);

    /// Returns whether the remote agent has yet to acknowledge the last trigger.
    fn is_busy(&self, channel: &IpiChannel) -> bool;

    /// Reads the channel's response buffer, returning the status word and copying the following
    /// `values.len()` words into `values`.
    fn read_response(&self, channel: &IpiChannel, values: &mut [u32]) -> u32;

    /// Reads a callback message sent by the remote agent.
    fn read_callback(&self, channel: &IpiChannel, values: &mut [u32; CALLBACK_WORDS]);

    /// Returns whether an interrupt from the remote agent is pending.
    fn irq_status(&self, channel: &IpiChannel) -> bool;

    /// Clears the pending interrupt from the remote agent.
    fn irq_clear(&self, channel: &IpiChannel);

    /// Enables interrupts from the remote agent.
    fn irq_enable(&self, channel: &IpiChannel);
}

/// How long to wait for the remote agent to acknowledge a request.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum WaitPolicy {
    /// Waits until it is acknowledged, however long that takes.
    #[default]
    Forever,
    /// Gives up with [`PmError::Timeout`] after polling this many times.
    Bounded {
        /// Number of times to poll the acknowledgement.
        polls: u32,
    },
}

/// Serialises transactions on the IPI mailbox.
///
/// The lock is held from writing a request until its response has been read, so a response can't
/// be overwritten by another core's request before it is consumed.
pub struct PmIpi {
    lock: SpinMutex<()>,
    wait: WaitPolicy,
}

impl PmIpi {
    /// Creates a new engine waiting for acknowledgements according to `wait`.
    pub const fn new(wait: WaitPolicy) -> Self {
        Self {
            lock: SpinMutex::new(()),
            wait,
        }
    }

    /// Sends a request without waiting for it to be acknowledged.
    pub fn send_non_blocking<T: IpiTransport>(
        &self,
        ipi: &T,
        channel: &IpiChannel,
        payload: &Payload,
    ) -> Result<(), PmError> {
        let _guard = self.lock.lock();
        Self::post(ipi, channel, payload);
        Ok(())
    }

    /// Sends a request and waits for it to be acknowledged, without reading any response.
    pub fn send<T: IpiTransport>(
        &self,
        ipi: &T,
        channel: &IpiChannel,
        payload: &Payload,
    ) -> Result<(), PmError> {
        let _guard = self.lock.lock();
        Self::post(ipi, channel, payload);
        self.wait_for_ack(ipi, channel)
    }

    /// Sends a request, waits for the response and returns its raw status word. The
    /// `values.len()` words following the status are copied to `values`.
    pub fn send_sync_status<T: IpiTransport>(
        &self,
        ipi: &T,
        channel: &IpiChannel,
        payload: &Payload,
        values: &mut [u32],
    ) -> Result<u32, PmError> {
        let _guard = self.lock.lock();
        Self::post(ipi, channel, payload);
        self.wait_for_ack(ipi, channel)?;
        Ok(ipi.read_response(channel, values))
    }

    /// Sends a request, waits for the response and decodes its status. The `values.len()` words
    /// following the status are copied to `values`.
    pub fn send_sync<T: IpiTransport>(
        &self,
        ipi: &T,
        channel: &IpiChannel,
        payload: &Payload,
        values: &mut [u32],
    ) -> Result<(), PmError> {
        PmError::from_status(self.send_sync_status(ipi, channel, payload, values)?)
    }

    fn post<T: IpiTransport>(ipi: &T, channel: &IpiChannel, payload: &Payload) {
        trace!("IPI request {:?}", payload.header());
        ipi.write_request(channel, &payload.to_words());
        ipi.trigger(channel);
    }

    fn wait_for_ack<T: IpiTransport>(&self, ipi: &T, channel: &IpiChannel) -> Result<(), PmError> {
        match self.wait {
            WaitPolicy::Forever => {
                while ipi.is_busy(channel) {
                    spin_loop();
                }
                Ok(())
            }
            WaitPolicy::Bounded { polls } => {
                for _ in 0..polls {
                    if !ipi.is_busy(channel) {
                        return Ok(());
                    }
                    spin_loop();
                }
                Err(PmError::Timeout)
            }
        }
    }
}
