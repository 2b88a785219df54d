// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Driver for the Versal IPI block.
//!
//! Each agent has a register block and a set of message buffers. The buffers an agent uses to talk
//! to another agent are found at the agent's own buffer offset plus the other agent's target
//! offset; the first [`RESPONSE_OFFSET`] bytes hold the request and the rest the response.

use super::{IpiChannel, IpiError, IpiTransport};
use crate::services::pm::defs::{CALLBACK_WORDS, MAX_REPLY_WORDS, PAYLOAD_ARG_CNT, PmError};
use safe_mmio::{
    UniqueMmioPointer, field,
    fields::{ReadPure, ReadPureWrite, WriteOnly},
};
use spin::mutex::SpinMutex;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Offset in bytes of the response within a message buffer.
pub const RESPONSE_OFFSET: usize = 0x20;

const WORD: usize = size_of::<u32>();
const RESPONSE_WORDS: usize = 1 + MAX_REPLY_WORDS;
const MESSAGE_WORDS: usize = RESPONSE_OFFSET / WORD + RESPONSE_WORDS;

/// The registers of one IPI agent.
#[derive(Clone, Debug, Eq, FromBytes, Immutable, IntoBytes, KnownLayout, PartialEq)]
#[repr(C)]
pub struct IpiRegisters {
    /// Trigger: writing an agent's bit raises an interrupt on it.
    pub trig: WriteOnly<u32>,
    /// Observation: bits of agents which haven't acknowledged a trigger yet.
    pub obs: ReadPure<u32>,
    reserved: [u32; 2],
    /// Interrupt status: write 1 to clear.
    pub isr: ReadPureWrite<u32>,
    /// Interrupt mask.
    pub imr: ReadPure<u32>,
    /// Interrupt enable.
    pub ier: WriteOnly<u32>,
    /// Interrupt disable.
    pub idr: WriteOnly<u32>,
}

/// One IPI agent.
#[derive(Debug)]
pub struct IpiAgent<'a> {
    /// The agent's bit in the trigger and interrupt registers of other agents.
    pub mask: u32,
    /// The agent's register block.
    pub registers: UniqueMmioPointer<'a, IpiRegisters>,
    /// Offset in bytes of the agent's buffers from the start of the buffer memory.
    pub buffer_offset: usize,
    /// Offset in bytes, within another agent's buffers, of the buffer used to talk to this agent.
    pub target_offset: usize,
}

/// Where the messages of a channel live, in words from the start of the buffer memory.
#[derive(Clone, Copy, Debug)]
struct Route {
    local: usize,
    remote_mask: u32,
    request: usize,
    callback: usize,
}

impl Route {
    fn response(&self) -> usize {
        self.request + RESPONSE_OFFSET / WORD
    }
}

struct MailboxState<'a, const AGENTS: usize> {
    agents: [IpiAgent<'a>; AGENTS],
    buffers: UniqueMmioPointer<'a, [ReadPureWrite<u32>]>,
}

impl<const AGENTS: usize> MailboxState<'_, AGENTS> {
    fn route(&self, channel: &IpiChannel) -> Result<Route, IpiError> {
        let local = self
            .agents
            .get(channel.local_id)
            .ok_or(IpiError::InvalidAgent(channel.local_id))?;
        let remote = self
            .agents
            .get(channel.remote_id)
            .ok_or(IpiError::InvalidAgent(channel.remote_id))?;
        Ok(Route {
            local: channel.local_id,
            remote_mask: remote.mask,
            request: (local.buffer_offset + remote.target_offset) / WORD,
            callback: (remote.buffer_offset + local.target_offset) / WORD,
        })
    }

    fn fits(&self, start: usize, len: usize) -> bool {
        start + len <= self.buffers.len()
    }

    /// Returns the words `start..start + len` of the buffer memory, or none at all if they don't
    /// fit.
    fn window(
        &mut self,
        start: usize,
        len: usize,
    ) -> impl Iterator<Item = UniqueMmioPointer<'_, ReadPureWrite<u32>>> {
        self.buffers
            .get_range(start..start + len)
            .into_iter()
            .flatten()
    }
}

/// An [`IpiTransport`] for the Versal IPI block.
///
/// Operations on a channel naming an agent which doesn't exist are ignored.
pub struct IpiMailbox<'a, const AGENTS: usize> {
    state: SpinMutex<MailboxState<'a, AGENTS>>,
}

impl<'a, const AGENTS: usize> IpiMailbox<'a, AGENTS> {
    /// Creates a driver for the given agents, whose message buffers live in `buffers`.
    pub fn new(
        agents: [IpiAgent<'a>; AGENTS],
        buffers: UniqueMmioPointer<'a, [ReadPureWrite<u32>]>,
    ) -> Self {
        Self {
            state: SpinMutex::new(MailboxState { agents, buffers }),
        }
    }

    fn with_route<R: Default>(
        &self,
        channel: &IpiChannel,
        f: impl FnOnce(&mut MailboxState<'a, AGENTS>, Route) -> R,
    ) -> R {
        let mut state = self.state.lock();
        match state.route(channel) {
            Ok(route) => f(&mut *state, route),
            Err(_) => R::default(),
        }
    }
}

impl<const AGENTS: usize> IpiTransport for IpiMailbox<'_, AGENTS> {
    fn open(&self, channel: &IpiChannel) -> Result<(), IpiError> {
        let mut state = self.state.lock();
        let route = state.route(channel)?;
        if !state.fits(route.request, MESSAGE_WORDS) || !state.fits(route.callback, CALLBACK_WORDS)
        {
            return Err(IpiError::BufferOutOfRange(channel.remote_id));
        }
        let registers = &mut state.agents[route.local].registers;
        field!(*registers, idr).write(route.remote_mask);
        field!(*registers, isr).write(route.remote_mask);
        Ok(())
    }

    fn write_request(&self, channel: &IpiChannel, words: &[u32; PAYLOAD_ARG_CNT]) {
        self.with_route(channel, |state, route| {
            for (mut slot, word) in state.window(route.request, PAYLOAD_ARG_CNT).zip(words) {
                slot.write(*word);
            }
        });
    }

    fn trigger(&self, channel: &IpiChannel) {
        self.with_route(channel, |state, route| {
            field!(state.agents[route.local].registers, trig).write(route.remote_mask);
        });
    }

    fn is_busy(&self, channel: &IpiChannel) -> bool {
        self.with_route(channel, |state, route| {
            field!(state.agents[route.local].registers, obs).read() & route.remote_mask != 0
        })
    }

    fn read_response(&self, channel: &IpiChannel, values: &mut [u32]) -> u32 {
        let count = values.len().min(MAX_REPLY_WORDS);
        let status = self.with_route(channel, |state, route| {
            let mut words = state.window(route.response(), 1 + count);
            let status = words.next().map(|word| word.read());
            for (value, word) in values.iter_mut().zip(words) {
                *value = word.read();
            }
            status
        });
        status.unwrap_or(PmError::Internal.code())
    }

    fn read_callback(&self, channel: &IpiChannel, values: &mut [u32; CALLBACK_WORDS]) {
        self.with_route(channel, |state, route| {
            for (value, word) in values.iter_mut().zip(state.window(route.callback, CALLBACK_WORDS))
            {
                *value = word.read();
            }
        });
    }

    fn irq_status(&self, channel: &IpiChannel) -> bool {
        self.with_route(channel, |state, route| {
            field!(state.agents[route.local].registers, isr).read() & route.remote_mask != 0
        })
    }

    fn irq_clear(&self, channel: &IpiChannel) {
        self.with_route(channel, |state, route| {
            field!(state.agents[route.local].registers, isr).write(route.remote_mask);
        });
    }

    fn irq_enable(&self, channel: &IpiChannel) {
        self.with_route(channel, |state, route| {
            field!(state.agents[route.local].registers, ier).write(route.remote_mask);
        });
    }
}
