// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! Channel descriptors, configuration, and the channel registry.

use crate::registers::SciRegisters;
use crate::sci::Sci;
use serial_hil::serial::{InterruptControl, InterruptSource, PeripheralClock, TransferAssist};
use serial_hil::utilities::StaticRef;
use serial_hil::ErrorCode;

pub const SCI_CH1: u8 = 1;
pub const SCI_CH5: u8 = 5;
pub const SCI_CH6: u8 = 6;
pub const SCI_CH12: u8 = 12;

/// Registry slots cover channel numbers 0 through 12.
pub const NUM_CHANNELS: usize = 13;

/// Per-channel hardware capabilities.
pub struct ChannelCapability {
    pub channel: u8,
    /// Whether the extended base clock (12x divisor rows) is wired.
    pub has_abcse: bool,
}

/// The SCI channels present on this part. ABCSE is not available on
/// channel 12.
pub const CHANNEL_CAPABILITIES: [ChannelCapability; 4] = [
    ChannelCapability { channel: SCI_CH1, has_abcse: true },
    ChannelCapability { channel: SCI_CH5, has_abcse: true },
    ChannelCapability { channel: SCI_CH6, has_abcse: true },
    ChannelCapability { channel: SCI_CH12, has_abcse: false },
];

pub fn capability_for(channel: u8) -> Option<&'static ChannelCapability> {
    CHANNEL_CAPABILITIES.iter().find(|c| c.channel == channel)
}

/// Static configuration for one channel.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// RXI/TXI interrupt priority, 1..=15.
    pub priority: u8,
    /// Priority floor for the grouped ERI/TEI sources, 1..=15.
    pub eri_tei_priority: u8,
    pub baud_rate: u32,
    /// Peripheral clock feeding the bit rate generator.
    pub pclk_hz: u32,
    /// Validate arguments on API entry. Disable only once a configuration
    /// has been proven out.
    pub parameter_checking: bool,
    pub tx_assist: TransferAssist,
    pub rx_assist: TransferAssist,
}

/// Immutable description of one hardware channel instance.
pub struct ChannelDescriptor<'a> {
    pub regs: StaticRef<SciRegisters>,
    pub clock: &'a dyn PeripheralClock,
    pub icu: &'a dyn InterruptControl,
    pub channel: u8,
    pub has_abcse: bool,
}

impl<'a> ChannelDescriptor<'a> {
    /// Build the descriptor for `channel`, looking its capabilities up in
    /// [`CHANNEL_CAPABILITIES`]. Fails with `BadChannel` for channel numbers
    /// this part does not route.
    pub fn new(
        regs: StaticRef<SciRegisters>,
        clock: &'a dyn PeripheralClock,
        icu: &'a dyn InterruptControl,
        channel: u8,
    ) -> Result<ChannelDescriptor<'a>, ErrorCode> {
        let cap = capability_for(channel).ok_or(ErrorCode::BadChannel)?;
        Ok(ChannelDescriptor {
            regs,
            clock,
            icu,
            channel,
            has_abcse: cap.has_abcse,
        })
    }
}

/// Owner of every live channel driver, indexed by channel number.
///
/// Boards construct one registry at initialization and route their interrupt
/// vector stubs through [`SciRegistry::dispatch`]; no per-channel mutable
/// statics are involved.
pub struct SciRegistry<'a> {
    channels: [Option<&'a Sci<'a>>; NUM_CHANNELS],
}

impl<'a> SciRegistry<'a> {
    pub const fn new() -> SciRegistry<'a> {
        SciRegistry {
            channels: [None; NUM_CHANNELS],
        }
    }

    pub fn register(&mut self, sci: &'a Sci<'a>) -> Result<(), ErrorCode> {
        let index = sci.channel() as usize;
        if index >= NUM_CHANNELS {
            return Err(ErrorCode::BadChannel);
        }
        if self.channels[index].is_some() {
            return Err(ErrorCode::AlreadyOpen);
        }
        self.channels[index] = Some(sci);
        Ok(())
    }

    pub fn get(&self, channel: u8) -> Result<&'a Sci<'a>, ErrorCode> {
        self.channels
            .get(channel as usize)
            .copied()
            .flatten()
            .ok_or(ErrorCode::BadChannel)
    }

    /// Interrupt entry point. Runs in interrupt context; unknown or
    /// unregistered channels are ignored (a spurious vector must not fault).
    pub fn dispatch(&self, channel: u8, source: InterruptSource) {
        if let Ok(sci) = self.get(channel) {
            match source {
                InterruptSource::Receive => sci.handle_rxi(),
                InterruptSource::Transmit => sci.handle_txi(),
                InterruptSource::TransmitEnd => sci.handle_tei(),
                InterruptSource::Error => sci.handle_eri(),
            }
        }
    }
}
