// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! Transfer-control commands.
//!
//! A closed set of auxiliary operations on an open channel, dispatched
//! against the channel's current mode: asynchronous channels accept the
//! UART-flavored set, synchronous and simple-SPI channels the synchronous
//! set. A command outside the set for the current mode fails with
//! `InvalidArgument`; commands on a closed channel fail with `NotOpen`.

use serial_hil::serial::{Mode, SpiMode};
use serial_hil::ErrorCode;

use crate::sci::Sci;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// Enable the digital noise filter on the receive line (filter clock
    /// divided by 1).
    EnableNoiseFilter,
    /// Output the baud rate clock on the SCK pin.
    OutputBaudClock,
    /// Detect the start bit on the falling edge of RXD instead of low level.
    StartBitEdgeFalling,
    /// Discard all queued transmit bytes.
    FlushTransmitQueue,
    /// Discard all queued receive bytes.
    FlushReceiveQueue,
    /// Abort anything queued, transmit a break, restore the baud rate.
    GenerateBreak,
    /// Fails with `TransferBusy` while a DMA-assisted transmission runs.
    CheckTransmitDone,
    /// Fails with `TransferBusy` while a DMA-assisted reception runs.
    CheckReceiveDone,
    /// Fails with `TransferBusy` until the current synchronous transfer
    /// completes.
    CheckTransferDone,
    /// Raise the receive-match event only for frames equal to the byte.
    MatchReceivedData(u8),
    EnableReceiveSampling,
    DisableReceiveSampling,
    EnableTransmitTiming,
    DisableTransmitTiming,
    /// Shift the receive sampling point; the legal range depends on the
    /// current base clock selection.
    AdjustReceiveSampling(u8),
    /// Shift the transmit transition point; the legal range depends on the
    /// current base clock selection.
    AdjustTransmitTransition(u8),
    LsbFirst,
    MsbFirst,
    /// Toggle data inversion.
    InvertData,
    /// Select the SPI clock phase/polarity. Simple-SPI mode only.
    ChangeSpiMode(SpiMode),
    /// Stop everything in flight and return to idle. Always succeeds.
    AbortTransfer,
}

impl<'a> Sci<'a> {
    /// Validate and run `command` against the channel's current mode.
    pub fn control(&self, command: Command) -> Result<(), ErrorCode> {
        match self.mode() {
            Mode::Off => Err(ErrorCode::NotOpen),
            Mode::Asynchronous => self.async_command(command),
            Mode::Synchronous | Mode::SimpleSpi => self.sync_command(command),
        }
    }

    fn async_command(&self, command: Command) -> Result<(), ErrorCode> {
        match command {
            Command::EnableNoiseFilter => {
                self.enable_noise_filter();
                Ok(())
            }
            Command::OutputBaudClock => {
                self.output_baud_clock();
                Ok(())
            }
            Command::StartBitEdgeFalling => {
                self.start_bit_edge_falling();
                Ok(())
            }
            Command::FlushTransmitQueue => {
                self.flush_tx_queue();
                Ok(())
            }
            Command::FlushReceiveQueue => {
                self.flush_rx_queue();
                Ok(())
            }
            Command::GenerateBreak => self.generate_break(),
            Command::CheckTransmitDone => self.check_tx_done(),
            Command::CheckReceiveDone => self.check_rx_done(),
            Command::MatchReceivedData(byte) => {
                self.match_received_data(byte);
                Ok(())
            }
            Command::EnableReceiveSampling => {
                self.set_rx_sampling(true);
                Ok(())
            }
            Command::DisableReceiveSampling => {
                self.set_rx_sampling(false);
                Ok(())
            }
            Command::EnableTransmitTiming => {
                self.set_tx_timing(true);
                Ok(())
            }
            Command::DisableTransmitTiming => {
                self.set_tx_timing(false);
                Ok(())
            }
            Command::AdjustReceiveSampling(value) => self.adjust_rx_sampling(value),
            Command::AdjustTransmitTransition(value) => self.adjust_tx_transition(value),
            Command::AbortTransfer => {
                self.abort_transfer();
                Ok(())
            }
            _ => Err(ErrorCode::InvalidArgument),
        }
    }

    fn sync_command(&self, command: Command) -> Result<(), ErrorCode> {
        match command {
            Command::CheckTransferDone => self.check_transfer_done(),
            Command::CheckReceiveDone => self.check_rx_done(),
            Command::LsbFirst => {
                self.set_msb_first(false);
                Ok(())
            }
            Command::MsbFirst => {
                self.set_msb_first(true);
                Ok(())
            }
            Command::InvertData => {
                self.invert_data();
                Ok(())
            }
            Command::ChangeSpiMode(spi_mode) => {
                if self.mode() != Mode::SimpleSpi {
                    return Err(ErrorCode::InvalidArgument);
                }
                let (ckpol, ckph) = match spi_mode {
                    SpiMode::Mode0 => (false, false),
                    SpiMode::Mode1 => (false, true),
                    SpiMode::Mode2 => (true, false),
                    SpiMode::Mode3 => (true, true),
                };
                self.change_spi_mode(ckpol, ckph);
                Ok(())
            }
            Command::AbortTransfer => {
                self.abort_transfer();
                Ok(())
            }
            _ => Err(ErrorCode::InvalidArgument),
        }
    }
}
