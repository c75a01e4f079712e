// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! Interfaces for UART-like serial engines and their collaborators.

/// Operating mode of a serial channel.
///
/// A channel is `Off` until a successful open. The three active modes map
/// to the hardware's asynchronous (UART), clock-synchronous, and simple-SPI
/// master configurations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    Off,
    Asynchronous,
    Synchronous,
    SimpleSpi,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Width {
    Seven,
    Eight,
    Nine,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Parity {
    None,
    Even,
    Odd,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StopBits {
    One,
    Two,
}

/// Framing parameters applied when a channel is opened in asynchronous mode.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Parameters {
    pub width: Width,
    pub parity: Parity,
    pub stop_bits: StopBits,
    /// Gate transmission on the CTS input pin.
    pub cts_enable: bool,
}

impl Default for Parameters {
    fn default() -> Parameters {
        Parameters {
            width: Width::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
            cts_enable: false,
        }
    }
}

/// SPI clock phase/polarity combinations for simple-SPI mode.
///
/// Numbering follows the usual SPI mode convention: mode 0 is idle-low,
/// sample-leading; mode 3 is idle-high, sample-trailing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SpiMode {
    Mode0,
    Mode1,
    Mode2,
    Mode3,
}

/// Events delivered to a channel's [`Client`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    /// A byte arrived and was placed in the receive queue.
    ReceivedCharacter(u8),
    /// A byte arrived but the receive queue was full; the byte is passed to
    /// the client and otherwise dropped.
    ReceiveQueueFull(u8),
    /// Receiver overrun. The status flag has already been cleared and
    /// reception continues.
    OverrunError,
    /// Framing error, with the (unreliable) data byte that accompanied it.
    FramingError(u8),
    /// Parity error.
    ParityError,
    /// The transmit queue drained and the transmitter finished shifting the
    /// last frame.
    TransmitEnd,
    /// A synchronous/SPI transfer ran to completion.
    TransferDone,
    /// A DMA-assisted reception ran to completion.
    ReceiveDone,
    /// A transfer was aborted by request.
    TransferAborted,
}

/// Callback interface registered per channel.
///
/// `event` runs in interrupt context: it must not block and must not call
/// back into blocking driver operations. Registering a client is optional;
/// with no client registered, hardware errors are cleared and absorbed
/// silently.
pub trait Client {
    fn event(&self, channel: u8, event: Event);
}

/// Module-stop / clock-gate control for one peripheral instance.
pub trait PeripheralClock {
    fn enable(&self);
    fn disable(&self);
    fn is_enabled(&self) -> bool;
}

/// Interrupt sources of a serial channel, as seen by the interrupt
/// controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InterruptSource {
    Receive,
    Transmit,
    TransmitEnd,
    Error,
}

/// Per-channel view of the external interrupt controller.
///
/// `TransmitEnd` and `Error` are grouped sources on the parts this layer
/// targets: they share one group interrupt whose priority must never be
/// lower than any member source's priority, or the members silently never
/// fire.
pub trait InterruptControl {
    fn set_priority(&self, source: InterruptSource, priority: u8);
    fn enable(&self, source: InterruptSource);
    fn disable(&self, source: InterruptSource);
    fn clear_pending(&self, source: InterruptSource);
    /// Current priority of the group interrupt serving the grouped sources.
    fn group_priority(&self) -> u8;
    /// Enable the group interrupt, raising its priority to at least
    /// `priority`. A `priority` of 0 enables the group at its current level.
    fn enable_group(&self, priority: u8);
    fn disable_group(&self);
}

/// How bytes move between memory and the data register for one direction of
/// one channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferAssist {
    /// Interrupt-driven byte queue; the driver services every data
    /// interrupt itself.
    Interrupt,
    /// Descriptor-table controller offload (DTC-style).
    DescriptorTable,
    /// DMA controller offload.
    DmaController,
}

/// One direction of a DMA or descriptor-table transfer channel.
///
/// The driver owns the channel exclusively. The activation source must be
/// disabled before the driver touches state the controller might also be
/// walking (for example before flushing a queue mid-transfer).
pub trait DmaChannel {
    /// Allow the peripheral's data interrupt to activate the controller.
    fn enable_source(&self);
    /// Stop the peripheral's data interrupt from activating the controller.
    fn disable_source(&self);
    /// Arm a transfer of `len` bytes. The buffer belongs to the controller
    /// until the transfer completes or is aborted.
    fn start(&self, buffer: &'static mut [u8], len: usize);
    /// Cancel an in-flight transfer; returns the number of bytes that were
    /// still outstanding.
    fn abort(&self) -> usize;
    /// Release the channel.
    fn close(&self);
    fn is_busy(&self) -> bool;
}
