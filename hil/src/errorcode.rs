// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! Standard error enum for invoking driver operations.

/// Errors returned by serial driver operations.
///
/// Synchronous API calls report failure through this enum. Hardware status
/// errors detected in interrupt context (overrun, framing, parity) are not
/// part of it; those surface asynchronously through
/// [`serial::Event`](crate::serial::Event).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ErrorCode {
    /// A parameter was out of range or invalid for the current mode
    InvalidArgument,
    /// Channel number is not supported on this part
    BadChannel,
    /// The transmit queue has no room for the requested bytes; retry later
    QueueFull,
    /// The receive queue holds fewer bytes than requested; retry later
    QueueEmpty,
    /// A conflicting transfer is still in flight
    TransferBusy,
    /// No divisor setting can reach the requested baud rate; no registers
    /// were modified
    BaudRateUnattainable,
    /// A bounded wait on a hardware flag ran out of retries
    Timeout,
    /// The channel is already open
    AlreadyOpen,
    /// The channel has not been opened
    NotOpen,
}
