// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! Hardware interface layer (HIL) for serial engine drivers.
//!
//! This crate collects the interfaces a memory-mapped serial peripheral
//! driver needs from the rest of the system: configuration parameters and
//! the client callback contract ([`serial`]), plus the seams to the
//! collaborators a driver does not own — the interrupt controller, the
//! module-stop (clock gate) controller, and DMA/descriptor-table transfer
//! channels. Chip crates implement drivers against these traits; boards
//! provide the concrete implementations.
//!
//! The [`utilities`] module holds the small building blocks shared by
//! drivers: a wrapper type for static register references, a fixed-capacity
//! byte queue, and a bounded busy-wait helper.

#![no_std]

pub mod serial;
pub mod utilities;

mod errorcode;
pub use errorcode::ErrorCode;
