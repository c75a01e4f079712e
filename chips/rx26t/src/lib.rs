// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! Serial communication interface (SCI) support for the Renesas RX26T.
//!
//! The RX26T exposes SCI channels 1, 5, 6 and 12. Each channel runs in
//! asynchronous (UART), clock-synchronous, or simple-SPI master mode, with
//! interrupt-driven byte queues or optional DMA/descriptor-table offload
//! per direction.

#![no_std]

pub mod baud;
pub mod channel;
pub mod commands;
pub mod registers;
pub mod sci;
