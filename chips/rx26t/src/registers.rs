// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! SCI register block and bitfields.

use tock_registers::registers::ReadWrite;
use tock_registers::{register_bitfields, register_structs};

register_structs! {
    pub SciRegisters {
        /// Serial mode register
        (0x00 => pub smr: ReadWrite<u8, SMR::Register>),
        /// Bit rate register
        (0x01 => pub brr: ReadWrite<u8, ()>),
        /// Serial control register
        (0x02 => pub scr: ReadWrite<u8, SCR::Register>),
        /// Transmit data register
        (0x03 => pub tdr: ReadWrite<u8, ()>),
        /// Serial status register
        (0x04 => pub ssr: ReadWrite<u8, SSR::Register>),
        /// Receive data register
        (0x05 => pub rdr: ReadWrite<u8, ()>),
        /// Smart card mode register (frame shape bits in plain serial modes)
        (0x06 => pub scmr: ReadWrite<u8, SCMR::Register>),
        /// Serial extended mode register
        (0x07 => pub semr: ReadWrite<u8, SEMR::Register>),
        /// Noise filter setting register
        (0x08 => pub snfr: ReadWrite<u8, SNFR::Register>),
        (0x09 => _reserved0),
        /// SPI mode register
        (0x0d => pub spmr: ReadWrite<u8, SPMR::Register>),
        (0x0e => _reserved1),
        /// Modulation duty register (fractional baud correction)
        (0x12 => pub mddr: ReadWrite<u8, ()>),
        /// Data compare match control register
        (0x13 => pub dccr: ReadWrite<u8, DCCR::Register>),
        /// Compare match data register
        (0x14 => pub cdr: ReadWrite<u16, CDR::Register>),
        /// Serial port register
        (0x16 => pub sptr: ReadWrite<u8, SPTR::Register>),
        /// Timing adjustment register
        (0x17 => pub tmgr: ReadWrite<u8, TMGR::Register>),
        (0x18 => @END),
    }
}

register_bitfields![u8,
    pub SMR [
        // Peripheral clock select (PCLK / 4^n)
        CKS OFFSET(0) NUMBITS(2) [],
        // Multi-processor mode
        MP OFFSET(2) NUMBITS(1) [],
        // Stop bit length: 0 = one, 1 = two
        STOP OFFSET(3) NUMBITS(1) [],
        // Parity mode: 0 = even, 1 = odd
        PM OFFSET(4) NUMBITS(1) [],
        // Parity enable
        PE OFFSET(5) NUMBITS(1) [],
        // Character length (with SCMR.CHR1)
        CHR OFFSET(6) NUMBITS(1) [],
        // Communication mode: 0 = asynchronous, 1 = clock synchronous
        CM OFFSET(7) NUMBITS(1) [],
    ],
    pub SCR [
        // Clock source / SCK pin function
        CKE OFFSET(0) NUMBITS(2) [
            Internal = 0b00,
            InternalClockOutput = 0b01,
            External = 0b10,
        ],
        // Transmit end interrupt enable
        TEIE OFFSET(2) NUMBITS(1) [],
        // Multi-processor interrupt enable
        MPIE OFFSET(3) NUMBITS(1) [],
        // Receive enable
        RE OFFSET(4) NUMBITS(1) [],
        // Transmit enable
        TE OFFSET(5) NUMBITS(1) [],
        // Receive (and error) interrupt enable
        RIE OFFSET(6) NUMBITS(1) [],
        // Transmit interrupt enable
        TIE OFFSET(7) NUMBITS(1) [],
    ],
    pub SSR [
        // Multi-processor bit transfer
        MPBT OFFSET(0) NUMBITS(1) [],
        // Multi-processor bit
        MPB OFFSET(1) NUMBITS(1) [],
        // Transmit end flag
        TEND OFFSET(2) NUMBITS(1) [],
        // Parity error flag
        PER OFFSET(3) NUMBITS(1) [],
        // Framing error flag
        FER OFFSET(4) NUMBITS(1) [],
        // Overrun error flag
        ORER OFFSET(5) NUMBITS(1) [],
        // Receive data register full flag
        RDRF OFFSET(6) NUMBITS(1) [],
        // Transmit data register empty flag
        TDRE OFFSET(7) NUMBITS(1) [],
    ],
    pub SCMR [
        // Smart card interface mode
        SMIF OFFSET(0) NUMBITS(1) [],
        // Transmitted/received data inversion
        SINV OFFSET(2) NUMBITS(1) [],
        // Transmitted/received data transfer direction (1 = MSB first)
        SDIR OFFSET(3) NUMBITS(1) [],
        // Character length 1 (with SMR.CHR)
        CHR1 OFFSET(4) NUMBITS(1) [],
    ],
    pub SEMR [
        // Asynchronous mode clock source select
        ACS0 OFFSET(0) NUMBITS(1) [],
        // Bit rate modulation enable (MDDR active)
        BRME OFFSET(2) NUMBITS(1) [],
        // Asynchronous mode extended base clock select (12x base clock)
        ABCSE OFFSET(3) NUMBITS(1) [],
        // Asynchronous mode base clock select (8x instead of 16x)
        ABCS OFFSET(4) NUMBITS(1) [],
        // Digital noise filter enable
        NFEN OFFSET(5) NUMBITS(1) [],
        // Baud rate generator double-speed mode
        BGDM OFFSET(6) NUMBITS(1) [],
        // Asynchronous start bit edge detection (1 = falling edge of RXD)
        RXDESEL OFFSET(7) NUMBITS(1) [],
    ],
    pub SNFR [
        // Noise filter clock select (divider)
        NFCS OFFSET(0) NUMBITS(3) [],
    ],
    pub SPMR [
        // Slave select enable
        SSE OFFSET(0) NUMBITS(1) [],
        // CTS enable
        CTSE OFFSET(1) NUMBITS(1) [],
        // Master slave select (0 = master)
        MSS OFFSET(2) NUMBITS(1) [],
        // Mode fault flag
        MFF OFFSET(4) NUMBITS(1) [],
        // Clock polarity (1 = inverted)
        CKPOL OFFSET(6) NUMBITS(1) [],
        // Clock phase (1 = delayed)
        CKPH OFFSET(7) NUMBITS(1) [],
    ],
    pub DCCR [
        // Data compare match flag
        DCMF OFFSET(0) NUMBITS(1) [],
        // Data compare match parity error flag
        DPER OFFSET(3) NUMBITS(1) [],
        // Data compare match framing error flag
        DFER OFFSET(4) NUMBITS(1) [],
        // ID frame select
        IDSEL OFFSET(6) NUMBITS(1) [],
        // Data compare match enable
        DCME OFFSET(7) NUMBITS(1) [],
    ],
    pub SPTR [
        // Serial input data monitor / break output data
        SPB2DT OFFSET(0) NUMBITS(1) [],
        // Serial port break output enable
        SPB2IO OFFSET(1) NUMBITS(1) [],
        // RXD inversion
        RINV OFFSET(4) NUMBITS(1) [],
        // TXD inversion
        TINV OFFSET(5) NUMBITS(1) [],
        // Receive sampling timing adjust enable
        RTADJ OFFSET(6) NUMBITS(1) [],
        // Transmit timing adjust enable
        TTADJ OFFSET(7) NUMBITS(1) [],
    ],
    pub TMGR [
        // Receive sampling timing adjust value
        RTMG OFFSET(0) NUMBITS(4) [],
        // Transmit timing adjust value
        TTMG OFFSET(4) NUMBITS(4) [],
    ],
];

register_bitfields![u16,
    pub CDR [
        // Compare match data
        CMPD OFFSET(0) NUMBITS(9) [],
    ],
];
