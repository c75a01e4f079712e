// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! SCI channel driver: register programming and the interrupt-driven
//! transfer engine.
//!
//! One [`Sci`] instance owns one hardware channel. State lives in `Cell`s
//! because the driver is shared between the application call stack and the
//! channel's interrupt handlers; operations that mutate state both sides
//! touch mask the relevant interrupt source for their duration.
//!
//! Register mutations that affect transfer timing or framing are only legal
//! while the transceiver is disabled. [`Sci::with_transceiver_disabled`] is
//! the one primitive that encodes the disable / dummy-read / mutate /
//! clear-pending / re-enable sequence; everything that reconfigures a live
//! channel goes through it.

use core::cell::Cell;

use serial_hil::serial::{
    Client, DmaChannel, Event, InterruptSource, Mode, Parameters, Parity, StopBits,
    TransferAssist, Width,
};
use serial_hil::utilities::byte_queue::ByteQueue;
use serial_hil::utilities::wait;
use serial_hil::ErrorCode;
use tock_registers::interfaces::{ReadWriteable, Readable, Writeable};

use crate::baud;
use crate::channel::{ChannelDescriptor, Config};
use crate::registers::{DCCR, SCMR, SCR, SEMR, SMR, SPMR, SPTR, SSR, TMGR};

/// Byte clocked out on the bus when a synchronous transfer only receives.
const DUMMY_TX_BYTE: u8 = 0xFF;

/// Poll bound while forcing the transmit/receive enables clear at bring-up.
const ENABLE_CLEAR_RETRIES: u32 = 1_000;

/// Poll bound on the transmit-end flag during break generation. A break
/// frame at the slowed rate is a handful of bit times; this is orders of
/// magnitude more polls than that.
pub(crate) const TRANSMIT_END_RETRIES: u32 = 1_000_000;

pub struct Sci<'a> {
    rom: ChannelDescriptor<'a>,
    config: Config,
    mode: Cell<Mode>,
    baud_rate: Cell<u32>,
    tx_idle: Cell<bool>,
    // Synchronous engine: bytes left to load, bytes left to exchange.
    tx_count: Cell<usize>,
    rx_count: Cell<usize>,
    tx_dummy: Cell<bool>,
    store_rx: Cell<bool>,
    client: Cell<Option<&'a dyn Client>>,
    tx_queue: ByteQueue<'a>,
    rx_queue: ByteQueue<'a>,
    tx_dma: Cell<Option<&'a dyn DmaChannel>>,
    rx_dma: Cell<Option<&'a dyn DmaChannel>>,
    dma_tx_count: Cell<usize>,
    dma_rx_count: Cell<usize>,
}

impl<'a> Sci<'a> {
    /// Build a driver for the channel described by `rom`. The queue rings
    /// are caller-provided; a ring of `N` cells queues `N - 1` bytes.
    pub fn new(
        rom: ChannelDescriptor<'a>,
        config: Config,
        tx_ring: &'a [Cell<u8>],
        rx_ring: &'a [Cell<u8>],
    ) -> Sci<'a> {
        Sci {
            rom,
            config,
            mode: Cell::new(Mode::Off),
            baud_rate: Cell::new(0),
            tx_idle: Cell::new(true),
            tx_count: Cell::new(0),
            rx_count: Cell::new(0),
            tx_dummy: Cell::new(false),
            store_rx: Cell::new(false),
            client: Cell::new(None),
            tx_queue: ByteQueue::new(tx_ring),
            rx_queue: ByteQueue::new(rx_ring),
            tx_dma: Cell::new(None),
            rx_dma: Cell::new(None),
            dma_tx_count: Cell::new(0),
            dma_rx_count: Cell::new(0),
        }
    }

    pub fn channel(&self) -> u8 {
        self.rom.channel
    }

    pub fn mode(&self) -> Mode {
        self.mode.get()
    }

    pub fn baud_rate(&self) -> u32 {
        self.baud_rate.get()
    }

    pub fn is_tx_idle(&self) -> bool {
        self.tx_idle.get()
    }

    pub fn set_client(&self, client: &'a dyn Client) {
        self.client.set(Some(client));
    }

    /// Wire the DMA/descriptor-table channels for directions configured with
    /// a [`TransferAssist`] other than `Interrupt`.
    pub fn set_dma_channels(
        &self,
        tx: Option<&'a dyn DmaChannel>,
        rx: Option<&'a dyn DmaChannel>,
    ) {
        self.tx_dma.set(tx);
        self.rx_dma.set(rx);
    }

    /// Bytes that can be queued for transmit right now.
    pub fn tx_queue_free(&self) -> usize {
        self.tx_queue.free()
    }

    /// Bytes waiting in the receive queue.
    pub fn rx_queue_used(&self) -> usize {
        self.rx_queue.used()
    }

    fn notify(&self, event: Event) {
        if let Some(client) = self.client.get() {
            client.event(self.rom.channel, event);
        }
    }

    /// Open the channel in `mode`. Fails without touching the hardware if
    /// the configuration is invalid; fails with the clock re-gated if
    /// bring-up cannot complete.
    pub fn open(&self, mode: Mode, params: Parameters) -> Result<(), ErrorCode> {
        if mode == Mode::Off {
            return Err(ErrorCode::InvalidArgument);
        }
        if self.mode.get() != Mode::Off {
            return Err(ErrorCode::AlreadyOpen);
        }
        if self.config.parameter_checking {
            if !(1..=15).contains(&self.config.priority)
                || !(1..=15).contains(&self.config.eri_tei_priority)
            {
                return Err(ErrorCode::InvalidArgument);
            }
            if params.width == Width::Nine && params.parity != Parity::None {
                return Err(ErrorCode::InvalidArgument);
            }
        }

        self.rom.clock.enable();
        if let Err(e) = self.bring_up(mode, params) {
            self.rom.clock.disable();
            return Err(e);
        }

        self.tx_queue.flush();
        self.rx_queue.flush();
        self.tx_idle.set(true);
        self.mode.set(mode);
        #[cfg(feature = "defmt")]
        defmt::trace!("SCI{=u8}: opened, mode {}", self.rom.channel, mode);
        Ok(())
    }

    fn bring_up(&self, mode: Mode, params: Parameters) -> Result<(), ErrorCode> {
        self.init_registers()?;

        let regs = self.rom.regs;
        match mode {
            Mode::Asynchronous => {
                match params.width {
                    Width::Seven => {
                        regs.smr.modify(SMR::CHR::SET);
                        regs.scmr.modify(SCMR::CHR1::SET);
                    }
                    Width::Eight => {
                        regs.smr.modify(SMR::CHR::CLEAR);
                        regs.scmr.modify(SCMR::CHR1::SET);
                    }
                    Width::Nine => {
                        regs.smr.modify(SMR::CHR::CLEAR);
                        regs.scmr.modify(SCMR::CHR1::CLEAR);
                    }
                }
                if params.parity != Parity::None {
                    regs.smr.modify(SMR::PE::SET);
                    regs.smr
                        .modify(SMR::PM.val((params.parity == Parity::Odd) as u8));
                }
                if params.stop_bits == StopBits::Two {
                    regs.smr.modify(SMR::STOP::SET);
                }
                if params.cts_enable {
                    regs.spmr.modify(SPMR::CTSE::SET);
                }
            }
            Mode::Synchronous | Mode::SimpleSpi => {
                regs.smr.modify(SMR::CM::SET);
            }
            Mode::Off => {}
        }

        self.program_bit_rate(mode, self.config.pclk_hz, self.config.baud_rate)?;
        self.baud_rate.set(self.config.baud_rate);

        self.initialize_interrupts();
        Ok(())
    }

    /// Bring every channel register to its reset value.
    ///
    /// A previously requested disable may not have taken effect yet when
    /// re-initialization starts, so first force the transmit and receive
    /// enables clear and wait until hardware reports both down.
    fn init_registers(&self) -> Result<(), ErrorCode> {
        let regs = self.rom.regs;

        wait::spin_until(ENABLE_CLEAR_RETRIES, || {
            if regs.scr.is_set(SCR::TE) {
                regs.scr.modify(SCR::TE::CLEAR);
            }
            if regs.scr.is_set(SCR::RE) {
                regs.scr.modify(SCR::RE::CLEAR);
            }
            !regs.scr.is_set(SCR::TE) && !regs.scr.is_set(SCR::RE)
        })?;

        regs.smr.set(0x00);
        regs.scr.set(0x00);

        // Error flags clear by writing 0 after reading 1.
        if regs.ssr.is_set(SSR::ORER) {
            regs.ssr.modify(SSR::ORER::CLEAR);
        }
        if regs.ssr.is_set(SSR::PER) {
            regs.ssr.modify(SSR::PER::CLEAR);
        }
        if regs.ssr.is_set(SSR::FER) {
            regs.ssr.modify(SSR::FER::CLEAR);
        }

        regs.scmr
            .modify(SCMR::SMIF::CLEAR + SCMR::SINV::CLEAR + SCMR::SDIR::CLEAR);
        regs.sptr.modify(
            SPTR::SPB2DT::CLEAR
                + SPTR::SPB2IO::CLEAR
                + SPTR::RINV::CLEAR
                + SPTR::TINV::CLEAR
                + SPTR::RTADJ::CLEAR
                + SPTR::TTADJ::CLEAR,
        );
        regs.tmgr.set(0x00);
        regs.brr.set(0xFF);
        regs.semr.modify(
            SEMR::BRME::CLEAR
                + SEMR::ABCS::CLEAR
                + SEMR::ABCSE::CLEAR
                + SEMR::NFEN::CLEAR
                + SEMR::BGDM::CLEAR
                + SEMR::RXDESEL::CLEAR,
        );
        regs.snfr.set(0x00);
        regs.spmr
            .modify(SPMR::CTSE::CLEAR + SPMR::CKPOL::CLEAR + SPMR::CKPH::CLEAR);
        regs.dccr.modify(
            DCCR::DCME::CLEAR
                + DCCR::DCMF::CLEAR
                + DCCR::DFER::CLEAR
                + DCCR::DPER::CLEAR
                + DCCR::IDSEL::CLEAR,
        );
        regs.cdr.set(0);

        // Receive defaults to 8-bit characters.
        regs.smr.modify(SMR::CHR::CLEAR);
        regs.scmr.modify(SCMR::CHR1::SET);

        Ok(())
    }

    /// Compute and apply the bit rate registers. The transceiver must be
    /// disabled. Returns the bit rate error in tenths of a percent.
    pub(crate) fn program_bit_rate(
        &self,
        mode: Mode,
        pclk_hz: u32,
        baud: u32,
    ) -> Result<i32, ErrorCode> {
        let (settings, bit_err) =
            baud::compute_bit_rate(mode, self.rom.has_abcse, pclk_hz, baud)?;
        let regs = self.rom.regs;
        regs.brr.set(settings.brr);
        regs.semr.modify(
            SEMR::ABCS.val(settings.abcs as u8)
                + SEMR::BGDM.val(settings.bgdm as u8)
                + SEMR::ABCSE.val(settings.abcse as u8)
                + SEMR::BRME.val(settings.brme as u8),
        );
        regs.smr.modify(SMR::CKS.val(settings.cks));
        if settings.brme {
            regs.mddr.set(settings.mddr);
        }
        Ok(bit_err)
    }

    /// Run `f` with the transceiver and its interrupt enables off.
    ///
    /// This is the reconfiguration protocol: disable, dummy-read the control
    /// register (flushes a pending completion flag so no stale interrupt
    /// fires after re-enable), mutate, clear the pending transmit interrupt,
    /// re-enable.
    pub(crate) fn with_transceiver_disabled<R>(&self, f: impl FnOnce() -> R) -> R {
        let regs = self.rom.regs;
        regs.scr
            .modify(SCR::TIE::CLEAR + SCR::RIE::CLEAR + SCR::TE::CLEAR + SCR::RE::CLEAR);
        let _ = regs.scr.get();

        let result = f();

        self.rom.icu.clear_pending(InterruptSource::Transmit);
        regs.scr
            .modify(SCR::TIE::SET + SCR::RIE::SET + SCR::TE::SET + SCR::RE::SET);
        result
    }

    fn initialize_interrupts(&self) {
        let icu = self.rom.icu;

        icu.set_priority(InterruptSource::Receive, self.config.priority);
        icu.set_priority(InterruptSource::Transmit, self.config.priority);

        // The group interrupt serving ERI/TEI must never sit below the
        // member priority, or the members silently never fire.
        let group_priority = if self.config.eri_tei_priority > icu.group_priority() {
            self.config.eri_tei_priority
        } else {
            0
        };

        icu.disable(InterruptSource::Error);
        icu.disable(InterruptSource::Receive);
        icu.disable(InterruptSource::Transmit);
        icu.disable(InterruptSource::TransmitEnd);

        icu.clear_pending(InterruptSource::Receive);
        icu.clear_pending(InterruptSource::Transmit);

        icu.enable_group(group_priority);

        icu.enable(InterruptSource::Error);
        icu.enable(InterruptSource::Receive);

        // Enable peripheral interrupts together with the transceiver, as a
        // single write; enabling them after the transceiver is live costs a
        // spurious transmit interrupt.
        self.rom
            .regs
            .scr
            .modify(SCR::TIE::SET + SCR::RIE::SET + SCR::TE::SET + SCR::RE::SET);
    }

    fn disable_interrupts(&self) {
        let icu = self.rom.icu;
        icu.disable(InterruptSource::Receive);
        icu.disable(InterruptSource::Transmit);
        icu.disable(InterruptSource::Error);
        icu.disable(InterruptSource::TransmitEnd);

        // Stops transmission and reception instantly.
        self.rom.regs.scr.set(0x00);

        icu.disable_group();
    }

    /// Close the channel. Safe to call repeatedly; the channel ends in
    /// `Off` either way.
    pub fn close(&self) {
        self.disable_interrupts();

        if let Some(dma) = self.tx_dma.get() {
            dma.disable_source();
            dma.close();
        }
        if let Some(dma) = self.rx_dma.get() {
            dma.disable_source();
            dma.close();
        }
        self.dma_tx_count.set(0);
        self.dma_rx_count.set(0);

        self.tx_count.set(0);
        self.rx_count.set(0);
        self.tx_dummy.set(false);
        self.store_rx.set(false);
        self.tx_queue.flush();
        self.rx_queue.flush();
        self.tx_idle.set(true);

        if self.rom.clock.is_enabled() {
            self.rom.clock.disable();
        }
        self.mode.set(Mode::Off);
        #[cfg(feature = "defmt")]
        defmt::trace!("SCI{=u8}: closed", self.rom.channel);
    }

    /// Queue `data` for transmission (asynchronous mode) or run a
    /// transmit-only synchronous transfer. All-or-nothing: a transmit queue
    /// without room for every byte fails with `QueueFull` and is left
    /// untouched.
    pub fn send(&self, data: &[u8]) -> Result<(), ErrorCode> {
        match self.mode.get() {
            Mode::Off => Err(ErrorCode::NotOpen),
            Mode::Asynchronous => {
                if self.config.parameter_checking && data.is_empty() {
                    return Err(ErrorCode::InvalidArgument);
                }
                if data.is_empty() {
                    return Ok(());
                }
                if self.config.tx_assist != TransferAssist::Interrupt {
                    return Err(ErrorCode::InvalidArgument);
                }
                self.send_async(data)
            }
            Mode::Synchronous | Mode::SimpleSpi => self.start_sync_transfer(data, 0, false),
        }
    }

    fn send_async(&self, data: &[u8]) -> Result<(), ErrorCode> {
        let icu = self.rom.icu;

        icu.disable(InterruptSource::Transmit);
        let result = if self.tx_queue.free() < data.len() {
            Err(ErrorCode::QueueFull)
        } else {
            for byte in data.iter() {
                let _ = self.tx_queue.enqueue(*byte);
            }
            Ok(())
        };
        icu.enable(InterruptSource::Transmit);

        if result.is_ok() && self.tx_idle.get() {
            self.kick_transmit();
        }
        result
    }

    fn kick_transmit(&self) {
        self.tx_idle.set(false);
        if let Some(byte) = self.tx_queue.dequeue() {
            self.rom.regs.tdr.set(byte);
        }
        self.rom.regs.scr.modify(SCR::TEIE::SET);
    }

    /// Full-duplex synchronous/SPI master transfer: clock `data` out and
    /// store the exchanged bytes in the receive queue.
    pub fn send_receive(&self, data: &[u8]) -> Result<(), ErrorCode> {
        match self.mode.get() {
            Mode::Off => Err(ErrorCode::NotOpen),
            Mode::Asynchronous => Err(ErrorCode::InvalidArgument),
            Mode::Synchronous | Mode::SimpleSpi => self.start_sync_transfer(data, 0, true),
        }
    }

    /// Receive-only synchronous/SPI transfer of `len` bytes, clocked by
    /// dummy transmission.
    pub fn start_receive(&self, len: usize) -> Result<(), ErrorCode> {
        match self.mode.get() {
            Mode::Off => Err(ErrorCode::NotOpen),
            Mode::Asynchronous => Err(ErrorCode::InvalidArgument),
            Mode::Synchronous | Mode::SimpleSpi => self.start_sync_transfer(&[], len, true),
        }
    }

    /// `data` drives the bus unless empty, in which case `dummy_len` dummy
    /// bytes do.
    fn start_sync_transfer(
        &self,
        data: &[u8],
        dummy_len: usize,
        store_rx: bool,
    ) -> Result<(), ErrorCode> {
        let len = if data.is_empty() { dummy_len } else { data.len() };
        if len == 0 {
            return Err(ErrorCode::InvalidArgument);
        }
        if !self.tx_idle.get() {
            return Err(ErrorCode::TransferBusy);
        }
        if store_rx && self.rx_queue.free() < len {
            return Err(ErrorCode::QueueFull);
        }

        if !data.is_empty() {
            let icu = self.rom.icu;
            icu.disable(InterruptSource::Transmit);
            let fits = self.tx_queue.free() >= data.len();
            if fits {
                for byte in data.iter() {
                    let _ = self.tx_queue.enqueue(*byte);
                }
            }
            icu.enable(InterruptSource::Transmit);
            if !fits {
                return Err(ErrorCode::QueueFull);
            }
        }

        self.tx_dummy.set(data.is_empty());
        self.store_rx.set(store_rx);
        self.tx_idle.set(false);
        self.tx_count.set(len - 1);
        self.rx_count.set(len);

        let first = self.next_sync_byte();
        self.rom.regs.tdr.set(first);
        Ok(())
    }

    fn next_sync_byte(&self) -> u8 {
        if self.tx_dummy.get() {
            DUMMY_TX_BYTE
        } else {
            self.tx_queue.dequeue().unwrap_or(DUMMY_TX_BYTE)
        }
    }

    /// Drain up to `dst.len()` received bytes. Fails with `QueueEmpty`,
    /// reading nothing, if fewer bytes are queued than requested.
    pub fn receive(&self, dst: &mut [u8]) -> Result<(), ErrorCode> {
        if self.mode.get() == Mode::Off {
            return Err(ErrorCode::NotOpen);
        }
        if self.config.parameter_checking && dst.is_empty() {
            return Err(ErrorCode::InvalidArgument);
        }

        let icu = self.rom.icu;
        icu.disable(InterruptSource::Receive);
        let result = if self.rx_queue.used() < dst.len() {
            Err(ErrorCode::QueueEmpty)
        } else {
            for slot in dst.iter_mut() {
                // Occupancy was checked above with receive masked.
                if let Some(byte) = self.rx_queue.dequeue() {
                    *slot = byte;
                }
            }
            Ok(())
        };
        icu.enable(InterruptSource::Receive);
        result
    }

    /// Hand `buffer` to the transmit DMA/descriptor-table controller.
    pub fn send_dma(&self, buffer: &'static mut [u8], len: usize) -> Result<(), ErrorCode> {
        if self.mode.get() == Mode::Off {
            return Err(ErrorCode::NotOpen);
        }
        if self.config.tx_assist == TransferAssist::Interrupt {
            return Err(ErrorCode::InvalidArgument);
        }
        if self.config.parameter_checking && (len == 0 || len > buffer.len()) {
            return Err(ErrorCode::InvalidArgument);
        }
        let dma = self.tx_dma.get().ok_or(ErrorCode::InvalidArgument)?;
        if !self.tx_idle.get() || self.dma_tx_count.get() != 0 {
            return Err(ErrorCode::TransferBusy);
        }

        self.tx_idle.set(false);
        self.dma_tx_count.set(len);
        dma.enable_source();
        dma.start(buffer, len);
        Ok(())
    }

    /// Hand `buffer` to the receive DMA/descriptor-table controller.
    pub fn receive_dma(&self, buffer: &'static mut [u8], len: usize) -> Result<(), ErrorCode> {
        if self.mode.get() == Mode::Off {
            return Err(ErrorCode::NotOpen);
        }
        if self.config.rx_assist == TransferAssist::Interrupt {
            return Err(ErrorCode::InvalidArgument);
        }
        if self.config.parameter_checking && (len == 0 || len > buffer.len()) {
            return Err(ErrorCode::InvalidArgument);
        }
        let dma = self.rx_dma.get().ok_or(ErrorCode::InvalidArgument)?;
        if self.dma_rx_count.get() != 0 {
            return Err(ErrorCode::TransferBusy);
        }

        self.dma_rx_count.set(len);
        dma.enable_source();
        dma.start(buffer, len);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Interrupt handlers. These run in interrupt context via
    // `SciRegistry::dispatch` and must not block.
    // ------------------------------------------------------------------

    /// Receive data register full.
    pub fn handle_rxi(&self) {
        let regs = self.rom.regs;

        if self.config.rx_assist != TransferAssist::Interrupt {
            if self.dma_rx_count.get() != 0 {
                self.dma_rx_count.set(0);
                if let Some(dma) = self.rx_dma.get() {
                    dma.disable_source();
                }
                self.notify(Event::ReceiveDone);
            }
            return;
        }

        let byte = regs.rdr.get();
        match self.mode.get() {
            Mode::Asynchronous => {
                if self.rx_queue.enqueue(byte) {
                    self.notify(Event::ReceivedCharacter(byte));
                } else {
                    self.notify(Event::ReceiveQueueFull(byte));
                }
            }
            Mode::Synchronous | Mode::SimpleSpi => {
                if self.store_rx.get() && !self.rx_queue.enqueue(byte) {
                    self.notify(Event::ReceiveQueueFull(byte));
                }
                if self.rx_count.get() > 0 {
                    self.rx_count.set(self.rx_count.get() - 1);
                }
                if self.tx_count.get() > 0 {
                    self.tx_count.set(self.tx_count.get() - 1);
                    let next = self.next_sync_byte();
                    regs.tdr.set(next);
                } else if self.rx_count.get() == 0 && !self.tx_idle.get() {
                    self.tx_idle.set(true);
                    self.store_rx.set(false);
                    self.tx_dummy.set(false);
                    self.notify(Event::TransferDone);
                }
            }
            Mode::Off => {}
        }
    }

    /// Transmit data register empty.
    pub fn handle_txi(&self) {
        let regs = self.rom.regs;

        if self.config.tx_assist != TransferAssist::Interrupt {
            if self.dma_tx_count.get() != 0 {
                // The controller finished its descriptors; let the transmit
                // end interrupt close the transfer out once the shifter
                // drains.
                self.dma_tx_count.set(0);
                if let Some(dma) = self.tx_dma.get() {
                    dma.disable_source();
                }
                regs.scr.modify(SCR::TEIE::SET);
            }
            return;
        }

        if self.mode.get() == Mode::Asynchronous {
            if let Some(byte) = self.tx_queue.dequeue() {
                regs.tdr.set(byte);
            }
            // Queue drained: the transmit end interrupt completes the
            // transfer.
        }
    }

    /// Transmit end: the queue drained and the last frame left the shifter.
    pub fn handle_tei(&self) {
        let regs = self.rom.regs;

        if self.tx_idle.get() {
            return;
        }

        if let Some(byte) = self.tx_queue.dequeue() {
            // Bytes were queued between the last TXI and the end flag.
            regs.tdr.set(byte);
            return;
        }

        regs.scr.modify(SCR::TEIE::CLEAR);
        self.tx_idle.set(true);
        self.notify(Event::TransmitEnd);
    }

    /// Receive error: overrun, framing, or parity. Clears the responsible
    /// status bits and keeps the channel running; the event reaches the
    /// client if one is registered and is absorbed otherwise.
    pub fn handle_eri(&self) {
        let regs = self.rom.regs;

        if regs.ssr.is_set(SSR::ORER) {
            regs.ssr.modify(SSR::ORER::CLEAR);
            self.notify(Event::OverrunError);
        }
        if regs.ssr.is_set(SSR::FER) {
            let byte = regs.rdr.get();
            regs.ssr.modify(SSR::FER::CLEAR);
            self.notify(Event::FramingError(byte));
        }
        if regs.ssr.is_set(SSR::PER) {
            regs.ssr.modify(SSR::PER::CLEAR);
            self.notify(Event::ParityError);
        }

        // Drop whatever accompanied the error so reception continues.
        let _ = regs.rdr.get();
        #[cfg(feature = "defmt")]
        defmt::trace!("SCI{=u8}: receive error handled", self.rom.channel);
    }

    // ------------------------------------------------------------------
    // Command implementations, dispatched from `control`.
    // ------------------------------------------------------------------

    pub(crate) fn enable_noise_filter(&self) {
        let regs = self.rom.regs;
        self.with_transceiver_disabled(|| {
            regs.semr.modify(SEMR::NFEN::SET);
            // Filter clock divided by 1.
            regs.snfr.set(0x00);
        });
    }

    pub(crate) fn output_baud_clock(&self) {
        let regs = self.rom.regs;
        self.with_transceiver_disabled(|| {
            regs.scr.modify(SCR::CKE::InternalClockOutput);
        });
    }

    pub(crate) fn start_bit_edge_falling(&self) {
        let regs = self.rom.regs;
        self.with_transceiver_disabled(|| {
            regs.semr.modify(SEMR::RXDESEL::SET);
        });
    }

    pub(crate) fn flush_tx_queue(&self) {
        let icu = self.rom.icu;
        icu.disable(InterruptSource::Transmit);
        if self.config.tx_assist != TransferAssist::Interrupt {
            self.dma_tx_count.set(0);
            if let Some(dma) = self.tx_dma.get() {
                dma.disable_source();
            }
        }
        self.tx_queue.flush();
        icu.enable(InterruptSource::Transmit);

        // Reset the pending transmit interrupt so the next send kicks off
        // cleanly instead of waiting for an edge that already passed.
        self.with_transceiver_disabled(|| {});
    }

    pub(crate) fn flush_rx_queue(&self) {
        let icu = self.rom.icu;
        icu.disable(InterruptSource::Receive);
        self.rx_queue.flush();
        icu.enable(InterruptSource::Receive);
    }

    pub(crate) fn check_tx_done(&self) -> Result<(), ErrorCode> {
        if self.config.tx_assist != TransferAssist::Interrupt && !self.tx_idle.get() {
            return Err(ErrorCode::TransferBusy);
        }
        Ok(())
    }

    pub(crate) fn check_rx_done(&self) -> Result<(), ErrorCode> {
        if self.config.rx_assist != TransferAssist::Interrupt && self.dma_rx_count.get() != 0 {
            return Err(ErrorCode::TransferBusy);
        }
        Ok(())
    }

    pub(crate) fn check_transfer_done(&self) -> Result<(), ErrorCode> {
        if !self.tx_idle.get() {
            return Err(ErrorCode::TransferBusy);
        }
        Ok(())
    }

    /// Abort anything in flight, then slow the baud rate to two thirds,
    /// transmit one all-zero frame (reads as a break), wait for the
    /// transmit end flag, and restore the original rate.
    pub(crate) fn generate_break(&self) -> Result<(), ErrorCode> {
        let regs = self.rom.regs;
        let icu = self.rom.icu;

        icu.disable(InterruptSource::Transmit);
        self.tx_queue.flush();
        if self.config.tx_assist != TransferAssist::Interrupt {
            self.dma_tx_count.set(0);
            if let Some(dma) = self.tx_dma.get() {
                dma.disable_source();
            }
        }
        icu.enable(InterruptSource::Transmit);

        let mode = self.mode.get();
        let slow_baud = (self.baud_rate.get() << 1) / 3;
        let slowed = self
            .with_transceiver_disabled(|| self.program_bit_rate(mode, self.config.pclk_hz, slow_baud));
        if slowed.is_err() {
            // Nothing was reprogrammed; the channel still runs at the
            // original rate.
            return Err(ErrorCode::InvalidArgument);
        }

        regs.tdr.set(0x00);
        let waited = wait::spin_until(TRANSMIT_END_RETRIES, || regs.ssr.is_set(SSR::TEND));

        let _ = self
            .with_transceiver_disabled(|| {
                self.program_bit_rate(mode, self.config.pclk_hz, self.baud_rate.get())
            });
        waited
    }

    pub(crate) fn match_received_data(&self, byte: u8) {
        let regs = self.rom.regs;
        regs.dccr.modify(DCCR::DFER::CLEAR + DCCR::DPER::CLEAR);
        regs.dccr.modify(DCCR::DCME::SET);
        regs.cdr.set(byte as u16);
    }

    pub(crate) fn set_rx_sampling(&self, enable: bool) {
        self.rom
            .regs
            .sptr
            .modify(SPTR::RTADJ.val(enable as u8));
    }

    pub(crate) fn set_tx_timing(&self, enable: bool) {
        self.rom
            .regs
            .sptr
            .modify(SPTR::TTADJ.val(enable as u8));
    }

    /// Legal adjust values depend on the base clock configuration: a full
    /// 16-step range only exists at the 16x base clock.
    pub(crate) fn adjust_rx_sampling(&self, value: u8) -> Result<(), ErrorCode> {
        let regs = self.rom.regs;
        let abcse = regs.semr.is_set(SEMR::ABCSE);
        let abcs = regs.semr.is_set(SEMR::ABCS);

        let legal = if !abcse && !abcs {
            value <= 15
        } else if !abcse && abcs {
            value <= 3 || (8..=11).contains(&value)
        } else {
            value <= 2 || (8..=10).contains(&value)
        };
        if !legal {
            return Err(ErrorCode::InvalidArgument);
        }

        if regs.sptr.is_set(SPTR::RTADJ) {
            regs.tmgr.modify(TMGR::RTMG.val(value));
        }
        Ok(())
    }

    pub(crate) fn adjust_tx_transition(&self, value: u8) -> Result<(), ErrorCode> {
        let regs = self.rom.regs;
        let abcse = regs.semr.is_set(SEMR::ABCSE);

        let legal = if !abcse {
            value <= 15
        } else {
            value <= 5 || (8..=13).contains(&value)
        };
        if !legal {
            return Err(ErrorCode::InvalidArgument);
        }

        if regs.sptr.is_set(SPTR::TTADJ) {
            regs.tmgr.modify(TMGR::TTMG.val(value));
        }
        Ok(())
    }

    pub(crate) fn set_msb_first(&self, msb_first: bool) {
        let regs = self.rom.regs;
        self.with_transceiver_disabled(|| {
            regs.scmr.modify(SCMR::SDIR.val(msb_first as u8));
        });
    }

    pub(crate) fn invert_data(&self) {
        let regs = self.rom.regs;
        self.with_transceiver_disabled(|| {
            let inverted = regs.scmr.is_set(SCMR::SINV);
            regs.scmr.modify(SCMR::SINV.val(!inverted as u8));
        });
    }

    pub(crate) fn change_spi_mode(&self, ckpol: bool, ckph: bool) {
        let regs = self.rom.regs;
        self.with_transceiver_disabled(|| {
            regs.spmr
                .modify(SPMR::CKPOL.val(ckpol as u8) + SPMR::CKPH.val(ckph as u8));
        });
    }

    /// Stop everything in flight and return the channel to idle with empty
    /// queues. Always succeeds; the receive path comes back up enabled.
    pub(crate) fn abort_transfer(&self) {
        let regs = self.rom.regs;
        let icu = self.rom.icu;

        icu.disable(InterruptSource::Receive);
        icu.disable(InterruptSource::Error);

        let tx_assisted = self.config.tx_assist != TransferAssist::Interrupt;
        let rx_assisted = self.config.rx_assist != TransferAssist::Interrupt;
        if tx_assisted && rx_assisted {
            if let Some(dma) = self.tx_dma.get() {
                dma.disable_source();
                dma.close();
            }
            if let Some(dma) = self.rx_dma.get() {
                dma.disable_source();
                dma.close();
            }
        }
        self.dma_tx_count.set(0);
        self.dma_rx_count.set(0);

        regs.scr
            .modify(SCR::RIE::CLEAR + SCR::RE::CLEAR + SCR::TE::CLEAR);

        self.tx_count.set(0);
        self.rx_count.set(0);
        self.tx_dummy.set(false);
        self.store_rx.set(false);
        self.tx_queue.flush();
        self.rx_queue.flush();
        self.tx_idle.set(true);

        self.notify(Event::TransferAborted);

        icu.clear_pending(InterruptSource::Receive);
        icu.enable(InterruptSource::Error);
        icu.enable(InterruptSource::Receive);

        // Re-enable the receiver before its interrupt enable, or the first
        // frame raises a spurious duplicate interrupt.
        regs.scr.modify(SCR::RE::SET + SCR::TE::SET);
        regs.scr.modify(SCR::RIE::SET);
    }
}
