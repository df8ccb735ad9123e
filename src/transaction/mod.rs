//! Buffered transactions in the style of the Arduino `Wire` library.
//!
//! `begin_transmission` / `write` / `end_transmission` queue bytes and send
//! them in one write transfer; `request_from` reads a number of bytes into
//! the receive buffer, drained with `available` / `read` / `peek`. Ending
//! either one without a STOP makes the next one open with a repeated START.

mod buffer;

pub use self::buffer::ByteBuffer;

use std::fmt;

use address;
use bit_layer::{Mode, SoftWire, Status};
use lines::LineInterface;

pub const DEFAULT_BUFFER_CAPACITY: usize = 32;

/// Result of `end_transmission`, numbered like Wire's return codes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TransmissionStatus {
    Success = 0,
    AddressNack = 2,
    DataNack = 3,
    Other = 4,
}

impl TransmissionStatus {
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for TransmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match *self {
            TransmissionStatus::Success => "success",
            TransmissionStatus::AddressNack => "address not acknowledged",
            TransmissionStatus::DataNack => "data not acknowledged",
            TransmissionStatus::Other => "bus error",
        })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Transmitting,
    Receiving,
}

#[derive(Debug)]
pub struct Transaction {
    phase: Phase,
    address: u8,
    mode: Mode,
    stop_deferred: bool,
    tx: ByteBuffer,
    rx: ByteBuffer,
}

impl Transaction {
    pub fn new() -> Self {
        Transaction::with_capacities(DEFAULT_BUFFER_CAPACITY, DEFAULT_BUFFER_CAPACITY)
    }

    pub fn with_capacities(tx_capacity: usize, rx_capacity: usize) -> Self {
        Transaction {
            phase: Phase::Idle,
            address: 0,
            mode: Mode::Write,
            stop_deferred: false,
            tx: ByteBuffer::new(tx_capacity),
            rx: ByteBuffer::new(rx_capacity),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Whether the last transfer ended without a STOP.
    pub fn stop_deferred(&self) -> bool {
        self.stop_deferred
    }

    pub fn tx_capacity(&self) -> usize {
        self.tx.capacity()
    }

    pub fn rx_capacity(&self) -> usize {
        self.rx.capacity()
    }

    /// Bytes queued for the transmission in progress.
    pub fn pending(&self) -> &[u8] {
        self.tx.as_slice()
    }
}

impl Default for Transaction {
    fn default() -> Self {
        Transaction::new()
    }
}

impl<L> SoftWire<L> where L: LineInterface {
    pub fn transaction(&self) -> &Transaction {
        &self.transaction
    }

    /// Resizes the transmit buffer, dropping anything queued.
    pub fn set_tx_buffer_capacity(&mut self, capacity: usize) {
        self.transaction.tx = ByteBuffer::new(capacity);
    }

    /// Resizes the receive buffer, dropping anything unread.
    pub fn set_rx_buffer_capacity(&mut self, capacity: usize) {
        self.transaction.rx = ByteBuffer::new(capacity);
    }

    /// Starts queueing a write to `address`.
    pub fn begin_transmission(&mut self, address: u8) {
        trace!("Begin transmission to {:#04x}", address);
        let transaction = &mut self.transaction;
        transaction.phase = Phase::Transmitting;
        transaction.address = address;
        transaction.mode = Mode::Write;
        transaction.tx.clear();
    }

    /// Queues one byte; returns how many bytes were queued (0 or 1).
    pub fn write(&mut self, data: u8) -> usize {
        if self.transaction.phase != Phase::Transmitting {
            warn!("Write of {:#04x} outside of a transmission dropped", data);
            return 0;
        }

        if self.transaction.tx.push(data) {
            1
        } else {
            warn!("Transmit buffer full ({} bytes), {:#04x} dropped",
                  self.transaction.tx.capacity(), data);
            0
        }
    }

    /// Queues as many of `data` as fit; returns how many were queued.
    pub fn write_bytes(&mut self, data: &[u8]) -> usize {
        let mut queued = 0;
        for &byte in data {
            if self.write(byte) == 0 {
                break;
            }
            queued += 1;
        }
        queued
    }

    /// Sends the queued bytes, ending with a STOP when `send_stop`.
    ///
    /// Without the STOP the bus is kept, and the next transfer starts with a
    /// repeated START.
    pub fn end_transmission(&mut self, send_stop: bool) -> TransmissionStatus {
        if self.transaction.phase != Phase::Transmitting {
            warn!("end_transmission without begin_transmission");
            return TransmissionStatus::Other;
        }

        let status = self.send_queued();
        match status {
            // the bus was already reset
            TransmissionStatus::Other => self.transaction.stop_deferred = false,
            _ => self.finish(send_stop),
        }

        self.transaction.phase = Phase::Idle;
        debug!("Transmission to {:#04x} ({} bytes): {}",
               self.transaction.address, self.transaction.tx.len(), status);
        status
    }

    /// Reads `quantity` bytes from `address` into the receive buffer.
    ///
    /// Every byte but the last is acknowledged. Returns the number of bytes
    /// received, which is short when the address is not acknowledged, the
    /// bus times out, or the receive buffer is smaller than `quantity`.
    /// Nothing is addressed when no byte would be read; a held bus is only
    /// released if `send_stop` asks for it.
    pub fn request_from(&mut self, address: u8, quantity: usize, send_stop: bool) -> usize {
        {
            let transaction = &mut self.transaction;
            transaction.phase = Phase::Receiving;
            transaction.address = address;
            transaction.mode = Mode::Read;
            transaction.rx.clear();
        }

        if quantity > self.transaction.rx.capacity() {
            warn!("Requested {} bytes, receive buffer holds {}",
                  quantity, self.transaction.rx.capacity());
        }
        let quantity = quantity.min(self.transaction.rx.capacity());
        if quantity == 0 {
            debug!("Nothing to request from {:#04x}", address);
            if send_stop && self.transaction.stop_deferred {
                self.finish(true);
            }
            self.transaction.phase = Phase::Idle;
            return 0;
        }

        let mut status = self.open(address::raw_address(address, Mode::Read));
        if status.is_ack() {
            for i in 0..quantity {
                let mut byte = 0;
                status = self.ll_read(&mut byte, i + 1 != quantity);
                if !status.is_ack() {
                    break;
                }
                self.transaction.rx.push(byte);
            }
        }

        match status {
            Status::TimedOut => self.transaction.stop_deferred = false,
            _ => self.finish(send_stop),
        }

        self.transaction.phase = Phase::Idle;
        let received = self.transaction.rx.len();
        debug!("Requested {} bytes from {:#04x}, received {}", quantity, address, received);
        received
    }

    /// Received bytes not read yet.
    pub fn available(&self) -> usize {
        self.transaction.rx.remaining()
    }

    pub fn read(&mut self) -> Option<u8> {
        self.transaction.rx.pop()
    }

    pub fn peek(&self) -> Option<u8> {
        self.transaction.rx.peek()
    }

    fn send_queued(&mut self) -> TransmissionStatus {
        let raw_addr = address::raw_address(self.transaction.address, Mode::Write);

        match self.open(raw_addr) {
            Status::Ack => {}
            Status::Nack => return TransmissionStatus::AddressNack,
            Status::TimedOut => return TransmissionStatus::Other,
        }

        for i in 0..self.transaction.tx.len() {
            let byte = self.transaction.tx.as_slice()[i];
            match self.ll_write(byte) {
                Status::Ack => {}
                Status::Nack => return TransmissionStatus::DataNack,
                Status::TimedOut => return TransmissionStatus::Other,
            }
        }

        TransmissionStatus::Success
    }

    /// START, or repeated START when the previous transfer kept the bus.
    fn open(&mut self, raw_addr: u8) -> Status {
        if self.transaction.stop_deferred {
            self.ll_repeated_start(raw_addr)
        } else {
            self.ll_start(raw_addr)
        }
    }

    fn finish(&mut self, send_stop: bool) {
        if send_stop {
            let _ = self.stop(true);
        }
        self.transaction.stop_deferred = !send_stop;
    }
}
