// EnvStation — I2C Bus Interface
//
// Timed read/write transactions against fixed-address peripherals.  The
// firmware implements this over the ESP-IDF I2C driver; tests use `MockBus`.

use core::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    /// Device did not acknowledge its address.
    Nack,
    /// Transaction did not complete before its timeout.
    Timeout,
    /// Fewer bytes than requested were transferred.
    Short { expected: usize, actual: usize },
    /// Any other controller-level failure.
    Bus,
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nack => write!(f, "no acknowledge"),
            Self::Timeout => write!(f, "timeout"),
            Self::Short { expected, actual } => {
                write!(f, "short transfer ({} of {} bytes)", actual, expected)
            }
            Self::Bus => write!(f, "bus error"),
        }
    }
}

impl std::error::Error for BusError {}

/// A bus whose transactions fail closed after a hard timeout.
pub trait I2cBus {
    /// Write `bytes` to `addr`, returning the number of bytes accepted.
    fn write(&mut self, addr: u8, bytes: &[u8], timeout: Duration) -> Result<usize, BusError>;

    /// Read into `buf` from `addr`, returning the number of bytes received.
    fn read(&mut self, addr: u8, buf: &mut [u8], timeout: Duration) -> Result<usize, BusError>;

    /// Write, treating anything short of the full length as failure.
    fn write_all(&mut self, addr: u8, bytes: &[u8], timeout: Duration) -> Result<(), BusError> {
        let actual = self.write(addr, bytes, timeout)?;
        check_len(bytes.len(), actual)
    }

    /// Read, treating anything short of the full buffer as failure.
    fn read_exact(&mut self, addr: u8, buf: &mut [u8], timeout: Duration) -> Result<(), BusError> {
        let actual = self.read(addr, buf, timeout)?;
        check_len(buf.len(), actual)
    }

    /// Register-pointer write followed by a read of `buf.len()` bytes.
    fn write_read(
        &mut self,
        addr: u8,
        bytes: &[u8],
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<(), BusError> {
        self.write_all(addr, bytes, timeout)?;
        self.read_exact(addr, buf, timeout)
    }
}

impl<B: I2cBus + ?Sized> I2cBus for &mut B {
    fn write(&mut self, addr: u8, bytes: &[u8], timeout: Duration) -> Result<usize, BusError> {
        (**self).write(addr, bytes, timeout)
    }

    fn read(&mut self, addr: u8, buf: &mut [u8], timeout: Duration) -> Result<usize, BusError> {
        (**self).read(addr, buf, timeout)
    }

    fn write_read(
        &mut self,
        addr: u8,
        bytes: &[u8],
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<(), BusError> {
        (**self).write_read(addr, bytes, buf, timeout)
    }
}

fn check_len(expected: usize, actual: usize) -> Result<(), BusError> {
    if actual == expected {
        Ok(())
    } else {
        Err(BusError::Short { expected, actual })
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use std::collections::{HashMap, HashSet, VecDeque};

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Transaction {
        Write { addr: u8, data: Vec<u8> },
        Read { addr: u8, len: usize },
    }

    /// Records every transaction and replays scripted read data per address.
    /// Reads with nothing scripted NACK, as an absent device would.
    #[derive(Debug, Default)]
    pub struct MockBus {
        pub transactions: Vec<Transaction>,
        reads: HashMap<u8, VecDeque<Result<Vec<u8>, BusError>>>,
        absent: HashSet<u8>,
    }

    impl MockBus {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn queue_read(&mut self, addr: u8, data: &[u8]) {
            self.reads.entry(addr).or_default().push_back(Ok(data.to_vec()));
        }

        pub fn queue_read_error(&mut self, addr: u8, err: BusError) {
            self.reads.entry(addr).or_default().push_back(Err(err));
        }

        /// Make every write to `addr` NACK.
        pub fn mark_absent(&mut self, addr: u8) {
            self.absent.insert(addr);
        }

        pub fn writes_to(&self, addr: u8) -> Vec<Vec<u8>> {
            self.transactions
                .iter()
                .filter_map(|t| match t {
                    Transaction::Write { addr: a, data } if *a == addr => Some(data.clone()),
                    _ => None,
                })
                .collect()
        }
    }

    impl I2cBus for MockBus {
        fn write(&mut self, addr: u8, bytes: &[u8], _timeout: Duration) -> Result<usize, BusError> {
            self.transactions.push(Transaction::Write {
                addr,
                data: bytes.to_vec(),
            });
            if self.absent.contains(&addr) {
                return Err(BusError::Nack);
            }
            Ok(bytes.len())
        }

        fn read(&mut self, addr: u8, buf: &mut [u8], _timeout: Duration) -> Result<usize, BusError> {
            self.transactions.push(Transaction::Read {
                addr,
                len: buf.len(),
            });
            match self.reads.get_mut(&addr).and_then(VecDeque::pop_front) {
                Some(Ok(data)) => {
                    let n = data.len().min(buf.len());
                    buf[..n].copy_from_slice(&data[..n]);
                    Ok(n)
                }
                Some(Err(err)) => Err(err),
                None => Err(BusError::Nack),
            }
        }
    }
}
