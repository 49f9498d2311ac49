// src/driver/reader.rs

use crate::common::{
    error::SensorError,
    hal_traits::SensorDevice,
    input::{RawEvent, RECORD_SIZE},
};
use heapless::Deque;
use log::warn;

/// Most records pulled from a device in one `fill`.
pub const MAX_BATCH: usize = 8;

/// Buffers a batch of input-event records from one device stream.
///
/// `read_event` peeks at the oldest buffered record and `next` consumes it,
/// so a caller that runs out of room can leave a record in place for the
/// next call.
#[derive(Debug)]
pub struct InputReader<const N: usize> {
    records: Deque<RawEvent, N>,
}

impl<const N: usize> InputReader<N> {
    pub fn new() -> Self {
        InputReader { records: Deque::new() }
    }

    /// Reads whatever the device has available into the free record space.
    ///
    /// Returns the number of records added. `WouldBlock` means the stream had
    /// nothing to offer; any other device failure is returned as `Io`.
    pub fn fill<D: SensorDevice>(&mut self, device: &mut D) -> Result<usize, SensorError<D::Error>> {
        let free = (N - self.records.len()).min(MAX_BATCH);
        if free == 0 {
            return Ok(0);
        }

        let mut scratch = [0u8; RECORD_SIZE * MAX_BATCH];
        let n = match device.read_raw(&mut scratch[..free * RECORD_SIZE]) {
            Ok(n) => n,
            Err(nb::Error::WouldBlock) => return Err(SensorError::WouldBlock),
            Err(nb::Error::Other(e)) => return Err(SensorError::Io(e)),
        };

        let whole = n / RECORD_SIZE;
        if n % RECORD_SIZE != 0 {
            warn!("InputReader: dropping partial record ({} trailing bytes)", n % RECORD_SIZE);
        }

        for chunk in scratch[..whole * RECORD_SIZE].chunks_exact(RECORD_SIZE) {
            let mut record = [0u8; RECORD_SIZE];
            record.copy_from_slice(chunk);
            // Capacity was checked above, so this never drops a record.
            let _ = self.records.push_back(RawEvent::decode(&record));
        }

        Ok(whole)
    }

    /// The oldest buffered record, left in place.
    #[inline]
    pub fn read_event(&self) -> Option<&RawEvent> {
        self.records.front()
    }

    /// Consumes the record last returned by `read_event`.
    #[inline]
    pub fn next(&mut self) {
        self.records.pop_front();
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }
}

impl<const N: usize> Default for InputReader<N> {
    fn default() -> Self {
        Self::new()
    }
}
