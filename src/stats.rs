use crate::structs::DriveReport;

use std::time::Instant;

/// Counters of the traffic sent during one drive
pub struct Stats {
    pub start_time: Instant,
    pub datagrams: u64,
    pub lines: u64,
    pub bytes: u64,
}

impl Default for Stats {
    fn default() -> Self {
        Stats {
            start_time: Instant::now(),
            datagrams: 0,
            lines: 0,
            bytes: 0,
        }
    }
}

impl Stats {
    /// Account for one datagram of `lines` lines and `bytes` bytes
    pub fn increase(&mut self, lines: usize, bytes: usize) {
        self.datagrams += 1;
        self.lines += lines as u64;
        self.bytes += bytes as u64;
    }

    pub fn report(&self) -> DriveReport {
        DriveReport {
            datagrams: self.datagrams,
            lines: self.lines,
            bytes: self.bytes,
            elapsed: self.start_time.elapsed(),
        }
    }

    pub fn log_summary(&self) {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        let throughput = if elapsed > 0. {
            8. * (self.bytes as f64) / elapsed / 1_000.
        } else {
            0.
        };
        if throughput < 1000. {
            log::info!(
                "{} lines in {} datagrams, {:.1}s ({:.2} kbps)",
                self.lines,
                self.datagrams,
                elapsed,
                throughput
            );
        } else {
            log::info!(
                "{} lines in {} datagrams, {:.1}s ({:.2} Mbps)",
                self.lines,
                self.datagrams,
                elapsed,
                throughput / 1000.
            );
        }
    }
}
