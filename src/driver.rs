use crate::error::{Error, Result};
use crate::stats::Stats;
use crate::structs::*;
use crate::transport::Transport;

use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};
use rand_distr::{Distribution, Uniform};
use rand_pcg::Pcg32;
use std::thread;
use std::time::Duration;

/// Number of characters of the first line shown in the progress log
const PREVIEW_LEN: usize = 70;

/// Blocking suspension between two datagrams
pub trait Pause {
    /// Suspend for `duration`, or fail with [`Error::Cancelled`]
    fn pause(&mut self, duration: Duration) -> Result<()>;

    /// Fail with [`Error::Cancelled`] if a cancellation is pending
    fn check(&mut self) -> Result<()>;
}

/// Sleeps on the cancellation channel, so that Ctrl-C interrupts a pause
pub struct Suspender {
    cancel: Option<Receiver<()>>,
}

impl Suspender {
    pub fn new(cancel: Receiver<()>) -> Self {
        Suspender {
            cancel: Some(cancel),
        }
    }

    /// A suspender that cannot be cancelled
    pub fn uncancellable() -> Self {
        Suspender { cancel: None }
    }
}

impl Pause for Suspender {
    fn pause(&mut self, duration: Duration) -> Result<()> {
        match self.cancel.as_ref().map(|rx| rx.recv_timeout(duration)) {
            Some(Ok(())) => Err(Error::Cancelled),
            Some(Err(RecvTimeoutError::Timeout)) => Ok(()),
            Some(Err(RecvTimeoutError::Disconnected)) => {
                log::trace!("Cancellation channel closed");
                self.cancel = None;
                thread::sleep(duration);
                Ok(())
            }
            None => {
                thread::sleep(duration);
                Ok(())
            }
        }
    }

    fn check(&mut self) -> Result<()> {
        match self.cancel.as_ref().map(Receiver::try_recv) {
            Some(Ok(())) => Err(Error::Cancelled),
            Some(Err(TryRecvError::Disconnected)) => {
                self.cancel = None;
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

/// Pending lines of the next datagram
struct Batch<'a> {
    pending: Vec<&'a str>,
    capacity: usize,
}

impl<'a> Batch<'a> {
    fn new(capacity: usize) -> Self {
        Batch {
            pending: Vec::with_capacity(capacity),
            capacity,
        }
    }

    fn push(&mut self, line: &'a str) {
        debug_assert!(self.pending.len() < self.capacity);
        self.pending.push(line);
    }

    fn is_full(&self) -> bool {
        self.pending.len() >= self.capacity
    }

    fn len(&self) -> usize {
        self.pending.len()
    }

    fn preview(&self) -> String {
        self.pending
            .first()
            .map(|l| l.chars().take(PREVIEW_LEN).collect())
            .unwrap_or_default()
    }

    /// Join the pending lines into one payload and empty the batch
    fn flush(&mut self) -> String {
        let payload = self.pending.join("\n");
        self.pending.clear();
        payload
    }
}

/// Batches lines into datagrams and paces their transmission.
///
/// The driver cycles through four states for each sequence:
/// - accumulating: the next line is appended to the pending batch;
/// - flushing: when the batch is full or the line was the last one, the
///   batch is joined with `\n` and sent as one datagram;
/// - suspended: after any flush but the last, the driver waits for the
///   pacing delay (not at all when it is zero);
/// - done: after the last flush.
///
/// Every line is sent exactly once, in order, in `ceil(n / capacity)` datagrams.
pub struct Driver<T: Transport, P: Pause> {
    transport: T,
    pause: P,
    rng: Pcg32,
}

impl<T: Transport, P: Pause> Driver<T, P> {
    pub fn new(transport: T, pause: P, rng: Pcg32) -> Self {
        Driver {
            transport,
            pause,
            rng,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn into_parts(self) -> (T, P) {
        (self.transport, self.pause)
    }

    fn next_delay(&mut self, delay: &Delay) -> Duration {
        match delay {
            Delay::Fixed(d) => *d,
            Delay::Uniform { low, high } => {
                let secs = Uniform::new_inclusive(low.as_secs_f64(), high.as_secs_f64())
                    .sample(&mut self.rng);
                Duration::from_secs_f64(secs)
            }
        }
    }

    /// Suspend outside of a drive, e.g. between two simulated sources
    pub fn suspend(&mut self, duration: Duration) -> Result<()> {
        if duration.is_zero() {
            return self.pause.check();
        }
        self.pause.pause(duration)
    }

    /// Send `lines` with the given pacing
    pub fn drive<S: AsRef<str>>(&mut self, lines: &[S], pacing: &Pacing) -> Result<DriveReport> {
        let total = lines.len();
        let mut batch = Batch::new(pacing.batch_capacity);
        let mut stats = Stats::default();

        for (i, line) in lines.iter().enumerate() {
            batch.push(line.as_ref());
            let last = i + 1 == total;
            if !batch.is_full() && !last {
                continue;
            }

            self.pause.check()?;
            let count = batch.len();
            let preview = batch.preview();
            let payload = batch.flush();
            self.transport.send(payload.as_bytes())?;
            stats.increase(count, payload.len());
            log::info!(
                "[{:>4}/{total}] sent {count} line(s) | {preview}...",
                stats.lines
            );

            if !last {
                let delay = self.next_delay(&pacing.delay);
                if !delay.is_zero() {
                    log::trace!("Suspended for {delay:?}");
                    self.pause.pause(delay)?;
                }
            }
        }
        stats.log_summary();
        Ok(stats.report())
    }
}

/// Records the requested pauses without sleeping
#[derive(Debug, Default)]
pub struct RecordingPause {
    pub pauses: Vec<Duration>,
    /// Cancel at the given pause index
    pub cancel_at: Option<usize>,
}

impl Pause for RecordingPause {
    fn pause(&mut self, duration: Duration) -> Result<()> {
        if self.cancel_at == Some(self.pauses.len()) {
            return Err(Error::Cancelled);
        }
        self.pauses.push(duration);
        Ok(())
    }

    fn check(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{FailingTransport, RecordingTransport};
    use crossbeam_channel::bounded;
    use rand_core::SeedableRng;

    fn driver() -> Driver<RecordingTransport, RecordingPause> {
        Driver::new(
            RecordingTransport::default(),
            RecordingPause::default(),
            Pcg32::seed_from_u64(0),
        )
    }

    fn lines(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("line {i}")).collect()
    }

    #[test]
    fn batches_preserve_order_and_count() {
        for n in 0..12 {
            for b in 1..6 {
                let mut d = driver();
                let input = lines(n);
                let pacing = Pacing::new(b, Delay::Fixed(Duration::from_millis(10))).unwrap();
                let report = d.drive(&input, &pacing).unwrap();
                let (transport, pause) = d.into_parts();

                assert_eq!(transport.datagrams.len(), n.div_ceil(b));
                assert_eq!(report.datagrams as usize, n.div_ceil(b));
                assert_eq!(report.lines as usize, n);
                assert!(transport.datagrams.iter().all(|d| d.lines().count() <= b));
                let replayed: Vec<String> = transport
                    .datagrams
                    .iter()
                    .flat_map(|d| d.split('\n').map(str::to_string))
                    .collect();
                assert_eq!(replayed, input);
                // no pause after the final flush
                assert_eq!(pause.pauses.len(), n.div_ceil(b).saturating_sub(1));
            }
        }
    }

    #[test]
    fn final_batch_may_be_smaller() {
        let mut d = driver();
        let pacing = Pacing::new(3, Delay::Fixed(Duration::ZERO)).unwrap();
        d.drive(&lines(7), &pacing).unwrap();
        let sizes: Vec<usize> = d
            .transport()
            .datagrams
            .iter()
            .map(|d| d.split('\n').count())
            .collect();
        assert_eq!(sizes, vec![3, 3, 1]);
        assert_eq!(d.transport().datagrams[2], "line 6");
    }

    #[test]
    fn zero_delay_never_suspends() {
        let mut d = driver();
        let pacing = Pacing::new(1, Delay::Fixed(Duration::ZERO)).unwrap();
        d.drive(&lines(5), &pacing).unwrap();
        let (transport, pause) = d.into_parts();
        assert_eq!(transport.datagrams.len(), 5);
        assert!(pause.pauses.is_empty());
    }

    #[test]
    fn empty_sequence_sends_nothing() {
        let mut d = driver();
        let pacing = Pacing::new(1, Delay::Fixed(Duration::from_secs(1))).unwrap();
        let report = d.drive::<String>(&[], &pacing).unwrap();
        assert_eq!(report.datagrams, 0);
        assert!(d.transport().datagrams.is_empty());
    }

    #[test]
    fn uniform_delay_stays_in_range() {
        let mut d = driver();
        let low = Duration::from_millis(500);
        let high = Duration::from_millis(2000);
        let pacing = Pacing::new(1, Delay::Uniform { low, high }).unwrap();
        d.drive(&lines(50), &pacing).unwrap();
        let (_, pause) = d.into_parts();
        assert_eq!(pause.pauses.len(), 49);
        assert!(pause.pauses.iter().all(|p| *p >= low && *p <= high));
    }

    #[test]
    fn cancellation_during_pause_stops_the_drive() {
        let mut d = Driver::new(
            RecordingTransport::default(),
            RecordingPause {
                pauses: vec![],
                cancel_at: Some(1),
            },
            Pcg32::seed_from_u64(0),
        );
        let pacing = Pacing::new(2, Delay::Fixed(Duration::from_secs(1))).unwrap();
        let result = d.drive(&lines(10), &pacing);
        assert!(matches!(result, Err(Error::Cancelled)));
        assert_eq!(d.transport().datagrams.len(), 2);
    }

    #[test]
    fn transport_error_stops_the_drive() {
        let mut d = Driver::new(
            FailingTransport::new(1),
            RecordingPause::default(),
            Pcg32::seed_from_u64(0),
        );
        let pacing = Pacing::new(2, Delay::Fixed(Duration::from_secs(1))).unwrap();
        let result = d.drive(&lines(10), &pacing);
        assert!(matches!(result, Err(Error::Transport(_))));
        let (transport, pause) = d.into_parts();
        assert_eq!(transport.delivered, vec!["line 0\nline 1"]);
        assert_eq!(transport.attempts, 2);
        // only the pause following the delivered batch
        assert_eq!(pause.pauses, vec![Duration::from_secs(1)]);
    }

    #[test]
    fn suspender_is_interrupted_by_the_channel() {
        let (tx, rx) = bounded(1);
        let mut suspender = Suspender::new(rx);
        assert!(suspender.check().is_ok());
        tx.send(()).unwrap();
        let result = suspender.pause(Duration::from_secs(60));
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[test]
    fn suspender_check_sees_pending_cancellation() {
        let (tx, rx) = bounded(1);
        let mut suspender = Suspender::new(rx);
        tx.send(()).unwrap();
        assert!(matches!(suspender.check(), Err(Error::Cancelled)));
    }

    #[test]
    fn suspender_survives_a_closed_channel() {
        let (tx, rx) = bounded::<()>(1);
        drop(tx);
        let mut suspender = Suspender::new(rx);
        assert!(suspender.pause(Duration::from_millis(1)).is_ok());
        assert!(suspender.check().is_ok());
    }
}
