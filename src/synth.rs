use crate::cef;
use crate::gaia;
use crate::structs::*;

use rand::Rng;
use rand_core::RngCore;

/// Lowest ephemeral source port written in synthetic events
pub const EPHEMERAL_PORT_MIN: u16 = 1024;

/// Builds log lines in a chosen format.
///
/// The random fields (ephemeral source port, timestamp seconds) are drawn
/// from `rng`, so a seeded generator yields reproducible lines.
pub struct Synthesizer<R: RngCore> {
    rng: R,
    format: LogFormat,
    envelope: CefEnvelope,
}

impl<R: RngCore> Synthesizer<R> {
    pub fn new(rng: R, format: LogFormat, envelope: CefEnvelope) -> Self {
        Synthesizer {
            rng,
            format,
            envelope,
        }
    }

    pub fn event<'a>(
        &mut self,
        action: &'a str,
        source_address: &'a str,
        destination_port: u16,
    ) -> SyntheticEvent<'a> {
        let source_port = self.rng.gen_range(EPHEMERAL_PORT_MIN..=u16::MAX);
        let second = self.rng.gen_range(0..60);
        SyntheticEvent {
            action,
            source_address,
            destination_port,
            source_port,
            rule_id: gaia::RULE_ID,
            second,
        }
    }

    /// One log line for `action` from `source_address` to `destination_port`
    pub fn line(&mut self, action: &str, source_address: &str, destination_port: u16) -> String {
        let event = self.event(action, source_address, destination_port);
        match self.format {
            LogFormat::Gaia => gaia::generate(&event),
            LogFormat::Cef => cef::generate(&event, &self.envelope),
        }
    }
}
