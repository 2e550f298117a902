use crate::gaia;
use crate::structs::*;

use std::collections::BTreeSet;
use std::collections::HashMap;

/// Source reported when a sample holds no drop event
pub const DEFAULT_SOURCE: &str = "192.168.11.34";

/// Parse every line and keep the drop events that name a source and a service,
/// in file order.
pub fn extract_drops<S: AsRef<str>>(lines: &[S]) -> Vec<ParsedEvent> {
    lines
        .iter()
        .filter_map(|l| gaia::parse_line(l.as_ref()))
        .filter(|e| {
            e.action == "drop"
                && e.src.as_deref().is_some_and(|s| !s.is_empty())
                && e.service.as_deref().is_some_and(|s| !s.is_empty())
        })
        .collect()
}

/// The source address seen most often among the drops.
///
/// On a tie, the source that reached the maximum count first while scanning
/// in file order wins. Without any source, [`DEFAULT_SOURCE`] is returned.
pub fn most_frequent_source(drops: &[ParsedEvent]) -> String {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut best: Option<(&str, usize)> = None;
    for src in drops.iter().filter_map(|d| d.src.as_deref()) {
        let count = counts.entry(src).or_default();
        *count += 1;
        // strictly greater: an equal count reached later does not take over
        if best.map_or(true, |(_, c)| *count > c) {
            best = Some((src, *count));
        }
    }
    best.map_or_else(|| DEFAULT_SOURCE.to_string(), |(src, _)| src.to_string())
}

/// Distinct numeric destination ports of the drops, ascending.
///
/// Services that are not made only of ASCII digits, or that fall outside
/// 1-65535, are ignored.
pub fn distinct_destination_ports(drops: &[ParsedEvent]) -> Vec<u16> {
    drops
        .iter()
        .filter_map(|d| d.service.as_deref())
        .filter(|s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()))
        .filter_map(|s| s.parse::<u16>().ok())
        .filter(|p| *p != 0)
        .collect::<BTreeSet<u16>>()
        .into_iter()
        .collect()
}

/// Build the attack profile of a captured sample.
///
/// Fails with the reason the sample cannot be used when it holds no drop
/// event or no numeric port.
pub fn profile<S: AsRef<str>>(
    lines: &[S],
    format: LogFormat,
    pacing: Pacing,
) -> Result<ScanProfile, SkipReason> {
    let drops = extract_drops(lines);
    log::debug!("{} drop events out of {} lines", drops.len(), lines.len());
    if drops.is_empty() {
        return Err(SkipReason::NoDropEvents);
    }
    let source_address = most_frequent_source(&drops);
    let ports = distinct_destination_ports(&drops);
    if ports.is_empty() {
        return Err(SkipReason::NoNumericPorts);
    }
    Ok(ScanProfile {
        source_address,
        ports,
        format,
        pacing,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn drop_line(src: &str, service: &str) -> String {
        format!(
            "Sep  3 15:12:00 192.168.99.1 Checkpoint: 3Sep2007 15:12:00 drop {src} >eth8 rule: 1; \
             src: {src}; dst: 10.0.0.1; proto: tcp; service: {service}; s_port: 2000;"
        )
    }

    fn drops_from(sources: &[&str]) -> Vec<ParsedEvent> {
        sources
            .iter()
            .map(|s| ParsedEvent {
                action: "drop".to_string(),
                src: Some(s.to_string()),
                service: Some("22".to_string()),
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn drops_are_filtered_in_order() {
        let lines = vec![
            drop_line("1.1.1.1", "22"),
            "garbage".to_string(),
            "Checkpoint: 3Sep2007 15:12:00 accept x; src: 2.2.2.2; service: 80;".to_string(),
            "Checkpoint: 3Sep2007 15:12:00 drop x; src: 3.3.3.3;".to_string(),
            "Checkpoint: 3Sep2007 15:12:00 drop x; service: 25;".to_string(),
            drop_line("4.4.4.4", "443"),
        ];
        let drops = extract_drops(&lines);
        let sources: Vec<_> = drops.iter().map(|d| d.src.clone().unwrap()).collect();
        assert_eq!(sources, vec!["1.1.1.1", "4.4.4.4"]);
    }

    #[test]
    fn most_frequent() {
        let drops = drops_from(&["2.2.2.2", "1.1.1.1", "1.1.1.1", "2.2.2.2", "1.1.1.1"]);
        assert_eq!(most_frequent_source(&drops), "1.1.1.1");
        let drops = drops_from(&["1.1.1.1", "1.1.1.1", "1.1.1.1", "2.2.2.2", "2.2.2.2"]);
        assert_eq!(most_frequent_source(&drops), "1.1.1.1");
    }

    #[test]
    fn most_frequent_tie_break() {
        // 2.2.2.2 reaches two occurrences first
        let drops = drops_from(&["1.1.1.1", "2.2.2.2", "2.2.2.2", "1.1.1.1"]);
        assert_eq!(most_frequent_source(&drops), "2.2.2.2");
        let drops = drops_from(&["3.3.3.3", "4.4.4.4"]);
        assert_eq!(most_frequent_source(&drops), "3.3.3.3");
    }

    #[test]
    fn most_frequent_default() {
        assert_eq!(most_frequent_source(&[]), DEFAULT_SOURCE);
    }

    #[test]
    fn numeric_ports_only() {
        let lines = vec![
            drop_line("1.1.1.1", "80"),
            drop_line("1.1.1.1", "22"),
            drop_line("1.1.1.1", "abc"),
            drop_line("1.1.1.1", "80"),
            drop_line("1.1.1.1", "-5"),
            drop_line("1.1.1.1", "70000"),
        ];
        let drops = extract_drops(&lines);
        assert_eq!(distinct_destination_ports(&drops), vec![22, 80]);
    }

    #[test]
    fn profile_of_sample() {
        let lines = vec![
            drop_line("5.5.5.5", "443"),
            drop_line("6.6.6.6", "22"),
            drop_line("5.5.5.5", "21"),
        ];
        let pacing = Pacing::new(1, Delay::Fixed(Duration::ZERO)).unwrap();
        let profile = profile(&lines, LogFormat::Cef, pacing).unwrap();
        assert_eq!(profile.source_address, "5.5.5.5");
        assert_eq!(profile.ports, vec![21, 22, 443]);
        assert_eq!(profile.format, LogFormat::Cef);
    }

    #[test]
    fn profile_skip_reasons() {
        let pacing = Pacing::new(1, Delay::Fixed(Duration::ZERO)).unwrap();
        let lines = vec!["nothing here".to_string()];
        assert_eq!(
            profile(&lines, LogFormat::Gaia, pacing),
            Err(SkipReason::NoDropEvents)
        );
        let lines = vec![drop_line("1.1.1.1", "ssh")];
        assert_eq!(
            profile(&lines, LogFormat::Gaia, pacing),
            Err(SkipReason::NoNumericPorts)
        );
    }
}
