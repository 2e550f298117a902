use crate::structs::*;

use chrono::Local;

pub const VENDOR: &str = "CheckPoint";
pub const PRODUCT: &str = "VPN-1 & FireWall-1";
pub const VERSION: &str = "R81.20";
/// Signature id used when the event carries no rule
pub const DEFAULT_RULE: &str = "100";
/// Destination written in synthetic CEF events
pub const PLACEHOLDER_DST: &str = "192.168.1.1";
pub const DEFAULT_SYSLOG_PRIORITY: u8 = 134;
pub const DEFAULT_SYSLOG_HOST: &str = "gw-checkpoint";

/// CEF severity of a firewall action: drops are more severe than anything else
pub fn severity(action: &str) -> u8 {
    if action == "drop" {
        5
    } else {
        3
    }
}

/// Human name of an action: first letter upper-cased, the rest lower-cased
pub fn action_name(action: &str) -> String {
    let mut chars = action.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

fn header(envelope: &CefEnvelope, rule: &str, action: &str) -> String {
    let prefix = match envelope {
        CefEnvelope::Bare => String::new(),
        CefEnvelope::Syslog { priority, host } => {
            format!("<{priority}>{} {host} ", Local::now().format("%b %d %H:%M:%S"))
        }
    };
    format!(
        "{prefix}CEF:0|{VENDOR}|{PRODUCT}|{VERSION}|{rule}|{}|{}|",
        action_name(action),
        severity(action)
    )
}

/// Write a synthetic CEF event
pub fn generate(event: &SyntheticEvent, envelope: &CefEnvelope) -> String {
    format!(
        "{}src={} dst={PLACEHOLDER_DST} dpt={} proto=TCP act={}",
        header(envelope, DEFAULT_RULE, event.action),
        event.source_address,
        event.destination_port,
        event.action
    )
}

/// Convert a parsed GAIA event into a CEF line.
///
/// `src` and `dst` anchor the extension block and have no sensible default:
/// without both the event is not convertible.
pub fn from_parsed(event: &ParsedEvent, envelope: &CefEnvelope) -> Option<String> {
    let src = event.src.as_deref().filter(|s| !s.is_empty())?;
    let dst = event.dst.as_deref().filter(|s| !s.is_empty())?;
    let action = if event.action.is_empty() {
        "drop"
    } else {
        event.action.as_str()
    };
    let proto = event
        .proto
        .as_deref()
        .filter(|p| !p.is_empty())
        .unwrap_or("tcp")
        .to_uppercase();
    let rule = event
        .rule
        .as_deref()
        .filter(|r| !r.is_empty())
        .unwrap_or(DEFAULT_RULE);

    let mut line = header(envelope, rule, action);
    line.push_str(&format!("src={src} dst={dst}"));
    if let Some(service) = event.service.as_deref().filter(|s| !s.is_empty()) {
        line.push_str(&format!(" dpt={service}"));
    }
    line.push_str(&format!(" proto={proto} act={action}"));
    Some(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed() -> ParsedEvent {
        ParsedEvent {
            action: "drop".to_string(),
            src: Some("192.168.11.7".to_string()),
            dst: Some("10.0.0.1".to_string()),
            proto: Some("udp".to_string()),
            service: Some("53".to_string()),
            rule: Some("{AAAA}".to_string()),
        }
    }

    #[test]
    fn action_names() {
        assert_eq!(action_name("drop"), "Drop");
        assert_eq!(action_name("ACCEPT"), "Accept");
        assert_eq!(action_name("rEjEcT"), "Reject");
        assert_eq!(action_name(""), "");
    }

    #[test]
    fn severities() {
        assert_eq!(severity("drop"), 5);
        assert_eq!(severity("accept"), 3);
        assert_eq!(severity("reject"), 3);
    }

    #[test]
    fn synthetic_line() {
        let event = SyntheticEvent {
            action: "drop",
            source_address: "192.168.11.7",
            destination_port: 8080,
            source_port: 5000,
            rule_id: 134,
            second: 0,
        };
        assert_eq!(
            generate(&event, &CefEnvelope::Bare),
            "CEF:0|CheckPoint|VPN-1 & FireWall-1|R81.20|100|Drop|5|\
             src=192.168.11.7 dst=192.168.1.1 dpt=8080 proto=TCP act=drop"
        );
    }

    #[test]
    fn syslog_envelope() {
        let event = SyntheticEvent {
            action: "accept",
            source_address: "10.0.0.5",
            destination_port: 22,
            source_port: 5000,
            rule_id: 134,
            second: 0,
        };
        let envelope = CefEnvelope::Syslog {
            priority: DEFAULT_SYSLOG_PRIORITY,
            host: DEFAULT_SYSLOG_HOST.to_string(),
        };
        let line = generate(&event, &envelope);
        assert!(line.starts_with("<134>"));
        let (_, cef) = line.split_once(" gw-checkpoint ").unwrap();
        assert_eq!(
            cef,
            "CEF:0|CheckPoint|VPN-1 & FireWall-1|R81.20|100|Accept|3|\
             src=10.0.0.5 dst=192.168.1.1 dpt=22 proto=TCP act=accept"
        );
    }

    #[test]
    fn convert_full_event() {
        assert_eq!(
            from_parsed(&parsed(), &CefEnvelope::Bare).unwrap(),
            "CEF:0|CheckPoint|VPN-1 & FireWall-1|R81.20|{AAAA}|Drop|5|\
             src=192.168.11.7 dst=10.0.0.1 dpt=53 proto=UDP act=drop"
        );
    }

    #[test]
    fn convert_applies_defaults() {
        let event = ParsedEvent {
            action: "accept".to_string(),
            proto: None,
            service: None,
            rule: None,
            ..parsed()
        };
        assert_eq!(
            from_parsed(&event, &CefEnvelope::Bare).unwrap(),
            "CEF:0|CheckPoint|VPN-1 & FireWall-1|R81.20|100|Accept|3|\
             src=192.168.11.7 dst=10.0.0.1 proto=TCP act=accept"
        );

        let event = ParsedEvent {
            action: String::new(),
            ..parsed()
        };
        let line = from_parsed(&event, &CefEnvelope::Bare).unwrap();
        assert!(line.contains("|Drop|5|"));
        assert!(line.ends_with("act=drop"));
    }

    #[test]
    fn missing_dst_is_not_convertible() {
        let variants = [
            ParsedEvent {
                dst: None,
                ..parsed()
            },
            ParsedEvent {
                dst: None,
                proto: None,
                service: None,
                rule: None,
                ..parsed()
            },
            ParsedEvent {
                action: "accept".to_string(),
                dst: None,
                ..Default::default()
            },
            ParsedEvent {
                dst: Some(String::new()),
                ..parsed()
            },
        ];
        for event in variants.iter() {
            assert_eq!(from_parsed(event, &CefEnvelope::Bare), None);
        }
    }

    #[test]
    fn missing_src_is_not_convertible() {
        let event = ParsedEvent {
            src: None,
            ..parsed()
        };
        assert_eq!(from_parsed(&event, &CefEnvelope::Bare), None);
    }
}
