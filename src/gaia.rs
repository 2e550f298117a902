use crate::structs::*;

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Address of the emulated gateway, written in the syslog preamble
pub const GATEWAY_ADDRESS: &str = "192.168.99.1";
/// Placeholder destination of the generated events
pub const PLACEHOLDER_DST: &str = "10.0.0.1";
pub const RULE_ID: u32 = 134;
pub const RULE_UID: &str = "{11111111-2222-3333-BD17-711F536C7C33}";
pub const PRODUCT: &str = "VPN-1 & FireWall-1";

/// `Checkpoint: <date> <time> <action> `, the action being the only capture
static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Checkpoint:\s+\S+\s+\S+\s+(accept|drop|reject)\s+")
        .expect("the GAIA header pattern is valid")
});

/// Write a GAIA log line with the full syslog header
pub fn generate(event: &SyntheticEvent) -> String {
    let ss = event.second;
    format!(
        "Sep  3 15:12:{ss:02} {GATEWAY_ADDRESS} Checkpoint: 3Sep2007 15:12:{ss:02} {action} \
         {src} >eth8 rule: {RULE_ID}; rule_uid: {RULE_UID}; service_id: port-scan; \
         src: {src}; dst: {PLACEHOLDER_DST}; proto: tcp; product: {PRODUCT}; \
         service: {dport}; s_port: {sport};",
        action = event.action,
        src = event.source_address,
        dport = event.destination_port,
        sport = event.source_port,
    )
}

/// Whether the line carries a GAIA event header
pub fn is_event(line: &str) -> bool {
    HEADER_RE.is_match(line)
}

/// Extract the fields of a GAIA line.
///
/// Returns `None` when the line has no event header; captured traces mix
/// events with other syslog noise, so this is not an error.
pub fn parse_line(line: &str) -> Option<ParsedEvent> {
    let captures = HEADER_RE.captures(line)?;
    let header = captures.get(0)?;
    let action = captures.get(1)?.as_str().to_lowercase();

    let mut fields: HashMap<&str, &str> = HashMap::new();
    for part in line[header.end()..].split(';') {
        let part = part.trim();
        if let Some((key, value)) = part.split_once(": ") {
            // last occurrence wins
            fields.insert(key.trim(), value.trim());
        }
    }
    log::trace!("GAIA fields: {:?}", fields);

    let get = |key: &str| fields.get(key).map(|v| v.to_string());
    let rule = fields
        .get("rule")
        .filter(|v| !v.is_empty())
        .or_else(|| fields.get("rule_uid"))
        .map(|v| v.to_string());

    Some(ParsedEvent {
        action,
        src: get("src"),
        dst: get("dst"),
        proto: get("proto"),
        service: get("service"),
        rule,
    })
}
