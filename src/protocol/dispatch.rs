//! Line routing
//!
//! Splits a line into header and payload, decodes it and applies the record
//! to the store.

use tracing::{debug, trace, warn};

use super::parser::{decode, Record};
use super::{ParseError, MAX_HEADER_LEN};
use crate::state::StateStore;

/// Result of dispatching one line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Malformed, unknown, or nothing to change
    Noop,
    Applied,
    /// A `*STATUS` line was stored; consumers should look now
    StatusChanged,
    /// The server asked us to go away
    Fatal,
}

impl Outcome {
    /// Numeric result code: 0 no-op, 1 applied, 2 status, -1 fatal
    pub fn code(&self) -> i32 {
        match self {
            Outcome::Noop => 0,
            Outcome::Applied => 1,
            Outcome::StatusChanged => 2,
            Outcome::Fatal => -1,
        }
    }
}

/// Dispatch counters
#[derive(Debug, Clone, Default)]
pub struct DispatchStats {
    pub lines: u64,
    pub applied: u64,
    pub malformed: u64,
    pub unknown: u64,
}

#[derive(Debug, Default)]
pub struct Dispatcher {
    stats: DispatchStats,
}

/// Split `*HEADER: payload` into its two halves.
///
/// The header runs up to the first `:` and is followed by a single separator
/// byte before the payload. Lines too short to carry a payload are rejected.
pub fn split_line(line: &str) -> Result<(&str, &str), ParseError> {
    let body = line.trim_end_matches(&['\r', '\n'][..]);
    let header_len = body.find(':').ok_or(ParseError::MissingHeader)?;
    if header_len == 0 || header_len > MAX_HEADER_LEN || header_len + 2 > body.len() {
        return Err(ParseError::MissingHeader);
    }
    let payload = body.get(header_len + 2..).ok_or(ParseError::MissingHeader)?;
    Ok((&body[..header_len], payload))
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> &DispatchStats {
        &self.stats
    }

    /// Decode one line and apply it to `store`
    pub fn dispatch(&mut self, line: &str, store: &mut StateStore) -> Outcome {
        self.stats.lines += 1;
        trace!(line = %line.trim_end(), "dispatch");

        let (header, payload) = match split_line(line) {
            Ok(parts) => parts,
            Err(_) => {
                self.stats.malformed += 1;
                debug!("line without header discarded");
                return Outcome::Noop;
            }
        };

        let record = match decode(header, payload) {
            Ok(Some(record)) => record,
            Ok(None) => {
                self.stats.unknown += 1;
                trace!(header, "unhandled header");
                return Outcome::Noop;
            }
            Err(e) => {
                self.stats.malformed += 1;
                warn!(header, "malformed record: {}", e);
                return Outcome::Noop;
            }
        };

        let kind = record.header();
        let outcome = apply(record, store);
        match outcome {
            Outcome::Applied | Outcome::StatusChanged => {
                self.stats.applied += 1;
                debug!(header = kind, "record applied");
            }
            Outcome::Noop => debug!(header = kind, "no matching network, record dropped"),
            Outcome::Fatal => {}
        }
        outcome
    }
}

/// Apply a decoded record to the store
pub fn apply(record: Record, store: &mut StateStore) -> Outcome {
    let changed = match record {
        Record::Terminate => return Outcome::Fatal,
        Record::Kismet { version, start_time } => {
            store.set_version(version, start_time);
            true
        }
        Record::Time(now) => {
            store.set_server_time(now);
            true
        }
        Record::Network(net) => {
            store.apply_network(net);
            true
        }
        Record::Client(client) => store.apply_client(client),
        Record::Remove(bssid) => store.mark_removed(&bssid),
        Record::Gps(fix) => {
            store.set_location(fix);
            true
        }
        Record::Info { info, channels } => {
            store.apply_info(info, &channels);
            true
        }
        Record::Cisco { bssid, device } => store.apply_cisco(&bssid, device),
        Record::Status(text) => {
            store.set_status(text);
            return Outcome::StatusChanged;
        }
        Record::String(text) => {
            store.push_string(text);
            true
        }
        Record::Packet(pkt) => {
            store.push_packet(pkt);
            true
        }
    };

    if changed {
        Outcome::Applied
    } else {
        Outcome::Noop
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::parser::tests::{client_payload, network_payload, packet_payload};
    use crate::state::StoreLimits;
    use crate::types::MacAddr;

    const BSSID: &str = "00:0C:41:A2:0B:11";

    fn bssid() -> MacAddr {
        BSSID.parse().unwrap()
    }

    #[test]
    fn test_split_line() {
        assert_eq!(split_line("*TIME: 123\n"), Ok(("*TIME", "123")));
        assert_eq!(split_line("*TIME: 123\r\n"), Ok(("*TIME", "123")));
        assert_eq!(split_line("*STATUS: \n"), Ok(("*STATUS", "")));
        assert!(split_line("*TIME:\n").is_err());
        assert!(split_line("no header here\n").is_err());
        assert!(split_line(": payload\n").is_err());
        let long = format!("*{}: x\n", "H".repeat(MAX_HEADER_LEN));
        assert!(split_line(&long).is_err());
    }

    #[test]
    fn test_outcome_codes() {
        assert_eq!(Outcome::Noop.code(), 0);
        assert_eq!(Outcome::Applied.code(), 1);
        assert_eq!(Outcome::StatusChanged.code(), 2);
        assert_eq!(Outcome::Fatal.code(), -1);
    }

    #[test]
    fn test_terminate_is_fatal() {
        let mut store = StateStore::default();
        let mut d = Dispatcher::new();
        assert_eq!(d.dispatch("*TERMINATE: Kismet server terminating.\n", &mut store), Outcome::Fatal);
    }

    #[test]
    fn test_status_signals_change() {
        let mut store = StateStore::default();
        let mut d = Dispatcher::new();
        let outcome = d.dispatch("*STATUS: Found new network \"linksys\"\n", &mut store);
        assert_eq!(outcome, Outcome::StatusChanged);
        assert_eq!(store.status(), "Found new network \"linksys\"");

        assert_eq!(d.dispatch("*TIME: 1060000123\n", &mut store), Outcome::Applied);
        assert_eq!(d.dispatch("*STRING: hello\n", &mut store), Outcome::Applied);
        assert_eq!(d.dispatch("*GPS: 1.0 2.0 3.0 4.0 1\n", &mut store), Outcome::Applied);
    }

    #[test]
    fn test_network_client_flow() {
        let mut store = StateStore::default();
        let mut d = Dispatcher::new();

        // client before its network is dropped
        let client_line = format!("*CLIENT: {}\n", client_payload(BSSID, "00:02:2D:11:22:33"));
        assert_eq!(d.dispatch(&client_line, &mut store), Outcome::Noop);
        assert_eq!(store.network_count(), 0);

        let net_line = format!("*NETWORK: {}\n", network_payload(BSSID, "linksys", 100, 200));
        assert_eq!(d.dispatch(&net_line, &mut store), Outcome::Applied);
        assert_eq!(d.dispatch(&client_line, &mut store), Outcome::Applied);

        let net = store.network(&bssid()).unwrap();
        assert_eq!(net.ssid.as_deref(), Some("linksys"));
        assert_eq!(net.clients.len(), 1);
        let client = net.clients.values().next().unwrap();
        assert_eq!(client.mac.to_string(), "00:02:2D:11:22:33");
        assert_eq!(client.bssid, bssid());
    }

    #[test]
    fn test_remove_marks_only() {
        let mut store = StateStore::default();
        let mut d = Dispatcher::new();
        d.dispatch(&format!("*NETWORK: {}\n", network_payload(BSSID, "x", 1, 2)), &mut store);

        assert_eq!(d.dispatch(&format!("*REMOVE: {}\n", BSSID), &mut store), Outcome::Applied);
        assert_eq!(store.network_count(), 1);
        assert!(store.network(&bssid()).unwrap().is_pending_removal());

        assert_eq!(d.dispatch("*REMOVE: 11:22:33:44:55:66\n", &mut store), Outcome::Noop);
    }

    #[test]
    fn test_malformed_lines_are_noops() {
        let mut store = StateStore::default();
        let mut d = Dispatcher::new();
        let full = network_payload(BSSID, "x", 1, 2);
        let short = full.rsplit_once(' ').unwrap().0;

        assert_eq!(d.dispatch(&format!("*NETWORK: {}\n", short), &mut store), Outcome::Noop);
        assert_eq!(d.dispatch("*GPS: 1.0 2.0\n", &mut store), Outcome::Noop);
        assert_eq!(d.dispatch("*INFO: 1 2 3\n", &mut store), Outcome::Noop);
        assert_eq!(d.dispatch("*KISMET: beta\n", &mut store), Outcome::Noop);
        assert_eq!(d.dispatch("garbage\n", &mut store), Outcome::Noop);
        assert_eq!(d.dispatch("*ALERT: something odd\n", &mut store), Outcome::Noop);

        assert_eq!(store.network_count(), 0);
        assert_eq!(store.location().mode, 0);
        assert_eq!(store.version().major, 0);
        assert_eq!(d.stats().malformed, 5);
        assert_eq!(d.stats().unknown, 1);
        assert_eq!(d.stats().applied, 0);
    }

    #[test]
    fn test_packet_history_eviction() {
        let mut store = StateStore::new(StoreLimits { max_packets: 2, ..Default::default() });
        let mut d = Dispatcher::new();
        for ssid in ["one", "two", "three"] {
            let line = format!("*PACKET: {}\n", packet_payload(ssid));
            assert_eq!(d.dispatch(&line, &mut store), Outcome::Applied);
        }
        let ssids: Vec<_> = store.packets().map(|p| p.ssid.clone().unwrap_or_default()).collect();
        assert_eq!(ssids, vec!["two", "three"]);
    }

    #[test]
    fn test_info_updates_channel_table() {
        let mut store = StateStore::default();
        let mut d = Dispatcher::new();
        let line = "*INFO: 12 3400 20 2 100 0 40 -50 -95 3 10 20 30\n";
        assert_eq!(d.dispatch(line, &mut store), Outcome::Applied);
        assert_eq!(store.info().networks, 12);
        assert_eq!(store.channel_power(2), 20);
        assert_eq!(store.channel_power(4), 0);
    }

    #[test]
    fn test_kismet_version() {
        let mut store = StateStore::default();
        let mut d = Dispatcher::new();
        assert_eq!(d.dispatch("*KISMET: 3.1.0 1060000000\n", &mut store), Outcome::Applied);
        assert_eq!(store.version().to_string(), "3.1.0");
        assert_eq!(store.start_time(), 1060000000);
    }
}
