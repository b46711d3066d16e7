//! Client-side view of server state
//!
//! Holds the network table (each network owning its clients and CDP
//! neighbours), the string and packet histories, the channel power table and
//! the session scalars. Mutated only by the thread that drives the
//! connection; readers get shared references or copies.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use tracing::debug;

use super::history::BoundedHistory;
use crate::types::{
    CdpDevice, Client, GpsFix, MacAddr, Network, NetworkType, PacketInfo, ServerInfo, Version,
};

/// Returned by [`StateStore::channel_power`] when there is no slot
pub const NO_CHANNEL_DATA: i32 = -1;

pub const DEFAULT_MAX_STRINGS: usize = 100;
pub const DEFAULT_MAX_PACKETS: usize = 1000;
pub const DEFAULT_MAX_CHANNELS: usize = 14;

/// Capacities of the bounded parts of the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreLimits {
    pub max_strings: usize,
    pub max_packets: usize,
    pub max_channels: usize,
}

impl Default for StoreLimits {
    fn default() -> Self {
        Self {
            max_strings: DEFAULT_MAX_STRINGS,
            max_packets: DEFAULT_MAX_PACKETS,
            max_channels: DEFAULT_MAX_CHANNELS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StateStore {
    networks: BTreeMap<MacAddr, Network>,
    strings: BoundedHistory<String>,
    packets: BoundedHistory<PacketInfo>,
    /// Slot 0 is channel 1
    channel_power: Vec<i32>,
    version: Version,
    start_time: i64,
    server_time: i64,
    location: GpsFix,
    info: ServerInfo,
    status: String,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new(StoreLimits::default())
    }
}

impl StateStore {
    pub fn new(limits: StoreLimits) -> Self {
        Self {
            networks: BTreeMap::new(),
            strings: BoundedHistory::new(limits.max_strings),
            packets: BoundedHistory::new(limits.max_packets),
            channel_power: vec![0; limits.max_channels.max(1)],
            version: Version::default(),
            start_time: 0,
            server_time: 0,
            location: GpsFix::default(),
            info: ServerInfo::default(),
            status: String::new(),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Mutations
    // ═══════════════════════════════════════════════════════════════════════

    /// Insert or wholesale replace a network, dropping any clients and CDP
    /// neighbours the previous entry owned.
    pub fn apply_network(&mut self, net: Network) {
        debug!(bssid = %net.bssid, channel = net.channel, "network update");
        self.networks.insert(net.bssid, net);
    }

    /// Insert or replace a client under its network. Returns false, storing
    /// nothing, when the network is unknown.
    pub fn apply_client(&mut self, client: Client) -> bool {
        match self.networks.get_mut(&client.bssid) {
            Some(net) => {
                net.clients.insert(client.mac, client);
                true
            }
            None => {
                debug!(bssid = %client.bssid, mac = %client.mac, "client for unknown network dropped");
                false
            }
        }
    }

    /// Insert or replace a CDP neighbour under its network. Returns false
    /// when the network is unknown.
    pub fn apply_cisco(&mut self, bssid: &MacAddr, device: CdpDevice) -> bool {
        match self.networks.get_mut(bssid) {
            Some(net) => {
                net.cisco.insert(device.dev_id.clone(), device);
                true
            }
            None => {
                debug!(bssid = %bssid, dev_id = %device.dev_id, "CDP record for unknown network dropped");
                false
            }
        }
    }

    /// Flag a network for removal without deleting it
    pub fn mark_removed(&mut self, bssid: &MacAddr) -> bool {
        match self.networks.get_mut(bssid) {
            Some(net) => {
                net.net_type = NetworkType::Remove;
                true
            }
            None => false,
        }
    }

    /// Delete a network and everything it owns
    pub fn remove_network(&mut self, bssid: &MacAddr) -> Option<Network> {
        self.networks.remove(bssid)
    }

    /// Delete every network flagged by [`mark_removed`](Self::mark_removed)
    pub fn reap_removed(&mut self) -> Vec<Network> {
        let doomed: Vec<MacAddr> = self
            .networks
            .values()
            .filter(|net| net.is_pending_removal())
            .map(|net| net.bssid)
            .collect();
        doomed
            .iter()
            .filter_map(|bssid| self.networks.remove(bssid))
            .collect()
    }

    pub fn set_version(&mut self, version: Version, start_time: Option<i64>) {
        self.version = version;
        if let Some(start) = start_time {
            self.start_time = start;
        }
    }

    pub fn set_server_time(&mut self, now: i64) {
        self.server_time = now;
    }

    pub fn set_location(&mut self, fix: GpsFix) {
        self.location = fix;
    }

    /// Store aggregate counters and overwrite one channel slot per signal
    /// value, up to the table capacity. Slots past the last parsed value
    /// keep their previous reading.
    pub fn apply_info(&mut self, info: ServerInfo, channels: &[i32]) {
        self.info = info;
        for (slot, signal) in self.channel_power.iter_mut().zip(channels) {
            *slot = *signal;
        }
    }

    pub fn set_status(&mut self, status: String) {
        self.status = status;
    }

    pub fn clear_status(&mut self) {
        self.status.clear();
    }

    pub fn push_string(&mut self, line: String) {
        self.strings.push(line);
    }

    pub fn push_packet(&mut self, packet: PacketInfo) {
        self.packets.push(packet);
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Queries
    // ═══════════════════════════════════════════════════════════════════════

    /// All networks, ordered by BSSID
    pub fn networks(&self) -> Vec<&Network> {
        self.networks.values().collect()
    }

    pub fn network(&self, bssid: &MacAddr) -> Option<&Network> {
        self.networks.get(bssid)
    }

    pub fn network_count(&self) -> usize {
        self.networks.len()
    }

    /// The `n` most recently seen networks, oldest discovered first
    pub fn most_recent(&self, n: usize) -> Vec<&Network> {
        let mut nets = self.networks();
        nets.sort_by_key(|net| Reverse(net.last_time));
        nets.truncate(n);
        nets.sort_by_key(|net| net.first_time);
        nets
    }

    /// Signal level for a 1-based channel, [`NO_CHANNEL_DATA`] outside the table
    pub fn channel_power(&self, channel: i32) -> i32 {
        if channel < 1 {
            return NO_CHANNEL_DATA;
        }
        usize::try_from(channel - 1)
            .ok()
            .and_then(|idx| self.channel_power.get(idx))
            .copied()
            .unwrap_or(NO_CHANNEL_DATA)
    }

    pub fn channel_capacity(&self) -> usize {
        self.channel_power.len()
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn start_time(&self) -> i64 {
        self.start_time
    }

    pub fn server_time(&self) -> i64 {
        self.server_time
    }

    /// Current GPS fix; `mode` is the fix quality
    pub fn location(&self) -> &GpsFix {
        &self.location
    }

    pub fn info(&self) -> &ServerInfo {
        &self.info
    }

    /// Status line delivered during the current poll, empty otherwise
    pub fn status(&self) -> &str {
        &self.status
    }

    /// Free-text log, oldest first
    pub fn strings(&self) -> impl DoubleEndedIterator<Item = &String> + ExactSizeIterator {
        self.strings.iter()
    }

    /// `*STRING` lines received, evicted ones included
    pub fn strings_received(&self) -> u64 {
        self.strings.total()
    }

    /// `*PACKET` summaries received, evicted ones included
    pub fn packets_received(&self) -> u64 {
        self.packets.total()
    }

    /// Packet summaries, oldest first
    pub fn packets(&self) -> impl DoubleEndedIterator<Item = &PacketInfo> + ExactSizeIterator {
        self.packets.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mac(last: u8) -> MacAddr {
        MacAddr::new([0, 0x0C, 0x41, 0, 0, last])
    }

    fn net(last: u8, first_time: i64, last_time: i64) -> Network {
        Network {
            bssid: mac(last),
            first_time,
            last_time,
            ..Default::default()
        }
    }

    fn client(bssid: MacAddr, last: u8) -> Client {
        Client {
            bssid,
            mac: MacAddr::new([0, 0x02, 0x2D, 0, 0, last]),
            ..Default::default()
        }
    }

    #[test]
    fn test_most_recent_orders_by_first_seen() {
        let mut store = StateStore::default();
        store.apply_network(net(1, 1, 10));
        store.apply_network(net(2, 2, 30));
        store.apply_network(net(3, 3, 20));
        store.apply_network(net(4, 4, 5));

        let recent = store.most_recent(2);
        let firsts: Vec<i64> = recent.iter().map(|n| n.first_time).collect();
        assert_eq!(firsts, vec![2, 3]);
        let lasts: Vec<i64> = recent.iter().map(|n| n.last_time).collect();
        assert_eq!(lasts, vec![30, 20]);
    }

    #[test]
    fn test_most_recent_ties_keep_table_order() {
        let mut store = StateStore::default();
        store.apply_network(net(1, 1, 10));
        store.apply_network(net(2, 2, 10));
        store.apply_network(net(3, 3, 5));

        let recent = store.most_recent(1);
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].bssid, mac(1));

        let recent = store.most_recent(2);
        let bssids: Vec<MacAddr> = recent.iter().map(|n| n.bssid).collect();
        assert_eq!(bssids, vec![mac(1), mac(2)]);
    }

    #[test]
    fn test_most_recent_more_than_available() {
        let mut store = StateStore::default();
        store.apply_network(net(1, 5, 10));
        store.apply_network(net(2, 1, 30));
        let recent = store.most_recent(10);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].first_time, 1);
        assert!(store.most_recent(0).is_empty());
    }

    #[test]
    fn test_network_replaced_wholesale() {
        let mut store = StateStore::default();
        let mut first = net(1, 1, 2);
        first.ssid = Some("first".to_string());
        first.channel = 11;
        store.apply_network(first);
        assert!(store.apply_client(client(mac(1), 9)));
        assert_eq!(store.network(&mac(1)).unwrap().clients.len(), 1);

        store.apply_network(net(1, 3, 4));
        let current = store.network(&mac(1)).unwrap();
        assert_eq!(current.ssid, None);
        assert_eq!(current.channel, 0);
        assert!(current.clients.is_empty());
        assert_eq!(store.network_count(), 1);
    }

    #[test]
    fn test_orphan_client_and_cisco_dropped() {
        let mut store = StateStore::default();
        store.apply_network(net(1, 1, 2));

        assert!(!store.apply_client(client(mac(7), 1)));
        let device = CdpDevice {
            dev_id: "sw1".to_string(),
            ip: std::net::Ipv4Addr::LOCALHOST,
            interface: None,
            capabilities: Default::default(),
            software: None,
            platform: None,
        };
        assert!(!store.apply_cisco(&mac(7), device.clone()));
        assert_eq!(store.network_count(), 1);
        assert!(store.network(&mac(7)).is_none());
        assert!(store.network(&mac(1)).unwrap().clients.is_empty());

        assert!(store.apply_cisco(&mac(1), device));
        assert!(store.network(&mac(1)).unwrap().cisco.contains_key("sw1"));
    }

    #[test]
    fn test_soft_and_hard_removal() {
        let mut store = StateStore::default();
        store.apply_network(net(1, 1, 2));
        store.apply_network(net(2, 1, 2));

        assert!(store.mark_removed(&mac(1)));
        assert!(!store.mark_removed(&mac(9)));
        assert_eq!(store.network_count(), 2);
        assert!(store.network(&mac(1)).unwrap().is_pending_removal());

        let reaped = store.reap_removed();
        assert_eq!(reaped.len(), 1);
        assert_eq!(reaped[0].bssid, mac(1));

        assert!(store.remove_network(&mac(2)).is_some());
        assert!(store.remove_network(&mac(2)).is_none());
        assert_eq!(store.network_count(), 0);
    }

    #[test]
    fn test_channel_power_bounds() {
        let mut store = StateStore::default();
        store.apply_info(ServerInfo::default(), &[10, 20, 30]);
        assert_eq!(store.channel_power(1), 10);
        assert_eq!(store.channel_power(3), 30);
        assert_eq!(store.channel_power(14), 0);
        assert_eq!(store.channel_power(0), NO_CHANNEL_DATA);
        assert_eq!(store.channel_power(-3), NO_CHANNEL_DATA);
        assert_eq!(store.channel_power(15), NO_CHANNEL_DATA);
        assert_eq!(store.channel_power(i32::MAX), NO_CHANNEL_DATA);
    }

    #[test]
    fn test_info_truncated_to_capacity() {
        let mut store = StateStore::new(StoreLimits { max_channels: 2, ..Default::default() });
        store.apply_info(ServerInfo::default(), &[1, 2, 3, 4]);
        assert_eq!(store.channel_capacity(), 2);
        assert_eq!(store.channel_power(2), 2);
        assert_eq!(store.channel_power(3), NO_CHANNEL_DATA);
    }

    #[test]
    fn test_short_info_keeps_later_slots() {
        let mut store = StateStore::default();
        store.apply_info(ServerInfo::default(), &[10, 20, 30]);
        store.apply_info(ServerInfo::default(), &[5]);
        assert_eq!(store.channel_power(1), 5);
        assert_eq!(store.channel_power(2), 20);
        assert_eq!(store.channel_power(3), 30);
    }

    #[test]
    fn test_histories_bounded() {
        let mut store = StateStore::new(StoreLimits {
            max_strings: 2,
            max_packets: 3,
            max_channels: 14,
        });
        for i in 0..5 {
            store.push_string(format!("line {}", i));
            store.push_packet(PacketInfo { time: i, ..Default::default() });
        }
        let strings: Vec<&String> = store.strings().collect();
        assert_eq!(strings, vec!["line 3", "line 4"]);
        let times: Vec<i64> = store.packets().map(|p| p.time).collect();
        assert_eq!(times, vec![2, 3, 4]);
        assert_eq!(store.strings_received(), 5);
        assert_eq!(store.packets_received(), 5);
    }

    #[test]
    fn test_version_keeps_start_time_when_absent() {
        let mut store = StateStore::default();
        store.set_version(Version { major: 3, minor: 1, tiny: 0 }, Some(100));
        store.set_version(Version { major: 3, minor: 2, tiny: 0 }, None);
        assert_eq!(store.version().to_string(), "3.2.0");
        assert_eq!(store.start_time(), 100);
    }
}
