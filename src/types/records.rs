//! Typed records decoded from the telemetry stream.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use serde::Serialize;

use super::mac::MacAddr;

// ═══════════════════════════════════════════════════════════════════════════════
// Classifications
// ═══════════════════════════════════════════════════════════════════════════════

/// Network classification reported by the server
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkType {
    #[default]
    Ap,
    Adhoc,
    Probe,
    Turbocell,
    Data,
    /// Flagged by `*REMOVE`; waiting for the consumer to reap it
    Remove,
    Other(i32),
}

impl From<i32> for NetworkType {
    fn from(val: i32) -> Self {
        match val {
            0 => NetworkType::Ap,
            1 => NetworkType::Adhoc,
            2 => NetworkType::Probe,
            3 => NetworkType::Turbocell,
            4 => NetworkType::Data,
            5 => NetworkType::Remove,
            other => NetworkType::Other(other),
        }
    }
}

impl std::fmt::Display for NetworkType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NetworkType::Ap => write!(f, "AP"),
            NetworkType::Adhoc => write!(f, "ad-hoc"),
            NetworkType::Probe => write!(f, "probe"),
            NetworkType::Turbocell => write!(f, "turbocell"),
            NetworkType::Data => write!(f, "data"),
            NetworkType::Remove => write!(f, "removed"),
            NetworkType::Other(v) => write!(f, "type {}", v),
        }
    }
}

/// Direction/association state of a client
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientType {
    #[default]
    Unknown,
    FromDs,
    ToDs,
    InterDs,
    Established,
    Other(i32),
}

impl From<i32> for ClientType {
    fn from(val: i32) -> Self {
        match val {
            0 => ClientType::Unknown,
            1 => ClientType::FromDs,
            2 => ClientType::ToDs,
            3 => ClientType::InterDs,
            4 => ClientType::Established,
            other => ClientType::Other(other),
        }
    }
}

/// How an IP range was learned
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressType {
    #[default]
    None,
    Factory,
    Udp,
    Arp,
    Tcp,
    Dhcp,
    Group,
    Other(i32),
}

impl From<i32> for AddressType {
    fn from(val: i32) -> Self {
        match val {
            0 => AddressType::None,
            1 => AddressType::Factory,
            2 => AddressType::Udp,
            3 => AddressType::Arp,
            4 => AddressType::Tcp,
            5 => AddressType::Dhcp,
            6 => AddressType::Group,
            other => AddressType::Other(other),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Shared building blocks
// ═══════════════════════════════════════════════════════════════════════════════

/// Packet counters
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PacketCounts {
    /// LLC/management frames (networks only)
    pub llc: i32,
    pub data: i32,
    pub crypt: i32,
    pub interesting: i32,
}

/// GPS bounding box of every fix seen for a network or client
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GpsBounds {
    pub fixed: bool,
    pub min_lat: f32,
    pub min_lon: f32,
    pub min_alt: f32,
    pub min_spd: f32,
    pub max_lat: f32,
    pub max_lon: f32,
    pub max_alt: f32,
    pub max_spd: f32,
}

/// Position where the best signal was observed
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GpsPoint {
    pub lat: f32,
    pub lon: f32,
    pub alt: f32,
}

/// Running sum of position samples
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GpsAggregate {
    pub lat: f64,
    pub lon: f64,
    pub alt: f64,
    pub points: i64,
}

impl GpsAggregate {
    /// Average position of all samples, `None` without samples
    pub fn centroid(&self) -> Option<(f64, f64, f64)> {
        if self.points <= 0 {
            return None;
        }
        let n = self.points as f64;
        Some((self.lat / n, self.lon / n, self.alt / n))
    }
}

/// Current and best-observed signal
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SignalStats {
    pub quality: i32,
    pub signal: i32,
    pub noise: i32,
    pub best_quality: i32,
    pub best_signal: i32,
    pub best_noise: i32,
}

/// IP range learned for a network
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IpRange {
    pub atype: AddressType,
    /// Number of significant octets in `range`
    pub octets: i32,
    pub range: Ipv4Addr,
    pub mask: Ipv4Addr,
    pub gateway: Ipv4Addr,
}

impl Default for IpRange {
    fn default() -> Self {
        Self {
            atype: AddressType::None,
            octets: 0,
            range: Ipv4Addr::UNSPECIFIED,
            mask: Ipv4Addr::UNSPECIFIED,
            gateway: Ipv4Addr::UNSPECIFIED,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Networks, clients, CDP neighbours
// ═══════════════════════════════════════════════════════════════════════════════

/// A wireless network as last reported by `*NETWORK`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Network {
    pub bssid: MacAddr,
    pub net_type: NetworkType,
    /// `None` when the server marks the SSID as unknown
    pub ssid: Option<String>,
    pub beacon_info: Option<String>,
    pub packets: PacketCounts,
    pub channel: i32,
    pub wep: bool,
    pub first_time: i64,
    pub last_time: i64,
    pub ip: IpRange,
    pub gps: GpsBounds,
    pub cloaked: bool,
    /// Beacon interval in TU
    pub beacon: i32,
    pub maxrate: f32,
    pub manuf_id: i32,
    pub manuf_score: i32,
    pub signal: SignalStats,
    pub best_gps: GpsPoint,
    pub aggregate: GpsAggregate,
    /// Clients keyed by MAC
    pub clients: BTreeMap<MacAddr, Client>,
    /// CDP neighbours keyed by device id
    pub cisco: BTreeMap<String, CdpDevice>,
}

impl Network {
    /// Flagged by `*REMOVE` and waiting to be reaped
    pub fn is_pending_removal(&self) -> bool {
        self.net_type == NetworkType::Remove
    }
}

/// A station seen on a network
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Client {
    pub mac: MacAddr,
    /// Owning network
    pub bssid: MacAddr,
    pub client_type: ClientType,
    pub first_time: i64,
    pub last_time: i64,
    pub manuf_id: i32,
    pub manuf_score: i32,
    pub packets: PacketCounts,
    pub gps: GpsBounds,
    pub aggregate: GpsAggregate,
    pub maxrate: f32,
    pub metric: i32,
    pub signal: SignalStats,
    pub best_gps: GpsPoint,
    pub atype: AddressType,
    pub ip: Option<Ipv4Addr>,
}

/// CDP capability bits, in wire order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CdpCapabilities {
    pub router: bool,
    pub trans_bridge: bool,
    pub source_route_bridge: bool,
    pub switch: bool,
    pub host: bool,
    pub igmp_forward: bool,
    pub repeater: bool,
}

impl CdpCapabilities {
    pub fn from_flags(flags: [i32; 7]) -> Self {
        Self {
            router: flags[0] != 0,
            trans_bridge: flags[1] != 0,
            source_route_bridge: flags[2] != 0,
            switch: flags[3] != 0,
            host: flags[4] != 0,
            igmp_forward: flags[5] != 0,
            repeater: flags[6] != 0,
        }
    }
}

/// Infrastructure device announced over CDP
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CdpDevice {
    pub dev_id: String,
    pub ip: Ipv4Addr,
    pub interface: Option<String>,
    pub capabilities: CdpCapabilities,
    pub software: Option<String>,
    pub platform: Option<String>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Packet summaries and session scalars
// ═══════════════════════════════════════════════════════════════════════════════

/// Network-layer details embedded in a packet summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProtoInfo {
    pub proto_type: i32,
    pub source_ip: Ipv4Addr,
    pub dest_ip: Ipv4Addr,
    pub sport: i32,
    pub dport: i32,
    pub nbtype: i32,
    pub netbios_source: Option<String>,
}

impl Default for ProtoInfo {
    fn default() -> Self {
        Self {
            proto_type: 0,
            source_ip: Ipv4Addr::UNSPECIFIED,
            dest_ip: Ipv4Addr::UNSPECIFIED,
            sport: 0,
            dport: 0,
            nbtype: 0,
            netbios_source: None,
        }
    }
}

/// One `*PACKET` summary
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PacketInfo {
    pub packet_type: i32,
    pub time: i64,
    pub encrypted: bool,
    pub interesting: bool,
    pub beacon: bool,
    pub source_mac: MacAddr,
    pub dest_mac: MacAddr,
    pub bssid_mac: MacAddr,
    pub ssid: Option<String>,
    pub proto: ProtoInfo,
}

/// Server protocol version
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Version {
    pub major: i32,
    pub minor: i32,
    pub tiny: i32,
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.tiny)
    }
}

/// Session GPS fix
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GpsFix {
    pub lat: f32,
    pub lon: f32,
    pub alt: f32,
    pub spd: f32,
    /// Fix quality; 0 means no fix
    pub mode: i32,
}

/// Aggregate counters from `*INFO`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ServerInfo {
    pub networks: i32,
    pub packets: i32,
    pub crypt: i32,
    pub interesting: i32,
    pub noise: i32,
    pub dropped: i32,
    pub quality: i32,
    pub power: i32,
    pub noise_level: i32,
}
