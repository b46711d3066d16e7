//! Record decoders
//!
//! One decoder per header. Each describes the record's fields in wire order
//! and then checks the minimum number of converted fields; trailing fields
//! past the minimum are optional and keep their defaults when missing.

use std::net::Ipv4Addr;

use super::scanner::Scanner;
use super::ParseError;
use crate::types::{
    CdpCapabilities, CdpDevice, Client, GpsAggregate, GpsBounds, GpsFix, GpsPoint, MacAddr,
    Network, PacketInfo, ServerInfo, SignalStats, Version,
};

pub const TERMINATE: &str = "*TERMINATE";
pub const KISMET: &str = "*KISMET";
pub const TIME: &str = "*TIME";
pub const NETWORK: &str = "*NETWORK";
pub const CLIENT: &str = "*CLIENT";
pub const REMOVE: &str = "*REMOVE";
pub const GPS: &str = "*GPS";
pub const INFO: &str = "*INFO";
pub const CISCO: &str = "*CISCO";
pub const STATUS: &str = "*STATUS";
pub const STRING: &str = "*STRING";
pub const PACKET: &str = "*PACKET";

// Field bounds
const SSID_LEN: usize = 255;
const BEACON_LEN: usize = 255;
const PACKET_SSID_LEN: usize = 32;
const NETBIOS_LEN: usize = 16;
const CDP_FIELD_LEN: usize = 255;
const CHANNEL_LIST_LEN: usize = 1024;
const STATUS_LEN: usize = 1023;
const STRING_LEN: usize = 2047;

/// A decoded inbound record
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    /// Server is shutting down
    Terminate,
    Kismet {
        version: Version,
        start_time: Option<i64>,
    },
    Time(i64),
    Network(Network),
    Client(Client),
    /// Soft delete of a network
    Remove(MacAddr),
    Gps(GpsFix),
    Info {
        info: ServerInfo,
        /// Signal per channel, channel 1 first
        channels: Vec<i32>,
    },
    Cisco {
        bssid: MacAddr,
        device: CdpDevice,
    },
    Status(String),
    String(String),
    Packet(PacketInfo),
}

impl Record {
    /// Header this record arrives under
    pub fn header(&self) -> &'static str {
        match self {
            Record::Terminate => TERMINATE,
            Record::Kismet { .. } => KISMET,
            Record::Time(_) => TIME,
            Record::Network(_) => NETWORK,
            Record::Client(_) => CLIENT,
            Record::Remove(_) => REMOVE,
            Record::Gps(_) => GPS,
            Record::Info { .. } => INFO,
            Record::Cisco { .. } => CISCO,
            Record::Status(_) => STATUS,
            Record::String(_) => STRING,
            Record::Packet(_) => PACKET,
        }
    }
}

/// Decode the payload of one line. Unknown headers yield `Ok(None)`.
pub fn decode(header: &str, payload: &str) -> Result<Option<Record>, ParseError> {
    let record = match header {
        TERMINATE => Record::Terminate,
        KISMET => kismet(payload)?,
        TIME => time(payload)?,
        NETWORK => Record::Network(network(payload)?),
        CLIENT => Record::Client(client(payload)?),
        REMOVE => remove(payload)?,
        GPS => gps(payload)?,
        INFO => info(payload)?,
        CISCO => cisco(payload)?,
        STATUS => Record::Status(text_line(payload, STATUS, STATUS_LEN)?),
        STRING => Record::String(text_line(payload, STRING, STRING_LEN)?),
        PACKET => Record::Packet(packet(payload)?),
        _ => return Ok(None),
    };
    Ok(Some(record))
}

fn kismet(payload: &str) -> Result<Record, ParseError> {
    let mut s = Scanner::new(payload);
    let mut version = Version::default();
    let mut start = 0i64;
    s.int(&mut version.major);
    s.literal('.');
    s.int(&mut version.minor);
    s.literal('.');
    s.int(&mut version.tiny);
    s.int(&mut start);
    let scanned = s.finish(KISMET, 1)?;
    Ok(Record::Kismet {
        version,
        start_time: (scanned >= 4).then_some(start),
    })
}

fn time(payload: &str) -> Result<Record, ParseError> {
    let mut s = Scanner::new(payload);
    let mut now = 0i64;
    s.int(&mut now);
    s.finish(TIME, 1)?;
    Ok(Record::Time(now))
}

fn remove(payload: &str) -> Result<Record, ParseError> {
    let mut s = Scanner::new(payload);
    let mut bssid = MacAddr::ZERO;
    s.mac(&mut bssid);
    s.finish(REMOVE, 1)?;
    Ok(Record::Remove(bssid))
}

fn gps(payload: &str) -> Result<Record, ParseError> {
    let mut s = Scanner::new(payload);
    let mut fix = GpsFix::default();
    s.float(&mut fix.lat);
    s.float(&mut fix.lon);
    s.float(&mut fix.alt);
    s.float(&mut fix.spd);
    s.int(&mut fix.mode);
    s.finish(GPS, 5)?;
    Ok(Record::Gps(fix))
}

fn text_line(payload: &str, header: &'static str, max: usize) -> Result<String, ParseError> {
    let mut s = Scanner::new(payload);
    let mut text = String::new();
    s.rest_of_line(max, &mut text);
    s.finish(header, 1)?;
    Ok(text)
}

// Field groups shared by networks and clients

fn gps_bounds(s: &mut Scanner<'_>, gps: &mut GpsBounds) {
    s.float(&mut gps.min_lat);
    s.float(&mut gps.min_lon);
    s.float(&mut gps.min_alt);
    s.float(&mut gps.min_spd);
    s.float(&mut gps.max_lat);
    s.float(&mut gps.max_lon);
    s.float(&mut gps.max_alt);
    s.float(&mut gps.max_spd);
}

fn signal(s: &mut Scanner<'_>, sig: &mut SignalStats) {
    s.int(&mut sig.quality);
    s.int(&mut sig.signal);
    s.int(&mut sig.noise);
    s.int(&mut sig.best_quality);
    s.int(&mut sig.best_signal);
    s.int(&mut sig.best_noise);
}

fn gps_point(s: &mut Scanner<'_>, point: &mut GpsPoint) {
    s.float(&mut point.lat);
    s.float(&mut point.lon);
    s.float(&mut point.alt);
}

fn aggregate(s: &mut Scanner<'_>, agg: &mut GpsAggregate) {
    s.float(&mut agg.lat);
    s.float(&mut agg.lon);
    s.float(&mut agg.alt);
    s.int(&mut agg.points);
}

fn network(payload: &str) -> Result<Network, ParseError> {
    let mut s = Scanner::new(payload);
    let mut net = Network::default();
    let mut net_type = 0i32;
    let mut atype = 0i32;

    s.mac(&mut net.bssid);
    s.int(&mut net_type);
    s.delimited(SSID_LEN, &mut net.ssid);
    s.delimited(BEACON_LEN, &mut net.beacon_info);
    s.int(&mut net.packets.llc);
    s.int(&mut net.packets.data);
    s.int(&mut net.packets.crypt);
    s.int(&mut net.packets.interesting);
    s.int(&mut net.channel);
    s.flag(&mut net.wep);
    s.int(&mut net.first_time);
    s.int(&mut net.last_time);
    s.int(&mut atype);
    s.ipv4(&mut net.ip.range);
    s.ipv4(&mut net.ip.mask);
    s.ipv4(&mut net.ip.gateway);
    s.flag(&mut net.gps.fixed);
    gps_bounds(&mut s, &mut net.gps);
    s.int(&mut net.ip.octets);
    s.flag(&mut net.cloaked);
    s.int(&mut net.beacon);
    s.float(&mut net.maxrate);
    s.int(&mut net.manuf_id);
    s.int(&mut net.manuf_score);
    signal(&mut s, &mut net.signal);
    gps_point(&mut s, &mut net.best_gps);
    aggregate(&mut s, &mut net.aggregate);

    s.finish(NETWORK, 53)?;

    net.net_type = net_type.into();
    net.ip.atype = atype.into();
    Ok(net)
}

fn client(payload: &str) -> Result<Client, ParseError> {
    let mut s = Scanner::new(payload);
    let mut client = Client::default();
    let mut client_type = 0i32;
    let mut atype = 0i32;
    let mut ip = Ipv4Addr::UNSPECIFIED;

    s.mac(&mut client.bssid);
    s.mac(&mut client.mac);
    s.int(&mut client_type);
    s.int(&mut client.first_time);
    s.int(&mut client.last_time);
    s.int(&mut client.manuf_id);
    s.int(&mut client.manuf_score);
    s.int(&mut client.packets.data);
    s.int(&mut client.packets.crypt);
    s.int(&mut client.packets.interesting);
    s.flag(&mut client.gps.fixed);
    gps_bounds(&mut s, &mut client.gps);
    aggregate(&mut s, &mut client.aggregate);
    s.float(&mut client.maxrate);
    s.int(&mut client.metric);
    signal(&mut s, &mut client.signal);
    gps_point(&mut s, &mut client.best_gps);
    s.int(&mut atype);
    let full_ip = s.ipv4(&mut ip);

    // last address octet is optional
    s.finish(CLIENT, 38)?;

    client.client_type = client_type.into();
    client.atype = atype.into();
    client.ip = full_ip.then_some(ip);
    Ok(client)
}

fn info(payload: &str) -> Result<Record, ParseError> {
    let mut s = Scanner::new(payload);
    let mut info = ServerInfo::default();
    let mut numchan = 0i32;

    s.int(&mut info.networks);
    s.int(&mut info.packets);
    s.int(&mut info.crypt);
    s.int(&mut info.interesting);
    s.int(&mut info.noise);
    s.int(&mut info.dropped);
    s.int(&mut info.quality);
    s.int(&mut info.power);
    s.int(&mut info.noise_level);
    s.int(&mut numchan);
    let channel_list = s.remainder();
    let mut first = "";
    s.word(CHANNEL_LIST_LEN, &mut first);

    s.finish(INFO, 11)?;

    let numchan = usize::try_from(numchan).unwrap_or(0);
    let channels = channel_list
        .split_ascii_whitespace()
        .take(numchan)
        .map_while(|tok| tok.parse::<i32>().ok())
        .collect();

    Ok(Record::Info { info, channels })
}

fn cisco(payload: &str) -> Result<Record, ParseError> {
    let mut s = Scanner::new(payload);
    let mut bssid = MacAddr::ZERO;
    let mut dev_id = None;
    let mut ip = Ipv4Addr::UNSPECIFIED;
    let mut interface = None;
    let mut caps = [0i32; 7];
    let mut software = None;
    let mut platform = None;

    s.mac(&mut bssid);
    s.delimited(CDP_FIELD_LEN, &mut dev_id);
    s.ipv4(&mut ip);
    s.delimited(CDP_FIELD_LEN, &mut interface);
    s.int(&mut caps[0]);
    for cap in caps[1..].iter_mut() {
        s.literal_any(&[':', ';']);
        s.int(cap);
    }
    s.delimited(CDP_FIELD_LEN, &mut software);
    s.delimited(CDP_FIELD_LEN, &mut platform);

    s.finish(CISCO, 16)?;

    Ok(Record::Cisco {
        bssid,
        device: CdpDevice {
            dev_id: dev_id.unwrap_or_default(),
            ip,
            interface,
            capabilities: CdpCapabilities::from_flags(caps),
            software,
            platform,
        },
    })
}

fn packet(payload: &str) -> Result<PacketInfo, ParseError> {
    let mut s = Scanner::new(payload);
    let mut pkt = PacketInfo::default();

    s.int(&mut pkt.packet_type);
    s.int(&mut pkt.time);
    s.flag(&mut pkt.encrypted);
    s.flag(&mut pkt.interesting);
    s.flag(&mut pkt.beacon);
    s.mac_octets(&mut pkt.source_mac);
    s.mac_octets(&mut pkt.dest_mac);
    s.mac_octets(&mut pkt.bssid_mac);
    s.delimited(PACKET_SSID_LEN, &mut pkt.ssid);
    s.int(&mut pkt.proto.proto_type);
    s.ipv4(&mut pkt.proto.source_ip);
    s.ipv4(&mut pkt.proto.dest_ip);
    s.int(&mut pkt.proto.sport);
    s.int(&mut pkt.proto.dport);
    s.int(&mut pkt.proto.nbtype);
    s.delimited(NETBIOS_LEN, &mut pkt.proto.netbios_source);

    // NetBIOS name is optional
    s.finish(PACKET, 36)?;
    Ok(pkt)
}
