//! Core data types shared by the protocol decoder and the state store.

pub mod mac;
pub mod records;

pub use mac::MacAddr;
pub use records::{
    AddressType, CdpCapabilities, CdpDevice, Client, ClientType, GpsAggregate, GpsBounds,
    GpsFix, GpsPoint, IpRange, Network, NetworkType, PacketCounts, PacketInfo, ProtoInfo,
    ServerInfo, SignalStats, Version,
};
