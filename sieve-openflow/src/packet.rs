// Sieve: SDN traffic-engineering control plane for a k=4 fat-tree fabric
// Copyright (C) 2024 Tibor Schneider <sctibor@ethz.ch>
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

//! Minimal L2/L3/L4 header parsing for packet-in payloads.
//!
//! Sieve only needs enough of the Ethernet/ARP/IPv4/TCP/UDP headers to build a
//! [`crate::flowkey::FlowKey`] — not a general-purpose packet dissector. Field layout follows
//! the same declarative `nom`-derive style used for NetFlow record parsing elsewhere in the
//! wider packet-parsing ecosystem this crate draws from.

use std::net::Ipv4Addr;

use nom::number::complete::{be_u16, be_u32, be_u8};
use nom::IResult;
use nom_derive::*;

use crate::ids::MacAddr;

pub const ETH_TYPE_ARP: u16 = 0x0806;
pub const ETH_TYPE_IPV4: u16 = 0x0800;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Nom)]
pub struct EthernetHeader {
    #[nom(Parse = "parse_mac")]
    pub dst: MacAddr,
    #[nom(Parse = "parse_mac")]
    pub src: MacAddr,
    pub ethertype: u16,
}

fn parse_mac(input: &[u8]) -> IResult<&[u8], MacAddr> {
    let (rest, bytes) = nom::bytes::complete::take(6usize)(input)?;
    let mut mac = [0u8; 6];
    mac.copy_from_slice(bytes);
    Ok((rest, MacAddr(mac)))
}

/// ARP header, request or reply, IPv4-over-Ethernet only (the only kind the fabric uses).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Nom)]
pub struct ArpHeader {
    pub htype: u16,
    pub ptype: u16,
    pub hlen: u8,
    pub plen: u8,
    pub oper: u16,
    #[nom(Parse = "parse_mac")]
    pub sender_mac: MacAddr,
    #[nom(Parse = "parse_ipv4")]
    pub sender_ip: Ipv4Addr,
    #[nom(Parse = "parse_mac")]
    pub target_mac: MacAddr,
    #[nom(Parse = "parse_ipv4")]
    pub target_ip: Ipv4Addr,
}

fn parse_ipv4(input: &[u8]) -> IResult<&[u8], Ipv4Addr> {
    let (rest, addr) = be_u32(input)?;
    Ok((rest, Ipv4Addr::from(addr)))
}

/// Fixed 20-byte IPv4 header (no options support — none of the fabric's test traffic uses
/// them).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Header {
    pub version_ihl: u8,
    pub total_length: u16,
    pub ttl: u8,
    pub protocol: u8,
    pub src: Ipv4Addr,
    pub dst: Ipv4Addr,
    /// Length of the header in bytes, needed to find where the L4 payload starts.
    pub header_len: usize,
}

pub fn parse_ipv4_header(input: &[u8]) -> IResult<&[u8], Ipv4Header> {
    let (rest, version_ihl) = be_u8(input)?;
    let (rest, _dscp_ecn) = be_u8(rest)?;
    let (rest, total_length) = be_u16(rest)?;
    let (rest, _id) = be_u16(rest)?;
    let (rest, _flags_frag) = be_u16(rest)?;
    let (rest, ttl) = be_u8(rest)?;
    let (rest, protocol) = be_u8(rest)?;
    let (rest, _checksum) = be_u16(rest)?;
    let (rest, src) = parse_ipv4(rest)?;
    let (rest, dst) = parse_ipv4(rest)?;

    let ihl = (version_ihl & 0x0f) as usize;
    let header_len = ihl * 4;
    let options_len = header_len.saturating_sub(20);
    let (rest, _options) = nom::bytes::complete::take(options_len)(rest)?;

    Ok((
        rest,
        Ipv4Header {
            version_ihl,
            total_length,
            ttl,
            protocol,
            src,
            dst,
            header_len,
        },
    ))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Nom)]
pub struct TcpHeader {
    pub src_port: u16,
    pub dst_port: u16,
}

pub fn parse_tcp_header(input: &[u8]) -> IResult<&[u8], TcpHeader> {
    TcpHeader::parse(input)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Nom)]
pub struct UdpHeader {
    pub src_port: u16,
    pub dst_port: u16,
}

pub fn parse_udp_header(input: &[u8]) -> IResult<&[u8], UdpHeader> {
    UdpHeader::parse(input)
}

/// Everything Forwarder and Monitor need out of a raw Ethernet frame's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedPacket {
    Arp {
        src_mac: MacAddr,
        src_ip: Ipv4Addr,
        dst_ip: Ipv4Addr,
    },
    Ipv4 {
        src_mac: MacAddr,
        eth_type: u16,
        src_ip: Ipv4Addr,
        dst_ip: Ipv4Addr,
        l4: Option<L4Info>,
    },
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct L4Info {
    pub proto: u8,
    pub src_port: u16,
    pub dst_port: u16,
}

/// Parse an Ethernet frame, dispatching on ethertype. Unrecognized ethertypes or malformed
/// headers yield [`ParsedPacket::Other`] rather than an error — a malformed packet-in is not a
/// controller fault (§7 lists no policy for it because the host OpenFlow library is assumed to
/// deliver well-formed frames; Sieve degrades gracefully regardless).
pub fn parse_ethernet_frame(data: &[u8]) -> ParsedPacket {
    let Ok((rest, eth)) = EthernetHeader::parse(data) else {
        return ParsedPacket::Other;
    };
    match eth.ethertype {
        ETH_TYPE_ARP => match ArpHeader::parse(rest) {
            Ok((_, arp)) => ParsedPacket::Arp {
                src_mac: eth.src,
                src_ip: arp.sender_ip,
                dst_ip: arp.target_ip,
            },
            Err(_) => ParsedPacket::Other,
        },
        ETH_TYPE_IPV4 => match parse_ipv4_header(rest) {
            Ok((payload, ip)) => {
                let l4 = match ip.protocol {
                    6 => parse_tcp_header(payload).ok().map(|(_, t)| L4Info {
                        proto: 6,
                        src_port: t.src_port,
                        dst_port: t.dst_port,
                    }),
                    17 => parse_udp_header(payload).ok().map(|(_, u)| L4Info {
                        proto: 17,
                        src_port: u.src_port,
                        dst_port: u.dst_port,
                    }),
                    _ => None,
                };
                ParsedPacket::Ipv4 {
                    src_mac: eth.src,
                    eth_type: eth.ethertype,
                    src_ip: ip.src,
                    dst_ip: ip.dst,
                    l4,
                }
            }
            Err(_) => ParsedPacket::Other,
        },
        _ => ParsedPacket::Other,
    }
}
