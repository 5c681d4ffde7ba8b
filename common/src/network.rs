// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

use std::fmt;
use std::net::Ipv6Addr;
use std::str::FromStr;

use oxnet::Ipv6Net;
use rand::prelude::*;
use serde::de;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use thiserror::Error;

/// Given an IPv6 multicast address, generate the associated synthetic mac
/// address.
pub fn multicast_mac_addr(ip: Ipv6Addr) -> MacAddr {
    let o = ip.octets();
    MacAddr::new(0x33, 0x33, o[12], o[13], o[14], o[15])
}

/// Given a unicast IPv6 address, return the solicited-node multicast address
/// a Neighbor Solicitation for it would be sent to (RFC 4291, 2.7.1).
pub fn solicited_node_addr(ip: Ipv6Addr) -> Ipv6Addr {
    let o = ip.octets();
    Ipv6Addr::new(
        0xff02,
        0,
        0,
        0,
        0,
        0x0001,
        0xff00 | o[13] as u16,
        ((o[14] as u16) << 8) | o[15] as u16,
    )
}

/// Generate an IPv6 address within the provided `cidr`, using the EUI-64
/// transform of `mac`.
pub fn generate_ipv6_addr(cidr: Ipv6Net, mac: MacAddr) -> Ipv6Addr {
    let prefix: u128 = cidr.addr().into();
    let mac = u128::from(u64::from_be_bytes(mac.to_eui64()));
    let mask: u128 = cidr.mask_addr().into();
    let ipv6 = (prefix & mask) | (mac & !mask);
    ipv6.into()
}

/// Generate a link-local IPv6 address using the EUI-64 transform of `mac`.
pub fn generate_ipv6_link_local(mac: MacAddr) -> Ipv6Addr {
    const LINK_LOCAL_PREFIX: Ipv6Net =
        Ipv6Net::new_unchecked(Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 0), 64);

    generate_ipv6_addr(LINK_LOCAL_PREFIX, mac)
}

/// An EUI-48 MAC address, used for layer-2 addressing.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct MacAddr {
    a: [u8; 6],
}

impl From<[u8; 6]> for MacAddr {
    fn from(a: [u8; 6]) -> Self {
        Self { a }
    }
}

impl MacAddr {
    pub const ZERO: Self = MacAddr {
        a: [0, 0, 0, 0, 0, 0],
    };

    /// Create a new MAC address from octets in network byte order.
    pub fn new(o0: u8, o1: u8, o2: u8, o3: u8, o4: u8, o5: u8) -> MacAddr {
        MacAddr {
            a: [o0, o1, o2, o3, o4, o5],
        }
    }

    /// Create a new MAC address from a slice of bytes in network byte order.
    ///
    /// # Panics
    ///
    /// Panics if the slice is fewer than 6 octets.
    ///
    /// Note that any further octets are ignored.
    pub fn from_slice(s: &[u8]) -> MacAddr {
        MacAddr::new(s[0], s[1], s[2], s[3], s[4], s[5])
    }

    /// Convert `self` to an array of bytes in network byte order.
    pub fn to_vec(self) -> Vec<u8> {
        vec![
            self.a[0], self.a[1], self.a[2], self.a[3], self.a[4], self.a[5],
        ]
    }

    /// Return `true` if `self` is the null MAC address, all zeros.
    pub fn is_null(self) -> bool {
        self == MacAddr::ZERO
    }

    /// Return `true` if `self` has the group (multicast) bit set.
    pub fn is_multicast(self) -> bool {
        self.a[0] & 0x01 != 0
    }

    /// Generate a random MAC address.
    pub fn random() -> MacAddr {
        let mut rng = rand::thread_rng();
        let mut m = MacAddr { a: [0; 6] };
        for octet in m.a.iter_mut() {
            *octet = rng.gen();
        }
        m
    }

    /// Generate an EUI-64 ID from the mac address, following the process
    /// described in RFC 2464, section 4.
    pub fn to_eui64(self) -> [u8; 8] {
        [
            self.a[0] ^ 0x2,
            self.a[1],
            self.a[2],
            0xff,
            0xfe,
            self.a[3],
            self.a[4],
            self.a[5],
        ]
    }
}

#[derive(Error, Debug, Clone)]
pub enum MacError {
    /// Too few octets to be a valid MAC address
    #[error("Too few octets")]
    TooShort,
    /// Too many octets to be a valid MAC address
    #[error("Too many octets")]
    TooLong,
    /// Found an octet with a non-hexadecimal character or invalid separator
    #[error("Invalid octet")]
    InvalidOctet,
}

impl FromStr for MacAddr {
    type Err = MacError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut a = [0u8; 6];
        let mut octets = 0;

        for octet in s.split(':') {
            if octets == 6 {
                return Err(MacError::TooLong);
            }
            if octet.len() > 2 {
                return Err(MacError::InvalidOctet);
            }
            a[octets] = u8::from_str_radix(octet, 16)
                .map_err(|_| MacError::InvalidOctet)?;
            octets += 1;
        }

        if octets < 6 {
            return Err(MacError::TooShort);
        }
        Ok(MacAddr { a })
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self.a[0], self.a[1], self.a[2], self.a[3], self.a[4], self.a[5]
        )
    }
}

impl fmt::Debug for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl From<&MacAddr> for u64 {
    fn from(mac: &MacAddr) -> u64 {
        ((mac.a[0] as u64) << 40)
            | ((mac.a[1] as u64) << 32)
            | ((mac.a[2] as u64) << 24)
            | ((mac.a[3] as u64) << 16)
            | ((mac.a[4] as u64) << 8)
            | (mac.a[5] as u64)
    }
}

impl From<MacAddr> for u64 {
    fn from(mac: MacAddr) -> u64 {
        (&mac).into()
    }
}

impl From<u64> for MacAddr {
    fn from(x: u64) -> Self {
        MacAddr::new(
            ((x >> 40) & 0xff) as u8,
            ((x >> 32) & 0xff) as u8,
            ((x >> 24) & 0xff) as u8,
            ((x >> 16) & 0xff) as u8,
            ((x >> 8) & 0xff) as u8,
            (x & 0xff) as u8,
        )
    }
}

// MAC addresses appear in config files and log output as strings, so they
// serialize in their display form rather than as a byte array.
impl Serialize for MacAddr {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for MacAddr {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        s.parse().map_err(de::Error::custom)
    }
}
