// Copyright (c) 2026 OverTheFlow and Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// https://mozilla.org/MPL/2.0/.

use std::net::Ipv4Addr;

use pnet::ipnetwork::Ipv4Network;

/// Parses a strict dotted-quad address: four decimal octets in `0..=255`,
/// no signs, no whitespace and no leading zeros.
///
/// The strictness guarantees that the parsed address prints back as the
/// exact input, so an ip string can double as a lookup key.
pub fn parse_dotted_quad(s: &str) -> Option<Ipv4Addr> {
    s.parse().ok()
}

/// Returns `true` if `s` is a valid dotted-quad address.
pub fn is_ip(s: &str) -> bool {
    parse_dotted_quad(s).is_some()
}

/// Builds the network an address lives in from its full-format netmask
/// (e.g. `255.255.255.0`). Returns `None` for non-contiguous masks.
pub fn network(ip: Ipv4Addr, mask: Ipv4Addr) -> Option<Ipv4Network> {
    let net = Ipv4Network::with_netmask(ip, mask).ok()?;
    Ipv4Network::new(net.network(), net.prefix()).ok()
}

/// Converts a prefix length into a full-format netmask.
pub fn prefix_to_mask(prefix: u8) -> Option<Ipv4Addr> {
    if prefix > 32 {
        return None;
    }
    let bits: u32 = match prefix {
        0 => 0,
        p => u32::MAX << (32 - p),
    };
    Some(Ipv4Addr::from(bits))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
