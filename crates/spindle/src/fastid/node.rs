use std::net::Ipv4Addr;

/// Derives a node id from the last two octets of an IPv4 address.
///
/// ```
/// use std::net::Ipv4Addr;
/// use spindle::node_id_from_ipv4;
///
/// assert_eq!(node_id_from_ipv4(Ipv4Addr::new(10, 0, 1, 2)), 258);
/// ```
pub fn node_id_from_ipv4(addr: Ipv4Addr) -> i64 {
    let [_, _, hi, lo] = addr.octets();
    (i64::from(hi) << 8) + i64::from(lo)
}

/// Derives a node id from the first non-loopback private IPv4 address
/// (`10/8`, `172.16/12`, `192.168/16`) of the host, or `0` if there is none.
pub fn local_node_id() -> i64 {
    local_private_ipv4().map_or(0, node_id_from_ipv4)
}

#[cfg(feature = "net")]
fn local_private_ipv4() -> Option<Ipv4Addr> {
    use std::net::IpAddr;

    let interfaces = match if_addrs::get_if_addrs() {
        Ok(interfaces) => interfaces,
        Err(_e) => {
            #[cfg(feature = "tracing")]
            tracing::debug!("Failed to list network interfaces: {_e}");
            return None;
        }
    };

    interfaces
        .into_iter()
        .filter(|iface| !iface.is_loopback())
        .find_map(|iface| match iface.ip() {
            IpAddr::V4(addr) if addr.is_private() => Some(addr),
            _ => None,
        })
}

#[cfg(not(feature = "net"))]
fn local_private_ipv4() -> Option<Ipv4Addr> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uses_the_low_octets() {
        assert_eq!(node_id_from_ipv4(Ipv4Addr::new(192, 168, 0, 1)), 1);
        assert_eq!(node_id_from_ipv4(Ipv4Addr::new(172, 16, 255, 255)), 0xFFFF);
        assert_eq!(node_id_from_ipv4(Ipv4Addr::new(10, 9, 3, 7)), 3 * 256 + 7);
    }

    #[test]
    fn local_node_id_fits_sixteen_bits() {
        let id = local_node_id();
        assert!((0..=0xFFFF).contains(&id));
    }
}
