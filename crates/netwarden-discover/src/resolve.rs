//! Hostname resolution.
//!
//! An ordered chain of resolvers, first success wins: reverse-DNS
//! canonical name, port-signature heuristic, short reverse lookup, and
//! finally a deterministic placeholder derived from the last octet. The
//! chain always produces a name.

use std::net::Ipv4Addr;

use crate::probe;

/// Listening ports that identify a device role, checked in order.
pub const SIGNATURE_PORTS: &[(u16, &str)] = &[
    (80, "WebDevice"),
    (443, "WebDevice"),
    (22, "SSHDevice"),
    (23, "TelnetDevice"),
    (21, "FTPDevice"),
    (3389, "RDPDevice"),
    (8080, "ProxyDevice"),
    (8443, "ProxyDevice"),
    (53, "DNSDevice"),
    (67, "DHCPDevice"),
    (68, "DHCPDevice"),
    (161, "SNMPDevice"),
    (162, "SNMPDevice"),
];

/// Resolve a display hostname for `ip`.
pub async fn hostname(ip: Ipv4Addr, port_timeout_ms: u64) -> String {
    if let Some(name) = canonical_name(ip).await {
        return name;
    }
    if let Some(name) = signature_name(ip, port_timeout_ms).await {
        return name;
    }
    if let Some(name) = reverse_name(ip).await {
        return name;
    }
    placeholder_name(ip)
}

/// Reverse-DNS canonical name via `nslookup`.
async fn canonical_name(ip: Ipv4Addr) -> Option<String> {
    let output = probe::command_stdout("nslookup", &[&ip.to_string()]).await?;
    parse_nslookup(&output, ip)
}

/// The first open signature port names the device.
async fn signature_name(ip: Ipv4Addr, port_timeout_ms: u64) -> Option<String> {
    for &(port, name) in SIGNATURE_PORTS {
        if probe::port_open(ip, port, port_timeout_ms).await {
            return Some(name.to_string());
        }
    }
    None
}

/// Short reverse lookup via `dig -x <ip> +short`.
async fn reverse_name(ip: Ipv4Addr) -> Option<String> {
    let output = probe::command_stdout("dig", &["-x", &ip.to_string(), "+short"]).await?;
    parse_dig(&output, ip)
}

/// Deterministic placeholder from the last address octet.
pub fn placeholder_name(ip: Ipv4Addr) -> String {
    let octet = ip.octets()[3];
    match octet {
        1 => "Router".to_string(),
        2 => "Switch".to_string(),
        3 => "AccessPoint".to_string(),
        100..=199 => format!("Client-{octet}"),
        200..=254 => format!("Device-{octet}"),
        _ => format!("Node-{octet}"),
    }
}

/// Extract the `name = <fqdn>` answer from nslookup output. The name is
/// rejected when empty or when it just echoes the address.
fn parse_nslookup(output: &str, ip: Ipv4Addr) -> Option<String> {
    let ip_text = ip.to_string();
    for line in output.lines() {
        if let Some(pos) = line.find("name = ") {
            let name = line[pos + 7..].trim().trim_end_matches('.');
            if !name.is_empty() && name != ip_text {
                return Some(name.to_string());
            }
        }
    }
    None
}

/// First PTR answer from `dig +short`, trailing dot trimmed.
fn parse_dig(output: &str, ip: Ipv4Addr) -> Option<String> {
    let name = output.lines().next()?.trim().trim_end_matches('.');
    if name.is_empty() || name == ip.to_string() {
        return None;
    }
    Some(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_covers_octet_table() {
        let name = |last| placeholder_name(Ipv4Addr::new(192, 168, 1, last));
        assert_eq!(name(1), "Router");
        assert_eq!(name(2), "Switch");
        assert_eq!(name(3), "AccessPoint");
        assert_eq!(name(100), "Client-100");
        assert_eq!(name(199), "Client-199");
        assert_eq!(name(200), "Device-200");
        assert_eq!(name(254), "Device-254");
        assert_eq!(name(0), "Node-0");
        assert_eq!(name(50), "Node-50");
        assert_eq!(name(255), "Node-255");
    }

    #[test]
    fn nslookup_answer_is_extracted() {
        let ip = Ipv4Addr::new(192, 168, 1, 50);
        let output = "50.1.168.192.in-addr.arpa\tname = printer.lan.\n";
        assert_eq!(parse_nslookup(output, ip), Some("printer.lan".to_string()));
    }

    #[test]
    fn nslookup_rejects_address_echo() {
        let ip = Ipv4Addr::new(192, 168, 1, 50);
        let output = "50.1.168.192.in-addr.arpa\tname = 192.168.1.50.\n";
        assert_eq!(parse_nslookup(output, ip), None);
    }

    #[test]
    fn nslookup_without_answer_is_none() {
        let ip = Ipv4Addr::new(192, 168, 1, 50);
        let output = "** server can't find 50.1.168.192.in-addr.arpa: NXDOMAIN\n";
        assert_eq!(parse_nslookup(output, ip), None);
    }

    #[test]
    fn dig_short_answer_is_trimmed() {
        let ip = Ipv4Addr::new(192, 168, 1, 50);
        assert_eq!(parse_dig("printer.lan.\n", ip), Some("printer.lan".to_string()));
        assert_eq!(parse_dig("\n", ip), None);
    }
}
