use std::net::Ipv4Addr;

use ipnet::Ipv4Net;

use crate::Error;

/// Expands a comma-separated list of ranges into the ordered list of targets.
///
/// Each token is either a CIDR block (`10.0.0.0/24`), a hyphen range
/// (`10.0.0.5-10.0.0.9`) or a single address. Empty tokens are skipped and
/// duplicates are kept.
pub fn parse_ranges(ranges: &str) -> Result<Vec<Ipv4Addr>, Error> {
    let mut targets = Vec::new();

    for token in ranges.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }

        let expanded = if token.contains('/') {
            parse_cidr(token)?
        } else if token.contains('-') {
            parse_hyphen_range(token)?
        } else {
            let address = token
                .parse::<Ipv4Addr>()
                .map_err(|_| Error::InvalidAddress(token.to_string()))?;
            vec![address]
        };

        targets.extend(expanded);
    }

    Ok(targets)
}

/// Network and broadcast addresses are left out unless the block has at most
/// two addresses (/31 and /32).
pub fn parse_cidr(token: &str) -> Result<Vec<Ipv4Addr>, Error> {
    let network = token
        .parse::<Ipv4Net>()
        .map_err(|err| Error::InvalidCidr {
            token: token.to_string(),
            reason: err.to_string(),
        })?
        .trunc();

    Ok(network.hosts().collect())
}

pub fn parse_hyphen_range(token: &str) -> Result<Vec<Ipv4Addr>, Error> {
    let parts: Vec<&str> = token.split('-').collect();
    if parts.len() != 2 {
        return Err(Error::InvalidRangeFormat(token.to_string()));
    }

    let start = parts[0].trim().parse::<Ipv4Addr>();
    let end = parts[1].trim().parse::<Ipv4Addr>();
    let (start, end) = match (start, end) {
        (Ok(start), Ok(end)) => (u32::from(start), u32::from(end)),
        _ => return Err(Error::InvalidRangeAddress(token.to_string())),
    };

    if start > end {
        return Err(Error::ReversedRange(token.to_string()));
    }

    Ok((start..=end).map(Ipv4Addr::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(targets: Vec<Ipv4Addr>) -> Vec<String> {
        targets.into_iter().map(|ip| ip.to_string()).collect()
    }

    #[test]
    fn cidr_excludes_network_and_broadcast() {
        let targets = parse_ranges("10.0.0.0/30").unwrap();
        assert_eq!(strings(targets), vec!["10.0.0.1", "10.0.0.2"]);

        let targets = parse_ranges("192.168.1.0/24").unwrap();
        assert_eq!(targets.len(), 254);
        assert_eq!(targets[0], Ipv4Addr::new(192, 168, 1, 1));
        assert_eq!(targets[253], Ipv4Addr::new(192, 168, 1, 254));
    }

    #[test]
    fn small_cidr_blocks_keep_every_address() {
        assert_eq!(
            strings(parse_ranges("10.0.0.4/31").unwrap()),
            vec!["10.0.0.4", "10.0.0.5"]
        );
        assert_eq!(strings(parse_ranges("10.0.0.9/32").unwrap()), vec!["10.0.0.9"]);
    }

    #[test]
    fn cidr_host_bits_are_masked() {
        assert_eq!(
            strings(parse_ranges("10.0.0.3/30").unwrap()),
            vec!["10.0.0.1", "10.0.0.2"]
        );
    }

    #[test]
    fn hyphen_range_is_inclusive() {
        assert_eq!(
            strings(parse_ranges("10.0.0.5-10.0.0.7").unwrap()),
            vec!["10.0.0.5", "10.0.0.6", "10.0.0.7"]
        );
        assert_eq!(
            strings(parse_ranges("10.0.0.255 - 10.0.1.0").unwrap()),
            vec!["10.0.0.255", "10.0.1.0"]
        );
        assert_eq!(strings(parse_ranges("1.2.3.4-1.2.3.4").unwrap()), vec!["1.2.3.4"]);
    }

    #[test]
    fn reversed_hyphen_range_fails() {
        let err = parse_ranges("10.0.0.7-10.0.0.5").unwrap_err();
        assert!(matches!(err, Error::ReversedRange(token) if token == "10.0.0.7-10.0.0.5"));
    }

    #[test]
    fn mixed_tokens_keep_order_and_skip_blanks() {
        let targets = parse_ranges(" 8.8.8.8, ,10.0.0.0/30,1.1.1.1-1.1.1.2,").unwrap();
        assert_eq!(
            strings(targets),
            vec!["8.8.8.8", "10.0.0.1", "10.0.0.2", "1.1.1.1", "1.1.1.2"]
        );
        assert!(parse_ranges(" , ").unwrap().is_empty());
    }

    #[test]
    fn malformed_tokens_are_named() {
        let err = parse_ranges("10.0.0.1,nope").unwrap_err();
        assert_eq!(err.to_string(), "invalid IP: nope");

        let err = parse_ranges("10.0.0.0/33").unwrap_err();
        assert!(err.to_string().starts_with("invalid CIDR 10.0.0.0/33"));

        let err = parse_ranges("1.1.1.1-1.1.1.2-1.1.1.3").unwrap_err();
        assert!(matches!(err, Error::InvalidRangeFormat(_)));

        let err = parse_ranges("1.1.1.1-host").unwrap_err();
        assert_eq!(err.to_string(), "invalid IP in range: 1.1.1.1-host");
    }
}
