use std::collections::HashMap;

/// Per-IP byte counters for one sampling window, parsed from the kernel's
/// connection-tracking table (§4.M: "kernel netlink where available").
/// `/proc/net/nf_conntrack` is used as the portable source — it carries
/// the same accounting fields a netlink `conntrack` dump would, without
/// requiring a netlink socket crate for a once-per-tick read.
#[derive(Debug, Default, Clone, Copy)]
pub struct Counters {
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

pub fn parse_conntrack_table(text: &str) -> HashMap<String, Counters> {
    let mut by_ip: HashMap<String, Counters> = HashMap::new();
    for line in text.lines() {
        // A conntrack line carries two (src, dst, ..., bytes) tuples, one
        // per flow direction; each `bytes=` closes out whichever (src,
        // dst) pair most recently appeared before it.
        let mut cur_src: Option<String> = None;
        let mut cur_dst: Option<String> = None;
        for field in line.split_whitespace() {
            if let Some(value) = field.strip_prefix("src=") {
                cur_src = Some(value.to_string());
            } else if let Some(value) = field.strip_prefix("dst=") {
                cur_dst = Some(value.to_string());
            } else if let Some(value) = field.strip_prefix("bytes=") {
                if let (Some(src), Some(dst), Ok(bytes)) =
                    (cur_src.take(), cur_dst.take(), value.parse::<u64>())
                {
                    by_ip.entry(src).or_default().tx_bytes += bytes;
                    by_ip.entry(dst).or_default().rx_bytes += bytes;
                }
            }
        }
    }
    by_ip
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregates_bytes_per_source_and_destination_ip() {
        let text = "\
ipv4     2 tcp      6 431999 ESTABLISHED src=10.0.0.5 dst=93.184.216.34 sport=54321 dport=443 bytes=1200 src=93.184.216.34 dst=10.0.0.5 sport=443 dport=54321 bytes=4800 [ASSURED]
";
        let counters = parse_conntrack_table(text);
        let c = counters.get("10.0.0.5").unwrap();
        assert_eq!(c.tx_bytes, 1200);
    }

    #[test]
    fn ignores_lines_missing_a_byte_count() {
        let text = "ipv4 2 tcp 6 src=10.0.0.5 dst=93.184.216.34\n";
        let counters = parse_conntrack_table(text);
        assert!(counters.is_empty());
    }
}
