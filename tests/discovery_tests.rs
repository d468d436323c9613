use lan_sentry_rs::discovery::parse_neighbors;

const MIXED_OUTPUT: &str = "\
router.lan (10.0.1.1) at 0:11:22:33:44:55 on en0 ifscope [ethernet]
? (10.0.1.42) at a4:83:e7:12:34:56 on en0 ifscope [ethernet]
some diagnostic noise the cache printed
? (10.0.1.99) at (incomplete) on en0 ifscope [ethernet]
";

#[test]
fn one_host_per_matching_line_in_input_order() {
    let hosts = parse_neighbors(MIXED_OUTPUT);
    assert_eq!(hosts.len(), 3);
    assert_eq!(
        (hosts[0].ip.as_str(), hosts[0].mac.as_str()),
        ("10.0.1.1", "0:11:22:33:44:55")
    );
    assert_eq!(hosts[1].ip, "10.0.1.42");
    // Incomplete entries still match the cache line shape.
    assert_eq!(hosts[2].mac, "(incomplete)");
}

#[test]
fn empty_or_garbage_input_yields_no_hosts() {
    assert!(parse_neighbors("").is_empty());
    assert!(parse_neighbors("usage: arp [-n] hostname\n").is_empty());
}
