use lan_sentry_rs::ports::{parse_port_list, DEFAULT_PORTS};

#[test]
fn parse_singles_ranges_comments_and_dedup() {
    let input = r#"
        # commonly exposed services
        22
        80  # http
        443 # https
        8080-8082
        8081  # duplicate inside the range above
    "#;

    let ports = parse_port_list(input).expect("parse ok");
    assert_eq!(ports, vec![22, 80, 443, 8080, 8081, 8082]);
}

#[test]
fn invalid_entries_rejected() {
    assert!(parse_port_list("0\n").is_err());
    assert!(parse_port_list("65536\n").is_err());
    assert!(parse_port_list("not-a-port\n").is_err());
}

#[test]
fn default_target_list_is_the_fixed_twenty() {
    assert_eq!(
        DEFAULT_PORTS,
        &[
            21, 22, 23, 25, 53, 80, 110, 135, 139, 143, 443, 445, 993, 995, 1433, 3306, 3389,
            5900, 8080, 8443
        ]
    );
}
