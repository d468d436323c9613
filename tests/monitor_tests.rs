use lan_sentry_rs::config::MonitorRules;
use lan_sentry_rs::monitor::ConnectionMonitor;
use lan_sentry_rs::types::RiskLevel;

/// Fabricate an lsof-shaped established-connection line.
fn line(cmd: &str, pid: u32, endpoint: &str) -> String {
    format!("{cmd} {pid} user 34u IPv4 0xabc123 0t0 TCP {endpoint} (ESTABLISHED)")
}

const HEADER: &str = "COMMAND PID USER FD TYPE DEVICE SIZE/OFF NODE NAME";

#[test]
fn diff_reports_only_connections_absent_from_previous_poll() {
    let mut monitor = ConnectionMonitor::new(MonitorRules::default());

    let a = line("appA", 10, "10.0.0.2:50001->1.1.1.1:443");
    let b = line("appB", 11, "10.0.0.2:50002->2.2.2.2:443");
    let c = line("appC", 12, "10.0.0.2:50003->3.3.3.3:443");

    // First poll: everything is new.
    let first = monitor.observe(&[HEADER, &a, &b].join("\n"));
    assert_eq!(first.len(), 2);

    // {A,B} -> {B,C}: only C is reported.
    let second = monitor.observe(&[HEADER, &b, &c].join("\n"));
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].command, "appC");
    assert_eq!(second[0].pid, 12);

    // Snapshot was replaced wholesale: A coming back counts as new again.
    let third = monitor.observe(&[HEADER, &a, &b, &c].join("\n"));
    assert_eq!(third.len(), 1);
    assert_eq!(third[0].command, "appA");
}

#[test]
fn empty_table_clears_the_snapshot() {
    let mut monitor = ConnectionMonitor::new(MonitorRules::default());
    let a = line("appA", 10, "10.0.0.2:50001->1.1.1.1:443");

    assert_eq!(monitor.observe(&a).len(), 1);
    assert!(monitor.observe("").is_empty());
    // After the wipe the same connection is new once more.
    assert_eq!(monitor.observe(&a).len(), 1);
}

#[test]
fn duplicate_lines_in_one_table_yield_one_event() {
    let mut monitor = ConnectionMonitor::new(MonitorRules::default());
    let a = line("appA", 10, "10.0.0.2:50001->1.1.1.1:443");
    let events = monitor.observe(&[a.as_str(), a.as_str()].join("\n"));
    assert_eq!(events.len(), 1);
}

#[test]
fn listening_sockets_and_noise_are_ignored() {
    let mut monitor = ConnectionMonitor::new(MonitorRules::default());
    let raw = [
        HEADER,
        "mysqld 88 mysql 21u IPv4 0xbeef 0t0 TCP *:3306 (LISTEN)",
        "garbage line",
    ]
    .join("\n");
    assert!(monitor.observe(&raw).is_empty());
}

#[test]
fn classification_flows_through_polling() {
    let mut monitor = ConnectionMonitor::new(MonitorRules::default());
    let raw = [
        line("curl", 20, "10.0.0.2:50004->93.184.216.34:1337"),
        line("Safari", 21, "10.0.0.2:50005->93.184.216.34:4444"),
        line("python", 22, "10.0.0.2:50006->198.51.100.7:8443"),
        line("Mail", 23, "10.0.0.2:50007->198.51.100.8:993"),
    ]
    .join("\n");

    let events = monitor.observe(&raw);
    assert_eq!(events.len(), 4);

    let by_cmd = |cmd: &str| events.iter().find(|e| e.command == cmd).unwrap();

    // Port blacklist takes precedence over the shell-tool heuristic.
    let curl = by_cmd("curl");
    assert_eq!(curl.level, RiskLevel::High);
    assert!(curl.alert.as_deref().unwrap().contains("1337"));

    // Allow-list short-circuits even a suspicious remote port.
    let safari = by_cmd("Safari");
    assert_eq!(safari.level, RiskLevel::Info);
    assert!(safari.alert.is_none());

    let python = by_cmd("python");
    assert_eq!(python.level, RiskLevel::Warning);

    let mail = by_cmd("Mail");
    assert_eq!(mail.level, RiskLevel::Info);
    assert!(mail.alert.is_none());
}

#[test]
fn spaced_command_names_shift_columns_but_still_parse() {
    let mut monitor = ConnectionMonitor::new(MonitorRules::default());
    let raw = "Code Hel 9879 rene 34u IPv4 0xdead 0t0 TCP 192.168.1.5:54321->142.250.0.1:443 (ESTABLISHED)";
    let events = monitor.observe(raw);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].pid, 9879);
    assert_eq!(events[0].endpoint, "192.168.1.5:54321->142.250.0.1:443");
}
