use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use quorumcast::config::{Config, LISTEN_HOST_ENV, Tuning};

#[test]
fn test_config_listen_host_from_env() {
    // Kept in one test so the env var is never observed half-set by another
    unsafe {
        std::env::remove_var(LISTEN_HOST_ENV);
    }
    let cfg = Config::load(9000, 2).unwrap();
    assert_eq!(cfg.listen_addr.ip(), IpAddr::V4(Ipv4Addr::UNSPECIFIED));
    assert_eq!(cfg.listen_addr.port(), 9000);

    unsafe {
        std::env::set_var(LISTEN_HOST_ENV, "127.0.0.1");
    }
    let cfg = Config::load(9001, 2).unwrap();
    assert_eq!(cfg.listen_addr.to_string(), "127.0.0.1:9001");

    unsafe {
        std::env::set_var(LISTEN_HOST_ENV, "not-an-ip");
    }
    assert!(Config::load(9002, 2).is_err());

    unsafe {
        std::env::remove_var(LISTEN_HOST_ENV);
    }
}

#[test]
fn test_tuning_defaults() {
    let t = Tuning::default();

    assert_eq!(t.inbound_capacity, 2048);
    assert_eq!(t.outbound_capacity, 10 * 1024 * 1024);
    assert_eq!(t.poll_interval, Duration::from_millis(100));
    assert_eq!(t.grace_period, Duration::from_secs(1));
    assert_eq!(t.drain_timeout, Duration::from_secs(1));
}

#[test]
fn test_tuning_partial_yaml_keeps_defaults() {
    let t = Tuning::from_yaml_str("max_payload: 64\ngrace_period_ms: 250\n").unwrap();

    assert_eq!(t.max_payload, 64);
    assert_eq!(t.grace_period, Duration::from_millis(250));
    assert_eq!(t.inbound_capacity, Tuning::default().inbound_capacity);
}

#[test]
fn test_tuning_rejects_unknown_types() {
    assert!(Tuning::from_yaml_str("max_payload: lots\n").is_err());
}

#[test]
fn test_tuning_load_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tuning.yaml");
    std::fs::write(&path, "max_connections: 8\ndrain_timeout_ms: 50\n").unwrap();

    let t = Tuning::load_file(&path).unwrap();
    assert_eq!(t.max_connections, 8);
    assert_eq!(t.drain_timeout, Duration::from_millis(50));

    assert!(Tuning::load_file(&dir.path().join("missing.yaml")).is_err());
}

#[test]
fn test_validate() {
    let base = Config {
        listen_addr: "127.0.0.1:0".parse().unwrap(),
        expected_clients: 1,
        tuning: Tuning::default(),
    };
    assert!(base.validate().is_ok());

    let mut cfg = base.clone();
    cfg.expected_clients = 0;
    assert!(cfg.validate().is_err());

    let mut cfg = base.clone();
    cfg.tuning.max_payload = cfg.tuning.inbound_capacity;
    assert!(cfg.validate().is_err());

    let mut cfg = base.clone();
    cfg.tuning.outbound_capacity = 0;
    assert!(cfg.validate().is_err());

    let mut cfg = base;
    cfg.tuning.poll_interval = Duration::ZERO;
    assert!(cfg.validate().is_err());
}
