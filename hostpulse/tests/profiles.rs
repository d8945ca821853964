//! Tests for profile load/save and resolution logic (non-interactive paths only)
use assert_cmd::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;
use std::time::Duration;

use hostpulse::poller::ResponseOrdering;
use hostpulse::profiles::{
    derive_ws_url, parse_http_base, ProfileEntry, ProfileRequest, ProfilesFile, ResolveProfile,
    Settings,
};

// Global lock to serialize tests that mutate process-wide environment variables.
static ENV_LOCK: Mutex<()> = Mutex::new(());

fn run_hostpulse(xdg: &Path, args: &[&str]) -> (bool, String) {
    let output = Command::cargo_bin("hostpulse")
        .expect("binary exists")
        .env("XDG_CONFIG_HOME", xdg)
        .args(args)
        .output()
        .expect("run hostpulse");
    let ok = output.status.success();
    let text = format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    (ok, text)
}

fn profiles_path(xdg: &Path) -> PathBuf {
    xdg.join("hostpulse").join("profiles.json")
}

#[test]
fn test_profile_created_on_first_use() {
    let td = tempfile::tempdir().unwrap();
    let (ok, out) = run_hostpulse(
        td.path(),
        &["--profile", "unittest", "http://example:1", "--dry-run"],
    );
    assert!(ok, "{out}");
    let data = fs::read_to_string(profiles_path(td.path())).expect("profiles.json created");
    assert!(
        data.contains("unittest"),
        "profiles.json missing profile entry: {data}"
    );
}

#[test]
fn test_profile_overwrite_only_when_changed() {
    let td = tempfile::tempdir().unwrap();
    let (_ok, _out) = run_hostpulse(td.path(), &["--profile", "prod", "http://one:8000", "--dry-run"]);
    let first = fs::read_to_string(profiles_path(td.path())).unwrap();
    // identical input: no rewrite
    let (_ok2, _out2) = run_hostpulse(td.path(), &["--profile", "prod", "http://one:8000", "--dry-run"]);
    let second = fs::read_to_string(profiles_path(td.path())).unwrap();
    assert_eq!(first, second, "Profile file changed despite identical input");
    // changed without --save: the prompt reads EOF and declines
    let (_ok3, _out3) = run_hostpulse(td.path(), &["--profile", "prod", "http://two:8000", "--dry-run"]);
    let third = fs::read_to_string(profiles_path(td.path())).unwrap();
    assert_eq!(first, third, "Profile overwritten without confirmation");
    let (_ok4, _out4) = run_hostpulse(
        td.path(),
        &["--profile", "prod", "--save", "http://two:8000", "--dry-run"],
    );
    let fourth = fs::read_to_string(profiles_path(td.path())).unwrap();
    assert!(fourth.contains("two"), "Updated URL not written: {fourth}");
}

#[test]
fn test_profile_fields_persisted_and_reloaded() {
    let td = tempfile::tempdir().unwrap();
    let (ok, out) = run_hostpulse(
        td.path(),
        &[
            "--profile",
            "secureX",
            "--tls-ca",
            "/tmp/cert.pem",
            "--interval",
            "1500",
            "https://host:8443",
            "--dry-run",
        ],
    );
    assert!(ok, "{out}");
    let data = fs::read_to_string(profiles_path(td.path())).unwrap();
    assert!(data.contains("secureX"));
    assert!(data.contains("cert.pem"));
    assert!(data.contains("1500"));

    // Loading by name alone reproduces the same settings.
    let (ok, out) = run_hostpulse(td.path(), &["--profile", "secureX", "--dry-run"]);
    assert!(ok, "{out}");
    assert!(out.contains("http: https://host:8443/"), "{out}");
    assert!(out.contains("ws: wss://host:8443/ws/network"), "{out}");
    assert!(out.contains("tls_ca: /tmp/cert.pem"), "{out}");
    assert!(out.contains("poll_interval_ms: 1500"), "{out}");
}

#[test]
fn test_no_url_and_no_profiles_exits_cleanly() {
    let td = tempfile::tempdir().unwrap();
    let (ok, out) = run_hostpulse(td.path(), &["--dry-run"]);
    assert!(ok, "{out}");
    assert!(out.contains("No URL provided"), "{out}");
    assert!(!profiles_path(td.path()).exists());
}

fn entry(url: &str) -> ProfileEntry {
    ProfileEntry {
        url: url.into(),
        ..ProfileEntry::default()
    }
}

#[test]
fn resolve_prefers_direct_entry() {
    let mut pf = ProfilesFile::default();
    pf.profiles.insert("a".into(), entry("http://a:1"));
    let req = ProfileRequest {
        profile_name: Some("a".into()),
        entry: Some(entry("http://b:2")),
    };
    match req.resolve(&pf) {
        ResolveProfile::Direct(e) => assert_eq!(e.url, "http://b:2"),
        _ => panic!("expected Direct"),
    }
}

#[test]
fn resolve_by_name_loads_or_prompts() {
    let mut pf = ProfilesFile::default();
    pf.profiles.insert("a".into(), entry("http://a:1"));
    pf.profiles.insert("b".into(), entry("http://b:1"));

    let loaded = ProfileRequest {
        profile_name: Some("a".into()),
        entry: None,
    }
    .resolve(&pf);
    assert!(matches!(loaded, ResolveProfile::Loaded(e) if e.url == "http://a:1"));

    let create = ProfileRequest {
        profile_name: Some("zzz".into()),
        entry: None,
    }
    .resolve(&pf);
    assert!(matches!(create, ResolveProfile::PromptCreate(n) if n == "zzz"));

    let select = ProfileRequest {
        profile_name: None,
        entry: None,
    }
    .resolve(&pf);
    assert!(matches!(select, ResolveProfile::PromptSelect(names) if names == ["a", "b"]));

    let none = ProfileRequest {
        profile_name: None,
        entry: None,
    }
    .resolve(&ProfilesFile::default());
    assert!(matches!(none, ResolveProfile::None));
}

#[test]
fn ws_url_derivation() {
    let cases = [
        ("http://127.0.0.1:8000", "ws://127.0.0.1:8000/ws/network"),
        ("http://127.0.0.1:8000/", "ws://127.0.0.1:8000/ws/network"),
        ("https://mon.lan/api-root/", "wss://mon.lan/api-root/ws/network"),
        ("host:9000", "ws://host:9000/ws/network"),
    ];
    for (base, want) in cases {
        let url = parse_http_base(base).unwrap();
        assert_eq!(derive_ws_url(&url).unwrap().as_str(), want, "{base}");
    }
}

#[test]
fn settings_defaults_and_validation() {
    let s = Settings::from_entry(&entry("http://127.0.0.1:8000")).unwrap();
    assert_eq!(s.poll_interval, Duration::from_secs(2));
    assert_eq!(s.uptime_tick, Duration::from_secs(1));
    assert_eq!(s.window_capacity, 30);
    assert_eq!(s.top_processes, 5);
    assert_eq!(s.ordering, ResponseOrdering::DiscardStale);
    assert!(s.reconnect.is_some());
    assert!(s.validate().is_ok());

    let mut bad = s.clone();
    bad.window_capacity = 0;
    assert!(bad.validate().is_err());

    let mut bad = s.clone();
    bad.ws_url = url::Url::parse("http://127.0.0.1:8000/ws/network").unwrap();
    assert!(bad.validate().is_err());

    let mut bad = s;
    bad.traffic_interval = Some(Duration::ZERO);
    assert!(bad.validate().is_err());

    let ftp = Settings::from_entry(&entry("ftp://host/"));
    assert!(ftp.is_err() || ftp.unwrap().validate().is_err());
}

#[test]
fn profiles_file_round_trip_through_env() {
    let _guard = ENV_LOCK.lock().unwrap();
    let td = tempfile::tempdir().unwrap();
    std::env::set_var("XDG_CONFIG_HOME", td.path());
    let mut pf = ProfilesFile::default();
    pf.profiles.insert(
        "lab".into(),
        ProfileEntry {
            url: "http://lab:8000".into(),
            window_capacity: Some(45),
            ..ProfileEntry::default()
        },
    );
    hostpulse::profiles::save_profiles(&pf).unwrap();
    assert!(profiles_path(td.path()).exists());
    let back = hostpulse::profiles::load_profiles();
    assert_eq!(back.profiles.get("lab"), pf.profiles.get("lab"));

    // A corrupt file is ignored rather than fatal.
    fs::write(profiles_path(td.path()), "{not json").unwrap();
    assert!(hostpulse::profiles::load_profiles().profiles.is_empty());
    std::env::remove_var("XDG_CONFIG_HOME");
}
