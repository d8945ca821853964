//! Entry point for the hostpulse TUI. Parses args, resolves the profile, and runs the session.

mod app;
mod ui;

use anyhow::Context;
use app::App;
use hostpulse::logging;
use hostpulse::poller::ResponseOrdering;
use hostpulse::profiles::{
    config_dir, load_profiles, save_profiles, ProfileEntry, ProfileRequest, ResolveProfile,
    Settings, DEFAULT_HTTP_BASE,
};
use hostpulse::session::{Session, Views};
use std::env;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::info;

const USAGE: &str = "[--profile NAME|-P NAME] [--save] [--tls-ca CERT_PEM|-t CERT_PEM] [--ws URL] [--interval MS] [--window N] [--ordering last-completed|discard-stale] [--no-reconnect] [--no-traffic] [--headless] [--log-file PATH] [--dry-run] [http://HOST:PORT]";

#[derive(Debug, Default)]
struct ParsedArgs {
    url: Option<String>,
    ws_url: Option<String>,
    tls_ca: Option<String>,
    profile: Option<String>,
    interval_ms: Option<u64>,
    window: Option<usize>,
    ordering: Option<ResponseOrdering>,
    save: bool,
    no_reconnect: bool,
    no_traffic: bool,
    headless: bool,
    dry_run: bool,
    log_file: Option<PathBuf>,
}

enum ArgsExit {
    Help(String),
    Invalid(String),
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<ParsedArgs, ArgsExit> {
    let mut it = args.into_iter();
    let prog = it.next().unwrap_or_else(|| "hostpulse".into());
    let mut out = ParsedArgs::default();
    let mut help = false;

    fn value(
        it: &mut impl Iterator<Item = String>,
        flag: &str,
    ) -> Result<String, ArgsExit> {
        it.next()
            .ok_or_else(|| ArgsExit::Invalid(format!("{flag} requires a value")))
    }
    fn number<T: std::str::FromStr>(v: &str, flag: &str) -> Result<T, ArgsExit> {
        v.parse::<T>()
            .map_err(|_| ArgsExit::Invalid(format!("{flag}: not a number: {v}")))
    }
    fn ordering(v: &str) -> Result<ResponseOrdering, ArgsExit> {
        ResponseOrdering::parse(v)
            .ok_or_else(|| ArgsExit::Invalid(format!("--ordering: unknown policy {v}")))
    }

    while let Some(arg) = it.next() {
        // --flag=value forms
        if let Some((flag, v)) = arg.split_once('=').filter(|(f, _)| f.starts_with("--")) {
            match flag {
                "--tls-ca" if !v.is_empty() => out.tls_ca = Some(v.to_string()),
                "--profile" if !v.is_empty() => out.profile = Some(v.to_string()),
                "--ws" => out.ws_url = Some(v.to_string()),
                "--interval" => out.interval_ms = Some(number(v, flag)?),
                "--window" => out.window = Some(number(v, flag)?),
                "--ordering" => out.ordering = Some(ordering(v)?),
                "--log-file" => out.log_file = Some(PathBuf::from(v)),
                "--tls-ca" | "--profile" => {}
                _ => return Err(ArgsExit::Invalid(format!("Unknown option {flag}. Usage: {prog} {USAGE}"))),
            }
            continue;
        }
        match arg.as_str() {
            "-h" | "--help" => help = true,
            "--tls-ca" | "-t" => out.tls_ca = Some(value(&mut it, &arg)?),
            "--profile" | "-P" => out.profile = Some(value(&mut it, &arg)?),
            "--ws" => out.ws_url = Some(value(&mut it, &arg)?),
            "--interval" => out.interval_ms = Some(number(&value(&mut it, &arg)?, &arg)?),
            "--window" => out.window = Some(number(&value(&mut it, &arg)?, &arg)?),
            "--ordering" => out.ordering = Some(ordering(&value(&mut it, &arg)?)?),
            "--log-file" => out.log_file = Some(PathBuf::from(value(&mut it, &arg)?)),
            "--save" => out.save = true,
            "--no-reconnect" => out.no_reconnect = true,
            "--no-traffic" => out.no_traffic = true,
            "--headless" => out.headless = true,
            "--dry-run" => out.dry_run = true,
            _ if arg.starts_with('-') => {
                return Err(ArgsExit::Invalid(format!(
                    "Unknown option {arg}. Usage: {prog} {USAGE}"
                )));
            }
            _ => {
                if out.url.is_none() {
                    out.url = Some(arg);
                } else {
                    return Err(ArgsExit::Invalid(format!(
                        "Unexpected argument. Usage: {prog} {USAGE}"
                    )));
                }
            }
        }
    }
    if help {
        return Err(ArgsExit::Help(format!(
            "Usage: {prog} {USAGE}\n\nWithout a URL or profile, saved profiles are offered; \
             the default backend is {DEFAULT_HTTP_BASE}"
        )));
    }
    Ok(out)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    let parsed = match parse_args(env::args()) {
        Ok(v) => v,
        Err(ArgsExit::Help(msg)) => {
            eprintln!("{msg}");
            return Ok(ExitCode::SUCCESS);
        }
        Err(ArgsExit::Invalid(msg)) => {
            eprintln!("{msg}");
            return Ok(ExitCode::from(2));
        }
    };

    let Some(entry) = resolve_entry(&parsed)? else {
        return Ok(ExitCode::SUCCESS);
    };
    let settings = build_settings(&entry, &parsed)?;

    if parsed.dry_run {
        print_settings(&settings);
        return Ok(ExitCode::SUCCESS);
    }

    if parsed.headless {
        logging::init_stderr();
    } else {
        let path = parsed
            .log_file
            .clone()
            .unwrap_or_else(|| config_dir().join("hostpulse.log"));
        logging::init_file(&path)
            .with_context(|| format!("open log file {}", path.display()))?;
    }

    let session = Session::start(&settings).context("start session")?;
    let res = if parsed.headless {
        run_headless(session.views()).await
    } else {
        let mut app = App::new(session.views());
        app.run().await
    };
    session.teardown().await;
    res.map(|_| ExitCode::SUCCESS)
}

/// Work out which connection to use, persisting profiles the way the user asked.
fn resolve_entry(parsed: &ParsedArgs) -> anyhow::Result<Option<ProfileEntry>> {
    let profiles_file = load_profiles();
    let direct = parsed.url.as_ref().map(|u| ProfileEntry {
        url: u.clone(),
        ws_url: parsed.ws_url.clone(),
        tls_ca: parsed.tls_ca.clone(),
        poll_interval_ms: parsed.interval_ms,
        window_capacity: parsed.window,
    });
    let req = ProfileRequest {
        profile_name: parsed.profile.clone(),
        entry: direct,
    };

    let mut profiles_mut = profiles_file.clone();
    let entry = match req.resolve(&profiles_file) {
        ResolveProfile::Direct(entry) => {
            // Possibly save if profile specified and --save or new entry
            if let Some(name) = parsed.profile.as_ref() {
                match profiles_mut.profiles.get(name) {
                    None => {
                        // New profile: auto-save immediately
                        profiles_mut.profiles.insert(name.clone(), entry.clone());
                        save_profiles(&profiles_mut).context("save profiles")?;
                    }
                    Some(existing) if *existing != entry => {
                        let overwrite = parsed.save
                            || prompt_yes_no(&format!(
                                "Overwrite existing profile '{name}'? [y/N]: "
                            ));
                        if overwrite {
                            profiles_mut.profiles.insert(name.clone(), entry.clone());
                            save_profiles(&profiles_mut).context("save profiles")?;
                        }
                    }
                    Some(_) => {}
                }
            }
            entry
        }
        ResolveProfile::Loaded(entry) => entry,
        ResolveProfile::PromptSelect(names) => {
            eprintln!("Select profile:");
            for (i, n) in names.iter().enumerate() {
                eprintln!("  {}. {}", i + 1, n);
            }
            let line = prompt_string("Enter number (or blank to abort): ")?;
            let picked = line
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|idx| *idx >= 1 && *idx <= names.len())
                .and_then(|idx| profiles_mut.profiles.get(&names[idx - 1]));
            match picked {
                Some(entry) => entry.clone(),
                None => return Ok(None),
            }
        }
        ResolveProfile::PromptCreate(name) => {
            eprintln!("Profile '{name}' does not exist yet.");
            let url = prompt_string(&format!("Enter backend URL (default {DEFAULT_HTTP_BASE}): "))?;
            let url = match url.trim() {
                "" => DEFAULT_HTTP_BASE.to_string(),
                u => u.to_string(),
            };
            let ca = prompt_string("Enter TLS CA path (or leave blank): ")?;
            let entry = ProfileEntry {
                url,
                ws_url: parsed.ws_url.clone(),
                tls_ca: Some(ca.trim().to_string()).filter(|c| !c.is_empty()),
                poll_interval_ms: parsed.interval_ms,
                window_capacity: parsed.window,
            };
            profiles_mut.profiles.insert(name, entry.clone());
            save_profiles(&profiles_mut).context("save profiles")?;
            entry
        }
        ResolveProfile::None => {
            eprintln!("No URL provided and no profiles to select; try {DEFAULT_HTTP_BASE}");
            return Ok(None);
        }
    };
    Ok(Some(entry))
}

/// Profile values first, then one-off CLI overrides that are never persisted.
fn build_settings(entry: &ProfileEntry, parsed: &ParsedArgs) -> anyhow::Result<Settings> {
    let mut settings = Settings::from_entry(entry).context("invalid connection settings")?;
    if let Some(ws) = parsed.ws_url.as_deref() {
        settings.ws_url = url::Url::parse(ws).context("invalid --ws url")?;
    }
    if let Some(ca) = parsed.tls_ca.as_deref() {
        settings.tls_ca = Some(PathBuf::from(ca));
    }
    if let Some(ms) = parsed.interval_ms {
        settings.poll_interval = Duration::from_millis(ms);
    }
    if let Some(cap) = parsed.window {
        settings.window_capacity = cap;
    }
    if let Some(ordering) = parsed.ordering {
        settings.ordering = ordering;
    }
    if parsed.no_reconnect {
        settings.reconnect = None;
    }
    if parsed.no_traffic {
        settings.traffic_interval = None;
    }
    settings.validate()?;
    Ok(settings)
}

fn print_settings(s: &Settings) {
    println!("http: {}", s.http_base);
    println!("ws: {}", s.ws_url);
    if let Some(ca) = s.tls_ca.as_ref() {
        println!("tls_ca: {}", ca.display());
    }
    println!("poll_interval_ms: {}", s.poll_interval.as_millis());
    println!("window: {}", s.window_capacity);
    println!("ordering: {}", s.ordering.as_str());
    println!("reconnect: {}", if s.reconnect.is_some() { "on" } else { "off" });
    println!(
        "traffic_interval_ms: {}",
        s.traffic_interval
            .map(|d| d.as_millis().to_string())
            .unwrap_or_else(|| "off".into())
    );
}

// One summary line per second until Ctrl-C.
async fn run_headless(views: Views) -> anyhow::Result<()> {
    use ui::util::human_rate;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let up = views.uptime().map(|u| u.formatted).unwrap_or_else(|| "--".into());
                let now = views.throughput().latest();
                let load = views
                    .dynamic()
                    .map(|d| format!(
                        "cpu {:.1}% mem {:.1}% disk {:.1}%",
                        d.cpu_percent, d.memory_percent, d.disk_percent
                    ))
                    .unwrap_or_else(|| "cpu -- mem -- disk --".into());
                let top = views
                    .top_processes()
                    .iter()
                    .map(|p| format!("{}({:.1}%)", p.name, p.cpu_percent))
                    .collect::<Vec<_>>()
                    .join(" ");
                println!(
                    "up {up} | {load} | down {} up {} | {top}",
                    human_rate(now.download_bps),
                    human_rate(now.upload_bps)
                );
            }
            res = &mut ctrl_c => {
                res.context("listen for ctrl-c")?;
                info!("interrupted");
                break;
            }
        }
    }
    Ok(())
}

fn prompt_yes_no(prompt: &str) -> bool {
    eprint!("{prompt}");
    let _ = io::stderr().flush();
    let mut line = String::new();
    if io::stdin().read_line(&mut line).is_ok() {
        matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    } else {
        false
    }
}

fn prompt_string(prompt: &str) -> io::Result<String> {
    eprint!("{prompt}");
    let _ = io::stderr().flush();
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line)
}
