//! Listing formats.
//!
//! Short listings are fixed-width tables; long listings are `key = value`
//! blocks with the long message as a heredoc.

use std::fmt::{Display, Write};

use chrono::{DateTime, TimeZone, Utc};
use corral_core::glidein::Glidein;
use corral_core::history::HistoryEntry;
use corral_core::site::{ExecutionService, Site};

fn opt<T: Display>(value: Option<T>) -> String {
    value.map_or_else(|| "null".to_string(), |v| v.to_string())
}

/// `MM-DD HH:MM` plus four spaces of padding.
fn short_date<Tz: TimeZone>(ts: DateTime<Utc>, tz: &Tz) -> String
where
    Tz::Offset: Display,
{
    format!("{}    ", ts.with_timezone(tz).format("%m-%d %H:%M"))
}

fn long_date<Tz: TimeZone>(ts: DateTime<Utc>, tz: &Tz) -> String
where
    Tz::Offset: Display,
{
    ts.with_timezone(tz).format("%a %b %d %H:%M:%S %Z %Y").to_string()
}

fn long_message(out: &mut String, message: Option<&str>) {
    match message {
        Some(message) => {
            let _ = writeln!(out, "long-message = <<END\n{message}\nEND");
        }
        None => out.push_str("long-message = null\n"),
    }
}

fn service(out: &mut String, prefix: &str, service: &ExecutionService) {
    let _ = writeln!(out, "{prefix} = {} {}", service.service_type, service.service_contact);
    let _ = writeln!(out, "{prefix}-project = {}", opt(service.project.as_deref()));
    let _ = writeln!(out, "{prefix}-queue = {}", opt(service.queue.as_deref()));
}

// ---------------------------------------------------------------------------
// Sites
// ---------------------------------------------------------------------------

pub fn sites_short<Tz: TimeZone>(sites: &[Site], tz: &Tz) -> String
where
    Tz::Offset: Display,
{
    let mut out = format!(
        "{:<8}{:<20}{:<12}{:<15}{:<15}{:<10}{}\n",
        "ID", "NAME", "OWNER", "CREATED", "LAST UPDATE", "STATE", "MESSAGE"
    );
    for site in sites {
        let _ = writeln!(
            out,
            "{:<8}{:<20}{:<12}{}{}{:<10}{}",
            site.id,
            site.name,
            site.local_username,
            short_date(site.created, tz),
            short_date(site.last_update, tz),
            site.state.as_str(),
            site.short_message
        );
    }
    out
}

pub fn site_long<Tz: TimeZone>(site: &Site, tz: &Tz) -> String
where
    Tz::Offset: Display,
{
    let mut out = String::new();
    let _ = writeln!(out, "id = {}", site.id);
    let _ = writeln!(out, "site-name = {}", site.name);
    let _ = writeln!(out, "created = {}", long_date(site.created, tz));
    let _ = writeln!(out, "last-update = {}", long_date(site.last_update, tz));
    let _ = writeln!(out, "state = {}", site.state);
    let _ = writeln!(out, "short-message = {}", site.short_message);
    long_message(&mut out, site.long_message.as_deref());
    let _ = writeln!(out, "install-path = {}", site.install_path);
    let _ = writeln!(out, "local-path = {}", site.local_path);
    let _ = writeln!(out, "condor-version = {}", opt(site.condor_version.as_deref()));
    let _ = writeln!(out, "condor-package = {}", opt(site.condor_package.as_deref()));

    out.push_str("environment =");
    for var in &site.environment {
        let _ = write!(out, " {}={}", var.variable, var.value);
    }
    out.push('\n');

    service(&mut out, "staging-service", &site.staging_service);
    service(&mut out, "glidein-service", &site.glidein_service);
    let _ = writeln!(out, "subject = {}", site.subject);
    let _ = writeln!(out, "local-username = {}", site.local_username);
    out
}

// ---------------------------------------------------------------------------
// Glideins
// ---------------------------------------------------------------------------

pub fn glideins_short<Tz: TimeZone>(glideins: &[Glidein], tz: &Tz) -> String
where
    Tz::Offset: Display,
{
    let mut out = format!(
        "{:<8}{:<25}{:<12}{:<8}{:<8}{:<15}{:<15}{:<10}{}\n",
        "ID", "SITE", "OWNER", "SLOTS", "WTIME", "CREATED", "LAST UPDATE", "STATE", "MESSAGE"
    );
    for g in glideins {
        let site = format!("{} ({})", g.site_name, g.site_id);
        let _ = writeln!(
            out,
            "{:<8}{:<25}{:<12}{:<8}{:<8}{}{}{:<10}{}",
            g.id,
            site,
            g.local_username,
            g.slots(),
            g.wall_time,
            short_date(g.created, tz),
            short_date(g.last_update, tz),
            g.state.as_str(),
            g.short_message
        );
    }
    out
}

pub fn glidein_long<Tz: TimeZone>(g: &Glidein, tz: &Tz) -> String
where
    Tz::Offset: Display,
{
    let mut out = String::new();
    let _ = writeln!(out, "id = {}", g.id);
    let _ = writeln!(out, "site = {}", g.site_id);
    let _ = writeln!(out, "site-name = {}", g.site_name);
    let _ = writeln!(out, "condor-host = {}", g.condor_host);
    let _ = writeln!(out, "count = {}", g.count);
    let _ = writeln!(out, "host-count = {}", g.host_count);
    let _ = writeln!(out, "num-cpus = {}", g.num_cpus);
    let _ = writeln!(out, "wall-time = {}", g.wall_time);
    let _ = writeln!(out, "idle-time = {}", opt(g.idle_time));
    let _ = writeln!(out, "created = {}", long_date(g.created, tz));
    let _ = writeln!(out, "last-update = {}", long_date(g.last_update, tz));
    let _ = writeln!(out, "state = {}", g.state);
    let _ = writeln!(out, "short-message = {}", g.short_message);
    long_message(&mut out, g.long_message.as_deref());
    let _ = writeln!(out, "condor-debug = {}", opt(g.condor_debug.as_deref()));
    let _ = writeln!(out, "gcb-broker = {}", opt(g.gcb_broker.as_deref()));
    let _ = writeln!(out, "ccb-address = {}", opt(g.ccb_address.as_deref()));
    let _ = writeln!(out, "submits = {}", g.submits);
    let _ = writeln!(out, "resubmit = {}", g.resubmit);
    let _ = writeln!(out, "resubmits = {}", opt(g.resubmits));
    let _ = writeln!(out, "until = {}", opt(g.until.map(|u| long_date(u, tz))));
    let _ = writeln!(out, "rsl = {}", opt(g.rsl.as_deref()));
    let _ = writeln!(out, "highport = {}", opt(g.highport));
    let _ = writeln!(out, "lowport = {}", opt(g.lowport));
    let _ = writeln!(out, "subject = {}", g.subject);
    let _ = writeln!(out, "local-username = {}", g.local_username);
    out
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

/// `ID STATE TIME` rows with full local timestamps.
pub fn history<S: Display, Tz: TimeZone>(entries: &[HistoryEntry<S>], tz: &Tz) -> String
where
    Tz::Offset: Display,
{
    let mut out = format!("{:<8}{:<10}{}\n", "ID", "STATE", "TIME");
    for entry in entries {
        let _ = writeln!(
            out,
            "{:<8}{:<10}{}",
            entry.id,
            entry.state.to_string(),
            entry.time.with_timezone(tz).format("%Y-%m-%d %H:%M:%S")
        );
    }
    out
}
