//! Formatted output helpers for CLI commands.
//!
//! Formatting returns plain strings; only [`emit`] writes to stdout, so
//! logs on stderr never interleave with data.

use std::fmt::Write as _;

use dbdeploy_catalog::catalog::Catalog;
use dbdeploy_catalog::model::{DbmsEntry, ProbeSpec};
use dbdeploy_catalog::resolver::{BuildStep, LayerRole, Plan};
use dbdeploy_common::constants::LOCAL_HOST;
use dbdeploy_runtime::engine::DeployReport;

/// Writes command output to stdout.
#[allow(clippy::print_stdout)]
pub fn emit(text: &str) {
    println!("{}", text.trim_end());
}

/// One DBMS name per line, in catalog order.
#[must_use]
pub fn format_dbms_names(catalog: &Catalog) -> String {
    catalog
        .entries()
        .iter()
        .fold(String::new(), |mut out, entry| {
            let _ = writeln!(out, "{}", entry.name);
            out
        })
}

/// Release identifiers of one DBMS, oldest first, under a count header.
#[must_use]
pub fn format_releases(entry: &DbmsEntry) -> String {
    let releases = entry.releases();
    let mut out = format!("{} versions(old->new):\n", releases.len());
    for release in releases {
        let _ = writeln!(out, "{}", release.id);
    }
    out
}

/// Human-readable rendering of a resolved plan.
#[must_use]
pub fn format_plan(plan: &Plan) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Deployment plan for {} {}", plan.dbms, plan.release);
    let _ = writeln!(out, "  container: {}", plan.container);
    let _ = writeln!(out, "  image:     {}", plan.image);
    let _ = writeln!(out, "  port:      {} -> {}", plan.host_port, plan.container_port);
    if !plan.run_flags.is_empty() {
        let _ = writeln!(out, "  flags:     {}", plan.run_flags.join(" "));
    }
    let _ = writeln!(out, "  probe:     {}", describe_probe(&plan.probe));
    let _ = writeln!(out, "  init:      {} command(s)", plan.init.len());
    let _ = writeln!(out, "  build chain:");
    for (i, step) in plan.chain.iter().enumerate() {
        let n = i + 1;
        match step {
            BuildStep::Build {
                role,
                image,
                context,
                artifacts,
            } => {
                let role = match role {
                    LayerRole::Env => "env",
                    LayerRole::Release => "release",
                };
                let _ = writeln!(
                    out,
                    "    {n}. build {role} image {image} from {}",
                    context.display()
                );
                for artifact in artifacts.iter().flat_map(|set| &set.items) {
                    let _ = writeln!(out, "       fetch {}", artifact.url);
                }
            }
            BuildStep::Template { source, context } => {
                let _ = writeln!(
                    out,
                    "    {n}. copy {} into {}",
                    source.display(),
                    context.display()
                );
            }
            BuildStep::Pull { image } => {
                let _ = writeln!(out, "    {n}. pull {image}");
            }
        }
    }
    out
}

fn describe_probe(probe: &ProbeSpec) -> String {
    match probe {
        ProbeSpec::Connect => "connect".to_string(),
        ProbeSpec::Exec { command } => format!("exec {}", command.join(" ")),
    }
}

/// Connection summary printed after a successful deployment.
#[must_use]
pub fn format_summary(plan: &Plan, report: &DeployReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} {} (ready after {} probe(s))",
        report.container, report.transition, report.ready_after
    );
    let _ = writeln!(out, "  image:    {}", report.image);
    if let Some(evicted) = &report.evicted {
        let _ = writeln!(out, "  stopped:  {evicted}");
    }
    if report.init_commands > 0 {
        let _ = writeln!(out, "  init:     {} command(s)", report.init_commands);
    }
    let _ = writeln!(out, "  host:     {LOCAL_HOST}");
    let _ = writeln!(out, "  port:     {}", plan.host_port);
    let _ = writeln!(out, "  user:     {}", plan.credentials.user);
    let _ = writeln!(out, "  password: {}", plan.credentials.password);
    let _ = writeln!(out, "  database: {}", plan.credentials.default_db);
    out
}
