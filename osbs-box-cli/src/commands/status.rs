//! `osbs-box status`: OpenShift, Koji and container visibility.

use anyhow::{Context as _, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use osbs_box_core::status::{self, ClusterStatus, KojiStatus, ServiceStatus, NOT_FOUND};
use osbs_box_core::{Context, StatusReport};

/// Arguments for `osbs-box status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self, ctx: &Context<'_>) -> Result<()> {
        let report = status::collect(ctx).context("failed to collect osbs-box status")?;
        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize status JSON")?
            );
            return Ok(());
        }

        print_report(&report);
        Ok(())
    }
}

#[derive(Tabled)]
struct ServiceRow {
    #[tabled(rename = "service")]
    service: String,
    #[tabled(rename = "state")]
    state: String,
}

fn print_report(report: &StatusReport) {
    match &report.cluster {
        ClusterStatus::Running { url } => {
            println!("OpenShift URL: {}", url.bold());
            println!("Credentials: osbs/osbs");
            println!("Namespaces: 'osbs' for orchestration builds, 'worker' for worker builds");
        }
        ClusterStatus::UrlNotFound => {
            println!("{}", "Failed to find OpenShift URL in the output".yellow());
        }
        ClusterStatus::NotRunning => println!("{}", "OpenShift is not running".red()),
    }
    println!();

    match &report.koji {
        KojiStatus::Running { hub_url, files_url } => {
            println!("Koji hub URL: {}", hub_url.bold());
            println!("Koji files URL: {}", files_url.bold());
        }
        KojiStatus::UrlNotFound => {
            println!("{}", "Failed to find Koji hub URL in the output".yellow());
        }
        KojiStatus::Unavailable => {}
    }
    println!();

    let rows: Vec<ServiceRow> = report.services.iter().map(service_row).collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}

fn service_row(service: &ServiceStatus) -> ServiceRow {
    let state = match service.state.as_str() {
        "running" => service.state.green().to_string(),
        NOT_FOUND => service.state.bright_black().to_string(),
        _ => service.state.yellow().to_string(),
    };
    ServiceRow {
        service: service.service.clone(),
        state,
    }
}
