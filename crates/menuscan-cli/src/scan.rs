//! `menuscan scan`: run every requested menu through the scanner and export
//! the combined table.
//!
//! MED and REC URLs are independent jobs appended to the same table. A job
//! that finds nothing is reported and skipped; it never aborts the run.

use std::fs::File;
use std::io::{BufWriter, Write};

use anyhow::Context;
use menuscan_core::{AppConfig, MenuType, ResultTable, RowAccumulator, ScanRequest, TableSummary};
use menuscan_scraper::{CancelFlag, Scanner};

use crate::ScanArgs;

/// Expands the CLI arguments into one request per URL, in `--url`,
/// `--med-url`, `--rec-url` order.
pub(crate) fn build_requests(args: &ScanArgs) -> Vec<ScanRequest> {
    let browser_mode = args.browser || !args.no_browser;
    [
        (args.url.as_deref(), args.menu_type),
        (args.med_url.as_deref(), MenuType::Med),
        (args.rec_url.as_deref(), MenuType::Rec),
    ]
    .into_iter()
    .filter_map(|(url, menu_type)| {
        url.filter(|u| !u.trim().is_empty())
            .map(|u| ScanRequest::new(&args.label, u, menu_type))
    })
    .map(|req| {
        req.with_browser_mode(browser_mode)
            .with_force_browser(args.force_browser)
            .with_debug(args.debug)
    })
    .collect()
}

pub(crate) async fn run_scan(config: &AppConfig, args: &ScanArgs) -> anyhow::Result<()> {
    let requests = build_requests(args);
    if requests.is_empty() {
        anyhow::bail!("no menu URL given");
    }

    let scanner = Scanner::from_config(config).context("failed to build scanner")?;
    let cancel = CancelFlag::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received; stopping after the current stage");
            on_ctrl_c.cancel();
        }
    });

    let mut table = ResultTable::new();
    for req in &requests {
        tracing::info!(
            label = %req.dispensary_label,
            url = %req.url,
            menu_type = %req.effective_menu_type(),
            "scanning"
        );
        let outcome = match scanner.scan_with_cancel(req, &cancel).await {
            Ok(outcome) => outcome,
            Err(cancelled) => {
                eprintln!("{cancelled}; remaining menus skipped");
                break;
            }
        };

        if let Some(diagnostics) = &outcome.diagnostics {
            eprintln!("--- diagnostics: {} ---", req.url);
            eprintln!("{}", serde_json::to_string_pretty(diagnostics)?);
        }

        if outcome.rows.is_empty() {
            tracing::warn!(url = %req.url, "no products found");
            eprintln!(
                "warning: no products found for {} ({}). Try --force-browser or --debug.",
                req.dispensary_label, req.url
            );
            continue;
        }
        tracing::info!(url = %req.url, rows = outcome.rows.len(), "scan complete");
        table.append(outcome.rows);
    }

    eprintln!("{}", format_summary(&table.summary()));

    match &args.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            table.export(args.format, &mut writer)?;
            writer.flush()?;
            eprintln!("wrote {} rows to {}", table.len(), path.display());
        }
        None => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            table.export(args.format, &mut lock)?;
            lock.flush()?;
        }
    }

    Ok(())
}

pub(crate) fn format_summary(summary: &TableSummary) -> String {
    let average = summary
        .average_price
        .map_or_else(|| "n/a".to_owned(), |p| format!("${p:.2}"));
    format!(
        "rows: {}  dispensaries: {}  average price: {average}",
        summary.total_rows, summary.unique_dispensaries
    )
}
