//! VirusGuard: on-demand file scanner.
//!
//! This is the main entry point for the CLI application.

use log::LevelFilter;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use virusguard::core::config::Config;
use virusguard::core::error::{Error, Result};
use virusguard::core::types::{ScanMode, ScanResult, ScanSummary, ThreatLevel};
use virusguard::quarantine::QuarantineVault;
use virusguard::scanner::{ConsoleProgressReporter, ProgressCallback, ScanService};
use virusguard::ui::cli::{
    Cli, Commands, ConfigAction, OutputFormat, QuarantineAction, ReportAction,
};
use virusguard::ui::report::ReportWriter;
use virusguard::utils::logging::{cleanup_old_logs, init_logging, LogConfig};

/// Exit status when a scan found suspicious or malicious files.
const EXIT_THREATS_FOUND: u8 = 2;
/// Exit status after Ctrl-C.
const EXIT_CANCELLED: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(Error::ScanCancelled) => {
            eprintln!();
            eprintln!("Scan cancelled.");
            ExitCode::from(EXIT_CANCELLED)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            if let Some(hint) = e.suggestion() {
                eprintln!("Hint: {}", hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<ExitCode> {
    let cli = Cli::parse_args();

    let config = Config::load_or_default();

    let mut log_config = LogConfig::from_config(&config);
    if cli.verbose {
        log_config.level = LevelFilter::Debug;
        log_config.module_path = true;
    }
    init_logging(log_config)?;

    log::info!("VirusGuard v{}", env!("CARGO_PKG_VERSION"));
    match cleanup_old_logs(&config.logging.log_dir(), config.logging.keep_logs_days) {
        Ok(0) => {}
        Ok(n) => log::debug!("Removed {} old log file(s)", n),
        Err(e) => log::warn!("Log cleanup failed: {}", e),
    }

    match cli.command {
        Some(Commands::Scan {
            path,
            full,
            exclude,
            no_default_excludes,
            parallelism,
        }) => {
            run_scan(
                config,
                &path,
                full,
                exclude,
                no_default_excludes,
                parallelism,
                cli.format,
            )
            .await
        }
        Some(Commands::Quarantine { action }) => run_quarantine(config, action, cli.format).await,
        Some(Commands::Report { action }) => run_report(&config, action, cli.format),
        Some(Commands::Config { action }) => run_config(action, &config),
        Some(Commands::Info) => run_info(config).await,
        None => {
            println!("VirusGuard - On-demand File Scanner");
            println!();
            println!("Use --help for usage information");
            println!();
            println!("Quick start:");
            println!("  virusguard scan <PATH>          Scan a file or folder");
            println!("  virusguard scan <PATH> --full   Include entropy analysis");
            println!("  virusguard quarantine list      View quarantined items");
            println!("  virusguard report show          Show the latest report");
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Build and initialize a scan service from the loaded configuration.
async fn start_service(config: Config) -> Result<Arc<ScanService>> {
    let service = Arc::new(ScanService::new(config)?);
    service.initialize().await?;
    Ok(service)
}

/// Cancel the running scan on Ctrl-C.
fn cancel_on_ctrl_c(service: &Arc<ScanService>) {
    let service = Arc::clone(service);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            service.cancel();
        }
    });
}

/// Run a scan of a file or directory.
async fn run_scan(
    config: Config,
    path: &Path,
    full: bool,
    exclude: Vec<String>,
    no_default_excludes: bool,
    parallelism: Option<usize>,
    format: OutputFormat,
) -> Result<ExitCode> {
    if !path.exists() {
        return Err(Error::PathNotFound(path.to_path_buf()));
    }

    let service = start_service(config).await?;

    if full {
        service.set_mode(ScanMode::Full);
    }
    let mut patterns = if no_default_excludes {
        Vec::new()
    } else {
        service.settings().exclude_patterns
    };
    patterns.extend(exclude);
    service.set_exclude_patterns(patterns);
    if let Some(n) = parallelism {
        service.set_max_parallelism(n)?;
    }

    let progress: Option<ProgressCallback> = match format {
        OutputFormat::Text => Some(ConsoleProgressReporter::new().into_callback()),
        OutputFormat::Json => None,
    };

    cancel_on_ctrl_c(&service);

    let (results, summary) = if path.is_file() {
        let (result, summary) = service.scan_file(path, progress).await?;
        (vec![result], summary)
    } else {
        service.scan_folder(path, progress).await?
    };

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "summary": summary,
                "results": results,
                "reportPath": service.last_report_path(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Text => {
            print_summary(&summary, &results);
            if let Some(report) = service.last_report_path() {
                println!("Report:          {}", report.display());
            }
        }
    }

    if summary.total_threats() > 0 {
        Ok(ExitCode::from(EXIT_THREATS_FOUND))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn print_summary(summary: &ScanSummary, results: &[ScanResult]) {
    println!();
    println!("=== Scan Complete ===");
    println!("Scan ID:         {}", summary.scan_id);
    println!("Path:            {}", summary.scanned_path.display());
    println!("Mode:            {}", summary.scan_mode);
    println!("Files Scanned:   {}", summary.total_files_scanned);
    println!("Clean:           {}", summary.clean_files);
    println!("Suspicious:      {}", summary.suspicious_files);
    println!("Malware:         {}", summary.malware_files);
    println!("Errors:          {}", summary.error_files);
    println!("Data Scanned:    {}", summary.formatted_size());
    println!("Duration:        {}", summary.formatted_duration());

    let threats: Vec<&ScanResult> = results.iter().filter(|r| r.is_threat()).collect();
    if !threats.is_empty() {
        println!();
        println!("Threats:");
        for result in threats {
            println!("  {}  {}", result.file_path.display(), result.summary());
            println!("      sha256 {}", result.sha256);
        }
    }
}

/// Manage quarantine.
async fn run_quarantine(
    config: Config,
    action: QuarantineAction,
    format: OutputFormat,
) -> Result<ExitCode> {
    let vault = QuarantineVault::open(&config.paths.quarantine_dir())?;

    match action {
        QuarantineAction::List => {
            let items = vault.list();
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&items)?),
                OutputFormat::Text if items.is_empty() => println!("Quarantine is empty."),
                OutputFormat::Text => {
                    println!("{} item(s) in quarantine:", items.len());
                    for item in items {
                        println!();
                        println!("  {}", item.sha256);
                        println!("    File:    {}", item.original_path.display());
                        println!("    Threat:  {} {}", item.threat_level, item.threat_name);
                        println!(
                            "    Since:   {}",
                            item.quarantine_time.format("%Y-%m-%d %H:%M:%S")
                        );
                    }
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        QuarantineAction::Add { path, force } => {
            if !path.is_file() {
                return Err(Error::PathNotFound(path));
            }

            let service = start_service(config).await?;
            let (mut result, _) = service.scan_file(&path, None).await?;

            if !result.is_successful() {
                return Err(Error::scan_error(
                    &path,
                    result.error_message.unwrap_or_default(),
                ));
            }
            if result.threat_level == ThreatLevel::Clean && !force {
                println!("{} is clean; use --force to quarantine anyway.", path.display());
                return Ok(ExitCode::SUCCESS);
            }

            let outcome = vault.quarantine_scan_result(&mut result);
            if outcome.success {
                service.mark_quarantined(&path);
            }

            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
                OutputFormat::Text if outcome.success => {
                    println!("Quarantined {} ({})", path.display(), outcome.sha256);
                }
                OutputFormat::Text => {}
            }

            if outcome.success {
                Ok(ExitCode::SUCCESS)
            } else {
                Err(Error::QuarantineFailed {
                    path,
                    reason: outcome.error_message.unwrap_or_default(),
                })
            }
        }
        QuarantineAction::Restore { digest } => {
            if vault.restore(&digest) {
                println!("Restored {}", digest);
                Ok(ExitCode::SUCCESS)
            } else {
                Err(Error::QuarantineItemNotFound(digest))
            }
        }
    }
}

/// Inspect saved reports.
fn run_report(config: &Config, action: ReportAction, format: OutputFormat) -> Result<ExitCode> {
    let writer = ReportWriter::new(config.paths.reports_dir());

    match action {
        ReportAction::List => {
            let reports = writer.list_reports();
            if reports.is_empty() {
                println!("No reports in {}", writer.reports_dir().display());
            }
            for report in reports {
                println!("{}", report.display());
            }
        }
        ReportAction::Show { path } => {
            let path: PathBuf = match path.or_else(|| writer.last_report()) {
                Some(p) => p,
                None => {
                    println!("No reports in {}", writer.reports_dir().display());
                    return Ok(ExitCode::SUCCESS);
                }
            };
            let report = writer.load(&path)?;

            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
                OutputFormat::Text => {
                    println!("Report:          {}", path.display());
                    println!(
                        "Generated:       {}",
                        report.generated_at.format("%Y-%m-%d %H:%M:%S")
                    );
                    let results: Vec<ScanResult> =
                        report.results.into_iter().map(|e| e.result).collect();
                    print_summary(&report.summary.summary, &results);
                }
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Handle configuration commands.
fn run_config(action: ConfigAction, config: &Config) -> Result<ExitCode> {
    match action {
        ConfigAction::Show => {
            println!("{}", serde_json::to_string_pretty(config)?);
        }
        ConfigAction::Reset => {
            log::info!("Resetting configuration to defaults...");
            Config::default().save(&Config::default_config_path())?;
            println!("Configuration reset to defaults.");
        }
        ConfigAction::Path => {
            println!("{}", Config::default_config_path().display());
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Show application information.
async fn run_info(config: Config) -> Result<ExitCode> {
    let service = start_service(config).await?;
    let config = service.config();
    let settings = service.settings();

    println!("VirusGuard - On-demand File Scanner");
    println!();
    println!("Version:          {}", env!("CARGO_PKG_VERSION"));
    println!("Config Path:      {}", Config::default_config_path().display());
    println!("Data Directory:   {}", Config::data_dir().display());
    println!("Log Directory:    {}", config.logging.log_dir().display());
    println!(
        "Signatures:       {} ({})",
        service.database().count(),
        config.paths.signatures_file().display()
    );
    println!("Quarantine Path:  {}", config.paths.quarantine_dir().display());
    println!("Reports Path:     {}", service.reports_dir().display());
    println!();
    println!("Scan Settings:");
    println!("  Mode:           {}", settings.mode);
    println!("  Parallelism:    {}", settings.max_parallelism);
    println!("  Exclusions:     {}", settings.exclude_patterns.join(", "));
    println!();
    println!("Detection Settings:");
    println!("  Fast threshold: {}", config.detection.fast_mode_threshold);
    println!("  Full threshold: {}", config.detection.full_mode_threshold);
    println!(
        "  Entropy:        >= {} (files up to {} MB)",
        config.detection.entropy_threshold, config.detection.entropy_max_file_mb
    );
    Ok(ExitCode::SUCCESS)
}
