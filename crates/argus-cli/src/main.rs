use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use argus_client::{ChromiumLauncher, LaunchOptions};
use argus_core::config::{HarnessConfig, Viewport};
use argus_core::scenario::{ScenarioRunner, TracingScenarioReporter};
use argus_core::verdict::VerificationReport;

#[derive(Parser)]
#[command(name = "argus", version, about = "Headless UI health check for single-page apps")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load each route in a fresh headless browser and verify it rendered properly
    Run {
        #[command(flatten)]
        config: ConfigArgs,

        /// Print the reports as JSON instead of text
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Print the effective configuration as JSON and exit
    ShowConfig {
        #[command(flatten)]
        config: ConfigArgs,
    },
}

/// Options overlaying the JSON config file, which overlays the defaults.
#[derive(Args, Debug, Default)]
struct ConfigArgs {
    /// Partial JSON configuration file
    #[arg(short, long, env = "ARGUS_CONFIG")]
    config: Option<PathBuf>,

    /// Base URL of the app under test
    #[arg(short, long, env = "ARGUS_TARGET_URL")]
    url: Option<String>,

    /// Route to check (repeatable; defaults to "/" and "/settings")
    #[arg(short, long = "route", env = "ARGUS_ROUTES", value_delimiter = ',')]
    routes: Vec<String>,

    /// Readiness budget in milliseconds
    #[arg(long, env = "ARGUS_MAX_WAIT_MS")]
    max_wait_ms: Option<u64>,

    /// Delay between readiness probes in milliseconds
    #[arg(long, env = "ARGUS_POLL_INTERVAL_MS")]
    poll_interval_ms: Option<u64>,

    /// Minimum markup length inside the root element
    #[arg(long, env = "ARGUS_MIN_CONTENT_LENGTH")]
    min_content_length: Option<usize>,

    /// Do not wait for a navigation landmark
    #[arg(long, env = "ARGUS_NO_REQUIRE_NAV")]
    no_require_nav: bool,

    /// Gap between the two flicker snapshots in milliseconds
    #[arg(long, env = "ARGUS_FLICKER_INTERVAL_MS")]
    flicker_interval_ms: Option<u64>,

    /// Show the browser window
    #[arg(long, env = "ARGUS_HEADED")]
    headed: bool,

    /// Window size as WIDTHxHEIGHT
    #[arg(long, env = "ARGUS_VIEWPORT")]
    viewport: Option<Viewport>,

    /// Directory for per-scenario screenshots
    #[arg(long, env = "ARGUS_SCREENSHOT_DIR")]
    screenshot_dir: Option<PathBuf>,

    /// Navigation label of which at least one should be present (repeatable)
    #[arg(long = "expect-nav-label", env = "ARGUS_EXPECTED_NAV_LABELS", value_delimiter = ',')]
    expected_nav_labels: Vec<String>,

    /// Substring of a console error to ignore (repeatable)
    #[arg(long = "allow-console", env = "ARGUS_CONSOLE_ALLOW_LIST", value_delimiter = ',')]
    console_allow_list: Vec<String>,

    /// Upper bound for any single browser call in milliseconds
    #[arg(long, env = "ARGUS_CALL_TIMEOUT_MS")]
    call_timeout_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Logs go to stderr so the report on stdout can be redirected.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("argus=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, json } => {
            let config = build_config(&config)?;
            cmd_run(config, json).await
        }
        Commands::ShowConfig { config } => {
            let config = build_config(&config)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Defaults, then the config file, then flags and environment.
fn build_config(args: &ConfigArgs) -> Result<HarnessConfig> {
    let mut config = match &args.config {
        Some(path) => HarnessConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config file: {}", path.display()))?,
        None => HarnessConfig::default(),
    };

    if let Some(url) = &args.url {
        config.target_url = url.clone();
    }
    if !args.routes.is_empty() {
        config.routes = args.routes.clone();
    }
    if let Some(ms) = args.max_wait_ms {
        config.readiness.max_wait_ms = ms;
    }
    if let Some(ms) = args.poll_interval_ms {
        config.readiness.poll_interval_ms = ms;
    }
    if let Some(len) = args.min_content_length {
        config.readiness.min_root_content_length = len;
    }
    if args.no_require_nav {
        config.readiness.require_navigation_landmark = false;
    }
    if let Some(ms) = args.flicker_interval_ms {
        config.flicker_interval_ms = ms;
    }
    if args.headed {
        config.headless = false;
    }
    if let Some(viewport) = args.viewport {
        config.viewport = viewport;
    }
    if let Some(dir) = &args.screenshot_dir {
        config.screenshot_dir = dir.clone();
    }
    if !args.expected_nav_labels.is_empty() {
        config.expected_nav_labels = args.expected_nav_labels.clone();
    }
    if !args.console_allow_list.is_empty() {
        config.console_allow_list = args.console_allow_list.clone();
    }
    if let Some(ms) = args.call_timeout_ms {
        config.session_call_timeout_ms = ms;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

async fn cmd_run(config: HarnessConfig, json: bool) -> Result<ExitCode> {
    tracing::info!(
        url = %config.target_url,
        routes = config.routes.len(),
        "Starting UI health check"
    );

    let launcher = ChromiumLauncher::new(LaunchOptions::from(&config));
    let runner = ScenarioRunner::new(launcher, config);
    let reports = runner
        .run_all(&TracingScenarioReporter)
        .await
        .context("Scenario run aborted")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in &reports {
            println!("{report}");
        }
        println!("{}", summary(&reports));
    }

    Ok(exit_code(&reports))
}

fn summary(reports: &[VerificationReport]) -> String {
    let passed = reports.iter().filter(|r| r.overall_pass).count();
    let failed = reports.len() - passed;
    let status = if failed == 0 { "PASS" } else { "FAIL" };
    format!(
        "{status}: {} scenario(s), {passed} passed, {failed} failed",
        reports.len()
    )
}

fn exit_code(reports: &[VerificationReport]) -> ExitCode {
    if !reports.is_empty() && reports.iter().all(|r| r.overall_pass) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use argus_core::verdict::{Diagnostics, RunMeta};

    use super::*;

    fn parse(args: &[&str]) -> ConfigArgs {
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Commands::Run { config, .. } | Commands::ShowConfig { config } => config,
        }
    }

    #[test]
    fn defaults_without_flags() {
        let config = build_config(&ConfigArgs::default()).unwrap();
        assert_eq!(config, HarnessConfig::default());
    }

    #[test]
    fn flags_override_defaults() {
        let args = parse(&[
            "argus",
            "run",
            "--url",
            "http://127.0.0.1:5173",
            "--route",
            "/",
            "--route",
            "/reports/monthly",
            "--max-wait-ms",
            "5000",
            "--no-require-nav",
            "--headed",
            "--viewport",
            "1280x720",
            "--allow-console",
            "favicon.ico,ResizeObserver",
        ]);

        let config = build_config(&args).unwrap();

        assert_eq!(config.target_url, "http://127.0.0.1:5173");
        assert_eq!(config.routes, vec!["/", "/reports/monthly"]);
        assert_eq!(config.readiness.max_wait_ms, 5000);
        assert!(!config.readiness.require_navigation_landmark);
        assert!(!config.headless);
        assert_eq!(config.viewport, Viewport { width: 1280, height: 720 });
        assert_eq!(config.console_allow_list, vec!["favicon.ico", "ResizeObserver"]);
    }

    #[test]
    fn flags_override_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"target_url": "http://staging.local:8080", "flicker_interval_ms": 1000, "readiness": {{"max_wait_ms": 9000}}}}"#
        )
        .unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let args = parse(&["argus", "show-config", "--config", &path, "--max-wait-ms", "4000"]);
        let config = build_config(&args).unwrap();

        assert_eq!(config.target_url, "http://staging.local:8080");
        assert_eq!(config.flicker_interval_ms, 1000);
        assert_eq!(config.readiness.max_wait_ms, 4000);
        assert_eq!(config.readiness.poll_interval_ms, 250);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let args = parse(&["argus", "run", "--route", "settings"]);
        assert!(build_config(&args).is_err());

        let args = parse(&["argus", "run", "--url", "ftp://example.com"]);
        assert!(build_config(&args).is_err());
    }

    #[test]
    fn bad_viewport_fails_to_parse() {
        assert!(Cli::try_parse_from(["argus", "run", "--viewport", "wide"]).is_err());
    }

    #[test]
    fn json_flag_is_parsed() {
        let cli = Cli::try_parse_from(["argus", "run", "--json"]).unwrap();
        assert!(matches!(cli.command, Commands::Run { json: true, .. }));
    }

    #[test]
    fn exit_code_and_summary_reflect_failures() {
        let failed = VerificationReport::transport_failure(
            RunMeta::new("root", "/", "http://localhost:4200/"),
            "connection refused".into(),
            Diagnostics::default(),
        );

        assert_eq!(exit_code(&[failed.clone()]), ExitCode::FAILURE);
        assert_eq!(exit_code(&[]), ExitCode::FAILURE);
        assert_eq!(
            summary(&[failed]),
            "FAIL: 1 scenario(s), 0 passed, 1 failed"
        );
    }
}
