use std::path::Path;

use serde::Serialize;
use serialcard_link::{LinkConfig, SerialLink};

use crate::cmd::{parse_duration, DoctorArgs};
use crate::exit::{CliResult, HEALTH_CHECK_FAILED, SUCCESS};
use crate::output::OutputFormat;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
enum CheckStatus {
    Pass,
    Fail,
    Info,
    Skip,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    name: String,
    status: CheckStatus,
    detail: String,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, detail: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            status,
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct DoctorOutput {
    device: Option<String>,
    checks: Vec<CheckResult>,
    overall: &'static str,
}

pub fn run(args: DoctorArgs, format: OutputFormat) -> CliResult<i32> {
    let device = args.device.device.as_deref();
    let mut checks = vec![
        baud_rate_check(args.device.baud),
        timeout_check(&args.device.timeout),
        device_configured_check(device),
    ];

    if let Some(path) = device {
        let exists = device_exists_check(path);
        let can_open = exists.status == CheckStatus::Pass;
        checks.push(exists);
        if can_open && LinkConfig::is_supported_baud_rate(args.device.baud) {
            checks.push(device_configure_check(path, args.device.baud));
        } else {
            checks.push(CheckResult::new(
                "device_configure",
                CheckStatus::Skip,
                "earlier check failed",
            ));
        }
    }

    checks.push(compiled_features_check());

    let has_fail = checks.iter().any(|c| c.status == CheckStatus::Fail);
    let overall = if has_fail { "fail" } else { "pass" };

    let output = DoctorOutput {
        device: device.map(|p| p.display().to_string()),
        checks,
        overall,
    };

    print_doctor(&output, format);

    if has_fail {
        Ok(HEALTH_CHECK_FAILED)
    } else {
        Ok(SUCCESS)
    }
}

fn print_doctor(output: &DoctorOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(output).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("serialcard doctor\n");
            for c in &output.checks {
                println!(
                    "  [{:>4}] {:<18} {}",
                    status_text(c.status),
                    c.name,
                    c.detail
                );
            }
            if output.overall == "pass" {
                println!("\n  Result: all checks passed");
            } else {
                println!("\n  Result: one or more checks failed");
            }
        }
        OutputFormat::Raw => {
            println!("{}", output.overall);
        }
    }
}

fn status_text(status: CheckStatus) -> &'static str {
    match status {
        CheckStatus::Pass => "PASS",
        CheckStatus::Fail => "FAIL",
        CheckStatus::Info => "INFO",
        CheckStatus::Skip => "SKIP",
    }
}

fn baud_rate_check(baud: u32) -> CheckResult {
    if LinkConfig::is_supported_baud_rate(baud) {
        CheckResult::new("baud_rate", CheckStatus::Pass, format!("{baud} baud"))
    } else {
        CheckResult::new(
            "baud_rate",
            CheckStatus::Fail,
            format!("{baud} is not one of {:?}", LinkConfig::SUPPORTED_BAUD_RATES),
        )
    }
}

fn timeout_check(timeout: &str) -> CheckResult {
    match parse_duration(timeout) {
        Ok(value) => CheckResult::new("response_timeout", CheckStatus::Pass, format!("{value:?}")),
        Err(err) => CheckResult::new("response_timeout", CheckStatus::Fail, err.message),
    }
}

fn device_configured_check(device: Option<&Path>) -> CheckResult {
    match device {
        Some(path) => CheckResult::new(
            "device_configured",
            CheckStatus::Pass,
            path.display().to_string(),
        ),
        None => CheckResult::new(
            "device_configured",
            CheckStatus::Fail,
            "no device; pass --device or set SERIALCARD_DEVICE",
        ),
    }
}

fn device_exists_check(path: &Path) -> CheckResult {
    match std::fs::metadata(path) {
        Ok(_) => CheckResult::new(
            "device_exists",
            CheckStatus::Pass,
            format!("{} exists", path.display()),
        ),
        Err(err) => CheckResult::new(
            "device_exists",
            CheckStatus::Fail,
            format!("{}: {err}", path.display()),
        ),
    }
}

/// Open the device and apply raw mode, then close it again.
fn device_configure_check(path: &Path, baud: u32) -> CheckResult {
    match SerialLink::open(path, &LinkConfig::with_baud_rate(baud)) {
        Ok(link) => CheckResult::new(
            "device_configure",
            CheckStatus::Pass,
            format!("raw mode applied at {} baud", link.config().baud_rate),
        ),
        Err(err) => CheckResult::new("device_configure", CheckStatus::Fail, err.to_string()),
    }
}

fn compiled_features_check() -> CheckResult {
    let mut features = Vec::new();
    if cfg!(feature = "reader") {
        features.push("reader");
    }
    if cfg!(feature = "cli") {
        features.push("cli");
    }
    CheckResult::new("compiled_features", CheckStatus::Info, features.join(", "))
}
