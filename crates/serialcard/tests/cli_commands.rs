#![cfg(all(unix, feature = "cli"))]

use std::process::{Command, Output};

fn serialcard(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_serialcard"))
        .env_remove("SERIALCARD_DEVICE")
        .args(["--log-level", "error", "--format", "json"])
        .args(args)
        .output()
        .expect("serialcard should run")
}

fn stdout_json(output: &Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(stdout.lines().next().unwrap_or_default())
        .expect("command should emit json")
}

#[test]
fn version_reports_package_version() {
    let output = serialcard(&["version"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        stdout.trim(),
        format!("serialcard {}", env!("CARGO_PKG_VERSION"))
    );
}

#[test]
fn doctor_without_device_fails() {
    let output = serialcard(&["doctor"]);
    assert_eq!(output.status.code(), Some(30));
    let report = stdout_json(&output);
    assert_eq!(report["overall"], "fail");
    assert!(report["device"].is_null());
}

#[test]
fn transmit_without_device_is_usage_error() {
    let output = serialcard(&["transmit", "00A40400"]);
    assert_eq!(output.status.code(), Some(64));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("SERIALCARD_DEVICE"));
}

#[test]
fn transmit_rejects_bad_hex() {
    let output = serialcard(&["transmit", "--device", "/dev/null", "00A"]);
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn transmit_to_non_terminal_fails() {
    let output = serialcard(&["transmit", "--device", "/dev/null", "00A40400"]);
    assert_eq!(output.status.code(), Some(64));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not a serial port"));
}

#[test]
fn missing_device_is_usage_error() {
    let output = serialcard(&["atr", "--device", "/dev/serialcard-missing"]);
    assert_eq!(output.status.code(), Some(64));
}

#[cfg(target_os = "linux")]
mod pty {
    use std::ffi::CStr;
    use std::fs::File;
    use std::io::{Read, Write};
    use std::os::fd::FromRawFd;
    use std::thread;

    use super::*;

    fn open_pty() -> (File, String) {
        // SAFETY: standard pty allocation sequence on a fresh descriptor;
        // the name buffer outlives the ptsname_r call.
        unsafe {
            let master = libc::posix_openpt(libc::O_RDWR | libc::O_NOCTTY);
            assert!(master >= 0, "posix_openpt failed");
            assert_eq!(libc::grantpt(master), 0);
            assert_eq!(libc::unlockpt(master), 0);
            let mut name = [0 as libc::c_char; 128];
            assert_eq!(libc::ptsname_r(master, name.as_mut_ptr(), name.len()), 0);
            let path = CStr::from_ptr(name.as_ptr()).to_str().unwrap().to_owned();
            (File::from_raw_fd(master), path)
        }
    }

    #[test]
    fn atr_prints_synthetic_answer() {
        let (_master, slave) = open_pty();
        let output = serialcard(&["atr", "--device", &slave]);

        assert!(output.status.success(), "{output:?}");
        let atr = stdout_json(&output);
        assert_eq!(atr["atr"], "3B8A8001534F535345020325010374");
        assert_eq!(atr["historical_bytes"], "534F5353450203250103");
        assert_eq!(atr["length"], 15);
    }

    #[test]
    fn transmit_round_trip_over_pty() {
        let (mut master, slave) = open_pty();
        let device = thread::spawn(move || {
            let mut request = [0u8; 7];
            master.read_exact(&mut request).unwrap();
            master.write_all(&[0x00, 0x02, 0x90, 0x00]).unwrap();
            (request, master)
        });

        let output = serialcard(&["transmit", "--device", &slave, "--wait", "00 A4 04 00 00"]);
        assert!(output.status.success(), "{output:?}");
        let (request, _master) = device.join().unwrap();
        assert_eq!(request, [0x00, 0x05, 0x00, 0xA4, 0x04, 0x00, 0x00]);

        let response = stdout_json(&output);
        assert_eq!(response["response"], "9000");
        assert_eq!(response["status_word"], "9000");
        assert_eq!(response["no_response"], false);
    }

    #[test]
    fn silent_device_times_out() {
        let (_master, slave) = open_pty();
        let output = serialcard(&[
            "transmit", "--device", &slave, "--wait", "--timeout", "100ms", "80CA",
        ]);

        assert_eq!(output.status.code(), Some(124));
        let response = stdout_json(&output);
        assert_eq!(response["no_response"], true);
        assert_eq!(response["response"], "00");
    }

    #[test]
    fn doctor_passes_for_pty() {
        let (_master, slave) = open_pty();
        let output = serialcard(&["doctor", "--device", &slave]);

        assert_eq!(output.status.code(), Some(0), "{output:?}");
        assert_eq!(stdout_json(&output)["overall"], "pass");
    }

    #[test]
    fn poll_stops_after_count() {
        let (_master, slave) = open_pty();
        let output = serialcard(&[
            "poll", "--device", &slave, "--interval", "10ms", "--count", "3",
        ]);

        assert!(output.status.success(), "{output:?}");
        let stdout = String::from_utf8_lossy(&output.stdout);
        let lines: Vec<serde_json::Value> = stdout
            .lines()
            .map(|line| serde_json::from_str(line).expect("poll should emit json lines"))
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2]["sequence"], 3);
        assert!(lines.iter().all(|line| line["present"] == true));
    }

    #[test]
    fn presence_command_reads_device_answer() {
        let (mut master, slave) = open_pty();
        let device = thread::spawn(move || {
            let mut request = [0u8; 4];
            master.read_exact(&mut request).unwrap();
            master.write_all(&[0x00, 0x01, 0x00]).unwrap();
            (request, master)
        });

        let output = serialcard(&["presence", "--device", &slave, "--command", "FFCA"]);
        assert!(output.status.success(), "{output:?}");
        let (request, _master) = device.join().unwrap();
        assert_eq!(request, [0x00, 0x02, 0xFF, 0xCA]);
        assert_eq!(stdout_json(&output)["present"], false);
    }
}
