//! Integration tests for cartsync

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use tempfile::TempDir;

    /// Port 9 (discard) is closed on test machines
    const UNREACHABLE_API: &str = "http://127.0.0.1:9/api";

    fn cartsync(config_dir: &TempDir) -> Command {
        let mut cmd = cargo_bin_cmd!("cartsync");
        cmd.env_remove("CARTSYNC_API")
            .env_remove("CARTSYNC_SESSION")
            .arg("--config")
            .arg(config_dir.path().join("config.toml"));
        cmd
    }

    #[test]
    fn help_displays() {
        let dir = TempDir::new().unwrap();
        cartsync(&dir)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("shopping-cart synchronization client"));
    }

    #[test]
    fn version_displays() {
        let dir = TempDir::new().unwrap();
        cartsync(&dir)
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("cartsync"));
    }

    #[test]
    fn config_path() {
        let dir = TempDir::new().unwrap();
        cartsync(&dir)
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let dir = TempDir::new().unwrap();
        cartsync(&dir)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[general]"))
            .stdout(predicate::str::contains("debounce_ms = 200"));
    }

    #[test]
    fn config_set_then_show() {
        let dir = TempDir::new().unwrap();
        cartsync(&dir)
            .args(["config", "set", "sync.debounce_ms", "120"])
            .assert()
            .success();

        cartsync(&dir)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("debounce_ms = 120"));
    }

    #[test]
    fn config_set_unknown_key() {
        let dir = TempDir::new().unwrap();
        cartsync(&dir)
            .args(["config", "set", "vm.name", "x"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unknown config key"));
    }

    #[test]
    fn invalid_config_file_fails() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("config.toml"), "[sync]\nmax_retries = \"twice\"\n")
            .unwrap();

        cartsync(&dir)
            .args(["config", "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"))
            .stderr(predicate::str::contains("config init --force"));
    }

    #[test]
    fn show_unreachable_api() {
        let dir = TempDir::new().unwrap();
        cartsync(&dir)
            .args(["--api", UNREACHABLE_API, "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Cart API"))
            .stderr(predicate::str::contains("Hint:"));
    }

    #[test]
    fn set_unreachable_api_reads_env() {
        let dir = TempDir::new().unwrap();
        cartsync(&dir)
            .env("CARTSYNC_API", UNREACHABLE_API)
            .args(["set", "a", "2"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Cart API"));
    }

    #[test]
    fn set_requires_quantity() {
        let dir = TempDir::new().unwrap();
        cartsync(&dir).args(["set", "a"]).assert().failure();
    }
}
