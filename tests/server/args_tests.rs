// tests/server/args_tests.rs

#[cfg(test)]
mod tests {
    use std::io::Write;

    use assert_cmd::Command;
    use predicates::prelude::*;
    use tempfile::NamedTempFile;

    use crate::server::test_config_yaml;

    fn config_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_help_output() {
        Command::cargo_bin("oxgen")
            .unwrap()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Server configuration file path"))
            .stdout(predicate::str::contains("--test"));
    }

    #[test]
    fn test_config_check_succeeds() {
        let file = config_file(&test_config_yaml(true));

        Command::cargo_bin("oxgen")
            .unwrap()
            .arg("-c")
            .arg(file.path())
            .arg("-t")
            .assert()
            .success()
            .stdout(predicate::str::contains("Configuration test successful"));
    }

    #[test]
    fn test_config_check_rejects_invalid_uuid() {
        let file = config_file(&test_config_yaml(false).replace(crate::server::TEST_UUID, "not-a-uuid"));

        Command::cargo_bin("oxgen")
            .unwrap()
            .args(["--test", "--config"])
            .arg(file.path())
            .assert()
            .failure()
            .stdout(predicate::str::contains("Invalid panel uuid"));
    }

    #[test]
    fn test_missing_config_file() {
        Command::cargo_bin("oxgen")
            .unwrap()
            .args(["-c", "/nonexistent/oxgen-config.yaml", "-t"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Configuration file does not exist"));
    }
}
