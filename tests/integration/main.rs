//! Integration tests for Caskhash

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;

    fn caskhash() -> Command {
        cargo_bin_cmd!("caskhash")
    }

    #[test]
    fn help_displays() {
        caskhash()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("fill in missing cask digests"));
    }

    #[test]
    fn version_displays() {
        caskhash()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("caskhash"));
    }

    #[test]
    fn config_path_honors_flag() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("custom.toml");

        caskhash()
            .args(["config", "path", "--config"])
            .arg(&path)
            .assert()
            .success()
            .stdout(predicate::str::contains("custom.toml"));
    }

    #[test]
    fn config_show() {
        let temp = tempfile::TempDir::new().unwrap();

        caskhash()
            .env("CASKHASH_CONFIG", temp.path().join("missing.toml"))
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[resolver]"))
            .stdout(predicate::str::contains("nix-prefetch-url"));
    }
}

mod resolve_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::Path;
    use tempfile::TempDir;

    const CATALOG: &str = r#"[
  {"token": "foo", "version": "1.0", "url": "https://example.com/foo.dmg", "sha256": "no_check", "name": ["Foo"]},
  {"token": "bar", "version": "latest", "url": "https://example.com/bar.dmg", "sha256": "no_check"},
  {"token": "baz", "version": "2.0", "url": "https://example.com/baz.dmg", "sha256": "abc123"}
]"#;

    /// Workspace with a catalog and a config pointing at `program` as the oracle
    fn workspace(program: &str, policy: &str) -> TempDir {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("catalog.json"), CATALOG).unwrap();
        std::fs::write(
            temp.path().join("config.toml"),
            format!(
                "[oracle]\nprogram = \"{program}\"\n\n[resolver]\nworkers = 4\ntimeout_secs = 10\nfailure_policy = \"{policy}\"\n"
            ),
        )
        .unwrap();
        temp
    }

    fn caskhash(dir: &Path) -> Command {
        let mut cmd = cargo_bin_cmd!("caskhash");
        cmd.current_dir(dir)
            .env("CASKHASH_CONFIG", dir.join("config.toml"))
            .env("CI", "1");
        cmd
    }

    fn artifact(dir: &Path) -> serde_json::Value {
        let content = std::fs::read_to_string(dir.join("cask.json")).unwrap();
        assert!(content.ends_with('\n'));
        serde_json::from_str(&content).unwrap()
    }

    #[test]
    fn resolve_writes_sorted_artifact_and_cache() {
        let temp = workspace("echo", "retry");

        caskhash(temp.path())
            .args(["resolve", "catalog.json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Done"));

        let casks = artifact(temp.path());
        let tokens: Vec<&str> = casks
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["token"].as_str().unwrap())
            .collect();
        assert_eq!(tokens, vec!["bar", "baz", "foo"]);

        // echo prints the URL back, which stands in for the digest
        assert_eq!(casks[2]["sha256"], "https://example.com/foo.dmg");
        assert_eq!(casks[2]["name"][0], "Foo");
        assert_eq!(casks[1]["sha256"], "abc123");

        let cache: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(temp.path().join("cask-cache.json")).unwrap(),
        )
        .unwrap();
        let cached: Vec<(&str, &str)> = cache
            .as_array()
            .unwrap()
            .iter()
            .map(|r| (r["token"].as_str().unwrap(), r["version"].as_str().unwrap()))
            .collect();
        assert_eq!(cached, vec![("bar", "latest"), ("foo", "1.0")]);
    }

    #[test]
    fn second_run_is_byte_identical() {
        let temp = workspace("echo", "retry");

        caskhash(temp.path()).args(["resolve", "catalog.json"]).assert().success();
        let first = std::fs::read(temp.path().join("cask.json")).unwrap();

        caskhash(temp.path()).args(["resolve", "catalog.json"]).assert().success();
        let second = std::fs::read(temp.path().join("cask.json")).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn retry_policy_leaves_no_check_and_caches_nothing() {
        let temp = workspace("false", "retry");

        caskhash(temp.path())
            .args(["resolve", "catalog.json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[FAIL]"));

        let casks = artifact(temp.path());
        assert_eq!(casks[2]["sha256"], "no_check");

        caskhash(temp.path())
            .args(["cache", "list", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[]"));
    }

    #[test]
    fn sticky_failures_can_be_listed_and_pruned() {
        let temp = workspace("false", "sticky");

        caskhash(temp.path())
            .args(["resolve", "catalog.json"])
            .assert()
            .success();
        assert_eq!(artifact(temp.path())[2]["sha256"], "error");

        caskhash(temp.path())
            .args(["cache", "list", "--failed", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("foo@1.0 error"));

        caskhash(temp.path())
            .args(["cache", "prune"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Pruned 2 cached failures"));

        caskhash(temp.path())
            .args(["cache", "list", "--failed", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[]"));
    }

    #[test]
    fn dry_run_writes_nothing() {
        let temp = workspace("false", "retry");

        caskhash(temp.path())
            .args(["resolve", "catalog.json", "--dry-run"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Dry run"));

        assert!(!temp.path().join("cask.json").exists());
        assert!(!temp.path().join("cask-cache.json").exists());
    }

    #[test]
    fn resolve_without_source_fails_with_hint() {
        let temp = workspace("echo", "retry");

        caskhash(temp.path())
            .arg("resolve")
            .assert()
            .failure()
            .stderr(predicate::str::contains("No catalog source given"))
            .stderr(predicate::str::contains("Hint:"));
    }

    #[test]
    fn output_and_cache_on_one_file_fails_before_resolving() {
        let temp = workspace("echo", "retry");

        caskhash(temp.path())
            .args(["resolve", "catalog.json", "--output", "cask.json"])
            .args(["--cache", "./cask.json"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("both point at"))
            .stderr(predicate::str::contains("Hint:"));

        assert!(!temp.path().join("cask.json").exists());
    }

    #[test]
    fn forget_unknown_token_fails() {
        let temp = workspace("echo", "retry");

        caskhash(temp.path())
            .args(["cache", "forget", "nonexistent"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("No cache entry for nonexistent"));
    }
}
