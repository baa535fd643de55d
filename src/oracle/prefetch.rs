//! Subprocess oracle (`nix-prefetch-url <url>` by default)

use crate::config::schema::OracleConfig;
use crate::error::OracleError;
use crate::oracle::DigestOracle;
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Oracle that runs `program [args...] <url>` and reads the digest from stdout
#[derive(Debug, Clone)]
pub struct PrefetchOracle {
    program: String,
    args: Vec<String>,
}

impl PrefetchOracle {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn from_config(config: &OracleConfig) -> Self {
        Self::new(config.program.clone(), config.args.clone())
    }
}

impl Default for PrefetchOracle {
    fn default() -> Self {
        Self::from_config(&OracleConfig::default())
    }
}

#[async_trait]
impl DigestOracle for PrefetchOracle {
    async fn compute_digest(&self, url: &str) -> Result<String, OracleError> {
        debug!("Executing: {} {:?} {}", self.program, self.args, url);

        // kill_on_drop: the resolver's timeout drops this future, which must
        // take the child down with it
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| OracleError::Spawn {
                program: self.program.clone(),
                reason: e.to_string(),
            })?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            Err(OracleError::Exit {
                program: self.program.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }

    fn name(&self) -> &str {
        &self.program
    }
}
