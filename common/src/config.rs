// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! Configuration for KAT generation.
//!
//! Values come from built-in defaults, then `PQKAT_*` environment variables,
//! then command-line flags (applied by the binary).

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::signatures::{Dilithium5, SignatureScheme};
use crate::sphincs_fallback::Sphincs;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown signature scheme {0:?} (expected \"dilithium5\" or \"sphincs\")")]
    UnknownSignature(String),

    #[error("invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },

    #[error("file name must be a plain file name, got {0:?}")]
    InvalidFileName(String),
}

/// Signature scheme used for key confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureAlgorithm {
    #[default]
    Dilithium5,
    Sphincs,
}

impl SignatureAlgorithm {
    pub fn scheme(self) -> &'static dyn SignatureScheme {
        match self {
            SignatureAlgorithm::Dilithium5 => &Dilithium5,
            SignatureAlgorithm::Sphincs => &Sphincs,
        }
    }
}

impl FromStr for SignatureAlgorithm {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dilithium5" | "dilithium" | "ml-dsa-87" => Ok(SignatureAlgorithm::Dilithium5),
            "sphincs" | "sphincs+" | "slh-dsa" => Ok(SignatureAlgorithm::Sphincs),
            _ => Err(ConfigError::UnknownSignature(s.to_string())),
        }
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignatureAlgorithm::Dilithium5 => f.write_str("dilithium5"),
            SignatureAlgorithm::Sphincs => f.write_str("sphincs"),
        }
    }
}

/// KAT generation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KatConfig {
    /// Directory the log is written to (default: kat_logs)
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Log file name inside `output_dir` (default: hybrid_handshake_kat.txt)
    #[serde(default = "default_file_name")]
    pub file_name: String,

    /// Confirmation signature scheme (default: dilithium5)
    #[serde(default)]
    pub signature: SignatureAlgorithm,

    /// Replace an existing log instead of failing (default: false)
    #[serde(default)]
    pub overwrite: bool,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("kat_logs")
}

fn default_file_name() -> String {
    "hybrid_handshake_kat.txt".to_string()
}

impl Default for KatConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            file_name: default_file_name(),
            signature: SignatureAlgorithm::default(),
            overwrite: false,
        }
    }
}

impl KatConfig {
    /// Defaults overridden by `PQKAT_OUTPUT_DIR`, `PQKAT_FILE_NAME`,
    /// `PQKAT_SIGNATURE` and `PQKAT_OVERWRITE`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Like [`KatConfig::from_env`] but reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(dir) = lookup("PQKAT_OUTPUT_DIR") {
            config.output_dir = PathBuf::from(dir);
        }
        if let Some(name) = lookup("PQKAT_FILE_NAME") {
            config.file_name = name;
        }
        if let Some(sig) = lookup("PQKAT_SIGNATURE") {
            config.signature = sig.parse()?;
        }
        if let Some(value) = lookup("PQKAT_OVERWRITE") {
            config.overwrite = parse_bool(&value).ok_or(ConfigError::InvalidValue {
                var: "PQKAT_OVERWRITE",
                value,
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// The file name must not escape `output_dir`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let name = self.file_name.as_str();
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
            return Err(ConfigError::InvalidFileName(self.file_name.clone()));
        }
        Ok(())
    }

    /// Full path of the log file.
    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join(&self.file_name)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn defaults() {
        let config = KatConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, KatConfig::default());
        assert_eq!(
            config.output_path(),
            PathBuf::from("kat_logs/hybrid_handshake_kat.txt")
        );
        assert_eq!(config.signature, SignatureAlgorithm::Dilithium5);
        assert!(!config.overwrite);
    }

    #[test]
    fn env_overrides() {
        let config = KatConfig::from_lookup(lookup_from(&[
            ("PQKAT_OUTPUT_DIR", "/tmp/kat"),
            ("PQKAT_FILE_NAME", "run-01.txt"),
            ("PQKAT_SIGNATURE", "SPHINCS+"),
            ("PQKAT_OVERWRITE", "yes"),
        ]))
        .unwrap();

        assert_eq!(config.output_path(), PathBuf::from("/tmp/kat/run-01.txt"));
        assert_eq!(config.signature, SignatureAlgorithm::Sphincs);
        assert!(config.overwrite);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            KatConfig::from_lookup(lookup_from(&[("PQKAT_SIGNATURE", "rsa")])),
            Err(ConfigError::UnknownSignature(_))
        ));
        assert!(matches!(
            KatConfig::from_lookup(lookup_from(&[("PQKAT_OVERWRITE", "maybe")])),
            Err(ConfigError::InvalidValue {
                var: "PQKAT_OVERWRITE",
                ..
            })
        ));
        assert!(matches!(
            KatConfig::from_lookup(lookup_from(&[("PQKAT_FILE_NAME", "../escape.txt")])),
            Err(ConfigError::InvalidFileName(_))
        ));
    }

    #[test]
    fn signature_algorithm_selects_scheme() {
        assert_eq!(
            SignatureAlgorithm::Dilithium5.scheme().name(),
            Dilithium5.name()
        );
        assert_eq!(SignatureAlgorithm::Sphincs.scheme().name(), Sphincs.name());
        assert_eq!(SignatureAlgorithm::Sphincs.to_string(), "sphincs");
    }
}
