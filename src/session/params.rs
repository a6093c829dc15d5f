//! Session-configurable parameters (§6): the subset of `SET`/`SHOW` names
//! this engine understands plus validates, versus the wider set it merely
//! echoes back.

use std::collections::BTreeMap;

use crate::error::{Error, Result, SqlState};

/// `spanner.autocommit_dml_mode` (§6): whether autocommit DML runs as one
/// backend transaction or is partitioned into independently-committed
/// chunks, which changes the COPY engine's atomicity policy (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutocommitDmlMode {
    Transactional,
    PartitionedNonAtomic,
}

impl AutocommitDmlMode {
    fn parse(value: &str) -> Result<Self> {
        match value {
            "transactional" => Ok(AutocommitDmlMode::Transactional),
            "partitioned_non_atomic" => Ok(AutocommitDmlMode::PartitionedNonAtomic),
            other => Err(Error::wire(
                SqlState::InvalidTextRepresentation,
                format!("invalid value for spanner.autocommit_dml_mode: {other:?}"),
            )),
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            AutocommitDmlMode::Transactional => "transactional",
            AutocommitDmlMode::PartitionedNonAtomic => "partitioned_non_atomic",
        }
    }
}

/// The session's negotiated and runtime-settable parameters.
#[derive(Debug, Clone)]
pub struct SessionParams {
    pub client_encoding: String,
    pub date_style: String,
    pub time_zone: String,
    pub extra_float_digits: i32,
    pub application_name: String,
    pub search_path: String,
    pub autocommit_dml_mode: AutocommitDmlMode,
    pub readonly_staleness: Option<String>,
    /// Parameters this engine doesn't interpret but accepts and echoes back,
    /// when `reject_unknown` is false.
    other: BTreeMap<String, String>,
    /// When true, an unrecognized parameter name is rejected with `42704`
    /// instead of being accepted and echoed.
    pub reject_unknown: bool,
}

impl Default for SessionParams {
    fn default() -> Self {
        Self {
            client_encoding: "UTF8".to_string(),
            date_style: "ISO, MDY".to_string(),
            time_zone: "UTC".to_string(),
            extra_float_digits: 1,
            application_name: String::new(),
            search_path: "public".to_string(),
            autocommit_dml_mode: AutocommitDmlMode::Transactional,
            readonly_staleness: None,
            other: BTreeMap::new(),
            reject_unknown: false,
        }
    }
}

impl SessionParams {
    /// Apply a `SET name = value` (or startup-parameter) assignment,
    /// validating per §6's rules for the parameters this engine understands.
    pub fn set(&mut self, name: &str, value: &str) -> Result<()> {
        match name.to_ascii_lowercase().as_str() {
            "client_encoding" => {
                if !value.eq_ignore_ascii_case("UTF8") && !value.eq_ignore_ascii_case("UTF-8") {
                    return Err(Error::wire(
                        SqlState::InvalidTextRepresentation,
                        format!("unsupported client_encoding {value:?}, only UTF8 is supported"),
                    ));
                }
                self.client_encoding = "UTF8".to_string();
            }
            "datestyle" => {
                let upper = value.to_ascii_uppercase();
                if !upper.contains("ISO") {
                    return Err(Error::wire(
                        SqlState::InvalidTextRepresentation,
                        format!("unsupported DateStyle {value:?}, only ISO variants are supported"),
                    ));
                }
                self.date_style = value.to_string();
            }
            "timezone" => self.time_zone = value.to_string(),
            "extra_float_digits" => {
                self.extra_float_digits = value.parse().map_err(|_| {
                    Error::wire(
                        SqlState::InvalidTextRepresentation,
                        format!("invalid value for extra_float_digits: {value:?}"),
                    )
                })?;
            }
            "application_name" => self.application_name = value.to_string(),
            "search_path" => {
                let trimmed = value.trim();
                if !trimmed.is_empty() && trimmed != "public" && trimmed != "\"public\"" {
                    return Err(Error::wire(
                        SqlState::InvalidTextRepresentation,
                        "search_path must be \"public\" or empty; no non-public schemas are supported",
                    ));
                }
                self.search_path = value.to_string();
            }
            "spanner.autocommit_dml_mode" => {
                self.autocommit_dml_mode = AutocommitDmlMode::parse(value)?;
            }
            "spanner.readonly_staleness" => {
                self.readonly_staleness = Some(value.to_string());
            }
            other_name => {
                if self.reject_unknown {
                    return Err(Error::wire(
                        SqlState::UndefinedObject,
                        format!("unrecognized configuration parameter {other_name:?}"),
                    ));
                }
                self.other.insert(other_name.to_string(), value.to_string());
            }
        }
        Ok(())
    }

    /// Read back the current value of `name`, for `SHOW`.
    pub fn get(&self, name: &str) -> Option<String> {
        match name.to_ascii_lowercase().as_str() {
            "client_encoding" => Some(self.client_encoding.clone()),
            "datestyle" => Some(self.date_style.clone()),
            "timezone" => Some(self.time_zone.clone()),
            "extra_float_digits" => Some(self.extra_float_digits.to_string()),
            "application_name" => Some(self.application_name.clone()),
            "search_path" => Some(self.search_path.clone()),
            "spanner.autocommit_dml_mode" => Some(self.autocommit_dml_mode.as_str().to_string()),
            "spanner.readonly_staleness" => self.readonly_staleness.clone(),
            other => self.other.get(other).cloned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_utf8_client_encoding() {
        let mut params = SessionParams::default();
        assert!(params.set("client_encoding", "LATIN1").is_err());
    }

    #[test]
    fn rejects_non_public_search_path() {
        let mut params = SessionParams::default();
        assert!(params.set("search_path", "myschema").is_err());
        assert!(params.set("search_path", "public").is_ok());
    }

    #[test]
    fn parses_autocommit_dml_mode() {
        let mut params = SessionParams::default();
        params.set("spanner.autocommit_dml_mode", "partitioned_non_atomic").unwrap();
        assert_eq!(params.autocommit_dml_mode, AutocommitDmlMode::PartitionedNonAtomic);
        assert!(params.set("spanner.autocommit_dml_mode", "bogus").is_err());
    }

    #[test]
    fn unknown_parameter_echoed_unless_rejecting() {
        let mut params = SessionParams::default();
        params.set("my.custom.param", "42").unwrap();
        assert_eq!(params.get("my.custom.param"), Some("42".to_string()));

        params.reject_unknown = true;
        assert!(params.set("another.custom.param", "1").is_err());
    }
}
