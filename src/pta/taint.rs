//! Taint configuration (§6 "Taint configuration format") and the
//! `TaintFlow` output type. The source/transfer/sink rules themselves
//! run co-iterated with the PTA solver (§4.6), in `pta::solver`.

use std::collections::HashMap;
use std::fs;

use serde::Deserialize;

use crate::ir::types::StmtId;
use crate::util::errors::{AnalysisError, Result};

/// `-1` in the wire format.
pub const BASE: i32 = -1;
/// `-2` in the wire format.
pub const RESULT: i32 = -2;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaintSource {
    pub method: String,
    pub taint_type: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaintTransfer {
    pub method: String,
    pub from: i32,
    pub to: i32,
    pub taint_type: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaintSink {
    pub method: String,
    pub index: i32,
}

/// A fully parsed and indexed taint configuration, keyed by method
/// signature for O(1) lookup at each call site the solver processes.
#[derive(Clone, Debug, Default)]
pub struct TaintConfig {
    sources_by_method: HashMap<String, Vec<TaintSource>>,
    transfers_by_method: HashMap<String, Vec<TaintTransfer>>,
    sinks_by_method: HashMap<String, Vec<TaintSink>>,
}

impl TaintConfig {
    pub fn sources_for(&self, method: &str) -> &[TaintSource] {
        self.sources_by_method.get(method).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn transfers_for(&self, method: &str) -> &[TaintTransfer] {
        self.transfers_by_method.get(method).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn sinks_for(&self, method: &str) -> &[TaintSink] {
        self.sinks_by_method.get(method).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.sources_by_method.is_empty() && self.transfers_by_method.is_empty() && self.sinks_by_method.is_empty()
    }

    /// Parses the JSON wire format of §6 ("the bundled loader accepts
    /// this document as JSON... the shape is identical to the YAML
    /// described above, field for field").
    pub fn from_json_str(text: &str) -> Result<TaintConfig> {
        let raw: RawTaintConfig =
            serde_json::from_str(text).map_err(|e| AnalysisError::TaintConfig(e.to_string()))?;

        let mut sources_by_method: HashMap<String, Vec<TaintSource>> = HashMap::new();
        for s in raw.sources {
            sources_by_method.entry(s.method.clone()).or_default().push(TaintSource {
                method: s.method,
                taint_type: s.r#type,
            });
        }

        let mut transfers_by_method: HashMap<String, Vec<TaintTransfer>> = HashMap::new();
        for t in raw.transfers {
            let from = endpoint_to_int(&t.from, false)?;
            let to = endpoint_to_int(&t.to, true)?;
            transfers_by_method.entry(t.method.clone()).or_default().push(TaintTransfer {
                method: t.method,
                from,
                to,
                taint_type: t.r#type,
            });
        }

        let mut sinks_by_method: HashMap<String, Vec<TaintSink>> = HashMap::new();
        for s in raw.sinks {
            sinks_by_method.entry(s.method.clone()).or_default().push(TaintSink {
                method: s.method,
                index: s.index,
            });
        }

        Ok(TaintConfig {
            sources_by_method,
            transfers_by_method,
            sinks_by_method,
        })
    }

    /// Convenience for a future CLI/test harness: reads the document
    /// from `path` (the value of the `taint-config` option, §6/§9) and
    /// parses it. This is the one place in the crate that touches the
    /// filesystem; the core solver only ever consumes an already-parsed
    /// `TaintConfig`.
    pub fn from_path(path: &str) -> Result<TaintConfig> {
        let text = fs::read_to_string(path)
            .map_err(|e| AnalysisError::Configuration(format!("cannot read taint config {path}: {e}")))?;
        Self::from_json_str(&text)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawEndpoint {
    Int(i32),
    Str(String),
}

fn endpoint_to_int(e: &RawEndpoint, allow_result: bool) -> Result<i32> {
    match e {
        RawEndpoint::Int(v) => Ok(*v),
        RawEndpoint::Str(s) if s == "base" => Ok(BASE),
        RawEndpoint::Str(s) if s == "result" && allow_result => Ok(RESULT),
        RawEndpoint::Str(s) => Err(AnalysisError::TaintConfig(format!("unrecognized endpoint {s:?}"))),
    }
}

#[derive(Deserialize)]
struct RawSource {
    method: String,
    r#type: String,
}

#[derive(Deserialize)]
struct RawTransfer {
    method: String,
    from: RawEndpoint,
    to: RawEndpoint,
    r#type: String,
}

#[derive(Deserialize)]
struct RawSink {
    method: String,
    index: i32,
}

#[derive(Deserialize, Default)]
struct RawTaintConfig {
    #[serde(default)]
    sources: Vec<RawSource>,
    #[serde(default)]
    transfers: Vec<RawTransfer>,
    #[serde(default)]
    sinks: Vec<RawSink>,
}

/// One taint-flow finding: a tainted value produced at `source` reached
/// argument `arg_index` of a call to `sink_call` (§4.6, §8 "for every
/// taint flow reported, there exists a PTA path from a configured
/// source call to the sink's argument pointer").
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TaintFlow {
    pub source: StmtId,
    pub sink_call: StmtId,
    pub arg_index: i32,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_sources_transfers_sinks() {
        let doc = r#"
        {
          "sources": [{"method": "Attacker.getSecret()", "type": "String"}],
          "transfers": [{"method": "Wrapper.wrap(java.lang.Object)", "from": 0, "to": "result", "type": "String"}],
          "sinks": [{"method": "Logger.log(java.lang.Object)", "index": 0}]
        }
        "#;
        let cfg = TaintConfig::from_json_str(doc).unwrap();
        assert_eq!(cfg.sources_for("Attacker.getSecret()").len(), 1);
        assert_eq!(cfg.transfers_for("Wrapper.wrap(java.lang.Object)")[0].from, 0);
        assert_eq!(cfg.transfers_for("Wrapper.wrap(java.lang.Object)")[0].to, RESULT);
        assert_eq!(cfg.sinks_for("Logger.log(java.lang.Object)")[0].index, 0);
    }

    #[test]
    fn rejects_unknown_endpoint_string() {
        let doc = r#"{"sources":[],"sinks":[],"transfers":[{"method":"m","from":"bogus","to":"result","type":"T"}]}"#;
        assert!(TaintConfig::from_json_str(doc).is_err());
    }
}
