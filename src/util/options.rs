// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Analysis options.

use clap::{Arg, Command};

use crate::pta::PTAType;

const USAGE: &str = r#"wpta [OPTIONS] --entry-method <METHOD>"#;

/// Creates the clap::Command metadata for argument parsing.
fn make_options_parser() -> Command<'static> {
    Command::new("wpta")
        .no_binary_name(true)
        .override_usage(USAGE)
        .arg(
            Arg::new("entry-method")
                .long("entry-method")
                .takes_value(true)
                .help("The signature of the method from which the analysis begins."),
        )
        .arg(
            Arg::new("pta-type")
                .long("pta-type")
                .takes_value(true)
                .value_parser(["ci", "context-insensitive", "cs", "context-sensitive"])
                .default_value("cs")
                .help("The variant of pointer analysis to run."),
        )
        .arg(
            Arg::new("context-depth")
                .long("context-depth")
                .takes_value(true)
                .value_parser(clap::value_parser!(u32))
                .default_value("1")
                .help("The k-CFA context depth for a context-sensitive pointer analysis."),
        )
        .arg(
            Arg::new("pta")
                .long("pta")
                .takes_value(true)
                .help("Id of a prior pointer-analysis result to reuse for inter-procedural CP."),
        )
        .arg(
            Arg::new("taint-config")
                .long("taint-config")
                .takes_value(true)
                .help("Path to the taint source/transfer/sink configuration document."),
        )
        .arg(
            Arg::new("dump-stats")
                .long("dump-stats")
                .takes_value(false)
                .help("Log summary statistics of the analysis results."),
        )
}

#[derive(Clone, Debug)]
pub struct AnalysisOptions {
    pub entry_method: String,
    pub pta_type: PTAType,
    /// Context depth limit for a context-sensitive pointer analysis.
    pub context_depth: u32,
    /// Id of a prior PTA result to reuse (key `pta` of §6).
    pub pta_result_id: Option<String>,
    /// Path to the taint configuration document (key `taint-config`).
    pub taint_config_path: Option<String>,
    pub dump_stats: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            entry_method: String::new(),
            pta_type: PTAType::CallSiteSensitive,
            context_depth: 1,
            pta_result_id: None,
            taint_config_path: None,
            dump_stats: false,
        }
    }
}

impl AnalysisOptions {
    /// Parses options from a list of strings (e.g. `std::env::args()`
    /// with the binary name already stripped). Not every caller needs to
    /// run a full solve through this path: unit tests mostly build an
    /// `AnalysisOptions` directly and skip parsing entirely.
    pub fn parse_from_args(&mut self, args: &[String]) -> Result<(), clap::Error> {
        let matches = make_options_parser().try_get_matches_from(args.iter())?;

        if let Some(s) = matches.get_one::<String>("entry-method") {
            self.entry_method = s.clone();
        }
        if matches.contains_id("pta-type") {
            self.pta_type = match matches.get_one::<String>("pta-type").unwrap().as_str() {
                "ci" | "context-insensitive" => PTAType::ContextInsensitive,
                "cs" | "context-sensitive" => PTAType::CallSiteSensitive,
                _ => unreachable!(),
            }
        }
        if let Some(depth) = matches.get_one::<u32>("context-depth") {
            self.context_depth = *depth;
        }
        self.pta_result_id = matches.get_one::<String>("pta").cloned();
        self.taint_config_path = matches.get_one::<String>("taint-config").cloned();
        self.dump_stats = matches.contains_id("dump-stats");

        Ok(())
    }
}
