//! Command-line interface for the compgraph launcher

use argh::FromArgs;
use std::collections::HashMap;
use std::str::FromStr;

/// Build and run a component graph from a YAML configuration
#[derive(FromArgs, Debug)]
pub struct GraphArgs {
    /// path to the graph configuration (default: graph.yaml)
    #[argh(positional, default = "String::from(\"graph.yaml\")")]
    pub config: String,

    /// values for $(arg ..) patterns (format: key:=value)
    #[argh(option, short = 'a', from_str_fn(parse_arg_override))]
    pub arg: Vec<(String, String)>,

    /// check that the configuration parses and every type is known, then exit
    #[argh(switch)]
    pub validate: bool,

    /// wire the graph without running any hook and print its dependency plan
    #[argh(switch)]
    pub dry_run: bool,

    /// dry-run output format: text, dot or json (default: text)
    #[argh(option, default = "OutputFormat::Text")]
    pub format: OutputFormat,

    /// log level (error, warn, info, debug, trace)
    #[argh(option, short = 'l', default = "String::from(\"info\")")]
    pub log_level: String,
}

/// How `--dry-run` prints the dependency graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Dot,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "dot" => Ok(OutputFormat::Dot),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!(
                "Unknown format '{}'. Expected text, dot or json",
                other
            )),
        }
    }
}

/// Parse argument override in format "key:=value"
fn parse_arg_override(s: &str) -> Result<(String, String), String> {
    let parts: Vec<&str> = s.splitn(2, ":=").collect();
    if parts.len() != 2 || parts[0].is_empty() {
        return Err(format!(
            "Invalid argument format '{}'. Expected 'key:=value'",
            s
        ));
    }
    Ok((parts[0].to_string(), parts[1].to_string()))
}

impl GraphArgs {
    /// Convert argument overrides to a HashMap
    pub fn arg_overrides(&self) -> HashMap<String, String> {
        self.arg.iter().cloned().collect()
    }

    /// Log level understood by env_logger; unknown values fall back to info
    pub fn log_filter(&self) -> &'static str {
        match self.log_level.to_lowercase().as_str() {
            "error" => "error",
            "warn" | "warning" => "warn",
            "debug" => "debug",
            "trace" => "trace",
            _ => "info",
        }
    }
}
