//! # CLI
//!
//! This module defines the command-line interface of `rpcdeck` using `clap`.
//!
//! It is responsible for parsing user input and performing validation (e.g., ensuring headers are
//! `key:value` and binary headers name a known parse type).
use clap::{ArgAction, Parser, Subcommand};
use rpcdeck_core::metadata::ParseType;
use rpcdeck_core::session::MethodId;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rpcdeck", version, about = "Interactive gRPC explorer")]
pub struct Cli {
    /// Path of the saved protos file (defaults to the user data directory)
    #[arg(long, global = true, env = "RPCDECK_STORE")]
    pub store: Option<PathBuf>,

    /// Increase log verbosity (-v for debug, -vv for trace). RUST_LOG takes precedence.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print every method of a descriptor set with its sample request body
    Stubs {
        /// Path to the descriptor set (.bin), resolved against the include directories
        file_descriptor_set: PathBuf,
    },

    /// Open a call session against a server
    ///
    /// Unary and server streaming calls print every response until the call ends. Client and
    /// bidirectional streams read further frames from stdin, one JSON object per line:
    ///
    /// * `:stop` half-closes the stream
    /// * `:history` prints the request and response history
    /// * `:quit` cancels the call and exits
    ///
    /// ## Examples:
    ///
    /// ```bash
    /// rpcdeck call echo.EchoService/BidirectionalEcho --proto echo.bin --url http://localhost:50051
    /// ```
    Call {
        /// Endpoint (package.Service/Method)
        #[arg(value_parser = parse_endpoint)]
        endpoint: MethodId,

        /// Path to the descriptor set (.bin). Saved protos remember their host and method state.
        #[arg(long)]
        proto: PathBuf,

        /// The server URL to connect to (e.g. http://localhost:50051). Defaults to the saved host.
        #[arg(long)]
        url: Option<String>,

        /// JSON body of the first request. Defaults to the saved body, then to the sample body.
        #[arg(long, value_parser = parse_body)]
        body: Option<serde_json::Value>,

        /// Text header, as `key:value`
        #[arg(short = 'H', long = "header", value_parser = parse_header)]
        headers: Vec<(String, String)>,

        /// Binary header, as `key-bin:ParseType:value` (e.g. `code-bin:Int16LE:5`)
        #[arg(short = 'B', long = "bin-header", value_parser = parse_bin_header)]
        bin_headers: Vec<(String, ParseType, String)>,
    },

    /// Manage saved protos
    Protos {
        #[command(subcommand)]
        sub: ProtoCommands,
    },

    /// Manage the directories descriptor sets are looked up in
    IncludeDirs {
        #[command(subcommand)]
        sub: IncludeDirCommands,
    },

    /// Convert metadata values between text and bytes
    Metadata {
        #[command(subcommand)]
        sub: MetadataCommands,
    },
}

#[derive(Subcommand)]
pub enum ProtoCommands {
    /// Save descriptor sets, replacing any saved under the same path
    Add {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// List saved protos and their methods
    List,
    /// Forget a saved proto
    Remove { path: String },
    /// Re-read saved descriptor sets, keeping hosts, metadata and edited body values
    Reload {
        /// Paths to reload, all saved protos if empty
        paths: Vec<String>,
    },
}

#[derive(Subcommand)]
pub enum IncludeDirCommands {
    /// Add a directory (moves it to the end if already present)
    Add { dir: PathBuf },
    List,
    Remove { dir: PathBuf },
}

#[derive(Subcommand)]
pub enum MetadataCommands {
    /// Encode a value, printing the bytes as hex
    Encode {
        #[arg(value_parser = parse_parse_type)]
        parse_type: ParseType,
        value: String,
    },
    /// Decode hex bytes into a value
    Decode {
        #[arg(value_parser = parse_parse_type)]
        parse_type: ParseType,
        bytes: String,
    },
    /// List the supported parse types
    Types,
}

fn parse_endpoint(value: &str) -> Result<MethodId, String> {
    let (service, method) = value.split_once('/').ok_or_else(|| {
        format!("Invalid endpoint format: '{value}'. Expected 'package.Service/Method'",)
    })?;

    if service.trim().is_empty() || method.trim().is_empty() {
        return Err("Service and Method names cannot be empty".to_string());
    }

    Ok(MethodId::new(service.trim(), method.trim()))
}

fn parse_header(s: &str) -> Result<(String, String), String> {
    s.split_once(':')
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .ok_or_else(|| "Format must be 'key:value'".to_string())
}

fn parse_bin_header(s: &str) -> Result<(String, ParseType, String), String> {
    let mut parts = s.splitn(3, ':');
    let (Some(key), Some(parse_type), Some(value)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err("Format must be 'key:ParseType:value'".to_string());
    };

    Ok((
        key.trim().to_string(),
        parse_parse_type(parse_type)?,
        value.trim().to_string(),
    ))
}

fn parse_parse_type(value: &str) -> Result<ParseType, String> {
    ParseType::from_name(value.trim())
        .ok_or_else(|| format!("Unknown parse type '{value}', see 'rpcdeck metadata types'"))
}

fn parse_body(value: &str) -> Result<serde_json::Value, String> {
    serde_json::from_str(value).map_err(|e| format!("Invalid JSON: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_endpoint() {
        assert_eq!(
            parse_endpoint("echo.EchoService/UnaryEcho").unwrap().as_str(),
            "echo.EchoService/UnaryEcho"
        );
        assert!(parse_endpoint("echo.EchoService").is_err());
        assert!(parse_endpoint("/UnaryEcho").is_err());
    }

    #[test]
    fn test_parse_bin_header() {
        assert_eq!(
            parse_bin_header("code-bin:int16le:5").unwrap(),
            ("code-bin".to_string(), ParseType::Int16Le, "5".to_string())
        );
        assert!(parse_bin_header("code-bin:5").is_err());
        assert!(parse_bin_header("code-bin:Int12:5").is_err());
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
