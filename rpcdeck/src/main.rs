//! # rpcdeck CLI Entry Point
//!
//! The main executable for the rpcdeck tool. This file drives the application lifecycle:
//!
//! 1. **Initialization**: Parses command-line arguments using [`cli::Cli`] and installs logging.
//! 2. **Schema**: Loads descriptor sets and walks them into method stubs via `rpcdeck_core`.
//! 3. **Execution**: Opens a call session, or manages the saved protos repository.
//! 4. **Presentation**: Formats and prints the resulting data or error to standard output/error.
mod cli;
mod formatter;
mod logging;
mod session;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands, IncludeDirCommands, MetadataCommands, ProtoCommands};
use directories::ProjectDirs;
use formatter::{
    FormattedString, GenericError, IncludeDirList, ParseTypeList, ProtoList, ServiceList,
};
use rpcdeck_core::grpc::GrpcTransport;
use rpcdeck_core::metadata::{MetadataEntry, ParseType, codec};
use rpcdeck_core::prost_reflect::DescriptorPool;
use rpcdeck_core::schema::{SchemaTree, Service, walk};
use rpcdeck_core::session::{CallRequest, MethodId};
use rpcdeck_core::storage::{ProtoRecord, ProtoRepository, SavedMethod};
use std::path::{Path, PathBuf};
use std::process;

#[tokio::main]
async fn main() {
    let args = Cli::parse();

    if let Err(err) = logging::init_logging(args.verbose) {
        eprintln!("{}", FormattedString::from(GenericError("Failed to set up logging", err)));
    }

    if let Err(err) = run(args).await {
        eprintln!("{}", FormattedString::from(err));
        process::exit(1);
    }
}

async fn run(args: Cli) -> anyhow::Result<()> {
    let repository = open_repository(args.store)?;

    match args.command {
        Commands::Stubs {
            file_descriptor_set,
        } => {
            let (_, services) = load_descriptor_set(&repository, &file_descriptor_set)?;
            println!("{}", FormattedString::from(ServiceList(services)));
        }
        Commands::Call {
            endpoint,
            proto,
            url,
            body,
            headers,
            bin_headers,
        } => {
            let metadata = build_metadata(headers, bin_headers)?;
            run_call(&repository, endpoint, &proto, url, body, metadata).await?;
        }
        Commands::Protos { sub } => match sub {
            ProtoCommands::Add { paths } => {
                let records = paths
                    .iter()
                    .map(|path| proto_record(&repository, path))
                    .collect::<anyhow::Result<Vec<_>>>()?;
                repository.add_all(records)?;
                println!("{}", FormattedString::from(ProtoList(repository.list()?)));
            }
            ProtoCommands::List => {
                println!("{}", FormattedString::from(ProtoList(repository.list()?)));
            }
            ProtoCommands::Remove { path } => repository.remove(&path)?,
            ProtoCommands::Reload { paths } => {
                let saved = repository.list()?;
                let records = saved
                    .iter()
                    .filter(|record| paths.is_empty() || paths.contains(&record.path))
                    .map(|record| proto_record(&repository, Path::new(&record.path)))
                    .collect::<anyhow::Result<Vec<_>>>()?;
                repository.reload(records)?;
                println!("{}", FormattedString::from(ProtoList(repository.list()?)));
            }
        },
        Commands::IncludeDirs { sub } => match sub {
            IncludeDirCommands::Add { dir } => repository.add_include_dir(dir)?,
            IncludeDirCommands::List => {
                let dirs = repository.list_include_dirs()?;
                println!("{}", FormattedString::from(IncludeDirList(dirs)));
            }
            IncludeDirCommands::Remove { dir } => repository.remove_include_dir(&dir)?,
        },
        Commands::Metadata { sub } => match sub {
            MetadataCommands::Encode { parse_type, value } => {
                let bytes = codec::encode(&value, parse_type)?;
                println!("{}", hex::encode(bytes));
            }
            MetadataCommands::Decode { parse_type, bytes } => {
                let bytes = hex::decode(bytes.trim()).context("Value must be hex encoded")?;
                println!("{}", codec::decode(&bytes, parse_type));
            }
            MetadataCommands::Types => println!("{}", FormattedString::from(ParseTypeList)),
        },
    }

    Ok(())
}

fn open_repository(store: Option<PathBuf>) -> anyhow::Result<ProtoRepository> {
    let path = match store {
        Some(path) => path,
        None => ProjectDirs::from("dev", "rpcdeck", "rpcdeck")
            .context("Could not determine data directory")?
            .data_dir()
            .join("protos.json"),
    };

    tracing::debug!(path = %path.display(), "Using saved protos file");
    Ok(ProtoRepository::open(path)?)
}

/// Reads a descriptor set, looking it up in the include directories when needed.
fn load_descriptor_set(
    repository: &ProtoRepository,
    path: &Path,
) -> anyhow::Result<(DescriptorPool, Vec<Service>)> {
    let resolved = repository
        .lookup_file(path)?
        .with_context(|| format!("Descriptor set '{}' not found", path.display()))?;

    let bytes = std::fs::read(&resolved)
        .with_context(|| format!("Failed to read '{}'", resolved.display()))?;
    let pool = DescriptorPool::decode(bytes.as_slice())
        .with_context(|| format!("Failed to parse file descriptor '{}'", resolved.display()))?;

    let services = walk(&SchemaTree::from(&pool));
    Ok((pool, services))
}

fn proto_record(repository: &ProtoRepository, path: &Path) -> anyhow::Result<ProtoRecord> {
    let (_, services) = load_descriptor_set(repository, path)?;

    let name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    Ok(ProtoRecord {
        name,
        path: path.display().to_string(),
        host: String::new(),
        methods: services
            .into_iter()
            .flat_map(|service| service.methods)
            .map(SavedMethod::from)
            .collect(),
    })
}

fn build_metadata(
    headers: Vec<(String, String)>,
    bin_headers: Vec<(String, ParseType, String)>,
) -> anyhow::Result<Vec<MetadataEntry>> {
    let text = headers
        .into_iter()
        .map(|(key, value)| (key, ParseType::Text, value));

    text.chain(bin_headers)
        .enumerate()
        .map(|(index, (key, parse_type, value))| {
            MetadataEntry::parse(format!("{key}_{index}"), key, &value, parse_type)
                .map_err(anyhow::Error::from)
        })
        .collect()
}

async fn run_call(
    repository: &ProtoRepository,
    endpoint: MethodId,
    proto: &Path,
    url: Option<String>,
    body: Option<serde_json::Value>,
    metadata: Vec<MetadataEntry>,
) -> anyhow::Result<()> {
    let proto_key = proto.display().to_string();
    let saved = repository.get(&proto_key)?;

    let (pool, services) = load_descriptor_set(repository, proto)?;
    let stub = services
        .into_iter()
        .flat_map(|service| service.methods)
        .find(|method| method.id == endpoint)
        .with_context(|| format!("Method '{endpoint}' not found in '{proto_key}'"))?;

    let saved_method = saved
        .as_ref()
        .and_then(|record| record.method(&stub.service_name, &stub.name));

    let url = url
        .or_else(|| saved.as_ref().map(|r| r.host.clone()).filter(|h| !h.is_empty()))
        .context("No --url given and no saved host for this proto")?;

    let metadata = if metadata.is_empty() {
        saved_method
            .map(|m| m.request_metadata.clone())
            .unwrap_or_default()
    } else {
        metadata
    };

    let body = body
        .or_else(|| saved_method.map(|m| m.request_body.clone()))
        .unwrap_or_else(|| stub.request_body.clone());

    let request = CallRequest {
        id: stub.id.clone(),
        mode: stub.mode,
        body,
        metadata: metadata.clone(),
    };

    tracing::info!(method = %stub.id, mode = ?stub.mode, %url, "Calling");

    let (transport, events) = GrpcTransport::connect(&url, pool).await?;
    let outcome = session::run(transport, events, request).await?;

    if saved.is_some() {
        let mut method = SavedMethod::from(stub);
        method.request_body = outcome.request_body;
        method.request_metadata = metadata;
        method.response_metadata = outcome.response_metadata;
        repository.save_method(&proto_key, &url, method)?;
    }

    Ok(())
}
