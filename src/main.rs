//! dkim-deploy CLI
//!
//! Entry point for the `dkim-deploy` command-line tool.

use clap::Parser;
use dkim_deploy::{
    deploy, logging, DeployConfig, DeployError, DeploymentMetadata, Dispatcher, HttpTransport,
    UploadResult,
};
use std::path::PathBuf;
use std::process;
use tracing::debug;

#[derive(Parser)]
#[command(name = "dkim-deploy")]
#[command(about = "Upload a deployment artifact signed with a DKIM key", version)]
struct Cli {
    /// Deployment server URL the artifact is POSTed to
    #[arg(long)]
    server: String,

    /// Artifact to deploy
    #[arg(long = "file_to_deploy", visible_alias = "file-to-deploy")]
    file_to_deploy: PathBuf,

    /// Signing address in `selector@domain` form
    #[arg(long = "signing_address", visible_alias = "signing-address")]
    signing_address: String,

    /// PEM private key matching the published DKIM record
    #[arg(
        long = "pem_private_key_path",
        visible_alias = "pem-private-key-path",
        default_value = dkim_deploy::config::DEFAULT_PRIVATE_KEY_PATH
    )]
    pem_private_key_path: PathBuf,

    /// Enable debug logging on stderr (overridden by RUST_LOG)
    #[arg(long, short = 'v')]
    verbose: bool,

    /// Print the server's answer as JSON
    #[arg(long)]
    json: bool,
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config = DeployConfig::new(cli.server, cli.file_to_deploy, cli.signing_address)
        .with_private_key_path(cli.pem_private_key_path);
    let metadata = DeploymentMetadata::from_env();
    debug!(?metadata, "deployment metadata");

    let transport = match HttpTransport::new() {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };
    let dispatcher = Dispatcher::new(transport);

    match deploy(&config, &metadata, &dispatcher) {
        Ok(result) => {
            print_result(&result, cli.json);
        }
        Err(e) => {
            if let Some(result) = e.upload_result() {
                print_result(result, cli.json);
            }
            report_error(&e);
            process::exit(e.exit_code());
        }
    }
}

fn print_result(result: &UploadResult, json: bool) {
    if json {
        match serde_json::to_string_pretty(result) {
            Ok(s) => println!("{}", s),
            Err(e) => {
                eprintln!("Error serializing output: {}", e);
                process::exit(1);
            }
        }
    } else {
        println!("Status code: {}", result.status_code);
        println!("Response: {}", result.response_body);
    }
}

fn report_error(error: &DeployError) {
    match error {
        DeployError::InvalidIdentityFormat(_) => {
            eprintln!("Error: {}", error);
            eprintln!("Expected the signing address as selector@domain");
        }
        _ => eprintln!("Error: {}", error),
    }
}
