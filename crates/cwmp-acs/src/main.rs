//! cwmpwalk: a minimal CWMP ACS that walks a device's implemented data
//! model and prints it.

use std::net::{IpAddr, SocketAddr};

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cwmp_acs::server;
use cwmp_model::DataModel;

#[derive(Debug, Parser)]
#[command(name = "cwmpwalk", version, about = "Walk a CWMP device's implemented data model")]
struct Args {
    /// Address to run the ACS on.
    #[arg(short, long, default_value = "0.0.0.0")]
    bind: IpAddr,

    /// Port to run the ACS on.
    #[arg(short, long, default_value_t = 8000)]
    port: u16,

    /// Print the discovered data model as JSON instead of text.
    #[arg(long)]
    json: bool,
}

fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_results(model: &DataModel, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(model)?);
        return Ok(());
    }

    println!();
    println!("The Implemented Data Model is:");
    for object in model.objects() {
        println!("{}", object.path());
        for parameter in object.parameters() {
            println!(
                "- {} = {}",
                parameter.full_path(),
                parameter.value().unwrap_or("")
            );
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    setup_logging();
    let args = Args::parse();

    let addr = SocketAddr::new(args.bind, args.port);
    let model = server::run(addr)
        .await
        .with_context(|| format!("walk session on {addr} failed"))?;

    print_results(&model, args.json)
}
