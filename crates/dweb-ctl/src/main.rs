//! dweb-ctl: command-line interface for the dweb daemon.

mod cmd;

use anyhow::{Context, Result};

use cmd::log::cmd_log;
use cmd::nodes::cmd_register;
use cmd::select::cmd_select;
use cmd::services::cmd_services;
use cmd::status::{cmd_shutdown, cmd_status};

const DEFAULT_PORT: u16 = 9101;

fn print_usage() {
    println!("Usage: dweb-ctl [--port <port>] <command>");
    println!();
    println!("Commands:");
    println!("  status                                     Show daemon status");
    println!("  services                                   List service types and provider counts");
    println!("  select <service> [strategy]                Pick a provider for a service");
    println!("  register <service> <name> <endpoint> [parent]");
    println!("                                             Register a provider node");
    println!("  log <message>                              Append a line to the event log");
    println!("  shutdown                                   Stop the daemon");
    println!();
    println!("Strategies: cheapest, lowest-latency, most-reliable, highest-pledge, composite");
    println!();
    println!("Options:");
    println!("  --port <port>   API port (default: {})", DEFAULT_PORT);
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    // Parse --port option
    let mut port = DEFAULT_PORT;
    let mut remaining: Vec<&str> = Vec::new();
    let mut i = 0;
    while i < args.len() {
        if args[i] == "--port" {
            i += 1;
            port = args
                .get(i)
                .context("--port requires a value")?
                .parse()
                .context("--port must be a number")?;
        } else {
            remaining.push(&args[i]);
        }
        i += 1;
    }

    match remaining.as_slice() {
        ["status"] | [] => cmd_status(port).await,
        ["services"] => cmd_services(port).await,
        ["select", service] => cmd_select(port, service, None).await,
        ["select", service, strategy] => cmd_select(port, service, Some(*strategy)).await,
        ["register", service, name, endpoint] => {
            cmd_register(port, service, name, endpoint, None).await
        }
        ["register", service, name, endpoint, parent] => {
            cmd_register(port, service, name, endpoint, Some(*parent)).await
        }
        ["log", words @ ..] if !words.is_empty() => cmd_log(port, &words.join(" ")).await,
        ["shutdown"] => cmd_shutdown(port).await,
        ["help"] | ["--help"] | ["-h"] => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}", other.join(" "));
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
}
