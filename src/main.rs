use std::process::ExitCode;
use std::time::Duration;

use log::error;
use serde::Serialize;

use sourcequery::{Querier, SourceQueryError, DEFAULT_TIMEOUT};

const USAGE: &str = "usage: sourcequery <ip:port> [info|players] [--timeout <secs>] [--app-id <id>]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Info,
    Players,
}

#[derive(Debug)]
struct Args {
    addr: String,
    command: Command,
    timeout: Duration,
    app_id: Option<u16>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args, String> {
    let mut addr = None;
    let mut command = Command::Info;
    let mut timeout = DEFAULT_TIMEOUT;
    let mut app_id = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "info" => command = Command::Info,
            "players" => command = Command::Players,
            "--timeout" => {
                let secs: f64 = args
                    .next()
                    .and_then(|v| v.parse().ok())
                    .filter(|s: &f64| s.is_finite() && *s > 0.0)
                    .ok_or("--timeout needs a positive number of seconds")?;
                timeout = Duration::from_secs_f64(secs);
            }
            "--app-id" => {
                let id: u16 = args
                    .next()
                    .and_then(|v| v.parse().ok())
                    .ok_or("--app-id needs a number between 0 and 65535")?;
                app_id = Some(id);
            }
            _ if addr.is_none() && !arg.starts_with('-') => addr = Some(arg),
            _ => return Err(format!("unexpected argument `{}`", arg)),
        }
    }

    Ok(Args {
        addr: addr.ok_or("missing server address")?,
        command,
        timeout,
        app_id,
    })
}

async fn run(args: Args) -> Result<String, SourceQueryError> {
    let mut querier = Querier::new(&args.addr, args.timeout).await?;
    querier.set_app_id(args.app_id);

    let result = match args.command {
        Command::Info => querier.get_server_info().await.map(|i| to_json(&i)),
        Command::Players => querier.get_player_info().await.map(|p| to_json(&p)),
    };

    querier.close();
    result
}

fn to_json<T: Serialize>(value: &T) -> String {
    // the data model holds only strings and numbers, so this cannot fail
    serde_json::to_string_pretty(value).unwrap_or_default()
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{}\n{}", e, USAGE);
            return ExitCode::from(2);
        }
    };

    match run(args).await {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("query failed: {:?}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
