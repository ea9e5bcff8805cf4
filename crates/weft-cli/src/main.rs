//! `weft` command line front end

mod app;

use app::{Options, Report};
use clap::{value_parser, Arg, ArgAction, Command};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn command() -> Command {
    Command::new("weft")
        .version(weft_core::VERSION)
        .about("Parse, transform and stringify a document through a plugin pipeline")
        .arg(
            Arg::new("input")
                .value_parser(value_parser!(PathBuf))
                .help("Input document (reads stdin when omitted)"),
        )
        .arg(
            Arg::new("preset")
                .long("preset")
                .short('p')
                .value_parser(value_parser!(PathBuf))
                .help("Preset file (.toml, .json, .yaml)"),
        )
        .arg(
            Arg::new("use")
                .long("use")
                .short('u')
                .action(ArgAction::Append)
                .help("Add a catalog plugin by name (repeatable)"),
        )
        .arg(
            Arg::new("sync")
                .long("sync")
                .action(ArgAction::SetTrue)
                .help("Process without suspending; async plugins fail"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .action(ArgAction::SetTrue)
                .help("Print the processed file as JSON"),
        )
        .arg(
            Arg::new("list")
                .long("list")
                .action(ArgAction::SetTrue)
                .help("List catalog plugins and exit"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .action(ArgAction::Count)
                .help("Increase log verbosity"),
        )
}

fn init_tracing(verbosity: u8) {
    let default = match verbosity {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = command().get_matches();
    init_tracing(matches.get_count("verbose"));

    let catalog = weft_text::catalog();
    if matches.get_flag("list") {
        for name in catalog.names() {
            println!("{name}");
        }
        return Ok(());
    }

    let options = Options {
        input: matches.get_one::<PathBuf>("input").cloned(),
        preset: matches.get_one::<PathBuf>("preset").cloned(),
        plugins: matches
            .get_many::<String>("use")
            .map(|names| names.cloned().collect())
            .unwrap_or_default(),
        sync: matches.get_flag("sync"),
    };

    let file = app::run(&catalog, &options).await?;
    let report = Report::new(&file);
    for message in &file.messages {
        eprintln!("{message}");
    }
    if matches.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&report.to_json())?);
    } else {
        println!("{}", report.render());
    }

    if file.has_failed() {
        std::process::exit(1);
    }
    Ok(())
}
