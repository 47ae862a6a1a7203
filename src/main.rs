use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{ArgAction, Parser};
use log::*;
use serde::Serialize;
use serde_json::{Map, Value};
use simplelog::*;

use graphql_collector_lib::{lang, CollectContext, Collector, ExtractOptions, FieldTree};

/// Collect query context from the fields a GraphQL query requests.
#[derive(Parser, Debug)]
#[command(name = "graphql_collector", version)]
struct Args {
    /// Handler map written in the handler language.
    #[arg(short = 'H', long, value_name = "FILE", required_unless_present = "fields")]
    handlers: Option<PathBuf>,

    /// Read the GraphQL document from a file instead of the argument.
    #[arg(short, long, value_name = "FILE", conflicts_with = "document")]
    query: Option<PathBuf>,

    /// GraphQL document. Read from stdin when neither this nor --query is given.
    #[arg(value_name = "\"QUERY\"")]
    document: Option<String>,

    /// Operation to use when the document holds several.
    #[arg(short, long)]
    operation: Option<String>,

    /// Variables for @skip/@include, as a JSON object.
    #[arg(long, value_name = "JSON")]
    variables: Option<String>,

    /// Dotted field path the resolver sits at, e.g. post.author
    #[arg(short, long)]
    root: Option<String>,

    /// Keep __typename and other introspection fields.
    #[arg(long)]
    include_introspection: bool,

    /// Print the requested field tree instead of collecting.
    #[arg(long)]
    fields: bool,

    #[arg(long)]
    pretty: bool,

    /// Sets the level of verbosity
    #[arg(short, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    CombinedLogger::init(vec![TermLogger::new(
        log_level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )])
    .context("logger")?;

    let source = match (&args.query, &args.document) {
        (Some(path), _) => {
            fs::read_to_string(path).with_context(|| format!("reading query {}", path.display()))?
        }
        (None, Some(document)) => document.clone(),
        (None, None) => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer).context("reading query from stdin")?;
            buffer
        }
    };

    let variables = match &args.variables {
        Some(text) => serde_json::from_str::<Map<String, Value>>(text).context("parsing --variables")?,
        None => Map::new(),
    };
    let options = ExtractOptions {
        operation_name: args.operation.clone(),
        variables,
        root: args
            .root
            .as_deref()
            .map(|path| path.split('.').map(str::to_string).collect())
            .unwrap_or_default(),
        include_introspection: args.include_introspection,
    };

    let mut now = Instant::now();
    let fields = FieldTree::from_document(&source, &options)?;
    debug!("requested: {:?}", fields.paths());
    let extract_ms = now.elapsed().as_millis();

    if args.fields {
        print(&fields, args.pretty)?;
        info!("extract spent: {}ms", extract_ms);
        return Ok(());
    }

    // clap only lets --handlers be missing together with --fields
    let path = args.handlers.as_ref().expect("--handlers");
    now = Instant::now();
    let text = fs::read_to_string(path).with_context(|| format!("reading handlers {}", path.display()))?;
    let collector = Collector::new(lang::parse_handlers::<CollectContext>(&text)?);
    let setup_ms = now.elapsed().as_millis();

    now = Instant::now();
    let mut context = CollectContext::default();
    collector.collect(&mut context, &fields)?;
    let collect_ms = now.elapsed().as_millis();

    print(&context, args.pretty)?;

    info!("extract spent: {}ms", extract_ms);
    info!("setup spent: {}ms", setup_ms);
    info!("collect spent: {}ms", collect_ms);
    Ok(())
}

fn print<T: Serialize>(value: &T, pretty: bool) -> anyhow::Result<()> {
    let serialized = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", serialized);
    Ok(())
}
