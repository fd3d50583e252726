// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use anyhow::{bail, Context, Result};
use pipeline_atlas::config::{load_and_validate_config, Config};
use pipeline_atlas::debug::pump_events;
use pipeline_atlas::resource::{ResourceIndex, SearchQuery};
use pipeline_atlas::traits::WriterSink;
use pipeline_atlas::EventBroker;
use serde_json::Value;
use std::env;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "\
Usage: pipeline-atlas <config.yaml|config.toml> <command>

Commands:
  files                              list pipeline files of every root
  search <query> [--regex] [--limit N]
  chain <node-id>                    follow next/interrupt/on_error across files
  refs <node-id>                     nodes that reference <node-id>
  watch                              relay JSON events from stdin as SSE frames";

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    if args.len() < 2 {
        eprintln!("{USAGE}");
        std::process::exit(1);
    }

    if let Err(e) = run(&args[0], &args[1], &args[2..]).await {
        eprintln!("❌ {e:#}");
        std::process::exit(1);
    }
}

async fn run(config_path: &str, command: &str, rest: &[String]) -> Result<()> {
    let config = load_and_validate_config(config_path)
        .with_context(|| format!("loading config '{config_path}'"))?;

    match command {
        "files" => list_files(&config),
        "search" => search(&config, rest),
        "chain" => chain(&config, single_arg(rest, "chain")?),
        "refs" => refs(&config, single_arg(rest, "refs")?),
        "watch" => watch(&config).await,
        other => bail!("unknown command '{other}'\n\n{USAGE}"),
    }
}

fn single_arg<'a>(rest: &'a [String], command: &str) -> Result<&'a str> {
    match rest {
        [value] => Ok(value.as_str()),
        _ => bail!("'{command}' takes exactly one node id"),
    }
}

fn open_index(config: &Config) -> Result<ResourceIndex> {
    let roots = config.active_roots();
    if roots.is_empty() {
        bail!("the active resource profile has no paths");
    }
    Ok(ResourceIndex::new(roots))
}

fn list_files(config: &Config) -> Result<()> {
    let index = open_index(config)?;
    for listing in index.list_all_files() {
        match &listing.path {
            Some(path) => println!("{}\t{}", listing.label, path.display()),
            None => println!("{}", listing.label),
        }
    }
    Ok(())
}

fn search(config: &Config, rest: &[String]) -> Result<()> {
    let mut query_text = None;
    let mut use_regex = false;
    let mut limit = config.search.max_results;

    let mut args = rest.iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--regex" => use_regex = true,
            "--limit" => {
                let value = args.next().context("--limit needs a number")?;
                limit = value
                    .parse()
                    .with_context(|| format!("invalid --limit '{value}'"))?;
            }
            text if query_text.is_none() => query_text = Some(text),
            extra => bail!("unexpected argument '{extra}'"),
        }
    }
    let Some(query_text) = query_text else {
        bail!("'search' needs a query");
    };

    let index = open_index(config)?;
    let hits = index.search(&SearchQuery::new(query_text).regex(use_regex).limit(limit));
    for hit in &hits {
        println!(
            "{}\t{}\t{}\t{}",
            hit.display_id,
            hit.kind,
            hit.filename,
            hit.source.display()
        );
    }
    eprintln!("{} result(s)", hits.len());
    Ok(())
}

fn chain(config: &Config, start: &str) -> Result<()> {
    let index = open_index(config)?;
    let links = index.node_chain(start);
    if links.is_empty() {
        bail!("node '{start}' not found");
    }
    for (depth, link) in links.iter().enumerate() {
        println!("{depth:>3}  {}  ({})", link.node_id, link.filename);
    }
    Ok(())
}

fn refs(config: &Config, target: &str) -> Result<()> {
    let index = open_index(config)?;
    for reference in index.find_references_to(target) {
        println!(
            "{}:{}\t{}\t{}",
            reference.filename,
            reference.node_id,
            reference.field,
            reference.root.display()
        );
    }
    Ok(())
}

/// Publish each stdin line that parses as JSON and stream the frames to
/// stdout until Ctrl-C or end of input.
async fn watch(config: &Config) -> Result<()> {
    let broker = EventBroker::<Value>::with_capacity(config.debug.inbox_capacity);
    let cancel = CancellationToken::new();

    let pump = {
        let broker = broker.clone();
        let cancel = cancel.clone();
        let heartbeat = config.debug.heartbeat();
        tokio::spawn(async move {
            let mut sink = WriterSink::new(tokio::io::stdout());
            pump_events(&broker, &mut sink, heartbeat, cancel).await
        })
    };

    // Events published before the stream subscribes would be lost.
    while broker.subscriber_count() == 0 && !pump.is_finished() {
        tokio::task::yield_now().await;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                cancel.cancel();
                break;
            }
            line = lines.next_line() => {
                let Some(line) = line.context("reading stdin")? else {
                    break;
                };
                match serde_json::from_str::<Value>(&line) {
                    Ok(event) => {
                        broker.publish(&event);
                    }
                    Err(e) => eprintln!("⚠️  skipping line that is not JSON: {e}"),
                }
            }
        }
    }

    // Closing lets the stream flush what is already queued before it ends.
    broker.close();
    pump.await.context("stream task panicked")??;
    Ok(())
}
