// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! httpsession CLI
//!
//! Small front end over the library: fetch, post and download from the shell.

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{anyhow, bail, Context};
use httpsession::{Completion, Method, Progress, RequestConfig, Session};
use tokio::sync::oneshot;

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("httpsession=info".parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        return ExitCode::from(1);
    }

    let result = match args[1].as_str() {
        "get" => match args.get(2) {
            Some(url) => get(url).await,
            None => usage_error("Usage: httpsession get <url>"),
        },
        "post" => match args.get(2) {
            Some(url) => post(url, &args[3..]).await,
            None => usage_error("Usage: httpsession post <url> [key=value...]"),
        },
        "download" => match (args.get(2), args.get(3)) {
            (Some(url), Some(dest)) => download(url, PathBuf::from(dest)).await,
            _ => usage_error("Usage: httpsession download <url> <dest>"),
        },
        "--help" | "-h" | "help" => {
            print_usage();
            return ExitCode::SUCCESS;
        }
        "--version" | "-v" | "version" => {
            println!("httpsession {}", httpsession::VERSION);
            return ExitCode::SUCCESS;
        }
        cmd => {
            eprintln!("Unknown command: {}", cmd);
            print_usage();
            return ExitCode::from(1);
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

fn print_usage() {
    println!(
        r#"httpsession - Callback-driven HTTP sessions

USAGE:
    httpsession <COMMAND> [OPTIONS]

COMMANDS:
    get <url>                   Fetch a URL and print the body
    post <url> [key=value...]   POST form parameters and print the body
    download <url> <dest>       Download a URL to a file
    help                        Show this help message
    version                     Show version information

Set RUST_LOG (e.g. RUST_LOG=httpsession=debug) for more detail.
"#
    );
}

fn usage_error(message: &str) -> anyhow::Result<()> {
    bail!("{}", message)
}

/// Run a configured send and wait for its completion
async fn send(session: &mut Session) -> anyhow::Result<Completion> {
    let (tx, rx) = oneshot::channel();
    session
        .send_for_result(move |completion| {
            let _ = tx.send(completion);
        })?
        .join()
        .await?;
    rx.await.context("completion callback never ran")
}

fn print_completion(completion: Completion) -> anyhow::Result<()> {
    if let Some(ref response) = completion.response {
        eprintln!("Status: {}", response.status);
        if let Some(ct) = response.content_type() {
            eprintln!("Content-Type: {}", ct);
        }
    }
    let (body, _) = completion.into_result()?;
    println!("{}", String::from_utf8_lossy(&body));
    Ok(())
}

async fn get(url: &str) -> anyhow::Result<()> {
    let mut session = Session::new()?;
    session.configure(url, RequestConfig::new())?;
    print_completion(send(&mut session).await?)
}

async fn post(url: &str, pairs: &[String]) -> anyhow::Result<()> {
    let mut config = RequestConfig::new().method(Method::POST);
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("expected key=value, got {:?}", pair))?;
        config = config.param(key, value);
    }

    let mut session = Session::new()?;
    session.configure(url, config)?;
    print_completion(send(&mut session).await?)
}

async fn download(url: &str, dest: PathBuf) -> anyhow::Result<()> {
    let mut session = Session::new()?;
    session.configure(url, RequestConfig::new())?;

    let (saved_tx, saved_rx) = oneshot::channel();
    let (done_tx, done_rx) = oneshot::channel();
    let target = dest.clone();

    session
        .download(
            None,
            |progress: Progress| match progress.fraction() {
                Some(fraction) => eprint!("\r{:>5.1}%", fraction * 100.0),
                None => eprint!("\r{} bytes", progress.total_bytes),
            },
            move |path| {
                // The temporary file is gone once this returns
                let _ = saved_tx.send(std::fs::copy(path, &target));
            },
            move |completion| {
                let _ = done_tx.send(completion);
            },
        )?
        .join()
        .await?;
    eprintln!();

    let completion = done_rx.await.context("completion callback never ran")?;
    if let Some(ref response) = completion.response {
        eprintln!("Status: {}", response.status);
    }
    completion.into_result()?;

    let bytes = saved_rx
        .await
        .context("download produced no file")?
        .with_context(|| format!("copying download to {}", dest.display()))?;
    println!("Saved {} bytes to {}", bytes, dest.display());
    Ok(())
}
