//! Fetches a URL with the curl-easy wrapper and writes the body to
//! stdout or a file.

use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use curl_easy::{Easy, GlobalInit, List};
use tracing_subscriber::filter::LevelFilter;

#[derive(Parser)]
#[command(name = "fetch", about = "Fetch a URL through the curl-easy wrapper")]
struct Args {
    /// URL to fetch
    url: String,

    /// Write the body to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Extra request header, repeatable (e.g. -H 'Accept: text/html')
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,

    /// Cookie as name=value, repeatable
    #[arg(short, long = "cookie")]
    cookies: Vec<String>,

    /// User-Agent header value
    #[arg(long)]
    user_agent: Option<String>,

    /// Log libcurl wrapper activity
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            LevelFilter::TRACE
        } else {
            LevelFilter::WARN
        })
        .with_writer(io::stderr)
        .init();

    let _global = GlobalInit::new().context("initializing libcurl")?;

    let mut easy = Easy::new()?;
    easy.url(&args.url)?;
    easy.follow_location(true)?;
    easy.useragent(args.user_agent.as_deref().unwrap_or(curl_easy::FIREFOX27))?;

    if !args.headers.is_empty() {
        let mut headers = List::new();
        headers.append_all(&args.headers)?;
        easy.set_headers(headers)?;
    }

    let cookies = args.cookies.iter().map(|cookie| {
        cookie
            .split_once('=')
            .unwrap_or((cookie.as_str(), ""))
    });
    easy.add_cookies(cookies)?;

    match &args.output {
        Some(path) => {
            let mut file = File::create(path)
                .with_context(|| format!("creating {}", path.display()))?;
            easy.recv_into_file(&mut file)
                .with_context(|| format!("fetching {}", args.url))?;
        }
        None => {
            let body = easy
                .recv()
                .with_context(|| format!("fetching {}", args.url))?;
            io::stdout().write_all(&body)?;
        }
    }

    Ok(())
}
