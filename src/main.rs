use anyhow::{anyhow, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

use benchlive::config::Config;
use benchlive::lifecycle::{run, PageEvent, RunOutcome};
use benchlive::logging::{info, obj, v_str, Domain};
use benchlive::page::Document;
use benchlive::replay::ReplayStatsSource;
use benchlive::session::Session;
use benchlive::source::{HttpStatsSource, StatsSource};

struct Args {
    page: PathBuf,
    replay: Option<PathBuf>,
    out: Option<PathBuf>,
}

fn parse_args() -> Result<Args> {
    let mut args = std::env::args().skip(1);
    let mut page = None;
    let mut replay = None;
    let mut out = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--replay" => replay = Some(PathBuf::from(args.next().ok_or_else(|| anyhow!("--replay needs a file"))?)),
            "--out" => out = Some(PathBuf::from(args.next().ok_or_else(|| anyhow!("--out needs a file"))?)),
            _ if page.is_none() => page = Some(PathBuf::from(arg)),
            other => return Err(anyhow!("unexpected argument {}", other)),
        }
    }
    let page = page.ok_or_else(|| anyhow!("Usage: benchlive <page.json> [--replay <script.json>] [--out <page.json>]"))?;
    Ok(Args { page, replay, out })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = parse_args()?;
    let cfg = Config::from_env();
    let doc = Document::load(&args.page)?;

    let source: Arc<dyn StatsSource> = match &args.replay {
        Some(path) => {
            info(Domain::System, "source", obj(&[("type", v_str("replay")), ("path", v_str(&path.display().to_string()))]));
            Arc::new(ReplayStatsSource::load(path)?)
        }
        None => {
            info(Domain::System, "source", obj(&[("type", v_str("http")), ("base_url", v_str(&cfg.base_url))]));
            Arc::new(HttpStatsSource::new(&cfg)?)
        }
    };

    let (tx, mut rx) = mpsc::channel(8);
    let unload_tx = tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = unload_tx.send(PageEvent::BeforeUnload).await;
        }
    });
    tx.send(PageEvent::Ready).await?;

    let mut session = Session::new(cfg, source);
    let outcome = run(&mut session, &doc, &mut rx).await;
    let label = match outcome {
        RunOutcome::Reload => "reload",
        RunOutcome::Unloaded => "unloaded",
    };
    info(Domain::System, "session_end", obj(&[("outcome", v_str(label))]));

    match &args.out {
        Some(path) => doc.save(path)?,
        None => println!("{}", doc.to_json()?),
    }
    Ok(())
}
