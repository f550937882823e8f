use anyhow::{anyhow, bail};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use wsp_core::{PageId, PageMode, SyncEngineStep};
use wsp_runner::{Config, Session};

#[derive(Parser)]
#[command(name = "wsp", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Initialize a workspace in the current directory (creates .wsp/, config, db)
    Init,

    /// List pages with their mode, plus sync readiness
    Status,

    /// Add a page
    PageAdd {
        #[arg(long)]
        id: String,
        #[arg(long)]
        title: String,
        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// Remove a page
    PageRm {
        #[arg(long)]
        id: String,
    },

    /// Change a page title
    PageRename {
        #[arg(long)]
        id: String,
        #[arg(long)]
        title: String,
    },

    /// Set the recorded sync step (stopped, syncing, synced)
    Sync {
        #[arg(long)]
        step: String,
    },

    /// Show, set or toggle a page's editor mode
    Mode {
        #[arg(long)]
        id: String,
        #[arg(long, conflicts_with = "set")]
        toggle: bool,
        #[arg(long)]
        set: Option<String>,
    },

    /// Print one page's metadata as JSON
    Show {
        #[arg(long)]
        id: String,
    },

    /// Run a scripted series of changes against the live record list and print each emission
    Watch,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let repo_root = std::env::current_dir()?;

    let fallback = Config::load_or_default(&repo_root)
        .ok()
        .and_then(|cfg| cfg.log.filter)
        .unwrap_or_else(|| "warn".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!(command = ?cli.cmd, root = %repo_root.display(), "dispatch");

    match cli.cmd {
        Command::Init => {
            Session::init_repo(&repo_root)?;
            println!("Initialized workspace in {}", repo_root.display());
        }
        Command::Status => {
            let s = Session::open(repo_root)?;
            let report = s.status();
            println!("Workspace: {}", report.workspace_id);
            println!("Sync: {} (ready: {})", report.step.as_str(), report.ready);
            println!("Pages: {}", report.pages.len());
            for p in report.pages {
                println!("- {} [{}] {}", p.id, p.mode.as_str(), p.title);
            }
        }
        Command::PageAdd { id, title, tags } => {
            let s = Session::open(repo_root)?;
            s.add_page(&id, &title, tags)?;
            println!("Added page {}", id);
        }
        Command::PageRm { id } => {
            let s = Session::open(repo_root)?;
            s.remove_page(&id)?;
            println!("Removed page {}", id);
        }
        Command::PageRename { id, title } => {
            let s = Session::open(repo_root)?;
            s.rename_page(&id, &title)?;
            println!("Renamed page {}", id);
        }
        Command::Sync { step } => {
            let step = SyncEngineStep::parse(&step).ok_or_else(|| anyhow!("unknown sync step: {step}"))?;
            let s = Session::open(repo_root)?;
            s.set_sync_step(step)?;
            println!("Sync step: {}", step.as_str());
        }
        Command::Mode { id, toggle, set } => {
            let s = Session::open(repo_root)?;
            let mode = match (toggle, set) {
                (true, _) => s.toggle_mode(&id)?,
                (false, Some(raw)) => {
                    let Some(mode) = PageMode::parse(&raw) else {
                        bail!("unknown page mode: {raw}");
                    };
                    s.set_mode(&id, mode)?;
                    mode
                }
                (false, None) => s.record(&id)?.get_mode(),
            };
            println!("{} {}", id, mode.as_str());
        }
        Command::Show { id } => {
            let s = Session::open(repo_root)?;
            let record = s.record(&id)?;
            let meta = record.meta().value().ok_or_else(|| anyhow!("no page with id {id}"))?;
            let page = wsp_page::watch_page(s.workspace.clone(), Some(PageId::from_str(id.clone()))).value();
            let out = serde_json::json!({
                "meta": meta,
                "mode": record.get_mode().as_str(),
                "loaded": page.map(|p| p.loaded).unwrap_or(false),
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Command::Watch => {
            let s = Session::open(repo_root)?;
            wsp_runner::run_demo(&s, &wsp_runner::default_demo(), |line| println!("{line}"))?;
        }
    }

    Ok(())
}
