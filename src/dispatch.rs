//! Subcommand handlers. Each one is a thin wrapper over the library.

use std::io;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use bibtools_core::learn::parse_search;
use bibtools_core::store::{AuthorRole, HistoryAction};
use bibtools_core::{
    Autolearner, Config, Database, Library, LocateError, Locator, ProxySession, Publication, Store,
    print_generic_listing,
};
use chrono::Datelike;
use tracing::debug;

use crate::cli::{Cli, Command};
use crate::terminal::Spinner;

/// Everything a handler needs for one invocation.
struct Context {
    config: Arc<Config>,
    store: Store,
    quiet: bool,
}

impl Context {
    async fn open(quiet: bool) -> Result<Self> {
        let config = Config::load_default().context("loading configuration")?;
        let db_path = config.database_path()?;
        debug!(path = %db_path.display(), "opening store");
        let db = Database::new(&db_path)
            .await
            .with_context(|| format!("opening {}", db_path.display()))?;
        Ok(Self {
            config: Arc::new(config),
            store: Store::new(db),
            quiet,
        })
    }

    fn learner(&self) -> Result<Autolearner> {
        Ok(Autolearner::new(Arc::clone(&self.config))?)
    }

    /// Resolves one reference; ambiguity and misses are reported on stderr
    /// and yield `None`.
    async fn locate(&self, text: &str, autolearn: bool) -> Result<Option<Publication>> {
        let learner = if autolearn { Some(self.learner()?) } else { None };
        let mut locator = Locator::new(&self.store);
        if let Some(learner) = &learner {
            locator = locator.with_learner(learner);
        }

        let spinner = autolearn.then(|| Spinner::start(self.quiet, format!("Resolving {text}...")));
        let result = locator.locate_single(text, autolearn).await;
        if let Some(spinner) = spinner {
            spinner.finish();
        }

        match result {
            Ok(publication) => Ok(Some(publication)),
            Err(err @ LocateError::Ambiguous { .. }) => {
                eprintln!("error: {err}");
                eprintln!();
                print_generic_listing(&self.store, err.candidates(), &mut io::stderr())
                    .await?;
                Ok(None)
            }
            Err(err @ LocateError::NotFound { .. }) => {
                eprintln!("error: {err}");
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// Runs the parsed command.
pub(crate) async fn run(cli: &Cli) -> Result<ExitCode> {
    let ctx = Context::open(cli.quiet).await?;
    let outcome = match &cli.command {
        Command::Info(args) => run_info(&ctx, &args.reference).await,
        Command::List(args) => run_list(&ctx, &args.reference).await,
        Command::Pdf(args) => run_pdf(&ctx, &args.reference).await,
        Command::Read(args) => run_read(&ctx, &args.reference).await,
        Command::Delete(args) => run_delete(&ctx, &args.reference).await,
        Command::Search(args) => run_search(&ctx, &args.terms).await,
    };
    ctx.store.database().clone().close().await;
    outcome
}

async fn run_info(ctx: &Context, reference: &str) -> Result<ExitCode> {
    let Some(publication) = ctx.locate(reference, true).await? else {
        return Ok(ExitCode::FAILURE);
    };
    let store = &ctx.store;
    let id = publication.id;

    println!("{}", publication.title.as_deref().unwrap_or("(no title)"));
    if let Some(year) = publication.year {
        println!("{year}");
    }
    for (label, role) in [("authors", AuthorRole::Author), ("editors", AuthorRole::Editor)] {
        let names = store.authors(id, role).await?;
        if !names.is_empty() {
            let names: Vec<String> = names
                .iter()
                .map(|name| format!("{} {}", name.given, name.family).trim().to_string())
                .collect();
            println!("{label}: {}", names.join(", "));
        }
    }
    for (label, value) in [
        ("doi", &publication.doi),
        ("bibcode", &publication.bibcode),
        ("arxiv", &publication.arxiv),
    ] {
        if let Some(value) = value {
            println!("{label}: {value}");
        }
    }
    if let Some(nickname) = store.choose_nickname(id).await? {
        println!("nickname: {nickname}");
    }
    if let Some(refdata) = publication.refdata_map() {
        for (key, value) in refdata.iter().filter(|(key, _)| !key.starts_with('_')) {
            println!("{key}: {value}");
        }
    }
    let library = Library::new(ctx.config.library_dir()?, ctx.config.timeouts())?;
    if let Some(path) = library.pdf_path(store, id).await? {
        println!("pdf: {}", path.display());
    }
    Ok(ExitCode::SUCCESS)
}

async fn run_list(ctx: &Context, reference: &str) -> Result<ExitCode> {
    let pubs = Locator::new(&ctx.store).locate_all(reference).await?;
    if pubs.is_empty() {
        eprintln!("error: no publications matched \"{reference}\"");
        return Ok(ExitCode::FAILURE);
    }
    print_generic_listing(&ctx.store, &pubs, &mut io::stdout()).await?;
    Ok(ExitCode::SUCCESS)
}

async fn run_pdf(ctx: &Context, reference: &str) -> Result<ExitCode> {
    let Some(publication) = ctx.locate(reference, true).await? else {
        return Ok(ExitCode::FAILURE);
    };
    let session = ProxySession::new(ctx.config.proxy_config()?, ctx.config.timeouts())?;
    let library = Library::new(ctx.config.library_dir()?, ctx.config.timeouts())?;

    let spinner = Spinner::start(ctx.quiet, "Fetching PDF...");
    let stored = library.fetch_pdf(&ctx.store, &session, &publication).await;
    spinner.finish();

    match stored? {
        Some(stored) => {
            println!("{}  {}", stored.hash, stored.path.display());
            Ok(ExitCode::SUCCESS)
        }
        None => {
            eprintln!("error: could not find a PDF for \"{reference}\"");
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn run_read(ctx: &Context, reference: &str) -> Result<ExitCode> {
    let Some(publication) = ctx.locate(reference, false).await? else {
        return Ok(ExitCode::FAILURE);
    };
    ctx.store
        .log_action(publication.id, HistoryAction::Read)
        .await?;

    let library = Library::new(ctx.config.library_dir()?, ctx.config.timeouts())?;
    match library.pdf_path(&ctx.store, publication.id).await? {
        Some(path) => {
            println!("{}", path.display());
            Ok(ExitCode::SUCCESS)
        }
        None => {
            eprintln!("error: no PDF stored for \"{reference}\"; try `bib pdf {reference}`");
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn run_delete(ctx: &Context, reference: &str) -> Result<ExitCode> {
    let Some(publication) = ctx.locate(reference, false).await? else {
        return Ok(ExitCode::FAILURE);
    };
    ctx.store.delete_all_for(publication.id).await?;
    if !ctx.quiet {
        println!(
            "deleted: {}",
            publication.title.as_deref().unwrap_or("(no title)")
        );
    }
    Ok(ExitCode::SUCCESS)
}

async fn run_search(ctx: &Context, words: &[String]) -> Result<ExitCode> {
    let this_year = i64::from(chrono::Local::now().year());
    let terms = parse_search(words, this_year)?;
    let learner = ctx.learner()?;

    let spinner = Spinner::start(ctx.quiet, "Searching ADS...");
    let hits = learner.search_ads(&terms).await;
    spinner.finish();
    let hits = hits?;

    let bibcode_width = hits.iter().map(|hit| hit.bibcode.len()).max().unwrap_or(0);
    let nfas_width = hits
        .iter()
        .map(|hit| hit.nfas.as_deref().map_or(0, str::len))
        .max()
        .unwrap_or(0);
    for hit in &hits {
        println!(
            "{:>bibcode_width$}  {:>nfas_width$}  {}",
            hit.bibcode,
            hit.nfas.as_deref().unwrap_or(""),
            hit.title
        );
    }
    Ok(ExitCode::SUCCESS)
}
