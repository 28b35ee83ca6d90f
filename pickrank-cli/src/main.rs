mod config;
mod output;
mod prompt;
mod store;

use clap::Parser;
use pickrank_core::constants::DEFAULT_NAMESPACE;
use pickrank_core::{RankError, RankingSession, RankingState, parse_top_k, top_k_bound};
use rand::seq::SliceRandom;
use std::io::{self, BufRead, IsTerminal, Write};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::config::PickrankConfig;
use crate::prompt::LoopEnd;
use crate::store::FileStore;

type Session = RankingSession<String, FileStore>;

pub fn bail(msg: impl std::fmt::Display) -> ! {
    eprintln!("Error: {msg}");
    std::process::exit(1);
}

fn or_bail<T>(result: pickrank_core::Result<T>) -> T {
    result.unwrap_or_else(|e| bail(e))
}

#[derive(Parser)]
#[command(name = "pickrank", version, about = "Rank a list by answering one pairwise question at a time")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file (default: ~/.config/pickrank/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding session state
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Session namespace (default: "ranking")
    #[arg(long, short = 'n', global = true)]
    namespace: Option<String>,

    /// Log engine activity to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Add items to the list (after a run has started they are inserted into the ranking)
    Add(AddArgs),
    /// List collected items in entry order
    List,
    /// Start a ranking run over the collected items
    Start(StartArgs),
    /// Answer pending comparisons interactively
    Compare,
    /// Answer the pending comparison by naming the item that ranks higher
    Choose {
        item: String,
    },
    /// Insert one new item into an existing ranking
    Insert {
        item: String,
    },
    /// Show the current ranking
    Show {
        /// Output JSON instead of table
        #[arg(long)]
        json: bool,
    },
    /// Remove all items, answers and results in this namespace
    Clear {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Create a default config file at ~/.config/pickrank/config.toml
    Init,
}

#[derive(Parser)]
struct AddArgs {
    /// Inline items
    items: Vec<String>,

    /// File with a JSON array of strings or one item per line
    #[arg(long)]
    file: Option<PathBuf>,
}

#[derive(Parser)]
struct StartArgs {
    /// Only rank the best K items; 0 ranks everything
    #[arg(long, allow_hyphen_values = true)]
    top_k: Option<String>,

    /// Rank everything, ignoring top_k from the config file
    #[arg(long, conflicts_with = "top_k")]
    all: bool,

    /// Shuffle items before starting
    #[arg(long)]
    shuffle: bool,
}

/// Parse a string as either a JSON array of strings or plain text (one item per line).
fn parse_items_from_str(content: &str) -> Vec<String> {
    let trimmed = content.trim();
    if trimmed.starts_with('[') {
        let items: Vec<String> = serde_json::from_str(trimmed)
            .unwrap_or_else(|e| bail(format!("Input looks like JSON but failed to parse: {e}")));
        items
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    } else {
        trimmed
            .lines()
            .map(|l| l.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

/// Load items from all sources: --file, inline args, or stdin.
fn load_items(args: &AddArgs) -> Vec<String> {
    let mut items = Vec::new();

    if let Some(ref path) = args.file {
        let content = std::fs::read_to_string(path)
            .unwrap_or_else(|e| bail(format!("Failed to read items file {}: {e}", path.display())));
        items = parse_items_from_str(&content);
    }

    items.extend(
        args.items
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
    );

    // From stdin (only if no file and no inline items)
    if items.is_empty() && args.file.is_none() && args.items.is_empty() {
        let stdin = io::stdin();
        if stdin.is_terminal() {
            bail("No items provided. Pass items as arguments, use --file <path>, or pipe them via stdin.");
        }
        let content = io::read_to_string(stdin)
            .unwrap_or_else(|e| bail(format!("Failed to read from stdin: {e}")));
        items = parse_items_from_str(&content);
    }

    if items.is_empty() {
        bail("No items provided");
    }
    items
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("PICKRANK_LOG")
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn open_session(cli: &Cli, cfg: &PickrankConfig) -> Session {
    let data_dir = cli
        .data_dir
        .clone()
        .or_else(|| cfg.data_dir.clone())
        .unwrap_or_else(config::default_data_dir);
    let namespace = cli
        .namespace
        .clone()
        .or_else(|| cfg.namespace.clone())
        .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());

    let store = FileStore::open(&data_dir)
        .unwrap_or_else(|e| bail(format!("Failed to open data directory {}: {e}", data_dir.display())));
    tracing::debug!(dir = %store.dir().display(), namespace = %namespace, "opening session");
    or_bail(RankingSession::open(store, &namespace))
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = cli.config.clone().unwrap_or_else(config::config_path);
    let cfg = config::load_config(&config_path);
    let session = || open_session(&cli, &cfg);

    match &cli.command {
        Commands::Add(args) => run_add(&mut session(), args),
        Commands::List => run_list(&session()),
        Commands::Start(args) => run_start(&mut session(), args, &cfg),
        Commands::Compare => run_compare(&mut session()),
        Commands::Choose { item } => run_choose(&mut session(), item),
        Commands::Insert { item } => run_insert(&mut session(), item),
        Commands::Show { json } => run_show(&session(), *json),
        Commands::Clear { yes } => run_clear(&mut session(), *yes),
        Commands::Init => {
            let path = config::create_default_config(&config_path);
            println!("Created config at {}", path.display());
            println!("Edit it to set your default data directory, namespace, etc.");
        }
    }
}

fn run_add(session: &mut Session, args: &AddArgs) {
    let items = load_items(args);
    let offered = items.len();
    let was_running = session.state() == RankingState::Comparing;
    let added = or_bail(session.add_items(items));

    println!("Added {added} of {offered} items ({} total)", session.items().len());
    if was_running && added > 0 {
        println!("They will be placed once the current run finishes.");
    }
    print_next_step(session);
}

fn run_list(session: &Session) {
    for item in session.items() {
        println!("{item}");
    }
}

fn run_start(session: &mut Session, args: &StartArgs, cfg: &PickrankConfig) {
    if session.state() == RankingState::Comparing {
        bail(RankError::RankingInProgress);
    }
    if session.items().is_empty() {
        bail("No items to rank. Add some with `pickrank add`.");
    }

    let k: Option<NonZeroUsize> = if args.all {
        None
    } else {
        match &args.top_k {
            Some(raw) => parse_top_k(raw),
            None => top_k_bound(cfg.top_k),
        }
    };

    if args.shuffle || cfg.shuffle.unwrap_or(false) {
        let mut items = session.items().to_vec();
        items.shuffle(&mut rand::rng());
        or_bail(session.remove_all_items());
        or_bail(session.add_items(items));
        tracing::debug!("shuffled items before starting");
    }

    or_bail(session.start_ranking(k.map(NonZeroUsize::get)));

    let estimate = session.estimate();
    match k {
        Some(k) => println!("Finding the top {k} of {} items", session.items().len()),
        None => println!("Ranking {} items", session.items().len()),
    }
    println!("Estimated comparisons: {}", output::format_estimate(estimate));
    print_next_step(session);
}

fn run_compare(session: &mut Session) {
    if session.current_pending_comparison().is_none() {
        print_next_step(session);
        return;
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let end = prompt::run_compare_loop(session, stdin.lock(), &mut stdout)
        .unwrap_or_else(|e| bail(e));

    match end {
        LoopEnd::Finished => {
            println!();
            output::print_table(&session.current_result());
        }
        LoopEnd::Suspended => {
            println!("Progress saved. Run `pickrank compare` to continue.");
        }
    }
}

fn run_choose(session: &mut Session, item: &str) {
    match session.choose(&item.to_string()) {
        Ok(()) => {}
        Err(RankError::StaleResolution(_)) => {
            eprintln!("Ignored: \"{item}\" is not part of the pending comparison");
        }
        Err(e) => bail(e),
    }
    print_next_step(session);
}

fn run_insert(session: &mut Session, item: &str) {
    let item = item.trim();
    if item.is_empty() {
        bail("Item must not be empty");
    }
    let was_running = session.state() == RankingState::Comparing;
    if !or_bail(session.insert_new_item(item.to_string())) {
        println!("\"{item}\" is already in the list");
        return;
    }
    if was_running {
        println!("Queued \"{item}\"; it will be placed once the current run finishes.");
    }
    print_next_step(session);
}

fn run_show(session: &Session, json: bool) {
    let result = session.current_result();
    if json {
        output::print_json(session.state(), &result);
        return;
    }
    if session.state() != RankingState::Sorted {
        println!("{}\n", output::render_status(&session.status()));
    }
    output::print_table(&result);
}

fn run_clear(session: &mut Session, yes: bool) {
    if !yes {
        print!(
            "Remove {} items and all answers in namespace \"{}\"? [y/N] ",
            session.items().len(),
            session.namespace(),
        );
        let _ = io::stdout().flush();
        let mut answer = String::new();
        io::stdin()
            .lock()
            .read_line(&mut answer)
            .unwrap_or_else(|e| bail(format!("Failed to read from stdin: {e}")));
        if !matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes") {
            println!("Nothing cleared");
            return;
        }
    }
    or_bail(session.remove_all_items());
    println!("Cleared");
}

/// Tell the user what to do next: answer a question, or read the result.
fn print_next_step(session: &Session) {
    if let Some(pair) = session.current_pending_comparison() {
        println!("\nNext comparison:\n  1) {}\n  2) {}", pair.first, pair.second);
        println!("Run `pickrank compare`, or `pickrank choose <item>`.");
        return;
    }
    match session.state() {
        RankingState::Sorted => {
            println!();
            output::print_table(&session.current_result());
        }
        RankingState::Idle | RankingState::Collecting => {
            println!("{}", output::render_status(&session.status()));
        }
        RankingState::Comparing => {}
    }
}
