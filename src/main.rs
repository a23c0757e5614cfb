//! git-acp - CLI entry point.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use git_acp::commit::AiMessageGenerator;
use git_acp::config::{AiConfig, Config, ContextPolicy, PromptType, Settings};
use git_acp::git::{Git, runner::check_git_installed};
use git_acp::pr::{PrOptions, run_pr};
use git_acp::workflow::{TerminalInteraction, UserInteraction, Workflow, run_auto_group};

/// Stage, describe, classify, commit and push git changes.
#[derive(Parser, Debug)]
#[command(name = "git-acp")]
#[command(about = "Add, commit and push git changes with conventional commit types")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Stage files, write a message, commit and push
    Commit(CommitArgs),
    /// Create a GitHub pull request from a branch
    Pr(PrArgs),
}

#[derive(Args, Debug)]
struct CommitArgs {
    /// Files to stage (defaults to an interactive selection)
    #[arg(short = 'a', long = "add", num_args = 1..)]
    add: Option<Vec<String>>,

    /// Commit message (skips generation and the manual prompt)
    #[arg(short = 'm', long)]
    message: Option<String>,

    /// Branch to push to (defaults to the current branch)
    #[arg(short = 'b', long)]
    branch: Option<String>,

    /// Commit type override (feat, fix, docs, style, refactor, test, chore, revert)
    #[arg(short = 't', long = "type")]
    commit_type: Option<String>,

    /// Generate the message with Ollama
    #[arg(short = 'o', long)]
    ollama: bool,

    /// Edit the generated message before committing
    #[arg(short = 'i', long)]
    interactive: bool,

    /// Prompt style: simple or advanced
    #[arg(short = 'p', long = "prompt-type")]
    prompt_type: Option<PromptType>,

    /// Prompt context: full (diff plus history) or diff
    #[arg(long = "context-type", default_value = "full")]
    context_type: ContextPolicy,

    /// Model to use instead of GIT_ACP_AI_MODEL
    #[arg(long)]
    model: Option<String>,

    /// Context window size for local Ollama endpoints
    #[arg(long = "num-ctx")]
    num_ctx: Option<u32>,

    /// Skip confirmation prompts
    #[arg(long = "no-confirm", visible_alias = "nc")]
    no_confirm: bool,

    /// Print debug output
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Show what would be committed without committing
    #[arg(long)]
    dry_run: bool,

    /// Commit related changes in separate batches
    #[arg(long)]
    auto_group: bool,

    /// Upper bound on the number of auto-group batches
    #[arg(long, requires = "auto_group")]
    max_groups: Option<usize>,
}

#[derive(Args, Debug)]
struct PrArgs {
    /// Source branch (defaults to the current branch)
    #[arg(short = 's', long)]
    source: Option<String>,

    /// Target branch (defaults to GIT_ACP_DEFAULT_BRANCH)
    #[arg(short = 't', long)]
    target: Option<String>,

    /// Write the description with Ollama
    #[arg(short = 'o', long)]
    ollama: bool,

    /// Open the pull request as a draft
    #[arg(short = 'd', long)]
    draft: bool,

    /// Print the description without creating the pull request
    #[arg(long)]
    dry_run: bool,

    /// Print debug output
    #[arg(short = 'v', long)]
    verbose: bool,
}

impl Cli {
    fn verbose(&self) -> bool {
        match self.command {
            Command::Commit(ref args) => args.verbose,
            Command::Pr(ref args) => args.verbose,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose());

    let settings = Settings::load();
    let workdir = std::env::current_dir().context("Could not read the current directory")?;

    let cancel = CancellationToken::new();
    let listener = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("Ctrl-C received, cancelling");
            listener.cancel();
        }
    });

    let ui = TerminalInteraction;
    if let Err(e) = check_git_installed() {
        ui.print_error(&e.message, e.suggestion.as_deref(), "Git Not Found");
        std::process::exit(1);
    }

    let code = match cli.command {
        Command::Commit(args) => run_commit(args, settings, workdir, &ui, cancel).await,
        Command::Pr(args) => run_pull_request(args, &settings, workdir, &ui, cancel).await,
    };

    std::process::exit(code);
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "warn,git_acp=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn run_commit(
    args: CommitArgs,
    settings: Settings,
    workdir: PathBuf,
    ui: &TerminalInteraction,
    cancel: CancellationToken,
) -> i32 {
    let config = Config {
        files_from_cli: args.add.is_some(),
        files: args.add,
        message: args.message,
        branch: args.branch,
        remote: settings.default_remote.clone(),
        category: args.commit_type,
        ai: AiConfig {
            enabled: args.ollama,
            prompt_type: args.prompt_type.unwrap_or(settings.prompt_type),
            context: args.context_type,
            model: args.model,
            num_ctx: args.num_ctx,
            interactive: args.interactive,
            verbose: args.verbose,
        },
        skip_confirmation: args.no_confirm,
        dry_run: args.dry_run,
        verbose: args.verbose,
    };
    debug!("Commit config: {:?}", config);

    let vcs = Git::new(workdir, config.remote.clone(), cancel.clone());
    let generator = match AiMessageGenerator::new(settings, cancel) {
        Ok(generator) => generator,
        Err(e) => {
            ui.print_error(&e.message, e.suggestion.as_deref(), "Configuration Error");
            return 1;
        }
    };

    let outcome = if args.auto_group {
        run_auto_group(&config, &vcs, ui, &generator, args.max_groups).await
    } else {
        Workflow::new(config, &vcs, ui, &generator).run().await
    };
    debug!("Workflow finished: {:?}", outcome);

    outcome.exit_code()
}

async fn run_pull_request(
    args: PrArgs,
    settings: &Settings,
    workdir: PathBuf,
    ui: &TerminalInteraction,
    cancel: CancellationToken,
) -> i32 {
    let options = PrOptions {
        source: args.source,
        target: args.target,
        use_ai: args.ollama,
        draft: args.draft,
        dry_run: args.dry_run,
    };

    match run_pr(options, settings, &workdir, cancel).await {
        Ok(()) => 0,
        Err(e) if e.is_cancelled() => {
            ui.print_message("Operation cancelled by user.");
            0
        }
        Err(e) => {
            let title = e.context.as_deref().unwrap_or("Pull Request Failed");
            ui.print_error(&e.message, e.suggestion.as_deref(), title);
            1
        }
    }
}
