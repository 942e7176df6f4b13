use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use cmdtree_core::{
    CommandId, CommandSpec, CommandTree, Completions, FlagOrigin, Outcome, RunContext,
    validate_spec,
};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Output format for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    Json,
    Yaml,
    Text,
}

#[derive(Debug, Parser)]
#[command(name = "cmdtree")]
#[command(version, about = "Inspect and exercise command tree definitions")]
struct Cli {
    /// Log resolution and lifecycle details to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Resolve an argument vector to the command it targets.
    Resolve(ResolveArgs),
    /// List the full flag set of a command.
    Flags(FlagsArgs),
    /// Suggest commands for a mistyped name.
    Suggest(SuggestArgs),
    /// Print shell completion candidates.
    Complete(CompleteArgs),
    /// Lint a definition file.
    Validate(ValidateArgs),
    /// Execute an argument vector with echoing run hooks.
    Run(RunArgs),
}

#[derive(Debug, Args)]
struct TreeArgs {
    /// Tree definition file (.json, .yaml or .yml).
    #[arg(long)]
    tree: PathBuf,
    /// Output format.
    #[arg(long, default_value = "text")]
    format: OutputFormat,
}

#[derive(Debug, Args)]
struct ResolveArgs {
    #[command(flatten)]
    tree: TreeArgs,
    /// Arguments as the user would type them after the program name.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

#[derive(Debug, Args)]
struct FlagsArgs {
    #[command(flatten)]
    tree: TreeArgs,
    /// Subcommand path below the root, e.g. `remote add`.
    path: Vec<String>,
    /// Include hidden flags.
    #[arg(long)]
    all: bool,
}

#[derive(Debug, Args)]
struct SuggestArgs {
    #[command(flatten)]
    tree: TreeArgs,
    /// The mistyped name.
    token: String,
    /// Subcommand path whose children are searched (default: the root).
    #[arg(long)]
    under: Option<String>,
    /// Override the distance threshold.
    #[arg(long)]
    min_distance: Option<usize>,
}

#[derive(Debug, Args)]
struct CompleteArgs {
    #[command(flatten)]
    tree: TreeArgs,
    /// Strip candidate descriptions.
    #[arg(long)]
    no_descriptions: bool,
    /// Typed words; the last one is the word being completed.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    words: Vec<String>,
}

#[derive(Debug, Args)]
struct ValidateArgs {
    #[command(flatten)]
    tree: TreeArgs,
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Tree definition file (.json, .yaml or .yml).
    #[arg(long)]
    tree: PathBuf,
    /// Arguments as the user would type them after the program name.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Command::Resolve(args) => run_resolve(args),
        Command::Flags(args) => run_flags(args),
        Command::Suggest(args) => run_suggest(args),
        Command::Complete(args) => run_complete(args),
        Command::Validate(args) => run_validate(args),
        Command::Run(args) => run_run(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

fn load_spec(path: &Path) -> Result<CommandSpec, String> {
    CommandSpec::load(path).map_err(|err| format!("Failed to load '{}': {err}", path.display()))
}

fn load_tree(path: &Path) -> Result<(CommandTree, CommandId), String> {
    let spec = load_spec(path)?;
    let (tree, root) = CommandTree::from_spec(&spec).map_err(|err| err.to_string())?;
    debug!(commands = tree.len(), "built command tree");
    Ok((tree, root))
}

/// Follows `path` (names or aliases) down from `root`.
fn locate(tree: &mut CommandTree, root: CommandId, path: &[String]) -> Result<CommandId, String> {
    let mut current = root;
    for word in path {
        current = tree
            .find_next(current, word)
            .ok_or_else(|| format!("no command {word:?} under {:?}", tree.path(current)))?;
    }
    Ok(current)
}

fn emit<T: Serialize>(
    value: &T,
    format: OutputFormat,
    text: impl FnOnce() -> String,
) -> Result<(), String> {
    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(value)
            .map_err(|e| format!("Failed to serialize output: {e}"))?,
        OutputFormat::Yaml => {
            serde_yaml::to_string(value).map_err(|e| format!("Failed to serialize output: {e}"))?
        }
        OutputFormat::Text => text(),
    };
    print!("{rendered}");
    if !rendered.ends_with('\n') {
        println!();
    }
    Ok(())
}

fn shorthand_column(shorthand: Option<char>) -> String {
    shorthand
        .map(|c| format!("-{c}, "))
        .unwrap_or_else(|| "    ".to_string())
}

// ---------------------------------------------------------------------------
// resolve
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ResolveReport {
    command: String,
    called_as: Option<String>,
    args: Vec<String>,
    positionals: Vec<String>,
}

fn run_resolve(args: ResolveArgs) -> Result<(), String> {
    let (mut tree, root) = load_tree(&args.tree.tree)?;
    let found = tree.find(root, &args.args).map_err(|err| err.to_string())?;
    let report = ResolveReport {
        command: tree.path(found.command),
        called_as: tree.node(found.command).called_as().map(str::to_string),
        args: found.args,
        positionals: found.positionals,
    };
    emit(&report, args.tree.format, || {
        let mut out = format!("command: {}\n", report.command);
        if let Some(called_as) = &report.called_as {
            out.push_str(&format!("called as: {called_as}\n"));
        }
        out.push_str(&format!("args: {}\n", report.args.join(" ")));
        out.push_str(&format!("positionals: {}\n", report.positionals.join(" ")));
        out
    })
}

// ---------------------------------------------------------------------------
// flags
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct FlagRow {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    shorthand: Option<char>,
    kind: String,
    default: String,
    usage: String,
    origin: String,
    required: bool,
    hidden: bool,
}

fn origin_label(tree: &CommandTree, origin: Option<FlagOrigin>) -> String {
    match origin {
        Some(FlagOrigin::Local) => "local".to_string(),
        Some(FlagOrigin::Global) => "global".to_string(),
        Some(FlagOrigin::Inherited(ancestor)) => format!("inherited from {}", tree.path(ancestor)),
        Some(FlagOrigin::Default) | None => "default".to_string(),
    }
}

fn run_flags(args: FlagsArgs) -> Result<(), String> {
    let (mut tree, root) = load_tree(&args.tree.tree)?;
    let id = locate(&mut tree, root, &args.path)?;
    tree.init_default_help_flag(id);
    tree.init_default_version_flag(id);

    let rows: Vec<FlagRow> = tree
        .cached_flags(id)
        .iter()
        .filter(|flag| args.all || !flag.hidden)
        .map(|flag| FlagRow {
            name: flag.name.clone(),
            shorthand: flag.shorthand,
            kind: flag.kind().to_string(),
            default: flag.default_value().to_string(),
            usage: flag.usage.clone(),
            origin: origin_label(&tree, tree.flag_origin(id, &flag.name)),
            required: flag.is_required(),
            hidden: flag.hidden,
        })
        .collect();

    emit(&rows, args.tree.format, || {
        let width = rows.iter().map(|r| r.name.len()).max().unwrap_or(0);
        let mut out = String::new();
        for row in &rows {
            let short = shorthand_column(row.shorthand);
            let required = if row.required { " (required)" } else { "" };
            out.push_str(&format!(
                "{short}--{:<width$}  {:<11}  [{}]{required}  {}\n",
                row.name, row.kind, row.origin, row.usage
            ));
        }
        out
    })
}

// ---------------------------------------------------------------------------
// suggest
// ---------------------------------------------------------------------------

fn run_suggest(args: SuggestArgs) -> Result<(), String> {
    let (mut tree, root) = load_tree(&args.tree.tree)?;
    let path: Vec<String> = args
        .under
        .as_deref()
        .unwrap_or_default()
        .split_whitespace()
        .map(str::to_string)
        .collect();
    let id = locate(&mut tree, root, &path)?;
    if let Some(distance) = args.min_distance {
        tree.node_mut(id).suggestions_min_distance = Some(distance);
    }

    let suggestions = tree
        .suggestions_for(id, &args.token)
        .map_err(|err| err.to_string())?;
    emit(&suggestions, args.tree.format, || {
        if suggestions.is_empty() {
            format!("no suggestions for {:?}\n", args.token)
        } else {
            suggestions.iter().map(|s| format!("{s}\n")).collect()
        }
    })
}

// ---------------------------------------------------------------------------
// complete
// ---------------------------------------------------------------------------

fn run_complete(args: CompleteArgs) -> Result<(), String> {
    let (mut tree, root) = load_tree(&args.tree.tree)?;
    let (to_complete, typed) = match args.words.split_last() {
        Some((last, typed)) => (last.as_str(), typed),
        None => ("", &args.words[..]),
    };

    let mut answer: Completions = tree.complete(root, typed, to_complete);
    if args.no_descriptions {
        answer = answer.without_descriptions();
    }
    emit(&answer, args.tree.format, || answer.to_shell_output())
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

fn count_commands(spec: &CommandSpec) -> usize {
    1 + spec.commands.iter().map(count_commands).sum::<usize>()
}

fn run_validate(args: ValidateArgs) -> Result<(), String> {
    let spec = load_spec(&args.tree.tree)?;
    let issues = validate_spec(&spec);

    emit(&issues, args.tree.format, || {
        if issues.is_empty() {
            format!(
                "Validated {} command(s) in '{}'.\n",
                count_commands(&spec),
                args.tree.tree.display()
            )
        } else {
            issues.iter().map(|issue| format!("- {issue}\n")).collect()
        }
    })?;

    if issues.is_empty() {
        Ok(())
    } else {
        Err(format!("{} issue(s) found", issues.len()))
    }
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

/// Run hook printing what the command received.
fn echo(ctx: &RunContext<'_>, args: &[String]) -> cmdtree_core::HookResult {
    let changed: Vec<String> = ctx
        .flags()
        .iter()
        .filter(|flag| flag.changed)
        .map(|flag| format!("{}={}", flag.name, flag.value()))
        .collect();
    let streams = ctx.streams();
    streams.println(format!("command: {}", ctx.path()))?;
    streams.println(format!("args: {}", args.join(" ")))?;
    streams.println(format!("flags: {}", changed.join(" ")))?;
    Ok(())
}

fn render_help(tree: &mut CommandTree, id: CommandId) -> String {
    let mut out = String::new();
    let node = tree.node(id);
    let description = if node.long_text().is_empty() {
        node.short_text()
    } else {
        node.long_text()
    };
    if !description.is_empty() {
        out.push_str(description);
        out.push_str("\n\n");
    }

    out.push_str("Usage:\n");
    if node.is_runnable() {
        out.push_str(&format!("  {}\n", tree.use_line(id)));
    }
    let has_subcommands = tree.node(id).has_subcommands();
    if has_subcommands {
        out.push_str(&format!("  {} [command]\n", tree.path(id)));
    }
    if tree.node(id).has_example() {
        out.push_str(&format!("\nExamples:\n{}\n", tree.node(id).example_text()));
    }

    if has_subcommands {
        let width = tree.node(id).max_lengths().name;
        let children = tree.children(id).to_vec();
        out.push_str("\nAvailable Commands:\n");
        for child in children {
            let child = tree.node(child);
            if child.is_available() {
                out.push_str(&format!("  {:<width$}  {}\n", child.name(), child.short_text()));
            }
        }
    }

    let flags: Vec<String> = tree
        .cached_flags(id)
        .iter()
        .filter(|flag| !flag.hidden)
        .map(|flag| {
            let short = shorthand_column(flag.shorthand);
            format!("  {short}--{}  {}", flag.name, flag.usage)
        })
        .collect();
    if !flags.is_empty() {
        out.push_str("\nFlags:\n");
        out.push_str(&flags.join("\n"));
        out.push('\n');
    }
    out
}

fn run_run(args: RunArgs) -> Result<(), String> {
    let (mut tree, root) = load_tree(&args.tree)?;
    let leaves: Vec<CommandId> = tree
        .ids()
        .filter(|id| !tree.node(*id).has_subcommands())
        .collect();
    for id in leaves {
        tree.node_mut(id).hooks_mut().set_run(echo);
    }
    tree.node_mut(root).silence_errors = true;
    tree.node_mut(root).silence_usage = true;

    tree.set_args(args.args);
    let execution = tree.execute_c(root);
    debug!(command = %tree.path(execution.command), "execution finished");
    match execution.result.map_err(|err| err.to_string())? {
        Outcome::HelpRequested => print!("{}", render_help(&mut tree, execution.command)),
        Outcome::Completed | Outcome::VersionShown | Outcome::FlagErrorSuppressed => {}
    }
    Ok(())
}
