use clap::{ArgAction, Parser, Subcommand};
use regret_patch::{
    Action, ApplyMode, ApplyResult, PatchConfig, PatchEngine, PatchEvent, SharedPatchEventEmitter,
    TracingEventEmitter, UnprefixedLinePolicy, extract_patch, looks_like_patch, patch_target,
};
use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::{Component, Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "regret-cli")]
#[command(about = "Apply assistant-authored patches to a directory of text files")]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(long, short, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Apply(ApplyArgs),
    Check(CheckArgs),
    Detect(DetectArgs),
}

#[derive(clap::Args, Debug)]
struct PatchInput {
    #[arg(long)]
    patch_file: Option<PathBuf>,
    #[arg(long)]
    patch_source: Option<String>,
}

#[derive(clap::Args, Debug)]
struct ConfigArgs {
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, action = ArgAction::SetTrue)]
    strict: bool,
    #[arg(long, action = ArgAction::SetTrue)]
    require_end_marker: bool,
    #[arg(long, action = ArgAction::SetTrue)]
    unprefixed_as_context: bool,
}

#[derive(clap::Args, Debug)]
struct ApplyArgs {
    #[command(flatten)]
    input: PatchInput,
    #[command(flatten)]
    config: ConfigArgs,
    #[arg(long, default_value = ".")]
    root: PathBuf,
    /// Pull the patch out of surrounding prose before parsing.
    #[arg(long, action = ArgAction::SetTrue)]
    extract: bool,
    #[arg(long, action = ArgAction::SetTrue)]
    dry_run: bool,
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,
    #[arg(long, action = ArgAction::SetTrue)]
    event_json: bool,
}

#[derive(clap::Args, Debug)]
struct CheckArgs {
    #[command(flatten)]
    input: PatchInput,
    #[command(flatten)]
    config: ConfigArgs,
    #[arg(long, action = ArgAction::SetTrue)]
    extract: bool,
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,
}

#[derive(clap::Args, Debug)]
struct DetectArgs {
    #[command(flatten)]
    input: PatchInput,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Apply(args) => apply_command(args),
        Commands::Check(args) => check_command(args),
        Commands::Detect(args) => detect_command(args),
    };

    match result {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::from(1)
        }
    }
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn apply_command(args: ApplyArgs) -> Result<ExitCode, String> {
    let text = load_patch_text(&args.input)?;
    let document = select_document(&text, args.extract)?;
    let config = build_config(&args.config)?;
    let engine = PatchEngine::with_emitter(config, event_emitter(args.event_json));

    tracing::debug!(
        strict = engine.config().is_strict(),
        dry_run = args.dry_run,
        "applying patch"
    );

    let actions = engine.parse(document).map_err(|error| error.to_string())?;
    let files = load_file_map(&args.root, &actions)?;
    let result = engine
        .apply_actions(&actions, &files)
        .map_err(|error| error.to_string())?;

    if !args.dry_run {
        commit_result(&args.root, &result)?;
    }

    if args.json {
        let json = serde_json::to_string_pretty(&result).map_err(|e| e.to_string())?;
        println!("{json}");
    } else {
        print_apply_summary(&result, args.dry_run);
    }
    Ok(ExitCode::SUCCESS)
}

fn check_command(args: CheckArgs) -> Result<ExitCode, String> {
    let text = load_patch_text(&args.input)?;
    let document = select_document(&text, args.extract)?;
    let config = build_config(&args.config)?;
    let engine = PatchEngine::new(config);
    let actions = engine.parse(document).map_err(|error| error.to_string())?;

    if args.json {
        let json = serde_json::to_string_pretty(&actions).map_err(|e| e.to_string())?;
        println!("{json}");
    } else {
        for action in &actions {
            println!("{}", describe_action(action));
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn detect_command(args: DetectArgs) -> Result<ExitCode, String> {
    let text = load_patch_text(&args.input)?;
    if !looks_like_patch(&text) {
        println!("no patch found");
        return Ok(ExitCode::from(2));
    }
    println!("patch: {}", patch_target(&text).unwrap_or("[patch]"));
    Ok(ExitCode::SUCCESS)
}

fn load_patch_text(input: &PatchInput) -> Result<String, String> {
    match (input.patch_file.as_deref(), input.patch_source.as_deref()) {
        (Some(_), Some(_)) => {
            Err("provide only one of --patch-file or --patch-source".to_string())
        }
        (Some(path), None) => std::fs::read_to_string(path)
            .map_err(|e| format!("failed reading patch file '{}': {e}", path.display())),
        (None, Some(source)) => Ok(source.to_string()),
        (None, None) => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|e| format!("failed reading patch from stdin: {e}"))?;
            Ok(buffer)
        }
    }
}

fn select_document(text: &str, extract: bool) -> Result<&str, String> {
    if !extract {
        return Ok(text);
    }
    extract_patch(text).ok_or_else(|| "no '*** Begin Patch' marker found in input".to_string())
}

fn build_config(args: &ConfigArgs) -> Result<PatchConfig, String> {
    let mut config = match args.config.as_deref() {
        Some(path) => {
            let source = std::fs::read_to_string(path)
                .map_err(|e| format!("failed reading config '{}': {e}", path.display()))?;
            PatchConfig::from_json(&source)
                .map_err(|e| format!("invalid config '{}': {e}", path.display()))?
        }
        None => PatchConfig::default(),
    };
    if args.strict {
        config.mode = ApplyMode::Strict;
    }
    if args.require_end_marker {
        config.require_end_marker = true;
    }
    if args.unprefixed_as_context {
        config.unprefixed_lines = UnprefixedLinePolicy::Context;
    }
    Ok(config)
}

fn event_emitter(event_json: bool) -> SharedPatchEventEmitter {
    if !event_json {
        return Arc::new(TracingEventEmitter);
    }
    Arc::new(|event: &PatchEvent| match serde_json::to_string(event) {
        Ok(line) => eprintln!("{line}"),
        Err(error) => tracing::warn!(%error, "failed to serialize patch event"),
    })
}

/// Reads every file the actions name that currently exists under `root`.
fn load_file_map(root: &Path, actions: &[Action]) -> Result<BTreeMap<String, String>, String> {
    let mut files = BTreeMap::new();
    for action in actions {
        let path = action.path();
        if files.contains_key(path) {
            continue;
        }
        let full_path = resolve_path(root, path)?;
        if !full_path.is_file() {
            continue;
        }
        let content = std::fs::read_to_string(&full_path)
            .map_err(|e| format!("failed reading '{}': {e}", full_path.display()))?;
        files.insert(path.to_string(), content);
    }
    Ok(files)
}

fn resolve_path(root: &Path, path: &str) -> Result<PathBuf, String> {
    let relative = Path::new(path);
    let escapes_root = relative.is_absolute()
        || relative
            .components()
            .any(|component| !matches!(component, Component::Normal(_) | Component::CurDir));
    if path.trim().is_empty() || escapes_root {
        return Err(format!("refusing to touch path outside root: '{path}'"));
    }
    Ok(root.join(relative))
}

/// Writes `result` under `root` so that either every change lands or none does.
///
/// Targets are checked up front, every new body is staged in a temp file next
/// to its destination, and the staged files are persisted only once all of
/// them have been written. Deletions run last.
fn commit_result(root: &Path, result: &ApplyResult) -> Result<(), String> {
    let mut writes = Vec::new();
    for (path, content) in result.updated.iter().chain(result.added.iter()) {
        let full_path = resolve_path(root, path)?;
        check_write_target(&full_path)?;
        writes.push((full_path, content));
    }
    let mut deletions = Vec::new();
    for path in &result.deleted {
        let full_path = resolve_path(root, path)?;
        if !full_path.is_file() {
            return Err(format!(
                "refusing to delete non-file path '{}'",
                full_path.display()
            ));
        }
        deletions.push(full_path);
    }

    let mut staged = Vec::with_capacity(writes.len());
    for (full_path, content) in writes {
        staged.push((stage_write(&full_path, content)?, full_path));
    }
    for (temp, full_path) in staged {
        temp.persist(&full_path)
            .map_err(|e| format!("failed writing '{}': {}", full_path.display(), e.error))?;
        tracing::info!(path = %full_path.display(), "wrote file");
    }
    for full_path in deletions {
        std::fs::remove_file(&full_path)
            .map_err(|e| format!("failed deleting '{}': {e}", full_path.display()))?;
        tracing::info!(path = %full_path.display(), "deleted file");
    }
    Ok(())
}

/// Rejects a destination that exists as something other than a regular file,
/// or whose nearest existing ancestor is not a directory.
fn check_write_target(full_path: &Path) -> Result<(), String> {
    if full_path.exists() && !full_path.is_file() {
        return Err(format!(
            "refusing to overwrite non-file path '{}'",
            full_path.display()
        ));
    }
    let mut ancestor = full_path.parent();
    while let Some(dir) = ancestor {
        if dir.as_os_str().is_empty() {
            break;
        }
        if dir.exists() {
            if !dir.is_dir() {
                return Err(format!(
                    "cannot write '{}': '{}' is not a directory",
                    full_path.display(),
                    dir.display()
                ));
            }
            break;
        }
        ancestor = dir.parent();
    }
    Ok(())
}

fn stage_write(full_path: &Path, content: &str) -> Result<NamedTempFile, String> {
    let parent = match full_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)
        .map_err(|e| format!("failed creating '{}': {e}", parent.display()))?;
    let mut temp = NamedTempFile::new_in(parent)
        .map_err(|e| format!("failed staging '{}': {e}", full_path.display()))?;
    temp.write_all(content.as_bytes())
        .map_err(|e| format!("failed staging '{}': {e}", full_path.display()))?;
    Ok(temp)
}

fn describe_action(action: &Action) -> String {
    match action {
        Action::UpdateFile { path, hunks } => {
            format!("{} {} ({} hunk(s))", action.kind_label(), path, hunks.len())
        }
        Action::AddFile { path, content } => format!(
            "{} {} ({} line(s))",
            action.kind_label(),
            path,
            content.split('\n').count()
        ),
        Action::DeleteFile { path } => format!("{} {}", action.kind_label(), path),
    }
}

fn print_apply_summary(result: &ApplyResult, dry_run: bool) {
    if dry_run {
        println!("Dry run, no files written:");
    } else {
        println!("Applied patch:");
    }
    for line in result.summary_lines() {
        println!("{line}");
    }
}
