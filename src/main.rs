//! releng-plan CLI
//!
//! Entry point for the `releng-plan` command-line tool. Loads one or more
//! configuration layers, builds the runtime context from flags, and prints
//! the resolved plan, one action's environment, or a configuration report.

use clap::{Args, Parser, Subcommand};
use releng_plan::action::ActionInsert;
use releng_plan::{
    missing_placeholders, resolve_exes, resolve_repos, Action, ActionOverrides, BuildConfig,
    ConfigLoader, Context, LoadedConfig, Placement, Resolver, RuntimeContext,
};
use std::fmt::Display;
use std::fs;
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "releng-plan")]
#[command(about = "Resolve build-action pipelines from release-engineering configs", version)]
struct Cli {
    #[command(flatten)]
    inputs: Inputs,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Inputs {
    /// Configuration layer (.toml or .json); repeat to overlay, later wins
    #[arg(long = "config", short = 'c', global = true)]
    configs: Vec<PathBuf>,

    /// Extra context value as NAME=VALUE
    #[arg(long = "set", global = true, value_parser = parse_key_val)]
    values: Vec<(String, String)>,

    /// Working directory (default: current directory)
    #[arg(long, global = true)]
    work_dir: Option<PathBuf>,

    /// Object directory, relative to the work dir unless absolute
    #[arg(long, global = true)]
    obj_dir: Option<PathBuf>,

    /// Tools directory, relative to the work dir unless absolute
    #[arg(long, global = true)]
    tools_dir: Option<PathBuf>,

    /// Branch name (default: the config's `branch`)
    #[arg(long, global = true)]
    branch: Option<String>,

    /// Revision identifier
    #[arg(long, global = true)]
    revision: Option<String>,

    /// Overrides file (.toml) with `only`, `skip` and `add` entries
    #[arg(long, global = true)]
    overrides: Option<PathBuf>,

    /// Skip an action
    #[arg(long, global = true)]
    skip: Vec<Action>,

    /// Add an action: NAME, NAME:before=ANCHOR or NAME:after=ANCHOR
    #[arg(long, global = true, value_parser = parse_insert)]
    add: Vec<ActionInsert>,

    /// Run only these actions
    #[arg(long, global = true)]
    only: Vec<Action>,

    /// Reject actions missing from the config's `all_actions`
    #[arg(long, global = true)]
    strict: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the resolved action plan
    Plan {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Print the environment for one scheduled action as KEY=VALUE lines
    Env {
        /// Action name
        action: Action,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Print resolved repository descriptors
    Repos {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Print resolved executables
    Exes {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Report configuration sources and unresolvable placeholders
    Check {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    // RUST_LOG, when set, replaces the -v default entirely
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::default().add_directive(default_level.into())
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let loaded = load_config(&cli.inputs);
    let context = build_context(&cli.inputs, &loaded.config);

    match cli.command {
        Commands::Plan { json } => run_plan(&cli.inputs, &loaded, &context, json),
        Commands::Env { action, json } => run_env(&cli.inputs, &loaded, &context, &action, json),
        Commands::Repos { json } => run_repos(&loaded.config, &context, json),
        Commands::Exes { json } => run_exes(&loaded.config, &context, json),
        Commands::Check { json } => run_check(&loaded, &context, json),
    }
}

fn fail(message: impl Display) -> ! {
    eprintln!("Error: {}", message);
    process::exit(1);
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => fail(format!("serializing output: {}", e)),
    }
}

fn load_config(inputs: &Inputs) -> LoadedConfig {
    if inputs.configs.is_empty() {
        fail("at least one --config file is required");
    }

    match ConfigLoader::new().files(inputs.configs.iter().cloned()).load() {
        Ok(loaded) => loaded,
        Err(e) => fail(e),
    }
}

fn build_context(inputs: &Inputs, config: &BuildConfig) -> Context {
    let work_dir = match inputs.work_dir.clone() {
        Some(dir) => dir,
        None => match std::env::current_dir() {
            Ok(dir) => dir,
            Err(e) => fail(format!("cannot determine working directory: {}", e)),
        },
    };

    let mut runtime = RuntimeContext::new().work_dir(work_dir);
    if let Some(ref obj) = inputs.obj_dir {
        runtime = runtime.obj_dir(obj);
    }
    if let Some(ref tools) = inputs.tools_dir {
        runtime = runtime.tools_dir(tools);
    }
    if let Some(branch) = inputs.branch.as_ref().or(config.branch.as_ref()) {
        runtime = runtime.branch(branch);
    }
    if let Some(ref revision) = inputs.revision {
        runtime = runtime.revision(revision);
    }
    for (name, value) in &inputs.values {
        runtime = runtime.set(name, value);
    }

    runtime.to_context()
}

fn build_overrides(inputs: &Inputs) -> ActionOverrides {
    let mut overrides = match inputs.overrides {
        Some(ref path) => {
            let contents = match fs::read_to_string(path) {
                Ok(c) => c,
                Err(e) => fail(format!("{}: {}", path.display(), e)),
            };
            match toml::from_str::<ActionOverrides>(&contents) {
                Ok(o) => o,
                Err(e) => fail(format!("{}: {}", path.display(), e)),
            }
        }
        None => ActionOverrides::new(),
    };

    for action in &inputs.only {
        overrides = overrides.only(action.clone());
    }
    for insert in &inputs.add {
        overrides = overrides.add_at(insert.action.clone(), insert.placement.clone());
    }
    for action in &inputs.skip {
        overrides = overrides.skip(action.clone());
    }
    overrides
}

fn resolver(inputs: &Inputs, config: &BuildConfig) -> Resolver {
    if !inputs.strict {
        return Resolver::new();
    }
    match config.registry() {
        Some(registry) => Resolver::new().with_registry(registry),
        None => fail("--strict requires `all_actions` in the configuration"),
    }
}

fn run_plan(inputs: &Inputs, loaded: &LoadedConfig, context: &Context, json: bool) {
    let overrides = build_overrides(inputs);
    let resolver = resolver(inputs, &loaded.config);
    let plan = match resolver.resolve(&loaded.config, context, Some(&overrides)) {
        Ok(p) => p,
        Err(e) => fail(e),
    };
    let digest = match plan.digest() {
        Ok(d) => d,
        Err(e) => fail(e),
    };

    if json {
        print_json(&serde_json::json!({
            "digest": digest,
            "sources": loaded.sources,
            "steps": plan.steps,
        }));
        return;
    }

    for (i, step) in plan.steps.iter().enumerate() {
        let sections: Vec<String> = step.sections.iter().map(|s| s.to_string()).collect();
        println!(
            "{:>2}. {} [{}] ({} vars)",
            i + 1,
            step.action,
            sections.join(", "),
            step.env.len()
        );
    }
    println!();
    println!("Digest: {}", digest);
}

fn run_env(
    inputs: &Inputs,
    loaded: &LoadedConfig,
    context: &Context,
    action: &Action,
    json: bool,
) {
    let overrides = build_overrides(inputs);
    let resolver = resolver(inputs, &loaded.config);
    let plan = match resolver.resolve(&loaded.config, context, Some(&overrides)) {
        Ok(p) => p,
        Err(e) => fail(e),
    };

    let step = match plan.step(action) {
        Some(s) => s,
        None => fail(format!("action '{}' is not scheduled", action)),
    };

    if json {
        print_json(&step.env);
    } else {
        for (key, value) in &step.env {
            println!("{}={}", key, value);
        }
    }
}

fn run_repos(config: &BuildConfig, context: &Context, json: bool) {
    let repos = match resolve_repos(config, context) {
        Ok(r) => r,
        Err(e) => fail(e),
    };

    if json {
        print_json(&repos);
        return;
    }

    for repo in &repos {
        println!("{} {} @ {} -> {}", repo.vcs, repo.repo, repo.branch, repo.dest);
        if let Some(ref upstream) = repo.clone_upstream_url {
            println!("    upstream: {}", upstream);
        }
    }
}

fn run_exes(config: &BuildConfig, context: &Context, json: bool) {
    let exes = match resolve_exes(config, context) {
        Ok(e) => e,
        Err(e) => fail(e),
    };

    if json {
        print_json(&exes);
        return;
    }

    for (name, argv) in &exes {
        println!("{}: {}", name, argv.join(" "));
    }
}

fn run_check(loaded: &LoadedConfig, context: &Context, json: bool) {
    let missing = match missing_placeholders(&loaded.config, context) {
        Ok(m) => m,
        Err(e) => fail(e),
    };
    let has_actions = loaded.config.default_actions.is_some();

    if json {
        print_json(&serde_json::json!({
            "sources": loaded.sources,
            "has_default_actions": has_actions,
            "missing": missing,
        }));
    } else {
        println!("Sources:");
        for source in &loaded.sources {
            println!(
                "  {} {}",
                source.path.as_deref().unwrap_or("<inline>"),
                source.digest.as_deref().unwrap_or("")
            );
        }
        if let Some(ref actions) = loaded.config.default_actions {
            let names: Vec<&str> = actions.iter().map(Action::as_str).collect();
            println!("Default actions: {}", names.join(", "));
        } else {
            println!("Default actions: <missing>");
        }
        if missing.is_empty() {
            println!("All placeholders resolvable");
        } else {
            println!("Unresolvable placeholders:");
            for m in &missing {
                println!("  {}: %({})s", m.key, m.token);
            }
        }
    }

    if !has_actions || !missing.is_empty() {
        process::exit(1);
    }
}

/// Parse NAME=VALUE
fn parse_key_val(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(format!("expected NAME=VALUE, got '{}'", s)),
    }
}

/// Parse NAME, NAME:before=ANCHOR or NAME:after=ANCHOR
fn parse_insert(s: &str) -> Result<ActionInsert, String> {
    let (name, placement) = match s.split_once(':') {
        None => (s, Placement::Append),
        Some((name, spec)) => {
            let placement = match spec.split_once('=') {
                Some(("before", anchor)) => {
                    Placement::Before(anchor.parse().map_err(|e| format!("{}", e))?)
                }
                Some(("after", anchor)) => {
                    Placement::After(anchor.parse().map_err(|e| format!("{}", e))?)
                }
                _ => return Err(format!("expected before=ANCHOR or after=ANCHOR, got '{}'", spec)),
            };
            (name, placement)
        }
    };

    Ok(ActionInsert {
        action: name.parse().map_err(|e| format!("{}", e))?,
        placement,
    })
}
