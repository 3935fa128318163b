use clap::{Args, Parser, Subcommand};

use stackbuild::config::{Config, ENV_NAMESPACE, ENV_REGISTRY, ENV_TAG};
use stackbuild::constants::{DEFAULT_FINAL_IMAGE, DEFAULT_TAG};
use stackbuild::logging;
use stackbuild::ops;
use stackbuild::pipeline::{self, BuildOptions};

/// Build and administrate layered container image stacks.
#[derive(Parser)]
#[command(name = "stackbuild", version, about)]
struct Cli {
    /// print debugging information
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the image stack from the configured sources
    Build(BuildArgs),
    /// Display managed images
    List(ListArgs),
    /// Remove managed images
    Rm(RmArgs),
    /// Push managed images
    Push(PushArgs),
    /// Pull one image
    Pull(PullArgs),
}

#[derive(Args)]
struct BuildArgs {
    /// repository URL or path; a URL may carry a revision as '<url> <rev>'
    #[arg(short = 's', long = "source", value_name = "path/url")]
    sources: Vec<String>,

    /// name for the final combined image, '-' to disable
    #[arg(long, value_name = "str", default_value = DEFAULT_FINAL_IMAGE)]
    name: String,

    /// request a component even when no source provides it
    #[arg(short = 'g', long = "get-core", value_name = "name")]
    get: Vec<String>,

    /// build one standalone image per core
    #[arg(long)]
    core_images: bool,

    /// image registry, default is the engine's default registry
    #[arg(short, long, value_name = "str", env = ENV_REGISTRY)]
    registry: Option<String>,

    /// image namespace
    #[arg(short, long, value_name = "str", env = ENV_NAMESPACE)]
    namespace: Option<String>,

    /// image tag
    #[arg(short, long, value_name = "str", env = ENV_TAG, default_value = DEFAULT_TAG)]
    tag: String,

    /// keep a log of every build, not only of failures
    #[arg(long)]
    log: bool,

    /// target architecture(s) for the build
    #[arg(long, value_name = "arch")]
    arch: Option<String>,

    /// build optional images too
    #[arg(short, long)]
    all: bool,

    /// limit of cores available to a single image build, default auto
    #[arg(short, long, value_name = "n")]
    jobs: Option<u32>,

    /// skip images whose name matches a wildcard pattern
    #[arg(long, value_name = "pattern", num_args = 1..)]
    ignore: Vec<String>,

    /// enable optional images whose name matches a wildcard pattern
    #[arg(long, value_name = "pattern", num_args = 1..)]
    enable: Vec<String>,

    /// resolve and order everything without creating any images
    #[arg(long)]
    dry_run: bool,

    /// multi-architecture build via buildx; results are pushed, not kept locally
    #[arg(long)]
    buildx: bool,
}

#[derive(Args)]
struct ListArgs {
    /// filter images by wildcard pattern
    #[arg(short, long = "pattern", value_name = "str")]
    pattern: Vec<String>,

    /// display images without tags
    #[arg(short, long)]
    untagged: bool,
}

#[derive(Args)]
struct RmArgs {
    /// filter images by wildcard pattern
    #[arg(short, long = "pattern", value_name = "str")]
    pattern: Vec<String>,

    /// remove images without tags
    #[arg(short, long)]
    untagged: bool,

    /// force removal of the image
    #[arg(short, long)]
    force: bool,

    /// skip the confirmation prompt
    #[arg(short, long)]
    yes: bool,
}

#[derive(Args)]
struct PushArgs {
    /// filter images by wildcard pattern
    #[arg(short, long = "pattern", value_name = "str")]
    pattern: Vec<String>,

    /// skip the confirmation prompt
    #[arg(short, long)]
    yes: bool,
}

#[derive(Args)]
struct PullArgs {
    /// image name
    image: String,

    /// use the local repository to get the image
    #[arg(short, long)]
    local: bool,

    /// pull an image of a different architecture
    #[arg(long, value_name = "arch")]
    arch: Option<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let debug = cli.debug;

    if let Err(error) = logging::init_logging(debug) {
        eprintln!("Error: cannot set up logging: {error}");
        std::process::exit(1);
    }

    if let Err(error) = run(cli).await {
        if debug {
            eprintln!("Error: {error:?}");
        } else {
            eprintln!("Error: {error:#}");
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Build(args) => {
            let config = Config::resolve(args.registry, args.namespace, Some(args.tag));
            let options = BuildOptions {
                sources: args.sources,
                final_name: args.name,
                get: args.get,
                core_images: args.core_images,
                keep_logs: args.log,
                arch: args.arch,
                build_optional: args.all,
                jobs: args.jobs,
                ignore: args.ignore,
                enable: args.enable,
                dry_run: args.dry_run,
                buildx: args.buildx,
            };
            pipeline::run_build(&options, &config).await
        }
        Commands::List(args) => ops::list(&args.pattern, args.untagged).await,
        Commands::Rm(args) => ops::remove(&args.pattern, args.untagged, args.force, args.yes).await,
        Commands::Push(args) => ops::push(&args.pattern, args.yes).await,
        Commands::Pull(args) => ops::pull(&args.image, args.local, args.arch.as_deref()).await,
    }
}
