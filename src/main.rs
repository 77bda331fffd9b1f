use clap::{Parser, Subcommand};
use iiif_derive::geometry::Size;
use iiif_derive::request::RequestSegments;
use iiif_derive::service::IiifService;
use iiif_derive::{batch, config, output, pipeline};
use std::path::{Path, PathBuf};

/// Shared flag for commands that honor an access tier.
#[derive(clap::Args, Clone)]
struct TierArgs {
    /// Access tier (from [tiers] in the config) capping full/max requests
    #[arg(long)]
    tier: Option<String>,
}

#[derive(Parser)]
#[command(name = "iiif-derive")]
#[command(about = "Derive images from master files via IIIF Image API requests")]
#[command(long_about = "\
Derive images from master files via IIIF Image API requests

A request is the IIIF Image API 2.1 path after the identifier:

  {region}/{size}/{rotation}/{quality}.{format}

  region    full | square | x,y,w,h | pct:x,y,w,h
  size      full | max | w, | ,h | pct:n | w,h | !w,h
  rotation  [!]degrees        (! mirrors first)
  quality   default | color | gray | bitonal
  format    jpg | png | webp | tif

Examples:

  iiif-derive render page1 full/max/0/default.jpg
  iiif-derive render page1 pct:10,10,50,50/!800,800/90/gray.png --tier public
  iiif-derive plan page1 square/200,/0/default.webp --width 4000 --height 3000

Run 'iiif-derive gen-config' to generate a documented iiif.toml.")]
#[command(version)]
struct Cli {
    /// Config file (missing file = stock defaults)
    #[arg(long, default_value = config::DEFAULT_CONFIG_FILE, global = true)]
    config: PathBuf,

    /// Master file directory (overrides [source] root)
    #[arg(long, global = true)]
    source: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render one derivative to a file
    Render {
        identifier: String,
        request: String,
        #[command(flatten)]
        tier: TierArgs,
        /// Output file (default: <identifier>.<format> in the current directory)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Compile a request and print its stages and operations as JSON
    Plan {
        identifier: String,
        request: String,
        #[command(flatten)]
        tier: TierArgs,
        /// Source width; with --height, skips identifying the source
        #[arg(long, requires = "height")]
        width: Option<u32>,
        /// Source height; with --width, skips identifying the source
        #[arg(long, requires = "width")]
        height: Option<u32>,
        /// Print a readable stage list instead of JSON
        #[arg(long)]
        text: bool,
    },
    /// Print the IIIF info.json for an identifier
    Info {
        identifier: String,
        #[command(flatten)]
        tier: TierArgs,
        /// Base URI the identifier is served under
        #[arg(long, default_value = "http://localhost:8182/iiif/2")]
        base_uri: String,
    },
    /// Render every `identifier request` line of a list file
    Batch {
        list: PathBuf,
        #[command(flatten)]
        tier: TierArgs,
        /// Directory receiving the rendered files
        #[arg(long)]
        output_dir: PathBuf,
    },
    /// Print a stock iiif.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Command::Render {
            identifier,
            request,
            tier: TierArgs { tier },
            output: output_path,
        } => {
            let (_, service) = load_service(&cli.config, cli.source)?;
            let segments = RequestSegments::from_path(&request)?;
            let (compiled, rendered) =
                service.derive(&identifier, tier.as_deref(), &segments)?;
            let path = output_path
                .unwrap_or_else(|| PathBuf::from(output::output_file_name(&identifier, &compiled)));
            std::fs::write(&path, &rendered.bytes)?;
            output::print_render_output(&identifier, &compiled, &rendered, &path);
        }
        Command::Plan {
            identifier,
            request,
            tier: TierArgs { tier },
            width,
            height,
            text,
        } => {
            let (_, service) = load_service(&cli.config, cli.source)?;
            let segments = RequestSegments::from_path(&request)?;
            let compiled = match (width, height) {
                (Some(width), Some(height)) => {
                    let cap = service.tier(tier.as_deref())?;
                    pipeline::compile(Size::new(width, height), cap, &segments)?
                }
                _ => service.plan(&identifier, tier.as_deref(), &segments)?,
            };
            if text {
                output::print_plan_output(&identifier, &compiled);
            } else {
                let plan = serde_json::json!({
                    "identifier": identifier,
                    "request": &compiled,
                    "content_type": compiled.content_type(),
                    "operations": compiled.operations(),
                });
                println!("{}", serde_json::to_string_pretty(&plan)?);
            }
        }
        Command::Info {
            identifier,
            tier: TierArgs { tier },
            base_uri,
        } => {
            let (_, service) = load_service(&cli.config, cli.source)?;
            let doc = service.info(&base_uri, &identifier, tier.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&doc)?);
        }
        Command::Batch {
            list,
            tier: TierArgs { tier },
            output_dir,
        } => {
            let (iiif_config, service) = load_service(&cli.config, cli.source)?;
            let content = std::fs::read_to_string(&list)?;
            let (entries, skipped) = batch::parse_batch_list(&content);
            for skip in &skipped {
                log::warn!("{}:{}: skipped, {}", list.display(), skip.line, skip.reason);
            }
            init_thread_pool(&iiif_config.processing);
            std::fs::create_dir_all(&output_dir)?;
            let report = batch::run_batch(&service, &entries, tier.as_deref(), &output_dir);
            output::print_batch_summary(report.written.len(), report.failed.len() + skipped.len());
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Load the config, apply the `--source` override, and build the service.
fn load_service(
    config_path: &Path,
    source: Option<PathBuf>,
) -> Result<(config::IiifConfig, IiifService), Box<dyn std::error::Error>> {
    let mut iiif_config = config::load_config(config_path)?;
    if let Some(source) = source {
        iiif_config.source.root = source;
    }
    let service = IiifService::from_config(&iiif_config)?;
    Ok((iiif_config, service))
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; the config can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
