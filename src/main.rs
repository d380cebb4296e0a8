use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process;
use std::time::Instant;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cerlink::cer::CerParser;
use cerlink::config::load_config;
use cerlink::errors::{CerLinkError, Result};
use cerlink::render::{text_for, to_xml, LinkTextResolver};
use cerlink::session::{BuildSession, SessionSummary};
use cerlink::targets::DictionaryRegistry;
use cerlink::types::{Dialect, DisplayOptions};

/// Cross-reference resolution for generated API documentation.
#[derive(Parser)]
#[command(name = "cerlink", about = "Resolve code entity references in documentation topics")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a code entity reference and print its structure
    Parse {
        /// The reference, e.g. "M:System.String.Format(System.String)"
        cer: String,
        /// Topic key supplying the generic context
        #[arg(short, long)]
        context: Option<String>,
    },
    /// Render the display text of a reference
    Render {
        cer: String,
        /// Configuration file (.toml or .json)
        #[arg(short = 'C', long)]
        config: PathBuf,
        /// Show the containing namespace or type
        #[arg(long)]
        container: bool,
        /// Hide template parameters
        #[arg(long)]
        no_templates: bool,
        /// Hide parameter lists
        #[arg(long)]
        no_parameters: bool,
        /// Print plain text for one dialect (cs, vb, cpp, nu, fs) instead of XML
        #[arg(short, long)]
        dialect: Option<String>,
    },
    /// Resolve the reference links of topic files
    Resolve {
        /// Topic files; each file stem is the topic key
        inputs: Vec<PathBuf>,
        /// Configuration file (.toml or .json)
        #[arg(short = 'C', long)]
        config: PathBuf,
        /// Output directory
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Parse { cer, context } => {
            let mut parser = CerParser::new();
            if let Some(context) = context {
                parser.set_generic_context(&context);
            }
            let reference = parser.parse_reference(&cer)?;
            println!("{:#?}", reference);
        }
        Commands::Render {
            cer,
            config,
            container,
            no_templates,
            no_parameters,
            dialect,
        } => {
            let dialect = match dialect {
                Some(name) => Some(Dialect::from_str(&name).ok_or_else(|| CerLinkError::Config {
                    message: format!("unknown dialect '{}'", name),
                })?),
                None => None,
            };

            let mut options = DisplayOptions::default();
            if container {
                options = options.with(DisplayOptions::SHOW_CONTAINER);
            }
            if no_templates {
                options = options.without(DisplayOptions::SHOW_TEMPLATES);
            }
            if no_parameters {
                options = options.without(DisplayOptions::SHOW_PARAMETERS);
            }

            let mut registry = DictionaryRegistry::new();
            let session = BuildSession::open(load_config(&config)?, &mut registry)?;
            let resolver = LinkTextResolver::new(session.targets());
            let markup = match session.targets().get(&cer) {
                Some(target) => resolver.render_target(target, options),
                None => resolver.render_reference(&CerParser::new().parse_reference(&cer)?, options),
            };

            match dialect {
                Some(dialect) => println!("{}", text_for(&markup, dialect)),
                None => println!("{}", to_xml(&markup)),
            }
            session.finish(&mut registry)?;
            registry.clear();
        }
        Commands::Resolve {
            inputs,
            config,
            output,
        } => {
            let start = Instant::now();
            let mut registry = DictionaryRegistry::new();
            let mut session = BuildSession::open(load_config(&config)?, &mut registry)?;
            let mut summary = SessionSummary::default();

            for input in &inputs {
                let result = session.process_file(input, &output_path(&output, input))?;
                summary.topic_count += 1;
                summary.link_count += result.total;
                summary.resolved_count += result.resolved_count;
            }
            session.finish(&mut registry)?;
            registry.clear();
            summary.duration_ms = start.elapsed().as_millis() as u64;

            println!(
                "Resolved {} of {} links in {} topics in {}ms",
                summary.resolved_count, summary.link_count, summary.topic_count, summary.duration_ms
            );
        }
    }
    Ok(())
}

/// Output location of `input`: its file name under `output`.
fn output_path(output: &Path, input: &Path) -> PathBuf {
    match input.file_name() {
        Some(name) => output.join(name),
        None => output.join(input),
    }
}
