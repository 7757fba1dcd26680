use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::json;

use condense::recipes;
use condense::{
    chunk_by_tokens, BpeTokenizer, Chunker, Config, LinePacker, MapReduce, OpenAiGenerator,
    Tokenizer,
};

#[derive(Parser)]
#[command(name = "condense", about = "Chunk and map-reduce long text through an LLM")]
struct Cli {
    /// TOML config file
    #[arg(global = true, short, long)]
    config: Option<PathBuf>,
    /// Emit JSON to stdout; logs go to stderr
    #[arg(global = true, long, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split a file into token windows
    Chunk(ChunkArgs),
    /// Pack a file into whole-line chunks that fit a template
    Pack(TemplateArgs),
    /// Run a template over every chunk of a file
    Map(TemplateArgs),
    /// Summarize a file
    Summarize(InputArgs),
    /// Answer a question about a file
    Ask(AskArgs),
}

#[derive(Args)]
struct InputArgs {
    /// Input file, or `-` for stdin
    input: PathBuf,
}

#[derive(Args)]
struct ChunkArgs {
    #[command(flatten)]
    input: InputArgs,
    /// Tokens per window
    #[arg(long)]
    size: i64,
    /// Tokens shared by consecutive windows
    #[arg(long, default_value_t = 0)]
    overlap: i64,
}

#[derive(Args)]
struct TemplateArgs {
    #[command(flatten)]
    input: InputArgs,
    /// Prompt template containing `{{{chunk}}}`; `@path` reads it from a file
    #[arg(long)]
    template: String,
    /// Reduce the per-chunk outputs with this template (map only)
    #[arg(long)]
    reduce: Option<String>,
}

#[derive(Args)]
struct AskArgs {
    #[command(flatten)]
    input: InputArgs,
    /// The question to answer
    #[arg(long, short)]
    question: String,
}

fn init_tracing() {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);
    let builder = tracing_subscriber::registry().with(filter);

    match std::env::var("CONDENSE_LOG_FORMAT").as_deref() {
        Ok("json") => {
            let _ = builder.with(fmt_layer.json().flatten_event(true)).try_init();
        }
        _ => {
            let _ = builder.with(fmt_layer.compact()).try_init();
        }
    }
}

fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        return std::io::read_to_string(std::io::stdin()).context("reading stdin");
    }
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn read_template(arg: &str) -> Result<String> {
    match arg.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path).with_context(|| format!("reading {path}")),
        None => Ok(arg.to_string()),
    }
}

fn engine(config: Config, tokenizer: Arc<dyn Tokenizer>) -> Result<MapReduce> {
    let api_key = std::env::var("OPENAI_API_KEY").context("OPENAI_API_KEY is not set")?;
    let generator = OpenAiGenerator::new(&config.openai, api_key)?;
    Ok(MapReduce::new(tokenizer, Arc::new(generator), config))
}

fn print_list(json: bool, items: &[String]) {
    if json {
        println!("{}", json!({ "items": items }));
    } else {
        for (i, item) in items.iter().enumerate() {
            println!("--- [{i}] ---\n{item}");
        }
    }
}

fn print_text(json: bool, text: &str) {
    if json {
        println!("{}", json!({ "text": text }));
    } else {
        println!("{text}");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing();

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let tokenizer: Arc<dyn Tokenizer> = Arc::new(BpeTokenizer::new(config.encoding)?);

    match cli.command {
        Commands::Chunk(args) => {
            let text = read_input(&args.input.input)?;
            let chunks = chunk_by_tokens(tokenizer.as_ref(), &text, args.size, args.overlap)?;
            print_list(cli.json, &chunks);
        }
        Commands::Pack(args) => {
            let text = read_input(&args.input.input)?;
            let template = read_template(&args.template)?;
            let packer = LinePacker::for_template(
                tokenizer,
                &template,
                config.map.max_total_tokens,
                config.map.reserved_for_completion,
            )?;
            let slabs = packer.chunk(&text)?;
            if cli.json {
                let slabs: Vec<_> = slabs
                    .iter()
                    .map(|s| json!({ "text": s.text, "lines": s.lines(), "tokens": s.tokens }))
                    .collect();
                println!("{}", json!({ "budget": packer.budget(), "chunks": slabs }));
            } else {
                for slab in &slabs {
                    println!("--- {slab} ---\n{}", slab.text);
                }
            }
        }
        Commands::Map(args) => {
            let text = read_input(&args.input.input)?;
            let template = read_template(&args.template)?;
            let engine = engine(config, tokenizer)?;
            let outputs = engine.map_template(&text, &template).await?;
            match args.reduce {
                Some(reduce) => {
                    let reduce = read_template(&reduce)?;
                    let reduced = engine.reduce_completions(outputs, &reduce).await?;
                    print_text(cli.json, &reduced.into_text());
                }
                None => print_list(cli.json, &outputs),
            }
        }
        Commands::Summarize(args) => {
            let text = read_input(&args.input)?;
            let engine = engine(config, tokenizer)?;
            let summary = recipes::summarize(&engine, &text).await?;
            print_text(cli.json, &summary);
        }
        Commands::Ask(args) => {
            let text = read_input(&args.input.input)?;
            let engine = engine(config, tokenizer)?;
            let answer = recipes::answer(&engine, &text, &args.question).await?;
            print_text(cli.json, &answer);
        }
    }

    Ok(())
}
