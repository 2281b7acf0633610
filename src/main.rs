mod fetcher;
mod kids;
mod parser;
mod scrape;
mod store;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};

use fetcher::{HttpRenderer, Renderer, SpiderRenderer};

#[derive(Parser)]
#[command(name = "kirtan_scraper", about = "Kirtan listing and detail page scraper")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract Kid values from a saved listing page and append them to the list file
    Extract {
        /// Saved listing page
        #[arg(long, default_value = kids::LISTING_HTML_PATH)]
        html: PathBuf,
        /// Identifier list (appended to)
        #[arg(long, default_value = store::KID_LIST_PATH)]
        out: PathBuf,
    },
    /// Scrape every Kid in the list file and write the workbook
    Scrape {
        #[arg(long, default_value = store::KID_LIST_PATH)]
        input: PathBuf,
        #[arg(long, default_value = store::WORKBOOK_PATH)]
        output: PathBuf,
        #[arg(long, value_enum, default_value_t = Engine::Spider)]
        engine: Engine,
        /// Max identifiers to scrape (default: all)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Scrape a single Kid and print the record as JSON
    Show {
        kid: String,
        #[arg(long, value_enum, default_value_t = Engine::Spider)]
        engine: Engine,
    },
    /// Run the field extractor over a saved detail page and print JSON
    Parse {
        file: PathBuf,
        /// URL the page was saved from, used to resolve relative links
        #[arg(long)]
        url: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Engine {
    /// spider.cloud headless Chrome (needs SPIDER_API_KEY)
    Spider,
    /// Plain HTTP GET without client-side rendering
    Http,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Extract { html, out } => {
            let kids = kids::extract_to_file(&html, &out)?;
            println!("Appended {} Kid values to {}", kids.len(), out.display());
            Ok(())
        }
        Commands::Scrape {
            input,
            output,
            engine,
            limit,
        } => {
            let stats = match engine {
                Engine::Spider => {
                    let renderer = SpiderRenderer::from_env()?;
                    scrape::run(&renderer, &input, &output, limit).await?
                }
                Engine::Http => scrape::run(&HttpRenderer::new(), &input, &output, limit).await?,
            };
            println!(
                "Done: {} scraped ({} ok, {} errors). Written to {}",
                stats.total,
                stats.ok,
                stats.errors,
                output.display()
            );
            Ok(())
        }
        Commands::Show { kid, engine } => match engine {
            Engine::Spider => show(&kid, &SpiderRenderer::from_env()?).await,
            Engine::Http => show(&kid, &HttpRenderer::new()).await,
        },
        Commands::Parse { file, url } => {
            let html = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let url = url.unwrap_or_default();
            let record = parser::parse_detail(&html, &url);
            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

async fn show<R: Renderer>(kid: &str, renderer: &R) -> anyhow::Result<()> {
    let record = scrape::scrape_detail(kid, renderer)
        .await
        .with_context(|| format!("Failed to scrape Kid {}", kid))?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
