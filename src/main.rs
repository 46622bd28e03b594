mod cache;
mod dates;
mod navigation;
mod output;
mod pipeline;
mod post;
mod prismic;
mod reading_time;
mod richtext;
mod view_model;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::pipeline::{Generator, Stage};
use crate::prismic::{PrismicClient, PrismicConfig};

#[derive(Parser, Debug)]
#[clap(
    version,
    about = "Generate a static blog from posts stored in a Prismic repository"
)]
struct Args {
    /// Prismic API endpoint (e.g. https://my-blog.cdn.prismic.io/api/v2)
    #[arg(long, env = "PRISMIC_API_ENDPOINT")]
    endpoint: String,

    /// Access token for private repositories
    #[arg(long, env = "PRISMIC_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    /// Custom type of the blog posts
    #[arg(long, default_value = "posts")]
    document_type: String,

    /// Page cache directory (default: the user cache directory)
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the listing pages and every post page
    Build {
        /// Output directory
        #[arg(short, long, default_value = "dist")]
        out: PathBuf,

        /// Posts per listing page
        #[arg(long, default_value_t = 1)]
        page_size: usize,

        /// Seconds before a cached post page is rendered again
        #[arg(long, default_value_t = 1800)]
        revalidate: i64,

        /// Render every post, ignoring the page cache
        #[arg(long)]
        no_cache: bool,
    },
    /// Render a single post page on demand
    Post {
        uid: String,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Seconds before a cached post page is rendered again
        #[arg(long, default_value_t = 1800)]
        revalidate: i64,
    },
    /// Print the path of every post page
    Paths,
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "spacetraveling=debug"
    } else {
        "spacetraveling=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn revalidate_interval(secs: i64) -> Result<chrono::TimeDelta> {
    chrono::TimeDelta::try_seconds(secs)
        .with_context(|| format!("--revalidate {} is out of range", secs))
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let client = PrismicClient::new(PrismicConfig {
        endpoint: args.endpoint.clone(),
        access_token: args.access_token.clone(),
        document_type: args.document_type.clone(),
    })?;

    let open_cache = || -> Result<cache::Cache> {
        let cache = match &args.cache_dir {
            Some(dir) => cache::Cache::at(dir.clone())?,
            None => cache::Cache::new(&client.repository_host())?,
        };
        info!("Page cache: {:?}", cache.dir());
        Ok(cache)
    };

    match &args.command {
        Command::Build {
            out,
            page_size,
            revalidate,
            no_cache,
        } => {
            let cache = if *no_cache { None } else { Some(open_cache()?) };
            let generator =
                Generator::new(&client, cache.as_ref(), revalidate_interval(*revalidate)?);
            let report = generator
                .generate_site(out, *page_size)
                .context("Build failed")?;
            info!(
                "Built {} listing pages and {} posts ({} cached, {} pending) into {:?}",
                report.listing_pages,
                report.rendered + report.cached + report.fallback,
                report.cached,
                report.fallback,
                out
            );
        }
        Command::Post {
            uid,
            output,
            revalidate,
        } => {
            let cache = open_cache()?;
            let generator =
                Generator::new(&client, Some(&cache), revalidate_interval(*revalidate)?);
            let listing = generator.snapshot()?;
            let page = generator.generate_post(uid, &listing)?;
            if page.stage == Stage::Fallback {
                info!("Post {:?} is not available yet", uid);
            }

            if let Some(path) = output {
                std::fs::write(path, &page.html)
                    .with_context(|| format!("Failed to write output to {:?}", path))?;
                info!("Output written to {:?}", path);
            } else {
                print!("{}", page.html);
            }
        }
        Command::Paths => {
            let generator = Generator::new(&client, None, chrono::Duration::zero());
            for post in generator.snapshot()? {
                println!("{}", output::post_href(&post.uid));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revalidate_interval() {
        assert_eq!(revalidate_interval(1800).unwrap().num_seconds(), 1800);
        assert_eq!(revalidate_interval(0).unwrap(), chrono::TimeDelta::zero());
    }

    #[test]
    fn test_revalidate_interval_out_of_range() {
        let err = revalidate_interval(i64::MAX).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }
}
