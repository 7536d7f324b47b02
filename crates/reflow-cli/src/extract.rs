use std::path::{Path, PathBuf};

use reflow::{FragmentSource, ReflowConfig, TextFragment};

use crate::prelude::{println, *};

#[derive(Debug, Clone, clap::Args)]
pub struct TextOptions {
    /// Path to the PDF file
    pub path: PathBuf,

    /// Write the text to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, clap::Args)]
pub struct PagesOptions {
    /// Path to the PDF file
    pub path: PathBuf,
}

#[derive(Debug, Clone, clap::Args)]
pub struct FragmentsOptions {
    /// Path to the PDF file
    pub path: PathBuf,

    /// Only dump this page (1-based)
    #[arg(short, long)]
    pub page: Option<usize>,
}

#[derive(Debug, Clone, clap::Args)]
pub struct InfoOptions {
    /// Path to the PDF file
    pub path: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

async fn read_pdf(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .context(f!("Failed to read {}", path.display()))
}

pub async fn text(options: TextOptions, config: ReflowConfig) -> Result<()> {
    let bytes = read_pdf(&options.path).await?;

    // Parsing and reconstruction are CPU-bound.
    let text = tokio::task::spawn_blocking(move || reflow::extract_text(&bytes, &config))
        .await??;

    match options.output {
        Some(out) => {
            std::fs::write(&out, &text).context(f!("Failed to write {}", out.display()))?;
            log::info!("wrote {} bytes to {}", text.len(), out.display());
        }
        None => println!("{}", text),
    }

    Ok(())
}

pub async fn pages(options: PagesOptions, config: ReflowConfig) -> Result<()> {
    let bytes = read_pdf(&options.path).await?;
    let pages = tokio::task::spawn_blocking(move || reflow::extract_pages(&bytes, &config))
        .await??;

    println!("{}", serde_json::to_string_pretty(&pages)?);
    Ok(())
}

/// Map a 1-based page number onto a page index.
fn page_index(page: usize, count: usize) -> Result<usize, Error> {
    if page == 0 || page > count {
        return Err(Error::PageOutOfRange { page, count });
    }
    Ok(page - 1)
}

pub async fn fragments(options: FragmentsOptions, config: ReflowConfig) -> Result<()> {
    let bytes = read_pdf(&options.path).await?;
    let page = options.page;

    let pages = tokio::task::spawn_blocking(move || -> Result<Vec<Vec<TextFragment>>> {
        let Some(page) = page else {
            return Ok(reflow::extract_fragments(&bytes, &config)?);
        };

        // Only the requested page is walked.
        let source = reflow::open(&bytes)?;
        let index = page_index(page, source.page_count())?;
        Ok(vec![source.page_fragments(index)?])
    })
    .await??;

    println!("{}", serde_json::to_string_pretty(&pages)?);
    Ok(())
}

pub async fn info(options: InfoOptions) -> Result<()> {
    let bytes = read_pdf(&options.path).await?;
    let info = tokio::task::spawn_blocking(move || reflow::info(&bytes)).await??;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    let mut table = new_table();
    let unknown = || "-".to_string();
    table.add_row(prettytable::row!["Title", info.title.unwrap_or_else(unknown)]);
    table.add_row(prettytable::row!["Author", info.author.unwrap_or_else(unknown)]);
    table.add_row(prettytable::row!["Creator", info.creator.unwrap_or_else(unknown)]);
    table.add_row(prettytable::row!["Producer", info.producer.unwrap_or_else(unknown)]);
    table.add_row(prettytable::row!["Pages", info.page_count]);
    table.printstd();

    Ok(())
}
