use std::env;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use paper_explainer_service::{
    AppConfig, Explanation, ExplanationLevel, ExplainerDeps, TierGraphs, explain_document,
};
use paper_extraction::{
    DocumentLoader, FigureStore, HttpOracle, LopdfLoader, SectionLocator, extract_equations,
    figures::caption_for_page,
};

fn preview(text: &str, chars: usize) -> String {
    if text.chars().count() > chars {
        format!("{}...", text.chars().take(chars).collect::<String>())
    } else {
        text.to_string()
    }
}

fn parse_level(raw: &str) -> Result<ExplanationLevel> {
    match raw {
        "easy" => Ok(ExplanationLevel::Easy),
        "intermediate" => Ok(ExplanationLevel::Intermediate),
        "advanced" => Ok(ExplanationLevel::Advanced),
        other => bail!("unknown level '{other}', expected easy, intermediate or advanced"),
    }
}

/// Offline view of what the heuristics find, no oracle involved.
fn print_diagnostics(pdf_path: &Path) -> Result<()> {
    let document = LopdfLoader.load(pdf_path)?;
    let full_text = document.full_text();

    println!("Pages: {}", document.pages.len());
    println!("Embedded images: {}", document.image_count());
    println!("Normalized text: {} characters", full_text.chars().count());
    println!();

    let locators = [
        ("Methodology", SectionLocator::methodology()),
        ("Technical", SectionLocator::technical()),
        ("Results", SectionLocator::results()),
    ];
    for (name, locator) in &locators {
        match locator.locate(&full_text) {
            Some(section) => {
                println!(
                    "{name}: rule #{} matched '{}' at byte {}, {} chars",
                    section.rule,
                    section.heading,
                    section.offset,
                    section.text.chars().count()
                );
                println!("   {}", preview(&section.text, 160).replace('\n', " "));
            }
            None => println!("{name}: no heading found"),
        }
    }
    println!();

    let technical = SectionLocator::technical().locate_text(&full_text);
    let equations = extract_equations(&technical);
    println!("Equation candidates in technical window: {}", equations.len());
    for equation in &equations {
        println!("   {equation}");
    }
    println!();

    for page in &document.pages {
        if page.images.is_empty() {
            continue;
        }
        let caption = caption_for_page(&page.text).unwrap_or_else(|| "(no caption)".into());
        println!("Page {}: {} image(s), caption: {caption}", page.index, page.images.len());
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 || args.len() > 3 {
        eprintln!("Usage: {} <pdf_file_path> [easy|intermediate|advanced]", args[0]);
        eprintln!("Without a level only the extraction diagnostics are printed.");
        std::process::exit(1);
    }

    let pdf_path = Path::new(&args[1]);
    println!("Paper Explainer: {}", pdf_path.display());
    println!("==================");
    print_diagnostics(pdf_path)?;

    let Some(level) = args.get(2) else {
        return Ok(());
    };
    let level = parse_level(level)?;

    let config = AppConfig::from_env().context("GROQ_API_KEY is needed to run a tier")?;
    let deps = ExplainerDeps {
        oracle: Arc::new(HttpOracle::new(config.oracle.clone())?),
        loader: Arc::new(LopdfLoader),
        figure_store: FigureStore::new(&config.figure_dir, &config.figure_url_prefix),
    };
    let graphs = TierGraphs::build(&deps);

    println!();
    println!("Running {} tier with {}", level.as_str(), config.oracle.model);
    let file_id = pdf_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| "local".to_string());
    let explanation = explain_document(&graphs, level, &file_id, pdf_path).await?;

    match &explanation {
        Explanation::Easy(easy) => println!("{}", easy.explanation),
        Explanation::Intermediate(intermediate) => {
            println!("Methodology:\n{}\n", intermediate.method_explanation);
            for figure in &intermediate.figures {
                println!("Figure {} -> {}", figure.caption, figure.image_url);
            }
            println!("\nFigures summary:\n{}", intermediate.figures_summary);
        }
        Explanation::Advanced(advanced) => {
            println!("Methodology:\n{}\n", advanced.methodology_text);
            for (index, paragraph) in advanced.equation_explanations.iter().enumerate() {
                println!("Equation note {}:\n{paragraph}\n", index + 1);
            }
            println!("Results:\n{}", advanced.results_explanation);
        }
    }

    Ok(())
}
