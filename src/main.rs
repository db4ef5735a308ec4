use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;

use rfm_dash::render::render_text;
use rfm_dash::{Args, Dashboard, OutputFormat};

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    let config = args.resolve_config().context("reading configuration")?;
    let dashboard = Dashboard::load(&config).with_context(|| {
        format!(
            "loading {} and {}",
            config.rfm.path.display(),
            config.sales.path.display()
        )
    })?;

    let selection = dashboard
        .selection_from_labels(&args.segments, &args.years)
        .context("building filter selection")?;
    log::info!(
        "Selected {} segments and {} years",
        selection.segments.len(),
        selection.years.len()
    );

    let report = dashboard.report(&selection).context("computing dashboard")?;

    match args.format {
        OutputFormat::Text => print!("{}", render_text(&report).context("rendering report")?),
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&report).context("serializing report")?
        ),
    }

    Ok(())
}
