//! Main binary entry point for the `sinkhound` static analysis tool.

use sinkhound::analyzer::Analyzer;
use sinkhound::cli::Cli;
use sinkhound::config::{AnalyzerConfig, Mode, RuleFile};
use sinkhound::output;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AnalyzerConfig::default().with_mode(cli.modes.mode());
    if let Some(entry) = cli.entry {
        config = config.with_entry(entry);
    }
    if let Some(rules) = &cli.rules {
        config = config.with_rules(RuleFile::load(rules)?);
    }
    let debug = config.check_mode(Mode::DEBUG);

    let mut analyzer = Analyzer::new(config)?;
    let program = analyzer.build_program(&cli.path)?;
    let report = analyzer.analyze(&program)?;

    let mut stdout = std::io::stdout();
    output::print_risky_handlers(&mut stdout, &program, &report.risky_handlers)?;
    if debug {
        output::print_function_listing(&mut stdout, &program, analyzer.registry())?;
    }

    if let Some(failure) = report.aggregate_failure() {
        return Err(failure.into());
    }
    Ok(())
}
