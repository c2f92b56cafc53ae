use clap::Parser;

use exceptional::analysis::analyze;
use exceptional::cases;
use exceptional::config::AnalysisConfig;
use exceptional::harness::run_cases;

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Only analyse cases of this fixture class (e.g. `Arrays`).
    #[arg(long, value_name = "CLASS")]
    class: Option<String>,

    /// Print the graded summary as JSON.
    #[arg(long)]
    json: bool,

    /// Print the IR and per-site verdicts of every case.
    #[arg(long)]
    verbose: bool,

    /// Treat every array length as unknown.
    #[arg(long)]
    no_array_length: bool,

    /// Joins a loop head absorbs before widening.
    #[arg(long, value_name = "INT", default_value = "1")]
    widening_threshold: usize,

    /// Narrowing rounds after the ascending phase.
    #[arg(long, value_name = "INT", default_value = "2")]
    narrowing: usize,

    /// Block visits before giving up on a fixpoint.
    #[arg(long, value_name = "INT")]
    max_iterations: Option<usize>,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    simplelog::TermLogger::init(
        simplelog::LevelFilter::Warn,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let time_total = std::time::Instant::now();

    let args = Cli::parse();
    log::debug!("args = {:?}", args);

    let config = AnalysisConfig {
        widening_threshold: args.widening_threshold,
        narrowing_iterations: args.narrowing,
        max_iterations: args.max_iterations,
        track_array_length: !args.no_array_length,
    };

    let procedures = match &args.class {
        Some(class) => {
            if !cases::CLASSES.contains(&class.as_str()) {
                color_eyre::eyre::bail!("unknown class `{}`, expected one of {:?}", class, cases::CLASSES);
            }
            cases::of_class(class)?
        }
        None => cases::all()?,
    };

    if args.verbose {
        for procedure in &procedures {
            println!("{}", procedure);
            let report = analyze(procedure, &config)?;
            for site in &report.sites {
                println!("  {} {:<8} {} ({})", site.location, site.verdict, site.description, site.kind);
            }
            println!("  => {} after {} iterations", report.verdict, report.iterations);
            println!();
        }
    }

    let summary = run_cases(&procedures, &config);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", summary);
    }

    let time_total = time_total.elapsed();
    println!("\nAll done in {:.3} s", time_total.as_secs_f64());

    Ok(())
}
