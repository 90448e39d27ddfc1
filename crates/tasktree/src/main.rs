use clap::Parser;
use tasktree::{init_logging, run, Cli};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let output = run(cli)?;
    println!("{output}");
    Ok(())
}
