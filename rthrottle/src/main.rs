use anyhow::{Result, anyhow};
use clap::Parser;
use tracing::instrument;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "rthrottle",
    version,
    about = "Throttle the rate of data transfer between two pipes",
    long_about = "`rthrottle` copies everything from an input pipe to an output pipe while keeping the average \
transfer rate, measured from the start of the copy, at or below the requested number of bytes per second.

Both pipes default to standard input and standard output; named pipes or regular files can be given with \
--input and --output.

EXAMPLE:
    # Trickle a file into a named pipe at 1 KiB/s
    rthrottle --input data.bin --output /tmp/fifo --rate 1KiB

    # Throttle a pipeline to 10 bytes per second
    producer | rthrottle --rate 10 | consumer"
)]
struct Args {
    // Transfer options
    /// Optional path to the named input pipe, standard input if not given
    #[arg(long, value_name = "PATH", help_heading = "Transfer options")]
    input: Option<std::path::PathBuf>,

    /// Optional path to the named output pipe, standard output if not given
    #[arg(long, value_name = "PATH", help_heading = "Transfer options")]
    output: Option<std::path::PathBuf>,

    /// The rate expressed in bytes per second, 0 means no throttle
    ///
    /// Accepts a plain number of bytes or a human readable size, e.g. "512", "10KiB", "1MB".
    #[arg(
        long,
        default_value = "1",
        value_name = "RATE",
        value_parser = common::config::parse_rate,
        help_heading = "Transfer options"
    )]
    rate: u64,

    /// How to wait while the rate is above target
    ///
    /// `spin` (default) yields to the scheduler in a tight loop, tracking the rate closely at
    /// the cost of a busy CPU. `sleep` sleeps until the next byte is allowed.
    #[arg(
        long = "wait",
        default_value = "spin",
        value_name = "STRATEGY",
        help_heading = "Transfer options"
    )]
    wait_strategy: throttle::WaitStrategy,

    // Progress & output
    /// Verbose level (implies "summary"): -v INFO / -vv DEBUG / -vvv TRACE (default: ERROR)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, help_heading = "Progress & output")]
    verbose: u8,

    /// Print summary at the end
    #[arg(long, help_heading = "Progress & output")]
    summary: bool,

    /// Quiet mode, don't report errors
    #[arg(short = 'q', long = "quiet", help_heading = "Progress & output")]
    quiet: bool,
}

#[instrument]
async fn async_main(config: common::TransferConfig) -> Result<throttle::Summary> {
    config.validate().map_err(|error| anyhow!(error))?;
    tracing::info!(
        "throttling {} -> {} at {} bytes/s",
        describe(config.input.as_deref(), "stdin"),
        describe(config.output.as_deref(), "stdout"),
        config.rate
    );
    common::transfer(&config).await
}

fn describe(path: Option<&std::path::Path>, default: &str) -> String {
    path.map_or_else(|| default.to_string(), |path| format!("{:?}", path))
}

fn main() -> std::process::ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(error) => return common::report_parse_error("rthrottle", &error),
    };
    let config = common::TransferConfig {
        input: args.input.clone(),
        output: args.output.clone(),
        rate: args.rate,
        wait_strategy: args.wait_strategy,
    };
    let func = || async_main(config);
    let output = common::OutputConfig {
        quiet: args.quiet,
        verbose: args.verbose,
        print_summary: args.summary,
    };
    match common::run("rthrottle", output, func) {
        Some(_) => std::process::ExitCode::SUCCESS,
        None => std::process::ExitCode::FAILURE,
    }
}
