//! Common plumbing for the `rthrottle` tool
//!
//! This crate holds everything around the throttled copy itself: the resolved configuration,
//! opening of the input and output endpoints, tracing and runtime setup, and the mapping of the
//! final result to a process exit code.
//!
//! # Exit Codes
//!
//! Every failure is reported on standard error after echoing the invocation line:
//!
//! ```text
//! Invocation:
//!     rthrottle --rate 10 --input /no/such/file
//! rthrottle experienced an unexpected error:
//!     failed opening input "/no/such/file": No such file or directory (os error 2)
//! ```
//!
//! and the process exits with code 1. A help or version request prints the invocation line and
//! the requested text to standard error and exits with code 0. Standard output only ever carries
//! the copied bytes.

pub mod config;
pub mod endpoint;

pub use config::{OutputConfig, TransferConfig};
pub use endpoint::transfer;

/// Returns the command line of the current process in the form echoed before diagnostics.
pub fn invocation() -> String {
    format_invocation(std::env::args())
}

fn format_invocation(args: impl IntoIterator<Item = String>) -> String {
    let args: Vec<String> = args.into_iter().collect();
    format!("Invocation:\n\t{}", args.join(" "))
}

/// Reports a command line parsing outcome that did not produce arguments.
///
/// Help and version requests are not failures: their text goes to standard error and the exit
/// code is 0. Anything else is a configuration error and exits with 1.
pub fn report_parse_error(tool: &str, error: &clap::Error) -> std::process::ExitCode {
    eprintln!("{}", invocation());
    match error.kind() {
        clap::error::ErrorKind::DisplayHelp
        | clap::error::ErrorKind::DisplayVersion
        | clap::error::ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
            eprint!("{}", error.render());
            std::process::ExitCode::SUCCESS
        }
        _ => {
            eprintln!(
                "{} experienced an unexpected error:\n\t{}",
                tool,
                error.render().to_string().trim_end()
            );
            std::process::ExitCode::FAILURE
        }
    }
}

fn level_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "error",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn init_tracing(output: &OutputConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level_filter(output.verbose)));
    // standard output is reserved for the copied data
    if let Err(error) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
    {
        eprintln!("failed to initialize logging: {}", error);
    }
}

/// Sets up tracing and a tokio runtime, runs `func` to completion and reports its outcome.
///
/// Returns `None` when the run failed; the diagnostic has already been printed by then.
pub fn run<Fut>(
    tool: &str,
    output: OutputConfig,
    func: impl FnOnce() -> Fut,
) -> Option<throttle::Summary>
where
    Fut: std::future::Future<Output = anyhow::Result<throttle::Summary>>,
{
    init_tracing(&output);
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(error) => {
            report_failure(tool, &output, &anyhow::Error::from(error));
            return None;
        }
    };
    match runtime.block_on(func()) {
        Ok(summary) => {
            if output.print_summary || output.verbose > 0 {
                eprintln!("{}", &summary);
            }
            Some(summary)
        }
        Err(error) => {
            report_failure(tool, &output, &error);
            None
        }
    }
}

fn report_failure(tool: &str, output: &OutputConfig, error: &anyhow::Error) {
    if output.quiet {
        return;
    }
    tracing::error!("{:#}", error);
    eprintln!("{}", invocation());
    eprintln!("{} experienced an unexpected error:\n\t{:#}", tool, error);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[test]
    fn invocation_joins_arguments() {
        let args = ["rthrottle", "--rate", "10"].map(String::from);
        assert_eq!(format_invocation(args), "Invocation:\n\trthrottle --rate 10");
    }

    #[test]
    fn verbosity_levels() {
        assert_eq!(level_filter(0), "error");
        assert_eq!(level_filter(1), "info");
        assert_eq!(level_filter(2), "debug");
        assert_eq!(level_filter(3), "trace");
        assert_eq!(level_filter(9), "trace");
    }

    #[traced_test]
    #[test]
    fn failure_is_logged() {
        report_failure(
            "rthrottle",
            &OutputConfig::default(),
            &anyhow::anyhow!("sink closed"),
        );
        assert!(logs_contain("sink closed"));
    }
}
