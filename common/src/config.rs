//! Configuration types for a throttled transfer and its output

/// Resolved configuration of a single transfer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferConfig {
    /// Path of the input pipe or file (None = standard input)
    pub input: Option<std::path::PathBuf>,
    /// Path of the output pipe or file (None = standard output)
    pub output: Option<std::path::PathBuf>,
    /// Target rate in bytes per second (0 = no throttle)
    pub rate: u64,
    /// How to wait while the rate is above target
    pub wait_strategy: throttle::WaitStrategy,
}

impl TransferConfig {
    /// Validate configuration and return errors if invalid
    pub fn validate(&self) -> Result<(), String> {
        if self.input.is_some() && self.input == self.output {
            return Err(format!(
                "input and output must be different, both are {:?}",
                self.input
            ));
        }
        Ok(())
    }
}

/// Output and logging configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputConfig {
    /// Suppress error output
    pub quiet: bool,
    /// Verbosity level: 0=ERROR, 1=INFO, 2=DEBUG, 3=TRACE
    pub verbose: u8,
    /// Print summary statistics at the end
    pub print_summary: bool,
}

/// Parses a rate in bytes per second: a plain integer or a human readable size such as "10KiB".
pub fn parse_rate(value: &str) -> Result<u64, String> {
    let value = value.trim();
    if let Ok(rate) = value.parse::<u64>() {
        return Ok(rate);
    }
    value
        .parse::<bytesize::ByteSize>()
        .map(|size| size.as_u64())
        .map_err(|error| format!("invalid rate {:?}: {}", value, error))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_plain_rate() {
        assert_eq!(parse_rate("0"), Ok(0));
        assert_eq!(parse_rate("1"), Ok(1));
        assert_eq!(parse_rate(" 4096 "), Ok(4096));
    }

    #[test]
    fn parse_human_readable_rate() {
        assert_eq!(parse_rate("10KiB"), Ok(10 * 1024));
        assert_eq!(parse_rate("1MB"), Ok(1_000_000));
    }

    #[test]
    fn parse_invalid_rate() {
        assert!(parse_rate("fast").is_err());
        assert!(parse_rate("").is_err());
    }

    #[test]
    fn same_input_and_output_is_rejected() {
        let config = TransferConfig {
            input: Some("/tmp/pipe".into()),
            output: Some("/tmp/pipe".into()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn stdio_config_is_valid() {
        let config = TransferConfig {
            rate: 1,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.wait_strategy, throttle::WaitStrategy::Spin);
    }
}
