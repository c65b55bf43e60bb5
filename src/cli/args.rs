use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser, Clone, PartialEq, Eq)]
#[command(name = "netops-sentinel")]
#[command(
    about = "Network troubleshooting assistant backed by Gemini",
    long_about = "Network troubleshooting assistant backed by Gemini\n\nRequires GOOGLE_API_KEY in the environment (a .env file in the working directory is also read).\n\nConfig file loading:\n  - --config <path> (explicit file, overrides default path discovery)\n  - Default probe path when --config is not provided:\n    1. $XDG_CONFIG_HOME/netops-sentinel/config.toml\n    2. ~/.config/netops-sentinel/config.toml"
)]
pub struct CliArgs {
    /// Load config from this file path instead of the default discovery path.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Dump model API requests and responses to stderr, secrets redacted.
    #[arg(short, long)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::CliArgs;
    use clap::Parser;

    #[test]
    fn parse_defaults() {
        let args = CliArgs::try_parse_from(["netops-sentinel"]).expect("should parse");
        assert_eq!(args.config, None);
        assert!(!args.verbose);
    }

    #[test]
    fn parse_config_and_verbose_flags() {
        let args = CliArgs::try_parse_from([
            "netops-sentinel",
            "--config",
            "/tmp/netops.toml",
            "-v",
        ])
        .expect("parse");
        assert_eq!(
            args.config.as_deref(),
            Some(std::path::Path::new("/tmp/netops.toml"))
        );
        assert!(args.verbose);
    }

    #[test]
    fn rejects_unknown_flags() {
        assert!(CliArgs::try_parse_from(["netops-sentinel", "--model", "x"]).is_err());
    }
}
