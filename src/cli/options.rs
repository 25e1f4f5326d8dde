use clap::Parser;
use std::path::PathBuf;

use crate::runtime::RunnerConfig;

/// Main rustle-play CLI interface
#[derive(Debug, Parser)]
#[command(name = "rustle-play")]
#[command(about = "Apply a YAML playbook of file and shell tasks to the local host")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct RustlePlayCli {
    /// Playbook file (or stdin if - or omitted)
    pub playbook: Option<PathBuf>,

    /// Runner configuration file (YAML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbosity: u8,

    /// Output format for the result report
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Default user for shell tasks
    #[arg(long)]
    pub user: Option<String>,

    /// Default group for shell tasks
    #[arg(long)]
    pub group: Option<String>,

    /// Default shell task timeout (seconds)
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Run the whole document as a task list of this one module
    #[arg(short, long)]
    pub module: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// One `step name:..., module:..., result:..., ...` line per task
    Text,
    /// JSON array of result records
    Json,
}

impl RustlePlayCli {
    /// True when the playbook should be read from stdin
    pub fn reads_stdin(&self) -> bool {
        match &self.playbook {
            None => true,
            Some(path) => path.as_os_str() == "-",
        }
    }

    /// Apply command-line overrides on top of a loaded configuration
    pub fn apply_overrides(&self, config: &mut RunnerConfig) {
        if let Some(user) = &self.user {
            config.shell.user = user.clone();
        }
        if let Some(group) = &self.group {
            config.shell.group = group.clone();
        }
        if let Some(timeout) = self.timeout {
            config.shell.timeout = timeout;
        }
        match self.verbosity {
            0 => {}
            1 => config.log_level = "debug".to_string(),
            _ => config.log_level = "trace".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_read_stdin() {
        let cli = RustlePlayCli::parse_from(["rustle-play"]);
        assert!(cli.reads_stdin());
        assert_eq!(cli.format, OutputFormat::Text);

        let cli = RustlePlayCli::parse_from(["rustle-play", "-"]);
        assert!(cli.reads_stdin());

        let cli = RustlePlayCli::parse_from(["rustle-play", "site.yml"]);
        assert!(!cli.reads_stdin());
    }

    #[test]
    fn test_overrides() {
        let cli = RustlePlayCli::parse_from([
            "rustle-play",
            "site.yml",
            "--user",
            "deploy",
            "--timeout",
            "5",
            "-vv",
            "--format",
            "json",
        ]);
        let mut config = RunnerConfig::default();
        cli.apply_overrides(&mut config);

        assert_eq!(config.shell.user, "deploy");
        assert_eq!(config.shell.group, "root");
        assert_eq!(config.shell.timeout, 5);
        assert_eq!(config.log_level, "trace");
        assert_eq!(cli.format, OutputFormat::Json);
    }
}
