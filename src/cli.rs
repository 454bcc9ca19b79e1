// Copyright 2025 Lablup Inc. and Jeongkyu Shin
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Config;
use crate::executor::TransferAction;

#[derive(Parser, Debug)]
#[command(
    name = "ssh-sampler",
    version,
    about = "Run single SSH command or SFTP samples against a host",
    long_about = "ssh-sampler opens an SSH session, performs exactly one operation (a remote command or one SFTP action),\ncloses the session and reports the result the way a load-testing harness records a sample.\nEach iteration is an independent connect / operate / disconnect cycle.",
    after_help = "EXAMPLES:\n  Run a command:            ssh-sampler -H db1 -l bench exec uptime\n  Repeat it ten times:      ssh-sampler -H db1 -l bench --iterations 10 exec \"df -h\"\n  Print a remote file:      ssh-sampler -H db1 -l bench sftp get /etc/hostname\n  List a directory as JSON: ssh-sampler -H db1 -l bench --json sftp ls /var/log"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(
        long,
        help = "Configuration file path [default: ~/.config/ssh-sampler/config.yaml]\nA missing default file is ignored; a missing explicit file is an error"
    )]
    pub config: Option<PathBuf>,

    #[arg(short = 'H', long, help = "Remote host name or address")]
    pub host: Option<String>,

    #[arg(short = 'p', long, help = "Remote SSH port [default: 22]")]
    pub port: Option<u16>,

    #[arg(short = 'l', long, help = "Login user name")]
    pub user: Option<String>,

    #[arg(
        long,
        env = "SSH_SAMPLER_PASSWORD",
        hide_env_values = true,
        help = "Password for password and keyboard-interactive authentication"
    )]
    pub password: Option<String>,

    #[arg(short = 'i', long, help = "SSH private key file path")]
    pub identity: Option<PathBuf>,

    #[arg(
        long,
        env = "SSH_SAMPLER_PASSPHRASE",
        hide_env_values = true,
        help = "Passphrase for an encrypted private key"
    )]
    pub passphrase: Option<String>,

    #[arg(
        long = "connect-timeout",
        value_name = "MS",
        help = "Connection timeout in milliseconds, 0 disables it [default: 5000]"
    )]
    pub connect_timeout: Option<u64>,

    #[arg(short = 'n', long, help = "Sampler name used in result labels")]
    pub name: Option<String>,

    #[arg(
        long,
        default_value = "1",
        value_parser = clap::value_parser!(u32).range(1..),
        help = "Number of samples to run in sequence"
    )]
    pub iterations: u32,

    #[arg(long, help = "Print each sample result as a JSON line")]
    pub json: bool,

    #[arg(
        short = 'v',
        long,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv, -vvv)"
    )]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Execute a remote command",
        long_about = "Executes the command once per iteration and captures stdout (and stderr unless --no-stderr).\nBy default the exit code is the response code and only exit code 0 counts as success.",
        after_help = "Examples:\n  ssh-sampler -H db1 exec uptime\n  ssh-sampler -H db1 exec --no-tty --no-stderr \"cat /proc/loadavg\""
    )]
    Exec {
        #[arg(long, help = "Always succeed and report OK instead of the exit code")]
        no_return_code: bool,

        #[arg(long, help = "Do not allocate a pseudo terminal")]
        no_tty: bool,

        #[arg(long, help = "Leave stderr out of the response data")]
        no_stderr: bool,

        #[arg(trailing_var_arg = true, help = "Command to run [default: date]")]
        command: Vec<String>,
    },

    #[command(
        about = "Perform one SFTP action",
        long_about = "Actions: get, put, ls, rm, rmdir, mkdir, rename.\nget prints the remote file unless --no-print is given, in which case it is written to DESTINATION.\nput uploads the local SOURCE to DESTINATION; rename moves SOURCE to DESTINATION.",
        after_help = "Examples:\n  ssh-sampler -H db1 sftp ls /var/log\n  ssh-sampler -H db1 sftp get /etc/hosts ./hosts --no-print\n  ssh-sampler -H db1 sftp put ./payload.bin /tmp/payload.bin"
    )]
    Sftp {
        #[arg(help = "SFTP action")]
        action: TransferAction,

        #[arg(help = "Remote path (local path for put)")]
        source: String,

        #[arg(help = "Local path for get, remote path for put and rename")]
        destination: Option<String>,

        #[arg(long, help = "Write the file for get instead of printing it")]
        no_print: bool,
    },
}

impl Cli {
    /// Overlays the command line on top of file configuration.
    pub fn apply_to(&self, config: &mut Config) {
        let connection = &mut config.connection;
        if let Some(host) = &self.host {
            connection.host = host.clone();
        }
        if let Some(port) = self.port {
            connection.port = port;
        }
        if let Some(user) = &self.user {
            connection.username = user.clone();
        }
        if let Some(password) = &self.password {
            connection.password = password.clone();
        }
        if let Some(identity) = &self.identity {
            connection.private_key = identity.display().to_string();
        }
        if let Some(passphrase) = &self.passphrase {
            connection.passphrase = passphrase.clone();
        }
        if let Some(timeout) = self.connect_timeout {
            connection.connect_timeout_ms = timeout;
        }
        if let Some(name) = &self.name {
            config.name = Some(name.clone());
        }

        match &self.command {
            Commands::Exec {
                no_return_code,
                no_tty,
                no_stderr,
                command,
            } => {
                if !command.is_empty() {
                    config.command.command = command.join(" ");
                }
                config.command.use_return_code &= !no_return_code;
                config.command.use_tty &= !no_tty;
                config.command.print_stderr &= !no_stderr;
            }
            Commands::Sftp {
                action,
                source,
                destination,
                no_print,
            } => {
                config.sftp.action = action.clone();
                config.sftp.source = source.clone();
                if let Some(destination) = destination {
                    config.sftp.destination = destination.clone();
                }
                config.sftp.print_file &= !no_print;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_exec_overrides() {
        let cli = parse(&[
            "ssh-sampler",
            "-H",
            "db1",
            "-p",
            "2222",
            "-l",
            "bench",
            "exec",
            "--no-tty",
            "df",
            "-h",
        ]);
        let mut config = Config::default();
        cli.apply_to(&mut config);

        assert_eq!(config.connection.host, "db1");
        assert_eq!(config.connection.port, 2222);
        assert_eq!(config.connection.username, "bench");
        assert_eq!(config.command.command, "df -h");
        assert!(!config.command.use_tty);
        assert!(config.command.use_return_code);
        assert!(config.command.print_stderr);
    }

    #[test]
    fn test_exec_without_command_keeps_config() {
        let cli = parse(&["ssh-sampler", "exec"]);
        let mut config = Config::default();
        config.command.command = "uptime".into();
        cli.apply_to(&mut config);
        assert_eq!(config.command.command, "uptime");
    }

    #[test]
    fn test_sftp_arguments() {
        let cli = parse(&[
            "ssh-sampler",
            "sftp",
            "get",
            "/etc/hosts",
            "./hosts",
            "--no-print",
        ]);
        let mut config = Config::default();
        cli.apply_to(&mut config);

        assert_eq!(config.sftp.action, TransferAction::Get);
        assert_eq!(config.sftp.source, "/etc/hosts");
        assert_eq!(config.sftp.destination, "./hosts");
        assert!(!config.sftp.print_file);
    }

    #[test]
    fn test_unknown_sftp_action_parses() {
        let cli = parse(&["ssh-sampler", "sftp", "chmod", "/tmp/x"]);
        match cli.command {
            Commands::Sftp { action, .. } => {
                assert_eq!(action, TransferAction::Unknown("chmod".into()))
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_iterations_must_be_positive() {
        assert!(Cli::try_parse_from(["ssh-sampler", "--iterations", "0", "exec"]).is_err());
        assert_eq!(parse(&["ssh-sampler", "exec"]).iterations, 1);
    }
}
