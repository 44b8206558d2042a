// Copyright © 2025 mailsweep.com
// Licensed under MailSweep License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use chrono::NaiveDate;
use clap::{builder::ValueParser, Args, Parser, Subcommand};
use std::{env, path::PathBuf, sync::LazyLock};
use url::Url;

use crate::{
    modules::error::{code::ErrorCode, MailSweepResult},
    modules::purge::payload::{PurgeMethod, PurgeRequest, SubjectMatch, SubjectMode},
    raise_error,
};

#[cfg(not(test))]
pub static SETTINGS: LazyLock<Settings> = LazyLock::new(Settings::parse);

#[cfg(test)]
pub static SETTINGS: LazyLock<Settings> = LazyLock::new(Settings::new_for_test);

#[derive(Debug, Parser)]
#[clap(
    name = "mailsweep",
    about = "A service for locating and removing messages across every mailbox in an organization,
    with dry-run support and an auditable trail for privileged purge operations.",
    version = env!("CARGO_PKG_VERSION")
)]
pub struct Settings {
    /// mailsweep log level (default: "info")
    #[clap(
        long,
        default_value = "info",
        env,
        help = "Set the log level for mailsweep"
    )]
    pub mailsweep_log_level: String,

    /// Enable ANSI logs (default: true)
    #[clap(long, default_value = "true", env, help = "Enable ANSI formatted logs")]
    pub mailsweep_ansi_logs: bool,

    /// Enable log file output (default: false)
    /// If false, logs will be printed to stdout
    #[clap(
        long,
        default_value = "false",
        env,
        help = "Enable log file output (otherwise logs go to stdout)"
    )]
    pub mailsweep_log_to_file: bool,

    /// Enable JSON logs (default: false)
    #[clap(
        long,
        default_value = "false",
        env,
        help = "Enable JSON formatted logs"
    )]
    pub mailsweep_json_logs: bool,

    /// Maximum number of log files (default: 5)
    #[clap(
        long,
        default_value = "5",
        env,
        help = "Set the maximum number of server log files"
    )]
    pub mailsweep_max_server_log_files: usize,

    #[clap(
        long,
        env,
        help = "Set the data directory for mailsweep (logs, audit records, script output)",
        value_parser = ValueParser::new(|s: &str| {
            let path = PathBuf::from(s);
            if !path.is_absolute() {
                return Err("Path must be an absolute directory path".to_string());
            }
            if !path.exists() {
                return Err(format!("Path {:?} does not exist", path));
            }
            if !path.is_dir() {
                return Err(format!("Path {:?} is not a directory", path));
            }
            Ok(s.to_string())
        })
    )]
    pub mailsweep_root_dir: String,

    /// Remote mail protocol endpoint, e.g. "https://mail.example.com/EWS/Exchange.asmx"
    #[clap(
        long,
        env,
        help = "Set the remote mail protocol endpoint used by gateway adapters",
        value_parser = ValueParser::new(|s: &str| -> Result<String, String> {
            Url::parse(s).map_err(|_| format!("Invalid URL for ews_endpoint: {}", s))?;
            Ok(s.to_string())
        })
    )]
    pub mailsweep_ews_endpoint: Option<String>,

    /// Service identity used for mailbox impersonation
    #[clap(
        long,
        env,
        help = "Set the service account username for the remote mail protocol"
    )]
    pub mailsweep_ews_username: Option<String>,

    #[clap(
        long,
        env,
        help = "Set the service account password for the remote mail protocol"
    )]
    pub mailsweep_ews_password: Option<String>,

    #[clap(
        long,
        env,
        help = "Maximum number of concurrent mailbox tasks (default: number of CPU cores x 2)",
        value_parser = clap::value_parser!(u16).range(1..)
    )]
    pub mailsweep_mailbox_concurrency: Option<u16>,

    #[clap(
        long,
        default_value = "100",
        env,
        help = "Page size for remote item enumeration",
        value_parser = clap::value_parser!(u32).range(10..=1000)
    )]
    pub mailsweep_find_page_size: u32,

    #[clap(
        long,
        env,
        help = "Set the path of the privileged purge executable",
        value_parser = ValueParser::new(|s: &str| {
            let path = PathBuf::from(s);
            if !path.exists() {
                return Err(format!("Purge script {:?} does not exist", path));
            }
            if !path.is_file() {
                return Err(format!("Purge script {:?} is not a file", path));
            }
            Ok(path)
        })
    )]
    pub mailsweep_purge_script: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Option<MailSweepCommand>,
}

#[derive(Debug, Subcommand)]
pub enum MailSweepCommand {
    /// Launch the external purge tool and stream its output as ordered events
    Purge(PurgeArgs),
    /// Print recent purge audit records, newest first
    Audit {
        #[clap(long, default_value = "20", help = "Maximum number of records to print")]
        limit: usize,
    },
}

#[derive(Debug, Clone, Args)]
pub struct PurgeArgs {
    /// Sender address whose messages should be purged
    #[clap(long)]
    pub sender: String,

    /// Match messages whose subject equals this value exactly
    #[clap(long, conflicts_with = "subject_contains")]
    pub subject_equals: Option<String>,

    /// Match messages whose subject contains this value
    #[clap(long)]
    pub subject_contains: Option<String>,

    #[clap(long, value_enum, default_value = "compliance-search")]
    pub method: PurgeMethod,

    /// How many days back to search when no explicit date range is given
    #[clap(long, value_parser = clap::value_parser!(u32).range(1..=3650))]
    pub days_back: Option<u32>,

    /// Start of the receipt date range (YYYY-MM-DD)
    #[clap(long, value_parser = ValueParser::new(parse_iso_date), requires = "before")]
    pub from: Option<NaiveDate>,

    /// End of the receipt date range, exclusive (YYYY-MM-DD)
    #[clap(long, value_parser = ValueParser::new(parse_iso_date), requires = "from")]
    pub before: Option<NaiveDate>,

    /// Scan and report without deleting anything
    #[clap(long)]
    pub simulate: bool,

    /// Allow the purge tool to fall back to a permanent hard delete
    #[clap(long)]
    pub allow_hard_delete: bool,
}

fn parse_iso_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| format!("Invalid date '{}' (expected YYYY-MM-DD)", s))
}

impl PurgeArgs {
    pub fn into_request(self) -> MailSweepResult<PurgeRequest> {
        let subject = match (self.subject_equals, self.subject_contains) {
            (Some(value), None) => SubjectMatch {
                mode: SubjectMode::Equals,
                value,
            },
            (None, Some(value)) => SubjectMatch {
                mode: SubjectMode::Contains,
                value,
            },
            _ => {
                return Err(raise_error!(
                    "Exactly one of --subject-equals or --subject-contains is required".into(),
                    ErrorCode::InvalidParameter
                ))
            }
        };
        Ok(PurgeRequest {
            sender_email: self.sender,
            subject,
            method: self.method,
            days_back: self.days_back,
            received_from: self.from,
            received_to: self.before,
            simulate: self.simulate,
            allow_hard_delete: self.allow_hard_delete,
        })
    }
}

impl Settings {
    #[cfg(test)]
    fn new_for_test() -> Self {
        Self {
            mailsweep_log_level: "info".to_string(),
            mailsweep_ansi_logs: false,
            mailsweep_json_logs: false,
            mailsweep_log_to_file: false,
            mailsweep_max_server_log_files: 5,
            mailsweep_root_dir: if cfg!(windows) {
                "D:\\mailsweep_data".into()
            } else {
                "/sourcecode/mailsweep/mailsweep_data".into()
            },
            mailsweep_ews_endpoint: None,
            mailsweep_ews_username: None,
            mailsweep_ews_password: None,
            mailsweep_mailbox_concurrency: Some(4),
            mailsweep_find_page_size: 10,
            mailsweep_purge_script: None,
            command: None,
        }
    }
}
