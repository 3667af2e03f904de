// Command-line flags. Flag names keep the underscore style of the sample
// (`--logging_level`), and parsing happens before anything touches the
// network or the filesystem.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line sample for Google Cloud Storage.
#[derive(Debug, Clone, Parser)]
#[command(name = "gcs-demo", version, about)]
pub struct Args {
    /// Set the level of logging detail.
    #[arg(long = "logging_level", value_enum, default_value_t = LogLevel::Info)]
    pub logging_level: LogLevel,

    /// Paste the authorization code instead of running a local web server
    /// for the OAuth redirect.
    #[arg(long = "noauth_local_webserver")]
    pub noauth_local_webserver: bool,

    /// Ports tried, in order, for the local OAuth redirect server.
    #[arg(long = "auth_host_port", default_values_t = [8080u16, 8090])]
    pub auth_host_port: Vec<u16>,

    /// Host name the local OAuth redirect server listens on.
    #[arg(long = "auth_host_name", default_value = "localhost")]
    pub auth_host_name: String,

    /// OAuth client secrets downloaded from the API console.
    #[arg(long = "client_secrets", env = "GCS_DEMO_CLIENT_SECRETS", default_value = "client_secrets.json")]
    pub client_secrets: PathBuf,

    /// Directory holding the stored credentials and project id.
    /// Defaults to `~/.gcs-demo`.
    #[arg(long = "data_dir", env = "GCS_DEMO_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Run one operation and exit; without it an interactive menu starts.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// List the buckets of the project.
    ListBuckets,
    /// List the objects in a bucket.
    ListObjects {
        bucket: String,
    },
    /// Upload a local file as an object.
    Upload {
        bucket: String,
        file: PathBuf,
        /// Object name, defaults to the file name.
        #[arg(long)]
        name: Option<String>,
        /// Content type, guessed from the file name when omitted.
        #[arg(long = "content-type")]
        content_type: Option<String>,
        /// Predefined ACL such as `private` or `public-read`.
        #[arg(long)]
        acl: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    #[value(name = "DEBUG")]
    Debug,
    #[value(name = "INFO")]
    Info,
    #[value(name = "WARNING")]
    Warning,
    #[value(name = "ERROR")]
    Error,
    #[value(name = "CRITICAL")]
    Critical,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn defaults() {
        let args = Args::try_parse_from(["gcs-demo"]).unwrap();
        assert_eq!(args.logging_level, LogLevel::Info);
        assert_eq!(args.auth_host_port, [8080, 8090]);
        assert!(!args.noauth_local_webserver);
        assert!(args.command.is_none());
    }

    #[test]
    fn every_level_is_accepted() {
        for (flag, level) in [
            ("DEBUG", LogLevel::Debug),
            ("INFO", LogLevel::Info),
            ("WARNING", LogLevel::Warning),
            ("ERROR", LogLevel::Error),
            ("CRITICAL", LogLevel::Critical),
        ] {
            let args = Args::try_parse_from(["gcs-demo", format!("--logging_level={flag}").as_str()]).unwrap();
            assert_eq!(args.logging_level, level);
        }
    }

    #[test]
    fn unknown_level_is_a_usage_error() {
        let err = Args::try_parse_from(["gcs-demo", "--logging_level", "TRACE"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidValue);
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn upload_subcommand() {
        let args = Args::try_parse_from([
            "gcs-demo",
            "--noauth_local_webserver",
            "upload",
            "my-bucket",
            "notes.txt",
            "--acl",
            "public-read",
            "--content-type",
            "text/markdown",
        ])
        .unwrap();
        assert!(args.noauth_local_webserver);
        match args.command {
            Some(Command::Upload { bucket, file, name, content_type, acl }) => {
                assert_eq!(bucket, "my-bucket");
                assert_eq!(file, PathBuf::from("notes.txt"));
                assert_eq!(name, None);
                assert_eq!(acl.as_deref(), Some("public-read"));
                assert_eq!(content_type.as_deref(), Some("text/markdown"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
