// UI layer: the interactive menu and the one-shot subcommands. Every menu
// entry collects its inputs through a `Prompter`, calls the API client and
// turns the result into a line or two of text.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::style::Stylize;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::header::HeaderMap;
use tracing::{debug, error, info};

use crate::api::xml::{Bucket, ListBucketResult};
use crate::api::{
    CorsRule, GcsClient, ObjectUpload, DEFAULT_MAX_AGE_SEC, DEFAULT_METHOD, DEFAULT_ORIGIN,
    DEFAULT_RESPONSE_HEADER,
};
use crate::cli::Command;
use crate::prompt::Prompter;

/// Created and uploaded when the user does not name an existing file.
pub const UPLOAD_FILE_NAME: &str = "cloud-storage-upload-test.txt";
const UPLOAD_FILE_CONTENTS: &str = "This is a test file for the Cloud Storage demo.";

const BUCKET_PROMPT: &str = "Bucket Name";
const OBJECT_PROMPT: &str = "Object Name";
const BEST_GUESS: &str = "best guess";
const FILE_NAME: &str = "file name";
const ORIGINAL_NAME: &str = "original object name";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuCommand {
    ListBuckets,
    ListObjects,
    GetBucketCors,
    GetBucketLocation,
    InsertBucket,
    SetBucketCors,
    DeleteBucket,
    GetObject,
    GetObjectAcls,
    GetObjectMetadata,
    InsertObject,
    CopyObject,
    DeleteObject,
}

impl MenuCommand {
    pub const ALL: [MenuCommand; 13] = [
        MenuCommand::ListBuckets,
        MenuCommand::ListObjects,
        MenuCommand::GetBucketCors,
        MenuCommand::GetBucketLocation,
        MenuCommand::InsertBucket,
        MenuCommand::SetBucketCors,
        MenuCommand::DeleteBucket,
        MenuCommand::GetObject,
        MenuCommand::GetObjectAcls,
        MenuCommand::GetObjectMetadata,
        MenuCommand::InsertObject,
        MenuCommand::CopyObject,
        MenuCommand::DeleteObject,
    ];

    pub fn description(self) -> &'static str {
        match self {
            MenuCommand::ListBuckets => "Get all buckets",
            MenuCommand::ListObjects => "Get a bucket",
            MenuCommand::GetBucketCors => "Get bucket CORS",
            MenuCommand::GetBucketLocation => "Get bucket location",
            MenuCommand::InsertBucket => "Create a bucket",
            MenuCommand::SetBucketCors => "Set bucket CORS",
            MenuCommand::DeleteBucket => "Delete a bucket",
            MenuCommand::GetObject => "Download an object",
            MenuCommand::GetObjectAcls => "Get object ACLs",
            MenuCommand::GetObjectMetadata => "Get object metadata",
            MenuCommand::InsertObject => "Upload an object",
            MenuCommand::CopyObject => "Copy an object",
            MenuCommand::DeleteObject => "Delete an object",
        }
    }
}

/// Main interactive menu. Runs the selected command until the user picks
/// "Quit". A failing command is reported and the menu comes back.
pub fn main_menu(client: &mut GcsClient, prompter: &dyn Prompter) -> Result<()> {
    let mut items: Vec<String> = MenuCommand::ALL
        .iter()
        .map(|c| c.description().to_string())
        .collect();
    items.push("Quit".to_string());

    loop {
        let selection = prompter.select("What would you like to do?", &items)?;
        let Some(&command) = MenuCommand::ALL.get(selection) else {
            break;
        };
        match run_command(command, client, prompter) {
            Ok(message) => println!("{message}"),
            Err(e) => {
                debug!(error = ?e, "{} failed", command.description());
                eprintln!("{}", format!("{} failed: {e:#}", command.description()).red());
            }
        }
    }
    Ok(())
}

/// Collects the inputs of `command`, runs it and returns what to show.
pub fn run_command(
    command: MenuCommand,
    client: &mut GcsClient,
    prompter: &dyn Prompter,
) -> Result<String> {
    let message = match command {
        MenuCommand::ListBuckets => {
            let buckets = with_spinner("Listing buckets...", || client.list_buckets())?;
            format_buckets(&buckets)
        }
        MenuCommand::ListObjects => {
            let bucket = prompter.input(BUCKET_PROMPT)?;
            let listing = with_spinner("Listing objects...", || client.list_objects(&bucket))?;
            format_objects(&listing)
        }
        MenuCommand::GetBucketCors => {
            let bucket = prompter.input(BUCKET_PROMPT)?;
            with_spinner("Fetching CORS...", || client.get_bucket_cors(&bucket))?
        }
        MenuCommand::GetBucketLocation => {
            let bucket = prompter.input(BUCKET_PROMPT)?;
            let location = with_spinner("Fetching location...", || client.get_bucket_location(&bucket))?;
            format!("{bucket} is located in {location}")
        }
        MenuCommand::InsertBucket => {
            let bucket = prompter.input(BUCKET_PROMPT)?;
            with_spinner("Creating bucket...", || client.insert_bucket(&bucket, None, None))?;
            format!("Bucket \"{bucket}\" created")
        }
        MenuCommand::SetBucketCors => {
            let bucket = prompter.input(BUCKET_PROMPT)?;
            let rule = prompt_cors_rule(prompter)?;
            with_spinner("Setting CORS...", || client.set_bucket_cors(&bucket, &rule))?;
            "Cors set successfully".to_string()
        }
        MenuCommand::DeleteBucket => {
            let bucket = prompter.input(BUCKET_PROMPT)?;
            with_spinner("Deleting bucket...", || client.delete_bucket(&bucket))?;
            format!("{bucket} deleted.")
        }
        MenuCommand::GetObject => {
            let bucket = prompter.input(BUCKET_PROMPT)?;
            let object = prompter.input(OBJECT_PROMPT)?;
            let contents = with_spinner("Downloading...", || client.get_object(&bucket, &object))?;
            let local = local_file_name(&object);
            fs::write(local, contents).with_context(|| format!("failed to write {local}"))?;
            format!("File downloaded locally to {local}")
        }
        MenuCommand::GetObjectAcls => {
            let bucket = prompter.input(BUCKET_PROMPT)?;
            let object = prompter.input(OBJECT_PROMPT)?;
            with_spinner("Fetching ACLs...", || client.get_object_acls(&bucket, &object))?
        }
        MenuCommand::GetObjectMetadata => {
            let bucket = prompter.input(BUCKET_PROMPT)?;
            let object = prompter.input(OBJECT_PROMPT)?;
            let headers = with_spinner("Fetching metadata...", || client.get_object_metadata(&bucket, &object))?;
            format_headers(&headers)
        }
        MenuCommand::InsertObject => {
            let path = prompter.input_with_default("path to file", UPLOAD_FILE_NAME)?;
            let file_path = ensure_upload_file(&path, Path::new("."))?;
            let bucket = prompter.input(BUCKET_PROMPT)?;
            let object_name = optional(prompter.input_with_default("new name", FILE_NAME)?, FILE_NAME);
            let content_type = optional(prompter.input_with_default("content-type", BEST_GUESS)?, BEST_GUESS);
            let content_encoding = optional(prompter.input_with_default("encoding", BEST_GUESS)?, BEST_GUESS);
            let acl = prompter.input_with_default("an acl (private, public-read, etc)", "private")?;
            let upload = ObjectUpload {
                bucket: &bucket,
                file_path: &file_path,
                object_name: object_name.as_deref(),
                content_type: content_type.as_deref(),
                content_encoding: content_encoding.as_deref(),
                acl: Some(acl.as_str()),
            };
            with_spinner("Uploading...", || client.insert_object(&upload))?;
            format!("File {} was uploaded.", file_path.display())
        }
        MenuCommand::CopyObject => {
            let source_bucket = prompter.input("current bucket")?;
            let source_object = prompter.input("object to copy")?;
            let target_bucket = prompter.input("new bucket")?;
            let target_object = optional(
                prompter.input_with_default("new object name", ORIGINAL_NAME)?,
                ORIGINAL_NAME,
            );
            let copied = with_spinner("Copying...", || {
                client.copy_object(
                    &source_bucket,
                    &source_object,
                    &target_bucket,
                    target_object.as_deref(),
                    None,
                )
            })?;
            format!("{copied} has been copied to {target_bucket}.")
        }
        MenuCommand::DeleteObject => {
            let bucket = prompter.input(BUCKET_PROMPT)?;
            let object = prompter.input(OBJECT_PROMPT)?;
            with_spinner("Deleting object...", || client.delete_object(&bucket, &object))?;
            format!("{object} deleted.")
        }
    };
    Ok(message)
}

/// Runs a subcommand given on the command line and prints its result.
pub fn run_once(command: Command, client: &mut GcsClient) -> Result<()> {
    match command {
        Command::ListBuckets => {
            let buckets = client.list_buckets().context("listing buckets failed")?;
            println!("{}", format_buckets(&buckets));
        }
        Command::ListObjects { bucket } => {
            let listing = client
                .list_objects(&bucket)
                .with_context(|| format!("listing objects in {bucket} failed"))?;
            println!("{}", format_objects(&listing));
        }
        Command::Upload {
            bucket,
            file,
            name,
            content_type,
            acl,
        } => {
            let upload = ObjectUpload {
                bucket: &bucket,
                file_path: &file,
                object_name: name.as_deref(),
                content_type: content_type.as_deref(),
                content_encoding: None,
                acl: acl.as_deref(),
            };
            let object = client
                .insert_object(&upload)
                .with_context(|| format!("uploading {} failed", file.display()))?;
            info!(%bucket, %object, "uploaded");
            println!("File {} was uploaded to {bucket} as {object}.", file.display());
        }
    }
    Ok(())
}

fn prompt_cors_rule(prompter: &dyn Prompter) -> Result<CorsRule> {
    let split = |s: String| s.split(',').map(str::to_string).collect::<Vec<_>>();
    let origins = split(prompter.input_with_default("a comma-separated list of origins", DEFAULT_ORIGIN)?);
    let methods = split(prompter.input_with_default("a comma-separated list of methods", DEFAULT_METHOD)?);
    let response_headers = split(
        prompter.input_with_default("a comma-separated list of headers", DEFAULT_RESPONSE_HEADER)?,
    );
    let age = prompter.input_with_default("max cache time in seconds", &DEFAULT_MAX_AGE_SEC.to_string())?;
    let max_age_sec = age
        .trim()
        .parse()
        .with_context(|| format!("invalid max cache time: {age}"))?;
    Ok(CorsRule {
        origins,
        methods,
        response_headers,
        max_age_sec,
    })
}

/// Maps the placeholder default shown in a prompt back to "not given".
fn optional(value: String, placeholder: &str) -> Option<String> {
    if value.trim().is_empty() || value == placeholder {
        None
    } else {
        Some(value)
    }
}

fn with_spinner<T>(message: &str, f: impl FnOnce() -> T) -> T {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    let out = f();
    spinner.finish_and_clear();
    out
}

pub fn format_buckets(buckets: &[Bucket]) -> String {
    if buckets.is_empty() {
        return "No buckets found.".to_string();
    }
    buckets
        .iter()
        .map(|b| b.name.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_objects(listing: &ListBucketResult) -> String {
    if listing.contents.is_empty() {
        return format!("No objects in {}.", listing.name);
    }
    let mut lines: Vec<String> = listing
        .contents
        .iter()
        .map(|o| format!("{}\t{} bytes", o.key, o.size))
        .collect();
    if listing.is_truncated {
        lines.push("(more objects not shown)".to_string());
    }
    lines.join("\n")
}

pub fn format_headers(headers: &HeaderMap) -> String {
    headers
        .iter()
        .map(|(name, value)| format!("{}: {}", name, value.to_str().unwrap_or("<binary>")))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Downloads are written to the last path segment of the object name.
pub fn local_file_name(object: &str) -> &str {
    object.rsplit('/').next().unwrap_or(object)
}

/// Returns `input` when it names an existing file. Otherwise falls back to
/// the demo file in `dir`, creating it first if needed.
pub fn ensure_upload_file(input: &str, dir: &Path) -> io::Result<PathBuf> {
    let input = input.trim();
    if !input.is_empty() && Path::new(input).is_file() {
        return Ok(PathBuf::from(input));
    }
    if !input.is_empty() && input != UPLOAD_FILE_NAME {
        error!("File does not exist, creating {UPLOAD_FILE_NAME} file.");
    }
    let path = dir.join(UPLOAD_FILE_NAME);
    if !path.is_file() {
        fs::write(&path, UPLOAD_FILE_CONTENTS)?;
    }
    Ok(path)
}
