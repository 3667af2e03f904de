// Startup sequence: project id, then credentials, then the API client,
// then either the requested subcommand or the interactive menu.

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use tracing::info;

use crate::api::GcsClient;
use crate::auth::{ClientSecrets, CredentialStore, InstalledFlow, RedirectMode, SCOPE};
use crate::cli::Args;
use crate::project::ProjectStore;
use crate::prompt::ConsolePrompter;
use crate::store::FileStore;
use crate::ui::{main_menu, run_once};

pub fn redirect_mode(args: &Args) -> RedirectMode {
    if args.noauth_local_webserver {
        RedirectMode::Console
    } else {
        RedirectMode::LocalServer {
            host: args.auth_host_name.clone(),
            ports: args.auth_host_port.clone(),
        }
    }
}

pub fn run(args: Args) -> Result<()> {
    let data_dir = args.data_dir.clone().unwrap_or_else(FileStore::default_dir);
    info!(data_dir = %data_dir.display(), "starting");
    let store = FileStore::new(data_dir);
    let prompter = ConsolePrompter;

    let project_id = ProjectStore::new(store.clone())
        .get_project_id(&prompter)
        .context("Failed to get the project id")?;

    let secrets = ClientSecrets::load(&args.client_secrets)?;
    let http = Client::builder()
        .build()
        .context("Failed to build HTTP client")?;
    let flow = InstalledFlow::new(http.clone(), secrets, SCOPE, redirect_mode(&args), prompter);
    let mut credentials = CredentialStore::new(store, flow);
    credentials
        .get_credentials()
        .context("Authorization failed")?;

    let mut client = GcsClient::new(http, project_id, Box::new(credentials))?;
    match args.command {
        Some(command) => run_once(command, &mut client),
        None => main_menu(&mut client, &prompter),
    }
}
