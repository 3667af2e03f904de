// Project id persistence: ask once, remember forever. The only way to
// change the stored id is to delete the `project_info` file.

use std::io;

use thiserror::Error;
use tracing::{debug, warn};

use crate::prompt::Prompter;
use crate::store::{KeyValueStore, StoreError};

pub const PROJECT_KEY: &str = "project_info";
pub const PROJECT_PROMPT: &str =
    "Enter your Cloud Storage project id (found in the API console)";

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("failed to read the project id from the console")]
    Prompt(#[source] io::Error),
    #[error("no project id was entered")]
    Empty,
}

pub struct ProjectStore<S> {
    store: S,
}

impl<S: KeyValueStore> ProjectStore<S> {
    pub fn new(store: S) -> Self {
        ProjectStore { store }
    }

    /// Returns the stored project id, prompting for it and saving the answer
    /// when nothing usable is stored yet. Trailing whitespace is dropped on
    /// both paths, so a later run reads back exactly what the first returned.
    pub fn get_project_id(&self, prompter: &dyn Prompter) -> Result<String, ProjectError> {
        if let Some(project_id) = self.load() {
            debug!(%project_id, "using stored project id");
            return Ok(project_id);
        }
        let answer = prompter.input(PROJECT_PROMPT).map_err(ProjectError::Prompt)?;
        let project_id = answer.trim_end();
        // An unattended console answers with an empty line.
        if project_id.is_empty() {
            return Err(ProjectError::Empty);
        }
        self.store.save(PROJECT_KEY, project_id.as_bytes())?;
        Ok(project_id.to_string())
    }

    fn load(&self) -> Option<String> {
        let bytes = match self.store.load(PROJECT_KEY) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "project id could not be read, asking again");
                return None;
            }
        };
        match String::from_utf8(bytes) {
            // A hand-edited file usually ends in a newline.
            Ok(text) if !text.trim_end().is_empty() => Some(text.trim_end().to_string()),
            Ok(_) => None,
            Err(_) => {
                warn!("stored project id is not valid UTF-8, asking again");
                None
            }
        }
    }
}
