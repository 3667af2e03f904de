// Library root
// -----------
// This crate exposes the library surface of the Cloud Storage sample. The
// binary (`main.rs`) parses flags, sets up logging and hands over to
// `app::run`.
//
// Module responsibilities:
// - `store`: key-value persistence (files on disk, or memory in tests).
// - `project`: asks for the project id once and remembers it.
// - `auth`: OAuth 2.0 installed-application flow and the credential
//   lifecycle on top of `store`.
// - `api`: blocking client for the Cloud Storage XML API.
// - `ui`: interactive menu and one-shot subcommands on top of `api`.
// - `cli`, `logging`, `prompt`: flags, tracing setup and console input.
pub mod api;
pub mod app;
pub mod auth;
pub mod cli;
pub mod logging;
pub mod project;
pub mod prompt;
pub mod store;
pub mod ui;
