mod create;
mod get;
mod submit_response;
mod timeout;

use clap::{Parser, Subcommand};

use crate::request::create::CreateCommand;
use crate::request::get::GetCommand;
use crate::request::submit_response::SubmitResponseCommand;
use crate::request::timeout::TimeoutCommand;

#[derive(Debug, Parser)]
pub struct RequestCommand {
    #[command(subcommand)]
    pub command: SubCommands,
}

#[derive(Debug, Subcommand)]
pub enum SubCommands {
    Create(CreateCommand),
    Get(GetCommand),
    SubmitResponse(SubmitResponseCommand),
    Timeout(TimeoutCommand),
}
