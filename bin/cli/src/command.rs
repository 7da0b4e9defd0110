use clap::{Parser, Subcommand};

use crate::{committee::CommitteeCommand, request::RequestCommand};

#[derive(Parser, Debug)]
#[command(name = "oraclectl", about = "CLI client for an oracle-node instance")]
pub struct Command {
    #[command(subcommand)]
    pub command: SubCommands,
}

#[derive(Subcommand, Debug)]
pub enum SubCommands {
    Committee(CommitteeCommand),
    Request(RequestCommand),
}

pub trait Executable {
    fn execute(self) -> Result<(), anyhow::Error>;
}
