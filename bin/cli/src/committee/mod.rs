mod active;
mod balance;
mod claim;
mod heartbeat;
mod upkeep;

use clap::{Parser, Subcommand};

use crate::committee::active::ActiveCommand;
use crate::committee::balance::BalanceCommand;
use crate::committee::claim::ClaimCommand;
use crate::committee::heartbeat::HeartbeatCommand;
use crate::committee::upkeep::UpkeepCommand;

#[derive(Debug, Parser)]
pub struct CommitteeCommand {
    #[command(subcommand)]
    pub command: SubCommands,
}

#[derive(Debug, Subcommand)]
pub enum SubCommands {
    Heartbeat(HeartbeatCommand),
    Active(ActiveCommand),
    Balance(BalanceCommand),
    Claim(ClaimCommand),
    Upkeep(UpkeepCommand),
}
