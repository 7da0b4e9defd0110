mod command;
mod committee;
mod request;

use clap::Parser;
use command::{Command, Executable};

fn main() {
    let cmd = Command::parse();
    let result = match cmd.command {
        command::SubCommands::Committee(committee_cmd) => match committee_cmd.command {
            // Example: oraclectl committee heartbeat --node-url="http://127.0.0.1:8080" --validator="0x..."
            committee::SubCommands::Heartbeat(heartbeat_cmd) => heartbeat_cmd.execute(),
            // Example: oraclectl committee active --node-url="http://127.0.0.1:8080"
            committee::SubCommands::Active(active_cmd) => active_cmd.execute(),
            // Example: oraclectl committee balance --node-url="http://127.0.0.1:8080" --who="0x..."
            committee::SubCommands::Balance(balance_cmd) => balance_cmd.execute(),
            // Example: oraclectl committee claim --node-url="http://127.0.0.1:8080" --who="0x..."
            committee::SubCommands::Claim(claim_cmd) => claim_cmd.execute(),
            // Example: oraclectl committee upkeep --node-url="http://127.0.0.1:8080"
            committee::SubCommands::Upkeep(upkeep_cmd) => upkeep_cmd.execute(),
        },
        command::SubCommands::Request(request_cmd) => match request_cmd.command {
            // Example: oraclectl request create --node-url="http://127.0.0.1:8080" --agent-id=1 --requester="0x..." --deposit-value=3000
            request::SubCommands::Create(create_cmd) => create_cmd.execute(),
            // Example: oraclectl request get --node-url="http://127.0.0.1:8080" --request-id=7
            request::SubCommands::Get(get_cmd) => get_cmd.execute(),
            // Example: oraclectl request submit-response --node-url="http://127.0.0.1:8080" --request-id=7 --validator="0x..." --cost=100 --success
            request::SubCommands::SubmitResponse(submit_cmd) => submit_cmd.execute(),
            // Example: oraclectl request timeout --node-url="http://127.0.0.1:8080" --request-id=7
            request::SubCommands::Timeout(timeout_cmd) => timeout_cmd.execute(),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {e:?}");
        std::process::exit(1);
    }
}
