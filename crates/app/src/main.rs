// CLI modules
mod cli;

mod process;
mod state;
mod version;

use clap::{Parser, Subcommand};
use cli::{args::Args, op::Op, Check, Daemon, Init, Version};

command_enum! {
    (Check, Check),
    (Daemon, Daemon),
    (Init, Init),
    (Version, Version),
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let ctx = cli::op::OpContext::new(args.config_path);

    match args.command.execute(&ctx).await {
        Ok(output) => {
            println!("{}", output);
            std::process::exit(0);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
