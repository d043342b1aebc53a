macro_rules! command_boilerplate {
    ( $( $Variant:ident ),* $(,)? ) => {
        paste::paste! {
            $(
                pub mod [<$Variant:lower>];
            )*

            #[derive(Debug, clap::Subcommand)]
            #[non_exhaustive]
            pub enum Command {
                $(
                    $Variant([<$Variant:lower>]::Command),
                )*
            }

            impl Cli {
                pub async fn run(&self) -> Result<(), CommandError> {
                    match &self.command {
                        $(
                            | Command::$Variant(x) => x.run().await,
                        )*
                    }
                }
            }
        }
    };
}

use std::io;

use clap::Parser;
use thiserror::Error;

use crate::server::core::ServeError;

#[derive(Debug, Parser)]
#[command(name = "tunedrop", version = env!("TUNEDROP_VERSION"), author, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to run server: {0}")]
    ServeError(#[from] ServeError),
}

command_boilerplate! {
    Serve,
    List,
}
