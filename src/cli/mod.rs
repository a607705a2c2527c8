// Command-line interface

pub mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "recipe-hub")]
#[command(about = "Recipe Hub - share, search and rate recipes", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, env = "PORT")]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long, env = "HOST")]
        host: Option<String>,
    },

    /// Run database migrations
    Migrate,

    /// Rebuild the search index from the database
    Reindex,

    /// Search recipes on a running server
    Search {
        /// Search query
        query: String,

        /// Page of results to show
        #[arg(long, default_value_t = 1)]
        page: usize,

        /// Results per page
        #[arg(long, default_value_t = 20)]
        per_page: usize,
    },
}
