//! Command line definitions for `dashcache`.

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "dashcache",
    version,
    about = "Browse dashboard users and products from the terminal"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Log in and save the session.
    Login(LoginArgs),

    /// Forget the saved session.
    Logout,

    /// Show the logged-in user.
    Whoami,

    /// Show user and product totals.
    Stats,

    /// List users, optionally filtered by a search term.
    Users(UsersArgs),

    /// Show one user.
    User {
        /// User id.
        id: u64,
    },

    /// List products, filtered by a search term or a category.
    Products(ProductsArgs),

    /// Show one product.
    Product {
        /// Product id.
        id: u64,
    },

    /// List the product categories.
    Categories,
}

#[derive(Args)]
pub struct LoginArgs {
    /// Username (prompted for when omitted).
    #[arg(long, env = "DASHCACHE_USERNAME")]
    pub username: Option<String>,

    /// Password (prompted for without echo when omitted).
    #[arg(long, env = "DASHCACHE_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

#[derive(Args)]
pub struct UsersArgs {
    /// Page number, starting at 1.
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub page: u32,

    /// Search term.
    #[arg(long)]
    pub search: Option<String>,
}

#[derive(Args)]
pub struct ProductsArgs {
    /// Page number, starting at 1.
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub page: u32,

    /// Search term.
    #[arg(long, conflicts_with = "category")]
    pub search: Option<String>,

    /// Category slug (see `dashcache categories`).
    #[arg(long)]
    pub category: Option<String>,
}
