// CLI subcommand dispatch.

use std::path::Path;

use clap::Subcommand;

pub mod mv;
pub mod nest;
pub mod new;
pub mod trash;
pub mod tree;
pub mod watch;

#[derive(Subcommand)]
pub enum Command {
    /// Print the workspace page outline
    Tree(tree::TreeArgs),
    /// Create a page
    New(new::NewArgs),
    /// Move a page to a new index among its siblings
    Mv(mv::MvArgs),
    /// Reparent a page under another page or at the root
    Nest(nest::NestArgs),
    /// Move a page to the trash
    Trash(trash::TrashArgs),
    /// Bring a page back from the trash
    Restore(trash::RestoreArgs),
    /// Follow a document and print each server version
    Watch(watch::WatchArgs),
}

pub fn run(cmd: Command, config: Option<&Path>) -> anyhow::Result<()> {
    match cmd {
        Command::Tree(args) => tree::run(args, config),
        Command::New(args) => new::run(args, config),
        Command::Mv(args) => mv::run(args, config),
        Command::Nest(args) => nest::run(args, config),
        Command::Trash(args) => trash::run(args, config),
        Command::Restore(args) => trash::run_restore(args, config),
        Command::Watch(args) => watch::run(args, config),
    }
}
