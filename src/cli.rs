/// Master of Jokes server.
#[derive(clap::Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(clap::Subcommand, Debug, Default)]
pub enum Command {
    /// Serves the site (default)
    #[default]
    Serve,
    /// Makes the account with this email a Moderator, creating it if needed
    InitModerator { email: String, password: String },
}
