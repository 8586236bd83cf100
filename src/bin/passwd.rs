//! rax-vftpd-passwd - users file helper
//!
//! `rax-vftpd-passwd <password>` prints a `salt!hexdigest` secret for pasting
//! into the users file. The subcommands edit a users file in place.

use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use rax_vftpd::auth::{Permissions, UserRecord, UserStore, generate};
use rax_vftpd::error::UserParseError;

#[derive(Parser, Debug)]
#[command(name = "rax-vftpd-passwd")]
#[command(about = "Generate password hashes and manage the rax-vftpd users file")]
#[command(version, args_conflicts_with_subcommands = true)]
struct Cli {
    /// Plaintext password to hash
    password: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Add a user
    Add {
        #[arg(short, long)]
        file: PathBuf,
        username: String,
        password: String,
        /// Any of r and w
        #[arg(long, default_value = "r")]
        perms: String,
        root: PathBuf,
        /// Store the password as given instead of hashing it
        #[arg(long)]
        plaintext: bool,
    },
    /// Delete a user
    Del {
        #[arg(short, long)]
        file: PathBuf,
        username: String,
    },
    /// Change a user's password, permissions or root
    Mod {
        #[arg(short, long)]
        file: PathBuf,
        username: String,
        #[arg(long)]
        password: Option<String>,
        #[arg(long)]
        perms: Option<String>,
        #[arg(long)]
        root: Option<PathBuf>,
    },
    /// Print every user without secrets
    List {
        #[arg(short, long)]
        file: PathBuf,
    },
}

#[derive(Debug)]
enum ToolError {
    Users(UserParseError),
    Io(io::Error),
    Usage(&'static str),
}

impl std::fmt::Display for ToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToolError::Users(e) => write!(f, "{}", e),
            ToolError::Io(e) => write!(f, "{}", e),
            ToolError::Usage(msg) => write!(f, "{}", msg),
        }
    }
}

impl From<UserParseError> for ToolError {
    fn from(error: UserParseError) -> Self {
        ToolError::Users(error)
    }
}

impl From<io::Error> for ToolError {
    fn from(error: io::Error) -> Self {
        ToolError::Io(error)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match (cli.command, cli.password) {
        (Some(command), _) => run(command),
        (None, Some(password)) => {
            println!("{}", generate(&password));
            Ok(())
        }
        (None, None) => Err(ToolError::Usage("a password or a subcommand is required")),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("rax-vftpd-passwd: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> Result<(), ToolError> {
    match command {
        Commands::Add {
            file,
            username,
            password,
            perms,
            root,
            plaintext,
        } => {
            let mut users = load_or_empty(&file)?;
            let secret = if plaintext { password } else { generate(&password) };
            users.insert(UserRecord::new(
                username.clone(),
                secret,
                Permissions::from_flags(&perms),
                root,
            ))?;
            save(&users, &file)?;
            println!("User {} added", username);
        }
        Commands::Del { file, username } => {
            let mut users = UserStore::load_file(&file)?;
            users.remove(&username)?;
            save(&users, &file)?;
            println!("User {} deleted", username);
        }
        Commands::Mod {
            file,
            username,
            password,
            perms,
            root,
        } => {
            let mut users = UserStore::load_file(&file)?;
            if let Some(password) = password {
                users.set_password(&username, &password)?;
            }
            let record = users.get_mut(&username)?;
            if let Some(perms) = perms {
                record.permissions = Permissions::from_flags(&perms);
            }
            if let Some(root) = root {
                record.root = root;
            }
            record.check_fields()?;
            save(&users, &file)?;
            println!("User {} modified", username);
        }
        Commands::List { file } => {
            let users = UserStore::load_file(&file)?;
            for user in users.iter() {
                println!("{}\t{}\t{}", user.username, user.permissions, user.root.display());
            }
        }
    }
    Ok(())
}

fn load_or_empty(path: &Path) -> Result<UserStore, ToolError> {
    if path.exists() {
        Ok(UserStore::load_file(path)?)
    } else {
        Ok(UserStore::new())
    }
}

fn save(users: &UserStore, path: &Path) -> Result<(), ToolError> {
    users.save_file(path)?;
    Ok(())
}
