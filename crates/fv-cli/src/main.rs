use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use directories::ProjectDirs;

use fv_core::auth::{Auth, SignIn};
use fv_core::ctf::Ctf;
use fv_core::vault::{EntryInput, VaultService};
use fv_store::ctf::NewChallenge;
use fv_store::models::{Difficulty, UserRow};
use fv_store::{Store, VaultSession};

#[derive(Parser)]
#[command(name = "flagvault")]
#[command(about = "Password vault and CTF trainer", long_about = None)]
struct Cli {
    /// Override the database path (defaults to the platform data dir)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Auto-lock the vault after this many idle seconds (0 disables)
    #[arg(long, global = true)]
    auto_lock: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a new account
    Register {
        email: String,
        /// Display name shown on the leaderboard
        #[arg(long)]
        name: Option<String>,
    },

    /// Sign in and store the session token
    Login { email: String },

    /// Sign out and lock the vault
    Logout,

    /// Show the signed-in account
    Whoami,

    /// Two-factor authentication
    #[command(subcommand)]
    Twofactor(TwofactorCommands),

    /// Encrypted credential vault
    #[command(subcommand)]
    Vault(VaultCommands),

    /// CTF challenges
    #[command(subcommand)]
    Ctf(CtfCommands),

    /// Show the leaderboard
    Leaderboard,
}

#[derive(Subcommand)]
enum TwofactorCommands {
    /// Generate a TOTP secret (prints it for your authenticator app)
    Setup,
    /// Confirm enrollment with a code from the authenticator
    Confirm { code: String },
    /// Disable two-factor authentication
    Disable,
}

#[derive(Subcommand)]
enum VaultCommands {
    /// Add an entry (prompts for the master passphrase and the secret)
    Add {
        title: String,
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        username: String,
        #[arg(long)]
        notes: Option<String>,
        /// Generate the secret instead of prompting for it
        #[arg(long)]
        generate: bool,
    },

    /// List entries (metadata only, nothing is decrypted)
    List,

    /// Decrypt and print one entry
    Show { entry_id: String },

    /// Delete an entry
    Rm { entry_id: String },

    /// Generate a password without storing anything
    Generate {
        #[arg(short, long, default_value = "20")]
        length: usize,
        /// Include punctuation characters
        #[arg(long)]
        symbols: bool,
    },
}

#[derive(Subcommand)]
enum CtfCommands {
    /// List active challenges with your solved markers
    List,

    /// Submit a flag for a challenge
    Submit { challenge_id: String, flag: String },

    /// Show your attempt history for a challenge
    Attempts { challenge_id: String },

    /// Create a challenge (admin)
    Add {
        title: String,
        #[arg(long)]
        description: String,
        #[arg(long, default_value = "misc")]
        category: String,
        #[arg(long, default_value = "easy")]
        difficulty: String,
        #[arg(long)]
        points: i64,
        #[arg(long)]
        flag: String,
        /// May be given multiple times
        #[arg(long = "hint")]
        hints: Vec<String>,
    },

    /// Activate or retire a challenge (admin)
    SetActive {
        challenge_id: String,
        #[arg(long)]
        active: bool,
    },
}

fn data_dir() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("com", "flagvault", "flagvault")
        .ok_or_else(|| anyhow!("cannot determine data directory"))?;
    Ok(dirs.data_dir().to_path_buf())
}

fn token_path() -> Result<PathBuf> {
    Ok(data_dir()?.join("session.token"))
}

fn save_token(token: &str) -> Result<()> {
    let path = token_path()?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, token)?;
    Ok(())
}

fn load_token() -> Result<String> {
    let path = token_path()?;
    let token = fs::read_to_string(&path)
        .map_err(|_| anyhow!("not signed in — run `flagvault login` first"))?;
    Ok(token.trim().to_string())
}

fn clear_token() -> Result<()> {
    let path = token_path()?;
    if path.exists() {
        fs::remove_file(&path)?;
    }
    Ok(())
}

fn prompt_password(prompt: &str) -> Result<String> {
    eprint!("{prompt}: ");
    Ok(rpassword::read_password()?)
}

async fn open_store(db_override: Option<PathBuf>) -> Result<Store> {
    let db_path = match db_override {
        Some(path) => path,
        None => {
            let dir = data_dir()?;
            fs::create_dir_all(&dir)?;
            dir.join("flagvault.db")
        }
    };
    Ok(Store::open(&db_path, VaultSession::new()).await?)
}

async fn current_user(auth: &Auth) -> Result<UserRow> {
    let token = load_token()?;
    Ok(auth.authenticate(&token).await?)
}

/// Prompt for the master passphrase and unlock the vault for this process.
async fn unlock_vault(vault: &VaultService, user_id: &str, auto_lock: Option<u64>) -> Result<()> {
    let passphrase = prompt_password("Master passphrase")?;
    vault.unlock(user_id, &passphrase).await?;
    if let Some(seconds) = auto_lock {
        vault.set_auto_lock_timeout(seconds).await;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flagvault=warn,fv_core=warn,fv_store=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // `vault generate` needs no database or account.
    if let Commands::Vault(VaultCommands::Generate { length, symbols }) = &cli.command {
        let password = fv_crypto::strength::generate_password(*length, *symbols);
        let score = fv_crypto::strength::score(&password);
        println!("{password}");
        eprintln!("strength: {} ({score}/4)", fv_crypto::strength::label(score));
        return Ok(());
    }

    let store = open_store(cli.db.clone()).await?;
    let auth = Auth::new(store.clone());
    let vault = VaultService::new(store.clone());
    let ctf = Ctf::new(store.clone());

    match cli.command {
        Commands::Register { email, name } => {
            let password = prompt_password("Password")?;
            let confirm = prompt_password("Confirm password")?;
            if password != confirm {
                return Err(anyhow!("passwords do not match"));
            }
            let user = auth.sign_up(&email, &password, name.as_deref()).await?;
            println!("registered {} ({})", user.email, user.id);
        }

        Commands::Login { email } => {
            let password = prompt_password("Password")?;
            let token = match auth.sign_in(&email, &password).await? {
                SignIn::Complete { token, .. } => token,
                SignIn::NeedsTwoFactor { pending_token } => {
                    let code = prompt_password("Two-factor code")?;
                    match auth.verify_two_factor(&pending_token, code.trim()).await? {
                        SignIn::Complete { token, .. } => token,
                        SignIn::NeedsTwoFactor { .. } => {
                            return Err(anyhow!("unexpected second two-factor gate"))
                        }
                    }
                }
            };
            save_token(&token)?;
            println!("signed in as {email}");
        }

        Commands::Logout => {
            if let Ok(token) = load_token() {
                auth.sign_out(&token).await?;
            }
            clear_token()?;
            println!("signed out");
        }

        Commands::Whoami => {
            let user = current_user(&auth).await?;
            println!(
                "{} ({}){}",
                user.email,
                user.display_name.as_deref().unwrap_or("no display name"),
                if user.two_factor_enabled { " [2fa]" } else { "" }
            );
        }

        Commands::Twofactor(cmd) => {
            let user = current_user(&auth).await?;
            match cmd {
                TwofactorCommands::Setup => {
                    let secret = auth.setup_two_factor(&user.id).await?;
                    println!("TOTP secret (hex): {secret}");
                    println!("confirm with: flagvault twofactor confirm <code>");
                }
                TwofactorCommands::Confirm { code } => {
                    auth.confirm_two_factor(&user.id, code.trim()).await?;
                    println!("two-factor enabled");
                }
                TwofactorCommands::Disable => {
                    auth.disable_two_factor(&user.id).await?;
                    println!("two-factor disabled");
                }
            }
        }

        Commands::Vault(cmd) => {
            let user = current_user(&auth).await?;
            match cmd {
                VaultCommands::Add { title, url, username, notes, generate } => {
                    unlock_vault(&vault, &user.id, cli.auto_lock).await?;
                    let secret = if generate {
                        let password = fv_crypto::strength::generate_password(20, true);
                        println!("generated secret: {password}");
                        password
                    } else {
                        prompt_password("Secret")?
                    };
                    let row = vault
                        .add_entry(
                            &user.id,
                            EntryInput { title, site_url: url, username, secret, notes },
                        )
                        .await?;
                    println!(
                        "added {} ({}) — strength {}/4",
                        row.title, row.id, row.strength_score
                    );
                }

                VaultCommands::List => {
                    let entries = vault.list_entries(&user.id).await?;
                    if entries.is_empty() {
                        println!("vault is empty");
                    }
                    for e in entries {
                        println!(
                            "{}  {}  {}  [{}]  strength {}/4",
                            e.id,
                            e.title,
                            e.username,
                            e.site_url.as_deref().unwrap_or("-"),
                            e.strength_score
                        );
                    }
                }

                VaultCommands::Show { entry_id } => {
                    unlock_vault(&vault, &user.id, cli.auto_lock).await?;
                    let revealed = vault.reveal_entry(&user.id, &entry_id).await?;
                    println!("title:    {}", revealed.entry.title);
                    println!("username: {}", revealed.entry.username);
                    if let Some(url) = &revealed.entry.site_url {
                        println!("url:      {url}");
                    }
                    println!("secret:   {}", revealed.secret.as_str());
                    if let Some(notes) = &revealed.notes {
                        println!("notes:    {}", notes.as_str());
                    }
                }

                VaultCommands::Rm { entry_id } => {
                    vault.delete_entry(&user.id, &entry_id).await?;
                    println!("deleted {entry_id}");
                }

                VaultCommands::Generate { .. } => unreachable!("handled before store open"),
            }
        }

        Commands::Ctf(cmd) => match cmd {
            CtfCommands::List => {
                let user = current_user(&auth).await?;
                let listing = ctf.browse(&user.id).await?;
                println!("{}", serde_json::to_string_pretty(&listing)?);
            }

            CtfCommands::Submit { challenge_id, flag } => {
                let user = current_user(&auth).await?;
                let record = ctf.submit(&user.id, &challenge_id, &flag).await?;
                if record.is_correct {
                    println!("correct — challenge solved");
                } else {
                    println!("incorrect flag");
                }
            }

            CtfCommands::Attempts { challenge_id } => {
                let user = current_user(&auth).await?;
                let attempts = ctf.attempts(&user.id, &challenge_id).await?;
                for a in attempts {
                    println!(
                        "{}  {}  {}",
                        a.submitted_at.format("%Y-%m-%d %H:%M:%S"),
                        if a.is_correct { "correct" } else { "wrong  " },
                        a.submitted_flag
                    );
                }
            }

            CtfCommands::Add {
                title,
                description,
                category,
                difficulty,
                points,
                flag,
                hints,
            } => {
                let user = current_user(&auth).await?;
                if !user.is_admin {
                    return Err(anyhow!("only admins can create challenges"));
                }
                let difficulty = Difficulty::parse(&difficulty)
                    .ok_or_else(|| anyhow!("difficulty must be easy, medium or hard"))?;
                let row = store
                    .insert_challenge(NewChallenge {
                        title,
                        description,
                        category,
                        difficulty,
                        points,
                        flag,
                        hints,
                        created_by: user.id,
                    })
                    .await?;
                println!("created {} ({})", row.title, row.id);
            }

            CtfCommands::SetActive { challenge_id, active } => {
                let user = current_user(&auth).await?;
                if !user.is_admin {
                    return Err(anyhow!("only admins can retire challenges"));
                }
                store.set_challenge_active(&challenge_id, active).await?;
                println!("{challenge_id}: active = {active}");
            }
        },

        Commands::Leaderboard => {
            let board = ctf.leaderboard().await?;
            if board.is_empty() {
                println!("no solves yet");
            }
            for (rank, entry) in board.iter().enumerate() {
                println!(
                    "{:>3}. {}  {} pts  ({} solved)",
                    rank + 1,
                    entry.display_name,
                    entry.total_points,
                    entry.solved_count
                );
            }
        }
    }

    Ok(())
}
