use anyhow::{bail, Context};
use blogpress::{
    config::AppConfig,
    db,
    repositories::{
        SqliteSubscriberRepository, SqliteUserRepository, SubscriberRepository, UserRepository,
    },
    services::{validation, Argon2PasswordHasher, OtpStore, PasswordHasher, SqliteOtpStore},
};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "blogpress-cli")]
#[command(about = "CLI tool for administering a Blogpress database", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// User management commands
    User {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// Subscriber list commands
    Subscriber {
        #[command(subcommand)]
        command: SubscriberCommands,
    },

    /// OTP store maintenance
    Otp {
        #[command(subcommand)]
        command: OtpCommands,
    },
}

#[derive(Subcommand)]
enum UserCommands {
    /// List all users
    List {
        /// Maximum number of users to display
        #[arg(short, long, default_value_t = 100)]
        limit: i64,

        /// Offset for pagination
        #[arg(short = 'o', long, default_value_t = 0)]
        offset: i64,
    },

    /// Set a new password for a user
    SetPassword {
        /// Email address of the user
        #[arg(short, long)]
        email: String,

        /// New password (will prompt if not provided)
        #[arg(short, long)]
        password: Option<String>,
    },
}

#[derive(Subcommand)]
enum SubscriberCommands {
    /// List every subscriber, active or not
    List,
}

#[derive(Subcommand)]
enum OtpCommands {
    /// Delete expired codes from the SQLite OTP store
    PurgeExpired,
}

fn get_password(prompt: &str) -> anyhow::Result<String> {
    use std::io::{self, Write};
    print!("{}: ", prompt);
    io::stdout().flush()?;

    Ok(rpassword::read_password()?)
}

fn confirm_password(prompt: &str) -> anyhow::Result<String> {
    let password = get_password(prompt)?;
    let confirm = get_password("Confirm password")?;
    if password != confirm {
        bail!("Passwords do not match");
    }
    Ok(password)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = AppConfig::from_env();

    // Connect to database
    let pool = db::create_pool(&config.database_url)
        .await
        .with_context(|| format!("Failed to open {}", config.database_url))?;

    // Run migrations
    db::run_migrations(&pool).await?;

    match cli.command {
        Commands::User { command } => {
            let users = SqliteUserRepository::new(pool.clone());
            match command {
                UserCommands::List { limit, offset } => {
                    let list = users.list_users(Some(limit), Some(offset)).await?;
                    if list.is_empty() {
                        println!("No users found.");
                    } else {
                        println!(
                            "{:<38} {:<24} {:<36} {:<20}",
                            "ID", "Username", "Email", "Created"
                        );
                        println!("{}", "-".repeat(120));
                        for user in list {
                            println!(
                                "{:<38} {:<24} {:<36} {:<20}",
                                user.audit.id,
                                user.username,
                                user.email,
                                user.audit.created_at.format("%Y-%m-%d %H:%M:%S")
                            );
                        }
                    }
                }

                UserCommands::SetPassword { email, password } => {
                    let email = validation::normalize_email(&email)
                        .with_context(|| format!("'{}' is not a valid email", email))?;
                    let Some(user) = users.find_by_email(&email).await? else {
                        bail!("User '{}' not found", email);
                    };

                    let new_password = match password {
                        Some(pw) => pw,
                        None => confirm_password("New password")?,
                    };
                    let new_password = new_password.trim();
                    if !validation::is_strong_enough(new_password) {
                        bail!(
                            "Password must be at least {} characters",
                            validation::MIN_PASSWORD_LEN
                        );
                    }

                    let hash = Argon2PasswordHasher.hash(new_password)?;
                    users.update_password(&user.audit.id, &hash).await?;
                    println!("✅ Password updated successfully for '{}'!", email);
                }
            }
        }

        Commands::Subscriber {
            command: SubscriberCommands::List,
        } => {
            let subscribers = SqliteSubscriberRepository::new(pool.clone())
                .list_all()
                .await?;
            if subscribers.is_empty() {
                println!("No subscribers found.");
            } else {
                println!("{:<40} {:<8} {:<20}", "Email", "Active", "Since");
                println!("{}", "-".repeat(70));
                for subscriber in subscribers {
                    println!(
                        "{:<40} {:<8} {:<20}",
                        subscriber.email,
                        if subscriber.active { "Yes" } else { "No" },
                        subscriber.audit.created_at.format("%Y-%m-%d %H:%M:%S")
                    );
                }
            }
        }

        Commands::Otp {
            command: OtpCommands::PurgeExpired,
        } => {
            let purged = SqliteOtpStore::new(pool.clone())
                .purge_expired(chrono::Utc::now())
                .await?;
            println!("Purged {} expired OTP record(s)", purged);
        }
    }

    Ok(())
}
