use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use consent_core::{ConsentAction, ConsentController, ConsentStore, ConsentUpdate, DismissReason};
use shared::domain::ConsentRecord;
use storage::{encode_envelope, set_cookie_line, CookieJar, FileCookieJar};
use tracing_subscriber::EnvFilter;

mod config;

use config::{load_settings, Settings};

#[derive(Parser, Debug)]
#[command(name = "consent", about = "Inspect and change the persisted cookie consent")]
struct Args {
    /// TOML settings file; defaults to ./consent.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Cookie jar file, overriding the configured one.
    #[arg(long)]
    jar: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the current consent record.
    Show,
    /// Banner "Allow Cookies".
    AcceptAll,
    /// Banner "Decline All".
    DeclineAll,
    /// Open the preference modal, apply toggles, then save or dismiss.
    Manage {
        #[arg(long)]
        analytics: Option<Toggle>,
        #[arg(long)]
        marketing: Option<Toggle>,
        /// Close the modal with the cancel key instead of saving.
        #[arg(long)]
        dismiss: bool,
    },
    /// Merge a partial update into the current record.
    Update {
        #[arg(long)]
        analytics: Option<Toggle>,
        #[arg(long)]
        marketing: Option<Toggle>,
    },
    /// Print the Set-Cookie line for the current record.
    Header,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Toggle {
    On,
    Off,
}

impl From<Toggle> for bool {
    fn from(value: Toggle) -> Self {
        matches!(value, Toggle::On)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = load_settings(args.config.as_deref())?;
    if let Some(jar) = args.jar {
        settings.jar_path = jar;
    }
    tracing::debug!(jar = %settings.jar_path.display(), cookie = %settings.cookie_name, "loaded settings");

    let store = ConsentStore::open(
        FileCookieJar::new(&settings.jar_path),
        settings.cookie_name.clone(),
        ConsentRecord::default(),
        settings.cookie.clone(),
    );
    let mut controller = ConsentController::new(store);

    print!("{}", run(args.command, &mut controller, &settings)?);
    Ok(())
}

/// Applies `command` and returns what should be printed.
fn run<J: CookieJar>(
    command: Command,
    controller: &mut ConsentController<J>,
    settings: &Settings,
) -> Result<String> {
    match command {
        Command::Show => {}
        Command::AcceptAll => {
            controller.dispatch(ConsentAction::AcceptAll);
        }
        Command::DeclineAll => {
            controller.dispatch(ConsentAction::DeclineAll);
        }
        Command::Manage {
            analytics,
            marketing,
            dismiss,
        } => {
            controller.dispatch(ConsentAction::ManageCookies);
            if let Some(value) = analytics {
                controller.dispatch(ConsentAction::ToggleAnalytics(value.into()));
            }
            if let Some(value) = marketing {
                controller.dispatch(ConsentAction::ToggleMarketing(value.into()));
            }
            if let Some(modal) = controller.modal() {
                for toggle in &modal.toggles {
                    tracing::debug!(
                        category = toggle.category.label(),
                        enabled = toggle.enabled,
                        locked = toggle.locked,
                        "modal toggle before close"
                    );
                }
            }
            let close = if dismiss {
                ConsentAction::Dismiss(DismissReason::CancelKey)
            } else {
                ConsentAction::Save
            };
            controller.dispatch(close);
        }
        Command::Update {
            analytics,
            marketing,
        } => {
            controller.request_consent_update(ConsentUpdate {
                analytics: analytics.map(bool::from),
                marketing: marketing.map(bool::from),
            });
        }
        Command::Header => {
            let value = encode_envelope(&controller.consent())?;
            let line = set_cookie_line(&settings.cookie_name, &value, &settings.cookie)?;
            return Ok(format!("Set-Cookie: {line}\n"));
        }
    }

    let store = controller.store();
    let report = serde_json::json!({
        "cookie": store.key(),
        "persisted": store.is_persisted(),
        "consent": store.consent(),
    });
    Ok(format!("{}\n", serde_json::to_string_pretty(&report)?))
}
