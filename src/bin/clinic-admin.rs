use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use std::sync::Arc;

use clinic_site::admin::AdminPanel;
use clinic_site::binding::{Direction, ResourceBinding};
use clinic_site::gateway::supabase::SupabaseGateway;
use clinic_site::gateway::{Gateway, RowId};
use clinic_site::models::{AppointmentStatus, Resource};
use clinic_site::ClinicConfig;

#[derive(Parser)]
#[command(name = "clinic-admin", version, about = "Manage clinic site content from the terminal")]
struct Cli {
    #[arg(long, env = "CLINIC_ADMIN_EMAIL", global = true)]
    email: Option<String>,

    #[arg(long, env = "CLINIC_ADMIN_PASSWORD", hide_env_values = true, global = true)]
    password: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum Table {
    Services,
    Doctors,
    Blog,
    Faqs,
    Appointments,
    Messages,
    Settings,
}

#[derive(Clone, Copy, ValueEnum)]
enum Move {
    Up,
    Down,
}

#[derive(Subcommand)]
enum Command {
    /// Row counts per table
    Dashboard,
    /// Print every row of a table
    List { table: Table },
    /// Move a service, doctor or FAQ one place up or down
    Reorder { table: Table, id: String, direction: Move },
    /// Set an appointment's status
    Status { id: String, status: String },
    Delete { table: Table, id: String },
    /// Add a clinic setting, or change its value if the key exists
    Setting { key: String, value: String },
    /// Print the row count of a table every time it changes
    Watch { table: Table },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    pretty_env_logger::init();

    let cli = Cli::parse();
    let config = ClinicConfig::from_env().context("missing Supabase configuration")?;
    let options = config.options.clone();
    let gateway = SupabaseGateway::new(config);

    if let (Some(email), Some(password)) = (&cli.email, &cli.password) {
        let session = gateway.auth().sign_in_with_password(email, password).await?;
        info!("signed in as {}", session.user.email.as_deref().unwrap_or(email));
    }

    let guard = Arc::new(gateway.auth().clone());
    let gateway: Arc<dyn Gateway> = Arc::new(gateway);
    let panel = AdminPanel::with_options(gateway, guard, &options);

    match cli.command {
        Command::Dashboard => {
            for card in panel.dashboard.load().await.cards {
                match card.count {
                    Ok(n) => println!("{:<14} {}", card.title, n),
                    Err(e) => println!("{:<14} unavailable ({})", card.title, e),
                }
            }
        }
        Command::List { table } => list(&panel, table).await?,
        Command::Reorder {
            table,
            id,
            direction,
        } => {
            let id = RowId::parse(&id);
            let direction = match direction {
                Move::Up => Direction::Up,
                Move::Down => Direction::Down,
            };
            let moved = match table {
                Table::Services => {
                    panel.services.load().await?;
                    panel.services.reorder(&id, direction).await?
                }
                Table::Doctors => {
                    panel.doctors.load().await?;
                    panel.doctors.reorder(&id, direction).await?
                }
                Table::Faqs => {
                    panel.faqs.load().await?;
                    panel.faqs.reorder(&id, direction).await?
                }
                _ => bail!("this table has no display order"),
            };
            if !moved {
                println!("{} is already at the edge", id);
            }
        }
        Command::Status { id, status } => {
            let status: AppointmentStatus = status.parse()?;
            panel.appointments.load().await?;
            panel
                .appointments
                .set_status(&RowId::parse(&id), status)
                .await?;
        }
        Command::Delete { table, id } => {
            let id = RowId::parse(&id);
            match table {
                Table::Services => panel.services.delete(&id).await?,
                Table::Doctors => panel.doctors.delete(&id).await?,
                Table::Blog => panel.blog.delete(&id).await?,
                Table::Faqs => panel.faqs.delete(&id).await?,
                Table::Appointments => panel.appointments.delete(&id).await?,
                Table::Messages => panel.messages.delete(&id).await?,
                Table::Settings => panel.settings.delete(&id).await?,
            }
        }
        Command::Setting { key, value } => {
            panel.settings.load().await?;
            match panel.settings.find(key.trim()).await {
                Some(existing) => panel.settings.set_value(&existing.id, &value).await?,
                None => panel.settings.add(&key, &value).await?,
            }
        }
        Command::Watch { table } => match table {
            Table::Services => watch(&panel.services.binding).await?,
            Table::Doctors => watch(&panel.doctors.binding).await?,
            Table::Blog => watch(&panel.blog.binding).await?,
            Table::Faqs => watch(&panel.faqs.binding).await?,
            Table::Appointments => watch(&panel.appointments.binding).await?,
            Table::Messages => watch(&panel.messages.binding).await?,
            Table::Settings => watch(&panel.settings.binding).await?,
        },
    }

    panel.close();
    Ok(())
}

/// Prints a line per change until interrupted
async fn watch<R: Resource>(binding: &ResourceBinding<R>) -> anyhow::Result<()> {
    let initial = binding.load().await?;
    println!("{}: {} row(s)", R::TABLE, initial.len());
    let live = binding
        .subscribe(|rows: Vec<R>| println!("{}: {} row(s)", R::TABLE, rows.len()))
        .await?;
    tokio::signal::ctrl_c().await?;
    live.close().await;
    Ok(())
}

async fn list(panel: &AdminPanel, table: Table) -> anyhow::Result<()> {
    match table {
        Table::Services => {
            for s in panel.services.load().await? {
                println!("{:>4} {:>3} {} [{}]", s.id, s.display_order, s.title, active(s.is_active));
            }
        }
        Table::Doctors => {
            for d in panel.doctors.load().await? {
                println!("{:>4} {:>3} {} [{}]", d.id, d.display_order, d.name, active(d.is_active));
            }
        }
        Table::Blog => {
            for p in panel.blog.load().await? {
                let state = if p.is_published { "published" } else { "draft" };
                println!("{:>4} {} [{}]", p.id, p.title, state);
            }
        }
        Table::Faqs => {
            for f in panel.faqs.load().await? {
                println!("{:>4} {:>3} {} [{}]", f.id, f.display_order, f.question, active(f.is_active));
            }
        }
        Table::Appointments => {
            for a in panel.appointments.load().await? {
                println!(
                    "{:>4} {} {} {} <{}> [{}]",
                    a.id, a.preferred_date, a.preferred_time, a.patient_name, a.patient_email, a.status
                );
            }
        }
        Table::Messages => {
            for m in panel.messages.load().await? {
                println!("{:>4} {} <{}>: {}", m.id, m.name, m.email, m.message);
            }
        }
        Table::Settings => {
            for s in panel.settings.load().await? {
                println!("{:>4} {} = {}", s.id, s.key, s.value);
            }
        }
    }
    Ok(())
}

fn active(flag: bool) -> &'static str {
    if flag {
        "active"
    } else {
        "hidden"
    }
}
