use std::{path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use client_core::{
    router::{CitizenDesk, FieldDesk, OfficialDesk},
    CityFlowClient, ClientError, ComplaintList, Desk, OfficialFilter, PasswordReset, PhotoUpload,
    Registration, RoleRouter,
};
use shared::{
    domain::{AssignmentId, CategoryId, ComplaintId, ComplaintStatus, FeedSort, GeoPoint, PhotoId, UserId},
    protocol::{ComplaintDraft, ProfileUpdate},
};
use storage::Storage;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod render;

use config::{load_settings, DEFAULT_CONFIG_PATH};

#[derive(Parser, Debug)]
#[command(name = "cityflow", about = "Municipal complaint reporting client")]
struct Cli {
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    /// Overrides `base_url` from the config file and environment.
    #[arg(long)]
    base_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    Logout,
    Whoami,
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    ForgotPassword {
        #[arg(long)]
        email: String,
    },
    ResetPassword {
        #[arg(long)]
        token: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        confirm: String,
    },
    /// Fills in profile details; citizens need national id, birth date and
    /// phone before they can file complaints.
    Profile {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        national_id: Option<String>,
        /// YYYY-MM-DD
        #[arg(long)]
        birth_date: Option<NaiveDate>,
        #[arg(long)]
        phone: Option<String>,
    },
    Categories,
    Feed {
        #[arg(long, value_enum, default_value_t = SortArg::Newest)]
        sort: SortArg,
        #[arg(long, requires = "lon")]
        lat: Option<f64>,
        #[arg(long, requires = "lat")]
        lon: Option<f64>,
    },
    Mine,
    Submit {
        #[arg(long, default_value = "")]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        category: Option<i64>,
        #[arg(long)]
        lat: Option<f64>,
        #[arg(long)]
        lon: Option<f64>,
        #[arg(long)]
        anonymous: bool,
        #[arg(long = "photo")]
        photos: Vec<PathBuf>,
    },
    Support {
        complaint_id: i64,
    },
    Delete {
        complaint_id: i64,
    },
    DeletePhoto {
        photo_id: i64,
    },
    Inbox {
        #[arg(long, value_enum)]
        status: Option<StatusArg>,
        #[arg(long)]
        category: Option<i64>,
    },
    Reject {
        complaint_id: i64,
        #[arg(long, default_value = "")]
        reason: String,
    },
    Roster,
    Assign {
        complaint_id: i64,
        #[arg(long)]
        employee: i64,
    },
    Jobs,
    Completed,
    Start {
        assignment_id: i64,
    },
    Solve {
        assignment_id: i64,
        #[arg(long = "photo")]
        photos: Vec<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum SortArg {
    Newest,
    Popular,
    Nearby,
}

impl From<SortArg> for FeedSort {
    fn from(sort: SortArg) -> Self {
        match sort {
            SortArg::Newest => FeedSort::Newest,
            SortArg::Popular => FeedSort::Popular,
            SortArg::Nearby => FeedSort::Nearby,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum StatusArg {
    Pending,
    Assigned,
    InProgress,
    Resolved,
    Rejected,
}

impl From<StatusArg> for ComplaintStatus {
    fn from(status: StatusArg) -> Self {
        match status {
            StatusArg::Pending => ComplaintStatus::Pending,
            StatusArg::Assigned => ComplaintStatus::Assigned,
            StatusArg::InProgress => ComplaintStatus::InProgress,
            StatusArg::Resolved => ComplaintStatus::Resolved,
            StatusArg::Rejected => ComplaintStatus::Rejected,
        }
    }
}

impl Command {
    /// Dialog text for failures whose response carried no message.
    fn fallback_message(&self) -> &'static str {
        match self {
            Command::Login { .. } => "Login failed.",
            Command::Register { .. } => "Registration failed.",
            Command::ForgotPassword { .. } => "Could not send the reset e-mail.",
            Command::ResetPassword { .. } => "Could not reset the password.",
            Command::Profile { .. } => "Profile could not be updated.",
            Command::Submit { .. } => "Complaint could not be created.",
            Command::Support { .. } => "Support could not be updated.",
            Command::Delete { .. } | Command::DeletePhoto { .. } => "Delete failed.",
            Command::Reject { .. } => "Complaint could not be rejected.",
            Command::Assign { .. } => "Assignment failed.",
            Command::Start { .. } => "Job could not be started.",
            Command::Solve { .. } => "Solution photos could not be uploaded.",
            _ => "Request failed.",
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let mut settings = load_settings(&cli.config);
    if let Some(base_url) = cli.base_url.clone() {
        settings.base_url = base_url;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let fallback = cli.command.fallback_message();
    match run(cli.command, &settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<ClientError>() {
                Some(client_err) => eprintln!("{}", client_err.user_message(fallback)),
                None => eprintln!("{err:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command, settings: &config::Settings) -> Result<()> {
    let database_url = settings.session_database_url();
    let storage = Storage::new(&database_url).await?;
    info!(base_url = %settings.base_url, session_db = %database_url, "cityflow: starting");

    let client = CityFlowClient::connect(settings.client_config()?, Arc::new(storage)).await?;

    match command {
        Command::Login { email, password } => {
            let session = client.login(&email, &password).await?;
            match session.user {
                Some(user) => println!("logged in as {} ({})", user.email, user.role),
                None => println!("logged in"),
            }
        }
        Command::Logout => {
            client.logout().await?;
            println!("logged out");
        }
        Command::Whoami => match client.session().current_user() {
            Some(user) => {
                let surface = RoleRouter::route(user.role);
                println!("{}", render::user_summary(&user, &surface));
            }
            None => println!(
                "not logged in (entry screen {:?})",
                RoleRouter::entry_screen(None)
            ),
        },
        Command::Register {
            name,
            email,
            password,
        } => {
            client
                .auth()
                .register(&Registration {
                    name,
                    email,
                    password,
                })
                .await?;
            println!("registered; you can log in now");
        }
        Command::ForgotPassword { email } => {
            client.auth().forgot_password(&email).await?;
            println!("if the address is known, a reset link is on its way");
        }
        Command::ResetPassword {
            token,
            password,
            confirm,
        } => {
            client
                .auth()
                .reset_password(&PasswordReset {
                    token,
                    new_password: password,
                    confirm_password: confirm,
                })
                .await?;
            println!("password updated");
        }
        Command::Profile {
            name,
            national_id,
            birth_date,
            phone,
        } => {
            let user = client
                .auth()
                .update_profile(&ProfileUpdate {
                    full_name: name,
                    national_id,
                    birth_date,
                    phone_number: phone,
                })
                .await?;
            println!("{}", render::profile_line(&user));
        }
        Command::Categories => {
            for category in citizen_desk(&client)?.categories().await? {
                println!("{}", render::category_line(&category));
            }
        }
        Command::Feed { sort, lat, lon } => {
            let origin = lat.zip(lon).map(|(lat, lon)| GeoPoint::new(lat, lon));
            let feed = citizen_desk(&client)?.feed(sort.into(), origin).await?;
            print_complaints(&feed);
        }
        Command::Mine => {
            let mine = citizen_desk(&client)?.my_complaints().await?;
            print_complaints(&mine);
        }
        Command::Submit {
            title,
            description,
            category,
            lat,
            lon,
            anonymous,
            photos,
        } => {
            let desk = citizen_desk(&client)?;
            let draft = ComplaintDraft {
                title,
                description,
                category_id: category.map(CategoryId),
                location: lat.zip(lon).map(|(lat, lon)| GeoPoint::new(lat, lon)),
                is_anonymous: anonymous,
            };
            let files = read_uploads(&photos).await?;
            let submitted = desk.submit(&draft, files).await?;
            println!("{}", render::complaint_line(&submitted.complaint));
            println!("{}", render::photo_summary(&submitted.photos));
        }
        Command::Support { complaint_id } => {
            let desk = citizen_desk(&client)?;
            let mut feed = desk.feed(FeedSort::Newest, None).await?;
            let outcome = desk
                .toggle_support(&mut feed, ComplaintId(complaint_id))
                .await?;
            println!(
                "support {:?}: now {}",
                outcome.status, outcome.support_count
            );
        }
        Command::Delete { complaint_id } => {
            let desk = citizen_desk(&client)?;
            let mut mine = desk.my_complaints().await?;
            desk.delete(&mut mine, ComplaintId(complaint_id)).await?;
            println!("deleted complaint #{complaint_id}; {} left", mine.len());
        }
        Command::DeletePhoto { photo_id } => {
            let desk = citizen_desk(&client)?;
            let mut mine = desk.my_complaints().await?;
            desk.delete_photo(&mut mine, PhotoId(photo_id)).await?;
            println!("deleted photo #{photo_id}");
        }
        Command::Inbox { status, category } => {
            let filter = OfficialFilter {
                status: status.map(Into::into),
                category_id: category.map(CategoryId),
            };
            let inbox = official_desk(&client)?.inbox(filter).await?;
            print_complaints(&inbox);
        }
        Command::Reject {
            complaint_id,
            reason,
        } => {
            let desk = official_desk(&client)?;
            let current = desk.complaint(ComplaintId(complaint_id)).await?;
            let mut list = ComplaintList::from(vec![current.clone()]);
            let updated = desk.reject(&mut list, &current, &reason).await?;
            println!("{}", render::complaint_line(&updated));
        }
        Command::Roster => {
            let roster = official_desk(&client)?.roster().await?;
            if roster.is_empty() {
                println!("no active employees");
            }
            for worker in roster.workers() {
                println!("{}", render::worker_line(worker));
            }
        }
        Command::Assign {
            complaint_id,
            employee,
        } => {
            let desk = official_desk(&client)?;
            let current = desk.complaint(ComplaintId(complaint_id)).await?;
            let roster = desk.roster().await?;
            let mut list = ComplaintList::from(vec![current.clone()]);
            let updated = desk
                .assign(&mut list, &current, &roster, UserId(employee))
                .await?;
            println!("{}", render::complaint_line(&updated));
        }
        Command::Jobs => {
            for job in field_desk(&client)?.assigned().await? {
                println!("{}", render::assignment_line(&job));
            }
        }
        Command::Completed => {
            for job in field_desk(&client)?.completed().await? {
                println!("{}", render::assignment_line(&job));
            }
        }
        Command::Start { assignment_id } => {
            let desk = field_desk(&client)?;
            let mut job = desk.assignment(AssignmentId(assignment_id)).await?;
            desk.start(&mut job).await?;
            println!("{}", render::assignment_line(&job));
        }
        Command::Solve {
            assignment_id,
            photos,
        } => {
            let desk = field_desk(&client)?;
            let mut job = desk.assignment(AssignmentId(assignment_id)).await?;
            let files = read_uploads(&photos).await?;
            desk.submit_solution(&mut job, files).await?;
            println!("{}", render::assignment_line(&job));
        }
    }

    Ok(())
}

fn print_complaints(list: &ComplaintList) {
    if list.is_empty() {
        println!("no complaints");
    }
    for complaint in list.items() {
        println!("{}", render::complaint_line(complaint));
    }
}

fn logged_in_desk(client: &CityFlowClient) -> Result<Desk> {
    client
        .desk()
        .context("not logged in; run `cityflow login` first")
}

fn citizen_desk(client: &CityFlowClient) -> Result<CitizenDesk> {
    match logged_in_desk(client)? {
        Desk::Citizen(desk) => Ok(desk),
        other => bail!("{} accounts cannot use citizen commands", other.role()),
    }
}

fn field_desk(client: &CityFlowClient) -> Result<FieldDesk> {
    match logged_in_desk(client)? {
        Desk::Employee(desk) => Ok(desk),
        other => bail!("{} accounts cannot use employee commands", other.role()),
    }
}

fn official_desk(client: &CityFlowClient) -> Result<OfficialDesk> {
    match logged_in_desk(client)? {
        Desk::Official(desk) | Desk::Admin(desk) => Ok(desk),
        other => bail!("{} accounts cannot use official commands", other.role()),
    }
}

async fn read_uploads(paths: &[PathBuf]) -> Result<Vec<PhotoUpload>> {
    let mut uploads = Vec::with_capacity(paths.len());
    for path in paths {
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("photo.jpg")
            .to_string();
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read photo '{}'", path.display()))?;
        let mime_type = mime_guess::from_path(path).first_raw().map(str::to_string);
        uploads.push(PhotoUpload::new(filename, mime_type, bytes));
    }
    Ok(uploads)
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
