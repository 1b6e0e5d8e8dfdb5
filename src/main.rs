mod api;
mod config;
mod contribute;
mod engine;
mod format;
mod ingest;
mod models;
mod session;
mod store;
mod tui;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use api::SearchQuery;
use config::{Config, ConfigArgs};
use contribute::ContributionForm;
use engine::{Facet, PagingMode, SalaryFilterEngine, SortKey};
use models::SalaryRecord;

#[derive(Parser)]
#[command(name = "payscope")]
#[command(about = "Browse, filter, and share salary reports")]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List salaries
    Salaries {
        /// Exact designation ("ALL" for every designation)
        #[arg(short, long)]
        designation: Option<String>,

        /// Narrow the designation list shown in the summary
        #[arg(short, long)]
        search: Option<String>,

        /// Exact-match filter, e.g. location=Dhaka (repeatable)
        #[arg(short, long = "filter", value_name = "FIELD=VALUE", value_parser = parse_filter)]
        filters: Vec<(Facet, String)>,

        /// Sort order (newest, oldest, salary-high, salary-low)
        #[arg(long, default_value = "newest")]
        sort: SortKey,

        /// Page number
        #[arg(short, long, default_value = "1")]
        page: usize,
    },

    /// List distinct designations
    Designations {
        /// Case-insensitive substring to narrow by
        #[arg(short, long)]
        search: Option<String>,
    },

    /// List the distinct values of a filter field
    Facets {
        /// Field name (experience, location, department, ...)
        field: Facet,
    },

    /// Server-side search by designation
    Search {
        /// Designation to search for
        designation: String,

        #[arg(long)]
        experience: Option<String>,

        #[arg(long)]
        department: Option<String>,

        #[arg(long)]
        location: Option<String>,

        #[arg(long)]
        employment_type: Option<String>,
    },

    /// Read salary stories (requires login)
    Stories {
        /// Match designation or company name
        #[arg(short, long)]
        search: Option<String>,

        /// Years of experience
        #[arg(short, long)]
        experience: Option<String>,

        #[arg(short, long)]
        location: Option<String>,

        /// Sort order (newest, oldest, salary-high, salary-low)
        #[arg(long, default_value = "newest")]
        sort: SortKey,

        /// Page number
        #[arg(short, long, default_value = "1")]
        page: usize,
    },

    /// Interactive salary browser
    Browse,

    /// Share your salary story (requires login)
    Contribute(ContributeArgs),

    /// Log in and store the session token
    Login {
        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        password: String,
    },

    /// Create an account
    Register {
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        password: String,
    },

    /// Forget the stored session token
    Logout,

    /// Show the logged-in profile
    Whoami,
}

#[derive(clap::Args)]
struct ContributeArgs {
    #[arg(long)]
    company: String,

    #[arg(long)]
    designation: String,

    #[arg(long)]
    location: String,

    /// Entry, Mid, Senior, Lead or Manager
    #[arg(long)]
    level: String,

    /// Years of experience (0-15)
    #[arg(long)]
    experience: String,

    /// Total monthly salary in BDT
    #[arg(long)]
    salary: String,

    /// Year the salary applies to
    #[arg(long)]
    year: String,

    /// Minimum yearly increment, in percent
    #[arg(long)]
    increment: Option<String>,

    /// Male, Female, Other or "Prefer not to say"
    #[arg(long)]
    gender: String,

    /// Full-time, Part-time, Contract or Internship
    #[arg(long)]
    employment_type: String,

    #[arg(long)]
    department: Option<String>,

    /// Story title
    #[arg(long)]
    title: Option<String>,

    /// Story text
    #[arg(long)]
    story: Option<String>,

    /// Show your name instead of "Anonymous"
    #[arg(long)]
    public: bool,
}

impl From<ContributeArgs> for ContributionForm {
    fn from(args: ContributeArgs) -> Self {
        Self {
            company_name: args.company,
            designation: args.designation,
            location: args.location,
            experience_level: args.level,
            experience: args.experience,
            total_monthly: args.salary,
            which_years_salary: args.year,
            minimum_increment: args.increment,
            gender: args.gender,
            employment_type: args.employment_type,
            department: args.department,
            story_title: args.title,
            story_description: args.story,
            is_anonymous: !args.public,
        }
    }
}

fn parse_filter(s: &str) -> Result<(Facet, String), String> {
    let (field, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected FIELD=VALUE, got '{s}'"))?;
    let facet = field.parse::<Facet>().map_err(|e| e.to_string())?;
    let value = value.trim();
    if value.is_empty() {
        return Err(format!("empty value for '{}'", facet.name()));
    }
    Ok((facet, value.to_string()))
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let config = Config::from(cli.config);
    let api = config.api().context("Failed to set up the API client")?;

    match cli.command {
        Commands::Salaries {
            designation,
            search,
            filters,
            sort,
            page,
        } => {
            let records = api.list_salaries().context("Failed to fetch salaries")?;
            let mut engine =
                SalaryFilterEngine::new(PagingMode::Pages, config.page_size_for(PagingMode::Pages))
                    .with_records(records);
            if let Some(designation) = designation {
                engine.set_designation(designation);
            }
            if let Some(search) = search {
                engine.set_search_term(search);
            }
            for (facet, value) in &filters {
                engine.set_facet_filter(*facet, Some(value.as_str()));
            }
            engine.set_sort(sort);
            engine.set_page(page);

            print_table(&engine.visible_records(), true);
            print_page_footer(&engine);

            let summary = engine.summary();
            if let (Some(min), Some(max), Some(average)) = (summary.min, summary.max, summary.average) {
                println!(
                    "Disclosed: {} of {}  min {}  avg {}  max {}",
                    summary.disclosed,
                    summary.matches,
                    format::money(min),
                    format::money(average),
                    format::money(max)
                );
            }
            if !engine.search_term().trim().is_empty() {
                let options = engine.derived_designation_options(false);
                println!("Designations matching '{}': {}", engine.search_term(), options.join(", "));
            }
        }

        Commands::Designations { search } => {
            let records = api.list_salaries().context("Failed to fetch salaries")?;
            let mut engine = SalaryFilterEngine::new(PagingMode::Pages, 1).with_records(records);
            if let Some(search) = search {
                engine.set_search_term(search);
            }
            let options = engine.derived_designation_options(false);
            if options.is_empty() {
                println!("No designations found.");
            }
            for option in options {
                println!("{}", option);
            }
        }

        Commands::Facets { field } => {
            let records = api.list_salaries().context("Failed to fetch salaries")?;
            let engine = SalaryFilterEngine::new(PagingMode::Pages, 1).with_records(records);
            let options = engine.derived_facet_options(field);
            if options.is_empty() {
                println!("No values for {}.", field.label());
            }
            for value in options {
                println!("{}", format::option_label(field, &value));
            }
        }

        Commands::Search {
            designation,
            experience,
            department,
            location,
            employment_type,
        } => {
            let query = SearchQuery::new(&designation)?
                .experience(experience)
                .department(department)
                .location(location)
                .employment_type(employment_type);
            let records = api.search(&query).context("Search failed")?;
            let show_pay = config.session()?.is_logged_in()?;
            let rows: Vec<&SalaryRecord> = records.iter().collect();
            print_table(&rows, show_pay);
            println!("\n{} result(s)", rows.len());
            if !show_pay && !rows.is_empty() {
                println!("Run `payscope login` to see salaries.");
            }

            for (facet, options) in result_options(records) {
                if options.is_empty() {
                    continue;
                }
                let labels: Vec<String> = options
                    .iter()
                    .map(|value| format::option_label(facet, value))
                    .collect();
                println!("{}: {}", facet.label(), labels.join(", "));
            }
        }

        Commands::Stories {
            search,
            experience,
            location,
            sort,
            page,
        } => {
            let session = config.session()?;
            let stories = api.stories(&session).context("Failed to fetch stories")?;
            let mut engine =
                SalaryFilterEngine::new(PagingMode::Pages, config.page_size_for(PagingMode::Pages))
                    .with_records(stories);
            if let Some(search) = search {
                engine.set_keyword(search);
            }
            engine.set_facet_filter(Facet::Experience, experience.as_deref());
            engine.set_facet_filter(Facet::Location, location.as_deref());
            engine.set_sort(sort);
            engine.set_page(page);

            let visible = engine.visible_records();
            if visible.is_empty() {
                println!("No stories found.");
            }
            for record in visible {
                print_story(record);
            }
            print_page_footer(&engine);
        }

        Commands::Browse => {
            tui::run_browse(&api, config.page_size_for(PagingMode::Window))?;
        }

        Commands::Contribute(args) => {
            let story = ContributionForm::from(args)
                .validate()
                .context("Submission not sent")?;
            let session = config.session()?;
            let reply = api
                .create_salary(&session, &story)
                .context("Failed to submit salary story")?;
            println!(
                "{}",
                reply.message.as_deref().unwrap_or("Salary story submitted.")
            );
        }

        Commands::Login { email, password } => {
            let token = api.login(&email, &password).context("Login failed")?;
            let session = config.session()?;
            session.sign_in(&token)?;
            println!("Logged in as {}.", email);
        }

        Commands::Register {
            name,
            email,
            password,
        } => {
            let reply = api
                .register(&name, &email, &password)
                .context("Register failed")?;
            if reply.success == Some(false) {
                bail!(
                    "{}",
                    reply.message.as_deref().unwrap_or("Register failed")
                );
            }
            println!(
                "{}",
                reply.message.as_deref().unwrap_or("Account created. You can now log in.")
            );
        }

        Commands::Logout => {
            config.session()?.sign_out()?;
            println!("Logged out.");
        }

        Commands::Whoami => {
            let session = config.session()?;
            if !session.is_logged_in()? {
                println!("Not logged in.");
                return Ok(());
            }
            let profile = api.profile(&session).context("Failed to load profile")?;
            println!("Name:  {}", profile.name.as_deref().unwrap_or("-"));
            println!("Email: {}", profile.email.as_deref().unwrap_or("-"));
            if let Some(role) = &profile.role {
                println!("Role:  {}", role);
            }
        }
    }

    Ok(())
}

/// Refinements offered under search results.
const SEARCH_FACETS: [Facet; 4] = [
    Facet::ExperienceLevel,
    Facet::Department,
    Facet::Location,
    Facet::EmploymentType,
];

/// Distinct values of each search facet found in the results.
fn result_options(records: Vec<SalaryRecord>) -> Vec<(Facet, Vec<String>)> {
    let engine = SalaryFilterEngine::new(PagingMode::Pages, 1).with_records(records);
    SEARCH_FACETS
        .into_iter()
        .map(|facet| (facet, engine.derived_facet_options(facet)))
        .collect()
}

fn pay_cell(record: &SalaryRecord, show_pay: bool) -> String {
    if show_pay {
        format::monthly(record.total_monthly)
    } else {
        "login to view".to_string()
    }
}

fn print_table(records: &[&SalaryRecord], show_pay: bool) {
    if records.is_empty() {
        println!("No salaries found.");
        return;
    }
    println!(
        "{:<26} {:<20} {:<12} {:<10} {:>14}",
        "DESIGNATION", "COMPANY", "LOCATION", "EXPERIENCE", "MONTHLY"
    );
    println!("{}", "-".repeat(86));
    for record in records {
        let experience = record
            .experience
            .map(|y| format::experience_label(&y.to_string()))
            .or_else(|| record.experience_level.map(|l| l.as_str().to_string()))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<26} {:<20} {:<12} {:<10} {:>14}",
            format::truncate(record.designation.as_deref().unwrap_or("-"), 24),
            format::truncate(record.company_name.as_deref().unwrap_or("-"), 18),
            format::truncate(record.location.as_deref().unwrap_or("-"), 10),
            experience,
            pay_cell(record, show_pay)
        );
    }
}

fn print_page_footer(engine: &SalaryFilterEngine) {
    println!(
        "\nPage {} of {} ({} match{}, sorted by {})",
        engine.current_page(),
        engine.total_pages().max(1),
        engine.total_match_count(),
        if engine.total_match_count() == 1 { "" } else { "es" },
        engine.sort_key().label()
    );
}

fn print_story(record: &SalaryRecord) {
    let story = record.story.clone().unwrap_or_default();
    println!(
        "{}",
        story.title.as_deref().unwrap_or("Untitled story")
    );
    println!(
        "{} at {} | {} | {}",
        record.designation.as_deref().unwrap_or("-"),
        record.company_name.as_deref().unwrap_or("-"),
        format::monthly(record.total_monthly),
        record.display_author()
    );
    if let Some(description) = &story.description {
        for line in textwrap::fill(description, 76).lines() {
            println!("  {}", line);
        }
    }
    if !story.pros.is_empty() {
        println!("  Pros: {}", story.pros.join(", "));
    }
    if !story.cons.is_empty() {
        println!("  Cons: {}", story.cons.join(", "));
    }
    println!("  Shared {}", format::date(record.created_at));
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use rstest::rstest;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[rstest]
    #[case("location=Dhaka", Facet::Location, "Dhaka")]
    #[case("employment-type=Full-time", Facet::EmploymentType, "Full-time")]
    #[case("experience= 3 ", Facet::Experience, "3")]
    fn test_parse_filter_accepts(#[case] input: &str, #[case] facet: Facet, #[case] value: &str) {
        assert_eq!(parse_filter(input), Ok((facet, value.to_string())));
    }

    #[rstest]
    #[case("location")]
    #[case("salary=100")]
    #[case("location=")]
    fn test_parse_filter_rejects(#[case] input: &str) {
        assert!(parse_filter(input).is_err());
    }

    #[test]
    fn test_pay_hidden_when_logged_out() {
        let mut record = SalaryRecord::bare("1");
        record.total_monthly = Some(45000);
        assert_eq!(pay_cell(&record, true), "৳45,000");
        assert_eq!(pay_cell(&record, false), "login to view");

        record.total_monthly = None;
        assert_eq!(pay_cell(&record, true), "not disclosed");
    }

    #[test]
    fn test_result_options_come_from_results() {
        let mut first = SalaryRecord::bare("1");
        first.location = Some("Dhaka".to_string());
        first.department = Some("Engineering".to_string());
        let mut second = SalaryRecord::bare("2");
        second.location = Some("Sylhet".to_string());
        let mut third = SalaryRecord::bare("3");
        third.location = Some("Dhaka".to_string());

        let options = result_options(vec![first, second, third]);
        let facets: Vec<Facet> = options.iter().map(|(facet, _)| *facet).collect();
        assert_eq!(facets, SEARCH_FACETS.to_vec());
        assert!(options[0].1.is_empty());
        assert_eq!(options[1].1, vec!["Engineering".to_string()]);
        assert_eq!(options[2].1, vec!["Dhaka".to_string(), "Sylhet".to_string()]);
    }

    #[test]
    fn test_salaries_args_parse() {
        let cli = Cli::try_parse_from([
            "payscope",
            "salaries",
            "--designation",
            "Software Engineer",
            "-f",
            "location=Dhaka",
            "--sort",
            "salary-low",
            "--page",
            "2",
        ])
        .unwrap();
        match cli.command {
            Commands::Salaries {
                designation,
                filters,
                sort,
                page,
                ..
            } => {
                assert_eq!(designation.as_deref(), Some("Software Engineer"));
                assert_eq!(filters, vec![(Facet::Location, "Dhaka".to_string())]);
                assert_eq!(sort, SortKey::SalaryLow);
                assert_eq!(page, 2);
            }
            _ => panic!("expected salaries command"),
        }
    }

    #[test]
    fn test_contribute_defaults_to_anonymous() {
        let cli = Cli::try_parse_from([
            "payscope",
            "contribute",
            "--company",
            "Acme",
            "--designation",
            "QA Engineer",
            "--location",
            "Dhaka",
            "--level",
            "Entry",
            "--experience",
            "1",
            "--salary",
            "30000",
            "--year",
            "2024",
            "--gender",
            "Other",
            "--employment-type",
            "Contract",
        ])
        .unwrap();
        let Commands::Contribute(args) = cli.command else {
            panic!("expected contribute command");
        };
        let form = ContributionForm::from(args);
        assert!(form.is_anonymous);
        assert!(form.validate_for_year(2025).is_ok());
    }
}
