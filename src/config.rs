use std::path::PathBuf;
use std::time::Duration;

use clap::Args;

use crate::api::{ApiError, SalaryApi, DEFAULT_API_URL};
use crate::engine::PagingMode;
use crate::session::Session;
use crate::store::{KeyValueStore, StoreError};

/// Records per "see more" step.
pub const WINDOW_PAGE_SIZE: usize = 6;
/// Records per numbered page.
pub const PAGED_PAGE_SIZE: usize = 5;
pub const DEFAULT_TIMEOUT_SECS: u64 = 20;

/// Global options shared by every command. Each falls back to an
/// environment variable, then to a built-in default.
#[derive(Debug, Clone, Args)]
pub struct ConfigArgs {
    /// Base URL of the salary API
    #[arg(long, global = true, env = "PAYSCOPE_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Records per page (defaults depend on the view)
    #[arg(long, global = true, env = "PAYSCOPE_PAGE_SIZE")]
    pub page_size: Option<usize>,

    /// HTTP timeout in seconds
    #[arg(long, global = true, env = "PAYSCOPE_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    /// Directory holding the local session store
    #[arg(long, global = true, env = "PAYSCOPE_DATA_DIR")]
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub api_url: String,
    pub page_size: Option<usize>,
    pub timeout: Duration,
    pub data_dir: PathBuf,
}

impl From<ConfigArgs> for Config {
    fn from(args: ConfigArgs) -> Self {
        Self {
            api_url: args.api_url,
            page_size: args.page_size.filter(|n| *n > 0),
            timeout: Duration::from_secs(args.timeout_secs),
            data_dir: args.data_dir.unwrap_or_else(KeyValueStore::default_dir),
        }
    }
}

impl Config {
    pub fn page_size_for(&self, mode: PagingMode) -> usize {
        self.page_size.unwrap_or(match mode {
            PagingMode::Window => WINDOW_PAGE_SIZE,
            PagingMode::Pages => PAGED_PAGE_SIZE,
        })
    }

    pub fn api(&self) -> Result<SalaryApi, ApiError> {
        SalaryApi::new(&self.api_url, self.timeout)
    }

    pub fn session(&self) -> Result<Session, StoreError> {
        let store = KeyValueStore::open(&self.data_dir)?;
        Ok(Session::new(Box::new(store)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        config: ConfigArgs,
    }

    fn parse(args: &[&str]) -> Config {
        let mut argv = vec!["payscope"];
        argv.extend_from_slice(args);
        TestCli::try_parse_from(argv).unwrap().config.into()
    }

    #[test]
    fn test_flags_override_defaults() {
        let config = parse(&[
            "--api-url",
            "http://localhost:4000/api/v1",
            "--page-size",
            "10",
            "--timeout-secs",
            "3",
            "--data-dir",
            "/tmp/payscope-test",
        ]);
        assert_eq!(config.api_url, "http://localhost:4000/api/v1");
        assert_eq!(config.page_size_for(PagingMode::Window), 10);
        assert_eq!(config.page_size_for(PagingMode::Pages), 10);
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.data_dir, PathBuf::from("/tmp/payscope-test"));
    }

    #[test]
    fn test_page_size_defaults_per_view() {
        let config = parse(&["--page-size", "0"]);
        assert_eq!(config.page_size, None);
        assert_eq!(config.page_size_for(PagingMode::Window), 6);
        assert_eq!(config.page_size_for(PagingMode::Pages), 5);
    }

    #[test]
    fn test_session_opens_under_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            api_url: DEFAULT_API_URL.to_string(),
            page_size: None,
            timeout: Duration::from_secs(1),
            data_dir: dir.path().to_path_buf(),
        };
        let session = config.session().unwrap();
        session.sign_in("abc").unwrap();
        assert!(dir.path().join("payscope.db").exists());
        assert_eq!(config.api().unwrap().base_url(), DEFAULT_API_URL);
    }
}
