//! Process configuration, read once at startup.
//!
//! Every required variable must be present and non-empty; a missing value is
//! a startup error rather than a placeholder that fails later. Variable names
//! match the deployment's existing environment (lower-case); the upper-case
//! spelling is accepted as well.
//!
//! | Env Var                     | Required | Default     |
//! |-----------------------------|----------|-------------|
//! | `postgres_server`           | yes      | --          |
//! | `postgres_port`             | yes      | --          |
//! | `postgres_username`         | yes      | --          |
//! | `postgres_password`         | yes      | --          |
//! | `postgres_database_name`    | yes      | --          |
//! | `postgres_schema_name`      | yes      | --          |
//! | `postgres_table_name`       | yes      | --          |
//! | `postgres_socket_root`      | no       | `/cloudsql` |
//! | `satori_serviceaccount_id`  | yes      | --          |
//! | `satori_serviceaccount_key` | yes      | --          |
//! | `satori_account_id`         | yes      | --          |
//! | `satori_api_host`           | yes      | --          |
//! | `satori_http_timeout_secs`  | no       | `300`       |
//! | `HOST`                      | no       | `0.0.0.0`   |
//! | `PORT`                      | no       | `8080`      |

use std::fmt;
use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

use crate::error::CoreError;

/// Unquoted PostgreSQL identifier; names are spliced into DDL so nothing
/// else is accepted.
static IDENTIFIER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$").expect("valid regex"));

const DEFAULT_SOCKET_ROOT: &str = "/cloudsql";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 300;
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Destination database settings.
#[derive(Clone)]
pub struct DbConfig {
    /// Managed instance identifier; the socket lives at `<socket_root>/<server>`.
    pub server: String,
    pub socket_root: PathBuf,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
    pub schema: String,
    pub table: String,
}

impl DbConfig {
    /// Directory containing the instance's Unix socket.
    pub fn socket_dir(&self) -> PathBuf {
        self.socket_root.join(&self.server)
    }

    /// Schema-qualified destination table name.
    pub fn qualified_table(&self) -> String {
        format!("{}.{}", self.schema, self.table)
    }
}

impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("server", &self.server)
            .field("socket_root", &self.socket_root)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("schema", &self.schema)
            .field("table", &self.table)
            .finish()
    }
}

/// Satori API credentials and endpoint.
#[derive(Clone)]
pub struct SatoriConfig {
    pub service_account_id: String,
    pub service_account_key: String,
    pub account_id: String,
    /// Bare host name, e.g. `app.satoricyber.com`.
    pub api_host: String,
    pub http_timeout: Duration,
}

impl SatoriConfig {
    /// Base URL of the API, always HTTPS.
    pub fn base_url(&self) -> String {
        format!("https://{}", self.api_host)
    }
}

impl fmt::Debug for SatoriConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SatoriConfig")
            .field("service_account_id", &self.service_account_id)
            .field("service_account_key", &"<redacted>")
            .field("account_id", &self.account_id)
            .field("api_host", &self.api_host)
            .field("http_timeout", &self.http_timeout)
            .finish()
    }
}

/// Trigger endpoint bind address.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Complete process configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DbConfig,
    pub satori: SatoriConfig,
    pub server: ServerConfig,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// Each key is tried as given and then upper-cased.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let source = Source { lookup };

        let database = DbConfig {
            server: source.required("postgres_server")?,
            socket_root: source
                .optional("postgres_socket_root")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SOCKET_ROOT)),
            port: source.required_parsed("postgres_port")?,
            username: source.required("postgres_username")?,
            password: source.required("postgres_password")?,
            database: source.required("postgres_database_name")?,
            schema: source.identifier("postgres_schema_name")?,
            table: source.identifier("postgres_table_name")?,
        };

        let satori = SatoriConfig {
            service_account_id: source.required("satori_serviceaccount_id")?,
            service_account_key: source.required("satori_serviceaccount_key")?,
            account_id: source.required("satori_account_id")?,
            api_host: source.required("satori_api_host")?,
            http_timeout: Duration::from_secs(
                source
                    .optional_parsed("satori_http_timeout_secs")?
                    .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
            ),
        };

        let server = ServerConfig {
            host: source
                .optional("HOST")
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: source.optional_parsed("PORT")?.unwrap_or(DEFAULT_PORT),
        };

        Ok(Self {
            database,
            satori,
            server,
        })
    }
}

struct Source<F> {
    lookup: F,
}

impl<F> Source<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
            .or_else(|| (self.lookup)(&name.to_ascii_uppercase()))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, name: &'static str) -> Result<String, CoreError> {
        self.optional(name).ok_or(CoreError::MissingConfig(name))
    }

    fn required_parsed<T>(&self, name: &'static str) -> Result<T, CoreError>
    where
        T: std::str::FromStr,
        T::Err: fmt::Display,
    {
        parse(name, &self.required(name)?)
    }

    fn optional_parsed<T>(&self, name: &'static str) -> Result<Option<T>, CoreError>
    where
        T: std::str::FromStr,
        T::Err: fmt::Display,
    {
        self.optional(name).map(|v| parse(name, &v)).transpose()
    }

    fn identifier(&self, name: &'static str) -> Result<String, CoreError> {
        let value = self.required(name)?;
        if !IDENTIFIER_RE.is_match(&value) {
            return Err(CoreError::InvalidConfig {
                name,
                reason: format!("{value:?} is not a plain SQL identifier"),
            });
        }
        Ok(value)
    }
}

fn parse<T>(name: &'static str, value: &str) -> Result<T, CoreError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    value.parse().map_err(|e: T::Err| CoreError::InvalidConfig {
        name,
        reason: format!("{value:?}: {e}"),
    })
}
