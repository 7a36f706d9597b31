//! Connection settings loaded from the environment

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Port used when no `MONGO_PORTS` value is given
pub const DEFAULT_PORT: u16 = 27017;

const HOSTS: &str = "MONGO_HOSTS";
const PORTS: &str = "MONGO_PORTS";
const DATABASE: &str = "MONGO_DATABASE";
const USERNAME: &str = "MONGO_USERNAME";
const PASSWORD: &str = "MONGO_PASSWORD";
const AUTH_MECHANISM: &str = "MONGO_AUTH_MECHANISM";
const AUTH_SOURCE: &str = "MONGO_AUTH_SOURCE";
const REPLICA_SET: &str = "MONGO_REPLICA_SET";
const TLS: &str = "MONGO_TLS";
const SRV: &str = "MONGO_SRV";

/// MongoDB connection settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionSettings {
	/// Hosts of the deployment, in seed-list order
	pub hosts: Vec<String>,

	/// Ports paired positionally with `hosts`
	///
	/// Hosts without a matching entry use the first port.
	pub ports: Vec<u16>,

	/// Database name
	pub database: String,

	/// Database user (if applicable)
	pub username: Option<String>,

	/// Database password (if applicable)
	pub password: Option<String>,

	/// Authentication mechanism, e.g. `SCRAM-SHA-256`
	pub auth_mechanism: Option<String>,

	/// Database holding the user's credentials
	pub auth_source: Option<String>,

	/// Replica set name
	pub replica_set: Option<String>,

	/// Whether to connect over TLS
	pub tls: bool,

	/// Whether hosts are resolved through DNS seed lists (`mongodb+srv`)
	pub srv: bool,
}

impl ConnectionSettings {
	/// Create settings for a single host on the default port
	///
	/// # Examples
	///
	/// ```
	/// use docbridge_conf::ConnectionSettings;
	///
	/// let settings = ConnectionSettings::new("localhost", "app");
	/// assert_eq!(settings.hosts, vec!["localhost".to_string()]);
	/// assert_eq!(settings.ports, vec![27017]);
	/// assert!(!settings.tls);
	/// ```
	pub fn new(host: impl Into<String>, database: impl Into<String>) -> Self {
		Self {
			hosts: vec![host.into()],
			ports: vec![DEFAULT_PORT],
			database: database.into(),
			username: None,
			password: None,
			auth_mechanism: None,
			auth_source: None,
			replica_set: None,
			tls: false,
			srv: false,
		}
	}

	/// Read settings from the process environment
	///
	/// Variables are looked up as `{prefix}_MONGO_*` when a prefix is given
	/// and as `MONGO_*` otherwise.
	pub fn from_env(prefix: Option<&str>) -> Result<Self> {
		Self::from_vars(prefix, std::env::vars())
	}

	/// Read settings from an explicit set of variables
	///
	/// # Examples
	///
	/// ```
	/// use docbridge_conf::ConnectionSettings;
	///
	/// let vars = [
	///     ("ORDERS_MONGO_HOSTS", "a.example.com"),
	///     ("ORDERS_MONGO_DATABASE", "orders"),
	///     ("ORDERS_MONGO_TLS", "true"),
	/// ]
	/// .map(|(k, v)| (k.to_string(), v.to_string()));
	///
	/// let settings = ConnectionSettings::from_vars(Some("ORDERS"), vars).unwrap();
	/// assert_eq!(settings.database, "orders");
	/// assert!(settings.tls);
	/// ```
	pub fn from_vars<I>(prefix: Option<&str>, vars: I) -> Result<Self>
	where
		I: IntoIterator<Item = (String, String)>,
	{
		let vars: HashMap<String, String> = vars.into_iter().collect();
		let source = VarSource { prefix, vars: &vars };

		let hosts = split_list(&source.required(HOSTS)?);
		if hosts.is_empty() {
			return Err(ConfigError::Missing(source.key(HOSTS)));
		}

		let ports = match source.optional(PORTS) {
			Some(raw) => split_list(&raw)
				.into_iter()
				.map(|port| {
					port.parse::<u16>().map_err(|e| ConfigError::Invalid {
						var: source.key(PORTS),
						value: port.clone(),
						reason: e.to_string(),
					})
				})
				.collect::<Result<Vec<_>>>()?,
			None => vec![DEFAULT_PORT],
		};

		let settings = Self {
			hosts,
			ports,
			database: source.required(DATABASE)?,
			username: source.optional(USERNAME),
			password: source.optional(PASSWORD),
			auth_mechanism: source.optional(AUTH_MECHANISM),
			auth_source: source.optional(AUTH_SOURCE),
			replica_set: source.optional(REPLICA_SET),
			tls: source.flag(TLS)?,
			srv: source.flag(SRV)?,
		};

		tracing::debug!(
			prefix = prefix.unwrap_or(""),
			hosts = settings.hosts.len(),
			database = %settings.database,
			"loaded connection settings"
		);

		Ok(settings)
	}

	/// Set credentials
	pub fn with_credentials(
		mut self,
		username: impl Into<String>,
		password: impl Into<String>,
	) -> Self {
		self.username = Some(username.into());
		self.password = Some(password.into());
		self
	}

	/// Set the replica set name
	pub fn with_replica_set(mut self, name: impl Into<String>) -> Self {
		self.replica_set = Some(name.into());
		self
	}

	/// Enable or disable TLS
	pub fn with_tls(mut self, tls: bool) -> Self {
		self.tls = tls;
		self
	}
}

struct VarSource<'a> {
	prefix: Option<&'a str>,
	vars: &'a HashMap<String, String>,
}

impl VarSource<'_> {
	fn key(&self, name: &str) -> String {
		match self.prefix {
			Some(prefix) if !prefix.is_empty() => format!("{}_{}", prefix, name),
			_ => name.to_string(),
		}
	}

	fn optional(&self, name: &str) -> Option<String> {
		self.vars
			.get(&self.key(name))
			.map(|value| value.trim().to_string())
			.filter(|value| !value.is_empty())
	}

	fn required(&self, name: &str) -> Result<String> {
		self.optional(name)
			.ok_or_else(|| ConfigError::Missing(self.key(name)))
	}

	fn flag(&self, name: &str) -> Result<bool> {
		let Some(raw) = self.optional(name) else {
			return Ok(false);
		};

		match raw.to_ascii_lowercase().as_str() {
			"1" | "true" | "yes" | "on" => Ok(true),
			"0" | "false" | "no" | "off" => Ok(false),
			_ => Err(ConfigError::Invalid {
				var: self.key(name),
				value: raw,
				reason: "expected a boolean".to_string(),
			}),
		}
	}
}

fn split_list(raw: &str) -> Vec<String> {
	raw.split(',')
		.map(str::trim)
		.filter(|item| !item.is_empty())
		.map(str::to_string)
		.collect()
}
