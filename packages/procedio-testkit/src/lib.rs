//! Scratch Postgres databases and fixtures for the Postgres-backed tests.

mod error;

pub use error::{Error, Result};

use std::{env, str::FromStr, thread};

use sqlx::{
	ConnectOptions, Connection, Executor,
	postgres::{PgConnectOptions, PgConnection},
};
use tokio::runtime::Builder;
use uuid::Uuid;

pub const DSN_ENV: &str = "PROCEDIO_PG_DSN";

/// Server to create scratch databases on. `None` means the Postgres-backed tests skip.
pub fn base_dsn() -> Option<String> {
	env::var(DSN_ENV).ok().filter(|dsn| !dsn.trim().is_empty())
}

/// Axis-aligned unit vector. Cosine similarity between two of them is 1 or 0.
pub fn unit_vector(dim: usize, axis: usize) -> Vec<f32> {
	(0..dim).map(|index| if index == axis { 1.0 } else { 0.0 }).collect()
}

/// A `procedio_test_*` database, dropped by [`ScratchDatabase::release`] or else on drop.
pub struct ScratchDatabase {
	name: String,
	dsn: String,
	maintenance: PgConnectOptions,
	released: bool,
}
impl ScratchDatabase {
	pub async fn create(base_dsn: &str) -> Result<Self> {
		let base = PgConnectOptions::from_str(base_dsn)
			.map_err(|err| Error::Message(format!("{DSN_ENV} is not a valid DSN: {err}.")))?;
		let maintenance = base.clone().database("postgres");
		let name = format!("procedio_test_{}", Uuid::new_v4().simple());
		let mut conn = PgConnection::connect_with(&maintenance).await?;

		conn.execute(format!(r#"CREATE DATABASE "{name}""#).as_str()).await?;
		conn.close().await?;

		let dsn = base.database(&name).to_url_lossy().to_string();

		Ok(Self { name, dsn, maintenance, released: false })
	}

	pub fn dsn(&self) -> &str {
		&self.dsn
	}

	pub async fn release(mut self) -> Result<()> {
		drop_database(&self.maintenance, &self.name).await?;

		self.released = true;

		Ok(())
	}
}
impl Drop for ScratchDatabase {
	fn drop(&mut self) {
		if self.released {
			return;
		}

		let name = self.name.clone();
		let maintenance = self.maintenance.clone();
		// Drop can run on a runtime thread, so cleanup blocks on a runtime of its own.
		let cleanup = thread::spawn(move || -> Result<()> {
			let runtime = Builder::new_current_thread()
				.enable_all()
				.build()
				.map_err(|err| Error::Message(format!("Failed to start cleanup runtime: {err}.")))?;

			runtime.block_on(drop_database(&maintenance, &name))
		});

		match cleanup.join() {
			Ok(Ok(())) => {},
			Ok(Err(err)) => eprintln!("Failed to drop scratch database {}: {err}", self.name),
			Err(_) => eprintln!("Cleanup of scratch database {} panicked.", self.name),
		}
	}
}

async fn drop_database(maintenance: &PgConnectOptions, name: &str) -> Result<()> {
	let mut conn = PgConnection::connect_with(maintenance).await?;

	conn.execute(format!(r#"DROP DATABASE IF EXISTS "{name}" WITH (FORCE)"#).as_str()).await?;
	conn.close().await?;

	Ok(())
}
