//! Drives registration, activation, login, and gated catalog writes against the in-memory
//! store, printing how each request is admitted or rejected.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
// self
use reelgate::{
	accounts::Accounts,
	auth::{ClientId, MOVIES_WRITE, PermissionSet},
	catalog::Catalog,
	clock::{Clock, SystemClock},
	config::GateConfig,
	gate::{Gatekeeper, Inbound},
	record::{Filters, Movie, MovieCriteria, MovieFields, MovieUpdate, Runtime},
	store::{MemoryStore, PermissionStore},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let config = GateConfig::from_json_str(
		r#"{ "limiter": { "rps": 2.0, "burst": 8 }, "storage_deadline_ms": 500 }"#,
	)?;
	let clock: Arc<dyn Clock> = Arc::new(SystemClock);
	let store = Arc::new(MemoryStore::default());
	let gate = Arc::new(Gatekeeper::from_config(&config, store.clone(), clock.clone())?);
	let _sweeper = gate.limiter().start_sweeper()?;
	let accounts = Accounts::new(store.clone(), gate.tokens().clone(), config.tokens.clone())
		.with_storage_deadline(config.storage_deadline());
	let catalog = Catalog::new(gate.clone(), store.clone(), clock)
		.with_storage_deadline(config.storage_deadline());
	let client = ClientId::from_transport(Some("10.1.0.4, 203.0.113.50"), None, "10.0.0.1:443")?;
	let registration = accounts.register("Jay", "jay@reelgate.test", "pa55word").await?;

	println!("Registered {} as user {}.", registration.user.fields.email, registration.user.id);

	let user = accounts.activate(registration.activation.plaintext.expose()).await?;
	let login = accounts.login(&user.fields.email, "pa55word").await?;
	let inbound = Inbound::bearer(client, &login.plaintext);
	let fields = MovieFields {
		title: "Black Panther".into(),
		year: 2018,
		runtime: Runtime(134),
		genres: vec!["action".into(), "adventure".into()],
	};

	if let Err(e) = catalog.create_movie(&inbound, fields.clone()).await {
		println!("Create rejected: {}.", serde_json::to_string(&e.rejection())?);
	}

	store.add_for_user(user.id, PermissionSet::new([MOVIES_WRITE])?).await?;

	let movie = catalog.create_movie(&inbound, fields).await?;

	println!("Created movie {} at version {}.", movie.id, movie.version);

	let update = MovieUpdate { year: Some(2019), ..Default::default() };
	let stale = Some(movie.version);

	catalog.update_movie(&inbound, movie.id, stale, update.clone()).await?;

	if let Err(e) = catalog.update_movie(&inbound, movie.id, stale, update).await {
		println!("Second update rejected: {}.", serde_json::to_string(&e.rejection())?);
	}

	let newest = Filters { sort: "-year".into(), ..Filters::new(Movie::SORT_SAFELIST) };
	let listing = catalog.list_movies(&inbound, MovieCriteria::default(), newest).await?;

	println!("Listed {}.", serde_json::to_string(&listing)?);

	Ok(())
}
