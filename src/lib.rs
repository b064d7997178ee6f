pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod import;
pub mod models;
pub mod request_logger;
pub mod routes;

use crate::db::CardDb;
use crate::request_logger::RequestLogger;
use env_logger::Env;
use rocket::fairing::AdHoc;
use rocket::http::Method;
use rocket::{Build, Rocket};
use rocket_cors::{AllowedOrigins, CorsOptions};
use rocket_db_pools::Database;
use rocket_okapi::{
    openapi_get_routes,
    rapidoc::{GeneralConfig, HideShowConfig, RapiDocConfig, make_rapidoc},
    settings::UrlObject,
    swagger_ui::{SwaggerUIConfig, make_swagger_ui},
};
use std::sync::Once;

static LOGGER: Once = Once::new();

pub fn init_logger() {
    LOGGER.call_once(|| {
        env_logger::Builder::from_env(
            Env::default().default_filter_or("info,rocket::server=warn,rocket::request=warn"),
        )
        .init();
    });
}

/// Every card endpoint, mounted under `/api/card`.
pub fn card_routes() -> Vec<rocket::Route> {
    openapi_get_routes![
        routes::cards::list_cards,
        routes::cards::list_cards_page,
        routes::cards::list_cards_paged,
        routes::cards::search_cards,
        routes::cards::search_cards_page,
        routes::cards::search_cards_paged,
        routes::cards::get_card,
    ]
}

pub fn rocket() -> Rocket<Build> {
    init_logger();

    let cors = CorsOptions::default()
        .allowed_origins(AllowedOrigins::all())
        .allowed_methods(
            vec![Method::Get, Method::Options]
                .into_iter()
                .map(From::from)
                .collect(),
        )
        .to_cors()
        .expect("Error creating CORS");

    rocket::build()
        .attach(RequestLogger)
        .attach(CardDb::init())
        .attach(cors)
        .attach(AdHoc::try_on_ignite(
            "Run Migrations",
            |rocket| async move {
                match CardDb::fetch(&rocket) {
                    Some(db) => {
                        let pool = (**db).clone();
                        match db::run_migrations(&pool).await {
                            Ok(_) => {
                                log::info!("database migrations successful");
                                Ok(rocket)
                            }
                            Err(e) => {
                                log::error!("database migrations failed: {}", e);
                                Err(rocket)
                            }
                        }
                    }
                    None => {
                        log::error!("database pool not available for migrations");
                        Err(rocket)
                    }
                }
            },
        ))
        // Handlers take the pool from managed state so tests can inject their own
        .attach(AdHoc::try_on_ignite("Manage DB Pool", |rocket| async move {
            match CardDb::fetch(&rocket) {
                Some(db) => {
                    let pool = (**db).clone();
                    Ok(rocket.manage(pool))
                }
                None => Err(rocket),
            }
        }))
        .mount("/api/card", card_routes())
        .mount(
            "/api/docs/swagger/",
            make_swagger_ui(&SwaggerUIConfig {
                url: "../../card/openapi.json".to_owned(),
                ..Default::default()
            }),
        )
        .mount(
            "/api/docs/rapidoc/",
            make_rapidoc(&RapiDocConfig {
                general: GeneralConfig {
                    spec_urls: vec![UrlObject::new("Card API", "../../card/openapi.json")],
                    ..Default::default()
                },
                hide_show: HideShowConfig {
                    allow_spec_url_load: false,
                    allow_spec_file_load: false,
                    ..Default::default()
                },
                ..Default::default()
            }),
        )
}

#[cfg_attr(not(test), allow(dead_code))]
pub mod test_support {
    use rocket::config::LogLevel;
    use rocket::figment::Figment;
    use rocket::local::asynchronous::Client as AsyncClient;
    use rocket::{Build, Rocket, Route};
    use rocket_db_pools::sqlx::{self, PgPool};
    use std::collections::HashSet;

    use crate::import::{CardStore, StoreError};
    use crate::models::NewCard;

    pub use database::{TestDatabase, TestDatabaseError};

    /// Build a card with placeholder fields for fixtures.
    pub fn sample_card(uuid: &str, name: &str) -> NewCard {
        NewCard {
            uuid: uuid.to_string(),
            name: name.to_string(),
            mana_value: 1.0,
            mana_cost: Some("{W}".to_string()),
            rarity: "common".to_string(),
            set_code: "TST".to_string(),
            subtype: None,
            text: Some("Draw a card.".to_string()),
            card_type: "Instant".to_string(),
        }
    }

    /// Insert cards directly, outside of the import pipeline.
    pub async fn insert_cards(pool: &PgPool, cards: &[NewCard]) -> Result<(), sqlx::Error> {
        for card in cards {
            sqlx::query(
                "INSERT INTO cards (uuid, name, mana_value, mana_cost, rarity, set_code, subtype, text, type) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            )
            .bind(&card.uuid)
            .bind(&card.name)
            .bind(card.mana_value)
            .bind(&card.mana_cost)
            .bind(&card.rarity)
            .bind(&card.set_code)
            .bind(&card.subtype)
            .bind(&card.text)
            .bind(&card.card_type)
            .execute(pool)
            .await?;
        }
        Ok(())
    }

    /// In-memory [`CardStore`] with transaction semantics and failure injection.
    ///
    /// Flushed cards only become visible through [`MemoryCardStore::committed`]
    /// once the transaction commits.
    #[derive(Debug, Default)]
    pub struct MemoryCardStore {
        committed: Vec<NewCard>,
        written: Vec<NewCard>,
        staged: Vec<NewCard>,
        in_transaction: bool,
        flushes: usize,
        rejected: HashSet<String>,
        fail_flush_at: Option<usize>,
        fail_commit: bool,
    }

    impl MemoryCardStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Store pre-populated with committed cards.
        pub fn with_cards(cards: impl IntoIterator<Item = NewCard>) -> Self {
            Self {
                committed: cards.into_iter().collect(),
                ..Self::default()
            }
        }

        /// Refuse to stage the given UUID.
        pub fn rejecting(mut self, uuid: &str) -> Self {
            self.rejected.insert(uuid.to_string());
            self
        }

        /// Fail the n-th flush (1-based).
        pub fn failing_flush(mut self, nth: usize) -> Self {
            self.fail_flush_at = Some(nth);
            self
        }

        pub fn failing_commit(mut self) -> Self {
            self.fail_commit = true;
            self
        }

        pub fn committed(&self) -> &[NewCard] {
            &self.committed
        }

        /// Number of flushes that wrote cards successfully.
        pub fn flush_count(&self) -> usize {
            self.flushes
        }

        pub fn in_transaction(&self) -> bool {
            self.in_transaction
        }
    }

    #[rocket::async_trait]
    impl CardStore for MemoryCardStore {
        async fn list_all_uuids(&mut self) -> Result<HashSet<String>, StoreError> {
            Ok(self.committed.iter().map(|card| card.uuid.clone()).collect())
        }

        fn persist(&mut self, card: NewCard) -> Result<(), StoreError> {
            if self.rejected.contains(&card.uuid) {
                return Err(StoreError::Rejected(card.uuid));
            }
            if self.staged.iter().any(|staged| staged.uuid == card.uuid) {
                return Err(StoreError::DuplicateStaged(card.uuid));
            }
            self.staged.push(card);
            Ok(())
        }

        async fn flush(&mut self) -> Result<usize, StoreError> {
            if !self.in_transaction {
                return Err(StoreError::NoTransaction);
            }
            if self.fail_flush_at == Some(self.flushes + 1) {
                return Err(StoreError::Rejected("injected flush failure".to_string()));
            }
            let count = self.staged.len();
            self.written.append(&mut self.staged);
            self.flushes += 1;
            Ok(count)
        }

        fn clear(&mut self) {
            self.staged.clear();
        }

        async fn begin(&mut self) -> Result<(), StoreError> {
            if self.in_transaction {
                return Err(StoreError::TransactionActive);
            }
            self.in_transaction = true;
            Ok(())
        }

        async fn commit(&mut self) -> Result<(), StoreError> {
            if !self.in_transaction {
                return Err(StoreError::NoTransaction);
            }
            if self.fail_commit {
                return Err(StoreError::Rejected("injected commit failure".to_string()));
            }
            self.committed.append(&mut self.written);
            self.in_transaction = false;
            Ok(())
        }

        async fn rollback(&mut self) -> Result<(), StoreError> {
            self.staged.clear();
            self.written.clear();
            self.in_transaction = false;
            Ok(())
        }
    }

    pub mod database {
        use log::LevelFilter;
        use rocket_db_pools::sqlx::postgres::{PgConnectOptions, PgPoolOptions};
        use rocket_db_pools::sqlx::{self, ConnectOptions, PgPool};
        use testcontainers::{GenericImage, ImageExt, core::WaitFor};
        use testcontainers_modules::testcontainers::{
            ContainerAsync, core::error::TestcontainersError, runners::AsyncRunner,
        };
        use thiserror::Error;
        use tokio::runtime::Handle;
        use uuid::Uuid;

        use crate::db::MIGRATOR;

        #[derive(Debug, Error)]
        pub enum TestDatabaseError {
            #[error("database error: {0}")]
            Sqlx(#[from] sqlx::Error),
            #[error("migration error: {0}")]
            Migration(#[from] sqlx::migrate::MigrateError),
            #[error("container error: {0}")]
            Container(#[from] TestcontainersError),
        }

        /// Ephemeral database factory for integration tests.
        pub struct TestDatabase {
            pool: Option<PgPool>,
            admin_options: PgConnectOptions,
            database_name: String,
            container: Option<ContainerAsync<GenericImage>>,
        }

        impl TestDatabase {
            /// Provision a fresh database.
            ///
            /// Uses `TEST_DATABASE_URL` when set, otherwise launches a disposable
            /// Postgres container.
            pub async fn new_from_env() -> Result<Self, TestDatabaseError> {
                match std::env::var("TEST_DATABASE_URL") {
                    Ok(url) => Self::from_url(&url, None).await,
                    Err(_) => Self::new_container().await,
                }
            }

            /// Launch a Postgres container and provision a database inside it.
            pub async fn new_container() -> Result<Self, TestDatabaseError> {
                let image = GenericImage::new("postgres", "16-alpine").with_wait_for(
                    WaitFor::message_on_stderr("database system is ready to accept connections"),
                );

                let request = image
                    .with_env_var("POSTGRES_DB", "postgres")
                    .with_env_var("POSTGRES_USER", "postgres")
                    .with_env_var("POSTGRES_PASSWORD", "postgres");

                let container = request.start().await?;

                let host = container.get_host().await?.to_string();
                let port = container.get_host_port_ipv4(5432).await?;
                let admin_url = format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

                Self::from_url(&admin_url, Some(container)).await
            }

            async fn from_url(
                url: &str,
                container: Option<ContainerAsync<GenericImage>>,
            ) -> Result<Self, TestDatabaseError> {
                let base_options: PgConnectOptions = url.parse().map_err(TestDatabaseError::Sqlx)?;
                let base_options = base_options.log_statements(LevelFilter::Off);

                let base_name = base_options
                    .get_database()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "postgres".to_string());

                let admin_options = base_options.clone().database("postgres");
                let admin_pool = PgPoolOptions::new()
                    .max_connections(1)
                    .connect_with(admin_options.clone())
                    .await
                    .map_err(TestDatabaseError::Sqlx)?;

                let new_db_name = format!("{}_{}", base_name, Uuid::new_v4().simple());
                let create_sql = format!("CREATE DATABASE \"{}\" TEMPLATE template0", new_db_name);
                sqlx::query(&create_sql)
                    .execute(&admin_pool)
                    .await
                    .map_err(TestDatabaseError::Sqlx)?;
                admin_pool.close().await;

                let pool = PgPoolOptions::new()
                    .max_connections(5)
                    .connect_with(base_options.clone().database(&new_db_name))
                    .await
                    .map_err(TestDatabaseError::Sqlx)?;

                MIGRATOR.run(&pool).await?;

                Ok(Self {
                    pool: Some(pool),
                    admin_options,
                    database_name: new_db_name,
                    container,
                })
            }

            /// Cloneable connection pool for use in tests and Rocket state.
            pub fn pool(&self) -> &PgPool {
                self.pool.as_ref().expect("test database pool is available")
            }

            pub fn pool_clone(&self) -> PgPool {
                self.pool().clone()
            }

            /// Close pool connections and drop the ephemeral database.
            pub async fn close(mut self) -> Result<(), TestDatabaseError> {
                if let Some(pool) = self.pool.take() {
                    pool.close().await;
                }

                drop_database_with_fallback(self.admin_options.clone(), &self.database_name)
                    .await
                    .map_err(TestDatabaseError::Sqlx)?;

                if let Some(container) = self.container.take() {
                    drop(container);
                }

                Ok(())
            }
        }

        async fn drop_database_with_fallback(
            admin_options: PgConnectOptions,
            database_name: &str,
        ) -> Result<(), sqlx::Error> {
            let admin_pool = PgPoolOptions::new()
                .max_connections(1)
                .connect_with(admin_options)
                .await?;

            let drop_force = format!("DROP DATABASE \"{}\" WITH (FORCE)", database_name);
            match sqlx::query(&drop_force).execute(&admin_pool).await {
                Ok(_) => Ok(()),
                Err(err) if force_drop_unsupported(&err) => {
                    let drop_sql = format!("DROP DATABASE \"{}\"", database_name);
                    sqlx::query(&drop_sql).execute(&admin_pool).await?;
                    Ok(())
                }
                Err(err) => Err(err),
            }
        }

        fn force_drop_unsupported(err: &sqlx::Error) -> bool {
            matches!(
                err,
                sqlx::Error::Database(db_err)
                    if db_err
                        .code()
                        .map(|code| code == "42601" || code == "0A000")
                        .unwrap_or(false)
            )
        }

        impl Drop for TestDatabase {
            fn drop(&mut self) {
                if let Some(pool) = self.pool.take() {
                    let admin_options = self.admin_options.clone();
                    let db_name = self.database_name.clone();
                    if let Ok(handle) = Handle::try_current() {
                        handle.spawn(async move {
                            pool.close().await;
                            let _ = drop_database_with_fallback(admin_options, &db_name).await;
                        });
                    } else {
                        std::thread::spawn(move || {
                            if let Ok(rt) = tokio::runtime::Runtime::new() {
                                rt.block_on(async move {
                                    pool.close().await;
                                    let _ = drop_database_with_fallback(admin_options, &db_name)
                                        .await;
                                });
                            }
                        });
                    }
                }

                if let Some(container) = self.container.take() {
                    drop(container);
                }
            }
        }
    }

    /// Builder for constructing Rocket instances tailored for integration tests.
    #[derive(Default)]
    pub struct TestRocketBuilder {
        figment: Figment,
        mounts: Vec<(String, Vec<Route>)>,
        pg_pool: Option<PgPool>,
    }

    impl TestRocketBuilder {
        /// Start a builder with sensible defaults: random port, logging disabled.
        pub fn new() -> Self {
            let figment = rocket::Config::figment()
                .merge(("port", 0))
                .merge(("log_level", LogLevel::Off))
                .merge(("cli_colors", false));

            Self {
                figment,
                mounts: Vec::new(),
                pg_pool: None,
            }
        }

        /// Mount routes under `/api/card`.
        pub fn mount_card_routes(mut self, routes: Vec<Route>) -> Self {
            self.mounts.push(("/api/card".to_string(), routes));
            self
        }

        /// Manage a `PgPool` instance for routes that read `&State<PgPool>`.
        pub fn manage_pg_pool(mut self, pool: PgPool) -> Self {
            self.pg_pool = Some(pool);
            self
        }

        pub fn build(self) -> Rocket<Build> {
            let mut rocket = rocket::custom(self.figment);

            for (base, routes) in self.mounts {
                rocket = rocket.mount(base, routes);
            }

            if let Some(pool) = self.pg_pool {
                rocket = rocket.manage(pool);
            }

            rocket
        }

        pub async fn async_client(self) -> AsyncClient {
            AsyncClient::tracked(self.build())
                .await
                .expect("valid Rocket instance")
        }
    }
}
