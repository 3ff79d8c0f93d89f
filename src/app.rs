//! Application lifecycle: open the database, run module hooks and
//! migrations, serve HTTP, shut down.

use anyhow::Context;
use axum::Router;
use bookshelf_db::DbPool;
use bookshelf_kernel::{settings::Settings, InitCtx, ModuleRegistry};

use crate::modules;

/// Registry holding every application module
pub fn registry() -> anyhow::Result<ModuleRegistry> {
    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry)?;
    Ok(registry)
}

async fn open_pool(settings: &Settings) -> anyhow::Result<DbPool> {
    bookshelf_db::create_pool(&settings.database.url, settings.database.max_connections)
        .await
        .context("failed to open database")
}

/// Apply pending migrations without starting the server.
pub async fn migrate(settings: &Settings) -> anyhow::Result<usize> {
    let registry = registry()?;
    let pool = open_pool(settings).await?;
    let applied = registry.run_migrations(&pool).await;
    pool.close().await;
    applied
}

/// A bootstrapped application, ready to serve.
pub struct Application {
    settings: Settings,
    registry: ModuleRegistry,
    pool: DbPool,
}

impl Application {
    pub async fn bootstrap(settings: Settings) -> anyhow::Result<Self> {
        let registry = registry()?;
        let pool = open_pool(&settings).await?;

        let ctx = InitCtx {
            settings: &settings,
            db: &pool,
        };
        registry.init_modules(&ctx).await?;
        registry.run_migrations(&pool).await?;
        registry.start_modules(&ctx).await?;

        tracing::info!(
            env = ?settings.environment,
            modules = ?registry.module_names(),
            "bookshelf bootstrap complete"
        );

        Ok(Self {
            settings,
            registry,
            pool,
        })
    }

    /// The full HTTP application, middleware included
    pub fn router(&self) -> Router {
        let ctx = InitCtx {
            settings: &self.settings,
            db: &self.pool,
        };
        bookshelf_http::build_app(&self.registry, &ctx)
    }

    /// Serve until a shutdown signal, then stop modules and close the pool.
    pub async fn serve(self) -> anyhow::Result<()> {
        let served = bookshelf_http::serve(self.router(), &self.settings.server).await;
        self.shutdown().await?;
        served
    }

    pub async fn shutdown(self) -> anyhow::Result<()> {
        self.registry.stop_modules().await?;
        self.pool.close().await;
        tracing::info!("bookshelf shut down");
        Ok(())
    }
}
