use anyhow::Context;
use tracing::info;

use crate::storage::Store;
use crate::App;

pub async fn run(app: App) -> anyhow::Result<()> {
    app.store
        .ping()
        .await
        .context("store is unreachable")?;
    info!("store is reachable");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::storage::memory::MemoryStore;

    #[tokio::test]
    async fn memory_store_is_always_reachable() {
        let app = App::with_store(Config::default(), MemoryStore::new().into()).unwrap();
        run(app).await.unwrap();
    }
}
