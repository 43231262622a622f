//! Walk through the facade against a throwaway disk store.
//!
//! Run with `RUST_LOG=multicache=debug` to see bucket traffic.

use std::sync::Arc;

use multicache::{
    BackendKind, Cache, CacheConfig, DiskStorage, EnvOverrides, GetOptions, MemoryStorage,
    PageLocation, ScopeOptions, SessionStorage, SetOptions, StorageBackends, Template,
    UrlSearchSource,
};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("multicache=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let dir = std::env::temp_dir().join("multicache-demo");
    let memory = MemoryStorage::shared();
    let backends = StorageBackends::new(
        Arc::new(DiskStorage::new(&dir)),
        Arc::new(SessionStorage::new()),
        memory,
    );

    let mut config = CacheConfig::new()
        .namespace("tmc")
        .strict(Template::new().global_keys(["age"]).pages(["home"]));
    EnvOverrides::apply(&mut config);

    let location = PageLocation::parse("https://example.com/home?from=demo")?.with_title("Home");
    let cache = Cache::new(config, backends, location)?;

    cache.set_item("name", &100, &SetOptions::new().scope("home"))?;
    cache.set_item("age", &18, &SetOptions::new().backend(BackendKind::Local))?;

    let name = cache.get_item("name", &GetOptions::new().scope("home/hotel").default_value("100"))?;
    println!("home/hotel name: {:?}", name);

    let age = cache.get_item(
        "age",
        &GetOptions::new().chain([BackendKind::Memory, BackendKind::Local]),
    )?;
    println!("age: {:?}", age);

    if let Err(e) = cache.set_item("x", &1, &SetOptions::new().scope("office")) {
        println!("rejected: {}", e);
    }

    cache.update_url_search(
        [("age", UrlSearchSource::lookup("age", GetOptions::new().backend(BackendKind::Local)))],
        None,
        None,
    )?;
    println!("url: {}", cache.location().href());

    cache.clear(&ScopeOptions::new().scope("home"))?;
    cache.clear(&ScopeOptions::new().backend(BackendKind::Local))?;
    Ok(())
}
