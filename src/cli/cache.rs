use anyhow::{Context, Result};

use scribetwin::cache::{DiskCache, CORPUS_NAMESPACE, LLM_SCORE_NAMESPACE};
use scribetwin::config::ScribeConfig;

const NAMESPACES: [&str; 2] = [CORPUS_NAMESPACE, LLM_SCORE_NAMESPACE];

/// Show how many entries each cache namespace holds.
pub fn stats(config: &ScribeConfig) -> Result<()> {
    let cache = DiskCache::new(config.resolved_cache_dir());

    println!("Cache Statistics");
    println!("{}", "=".repeat(40));
    println!("  Directory:           {}", cache.dir().display());
    println!("  Enabled:             {}", config.cache.enabled);
    println!();
    for namespace in NAMESPACES {
        println!("  {:<12} {}", namespace, cache.count(namespace));
    }
    Ok(())
}

/// Delete cached entries, either one namespace or all of them.
pub fn clear(config: &ScribeConfig, namespace: Option<&str>) -> Result<()> {
    let cache = DiskCache::new(config.resolved_cache_dir());
    let targets: Vec<&str> = match namespace {
        Some(ns) => {
            anyhow::ensure!(
                NAMESPACES.contains(&ns),
                "unknown cache namespace '{ns}' (expected one of: {})",
                NAMESPACES.join(", ")
            );
            vec![ns]
        }
        None => NAMESPACES.to_vec(),
    };

    for ns in targets {
        let removed = cache
            .clear(ns)
            .with_context(|| format!("failed to clear '{ns}' cache"))?;
        println!("Removed {removed} '{ns}' entries");
    }
    Ok(())
}
