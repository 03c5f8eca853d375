//! Context management commands.

use std::path::Path;

use anyhow::Result;

use crate::config::ClientConfig;

/// Create or update a context. The first context becomes current.
pub fn set(
    name: &str,
    server: Option<&str>,
    token: Option<&str>,
    client_config_path: &Path,
) -> Result<()> {
    let mut config = ClientConfig::load(client_config_path)?;

    let ctx = config.context_entry(name);
    if let Some(server) = server {
        ctx.server = server.trim_end_matches('/').to_string();
    }
    if let Some(token) = token {
        ctx.token = token.to_string();
    }
    config.save(client_config_path)?;

    println!("Context \"{}\" saved.", name);
    Ok(())
}

/// List all contexts.
pub fn list(client_config_path: &Path) -> Result<()> {
    let config = ClientConfig::load(client_config_path)?;
    if config.contexts.is_empty() {
        println!("No contexts. Run `feedctl context set <name> --server <url>`.");
        return Ok(());
    }

    println!("{:<3}{:<20}{:<40}{}", "", "NAME", "SERVER", "TOKEN");
    for ctx in &config.contexts {
        let marker = if ctx.name == config.current_context { "*" } else { "" };
        let token = if ctx.token.is_empty() { "-" } else { "set" };
        println!("{:<3}{:<20}{:<40}{}", marker, ctx.name, ctx.server, token);
    }
    Ok(())
}

/// Delete a context.
pub fn delete(name: &str, client_config_path: &Path) -> Result<()> {
    let mut config = ClientConfig::load(client_config_path)?;
    if config.remove_context(name).is_none() {
        anyhow::bail!("Context \"{}\" not found.", name);
    }
    config.save(client_config_path)?;
    println!("Context \"{}\" deleted.", name);
    Ok(())
}

/// Switch the current context.
pub fn use_context(name: &str, client_config_path: &Path) -> Result<()> {
    let mut config = ClientConfig::load(client_config_path)?;
    if !config.contexts.iter().any(|c| c.name == name) {
        anyhow::bail!("Context \"{}\" not found.", name);
    }
    config.current_context = name.to_string();
    config.save(client_config_path)?;
    println!("Switched to context \"{}\".", name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_context_becomes_current() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        set("dev", Some("http://localhost:8080/"), None, &path).unwrap();
        set("prod", Some("https://api.example.com"), Some("jwt"), &path).unwrap();

        let config = ClientConfig::load(&path).unwrap();
        assert_eq!(config.current_context, "dev");
        assert_eq!(config.current().unwrap().server, "http://localhost:8080");
        assert_eq!(config.contexts.len(), 2);
    }

    #[test]
    fn set_keeps_unspecified_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        set("dev", Some("http://localhost:8080"), Some("jwt"), &path).unwrap();
        set("dev", None, Some("jwt-2"), &path).unwrap();

        let config = ClientConfig::load(&path).unwrap();
        let ctx = config.current().unwrap();
        assert_eq!(ctx.server, "http://localhost:8080");
        assert_eq!(ctx.token, "jwt-2");
    }

    #[test]
    fn use_and_delete_require_known_context() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        assert!(use_context("ghost", &path).is_err());
        assert!(delete("ghost", &path).is_err());

        set("dev", Some("http://localhost:8080"), None, &path).unwrap();
        set("prod", Some("https://api.example.com"), None, &path).unwrap();
        use_context("prod", &path).unwrap();
        assert_eq!(ClientConfig::load(&path).unwrap().current_context, "prod");

        delete("prod", &path).unwrap();
        let config = ClientConfig::load(&path).unwrap();
        assert!(config.current_context.is_empty());
        assert_eq!(config.contexts.len(), 1);
    }
}
