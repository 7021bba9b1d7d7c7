use std::collections::HashMap;
use std::path::Path;

use crate::error::Result;
use crate::models::user::Identity;

/// Loads the users file.
///
/// # Arguments
///
/// * `path` - The JSON file mapping usernames to identities.
///
/// # Returns
///
/// A `Result` containing the identities. A missing file is an empty map; a
/// file that cannot be read or parsed is an error.
pub async fn load_identities(path: &Path) -> Result<HashMap<String, Identity>> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!("No users file at {}, starting empty", path.display());
            return Ok(HashMap::new());
        }
        Err(e) => return Err(e.into()),
    };

    let identities: HashMap<String, Identity> = sonic_rs::from_str(&raw)?;
    tracing::info!("✅ Loaded {} users from {}", identities.len(), path.display());
    Ok(identities)
}

/// Writes the users file.
///
/// The snapshot goes to a sibling `.tmp` file first and is renamed into
/// place, so a crash mid-write leaves the previous file intact.
pub async fn save_identities(path: &Path, identities: &HashMap<String, Identity>) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let json = sonic_rs::to_string_pretty(identities)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, json).await?;
    tokio::fs::rename(&tmp, path).await?;

    tracing::info!("✅ Saved {} users to {}", identities.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::HashedPassword;

    fn ann() -> Identity {
        Identity {
            first: "Ann".to_string(),
            last: "Lee".to_string(),
            username: "ann".to_string(),
            password_hash: HashedPassword::from_phc("$argon2id$v=19$m=8,t=1,p=1$c2FsdA$aGFzaA".to_string()),
        }
    }

    #[tokio::test]
    async fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load_identities(&dir.path().join("absent.json")).await.unwrap();
        assert!(loaded.is_empty());
    }

    #[tokio::test]
    async fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("users.json");
        let users = HashMap::from([("ann".to_string(), ann())]);

        save_identities(&path, &users).await.unwrap();
        assert_eq!(load_identities(&path).await.unwrap(), users);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn on_disk_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");
        save_identities(&path, &HashMap::from([("ann".to_string(), ann())]))
            .await
            .unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let entry = &value["ann"];
        assert_eq!(entry["first"], "Ann");
        assert_eq!(entry["last"], "Lee");
        assert_eq!(entry["username"], "ann");
        assert!(entry["passwordHash"].as_str().unwrap().starts_with("$argon2id$"));
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(load_identities(&path).await.is_err());
    }
}
