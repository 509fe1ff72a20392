//! Asset URL resolution.

use url::Url;

/// Resolves an asset name (as found in game tables) to a fetchable URL.
pub trait AssetResolver: Send + Sync {
    fn resolve(&self, name: &str) -> Option<Url>;
}

/// Serves `{base}ui/{name}.png` from Enka.Network.
#[derive(Debug, Clone)]
pub struct EnkaAssetResolver {
    base: Url,
}

impl EnkaAssetResolver {
    pub fn new(base: Url) -> Self {
        Self { base }
    }
}

impl AssetResolver for EnkaAssetResolver {
    fn resolve(&self, name: &str) -> Option<Url> {
        let name = name.trim();
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return None;
        }
        self.base.join(&format!("ui/{}.png", name)).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_ui_asset() {
        let resolver = EnkaAssetResolver::new(Url::parse("https://enka.network/").unwrap());
        assert_eq!(
            resolver.resolve("UI_AvatarIcon_Side_Ayaka").unwrap().as_str(),
            "https://enka.network/ui/UI_AvatarIcon_Side_Ayaka.png"
        );
        assert!(resolver.resolve("").is_none());
        assert!(resolver.resolve("../secret").is_none());
    }
}
