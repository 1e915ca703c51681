//! Lecture de la bibliothèque de l'utilisateur

use super::EmbyApi;
use crate::error::Result;
use crate::models::{Item, ItemsResponse};
use kwsession::AuthInfo;
use tracing::debug;

/// Nombre maximal d'items demandés au serveur
pub const ITEMS_LIMIT: u32 = 50;

impl EmbyApi {
    /// Liste les films de l'utilisateur, récursivement dans toutes les vues
    pub async fn movies(&self, auth: &AuthInfo) -> Result<Vec<Item>> {
        let path = format!("/Users/{}/Items", auth.user_id);
        let limit = ITEMS_LIMIT.to_string();
        let params = [
            ("Recursive", "true"),
            ("IncludeItemTypes", "Movie"),
            ("Limit", limit.as_str()),
        ];

        let response: ItemsResponse = self.get(&path, &auth.token, &params).await?;
        debug!(
            "Library of {} holds {} movies (total {:?})",
            auth.user_id,
            response.items.len(),
            response.total_record_count
        );
        Ok(response.items)
    }

    /// Récupère un item avec les données de lecture de l'utilisateur
    pub async fn item(&self, auth: &AuthInfo, item_id: &str) -> Result<Item> {
        let path = format!("/Users/{}/Items/{}", auth.user_id, item_id);
        self.get(&path, &auth.token, &[]).await
    }
}
