use crate::controller::ClientSessionController;
use crate::host::AssetId;
use plaza_core::{GridPosition, UserId};
use std::collections::HashSet;
use tracing::{debug, warn};

impl ClientSessionController {
    /// Creates the entity for `user_id` unless it exists or is already being
    /// created. Safe against overlapping calls for the same id: the second
    /// caller only updates the position the pending creation will use.
    pub(super) async fn ensure_remote(&self, user_id: UserId, at: GridPosition, epoch: u64) {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.epoch != epoch {
                return;
            }
            if inner.entities.contains(&user_id) {
                if let Some(scene) = inner.scene.as_mut() {
                    scene.move_remote(&user_id, at);
                }
                return;
            }
            if let Some(pending) = inner.spawning.get_mut(&user_id) {
                debug!("Entity for {} already in flight", user_id);
                *pending = at;
                return;
            }
            inner.spawning.insert(user_id.clone(), at);
        }

        let avatar = self.avatar_for(&user_id).await;

        let mut inner = self.inner.borrow_mut();
        if inner.epoch != epoch {
            return;
        }
        let Some(at) = inner.spawning.remove(&user_id) else {
            debug!("{} left before its entity was ready", user_id);
            return;
        };
        let Some(scene) = inner.scene.as_mut() else {
            return;
        };
        scene.spawn_remote(&user_id, at, avatar.as_ref());
        inner.entities.insert(user_id);
    }

    pub(super) fn remove_remote(&self, user_id: &UserId) {
        let mut inner = self.inner.borrow_mut();
        inner.spawning.remove(user_id);
        if inner.entities.remove(user_id) {
            if let Some(scene) = inner.scene.as_mut() {
                scene.despawn_remote(user_id);
            }
        }
    }

    /// Despawns every remote entity and abandons creations in flight.
    pub(super) fn clear_remotes(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.spawning.clear();
        let gone: Vec<UserId> = inner.entities.drain().collect();
        if let Some(scene) = inner.scene.as_mut() {
            for user_id in &gone {
                scene.despawn_remote(user_id);
            }
        }
    }

    /// Keeps only the remote entities named in a fresh room snapshot.
    pub(super) fn retain_remotes(&self, present: &HashSet<UserId>) {
        let mut inner = self.inner.borrow_mut();
        inner.spawning.retain(|user_id, _| present.contains(user_id));
        let stale: Vec<UserId> = inner
            .entities
            .iter()
            .filter(|user_id| !present.contains(*user_id))
            .cloned()
            .collect();
        for user_id in &stale {
            inner.entities.remove(user_id);
        }
        if let Some(scene) = inner.scene.as_mut() {
            for user_id in &stale {
                debug!("{} is no longer in the room", user_id);
                scene.despawn_remote(user_id);
            }
        }
    }

    pub(super) fn move_remote(&self, user_id: &UserId, to: GridPosition) {
        let mut inner = self.inner.borrow_mut();
        if let Some(pending) = inner.spawning.get_mut(user_id) {
            *pending = to;
            return;
        }
        if !inner.entities.contains(user_id) {
            debug!("Movement for unknown participant {}", user_id);
            return;
        }
        if let Some(scene) = inner.scene.as_mut() {
            scene.move_remote(user_id, to);
        }
    }

    /// Avatar images are optional; a failed load leaves the default sprite.
    async fn avatar_for(&self, user_id: &UserId) -> Option<AssetId> {
        let url = {
            let inner = self.inner.borrow();
            let url = format!(
                "{}/{}.png",
                inner.config.avatar_base_url.trim_end_matches('/'),
                user_id
            );
            if let Some(cached) = inner.asset_cache.get(&url) {
                return Some(cached.clone());
            }
            url
        };

        match self.services.assets.load(&url).await {
            Ok(asset) => {
                self.inner
                    .borrow_mut()
                    .asset_cache
                    .insert(url, asset.clone());
                Some(asset)
            }
            Err(e) => {
                warn!("Avatar for {} unavailable: {}", user_id, e);
                None
            }
        }
    }
}
