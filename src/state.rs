use std::sync::Arc;

use axum::extract::FromRef;

use crate::config::Config;
use crate::media::MediaStore;
use crate::store::{CommentStore, PostStore, UserStore};

/// Application context handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub posts: Arc<dyn PostStore>,
    pub comments: Arc<dyn CommentStore>,
    pub media: Arc<dyn MediaStore>,
    pub config: Config,
}

impl AppState {
    /// Builds the state from one backend serving all three stores.
    pub fn new<S>(store: Arc<S>, media: Arc<dyn MediaStore>, config: Config) -> Self
    where
        S: UserStore + PostStore + CommentStore + 'static,
    {
        Self {
            users: store.clone(),
            posts: store.clone(),
            comments: store,
            media,
            config,
        }
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
