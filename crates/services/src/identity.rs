use async_trait::async_trait;

/// Signed-in learner, used to save exam results automatically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn current_user(&self) -> Option<Identity>;
}

/// Fixed identity, or anonymous when built with `None` or a blank name.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity {
    user: Option<Identity>,
}

impl StaticIdentity {
    #[must_use]
    pub fn new(name: Option<String>) -> Self {
        let user = name
            .map(|n| n.trim().to_owned())
            .filter(|n| !n.is_empty())
            .map(|name| Identity { name });
        Self { user }
    }

    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn current_user(&self) -> Option<Identity> {
        self.user.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn blank_name_is_anonymous() {
        assert!(StaticIdentity::new(Some("  ".into())).current_user().await.is_none());
        assert!(StaticIdentity::anonymous().current_user().await.is_none());
        assert_eq!(
            StaticIdentity::new(Some(" Ana ".into())).current_user().await,
            Some(Identity { name: "Ana".into() })
        );
    }
}
