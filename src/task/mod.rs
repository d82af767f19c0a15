pub(crate) mod janitor;
pub(crate) mod notifier;
