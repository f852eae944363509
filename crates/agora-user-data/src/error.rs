//! User data error types.

use agora_api::ApiError;
use agora_config_and_utils::notify::{Banner, Notifier};
use agora_local_store::DatabaseError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum UserDataError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Local storage error: {0}")]
    Database(#[from] DatabaseError),
}

impl UserDataError {
    /// True when a banner for this failure has already been shown, either by
    /// the request pipeline or by the local store's corruption alert.
    pub fn is_already_handled(&self) -> bool {
        match self {
            UserDataError::Api(error) => error.is_already_handled(),
            UserDataError::Database(error) => error.is_corrupted(),
        }
    }

    /// Show the generic error banner unless already handled.
    pub fn report(&self, notifier: &dyn Notifier) -> bool {
        match self {
            UserDataError::Api(error) => error.report(notifier),
            UserDataError::Database(_) if self.is_already_handled() => false,
            UserDataError::Database(error) => {
                tracing::warn!(error = %error, "Reporting local storage failure");
                notifier.show(local_banner());
                true
            }
        }
    }

    /// Like [`report`](Self::report), with a "Retry" action bound to `retry`.
    pub fn report_with_retry(
        &self,
        notifier: &dyn Notifier,
        retry: impl FnOnce() + Send + 'static,
    ) -> bool {
        match self {
            UserDataError::Api(error) => error.report_with_retry(notifier, retry),
            UserDataError::Database(_) if self.is_already_handled() => false,
            UserDataError::Database(error) => {
                tracing::warn!(error = %error, "Reporting retryable local storage failure");
                notifier.show(local_banner().with_action("Retry", retry));
                true
            }
        }
    }
}

fn local_banner() -> Banner {
    Banner::error(agora_api::GENERIC_ERROR_TITLE).with_subtitle("Your data could not be read or saved")
}

pub type UserDataResult<T> = Result<T, UserDataError>;

#[cfg(test)]
mod tests {
    use super::*;
    use agora_config_and_utils::notify::RecordingNotifier;

    #[test]
    fn already_handled_is_swallowed() {
        let notifier = RecordingNotifier::new();
        let error = UserDataError::from(ApiError::AlreadyHandled);

        assert!(error.is_already_handled());
        assert!(!error.report(&notifier));
        assert_eq!(notifier.count(), 0);
    }

    #[test]
    fn corruption_is_not_reported_twice() {
        let notifier = RecordingNotifier::new();
        let error = UserDataError::from(DatabaseError::Corrupted {
            entity: "progress",
            count: 2,
        });

        assert!(!error.report_with_retry(&notifier, || {}));
        assert_eq!(notifier.count(), 0);
    }

    #[test]
    fn not_loaded_gets_generic_banner() {
        let notifier = RecordingNotifier::new();
        let error = UserDataError::from(DatabaseError::NotLoaded);

        assert!(error.report(&notifier));
        assert_eq!(notifier.titles(), vec![agora_api::GENERIC_ERROR_TITLE.to_string()]);
    }

    #[test]
    fn api_failure_carries_retry_action() {
        let notifier = RecordingNotifier::new();
        let error = UserDataError::from(ApiError::Status {
            status: 500,
            body: String::new(),
        });

        assert!(error.report_with_retry(&notifier, || {}));
        assert_eq!(notifier.banners()[0].action_label.as_deref(), Some("Retry"));
    }
}
