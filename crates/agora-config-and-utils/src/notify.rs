//! User-facing notification surface.
//!
//! The core never renders anything. It hands [`Banner`]s to a [`Notifier`]
//! supplied by the embedding application and learns about the user's
//! reaction through the banner's callbacks: the action callback fires when
//! the user taps the button, `on_dismiss` fires when the banner goes away
//! without that tap. Exactly one of the two fires per banner.

use std::fmt;

/// Visual style of a banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerStyle {
    Info,
    Success,
    Error,
}

type Callback = Box<dyn FnOnce() + Send + 'static>;

/// Single action button attached to a banner.
pub struct BannerAction {
    pub label: String,
    callback: Callback,
}

impl BannerAction {
    pub fn new(label: impl Into<String>, callback: impl FnOnce() + Send + 'static) -> Self {
        Self {
            label: label.into(),
            callback: Box::new(callback),
        }
    }
}

impl fmt::Debug for BannerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BannerAction")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// A fire-and-forget notification.
pub struct Banner {
    pub style: BannerStyle,
    pub title: String,
    pub subtitle: Option<String>,
    pub action: Option<BannerAction>,
    on_dismiss: Option<Callback>,
}

impl Banner {
    pub fn new(style: BannerStyle, title: impl Into<String>) -> Self {
        Self {
            style,
            title: title.into(),
            subtitle: None,
            action: None,
            on_dismiss: None,
        }
    }

    pub fn info(title: impl Into<String>) -> Self {
        Self::new(BannerStyle::Info, title)
    }

    pub fn success(title: impl Into<String>) -> Self {
        Self::new(BannerStyle::Success, title)
    }

    pub fn error(title: impl Into<String>) -> Self {
        Self::new(BannerStyle::Error, title)
    }

    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }

    pub fn with_action(
        mut self,
        label: impl Into<String>,
        callback: impl FnOnce() + Send + 'static,
    ) -> Self {
        self.action = Some(BannerAction::new(label, callback));
        self
    }

    pub fn on_dismiss(mut self, callback: impl FnOnce() + Send + 'static) -> Self {
        self.on_dismiss = Some(Box::new(callback));
        self
    }

    /// The user tapped the action button. Returns false when there is none,
    /// in which case the banner counts as dismissed.
    pub fn tap(mut self) -> bool {
        match self.action.take() {
            Some(action) => {
                (action.callback)();
                true
            }
            None => {
                self.dismiss();
                false
            }
        }
    }

    /// The banner went away without its action being used.
    pub fn dismiss(self) {
        if let Some(callback) = self.on_dismiss {
            callback();
        }
    }
}

impl fmt::Debug for Banner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Banner")
            .field("style", &self.style)
            .field("title", &self.title)
            .field("subtitle", &self.subtitle)
            .field("action", &self.action)
            .finish_non_exhaustive()
    }
}

/// Presentation layer hook. Implementations must eventually call
/// [`Banner::tap`] or [`Banner::dismiss`] (dropping the banner counts as a
/// dismissal for callers waiting on a channel).
pub trait Notifier: Send + Sync {
    fn show(&self, banner: Banner);
}

#[cfg(any(test, feature = "test-support"))]
pub use recording::{ActionResponse, RecordedBanner, RecordingNotifier};

#[cfg(any(test, feature = "test-support"))]
mod recording {
    use super::{Banner, BannerStyle, Notifier};
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    /// How the fake user reacts to a banner.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum ActionResponse {
        /// Tap the action button (dismiss if there is none).
        Tap,
        /// Dismiss right away.
        Dismiss,
        /// Leave the banner on screen; nothing fires until `release_pending`.
        Ignore,
    }

    /// What a recorded banner looked like.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct RecordedBanner {
        pub style: BannerStyle,
        pub title: String,
        pub subtitle: Option<String>,
        pub action_label: Option<String>,
    }

    /// Notifier that captures banners for assertions.
    pub struct RecordingNotifier {
        banners: Mutex<Vec<RecordedBanner>>,
        queued: Mutex<VecDeque<ActionResponse>>,
        default_response: Mutex<ActionResponse>,
        pending: Mutex<Vec<Banner>>,
    }

    impl Default for RecordingNotifier {
        fn default() -> Self {
            Self::new()
        }
    }

    impl RecordingNotifier {
        /// Dismisses every banner unless told otherwise.
        pub fn new() -> Self {
            Self {
                banners: Mutex::new(Vec::new()),
                queued: Mutex::new(VecDeque::new()),
                default_response: Mutex::new(ActionResponse::Dismiss),
                pending: Mutex::new(Vec::new()),
            }
        }

        pub fn set_default_response(&self, response: ActionResponse) {
            *self.default_response.lock() = response;
        }

        /// Reaction to the next banner only.
        pub fn queue_response(&self, response: ActionResponse) {
            self.queued.lock().push_back(response);
        }

        pub fn banners(&self) -> Vec<RecordedBanner> {
            self.banners.lock().clone()
        }

        pub fn titles(&self) -> Vec<String> {
            self.banners.lock().iter().map(|b| b.title.clone()).collect()
        }

        pub fn count(&self) -> usize {
            self.banners.lock().len()
        }

        pub fn count_titled(&self, title: &str) -> usize {
            self.banners.lock().iter().filter(|b| b.title == title).count()
        }

        /// Dismiss every ignored banner.
        pub fn release_pending(&self) {
            let pending: Vec<Banner> = std::mem::take(&mut *self.pending.lock());
            for banner in pending {
                banner.dismiss();
            }
        }

        pub fn pending_count(&self) -> usize {
            self.pending.lock().len()
        }
    }

    impl Notifier for RecordingNotifier {
        fn show(&self, banner: Banner) {
            self.banners.lock().push(RecordedBanner {
                style: banner.style,
                title: banner.title.clone(),
                subtitle: banner.subtitle.clone(),
                action_label: banner.action.as_ref().map(|a| a.label.clone()),
            });

            let response = self
                .queued
                .lock()
                .pop_front()
                .unwrap_or(*self.default_response.lock());

            match response {
                ActionResponse::Tap => {
                    banner.tap();
                }
                ActionResponse::Dismiss => banner.dismiss(),
                ActionResponse::Ignore => self.pending.lock().push(banner),
            }
        }
    }
}
