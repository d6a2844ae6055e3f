//! Outbound notification after a successful run.
//!
//! Notification is best-effort and fire-and-forget: the generator hands the
//! absolute index URL to the configured [`Notifier`] once generation
//! succeeds, and nothing a notifier does can fail the run. Implementations
//! are expected to log their own delivery failures.

use tracing::info;
use url::Url;

/// Collaborator notified with the index URL after a successful run.
pub trait Notifier {
    /// Called once per successful run with the absolute index document URL.
    fn notify(&self, index_url: &Url);
}

/// Default notifier: records the index URL in the log and nothing else.
///
/// Deployments that ping search engines plug their own implementation in
/// via [`Generator::with_notifier`](crate::Generator::with_notifier).
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, index_url: &Url) {
        info!(index = %index_url, "Sitemap index ready");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct Recording {
        urls: RefCell<Vec<String>>,
    }

    impl Notifier for Recording {
        fn notify(&self, index_url: &Url) {
            self.urls.borrow_mut().push(index_url.to_string());
        }
    }

    #[test]
    fn test_custom_notifier_receives_index_url() {
        let notifier = Recording {
            urls: RefCell::new(Vec::new()),
        };
        let url = Url::parse("https://example.com/sitemaps/sitemap_index.xml.gz").unwrap();
        notifier.notify(&url);
        assert_eq!(
            notifier.urls.borrow().as_slice(),
            ["https://example.com/sitemaps/sitemap_index.xml.gz"]
        );
    }
}
