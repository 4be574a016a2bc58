use serde::Deserialize;

/// Build notification posted by the CI service.
#[derive(Debug, Deserialize)]
pub struct BuildNotification {
    pub payload: BuildPayload,
}

#[derive(Debug, Deserialize)]
pub struct BuildPayload {
    pub compare_url: Option<String>,
    pub result: Option<i64>,
}

impl BuildPayload {
    /// Pull-request number from `compare_url`, if the build was for a PR.
    ///
    /// The URL's second-to-last path segment is `pull` for PR builds and
    /// the last segment is the number.
    pub fn pull_request_number(&self) -> Option<u64> {
        let url = self.compare_url.as_deref()?;
        let mut segments = url.rsplit('/');
        let number = segments.next()?;
        let kind = segments.next()?;
        if kind == "pull" {
            number.parse().ok()
        } else {
            None
        }
    }

    pub fn build_success(&self) -> bool {
        self.result == Some(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(compare_url: Option<&str>, result: Option<i64>) -> BuildPayload {
        BuildPayload {
            compare_url: compare_url.map(|s| s.to_string()),
            result,
        }
    }

    #[test]
    fn pull_request_number_from_compare_url() {
        let p = payload(Some("https://github.com/org/repo/pull/123"), Some(0));
        assert_eq!(p.pull_request_number(), Some(123));
    }

    #[test]
    fn branch_compare_urls_are_not_pull_requests() {
        let p = payload(Some("https://github.com/org/repo/compare/abc...def"), Some(0));
        assert_eq!(p.pull_request_number(), None);

        let p = payload(None, Some(0));
        assert_eq!(p.pull_request_number(), None);
    }

    #[test]
    fn non_numeric_pull_segment_is_ignored() {
        let p = payload(Some("https://github.com/org/repo/pull/not-a-number"), Some(0));
        assert_eq!(p.pull_request_number(), None);
    }

    #[test]
    fn result_zero_means_success() {
        assert!(payload(None, Some(0)).build_success());
        assert!(!payload(None, Some(1)).build_success());
        assert!(!payload(None, None).build_success());
    }
}
